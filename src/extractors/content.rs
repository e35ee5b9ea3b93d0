use crate::extractors::SignalExtractor;
use crate::facts::{names, FactMap};
use crate::message::{Enrichment, RawEmail};

/// Content signals: urgency-pressure and credential-harvest phrasing in
/// subject and body. Each configured phrase counts at most once however
/// often it repeats.
pub struct ContentExtractor {
    urgency_phrases: Vec<String>,
    credential_phrases: Vec<String>,
}

impl ContentExtractor {
    pub fn new(urgency_phrases: &[String], credential_phrases: &[String]) -> Self {
        let lower = |list: &[String]| list.iter().map(|p| p.to_lowercase()).collect();
        Self {
            urgency_phrases: lower(urgency_phrases),
            credential_phrases: lower(credential_phrases),
        }
    }

    fn matched_phrases<'a>(text: &str, phrases: &'a [String]) -> Vec<&'a str> {
        phrases
            .iter()
            .filter(|phrase| text.contains(phrase.as_str()))
            .map(String::as_str)
            .collect()
    }
}

impl SignalExtractor for ContentExtractor {
    fn name(&self) -> &str {
        "content"
    }

    fn extract(&self, email: &RawEmail, _enrichment: &Enrichment, facts: &mut FactMap) {
        let mut text = String::new();
        if let Some(subject) = &email.subject {
            text.push_str(subject);
            text.push(' ');
        }
        if let Some(body) = &email.body {
            text.push_str(body);
        }
        let text = text.to_lowercase();

        let urgency = Self::matched_phrases(&text, &self.urgency_phrases);
        let credential = Self::matched_phrases(&text, &self.credential_phrases);

        facts.insert(names::URGENCY_KEYWORD_HITS, urgency.len());
        facts.insert(names::CREDENTIAL_KEYWORD_HITS, credential.len());

        let mut matches: Vec<String> = urgency
            .iter()
            .chain(credential.iter())
            .map(|phrase| phrase.to_string())
            .collect();
        matches.sort();
        facts.insert(names::KEYWORD_MATCHES, matches);
    }
}
