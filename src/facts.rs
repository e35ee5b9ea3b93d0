use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical fact names written by the signal extractors. Rules may only
/// reference names registered in [`crate::fields::FieldRegistry`], which is
/// built from this list plus the two pseudo-facts.
pub mod names {
    pub const SPF_RESULT: &str = "spfResult";
    pub const DKIM_RESULT: &str = "dkimResult";
    pub const DMARC_RESULT: &str = "dmarcResult";
    pub const SENDER_DISPLAY_MISMATCH: &str = "senderDisplayMismatch";
    pub const REPLY_TO_MISMATCH: &str = "replyToMismatch";
    pub const SUSPICIOUS_ROUTING: &str = "suspiciousRouting";
    pub const SUBJECT: &str = "subject";

    pub const URL_COUNT: &str = "urlCount";
    pub const SUSPICIOUS_TLD_COUNT: &str = "suspiciousTldCount";
    pub const SHORTENER_URL_COUNT: &str = "shortenerUrlCount";
    pub const IP_LITERAL_URL_COUNT: &str = "ipLiteralUrlCount";
    pub const HOMOGRAPH_URL_COUNT: &str = "homographUrlCount";

    pub const SENDER_DOMAIN: &str = "senderDomain";
    pub const REPLY_TO_DOMAIN: &str = "replyToDomain";
    pub const DOMAIN_AGE_DAYS: &str = "domainAgeDays";
    pub const REGISTRAR_FLAGGED: &str = "registrarFlagged";
    pub const CLOUD_HOSTED: &str = "cloudHosted";

    pub const HAS_ATTACHMENT: &str = "hasAttachment";
    pub const ATTACHMENT_COUNT: &str = "attachmentCount";
    pub const ATTACHMENT_EXECUTABLE_COUNT: &str = "attachmentExecutableCount";
    pub const ATTACHMENT_MACRO_DOC_COUNT: &str = "attachmentMacroDocCount";
    pub const ATTACHMENT_ARCHIVE_COUNT: &str = "attachmentArchiveCount";
    pub const ATTACHMENT_RISKY_EXT_COUNT: &str = "attachmentRiskyExtCount";

    pub const URGENCY_KEYWORD_HITS: &str = "urgencyKeywordHits";
    pub const CREDENTIAL_KEYWORD_HITS: &str = "credentialKeywordHits";
    pub const KEYWORD_MATCHES: &str = "keywordMatches";

    // Pseudo-facts injected by the matcher after aggregation
    pub const RISK_SCORE: &str = "riskScore";
    pub const SEVERITY: &str = "severity";
}

/// SPF/DKIM/DMARC verdict. `Unknown` covers both a missing
/// Authentication-Results entry and inconclusive results (softfail,
/// neutral, temperror).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthVerdict {
    Pass,
    Fail,
    Unknown,
}

impl AuthVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthVerdict::Pass => "pass",
            AuthVerdict::Fail => "fail",
            AuthVerdict::Unknown => "unknown",
        }
    }
}

/// Typed fact value. Untagged so rule files can write plain YAML/JSON
/// scalars and lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Bool(bool),
    Number(f64),
    Text(String),
    TextSet(Vec<String>),
}

impl FactValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FactValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FactValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FactValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_text_set(&self) -> Option<&[String]> {
        match self {
            FactValue::TextSet(set) => Some(set),
            _ => None,
        }
    }
}

impl From<bool> for FactValue {
    fn from(value: bool) -> Self {
        FactValue::Bool(value)
    }
}

impl From<f64> for FactValue {
    fn from(value: f64) -> Self {
        FactValue::Number(value)
    }
}

impl From<u32> for FactValue {
    fn from(value: u32) -> Self {
        FactValue::Number(f64::from(value))
    }
}

impl From<usize> for FactValue {
    fn from(value: usize) -> Self {
        FactValue::Number(value as f64)
    }
}

impl From<&str> for FactValue {
    fn from(value: &str) -> Self {
        FactValue::Text(value.to_string())
    }
}

impl From<String> for FactValue {
    fn from(value: String) -> Self {
        FactValue::Text(value)
    }
}

impl From<Vec<String>> for FactValue {
    fn from(value: Vec<String>) -> Self {
        FactValue::TextSet(value)
    }
}

/// Union of all extractor outputs for one email. Accessors return `None`
/// for a missing or differently-typed fact, so callers read "unknown"
/// instead of panicking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactMap(HashMap<String, FactValue>);

impl FactMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<FactValue>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FactValue> {
        self.0.get(name)
    }

    pub fn bool_fact(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(FactValue::as_bool)
    }

    pub fn number_fact(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FactValue::as_number)
    }

    pub fn count_fact(&self, name: &str) -> u32 {
        self.number_fact(name).map(|n| n.max(0.0) as u32).unwrap_or(0)
    }

    pub fn text_fact(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FactValue::as_text)
    }

    pub fn set_fact(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(FactValue::as_text_set)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FactValue)> {
        self.0.iter()
    }
}
