use crate::extractors::domain::{extract_domain, is_subdomain_of};
use crate::extractors::SignalExtractor;
use crate::facts::{names, AuthVerdict, FactMap};
use crate::message::{Enrichment, RawEmail};
use regex::Regex;

const MAX_REASONABLE_HOPS: usize = 8;

/// Header-level signals: authentication verdicts, display-name spoofing,
/// reply-to misdirection and routing anomalies.
pub struct HeaderExtractor {
    display_domain_regex: Regex,
}

impl Default for HeaderExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderExtractor {
    pub fn new() -> Self {
        Self {
            // Domain-looking token inside a display name, e.g. "paypal.com Support"
            display_domain_regex: Regex::new(r"(?i)\b([a-z0-9][a-z0-9-]*(?:\.[a-z0-9-]+)*\.[a-z]{2,})\b")
                .unwrap(),
        }
    }

    /// Parse one mechanism's verdict out of Authentication-Results.
    /// Softfail/neutral/temperror and a missing entry all read as unknown;
    /// only an explicit pass or fail is conclusive.
    fn auth_verdict(auth_results: Option<&str>, mechanism: &str) -> AuthVerdict {
        let results = match auth_results {
            Some(results) => results.to_lowercase(),
            None => return AuthVerdict::Unknown,
        };

        if results.contains(&format!("{mechanism}=pass")) {
            AuthVerdict::Pass
        } else if results.contains(&format!("{mechanism}=fail"))
            || results.contains(&format!("{mechanism}=permerror"))
        {
            AuthVerdict::Fail
        } else {
            AuthVerdict::Unknown
        }
    }

    /// From header display name claims a different domain than the actual
    /// sender address, e.g. `"paypal.com Security" <alerts@evil.example>`.
    fn display_name_mismatch(&self, from_header: &str) -> bool {
        let (display, address) = match from_header.rfind('<') {
            Some(pos) => (&from_header[..pos], &from_header[pos..]),
            None => return false,
        };

        let address_domain = match extract_domain(address) {
            Some(domain) => domain,
            None => return false,
        };

        for cap in self.display_domain_regex.captures_iter(display) {
            let claimed = cap[1].to_lowercase();
            if !is_subdomain_of(&claimed, &address_domain)
                && !is_subdomain_of(&address_domain, &claimed)
            {
                log::debug!(
                    "display name claims '{claimed}' but sender domain is '{address_domain}'"
                );
                return true;
            }
        }
        false
    }

    /// Reply-To points at an unrelated domain. Subdomain relationships in
    /// either direction are fine (mail.example.com vs example.com).
    fn reply_to_mismatch(email: &RawEmail) -> bool {
        let reply_to = match email.reply_to.as_deref().and_then(extract_domain) {
            Some(domain) => domain,
            None => return false,
        };
        let from = email
            .from_header
            .as_deref()
            .and_then(extract_domain)
            .or_else(|| email.sender.as_deref().and_then(extract_domain));
        let from = match from {
            Some(domain) => domain,
            None => return false,
        };

        !is_subdomain_of(&reply_to, &from) && !is_subdomain_of(&from, &reply_to)
    }

    /// Routing looks off: too many relay hops, or a relay that would not
    /// identify itself.
    fn suspicious_routing(email: &RawEmail) -> bool {
        let received = match email.header("received") {
            Some(received) => received,
            None => return false,
        };

        let hops: Vec<&str> = received
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect();
        if hops.len() > MAX_REASONABLE_HOPS {
            log::debug!("received chain has {} hops", hops.len());
            return true;
        }

        hops.iter()
            .any(|hop| hop.to_lowercase().contains("from unknown"))
    }
}

impl SignalExtractor for HeaderExtractor {
    fn name(&self) -> &str {
        "header"
    }

    fn extract(&self, email: &RawEmail, _enrichment: &Enrichment, facts: &mut FactMap) {
        let auth_results = email.header("authentication-results");

        facts.insert(
            names::SPF_RESULT,
            Self::auth_verdict(auth_results, "spf").as_str(),
        );
        facts.insert(
            names::DKIM_RESULT,
            Self::auth_verdict(auth_results, "dkim").as_str(),
        );
        facts.insert(
            names::DMARC_RESULT,
            Self::auth_verdict(auth_results, "dmarc").as_str(),
        );

        let display_mismatch = email
            .from_header
            .as_deref()
            .map(|from| self.display_name_mismatch(from))
            .unwrap_or(false);
        facts.insert(names::SENDER_DISPLAY_MISMATCH, display_mismatch);
        facts.insert(names::REPLY_TO_MISMATCH, Self::reply_to_mismatch(email));
        facts.insert(names::SUSPICIOUS_ROUTING, Self::suspicious_routing(email));

        if let Some(subject) = &email.subject {
            facts.insert(names::SUBJECT, subject.clone());
        }
    }
}
