use crate::extractors::SignalExtractor;
use crate::facts::{names, FactMap};
use crate::message::{Enrichment, RawEmail};

/// Extract domain from an email address or address-bearing header value.
/// Tolerates SMTP artifacts like angle brackets and trailing parameters.
pub fn extract_domain(address: &str) -> Option<String> {
    let at_pos = address.rfind('@')?;
    if at_pos == 0 {
        return None;
    }
    let domain_part = &address[at_pos + 1..];

    let domain = domain_part
        .split_whitespace()
        .next()?
        .split('>')
        .next()?
        .split(',')
        .next()?
        .split(';')
        .next()?
        .trim();

    if domain.contains('.')
        && !domain.is_empty()
        && domain.len() < 255
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        Some(domain.to_lowercase())
    } else {
        None
    }
}

/// Check if domain1 is domain2 or a subdomain of it.
/// is_subdomain_of("mail.etsy.com", "etsy.com") -> true
/// is_subdomain_of("notetsy.com", "etsy.com") -> false
pub fn is_subdomain_of(domain1: &str, domain2: &str) -> bool {
    if domain1 == domain2 {
        return true;
    }
    if domain1.len() > domain2.len() && domain1.ends_with(domain2) {
        let prefix_len = domain1.len() - domain2.len();
        domain1.chars().nth(prefix_len - 1) == Some('.')
    } else {
        false
    }
}

/// Last label of a domain, lowercased.
pub fn tld_of(domain: &str) -> Option<String> {
    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() >= 2 {
        parts.last().map(|tld| tld.to_lowercase())
    } else {
        None
    }
}

/// Sender/reply-to domains and the WHOIS/IP enrichment passthrough.
/// Enrichment fields that were not fetched are simply not written, so
/// scorers and rules see them as unknown.
pub struct DomainExtractor;

impl Default for DomainExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainExtractor {
    pub fn new() -> Self {
        DomainExtractor
    }

    fn sender_domain(&self, email: &RawEmail) -> Option<String> {
        if let Some(sender) = &email.sender {
            if let Some(domain) = extract_domain(sender) {
                return Some(domain);
            }
        }
        if let Some(from) = &email.from_header {
            if let Some(domain) = extract_domain(from) {
                return Some(domain);
            }
        }
        None
    }
}

impl SignalExtractor for DomainExtractor {
    fn name(&self) -> &str {
        "domain"
    }

    fn extract(&self, email: &RawEmail, enrichment: &Enrichment, facts: &mut FactMap) {
        if let Some(domain) = self.sender_domain(email) {
            facts.insert(names::SENDER_DOMAIN, domain);
        } else {
            log::debug!("no valid sender domain found");
        }

        if let Some(reply_to) = &email.reply_to {
            if let Some(domain) = extract_domain(reply_to) {
                facts.insert(names::REPLY_TO_DOMAIN, domain);
            }
        }

        if let Some(age) = enrichment.domain_age_days {
            facts.insert(names::DOMAIN_AGE_DAYS, age);
        }
        if let Some(flagged) = enrichment.registrar_flagged {
            facts.insert(names::REGISTRAR_FLAGGED, flagged);
        }
        if let Some(cloud) = enrichment.cloud_hosted {
            facts.insert(names::CLOUD_HOSTED, cloud);
        }
    }
}
