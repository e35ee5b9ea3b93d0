use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw message as handed over by the mail transport. The engine never
/// fetches anything itself; everything it needs is in here or in
/// [`Enrichment`].
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RawEmail {
    pub sender: Option<String>,      // Envelope sender (MAIL FROM)
    pub from_header: Option<String>, // From header, display name included
    pub reply_to: Option<String>,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl RawEmail {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        let wanted = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == wanted)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: u64,
}

/// Pre-fetched WHOIS / IP reputation facts. Every field is optional: an
/// absent field means the lookup failed or was skipped, and downstream
/// scoring must treat it as unknown rather than safe.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Enrichment {
    pub domain_age_days: Option<u32>,
    pub registrar: Option<String>,
    pub registrar_flagged: Option<bool>,
    pub asn: Option<u32>,
    pub country: Option<String>,
    pub cloud_hosted: Option<bool>,
}
