//! Signal extractors: pure functions from a raw email plus pre-fetched
//! enrichment to the typed fact map the scorers and the rule matcher
//! consume. No extractor performs I/O; missing enrichment is surfaced as
//! a missing fact, never as a safe default.

pub mod attachment;
pub mod content;
pub mod domain;
pub mod header;
pub mod url;

use crate::config::EngineConfig;
use crate::facts::FactMap;
use crate::message::{Enrichment, RawEmail};

pub trait SignalExtractor: Send + Sync {
    fn name(&self) -> &str;
    fn extract(&self, email: &RawEmail, enrichment: &Enrichment, facts: &mut FactMap);
}

/// The five production extractors, configured from the engine config.
pub fn default_extractors(config: &EngineConfig) -> Vec<Box<dyn SignalExtractor>> {
    vec![
        Box::new(header::HeaderExtractor::new()),
        Box::new(url::UrlExtractor::new(
            &config.suspicious_tlds,
            &config.shortener_domains,
        )),
        Box::new(domain::DomainExtractor::new()),
        Box::new(attachment::AttachmentExtractor::new(&config.extension_risk)),
        Box::new(content::ContentExtractor::new(
            &config.urgency_phrases,
            &config.credential_phrases,
        )),
    ]
}
