use crate::config::EngineConfig;
use crate::extractors::{default_extractors, SignalExtractor};
use crate::facts::FactMap;
use crate::message::{Enrichment, RawEmail};
use crate::scoring::{
    aggregate, score_factors, FactorScores, ScoringWeights, Severity, SeverityThresholds,
};
use serde::{Deserialize, Serialize};

/// Immutable result of analyzing one message: constructed once, never
/// mutated. The id is owned by the caller and treated as opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedEmail {
    pub id: String,
    pub facts: FactMap,
    pub factor_scores: FactorScores,
    pub risk_score: u8,
    pub severity: Severity,
}

/// Runs extractors, factor scorers and the aggregator. Construction
/// validates the configuration; an invalid config never serves a single
/// evaluation.
pub struct EmailAnalyzer {
    weights: ScoringWeights,
    thresholds: SeverityThresholds,
    extractors: Vec<Box<dyn SignalExtractor>>,
}

impl EmailAnalyzer {
    pub fn new(config: &EngineConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            weights: config.weights,
            thresholds: config.thresholds,
            extractors: default_extractors(config),
        })
    }

    pub fn analyze(&self, id: &str, email: &RawEmail, enrichment: &Enrichment) -> AnalyzedEmail {
        let mut facts = FactMap::new();
        for extractor in &self.extractors {
            extractor.extract(email, enrichment, &mut facts);
        }
        log::debug!("email {id}: extracted {} facts", facts.len());

        let factor_scores = score_factors(&facts);
        let (risk_score, severity) = aggregate(&factor_scores, &self.weights, &self.thresholds);
        log::info!(
            "email {id}: risk {risk_score} ({severity}), factors {factor_scores:?}"
        );

        AnalyzedEmail {
            id: id.to_string(),
            facts,
            factor_scores,
            risk_score,
            severity,
        }
    }
}
