pub mod analyzer;
pub mod config;
pub mod engine;
pub mod executor;
pub mod extractors;
pub mod facts;
pub mod fields;
pub mod matcher;
pub mod message;
pub mod rules;
pub mod scoring;

pub use analyzer::{AnalyzedEmail, EmailAnalyzer};
pub use config::EngineConfig;
pub use engine::RiskEngine;
pub use executor::{
    ActionExecutor, ActionOutcome, ActionRecord, ActionSink, IdempotencyLedger, MatchResult,
};
pub use facts::{AuthVerdict, FactMap, FactValue};
pub use fields::{FieldDescriptor, FieldRegistry, FieldType};
pub use matcher::RuleMatcher;
pub use message::{Attachment, Enrichment, RawEmail};
pub use rules::{ActionKind, Condition, Operator, Rule, RuleAction, RuleSet};
pub use scoring::{Factor, FactorScores, ScoringWeights, Severity, SeverityThresholds};
