use crate::analyzer::{AnalyzedEmail, EmailAnalyzer};
use crate::config::EngineConfig;
use crate::executor::{ActionExecutor, ActionSink, IdempotencyLedger, MatchResult};
use crate::matcher::RuleMatcher;
use crate::message::{Enrichment, RawEmail};
use crate::rules::Rule;

/// Facade over the full pipeline: extract, score, match, execute.
///
/// The engine holds no mutable state; after construction it only reads
/// its own configuration, so evaluating different emails concurrently is
/// safe. The one shared resource is the caller's [`ActionSink`], whose
/// concurrency control is the caller's responsibility.
pub struct RiskEngine {
    analyzer: EmailAnalyzer,
}

impl RiskEngine {
    /// Fails fast on an invalid configuration; a rejected config never
    /// serves any evaluation.
    pub fn new(config: EngineConfig) -> anyhow::Result<Self> {
        Ok(Self {
            analyzer: EmailAnalyzer::new(&config)?,
        })
    }

    /// Score one email without matching rules.
    pub fn analyze(&self, id: &str, email: &RawEmail, enrichment: &Enrichment) -> AnalyzedEmail {
        self.analyzer.analyze(id, email, enrichment)
    }

    /// One full evaluation pass for one email. Both returned values are
    /// plain serializable value objects; the caller persists them and
    /// feeds `MatchResult::actions_taken` back as the next ledger.
    pub fn evaluate(
        &self,
        id: &str,
        email: &RawEmail,
        enrichment: &Enrichment,
        active_rules: &[Rule],
        sink: &dyn ActionSink,
        ledger: &IdempotencyLedger,
    ) -> (AnalyzedEmail, MatchResult) {
        let analyzed = self.analyzer.analyze(id, email, enrichment);

        let matcher = RuleMatcher::new(active_rules.to_vec());
        let matched = matcher.matches(&analyzed);
        log::info!("email {id}: {} rule(s) matched: {matched:?}", matched.len());

        let result = ActionExecutor::execute(&analyzed, &matched, active_rules, sink, ledger);
        (analyzed, result)
    }
}
