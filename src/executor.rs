use crate::analyzer::AnalyzedEmail;
use crate::rules::{ActionKind, Rule, RuleAction};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Side-effect boundary of the engine. One method per action type; the
/// engine's responsibility ends at invoking the sink and recording the
/// outcome. Implementations that are not safe for concurrent use must
/// handle their own serialization.
pub trait ActionSink: Send + Sync {
    fn mark_as_reviewed(&self, email_id: &str) -> anyhow::Result<()>;
    fn add_label(&self, email_id: &str, label: &str) -> anyhow::Result<()>;
    fn move_to_folder(&self, email_id: &str, folder: &str) -> anyhow::Result<()>;
    fn send_report_now(&self, email_id: &str) -> anyhow::Result<()>;
    fn notify_user(&self, email_id: &str, channel: &str) -> anyhow::Result<()>;
    fn increase_retention(&self, email_id: &str, days: u32) -> anyhow::Result<()>;
    fn delete_email(&self, email_id: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionOutcome {
    Success,
    Failed,
}

/// One executed (or skipped-as-already-done) action. The collected
/// records double as the idempotency ledger for the next evaluation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    pub rule_id: String,
    pub action_type: ActionKind,
    pub outcome: ActionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// Engine output for one evaluation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchResult {
    pub matched_rules: Vec<String>,
    pub actions_taken: Vec<ActionRecord>,
}

/// Successful (rule, action-kind) pairs from prior passes. Consulted
/// before every sink call so re-evaluation (after a rule edit, say) can
/// never double-report or double-delete.
#[derive(Debug, Clone, Default)]
pub struct IdempotencyLedger {
    succeeded: HashSet<(String, ActionKind)>,
}

impl IdempotencyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: &[ActionRecord]) -> Self {
        let succeeded = records
            .iter()
            .filter(|record| record.outcome == ActionOutcome::Success)
            .map(|record| (record.rule_id.clone(), record.action_type))
            .collect();
        Self { succeeded }
    }

    pub fn contains(&self, rule_id: &str, kind: ActionKind) -> bool {
        self.succeeded
            .contains(&(rule_id.to_string(), kind))
    }

    fn record(&mut self, rule_id: &str, kind: ActionKind) {
        self.succeeded.insert((rule_id.to_string(), kind));
    }
}

pub struct ActionExecutor;

impl ActionExecutor {
    /// Apply the matched rules' actions in order. Failures are recorded
    /// and isolated: one failing sink call never prevents execution of
    /// the remaining actions or rules, and nothing already applied is
    /// rolled back.
    pub fn execute(
        analyzed: &AnalyzedEmail,
        matched_ids: &[String],
        rules: &[Rule],
        sink: &dyn ActionSink,
        ledger: &IdempotencyLedger,
    ) -> MatchResult {
        let by_id: HashMap<&str, &Rule> =
            rules.iter().map(|rule| (rule.id.as_str(), rule)).collect();
        let mut done = ledger.clone();
        let mut actions_taken = Vec::new();

        for rule_id in matched_ids {
            let rule = match by_id.get(rule_id.as_str()) {
                Some(rule) => rule,
                None => {
                    log::warn!(
                        "matched rule '{rule_id}' not present in rule list, skipping its actions"
                    );
                    continue;
                }
            };

            for action in &rule.actions {
                let kind = action.kind();

                if done.contains(rule_id, kind) {
                    log::info!(
                        "email {}: {kind} for rule '{rule_id}' already succeeded, skipping",
                        analyzed.id
                    );
                    actions_taken.push(ActionRecord {
                        rule_id: rule_id.clone(),
                        action_type: kind,
                        outcome: ActionOutcome::Success,
                        error_detail: None,
                    });
                    continue;
                }

                let record = match Self::dispatch(sink, &analyzed.id, action) {
                    Ok(()) => {
                        done.record(rule_id, kind);
                        ActionRecord {
                            rule_id: rule_id.clone(),
                            action_type: kind,
                            outcome: ActionOutcome::Success,
                            error_detail: None,
                        }
                    }
                    Err(e) => {
                        log::warn!(
                            "email {}: {kind} for rule '{rule_id}' failed: {e:#}",
                            analyzed.id
                        );
                        ActionRecord {
                            rule_id: rule_id.clone(),
                            action_type: kind,
                            outcome: ActionOutcome::Failed,
                            error_detail: Some(format!("{e:#}")),
                        }
                    }
                };
                actions_taken.push(record);
            }
        }

        MatchResult {
            matched_rules: matched_ids.to_vec(),
            actions_taken,
        }
    }

    fn dispatch(sink: &dyn ActionSink, email_id: &str, action: &RuleAction) -> anyhow::Result<()> {
        match action {
            RuleAction::MarkAsReviewed => sink.mark_as_reviewed(email_id),
            RuleAction::AddLabel { label } => sink.add_label(email_id, label),
            RuleAction::MoveToFolder { folder } => sink.move_to_folder(email_id, folder),
            RuleAction::SendReportNow => sink.send_report_now(email_id),
            RuleAction::NotifyUser { channel } => sink.notify_user(email_id, channel),
            RuleAction::IncreaseRetention { days } => sink.increase_retention(email_id, *days),
            RuleAction::DeleteEmail => sink.delete_email(email_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::FactMap;
    use crate::scoring::{FactorScores, Severity};
    use std::sync::Mutex;

    /// Records every call; optionally fails specific action kinds.
    #[derive(Default)]
    struct MockSink {
        calls: Mutex<Vec<String>>,
        fail_kinds: Vec<ActionKind>,
    }

    impl MockSink {
        fn failing(kinds: &[ActionKind]) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_kinds: kinds.to_vec(),
            }
        }

        fn record(&self, kind: ActionKind, detail: &str) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(format!("{kind}:{detail}"));
            if self.fail_kinds.contains(&kind) {
                anyhow::bail!("sink rejected {kind}");
            }
            Ok(())
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl ActionSink for MockSink {
        fn mark_as_reviewed(&self, email_id: &str) -> anyhow::Result<()> {
            self.record(ActionKind::MarkAsReviewed, email_id)
        }
        fn add_label(&self, email_id: &str, label: &str) -> anyhow::Result<()> {
            self.record(ActionKind::AddLabel, &format!("{email_id}/{label}"))
        }
        fn move_to_folder(&self, email_id: &str, folder: &str) -> anyhow::Result<()> {
            self.record(ActionKind::MoveToFolder, &format!("{email_id}/{folder}"))
        }
        fn send_report_now(&self, email_id: &str) -> anyhow::Result<()> {
            self.record(ActionKind::SendReportNow, email_id)
        }
        fn notify_user(&self, email_id: &str, channel: &str) -> anyhow::Result<()> {
            self.record(ActionKind::NotifyUser, &format!("{email_id}/{channel}"))
        }
        fn increase_retention(&self, email_id: &str, days: u32) -> anyhow::Result<()> {
            self.record(ActionKind::IncreaseRetention, &format!("{email_id}/{days}"))
        }
        fn delete_email(&self, email_id: &str) -> anyhow::Result<()> {
            self.record(ActionKind::DeleteEmail, email_id)
        }
    }

    fn analyzed() -> AnalyzedEmail {
        AnalyzedEmail {
            id: "msg-1".to_string(),
            facts: FactMap::new(),
            factor_scores: FactorScores::default(),
            risk_score: 80,
            severity: Severity::High,
        }
    }

    fn rule_with_actions(id: &str, actions: Vec<RuleAction>) -> Rule {
        Rule {
            id: id.to_string(),
            owner_id: "u1".to_string(),
            name: String::new(),
            enabled: true,
            priority: 50,
            conditions: Vec::new(),
            actions,
        }
    }

    #[test]
    fn test_actions_run_in_declared_order() {
        let rules = vec![rule_with_actions(
            "r1",
            vec![
                RuleAction::AddLabel {
                    label: "spam".to_string(),
                },
                RuleAction::MoveToFolder {
                    folder: "Junk".to_string(),
                },
            ],
        )];
        let sink = MockSink::default();

        let result = ActionExecutor::execute(
            &analyzed(),
            &["r1".to_string()],
            &rules,
            &sink,
            &IdempotencyLedger::new(),
        );

        let calls = sink.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec!["addLabel:msg-1/spam".to_string(), "moveToFolder:msg-1/Junk".to_string()]
        );
        assert_eq!(result.actions_taken.len(), 2);
        assert!(result
            .actions_taken
            .iter()
            .all(|record| record.outcome == ActionOutcome::Success));
    }

    #[test]
    fn test_partial_failure_does_not_abort_siblings() {
        let rules = vec![rule_with_actions(
            "r1",
            vec![
                RuleAction::AddLabel {
                    label: "spam".to_string(),
                },
                RuleAction::SendReportNow,
                RuleAction::MarkAsReviewed,
            ],
        )];
        let sink = MockSink::failing(&[ActionKind::SendReportNow]);

        let result = ActionExecutor::execute(
            &analyzed(),
            &["r1".to_string()],
            &rules,
            &sink,
            &IdempotencyLedger::new(),
        );

        // All three were attempted
        assert_eq!(sink.call_count(), 3);
        assert_eq!(result.actions_taken.len(), 3);
        assert_eq!(result.actions_taken[0].outcome, ActionOutcome::Success);
        assert_eq!(result.actions_taken[1].outcome, ActionOutcome::Failed);
        assert!(result.actions_taken[1]
            .error_detail
            .as_deref()
            .unwrap()
            .contains("sink rejected"));
        assert_eq!(result.actions_taken[2].outcome, ActionOutcome::Success);
    }

    #[test]
    fn test_failure_in_one_rule_does_not_block_next_rule() {
        let rules = vec![
            rule_with_actions("r1", vec![RuleAction::DeleteEmail]),
            rule_with_actions("r2", vec![RuleAction::MarkAsReviewed]),
        ];
        let sink = MockSink::failing(&[ActionKind::DeleteEmail]);

        let result = ActionExecutor::execute(
            &analyzed(),
            &["r1".to_string(), "r2".to_string()],
            &rules,
            &sink,
            &IdempotencyLedger::new(),
        );

        assert_eq!(result.actions_taken.len(), 2);
        assert_eq!(result.actions_taken[0].outcome, ActionOutcome::Failed);
        assert_eq!(result.actions_taken[1].outcome, ActionOutcome::Success);
    }

    #[test]
    fn test_second_pass_with_ledger_skips_successful_actions() {
        let rules = vec![rule_with_actions(
            "r1",
            vec![
                RuleAction::AddLabel {
                    label: "spam".to_string(),
                },
                RuleAction::SendReportNow,
            ],
        )];

        // First pass: sendReportNow fails
        let first_sink = MockSink::failing(&[ActionKind::SendReportNow]);
        let first = ActionExecutor::execute(
            &analyzed(),
            &["r1".to_string()],
            &rules,
            &first_sink,
            &IdempotencyLedger::new(),
        );
        assert_eq!(first_sink.call_count(), 2);

        // Second pass seeded with the first pass's ledger: only the failed
        // action is re-attempted.
        let second_sink = MockSink::default();
        let ledger = IdempotencyLedger::from_records(&first.actions_taken);
        let second = ActionExecutor::execute(
            &analyzed(),
            &["r1".to_string()],
            &rules,
            &second_sink,
            &ledger,
        );

        assert_eq!(second_sink.call_count(), 1);
        let calls = second_sink.calls.lock().unwrap();
        assert_eq!(*calls, vec!["sendReportNow:msg-1".to_string()]);

        // The skipped action is copied forward as success
        assert_eq!(second.actions_taken.len(), 2);
        assert!(second
            .actions_taken
            .iter()
            .all(|record| record.outcome == ActionOutcome::Success));
    }

    #[test]
    fn test_fully_successful_pass_is_a_no_op_when_rerun() {
        let rules = vec![rule_with_actions(
            "r1",
            vec![RuleAction::MarkAsReviewed, RuleAction::DeleteEmail],
        )];

        let first_sink = MockSink::default();
        let first = ActionExecutor::execute(
            &analyzed(),
            &["r1".to_string()],
            &rules,
            &first_sink,
            &IdempotencyLedger::new(),
        );

        let second_sink = MockSink::default();
        let ledger = IdempotencyLedger::from_records(&first.actions_taken);
        ActionExecutor::execute(&analyzed(), &["r1".to_string()], &rules, &second_sink, &ledger);

        assert_eq!(second_sink.call_count(), 0);
    }

    #[test]
    fn test_duplicate_action_kind_within_rule_fires_once() {
        let rules = vec![rule_with_actions(
            "r1",
            vec![RuleAction::SendReportNow, RuleAction::SendReportNow],
        )];
        let sink = MockSink::default();

        let result = ActionExecutor::execute(
            &analyzed(),
            &["r1".to_string()],
            &rules,
            &sink,
            &IdempotencyLedger::new(),
        );

        assert_eq!(sink.call_count(), 1);
        assert_eq!(result.actions_taken.len(), 2);
    }

    #[test]
    fn test_same_action_kind_in_different_rules_fires_per_rule() {
        let rules = vec![
            rule_with_actions("r1", vec![RuleAction::MarkAsReviewed]),
            rule_with_actions("r2", vec![RuleAction::MarkAsReviewed]),
        ];
        let sink = MockSink::default();

        ActionExecutor::execute(
            &analyzed(),
            &["r1".to_string(), "r2".to_string()],
            &rules,
            &sink,
            &IdempotencyLedger::new(),
        );

        // Idempotency keys on (rule, kind), not kind alone
        assert_eq!(sink.call_count(), 2);
    }

    #[test]
    fn test_stale_matched_id_is_skipped() {
        let rules = vec![rule_with_actions("r1", vec![RuleAction::MarkAsReviewed])];
        let sink = MockSink::default();

        let result = ActionExecutor::execute(
            &analyzed(),
            &["gone".to_string(), "r1".to_string()],
            &rules,
            &sink,
            &IdempotencyLedger::new(),
        );

        assert_eq!(sink.call_count(), 1);
        assert_eq!(result.matched_rules, vec!["gone", "r1"]);
        assert_eq!(result.actions_taken.len(), 1);
    }
}
