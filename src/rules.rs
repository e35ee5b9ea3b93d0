use crate::facts::FactValue;
use crate::fields::{FieldRegistry, FieldType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub const MAX_PRIORITY: u8 = 100;

/// User-owned filtering rule. Persisted externally; the engine only reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub owner_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 0-100, higher evaluated first. Ties are broken by id ascending.
    #[serde(default)]
    pub priority: u8,
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<RuleAction>,
}

fn default_enabled() -> bool {
    true
}

/// One condition of a rule. A rule matches iff all of its conditions are
/// true; there is no OR or nesting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: FactValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Contains,
    MatchesRegex,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "notEquals",
            Operator::GreaterThan => "greaterThan",
            Operator::LessThan => "lessThan",
            Operator::GreaterOrEqual => "greaterOrEqual",
            Operator::LessOrEqual => "lessOrEqual",
            Operator::Contains => "contains",
            Operator::MatchesRegex => "matchesRegex",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action attached to a rule. Execution is delegated to an
/// [`crate::executor::ActionSink`]; the engine only records outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuleAction {
    MarkAsReviewed,
    AddLabel { label: String },
    MoveToFolder { folder: String },
    SendReportNow,
    NotifyUser { channel: String },
    IncreaseRetention { days: u32 },
    DeleteEmail,
}

impl RuleAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            RuleAction::MarkAsReviewed => ActionKind::MarkAsReviewed,
            RuleAction::AddLabel { .. } => ActionKind::AddLabel,
            RuleAction::MoveToFolder { .. } => ActionKind::MoveToFolder,
            RuleAction::SendReportNow => ActionKind::SendReportNow,
            RuleAction::NotifyUser { .. } => ActionKind::NotifyUser,
            RuleAction::IncreaseRetention { .. } => ActionKind::IncreaseRetention,
            RuleAction::DeleteEmail => ActionKind::DeleteEmail,
        }
    }
}

/// Parameterless discriminant of [`RuleAction`], used as the idempotency
/// key together with the rule id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    MarkAsReviewed,
    AddLabel,
    MoveToFolder,
    SendReportNow,
    NotifyUser,
    IncreaseRetention,
    DeleteEmail,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::MarkAsReviewed => "markAsReviewed",
            ActionKind::AddLabel => "addLabel",
            ActionKind::MoveToFolder => "moveToFolder",
            ActionKind::SendReportNow => "sendReportNow",
            ActionKind::NotifyUser => "notifyUser",
            ActionKind::IncreaseRetention => "increaseRetention",
            ActionKind::DeleteEmail => "deleteEmail",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuleValidationError {
    #[error("rule '{rule_id}' has no conditions")]
    EmptyConditions { rule_id: String },
    #[error("rule '{rule_id}' priority {priority} is outside 0-100")]
    PriorityOutOfRange { rule_id: String, priority: u8 },
    #[error("duplicate rule id '{rule_id}'")]
    DuplicateId { rule_id: String },
    #[error("rule '{rule_id}' references unknown field '{field}'")]
    UnknownField { rule_id: String, field: String },
    #[error("rule '{rule_id}': operator {operator} is not legal for field '{field}'")]
    IllegalOperator {
        rule_id: String,
        field: String,
        operator: Operator,
    },
    #[error("rule '{rule_id}': condition value for '{field}' does not match the field type")]
    ValueTypeMismatch { rule_id: String, field: String },
    #[error("rule '{rule_id}': invalid regex '{pattern}': {source}")]
    InvalidRegex {
        rule_id: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Save-time validation against the field registry. The matcher does not
/// rely on this having run: a stale rule that slips through still degrades
/// to non-match at evaluation time.
pub fn validate_rule(rule: &Rule, registry: &FieldRegistry) -> Result<(), RuleValidationError> {
    if rule.conditions.is_empty() {
        return Err(RuleValidationError::EmptyConditions {
            rule_id: rule.id.clone(),
        });
    }
    if rule.priority > MAX_PRIORITY {
        return Err(RuleValidationError::PriorityOutOfRange {
            rule_id: rule.id.clone(),
            priority: rule.priority,
        });
    }

    for condition in &rule.conditions {
        let descriptor = registry.descriptor(&condition.field).ok_or_else(|| {
            RuleValidationError::UnknownField {
                rule_id: rule.id.clone(),
                field: condition.field.clone(),
            }
        })?;

        if !descriptor.operators.contains(&condition.operator) {
            return Err(RuleValidationError::IllegalOperator {
                rule_id: rule.id.clone(),
                field: condition.field.clone(),
                operator: condition.operator,
            });
        }

        if !value_compatible(descriptor.field_type, condition.operator, &condition.value) {
            return Err(RuleValidationError::ValueTypeMismatch {
                rule_id: rule.id.clone(),
                field: condition.field.clone(),
            });
        }

        if condition.operator == Operator::MatchesRegex {
            let pattern = condition.value.as_text().unwrap_or_default();
            if let Err(e) = regex::Regex::new(pattern) {
                return Err(RuleValidationError::InvalidRegex {
                    rule_id: rule.id.clone(),
                    pattern: pattern.to_string(),
                    source: e,
                });
            }
        }
    }

    Ok(())
}

pub fn validate_rules(rules: &[Rule], registry: &FieldRegistry) -> Result<(), RuleValidationError> {
    let mut seen = HashSet::new();
    for rule in rules {
        if !seen.insert(rule.id.as_str()) {
            return Err(RuleValidationError::DuplicateId {
                rule_id: rule.id.clone(),
            });
        }
        validate_rule(rule, registry)?;
    }
    Ok(())
}

/// Is this condition value usable with the field's type under the given
/// operator? `contains` on a set field takes a text value (membership);
/// everything else wants the field's own type.
fn value_compatible(field_type: FieldType, operator: Operator, value: &FactValue) -> bool {
    match (field_type, operator) {
        (FieldType::TextSet, Operator::Contains) => value.as_text().is_some(),
        (FieldType::Bool, _) => value.as_bool().is_some(),
        (FieldType::Number, _) => value.as_number().is_some(),
        (FieldType::Text, _) => value.as_text().is_some(),
        (FieldType::TextSet, _) => value.as_text_set().is_some(),
    }
}

/// Rule file wrapper for the CLI and tests. Persistence proper is the
/// caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let rule_set: RuleSet = serde_yaml::from_str(&content)?;
        validate_rules(&rule_set.rules, FieldRegistry::global())?;
        Ok(rule_set)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        RuleSet {
            rules: vec![
                Rule {
                    id: "quarantine-critical".to_string(),
                    owner_id: "system".to_string(),
                    name: "Quarantine critical-risk email".to_string(),
                    enabled: true,
                    priority: 90,
                    conditions: vec![Condition {
                        field: "severity".to_string(),
                        operator: Operator::Equals,
                        value: FactValue::Text("critical".to_string()),
                    }],
                    actions: vec![
                        RuleAction::MoveToFolder {
                            folder: "Quarantine".to_string(),
                        },
                        RuleAction::NotifyUser {
                            channel: "email".to_string(),
                        },
                    ],
                },
                Rule {
                    id: "flag-high-risk".to_string(),
                    owner_id: "system".to_string(),
                    name: "Label and queue high-risk email for review".to_string(),
                    enabled: true,
                    priority: 50,
                    conditions: vec![Condition {
                        field: "riskScore".to_string(),
                        operator: Operator::GreaterOrEqual,
                        value: FactValue::Number(70.0),
                    }],
                    actions: vec![
                        RuleAction::AddLabel {
                            label: "suspicious".to_string(),
                        },
                        RuleAction::MarkAsReviewed,
                    ],
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_with_condition(field: &str, operator: Operator, value: FactValue) -> Rule {
        Rule {
            id: "r1".to_string(),
            owner_id: "u1".to_string(),
            name: String::new(),
            enabled: true,
            priority: 10,
            conditions: vec![Condition {
                field: field.to_string(),
                operator,
                value,
            }],
            actions: vec![RuleAction::MarkAsReviewed],
        }
    }

    #[test]
    fn test_default_rule_set_passes_validation() {
        let rule_set = RuleSet::default();
        validate_rules(&rule_set.rules, FieldRegistry::global()).unwrap();
    }

    #[test]
    fn test_rule_without_conditions_is_rejected() {
        let mut rule = rule_with_condition(
            "riskScore",
            Operator::GreaterThan,
            FactValue::Number(50.0),
        );
        rule.conditions.clear();

        let err = validate_rule(&rule, FieldRegistry::global()).unwrap_err();
        assert!(matches!(err, RuleValidationError::EmptyConditions { .. }));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let rule = rule_with_condition("noSuchField", Operator::Equals, FactValue::Bool(true));
        let err = validate_rule(&rule, FieldRegistry::global()).unwrap_err();
        assert!(matches!(err, RuleValidationError::UnknownField { .. }));
    }

    #[test]
    fn test_ordering_operator_on_text_field_is_rejected() {
        let rule = rule_with_condition(
            "senderDomain",
            Operator::GreaterThan,
            FactValue::Text("example.com".to_string()),
        );
        let err = validate_rule(&rule, FieldRegistry::global()).unwrap_err();
        assert!(matches!(err, RuleValidationError::IllegalOperator { .. }));
    }

    #[test]
    fn test_value_type_mismatch_is_rejected() {
        let rule = rule_with_condition(
            "riskScore",
            Operator::GreaterThan,
            FactValue::Text("high".to_string()),
        );
        let err = validate_rule(&rule, FieldRegistry::global()).unwrap_err();
        assert!(matches!(err, RuleValidationError::ValueTypeMismatch { .. }));
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let rule = rule_with_condition(
            "subject",
            Operator::MatchesRegex,
            FactValue::Text("([unclosed".to_string()),
        );
        let err = validate_rule(&rule, FieldRegistry::global()).unwrap_err();
        assert!(matches!(err, RuleValidationError::InvalidRegex { .. }));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let rule = rule_with_condition("hasAttachment", Operator::Equals, FactValue::Bool(true));
        let rules = vec![rule.clone(), rule];
        let err = validate_rules(&rules, FieldRegistry::global()).unwrap_err();
        assert!(matches!(err, RuleValidationError::DuplicateId { .. }));
    }

    #[test]
    fn test_priority_above_limit_is_rejected() {
        let mut rule = rule_with_condition("hasAttachment", Operator::Equals, FactValue::Bool(true));
        rule.priority = 101;
        let err = validate_rule(&rule, FieldRegistry::global()).unwrap_err();
        assert!(matches!(err, RuleValidationError::PriorityOutOfRange { .. }));
    }

    #[test]
    fn test_membership_condition_on_set_field_is_accepted() {
        let rule = rule_with_condition(
            "keywordMatches",
            Operator::Contains,
            FactValue::Text("urgent".to_string()),
        );
        validate_rule(&rule, FieldRegistry::global()).unwrap();
    }

    #[test]
    fn test_action_yaml_uses_camel_case_tags() {
        let action = RuleAction::MoveToFolder {
            folder: "Quarantine".to_string(),
        };
        let yaml = serde_yaml::to_string(&action).unwrap();
        assert!(yaml.contains("moveToFolder"));

        let parsed: RuleAction = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, action);
    }

    #[test]
    fn test_rule_yaml_round_trip() {
        let rule_set = RuleSet::default();
        let yaml = serde_yaml::to_string(&rule_set).unwrap();
        let parsed: RuleSet = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(parsed.rules.len(), rule_set.rules.len());
        assert_eq!(parsed.rules[0].id, "quarantine-critical");
        assert_eq!(parsed.rules[0].actions[0].kind(), ActionKind::MoveToFolder);
    }
}
