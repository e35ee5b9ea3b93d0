use crate::analyzer::AnalyzedEmail;
use crate::facts::{names, FactMap, FactValue};
use crate::rules::{Condition, Operator, Rule};
use regex::Regex;
use std::collections::HashMap;

/// Evaluates user rules against an analyzed email. Regex patterns are
/// compiled once at construction; condition evaluation is total, so a
/// malformed or stale rule degrades to non-match instead of failing the
/// evaluation pass.
pub struct RuleMatcher {
    rules: Vec<Rule>,
    compiled_patterns: HashMap<String, Regex>,
}

impl RuleMatcher {
    pub fn new(rules: Vec<Rule>) -> Self {
        let mut compiled_patterns = HashMap::new();

        for rule in &rules {
            for condition in &rule.conditions {
                if condition.operator != Operator::MatchesRegex {
                    continue;
                }
                let pattern = match condition.value.as_text() {
                    Some(pattern) => pattern,
                    None => continue,
                };
                if compiled_patterns.contains_key(pattern) {
                    continue;
                }
                match Regex::new(pattern) {
                    Ok(regex) => {
                        compiled_patterns.insert(pattern.to_string(), regex);
                    }
                    Err(e) => {
                        // Save-time validation should have caught this;
                        // the condition will evaluate to non-match.
                        log::warn!(
                            "rule '{}': invalid regex pattern '{pattern}': {e}",
                            rule.id
                        );
                    }
                }
            }
        }

        Self {
            rules,
            compiled_patterns,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// All matching enabled rules, ordered by priority descending with
    /// ties broken by id ascending. The executor relies on this ordering
    /// being stable and reproducible.
    pub fn matches(&self, analyzed: &AnalyzedEmail) -> Vec<String> {
        let facts = Self::facts_with_pseudo(analyzed);

        let mut matched: Vec<&Rule> = self
            .rules
            .iter()
            .filter(|rule| self.rule_matches(rule, &facts))
            .collect();

        matched.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
        matched.iter().map(|rule| rule.id.clone()).collect()
    }

    /// riskScore and severity are injected as pseudo-facts so rules can
    /// reference them like any extracted field.
    fn facts_with_pseudo(analyzed: &AnalyzedEmail) -> FactMap {
        let mut facts = analyzed.facts.clone();
        facts.insert(names::RISK_SCORE, f64::from(analyzed.risk_score));
        facts.insert(names::SEVERITY, analyzed.severity.as_str());
        facts
    }

    fn rule_matches(&self, rule: &Rule, facts: &FactMap) -> bool {
        if !rule.enabled {
            return false;
        }
        // A rule without conditions is rejected at save time; a stale one
        // that slips through must not become match-everything.
        if rule.conditions.is_empty() {
            log::warn!("rule '{}' has no conditions, skipping", rule.id);
            return false;
        }

        let matches = rule
            .conditions
            .iter()
            .all(|condition| self.evaluate_condition(rule, condition, facts));
        log::debug!("rule '{}' evaluation result: {matches}", rule.id);
        matches
    }

    fn evaluate_condition(&self, rule: &Rule, condition: &Condition, facts: &FactMap) -> bool {
        let actual = match facts.get(&condition.field) {
            Some(actual) => actual,
            None => {
                log::debug!(
                    "rule '{}': fact '{}' is unknown, condition does not match",
                    rule.id,
                    condition.field
                );
                return false;
            }
        };

        match condition.operator {
            Operator::Equals => values_equal(actual, &condition.value),
            Operator::NotEquals => !values_equal(actual, &condition.value),
            Operator::GreaterThan => compare_numbers(actual, &condition.value, |a, b| a > b),
            Operator::LessThan => compare_numbers(actual, &condition.value, |a, b| a < b),
            Operator::GreaterOrEqual => compare_numbers(actual, &condition.value, |a, b| a >= b),
            Operator::LessOrEqual => compare_numbers(actual, &condition.value, |a, b| a <= b),
            Operator::Contains => evaluate_contains(actual, &condition.value),
            Operator::MatchesRegex => self.evaluate_regex(rule, actual, &condition.value),
        }
    }

    fn evaluate_regex(&self, rule: &Rule, actual: &FactValue, expected: &FactValue) -> bool {
        let (text, pattern) = match (actual.as_text(), expected.as_text()) {
            (Some(text), Some(pattern)) => (text, pattern),
            _ => return false,
        };
        match self.compiled_patterns.get(pattern) {
            Some(regex) => regex.is_match(text),
            None => {
                log::debug!("rule '{}': pattern '{pattern}' unavailable", rule.id);
                false
            }
        }
    }
}

fn values_equal(actual: &FactValue, expected: &FactValue) -> bool {
    match (actual, expected) {
        (FactValue::Bool(a), FactValue::Bool(b)) => a == b,
        (FactValue::Number(a), FactValue::Number(b)) => a == b,
        (FactValue::Text(a), FactValue::Text(b)) => a == b,
        (FactValue::TextSet(a), FactValue::TextSet(b)) => {
            let mut a = a.clone();
            let mut b = b.clone();
            a.sort();
            b.sort();
            a == b
        }
        _ => false,
    }
}

fn compare_numbers(actual: &FactValue, expected: &FactValue, cmp: fn(f64, f64) -> bool) -> bool {
    match (actual.as_number(), expected.as_number()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

/// Substring on text facts, membership on set facts.
fn evaluate_contains(actual: &FactValue, expected: &FactValue) -> bool {
    match (actual, expected) {
        (FactValue::Text(haystack), FactValue::Text(needle)) => haystack.contains(needle),
        (FactValue::TextSet(set), FactValue::Text(member)) => set.contains(member),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleAction;
    use crate::scoring::{FactorScores, Severity};

    fn analyzed_email() -> AnalyzedEmail {
        let mut facts = FactMap::new();
        facts.insert(names::SENDER_DOMAIN, "secure-login.tk");
        facts.insert(names::SUBJECT, "Invoice overdue");
        facts.insert(names::HAS_ATTACHMENT, true);
        facts.insert(names::URL_COUNT, 3u32);
        facts.insert(
            names::KEYWORD_MATCHES,
            vec!["act now".to_string(), "final notice".to_string()],
        );

        AnalyzedEmail {
            id: "msg-1".to_string(),
            facts,
            factor_scores: FactorScores::default(),
            risk_score: 72,
            severity: Severity::High,
        }
    }

    fn rule(id: &str, priority: u8, conditions: Vec<Condition>) -> Rule {
        Rule {
            id: id.to_string(),
            owner_id: "u1".to_string(),
            name: String::new(),
            enabled: true,
            priority,
            conditions,
            actions: vec![RuleAction::MarkAsReviewed],
        }
    }

    fn condition(field: &str, operator: Operator, value: FactValue) -> Condition {
        Condition {
            field: field.to_string(),
            operator,
            value,
        }
    }

    fn risk_above(threshold: f64) -> Condition {
        condition(
            names::RISK_SCORE,
            Operator::GreaterOrEqual,
            FactValue::Number(threshold),
        )
    }

    #[test]
    fn test_priority_ordering_with_id_tiebreak() {
        let rules = vec![
            rule("A", 10, vec![risk_above(0.0)]),
            rule("D", 5, vec![risk_above(0.0)]),
            rule("C", 50, vec![risk_above(0.0)]),
            rule("B", 50, vec![risk_above(0.0)]),
        ];
        let matcher = RuleMatcher::new(rules);

        let matched = matcher.matches(&analyzed_email());
        assert_eq!(matched, vec!["B", "C", "A", "D"]);
    }

    #[test]
    fn test_all_conditions_must_hold() {
        let matcher = RuleMatcher::new(vec![rule(
            "r1",
            10,
            vec![
                condition(
                    names::SEVERITY,
                    Operator::Equals,
                    FactValue::Text("high".to_string()),
                ),
                condition(names::HAS_ATTACHMENT, Operator::Equals, FactValue::Bool(false)),
            ],
        )]);

        assert!(matcher.matches(&analyzed_email()).is_empty());
    }

    #[test]
    fn test_pseudo_facts_are_matchable() {
        let matcher = RuleMatcher::new(vec![
            rule("by-score", 10, vec![risk_above(70.0)]),
            rule(
                "by-severity",
                20,
                vec![condition(
                    names::SEVERITY,
                    Operator::Equals,
                    FactValue::Text("high".to_string()),
                )],
            ),
        ]);

        let matched = matcher.matches(&analyzed_email());
        assert_eq!(matched, vec!["by-severity", "by-score"]);
    }

    #[test]
    fn test_disabled_rule_never_matches() {
        let mut disabled = rule("r1", 10, vec![risk_above(0.0)]);
        disabled.enabled = false;
        let matcher = RuleMatcher::new(vec![disabled]);

        assert!(matcher.matches(&analyzed_email()).is_empty());
    }

    #[test]
    fn test_zero_condition_rule_never_matches() {
        let empty = rule("r1", 10, vec![]);
        let matcher = RuleMatcher::new(vec![empty]);

        assert!(matcher.matches(&analyzed_email()).is_empty());
    }

    #[test]
    fn test_unknown_fact_is_non_match_even_for_not_equals() {
        let matcher = RuleMatcher::new(vec![rule(
            "r1",
            10,
            vec![condition(
                names::DOMAIN_AGE_DAYS,
                Operator::NotEquals,
                FactValue::Number(30.0),
            )],
        )]);

        // domainAgeDays is absent from the analyzed facts
        assert!(matcher.matches(&analyzed_email()).is_empty());
    }

    #[test]
    fn test_numeric_operator_on_text_fact_is_non_match_not_crash() {
        let matcher = RuleMatcher::new(vec![rule(
            "stale",
            10,
            vec![condition(
                names::SENDER_DOMAIN,
                Operator::GreaterThan,
                FactValue::Number(10.0),
            )],
        )]);

        assert!(matcher.matches(&analyzed_email()).is_empty());
    }

    #[test]
    fn test_contains_substring_and_set_membership() {
        let matcher = RuleMatcher::new(vec![
            rule(
                "substr",
                10,
                vec![condition(
                    names::SUBJECT,
                    Operator::Contains,
                    FactValue::Text("overdue".to_string()),
                )],
            ),
            rule(
                "member",
                20,
                vec![condition(
                    names::KEYWORD_MATCHES,
                    Operator::Contains,
                    FactValue::Text("act now".to_string()),
                )],
            ),
        ]);

        let matched = matcher.matches(&analyzed_email());
        assert_eq!(matched, vec!["member", "substr"]);
    }

    #[test]
    fn test_regex_condition() {
        let matcher = RuleMatcher::new(vec![rule(
            "tk-domains",
            10,
            vec![condition(
                names::SENDER_DOMAIN,
                Operator::MatchesRegex,
                FactValue::Text(r"\.tk$".to_string()),
            )],
        )]);

        assert_eq!(matcher.matches(&analyzed_email()), vec!["tk-domains"]);
    }

    #[test]
    fn test_invalid_regex_degrades_to_non_match() {
        let matcher = RuleMatcher::new(vec![rule(
            "broken",
            10,
            vec![condition(
                names::SENDER_DOMAIN,
                Operator::MatchesRegex,
                FactValue::Text("([unclosed".to_string()),
            )],
        )]);

        assert!(matcher.matches(&analyzed_email()).is_empty());
    }

    #[test]
    fn test_match_order_is_reproducible() {
        let rules = vec![
            rule("r3", 30, vec![risk_above(0.0)]),
            rule("r1", 30, vec![risk_above(0.0)]),
            rule("r2", 60, vec![risk_above(0.0)]),
        ];
        let matcher = RuleMatcher::new(rules);
        let email = analyzed_email();

        let first = matcher.matches(&email);
        let second = matcher.matches(&email);
        assert_eq!(first, vec!["r2", "r1", "r3"]);
        assert_eq!(first, second);
    }
}
