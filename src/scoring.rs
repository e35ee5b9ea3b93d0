//! Factor scorers and the weighted aggregator. Every scorer is a pure
//! function of the fact map, returns 0-100, and has an explicit rule for
//! the unknown case instead of silently defaulting to zero risk.

use crate::facts::{names, FactMap};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

// Header factor: failure weights per mechanism. An unknown verdict
// contributes half its failure weight.
const DMARC_FAIL_WEIGHT: i32 = 40;
const SPF_FAIL_WEIGHT: i32 = 25;
const DKIM_FAIL_WEIGHT: i32 = 20;
const MISMATCH_WEIGHT: i32 = 15;

// Domain factor fallback when WHOIS age is unknown: genuine uncertainty,
// not safety.
const UNKNOWN_AGE_SCORE: i32 = 50;

// Attachment factor: per-attachment weight by extension risk class.
const EXECUTABLE_WEIGHT: u32 = 60;
const MACRO_DOC_WEIGHT: u32 = 40;
const ARCHIVE_WEIGHT: u32 = 25;
const OTHER_ATTACHMENT_WEIGHT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Factor {
    Header,
    Url,
    Domain,
    Attachment,
    Content,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::Header,
        Factor::Url,
        Factor::Domain,
        Factor::Attachment,
        Factor::Content,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::Header => "header",
            Factor::Url => "url",
            Factor::Domain => "domain",
            Factor::Attachment => "attachment",
            Factor::Content => "content",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-scores of the five factors, each 0-100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorScores {
    pub header: u8,
    pub url: u8,
    pub domain: u8,
    pub attachment: u8,
    pub content: u8,
}

impl FactorScores {
    pub fn get(&self, factor: Factor) -> u8 {
        match factor {
            Factor::Header => self.header,
            Factor::Url => self.url,
            Factor::Domain => self.domain,
            Factor::Attachment => self.attachment,
            Factor::Content => self.content,
        }
    }
}

/// Aggregation weights. Must sum to 1.0 within tolerance; validated at
/// engine construction, never at evaluation time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub header: f64,
    pub url: f64,
    pub domain: f64,
    pub attachment: f64,
    pub content: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            header: 0.35,
            url: 0.30,
            domain: 0.15,
            attachment: 0.10,
            content: 0.10,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.header + self.url + self.domain + self.attachment + self.content
    }
}

/// Lower bounds of the medium/high/critical bands. Must be strictly
/// increasing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub medium: u8,
    pub high: u8,
    pub critical: u8,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            medium: 40,
            high: 70,
            critical: 90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contribution of one tri-state auth verdict: full weight on fail, half
/// weight on unknown (uncertainty is penalized without being treated as
/// proven-malicious), nothing on pass. A missing fact reads as unknown.
fn auth_contribution(facts: &FactMap, fact_name: &str, fail_weight: i32) -> i32 {
    match facts.text_fact(fact_name) {
        Some("pass") => 0,
        Some("fail") => fail_weight,
        _ => fail_weight / 2,
    }
}

pub fn score_header(facts: &FactMap) -> u8 {
    let mut score = 0i32;
    score += auth_contribution(facts, names::DMARC_RESULT, DMARC_FAIL_WEIGHT);
    score += auth_contribution(facts, names::SPF_RESULT, SPF_FAIL_WEIGHT);
    score += auth_contribution(facts, names::DKIM_RESULT, DKIM_FAIL_WEIGHT);

    let mismatch = facts.bool_fact(names::SENDER_DISPLAY_MISMATCH).unwrap_or(false)
        || facts.bool_fact(names::REPLY_TO_MISMATCH).unwrap_or(false);
    if mismatch {
        score += MISMATCH_WEIGHT;
    }

    score.clamp(0, 100) as u8
}

/// Saturating link score. Homograph and IP-literal links count into the
/// suspicious bucket; the per-link base applies only to links not already
/// counted as suspicious or shortener, so a single link is never charged
/// twice.
pub fn score_url(facts: &FactMap) -> u8 {
    let total = facts.count_fact(names::URL_COUNT);
    let suspicious = facts.count_fact(names::SUSPICIOUS_TLD_COUNT)
        + facts.count_fact(names::IP_LITERAL_URL_COUNT)
        + facts.count_fact(names::HOMOGRAPH_URL_COUNT);
    let shortener = facts.count_fact(names::SHORTENER_URL_COUNT);
    let plain = total.saturating_sub(suspicious + shortener);

    (20 * suspicious + 15 * shortener + 5 * plain).min(100) as u8
}

/// Inverse of domain age, banded. Unknown age scores the fixed mid-point.
pub fn score_domain(facts: &FactMap) -> u8 {
    let mut score = match facts.number_fact(names::DOMAIN_AGE_DAYS) {
        Some(age) if age <= 7.0 => 90,
        Some(age) if age <= 30.0 => 75,
        Some(age) if age <= 90.0 => 55,
        Some(age) if age <= 180.0 => 35,
        Some(age) if age <= 365.0 => 20,
        Some(_) => 10,
        None => UNKNOWN_AGE_SCORE,
    };

    if facts.bool_fact(names::REGISTRAR_FLAGGED).unwrap_or(false) {
        score += 10;
    }

    score.clamp(0, 100) as u8
}

pub fn score_attachment(facts: &FactMap) -> u8 {
    let count = facts.count_fact(names::ATTACHMENT_COUNT);
    if count == 0 {
        return 0;
    }

    let executable = facts.count_fact(names::ATTACHMENT_EXECUTABLE_COUNT);
    let macro_doc = facts.count_fact(names::ATTACHMENT_MACRO_DOC_COUNT);
    let archive = facts.count_fact(names::ATTACHMENT_ARCHIVE_COUNT);
    let other = count.saturating_sub(executable + macro_doc + archive);

    (EXECUTABLE_WEIGHT * executable
        + MACRO_DOC_WEIGHT * macro_doc
        + ARCHIVE_WEIGHT * archive
        + OTHER_ATTACHMENT_WEIGHT * other)
        .min(100) as u8
}

pub fn score_content(facts: &FactMap) -> u8 {
    let credential = facts.count_fact(names::CREDENTIAL_KEYWORD_HITS);
    let urgency = facts.count_fact(names::URGENCY_KEYWORD_HITS);

    (18 * credential + 12 * urgency).min(100) as u8
}

pub fn score_factors(facts: &FactMap) -> FactorScores {
    FactorScores {
        header: score_header(facts),
        url: score_url(facts),
        domain: score_domain(facts),
        attachment: score_attachment(facts),
        content: score_content(facts),
    }
}

fn round_half_up(value: f64) -> u8 {
    (value + 0.5).floor().clamp(0.0, 100.0) as u8
}

/// Weighted sum of the factor sub-scores, rounded half-up, plus the
/// severity band it falls in.
pub fn aggregate(
    scores: &FactorScores,
    weights: &ScoringWeights,
    thresholds: &SeverityThresholds,
) -> (u8, Severity) {
    let weighted = f64::from(scores.header) * weights.header
        + f64::from(scores.url) * weights.url
        + f64::from(scores.domain) * weights.domain
        + f64::from(scores.attachment) * weights.attachment
        + f64::from(scores.content) * weights.content;

    let risk_score = round_half_up(weighted);
    let severity = if risk_score >= thresholds.critical {
        Severity::Critical
    } else if risk_score >= thresholds.high {
        Severity::High
    } else if risk_score >= thresholds.medium {
        Severity::Medium
    } else {
        Severity::Low
    };

    (risk_score, severity)
}
