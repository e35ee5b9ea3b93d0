use crate::scoring::{ScoringWeights, SeverityThresholds, WEIGHT_SUM_TOLERANCE};
use serde::{Deserialize, Serialize};

/// Engine configuration: aggregation weights, severity thresholds and the
/// fixed tables the extractors score against. Swappable without code
/// change, but validated once at engine construction; an invalid config
/// is fatal and never serves an evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default)]
    pub thresholds: SeverityThresholds,
    #[serde(default = "default_suspicious_tlds")]
    pub suspicious_tlds: Vec<String>,
    #[serde(default = "default_shortener_domains")]
    pub shortener_domains: Vec<String>,
    #[serde(default)]
    pub extension_risk: ExtensionRiskConfig,
    #[serde(default = "default_urgency_phrases")]
    pub urgency_phrases: Vec<String>,
    #[serde(default = "default_credential_phrases")]
    pub credential_phrases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionRiskConfig {
    pub executable: Vec<String>,
    pub macro_document: Vec<String>,
    pub archive: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("factor weights sum to {sum}, expected 1.0")]
    WeightSum { sum: f64 },
    #[error(
        "severity thresholds must be strictly increasing, got medium={medium} high={high} critical={critical}"
    )]
    ThresholdOrder { medium: u8, high: u8, critical: u8 },
    #[error("{table} table is empty")]
    EmptyTable { table: &'static str },
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            thresholds: SeverityThresholds::default(),
            suspicious_tlds: default_suspicious_tlds(),
            shortener_domains: default_shortener_domains(),
            extension_risk: ExtensionRiskConfig::default(),
            urgency_phrases: default_urgency_phrases(),
            credential_phrases: default_credential_phrases(),
        }
    }
}

impl Default for ExtensionRiskConfig {
    fn default() -> Self {
        let list = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            executable: list(&[
                "exe", "scr", "bat", "cmd", "com", "pif", "vbs", "js", "jse", "wsf", "jar",
                "msi", "hta", "ps1", "run",
            ]),
            macro_document: list(&["docm", "xlsm", "pptm", "dotm", "xlam", "ppam"]),
            archive: list(&["zip", "rar", "7z", "tar", "gz", "bz2", "iso", "img", "cab"]),
        }
    }
}

fn default_suspicious_tlds() -> Vec<String> {
    ["tk", "ml", "ga", "cf", "icu", "top", "shop", "fun", "site", "lat", "cc", "ws", "biz"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_shortener_domains() -> Vec<String> {
    [
        "bit.ly", "tinyurl.com", "goo.gl", "t.co", "ow.ly", "is.gd", "buff.ly", "rb.gy",
        "cutt.ly", "tiny.cc",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_urgency_phrases() -> Vec<String> {
    [
        "urgent",
        "immediate action",
        "act now",
        "limited time",
        "expires today",
        "final notice",
        "last warning",
        "within 24 hours",
        "account will be closed",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_credential_phrases() -> Vec<String> {
    [
        "verify your account",
        "confirm your identity",
        "account suspended",
        "unusual activity",
        "update your password",
        "re-enter your credentials",
        "unlock your account",
        "validate your account",
        "confirm your payment details",
        "sign in to restore access",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl EngineConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum { sum });
        }

        let t = &self.thresholds;
        if !(t.medium < t.high && t.high < t.critical) {
            return Err(ConfigError::ThresholdOrder {
                medium: t.medium,
                high: t.high,
                critical: t.critical,
            });
        }

        if self.suspicious_tlds.is_empty() {
            return Err(ConfigError::EmptyTable {
                table: "suspicious_tlds",
            });
        }
        if self.shortener_domains.is_empty() {
            return Err(ConfigError::EmptyTable {
                table: "shortener_domains",
            });
        }
        if self.urgency_phrases.is_empty() {
            return Err(ConfigError::EmptyTable {
                table: "urgency_phrases",
            });
        }
        if self.credential_phrases.is_empty() {
            return Err(ConfigError::EmptyTable {
                table: "credential_phrases",
            });
        }

        Ok(())
    }
}
