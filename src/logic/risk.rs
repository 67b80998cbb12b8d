//! Risk Aggregator - score vector + threshold -> 0..100 risk index
//!
//! risk = 100 * (w_alert * alert_rate + w_severity * max_score / (threshold + eps)),
//! clamped to [0, 100]. The weights and epsilon are calibrated heuristics and
//! are kept as tunable policy.

use serde::{Deserialize, Serialize};

// ============================================================================
// CONSTANTS
// ============================================================================

const ALERT_WEIGHT: f64 = 0.7;
const SEVERITY_WEIGHT: f64 = 0.3;
const THRESHOLD_EPSILON: f64 = 1e-6;
const RISK_MAX: f64 = 100.0;

/// Blend weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    /// Weight of the sustained-abnormality term (alert rate)
    pub alert_weight: f64,
    /// Weight of the worst-case term (max score / threshold)
    pub severity_weight: f64,
    /// Added to the threshold before dividing
    pub epsilon: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            alert_weight: ALERT_WEIGHT,
            severity_weight: SEVERITY_WEIGHT,
            epsilon: THRESHOLD_EPSILON,
        }
    }
}

/// Aggregated risk for one score vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub risk_score: f64,
    pub alert_rate: f64,
    pub max_anomaly_score: f64,
}

impl RiskPolicy {
    pub fn compute(&self, scores: &[f64], threshold: f64) -> RiskSummary {
        let alert_rate = alert_rate(scores, threshold);
        let max_anomaly_score = max_score(scores);

        let raw = RISK_MAX
            * (self.alert_weight * alert_rate
                + self.severity_weight * (max_anomaly_score / (threshold + self.epsilon)));

        RiskSummary {
            risk_score: raw.clamp(0.0, RISK_MAX),
            alert_rate,
            max_anomaly_score,
        }
    }
}

/// Risk with the default blend
pub fn compute_risk(scores: &[f64], threshold: f64) -> RiskSummary {
    RiskPolicy::default().compute(scores, threshold)
}

/// A score at exactly the threshold alerts
pub fn is_alert(score: f64, threshold: f64) -> bool {
    score >= threshold
}

pub fn alert_mask(scores: &[f64], threshold: f64) -> Vec<bool> {
    scores.iter().map(|&s| is_alert(s, threshold)).collect()
}

/// Fraction of alerting scores; 0.0 for an empty vector
pub fn alert_rate(scores: &[f64], threshold: f64) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let alerts = scores.iter().filter(|&&s| is_alert(s, threshold)).count();
    alerts as f64 / scores.len() as f64
}

/// Largest score. NaN scores are ignored; 0.0 when nothing comparable is left
/// (empty or all-NaN vector), so the risk blend stays finite.
pub fn max_score(scores: &[f64]) -> f64 {
    scores
        .iter()
        .copied()
        .filter(|s| !s.is_nan())
        .reduce(f64::max)
        .unwrap_or(0.0)
}
