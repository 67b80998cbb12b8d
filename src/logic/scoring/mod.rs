//! Scoring Module - single-unit scoring and the fleet batch driver
//!
//! Pipeline per source:
//! table -> window -> aligned matrix -> anomaly scores -> risk (+ contributors)

pub mod fleet;


use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_LOOKBACK_HOURS;
use crate::error::{ScoringError, ScoringResult};
use crate::logic::catalog::{read_source, source_path};
use crate::logic::config::ScoringConfig;
use crate::logic::explain::Contributor;
use crate::logic::features::{align_features, ScoringWindow, WindowResolver};
use crate::logic::model::{ModelCache, ModelPack, OnnxPackLoader, PackLoader, ThresholdRegistry};
use crate::logic::risk::{is_alert, RiskSummary};

pub use fleet::{export_fleet_risk, FleetReport, FleetRiskTable};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Risk for one scored source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    pub unit_id: String,
    pub source_ref: String,
    /// Asset id of the first row in the window
    pub asset_id: String,
    pub t_end: NaiveDateTime,
    pub lookback_hours: i64,
    pub risk_score: f64,
    pub alert_rate: f64,
    pub max_anomaly_score: f64,
    pub threshold: f64,
    pub n_points_scored: usize,
}

/// An alerting row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPoint {
    pub timestamp: NaiveDateTime,
    pub anomaly_score: f64,
}

fn default_lookback_hours() -> i64 {
    DEFAULT_LOOKBACK_HOURS
}

/// Single-unit scoring request. `source_ref` wins over `asset_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub unit_id: String,
    #[serde(default)]
    pub source_ref: Option<String>,
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,
}

impl ScoreRequest {
    pub fn for_source(unit_id: &str, source_ref: &str) -> Self {
        Self {
            unit_id: unit_id.to_string(),
            source_ref: Some(source_ref.to_string()),
            asset_id: None,
            lookback_hours: DEFAULT_LOOKBACK_HOURS,
        }
    }

    pub fn for_asset(unit_id: &str, asset_id: &str) -> Self {
        Self {
            unit_id: unit_id.to_string(),
            source_ref: None,
            asset_id: Some(asset_id.to_string()),
            lookback_hours: DEFAULT_LOOKBACK_HOURS,
        }
    }

    pub fn with_lookback_hours(mut self, hours: i64) -> Self {
        self.lookback_hours = hours;
        self
    }
}

/// Single-unit result: the record plus recent alerts and drift contributors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    #[serde(flatten)]
    pub record: RiskRecord,
    pub alerts_tail: Vec<AlertPoint>,
    pub top_contributors: Vec<Contributor>,
}

/// Intermediate result shared by single-unit and fleet scoring
struct ScoredWindow {
    window: ScoringWindow,
    scores: Vec<f64>,
    summary: RiskSummary,
}

impl ScoredWindow {
    fn record(&self, unit_id: &str, source_ref: &str, threshold: f64) -> RiskRecord {
        RiskRecord {
            unit_id: unit_id.to_string(),
            source_ref: source_ref.to_string(),
            asset_id: self.window.representative_asset().unwrap_or_default().to_string(),
            t_end: self.window.t_end,
            lookback_hours: self.window.lookback.num_hours(),
            risk_score: self.summary.risk_score,
            alert_rate: self.summary.alert_rate,
            max_anomaly_score: self.summary.max_anomaly_score,
            threshold,
            n_points_scored: self.scores.len(),
        }
    }

    /// Last `limit` alerting rows, oldest first
    fn alerts_tail(&self, threshold: f64, limit: usize) -> Vec<AlertPoint> {
        let alerts: Vec<AlertPoint> = self
            .window
            .table
            .timestamps()
            .iter()
            .zip(&self.scores)
            .filter(|(_, &score)| is_alert(score, threshold))
            .map(|(&timestamp, &anomaly_score)| AlertPoint { timestamp, anomaly_score })
            .collect();

        let skip = alerts.len().saturating_sub(limit);
        alerts.into_iter().skip(skip).collect()
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Scoring engine: configuration + model cache
pub struct RiskEngine<L = OnnxPackLoader> {
    config: ScoringConfig,
    models: ModelCache<L>,
}

impl RiskEngine<OnnxPackLoader> {
    /// Engine loading ONNX packs from `config.model_dir`
    pub fn from_config(config: ScoringConfig) -> Self {
        let loader = OnnxPackLoader::new(config.model_dir.clone());
        Self::with_loader(config, loader)
    }
}

impl<L: PackLoader> RiskEngine<L> {
    pub fn with_loader(config: ScoringConfig, loader: L) -> Self {
        let models = ModelCache::new(loader, config.model_cache_capacity);
        Self { config, models }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn models(&self) -> &ModelCache<L> {
        &self.models
    }

    pub fn load_thresholds(&self) -> ScoringResult<ThresholdRegistry> {
        ThresholdRegistry::load(&self.config.thresholds_path)
    }

    fn resolver(&self, lookback: Duration) -> WindowResolver {
        WindowResolver::new(lookback)
            .with_max_points(self.config.max_points)
            .with_seed(self.config.sample_seed)
    }

    /// Score one unit's source with full detail
    pub fn score(&self, request: &ScoreRequest) -> ScoringResult<ScoreResponse> {
        let thresholds = self.load_thresholds()?;
        let threshold = thresholds.require(&request.unit_id)?;

        let pack = self.models.get(&request.unit_id)?;
        let source_ref = self.resolve_source(request)?;

        let lookback = Duration::try_hours(request.lookback_hours).ok_or_else(|| {
            ScoringError::InvalidRequest(format!(
                "lookback_hours out of range: {}",
                request.lookback_hours
            ))
        })?;
        let resolver = self.resolver(lookback);
        let scored = self.score_source(&pack, &source_ref, threshold, &resolver)?;

        let record = scored.record(&request.unit_id, &source_ref, threshold);
        let alerts_tail = scored.alerts_tail(threshold, self.config.alerts_tail);
        let top_contributors = self.config.drift.top_contributors(
            &scored.window.table,
            pack.features(),
            scored.window.t_end,
        );

        log::info!(
            "Scored '{}' ({}): risk={:.1} alert_rate={:.3} n={}",
            record.unit_id,
            record.source_ref,
            record.risk_score,
            record.alert_rate,
            record.n_points_scored
        );

        Ok(ScoreResponse {
            record,
            alerts_tail,
            top_contributors,
        })
    }

    /// Explicit source, else asset lookup in the last fleet export
    fn resolve_source(&self, request: &ScoreRequest) -> ScoringResult<String> {
        if let Some(source_ref) = &request.source_ref {
            return Ok(source_ref.clone());
        }

        let asset_id = request.asset_id.as_deref().ok_or_else(|| {
            ScoringError::InvalidRequest("provide either source_ref or asset_id".to_string())
        })?;

        let fleet = FleetRiskTable::load(&self.config.fleet_risk_csv)?;
        fleet
            .find_source(&request.unit_id, asset_id)
            .map(str::to_string)
            .ok_or_else(|| ScoringError::AssetNotResolved {
                unit_id: request.unit_id.clone(),
                asset_id: asset_id.to_string(),
            })
    }

    /// Read, window, align, score and aggregate one source
    fn score_source(
        &self,
        pack: &Arc<ModelPack>,
        source_ref: &str,
        threshold: f64,
        resolver: &WindowResolver,
    ) -> ScoringResult<ScoredWindow> {
        let unit_id = pack.unit_id();
        let path = source_path(&self.config.data_dir, source_ref);
        if !path.exists() {
            return Err(ScoringError::SourceNotFound {
                unit_id: unit_id.to_string(),
                path,
            });
        }

        let table = read_source(&path, Some(pack.features()))?.sort_by_timestamp();

        let window = resolver
            .resolve(&table)
            .map_err(|_| ScoringError::EmptyWindow {
                unit_id: unit_id.to_string(),
                source_ref: source_ref.to_string(),
            })?;

        if window.was_sampled() {
            log::debug!(
                "'{}' ({}): window downsampled {} -> {} rows",
                unit_id,
                source_ref,
                window.rows_in_window,
                window.len()
            );
        }

        let aligned = align_features(&window.table, pack.features());
        let scores = pack.score(&aligned)?;
        let summary = self.config.risk.compute(&scores, threshold);

        Ok(ScoredWindow {
            window,
            scores,
            summary,
        })
    }
}
