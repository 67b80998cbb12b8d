//! Fleet Batch - score every catalogued source and rank by risk
//!
//! The export CSV is the only persisted output; it is written after the whole
//! batch has been scored.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use crate::error::{ScoringError, ScoringResult};
use crate::logic::catalog::Catalog;
use crate::logic::model::PackLoader;

use super::{RiskEngine, RiskRecord};

/// Outcome of a fleet run
#[derive(Debug, Clone, Default)]
pub struct FleetReport {
    /// Sorted by risk, highest first
    pub records: Vec<RiskRecord>,
    /// Units in the catalog with no registered threshold
    pub skipped_units: Vec<String>,
    /// Sources whose scoring window was empty
    pub empty_sources: Vec<String>,
}

impl FleetReport {
    pub fn top(&self, n: usize) -> &[RiskRecord] {
        &self.records[..n.min(self.records.len())]
    }
}

/// Highest risk first; ties by unit, then source
fn rank(a: &RiskRecord, b: &RiskRecord) -> Ordering {
    b.risk_score
        .total_cmp(&a.risk_score)
        .then_with(|| a.unit_id.cmp(&b.unit_id))
        .then_with(|| a.source_ref.cmp(&b.source_ref))
}

impl<L: PackLoader> RiskEngine<L> {
    /// Score every source in the catalog over the configured lookback
    pub fn score_fleet(&self) -> ScoringResult<FleetReport> {
        let thresholds = self.load_thresholds()?;
        let catalog = Catalog::load(&self.config.index_csv)?;
        let resolver = self.resolver(self.config.lookback());

        log::info!(
            "Fleet run: {} sources, {} units with thresholds",
            catalog.len(),
            thresholds.len()
        );

        let mut report = FleetReport::default();

        for entry in catalog.entries() {
            let Some(threshold) = thresholds.get(&entry.unit_id) else {
                log::debug!("Skipping '{}': no threshold registered", entry.unit_id);
                if !report.skipped_units.contains(&entry.unit_id) {
                    report.skipped_units.push(entry.unit_id.clone());
                }
                continue;
            };

            let pack = self.models.get(&entry.unit_id)?;

            match self.score_source(&pack, &entry.source_ref, threshold, &resolver) {
                Ok(scored) => {
                    let record = scored.record(&entry.unit_id, &entry.source_ref, threshold);
                    log::debug!(
                        "'{}' ({}): risk={:.1} n={}",
                        record.unit_id,
                        record.source_ref,
                        record.risk_score,
                        record.n_points_scored
                    );
                    report.records.push(record);
                }
                Err(ScoringError::EmptyWindow { unit_id, source_ref }) => {
                    log::warn!("Skipping '{}' ({}): empty scoring window", unit_id, source_ref);
                    report.empty_sources.push(source_ref);
                }
                Err(e) => return Err(e),
            }
        }

        report.records.sort_by(rank);
        report.skipped_units.sort();

        log::info!(
            "Fleet run scored {} sources ({} units skipped, {} empty windows)",
            report.records.len(),
            report.skipped_units.len(),
            report.empty_sources.len()
        );
        Ok(report)
    }
}

// ============================================================================
// EXPORT
// ============================================================================

/// Write records to CSV, replacing any previous export
pub fn export_fleet_risk(records: &[RiskRecord], path: &Path) -> ScoringResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ScoringError::io(parent, e))?;
    }

    let mut wtr = csv::Writer::from_path(path)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush().map_err(|e| ScoringError::io(path, e))?;

    log::info!("Exported {} fleet risk rows to {}", records.len(), path.display());
    Ok(())
}

/// A previous fleet export, used to resolve assets to sources
#[derive(Debug, Clone, Default)]
pub struct FleetRiskTable {
    records: Vec<RiskRecord>,
}

impl FleetRiskTable {
    pub fn load(path: &Path) -> ScoringResult<Self> {
        if !path.exists() {
            return Err(ScoringError::ConfigurationMissing {
                what: "fleet risk export",
                path: path.to_path_buf(),
            });
        }

        let mut rdr = csv::Reader::from_path(path)?;
        let records = rdr
            .deserialize::<RiskRecord>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { records })
    }

    pub fn records(&self) -> &[RiskRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Source of the first row matching unit and asset
    pub fn find_source(&self, unit_id: &str, asset_id: &str) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.unit_id == unit_id && r.asset_id == asset_id)
            .map(|r| r.source_ref.as_str())
    }
}
