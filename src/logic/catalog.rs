//! Catalog - index of telemetry sources + CSV source reader
//!
//! The index has one row per source file. Source files are named
//! `<unit>__<dataset>.csv`; when the index has no `unit_id` column the unit is
//! taken from the file name.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::constants::SOURCE_UNIT_SEPARATOR;
use crate::error::{ScoringError, ScoringResult};
use crate::logic::features::table::{parse_timestamp, parse_value, TableBuilder};
use crate::logic::features::TimeSeriesTable;

/// Header names accepted for the timestamp column (after normalisation)
const TIMESTAMP_COLUMNS: &[&str] = &["timestamp", "time_stamp"];
const ASSET_COLUMN: &str = "asset_id";

// ============================================================================
// CATALOG
// ============================================================================

#[derive(Debug, Deserialize)]
struct IndexRow {
    #[serde(alias = "parquet_file")]
    source_file: String,
    #[serde(default, alias = "farm_id")]
    unit_id: Option<String>,
    #[serde(default)]
    asset_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub unit_id: String,
    pub dataset_id: String,
    pub source_ref: String,
    pub asset_id: Option<String>,
}

impl CatalogEntry {
    /// Entry for a `<unit>__<dataset>.csv` file name
    pub fn from_source_ref(source_ref: &str) -> Self {
        let (unit_id, dataset_id) = split_source_ref(source_ref);
        Self {
            unit_id,
            dataset_id,
            source_ref: source_ref.to_string(),
            asset_id: None,
        }
    }
}

/// `Wind_Farm_A__40.csv` -> (`Wind_Farm_A`, `40`)
pub fn split_source_ref(source_ref: &str) -> (String, String) {
    let file_name = Path::new(source_ref)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(source_ref);
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    match stem.split_once(SOURCE_UNIT_SEPARATOR) {
        Some((unit, dataset)) => (unit.to_string(), dataset.to_string()),
        None => (stem.to_string(), String::new()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Load the source index; a missing index is a configuration error
    pub fn load(path: &Path) -> ScoringResult<Self> {
        if !path.exists() {
            return Err(ScoringError::ConfigurationMissing {
                what: "source index",
                path: path.to_path_buf(),
            });
        }

        let mut rdr = csv::Reader::from_path(path)?;
        let mut entries = Vec::new();
        for row in rdr.deserialize::<IndexRow>() {
            let row = row?;
            let mut entry = CatalogEntry::from_source_ref(&row.source_file);
            if let Some(unit) = row.unit_id.filter(|u| !u.trim().is_empty()) {
                entry.unit_id = unit;
            }
            entry.asset_id = row.asset_id.filter(|a| !a.trim().is_empty());
            entries.push(entry);
        }

        log::debug!("Loaded catalog with {} sources from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn for_unit<'a>(&'a self, unit_id: &'a str) -> impl Iterator<Item = &'a CatalogEntry> + 'a {
        self.entries.iter().filter(move |e| e.unit_id == unit_id)
    }
}

// ============================================================================
// SOURCE READER
// ============================================================================

pub fn source_path(data_dir: &Path, source_ref: &str) -> PathBuf {
    data_dir.join(source_ref)
}

/// `Wind Speed ` -> `wind_speed`
fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Read a telemetry CSV. With `wanted`, only those feature columns are kept
/// (in that order, absent ones skipped) under the names given in `wanted`;
/// matching against headers is on normalised names. Rows whose timestamp does not parse
/// are dropped. The result is in file order.
pub fn read_source(path: &Path, wanted: Option<&[String]>) -> ScoringResult<TimeSeriesTable> {
    let file = File::open(path).map_err(|e| ScoringError::io(path, e))?;
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);

    let headers: Vec<String> = rdr.headers()?.iter().map(normalize_header).collect();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let ts_idx = TIMESTAMP_COLUMNS
        .iter()
        .find_map(|c| position(c))
        .ok_or_else(|| ScoringError::MalformedSource {
            path: path.to_path_buf(),
            reason: "no timestamp/time_stamp column".to_string(),
        })?;
    let asset_idx = position(ASSET_COLUMN);

    let feature_cols: Vec<(String, usize)> = match wanted {
        Some(names) => names
            .iter()
            .filter_map(|n| position(&normalize_header(n)).map(|i| (n.clone(), i)))
            .filter(|(_, i)| *i != ts_idx && Some(*i) != asset_idx)
            .collect(),
        None => headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != ts_idx && Some(*i) != asset_idx)
            .map(|(i, h)| (h.clone(), i))
            .collect(),
    };

    let mut builder = TableBuilder::new(feature_cols.iter().map(|(n, _)| n.clone()));
    let mut row_values = Vec::with_capacity(feature_cols.len());
    let mut dropped = 0usize;

    for record in rdr.records() {
        let record = record?;
        let Some(ts) = record.get(ts_idx).and_then(parse_timestamp) else {
            dropped += 1;
            continue;
        };
        let asset = asset_idx
            .and_then(|i| record.get(i))
            .map(str::trim)
            .unwrap_or("");

        row_values.clear();
        row_values.extend(
            feature_cols
                .iter()
                .map(|(_, i)| record.get(*i).map(parse_value).unwrap_or(f64::NAN)),
        );
        builder.push(ts, asset, &row_values);
    }

    if dropped > 0 {
        log::debug!("{}: dropped {} rows with unparsable timestamps", path.display(), dropped);
    }

    Ok(builder.build())
}

// ============================================================================
// CATALOG SUMMARY
// ============================================================================

/// Per-source overview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSummary {
    pub unit_id: String,
    pub dataset_id: String,
    pub source_ref: String,
    pub asset_id: Option<String>,
    pub n_rows: usize,
    pub ts_min: Option<NaiveDateTime>,
    pub ts_max: Option<NaiveDateTime>,
}

/// Row counts and time ranges for every catalogued source
pub fn describe_catalog(catalog: &Catalog, data_dir: &Path) -> ScoringResult<Vec<SourceSummary>> {
    let total = catalog.len();
    let mut summaries = Vec::with_capacity(total);

    for (i, entry) in catalog.entries().iter().enumerate() {
        let path = source_path(data_dir, &entry.source_ref);
        if !path.exists() {
            return Err(ScoringError::SourceNotFound {
                unit_id: entry.unit_id.clone(),
                path,
            });
        }

        let table = read_source(&path, Some(&[][..]))?;
        summaries.push(SourceSummary {
            unit_id: entry.unit_id.clone(),
            dataset_id: entry.dataset_id.clone(),
            source_ref: entry.source_ref.clone(),
            asset_id: entry
                .asset_id
                .clone()
                .or_else(|| table.asset_ids().first().cloned()),
            n_rows: table.len(),
            ts_min: table.t_min(),
            ts_max: table.t_max(),
        });

        if (i + 1) % 10 == 0 {
            log::info!("Cataloged {}/{} sources...", i + 1, total);
        }
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_split_source_ref() {
        assert_eq!(
            split_source_ref("Wind_Farm_A__40.csv"),
            ("Wind_Farm_A".to_string(), "40".to_string())
        );
        assert_eq!(
            split_source_ref("sub/Wind_Farm_B__7__x.csv"),
            ("Wind_Farm_B".to_string(), "7__x".to_string())
        );
        assert_eq!(split_source_ref("orphan.csv"), ("orphan".to_string(), String::new()));
    }

    #[test]
    fn test_catalog_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.csv");
        fs::write(
            &path,
            "source_file,unit_id,asset_id\nWind_Farm_A__1.csv,,T01\nodd.csv,Wind_Farm_B,\n",
        )
        .unwrap();

        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries()[0].unit_id, "Wind_Farm_A");
        assert_eq!(catalog.entries()[0].asset_id.as_deref(), Some("T01"));
        assert_eq!(catalog.entries()[1].unit_id, "Wind_Farm_B");
        assert_eq!(catalog.entries()[1].asset_id, None);
        assert_eq!(catalog.for_unit("Wind_Farm_B").count(), 1);
    }

    #[test]
    fn test_catalog_legacy_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.csv");
        fs::write(&path, "parquet_file\nWind_Farm_C__3.csv\n").unwrap();
        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.entries()[0].unit_id, "Wind_Farm_C");
        assert_eq!(catalog.entries()[0].dataset_id, "3");
    }

    #[test]
    fn test_missing_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let result = Catalog::load(&dir.path().join("nope.csv"));
        assert!(matches!(result, Err(ScoringError::ConfigurationMissing { .. })));
    }

    #[test]
    fn test_read_source_drops_bad_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Wind_Farm_A__1.csv");
        fs::write(
            &path,
            "Time Stamp,Asset ID,Wind Speed,power,unused\n\
             2023-01-01 00:10:00,T01,5.5,120,x\n\
             garbage,T01,6.0,130,x\n\
             2023-01-01 00:00:00,T01,,110,x\n",
        )
        .unwrap();

        let feats = vec!["wind_speed".to_string(), "power".to_string(), "pitch".to_string()];
        let table = read_source(&path, Some(&feats)).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.columns(), &["wind_speed".to_string(), "power".to_string()]);
        assert_eq!(table.asset_ids(), &["T01".to_string(), "T01".to_string()]);
        assert!(table.column("wind_speed").unwrap()[1].is_nan());
        assert!(!table.is_sorted());
    }

    #[test]
    fn test_read_source_keeps_requested_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Wind_Farm_A__2.csv");
        fs::write(
            &path,
            "timestamp,Power,Wind Speed\n\
             2023-01-01 00:00:00,120.5,6.5\n\
             2023-01-01 00:10:00,118.0,6.1\n",
        )
        .unwrap();

        let feats = vec!["Power".to_string(), "Wind Speed".to_string()];
        let table = read_source(&path, Some(&feats)).unwrap();

        assert_eq!(table.columns(), feats.as_slice());
        assert_eq!(table.column("Power").unwrap().to_vec(), vec![120.5, 118.0]);
        assert_eq!(table.column("Wind Speed").unwrap().to_vec(), vec![6.5, 6.1]);
    }

    #[test]
    fn test_read_source_all_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.csv");
        fs::write(&path, "timestamp,a,b\n2023-01-01 00:00:00,1,2\n").unwrap();
        let table = read_source(&path, None).unwrap();
        assert_eq!(table.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(table.asset_ids(), &["".to_string()]);
    }

    #[test]
    fn test_read_source_without_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.csv");
        fs::write(&path, "when,a\n2023-01-01,1\n").unwrap();
        assert!(matches!(
            read_source(&path, None),
            Err(ScoringError::MalformedSource { .. })
        ));
    }

    #[test]
    fn test_describe_catalog() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Wind_Farm_A__1.csv"),
            "timestamp,asset_id,power\n2023-01-02 00:00:00,T09,1\n2023-01-01 00:00:00,T09,2\n",
        )
        .unwrap();
        let catalog = Catalog::from_entries(vec![CatalogEntry::from_source_ref("Wind_Farm_A__1.csv")]);

        let summary = describe_catalog(&catalog, dir.path()).unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].n_rows, 2);
        assert_eq!(summary[0].asset_id.as_deref(), Some("T09"));
        assert_eq!(summary[0].ts_min, parse_timestamp("2023-01-01 00:00:00"));

        let missing = Catalog::from_entries(vec![CatalogEntry::from_source_ref("Wind_Farm_A__2.csv")]);
        assert!(matches!(
            describe_catalog(&missing, dir.path()),
            Err(ScoringError::SourceNotFound { .. })
        ));
    }
}
