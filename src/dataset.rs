use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::{LandType, OrganizationRecord};

pub const REQUIRED_COLUMNS: [&str; 6] = [
    "company",
    "land_area",
    "land_type",
    "biodiversity_index",
    "carbon_sequestration",
    "economic_value",
];

/// Organization rows ready for scoring, in input order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<OrganizationRecord>,
    /// Rows that could not be parsed and were skipped.
    pub skipped_rows: usize,
}

#[derive(Debug, Deserialize)]
struct Row {
    company: String,
    land_area: f64,
    #[serde(default)]
    land_type: String,
    biodiversity_index: f64,
    carbon_sequestration: f64,
    economic_value: f64,
}

/// Load the organization land-use CSV.
///
/// A missing file or missing required column aborts the run. Unparsable rows are skipped
/// with a warning. When a company appears twice the later row wins.
pub fn load(path: &Path) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| Error::data_unavailable(path.display().to_string(), e))?;

    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(Error::data_unavailable(
            path.display().to_string(),
            format!("missing required columns: {}", missing.join(", ")),
        ));
    }

    let mut records: Vec<OrganizationRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut skipped_rows = 0;

    for (line, row) in reader.deserialize::<Row>().enumerate() {
        let row = match row {
            Ok(row) if !row.company.is_empty() => row,
            Ok(_) => {
                warn!(row = line + 1, "row without company skipped");
                skipped_rows += 1;
                continue;
            }
            Err(e) => {
                warn!(row = line + 1, error = %e, "unparsable row skipped");
                skipped_rows += 1;
                continue;
            }
        };

        let record = OrganizationRecord {
            land_type: LandType::from_label(&row.land_type),
            company: row.company,
            land_area: row.land_area,
            biodiversity_index: row.biodiversity_index,
            carbon_sequestration: row.carbon_sequestration,
            economic_value: row.economic_value,
        };

        match index.get(&record.company) {
            Some(&i) => {
                warn!(company = %record.company, "duplicate company; keeping the later row");
                records[i] = record;
            }
            None => {
                index.insert(record.company.clone(), records.len());
                records.push(record);
            }
        }
    }

    info!(
        path = %path.display(),
        organizations = records.len(),
        skipped_rows,
        "organization dataset loaded"
    );

    Ok(Dataset {
        records,
        skipped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{}", content).unwrap();
        f
    }

    #[test]
    fn test_load_rows() {
        let f = csv(
            "company,land_area,land_type,biodiversity_index,carbon_sequestration,economic_value\n\
             Acme Co,120.0,Forest,0.75,42.0,50000\n\
             Blue Delta,80.5,Wetland,0.9,12.0,72000\n\
             Mystery Inc,10,Tundra,0.1,1.0,10\n",
        );
        let ds = load(f.path()).unwrap();
        assert_eq!(ds.records.len(), 3);
        assert_eq!(ds.skipped_rows, 0);
        assert_eq!(ds.records[0].company, "Acme Co");
        assert_eq!(ds.records[0].land_type, LandType::Forest);
        assert_eq!(ds.records[1].land_type, LandType::Wetland);
        assert_eq!(ds.records[2].land_type, LandType::Unknown);
    }

    #[test]
    fn test_missing_column_aborts() {
        let f = csv("company,land_area,land_type\nAcme Co,1,Forest\n");
        let err = load(f.path()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("biodiversity_index"));
        assert!(msg.contains("economic_value"));
    }

    #[test]
    fn test_missing_file_aborts() {
        assert!(matches!(
            load(Path::new("no/such/organizations.csv")),
            Err(Error::DataUnavailable { .. })
        ));
    }

    #[test]
    fn test_bad_row_skipped_duplicate_replaced() {
        let f = csv(
            "company,land_area,land_type,biodiversity_index,carbon_sequestration,economic_value\n\
             Acme Co,120.0,Forest,0.75,42.0,50000\n\
             Broken,n/a,Urban,0.2,3.0,100\n\
             Acme Co,130.0,Urban,0.5,40.0,60000\n",
        );
        let ds = load(f.path()).unwrap();
        assert_eq!(ds.skipped_rows, 1);
        assert_eq!(ds.records.len(), 1);
        assert_eq!(ds.records[0].land_area, 130.0);
        assert_eq!(ds.records[0].land_type, LandType::Urban);
    }
}
