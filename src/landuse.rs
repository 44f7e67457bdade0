//! Rule-based land-use recommendations, exported as a CSV next to the organization dataset.
//!
//! This is a separate artifact from the risk profiles; their recommendation list stays static.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{LandType, OrganizationRecord};

pub const NO_RECOMMENDATION: &str = "No Specific Recommendation";

#[derive(Debug, Serialize)]
struct Row<'a> {
    company: &'a str,
    land_area: f64,
    land_type: LandType,
    biodiversity_index: f64,
    carbon_sequestration: f64,
    economic_value: f64,
    recommendations: String,
}

/// Every rule that applies to `record`, in rule order.
pub fn recommend(record: &OrganizationRecord) -> Vec<&'static str> {
    let mut out = Vec::new();

    if record.biodiversity_index > 0.8 {
        out.push("Conservation & Protection Initiatives");
    }
    if record.land_type == LandType::Urban {
        out.push("Green Infrastructure Development (Parks, Rooftop Gardens)");
    }
    if record.biodiversity_index < 0.4 {
        out.push("Reforestation or Wetland Restoration");
    }
    if record.carbon_sequestration > 50.0 {
        out.push("Forest & Carbon Offset Protection Programs");
    }
    if record.carbon_sequestration < 10.0 {
        out.push("Adopt Carbon Offset Programs (Afforestation, Biochar)");
    }
    if record.economic_value > 100_000.0 {
        out.push("Sustainable Agriculture & Eco-Tourism Development");
    }

    out
}

/// The recommendation cell as written to the CSV.
pub fn recommendation_text(record: &OrganizationRecord) -> String {
    let recs = recommend(record);
    if recs.is_empty() {
        NO_RECOMMENDATION.to_string()
    } else {
        recs.join("; ")
    }
}

/// Write the dataset columns plus a `recommendations` column to `path`.
pub fn export(records: &[OrganizationRecord], path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| Error::data_unavailable(path.display().to_string(), e))?;

    for record in records {
        writer.serialize(Row {
            company: &record.company,
            land_area: record.land_area,
            land_type: record.land_type,
            biodiversity_index: record.biodiversity_index,
            carbon_sequestration: record.carbon_sequestration,
            economic_value: record.economic_value,
            recommendations: recommendation_text(record),
        })?;
    }
    writer.flush()?;

    info!(path = %path.display(), organizations = records.len(), "land-use recommendations saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(land_type: LandType, bio: f64, carbon: f64, value: f64) -> OrganizationRecord {
        OrganizationRecord {
            company: "Acme Co".to_string(),
            land_area: 120.0,
            land_type,
            biodiversity_index: bio,
            carbon_sequestration: carbon,
            economic_value: value,
        }
    }

    #[test]
    fn test_no_rule_applies() {
        let r = record(LandType::Forest, 0.6, 30.0, 50_000.0);
        assert!(recommend(&r).is_empty());
        assert_eq!(recommendation_text(&r), NO_RECOMMENDATION);
    }

    #[test]
    fn test_rules_joined_in_order() {
        let r = record(LandType::Urban, 0.2, 5.0, 250_000.0);
        assert_eq!(
            recommendation_text(&r),
            "Green Infrastructure Development (Parks, Rooftop Gardens); \
             Reforestation or Wetland Restoration; \
             Adopt Carbon Offset Programs (Afforestation, Biochar); \
             Sustainable Agriculture & Eco-Tourism Development"
        );
    }

    #[test]
    fn test_thresholds_are_strict() {
        let r = record(LandType::Wetland, 0.8, 50.0, 100_000.0);
        assert!(recommend(&r).is_empty());
        let r = record(LandType::Wetland, 0.81, 50.5, 100_000.5);
        assert_eq!(recommend(&r).len(), 3);
    }

    #[test]
    fn test_export_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("land_use").join("land_use_recommendations.csv");
        export(&[record(LandType::Forest, 0.9, 60.0, 10.0)], &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.get(0), Some("company"));
        assert_eq!(headers.get(6), Some("recommendations"));

        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(row.get(2), Some("Forest"));
        assert_eq!(
            row.get(6),
            Some("Conservation & Protection Initiatives; Forest & Carbon Offset Protection Programs")
        );
    }
}
