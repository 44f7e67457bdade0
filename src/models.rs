use serde::{Deserialize, Serialize};

/// One row of the organization land-use dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub company: String,
    pub land_area: f64,
    pub land_type: LandType,
    pub biodiversity_index: f64,
    pub carbon_sequestration: f64,
    pub economic_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LandType {
    Forest,
    Wetland,
    Agricultural,
    Urban,
    Unknown,
}

impl LandType {
    /// Ordinal the natural-capital model was trained with. Unmapped types resolve to 0.
    pub fn ordinal(self) -> u8 {
        match self {
            LandType::Forest => 1,
            LandType::Wetland => 2,
            LandType::Agricultural => 3,
            LandType::Urban => 4,
            LandType::Unknown => 0,
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Forest" => LandType::Forest,
            "Wetland" => LandType::Wetland,
            "Agricultural" => LandType::Agricultural,
            "Urban" => LandType::Urban,
            _ => LandType::Unknown,
        }
    }
}

impl From<String> for LandType {
    fn from(label: String) -> Self {
        LandType::from_label(&label)
    }
}

impl From<LandType> for String {
    fn from(land_type: LandType) -> Self {
        land_type.to_string()
    }
}

impl std::fmt::Display for LandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LandType::Forest => write!(f, "Forest"),
            LandType::Wetland => write!(f, "Wetland"),
            LandType::Agricultural => write!(f, "Agricultural"),
            LandType::Urban => write!(f, "Urban"),
            LandType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Per-organization scoring result as persisted in the record store.
///
/// Field names on disk follow the report JSON consumed by existing dashboards;
/// snake_case names and the legacy `Water Pollution Risk` key are accepted on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    #[serde(rename = "Deforestation Risk", alias = "deforestation_risk")]
    pub deforestation_risk: f64,
    #[serde(
        rename = "Water Pollution Score",
        alias = "Water Pollution Risk",
        alias = "water_pollution_score"
    )]
    pub water_pollution_score: f64,
    #[serde(rename = "Biodiversity Loss Risk", alias = "biodiversity_loss_risk")]
    pub biodiversity_loss_risk: f64,
    #[serde(rename = "Natural Capital Value ($)", alias = "natural_capital_value")]
    pub natural_capital_value: f64,
    #[serde(rename = "Recommendations", alias = "recommendations")]
    pub recommendations: Vec<String>,
}

impl RiskProfile {
    /// The three bounded scores in report order.
    pub fn bounded_scores(&self) -> [(RiskKind, f64); 3] {
        [
            (RiskKind::Deforestation, self.deforestation_risk),
            (RiskKind::WaterPollution, self.water_pollution_score),
            (RiskKind::BiodiversityLoss, self.biodiversity_loss_risk),
        ]
    }

    /// Name of the first score that is not a finite number, if any.
    pub fn first_non_finite(&self) -> Option<&'static str> {
        self.bounded_scores()
            .iter()
            .find(|(_, v)| !v.is_finite())
            .map(|(kind, _)| kind.label())
            .or_else(|| {
                (!self.natural_capital_value.is_finite()).then_some("Natural Capital Value")
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskKind {
    Deforestation,
    WaterPollution,
    BiodiversityLoss,
}

impl RiskKind {
    pub fn label(self) -> &'static str {
        match self {
            RiskKind::Deforestation => "Deforestation",
            RiskKind::WaterPollution => "Water Pollution",
            RiskKind::BiodiversityLoss => "Biodiversity Loss",
        }
    }
}

/// Coarse banding of a bounded score, used for colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.66 {
            RiskLevel::High
        } else if score >= 0.33 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Moderate => write!(f, "moderate"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Filesystem-safe stem for an organization's artifacts: lowercased, whitespace
/// and any character outside `[a-z0-9_-]` replaced by `_`.
pub fn artifact_stem(company: &str) -> String {
    company
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_land_type_ordinals() {
        assert_eq!(LandType::from_label("Forest").ordinal(), 1);
        assert_eq!(LandType::from_label("Wetland").ordinal(), 2);
        assert_eq!(LandType::from_label("Agricultural").ordinal(), 3);
        assert_eq!(LandType::from_label("Urban").ordinal(), 4);
        assert_eq!(LandType::from_label("Desert").ordinal(), 0);
        assert_eq!(LandType::from_label("").ordinal(), 0);
    }

    #[test]
    fn test_artifact_stem() {
        assert_eq!(artifact_stem("Acme Co"), "acme_co");
        assert_eq!(artifact_stem("Green Earth Ltd"), "green_earth_ltd");
        assert_eq!(artifact_stem("../etc/passwd"), "___etc_passwd");
    }

    #[test]
    fn test_risk_profile_reads_legacy_keys() {
        let json = r#"{
            "Deforestation Risk": 0.4,
            "Water Pollution Risk": 0.2,
            "Biodiversity Loss Risk": 0.1,
            "Natural Capital Value ($)": 1000.0,
            "Recommendations": ["a"]
        }"#;
        let profile: RiskProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.water_pollution_score, 0.2);

        let out = serde_json::to_value(&profile).unwrap();
        assert!(out.get("Water Pollution Score").is_some());
    }

    #[test]
    fn test_risk_level_bands() {
        assert_eq!(RiskLevel::from_score(0.1), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.5), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_score(0.9), RiskLevel::High);
    }
}
