use tracing::{debug, warn};

use crate::error::Error;
use crate::imagery::RasterAsset;
use crate::model::ModelRegistry;
use crate::models::{OrganizationRecord, RiskProfile};
use crate::normalize::raster::normalize_or_zero;
use crate::normalize::tabular::feature_vector;
use crate::normalize::{NormalizationPolicy, NormalizedTensor, TargetShape};
use crate::trends::TrendDataset;

/// Recommendation text attached to every profile. Static, not derived from scores.
pub const DEFAULT_RECOMMENDATIONS: [&str; 3] = [
    "Improve forest conservation policies.",
    "Reduce industrial water discharge.",
    "Increase biodiversity restoration funding.",
];

/// Both index rasters, normalized once per run and shared by every organization.
#[derive(Debug, Clone)]
pub struct ImagerySnapshot {
    pub vegetation: NormalizedTensor,
    pub water: NormalizedTensor,
}

impl ImagerySnapshot {
    pub fn prepare(
        vegetation: Option<&RasterAsset>,
        water: Option<&RasterAsset>,
        target: TargetShape,
        vegetation_policy: NormalizationPolicy,
        water_policy: NormalizationPolicy,
    ) -> Self {
        let snapshot = Self {
            vegetation: normalize_or_zero(vegetation, target, vegetation_policy),
            water: normalize_or_zero(water, target, water_policy),
        };
        if snapshot.is_degraded() {
            warn!(
                vegetation_degraded = snapshot.vegetation.is_degraded(),
                water_degraded = snapshot.water.is_degraded(),
                "scoring against zero-filled imagery"
            );
        }
        snapshot
    }

    pub fn is_degraded(&self) -> bool {
        self.vegetation.is_degraded() || self.water.is_degraded()
    }
}

/// One organization that could not be scored this run.
#[derive(Debug)]
pub struct OrgFailure {
    pub company: String,
    pub error: Error,
}

impl std::fmt::Display for OrgFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.company, self.error)
    }
}

/// Produces a [`RiskProfile`] for one organization from read-only shared inputs.
pub struct Scorer<'a> {
    models: &'a ModelRegistry,
    imagery: &'a ImagerySnapshot,
    trends: &'a TrendDataset,
    recommendations: &'a [String],
}

impl<'a> Scorer<'a> {
    pub fn new(
        models: &'a ModelRegistry,
        imagery: &'a ImagerySnapshot,
        trends: &'a TrendDataset,
        recommendations: &'a [String],
    ) -> Self {
        Self {
            models,
            imagery,
            trends,
            recommendations,
        }
    }

    pub fn score(&self, record: &OrganizationRecord) -> Result<RiskProfile, OrgFailure> {
        self.try_score(record).map_err(|error| {
            warn!(company = %record.company, error = %error, "organization skipped");
            OrgFailure {
                company: record.company.clone(),
                error,
            }
        })
    }

    fn try_score(&self, record: &OrganizationRecord) -> Result<RiskProfile, Error> {
        let features = feature_vector(record);
        let sequences = self
            .trends
            .sequences_for(record, self.models.biodiversity_steps());

        let deforestation_risk = self.models.deforestation_risk(&self.imagery.vegetation)?;
        let water_pollution_score = self.models.water_pollution_risk(&self.imagery.water)?;
        let biodiversity_loss_risk = self.models.biodiversity_loss_risk(&sequences)?;
        let natural_capital_value = self.models.natural_capital_value(&features)?;

        debug!(
            company = %record.company,
            deforestation_risk,
            water_pollution_score,
            biodiversity_loss_risk,
            natural_capital_value,
            "organization scored"
        );

        Ok(RiskProfile {
            deforestation_risk,
            water_pollution_score,
            biodiversity_loss_risk,
            natural_capital_value,
            recommendations: self.recommendations.to_vec(),
        })
    }
}
