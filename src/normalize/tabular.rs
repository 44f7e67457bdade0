use crate::models::OrganizationRecord;

/// `[land_area, land_type ordinal, biodiversity_index, carbon_sequestration]`, the order the
/// natural-capital model was trained with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; 4]);

impl FeatureVector {
    pub const LEN: usize = 4;

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn shape(&self) -> [usize; 1] {
        [self.0.len()]
    }
}

/// Build the natural-capital feature vector for one organization.
///
/// `economic_value` is deliberately absent: it is the quantity the model estimates.
pub fn feature_vector(record: &OrganizationRecord) -> FeatureVector {
    FeatureVector([
        record.land_area as f32,
        f32::from(record.land_type.ordinal()),
        record.biodiversity_index as f32,
        record.carbon_sequestration as f32,
    ])
}
