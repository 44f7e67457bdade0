//! Input normalization: rasters into fixed-shape tensors, organization rows into feature vectors.
//!
//! - [`raster`]: band decoding, standardize / min-max scaling, area resize, degraded zero-fill.
//! - [`tabular`]: land-type ordinal encoding and the natural-capital feature order.

pub mod raster;
pub mod tabular;

pub use raster::{NormalizationPolicy, NormalizedTensor, TargetShape};
pub use tabular::FeatureVector;
