//! Model invocation contract.
//!
//! Each of the four predictive models sits behind a [`ModelHandle`], which checks the
//! caller-supplied shape against the shape the model declares before every call. The
//! [`ModelRegistry`] bundles the four handles; it is built once at startup and shared
//! read-only across all scoring workers.

pub mod dense;

use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::normalize::{FeatureVector, NormalizedTensor, TargetShape};

use dense::{Activation, DenseModel};

/// A trained model reduced to "flat input in, scalar out".
pub trait Predictor: Send + Sync {
    /// Shape of one sample, without the batch axis.
    fn input_shape(&self) -> &[usize];

    /// Run one sample. `input.len()` equals the product of [`Predictor::input_shape`].
    fn forward(&self, input: &[f32]) -> f32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Deforestation,
    WaterPollution,
    Biodiversity,
    NaturalCapital,
}

impl ModelRole {
    pub fn artifact_name(self) -> &'static str {
        match self {
            ModelRole::Deforestation => "deforestation_model.json",
            ModelRole::WaterPollution => "water_pollution_model.json",
            ModelRole::Biodiversity => "biodiversity_model.json",
            ModelRole::NaturalCapital => "natural_capital_model.json",
        }
    }

    /// Roles whose output is a probability-like score in [0, 1].
    pub fn is_bounded(self) -> bool {
        matches!(self, ModelRole::Deforestation | ModelRole::WaterPollution)
    }
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelRole::Deforestation => write!(f, "deforestation"),
            ModelRole::WaterPollution => write!(f, "water-pollution"),
            ModelRole::Biodiversity => write!(f, "biodiversity"),
            ModelRole::NaturalCapital => write!(f, "natural-capital"),
        }
    }
}

pub struct ModelHandle {
    role: ModelRole,
    predictor: Box<dyn Predictor>,
}

impl ModelHandle {
    pub fn new(role: ModelRole, predictor: Box<dyn Predictor>) -> Self {
        Self { role, predictor }
    }

    pub fn input_shape(&self) -> &[usize] {
        self.predictor.input_shape()
    }

    /// Invoke the model on one sample of the given shape.
    pub fn invoke(&self, shape: &[usize], input: &[f32]) -> Result<f64> {
        let expected = self.predictor.input_shape();
        if shape != expected || input.len() != expected.iter().product::<usize>() {
            return Err(Error::ShapeMismatch {
                model: self.role.to_string(),
                expected: expected.to_vec(),
                actual: shape.to_vec(),
            });
        }

        let value = f64::from(self.predictor.forward(input));
        if !value.is_finite() {
            return Err(Error::InvalidOutput {
                model: self.role.to_string(),
                value,
            });
        }
        Ok(value)
    }
}

/// The four models of one pipeline run. Read-only after construction.
pub struct ModelRegistry {
    deforestation: ModelHandle,
    water_pollution: ModelHandle,
    biodiversity: ModelHandle,
    natural_capital: ModelHandle,
}

impl ModelRegistry {
    pub fn new(
        deforestation: Box<dyn Predictor>,
        water_pollution: Box<dyn Predictor>,
        biodiversity: Box<dyn Predictor>,
        natural_capital: Box<dyn Predictor>,
    ) -> Self {
        Self {
            deforestation: ModelHandle::new(ModelRole::Deforestation, deforestation),
            water_pollution: ModelHandle::new(ModelRole::WaterPollution, water_pollution),
            biodiversity: ModelHandle::new(ModelRole::Biodiversity, biodiversity),
            natural_capital: ModelHandle::new(ModelRole::NaturalCapital, natural_capital),
        }
    }

    /// Load all four `<role>_model.json` artifacts from `dir`. Any failure is fatal.
    pub fn load(dir: &Path) -> Result<Self> {
        let load = |role: ModelRole| -> Result<Box<dyn Predictor>> {
            let path = dir.join(role.artifact_name());
            let fail = |reason: String| Error::ModelLoad {
                model: role.to_string(),
                path: path.display().to_string(),
                reason,
            };

            let model = DenseModel::load(&path).map_err(fail)?;
            if role.is_bounded() && model.output_activation() != Activation::Sigmoid {
                return Err(fail(
                    "bounded risk model must end in a sigmoid activation".to_string(),
                ));
            }
            info!(model = %role, shape = ?model.input_shape(), "model loaded");
            Ok(Box::new(model))
        };

        Ok(Self::new(
            load(ModelRole::Deforestation)?,
            load(ModelRole::WaterPollution)?,
            load(ModelRole::Biodiversity)?,
            load(ModelRole::NaturalCapital)?,
        ))
    }

    /// Compare every declared input shape with what this run will feed the models.
    ///
    /// Both image models must take `[height, width, 1]` at the configured target, the
    /// natural-capital model a flat [`FeatureVector`], and the biodiversity model
    /// `[steps, 1]`. A mismatch here would fail every organization, so it aborts the run.
    pub fn check_shapes(&self, target: TargetShape) -> Result<()> {
        let image = [target.height, target.width, 1];
        let steps = self.biodiversity_steps().max(1);
        let expected: [(&ModelHandle, &[usize]); 4] = [
            (&self.deforestation, &image),
            (&self.water_pollution, &image),
            (&self.biodiversity, &[steps, 1]),
            (&self.natural_capital, &[FeatureVector::LEN]),
        ];

        for (handle, fed) in expected {
            if handle.input_shape() != fed {
                return Err(Error::ShapeMismatch {
                    model: handle.role.to_string(),
                    expected: handle.input_shape().to_vec(),
                    actual: fed.to_vec(),
                });
            }
        }
        Ok(())
    }

    pub fn deforestation_risk(&self, vegetation: &NormalizedTensor) -> Result<f64> {
        self.deforestation
            .invoke(&vegetation.sample_shape(), vegetation.values())
    }

    pub fn water_pollution_risk(&self, water: &NormalizedTensor) -> Result<f64> {
        self.water_pollution
            .invoke(&water.sample_shape(), water.values())
    }

    /// Number of timesteps the biodiversity model consumes per sequence.
    pub fn biodiversity_steps(&self) -> usize {
        self.biodiversity.input_shape().first().copied().unwrap_or(0)
    }

    /// Mean prediction over every sequence, each shaped `(steps, 1)`.
    pub fn biodiversity_loss_risk(&self, sequences: &[Vec<f32>]) -> Result<f64> {
        if sequences.is_empty() {
            return Err(Error::data_unavailable(
                "biodiversity trends",
                "no sequence of length >= 2",
            ));
        }
        let mut total = 0.0;
        for seq in sequences {
            total += self.biodiversity.invoke(&[seq.len(), 1], seq)?;
        }
        Ok(total / sequences.len() as f64)
    }

    pub fn natural_capital_value(&self, features: &FeatureVector) -> Result<f64> {
        self.natural_capital
            .invoke(&features.shape(), features.values())
    }
}

#[cfg(test)]
impl ModelRole {
    pub const ALL: [ModelRole; 4] = [
        ModelRole::Deforestation,
        ModelRole::WaterPollution,
        ModelRole::Biodiversity,
        ModelRole::NaturalCapital,
    ];
}

#[cfg(test)]
impl ModelHandle {
    pub fn role(&self) -> ModelRole {
        self.role
    }
}

#[cfg(test)]
impl ModelRegistry {
    pub fn handle(&self, role: ModelRole) -> &ModelHandle {
        match role {
            ModelRole::Deforestation => &self.deforestation,
            ModelRole::WaterPollution => &self.water_pollution,
            ModelRole::Biodiversity => &self.biodiversity,
            ModelRole::NaturalCapital => &self.natural_capital,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{registry, FnPredictor};
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_zero_tensor_scores_in_range() {
        let models = registry();
        let t = NormalizedTensor::zeros(TargetShape::default());
        let risk = models.deforestation_risk(&t).unwrap();
        assert!((0.0..=1.0).contains(&risk));
        assert_eq!(risk, 0.5);
    }

    #[test]
    fn test_shape_mismatch() {
        let models = registry();
        let t = NormalizedTensor::zeros(TargetShape { height: 64, width: 64 });
        match models.water_pollution_risk(&t) {
            Err(Error::ShapeMismatch { expected, actual, .. }) => {
                assert_eq!(expected, vec![128, 128, 1]);
                assert_eq!(actual, vec![64, 64, 1]);
            }
            other => panic!("expected shape mismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_biodiversity_mean_over_sequences() {
        let models = registry();
        let seqs = vec![vec![0.0, 0.0, 1.0, 1.0], vec![1.0; 4]];
        let risk = models.biodiversity_loss_risk(&seqs).unwrap();
        assert!((risk - 0.75).abs() < 1e-9);
        assert_eq!(models.biodiversity_steps(), 4);
    }

    #[test]
    fn test_biodiversity_wrong_length() {
        let models = registry();
        let err = models.biodiversity_loss_risk(&[vec![0.5; 3]]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_non_finite_output() {
        let models = registry();
        let h = models.handle(ModelRole::NaturalCapital);
        let err = h.invoke(&[4], &[-1.0, 0.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidOutput { .. }));
    }

    #[test]
    fn test_shapes_match_default_target() {
        registry().check_shapes(TargetShape::default()).unwrap();
    }

    #[test]
    fn test_shapes_reject_skewed_target() {
        let err = registry()
            .check_shapes(TargetShape { height: 64, width: 64 })
            .unwrap_err();
        match err {
            Error::ShapeMismatch { model, expected, actual } => {
                assert_eq!(model, "deforestation");
                assert_eq!(expected, vec![128, 128, 1]);
                assert_eq!(actual, vec![64, 64, 1]);
            }
            other => panic!("expected shape mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_shapes_reject_wrong_feature_width() {
        fn zero(_: &[f32]) -> f32 {
            0.0
        }
        let image = || Box::new(FnPredictor { shape: vec![128, 128, 1], f: zero });
        let models = ModelRegistry::new(
            image(),
            image(),
            Box::new(FnPredictor { shape: vec![4, 1], f: zero }),
            Box::new(FnPredictor { shape: vec![5], f: zero }),
        );
        let err = models.check_shapes(TargetShape::default()).unwrap_err();
        assert!(err.to_string().contains("natural-capital"));
    }

    #[test]
    fn test_shapes_reject_multichannel_sequence() {
        fn zero(_: &[f32]) -> f32 {
            0.0
        }
        let image = || Box::new(FnPredictor { shape: vec![128, 128, 1], f: zero });
        let models = ModelRegistry::new(
            image(),
            image(),
            Box::new(FnPredictor { shape: vec![4, 3], f: zero }),
            Box::new(FnPredictor { shape: vec![4], f: zero }),
        );
        let err = models.check_shapes(TargetShape::default()).unwrap_err();
        assert!(err.to_string().contains("biodiversity"));
    }

    fn write_artifact(dir: &Path, role: ModelRole, json: &str) {
        std::fs::write(dir.join(role.artifact_name()), json).unwrap();
    }

    #[test]
    fn test_load_from_directory() {
        let dir = TempDir::new().unwrap();
        let image = r#"{"input_shape":[128,128,1],"pool":[64,64],
            "layers":[{"weights":[[0.1,0.2,0.3,0.4]],"bias":[0.0],"activation":"sigmoid"}]}"#;
        write_artifact(dir.path(), ModelRole::Deforestation, image);
        write_artifact(dir.path(), ModelRole::WaterPollution, image);
        write_artifact(
            dir.path(),
            ModelRole::Biodiversity,
            r#"{"input_shape":[3,1],"layers":[{"weights":[[0.3,0.3,0.4]],"bias":[0.0]}]}"#,
        );
        write_artifact(
            dir.path(),
            ModelRole::NaturalCapital,
            r#"{"input_shape":[4],"layers":[
                {"weights":[[1,0,0,0],[0,0,0,1]],"bias":[0,0],"activation":"relu"},
                {"weights":[[100,10]],"bias":[5]}]}"#,
        );

        let models = ModelRegistry::load(dir.path()).unwrap();
        assert_eq!(models.biodiversity_steps(), 3);
        for role in ModelRole::ALL {
            assert_eq!(models.handle(role).role(), role);
        }
    }

    #[test]
    fn test_load_rejects_unbounded_risk_model() {
        let dir = TempDir::new().unwrap();
        let linear = r#"{"input_shape":[2,2,1],"layers":[{"weights":[[1,1,1,1]],"bias":[0]}]}"#;
        for role in ModelRole::ALL {
            write_artifact(dir.path(), role, linear);
        }
        let err = ModelRegistry::load(dir.path()).err().unwrap();
        assert!(matches!(err, Error::ModelLoad { .. }));
        assert!(err.to_string().contains("sigmoid"));
    }

    #[test]
    fn test_load_missing_artifact() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            ModelRegistry::load(dir.path()),
            Err(Error::ModelLoad { .. })
        ));
    }
}
