use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Predictor;

/// On-disk form of a trained feed-forward model.
///
/// ```json
/// {
///   "input_shape": [128, 128, 1],
///   "pool": [16, 16],
///   "layers": [
///     { "weights": [[...], ...], "bias": [...], "activation": "relu" },
///     { "weights": [[...]], "bias": [0.1], "activation": "sigmoid" }
///   ]
/// }
/// ```
///
/// `weights` is `[outputs][inputs]`. `pool` applies non-overlapping average pooling over the
/// first two axes of an image input before the first layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseArtifact {
    pub input_shape: Vec<usize>,
    #[serde(default)]
    pub pool: Option<[usize; 2]>,
    pub layers: Vec<DenseLayer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
    #[serde(default)]
    pub activation: Activation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
        }
    }
}

/// A validated [`DenseArtifact`] ready for inference.
#[derive(Debug, Clone)]
pub struct DenseModel {
    artifact: DenseArtifact,
}

impl DenseModel {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        let artifact: DenseArtifact = serde_json::from_str(&content).map_err(|e| e.to_string())?;
        Self::from_artifact(artifact)
    }

    /// Check that the layer stack chains from the (pooled) input to a single output.
    pub fn from_artifact(artifact: DenseArtifact) -> Result<Self, String> {
        if artifact.input_shape.is_empty() || artifact.input_shape.contains(&0) {
            return Err(format!("invalid input shape {:?}", artifact.input_shape));
        }

        let mut width = pooled_len(&artifact.input_shape, artifact.pool)?;
        if artifact.layers.is_empty() {
            return Err("model has no layers".to_string());
        }

        for (i, layer) in artifact.layers.iter().enumerate() {
            if layer.weights.len() != layer.bias.len() || layer.weights.is_empty() {
                return Err(format!(
                    "layer {}: {} weight rows but {} biases",
                    i,
                    layer.weights.len(),
                    layer.bias.len()
                ));
            }
            if let Some(row) = layer.weights.iter().find(|row| row.len() != width) {
                return Err(format!(
                    "layer {}: expected {} inputs per row, found {}",
                    i,
                    width,
                    row.len()
                ));
            }
            width = layer.weights.len();
        }

        if width != 1 {
            return Err(format!("final layer must produce 1 output, produces {}", width));
        }

        Ok(Self { artifact })
    }

    pub fn output_activation(&self) -> Activation {
        self.artifact
            .layers
            .last()
            .map(|l| l.activation)
            .unwrap_or_default()
    }

    fn pool(&self, input: &[f32]) -> Vec<f32> {
        let Some([ph, pw]) = self.artifact.pool else {
            return input.to_vec();
        };
        let shape = &self.artifact.input_shape;
        let (h, w) = (shape[0], shape[1]);
        let c: usize = shape[2..].iter().product();
        let (oh, ow) = (h / ph, w / pw);

        let mut out = vec![0.0f32; oh * ow * c];
        for y in 0..h {
            for x in 0..w {
                for k in 0..c {
                    let src = (y * w + x) * c + k;
                    let dst = ((y / ph) * ow + x / pw) * c + k;
                    out[dst] += input[src];
                }
            }
        }
        let area = (ph * pw) as f32;
        out.iter_mut().for_each(|v| *v /= area);
        out
    }
}

impl Predictor for DenseModel {
    fn input_shape(&self) -> &[usize] {
        &self.artifact.input_shape
    }

    fn forward(&self, input: &[f32]) -> f32 {
        let mut activations = self.pool(input);
        for layer in &self.artifact.layers {
            activations = layer
                .weights
                .iter()
                .zip(&layer.bias)
                .map(|(row, b)| {
                    let z = row.iter().zip(&activations).map(|(w, a)| w * a).sum::<f32>() + b;
                    layer.activation.apply(z)
                })
                .collect();
        }
        activations.first().copied().unwrap_or(f32::NAN)
    }
}

fn pooled_len(shape: &[usize], pool: Option<[usize; 2]>) -> Result<usize, String> {
    let total: usize = shape.iter().product();
    let Some([ph, pw]) = pool else {
        return Ok(total);
    };
    if shape.len() < 2 || ph == 0 || pw == 0 || shape[0] % ph != 0 || shape[1] % pw != 0 {
        return Err(format!("pool {:?} does not tile input shape {:?}", [ph, pw], shape));
    }
    Ok(total / (ph * pw))
}
