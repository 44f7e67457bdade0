use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tiff::decoder::{Decoder, DecodingResult};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::imagery::RasterAsset;

/// Guards the divisions in both policies against constant rasters.
const EPSILON: f32 = 1e-7;

/// How raster values are mapped into [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizationPolicy {
    /// `(x - mean) / (std + eps)`, then clipped to [0, 1].
    Standardize,
    /// `(x - min) / (max - min + eps)`.
    MinMax,
}

impl std::fmt::Display for NormalizationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizationPolicy::Standardize => write!(f, "standardize"),
            NormalizationPolicy::MinMax => write!(f, "min-max"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetShape {
    pub height: usize,
    pub width: usize,
}

impl Default for TargetShape {
    fn default() -> Self {
        TargetShape {
            height: 128,
            width: 128,
        }
    }
}

/// A single band decoded into row-major `f32` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl Raster {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 || data.len() != width * height {
            return Err(Error::data_unavailable(
                "raster",
                format!("{}x{} grid cannot hold {} samples", width, height, data.len()),
            ));
        }
        Ok(Raster {
            width,
            height,
            data,
        })
    }
}

/// Model input of shape `(1, height, width, 1)` with every value in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    height: usize,
    width: usize,
    data: Vec<f32>,
    degraded: bool,
}

impl NormalizedTensor {
    /// Zero-filled stand-in used when the source raster is unavailable.
    pub fn zeros(target: TargetShape) -> Self {
        NormalizedTensor {
            height: target.height,
            width: target.width,
            data: vec![0.0; target.height * target.width],
            degraded: true,
        }
    }

    /// Shape as a model sees it, without the batch axis.
    pub fn sample_shape(&self) -> [usize; 3] {
        [self.height, self.width, 1]
    }

    pub fn values(&self) -> &[f32] {
        &self.data
    }

    /// True when this tensor was zero-filled instead of derived from imagery.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

/// Decode band 1 of a TIFF / GeoTIFF.
pub fn read_raster(path: &Path) -> Result<Raster> {
    let what = path.display().to_string();
    let file = File::open(path).map_err(|e| Error::data_unavailable(&what, e))?;
    let mut decoder =
        Decoder::new(BufReader::new(file)).map_err(|e| Error::data_unavailable(&what, e))?;
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::data_unavailable(&what, e))?;
    let image = decoder
        .read_image()
        .map_err(|e| Error::data_unavailable(&what, e))?;

    let samples = decoded_to_f32(image)
        .ok_or_else(|| Error::data_unavailable(&what, "unsupported sample format"))?;

    let (width, height) = (width as usize, height as usize);
    let pixels = width * height;
    if pixels == 0 || samples.len() % pixels != 0 {
        return Err(Error::data_unavailable(
            &what,
            format!("{} samples do not tile a {}x{} grid", samples.len(), width, height),
        ));
    }

    // Interleaved multi-band data: keep the first band.
    let bands = samples.len() / pixels;
    let band = if bands == 1 {
        samples
    } else {
        debug!(path = %what, bands, "reading first band of multi-band raster");
        samples.into_iter().step_by(bands).collect()
    };

    Raster::new(width, height, band)
}

#[allow(unreachable_patterns)]
fn decoded_to_f32(image: DecodingResult) -> Option<Vec<f32>> {
    let out = match image {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        _ => return None,
    };
    Some(out)
}

/// Scale, resize and clip a raster into a [`NormalizedTensor`].
///
/// Non-finite samples (GeoTIFF no-data) are excluded from the statistics and
/// become 0 after scaling.
pub fn normalize(
    raster: &Raster,
    target: TargetShape,
    policy: NormalizationPolicy,
) -> Result<NormalizedTensor> {
    if target.height == 0 || target.width == 0 {
        return Err(Error::data_unavailable(
            "raster",
            "target shape must be non-empty",
        ));
    }

    let finite: Vec<f32> = raster.data.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return Err(Error::data_unavailable("raster", "no finite samples"));
    }

    let scale: Box<dyn Fn(f32) -> f32> = match policy {
        NormalizationPolicy::Standardize => {
            let n = finite.len() as f64;
            let mean = finite.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
            let var = finite
                .iter()
                .map(|&v| (f64::from(v) - mean).powi(2))
                .sum::<f64>()
                / n;
            let (mean, std) = (mean as f32, var.sqrt() as f32);
            Box::new(move |v| (v - mean) / (std + EPSILON))
        }
        NormalizationPolicy::MinMax => {
            let min = finite.iter().copied().fold(f32::INFINITY, f32::min);
            let max = finite.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            Box::new(move |v| (v - min) / (max - min + EPSILON))
        }
    };

    let scaled: Vec<f32> = raster
        .data
        .iter()
        .map(|&v| if v.is_finite() { scale(v) } else { 0.0 })
        .collect();

    let resized = resize_area(&scaled, raster.width, raster.height, target);
    let data = resized.into_iter().map(|v| v.clamp(0.0, 1.0)).collect();

    Ok(NormalizedTensor {
        height: target.height,
        width: target.width,
        data,
        degraded: false,
    })
}

/// Read and normalize an asset, substituting a zero tensor when the imagery is unavailable.
pub fn normalize_or_zero(
    asset: Option<&RasterAsset>,
    target: TargetShape,
    policy: NormalizationPolicy,
) -> NormalizedTensor {
    let Some(asset) = asset else {
        warn!("no raster supplied; using zero-filled tensor");
        return NormalizedTensor::zeros(target);
    };

    match read_raster(&asset.path).and_then(|r| normalize(&r, target, policy)) {
        Ok(tensor) => tensor,
        Err(e) => {
            warn!(band = %asset.band, error = %e, "raster unavailable; using zero-filled tensor");
            NormalizedTensor::zeros(target)
        }
    }
}

/// Area-averaging resize. Each output cell averages the source cells its footprint covers;
/// when upsampling the footprint holds a single cell, which degenerates to nearest-neighbour.
fn resize_area(src: &[f32], src_w: usize, src_h: usize, target: TargetShape) -> Vec<f32> {
    let mut out = Vec::with_capacity(target.height * target.width);
    for ty in 0..target.height {
        let (y0, y1) = footprint(ty, src_h, target.height);
        for tx in 0..target.width {
            let (x0, x1) = footprint(tx, src_w, target.width);
            let mut sum = 0.0f64;
            for y in y0..y1 {
                let row = &src[y * src_w..(y + 1) * src_w];
                sum += row[x0..x1].iter().map(|&v| f64::from(v)).sum::<f64>();
            }
            let count = ((y1 - y0) * (x1 - x0)) as f64;
            out.push((sum / count) as f32);
        }
    }
    out
}

fn footprint(index: usize, src_len: usize, dst_len: usize) -> (usize, usize) {
    let start = index * src_len / dst_len;
    let end = ((index + 1) * src_len).div_ceil(dst_len).max(start + 1);
    (start, end.min(src_len))
}
