use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::imagery::{DateRange, ImageryProvider, HttpImagery, LocalImagery, Region};
use crate::normalize::{NormalizationPolicy, TargetShape};
use crate::scorer::DEFAULT_RECOMMENDATIONS;

/// Root configuration structure, deserialized from `.esg-reportr/config.toml`.
///
/// Every section is optional; missing keys take the defaults below.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub imagery: ImageryConfig,
    pub normalization: NormalizationConfig,
    pub batch: BatchConfig,
    pub report: ReportConfig,
    /// Fallback log filter when neither `RUST_LOG` nor `--verbose` is given.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            paths: PathsConfig::default(),
            imagery: ImageryConfig::default(),
            normalization: NormalizationConfig::default(),
            batch: BatchConfig::default(),
            report: ReportConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Organization land-use CSV.
    pub dataset: PathBuf,
    /// Record store JSON, rewritten on every scoring run.
    pub record_store: PathBuf,
    /// Where PDFs and chart images are written and served from.
    pub reports_dir: PathBuf,
    /// Directory holding the four `<role>_model.json` artifacts.
    pub models_dir: PathBuf,
    /// Optional biodiversity trend dataset. A missing file means flat fallback series.
    pub biodiversity_trends: PathBuf,
    pub land_use_output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            dataset: "data/land_use/organization_land_use.csv".into(),
            record_store: "data/multi_org_report.json".into(),
            reports_dir: "data/reports".into(),
            models_dir: "models".into(),
            biodiversity_trends: "data/biodiversity/biodiversity_trends.json".into(),
            land_use_output: "data/land_use/land_use_recommendations.csv".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagerySource {
    Local,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageryConfig {
    pub source: ImagerySource,
    /// Directory of exported index rasters for the `local` source.
    pub dir: PathBuf,
    /// Tile endpoint for the `http` source.
    pub url: Option<String>,
    pub cache_dir: PathBuf,
    pub latitude: f64,
    pub longitude: f64,
    pub buffer_m: f64,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for ImageryConfig {
    fn default() -> Self {
        ImageryConfig {
            source: ImagerySource::Local,
            dir: "data/geospatial".into(),
            url: None,
            cache_dir: "data/geospatial".into(),
            latitude: -3.4653,
            longitude: -62.2159,
            buffer_m: 2500.0,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
        }
    }
}

impl ImageryConfig {
    pub fn region(&self) -> Region {
        Region {
            latitude: self.latitude,
            longitude: self.longitude,
            buffer_m: self.buffer_m,
        }
    }

    pub fn date_range(&self) -> DateRange {
        DateRange {
            start: self.start,
            end: self.end,
        }
    }

    /// Build the configured provider. The `http` source requires `url`.
    pub fn provider(&self) -> Result<ImageryProvider> {
        match self.source {
            ImagerySource::Local => Ok(ImageryProvider::Local(LocalImagery::new(&self.dir))),
            ImagerySource::Http => {
                let url = self
                    .url
                    .as_deref()
                    .context("imagery.source = \"http\" requires imagery.url")?;
                Ok(ImageryProvider::Http(HttpImagery::new(url, &self.cache_dir)?))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    pub height: usize,
    pub width: usize,
    /// Policy for the vegetation raster feeding the deforestation model.
    pub vegetation: NormalizationPolicy,
    /// Policy for the water raster feeding the water-pollution model.
    pub water: NormalizationPolicy,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        let target = TargetShape::default();
        NormalizationConfig {
            height: target.height,
            width: target.width,
            vegetation: NormalizationPolicy::Standardize,
            water: NormalizationPolicy::Standardize,
        }
    }
}

impl NormalizationConfig {
    pub fn target(&self) -> TargetShape {
        TargetShape {
            height: self.height,
            width: self.width,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Scoring threads. `0` means one per available core.
    pub workers: usize,
}

impl BatchConfig {
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Attached verbatim to every risk profile.
    pub recommendations: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            recommendations: DEFAULT_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override`, the path passed via `--config`
/// 2. `<base_dir>/.esg-reportr/config.toml`
/// 3. `~/.config/esg-reportr/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(base_dir: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = base_dir.join(".esg-reportr").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("esg-reportr").join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.normalization.target(), TargetShape::default());
        assert_eq!(cfg.imagery.source, ImagerySource::Local);
        assert_eq!(cfg.report.recommendations.len(), 3);
        assert_eq!(cfg.paths.record_store, PathBuf::from("data/multi_org_report.json"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            log_level = "debug"

            [imagery]
            source = "http"
            url = "http://tiles.local/index"
            start = "2023-06-01"

            [normalization]
            water = "min-max"

            [batch]
            workers = 3
            "#,
        )
        .unwrap();

        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.imagery.source, ImagerySource::Http);
        assert_eq!(cfg.imagery.start, NaiveDate::from_ymd_opt(2023, 6, 1).unwrap());
        assert_eq!(cfg.imagery.end, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert_eq!(cfg.normalization.water, NormalizationPolicy::MinMax);
        assert_eq!(cfg.normalization.vegetation, NormalizationPolicy::Standardize);
        assert_eq!(cfg.batch.effective_workers(), 3);
        assert_eq!(cfg.paths.models_dir, PathBuf::from("models"));
    }

    #[test]
    fn test_project_config_found() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".esg-reportr")).unwrap();
        std::fs::write(
            dir.path().join(".esg-reportr").join("config.toml"),
            "[paths]\nreports_dir = \"out/pdf\"\n",
        )
        .unwrap();

        let cfg = load_config(dir.path(), None).unwrap();
        assert_eq!(cfg.paths.reports_dir, PathBuf::from("out/pdf"));
    }

    #[test]
    fn test_override_must_exist() {
        let dir = TempDir::new().unwrap();
        assert!(load_config(dir.path(), Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_http_source_requires_url() {
        let cfg = ImageryConfig {
            source: ImagerySource::Http,
            ..ImageryConfig::default()
        };
        assert!(cfg.provider().is_err());
    }
}
