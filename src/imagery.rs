//! Imagery provider seam: fetch a vegetation- or water-index raster for a region and date range.
//!
//! Two providers are available:
//! - [`LocalImagery`] reads pre-exported GeoTIFFs from a directory.
//! - [`HttpImagery`] downloads a tile from a raster server and caches it on disk.
//!
//! Every failure surfaces as [`Error::DataUnavailable`]; retrying is the provider operator's
//! concern, the pipeline substitutes a zero tensor instead.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    /// Normalized difference vegetation index (NIR vs red).
    Ndvi,
    /// Normalized difference water index (green vs NIR).
    Ndwi,
}

impl Band {
    fn file_name(self) -> &'static str {
        match self {
            Band::Ndvi => "ndvi_real_time.tif",
            Band::Ndwi => "ndwi_real_time.tif",
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Band::Ndvi => write!(f, "ndvi"),
            Band::Ndwi => write!(f, "ndwi"),
        }
    }
}

/// A raster on local disk, borrowed by the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterAsset {
    pub path: PathBuf,
    pub band: Band,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub latitude: f64,
    pub longitude: f64,
    /// Radius around the point, in metres.
    pub buffer_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

pub enum ImageryProvider {
    Local(LocalImagery),
    Http(HttpImagery),
}

impl ImageryProvider {
    pub async fn fetch(&self, region: &Region, range: &DateRange, band: Band) -> Result<RasterAsset> {
        match self {
            ImageryProvider::Local(p) => p.fetch(band),
            ImageryProvider::Http(p) => p.fetch(region, range, band).await,
        }
    }
}

/// Fetch both index rasters concurrently. A band that cannot be fetched is logged and
/// returned as `None`; the caller decides how to degrade.
pub async fn fetch_snapshot(
    provider: &ImageryProvider,
    region: &Region,
    range: &DateRange,
) -> (Option<RasterAsset>, Option<RasterAsset>) {
    let (vegetation, water) = futures::join!(
        provider.fetch(region, range, Band::Ndvi),
        provider.fetch(region, range, Band::Ndwi),
    );

    let keep = |res: Result<RasterAsset>, band: Band| match res {
        Ok(asset) => {
            info!(%band, path = %asset.path.display(), "imagery ready");
            Some(asset)
        }
        Err(e) => {
            warn!(%band, error = %e, "imagery unavailable");
            None
        }
    };

    (keep(vegetation, Band::Ndvi), keep(water, Band::Ndwi))
}

/// Reads `ndvi_real_time.tif` / `ndwi_real_time.tif` from a directory.
pub struct LocalImagery {
    dir: PathBuf,
}

impl LocalImagery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn fetch(&self, band: Band) -> Result<RasterAsset> {
        let path = self.dir.join(band.file_name());
        if !path.is_file() {
            return Err(Error::data_unavailable(
                path.display().to_string(),
                "file not found",
            ));
        }
        Ok(RasterAsset { path, band })
    }
}

/// Downloads a GeoTIFF tile from `base_url` and caches it under `cache_dir`.
///
/// The request is `GET <base_url>?band=..&lat=..&lon=..&buffer=..&start=..&end=..`.
pub struct HttpImagery {
    client: Client,
    base_url: String,
    cache_dir: PathBuf,
}

impl HttpImagery {
    pub fn new(base_url: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| Error::data_unavailable("imagery client", e))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            cache_dir: cache_dir.into(),
        })
    }

    async fn fetch(&self, region: &Region, range: &DateRange, band: Band) -> Result<RasterAsset> {
        let what = format!("{} tile from {}", band, self.base_url);
        let unavailable = |e: &dyn std::fmt::Display| Error::data_unavailable(&what, e);

        let response = self
            .client
            .get(&self.base_url)
            .header("User-Agent", concat!("esg-reportr/", env!("CARGO_PKG_VERSION")))
            .query(&[
                ("band", band.to_string()),
                ("lat", region.latitude.to_string()),
                ("lon", region.longitude.to_string()),
                ("buffer", region.buffer_m.to_string()),
                ("start", range.start.to_string()),
                ("end", range.end.to_string()),
            ])
            .send()
            .await
            .map_err(|e| unavailable(&e))?;

        if !response.status().is_success() {
            return Err(unavailable(&format!("server returned {}", response.status())));
        }

        let bytes = response.bytes().await.map_err(|e| unavailable(&e))?;
        let path = self.cache_dir.join(band.file_name());
        write_cached(&self.cache_dir, &path, &bytes).map_err(|e| unavailable(&e))?;

        Ok(RasterAsset { path, band })
    }
}

/// Replace the cached tile atomically so a concurrent reader never sees a partial file.
fn write_cached(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn region() -> (Region, DateRange) {
        (
            Region {
                latitude: -3.4653,
                longitude: -62.2159,
                buffer_m: 2500.0,
            },
            DateRange {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            },
        )
    }

    #[tokio::test]
    async fn test_local_snapshot_partial() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ndvi_real_time.tif"), b"stub").unwrap();

        let provider = ImageryProvider::Local(LocalImagery::new(dir.path()));
        let (r, d) = region();
        let (veg, water) = fetch_snapshot(&provider, &r, &d).await;

        assert_eq!(veg.unwrap().band, Band::Ndvi);
        assert!(water.is_none());
    }

    #[test]
    fn test_write_cached_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiles").join("ndwi_real_time.tif");
        write_cached(&dir.path().join("tiles"), &path, b"one").unwrap();
        write_cached(&dir.path().join("tiles"), &path, b"two").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"two");
    }
}
