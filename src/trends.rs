//! Biodiversity population-trend dataset.
//!
//! A JSON array of entries, each either carrying a ready `normalized_trend` or raw yearly
//! `population` counts (gaps as `null`). Entries tagged with `company` belong to that
//! organization; untagged entries form the regional baseline every organization falls back to.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::OrganizationRecord;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendEntry {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub normalized_trend: Vec<f32>,
    #[serde(default)]
    pub population: Vec<Option<f64>>,
}

impl TrendEntry {
    /// The normalized series, derived from `population` when no ready trend is present.
    fn trend(&self) -> Vec<f32> {
        if self.normalized_trend.is_empty() {
            normalize_population(&self.population)
        } else {
            self.normalized_trend.clone()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrendDataset {
    entries: Vec<TrendEntry>,
}

impl TrendDataset {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::data_unavailable(path.display().to_string(), e))?;
        let entries: Vec<TrendEntry> = serde_json::from_str(&content)?;
        debug!(path = %path.display(), entries = entries.len(), "biodiversity trends loaded");
        Ok(Self { entries })
    }

    /// Model input sequences for one organization.
    ///
    /// Resolution order: entries tagged with the organization, then untagged regional
    /// entries, then a flat series at the organization's own biodiversity index. Every
    /// series drops its final value (the year the model predicts); series shorter than 2
    /// are skipped.
    pub fn sequences_for(&self, record: &OrganizationRecord, steps: usize) -> Vec<Vec<f32>> {
        let own: Vec<&TrendEntry> = self
            .entries
            .iter()
            .filter(|e| e.company.as_deref() == Some(record.company.as_str()))
            .collect();
        let chosen = if own.is_empty() {
            self.entries.iter().filter(|e| e.company.is_none()).collect()
        } else {
            own
        };

        let sequences: Vec<Vec<f32>> = chosen
            .iter()
            .map(|e| e.trend())
            .filter(|t| t.len() > 1)
            .map(|mut t| {
                t.pop();
                t
            })
            .collect();

        if sequences.is_empty() {
            vec![vec![record.biodiversity_index as f32; steps]]
        } else {
            sequences
        }
    }
}

/// Fill gaps by linear interpolation (edges take the nearest known value), then min-max
/// scale to [0, 1]. A constant series becomes all zeros; a series with no known value is empty.
pub fn normalize_population(values: &[Option<f64>]) -> Vec<f32> {
    let known: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| x.is_finite()).map(|x| (i, x)))
        .collect();
    if known.is_empty() {
        return Vec::new();
    }

    let filled: Vec<f64> = (0..values.len())
        .map(|i| {
            let next = known.iter().position(|&(k, _)| k >= i);
            match next {
                Some(0) => known[0].1,
                None => known[known.len() - 1].1,
                Some(n) => {
                    let (i1, v1) = known[n];
                    if i1 == i {
                        return v1;
                    }
                    let (i0, v0) = known[n - 1];
                    v0 + (v1 - v0) * (i - i0) as f64 / (i1 - i0) as f64
                }
            }
        })
        .collect();

    let min = filled.iter().copied().fold(f64::INFINITY, f64::min);
    let max = filled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    filled
        .iter()
        .map(|v| {
            if max > min {
                ((v - min) / (max - min)) as f32
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
impl From<Vec<TrendEntry>> for TrendDataset {
    fn from(entries: Vec<TrendEntry>) -> Self {
        Self { entries }
    }
}
