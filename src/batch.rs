//! Batch orchestration: score every organization on a bounded worker pool, then partition
//! the per-task results into the record store and the failure list.

use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::{OrganizationRecord, RiskProfile};
use crate::scorer::{OrgFailure, Scorer};
use crate::store::RecordStore;

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub store: RecordStore,
    pub failures: Vec<OrgFailure>,
}

impl BatchOutcome {
    pub fn scored(&self) -> usize {
        self.store.len()
    }
}

/// Score `records` with at most `workers` threads.
///
/// Returns only after every task has finished; results keep input order.
pub fn run(
    records: &[OrganizationRecord],
    scorer: &Scorer<'_>,
    workers: usize,
    progress: Option<&ProgressBar>,
) -> Result<BatchOutcome> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("scorer-{}", i))
        .build()
        .map_err(|e| Error::GenerationFailure(format!("cannot start worker pool: {}", e)))?;

    let results: Vec<std::result::Result<RiskProfile, OrgFailure>> = pool.install(|| {
        records
            .par_iter()
            .map(|record| {
                let res = scorer.score(record);
                if let Some(pb) = progress {
                    pb.inc(1);
                }
                res
            })
            .collect()
    });

    let mut outcome = BatchOutcome::default();
    for (record, result) in records.iter().zip(results) {
        match result {
            Ok(profile) => outcome.store.insert(record.company.clone(), profile),
            Err(failure) => outcome.failures.push(failure),
        }
    }

    if outcome.failures.is_empty() {
        info!(scored = outcome.scored(), "batch complete");
    } else {
        warn!(
            scored = outcome.scored(),
            failed = outcome.failures.len(),
            "batch complete with skipped organizations"
        );
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::registry;
    use crate::scorer::tests::{acme, recommendations, zero_snapshot};
    use crate::trends::TrendDataset;

    #[test]
    fn test_n_minus_k_entries() {
        let models = registry();
        let snapshot = zero_snapshot();
        let trends = TrendDataset::default();
        let recs = recommendations();
        let scorer = Scorer::new(&models, &snapshot, &trends, &recs);

        let records: Vec<OrganizationRecord> = (0..10)
            .map(|i| {
                let mut r = acme();
                r.company = format!("Org {}", i);
                // every third organization trips the natural-capital model
                if i % 3 == 0 {
                    r.land_area = -5.0;
                }
                r
            })
            .collect();

        let outcome = run(&records, &scorer, 4, None).unwrap();
        assert_eq!(outcome.failures.len(), 4);
        assert_eq!(outcome.scored(), 6);

        let failed: Vec<&str> = outcome.failures.iter().map(|f| f.company.as_str()).collect();
        assert_eq!(failed, vec!["Org 0", "Org 3", "Org 6", "Org 9"]);
        assert!(outcome.store.get("Org 1").is_some());
        assert!(outcome.store.get("Org 0").is_none());
    }

    #[test]
    fn test_acme_degraded_imagery_lands_in_store() {
        let models = registry();
        let snapshot = zero_snapshot();
        let trends = TrendDataset::default();
        let recs = recommendations();
        let scorer = Scorer::new(&models, &snapshot, &trends, &recs);

        let outcome = run(&[acme()], &scorer, 1, None).unwrap();
        let profile = outcome.store.get("Acme Co").unwrap();
        assert!((0.0..=1.0).contains(&profile.deforestation_risk));
    }

    #[test]
    fn test_empty_batch() {
        let models = registry();
        let snapshot = zero_snapshot();
        let trends = TrendDataset::default();
        let recs = recommendations();
        let scorer = Scorer::new(&models, &snapshot, &trends, &recs);

        let outcome = run(&[], &scorer, 0, None).unwrap();
        assert!(outcome.store.is_empty());
        assert!(outcome.failures.is_empty());
    }
}
