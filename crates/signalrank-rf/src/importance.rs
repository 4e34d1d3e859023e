//! Variance-reduction importance aggregation across trees.

/// A ranked feature with name, importance score, and rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFeature {
    /// Feature name.
    pub name: String,
    /// Normalized importance score (sums to 1.0 across all features, or all 0.0).
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Summed importances across the forest.
#[derive(Debug, Clone)]
pub(crate) struct AggregatedImportances {
    /// Ranked, normalized importances.
    pub(crate) ranked: Vec<RankedFeature>,
    /// Sum of raw variance reduction over all trees and features.
    pub(crate) grand_total: f64,
}

/// Aggregate per-tree raw variance-reduction totals into ranked features.
///
/// Sums totals across trees in tree order, normalizes to sum to 1.0,
/// sorts descending by importance (ties keep column order), and assigns
/// 1-based ranks. When no split reduced variance every importance is 0.0.
pub(crate) fn aggregate_importances(
    per_tree: &[&[f64]],
    names: &[String],
) -> AggregatedImportances {
    let n_features = names.len();
    let mut totals = vec![0.0f64; n_features];

    for tree_totals in per_tree {
        for (total, &val) in totals.iter_mut().zip(tree_totals.iter()) {
            *total += val;
        }
    }

    let grand_total: f64 = totals.iter().sum();
    if grand_total > 0.0 {
        totals.iter_mut().for_each(|v| *v /= grand_total);
    } else {
        totals.iter_mut().for_each(|v| *v = 0.0);
    }

    let mut ranked: Vec<RankedFeature> = names
        .iter()
        .zip(totals.iter())
        .map(|(name, &importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();

    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, feat) in ranked.iter_mut().enumerate() {
        feat.rank = i + 1;
    }

    AggregatedImportances {
        ranked,
        grand_total,
    }
}

#[cfg(test)]
mod tests {
    use super::aggregate_importances;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    #[test]
    fn sums_and_normalizes() {
        let t1 = [1.0, 0.0, 3.0];
        let t2 = [1.0, 2.0, 1.0];
        let agg = aggregate_importances(&[&t1, &t2], &names(3));
        assert!((agg.grand_total - 8.0).abs() < 1e-12);

        let total: f64 = agg.ranked.iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-12);

        assert_eq!(agg.ranked[0].name, "f2");
        assert!((agg.ranked[0].importance - 0.5).abs() < 1e-12);
        assert_eq!(agg.ranked[0].rank, 1);
    }

    #[test]
    fn no_reduction_gives_all_zero() {
        let t1 = [0.0, 0.0];
        let agg = aggregate_importances(&[&t1], &names(2));
        assert_eq!(agg.grand_total, 0.0);
        assert!(agg.ranked.iter().all(|f| f.importance == 0.0));
        // Ties keep column order.
        assert_eq!(agg.ranked[0].name, "f0");
        assert_eq!(agg.ranked[1].rank, 2);
    }
}
