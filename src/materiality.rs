use crate::schema::{MaterialVariance, MaterialityThresholds, VarianceRecord, VarianceType};

/// Neutral records are never material. Otherwise either threshold is enough.
pub fn is_material(record: &VarianceRecord, thresholds: &MaterialityThresholds) -> bool {
    if record.variance_type == VarianceType::Neutral {
        return false;
    }

    record.dollar_variance.abs() >= thresholds.dollar
        || record.percent_variance.abs() >= thresholds.percent
}

/// Keeps the material records in input order; everything else is dropped.
pub fn flag_material_variances(
    records: &[VarianceRecord],
    thresholds: &MaterialityThresholds,
) -> Vec<MaterialVariance> {
    records
        .iter()
        .filter(|record| is_material(record, thresholds))
        .cloned()
        .map(MaterialVariance::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AccountCategory, LineItem};
    use crate::variance::{calculate_variance, calculate_variances};

    fn record(dollar: f64, percent: f64, variance_type: VarianceType) -> VarianceRecord {
        VarianceRecord {
            account_name: "Test".to_string(),
            current_period: 0.0,
            prior_period: 0.0,
            category: AccountCategory::Revenue,
            dollar_variance: dollar,
            percent_variance: percent,
            variance_type,
        }
    }

    #[test]
    fn test_percent_threshold_alone_is_enough() {
        let thresholds = MaterialityThresholds::new(50_000.0, 10.0);
        assert!(is_material(
            &record(40_000.0, 12.0, VarianceType::Favorable),
            &thresholds
        ));
    }

    #[test]
    fn test_dollar_threshold_alone_is_enough() {
        let thresholds = MaterialityThresholds::new(50_000.0, 10.0);
        assert!(is_material(
            &record(-60_000.0, -2.0, VarianceType::Unfavorable),
            &thresholds
        ));
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let thresholds = MaterialityThresholds::new(50_000.0, 10.0);
        assert!(is_material(
            &record(50_000.0, 1.0, VarianceType::Favorable),
            &thresholds
        ));
        assert!(is_material(
            &record(1.0, -10.0, VarianceType::Unfavorable),
            &thresholds
        ));
        assert!(!is_material(
            &record(49_999.99, 9.99, VarianceType::Favorable),
            &thresholds
        ));
    }

    #[test]
    fn test_neutral_never_material() {
        let thresholds = MaterialityThresholds::new(0.0, 0.0);
        assert!(!is_material(
            &record(1e12, f64::INFINITY, VarianceType::Neutral),
            &thresholds
        ));
    }

    #[test]
    fn test_infinite_percent_meets_any_finite_threshold() {
        let thresholds = MaterialityThresholds::new(1e9, 1e9);
        assert!(is_material(
            &record(10.0, f64::INFINITY, VarianceType::Favorable),
            &thresholds
        ));
    }

    fn sample_records() -> Vec<VarianceRecord> {
        let items: Vec<LineItem> = [
            ("Revenue", 1_250_000.0, 1_100_000.0),
            ("Cost of Goods Sold", 470_000.0, 420_000.0),
            ("R&D Expenses", 210_000.0, 240_000.0),
            ("Interest Expense", 16_000.0, 14_000.0),
            ("Other Income", 3_000.0, 0.0),
            ("Marketing Spending", 95_000.0, 180_000.0),
            ("Gross Profit", 780_000.0, 680_000.0),
        ]
        .iter()
        .map(|(name, current, prior)| LineItem {
            account_name: name.to_string(),
            current_period: *current,
            prior_period: *prior,
        })
        .collect();
        calculate_variances(&items)
    }

    fn material_names(records: &[VarianceRecord], dollar: f64, percent: f64) -> Vec<String> {
        flag_material_variances(records, &MaterialityThresholds::new(dollar, percent))
            .into_iter()
            .map(|m| m.record.account_name)
            .collect()
    }

    /// Each set must be contained in the one before it.
    fn assert_shrinking(sets: &[Vec<String>]) {
        for pair in sets.windows(2) {
            assert!(
                pair[1].iter().all(|name| pair[0].contains(name)),
                "{:?} is not a subset of {:?}",
                pair[1],
                pair[0]
            );
        }
    }

    #[test]
    fn test_raising_both_thresholds_never_grows_the_set() {
        let records = sample_records();
        let sets: Vec<_> = (0..8)
            .map(|step| material_names(&records, step as f64 * 20_000.0, step as f64 * 4.0))
            .collect();
        assert_shrinking(&sets);
    }

    #[test]
    fn test_raising_dollar_threshold_alone_never_grows_the_set() {
        let records = sample_records();

        for percent in [0.0, 5.0, 12.0, 50.0, 1e6] {
            let sets: Vec<_> = (0..=10)
                .map(|step| material_names(&records, step as f64 * 25_000.0, percent))
                .collect();
            assert_shrinking(&sets);
        }

        // with a high percent bar the dollar threshold decides alone
        let loose = material_names(&records, 0.0, 1e6);
        let tight = material_names(&records, 100_000.0, 1e6);
        assert!(tight.len() < loose.len());
        assert!(tight.contains(&"Revenue".to_string()));
        assert!(tight.contains(&"Other Income".to_string()));
    }

    #[test]
    fn test_raising_percent_threshold_alone_never_grows_the_set() {
        let records = sample_records();

        for dollar in [0.0, 10_000.0, 60_000.0, 200_000.0, 1e12] {
            let sets: Vec<_> = (0..=10)
                .map(|step| material_names(&records, dollar, step as f64 * 5.0))
                .collect();
            assert_shrinking(&sets);
        }

        // with a high dollar bar the percent threshold decides alone
        let loose = material_names(&records, 1e12, 0.0);
        let tight = material_names(&records, 1e12, 40.0);
        assert!(tight.len() < loose.len());
        assert_eq!(tight, vec!["Other Income", "Marketing Spending"]);
    }

    #[test]
    fn test_filter_preserves_order_and_marks_material() {
        let items = [
            LineItem {
                account_name: "Interest Expense".to_string(),
                current_period: 16_000.0,
                prior_period: 14_000.0,
            },
            LineItem {
                account_name: "Gross Profit".to_string(),
                current_period: 780_000.0,
                prior_period: 680_000.0,
            },
            LineItem {
                account_name: "Revenue".to_string(),
                current_period: 1_250_000.0,
                prior_period: 1_100_000.0,
            },
        ];
        let records: Vec<_> = items.iter().map(calculate_variance).collect();
        let material = flag_material_variances(&records, &MaterialityThresholds::default());

        let names: Vec<_> = material
            .iter()
            .map(|m| m.record.account_name.as_str())
            .collect();
        assert_eq!(names, vec!["Interest Expense", "Revenue"]);
        assert!(material.iter().all(|m| m.is_material && m.explanation.is_none()));
    }
}
