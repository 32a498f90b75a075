use super::error::{Result, SimulationError};
use super::types::HistogramBin;

/// Upper bound on bins per histogram.
pub const MAX_HISTOGRAM_BINS: usize = 10_000;

/// Equal-width histogram from the minimum to the maximum value.
///
/// Bins are half-open except the last, which also takes the maximum. When every value
/// is identical a single unit-width bin centred on that value holds them all.
pub fn histogram(values: &[f64], bin_count: usize) -> Result<Vec<HistogramBin>> {
    if values.is_empty() {
        return Err(SimulationError::EmptyHistogramInput);
    }
    if bin_count == 0 {
        return Err(SimulationError::invalid("bin_count", "must be >= 1"));
    }
    if bin_count > MAX_HISTOGRAM_BINS {
        return Err(SimulationError::invalid(
            "bin_count",
            format!("must be <= {MAX_HISTOGRAM_BINS}, got {bin_count}"),
        ));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(SimulationError::invalid("values", "must all be finite"));
    }

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    if min == max {
        return Ok(vec![bin(values.len() as u32, min - 0.5, max + 0.5)]);
    }

    let width = (max - min) / bin_count as f64;
    let edge = |idx: usize| {
        if idx == bin_count {
            max
        } else {
            min + idx as f64 * width
        }
    };

    let mut counts = vec![0_u32; bin_count];
    for &value in values {
        let idx = (((value - min) / width).floor() as usize).min(bin_count - 1);
        counts[idx] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| bin(count, edge(idx), edge(idx + 1)))
        .collect())
}

fn bin(count: u32, left: f64, right: f64) -> HistogramBin {
    HistogramBin {
        count,
        left,
        right,
        label: format!("{} to {}", left.trunc() as i64, right.trunc() as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};
    use proptest::collection::vec;

    #[test]
    fn rejects_bin_counts_over_the_ceiling() {
        for bin_count in [MAX_HISTOGRAM_BINS + 1, usize::MAX / 4, usize::MAX] {
            assert!(matches!(
                histogram(&[1.0, 2.0], bin_count),
                Err(SimulationError::InvalidParameter { name: "bin_count", .. })
            ));
        }
    }

    #[test]
    fn accepts_bin_count_at_the_ceiling() {
        let bins = histogram(&[1.0, 2.0], MAX_HISTOGRAM_BINS).expect("ceiling is inclusive");
        assert_eq!(bins.len(), MAX_HISTOGRAM_BINS);
        assert_eq!(bins.iter().map(|b| b.count).sum::<u32>(), 2);
    }

    #[test]
    fn counts_values_into_equal_width_bins() {
        let bins = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0, 10.0], 5).expect("valid");

        assert_eq!(bins.len(), 5);
        assert_eq!(
            bins.iter().map(|b| b.count).collect::<Vec<_>>(),
            vec![2, 2, 1, 0, 1]
        );
        assert_eq!(bins[0].left, 0.0);
        assert_eq!(bins[0].right, 2.0);
        assert_eq!(bins[4].right, 10.0);
        assert_eq!(bins[1].label, "2 to 4");
    }

    #[test]
    fn maximum_lands_in_last_bin() {
        let bins = histogram(&[1.0, 2.0], 4).expect("valid");
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[3].count, 1);
    }

    #[test]
    fn labels_truncate_edges_towards_zero() {
        let bins = histogram(&[-150.7, 99.9], 2).expect("valid");
        assert_eq!(bins[0].label, "-150 to -25");
        assert_eq!(bins[1].label, "-25 to 99");
    }

    #[test]
    fn identical_values_produce_one_bin() {
        let bins = histogram(&[42.0; 7], 100).expect("valid");
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 7);
        assert!(bins[0].left <= 42.0 && 42.0 <= bins[0].right);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(histogram(&[], 10), Err(SimulationError::EmptyHistogramInput));
    }

    #[test]
    fn zero_bins_and_non_finite_values_are_rejected() {
        assert!(matches!(
            histogram(&[1.0], 0),
            Err(SimulationError::InvalidParameter { name: "bin_count", .. })
        ));
        assert!(matches!(
            histogram(&[1.0, f64::NAN], 3),
            Err(SimulationError::InvalidParameter { name: "values", .. })
        ));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_counts_sum_to_input_length(
            values in vec(-1.0e6f64..1.0e6, 1..400),
            bins in 1usize..150,
        ) {
            let hist = histogram(&values, bins).expect("valid input");
            let total: u32 = hist.iter().map(|b| b.count).sum();
            prop_assert_eq!(total as usize, values.len());
            for pair in hist.windows(2) {
                prop_assert!(pair[0].right <= pair[1].right);
            }
        }
    }
}
