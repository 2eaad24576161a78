//! Relevance score normalization.
//!
//! Raw relevance scores returned by an engine are not normalized and may
//! cover an enormous range. [`normalize_ranks`] converts them to values
//! between 0 and 1 in proportion to the largest rank, preserving input order.

/// Normalize raw relevance scores to the `[0, 1]` range.
///
/// The output has the same length and order as the input. An empty input
/// yields an empty output. When the maximum is zero or negative there is no
/// ranking signal to scale by, and every element maps to 0 rather than
/// dividing by zero.
pub fn normalize_ranks(ranks: &[f32]) -> Vec<f32> {
    if ranks.is_empty() {
        return Vec::new();
    }

    let max = ranks.iter().copied().fold(f32::MIN, f32::max);
    if max <= 0.0 {
        return vec![0.0; ranks.len()];
    }

    ranks.iter().map(|rank| rank / max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_scales_to_unit_maximum() {
        let normalized = normalize_ranks(&[2.0, 8.0, 4.0]);

        assert_eq!(normalized, vec![0.25, 1.0, 0.5]);
        assert_eq!(normalized.iter().copied().fold(f32::MIN, f32::max), 1.0);
    }

    #[test]
    fn test_normalize_preserves_order_and_length() {
        let input = vec![5.0, 1.0, 3.0, 1.0, 5.0];
        let normalized = normalize_ranks(&input);

        assert_eq!(normalized.len(), input.len());
        for window in [(0usize, 1usize), (1, 2), (2, 3)] {
            let before = input[window.0].partial_cmp(&input[window.1]).unwrap();
            let after = normalized[window.0].partial_cmp(&normalized[window.1]).unwrap();
            assert_eq!(before, after);
        }
    }

    #[test]
    fn test_normalize_empty_input() {
        assert!(normalize_ranks(&[]).is_empty());
    }

    #[test]
    fn test_normalize_all_zero_input() {
        let normalized = normalize_ranks(&[0.0, 0.0, 0.0]);
        assert_eq!(normalized, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_normalize_negative_maximum() {
        let normalized = normalize_ranks(&[-3.0, -1.0]);
        assert_eq!(normalized, vec![0.0, 0.0]);
    }
}
