//! Index formulas
//!
//! Reductions from classified trials and item responses to participant-level
//! indices. Every formula returns `None` when its required set is empty.

use serde::{Deserialize, Serialize};

/// Fixed-point reflection used for reverse scoring: `min + max - raw`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReverseKey {
    pub scale_min: f64,
    pub scale_max: f64,
}

impl ReverseKey {
    pub const fn new(scale_min: f64, scale_max: f64) -> Self {
        Self {
            scale_min,
            scale_max,
        }
    }

    pub fn reverse(&self, raw: f64) -> f64 {
        self.scale_min + self.scale_max - raw
    }
}

/// Arithmetic mean of the values, `None` when empty
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), value| (sum + value, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// `a - b` when both sides are present
pub fn difference(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a - b),
        _ => None,
    }
}

/// `numerator / denominator`, `None` for an empty denominator
pub fn proportion(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

/// Sum and mean over the valid (present) values of an item set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemTotals {
    pub total: Option<f64>,
    pub mean: Option<f64>,
    pub valid: usize,
    pub missing: usize,
}

impl ItemTotals {
    pub fn from_items(items: &[Option<f64>]) -> Self {
        let valid_values: Vec<f64> = items.iter().flatten().copied().collect();
        let valid = valid_values.len();
        let total = if valid == 0 {
            None
        } else {
            Some(valid_values.iter().sum())
        };

        Self {
            total,
            mean: mean(valid_values),
            valid,
            missing: items.len() - valid,
        }
    }

    /// Share of items answered, as a percentage
    pub fn completion_pct(&self) -> f64 {
        let n = self.valid + self.missing;
        if n == 0 {
            0.0
        } else {
            self.valid as f64 / n as f64 * 100.0
        }
    }
}

/// Apply reverse keying to the listed 1-based item numbers
pub fn reverse_keyed(items: &[Option<f64>], reverse_items: &[usize], key: ReverseKey) -> Vec<Option<f64>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if reverse_items.contains(&(i + 1)) {
                item.map(|raw| key.reverse(raw))
            } else {
                *item
            }
        })
        .collect()
}

/// Totals over a subset of already-scored items (1-based item numbers)
pub fn subscale(scored: &[Option<f64>], item_numbers: &[usize]) -> ItemTotals {
    let selected: Vec<Option<f64>> = item_numbers
        .iter()
        .map(|&n| n.checked_sub(1).and_then(|i| scored.get(i)).copied().flatten())
        .collect();
    ItemTotals::from_items(&selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_empty_is_none() {
        assert_eq!(mean(Vec::<f64>::new()), None);
        assert_eq!(mean(vec![8.0, 5.0, 2.0]), Some(5.0));
    }

    #[test]
    fn test_difference_requires_both() {
        assert_eq!(difference(Some(500.0), Some(400.0)), Some(100.0));
        assert_eq!(difference(Some(500.0), None), None);
        assert_eq!(difference(None, Some(400.0)), None);
    }

    #[test]
    fn test_proportion_zero_denominator() {
        assert_eq!(proportion(0, 0), None);
        let p = proportion(2, 3).unwrap();
        assert!((p - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_reverse_key() {
        let ast = ReverseKey::new(0.0, 10.0);
        assert_eq!(ast.reverse(2.0), 8.0);

        let masq = ReverseKey::new(1.0, 5.0);
        assert_eq!(masq.reverse(1.0), 5.0);
        assert_eq!(masq.reverse(5.0), 1.0);
    }

    #[test]
    fn test_keyed_subscale() {
        let raw = vec![Some(1.0), Some(3.0), Some(5.0), Some(2.0), Some(4.0)];
        let scored = reverse_keyed(&raw, &[1], ReverseKey::new(1.0, 5.0));
        assert_eq!(
            scored,
            vec![Some(5.0), Some(3.0), Some(5.0), Some(2.0), Some(4.0)]
        );

        let scored = reverse_keyed(&raw, &[1], ReverseKey::new(0.0, 5.0));
        assert_eq!(
            scored,
            vec![Some(4.0), Some(3.0), Some(5.0), Some(2.0), Some(4.0)]
        );
        let totals = subscale(&scored, &[1, 3, 5]);
        assert_eq!(totals.total, Some(13.0));
        assert_eq!(totals.valid, 3);
    }

    #[test]
    fn test_item_totals_exclude_missing() {
        let totals = ItemTotals::from_items(&[Some(1.0), None, Some(3.0)]);
        assert_eq!(totals.total, Some(4.0));
        assert_eq!(totals.mean, Some(2.0));
        assert_eq!(totals.valid, 2);
        assert_eq!(totals.missing, 1);

        let empty = ItemTotals::from_items(&[None, None]);
        assert_eq!(empty.total, None);
        assert_eq!(empty.mean, None);
        assert_eq!(empty.completion_pct(), 0.0);
    }

    #[test]
    fn test_subscale_ignores_out_of_range_items() {
        let scored = vec![Some(2.0)];
        let totals = subscale(&scored, &[0, 1, 7]);
        assert_eq!(totals.total, Some(2.0));
        assert_eq!(totals.valid, 1);
        assert_eq!(totals.missing, 2);
    }
}
