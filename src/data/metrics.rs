//! Derived metrics over a sample window.

use super::sample::CountSample;

/// Maximum count in the window, 0 when empty.
pub fn peak<'a>(samples: impl IntoIterator<Item = &'a CountSample>) -> u64 {
    samples.into_iter().map(|s| s.count).max().unwrap_or(0)
}

/// Mean count rounded to the nearest integer (halves round up), 0 when empty.
pub fn average<'a>(samples: impl IntoIterator<Item = &'a CountSample>) -> u64 {
    let (sum, n) = samples
        .into_iter()
        .fold((0u128, 0u128), |(sum, n), s| (sum + s.count as u128, n + 1));
    if n == 0 {
        return 0;
    }
    ((sum + n / 2) / n) as u64
}
