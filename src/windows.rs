use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Slides a two-pointer window of width `window` (a strict `<=` span)
/// across `items` (assumed sorted by `timestamp_of`) and returns the first
/// window, by scan order, that achieves the maximum number of distinct keys.
///
/// Returns `(max_distinct_count, left_index, right_index)`, or `None` if
/// `items` is empty.
pub fn widest_window_first_max<T>(
    items: &[T],
    window: Duration,
    timestamp_of: impl Fn(&T) -> DateTime<Utc>,
    key_of: impl Fn(&T) -> &str,
) -> Option<(usize, usize, usize)> {
    if items.is_empty() {
        return None;
    }

    let mut freq: HashMap<&str, usize> = HashMap::new();
    let mut left = 0usize;
    let mut best: Option<(usize, usize, usize)> = None;

    for right in 0..items.len() {
        *freq.entry(key_of(&items[right])).or_insert(0) += 1;

        while timestamp_of(&items[right]) - timestamp_of(&items[left]) > window {
            let evicted = key_of(&items[left]);
            if let Some(count) = freq.get_mut(evicted) {
                *count -= 1;
                if *count == 0 {
                    freq.remove(evicted);
                }
            }
            left += 1;
        }

        let unique = freq.len();
        if best.map_or(true, |(best_unique, _, _)| unique > best_unique) {
            best = Some((unique, left, right));
        }
    }

    best
}

/// Maximum number of items falling within any `window`-wide span over
/// `sorted_timestamps`, using the same shrink-while-over-window rule as
/// [`widest_window_first_max`] but counting raw occurrences rather than
/// distinct keys.
pub fn max_window_count(sorted_timestamps: &[DateTime<Utc>], window: Duration) -> usize {
    if sorted_timestamps.is_empty() {
        return 0;
    }

    let mut left = 0usize;
    let mut best = 0usize;

    for right in 0..sorted_timestamps.len() {
        while sorted_timestamps[right] - sorted_timestamps[left] > window {
            left += 1;
        }
        best = best.max(right - left + 1);
    }

    best
}
