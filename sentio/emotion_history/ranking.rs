//! Window-wide label ranking.

use serde::{Deserialize, Serialize};

use crate::{event::EmotionEvent, event::EmotionLabel, tally::LabelTally};

/// Default number of labels reported by [`top_k`].
pub const DEFAULT_TOP_K: usize = 2;

/// A label and how often it occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    /// Emotion label.
    pub label: EmotionLabel,
    /// Occurrences in the window.
    pub count: usize,
}

/// The `k` most frequent labels across all events, most frequent first.
#[must_use]
pub fn top_k<'a, I>(events: I, k: usize) -> Vec<LabelCount>
where
    I: IntoIterator<Item = &'a EmotionEvent>,
{
    let tally: LabelTally = events.into_iter().map(EmotionEvent::label).collect();
    tally
        .ranked()
        .into_iter()
        .take(k)
        .map(|(label, count)| LabelCount { label, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SignalSource;
    use chrono::NaiveDate;
    use EmotionLabel::{Happy, Neutral, Sad};

    fn events(labels: &[EmotionLabel]) -> Vec<EmotionEvent> {
        let at = NaiveDate::from_ymd_opt(2025, 2, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        labels
            .iter()
            .map(|label| EmotionEvent::new(*label, SignalSource::Text, at, None).unwrap())
            .collect()
    }

    fn pairs(ranked: &[LabelCount]) -> Vec<(EmotionLabel, usize)> {
        ranked.iter().map(|lc| (lc.label, lc.count)).collect()
    }

    #[test]
    fn keeps_the_k_most_frequent() {
        let history = events(&[
            Happy, Sad, Neutral, Happy, Sad, Happy, Neutral, Sad, Neutral, Happy, Happy,
        ]);
        let ranked = top_k(&history, DEFAULT_TOP_K);
        assert_eq!(pairs(&ranked), vec![(Happy, 5), (Sad, 3)]);
    }

    #[test]
    fn fewer_labels_than_k_returns_all() {
        let history = events(&[Neutral, Neutral]);
        assert_eq!(pairs(&top_k(&history, 3)), vec![(Neutral, 2)]);
    }

    #[test]
    fn empty_input_and_zero_k() {
        assert!(top_k(&events(&[]), 2).is_empty());
        assert!(top_k(&events(&[Happy]), 0).is_empty());
    }

    #[test]
    fn serializes_as_named_pairs() {
        let value = serde_json::to_value(LabelCount {
            label: Sad,
            count: 4,
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({ "label": "sad", "count": 4 }));
    }
}
