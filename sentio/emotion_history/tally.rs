//! Frequency counter with an explicit tie-break.
//!
//! Labels with equal counts keep the order in which each label was first
//! observed. The ranking is a stable sort by count over insertion order.

use indexmap::IndexMap;

use crate::event::EmotionLabel;

/// Insertion-ordered label counter.
#[derive(Debug, Clone, Default)]
pub struct LabelTally {
    counts: IndexMap<EmotionLabel, usize>,
}

impl LabelTally {
    /// Creates an empty tally.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one occurrence of `label`.
    pub fn observe(&mut self, label: EmotionLabel) {
        *self.counts.entry(label).or_insert(0) += 1;
    }

    /// All labels, most frequent first.
    #[must_use]
    pub fn ranked(&self) -> Vec<(EmotionLabel, usize)> {
        let mut ranked: Vec<_> = self
            .counts
            .iter()
            .map(|(label, count)| (*label, *count))
            .collect();
        // stable: equal counts stay in first-seen order
        ranked.sort_by(|(_, a), (_, b)| b.cmp(a));
        ranked
    }

    /// The most frequent label, if any.
    #[must_use]
    pub fn dominant(&self) -> Option<EmotionLabel> {
        self.ranked().first().map(|(label, _)| *label)
    }
}

impl FromIterator<EmotionLabel> for LabelTally {
    fn from_iter<I: IntoIterator<Item = EmotionLabel>>(iter: I) -> Self {
        let mut tally = Self::new();
        for label in iter {
            tally.observe(label);
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EmotionLabel::{Angry, Happy, Neutral, Sad};

    #[test]
    fn empty_tally_has_no_dominant() {
        let tally = LabelTally::new();
        assert_eq!(tally.dominant(), None);
        assert!(tally.ranked().is_empty());
    }

    #[test]
    fn ties_go_to_first_seen_label() {
        let tally: LabelTally = [Sad, Happy, Sad, Happy].into_iter().collect();
        assert_eq!(tally.dominant(), Some(Sad));

        // sad reaches two first, happy was seen first
        let tally: LabelTally = [Happy, Sad, Sad, Happy].into_iter().collect();
        assert_eq!(tally.dominant(), Some(Happy));
        assert_eq!(tally.ranked(), vec![(Happy, 2), (Sad, 2)]);
    }

    #[test]
    fn singleton_tie_goes_to_first_seen() {
        let tally: LabelTally = [Happy, Sad, Angry].into_iter().collect();
        assert_eq!(tally.ranked(), vec![(Happy, 1), (Sad, 1), (Angry, 1)]);
    }

    #[test]
    fn higher_counts_rank_first() {
        let tally: LabelTally = [Neutral, Angry, Angry, Neutral, Angry].into_iter().collect();
        assert_eq!(tally.ranked(), vec![(Angry, 3), (Neutral, 2)]);
    }
}
