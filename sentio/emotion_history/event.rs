//! Classified observations: the label set, signal sources, questionnaire
//! scoring, and the immutable event record.

use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{HistoryError, HistoryResult};

/// Closed set of tags accepted by the history.
///
/// The first four are produced by the camera, voice, and questionnaire
/// classifiers. The free-text classifier adds the remaining emotions and a
/// set of topic tags (`family`, `work`, ...) that are tallied like any other
/// label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    /// Positive affect.
    Happy,
    /// Low mood.
    Sad,
    /// Anger or irritation.
    Angry,
    /// No dominant affect.
    Neutral,
    /// Fear.
    Afraid,
    /// Worry or unease.
    Anxious,
    /// Shame.
    Ashamed,
    /// Social discomfort.
    Awkward,
    /// Boredom.
    Bored,
    /// Calm.
    Calm,
    /// Confusion.
    Confused,
    /// Disgust.
    Disgusted,
    /// Excitement.
    Excited,
    /// Frustration.
    Frustrated,
    /// Jealousy.
    Jealous,
    /// Nostalgia.
    Nostalgic,
    /// Pride.
    Proud,
    /// Satisfaction.
    Satisfied,
    /// Surprise.
    Surprised,
    /// Physical activity.
    Exercise,
    /// Family life.
    Family,
    /// Eating and meals.
    Food,
    /// Friendships.
    Friends,
    /// Faith and religion.
    God,
    /// Physical or mental health.
    Health,
    /// Romance and affection.
    Love,
    /// Hobbies and leisure.
    Recreation,
    /// Study and school.
    School,
    /// Sleep.
    Sleep,
    /// Work and career.
    Work,
}

impl EmotionLabel {
    /// Every label, base set first, topics last.
    pub const ALL: [Self; 30] = [
        Self::Happy,
        Self::Sad,
        Self::Angry,
        Self::Neutral,
        Self::Afraid,
        Self::Anxious,
        Self::Ashamed,
        Self::Awkward,
        Self::Bored,
        Self::Calm,
        Self::Confused,
        Self::Disgusted,
        Self::Excited,
        Self::Frustrated,
        Self::Jealous,
        Self::Nostalgic,
        Self::Proud,
        Self::Satisfied,
        Self::Surprised,
        Self::Exercise,
        Self::Family,
        Self::Food,
        Self::Friends,
        Self::God,
        Self::Health,
        Self::Love,
        Self::Recreation,
        Self::School,
        Self::Sleep,
        Self::Work,
    ];

    /// Lowercase tag used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Neutral => "neutral",
            Self::Afraid => "afraid",
            Self::Anxious => "anxious",
            Self::Ashamed => "ashamed",
            Self::Awkward => "awkward",
            Self::Bored => "bored",
            Self::Calm => "calm",
            Self::Confused => "confused",
            Self::Disgusted => "disgusted",
            Self::Excited => "excited",
            Self::Frustrated => "frustrated",
            Self::Jealous => "jealous",
            Self::Nostalgic => "nostalgic",
            Self::Proud => "proud",
            Self::Satisfied => "satisfied",
            Self::Surprised => "surprised",
            Self::Exercise => "exercise",
            Self::Family => "family",
            Self::Food => "food",
            Self::Friends => "friends",
            Self::God => "god",
            Self::Health => "health",
            Self::Love => "love",
            Self::Recreation => "recreation",
            Self::School => "school",
            Self::Sleep => "sleep",
            Self::Work => "work",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionLabel {
    type Err = HistoryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let needle = raw.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == needle)
            .ok_or_else(|| HistoryError::validation("label", format!("unrecognized label {raw:?}")))
    }
}

/// Origin of a classified signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SignalSource {
    /// Webcam facial classification.
    Camera,
    /// Audio feature classification.
    Voice,
    /// PHQ-9 / GAD-7 questionnaire.
    Form,
    /// Free-text classification.
    Text,
}

impl SignalSource {
    /// Lowercase tag used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Voice => "voice",
            Self::Form => "form",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalSource {
    type Err = HistoryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "camera" => Ok(Self::Camera),
            "voice" => Ok(Self::Voice),
            "form" => Ok(Self::Form),
            "text" => Ok(Self::Text),
            _ => Err(HistoryError::validation(
                "source",
                format!("unrecognized source {raw:?}"),
            )),
        }
    }
}

/// Number of answers on the PHQ-9 depression questionnaire.
pub const PHQ9_ITEMS: usize = 9;
/// Number of answers on the GAD-7 anxiety questionnaire.
pub const GAD7_ITEMS: usize = 7;
/// Highest score a single questionnaire answer may carry.
pub const MAX_ANSWER: u8 = 3;

/// Questionnaire totals attached to `form` events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreeningScores {
    /// PHQ-9 total (0..=27).
    pub phq9: u32,
    /// GAD-7 total (0..=21).
    pub gad7: u32,
}

impl ScreeningScores {
    /// Wraps already-computed totals.
    #[must_use]
    pub const fn new(phq9: u32, gad7: u32) -> Self {
        Self { phq9, gad7 }
    }

    /// Sums raw answers after checking answer counts and ranges.
    pub fn from_answers(phq9: &[u8], gad7: &[u8]) -> HistoryResult<Self> {
        Ok(Self {
            phq9: total("phq9", phq9, PHQ9_ITEMS)?,
            gad7: total("gad7", gad7, GAD7_ITEMS)?,
        })
    }

    /// Maps totals to a label: both minimal is happy, either severe is sad,
    /// moderate anxiety is angry, anything else neutral.
    #[must_use]
    pub const fn classify(&self) -> EmotionLabel {
        if self.phq9 <= 4 && self.gad7 <= 4 {
            EmotionLabel::Happy
        } else if self.phq9 >= 15 || self.gad7 >= 15 {
            EmotionLabel::Sad
        } else if self.gad7 >= 10 {
            EmotionLabel::Angry
        } else {
            EmotionLabel::Neutral
        }
    }
}

fn total(field: &'static str, answers: &[u8], expected: usize) -> HistoryResult<u32> {
    if answers.len() != expected {
        return Err(HistoryError::validation(
            field,
            format!("expected {expected} answers, got {}", answers.len()),
        ));
    }
    if let Some(bad) = answers.iter().find(|answer| **answer > MAX_ANSWER) {
        return Err(HistoryError::validation(
            field,
            format!("answer {bad} outside 0..={MAX_ANSWER}"),
        ));
    }
    Ok(answers.iter().map(|answer| u32::from(*answer)).sum())
}

/// One classified observation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmotionEvent {
    id: Uuid,
    label: EmotionLabel,
    source: SignalSource,
    timestamp: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scores: Option<ScreeningScores>,
}

impl EmotionEvent {
    /// Creates an event; scores are only accepted on `form` events.
    pub fn new(
        label: EmotionLabel,
        source: SignalSource,
        timestamp: NaiveDateTime,
        scores: Option<ScreeningScores>,
    ) -> HistoryResult<Self> {
        if scores.is_some() && source != SignalSource::Form {
            return Err(HistoryError::validation(
                "scores",
                format!("scores are only carried by form events, not {source}"),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            label,
            source,
            timestamp,
            scores,
        })
    }

    /// Event identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Classified label.
    #[must_use]
    pub const fn label(&self) -> EmotionLabel {
        self.label
    }

    /// Signal origin.
    #[must_use]
    pub const fn source(&self) -> SignalSource {
        self.source
    }

    /// Local wall-clock time of the observation.
    #[must_use]
    pub const fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Questionnaire totals for `form` events.
    #[must_use]
    pub const fn scores(&self) -> Option<ScreeningScores> {
        self.scores
    }
}

pub(crate) fn validate_user_id(user_id: &str) -> HistoryResult<()> {
    if user_id.trim().is_empty() {
        return Err(HistoryError::validation("user_id", "must not be empty"));
    }
    Ok(())
}
