use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Reply the classifier must use when the photo does not show a cat
pub const NOT_A_CAT_SENTINEL: &str = "ERROR: not a cat";

/// The closed set of emotions the classifier may answer with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emotion {
    Content,
    Happy,
    Curious,
    Affectionate,
    Scared,
    Aggressive,
    Annoyed,
    Anxious,
    Sad,
    Bored,
    Sleepy,
}

impl Emotion {
    /// Every emotion in the vocabulary, in the order the prompt lists them
    pub const ALL: [Emotion; 11] = [
        Emotion::Content,
        Emotion::Happy,
        Emotion::Curious,
        Emotion::Affectionate,
        Emotion::Scared,
        Emotion::Aggressive,
        Emotion::Annoyed,
        Emotion::Anxious,
        Emotion::Sad,
        Emotion::Bored,
        Emotion::Sleepy,
    ];

    /// The label used in prompts, API responses and the database
    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Content => "Content",
            Emotion::Happy => "Happy",
            Emotion::Curious => "Curious",
            Emotion::Affectionate => "Affectionate",
            Emotion::Scared => "Scared",
            Emotion::Aggressive => "Aggressive",
            Emotion::Annoyed => "Annoyed",
            Emotion::Anxious => "Anxious",
            Emotion::Sad => "Sad",
            Emotion::Bored => "Bored",
            Emotion::Sleepy => "Sleepy",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Emotion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Emotion::ALL
            .into_iter()
            .find(|emotion| emotion.label() == s)
            .ok_or_else(|| Error::UnknownEmotion(s.to_string()))
    }
}

/// Outcome of a single classification call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Emotion(Emotion),
    NotACat,
}

impl Classification {
    /// Parse the raw one-line classifier reply.
    ///
    /// The reply must be either one vocabulary label or the not-a-cat
    /// sentinel. Anything else is treated as an upstream model error, not
    /// stored and not guessed at.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed == NOT_A_CAT_SENTINEL
            || trimmed.trim_matches(|c| c == '\'' || c == '"') == NOT_A_CAT_SENTINEL
        {
            return Ok(Classification::NotACat);
        }
        // Models occasionally append a period to the single word.
        let label = trimmed.trim_end_matches('.');
        label.parse().map(Classification::Emotion)
    }
}

/// Care guidance the model produces for a classified emotion.
///
/// The model is instructed to reply with exactly this JSON object and no
/// other text; any deviation fails the whole analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmotionGuidance {
    pub description: String,
    pub tips_and_recs: Vec<String>,
}

impl EmotionGuidance {
    /// Parse the raw guidance reply, rejecting anything that is not the
    /// exact expected object with at least one tip
    pub fn parse(raw: &str) -> Result<Self> {
        let guidance: EmotionGuidance = serde_json::from_str(raw.trim())
            .map_err(|e| Error::MalformedModelResponse(e.to_string()))?;
        if guidance.description.is_empty() {
            return Err(Error::MalformedModelResponse(
                "empty description".to_string(),
            ));
        }
        if guidance.tips_and_recs.is_empty() {
            return Err(Error::MalformedModelResponse("no tips".to_string()));
        }
        Ok(guidance)
    }
}
