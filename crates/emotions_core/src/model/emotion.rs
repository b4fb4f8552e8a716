//! Emotion journal domain model.
//!
//! # Responsibility
//! - Define the write payload (`Emotion`), the persisted shape
//!   (`EmotionRecord`) and the query shape (`EmotionFilter`).
//! - Own the field-level business rules checked before every write.
//!
//! # Invariants
//! - `emotion` must be non-blank.
//! - `quelle` must be non-blank when `quellenart` is adopted or inherited.
//! - `nummer` and `id` are never part of the write payload.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Per-context sequence number assigned by the store.
pub type Nummer = i64;

/// Provenance tag of an emotion.
///
/// Serialized labels are an external contract shared with existing clients
/// and with the table check constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quellenart {
    /// The person's own emotion.
    #[serde(rename = "Eigene Emotion")]
    Own,
    /// Emotion taken over from another person.
    #[serde(rename = "Übernommene Emotion")]
    Adopted,
    /// Emotion inherited through the family line.
    #[serde(rename = "Geerbte Emotion")]
    Inherited,
}

impl Quellenart {
    pub const ALL: [Quellenart; 3] = [Self::Own, Self::Adopted, Self::Inherited];

    /// Returns the stored/serialized label.
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Own => "Eigene Emotion",
            Self::Adopted => "Übernommene Emotion",
            Self::Inherited => "Geerbte Emotion",
        }
    }

    /// Parses a stored label. Returns `None` for anything outside the set.
    pub fn from_label(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_label() == value)
    }

    /// Whether records of this kind must name their source (`quelle`).
    pub fn requires_quelle(self) -> bool {
        matches!(self, Self::Adopted | Self::Inherited)
    }
}

impl Display for Quellenart {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Validation failures raised before any database access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmotionValidationError {
    EmptyUserContext,
    MissingEmotion,
    MissingQuelle(Quellenart),
}

impl Display for EmotionValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUserContext => write!(f, "user context must not be empty"),
            Self::MissingEmotion => write!(f, "field `emotion` is required"),
            Self::MissingQuelle(kind) => {
                write!(f, "field `quelle` is required when `quellenart` is `{kind}`")
            }
        }
    }
}

impl Error for EmotionValidationError {}

/// Write payload for insert and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Emotion {
    /// Name of the emotion. Missing and blank are both rejected by `validate`.
    #[serde(default)]
    pub emotion: String,
    pub datum: Option<NaiveDate>,
    /// Age of the person when the emotion arose.
    pub alter: Option<i64>,
    pub quellenart: Option<Quellenart>,
    pub quelle: Option<String>,
    pub koerperteil: Option<String>,
    pub auswirkungen: Option<String>,
    pub bemerkungen: Option<String>,
}

impl Emotion {
    /// Creates a payload with only the required field set.
    pub fn new(emotion: impl Into<String>) -> Self {
        Self {
            emotion: emotion.into(),
            ..Self::default()
        }
    }

    /// Checks the field-level rules in their contract order.
    pub fn validate(&self) -> Result<(), EmotionValidationError> {
        if is_blank(Some(self.emotion.as_str())) {
            return Err(EmotionValidationError::MissingEmotion);
        }

        if let Some(kind) = self.quellenart {
            if kind.requires_quelle() && is_blank(self.quelle.as_deref()) {
                return Err(EmotionValidationError::MissingQuelle(kind));
            }
        }

        Ok(())
    }
}

/// One persisted journal row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionRecord {
    pub id: i64,
    pub user_context: String,
    pub nummer: Nummer,
    pub emotion: String,
    pub datum: Option<NaiveDate>,
    pub alter: Option<i64>,
    pub quellenart: Option<Quellenart>,
    pub quelle: Option<String>,
    pub koerperteil: Option<String>,
    pub auswirkungen: Option<String>,
    pub bemerkungen: Option<String>,
}

impl EmotionRecord {
    /// Returns the mutable part of this record as a write payload.
    pub fn to_emotion(&self) -> Emotion {
        Emotion {
            emotion: self.emotion.clone(),
            datum: self.datum,
            alter: self.alter,
            quellenart: self.quellenart,
            quelle: self.quelle.clone(),
            koerperteil: self.koerperteil.clone(),
            auswirkungen: self.auswirkungen.clone(),
            bemerkungen: self.bemerkungen.clone(),
        }
    }
}

/// Optional-field query narrowing a context's records.
///
/// Present fields are ANDed. Text fields match as case-insensitive
/// "contains"; `*_von`/`*_bis` are inclusive bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmotionFilter {
    pub nummer: Option<Nummer>,
    pub emotion: Option<String>,
    pub datum_von: Option<NaiveDate>,
    pub datum_bis: Option<NaiveDate>,
    pub alter_von: Option<i64>,
    pub alter_bis: Option<i64>,
    pub quellenart: Option<Quellenart>,
    pub quelle: Option<String>,
    pub koerperteil: Option<String>,
    pub auswirkungen: Option<String>,
    pub bemerkungen: Option<String>,
}

pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |text| text.trim().is_empty())
}
