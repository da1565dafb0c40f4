use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::{Document, Fields};

/// The five moods offered at check-in. The emoji is the canonical wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mood {
    Great,
    #[default]
    Good,
    Okay,
    Low,
    Angry,
}

impl Mood {
    pub const ALL: [Mood; 5] = [Mood::Great, Mood::Good, Mood::Okay, Mood::Low, Mood::Angry];

    pub fn emoji(self) -> &'static str {
        match self {
            Mood::Great => "😄",
            Mood::Good => "🙂",
            Mood::Okay => "😐",
            Mood::Low => "😔",
            Mood::Angry => "😡",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mood::Great => "Great",
            Mood::Good => "Good",
            Mood::Okay => "Okay",
            Mood::Low => "Low",
            Mood::Angry => "Angry",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.emoji() == tag)
    }
}

/// One stored check-in, as read back from a user's mood collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub mood: String,
    pub mood_label: String,
    pub note: String,
    pub stress: i32,
    pub energy: i32,
    pub sleep: i32,
    /// Epoch milliseconds, assigned by the writer.
    pub timestamp: i64,
}

impl MoodEntry {
    /// Known mood for this entry's tag; `None` for tags written by other clients.
    pub fn kind(&self) -> Option<Mood> {
        Mood::from_tag(&self.mood)
    }

    /// History card rendering, e.g. `05 Mar 2026 • 09:15 PM` (UTC).
    pub fn display_time(&self) -> String {
        match Utc.timestamp_millis_opt(self.timestamp).single() {
            Some(at) => at.format("%d %b %Y • %I:%M %p").to_string(),
            None => String::new(),
        }
    }

    pub fn to_fields(&self) -> Fields {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Fields::new(),
        }
    }
}

/// A check-in about to be written. Defaults match a fresh check-in form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMoodEntry {
    pub mood: String,
    pub mood_label: String,
    pub note: String,
    pub stress: i32,
    pub energy: i32,
    pub sleep: i32,
}

impl NewMoodEntry {
    pub fn new(mood: Mood) -> Self {
        Self {
            mood: mood.emoji().to_string(),
            mood_label: mood.label().to_string(),
            ..Self::default()
        }
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn metrics(mut self, stress: i32, energy: i32, sleep: i32) -> Self {
        self.stress = stress;
        self.energy = energy;
        self.sleep = sleep;
        self
    }

    /// Stamp the draft. The note is trimmed here, before storage.
    pub fn into_entry(self, timestamp: i64) -> MoodEntry {
        MoodEntry {
            mood: self.mood,
            mood_label: self.mood_label,
            note: self.note.trim().to_string(),
            stress: self.stress,
            energy: self.energy,
            sleep: self.sleep,
            timestamp,
        }
    }
}

impl Default for NewMoodEntry {
    fn default() -> Self {
        let mood = Mood::default();
        Self {
            mood: mood.emoji().to_string(),
            mood_label: mood.label().to_string(),
            note: String::new(),
            stress: 30,
            energy: 60,
            sleep: 50,
        }
    }
}

// ── Mapping stored documents ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingMood,
    MoodNotText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub document_id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Kept(MoodEntry),
    Skipped(SkippedRecord),
}

/// Result of a history fetch: mapped entries in query order, plus every
/// document that could not be mapped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MoodHistory {
    pub entries: Vec<MoodEntry>,
    pub skipped: Vec<SkippedRecord>,
}

impl MoodHistory {
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let mut history = Self::default();
        for doc in documents {
            match map_document(doc) {
                RecordOutcome::Kept(entry) => history.entries.push(entry),
                RecordOutcome::Skipped(skipped) => history.skipped.push(skipped),
            }
        }
        history
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&MoodEntry> {
        self.entries.first()
    }
}

pub fn map_document(doc: Document) -> RecordOutcome {
    let skip = |reason| {
        RecordOutcome::Skipped(SkippedRecord {
            document_id: doc.id.clone(),
            reason,
        })
    };

    let mood = match doc.fields.get("mood") {
        None | Some(Value::Null) => return skip(SkipReason::MissingMood),
        Some(Value::String(tag)) => tag.clone(),
        Some(_) => return skip(SkipReason::MoodNotText),
    };

    RecordOutcome::Kept(MoodEntry {
        mood,
        mood_label: text_field(&doc.fields, "moodLabel"),
        note: text_field(&doc.fields, "note"),
        stress: int_field(&doc.fields, "stress"),
        energy: int_field(&doc.fields, "energy"),
        sleep: int_field(&doc.fields, "sleep"),
        timestamp: doc.fields.get("timestamp").and_then(Value::as_i64).unwrap_or(0),
    })
}

fn text_field(fields: &Fields, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn int_field(fields: &Fields, key: &str) -> i32 {
    fields
        .get(key)
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok())
        .unwrap_or(0)
}
