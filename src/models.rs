use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThreadKind {
    Improvement,
    Reflection,
    Testament,
}

impl ThreadKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Improvement => "improvement",
            Self::Reflection => "reflection",
            Self::Testament => "testament",
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            Self::Improvement => "improvement_notes",
            Self::Reflection => "daily_reflections",
            Self::Testament => "testament_entries",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mood {
    Happy,
    Down,
    Angry,
    Calm,
    Sad,
}

impl Mood {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Down => "down",
            Self::Angry => "angry",
            Self::Calm => "calm",
            Self::Sad => "sad",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Happy => "\u{1F600}",
            Self::Down => "\u{1F614}",
            Self::Angry => "\u{1F621}",
            Self::Calm => "\u{1F60C}",
            Self::Sad => "\u{1F622}",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EntryContent {
    Note {
        body: String,
    },
    Reflection {
        body: String,
        mood: Mood,
    },
    Testament {
        problem: String,
        #[serde(default)]
        resolution: String,
    },
}

impl EntryContent {
    pub fn kind(&self) -> ThreadKind {
        match self {
            Self::Note { .. } => ThreadKind::Improvement,
            Self::Reflection { .. } => ThreadKind::Reflection,
            Self::Testament { .. } => ThreadKind::Testament,
        }
    }

    /// Trims text fields; returns `None` when a required field is blank,
    /// which callers treat as a silent skip rather than an error.
    pub fn normalized(&self) -> Option<EntryContent> {
        match self {
            Self::Note { body } => {
                let body = body.trim();
                if body.is_empty() {
                    return None;
                }
                Some(Self::Note { body: body.to_string() })
            }
            Self::Reflection { body, mood } => {
                let body = body.trim();
                if body.is_empty() {
                    return None;
                }
                Some(Self::Reflection {
                    body: body.to_string(),
                    mood: *mood,
                })
            }
            Self::Testament { problem, resolution } => {
                let problem = problem.trim();
                if problem.is_empty() {
                    return None;
                }
                Some(Self::Testament {
                    problem: problem.to_string(),
                    resolution: resolution.trim().to_string(),
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(flatten)]
    pub content: EntryContent,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<Reply>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDraft {
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(flatten)]
    pub content: EntryContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyDraft {
    pub author: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.body.is_none() && self.mood.is_none() && self.problem.is_none() && self.resolution.is_none()
    }
}
