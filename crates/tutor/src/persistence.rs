use crate::chat::ChatMessage;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(thiserror::Error, Debug)]
pub enum PersistenceError {
    #[error("failed to access data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode data file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown profile field `{0}`")]
    UnknownField(String),
}

// -------------------------------------------------------------------
// Profile
// -------------------------------------------------------------------

/// Learner details collected by the onboarding screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub name: String,
    pub language: String,
    pub class: u32,
    pub subject: String,
    pub syllabus: String,
    pub pace: String,
    pub learning_intent: String,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            language: "English".to_string(),
            class: 8,
            subject: String::new(),
            syllabus: String::new(),
            pace: String::new(),
            learning_intent: String::new(),
        }
    }
}

impl UserProfile {
    pub fn field(&self, key: &str) -> Option<String> {
        let value = match key {
            "name" => self.name.clone(),
            "language" => self.language.clone(),
            "class" => self.class.to_string(),
            "subject" => self.subject.clone(),
            "syllabus" => self.syllabus.clone(),
            "pace" => self.pace.clone(),
            "learning_intent" => self.learning_intent.clone(),
            _ => return None,
        };
        Some(value)
    }

    /// Returns false for unknown keys and unparsable class numbers.
    pub fn set_field(&mut self, key: &str, value: &str) -> bool {
        let slot = match key {
            "name" => &mut self.name,
            "language" => &mut self.language,
            "subject" => &mut self.subject,
            "syllabus" => &mut self.syllabus,
            "pace" => &mut self.pace,
            "learning_intent" => &mut self.learning_intent,
            "class" => {
                return match value.trim().parse() {
                    Ok(class) => {
                        self.class = class;
                        true
                    }
                    Err(_) => false,
                };
            }
            _ => return false,
        };
        *slot = value.to_string();
        true
    }
}

pub trait ProfileStore: Send + Sync {
    fn profile(&self) -> UserProfile;
    fn set_field(&self, key: &str, value: &str)
    -> Result<(), PersistenceError>;
}

pub trait ChatHistory: Send + Sync {
    fn append(&self, message: &ChatMessage) -> Result<(), PersistenceError>;
    fn messages(&self) -> Vec<ChatMessage>;
    fn clear(&self) -> Result<(), PersistenceError>;
}

// -------------------------------------------------------------------
// JSON file store
// -------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoredData {
    profile: UserProfile,
    history: Vec<ChatMessage>,
}

/// Profile and history in one pretty-printed JSON file, rewritten on
/// every change.
pub struct JsonFileStore {
    path: PathBuf,
    data: RwLock<StoredData>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let data = if path.exists() {
            let json = std::fs::read_to_string(&path)?;
            serde_json::from_str(&json)?
        } else {
            StoredData::default()
        };
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Falls back to an empty store (still backed by `path`) when the file
    /// cannot be read.
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(&path) {
            Ok(store) => store,
            Err(e) => {
                warn!(path = %path.display(), "{e}; starting with empty data");
                Self {
                    path,
                    data: RwLock::new(StoredData::default()),
                }
            }
        }
    }

    fn save(&self, data: &StoredData) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "data file written");
        Ok(())
    }
}

impl ProfileStore for JsonFileStore {
    fn profile(&self) -> UserProfile {
        self.data.read().profile.clone()
    }

    fn set_field(
        &self,
        key: &str,
        value: &str,
    ) -> Result<(), PersistenceError> {
        let mut data = self.data.write();
        if !data.profile.set_field(key, value) {
            return Err(PersistenceError::UnknownField(key.to_string()));
        }
        self.save(&data)
    }
}

impl ChatHistory for JsonFileStore {
    fn append(&self, message: &ChatMessage) -> Result<(), PersistenceError> {
        let mut data = self.data.write();
        data.history.push(message.clone());
        self.save(&data)
    }

    fn messages(&self) -> Vec<ChatMessage> {
        self.data.read().history.clone()
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        let mut data = self.data.write();
        data.history.clear();
        self.save(&data)
    }
}
