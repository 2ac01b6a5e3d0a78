use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Tutor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Local>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub can_retry: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content.into(), false)
    }

    pub fn tutor(content: impl Into<String>) -> Self {
        Self::new(Sender::Tutor, content.into(), false)
    }

    /// Failed request, shown with a retry button.
    pub fn error(content: impl Into<String>) -> Self {
        Self::new(Sender::Tutor, content.into(), true)
    }

    fn new(sender: Sender, content: String, is_error: bool) -> Self {
        Self {
            sender,
            content,
            timestamp: Local::now(),
            is_error,
            can_retry: is_error,
        }
    }

    pub fn formatted_time(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }

    pub fn is_from_user(&self) -> bool {
        self.sender == Sender::User
    }
}
