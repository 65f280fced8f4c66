//! Data models for conversation turns and attachments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

/// Attachment kind as delivered by the uploader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    File,
}

/// A file or image reference attached to a turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
}

impl Attachment {
    /// Create an image attachment
    pub fn image(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            size: 0,
            mime_type: "image/png".to_string(),
            url: url.into(),
            kind: AttachmentKind::Image,
        }
    }

    /// Create a non-image file attachment
    pub fn file(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            size: 0,
            mime_type: "application/octet-stream".to_string(),
            url: url.into(),
            kind: AttachmentKind::File,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, AttachmentKind::Image)
    }
}

/// One conversation message.
///
/// Turns of a conversation form a strictly ordered sequence; array order is
/// the sole recency signal. `timestamp` exists for ordering and debugging,
/// never for eviction priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl Turn {
    /// Create a new turn with a generated id
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            attachments: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }
}
