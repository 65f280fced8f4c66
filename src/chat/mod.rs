//! Conversation data model

pub mod models;

pub use models::{Attachment, AttachmentKind, Role, Turn};
