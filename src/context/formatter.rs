//! Wire formatting for multimodal model endpoints

use super::window::ContextWindow;
use crate::chat::{Role, Turn};
use serde::{Deserialize, Serialize};

/// Label prefixed to the summary system message
const SUMMARY_PREFIX: &str = "Context from earlier in the conversation";

/// One part of a structured message body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    Text { text: String },
    Image { image: String },
}

/// Message body: plain text, or ordered parts for vision-capable models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Parts(_) => None,
        }
    }

    pub fn as_parts(&self) -> Option<&[ContentPart]> {
        match self {
            Self::Text(_) => None,
            Self::Parts(parts) => Some(parts),
        }
    }
}

/// The wire-ready unit produced for the model endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ApiMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System.as_str().to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System.as_str()
    }
}

/// Convert a fitted window into the ordered message list the endpoint
/// expects: system prompt first (when given), then the truncation summary
/// (when present), then every kept turn in order.
pub fn format_window(window: &ContextWindow, system_prompt: Option<&str>) -> Vec<ApiMessage> {
    let mut messages = Vec::with_capacity(window.messages.len() + 2);

    if let Some(prompt) = system_prompt {
        messages.push(ApiMessage::system(prompt));
    }

    if let Some(summary) = &window.summary {
        messages.push(ApiMessage::system(format!("{}: {}", SUMMARY_PREFIX, summary)));
    }

    for turn in &window.messages {
        messages.push(format_turn(turn));
    }

    messages
}

/// Encode one turn per the attachment rules.
///
/// A turn with image attachments becomes a content-part array: a text part
/// first when the content is non-empty, then one image part per image in
/// attachment order. A turn without images stays plain text, with any file
/// attachments appended as bracketed name references. Attachment URLs are
/// passed through untouched; resolvability is the uploader's problem.
pub fn format_turn(turn: &Turn) -> ApiMessage {
    let images: Vec<_> = turn.attachments.iter().filter(|a| a.is_image()).collect();

    let content = if images.is_empty() {
        let mut text = turn.content.clone();
        for attachment in turn.attachments.iter().filter(|a| !a.is_image()) {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&format!("[file: {}]", attachment.name));
        }
        MessageContent::Text(text)
    } else {
        let mut parts = Vec::with_capacity(images.len() + 1);
        if !turn.content.trim().is_empty() {
            parts.push(ContentPart::Text {
                text: turn.content.clone(),
            });
        }
        for image in images {
            parts.push(ContentPart::Image {
                image: image.url.clone(),
            });
        }
        MessageContent::Parts(parts)
    };

    ApiMessage {
        role: turn.role.as_str().to_string(),
        content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Attachment;

    #[test]
    fn test_plain_turn_formats_to_text() {
        let message = format_turn(&Turn::user("hello there"));
        assert_eq!(message.role, "user");
        assert_eq!(message.content.as_text(), Some("hello there"));
    }

    #[test]
    fn test_image_turn_formats_to_parts() {
        let turn = Turn::user("look at this")
            .with_attachment(Attachment::image("y.png", "https://x/y.png"));

        let message = format_turn(&turn);
        let parts = message.content.as_parts().unwrap();
        assert_eq!(
            parts,
            &[
                ContentPart::Text {
                    text: "look at this".to_string()
                },
                ContentPart::Image {
                    image: "https://x/y.png".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_image_turn_without_text_has_no_text_part() {
        let turn =
            Turn::user("   ").with_attachment(Attachment::image("y.png", "https://x/y.png"));

        let parts_len = format_turn(&turn).content.as_parts().unwrap().len();
        assert_eq!(parts_len, 1);
    }

    #[test]
    fn test_images_keep_attachment_order() {
        let turn = Turn::user("two shots")
            .with_attachment(Attachment::image("a.png", "https://x/a.png"))
            .with_attachment(Attachment::image("b.png", "https://x/b.png"));

        let parts = format_turn(&turn).content.as_parts().unwrap().to_vec();
        assert_eq!(
            parts[1],
            ContentPart::Image {
                image: "https://x/a.png".to_string()
            }
        );
        assert_eq!(
            parts[2],
            ContentPart::Image {
                image: "https://x/b.png".to_string()
            }
        );
    }

    #[test]
    fn test_file_attachments_become_bracketed_references() {
        let turn = Turn::user("please review")
            .with_attachment(Attachment::file("report.pdf", "https://x/report.pdf"));

        let message = format_turn(&turn);
        assert_eq!(
            message.content.as_text(),
            Some("please review [file: report.pdf]")
        );
    }

    #[test]
    fn test_system_prompt_and_summary_lead_the_list() {
        let window = ContextWindow {
            messages: vec![Turn::user("question")],
            total_tokens: 13,
            summary: Some("earlier discussion".to_string()),
        };

        let messages = format_window(&window, Some("You are helpful."));
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content.as_text(), Some("You are helpful."));
        assert_eq!(
            messages[1].content.as_text(),
            Some("Context from earlier in the conversation: earlier discussion")
        );
        assert_eq!(messages[2].role, "user");
    }

    #[test]
    fn test_wire_shape_of_parts() {
        let turn = Turn::user("look").with_attachment(Attachment::image("y.png", "https://x/y.png"));
        let json = serde_json::to_value(format_turn(&turn)).unwrap();

        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][0]["text"], "look");
        assert_eq!(json["content"][1]["type"], "image");
        assert_eq!(json["content"][1]["image"], "https://x/y.png");
    }

    #[test]
    fn test_wire_shape_of_plain_text() {
        let json = serde_json::to_value(format_turn(&Turn::assistant("sure"))).unwrap();
        assert_eq!(json["content"], "sure");
    }
}
