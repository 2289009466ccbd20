//! Core data types for the fiber-extractor crate.
//!
//! This module defines the records produced by the extraction pipeline:
//! - `NormalizedMessage`: A validated conversation message
//! - `Sender`: The author of a message
//! - `Attachment`: Media carried by a message
//! - `Chat`: A conversation in the chat list
//! - `MessageStatus` / `AttachmentType`: Closed enumerations
//!
//! Records are only built by the extraction pipeline from validated input and
//! are not mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// MIME type used when an attachment does not declare one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// A validated conversation message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedMessage {
    /// Message identifier
    pub id: String,

    /// Unix timestamp (seconds) as reported by the host
    pub timestamp: i64,

    /// Author of the message
    pub sender: Sender,

    /// Text body (empty for media-only messages)
    pub body: String,

    /// Message type as reported by the host (e.g. "chat", "image")
    pub kind: String,

    /// Whether the message was sent by the local user
    pub outbound: bool,

    /// Identifier of the quoted message, if this is a reply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_id: Option<String>,

    /// Attachments in discovery order
    pub attachments: Vec<Attachment>,

    pub status: MessageStatus,

    pub forwarded: bool,

    pub starred: bool,
}

/// Author of a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sender {
    pub id: String,

    /// Display name; the identifier when no name is known
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_name: Option<String>,

    /// Whether the sender is in the local user's contacts
    pub is_contact: bool,
}

impl Sender {
    /// Creates a sender known only by its identifier.
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Sender {
            name: id.clone(),
            id,
            push_name: None,
            is_contact: false,
        }
    }
}

/// Media attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    /// Generated identifier (UUID v4)
    pub id: String,

    #[serde(rename = "type")]
    pub kind: AttachmentType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    pub mime_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    /// Size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    /// Duration in seconds (audio/video)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Closed set of attachment types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentType {
    Image,
    Video,
    Audio,
    Document,
    Sticker,
    Contact,
    Location,
}

impl AttachmentType {
    /// Returns the string identifier for this attachment type.
    ///
    /// # Examples
    ///
    /// ```
    /// use fiber_extractor::types::AttachmentType;
    ///
    /// assert_eq!(AttachmentType::Image.as_str(), "image");
    /// assert_eq!(AttachmentType::Location.as_str(), "location");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentType::Image => "image",
            AttachmentType::Video => "video",
            AttachmentType::Audio => "audio",
            AttachmentType::Document => "document",
            AttachmentType::Sticker => "sticker",
            AttachmentType::Contact => "contact",
            AttachmentType::Location => "location",
        }
    }

    /// Parses a type identifier. Unknown identifiers yield `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fiber_extractor::types::AttachmentType;
    ///
    /// assert_eq!(AttachmentType::parse("video"), Some(AttachmentType::Video));
    /// assert_eq!(AttachmentType::parse("ptt"), None);
    /// ```
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(AttachmentType::Image),
            "video" => Some(AttachmentType::Video),
            "audio" => Some(AttachmentType::Audio),
            "document" => Some(AttachmentType::Document),
            "sticker" => Some(AttachmentType::Sticker),
            "contact" => Some(AttachmentType::Contact),
            "location" => Some(AttachmentType::Location),
            _ => None,
        }
    }
}

impl fmt::Display for AttachmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery status of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Pending,
    Sent,
    Delivered,
    Read,
    Played,
    Error,
}

impl MessageStatus {
    /// Maps a host acknowledgement level to a status.
    ///
    /// `0..=4` map to pending, sent, delivered, read, played; every other
    /// value (and anything that isn't an integer) is pending.
    ///
    /// # Examples
    ///
    /// ```
    /// use fiber_extractor::types::MessageStatus;
    ///
    /// assert_eq!(MessageStatus::from_ack(3), MessageStatus::Read);
    /// assert_eq!(MessageStatus::from_ack(99), MessageStatus::Pending);
    /// ```
    pub fn from_ack(ack: i64) -> Self {
        match ack {
            1 => MessageStatus::Sent,
            2 => MessageStatus::Delivered,
            3 => MessageStatus::Read,
            4 => MessageStatus::Played,
            _ => MessageStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
            MessageStatus::Played => "played",
            MessageStatus::Error => "error",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A conversation in the chat list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    pub id: String,

    /// Display name; the identifier when no name is known
    pub name: String,

    pub is_group: bool,

    pub unread_count: u32,

    /// Unix timestamp of the last activity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    pub archived: bool,

    pub pinned: bool,

    pub muted: bool,
}

/// Generate a fresh unique identifier using UUID v4.
///
/// # Example
///
/// ```
/// use fiber_extractor::types::generate_id;
///
/// let a = generate_id();
/// let b = generate_id();
/// assert_ne!(a, b);
/// assert_eq!(a.len(), 36);
/// ```
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
