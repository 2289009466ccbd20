//! Record extraction pipeline.
//!
//! Turns the property bag of a matched UI node into typed records:
//!
//! - [`parse_sender`], [`parse_attachment`], [`parse_message`], [`parse_chat`]
//!   validate one untyped value each and return a [`ParseResult`].
//! - [`extract_from_node`] / [`extract_chat_from_node`] pick the right
//!   property off a node and delegate.
//! - [`extract_messages`] / [`extract_chats`] run a whole batch below a root
//!   node. Per-record failures are logged and counted, never fatal.
//!
//! # Example
//!
//! ```
//! use fiber_extractor::extractor::parse_message;
//! use serde_json::json;
//!
//! let message = parse_message(&json!({ "id": "m1", "t": 1700000000, "body": "hi" })).unwrap();
//! assert_eq!(message.id, "m1");
//! assert_eq!(message.body, "hi");
//! ```

use crate::node::UiNode;
use crate::result::{ParseError, ParseErrorKind, ParseResult, ParseResultExt};
use crate::traversal::collect_nodes;
use crate::types::{
    generate_id, Attachment, AttachmentType, Chat, MessageStatus, NormalizedMessage, Sender,
    DEFAULT_MIME_TYPE,
};
use crate::validate::{
    coerce_boolean, expect_identifier, expect_integer, optional_bounded, optional_integer,
    optional_number, optional_string,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Node properties that carry a message model, in lookup order.
pub const MESSAGE_PROPS: [&str; 2] = ["message", "msg"];

/// Node property that carries a chat model.
pub const CHAT_PROP: &str = "chat";

/// Fallback sender identifier when a message names no author at all.
pub const UNKNOWN_SENDER: &str = "unknown";

fn as_object<'a>(props: &'a Value, what: &str) -> ParseResult<&'a Map<String, Value>> {
    props.as_object().ok_or_else(|| {
        ParseError::invalid_props(format!("{} props must be an object", what))
    })
}

/// Parses a sender (contact) model.
///
/// # Errors
///
/// - `invalid-props` if `props` is not an object
/// - `missing-required-field` if there is no identifier
pub fn parse_sender(props: &Value) -> ParseResult<Sender> {
    let obj = as_object(props, "sender")?;
    let id = expect_identifier(obj.get("id"), "id")?;

    let name = optional_string(obj.get("name"))
        .or_else(|| optional_string(obj.get("formattedName")))
        .unwrap_or_else(|| id.clone());
    let push_name = optional_string(obj.get("pushname"))
        .or_else(|| optional_string(obj.get("pushName")));

    Ok(Sender {
        id,
        name,
        push_name,
        is_contact: coerce_boolean(obj.get("isMyContact")),
    })
}

/// Parses a media descriptor into an attachment with a fresh identifier.
///
/// # Errors
///
/// `invalid-props` if `props` is not an object, or if `type` is absent or not
/// one of the known attachment types.
pub fn parse_attachment(props: &Value) -> ParseResult<Attachment> {
    let obj = as_object(props, "attachment")?;

    let kind = match optional_string(obj.get("type")) {
        Some(name) => AttachmentType::parse(&name).ok_or_else(|| {
            ParseError::invalid_props(format!("unknown attachment type '{}'", name))
                .with_context("type", name.as_str())
        })?,
        None => return Err(ParseError::invalid_props("attachment has no type")),
    };

    Ok(Attachment {
        id: generate_id(),
        kind,
        url: optional_string(obj.get("url")).or_else(|| optional_string(obj.get("clientUrl"))),
        mime_type: optional_string(obj.get("mimetype"))
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
        file_name: optional_string(obj.get("filename")),
        file_size: optional_bounded(obj.get("size")),
        thumbnail_url: optional_string(obj.get("thumbnailUrl")),
        duration: optional_number(obj.get("duration")),
        width: optional_bounded(obj.get("width")),
        height: optional_bounded(obj.get("height")),
    })
}

/// Maps an acknowledgement value to a delivery status. Total: anything that
/// is not an integer in `0..=4` is pending.
pub fn status_from_ack(value: Option<&Value>) -> MessageStatus {
    optional_integer(value)
        .map(MessageStatus::from_ack)
        .unwrap_or_default()
}

/// Parses a message model.
///
/// `id` and `t` are required and checked independently, so a caller can tell
/// a missing identifier from a missing timestamp. At most one attachment is
/// read, from `mediaData`; if that fails to parse the message simply has no
/// attachments.
///
/// # Errors
///
/// - `invalid-props` if `props` is not an object
/// - `missing-required-field` for a missing `id` or `t`
/// - `invalid-message-format` if `id` or `t` has the wrong shape
pub fn parse_message(props: &Value) -> ParseResult<NormalizedMessage> {
    let obj = as_object(props, "message")?;

    let id = expect_identifier(obj.get("id"), "id")?;
    let timestamp = expect_integer(obj.get("t"), "t")?;

    let kind = optional_string(obj.get("type")).unwrap_or_else(|| "chat".to_string());
    let outbound = coerce_boolean(obj.get("fromMe"))
        || coerce_boolean(obj.get("id").and_then(|id| id.get("fromMe")));

    let quoted_id = obj
        .get("quotedMsg")
        .filter(|quoted| quoted.is_object())
        .and_then(|quoted| expect_identifier(quoted.get("id"), "quotedMsg.id").ok());

    let attachments = obj
        .get("mediaData")
        .filter(|media| media.is_object())
        .and_then(|media| {
            parse_attachment(&with_inherited_type(media, &kind)).ok_or_log("attachment")
        })
        .into_iter()
        .collect();

    Ok(NormalizedMessage {
        id,
        timestamp,
        sender: resolve_sender(obj),
        body: optional_string(obj.get("body")).unwrap_or_default(),
        kind,
        outbound,
        quoted_id,
        attachments,
        status: status_from_ack(obj.get("ack")),
        forwarded: coerce_boolean(obj.get("isForwarded")),
        starred: coerce_boolean(obj.get("star")),
    })
}

/// Media descriptors often leave the type to the enclosing message.
fn with_inherited_type(media: &Value, message_type: &str) -> Value {
    let mut media = media.clone();
    if let Some(obj) = media.as_object_mut() {
        if !obj.contains_key("type") {
            obj.insert("type".to_string(), Value::from(message_type));
        }
    }
    media
}

fn resolve_sender(obj: &Map<String, Value>) -> Sender {
    if let Some(sender) = obj
        .get("senderObj")
        .and_then(|props| parse_sender(props).ok_or_log("sender"))
    {
        return sender;
    }

    ["author", "from"]
        .iter()
        .find_map(|field| expect_identifier(obj.get(*field), field).ok())
        .map(Sender::from_id)
        .unwrap_or_else(|| Sender::from_id(UNKNOWN_SENDER))
}

/// Parses a chat model. A chat without an identifier gets a synthetic
/// `chat_<uuid>` one.
///
/// # Errors
///
/// - `invalid-props` if `props` is not an object
/// - `invalid-message-format` if `id` has the wrong shape
pub fn parse_chat(props: &Value) -> ParseResult<Chat> {
    let obj = as_object(props, "chat")?;

    let id = match expect_identifier(obj.get("id"), "id") {
        Ok(id) => id,
        Err(e) if e.kind == ParseErrorKind::MissingRequiredField => {
            format!("chat_{}", generate_id())
        }
        Err(e) => return Err(e),
    };

    let name = optional_string(obj.get("name"))
        .or_else(|| optional_string(obj.get("formattedTitle")))
        .or_else(|| optional_string(obj.get("contact").and_then(|c| c.get("name"))))
        .unwrap_or_else(|| id.clone());

    let is_group = coerce_boolean(obj.get("isGroup")) || id.ends_with("@g.us");
    let pinned = match optional_number(obj.get("pin")) {
        Some(pin) => pin > 0.0,
        None => coerce_boolean(obj.get("pin")),
    };

    Ok(Chat {
        id,
        name,
        is_group,
        unread_count: optional_bounded(obj.get("unreadCount")).unwrap_or(0),
        timestamp: optional_integer(obj.get("t")),
        archived: coerce_boolean(obj.get("archive")),
        pinned,
        muted: coerce_boolean(obj.get("isMuted")),
    })
}

/// Extracts a message from a node's `message` property, falling back to `msg`.
///
/// # Errors
///
/// `missing-required-field` if the node carries neither property, otherwise
/// whatever [`parse_message`] reports.
pub fn extract_from_node<N: UiNode>(node: &N) -> ParseResult<NormalizedMessage> {
    let props = MESSAGE_PROPS
        .iter()
        .find_map(|key| node.prop(key))
        .ok_or_else(|| ParseError::missing_field("message"))?;
    parse_message(props)
}

/// Extracts a chat from a node's `chat` property.
pub fn extract_chat_from_node<N: UiNode>(node: &N) -> ParseResult<Chat> {
    let props = node
        .prop(CHAT_PROP)
        .ok_or_else(|| ParseError::missing_field(CHAT_PROP))?;
    parse_chat(props)
}

/// Outcome of a batch extraction.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome<T> {
    /// Successfully parsed records
    pub records: Vec<T>,

    /// Number of candidate nodes whose record failed to parse
    pub skipped: usize,

    /// The failures behind `skipped`, in discovery order
    #[serde(skip)]
    pub errors: Vec<ParseError>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
            errors: Vec::new(),
        }
    }
}

fn run_batch<N, T, F, K>(
    root: &N,
    property_keys: &[&str],
    max_nodes: usize,
    parse: F,
    key: K,
) -> BatchOutcome<T>
where
    N: UiNode,
    F: Fn(&N) -> ParseResult<T>,
    K: Fn(&T) -> &str,
{
    let candidates = collect_nodes(
        root,
        |node: &N| property_keys.iter().any(|k| node.prop(k).is_some()),
        max_nodes,
    );

    let mut outcome = BatchOutcome::default();
    let mut seen = HashSet::new();

    for node in &candidates {
        match parse(node) {
            Ok(record) => {
                if seen.insert(key(&record).to_string()) {
                    outcome.records.push(record);
                }
            }
            Err(e) => {
                log::debug!("[EXTRACT] Skipping node {:?}: {}", node.key(), e);
                outcome.skipped += 1;
                outcome.errors.push(e);
            }
        }
    }

    log::info!(
        "[EXTRACT] {} candidates -> {} records, {} skipped",
        candidates.len(),
        outcome.records.len(),
        outcome.skipped
    );
    outcome
}

/// Extracts every message below `root`.
///
/// Candidates are nodes carrying a `message` or `msg` property (at most
/// `max_nodes` of them). Records are de-duplicated by identifier, keeping the
/// first seen, and ordered by timestamp; ties keep discovery order.
pub fn extract_messages<N: UiNode>(root: &N, max_nodes: usize) -> BatchOutcome<NormalizedMessage> {
    let mut outcome = run_batch(root, &MESSAGE_PROPS, max_nodes, extract_from_node::<N>, |m| {
        m.id.as_str()
    });
    outcome.records.sort_by_key(|m| m.timestamp);
    outcome
}

/// Extracts every chat below `root`, de-duplicated by identifier.
pub fn extract_chats<N: UiNode>(root: &N, max_nodes: usize) -> BatchOutcome<Chat> {
    run_batch(root, &[CHAT_PROP], max_nodes, extract_chat_from_node::<N>, |c| c.id.as_str())
}
