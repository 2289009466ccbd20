//! Structural drift detection.
//!
//! A fingerprint summarizes a fixed, ordered list of landmark elements in the
//! host document. It is stored after the first run; later runs compare the
//! fresh fingerprint with the stored one and refuse to extract when they
//! differ.
//!
//! Fingerprint layout:
//! - one segment per landmark, in landmark order
//! - a present element encodes as `tag|sorted classes|sorted name=value data attributes`
//! - an absent element encodes as `not found`
//! - segments are joined with `;` and hashed with a 32-bit polynomial rolling
//!   hash (`acc * 31 + code unit`, wrapping), rendered as signed hexadecimal

use crate::store::FingerprintStore;
use fiber_extractor::{ParseError, ParseResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Segment for a landmark that is not in the document.
pub const NOT_FOUND: &str = "not found";

pub const DEFAULT_STORAGE_KEY: &str = "extraction-router.layout-fingerprint";

/// Landmarks probed when none are configured.
pub fn default_landmarks() -> Vec<String> {
    [
        "#app",
        "#side",
        "#pane-side",
        "#main",
        "#main header",
        "#main footer",
        "[data-testid=\"conversation-panel-messages\"]",
        "[data-testid=\"chat-list\"]",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// What a single query against the host document sees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementProbe {
    #[serde(rename = "tagName")]
    pub tag_name: String,

    #[serde(default, rename = "classList")]
    pub class_list: Vec<String>,

    /// Data attributes, keyed by full attribute name (`data-testid`)
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl ElementProbe {
    /// Encode this element as a fingerprint segment.
    pub fn segment(&self) -> String {
        let mut classes: Vec<&str> = self.class_list.iter().map(String::as_str).collect();
        classes.sort_unstable();

        let mut data: Vec<String> = self
            .data
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        data.sort();

        format!(
            "{}|{}|{}",
            self.tag_name.to_lowercase(),
            classes.join(" "),
            data.join(",")
        )
    }
}

/// Selector lookups against the host document.
pub trait HostDocument {
    fn query(&self, selector: &str) -> Option<ElementProbe>;
}

impl<D: HostDocument + ?Sized> HostDocument for &D {
    fn query(&self, selector: &str) -> Option<ElementProbe> {
        (**self).query(selector)
    }
}

/// Document captured as a selector → element map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticDocument {
    elements: HashMap<String, ElementProbe>,
}

impl StaticDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn insert(&mut self, selector: impl Into<String>, element: ElementProbe) {
        self.elements.insert(selector.into(), element);
    }

    pub fn remove(&mut self, selector: &str) -> Option<ElementProbe> {
        self.elements.remove(selector)
    }

    pub fn get_mut(&mut self, selector: &str) -> Option<&mut ElementProbe> {
        self.elements.get_mut(selector)
    }
}

impl HostDocument for StaticDocument {
    fn query(&self, selector: &str) -> Option<ElementProbe> {
        self.elements.get(selector).cloned()
    }
}

/// 32-bit polynomial rolling hash over UTF-16 code units.
///
/// # Example
///
/// ```
/// use extraction_router::drift::hash_string;
///
/// assert_eq!(hash_string(""), 0);
/// assert_eq!(hash_string("a"), 97);
/// assert_eq!(hash_string("ab"), 97 * 31 + 98);
/// ```
pub fn hash_string(input: &str) -> i32 {
    input
        .encode_utf16()
        .fold(0i32, |acc, unit| acc.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

/// Signed hexadecimal rendering (`-1f` for -31).
pub fn to_signed_hex(value: i32) -> String {
    if value < 0 {
        format!("-{:x}", i64::from(value).unsigned_abs())
    } else {
        format!("{:x}", value)
    }
}

/// Fingerprint of `landmarks` in `document`.
pub fn compute_fingerprint<D, S>(document: &D, landmarks: &[S]) -> String
where
    D: HostDocument + ?Sized,
    S: AsRef<str>,
{
    let joined = landmarks
        .iter()
        .map(|selector| match document.query(selector.as_ref()) {
            Some(element) => element.segment(),
            None => NOT_FOUND.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";");
    to_signed_hex(hash_string(&joined))
}

/// Result of comparing the live document with the stored fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionCheck {
    pub is_compatible: bool,
    pub current_hash: String,
    /// Fingerprint stored before this check, if there was one
    pub stored_hash: Option<String>,
}

/// Guards extraction against structural changes in the host document.
pub struct VersionGuard<D: HostDocument, S: FingerprintStore> {
    document: D,
    store: S,
    landmarks: Vec<String>,
    storage_key: String,
}

impl<D: HostDocument, S: FingerprintStore> VersionGuard<D, S> {
    pub fn new(document: D, store: S) -> Self {
        Self::with_landmarks(document, store, default_landmarks(), DEFAULT_STORAGE_KEY)
    }

    pub fn with_landmarks(
        document: D,
        store: S,
        landmarks: Vec<String>,
        storage_key: impl Into<String>,
    ) -> Self {
        Self {
            document,
            store,
            landmarks,
            storage_key: storage_key.into(),
        }
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn landmarks(&self) -> &[String] {
        &self.landmarks
    }

    /// Fingerprint of the document as it is now.
    pub fn compute_hash(&self) -> String {
        compute_fingerprint(&self.document, &self.landmarks)
    }

    /// Compare against the stored fingerprint.
    ///
    /// With nothing stored, the current fingerprint is stored and the
    /// document is compatible. Otherwise it is compatible only on an exact
    /// match. Store failures count as "nothing stored" and never fail the
    /// check.
    pub fn check(&self) -> VersionCheck {
        let current_hash = self.compute_hash();
        let stored_hash = self.get_stored_hash();

        let is_compatible = match &stored_hash {
            Some(stored) => *stored == current_hash,
            None => {
                info!("No stored layout fingerprint, recording {}", current_hash);
                self.store_hash(&current_hash);
                true
            }
        };

        if is_compatible {
            debug!("Layout fingerprint {} is compatible", current_hash);
        } else {
            warn!(
                "Layout fingerprint changed: stored {:?}, current {}",
                stored_hash, current_hash
            );
        }

        VersionCheck {
            is_compatible,
            current_hash,
            stored_hash,
        }
    }

    /// Like [`check`](Self::check), but incompatibility is an error.
    pub fn require_compatible(&self) -> ParseResult<VersionCheck> {
        let check = self.check();
        if check.is_compatible {
            return Ok(check);
        }
        Err(ParseError::version_mismatch(format!(
            "host layout fingerprint {} does not match stored {}",
            check.current_hash,
            check.stored_hash.as_deref().unwrap_or("-")
        ))
        .with_context("current", check.current_hash.clone())
        .with_context("stored", check.stored_hash.clone()))
    }

    /// Stored fingerprint; `None` when absent or unreadable.
    pub fn get_stored_hash(&self) -> Option<String> {
        match self.store.get(&self.storage_key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read layout fingerprint: {}", e);
                None
            }
        }
    }

    /// Store the current fingerprint and return it.
    pub fn update_hash(&self) -> String {
        let current = self.compute_hash();
        self.store_hash(&current);
        current
    }

    fn store_hash(&self, hash: &str) {
        if let Err(e) = self.store.set(&self.storage_key, hash) {
            warn!("Failed to store layout fingerprint: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use fiber_extractor::ParseErrorKind;

    fn element(tag: &str, classes: &[&str], data: &[(&str, &str)]) -> ElementProbe {
        ElementProbe {
            tag_name: tag.to_string(),
            class_list: classes.iter().map(|c| c.to_string()).collect(),
            data: data
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn document() -> StaticDocument {
        let mut doc = StaticDocument::new();
        doc.insert("#app", element("DIV", &["two", "app"], &[]));
        doc.insert(
            "#main",
            element("div", &["x1n2onr6"], &[("data-testid", "conversation-panel")]),
        );
        doc
    }

    fn landmarks() -> Vec<String> {
        vec!["#app".into(), "#main".into(), "#missing".into()]
    }

    struct FailingStore;

    impl FingerprintStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Poisoned)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    #[test]
    fn test_hash_wraps_to_i32() {
        let long = "z".repeat(64);
        let expected = long
            .bytes()
            .fold(0i64, |acc, b| ((acc * 31 + i64::from(b)) as i32) as i64);
        assert_eq!(i64::from(hash_string(&long)), expected);
    }

    #[test]
    fn test_hash_uses_utf16_units() {
        // U+1F600 is a surrogate pair: 0xD83D 0xDE00
        assert_eq!(hash_string("😀"), 0xD83D * 31 + 0xDE00);
    }

    #[test]
    fn test_signed_hex() {
        assert_eq!(to_signed_hex(255), "ff");
        assert_eq!(to_signed_hex(-31), "-1f");
        assert_eq!(to_signed_hex(i32::MIN), "-80000000");
    }

    #[test]
    fn test_segment_sorts_classes_and_data() {
        let probe = element("DIV", &["b", "a"], &[("data-z", "1"), ("data-a", "2")]);
        assert_eq!(probe.segment(), "div|a b|data-a=2,data-z=1");
    }

    #[test]
    fn test_fingerprint_ignores_class_order() {
        let mut other = document();
        other.insert("#app", element("div", &["app", "two"], &[]));
        assert_eq!(
            compute_fingerprint(&document(), &landmarks()),
            compute_fingerprint(&other, &landmarks())
        );
    }

    #[test]
    fn test_fingerprint_depends_on_landmark_order() {
        let forward = compute_fingerprint(&document(), &["#app", "#main"]);
        let backward = compute_fingerprint(&document(), &["#main", "#app"]);
        assert_ne!(forward, backward);
    }

    #[test]
    fn test_missing_landmark_is_sentinel() {
        let empty = StaticDocument::new();
        assert_eq!(
            compute_fingerprint(&empty, &["#a", "#b"]),
            to_signed_hex(hash_string("not found;not found"))
        );
    }

    #[test]
    fn test_first_check_stores_and_second_is_compatible() {
        let store = MemoryStore::new();
        let guard = VersionGuard::with_landmarks(document(), &store, landmarks(), "fp");

        let first = guard.check();
        assert!(first.is_compatible);
        assert_eq!(first.stored_hash, None);
        assert_eq!(store.get("fp").unwrap(), Some(first.current_hash.clone()));

        let second = guard.check();
        assert!(second.is_compatible);
        assert_eq!(second.stored_hash, Some(first.current_hash));
    }

    #[test]
    fn test_class_change_flips_compatibility() {
        let store = MemoryStore::new();
        let mut guard = VersionGuard::with_landmarks(document(), &store, landmarks(), "fp");
        let before = guard.check().current_hash;

        if let Some(main) = guard.document_mut().get_mut("#main") {
            main.class_list.push("redesigned".to_string());
        }

        let after = guard.check();
        assert!(!after.is_compatible);
        assert_ne!(after.current_hash, before);
        // a mismatch never overwrites the stored fingerprint
        assert_eq!(guard.get_stored_hash(), Some(before));

        let err = guard.require_compatible().unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::VersionMismatch);

        guard.update_hash();
        assert!(guard.require_compatible().is_ok());
    }

    #[test]
    fn test_store_failures_are_not_fatal() {
        let guard = VersionGuard::with_landmarks(document(), FailingStore, landmarks(), "fp");
        assert_eq!(guard.get_stored_hash(), None);
        assert!(guard.check().is_compatible);
        assert!(guard.check().is_compatible);
        assert_eq!(guard.update_hash(), guard.compute_hash());
    }

    #[test]
    fn test_static_document_from_json() {
        let doc = StaticDocument::from_json(
            r##"{ "#app": { "tagName": "DIV", "classList": ["app"], "data": { "data-x": "1" } } }"##,
        )
        .unwrap();
        let probe = doc.query("#app").unwrap();
        assert_eq!(probe.segment(), "div|app|data-x=1");
        assert!(doc.query("#main").is_none());
    }
}
