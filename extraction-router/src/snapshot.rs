//! Captured page state the daemon runs against.

use crate::drift::StaticDocument;
use crate::scroller::MemoryViewport;
use fiber_extractor::{FiberSnapshot, HostContainer, SnapshotSource};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scroll geometry of the message pane at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    #[serde(default, rename = "scrollTop")]
    pub scroll_top: f64,

    #[serde(default, rename = "maxScrollTop")]
    pub max_scroll_top: f64,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            scroll_top: 0.0,
            max_scroll_top: 0.0,
        }
    }
}

/// Landmark elements, the tree container and its UI tree, captured together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Selector → element for the drift landmarks
    #[serde(default)]
    pub document: StaticDocument,

    pub container: HostContainer,

    pub tree: FiberSnapshot,

    #[serde(default)]
    pub viewport: ViewportState,
}

impl PageSnapshot {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&contents)?)
    }

    /// Split into the drift document, tree source and viewport.
    pub fn into_parts(self) -> (StaticDocument, SnapshotSource, MemoryViewport) {
        let viewport = MemoryViewport::new(self.viewport.scroll_top, self.viewport.max_scroll_top);
        let source = SnapshotSource::from_snapshot(self.container, self.tree);
        (self.document, source, viewport)
    }
}
