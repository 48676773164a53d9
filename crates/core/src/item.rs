//! Presentation records handed to the view consumer

use crate::hash::NodeId;
use crate::tree::NodeKey;
use serde::Serialize;

/// Expansion state of a rendered node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collapsible {
    /// Leaf; nothing to expand
    None,
    Collapsed,
    Expanded,
}

/// Everything a renderer needs for one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeItem {
    pub id: NodeId,
    pub label: String,
    pub icon: Option<String>,
    pub tooltip: Option<String>,
    pub collapsible: Collapsible,
    pub has_context_menu: bool,
    pub changed: bool,
}

/// Result of asking for the visible roots
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootsView {
    Nodes(Vec<NodeKey>),
    /// The tree holds no nodes at all
    Empty,
    /// Nodes exist but the active filters hide every one of them
    AllHidden,
}

impl RootsView {
    pub fn keys(&self) -> &[NodeKey] {
        match self {
            Self::Nodes(keys) => keys,
            Self::Empty | Self::AllHidden => &[],
        }
    }
}
