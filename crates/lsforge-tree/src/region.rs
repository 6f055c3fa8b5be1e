use indexmap::IndexMap;

use crate::node::Node;

/// A top-level grouping inside a document.
///
/// Region ids are unique within a document and name the payload they carry
/// (`config`, `dialog`, `Templates`, ...). Nodes are an ordered list.
///
/// The JSON dialect sometimes attaches scalars directly to a region body
/// that have no node/attribute structure at all — dialog regions carry
/// `category` and `speakerlist`, for instance. Those land in `extras` as
/// raw JSON values and pass through the JSON codec untouched. They have no
/// representation in the textual dialect, so the LSX writer ignores them.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
  pub id: String,
  pub nodes: Vec<Node>,
  /// Opaque pass-through for the JSON dialect's free-form region keys.
  /// Insertion order is preserved so a JSON → JSON round-trip is stable.
  pub extras: IndexMap<String, serde_json::Value>,
}

impl Region {
  #[must_use]
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      nodes: Vec::new(),
      extras: IndexMap::new(),
    }
  }

  pub(crate) fn structurally_equal(&self, other: &Self) -> bool {
    self.id == other.id
      && self.nodes.len() == other.nodes.len()
      && self
        .nodes
        .iter()
        .zip(other.nodes.iter())
        .all(|(a, b)| a.structurally_equal(b))
  }
}
