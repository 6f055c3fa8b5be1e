use crate::region::Region;
use crate::stats::DocumentStats;

/// A fully parsed resource document — the tree shared by every dialect.
///
/// This is the primary type that higher-level crates (`lsforge-codec`,
/// `lsforge-preview`, `lsforge-pipeline`) work with. Whatever the on-disk
/// encoding was (LSX text, LSJ JSON, or LSF binary via the external
/// converter), parsing produces a `Document`, and a `Document` can be
/// emitted into any of those encodings again.
///
/// ```text
/// Document
///   └── Region  (ordered, ids unique per document)
///         └── Node  (ordered, ids NOT unique)
///               ├── Attribute  (ordered list, duplicate ids legal)
///               └── Node  (children, arbitrary depth)
/// ```
///
/// The document does not remember which dialect it was read from. Dialect
/// choice is a property of the codec call, not of the data — that is what
/// makes cross-dialect round-trips lossless.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
  /// Free-form engine version string from the source file. Often absent;
  /// game files carry values like `"4.0.9.331"` here.
  pub version: Option<String>,
  /// Root element name. Conventionally `save` for every file the game
  /// ships, but preserved verbatim so oddballs survive a round-trip.
  pub root_tag: String,
  pub regions: Vec<Region>,
}

impl Document {
  /// Create an empty document with the conventional `save` root.
  #[must_use]
  pub fn new() -> Self {
    Self {
      version: None,
      root_tag: "save".to_string(),
      regions: Vec::new(),
    }
  }

  /// Look up a region by id.
  ///
  /// Region ids are unique within a document, so the first match is the
  /// only match.
  #[must_use]
  pub fn region(&self, id: &str) -> Option<&Region> {
    self.regions.iter().find(|r| r.id == id)
  }

  /// Structural equality across dialect round-trips.
  ///
  /// Strict on everything that carries meaning — region order, node order,
  /// attribute order within a node, attribute types and handles — but
  /// tolerant of insignificant whitespace around scalar values, which the
  /// textual dialect does not guarantee to preserve.
  #[must_use]
  pub fn structurally_equal(&self, other: &Self) -> bool {
    self.root_tag == other.root_tag
      && self.version == other.version
      && self.regions.len() == other.regions.len()
      && self
        .regions
        .iter()
        .zip(other.regions.iter())
        .all(|(a, b)| a.structurally_equal(b))
  }

  /// Compute summary statistics over the whole tree (nested nodes
  /// included). Used by the preview engine's analysis block.
  #[must_use]
  pub fn stats(&self) -> DocumentStats {
    DocumentStats::collect(self)
  }
}

impl Default for Document {
  fn default() -> Self {
    Self::new()
  }
}
