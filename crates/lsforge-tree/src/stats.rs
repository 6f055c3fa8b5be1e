use std::collections::BTreeMap;

use crate::document::Document;
use crate::node::Node;

/// Size bucket for a document, judged on total node count.
///
/// ```text
/// ┌──────────┬────────────────┐
/// │ Bucket   │ Node count     │
/// ├──────────┼────────────────┤
/// │ Simple   │ < 10           │
/// │ Moderate │ < 100          │
/// │ Complex  │ >= 100         │
/// └──────────┴────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Complexity {
  Simple,
  Moderate,
  Complex,
}

impl Complexity {
  #[must_use]
  pub fn from_node_count(count: usize) -> Self {
    if count < 10 {
      Self::Simple
    } else if count < 100 {
      Self::Moderate
    } else {
      Self::Complex
    }
  }
}

impl std::fmt::Display for Complexity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let label = match self {
      Self::Simple => "Simple",
      Self::Moderate => "Moderate",
      Self::Complex => "Complex",
    };
    f.write_str(label)
  }
}

/// Aggregate counts over a document's whole tree, nested nodes included.
///
/// Feeds the preview engine's analysis block: region/node totals, the
/// dominant attribute types, and the most frequent node ids. Maps are
/// `BTreeMap` so iteration (and therefore preview output) is stable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentStats {
  pub region_count: usize,
  pub node_count: usize,
  pub attribute_count: usize,
  pub attribute_types: BTreeMap<String, usize>,
  pub node_ids: BTreeMap<String, usize>,
}

impl DocumentStats {
  #[must_use]
  pub fn collect(doc: &Document) -> Self {
    let mut stats = Self {
      region_count: doc.regions.len(),
      ..Self::default()
    };
    for region in &doc.regions {
      for node in &region.nodes {
        stats.visit(node);
      }
    }
    stats
  }

  fn visit(&mut self, node: &Node) {
    self.node_count += 1;
    *self.node_ids.entry(node.id.clone()).or_default() += 1;
    self.attribute_count += node.attributes.len();
    for attr in &node.attributes {
      *self
        .attribute_types
        .entry(attr.value_type.clone())
        .or_default() += 1;
    }
    for child in &node.children {
      self.visit(child);
    }
  }

  /// The `n` most frequent attribute types, most frequent first.
  /// Ties break alphabetically (the `BTreeMap` order).
  #[must_use]
  pub fn dominant_attribute_types(&self, n: usize) -> Vec<(&str, usize)> {
    let mut entries: Vec<(&str, usize)> = self
      .attribute_types
      .iter()
      .map(|(k, v)| (k.as_str(), *v))
      .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    entries.truncate(n);
    entries
  }

  #[must_use]
  pub fn complexity(&self) -> Complexity {
    Complexity::from_node_count(self.node_count)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::attribute::Attribute;
  use crate::region::Region;

  fn sample() -> Document {
    let mut doc = Document::new();
    let mut region = Region::new("config");
    let mut root = Node::new("Root");
    root.attributes.push(Attribute::new("Name", "string", "Test"));
    root.attributes.push(Attribute::new("Version", "int32", "1"));
    let mut child = Node::new("Child");
    child.attributes.push(Attribute::new("Tag", "string", "x"));
    root.children.push(child);
    region.nodes.push(root);
    doc.regions.push(region);
    doc
  }

  #[test]
  fn counts_include_nested_nodes() {
    let stats = sample().stats();
    assert_eq!(stats.region_count, 1);
    assert_eq!(stats.node_count, 2);
    assert_eq!(stats.attribute_count, 3);
    assert_eq!(stats.attribute_types["string"], 2);
    assert_eq!(stats.attribute_types["int32"], 1);
  }

  #[test]
  fn dominant_types_order_by_frequency_then_name() {
    let stats = sample().stats();
    let top = stats.dominant_attribute_types(5);
    assert_eq!(top, vec![("string", 2), ("int32", 1)]);
  }

  #[test]
  fn complexity_buckets() {
    assert_eq!(Complexity::from_node_count(0), Complexity::Simple);
    assert_eq!(Complexity::from_node_count(9), Complexity::Simple);
    assert_eq!(Complexity::from_node_count(10), Complexity::Moderate);
    assert_eq!(Complexity::from_node_count(99), Complexity::Moderate);
    assert_eq!(Complexity::from_node_count(100), Complexity::Complex);
  }
}
