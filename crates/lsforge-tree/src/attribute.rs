/// A single typed scalar on a node.
///
/// Values are kept string-encoded regardless of the declared type — the
/// engine's type vocabulary (`FixedString`, `uint32`, `LSString`,
/// `TranslatedString`, `guid`, ...) is open-ended and the toolkit never
/// needs to interpret the payload, only to carry it faithfully between
/// dialects.
///
/// `handle` and `value` are independent fields that co-exist: a
/// `TranslatedString` attribute carries a localization handle *and* a
/// (possibly empty) display value. `handle` is `Some` exactly when the
/// type identifies a localized string.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
  pub id: String,
  pub value_type: String,
  pub value: String,
  pub handle: Option<String>,
}

/// Attribute types that reference the localization table through a handle.
const LOCALIZED_TYPES: [&str; 2] = ["TranslatedString", "TranslatedFSString"];

impl Attribute {
  #[must_use]
  pub fn new(id: impl Into<String>, value_type: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      value_type: value_type.into(),
      value: value.into(),
      handle: None,
    }
  }

  #[must_use]
  pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
    self.handle = Some(handle.into());
    self
  }

  /// Whether this attribute's type names a localized string — the types
  /// for which a `handle` is expected.
  #[must_use]
  pub fn is_localized(&self) -> bool {
    LOCALIZED_TYPES.contains(&self.value_type.as_str())
  }

  pub(crate) fn structurally_equal(&self, other: &Self) -> bool {
    self.id == other.id
      && self.value_type == other.value_type
      && self.value.trim() == other.value.trim()
      && self.handle == other.handle
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn localized_detection() {
    let plain = Attribute::new("Name", "FixedString", "Longsword");
    assert!(!plain.is_localized());

    let translated = Attribute::new("DisplayName", "TranslatedString", "")
      .with_handle("h11111111g2222g3333g4444g555555555555");
    assert!(translated.is_localized());
    assert!(translated.handle.is_some());
  }

  #[test]
  fn handle_compared_exactly() {
    let a = Attribute::new("D", "TranslatedString", "x").with_handle("h1");
    let b = Attribute::new("D", "TranslatedString", "x").with_handle("h2");
    assert!(!a.structurally_equal(&b));
  }
}
