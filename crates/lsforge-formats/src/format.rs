/// Every file class the toolkit recognizes.
///
/// Classification is the job of [`crate::detect`]; this enum is the
/// vocabulary shared by the preview registry, the codecs, and the CLI.
///
/// ```text
/// ┌──────────────┬───────────────────────────────┬───────────────┐
/// │ Variant      │ Extensions                    │ Magic         │
/// ├──────────────┼───────────────────────────────┼───────────────┤
/// │ Textual      │ .lsx .xml                     │ —             │
/// │ Json         │ .lsj .json                    │ —             │
/// │ BinaryTree   │ .lsf .lsfx .lsbs .lsbc        │ LSOF LSFW LSFM│
/// │ Localization │ .loca                         │ LOCA          │
/// │ Texture      │ .dds                          │ "DDS "        │
/// │ Model        │ .gr2                          │ —             │
/// │ Shader       │ .bshd .shd                    │ —             │
/// │ Package      │ .pak                          │ —             │
/// │ PlainText    │ .txt                          │ —             │
/// │ Unknown      │ everything else               │ —             │
/// └──────────────┴───────────────────────────────┴───────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileFormat {
  Textual,
  Json,
  BinaryTree,
  Localization,
  Texture,
  Model,
  Shader,
  Package,
  PlainText,
  Unknown,
}

impl FileFormat {
  /// The dialect this format maps onto, for formats that carry the
  /// resource tree.
  #[must_use]
  pub fn dialect(self) -> Option<Dialect> {
    match self {
      Self::Textual => Some(Dialect::Textual),
      Self::Json => Some(Dialect::Json),
      Self::BinaryTree => Some(Dialect::Binary),
      _ => None,
    }
  }
}

impl std::fmt::Display for FileFormat {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let label = match self {
      Self::Textual => "textual",
      Self::Json => "json",
      Self::BinaryTree => "binary-tree",
      Self::Localization => "localization",
      Self::Texture => "texture",
      Self::Model => "model",
      Self::Shader => "shader",
      Self::Package => "package",
      Self::PlainText => "plain-text",
      Self::Unknown => "unknown",
    };
    f.write_str(label)
  }
}

/// The three encodings of the resource tree.
///
/// `Binary` is never parsed in-process — the binary codec round-trips
/// through the textual dialect via the external converter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dialect {
  Textual,
  Json,
  Binary,
}
