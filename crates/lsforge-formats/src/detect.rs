use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::format::FileFormat;

/// Bytes sampled for magic sniffing.
const MAGIC_SAMPLE: usize = 16;

/// Bytes sampled for the content probe (rule 3).
const PROBE_SAMPLE: usize = 4096;

/// Classify a file on disk.
///
/// Rules apply in order; the first match wins:
///
/// 1. recognized extension;
/// 2. magic bytes in the first 16 bytes of content;
/// 3. bounded content probe — parse a sample as JSON, then as XML;
/// 4. `Unknown`.
///
/// Detection is total: unreadable files, short files, and garbage all
/// classify as `Unknown` rather than erroring.
#[must_use]
pub fn detect_path(path: &Path) -> FileFormat {
  if let Some(format) = path
    .extension()
    .and_then(|e| e.to_str())
    .and_then(from_extension)
  {
    return format;
  }

  let mut sample = [0u8; PROBE_SAMPLE];
  let len = match File::open(path).and_then(|mut f| read_up_to(&mut f, &mut sample)) {
    Ok(len) => len,
    Err(_) => return FileFormat::Unknown,
  };

  detect_content(&sample[..len])
}

/// Classify raw content, skipping the extension rule. Exposed for callers
/// that already hold the bytes (and for the fuzz harness).
#[must_use]
pub fn detect_bytes(content: &[u8]) -> FileFormat {
  detect_content(&content[..content.len().min(PROBE_SAMPLE)])
}

fn detect_content(sample: &[u8]) -> FileFormat {
  if let Some(format) = from_magic(&sample[..sample.len().min(MAGIC_SAMPLE)]) {
    return format;
  }
  probe_content(sample).unwrap_or(FileFormat::Unknown)
}

/// Rule 1: the extension table. Extension is matched case-insensitively,
/// without the leading dot.
#[must_use]
pub fn from_extension(ext: &str) -> Option<FileFormat> {
  let format = match ext.to_ascii_lowercase().as_str() {
    "lsx" | "xml" => FileFormat::Textual,
    "lsj" | "json" => FileFormat::Json,
    "lsf" | "lsfx" | "lsbs" | "lsbc" => FileFormat::BinaryTree,
    "loca" => FileFormat::Localization,
    "dds" => FileFormat::Texture,
    "gr2" => FileFormat::Model,
    "bshd" | "shd" => FileFormat::Shader,
    "pak" => FileFormat::Package,
    "txt" => FileFormat::PlainText,
    _ => return None,
  };
  Some(format)
}

/// Rule 2: magic bytes. All magics are exactly 4 bytes, so anything
/// shorter falls through to the content probe.
#[must_use]
pub fn from_magic(head: &[u8]) -> Option<FileFormat> {
  if head.len() < 4 {
    return None;
  }
  let format = match &head[..4] {
    b"LSOF" | b"LSFW" | b"LSFM" => FileFormat::BinaryTree,
    b"DDS " => FileFormat::Texture,
    b"LOCA" => FileFormat::Localization,
    _ => return None,
  };
  Some(format)
}

/// Rule 3: try parsing a bounded sample as JSON, then as XML.
///
/// JSON must parse completely within the sample. For XML it is enough
/// that the sample opens with a well-formed declaration or start tag —
/// large documents will not fit the sample, and the prefix is evidence
/// enough for classification.
#[must_use]
pub fn probe_content(sample: &[u8]) -> Option<FileFormat> {
  if serde_json::from_slice::<serde_json::Value>(sample).is_ok() {
    return Some(FileFormat::Json);
  }

  let text = std::str::from_utf8(sample).ok()?;
  let mut reader = Reader::from_str(text);
  loop {
    match reader.read_event() {
      Ok(Event::Decl(_) | Event::Start(_) | Event::Empty(_)) => {
        return Some(FileFormat::Textual);
      }
      // Leading whitespace/comments before the root element
      Ok(Event::Text(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_)) => {}
      _ => return None,
    }
  }
}

fn read_up_to(f: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
  let mut filled = 0;
  while filled < buf.len() {
    let n = f.read(&mut buf[filled..])?;
    if n == 0 {
      break;
    }
    filled += n;
  }
  Ok(filled)
}
