use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;

use lsforge_runner::{CancelFlag, Converter, ProgressSink};

use crate::binary::check_outcome;
use crate::error::CodecError;

/// One localization string: an opaque handle, an entry version, and the
/// display text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocaEntry {
  pub handle: String,
  pub version: String,
  pub text: String,
}

/// Parse the converter's XML rendition of a localization table:
///
/// ```xml
/// <contentList>
///   <content contentuid="h0123..." version="1">Actual text</content>
/// </contentList>
/// ```
///
/// # Errors
///
/// [`CodecError::Xml`] on malformed XML. Entries missing `contentuid`
/// are skipped rather than fatal — partial tables still preview.
pub fn parse_content_list(xml: &str) -> Result<Vec<LocaEntry>, CodecError> {
  let mut reader = Reader::from_str(xml);
  reader.config_mut().trim_text(true);

  let mut entries = Vec::new();
  let mut current: Option<LocaEntry> = None;

  loop {
    match reader.read_event()? {
      Event::Start(e) if e.local_name().as_ref() == b"content" => {
        let mut handle = None;
        let mut version = String::new();
        for attr in e.attributes() {
          let attr = attr?;
          match attr.key.local_name().as_ref() {
            b"contentuid" => handle = Some(attr.unescape_value()?.into_owned()),
            b"version" => version = attr.unescape_value()?.into_owned(),
            _ => {}
          }
        }
        current = handle.map(|handle| LocaEntry {
          handle,
          version,
          text: String::new(),
        });
      }
      Event::Text(t) => {
        if let Some(entry) = current.as_mut() {
          entry.text.push_str(&t.unescape()?);
        }
      }
      Event::End(e) if e.local_name().as_ref() == b"content" => {
        if let Some(entry) = current.take() {
          entries.push(entry);
        }
      }
      Event::Eof => break,
      _ => {}
    }
  }

  Ok(entries)
}

/// Read a binary localization table by converting it to XML first.
///
/// # Errors
///
/// Converter and XML-parse failures, as [`CodecError`].
pub async fn read_entries(
  path: &Path,
  converter: &Converter,
  progress: &ProgressSink,
  cancel: &CancelFlag,
) -> Result<Vec<LocaEntry>, CodecError> {
  let temp = tempfile::Builder::new()
    .prefix("lsforge-loca-")
    .suffix(".xml")
    .tempfile()?;

  let outcome = converter
    .convert_resource(path, temp.path(), "loca", "xml", progress, cancel)
    .await?;
  check_outcome(&outcome)?;

  let xml = std::fs::read_to_string(temp.path())?;
  parse_content_list(&xml)
}
