use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use tracing::warn;

use lsforge_tree::{Attribute, Document, Node, Region};

use crate::error::CodecError;

/// Parse an LSX (textual dialect) document.
///
/// The reader is a streaming state machine over `quick-xml` events. The
/// dialect's structure is `root → region → node → attribute`, but real
/// files wrap child nodes in extra elements (`<children>`, `<version>`
/// headers, editor metadata), so any element that is not a `region`,
/// `node`, or `attribute` is treated as a transparent wrapper: the parser
/// descends through it and attaches whatever it finds to the nearest
/// enclosing node or region.
///
/// ```text
/// <save version="...">          Frame::Root
///   <region id="config">        Frame::Region
///     <node id="Root">          Frame::Node
///       <attribute .../>          → attach to nearest Node
///       <children>              Frame::Wrapper (transparent)
///         <node id="Child">     Frame::Node → attach through wrapper
/// ```
///
/// Element and attribute names are matched on their local part, so
/// namespace-prefixed documents parse the same as plain ones.
///
/// # Errors
///
/// [`CodecError::Xml`]/[`CodecError::XmlAttr`] for malformed XML, and
/// [`CodecError::Invalid`] for well-formed XML that breaks the dialect's
/// structure (missing `id`s, unbalanced elements). Never panics.
pub fn parse(text: &str) -> Result<Document, CodecError> {
  let mut reader = Reader::from_str(text);
  reader.config_mut().trim_text(true);

  let mut doc: Option<Document> = None;
  let mut stack: Vec<Frame> = Vec::new();

  loop {
    match reader.read_event()? {
      Event::Start(e) => {
        let frame = open_element(&e, &mut doc, &mut stack)?;
        stack.push(frame);
      }
      Event::Empty(e) => {
        let frame = open_element(&e, &mut doc, &mut stack)?;
        close_frame(frame, &mut doc, &mut stack)?;
      }
      Event::End(_) => {
        let frame = stack
          .pop()
          .ok_or_else(|| CodecError::Invalid("unbalanced closing tag".to_string()))?;
        close_frame(frame, &mut doc, &mut stack)?;
      }
      Event::Eof => break,
      // Text, comments, CDATA, processing instructions: insignificant
      _ => {}
    }
  }

  if !stack.is_empty() {
    return Err(CodecError::Invalid("document ended inside an open element".to_string()));
  }
  doc.ok_or_else(|| CodecError::Invalid("no root element".to_string()))
}

/// Parser stack frame — one per open element.
enum Frame {
  Root,
  Region(Region),
  Node(Node),
  /// Any element the dialect does not know: descended through, never
  /// represented.
  Wrapper,
}

fn open_element(
  e: &BytesStart<'_>,
  doc: &mut Option<Document>,
  stack: &mut Vec<Frame>,
) -> Result<Frame, CodecError> {
  if doc.is_none() {
    // The first element is the root, whatever it is called.
    let mut document = Document::new();
    document.root_tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    document.version = find_attr(e, b"version")?;
    *doc = Some(document);
    return Ok(Frame::Root);
  }

  let local = e.local_name();
  match local.as_ref() {
    b"region" if !stack.iter().any(in_region) => {
      let id = find_attr(e, b"id")?
        .ok_or_else(|| CodecError::Invalid("region element without id".to_string()))?;
      Ok(Frame::Region(Region::new(id)))
    }
    b"node" if stack.iter().any(in_region) => {
      let id = find_attr(e, b"id")?
        .ok_or_else(|| CodecError::Invalid("node element without id".to_string()))?;
      Ok(Frame::Node(Node::new(id)))
    }
    b"attribute" => {
      attach_attribute(stack, parse_attribute(e)?);
      Ok(Frame::Wrapper)
    }
    _ => Ok(Frame::Wrapper),
  }
}

fn in_region(frame: &Frame) -> bool {
  matches!(frame, Frame::Region(_) | Frame::Node(_))
}

fn close_frame(
  frame: Frame,
  doc: &mut Option<Document>,
  stack: &mut [Frame],
) -> Result<(), CodecError> {
  match frame {
    Frame::Region(region) => {
      if let Some(doc) = doc.as_mut() {
        // Region ids are unique per document; a collision means the
        // file violates the tree model.
        if doc.regions.iter().any(|r| r.id == region.id) {
          return Err(CodecError::Invalid(format!("duplicate region id: {}", region.id)));
        }
        doc.regions.push(region);
      }
    }
    Frame::Node(node) => attach_node(stack, node),
    Frame::Root | Frame::Wrapper => {}
  }
  Ok(())
}

/// Attach a completed node to the nearest enclosing node or region,
/// looking through transparent wrappers.
fn attach_node(stack: &mut [Frame], node: Node) {
  for frame in stack.iter_mut().rev() {
    match frame {
      Frame::Node(parent) => {
        parent.children.push(node);
        return;
      }
      Frame::Region(region) => {
        region.nodes.push(node);
        return;
      }
      _ => {}
    }
  }
  warn!(id = %node.id, "node outside any region, dropped");
}

fn attach_attribute(stack: &mut [Frame], attribute: Attribute) {
  for frame in stack.iter_mut().rev() {
    if let Frame::Node(node) = frame {
      node.attributes.push(attribute);
      return;
    }
  }
  warn!(id = %attribute.id, "attribute outside any node, dropped");
}

fn parse_attribute(e: &BytesStart<'_>) -> Result<Attribute, CodecError> {
  let Some(id) = find_attr(e, b"id")? else {
    return Err(CodecError::Invalid("attribute element without id".to_string()));
  };
  let value_type = find_attr(e, b"type")?.unwrap_or_default();
  let value = find_attr(e, b"value")?.unwrap_or_default();
  let handle = find_attr(e, b"handle")?;
  let mut attribute = Attribute::new(id, value_type, value);
  attribute.handle = handle;
  Ok(attribute)
}

fn find_attr(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, CodecError> {
  for attr in e.attributes() {
    let attr = attr?;
    if attr.key.local_name().as_ref() == key {
      return Ok(Some(attr.unescape_value()?.into_owned()));
    }
  }
  Ok(None)
}

/// Emit a document in the textual dialect.
///
/// Output contract: UTF-8, XML declaration first, 2-space indentation,
/// attribute elements with their XML attributes always in the order
/// `(id, type, value, handle)`.
#[must_use]
pub fn emit(doc: &Document) -> String {
  let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

  let mut root_open = format!("<{}", doc.root_tag);
  if let Some(version) = &doc.version {
    root_open.push_str(&format!(" version=\"{}\"", escape(version)));
  }

  if doc.regions.is_empty() {
    out.push_str(&root_open);
    out.push_str("/>\n");
    return out;
  }

  out.push_str(&root_open);
  out.push_str(">\n");
  for region in &doc.regions {
    write_region(&mut out, region);
  }
  out.push_str(&format!("</{}>\n", doc.root_tag));
  out
}

fn write_region(out: &mut String, region: &Region) {
  if region.nodes.is_empty() {
    out.push_str(&format!("  <region id=\"{}\"/>\n", escape(&region.id)));
    return;
  }
  out.push_str(&format!("  <region id=\"{}\">\n", escape(&region.id)));
  for node in &region.nodes {
    write_node(out, node, 2);
  }
  out.push_str("  </region>\n");
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
  let pad = "  ".repeat(depth);
  if node.attributes.is_empty() && node.children.is_empty() {
    out.push_str(&format!("{pad}<node id=\"{}\"/>\n", escape(&node.id)));
    return;
  }
  out.push_str(&format!("{pad}<node id=\"{}\">\n", escape(&node.id)));
  for attribute in &node.attributes {
    out.push_str(&format!(
      "{pad}  <attribute id=\"{}\" type=\"{}\" value=\"{}\"",
      escape(&attribute.id),
      escape(&attribute.value_type),
      escape(&attribute.value),
    ));
    if let Some(handle) = &attribute.handle {
      out.push_str(&format!(" handle=\"{}\"", escape(handle)));
    }
    out.push_str("/>\n");
  }
  for child in &node.children {
    write_node(out, child, depth + 1);
  }
  out.push_str(&format!("{pad}</node>\n"));
}
