use serde_json::{Map, Value};
use tracing::warn;

use lsforge_tree::{Attribute, Document, Node, Region};

use crate::error::CodecError;

/// Parse an LSJ (JSON dialect) document.
///
/// The canonical shape is:
///
/// ```json
/// {
///   "save": {
///     "header":  { "version": "4.0.9.331" },
///     "regions": { "<region id>": { "node": [ ... ] } }
///   }
/// }
/// ```
///
/// The reader is deliberately permissive about the shapes found in the
/// wild:
///
/// - `regions` as a map (current) or a list of objects with `id` fields
///   (legacy);
/// - `node` as a list or a single object;
/// - attributes as a list of `{id, type, value, handle}` objects or as a
///   map keyed by attribute id;
/// - node-level keys whose value is `{ "type": ..., "value": ... }` are
///   attributes named by the key (the game's own emitter uses this shape);
/// - other node-level object/list keys are child nodes named by the key.
///
/// Region keys that are none of the above (`category`, `speakerlist`,
/// ...) are preserved verbatim in [`Region::extras`].
///
/// # Errors
///
/// [`CodecError::Json`] for malformed JSON, [`CodecError::Invalid`] for
/// valid JSON that is not a document.
pub fn parse(text: &str) -> Result<Document, CodecError> {
  let value: Value = serde_json::from_str(text)?;
  let Value::Object(root) = value else {
    return Err(CodecError::Invalid("top level must be a JSON object".to_string()));
  };

  let mut doc = Document::new();
  let body = match root.get("save") {
    Some(Value::Object(save)) => save,
    Some(_) => {
      return Err(CodecError::Invalid("\"save\" must be an object".to_string()));
    }
    // Not a save container at all; an empty document under a `root` tag,
    // matching the reference tool's fallback.
    None => {
      doc.root_tag = "root".to_string();
      return Ok(doc);
    }
  };

  doc.version = body
    .get("header")
    .and_then(Value::as_object)
    .and_then(|h| h.get("version"))
    .or_else(|| body.get("version"))
    .map(scalar_to_string)
    .filter(|v| !v.is_empty());

  match body.get("regions") {
    Some(Value::Object(regions)) => {
      for (id, region_body) in regions {
        doc.regions.push(parse_region(id.clone(), region_body)?);
      }
    }
    Some(Value::Array(regions)) => {
      // Legacy shape: a list of region objects carrying their own ids.
      for region_body in regions {
        let id = region_body
          .get("id")
          .and_then(Value::as_str)
          .unwrap_or("unknown")
          .to_string();
        if doc.regions.iter().any(|r| r.id == id) {
          return Err(CodecError::Invalid(format!("duplicate region id: {id}")));
        }
        doc.regions.push(parse_region(id, region_body)?);
      }
    }
    Some(_) => {
      return Err(CodecError::Invalid("\"regions\" must be an object or array".to_string()));
    }
    None => {}
  }

  Ok(doc)
}

fn parse_region(id: String, body: &Value) -> Result<Region, CodecError> {
  let mut region = Region::new(id);
  let Some(obj) = body.as_object() else {
    warn!(id = %region.id, "region body is not an object, treated as empty");
    return Ok(region);
  };

  for (key, value) in obj {
    match key.as_str() {
      "node" => parse_nodes_into(value, &mut region.nodes)?,
      "id" => {} // consumed by the legacy list shape
      _ => {
        region.extras.insert(key.clone(), value.clone());
      }
    }
  }
  Ok(region)
}

fn parse_nodes_into(value: &Value, out: &mut Vec<Node>) -> Result<(), CodecError> {
  match value {
    Value::Array(items) => {
      for item in items {
        out.push(parse_node(item, None)?);
      }
    }
    Value::Object(_) => out.push(parse_node(value, None)?),
    _ => {
      return Err(CodecError::Invalid("\"node\" must be an object or array".to_string()));
    }
  }
  Ok(())
}

fn parse_node(value: &Value, key_as_id: Option<&str>) -> Result<Node, CodecError> {
  let Some(obj) = value.as_object() else {
    return Err(CodecError::Invalid("node must be a JSON object".to_string()));
  };

  let id = obj
    .get("id")
    .and_then(Value::as_str)
    .or(key_as_id)
    .unwrap_or("unknown")
    .to_string();
  let mut node = Node::new(id);

  for (key, v) in obj {
    match key.as_str() {
      "id" => {}
      "attribute" => parse_attributes_into(v, &mut node)?,
      "children" | "node" => parse_nodes_into(v, &mut node.children)?,
      _ => {
        if let Some(attr_body) = attribute_shaped(v) {
          node.attributes.push(attribute_from(key, attr_body));
        } else if let Value::Array(items) = v {
          // A list of objects under an arbitrary key: child nodes named
          // by the key.
          for item in items {
            node.children.push(parse_node(item, Some(key))?);
          }
        } else if v.is_object() {
          node.children.push(parse_node(v, Some(key))?);
        } else {
          warn!(key = %key, "unrecognized scalar on node, ignored");
        }
      }
    }
  }
  Ok(node)
}

fn parse_attributes_into(value: &Value, node: &mut Node) -> Result<(), CodecError> {
  match value {
    Value::Array(items) => {
      for item in items {
        let Some(obj) = item.as_object() else {
          return Err(CodecError::Invalid("attribute list entries must be objects".to_string()));
        };
        let id = obj
          .get("id")
          .and_then(Value::as_str)
          .ok_or_else(|| CodecError::Invalid("attribute entry without id".to_string()))?;
        node.attributes.push(attribute_from(id, obj));
      }
    }
    Value::Object(map) => {
      // Map shape: keyed by attribute id.
      for (id, body) in map {
        match body.as_object() {
          Some(obj) => node.attributes.push(attribute_from(id, obj)),
          None => node
            .attributes
            .push(Attribute::new(id.clone(), String::new(), scalar_to_string(body))),
        }
      }
    }
    _ => {
      return Err(CodecError::Invalid("\"attribute\" must be an object or array".to_string()));
    }
  }
  Ok(())
}

/// An object with a string `type` and a `value` or `handle` is an
/// attribute body.
fn attribute_shaped(value: &Value) -> Option<&Map<String, Value>> {
  let obj = value.as_object()?;
  let has_type = obj.get("type").is_some_and(Value::is_string);
  if has_type && (obj.contains_key("value") || obj.contains_key("handle")) {
    Some(obj)
  } else {
    None
  }
}

fn attribute_from(id: &str, body: &Map<String, Value>) -> Attribute {
  let value_type = body
    .get("type")
    .map(scalar_to_string)
    .unwrap_or_default();
  let value = body.get("value").map(scalar_to_string).unwrap_or_default();
  let mut attribute = Attribute::new(id, value_type, value);
  attribute.handle = body.get("handle").map(scalar_to_string);
  attribute
}

/// String-encode a JSON scalar the way attribute values are carried.
fn scalar_to_string(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => n.to_string(),
    other => other.to_string(),
  }
}

/// Emit a document in the JSON dialect.
///
/// Always the map-of-regions shape, stable key order: `save`, then
/// `header`, then `regions`, then region ids sorted. Attributes emit as
/// lists so order and duplicate ids survive. Region extras re-emit after
/// the reserved keys, in their preserved order. 2-space indentation.
///
/// # Errors
///
/// [`CodecError::Json`] if serialization fails (practically unreachable
/// for string-keyed maps).
pub fn emit(doc: &Document) -> Result<String, CodecError> {
  let mut header = Map::new();
  if let Some(version) = &doc.version {
    header.insert("version".to_string(), Value::String(version.clone()));
  }

  let mut regions = Map::new();
  let mut ordered: Vec<&Region> = doc.regions.iter().collect();
  ordered.sort_by(|a, b| a.id.cmp(&b.id));
  for region in ordered {
    regions.insert(region.id.clone(), region_value(region));
  }

  let mut save = Map::new();
  save.insert("header".to_string(), Value::Object(header));
  save.insert("regions".to_string(), Value::Object(regions));

  let mut root = Map::new();
  root.insert("save".to_string(), Value::Object(save));

  let mut text = serde_json::to_string_pretty(&Value::Object(root))?;
  text.push('\n');
  Ok(text)
}

fn region_value(region: &Region) -> Value {
  let mut obj = Map::new();
  if !region.nodes.is_empty() {
    obj.insert(
      "node".to_string(),
      Value::Array(region.nodes.iter().map(node_value).collect()),
    );
  }
  for (key, value) in &region.extras {
    obj.insert(key.clone(), value.clone());
  }
  Value::Object(obj)
}

fn node_value(node: &Node) -> Value {
  let mut obj = Map::new();
  obj.insert("id".to_string(), Value::String(node.id.clone()));
  if !node.attributes.is_empty() {
    obj.insert(
      "attribute".to_string(),
      Value::Array(node.attributes.iter().map(attribute_value).collect()),
    );
  }
  if !node.children.is_empty() {
    obj.insert(
      "children".to_string(),
      Value::Array(node.children.iter().map(node_value).collect()),
    );
  }
  Value::Object(obj)
}

fn attribute_value(attribute: &Attribute) -> Value {
  let mut obj = Map::new();
  obj.insert("id".to_string(), Value::String(attribute.id.clone()));
  obj.insert("type".to_string(), Value::String(attribute.value_type.clone()));
  obj.insert("value".to_string(), Value::String(attribute.value.clone()));
  if let Some(handle) = &attribute.handle {
    obj.insert("handle".to_string(), Value::String(handle.clone()));
  }
  Value::Object(obj)
}
