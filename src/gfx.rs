//! XML side of the graphics device: out-of-town score templates and XML documents
//! re-published as JSON.

use crate::sink::OutScorePage;
use log::debug;
use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const ELEMENT: &[u8] = b"clsGFXElement";
const NAME_FIELD: &[u8] = b"GraphicObjName";
const TEXT_FIELD: &[u8] = b"GraphicObjText";

#[derive(Debug)]
pub enum GfxError {
    Io(std::io::Error, PathBuf),
    Xml(quick_xml::Error, PathBuf),
    Serialize(serde_json::Error),
}

impl fmt::Display for GfxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GfxError::Io(e, path) => write!(f, "{}: {e}", path.display()),
            GfxError::Xml(e, path) => write!(f, "{}: bad XML: {e}", path.display()),
            GfxError::Serialize(e) => write!(f, "could not serialize JSON: {e}"),
        }
    }
}

impl std::error::Error for GfxError {}

/// Rewrite a template file in place with the page's text fields.
pub fn update_template(path: &Path, fields: &OutScorePage) -> Result<(), GfxError> {
    let raw = fs::read_to_string(path).map_err(|e| GfxError::Io(e, path.to_path_buf()))?;
    let patched =
        patch_template(strip_bom(&raw), fields).map_err(|e| GfxError::Xml(e, path.to_path_buf()))?;
    fs::write(path, patched).map_err(|e| GfxError::Io(e, path.to_path_buf()))?;
    debug!("patched {}", path.display());
    Ok(())
}

/// Set `GraphicObjText` on every `clsGFXElement` whose `GraphicObjName` is a
/// key of `fields`. Everything else in the document is written back as read.
pub fn patch_template(xml: &str, fields: &OutScorePage) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut buffered: Option<Vec<Event>> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) if buffered.is_none() && e.name().as_ref() == ELEMENT => {
                buffered = Some(vec![Event::Start(e)]);
                depth = 1;
            }
            event => {
                let Some(events) = buffered.as_mut() else {
                    writer.write_event(event)?;
                    continue;
                };
                match &event {
                    Event::Start(e) if e.name().as_ref() == ELEMENT => depth += 1,
                    Event::End(e) if e.name().as_ref() == ELEMENT => depth -= 1,
                    _ => {}
                }
                events.push(event);
                if depth == 0 {
                    if let Some(events) = buffered.take() {
                        write_element(&mut writer, events, fields)?;
                    }
                }
            }
        }
    }

    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    events: Vec<Event>,
    fields: &OutScorePage,
) -> Result<(), quick_xml::Error> {
    let text = match element_name(&events)? {
        Some(name) => fields.get(name.trim()),
        None => None,
    };
    let Some(text) = text else {
        for event in events {
            writer.write_event(event)?;
        }
        return Ok(());
    };

    let mut replacing = false;
    for event in events {
        match event {
            Event::Start(e) if e.name().as_ref() == TEXT_FIELD => {
                writer.write_event(Event::Start(e))?;
                writer.write_event(Event::Text(BytesText::new(text)))?;
                replacing = true;
            }
            Event::Empty(e) if e.name().as_ref() == TEXT_FIELD => {
                let end = e.to_end().into_owned();
                writer.write_event(Event::Start(e))?;
                writer.write_event(Event::Text(BytesText::new(text)))?;
                writer.write_event(Event::End(end))?;
            }
            Event::End(e) if e.name().as_ref() == TEXT_FIELD => {
                replacing = false;
                writer.write_event(Event::End(e))?;
            }
            _ if replacing => {}
            event => writer.write_event(event)?,
        }
    }
    Ok(())
}

fn element_name(events: &[Event]) -> Result<Option<String>, quick_xml::Error> {
    let mut name: Option<String> = None;
    for event in events {
        match event {
            Event::Start(e) if e.name().as_ref() == NAME_FIELD => name = Some(String::new()),
            Event::End(e) if e.name().as_ref() == NAME_FIELD => return Ok(name),
            Event::Text(t) => {
                if let Some(name) = name.as_mut() {
                    name.push_str(&t.unescape()?);
                }
            }
            _ => {}
        }
    }
    Ok(name)
}

/// Write `{path}.json` next to an XML document and return its path.
pub fn convert_xml_file(path: &Path) -> Result<PathBuf, GfxError> {
    let raw = fs::read_to_string(path).map_err(|e| GfxError::Io(e, path.to_path_buf()))?;
    let json = xml_to_json(strip_bom(&raw)).map_err(|e| GfxError::Xml(e, path.to_path_buf()))?;

    let mut out = path.as_os_str().to_owned();
    out.push(".json");
    let out = PathBuf::from(out);
    let body = serde_json::to_vec(&json).map_err(GfxError::Serialize)?;
    fs::write(&out, body).map_err(|e| GfxError::Io(e, out.clone()))?;
    Ok(out)
}

/// Convert an XML document to JSON.
///
/// Attributes become `@name` keys, mixed text becomes `#text`, repeated
/// child elements become arrays, text-only elements become strings and empty
/// elements become `null`. The declaration is kept under `?xml`.
pub fn xml_to_json(xml: &str) -> Result<Value, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut doc = Map::new();
    let mut open: Vec<Node> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Decl(d) => {
                doc.insert("?xml".into(), decl_json(&d)?);
            }
            Event::Start(e) => open.push(Node::open(&e)?),
            Event::Empty(e) => {
                let node = Node::open(&e)?;
                close(&mut open, &mut doc, node);
            }
            Event::End(_) => {
                if let Some(node) = open.pop() {
                    close(&mut open, &mut doc, node);
                }
            }
            Event::Text(t) => {
                if let Some(node) = open.last_mut() {
                    node.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(node) = open.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            _ => {}
        }
    }

    Ok(Value::Object(doc))
}

struct Node {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
    text: String,
}

impl Node {
    fn open(e: &BytesStart) -> Result<Self, quick_xml::Error> {
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            attrs.push((key, attr.unescape_value()?.into_owned()));
        }
        Ok(Self {
            name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            attrs,
            children: Vec::new(),
            text: String::new(),
        })
    }

    fn into_json(self) -> Value {
        let Node { attrs, children, text, .. } = self;
        let text = text.trim();
        if attrs.is_empty() && children.is_empty() {
            return if text.is_empty() { Value::Null } else { Value::String(text.to_owned()) };
        }

        let mut map = Map::new();
        for (key, value) in attrs {
            map.insert(format!("@{key}"), Value::String(value));
        }
        for child in children {
            let name = child.name.clone();
            insert_child(&mut map, name, child.into_json());
        }
        if !text.is_empty() {
            map.insert("#text".into(), Value::String(text.to_owned()));
        }
        Value::Object(map)
    }
}

fn close(open: &mut [Node], doc: &mut Map<String, Value>, node: Node) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            let name = node.name.clone();
            insert_child(doc, name, node.into_json());
        }
    }
}

fn insert_child(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(key, value);
        }
    }
}

fn decl_json(decl: &BytesDecl) -> Result<Value, quick_xml::Error> {
    let mut map = Map::new();
    map.insert("@version".into(), lossy(decl.version()?.as_ref()));
    if let Some(encoding) = decl.encoding() {
        map.insert("@encoding".into(), lossy(encoding?.as_ref()));
    }
    if let Some(standalone) = decl.standalone() {
        map.insert("@standalone".into(), lossy(standalone?.as_ref()));
    }
    Ok(Value::Object(map))
}

fn lossy(bytes: &[u8]) -> Value {
    Value::String(String::from_utf8_lossy(bytes).into_owned())
}

fn strip_bom(raw: &str) -> &str {
    raw.strip_prefix('\u{feff}').unwrap_or(raw)
}
