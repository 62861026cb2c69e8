//! XML encoding and decoding of employee batches.
//!
//! Batches are first converted to their JSON value form and then mapped to
//! elements with a compact convention:
//!
//! - an object key becomes a child element
//! - an array becomes the same element repeated once per item
//! - a scalar becomes element text; `null` becomes an empty element
//!
//! No attributes and no indentation are produced. The mapping of a batch has
//! no single top-level element (it is a list of `<employee>` siblings), so the
//! codec wraps it in `<root>` with a newline on either side:
//!
//! ```text
//! <root>
//! <employee><id>1</id><name>Ali</name><salary>9000</salary></employee>...
//! </root>
//! ```
//!
//! Decoding applies the inverse mapping. XML text is untyped, so scalars are
//! inferred: integer, then float, then `true`/`false`, then string.

use crate::error::{CodecError, Result};
use crate::formats::{Codec, Format};
use crate::json::{batch_to_value, value_to_batch};
use crate::record::{EmployeeBatch, BATCH_FIELD};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Number, Value};

/// Name of the wrapping document element.
pub const ROOT_ELEMENT: &str = "root";

/// Codec for compact XML text.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl XmlCodec {
    /// Create an XML codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Codec for XmlCodec {
    fn format(&self) -> Format {
        Format::Xml
    }

    fn encode(&self, batch: &EmployeeBatch) -> Result<Vec<u8>> {
        let value = batch_to_value(batch)?;
        Ok(value_to_xml(&value)?.into_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> Result<EmployeeBatch> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| CodecError::malformed(Format::Xml, format!("Invalid UTF-8: {e}")))?;
        let mut content = xml_to_value(text)?;

        // A single record maps to one element, which reads back as an object
        if let Some(records) = content.get_mut(BATCH_FIELD) {
            if records.is_object() {
                *records = Value::Array(vec![records.take()]);
            }
        }

        value_to_batch(Value::Object(content), Format::Xml)
    }
}

/// Convert a JSON object to a `<root>`-wrapped XML document.
///
/// # Errors
///
/// Returns an error if `value` is not an object or the writer fails.
pub fn value_to_xml(value: &Value) -> Result<String> {
    let map = value
        .as_object()
        .ok_or_else(|| CodecError::malformed(Format::Xml, "Top-level value must be an object"))?;

    let mut writer = Writer::new(Vec::new());
    write_event(&mut writer, Event::Start(BytesStart::new(ROOT_ELEMENT)))?;
    write_event(&mut writer, Event::Text(BytesText::new("\n")))?;
    for (name, child) in map {
        write_value(&mut writer, name, child)?;
    }
    write_event(&mut writer, Event::Text(BytesText::new("\n")))?;
    write_event(&mut writer, Event::End(BytesEnd::new(ROOT_ELEMENT)))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| CodecError::malformed(Format::Xml, format!("Writer produced invalid UTF-8: {e}")))
}

fn write_value(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<()> {
    match value {
        Value::Array(items) => {
            for item in items {
                write_value(writer, name, item)?;
            }
        },
        Value::Object(map) => {
            write_event(writer, Event::Start(BytesStart::new(name)))?;
            for (key, child) in map {
                write_value(writer, key, child)?;
            }
            write_event(writer, Event::End(BytesEnd::new(name)))?;
        },
        Value::Null => write_event(writer, Event::Empty(BytesStart::new(name)))?,
        Value::String(s) => write_text_element(writer, name, s)?,
        Value::Bool(b) => write_text_element(writer, name, &b.to_string())?,
        Value::Number(n) => write_text_element(writer, name, &n.to_string())?,
    }
    Ok(())
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    write_event(writer, Event::Start(BytesStart::new(name)))?;
    if !text.is_empty() {
        write_event(writer, Event::Text(BytesText::new(text)))?;
    }
    write_event(writer, Event::End(BytesEnd::new(name)))
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| CodecError::malformed(Format::Xml, format!("Failed to write XML: {e}")))
}

/// An element being assembled during decoding.
#[derive(Debug)]
struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Map::new(),
            text: String::new(),
        }
    }

    fn add_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            },
            None => {
                self.children.insert(name, value);
            },
        }
    }

    /// Turn a closed element into its value.
    fn into_value(self) -> Result<Value> {
        if self.children.is_empty() {
            return Ok(infer_scalar(&self.text));
        }
        if !self.text.trim().is_empty() {
            return Err(CodecError::malformed(
                Format::Xml,
                format!("Element <{}> mixes text and child elements", self.name),
            ));
        }
        Ok(Value::Object(self.children))
    }
}

/// Parse a `<root>`-wrapped document back into the JSON object it encodes.
///
/// Returns the content of `<root>` as an object; an empty root yields an
/// empty object.
///
/// # Errors
///
/// Returns [`CodecError::MalformedInput`] on unparseable XML, a document
/// element other than a single `<root>`, attributes, or mixed content.
pub fn xml_to_value(xml: &str) -> Result<Map<String, Value>> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Map<String, Value>> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            CodecError::malformed(
                Format::Xml,
                format!("Parse error at byte {}: {e}", reader.buffer_position()),
            )
        })?;

        match event {
            Event::Start(start) => {
                let name = element_name(&start, root.is_some())?;
                stack.push(Frame::new(name));
            },
            Event::Empty(start) => {
                let name = element_name(&start, root.is_some())?;
                close_frame(Frame::new(name), &mut stack, &mut root)?;
            },
            Event::End(_) => {
                // quick-xml has already checked that the end tag matches
                let frame = stack.pop().ok_or_else(|| {
                    CodecError::malformed(Format::Xml, "Unexpected closing tag")
                })?;
                close_frame(frame, &mut stack, &mut root)?;
            },
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| CodecError::malformed(Format::Xml, e.to_string()))?;
                push_text(&mut stack, &text)?;
            },
            Event::CData(data) => {
                let bytes = data.into_inner();
                let text = std::str::from_utf8(&bytes)
                    .map_err(|e| CodecError::malformed(Format::Xml, e.to_string()))?;
                push_text(&mut stack, text)?;
            },
            Event::Eof => break,
            // Comments, declarations and processing instructions carry no data
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {},
        }
    }

    if let Some(open) = stack.last() {
        return Err(CodecError::malformed(
            Format::Xml,
            format!("Unexpected end of document inside <{}>", open.name),
        ));
    }
    root.ok_or_else(|| CodecError::malformed(Format::Xml, "Document has no root element"))
}

fn element_name(start: &BytesStart<'_>, root_closed: bool) -> Result<String> {
    if root_closed {
        return Err(CodecError::malformed(
            Format::Xml,
            "Content after the document element",
        ));
    }
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| CodecError::malformed(Format::Xml, e.to_string()))?
        .to_string();
    if start.attributes().next().is_some() {
        return Err(CodecError::malformed(
            Format::Xml,
            format!("Element <{name}> has attributes; the compact mapping uses none"),
        ));
    }
    Ok(name)
}

fn push_text(stack: &mut [Frame], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(frame) => {
            frame.text.push_str(text);
            Ok(())
        },
        None if text.trim().is_empty() => Ok(()),
        None => Err(CodecError::malformed(
            Format::Xml,
            "Text outside the document element",
        )),
    }
}

fn close_frame(
    frame: Frame,
    stack: &mut [Frame],
    root: &mut Option<Map<String, Value>>,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        let name = frame.name.clone();
        let value = frame.into_value()?;
        parent.add_child(name, value);
        return Ok(());
    }

    if frame.name != ROOT_ELEMENT {
        return Err(CodecError::malformed(
            Format::Xml,
            format!("Expected <{ROOT_ELEMENT}> document element, found <{}>", frame.name),
        ));
    }
    if !frame.text.trim().is_empty() {
        return Err(CodecError::malformed(
            Format::Xml,
            format!("<{ROOT_ELEMENT}> must contain elements, not text"),
        ));
    }
    *root = Some(frame.children);
    Ok(())
}

/// Infer the JSON scalar for element text.
fn infer_scalar(text: &str) -> Value {
    if let Ok(n) = text.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Some(n) = text.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(text.to_string()),
    }
}
