//! Textual message schemas for the binary codec.
//!
//! A [`Schema`] is loaded from the message definition language used by
//! Protocol Buffers (`.proto` files). Only the subset needed to describe flat
//! records is understood:
//!
//! - `syntax`, `package`, `import` and `option` statements
//! - line (`//`) and block (`/* */`) comments
//! - top-level `message` blocks whose fields are
//!   `[optional|required|repeated] <type> <name> = <number> [options];`
//!
//! Nested messages, enums, `oneof` and maps are rejected as syntax errors.
//!
//! # Examples
//!
//! ```
//! use codecmp::schema::Schema;
//!
//! let schema = Schema::parse(r#"
//!     syntax = "proto3";
//!     message Employee { int32 id = 1; string name = 2; int32 salary = 3; }
//!     message Employees { repeated Employee employee = 1; }
//! "#)?;
//! assert_eq!(schema.message("Employee").unwrap().fields().len(), 3);
//! # Ok::<(), codecmp::CodecError>(())
//! ```

use crate::error::{CodecError, Result};
use crate::record::{Employee, BATCH_FIELD};
use nom::branch::alt;
use nom::bytes::complete::{is_not, tag, take_until, take_while, take_while1};
use nom::character::complete::{char, digit1, multispace1, satisfy};
use nom::combinator::{all_consuming, map, map_res, not, opt, recognize, value};
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use nom::IResult;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Name of the root message type the binary codec encodes.
pub const ROOT_MESSAGE: &str = "Employees";

/// Name of the record message type in the built-in schema.
pub const RECORD_MESSAGE: &str = "Employee";

/// Highest field number the wire format allows.
const MAX_FIELD_NUMBER: u32 = 536_870_911;

/// Field numbers reserved by the Protocol Buffers implementation.
const RESERVED_FIELD_NUMBERS: std::ops::RangeInclusive<u32> = 19_000..=19_999;

/// Scalar value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// 64-bit float
    Double,
    /// 32-bit float
    Float,
    /// Varint, negative values sign-extended
    Int32,
    /// Varint, negative values sign-extended
    Int64,
    /// Varint, unsigned
    Uint32,
    /// Varint, unsigned
    Uint64,
    /// Zigzag varint
    Sint32,
    /// Zigzag varint
    Sint64,
    /// Little-endian 4 bytes, unsigned
    Fixed32,
    /// Little-endian 8 bytes, unsigned
    Fixed64,
    /// Little-endian 4 bytes, signed
    Sfixed32,
    /// Little-endian 8 bytes, signed
    Sfixed64,
    /// Varint 0 or 1
    Bool,
    /// Length-delimited UTF-8
    String,
    /// Length-delimited raw bytes
    Bytes,
}

impl ScalarType {
    /// Look up a scalar type by its schema keyword.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "double" => Self::Double,
            "float" => Self::Float,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            "sint32" => Self::Sint32,
            "sint64" => Self::Sint64,
            "fixed32" => Self::Fixed32,
            "fixed64" => Self::Fixed64,
            "sfixed32" => Self::Sfixed32,
            "sfixed64" => Self::Sfixed64,
            "bool" => Self::Bool,
            "string" => Self::String,
            "bytes" => Self::Bytes,
            _ => return None,
        })
    }

    /// The schema keyword for this type.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Float => "float",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Sint32 => "sint32",
            Self::Sint64 => "sint64",
            Self::Fixed32 => "fixed32",
            Self::Fixed64 => "fixed64",
            Self::Sfixed32 => "sfixed32",
            Self::Sfixed64 => "sfixed64",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Bytes => "bytes",
        }
    }

    /// Returns true for types stored as integers.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        !matches!(
            self,
            Self::Double | Self::Float | Self::Bool | Self::String | Self::Bytes
        )
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// A scalar value
    Scalar(ScalarType),
    /// A reference to another message type, by unqualified name
    Message(String),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => write!(f, "{scalar}"),
            Self::Message(name) => f.write_str(name),
        }
    }
}

/// Field cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Label {
    /// No label (proto3 implicit presence)
    #[default]
    Singular,
    /// `optional`
    Optional,
    /// `required` (proto2)
    Required,
    /// `repeated`
    Repeated,
}

/// A field declared in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name
    pub name: String,
    /// Field number used on the wire
    pub number: u32,
    /// Cardinality
    pub label: Label,
    /// Declared type
    pub field_type: FieldType,
}

impl FieldDescriptor {
    /// The scalar type, if the field is not a message reference.
    #[must_use]
    pub const fn scalar(&self) -> Option<ScalarType> {
        match &self.field_type {
            FieldType::Scalar(scalar) => Some(*scalar),
            FieldType::Message(_) => None,
        }
    }
}

/// A message type: a named, ordered list of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageType {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl MessageType {
    /// Create a message type.
    #[must_use]
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Message name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field by wire number.
    #[must_use]
    pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }
}

/// A parsed schema: the message types of one definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    syntax: Option<String>,
    package: Option<String>,
    messages: Vec<MessageType>,
}

impl Schema {
    /// Parse schema text.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidSchema`] on syntax errors, duplicate
    /// message/field names or numbers, field numbers outside the allowed
    /// range, or references to undefined message types.
    pub fn parse(text: &str) -> Result<Self> {
        let statements = match all_consuming(terminated(many0(preceded(sp, statement)), sp))(text)
        {
            Ok((_, statements)) => statements,
            Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
                let offset = text.len() - e.input.len();
                let line = text[..offset].matches('\n').count() + 1;
                let near: String = e.input.chars().take(24).collect();
                return Err(CodecError::InvalidSchema(format!(
                    "Syntax error at line {line} near `{}`",
                    near.trim_end()
                )));
            },
            Err(nom::Err::Incomplete(_)) => {
                return Err(CodecError::InvalidSchema(
                    "Unexpected end of schema".to_string(),
                ))
            },
        };

        let mut schema = Self {
            syntax: None,
            package: None,
            messages: Vec::new(),
        };
        for statement in statements {
            match statement {
                Statement::Syntax(syntax) => schema.syntax = Some(syntax),
                Statement::Package(package) => schema.package = Some(package),
                Statement::Message(message) => schema.messages.push(message),
                Statement::Ignored => {},
            }
        }
        schema.resolve_type_names();
        schema.check()?;
        Ok(schema)
    }

    /// Read and parse a schema file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, or any error from
    /// [`parse`](Self::parse).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&text)
    }

    /// The built-in employee schema, identical to `proto/employee.proto`.
    #[must_use]
    pub fn employees() -> Self {
        let scalar = |name: &str, number, scalar| FieldDescriptor {
            name: name.to_string(),
            number,
            label: Label::Singular,
            field_type: FieldType::Scalar(scalar),
        };
        Self {
            syntax: Some("proto3".to_string()),
            package: None,
            messages: vec![
                MessageType::new(
                    RECORD_MESSAGE,
                    vec![
                        scalar("id", 1, ScalarType::Int32),
                        scalar("name", 2, ScalarType::String),
                        scalar("salary", 3, ScalarType::Int32),
                    ],
                ),
                MessageType::new(
                    ROOT_MESSAGE,
                    vec![FieldDescriptor {
                        name: BATCH_FIELD.to_string(),
                        number: 1,
                        label: Label::Repeated,
                        field_type: FieldType::Message(RECORD_MESSAGE.to_string()),
                    }],
                ),
            ],
        }
    }

    /// Declared syntax (`proto2`/`proto3`), if any.
    #[must_use]
    pub fn syntax(&self) -> Option<&str> {
        self.syntax.as_deref()
    }

    /// Declared package, if any.
    #[must_use]
    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// All message types in declaration order.
    #[must_use]
    pub fn messages(&self) -> &[MessageType] {
        &self.messages
    }

    /// Look up a message type by name.
    #[must_use]
    pub fn message(&self, name: &str) -> Option<&MessageType> {
        self.messages.iter().find(|m| m.name == name)
    }

    /// Resolve the record layout the binary codec needs.
    ///
    /// `root` must declare a `repeated` message field named `employee` whose
    /// type is a flat record declaring `id`, `name` and `salary` as
    /// non-repeated scalars.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidSchema`] describing the first missing or
    /// unsupported piece.
    pub fn batch_layout(&self, root: &str) -> Result<BatchLayout> {
        let root_type = self
            .message(root)
            .ok_or_else(|| CodecError::InvalidSchema(format!("No message type named {root}")))?;

        let container = root_type.field(BATCH_FIELD).ok_or_else(|| {
            CodecError::InvalidSchema(format!("{root} has no field named {BATCH_FIELD}"))
        })?;
        let FieldType::Message(record_name) = &container.field_type else {
            return Err(CodecError::InvalidSchema(format!(
                "{root}.{BATCH_FIELD} must be a message type, found {}",
                container.field_type
            )));
        };
        if container.label != Label::Repeated {
            return Err(CodecError::InvalidSchema(format!(
                "{root}.{BATCH_FIELD} must be repeated"
            )));
        }

        let record = self.message(record_name).ok_or_else(|| {
            CodecError::InvalidSchema(format!("No message type named {record_name}"))
        })?;
        for field in record.fields() {
            match field.field_type {
                FieldType::Scalar(ScalarType::Bytes) | FieldType::Message(_) => {
                    return Err(CodecError::InvalidSchema(format!(
                        "{record_name}.{}: type {} is not supported in records",
                        field.name, field.field_type
                    )))
                },
                FieldType::Scalar(_) if field.label == Label::Repeated => {
                    return Err(CodecError::InvalidSchema(format!(
                        "{record_name}.{}: repeated record fields are not supported",
                        field.name
                    )))
                },
                FieldType::Scalar(_) => {},
            }
        }
        for name in Employee::FIELD_NAMES {
            if record.field(name).is_none() {
                return Err(CodecError::InvalidSchema(format!(
                    "{record_name} does not declare field {name}"
                )));
            }
        }

        Ok(BatchLayout {
            root: root.to_string(),
            container: container.clone(),
            record: record.clone(),
        })
    }

    /// Strip leading dots and this schema's package from message references.
    fn resolve_type_names(&mut self) {
        let prefix = self.package.as_ref().map(|p| format!("{p}."));
        for message in &mut self.messages {
            for field in &mut message.fields {
                if let FieldType::Message(name) = &mut field.field_type {
                    let mut resolved = name.trim_start_matches('.');
                    if let Some(prefix) = &prefix {
                        resolved = resolved.strip_prefix(prefix.as_str()).unwrap_or(resolved);
                    }
                    *name = resolved.to_string();
                }
            }
        }
    }

    fn check(&self) -> Result<()> {
        let mut names = HashSet::new();
        for message in &self.messages {
            if !names.insert(message.name.as_str()) {
                return Err(CodecError::InvalidSchema(format!(
                    "Duplicate message type {}",
                    message.name
                )));
            }
        }

        for message in &self.messages {
            let mut field_names = HashSet::new();
            let mut numbers = HashSet::new();
            for field in &message.fields {
                let location = format!("{}.{}", message.name, field.name);
                if !field_names.insert(field.name.as_str()) {
                    return Err(CodecError::InvalidSchema(format!(
                        "Duplicate field name {location}"
                    )));
                }
                if !numbers.insert(field.number) {
                    return Err(CodecError::InvalidSchema(format!(
                        "Duplicate field number {} at {location}",
                        field.number
                    )));
                }
                if field.number == 0
                    || field.number > MAX_FIELD_NUMBER
                    || RESERVED_FIELD_NUMBERS.contains(&field.number)
                {
                    return Err(CodecError::InvalidSchema(format!(
                        "Field number {} at {location} is not allowed",
                        field.number
                    )));
                }
                if let FieldType::Message(target) = &field.field_type {
                    if !names.contains(target.as_str()) {
                        return Err(CodecError::InvalidSchema(format!(
                            "Unknown type {target} at {location}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// The resolved shape of a batch: root message, container field and record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLayout {
    root: String,
    container: FieldDescriptor,
    record: MessageType,
}

impl BatchLayout {
    /// Root message name.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The repeated field holding the records.
    #[must_use]
    pub const fn container(&self) -> &FieldDescriptor {
        &self.container
    }

    /// The record message type.
    #[must_use]
    pub const fn record(&self) -> &MessageType {
        &self.record
    }
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Debug, Clone)]
enum Statement {
    Syntax(String),
    Package(String),
    Message(MessageType),
    Ignored,
}

#[derive(Debug, Clone)]
enum MessageItem {
    Field(FieldDescriptor),
    Ignored,
}

type ParseResult<'a, T> = IResult<&'a str, T>;

fn comment(input: &str) -> ParseResult<'_, ()> {
    alt((
        value((), pair(tag("//"), opt(is_not("\r\n")))),
        value((), tuple((tag("/*"), take_until("*/"), tag("*/")))),
    ))(input)
}

/// Whitespace and comments.
fn sp(input: &str) -> ParseResult<'_, ()> {
    value((), many0(alt((value((), multispace1), comment))))(input)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> ParseResult<'a, &'a str> {
    terminated(
        tag(word),
        not(satisfy(|c: char| c.is_ascii_alphanumeric() || c == '_')),
    )
}

fn identifier(input: &str) -> ParseResult<'_, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn type_name(input: &str) -> ParseResult<'_, &str> {
    recognize(tuple((
        opt(char('.')),
        identifier,
        many0(pair(char('.'), identifier)),
    )))(input)
}

fn string_literal(input: &str) -> ParseResult<'_, &str> {
    alt((
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
    ))(input)
}

fn statement(input: &str) -> ParseResult<'_, Statement> {
    alt((syntax_statement, package_statement, ignored_statement, message))(input)
}

fn syntax_statement(input: &str) -> ParseResult<'_, Statement> {
    map(
        tuple((
            keyword("syntax"),
            sp,
            char('='),
            sp,
            string_literal,
            sp,
            char(';'),
        )),
        |(_, _, _, _, syntax, _, _)| Statement::Syntax(syntax.to_string()),
    )(input)
}

fn package_statement(input: &str) -> ParseResult<'_, Statement> {
    map(
        tuple((keyword("package"), sp, type_name, sp, char(';'))),
        |(_, _, package, _, _)| Statement::Package(package.to_string()),
    )(input)
}

fn ignored_statement(input: &str) -> ParseResult<'_, Statement> {
    value(
        Statement::Ignored,
        tuple((
            alt((keyword("import"), keyword("option"))),
            is_not(";"),
            char(';'),
        )),
    )(input)
}

fn label(input: &str) -> ParseResult<'_, Label> {
    alt((
        value(Label::Optional, keyword("optional")),
        value(Label::Required, keyword("required")),
        value(Label::Repeated, keyword("repeated")),
    ))(input)
}

fn field(input: &str) -> ParseResult<'_, MessageItem> {
    map(
        tuple((
            opt(terminated(label, sp)),
            type_name,
            sp,
            identifier,
            sp,
            char('='),
            sp,
            map_res(digit1, |digits: &str| digits.parse::<u32>()),
            sp,
            opt(terminated(delimited(char('['), is_not("]"), char(']')), sp)),
            char(';'),
        )),
        |(label, type_name, _, name, _, _, _, number, _, _, _)| {
            let field_type = ScalarType::from_keyword(type_name).map_or_else(
                || FieldType::Message(type_name.to_string()),
                FieldType::Scalar,
            );
            MessageItem::Field(FieldDescriptor {
                name: name.to_string(),
                number,
                label: label.unwrap_or_default(),
                field_type,
            })
        },
    )(input)
}

fn message_option(input: &str) -> ParseResult<'_, MessageItem> {
    value(
        MessageItem::Ignored,
        tuple((
            alt((keyword("option"), keyword("reserved"))),
            is_not(";"),
            char(';'),
        )),
    )(input)
}

fn message(input: &str) -> ParseResult<'_, Statement> {
    map(
        tuple((
            keyword("message"),
            sp,
            identifier,
            sp,
            char('{'),
            many0(preceded(sp, alt((message_option, field)))),
            sp,
            char('}'),
        )),
        |(_, _, name, _, _, items, _, _)| {
            let fields = items
                .into_iter()
                .filter_map(|item| match item {
                    MessageItem::Field(field) => Some(field),
                    MessageItem::Ignored => None,
                })
                .collect();
            Statement::Message(MessageType::new(name, fields))
        },
    )(input)
}
