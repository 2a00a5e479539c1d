//! Protocol buffer message payloads.

use itertools::Itertools;
use serde::Serialize;

use crate::dom::param::{quote, Param};
use crate::dom::path::GnmiPath;

/// A message payload: the message type plus its field tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Protobuf {
    pub type_name: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(flatten)]
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum FieldValue {
    String(String),
    Number(i64),
    /// Bare symbolic text, such as `ON_CHANGE`.
    Enum(String),
    GnmiPath(GnmiPath),
    /// A run-time value: one or more variables or wildcards.
    Variable(Vec<Param>),
    Sequence(Sequence),
    Repeated(Vec<Row>),
}

/// A nested message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Sequence {
    pub fields: Vec<Field>,
    /// Message type of a sub-message that travels as opaque serialized bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialized: Option<String>,
}

/// One row of a repeated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub size: SequenceSize,
    pub fields: Vec<Field>,
}

/// How many times a repeated-field row may occur.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum SequenceSize {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "?")]
    ZeroOrOne,
    #[serde(rename = "*")]
    ZeroOrMore,
    #[serde(rename = "+")]
    OneOrMore,
}

impl SequenceSize {
    pub fn as_str(self) -> &'static str {
        match self {
            SequenceSize::One => "1",
            SequenceSize::ZeroOrOne => "?",
            SequenceSize::ZeroOrMore => "*",
            SequenceSize::OneOrMore => "+",
        }
    }
}

impl Field {
    pub fn new(name: impl Into<String>, value: FieldValue) -> Field {
        Field {
            name: name.into(),
            value,
        }
    }

    /// Leaf fields are simple; nested and repeated messages are not.
    pub fn is_simple(&self) -> bool {
        !matches!(self.value, FieldValue::Sequence(_) | FieldValue::Repeated(_))
    }

    /// The fields nested directly under this one. Rows of a repeated field
    /// are flattened in order.
    pub fn children(&self) -> Box<dyn Iterator<Item = &Field> + '_> {
        match &self.value {
            FieldValue::Sequence(sequence) => Box::new(sequence.fields.iter()),
            FieldValue::Repeated(rows) => Box::new(rows.iter().flat_map(|row| row.fields.iter())),
            _ => Box::new(std::iter::empty()),
        }
    }

    /// Visit this field and every field below it, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Field)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    pub fn as_enum(&self) -> Option<&str> {
        match &self.value {
            FieldValue::Enum(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&GnmiPath> {
        match &self.value {
            FieldValue::GnmiPath(path) => Some(path),
            _ => None,
        }
    }

    /// Direct child called `name`.
    pub fn child(&self, name: &str) -> Option<&Field> {
        self.children().find(|field| field.name == name)
    }

    /// Every param mentioned by this field or the fields below it.
    pub fn params(&self) -> Vec<&Param> {
        let mut params = Vec::new();
        self.walk(&mut |field| match &field.value {
            FieldValue::Variable(vars) => params.extend(vars),
            FieldValue::GnmiPath(path) => params.extend(path.params()),
            _ => {}
        });
        params
    }
}

impl Protobuf {
    pub fn new(type_name: impl Into<String>, fields: Vec<Field>) -> Protobuf {
        Protobuf {
            type_name: type_name.into(),
            fields,
        }
    }

    /// The package prefix of the message type, `gnmi` in `gnmi.GetRequest`.
    pub fn namespace(&self) -> &str {
        match self.type_name.split_once('.') {
            Some((namespace, _)) => namespace,
            None => "",
        }
    }

    /// The message type without its package prefix.
    pub fn short_type_name(&self) -> &str {
        match self.type_name.rsplit_once('.') {
            Some((_, name)) => name,
            None => &self.type_name,
        }
    }

    /// Top-level field called `name`.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Visit every field in the message, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Field)) {
        for field in &self.fields {
            field.walk(visit);
        }
    }

    /// Find the first field called `name` anywhere in the message.
    pub fn find(&self, name: &str) -> Option<&Field> {
        let mut found = None;
        self.walk(&mut |field| {
            if found.is_none() && field.name == name {
                found = Some(field);
            }
        });
        found
    }

    /// Every param mentioned anywhere in the message.
    pub fn params(&self) -> Vec<&Param> {
        self.fields.iter().flat_map(Field::params).collect()
    }

    /// Render the message in protocol-buffer text format.
    pub fn to_textproto(&self) -> Textproto {
        let mut renderer = TextprotoRenderer::default();
        let text = renderer.fields(&self.fields);
        Textproto {
            text,
            serialized: renderer.serialized,
        }
    }
}

/// A rendered message. Serialized sub-messages appear in `text` as quoted
/// placeholders and are listed in `serialized` for the generator to fill in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Textproto {
    pub text: String,
    pub serialized: Vec<SerializedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerializedField {
    pub placeholder: String,
    pub field_name: String,
    pub protobuf: Protobuf,
}

#[derive(Default)]
struct TextprotoRenderer {
    serialized: Vec<SerializedField>,
}

impl TextprotoRenderer {
    fn fields(&mut self, fields: &[Field]) -> String {
        fields.iter().map(|field| self.field(field)).join(" ")
    }

    fn field(&mut self, field: &Field) -> String {
        let name = &field.name;
        match &field.value {
            FieldValue::String(value) => format!("{name}: {}", quote(value)),
            FieldValue::Number(value) => format!("{name}: {value}"),
            FieldValue::Enum(value) => format!("{name}: {value}"),
            FieldValue::GnmiPath(path) => format!("{name} {{ {} }}", path.to_textproto()),
            FieldValue::Variable(params) => match params.first() {
                Some(param) => format!("{name}: {}", param.render()),
                None => format!("{name}: \"\""),
            },
            FieldValue::Sequence(Sequence {
                fields,
                serialized: Some(type_name),
            }) => {
                let placeholder = format!("$$SERIALIZED_{}", self.serialized.len());
                let text = format!("{name}: {}", quote(&placeholder));
                self.serialized.push(SerializedField {
                    placeholder,
                    field_name: name.clone(),
                    protobuf: Protobuf::new(type_name.clone(), fields.clone()),
                });
                text
            }
            FieldValue::Sequence(Sequence {
                fields,
                serialized: None,
            }) => self.block(name, fields),
            FieldValue::Repeated(rows) => {
                rows.iter().map(|row| self.block(name, &row.fields)).join(" ")
            }
        }
    }

    fn block(&mut self, name: &str, fields: &[Field]) -> String {
        match fields {
            [] => format!("{name} {{ }}"),
            fields => format!("{name} {{ {} }}", self.fields(fields)),
        }
    }
}
