//! Parameters: the places where scenarios mention literals, variables and
//! wildcards.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::source::ByteRange;

/// Type of `$name` variables.
pub const STRING_TYPE: &str = "string";
/// Type of `#name` variables.
pub const INT64_TYPE: &str = "int64";
/// Name and type of the `_` wildcard.
pub const IGNORED: &str = "<ignored>";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamKind {
    /// Reads a bound variable.
    Variable,
    /// Binds a variable at this point, as in `[$name:=key]`.
    VariableDecl,
    StringConstant,
    /// A literal that is not quoted, such as a number or an enum value.
    OtherConstant,
    /// A formal parameter of a sub-scenario.
    Declaration,
    /// The `_` wildcard.
    Ignored,
}

#[derive(Debug, Clone, Serialize)]
pub struct Param {
    pub kind: ParamKind,
    pub name: String,
    pub r#type: String,
    /// Where the param was written. Not part of its identity.
    #[serde(skip)]
    pub range: ByteRange,
}

impl PartialEq for Param {
    fn eq(&self, other: &Param) -> bool {
        (self.kind, &self.name, &self.r#type) == (other.kind, &other.name, &other.r#type)
    }
}

impl Eq for Param {}

impl Hash for Param {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.kind, &self.name, &self.r#type).hash(state);
    }
}

impl Param {
    pub fn variable(name: impl Into<String>, r#type: impl Into<String>) -> Param {
        Param {
            kind: ParamKind::Variable,
            name: name.into(),
            r#type: r#type.into(),
            range: ByteRange::default(),
        }
    }

    pub fn variable_decl(name: impl Into<String>, r#type: impl Into<String>) -> Param {
        Param {
            kind: ParamKind::VariableDecl,
            name: name.into(),
            r#type: r#type.into(),
            range: ByteRange::default(),
        }
    }

    pub fn string_constant(value: impl Into<String>) -> Param {
        Param {
            kind: ParamKind::StringConstant,
            name: value.into(),
            r#type: STRING_TYPE.to_owned(),
            range: ByteRange::default(),
        }
    }

    pub fn other_constant(value: impl Into<String>) -> Param {
        Param {
            kind: ParamKind::OtherConstant,
            name: value.into(),
            r#type: String::new(),
            range: ByteRange::default(),
        }
    }

    pub fn declaration(name: impl Into<String>, r#type: impl Into<String>) -> Param {
        Param {
            kind: ParamKind::Declaration,
            name: name.into(),
            r#type: r#type.into(),
            range: ByteRange::default(),
        }
    }

    pub fn ignored() -> Param {
        Param {
            kind: ParamKind::Ignored,
            name: IGNORED.to_owned(),
            r#type: IGNORED.to_owned(),
            range: ByteRange::default(),
        }
    }

    pub fn with_range(mut self, range: ByteRange) -> Param {
        self.range = range;
        self
    }

    /// Variables and variable bindings, the params that need storage at run time.
    pub fn is_variable(&self) -> bool {
        matches!(self.kind, ParamKind::Variable | ParamKind::VariableDecl)
    }

    /// Render the param the way it appears in generated protocol text.
    pub fn render(&self) -> String {
        match self.kind {
            ParamKind::Variable | ParamKind::VariableDecl => quote(&format!("${}", self.name)),
            ParamKind::StringConstant => quote(&self.name),
            ParamKind::OtherConstant | ParamKind::Declaration => self.name.clone(),
            ParamKind::Ignored => String::new(),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Quote a string as a double-quoted literal, escaping quotes, backslashes
/// and control characters.
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => quoted.push_str(&format!("\\x{:02x}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
