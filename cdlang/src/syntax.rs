//! Concrete syntax of scenario files.
//!
//! The tree mirrors the source closely: it is produced by [`parser`] and
//! consumed once by [`crate::build`], which does all of the checking.

use crate::source::ByteRange;

pub mod lexer;
pub mod parser;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub range: ByteRange,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Module {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// `rpc ns.Func(Request) => Response`
    Rpc(RpcDecl),
    /// `name := Type { ... }`
    ConstProto(ConstProtoDecl),
    Scenario(ScenarioDecl),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcDecl {
    pub range: ByteRange,
    pub namespace: Name,
    pub func: Name,
    pub request: Name,
    pub response: Name,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstProtoDecl {
    pub range: ByteRange,
    pub name: Name,
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioDecl {
    /// From `disabled` (or `scenario`) to the closing brace.
    pub range: ByteRange,
    pub disabled: bool,
    pub name: Name,
    pub params: Vec<ParamDecl>,
    pub version: Name,
    pub body: Vec<Statement>,
}

/// `name: type` in a scenario header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    pub name: Name,
    pub r#type: Name,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `channel := domain.Method`
    Open {
        range: ByteRange,
        channel: Name,
        domain: Name,
        method: Name,
    },
    /// `close channel`
    Close { range: ByteRange, channel: Name },
    /// `channel << Message { ... }`
    Send {
        range: ByteRange,
        channel: Name,
        message: Message,
    },
    /// `channel >> Message { ... }`
    Receive {
        range: ByteRange,
        channel: Name,
        message: Message,
    },
    /// `Request { ... } >> { OUTCOME [, Response { ... }] }`
    Call {
        range: ByteRange,
        request: Message,
        outcome: Name,
        response: Option<Message>,
    },
    /// `execute Name(args)`
    Execute {
        range: ByteRange,
        name: Name,
        args: Vec<Atom>,
    },
    Group {
        range: ByteRange,
        kind: GroupKind,
        body: Vec<Statement>,
    },
}

impl Statement {
    pub fn range(&self) -> ByteRange {
        match self {
            Statement::Open { range, .. }
            | Statement::Close { range, .. }
            | Statement::Send { range, .. }
            | Statement::Receive { range, .. }
            | Statement::Call { range, .. }
            | Statement::Execute { range, .. }
            | Statement::Group { range, .. } => *range,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GroupKind {
    AnyOrder,
    AtLeastOnce,
    ZeroOrMore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub range: ByteRange,
    pub type_name: Name,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub range: ByteRange,
    pub name: Name,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// `name: "text"`
    String(String),
    /// `name: 42`, kept as written until the builder checks it
    Number(String),
    /// `name: ENUM_VALUE`
    Enum(String),
    /// `name: /a/b[k=v]`
    Path(Vec<PathElem>),
    /// `name: $a` or `name: $a | _`
    Variables(Vec<Atom>),
    /// `name { ... }` or `name as Type { ... }`
    Nested {
        cast: Option<Name>,
        fields: Vec<FieldDecl>,
    },
    /// `name [ { ... } { ... }+ ]`
    Repeated(Vec<RowDecl>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDecl {
    pub range: ByteRange,
    /// `?`, `*` or `+` written after the row.
    pub marker: Option<Multiplicity>,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Multiplicity {
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElem {
    /// `/name` followed by any number of `[...]` keys.
    Named { name: Name, keys: Vec<PathKey> },
    /// `/$var`, `/#var` or `/_`
    Atom(Atom),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKey {
    /// `[key=value]`
    Assign { key: Name, value: Atom },
    /// `[$var:=key]`
    Bind { variable: Atom, key: Name },
}

/// Literal, variable or wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    /// `$name`
    StringVar(Name),
    /// `#name`
    IntVar(Name),
    /// `_`
    Wildcard(ByteRange),
    /// `*` in a path key
    Star(ByteRange),
    String(ByteRange, String),
    /// A bare name or a number.
    Other(Name),
}

impl Atom {
    pub fn range(&self) -> ByteRange {
        match self {
            Atom::StringVar(name) | Atom::IntVar(name) | Atom::Other(name) => name.range,
            Atom::Wildcard(range) | Atom::Star(range) | Atom::String(range, _) => *range,
        }
    }
}
