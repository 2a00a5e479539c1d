//! Recursive descent parser for scenario files.

use codespan_reporting::diagnostic::{Diagnostic, Label};

use crate::files::FileId;
use crate::source::{BytePos, ByteRange};
use crate::syntax::lexer::{self, Spanned, Token};
use crate::syntax::{
    Atom, ConstProtoDecl, FieldDecl, FieldValue, GroupKind, Item, Message, Module, Multiplicity,
    Name, ParamDecl, PathElem, PathKey, RowDecl, RpcDecl, ScenarioDecl, Statement,
};

/// Messages produced during parsing
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseMessage {
    Lexer(lexer::Error),
    UnexpectedToken {
        range: ByteRange,
        found: &'static str,
        expected: Vec<&'static str>,
    },
    UnexpectedEof {
        range: ByteRange,
        expected: Vec<&'static str>,
    },
}

impl ParseMessage {
    pub fn range(&self) -> ByteRange {
        match self {
            ParseMessage::Lexer(error) => error.range(),
            ParseMessage::UnexpectedToken { range, .. } | ParseMessage::UnexpectedEof { range, .. } => {
                *range
            }
        }
    }

    pub fn to_diagnostic(&self, file_id: FileId) -> Diagnostic<FileId> {
        match self {
            ParseMessage::Lexer(error) => error.to_diagnostic(file_id),
            ParseMessage::UnexpectedToken {
                range,
                found,
                expected,
            } => Diagnostic::error()
                .with_message(format!("unexpected token {found}"))
                .with_labels(vec![
                    Label::primary(file_id, *range).with_message("unexpected token")
                ])
                .with_notes(format_expected(expected).map_or(Vec::new(), |message| vec![message])),
            ParseMessage::UnexpectedEof { range, expected } => Diagnostic::error()
                .with_message("unexpected end of file")
                .with_labels(vec![
                    Label::primary(file_id, *range).with_message("unexpected end of file")
                ])
                .with_notes(format_expected(expected).map_or(Vec::new(), |message| vec![message])),
        }
    }
}

fn format_expected(expected: &[impl std::fmt::Display]) -> Option<String> {
    use itertools::Itertools;

    expected.split_last().map(|items| match items {
        (last, []) => format!("expected {last}"),
        (last, expected) => format!("expected {} or {last}", expected.iter().format(", ")),
    })
}

/// Parse a scenario file. Items that fail to parse are reported and skipped,
/// so the returned module holds every item that parsed.
pub fn parse_module(source: &str) -> (Module, Vec<ParseMessage>) {
    let mut messages = Vec::new();
    let tokens = lexer::tokens(source)
        .filter_map(|token| match token {
            Ok(token) => Some(token),
            Err(error) => {
                messages.push(ParseMessage::Lexer(error));
                None
            }
        })
        .collect();

    let mut parser = Parser::new(tokens, source.len() as BytePos);
    let mut module = Module::default();

    while !parser.at_eof() {
        match parser.item() {
            Ok(item) => module.items.push(item),
            Err(message) => {
                messages.push(message);
                parser.recover();
            }
        }
    }

    (module, messages)
}

struct Parser<'source> {
    tokens: Vec<Spanned<Token<'source>, BytePos>>,
    position: usize,
    eof: BytePos,
}

type ParseResult<T> = Result<T, ParseMessage>;

impl<'source> Parser<'source> {
    fn new(tokens: Vec<Spanned<Token<'source>, BytePos>>, eof: BytePos) -> Parser<'source> {
        Parser {
            tokens,
            position: 0,
            eof,
        }
    }

    fn at_eof(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token<'source>> {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token<'source>> {
        self.tokens.get(self.position + n).map(|(_, token, _)| token)
    }

    fn start(&self) -> BytePos {
        match self.tokens.get(self.position) {
            Some((start, _, _)) => *start,
            None => self.eof,
        }
    }

    /// End of the most recently consumed token.
    fn prev_end(&self) -> BytePos {
        match self.position.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some((_, _, end)) => *end,
            None => 0,
        }
    }

    fn range_from(&self, start: BytePos) -> ByteRange {
        ByteRange::new(start, self.prev_end())
    }

    fn check(&self, token: &Token<'_>) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token<'_>) -> bool {
        match self.check(token) {
            true => {
                self.position += 1;
                true
            }
            false => false,
        }
    }

    fn unexpected(&self, expected: &[&'static str]) -> ParseMessage {
        match self.tokens.get(self.position) {
            Some((start, token, end)) => ParseMessage::UnexpectedToken {
                range: ByteRange::new(*start, *end),
                found: token.description(),
                expected: expected.to_vec(),
            },
            None => ParseMessage::UnexpectedEof {
                range: ByteRange::new(self.eof, self.eof),
                expected: expected.to_vec(),
            },
        }
    }

    fn expect(&mut self, token: Token<'static>) -> ParseResult<()> {
        match self.eat(&token) {
            true => Ok(()),
            false => Err(self.unexpected(&[token.description()])),
        }
    }

    fn name(&mut self) -> ParseResult<Name> {
        match self.tokens.get(self.position) {
            Some((start, Token::Name(text), end)) => {
                let name = Name {
                    range: ByteRange::new(*start, *end),
                    text: text.to_string(),
                };
                self.position += 1;
                Ok(name)
            }
            _ => Err(self.unexpected(&["name"])),
        }
    }

    /// A possibly dotted message type name, such as `gnmi.GetRequest`.
    fn type_name(&mut self) -> ParseResult<Name> {
        let mut name = self.name()?;
        while self.check(&Token::FullStop) && matches!(self.peek_nth(1), Some(Token::Name(_))) {
            self.position += 1;
            let part = self.name()?;
            name.text.push('.');
            name.text.push_str(&part.text);
            name.range = name.range.merge(part.range);
        }
        Ok(name)
    }

    /// Skip to the start of the next top-level item.
    fn recover(&mut self) {
        // always make progress, even when the error was on an item keyword
        self.position += 1;
        while let Some(token) = self.peek() {
            match token {
                Token::KeywordRpc | Token::KeywordScenario | Token::KeywordDisabled => return,
                _ => self.position += 1,
            }
        }
    }

    fn item(&mut self) -> ParseResult<Item> {
        match self.peek() {
            Some(Token::KeywordRpc) => self.rpc_decl().map(Item::Rpc),
            Some(Token::KeywordScenario | Token::KeywordDisabled) => {
                self.scenario_decl().map(Item::Scenario)
            }
            Some(Token::Name(_)) => self.const_proto_decl().map(Item::ConstProto),
            _ => Err(self.unexpected(&["rpc", "scenario", "disabled", "name"])),
        }
    }

    fn rpc_decl(&mut self) -> ParseResult<RpcDecl> {
        let start = self.start();
        self.expect(Token::KeywordRpc)?;
        let namespace = self.name()?;
        self.expect(Token::FullStop)?;
        let func = self.name()?;
        self.expect(Token::OpenParen)?;
        let request = self.type_name()?;
        self.expect(Token::CloseParen)?;
        self.expect(Token::EqualsGreater)?;
        let response = self.type_name()?;

        Ok(RpcDecl {
            range: self.range_from(start),
            namespace,
            func,
            request,
            response,
        })
    }

    fn const_proto_decl(&mut self) -> ParseResult<ConstProtoDecl> {
        let start = self.start();
        let name = self.name()?;
        self.expect(Token::ColonEquals)?;
        let message = self.message()?;

        Ok(ConstProtoDecl {
            range: self.range_from(start),
            name,
            message,
        })
    }

    fn scenario_decl(&mut self) -> ParseResult<ScenarioDecl> {
        let start = self.start();
        let disabled = self.eat(&Token::KeywordDisabled);
        self.expect(Token::KeywordScenario)?;
        let name = self.name()?;

        self.expect(Token::OpenParen)?;
        let mut params = Vec::new();
        while !self.eat(&Token::CloseParen) {
            if !params.is_empty() {
                self.expect(Token::Comma)?;
            }
            let name = self.name()?;
            self.expect(Token::Colon)?;
            let r#type = self.name()?;
            params.push(ParamDecl { name, r#type });
        }

        self.expect(Token::KeywordVersion)?;
        let version = match self.tokens.get(self.position) {
            Some((start, Token::VersionLiteral(text) | Token::NumberLiteral(text) | Token::Name(text), end)) => {
                let version = Name {
                    range: ByteRange::new(*start, *end),
                    text: text.to_string(),
                };
                self.position += 1;
                version
            }
            _ => return Err(self.unexpected(&["version literal", "latest"])),
        };

        let body = self.block()?;

        Ok(ScenarioDecl {
            range: self.range_from(start),
            disabled,
            name,
            params,
            version,
            body,
        })
    }

    fn block(&mut self) -> ParseResult<Vec<Statement>> {
        self.expect(Token::OpenBrace)?;
        let mut statements = Vec::new();
        while !self.eat(&Token::CloseBrace) {
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    fn statement(&mut self) -> ParseResult<Statement> {
        let start = self.start();
        match self.peek() {
            Some(Token::KeywordClose) => {
                self.position += 1;
                let channel = self.name()?;
                Ok(Statement::Close {
                    range: self.range_from(start),
                    channel,
                })
            }
            Some(Token::KeywordExecute) => {
                self.position += 1;
                let name = self.name()?;
                self.expect(Token::OpenParen)?;
                let mut args = Vec::new();
                while !self.eat(&Token::CloseParen) {
                    if !args.is_empty() {
                        self.expect(Token::Comma)?;
                    }
                    args.push(self.atom()?);
                }
                Ok(Statement::Execute {
                    range: self.range_from(start),
                    name,
                    args,
                })
            }
            Some(Token::KeywordAnyOrder) => self.group(GroupKind::AnyOrder),
            Some(Token::KeywordAtLeastOnce) => self.group(GroupKind::AtLeastOnce),
            Some(Token::KeywordZeroOrMore) => self.group(GroupKind::ZeroOrMore),
            Some(Token::Name(_)) => match self.peek_nth(1) {
                Some(Token::ColonEquals) => {
                    let channel = self.name()?;
                    self.position += 1;
                    let domain = self.name()?;
                    self.expect(Token::FullStop)?;
                    let method = self.name()?;
                    Ok(Statement::Open {
                        range: self.range_from(start),
                        channel,
                        domain,
                        method,
                    })
                }
                Some(Token::LessLess) => {
                    let channel = self.name()?;
                    self.position += 1;
                    let message = self.message()?;
                    Ok(Statement::Send {
                        range: self.range_from(start),
                        channel,
                        message,
                    })
                }
                Some(Token::GreaterGreater) => {
                    let channel = self.name()?;
                    self.position += 1;
                    let message = self.message()?;
                    Ok(Statement::Receive {
                        range: self.range_from(start),
                        channel,
                        message,
                    })
                }
                Some(Token::OpenBrace | Token::FullStop) => self.call(),
                _ => {
                    self.position += 1;
                    Err(self.unexpected(&[":=", "<<", ">>", "{"]))
                }
            },
            _ => Err(self.unexpected(&[
                "name",
                "close",
                "execute",
                "AnyOrder",
                "AtLeastOnce",
                "ZeroOrMore",
                "}",
            ])),
        }
    }

    fn group(&mut self, kind: GroupKind) -> ParseResult<Statement> {
        let start = self.start();
        self.position += 1;
        let body = self.block()?;
        Ok(Statement::Group {
            range: self.range_from(start),
            kind,
            body,
        })
    }

    fn call(&mut self) -> ParseResult<Statement> {
        let start = self.start();
        let request = self.message()?;
        self.expect(Token::GreaterGreater)?;
        self.expect(Token::OpenBrace)?;
        let outcome = self.name()?;
        let response = match self.eat(&Token::Comma) {
            true => Some(self.message()?),
            false => None,
        };
        self.expect(Token::CloseBrace)?;

        Ok(Statement::Call {
            range: self.range_from(start),
            request,
            outcome,
            response,
        })
    }

    fn message(&mut self) -> ParseResult<Message> {
        let start = self.start();
        let type_name = self.type_name()?;
        let fields = self.fields()?;
        Ok(Message {
            range: self.range_from(start),
            type_name,
            fields,
        })
    }

    /// `{ field* }`, fields optionally separated by commas.
    fn fields(&mut self) -> ParseResult<Vec<FieldDecl>> {
        self.expect(Token::OpenBrace)?;
        let mut fields = Vec::new();
        while !self.eat(&Token::CloseBrace) {
            fields.push(self.field()?);
            self.eat(&Token::Comma);
        }
        Ok(fields)
    }

    fn field(&mut self) -> ParseResult<FieldDecl> {
        let start = self.start();
        let name = self.name()?;
        let value = match self.peek() {
            Some(Token::Colon) => {
                self.position += 1;
                self.field_value()?
            }
            Some(Token::OpenBrace) => FieldValue::Nested {
                cast: None,
                fields: self.fields()?,
            },
            Some(Token::KeywordAs) => {
                self.position += 1;
                let cast = self.type_name()?;
                FieldValue::Nested {
                    cast: Some(cast),
                    fields: self.fields()?,
                }
            }
            Some(Token::OpenBracket) => {
                self.position += 1;
                let mut rows = Vec::new();
                while !self.eat(&Token::CloseBracket) {
                    rows.push(self.row()?);
                    self.eat(&Token::Comma);
                }
                FieldValue::Repeated(rows)
            }
            _ => return Err(self.unexpected(&[":", "{", "[", "as"])),
        };

        Ok(FieldDecl {
            range: self.range_from(start),
            name,
            value,
        })
    }

    fn row(&mut self) -> ParseResult<RowDecl> {
        let start = self.start();
        let fields = self.fields()?;
        let marker = match self.peek() {
            Some(Token::Question) => Some(Multiplicity::ZeroOrOne),
            Some(Token::Star) => Some(Multiplicity::ZeroOrMore),
            Some(Token::Plus) => Some(Multiplicity::OneOrMore),
            _ => None,
        };
        if marker.is_some() {
            self.position += 1;
        }
        Ok(RowDecl {
            range: self.range_from(start),
            marker,
            fields,
        })
    }

    fn field_value(&mut self) -> ParseResult<FieldValue> {
        match self.peek() {
            Some(Token::StringLiteral(text)) => {
                let text = unescape(text);
                self.position += 1;
                Ok(FieldValue::String(text))
            }
            Some(Token::NumberLiteral(text)) => {
                let text = text.to_string();
                self.position += 1;
                Ok(FieldValue::Number(text))
            }
            Some(Token::Name(text)) => {
                let text = text.to_string();
                self.position += 1;
                Ok(FieldValue::Enum(text))
            }
            Some(Token::ForwardSlash) => self.path().map(FieldValue::Path),
            Some(Token::StringVar(_) | Token::IntVar(_) | Token::Underscore) => {
                let mut atoms = vec![self.atom()?];
                while self.eat(&Token::Pipe) {
                    atoms.push(self.atom()?);
                }
                Ok(FieldValue::Variables(atoms))
            }
            _ => Err(self.unexpected(&[
                "string literal",
                "number literal",
                "name",
                "/",
                "string variable",
                "int variable",
                "_",
            ])),
        }
    }

    fn path(&mut self) -> ParseResult<Vec<PathElem>> {
        let mut elems = Vec::new();
        while self.eat(&Token::ForwardSlash) {
            match self.peek() {
                Some(Token::Name(_)) => {
                    let name = self.name()?;
                    let mut keys = Vec::new();
                    while self.eat(&Token::OpenBracket) {
                        keys.push(self.path_key()?);
                        self.expect(Token::CloseBracket)?;
                    }
                    elems.push(PathElem::Named { name, keys });
                }
                Some(Token::StringVar(_) | Token::IntVar(_) | Token::Underscore) => {
                    elems.push(PathElem::Atom(self.atom()?));
                }
                // a lone `/` is the root path
                _ if elems.is_empty() => break,
                _ => return Err(self.unexpected(&["name", "string variable", "int variable", "_"])),
            }
        }
        Ok(elems)
    }

    fn path_key(&mut self) -> ParseResult<PathKey> {
        match self.peek() {
            Some(Token::StringVar(_) | Token::IntVar(_)) => {
                let variable = self.atom()?;
                self.expect(Token::ColonEquals)?;
                let key = self.name()?;
                Ok(PathKey::Bind { variable, key })
            }
            Some(Token::Name(_)) => {
                let key = self.name()?;
                self.expect(Token::Equals)?;
                let value = self.atom()?;
                Ok(PathKey::Assign { key, value })
            }
            _ => Err(self.unexpected(&["name", "string variable", "int variable"])),
        }
    }

    fn atom(&mut self) -> ParseResult<Atom> {
        let (start, token, end) = match self.tokens.get(self.position) {
            Some(token) => token.clone(),
            None => return Err(self.unexpected(&["variable", "literal", "_"])),
        };
        let range = ByteRange::new(start, end);
        let name = |text: &str| Name {
            range,
            text: text.to_owned(),
        };

        let atom = match token {
            Token::StringVar(text) => Atom::StringVar(name(text)),
            Token::IntVar(text) => Atom::IntVar(name(text)),
            Token::Underscore => Atom::Wildcard(range),
            Token::Star => Atom::Star(range),
            Token::StringLiteral(text) => Atom::String(range, unescape(text)),
            Token::Name(text) | Token::NumberLiteral(text) => Atom::Other(name(text)),
            _ => return Err(self.unexpected(&["variable", "literal", "_"])),
        };
        self.position += 1;
        Ok(atom)
    }
}

/// Resolve the escapes in the body of a string literal. Unknown escapes are
/// kept as written.
fn unescape(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            output.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => output.push('\n'),
            Some('t') => output.push('\t'),
            Some('r') => output.push('\r'),
            Some(c @ ('"' | '\\')) => output.push(c),
            Some(c) => {
                output.push('\\');
                output.push(c);
            }
            None => output.push('\\'),
        }
    }
    output
}
