use codespan_reporting::diagnostic::{Diagnostic, Label};
use logos::Logos;

use crate::files::FileId;
use crate::source::{BytePos, ByteRange};

#[derive(Clone, Debug, PartialEq, Eq, Logos)]
pub enum Token<'source> {
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_\-]*")]
    Name(&'source str),
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_]*", |lex| &lex.slice()[1..])]
    StringVar(&'source str),
    #[regex(r"#[a-zA-Z_][a-zA-Z0-9_]*", |lex| &lex.slice()[1..])]
    IntVar(&'source str),
    #[regex(r#""([^"\\]|\\.)*""#, |lex| &lex.slice()[1..(lex.slice().len() - 1)])]
    StringLiteral(&'source str),
    #[regex(r"-?[0-9]+")]
    NumberLiteral(&'source str),
    #[regex(r"[0-9]+(\.[0-9]+)+")]
    VersionLiteral(&'source str),

    #[token("as")]
    KeywordAs,
    #[token("close")]
    KeywordClose,
    #[token("disabled")]
    KeywordDisabled,
    #[token("execute")]
    KeywordExecute,
    #[token("rpc")]
    KeywordRpc,
    #[token("scenario")]
    KeywordScenario,
    #[token("version")]
    KeywordVersion,
    #[token("AnyOrder")]
    KeywordAnyOrder,
    #[token("AtLeastOnce")]
    KeywordAtLeastOnce,
    #[token("ZeroOrMore")]
    KeywordZeroOrMore,

    #[token(":")]
    Colon,
    #[token(":=")]
    ColonEquals,
    #[token(",")]
    Comma,
    #[token("=")]
    Equals,
    #[token("=>")]
    EqualsGreater,
    #[token(".")]
    FullStop,
    #[token("/")]
    ForwardSlash,
    #[token(">>")]
    GreaterGreater,
    #[token("<<")]
    LessLess,
    #[token("|")]
    Pipe,
    #[token("+")]
    Plus,
    #[token("?")]
    Question,
    #[token("*")]
    Star,
    #[token("_")]
    Underscore,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,

    #[error]
    #[regex(r"\p{Whitespace}", logos::skip)]
    #[regex(r"//[^\n]*", logos::skip)]
    Error,
}

pub type Spanned<Tok, Loc> = (Loc, Tok, Loc);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    UnexpectedCharacter { range: ByteRange },
}

impl Error {
    pub fn range(&self) -> ByteRange {
        match self {
            Error::UnexpectedCharacter { range } => *range,
        }
    }

    pub fn to_diagnostic(&self, file_id: FileId) -> Diagnostic<FileId> {
        match self {
            Error::UnexpectedCharacter { range } => Diagnostic::error()
                .with_message("unexpected character")
                .with_labels(vec![Label::primary(file_id, *range)]),
        }
    }
}

pub fn tokens(
    source: &str,
) -> impl Iterator<Item = Result<Spanned<Token<'_>, BytePos>, Error>> {
    assert!(
        source.len() <= u32::MAX as usize,
        "`source` must be less than 4GiB in length"
    );

    Token::lexer(source).spanned().map(|(token, range)| {
        let start = range.start as BytePos;
        let end = range.end as BytePos;
        match token {
            Token::Error => Err(Error::UnexpectedCharacter {
                range: ByteRange::new(start, end),
            }),
            token => Ok((start, token, end)),
        }
    })
}

impl<'source> Token<'source> {
    pub fn description(&self) -> &'static str {
        match self {
            Token::Name(_) => "name",
            Token::StringVar(_) => "string variable",
            Token::IntVar(_) => "int variable",
            Token::StringLiteral(_) => "string literal",
            Token::NumberLiteral(_) => "number literal",
            Token::VersionLiteral(_) => "version literal",
            Token::KeywordAs => "as",
            Token::KeywordClose => "close",
            Token::KeywordDisabled => "disabled",
            Token::KeywordExecute => "execute",
            Token::KeywordRpc => "rpc",
            Token::KeywordScenario => "scenario",
            Token::KeywordVersion => "version",
            Token::KeywordAnyOrder => "AnyOrder",
            Token::KeywordAtLeastOnce => "AtLeastOnce",
            Token::KeywordZeroOrMore => "ZeroOrMore",
            Token::Colon => ":",
            Token::ColonEquals => ":=",
            Token::Comma => ",",
            Token::Equals => "=",
            Token::EqualsGreater => "=>",
            Token::FullStop => ".",
            Token::ForwardSlash => "/",
            Token::GreaterGreater => ">>",
            Token::LessLess => "<<",
            Token::Pipe => "|",
            Token::Plus => "+",
            Token::Question => "?",
            Token::Star => "*",
            Token::Underscore => "_",
            Token::OpenBrace => "{",
            Token::CloseBrace => "}",
            Token::OpenBracket => "[",
            Token::CloseBracket => "]",
            Token::OpenParen => "(",
            Token::CloseParen => ")",
            Token::Error => "error",
        }
    }
}
