use codespan_reporting::diagnostic::{Diagnostic, Severity};
use codespan_reporting::term::termcolor::{BufferedStandardStream, ColorChoice, WriteColor};
use serde::Serialize;
use std::cell::RefCell;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::build::build_module;
use crate::dom::{self, Dom};
use crate::files::{FileId, Files};
use crate::pass::{self, Options};
use crate::reporting::Message;
use crate::syntax::parser::parse_module;

#[derive(Debug, Copy, Clone)]
pub enum Status {
    Ok,
    Error,
}

impl Status {
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Error => 1,
        }
    }
}

/// How documents are written to the emit writer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Format {
    Pretty,
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(src: &str) -> Result<Format, String> {
        match src {
            "pretty" => Ok(Format::Pretty),
            "json" => Ok(Format::Json),
            _ => Err(format!("unknown format `{src}`, expected `pretty` or `json`")),
        }
    }
}

pub struct Driver {
    files: Files,

    allow_errors: bool,
    seen_errors: RefCell<bool>,
    codespan_config: codespan_reporting::term::Config,
    diagnostic_writer: RefCell<Box<dyn WriteColor>>,

    emit_width: usize,
    emit_writer: RefCell<Box<dyn WriteColor>>,
}

impl Default for Driver {
    fn default() -> Driver {
        Driver::new()
    }
}

impl Driver {
    pub fn new() -> Driver {
        Driver {
            files: Files::new(),

            allow_errors: false,
            seen_errors: RefCell::new(false),
            codespan_config: codespan_reporting::term::Config::default(),
            diagnostic_writer: RefCell::new(Box::new(BufferedStandardStream::stderr(
                if atty::is(atty::Stream::Stderr) {
                    ColorChoice::Auto
                } else {
                    ColorChoice::Never
                },
            ))),

            emit_width: usize::MAX,
            emit_writer: RefCell::new(Box::new(BufferedStandardStream::stdout(
                if atty::is(atty::Stream::Stdout) {
                    ColorChoice::Auto
                } else {
                    ColorChoice::Never
                },
            ))),
        }
    }

    /// Setup a global panic hook
    pub fn install_panic_hook(&self) {
        // Use the currently set codespan configuration
        let term_config = self.codespan_config.clone();
        // Fetch the default hook (which prints the panic message and an optional backtrace)
        let default_hook = std::panic::take_hook();

        std::panic::set_hook(Box::new(move |info| {
            let location = info.location();
            let message = if let Some(message) = info.payload().downcast_ref::<String>() {
                message.as_str()
            } else if let Some(message) = info.payload().downcast_ref::<&str>() {
                message
            } else {
                "unknown panic type"
            };

            let diagnostic = Diagnostic::bug()
                .with_message(format!("compiler panicked at '{message}'"))
                .with_notes(vec![match location {
                    Some(location) => format!("panicked at: {location}"),
                    None => "panicked at: unknown location".to_owned(),
                }]);

            let mut writer = BufferedStandardStream::stderr(if atty::is(atty::Stream::Stderr) {
                ColorChoice::Auto
            } else {
                ColorChoice::Never
            });
            let dummy_files = Files::new();

            default_hook(info);
            eprintln!();
            codespan_reporting::term::emit(&mut writer, &term_config, &dummy_files, &diagnostic)
                .unwrap();
        }));
    }

    /// Set to true if we should attempt to continue after encountering errors
    pub fn set_allow_errors(&mut self, allow_errors: bool) {
        self.allow_errors = allow_errors;
    }

    /// Set the writer to use when rendering diagnostics
    pub fn set_diagnostic_writer(&mut self, stream: impl 'static + WriteColor) {
        self.diagnostic_writer = RefCell::new(Box::new(stream) as Box<dyn WriteColor>);
    }

    /// Set the width to use when emitting documents
    pub fn set_emit_width(&mut self, emit_width: usize) {
        self.emit_width = emit_width;
    }

    /// Set the writer to use when emitting documents
    pub fn set_emit_writer(&mut self, stream: impl 'static + WriteColor) {
        self.emit_writer = RefCell::new(Box::new(stream) as Box<dyn WriteColor>);
    }

    /// `Status::Error` once any error has been reported.
    pub fn status(&self) -> Status {
        match *self.seen_errors.borrow() {
            true => Status::Error,
            false => Status::Ok,
        }
    }

    /// Load a source string into the file database.
    pub fn load_source_string(&mut self, name: String, source: String) -> FileId {
        self.files.add(name, source)
    }

    /// Load a source file into the file database using a reader.
    pub fn load_source(&mut self, name: String, mut reader: impl Read) -> Option<FileId> {
        let mut source = String::new();
        match reader.read_to_string(&mut source) {
            Ok(_) => Some(self.load_source_string(name, source)),
            Err(error) => {
                self.emit_read_diagnostic(name, error);
                None
            }
        }
    }

    /// Load a source file into the file database from the given path.
    pub fn load_source_path(&mut self, path: &Path) -> Option<FileId> {
        match std::fs::File::open(path) {
            Ok(file) => self.load_source(path.display().to_string(), file),
            Err(error) => {
                self.emit_read_diagnostic(path.display(), error);
                None
            }
        }
    }

    /// Parse, build and run every pass over a loaded file. Returns `None`
    /// once an error has been reported.
    pub fn build_dom(&self, file_id: FileId, options: &Options) -> Option<Dom> {
        let source = self.files.source(file_id);

        let (module, messages) = parse_module(source);
        for message in messages {
            self.emit_message(file_id, message.into());
        }

        // Return early if we’ve seen any errors, unless `allow_errors` is enabled
        if *self.seen_errors.borrow() && !self.allow_errors {
            return None;
        }

        let mut dom = Dom::new();
        if let Err(error) = build_module(&mut dom, &module, source) {
            self.emit_message(file_id, error.into());
            return None;
        }
        debug!(
            scenarios = dom.pending_scenario_versions.len(),
            sub_scenarios = dom.pending_sub_scenario_versions.len(),
            constants = dom.global_constants.len(),
            "built dom",
        );

        if let Err(error) = pass::run(&mut dom, options) {
            self.emit_message(file_id, error.into());
            return None;
        }

        Some(dom)
    }

    pub fn emit_dom(&self, dom: &Dom, format: Format) {
        match format {
            Format::Pretty => {
                let arena = pretty::Arena::new();
                let context = dom::pretty::Context::new(&arena);
                self.emit_doc(context.dom(dom).into_doc());
            }
            Format::Json => self.emit_json(dom),
        }
    }

    pub fn emit_coverage(&self, dom: &Dom, format: Format) {
        match format {
            Format::Pretty => {
                let arena = pretty::Arena::new();
                let context = dom::pretty::Context::new(&arena);
                self.emit_doc(context.coverage(dom).into_doc());
            }
            Format::Json => self.emit_json(&dom.covered_paths),
        }
    }

    fn emit_doc(&self, doc: pretty::RefDoc) {
        let mut emit_writer = self.emit_writer.borrow_mut();
        writeln!(emit_writer, "{}", doc.pretty(self.emit_width)).unwrap();
        emit_writer.flush().unwrap();
    }

    fn emit_json(&self, value: &impl Serialize) {
        let json = match serde_json::to_string_pretty(value) {
            Ok(json) => json,
            Err(error) => {
                self.emit_diagnostic(
                    Diagnostic::bug().with_message(format!("failed to serialize output: {error}")),
                );
                return;
            }
        };

        let mut emit_writer = self.emit_writer.borrow_mut();
        writeln!(emit_writer, "{json}").unwrap();
        emit_writer.flush().unwrap();
    }

    fn emit_message(&self, file_id: FileId, message: Message) {
        self.emit_diagnostic(message.to_diagnostic(file_id));
    }

    fn emit_diagnostic(&self, diagnostic: Diagnostic<FileId>) {
        let mut writer = self.diagnostic_writer.borrow_mut();
        let config = &self.codespan_config;

        codespan_reporting::term::emit(&mut *writer, config, &self.files, &diagnostic).unwrap();
        writer.flush().unwrap();

        if diagnostic.severity >= Severity::Error {
            *self.seen_errors.borrow_mut() = true;
        }
    }

    fn emit_read_diagnostic(&self, name: impl std::fmt::Display, error: std::io::Error) {
        let diagnostic =
            Diagnostic::error().with_message(format!("couldn't read `{name}`: {error}"));
        self.emit_diagnostic(diagnostic);
    }
}
