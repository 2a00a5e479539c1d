//! Passes that turn the raw output of the builder into the final dom.
//!
//! Passes run in the order of [`Pass::ALL`]. Each pass visits resolved
//! scenarios, then resolved sub-scenarios.

use codespan_reporting::diagnostic::{Diagnostic, Label};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

use crate::dom::{Dom, Version};
use crate::files::FileId;
use crate::source::ByteRange;

pub mod any_order;
pub mod coverage;
pub mod ids;
pub mod next_refs;
pub mod var_decls;
pub mod versions;

#[derive(Debug, Clone)]
pub struct Options {
    /// Newest scenario version to keep.
    pub target_version: Version,
    /// Log the start and end of each pass at `info` rather than `debug`.
    pub trace_passes: bool,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            target_version: Version::Latest,
            trace_passes: false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Pass {
    Versions,
    VarDecls,
    Ids,
    NextRefs,
    AnyOrder,
    Coverage,
}

impl Pass {
    pub const ALL: [Pass; 6] = [
        Pass::Versions,
        Pass::VarDecls,
        Pass::Ids,
        Pass::NextRefs,
        Pass::AnyOrder,
        Pass::Coverage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Pass::Versions => "version resolution",
            Pass::VarDecls => "variable declarations",
            Pass::Ids => "instruction ids",
            Pass::NextRefs => "back-to-back receives",
            Pass::AnyOrder => "any-order channels",
            Pass::Coverage => "path coverage",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PassError {
    #[error("scenario '{scenario}': variable '{name}' is used as both {first} and {second}")]
    ConflictingVariableType {
        scenario: String,
        name: String,
        first: String,
        second: String,
        /// The occurrence with the conflicting type.
        range: ByteRange,
        first_range: ByteRange,
    },
    #[error(
        "scenario '{scenario}'{}: subscription is missing a mode or path field",
        .id.map(|id| format!(", instruction {id}")).unwrap_or_default()
    )]
    MissingModeOrPath {
        scenario: String,
        id: Option<u32>,
        range: ByteRange,
    },
}

impl PassError {
    pub fn range(&self) -> ByteRange {
        match self {
            PassError::ConflictingVariableType { range, .. }
            | PassError::MissingModeOrPath { range, .. } => *range,
        }
    }

    pub fn to_diagnostic(&self, file_id: FileId) -> Diagnostic<FileId> {
        let diagnostic = Diagnostic::error().with_message(self.to_string());

        match self {
            PassError::ConflictingVariableType {
                name,
                first,
                second,
                range,
                first_range,
                ..
            } => diagnostic
                .with_labels(vec![
                    Label::primary(file_id, *range).with_message(format!("used as {second} here")),
                    Label::secondary(file_id, *first_range)
                        .with_message(format!("first used as {first} here")),
                ])
                .with_notes(vec![format!(
                    "help: `{name}` must be either a `$` or a `#` variable throughout"
                )]),
            PassError::MissingModeOrPath { range, .. } => diagnostic
                .with_labels(vec![
                    Label::primary(file_id, *range).with_message("in this scenario")
                ])
                .with_notes(vec![
                    "streaming subscriptions need both a `path` and a `mode`".to_owned(),
                ]),
        }
    }
}

/// Run every pass over `dom`, stopping at the first error.
pub fn run(dom: &mut Dom, options: &Options) -> Result<(), PassError> {
    Pass::ALL
        .into_iter()
        .try_for_each(|pass| run_pass(dom, pass, options))
}

pub fn run_pass(dom: &mut Dom, pass: Pass, options: &Options) -> Result<(), PassError> {
    if options.trace_passes {
        info!(%pass, "pass started");
    } else {
        debug!(%pass, "pass started");
    }

    match pass {
        Pass::Versions => versions::run(dom, options.target_version),
        Pass::VarDecls => {
            for scope in dom.scopes_mut() {
                var_decls::run(scope)?;
            }
        }
        Pass::Ids => dom.scopes_mut().for_each(ids::run),
        Pass::NextRefs => dom
            .scopes_mut()
            .for_each(|scope| next_refs::run(&mut scope.children)),
        Pass::AnyOrder => dom
            .scopes_mut()
            .for_each(|scope| any_order::run(&mut scope.children)),
        Pass::Coverage => coverage::run(dom)?,
    }

    if options.trace_passes {
        info!(%pass, "pass finished");
    } else {
        debug!(%pass, "pass finished");
    }
    Ok(())
}

#[cfg(test)]
mod tests;
