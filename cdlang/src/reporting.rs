//! Diagnostic messages produced while compiling a scenario file.
//!
//! These can be converted to [`Diagnostic`]s in order to present them to the user.

use codespan_reporting::diagnostic::Diagnostic;

use crate::build::BuildError;
use crate::files::FileId;
use crate::pass::PassError;
use crate::syntax::parser::ParseMessage;

/// Global diagnostic messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Parse(ParseMessage),
    Build(BuildError),
    Pass(PassError),
}

impl From<ParseMessage> for Message {
    fn from(message: ParseMessage) -> Message {
        Message::Parse(message)
    }
}

impl From<BuildError> for Message {
    fn from(error: BuildError) -> Message {
        Message::Build(error)
    }
}

impl From<PassError> for Message {
    fn from(error: PassError) -> Message {
        Message::Pass(error)
    }
}

impl Message {
    pub fn to_diagnostic(&self, file_id: FileId) -> Diagnostic<FileId> {
        match self {
            Message::Parse(message) => message.to_diagnostic(file_id),
            Message::Build(error) => error.to_diagnostic(file_id),
            Message::Pass(error) => error.to_diagnostic(file_id),
        }
    }
}
