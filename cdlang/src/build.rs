//! Builds a raw [`Dom`] from a parsed module.
//!
//! The builder walks the syntax tree once. Everything under construction
//! lives on one of four stacks: the instruction being assembled, the
//! container receiving finished instructions, the message receiving fields
//! and the object receiving params. Every push is paired with a pop by
//! [`Builder::scoped`], including on early error returns.

use codespan_reporting::diagnostic::{Diagnostic, Label};
use fxhash::FxHashMap;
use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, trace};

use crate::dom::param::{INT64_TYPE, STRING_TYPE};
use crate::dom::{
    Dom, Field, FieldValue, GnmiPath, Instruction, InstructionKind, Param, PathElem, Protobuf,
    Row, Scenario, ScenarioKind, Sequence, SequenceSize, StreamFlavor, Version,
};
use crate::files::FileId;
use crate::source::ByteRange;
use crate::syntax::{self, Atom, GroupKind, Item, Module, Multiplicity, PathKey, Statement};

/// Stream domains and the methods that open a stream on them.
const STREAM_OPENERS: &[(&str, &[(&str, StreamFlavor)])] = &[
    ("gNMI", &[("Subscribe", StreamFlavor::Gnmi)]),
    ("ctrl", &[("Execute", StreamFlavor::Ctrl)]),
];

/// Types a sub-scenario parameter may be declared with.
const PARAM_TYPES: &[&str] = &[STRING_TYPE, INT64_TYPE];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("const proto '{name}' is already defined")]
    DuplicateConstant { name: String, range: ByteRange },
    #[error("{kind} '{name}' version {version} is already defined")]
    DuplicateScenario {
        kind: &'static str,
        name: String,
        version: String,
        range: ByteRange,
    },
    #[error("scenario '{scenario}': invalid version '{text}'")]
    InvalidVersion {
        scenario: String,
        text: String,
        range: ByteRange,
    },
    #[error("unsupported variable type '{type_name}' for parameter '{name}'")]
    UnsupportedParamType {
        name: String,
        type_name: String,
        range: ByteRange,
    },
    #[error("rpc mapping for '{message}' is already {existing}, cannot map it to {requested}")]
    RpcMappingConflict {
        message: String,
        existing: String,
        requested: String,
        range: ByteRange,
    },
    #[error("unknown stream domain '{domain}'")]
    UnknownStreamDomain {
        domain: String,
        suggestion: Option<String>,
        range: ByteRange,
    },
    #[error("stream domain '{domain}' has no method '{method}'")]
    UnknownStreamMethod {
        domain: String,
        method: String,
        suggestion: Option<String>,
        range: ByteRange,
    },
    #[error("gRPC stream '{channel}' is already open")]
    StreamAlreadyOpen { channel: String, range: ByteRange },
    #[error("gRPC stream '{channel}' is already closed")]
    StreamAlreadyClosed { channel: String, range: ByteRange },
    #[error("gRPC stream '{channel}' is not open")]
    StreamNotOpen {
        channel: String,
        suggestion: Option<String>,
        range: ByteRange,
    },
    #[error("scenario '{scenario}': missing stream close for {}", .channels.iter().map(|c| format!("'{c}'")).join(", "))]
    UnclosedStreams {
        scenario: String,
        channels: Vec<String>,
        range: ByteRange,
    },
    #[error("unsupported call outcome '{marker}'")]
    InvalidCallOutcome { marker: String, range: ByteRange },
    #[error("call with outcome OK needs a response message")]
    MissingCallResponse { range: ByteRange },
    #[error("call with outcome ERROR cannot have a response message")]
    UnexpectedCallResponse { range: ByteRange },
    #[error("field '{field}': '{text}' is not an int")]
    NotAnInt {
        field: String,
        text: String,
        range: ByteRange,
    },
    #[error("field '{field}': path element '{elem}' sets key '{key}' more than once")]
    DuplicatePathKey {
        field: String,
        elem: String,
        key: String,
        range: ByteRange,
    },
    #[error("unsupported value '{text}' in {context}")]
    UnsupportedValue {
        text: String,
        context: &'static str,
        range: ByteRange,
    },
    #[error("builder stacks are unbalanced after scenario '{scenario}'")]
    UnbalancedStacks { scenario: String, range: ByteRange },
}

impl BuildError {
    pub fn range(&self) -> ByteRange {
        match self {
            BuildError::DuplicateConstant { range, .. }
            | BuildError::DuplicateScenario { range, .. }
            | BuildError::InvalidVersion { range, .. }
            | BuildError::UnsupportedParamType { range, .. }
            | BuildError::RpcMappingConflict { range, .. }
            | BuildError::UnknownStreamDomain { range, .. }
            | BuildError::UnknownStreamMethod { range, .. }
            | BuildError::StreamAlreadyOpen { range, .. }
            | BuildError::StreamAlreadyClosed { range, .. }
            | BuildError::StreamNotOpen { range, .. }
            | BuildError::UnclosedStreams { range, .. }
            | BuildError::InvalidCallOutcome { range, .. }
            | BuildError::MissingCallResponse { range }
            | BuildError::UnexpectedCallResponse { range }
            | BuildError::NotAnInt { range, .. }
            | BuildError::DuplicatePathKey { range, .. }
            | BuildError::UnsupportedValue { range, .. }
            | BuildError::UnbalancedStacks { range, .. } => *range,
        }
    }

    pub fn to_diagnostic(&self, file_id: FileId) -> Diagnostic<FileId> {
        let label = Label::primary(file_id, self.range());

        match self {
            BuildError::UnbalancedStacks { .. } => Diagnostic::bug()
                .with_message(self.to_string())
                .with_labels(vec![label]),
            BuildError::UnknownStreamDomain { suggestion, .. }
            | BuildError::UnknownStreamMethod { suggestion, .. }
            | BuildError::StreamNotOpen { suggestion, .. } => Diagnostic::error()
                .with_message(self.to_string())
                .with_labels(vec![label])
                .with_notes(match suggestion {
                    Some(suggestion) => vec![format!("help: did you mean `{suggestion}`?")],
                    None => Vec::new(),
                }),
            BuildError::UnclosedStreams { channels, .. } => Diagnostic::error()
                .with_message(self.to_string())
                .with_labels(vec![label.with_message("scenario ends here")])
                .with_notes(vec![format!(
                    "help: add {} before the end of the scenario",
                    channels.iter().map(|c| format!("`close {c}`")).join(", "),
                )]),
            BuildError::InvalidCallOutcome { .. } => Diagnostic::error()
                .with_message(self.to_string())
                .with_labels(vec![label])
                .with_notes(vec!["expected OK or ERROR".to_owned()]),
            _ => Diagnostic::error()
                .with_message(self.to_string())
                .with_labels(vec![label]),
        }
    }
}

/// Build every item of `module` into `dom`. The first error stops the build.
pub fn build_module(dom: &mut Dom, module: &Module, source: &str) -> Result<(), BuildError> {
    let mut builder = Builder::new(dom, source);
    for item in &module.items {
        builder.item(item)?;
    }
    Ok(())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum StreamState {
    Open,
    Closed,
}

pub struct Builder<'dom, 'source> {
    dom: &'dom mut Dom,
    source: &'source str,

    instructions: Vec<Instruction>,
    groups: Vec<Vec<Instruction>>,
    field_groups: Vec<Vec<Field>>,
    param_sinks: Vec<Vec<Param>>,

    streams: FxHashMap<String, StreamState>,
    scenario: Option<(String, ByteRange)>,
}

impl<'dom, 'source> Builder<'dom, 'source> {
    pub fn new(dom: &'dom mut Dom, source: &'source str) -> Builder<'dom, 'source> {
        Builder {
            dom,
            source,
            instructions: Vec::new(),
            groups: Vec::new(),
            field_groups: Vec::new(),
            param_sinks: Vec::new(),
            streams: FxHashMap::default(),
            scenario: None,
        }
    }

    pub fn item(&mut self, item: &Item) -> Result<(), BuildError> {
        match item {
            Item::Rpc(rpc) => {
                let mappings = &mut self.dom.rpc_mappings;
                mappings
                    .insert(
                        &rpc.namespace.text,
                        &rpc.func.text,
                        &rpc.request.text,
                        &rpc.response.text,
                    )
                    .map_err(|conflict| BuildError::RpcMappingConflict {
                        message: conflict.message,
                        existing: conflict.existing,
                        requested: conflict.requested,
                        range: rpc.range,
                    })
            }
            Item::ConstProto(decl) => {
                if self.dom.global_constants.contains_key(&decl.name.text) {
                    return Err(BuildError::DuplicateConstant {
                        name: decl.name.text.clone(),
                        range: decl.name.range,
                    });
                }
                let protobuf = self.message(&decl.message)?;
                let instruction = Instruction::new(InstructionKind::ConstProto {
                    name: decl.name.text.clone(),
                    protobuf,
                });
                trace!(name = %decl.name.text, "const proto");
                self.dom
                    .global_constants
                    .insert(decl.name.text.clone(), instruction);
                Ok(())
            }
            Item::Scenario(decl) => self.scenario(decl),
        }
    }

    fn scenario(&mut self, decl: &syntax::ScenarioDecl) -> Result<(), BuildError> {
        let name = decl.name.text.clone();
        let version = decl
            .version
            .text
            .parse::<Version>()
            .map_err(|error| BuildError::InvalidVersion {
                scenario: name.clone(),
                text: error.text,
                range: decl.version.range,
            })?;

        let params = decl
            .params
            .iter()
            .map(|param| match PARAM_TYPES.contains(&param.r#type.text.as_str()) {
                true => Ok(Param::declaration(&param.name.text, &param.r#type.text)
                    .with_range(param.name.range)),
                false => Err(BuildError::UnsupportedParamType {
                    name: param.name.text.clone(),
                    type_name: param.r#type.text.clone(),
                    range: param.r#type.range,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let kind = match params.is_empty() {
            true => ScenarioKind::Scenario,
            false => ScenarioKind::SubScenario,
        };

        self.streams.clear();
        self.scenario = Some((name.clone(), decl.range));

        let children = self.in_group(|this| {
            decl.body
                .iter()
                .try_for_each(|statement| this.statement(statement))
        })?;

        let open_streams = self
            .streams
            .iter()
            .filter(|(_, state)| **state == StreamState::Open)
            .map(|(channel, _)| channel.clone())
            .sorted()
            .collect::<Vec<_>>();
        if !open_streams.is_empty() {
            return Err(BuildError::UnclosedStreams {
                scenario: name,
                channels: open_streams,
                range: ByteRange::new(decl.range.end().saturating_sub(1), decl.range.end()),
            });
        }
        if !self.stacks_are_empty() {
            return Err(self.unbalanced());
        }

        let scenario = Scenario {
            kind,
            name: name.clone(),
            version,
            disabled: decl.disabled,
            source: decl.range.slice(self.source).unwrap_or_default().to_owned(),
            params,
            children,
            range: decl.range,
        };

        let (pending, kind_name) = match kind {
            ScenarioKind::Scenario => (&mut self.dom.pending_scenario_versions, "scenario"),
            ScenarioKind::SubScenario => {
                (&mut self.dom.pending_sub_scenario_versions, "sub-scenario")
            }
        };
        let versions = pending.entry(name.clone()).or_default();
        let version_text = version.to_string();
        if versions.contains_key(&version_text) {
            return Err(BuildError::DuplicateScenario {
                kind: kind_name,
                name,
                version: version_text,
                range: decl.name.range,
            });
        }

        debug!(scenario = %name, %version, kind = kind_name, "built scenario");
        versions.insert(version_text, scenario);
        self.scenario = None;
        Ok(())
    }

    fn statement(&mut self, statement: &Statement) -> Result<(), BuildError> {
        match statement {
            Statement::Open {
                channel,
                domain,
                method,
                ..
            } => {
                let flavor = stream_flavor(domain, method)?;
                if self.streams.get(&channel.text) == Some(&StreamState::Open) {
                    return Err(BuildError::StreamAlreadyOpen {
                        channel: channel.text.clone(),
                        range: channel.range,
                    });
                }
                self.streams.insert(channel.text.clone(), StreamState::Open);
                self.emit(InstructionKind::OpenStream {
                    flavor,
                    channel: channel.text.clone(),
                })
            }
            Statement::Close { channel, .. } => {
                match self.streams.get(&channel.text) {
                    Some(StreamState::Open) => {}
                    Some(StreamState::Closed) => {
                        return Err(BuildError::StreamAlreadyClosed {
                            channel: channel.text.clone(),
                            range: channel.range,
                        })
                    }
                    None => return Err(self.stream_not_open(channel)),
                }
                self.streams.insert(channel.text.clone(), StreamState::Closed);
                self.emit(InstructionKind::CloseStream {
                    channel: channel.text.clone(),
                })
            }
            Statement::Send {
                channel, message, ..
            } => {
                self.check_stream_open(channel)?;
                let protobuf = self.message(message)?;
                self.emit(InstructionKind::Send {
                    channel: channel.text.clone(),
                    protobuf,
                })
            }
            Statement::Receive {
                channel, message, ..
            } => {
                self.check_stream_open(channel)?;
                let protobuf = self.message(message)?;
                self.emit(InstructionKind::Receive {
                    channel: channel.text.clone(),
                    protobuf,
                    next: None,
                    skip: false,
                })
            }
            Statement::Call {
                request,
                outcome,
                response,
                ..
            } => {
                let request = self.message(request)?;
                let pending = Instruction::new(InstructionKind::Call {
                    request,
                    response: None,
                    error_expected: false,
                });
                let (call, ()) = self.scoped(
                    |this| &mut this.instructions,
                    pending,
                    |this| this.call_outcome(outcome, response.as_ref()),
                )?;
                self.emit(call.kind)
            }
            Statement::Execute { name, args, .. } => {
                let params = self.in_param_sink(|this| {
                    args.iter().try_for_each(|arg| {
                        let param = match arg {
                            Atom::Star(range) => {
                                return Err(BuildError::UnsupportedValue {
                                    text: "*".to_owned(),
                                    context: "execute arguments",
                                    range: *range,
                                })
                            }
                            arg => atom_param(arg),
                        };
                        this.accept_param(param)
                    })
                })?;
                self.emit(InstructionKind::Execute {
                    name: name.text.clone(),
                    params,
                })
            }
            Statement::Group { kind, body, .. } => {
                let children = self.in_group(|this| {
                    body.iter()
                        .try_for_each(|statement| this.statement(statement))
                })?;
                self.emit(match kind {
                    GroupKind::AnyOrder => InstructionKind::AnyOrder {
                        children,
                        children_per_channel: Default::default(),
                    },
                    GroupKind::AtLeastOnce => InstructionKind::AtLeastOnce { children },
                    GroupKind::ZeroOrMore => InstructionKind::ZeroOrMore { children },
                })
            }
        }
    }

    /// Attach the outcome of the call on top of the instruction stack.
    fn call_outcome(
        &mut self,
        outcome: &syntax::Name,
        response: Option<&syntax::Message>,
    ) -> Result<(), BuildError> {
        let response = match (outcome.text.as_str(), response) {
            ("OK", Some(response)) => Some(self.message(response)?),
            ("OK", None) => return Err(BuildError::MissingCallResponse { range: outcome.range }),
            ("ERROR", None) => None,
            ("ERROR", Some(response)) => {
                return Err(BuildError::UnexpectedCallResponse {
                    range: response.range,
                })
            }
            (marker, _) => {
                return Err(BuildError::InvalidCallOutcome {
                    marker: marker.to_owned(),
                    range: outcome.range,
                })
            }
        };

        match self.instructions.last_mut().map(|call| &mut call.kind) {
            Some(InstructionKind::Call {
                response: slot,
                error_expected,
                ..
            }) => {
                *error_expected = response.is_none();
                *slot = response;
                Ok(())
            }
            _ => Err(self.unbalanced()),
        }
    }

    fn message(&mut self, message: &syntax::Message) -> Result<Protobuf, BuildError> {
        let fields = self.in_field_group(|this| {
            message
                .fields
                .iter()
                .try_for_each(|field| this.field(field))
        })?;
        Ok(Protobuf::new(message.type_name.text.clone(), fields))
    }

    fn field(&mut self, field: &syntax::FieldDecl) -> Result<(), BuildError> {
        let name = &field.name.text;
        let value = match &field.value {
            syntax::FieldValue::String(text) => FieldValue::String(text.clone()),
            syntax::FieldValue::Number(text) => match text.parse::<i64>() {
                Ok(number) => FieldValue::Number(number),
                Err(_) => {
                    return Err(BuildError::NotAnInt {
                        field: name.clone(),
                        text: text.clone(),
                        range: field.range,
                    })
                }
            },
            syntax::FieldValue::Enum(text) => FieldValue::Enum(text.clone()),
            syntax::FieldValue::Path(elems) => FieldValue::GnmiPath(self.path(field, elems)?),
            syntax::FieldValue::Variables(atoms) => {
                let params = self.in_param_sink(|this| {
                    atoms
                        .iter()
                        .try_for_each(|atom| this.accept_param(atom_param(atom)))
                })?;
                FieldValue::Variable(params)
            }
            syntax::FieldValue::Nested { cast, fields } => {
                let fields = self.in_field_group(|this| {
                    fields.iter().try_for_each(|field| this.field(field))
                })?;
                FieldValue::Sequence(Sequence {
                    fields,
                    serialized: cast.as_ref().map(|cast| cast.text.clone()),
                })
            }
            syntax::FieldValue::Repeated(rows) => {
                let rows = rows
                    .iter()
                    .map(|row| {
                        let fields = self.in_field_group(|this| {
                            row.fields.iter().try_for_each(|field| this.field(field))
                        })?;
                        let size = match row.marker {
                            None => SequenceSize::One,
                            Some(Multiplicity::ZeroOrOne) => SequenceSize::ZeroOrOne,
                            Some(Multiplicity::ZeroOrMore) => SequenceSize::ZeroOrMore,
                            Some(Multiplicity::OneOrMore) => SequenceSize::OneOrMore,
                        };
                        Ok(Row { size, fields })
                    })
                    .collect::<Result<Vec<_>, BuildError>>()?;
                FieldValue::Repeated(rows)
            }
        };

        self.accept_field(Field::new(name.clone(), value))
    }

    fn path(
        &mut self,
        field: &syntax::FieldDecl,
        elems: &[syntax::PathElem],
    ) -> Result<GnmiPath, BuildError> {
        let mut path = Vec::with_capacity(elems.len());
        for elem in elems {
            match elem {
                syntax::PathElem::Named { name, keys } => {
                    let mut elem = PathElem::named(name.text.clone());
                    for key in keys {
                        let (key, value) = match key {
                            PathKey::Assign { key, value } => (key, atom_param(value)),
                            PathKey::Bind { variable, key } => (key, binding_param(variable)?),
                        };
                        if elem.key.insert(key.text.clone(), value).is_some() {
                            return Err(BuildError::DuplicatePathKey {
                                field: field.name.text.clone(),
                                elem: name.text.clone(),
                                key: key.text.clone(),
                                range: key.range,
                            });
                        }
                    }
                    path.push(elem);
                }
                syntax::PathElem::Atom(atom) => {
                    let params = self.in_param_sink(|this| this.accept_param(atom_param(atom)))?;
                    path.push(PathElem {
                        params,
                        ..PathElem::default()
                    });
                }
            }
        }
        Ok(GnmiPath(path))
    }

    fn check_stream_open(&self, channel: &syntax::Name) -> Result<(), BuildError> {
        match self.streams.get(&channel.text) {
            Some(StreamState::Open) => Ok(()),
            _ => Err(self.stream_not_open(channel)),
        }
    }

    fn stream_not_open(&self, channel: &syntax::Name) -> BuildError {
        let open = self
            .streams
            .iter()
            .filter(|(_, state)| **state == StreamState::Open)
            .map(|(name, _)| name.as_str());
        BuildError::StreamNotOpen {
            channel: channel.text.clone(),
            suggestion: suggest(&channel.text, open),
            range: channel.range,
        }
    }

    /// Push `frame` onto a stack, run `body`, then pop the frame back off
    /// whether or not `body` succeeded.
    fn scoped<T, R>(
        &mut self,
        stack: fn(&mut Self) -> &mut Vec<T>,
        frame: T,
        body: impl FnOnce(&mut Self) -> Result<R, BuildError>,
    ) -> Result<(T, R), BuildError> {
        stack(self).push(frame);
        let result = body(self);
        let frame = stack(self).pop();

        match (result, frame) {
            (Err(error), _) => Err(error),
            (Ok(value), Some(frame)) => Ok((frame, value)),
            (Ok(_), None) => Err(self.unbalanced()),
        }
    }

    fn in_group(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<(), BuildError>,
    ) -> Result<Vec<Instruction>, BuildError> {
        let (children, ()) = self.scoped(|this| &mut this.groups, Vec::new(), body)?;
        Ok(children)
    }

    fn in_field_group(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<(), BuildError>,
    ) -> Result<Vec<Field>, BuildError> {
        let (fields, ()) = self.scoped(|this| &mut this.field_groups, Vec::new(), body)?;
        Ok(fields)
    }

    fn in_param_sink(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<(), BuildError>,
    ) -> Result<Vec<Param>, BuildError> {
        let (params, ()) = self.scoped(|this| &mut this.param_sinks, Vec::new(), body)?;
        Ok(params)
    }

    /// Add a finished instruction to the innermost container.
    fn emit(&mut self, kind: InstructionKind) -> Result<(), BuildError> {
        trace!(instruction = %kind.name(), "emit");
        match self.groups.last_mut() {
            Some(children) => {
                children.push(Instruction::new(kind));
                Ok(())
            }
            None => Err(self.unbalanced()),
        }
    }

    fn accept_field(&mut self, field: Field) -> Result<(), BuildError> {
        match self.field_groups.last_mut() {
            Some(fields) => {
                fields.push(field);
                Ok(())
            }
            None => Err(self.unbalanced()),
        }
    }

    fn accept_param(&mut self, param: Param) -> Result<(), BuildError> {
        match self.param_sinks.last_mut() {
            Some(params) => {
                params.push(param);
                Ok(())
            }
            None => Err(self.unbalanced()),
        }
    }

    fn stacks_are_empty(&self) -> bool {
        self.instructions.is_empty()
            && self.groups.is_empty()
            && self.field_groups.is_empty()
            && self.param_sinks.is_empty()
    }

    fn unbalanced(&self) -> BuildError {
        let (scenario, range) = match &self.scenario {
            Some((name, range)) => (name.clone(), *range),
            None => (String::new(), ByteRange::default()),
        };
        BuildError::UnbalancedStacks { scenario, range }
    }
}

fn stream_flavor(domain: &syntax::Name, method: &syntax::Name) -> Result<StreamFlavor, BuildError> {
    let methods = match STREAM_OPENERS.iter().find(|(name, _)| *name == domain.text) {
        Some((_, methods)) => methods,
        None => {
            let domains = STREAM_OPENERS.iter().map(|(name, _)| *name);
            return Err(BuildError::UnknownStreamDomain {
                domain: domain.text.clone(),
                suggestion: suggest(&domain.text, domains),
                range: domain.range,
            });
        }
    };

    match methods.iter().find(|(name, _)| *name == method.text) {
        Some((_, flavor)) => Ok(*flavor),
        None => Err(BuildError::UnknownStreamMethod {
            domain: domain.text.clone(),
            method: method.text.clone(),
            suggestion: suggest(&method.text, methods.iter().map(|(name, _)| *name)),
            range: method.range,
        }),
    }
}

fn atom_param(atom: &Atom) -> Param {
    let param = match atom {
        Atom::StringVar(name) => Param::variable(&name.text, STRING_TYPE),
        Atom::IntVar(name) => Param::variable(&name.text, INT64_TYPE),
        Atom::Wildcard(_) => Param::ignored(),
        Atom::Star(_) => Param::string_constant("*"),
        Atom::String(_, text) => Param::string_constant(text),
        Atom::Other(name) => Param::other_constant(&name.text),
    };
    param.with_range(atom.range())
}

/// The variable in a `[$name:=key]` binding.
fn binding_param(atom: &Atom) -> Result<Param, BuildError> {
    match atom {
        Atom::StringVar(name) => {
            Ok(Param::variable_decl(&name.text, STRING_TYPE).with_range(name.range))
        }
        Atom::IntVar(name) => Ok(Param::variable_decl(&name.text, INT64_TYPE).with_range(name.range)),
        atom => Err(BuildError::UnsupportedValue {
            text: match atom {
                Atom::String(_, text) => text.clone(),
                Atom::Other(name) => name.text.clone(),
                Atom::Star(_) => "*".to_owned(),
                _ => "_".to_owned(),
            },
            context: "a path key binding",
            range: atom.range(),
        }),
    }
}

/// The candidate closest to `name`, if any is close enough to be a typo.
fn suggest<'a>(name: &str, candidates: impl Iterator<Item = &'a str>) -> Option<String> {
    const MAX_DISTANCE: usize = 3;

    candidates
        .map(|candidate| (levenshtein::levenshtein(name, candidate), candidate))
        .filter(|(distance, _)| *distance <= MAX_DISTANCE)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.to_owned())
}
