//! The instruction tree.

use std::borrow::Cow;
use std::collections::BTreeMap;

use fxhash::FxHashSet;
use serde::{Serialize, Serializer};

use crate::dom::param::Param;
use crate::dom::protobuf::Protobuf;
use crate::dom::version::Version;
use crate::source::ByteRange;

/// A node of a scenario body. `id` is assigned by the numbering pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub id: Option<u32>,
    pub kind: InstructionKind,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFlavor {
    Gnmi,
    Ctrl,
}

impl StreamFlavor {
    /// Protocol namespace of the stream, as used by `children_per_channel`
    /// consumers and the RPC mapping table.
    pub fn namespace(self) -> &'static str {
        match self {
            StreamFlavor::Gnmi => "gnmi",
            StreamFlavor::Ctrl => "ctrl",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstructionKind {
    Send {
        channel: String,
        protobuf: Protobuf,
    },
    Receive {
        channel: String,
        protobuf: Protobuf,
        /// The receive that terminates the enclosing loop, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        next: Option<u32>,
        /// Set when a preceding loop already matches this message as its exit.
        #[serde(skip_serializing_if = "is_false")]
        skip: bool,
    },
    /// Invoke a sub-scenario.
    Execute {
        #[serde(rename = "scenario")]
        name: String,
        params: Vec<Param>,
    },
    AnyOrder {
        children: Vec<Instruction>,
        /// Ids of the direct `Receive` children on each channel, in document
        /// order. Look the instructions up by id in `children`.
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        children_per_channel: BTreeMap<String, Vec<u32>>,
    },
    ZeroOrMore {
        children: Vec<Instruction>,
    },
    AtLeastOnce {
        children: Vec<Instruction>,
    },
    VarDeclaration {
        variable: Param,
    },
    OpenStream {
        flavor: StreamFlavor,
        channel: String,
    },
    CloseStream {
        channel: String,
    },
    /// A unary RPC.
    Call {
        #[serde(rename = "protobuf")]
        request: Protobuf,
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<Protobuf>,
        #[serde(skip_serializing_if = "is_false")]
        error_expected: bool,
    },
    /// A named message template shared by every scenario in the file.
    ConstProto {
        #[serde(rename = "constant")]
        name: String,
        protobuf: Protobuf,
    },
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Instruction {
    pub fn new(kind: InstructionKind) -> Instruction {
        Instruction { id: None, kind }
    }

    pub fn name(&self) -> Cow<'_, str> {
        self.kind.name()
    }

    pub fn is_group(&self) -> bool {
        self.kind.is_group()
    }

    pub fn children(&self) -> &[Instruction] {
        self.kind.children()
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Instruction>> {
        self.kind.children_mut()
    }

    /// The channel a stream-bound instruction targets.
    pub fn channel(&self) -> Option<&str> {
        match &self.kind {
            InstructionKind::Send { channel, .. }
            | InstructionKind::Receive { channel, .. }
            | InstructionKind::OpenStream { channel, .. }
            | InstructionKind::CloseStream { channel } => Some(channel),
            _ => None,
        }
    }

    /// Message payloads carried by this instruction, the response last.
    pub fn protobufs(&self) -> Vec<&Protobuf> {
        match &self.kind {
            InstructionKind::Send { protobuf, .. }
            | InstructionKind::Receive { protobuf, .. }
            | InstructionKind::ConstProto { protobuf, .. } => vec![protobuf],
            InstructionKind::Call {
                request, response, ..
            } => std::iter::once(request).chain(response).collect(),
            _ => Vec::new(),
        }
    }

    /// Params mentioned by this instruction itself, ignoring its children.
    fn own_params(&self) -> Vec<&Param> {
        match &self.kind {
            InstructionKind::Execute { params, .. } => params.iter().collect(),
            _ => self.protobufs().into_iter().flat_map(Protobuf::params).collect(),
        }
    }

    /// Variables read or bound anywhere in this subtree, deduplicated by name
    /// and ordered by first occurrence.
    pub fn used_variables(&self) -> Vec<Param> {
        let mut params = Vec::new();
        collect_variables(std::slice::from_ref(self), &mut params);
        dedup_by_name(params)
    }
}

/// Every variable occurrence under `instructions`, in document order.
fn collect_variables<'a>(instructions: &'a [Instruction], params: &mut Vec<&'a Param>) {
    for instruction in instructions {
        let own = instruction.own_params().into_iter();
        params.extend(own.filter(|param| param.is_variable()));
        collect_variables(instruction.children(), params);
    }
}

fn dedup_by_name(params: Vec<&Param>) -> Vec<Param> {
    let mut seen = FxHashSet::default();
    params
        .into_iter()
        .filter(|param| seen.insert(param.name.as_str()))
        .cloned()
        .collect()
}

impl InstructionKind {
    pub fn name(&self) -> Cow<'_, str> {
        match self {
            InstructionKind::Send { .. } => Cow::Borrowed("Send"),
            InstructionKind::Receive { .. } => Cow::Borrowed("Receive"),
            InstructionKind::Execute { name, .. } => Cow::Borrowed(name),
            InstructionKind::AnyOrder { .. } => Cow::Borrowed("AnyOrder"),
            InstructionKind::ZeroOrMore { .. } => Cow::Borrowed("ZeroOrMore"),
            InstructionKind::AtLeastOnce { .. } => Cow::Borrowed("AtLeastOnce"),
            InstructionKind::VarDeclaration { variable } => Cow::Borrowed(&variable.name),
            InstructionKind::OpenStream {
                flavor: StreamFlavor::Gnmi,
                ..
            } => Cow::Borrowed("OpenGNMIStream"),
            InstructionKind::OpenStream {
                flavor: StreamFlavor::Ctrl,
                ..
            } => Cow::Borrowed("OpenCTRLStream"),
            InstructionKind::CloseStream { .. } => Cow::Borrowed("CloseStream"),
            InstructionKind::Call { .. } => Cow::Borrowed("Call"),
            InstructionKind::ConstProto { .. } => Cow::Borrowed("ConstProto"),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(
            self,
            InstructionKind::AnyOrder { .. }
                | InstructionKind::ZeroOrMore { .. }
                | InstructionKind::AtLeastOnce { .. }
        )
    }

    /// Loops whose trailing receive may be the loop's exit condition.
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            InstructionKind::ZeroOrMore { .. } | InstructionKind::AtLeastOnce { .. }
        )
    }

    pub fn children(&self) -> &[Instruction] {
        match self {
            InstructionKind::AnyOrder { children, .. }
            | InstructionKind::ZeroOrMore { children }
            | InstructionKind::AtLeastOnce { children } => children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Instruction>> {
        match self {
            InstructionKind::AnyOrder { children, .. }
            | InstructionKind::ZeroOrMore { children }
            | InstructionKind::AtLeastOnce { children } => Some(children),
            _ => None,
        }
    }
}

impl Serialize for Instruction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Repr<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            id: Option<u32>,
            name: Cow<'a, str>,
            #[serde(flatten)]
            kind: &'a InstructionKind,
        }

        Repr {
            id: self.id,
            name: self.name(),
            kind: &self.kind,
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Scenario,
    /// A scenario with formal parameters, invoked through `execute`.
    SubScenario,
}

/// The root of a scenario body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scenario {
    #[serde(rename = "type")]
    pub kind: ScenarioKind,
    pub name: String,
    pub version: Version,
    #[serde(skip_serializing_if = "is_false")]
    pub disabled: bool,
    /// Verbatim source of the definition.
    #[serde(rename = "source_text")]
    pub source: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    pub children: Vec<Instruction>,
    #[serde(skip)]
    pub range: ByteRange,
}

impl Scenario {
    /// Every variable occurrence in the body, in document order. Formal
    /// parameters of a sub-scenario are inputs, so they are left out.
    pub fn variable_params(&self) -> Vec<&Param> {
        let formals: FxHashSet<&str> = match self.kind {
            ScenarioKind::SubScenario => {
                self.params.iter().map(|param| param.name.as_str()).collect()
            }
            ScenarioKind::Scenario => FxHashSet::default(),
        };

        let mut params = Vec::new();
        collect_variables(&self.children, &mut params);
        params.retain(|param| !formals.contains(param.name.as_str()));
        params
    }

    /// Free variables of the body, deduplicated by name.
    pub fn used_variables(&self) -> Vec<Param> {
        dedup_by_name(self.variable_params())
    }
}
