//! The resolved document handed to code generators.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use once_cell::sync::Lazy;
use serde::Serialize;

pub mod instruction;
pub mod param;
pub mod path;
pub mod pretty;
pub mod protobuf;
pub mod version;

pub use self::instruction::{Instruction, InstructionKind, Scenario, ScenarioKind, StreamFlavor};
pub use self::param::{Param, ParamKind};
pub use self::path::{GnmiPath, PathElem};
pub use self::protobuf::{Field, FieldValue, Protobuf, Row, Sequence, SequenceSize};
pub use self::version::Version;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dom {
    pub global_constants: BTreeMap<String, Instruction>,
    pub scenarios: BTreeMap<String, Scenario>,
    pub sub_scenarios: BTreeMap<String, Scenario>,
    /// Every version of every scenario, keyed by name then version text.
    /// Drained by version resolution.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub pending_scenario_versions: BTreeMap<String, BTreeMap<String, Scenario>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub pending_sub_scenario_versions: BTreeMap<String, BTreeMap<String, Scenario>>,
    pub covered_paths: BTreeMap<String, CoveredPath>,
    pub rpc_mappings: RpcMappings,
}

impl Dom {
    pub fn new() -> Dom {
        Dom::default()
    }

    /// Resolved scenarios followed by resolved sub-scenarios.
    pub fn scopes(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.values().chain(self.sub_scenarios.values())
    }

    pub fn scopes_mut(&mut self) -> impl Iterator<Item = &mut Scenario> {
        self.scenarios
            .values_mut()
            .chain(self.sub_scenarios.values_mut())
    }

    /// RPC function that sends or returns `message_type`.
    pub fn func_name(&self, message_type: &str) -> Option<&str> {
        self.rpc_mappings.func_name(message_type)
    }

    /// Protocol namespace of `message_type`.
    pub fn namespace(&self, message_type: &str) -> Option<&str> {
        self.rpc_mappings.namespace(message_type)
    }
}

/// Which scenarios exercise a path, per request mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoveredPath {
    #[serde(rename = "path_text")]
    pub path: String,
    /// The path field as first seen.
    #[serde(rename = "path_value")]
    pub value: Field,
    pub scenarios: BTreeMap<RequestMode, BTreeSet<String>>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RequestMode {
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "SET")]
    Set,
    #[serde(rename = "SUBSCRIBE:POLL")]
    SubscribePoll,
    #[serde(rename = "SUBSCRIBE:ONCE")]
    SubscribeOnce,
    #[serde(rename = "SUBSCRIBE:STREAM:ON_CHANGE")]
    SubscribeStreamOnChange,
    #[serde(rename = "SUBSCRIBE:STREAM:SAMPLE")]
    SubscribeStreamSample,
    #[serde(rename = "SUBSCRIBE:STREAM:TARGET_DEFINED")]
    SubscribeStreamTargetDefined,
    #[serde(rename = "RESPONSE")]
    Response,
    #[serde(rename = "OTHER")]
    Other,
}

impl RequestMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestMode::Get => "GET",
            RequestMode::Set => "SET",
            RequestMode::SubscribePoll => "SUBSCRIBE:POLL",
            RequestMode::SubscribeOnce => "SUBSCRIBE:ONCE",
            RequestMode::SubscribeStreamOnChange => "SUBSCRIBE:STREAM:ON_CHANGE",
            RequestMode::SubscribeStreamSample => "SUBSCRIBE:STREAM:SAMPLE",
            RequestMode::SubscribeStreamTargetDefined => "SUBSCRIBE:STREAM:TARGET_DEFINED",
            RequestMode::Response => "RESPONSE",
            RequestMode::Other => "OTHER",
        }
    }
}

impl fmt::Display for RequestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message type to RPC function and protocol namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcMappings {
    func_names: BTreeMap<String, String>,
    namespaces: BTreeMap<String, String>,
}

static DEFAULT_RPC_MAPPINGS: Lazy<RpcMappings> = Lazy::new(|| {
    let mut mappings = RpcMappings {
        func_names: BTreeMap::new(),
        namespaces: BTreeMap::new(),
    };
    let defaults = [
        ("gnmi", "Capabilities", "CapabilityRequest", "CapabilityResponse"),
        ("gnmi", "Get", "GetRequest", "GetResponse"),
        ("gnmi", "Set", "SetRequest", "SetResponse"),
        ("gnmi", "Subscribe", "SubscribeRequest", "SubscribeResponse"),
        ("ctrl", "Execute", "ExecuteRequest", "ExecuteResponse"),
    ];
    for (namespace, func, request, response) in defaults {
        for message in [request, response] {
            mappings.func_names.insert(message.to_owned(), func.to_owned());
            mappings.namespaces.insert(message.to_owned(), namespace.to_owned());
        }
    }
    mappings
});

impl Default for RpcMappings {
    fn default() -> RpcMappings {
        DEFAULT_RPC_MAPPINGS.clone()
    }
}

/// An `rpc` declaration that disagrees with an earlier mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConflict {
    pub message: String,
    pub existing: String,
    pub requested: String,
}

impl RpcMappings {
    pub fn func_name(&self, message_type: &str) -> Option<&str> {
        self.func_names.get(message_type).map(String::as_str)
    }

    pub fn namespace(&self, message_type: &str) -> Option<&str> {
        self.namespaces.get(message_type).map(String::as_str)
    }

    /// Map `request` and `response` to `namespace.func`. Repeating an
    /// existing mapping is accepted.
    pub fn insert(
        &mut self,
        namespace: &str,
        func: &str,
        request: &str,
        response: &str,
    ) -> Result<(), RpcConflict> {
        for message in [request, response] {
            let existing = (self.namespace(message), self.func_name(message));
            if let (Some(existing_ns), Some(existing_func)) = existing {
                if (existing_ns, existing_func) != (namespace, func) {
                    return Err(RpcConflict {
                        message: message.to_owned(),
                        existing: format!("{existing_ns}.{existing_func}"),
                        requested: format!("{namespace}.{func}"),
                    });
                }
            }
        }

        for message in [request, response] {
            self.func_names.insert(message.to_owned(), func.to_owned());
            self.namespaces.insert(message.to_owned(), namespace.to_owned());
        }
        Ok(())
    }
}
