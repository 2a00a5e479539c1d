//! Records which scenarios exercise each gNMI path, and in which mode.

use std::collections::BTreeMap;
use tracing::trace;

use super::PassError;
use crate::dom::{
    CoveredPath, Dom, Field, FieldValue, Instruction, InstructionKind, Protobuf, RequestMode,
    Scenario,
};

pub fn run(dom: &mut Dom) -> Result<(), PassError> {
    let scopes = dom.scenarios.values().chain(dom.sub_scenarios.values());
    for scenario in scopes {
        let mut recorder = Recorder {
            scenario,
            paths: &mut dom.covered_paths,
        };
        recorder.instructions(&scenario.children)?;
    }
    Ok(())
}

struct Recorder<'a> {
    scenario: &'a Scenario,
    paths: &'a mut BTreeMap<String, CoveredPath>,
}

impl<'a> Recorder<'a> {
    fn instructions(&mut self, instructions: &[Instruction]) -> Result<(), PassError> {
        for instruction in instructions {
            match &instruction.kind {
                InstructionKind::Send { protobuf, .. }
                | InstructionKind::Receive { protobuf, .. } => {
                    self.protobuf(instruction, protobuf)?;
                }
                InstructionKind::Call {
                    request, response, ..
                } => {
                    self.protobuf(instruction, request)?;
                    if let Some(response) = response {
                        self.protobuf(instruction, response)?;
                    }
                }
                _ => {}
            }
            self.instructions(instruction.children())?;
        }
        Ok(())
    }

    fn protobuf(&mut self, instruction: &Instruction, protobuf: &Protobuf) -> Result<(), PassError> {
        match protobuf.short_type_name() {
            "GetRequest" => self.all_paths(protobuf.fields.iter(), RequestMode::Get),
            "SetRequest" => self.all_paths(protobuf.fields.iter(), RequestMode::Set),
            "GetResponse" | "SetResponse" | "SubscribeResponse" => {
                self.all_paths(protobuf.fields.iter(), RequestMode::Response)
            }
            "SubscribeRequest" => {
                if let Some(subscribe) = protobuf.field("subscribe") {
                    return self.subscribe(instruction, subscribe);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn subscribe(&mut self, instruction: &Instruction, subscribe: &Field) -> Result<(), PassError> {
        let mode = subscribe.child("mode").and_then(Field::as_enum);
        if let Some(mode @ ("ONCE" | "POLL")) = mode {
            self.all_paths(std::iter::once(subscribe), request_mode(mode));
            return Ok(());
        }

        let entries = subscribe
            .children()
            .filter(|field| field.name == "subscription")
            .flat_map(|field| match &field.value {
                FieldValue::Repeated(rows) => rows.iter().map(|row| &row.fields[..]).collect(),
                FieldValue::Sequence(sequence) => vec![&sequence.fields[..]],
                _ => Vec::new(),
            });

        for entry in entries {
            let path = entry.iter().find(|field| field.as_path().is_some());
            let mode = entry
                .iter()
                .find(|field| field.name == "mode")
                .and_then(Field::as_enum);

            match (path, mode) {
                (Some(path), Some(mode)) => self.record(path, request_mode(mode)),
                _ => {
                    return Err(PassError::MissingModeOrPath {
                        scenario: self.scenario.name.clone(),
                        id: instruction.id,
                        range: self.scenario.range,
                    })
                }
            }
        }
        Ok(())
    }

    /// Record every path found under `fields` with the same mode.
    fn all_paths<'f>(&mut self, fields: impl Iterator<Item = &'f Field>, mode: RequestMode) {
        let mut found = Vec::new();
        for field in fields {
            field.walk(&mut |field| {
                if field.as_path().is_some() {
                    found.push(field);
                }
            });
        }
        for field in found {
            self.record(field, mode);
        }
    }

    fn record(&mut self, field: &Field, mode: RequestMode) {
        let path = match field.as_path() {
            Some(path) => path.render(),
            None => return,
        };
        trace!(scenario = %self.scenario.name, %path, %mode, "covered path");

        let covered = self
            .paths
            .entry(path.clone())
            .or_insert_with(|| CoveredPath {
                path,
                value: field.clone(),
                scenarios: BTreeMap::new(),
            });
        covered
            .scenarios
            .entry(mode)
            .or_default()
            .insert(self.scenario.name.clone());
    }
}

fn request_mode(mode: &str) -> RequestMode {
    match mode {
        "ONCE" => RequestMode::SubscribeOnce,
        "POLL" => RequestMode::SubscribePoll,
        "SAMPLE" => RequestMode::SubscribeStreamSample,
        "ON_CHANGE" => RequestMode::SubscribeStreamOnChange,
        "TARGET_DEFINED" => RequestMode::SubscribeStreamTargetDefined,
        _ => RequestMode::Other,
    }
}
