//! Declares the free variables of each scenario up front.
//!
//! A variable is declared once per scenario, in order of first use. A
//! variable bound in place by a `[$name:=key]` path key is declared by that
//! binding and gets no leading declaration, even when a read of the same
//! name appears earlier in the body. Generators must therefore treat a
//! binding as in scope for the whole scenario, not only after it.
//!
//! Using one name with two different types is an error. Formal parameters
//! of a sub-scenario take part in that check but are never declared again.

use fxhash::{FxHashMap, FxHashSet};

use super::PassError;
use crate::dom::{Instruction, InstructionKind, Param, ParamKind, Scenario, ScenarioKind};

pub fn run(scenario: &mut Scenario) -> Result<(), PassError> {
    let formals: Vec<&Param> = match scenario.kind {
        ScenarioKind::SubScenario => scenario.params.iter().collect(),
        ScenarioKind::Scenario => Vec::new(),
    };
    let occurrences = scenario.variable_params();

    let mut first_uses = FxHashMap::<&str, &Param>::default();
    let mut bound_in_place = FxHashSet::default();
    for param in formals.into_iter().chain(occurrences) {
        match first_uses.get(param.name.as_str()) {
            None => {
                first_uses.insert(param.name.as_str(), param);
            }
            Some(first) if first.r#type != param.r#type => {
                return Err(PassError::ConflictingVariableType {
                    scenario: scenario.name.clone(),
                    name: param.name.clone(),
                    first: first.r#type.clone(),
                    second: param.r#type.clone(),
                    range: param.range,
                    first_range: first.range,
                });
            }
            Some(_) => {}
        }
        if param.kind == ParamKind::VariableDecl {
            bound_in_place.insert(param.name.as_str());
        }
    }

    let already_declared = scenario
        .children
        .iter()
        .filter_map(|child| match &child.kind {
            InstructionKind::VarDeclaration { variable } => Some(variable.name.as_str()),
            _ => None,
        })
        .collect::<FxHashSet<_>>();

    let declarations = scenario
        .used_variables()
        .into_iter()
        .filter(|param| !bound_in_place.contains(param.name.as_str()))
        .filter(|param| !already_declared.contains(param.name.as_str()))
        .map(|variable| Instruction::new(InstructionKind::VarDeclaration { variable }))
        .collect::<Vec<_>>();

    let body = std::mem::take(&mut scenario.children);
    scenario.children = declarations.into_iter().chain(body).collect();
    Ok(())
}
