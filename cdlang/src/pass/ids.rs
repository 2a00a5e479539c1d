//! Numbers the instructions of a scenario in depth-first order, from zero.

use crate::dom::{Instruction, Scenario};

pub fn run(scenario: &mut Scenario) {
    let mut next_id = 0;
    assign(&mut scenario.children, &mut next_id);
}

fn assign(instructions: &mut [Instruction], next_id: &mut u32) {
    for instruction in instructions {
        instruction.id = Some(*next_id);
        *next_id += 1;
        if let Some(children) = instruction.children_mut() {
            assign(children, next_id);
        }
    }
}
