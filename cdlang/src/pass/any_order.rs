//! Groups the receives of each `AnyOrder` block by channel.

use std::collections::BTreeMap;

use crate::dom::{Instruction, InstructionKind};

pub fn run(instructions: &mut [Instruction]) {
    for instruction in instructions {
        if let InstructionKind::AnyOrder {
            children,
            children_per_channel,
        } = &mut instruction.kind
        {
            *children_per_channel = partition(children);
        }
        if let Some(children) = instruction.children_mut() {
            run(children);
        }
    }
}

/// Ids of the direct receive children, per channel, in document order.
fn partition(children: &[Instruction]) -> BTreeMap<String, Vec<u32>> {
    let mut per_channel = BTreeMap::<String, Vec<u32>>::new();
    for child in children {
        if let (InstructionKind::Receive { channel, .. }, Some(id)) = (&child.kind, child.id) {
            per_channel.entry(channel.clone()).or_default().push(id);
        }
    }
    per_channel
}
