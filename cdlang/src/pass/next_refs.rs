//! Links a loop to the receive that follows it.
//!
//! When a `ZeroOrMore` or `AtLeastOnce` group is directly followed by a
//! receive on channel `C`, a message of that shape arriving while the loop
//! runs ends the loop. The last unlinked receive on `C` inside the group
//! points at the follower with `next`, and the follower is marked `skip`.

use crate::dom::{Instruction, InstructionKind};

pub fn run(instructions: &mut [Instruction]) {
    // inner groups first, so their `skip` marks are settled before a scan
    // at this level reads them
    for instruction in instructions.iter_mut() {
        if let Some(children) = instruction.children_mut() {
            run(children);
        }
    }

    for index in 1..instructions.len() {
        let (before, after) = instructions.split_at_mut(index);
        link(&mut before[index - 1], &mut after[0]);
    }
}

fn link(group: &mut Instruction, follower: &mut Instruction) {
    if !group.kind.is_loop() {
        return;
    }
    let (channel, follower_id) = match &follower.kind {
        InstructionKind::Receive { channel, .. } => (channel.as_str(), follower.id),
        _ => return,
    };
    let children = match group.children_mut() {
        Some(children) => children,
        None => return,
    };

    let last = children.iter_mut().rev().find_map(|child| match &mut child.kind {
        InstructionKind::Receive {
            channel: child_channel,
            next,
            skip: false,
            ..
        } if *child_channel == channel => Some(next),
        _ => None,
    });

    if let Some(next) = last {
        *next = follower_id;
        if let InstructionKind::Receive { skip, .. } = &mut follower.kind {
            *skip = true;
        }
    }
}
