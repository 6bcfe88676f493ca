//! Edges (§3): directed, typed transitions between blocks.
//!
//! Catch edges are kept as their own variant rather than folded into
//! `Jump` (§9 "Catch edges as a separate precedence class") so their
//! handler-table priority survives independently of control-flow order.

use crate::instruction::Instruction;

use super::block::BlockLabel;

#[derive(Debug, Clone, PartialEq)]
pub enum Edge {
    /// Sequential flow into the next block. `via_insn` is set when the
    /// predecessor ends in a conditional jump (this is its not-taken arm)
    /// or a `jsr`/`jsr_w` (this is the symbolic return-site arm, matched
    /// against a `ret` later by a subroutine tracer — out of scope here).
    Fallthrough { source: BlockLabel, target: BlockLabel, via_insn: Option<Instruction> },
    /// An unconditional or conditional jump, a `goto`, a return, or
    /// `athrow` — anything that leaves a block through a taken branch
    /// rather than falling into the next one. Excludes `ret`, which gets
    /// its own variant because its target isn't known until a subroutine
    /// tracer resolves it.
    Jump { source: BlockLabel, target: BlockLabel, insn: Instruction },
    /// A subroutine return. `target` is `BlockLabel::OPAQUE` until a
    /// tracer (out of scope for this core, §9) matches it back to the
    /// `jsr` that reached this subroutine.
    Ret { source: BlockLabel, target: BlockLabel, insn: Instruction },
    /// One arm of a `tableswitch`/`lookupswitch`. `value = None` is the
    /// default arm.
    Switch { source: BlockLabel, target: BlockLabel, insn: Instruction, value: Option<i32> },
    /// An exception handler covering `source`. `class = None` is a
    /// catch-all (`finally`). Lower `priority` is evaluated first,
    /// matching the handler table's declaration order.
    Catch { source: BlockLabel, target: BlockLabel, class: Option<u16>, priority: u32 },
}

impl Edge {
    pub fn source(&self) -> BlockLabel {
        match self {
            Edge::Fallthrough { source, .. }
            | Edge::Jump { source, .. }
            | Edge::Ret { source, .. }
            | Edge::Switch { source, .. }
            | Edge::Catch { source, .. } => *source,
        }
    }

    pub fn target(&self) -> BlockLabel {
        match self {
            Edge::Fallthrough { target, .. }
            | Edge::Jump { target, .. }
            | Edge::Ret { target, .. }
            | Edge::Switch { target, .. }
            | Edge::Catch { target, .. } => *target,
        }
    }

    /// Evaluation-order precedence (§3): jumps and switches fire first,
    /// then fallthrough, then catch handlers ordered by their own
    /// declared priority. `Ret` is grouped with `Jump`/`Switch` — it's a
    /// taken-branch transition like they are.
    pub fn precedence(&self) -> u32 {
        match self {
            Edge::Jump { .. } | Edge::Switch { .. } | Edge::Ret { .. } => 1,
            Edge::Fallthrough { .. } => 2,
            Edge::Catch { priority, .. } => 3 + priority,
        }
    }
}
