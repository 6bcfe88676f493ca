//! Blocks (§3, §4.6 "Mutability"): a labeled, ordered instruction sequence.
//!
//! The builder produces frozen [`Block`]s; callers that want to rewrite a
//! method's body go through [`MutableBlock`], which rejects inserting a
//! jump/switch mid-stream (those only ever live as a block's trailing
//! terminator, reached by the builder through a crate-internal path, not
//! through this validating API).

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use crate::instruction::Instruction;

/// A block's identity. Four values are reserved and fixed across every
/// disassembled method; anything else is assigned ascending from
/// [`BlockLabel::FIRST_ORDINARY`] in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockLabel(pub u32);

impl BlockLabel {
    pub const ENTRY: BlockLabel = BlockLabel(0);
    pub const RETURN: BlockLabel = BlockLabel(1);
    pub const RETHROW: BlockLabel = BlockLabel(2);
    pub const OPAQUE: BlockLabel = BlockLabel(3);
    pub const FIRST_ORDINARY: u32 = 4;

    pub fn is_reserved(self) -> bool {
        self.0 < Self::FIRST_ORDINARY
    }
}

/// Raised by [`MutableBlock`]'s mutators when asked to place a jump or
/// switch instruction somewhere other than the block's own terminator slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminatorOwnedByEdge;

/// A block under construction or rewrite. Holds every instruction the
/// block owns, in order — including its trailing terminator, if any, when
/// produced by the disassembler (see [`Block`] for why the terminator is
/// stored here too rather than only on the outgoing edge).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MutableBlock {
    pub label: Option<BlockLabel>,
    insns: Vec<Instruction>,
}

impl MutableBlock {
    pub fn new(label: BlockLabel) -> Self {
        MutableBlock { label: Some(label), insns: Vec::new() }
    }

    pub fn insns(&self) -> &[Instruction] {
        &self.insns
    }

    fn reject_terminator(insn: &Instruction) -> Result<(), TerminatorOwnedByEdge> {
        if insn.is_jump() || insn.is_switch() {
            Err(TerminatorOwnedByEdge)
        } else {
            Ok(())
        }
    }

    pub fn append(&mut self, insn: Instruction) -> Result<(), TerminatorOwnedByEdge> {
        Self::reject_terminator(&insn)?;
        self.insns.push(insn);
        Ok(())
    }

    pub fn extend<I: IntoIterator<Item = Instruction>>(
        &mut self,
        insns: I,
    ) -> Result<(), TerminatorOwnedByEdge> {
        for insn in insns {
            self.append(insn)?;
        }
        Ok(())
    }

    pub fn insert(&mut self, index: usize, insn: Instruction) -> Result<(), TerminatorOwnedByEdge> {
        Self::reject_terminator(&insn)?;
        self.insns.insert(index, insn);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Instruction {
        self.insns.remove(index)
    }

    pub fn pop(&mut self) -> Option<Instruction> {
        self.insns.pop()
    }

    pub fn clear(&mut self) {
        self.insns.clear();
    }

    /// Pushes an instruction without the terminator check — used only by
    /// the disassembler to place a block's trailing jump/switch/return/
    /// `athrow`/`ret`, which the edge that leaves the block also carries a
    /// copy of (§3's "CFG coverage" invariant: the instruction still
    /// belongs to exactly one block even though an edge labels the
    /// transition with it).
    pub(crate) fn push_raw(&mut self, insn: Instruction) {
        self.insns.push(insn);
    }

    /// Consumes the mutable block, computing its `lt_throws`/`rt_throws`
    /// unions and a structural hash (§5: "Freezing ... consumes the
    /// mutable block's instruction list (move, not share)").
    pub fn freeze(self) -> Block {
        let mut lt_throws = BTreeSet::new();
        let mut rt_throws = BTreeSet::new();
        for insn in &self.insns {
            lt_throws.extend(insn.lt_throws());
            rt_throws.extend(insn.rt_throws());
        }
        let mut hasher = DefaultHasher::new();
        self.label.hash(&mut hasher);
        self.insns.hash(&mut hasher);
        Block {
            label: self.label.expect("frozen block must have a label"),
            insns: self.insns,
            lt_throws,
            rt_throws,
            structural_hash: hasher.finish(),
        }
    }
}

/// An immutable, disassembled block: a label, its instructions (terminator
/// included, if any), and the union of `lt_throws`/`rt_throws` over them.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub label: BlockLabel,
    insns: Vec<Instruction>,
    pub lt_throws: BTreeSet<&'static str>,
    pub rt_throws: BTreeSet<&'static str>,
    structural_hash: u64,
}

impl Block {
    pub fn insns(&self) -> &[Instruction] {
        &self.insns
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    pub fn structural_hash(&self) -> u64 {
        self.structural_hash
    }

    /// Thaws the block back into a [`MutableBlock`] for rewriting.
    pub fn to_mutable(&self) -> MutableBlock {
        MutableBlock { label: Some(self.label), insns: self.insns.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{Instruction, Opcode};

    #[test]
    fn rejects_mid_stream_jump() {
        let mut block = MutableBlock::new(BlockLabel(4));
        let err = block.append(Instruction::Branch { opcode: Opcode::goto_, delta: 3 });
        assert_eq!(err, Err(TerminatorOwnedByEdge));
    }

    #[test]
    fn freeze_unions_throws_and_moves_instructions() {
        let mut block = MutableBlock::new(BlockLabel(4));
        block.append(Instruction::Simple(Opcode::idiv)).unwrap();
        block.append(Instruction::Simple(Opcode::iaload)).unwrap();
        let frozen = block.freeze();
        assert!(frozen.rt_throws.contains("java/lang/ArithmeticException"));
        assert!(frozen.rt_throws.contains("java/lang/NullPointerException"));
        assert_eq!(frozen.insns().len(), 2);
    }

    #[test]
    fn structural_hash_matches_for_equal_blocks() {
        let mut a = MutableBlock::new(BlockLabel(4));
        a.append(Instruction::Simple(Opcode::nop)).unwrap();
        let mut b = MutableBlock::new(BlockLabel(4));
        b.append(Instruction::Simple(Opcode::nop)).unwrap();
        assert_eq!(a.freeze().structural_hash(), b.freeze().structural_hash());
    }
}
