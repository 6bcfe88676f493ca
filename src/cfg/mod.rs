//! The control-flow graph builder (§3, §4.6): turns a method's linear
//! bytecode and exception table into blocks connected by typed edges.

pub mod block;
pub mod builder;
pub mod edge;

use std::collections::BTreeMap;

pub use block::{Block, BlockLabel, MutableBlock, TerminatorOwnedByEdge};
pub use edge::Edge;

use crate::attributes::code::Code;
use crate::error::{CodecError, Diagnostics};
use crate::pool::ConstantPool;

/// A disassembled method body: every block reachable from its four
/// reserved labels (`entry`, `return`, `rethrow`, `opaque`), plus the
/// typed edges between them.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    pub blocks: BTreeMap<BlockLabel, Block>,
    pub edges: Vec<Edge>,
}

impl Graph {
    fn empty() -> Self {
        let mut blocks = BTreeMap::new();
        for label in [BlockLabel::ENTRY, BlockLabel::RETURN, BlockLabel::RETHROW, BlockLabel::OPAQUE] {
            blocks.insert(label, MutableBlock::new(label).freeze());
        }
        Graph { blocks, edges: Vec::new() }
    }

    /// Disassembles `code`'s instruction stream and exception table into a
    /// graph. `pool` is consulted only to flag handler class references
    /// that don't resolve — never to drive the block/edge structure itself.
    pub fn disassemble(code: &Code, pool: &ConstantPool) -> Result<(Graph, Diagnostics), CodecError> {
        builder::disassemble(code, pool)
    }

    pub fn block(&self, label: BlockLabel) -> Option<&Block> {
        self.blocks.get(&label)
    }

    pub fn edges_from(&self, label: BlockLabel) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |edge| edge.source() == label)
    }

    pub fn edges_to(&self, label: BlockLabel) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |edge| edge.target() == label)
    }

    /// Edges out of `label`, most-evaluated-first per [`Edge::precedence`].
    pub fn edges_from_ordered(&self, label: BlockLabel) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self.edges_from(label).collect();
        edges.sort_by_key(|edge| edge.precedence());
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::code::Code;
    use crate::instruction::{Instruction, Opcode};

    #[test]
    fn entry_block_has_no_incoming_edges() {
        let code = Code {
            max_stack: 1,
            max_locals: 1,
            insns: vec![(0, Instruction::Simple(Opcode::return_))],
            handlers: vec![],
            attributes: vec![],
        };
        let pool = ConstantPool::new();
        let (graph, _) = Graph::disassemble(&code, &pool).unwrap();
        assert_eq!(graph.edges_to(BlockLabel::ENTRY).count(), 0);
    }

    #[test]
    fn return_block_has_no_outgoing_edges() {
        let code = Code {
            max_stack: 1,
            max_locals: 1,
            insns: vec![(0, Instruction::Simple(Opcode::return_))],
            handlers: vec![],
            attributes: vec![],
        };
        let pool = ConstantPool::new();
        let (graph, _) = Graph::disassemble(&code, &pool).unwrap();
        assert_eq!(graph.edges_from(BlockLabel::RETURN).count(), 0);
    }
}
