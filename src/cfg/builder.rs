//! The disassembler (§4.6): turns a method's linear instruction stream and
//! exception table into a [`Graph`] of [`Block`]s connected by [`Edge`]s.
//!
//! Implemented as the four stages the spec lays out: recompute the offsets
//! that matter (splits/targets), carve the instruction stream into block
//! spans, populate each block and its jump/switch/ret edges, then layer
//! catch edges on top from the exception table.

use std::collections::{BTreeMap, BTreeSet};

use crate::attributes::code::{Code, ExceptionHandler};
use crate::error::{CodecError, Diagnostic, Diagnostics};
use crate::instruction::{Instruction, Opcode};
use crate::pool::{ConstantPool, Entry, Lookup};

use super::block::{Block, BlockLabel, MutableBlock};
use super::edge::Edge;
use super::Graph;

/// `(end_offset, &Instruction)` for every instruction, keyed by its start
/// offset — lets stage 3 and the handler pass find "the instruction
/// starting here" and "its end" without re-walking `code.insns`.
type Spans<'a> = BTreeMap<u32, (u32, &'a Instruction)>;

pub fn disassemble(code: &Code, pool: &ConstantPool) -> Result<(Graph, Diagnostics), CodecError> {
    let mut diagnostics = Diagnostics::new();
    let code_length = code.code_length();

    let mut spans: Spans = BTreeMap::new();
    for (offset, insn) in &code.insns {
        spans.insert(*offset, (offset + insn.size(*offset), insn));
    }

    // --- Stage 1: collect block-boundary offsets. ---------------------
    let mut boundaries: BTreeSet<u32> = BTreeSet::new();
    boundaries.insert(0);
    boundaries.insert(code_length);

    // A boundary with no entry here gets a Fallthrough edge from its
    // predecessor block; §4.6's "split with no prior is a stop".
    let mut stop_after: BTreeSet<u32> = BTreeSet::new();
    // The conditional/`jsr` instruction that produced a given boundary,
    // carried on that boundary's Fallthrough edge as `via_insn`.
    let mut fallthrough_insn: BTreeMap<u32, Instruction> = BTreeMap::new();

    for (&offset, &(end, insn)) in &spans {
        if insn.is_jump() {
            boundaries.insert(end);
            if matches!(insn.opcode(), Opcode::goto_ | Opcode::goto_w) {
                stop_after.insert(end);
            } else {
                // Conditional branch or jsr/jsr_w: falls through too.
                fallthrough_insn.insert(end, insn.clone());
            }
            if let Instruction::Branch { delta, .. } = insn {
                boundaries.insert(branch_target(offset, *delta));
            }
        } else if insn.is_switch() {
            boundaries.insert(end);
            stop_after.insert(end);
            collect_switch_targets(offset, insn, &mut boundaries);
        } else if insn.is_return() || insn.is_athrow() || insn.is_ret() {
            boundaries.insert(end);
            stop_after.insert(end);
        }
    }

    for handler in &code.handlers {
        boundaries.insert(handler.start_pc as u32);
        boundaries.insert(handler.end_pc as u32);
        boundaries.insert(handler.handler_pc as u32);
    }

    for &boundary in &boundaries {
        if boundary != code_length && !spans.contains_key(&boundary) {
            return Err(CodecError::BadSplit { offset: boundary });
        }
    }

    // --- Stage 2: carve block spans, wire fallthrough edges. -----------
    let ordered: Vec<u32> = boundaries.into_iter().collect();
    let mut blocks: BTreeMap<BlockLabel, MutableBlock> = BTreeMap::new();
    let mut edges = Vec::new();
    // (start, end, label) per ordinary block, in ascending offset order.
    let mut spans_by_block: Vec<(u32, u32, BlockLabel)> = Vec::new();
    let mut next_label = BlockLabel::FIRST_ORDINARY;

    for window in ordered.windows(2) {
        let (start, end) = (window[0], window[1]);
        let label = BlockLabel(next_label);
        next_label += 1;
        blocks.insert(label, MutableBlock::new(label));

        if spans_by_block.is_empty() {
            edges.push(Edge::Fallthrough { source: BlockLabel::ENTRY, target: label, via_insn: None });
        } else if !stop_after.contains(&start) {
            let via_insn = fallthrough_insn.get(&start).cloned();
            let prev = spans_by_block.last().unwrap().2;
            edges.push(Edge::Fallthrough { source: prev, target: label, via_insn });
        }
        spans_by_block.push((start, end, label));
    }

    let owner_of = |offset: u32| -> Option<BlockLabel> {
        spans_by_block
            .iter()
            .find(|(start, end, _)| offset >= *start && offset < *end)
            .map(|(_, _, label)| *label)
    };

    // --- Stage 3: populate instructions, jump/switch/ret edges. --------
    for (&offset, &(_, insn)) in &spans {
        let label = owner_of(offset).ok_or(CodecError::BadSplit { offset })?;
        let block = blocks.get_mut(&label).expect("owner_of only returns known labels");

        if insn.is_jump() {
            let Instruction::Branch { delta, .. } = insn else { unreachable!() };
            let target_offset = branch_target(offset, *delta);
            let target = owner_of(target_offset).ok_or(CodecError::BadSplit { offset: target_offset })?;
            block.push_raw(insn.clone());
            edges.push(Edge::Jump { source: label, target, insn: insn.clone() });
        } else if insn.is_switch() {
            block.push_raw(insn.clone());
            for (target_offset, value) in switch_arms(offset, insn) {
                let target = owner_of(target_offset).ok_or(CodecError::BadSplit { offset: target_offset })?;
                edges.push(Edge::Switch { source: label, target, insn: insn.clone(), value });
            }
        } else if insn.is_return() {
            block.push_raw(insn.clone());
            edges.push(Edge::Jump { source: label, target: BlockLabel::RETURN, insn: insn.clone() });
        } else if insn.is_athrow() {
            block.push_raw(insn.clone());
            edges.push(Edge::Jump { source: label, target: BlockLabel::OPAQUE, insn: insn.clone() });
        } else if insn.is_ret() {
            block.push_raw(insn.clone());
            edges.push(Edge::Ret { source: label, target: BlockLabel::OPAQUE, insn: insn.clone() });
        } else {
            block.append(insn.clone()).expect("non-terminator instructions are always appendable");
        }
    }

    // --- Stage 4: exception edges. --------------------------------------
    for (priority, handler) in code.handlers.iter().enumerate() {
        validate_handler_reference(handler, pool, &mut diagnostics);
        let handler_label = owner_of(handler.handler_pc as u32)
            .ok_or(CodecError::BadSplit { offset: handler.handler_pc as u32 })?;
        let (start, end) = (handler.start_pc as u32, handler.end_pc as u32);
        for &(bstart, bend, label) in &spans_by_block {
            if bstart < end && bend > start {
                edges.push(Edge::Catch {
                    source: label,
                    target: handler_label,
                    class: handler.catch,
                    priority: priority as u32,
                });
            }
        }
    }

    let mut graph = Graph::empty();
    for (label, mutable) in blocks {
        graph.blocks.insert(label, mutable.freeze());
    }
    graph.edges = edges;
    Ok((graph, diagnostics))
}

fn branch_target(opcode_offset: u32, delta: i32) -> u32 {
    (opcode_offset as i64 + delta as i64) as u32
}

fn collect_switch_targets(offset: u32, insn: &Instruction, boundaries: &mut BTreeSet<u32>) {
    for (target_offset, _) in switch_arms(offset, insn) {
        boundaries.insert(target_offset);
    }
}

/// Every `(target_offset, case_value)` pair a switch can branch to,
/// `case_value = None` for the default arm — shared by stage 1's target
/// collection and stage 3's edge construction.
fn switch_arms(offset: u32, insn: &Instruction) -> Vec<(u32, Option<i32>)> {
    match insn {
        Instruction::TableSwitch { default, low, offsets, .. } => {
            let mut arms = vec![(branch_target(offset, *default), None)];
            for (i, delta) in offsets.iter().enumerate() {
                arms.push((branch_target(offset, *delta), Some(low + i as i32)));
            }
            arms
        }
        Instruction::LookupSwitch { default, pairs } => {
            let mut arms = vec![(branch_target(offset, *default), None)];
            for (match_value, delta) in pairs {
                arms.push((branch_target(offset, *delta), Some(*match_value)));
            }
            arms
        }
        _ => unreachable!("switch_arms called on a non-switch instruction"),
    }
}

fn validate_handler_reference(handler: &ExceptionHandler, pool: &ConstantPool, diagnostics: &mut Diagnostics) {
    if let Some(class_index) = handler.catch {
        if !matches!(pool.get(class_index), Lookup::Resolved(Entry::Class { .. })) {
            diagnostics.push(Diagnostic::bad_reference(class_index, "Class"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::code::Code;

    fn method(insns: Vec<(u32, Instruction)>, handlers: Vec<ExceptionHandler>) -> Code {
        Code { max_stack: 4, max_locals: 4, insns, handlers, attributes: vec![] }
    }

    /// Blocks the disassembler actually carved out of the instruction
    /// stream, excluding the four fixed entry/return/rethrow/opaque labels
    /// every [`Graph`] carries regardless of method body.
    fn ordinary_blocks(graph: &Graph) -> impl Iterator<Item = (&BlockLabel, &Block)> {
        graph.blocks.iter().filter(|(label, _)| !label.is_reserved())
    }

    /// S2 — `iconst_0, ireturn`.
    #[test]
    fn trivial_method_has_one_block_and_a_return_jump() {
        let code = method(
            vec![(0, Instruction::Simple(Opcode::iconst_0)), (1, Instruction::Simple(Opcode::ireturn))],
            vec![],
        );
        let pool = ConstantPool::new();
        let (graph, diagnostics) = disassemble(&code, &pool).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(ordinary_blocks(&graph).count(), 1);
        let (&label, block) = ordinary_blocks(&graph).next().unwrap();
        assert_eq!(
            block.insns(),
            &[Instruction::Simple(Opcode::iconst_0), Instruction::Simple(Opcode::ireturn)]
        );
        assert!(graph.edges.iter().any(|e| matches!(
            e,
            Edge::Fallthrough { source, target, via_insn: None } if *source == BlockLabel::ENTRY && *target == label
        )));
        assert!(graph.edges.iter().any(|e| matches!(
            e,
            Edge::Jump { source, target, .. } if *source == label && *target == BlockLabel::RETURN
        )));
        assert_eq!(graph.edges.len(), 2);
    }

    /// S3 — `iload_0, ifne <target>, iconst_0, ireturn, iconst_1, ireturn`.
    #[test]
    fn conditional_branch_produces_jump_and_fallthrough() {
        let insns = vec![
            (0, Instruction::Simple(Opcode::iload_0)),
            (1, Instruction::Branch { opcode: Opcode::ifne, delta: 5 }), // 1 + 5 = 6
            (4, Instruction::Simple(Opcode::iconst_0)),
            (5, Instruction::Simple(Opcode::ireturn)),
            (6, Instruction::Simple(Opcode::iconst_1)),
            (7, Instruction::Simple(Opcode::ireturn)),
        ];
        let code = method(insns, vec![]);
        let pool = ConstantPool::new();
        let (graph, diagnostics) = disassemble(&code, &pool).unwrap();
        assert!(diagnostics.is_empty());
        // B0=[iload_0, ifne], B1=[iconst_0, ireturn], B2=[iconst_1, ireturn]
        assert_eq!(ordinary_blocks(&graph).count(), 3);

        let b0 = ordinary_blocks(&graph).find(|(_, b)| !b.is_empty() && b.insns()[0] == Instruction::Simple(Opcode::iload_0)).unwrap().0;
        let b1 = ordinary_blocks(&graph).find(|(_, b)| b.insns().first() == Some(&Instruction::Simple(Opcode::iconst_0))).unwrap().0;
        let b2 = ordinary_blocks(&graph).find(|(_, b)| b.insns().first() == Some(&Instruction::Simple(Opcode::iconst_1))).unwrap().0;

        assert!(graph.edges.iter().any(|e| matches!(e, Edge::Jump { source, target, .. } if source == b0 && target == b2)));
        assert!(graph.edges.iter().any(|e| matches!(e, Edge::Fallthrough { source, target, via_insn: Some(_) } if source == b0 && target == b1)));
        assert!(graph.edges.iter().any(|e| matches!(e, Edge::Jump { source, target, .. } if source == b1 && target == &BlockLabel::RETURN)));
        assert!(graph.edges.iter().any(|e| matches!(e, Edge::Jump { source, target, .. } if source == b2 && target == &BlockLabel::RETURN)));
    }

    /// S4 — `nop, nop, nop, tableswitch` with the switch opcode landing at
    /// offset 3 (zero padding bytes), default and case 0 sharing a target,
    /// case 1 landing on a different one.
    #[test]
    fn tableswitch_targets_become_branch_targets() {
        let insns = vec![
            (0, Instruction::Simple(Opcode::nop)),
            (1, Instruction::Simple(Opcode::nop)),
            (2, Instruction::Simple(Opcode::nop)),
            (3, Instruction::TableSwitch { default: 21, low: 0, high: 1, offsets: vec![21, 22] }),
            (24, Instruction::Simple(Opcode::ireturn)),
            (25, Instruction::Simple(Opcode::ireturn)),
        ];
        let code = method(insns, vec![]);
        let pool = ConstantPool::new();
        let (graph, diagnostics) = disassemble(&code, &pool).unwrap();
        assert!(diagnostics.is_empty());
        let switch_edges: Vec<_> = graph.edges.iter().filter(|e| matches!(e, Edge::Switch { .. })).collect();
        assert_eq!(switch_edges.len(), 3); // default + 2 cases
    }

    /// S5 — a handler covering a single block produces one Catch edge.
    #[test]
    fn exception_handler_produces_catch_edge() {
        let insns = vec![
            (0, Instruction::Simple(Opcode::iconst_0)),
            (1, Instruction::Simple(Opcode::ireturn)),
            (2, Instruction::Simple(Opcode::iconst_1)),
            (3, Instruction::Simple(Opcode::ireturn)),
        ];
        let handlers = vec![ExceptionHandler { start_pc: 0, end_pc: 2, handler_pc: 2, catch: Some(7) }];
        let code = method(insns, handlers);
        let pool = ConstantPool::new();
        let (graph, diagnostics) = disassemble(&code, &pool).unwrap();
        assert!(!diagnostics.is_empty()); // index 7 doesn't resolve in an empty pool
        let catches: Vec<_> = graph.edges.iter().filter(|e| matches!(e, Edge::Catch { .. })).collect();
        assert_eq!(catches.len(), 1);
    }

    /// Jsr pairing (§8 invariant 8): a `jsr`-terminated block gets exactly
    /// a `Jump` to the subroutine and a symbolic `Fallthrough` to the next
    /// instruction.
    #[test]
    fn jsr_produces_jump_and_symbolic_fallthrough() {
        let insns = vec![
            (0, Instruction::Branch { opcode: Opcode::jsr, delta: 4 }), // target = 4
            (3, Instruction::Simple(Opcode::return_)),
            (4, Instruction::LocalIndex { opcode: Opcode::astore, index: 1, mutated: false }),
            (6, Instruction::LocalIndex { opcode: Opcode::ret, index: 1, mutated: false }),
        ];
        let code = method(insns, vec![]);
        let pool = ConstantPool::new();
        let (graph, diagnostics) = disassemble(&code, &pool).unwrap();
        assert!(diagnostics.is_empty());
        let jsr_block = graph
            .blocks
            .iter()
            .find(|(_, b)| b.insns().iter().any(|i| i.is_jsr()))
            .unwrap()
            .0;
        let outgoing: Vec<_> = graph.edges.iter().filter(|e| e.source() == *jsr_block).collect();
        assert_eq!(outgoing.len(), 2);
        assert!(outgoing.iter().any(|e| matches!(e, Edge::Jump { .. })));
        assert!(outgoing.iter().any(|e| matches!(e, Edge::Fallthrough { via_insn: Some(_), .. })));
    }

    #[test]
    fn bad_split_on_jump_into_operand_bytes() {
        let insns = vec![
            (0, Instruction::Branch { opcode: Opcode::goto_, delta: 1 }), // targets offset 1, mid-instruction
        ];
        let code = method(insns, vec![]);
        let pool = ConstantPool::new();
        let err = disassemble(&code, &pool).unwrap_err();
        assert!(matches!(err, CodecError::BadSplit { offset: 1 }));
    }
}
