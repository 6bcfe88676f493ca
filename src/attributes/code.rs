//! The `Code` attribute (§3, §4.4, §8 boundary case): a method body's
//! bytecode, exception table, and nested attributes (`LineNumberTable`,
//! `StackMapTable`, ...).

use std::io::{self, Cursor, Write};

use crate::error::{CodecError, Diagnostics};
use crate::instruction::{self, Instruction};
use crate::pool::ConstantPool;
use crate::primitive;
use crate::version::Version;

use super::{read_attribute_list, write_attribute_list, AttributeInfo, Location};

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionHandler {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// `None` is a catch-all, as written by `finally` blocks.
    pub catch: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    /// Offset-keyed, in stream order; the instruction at a given offset is
    /// looked up directly rather than via a separate index.
    pub insns: Vec<(u32, Instruction)>,
    pub handlers: Vec<ExceptionHandler>,
    pub attributes: Vec<AttributeInfo>,
}

impl Code {
    pub fn instruction_at(&self, offset: u32) -> Option<&Instruction> {
        self.insns.iter().find(|(o, _)| *o == offset).map(|(_, insn)| insn)
    }

    /// Total byte length of the instruction stream, i.e. the offset one
    /// past the last instruction.
    pub fn code_length(&self) -> u32 {
        self.insns
            .last()
            .map(|(offset, insn)| offset + insn.size(*offset))
            .unwrap_or(0)
    }
}

pub fn read(
    r: &mut Cursor<&[u8]>,
    pool: &ConstantPool,
    version: Version,
) -> Result<(Code, Diagnostics), CodecError> {
    let mut diagnostics = Diagnostics::new();
    let (max_stack, max_locals, code_length) = if version.uses_legacy_code_layout() {
        (
            primitive::read_u8(r)? as u16,
            primitive::read_u8(r)? as u16,
            primitive::read_u16(r)? as u32,
        )
    } else {
        (primitive::read_u16(r)?, primitive::read_u16(r)?, primitive::read_u32(r)?)
    };

    let code_start = r.position();
    let mut insns = Vec::new();
    while r.position() - code_start < code_length as u64 {
        let offset = (r.position() - code_start) as u32;
        let insn = instruction::read(r, offset)?;
        insns.push((offset, insn));
    }

    let handler_count = primitive::read_u16(r)?;
    let mut handlers = Vec::with_capacity(handler_count as usize);
    for _ in 0..handler_count {
        let start_pc = primitive::read_u16(r)?;
        let end_pc = primitive::read_u16(r)?;
        let handler_pc = primitive::read_u16(r)?;
        let catch_type = primitive::read_u16(r)?;
        handlers.push(ExceptionHandler {
            start_pc,
            end_pc,
            handler_pc,
            catch: if catch_type == 0 { None } else { Some(catch_type) },
        });
    }

    let (attributes, attr_diagnostics) =
        read_attribute_list(r, pool, version, Location::Code)?;
    diagnostics.extend(attr_diagnostics);

    Ok((Code { max_stack, max_locals, insns, handlers, attributes }, diagnostics))
}

pub fn write<W: Write>(w: &mut W, code: &Code, version: Version) -> io::Result<()> {
    if version.uses_legacy_code_layout() {
        primitive::write_u8(w, code.max_stack as u8)?;
        primitive::write_u8(w, code.max_locals as u8)?;
        primitive::write_u16(w, code.code_length() as u16)?;
    } else {
        primitive::write_u16(w, code.max_stack)?;
        primitive::write_u16(w, code.max_locals)?;
        primitive::write_u32(w, code.code_length())?;
    }
    for (offset, insn) in &code.insns {
        instruction::write(w, insn, *offset)?;
    }
    primitive::write_u16(w, code.handlers.len() as u16)?;
    for handler in &code.handlers {
        primitive::write_u16(w, handler.start_pc)?;
        primitive::write_u16(w, handler.end_pc)?;
        primitive::write_u16(w, handler.handler_pc)?;
        primitive::write_u16(w, handler.catch.unwrap_or(0))?;
    }
    write_attribute_list(w, &code.attributes, version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Opcode;
    use crate::pool::ConstantPool;

    #[test]
    fn round_trips_trivial_method_body() {
        let code = Code {
            max_stack: 1,
            max_locals: 1,
            insns: vec![
                (0, Instruction::Simple(Opcode::iconst_0)),
                (1, Instruction::Simple(Opcode::ireturn)),
            ],
            handlers: vec![],
            attributes: vec![],
        };
        let version = Version::new(52, 0);
        let mut buf = Vec::new();
        write(&mut buf, &code, version).unwrap();
        let pool = ConstantPool::new();
        let mut cursor = Cursor::new(buf.as_slice());
        let (read_back, diagnostics) = read(&mut cursor, &pool, version).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(read_back, code);
    }

    #[test]
    fn legacy_layout_used_below_45_3() {
        let code = Code {
            max_stack: 2,
            max_locals: 2,
            insns: vec![(0, Instruction::Simple(Opcode::nop))],
            handlers: vec![],
            attributes: vec![],
        };
        let version = Version::new(45, 2);
        let mut buf = Vec::new();
        write(&mut buf, &code, version).unwrap();
        // legacy header is u8 + u8 + u16 = 4 bytes, not u16+u16+u32 = 8
        assert_eq!(buf[0], 2);
        assert_eq!(buf[1], 2);
    }

    #[test]
    fn exception_handler_zero_catch_type_is_catch_all() {
        let code = Code {
            max_stack: 1,
            max_locals: 1,
            insns: vec![(0, Instruction::Simple(Opcode::return_))],
            handlers: vec![ExceptionHandler { start_pc: 0, end_pc: 1, handler_pc: 1, catch: None }],
            attributes: vec![],
        };
        let version = Version::new(52, 0);
        let mut buf = Vec::new();
        write(&mut buf, &code, version).unwrap();
        let pool = ConstantPool::new();
        let mut cursor = Cursor::new(buf.as_slice());
        let (read_back, _) = read(&mut cursor, &pool, version).unwrap();
        assert_eq!(read_back.handlers[0].catch, None);
    }
}
