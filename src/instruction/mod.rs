//! The instruction codec (§4.5): opcode dispatch, operand parsing,
//! switch-table alignment and `wide`-prefix mutation.

pub mod opcode;

use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use crate::error::CodecError;
use crate::primitive;
pub use opcode::Opcode;

/// One decoded instruction. Grouped by operand shape (§9: "shared fields
/// in a header and operand payload per variant") rather than one variant
/// per mnemonic — the `Opcode` carried by every variant is that header.
#[derive(Debug, Clone, PartialEq, Hash)]
pub enum Instruction {
    /// No operand: `nop`, stack manipulators, arithmetic/conversion ops,
    /// array load/store, implicit-index loads/stores (`iload_0`, ...),
    /// `areturn`/`return`/`athrow`/monitor ops.
    Simple(Opcode),
    /// Explicit local-variable index: `iload`, `istore`, `ret` (u8 normally,
    /// u16 under a `wide` prefix).
    LocalIndex { opcode: Opcode, index: u16, mutated: bool },
    /// `bipush i8` / `sipush i16`.
    Push { opcode: Opcode, value: i32 },
    /// `iinc index, delta` (u8/i8 normally, u16/i16 under `wide`).
    Iinc { index: u16, delta: i32, mutated: bool },
    /// A constant-pool reference: `ldc` (u8) or the u16-index family
    /// (`ldc_w`, `ldc2_w`, `new`, `anewarray`, `checkcast`, `instanceof`,
    /// field/method refs, `invokedynamic`'s callsite index).
    ConstRef { opcode: Opcode, index: u16 },
    /// A signed branch delta relative to the instruction's own offset:
    /// `goto`, `jsr`, the `if*` family, and their `_w` wide forms.
    Branch { opcode: Opcode, delta: i32 },
    /// `newarray atype` — atype in 4..=11, mapping to a primitive element
    /// type.
    NewArray { atype: u8 },
    /// `multianewarray class_index, dimensions`.
    MultiANewArray { index: u16, dimensions: u8 },
    /// `invokeinterface methodref, count, 0` — the trailing reserved byte
    /// is preserved verbatim rather than normalized away.
    InvokeInterface { index: u16, count: u8, reserved: u8 },
    /// `invokedynamic callsite, 0, 0` — both trailing bytes are reserved.
    InvokeDynamic { index: u16, reserved: u16 },
    TableSwitch { default: i32, low: i32, high: i32, offsets: Vec<i32> },
    LookupSwitch { default: i32, pairs: Vec<(i32, i32)> },
    /// A `wide`-mutated instruction (`LocalIndex`/`Iinc` with
    /// `mutated = true`) kept distinct so `wide` followed by a
    /// non-mutable opcode can still be represented: that case decodes as
    /// `Instruction::Simple(Opcode::wide)` on its own.
    Wide(Box<Instruction>),
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Simple(op)
            | Instruction::LocalIndex { opcode: op, .. }
            | Instruction::Push { opcode: op, .. }
            | Instruction::ConstRef { opcode: op, .. }
            | Instruction::Branch { opcode: op, .. } => *op,
            Instruction::Iinc { .. } => Opcode::iinc,
            Instruction::NewArray { .. } => Opcode::newarray,
            Instruction::MultiANewArray { .. } => Opcode::multianewarray,
            Instruction::InvokeInterface { .. } => Opcode::invokeinterface,
            Instruction::InvokeDynamic { .. } => Opcode::invokedynamic,
            Instruction::TableSwitch { .. } => Opcode::tableswitch,
            Instruction::LookupSwitch { .. } => Opcode::lookupswitch,
            Instruction::Wide(inner) => inner.opcode(),
        }
    }

    /// True for `goto`/`jsr`/`if*` and their wide forms — the CFG builder
    /// treats these as jump-producing (§4.6 stage 1/3).
    pub fn is_jump(&self) -> bool {
        matches!(self, Instruction::Branch { .. })
    }

    pub fn is_switch(&self) -> bool {
        matches!(self, Instruction::TableSwitch { .. } | Instruction::LookupSwitch { .. })
    }

    pub fn is_ret(&self) -> bool {
        matches!(self.opcode(), Opcode::ret)
    }

    pub fn is_return(&self) -> bool {
        matches!(
            self.opcode(),
            Opcode::ireturn
                | Opcode::lreturn
                | Opcode::freturn
                | Opcode::dreturn
                | Opcode::areturn
                | Opcode::return_
        )
    }

    pub fn is_athrow(&self) -> bool {
        matches!(self.opcode(), Opcode::athrow)
    }

    /// True when the opcode unconditionally transfers control (so it has
    /// no fallthrough successor): `goto`/`goto_w`, any return, `athrow`,
    /// `ret`, or a switch.
    pub fn is_unconditional_terminator(&self) -> bool {
        matches!(self.opcode(), Opcode::goto_ | Opcode::goto_w)
            || self.is_return()
            || self.is_athrow()
            || self.is_ret()
            || self.is_switch()
    }

    pub fn is_jsr(&self) -> bool {
        matches!(self.opcode(), Opcode::jsr | Opcode::jsr_w)
    }

    /// Exception classes this instruction's *resolution* can raise (§3's
    /// `lt_throws` flag) — distinct from the exceptions the interpreted
    /// form can raise at `rt_throws`. Grounded in the JVM specification's
    /// per-instruction "Run-time Exceptions" tables: anything that forces
    /// a symbolic-reference resolution (a field/method/class lookup) can
    /// fail at link time with a `LinkageError` subtype.
    pub fn lt_throws(&self) -> &'static [&'static str] {
        use Opcode::*;
        match self.opcode() {
            new | anewarray | checkcast | instanceof | multianewarray => {
                &["java/lang/NoClassDefFoundError"]
            }
            getfield | putfield => {
                &["java/lang/NoSuchFieldError", "java/lang/IncompatibleClassChangeError"]
            }
            getstatic | putstatic => {
                &["java/lang/NoSuchFieldError", "java/lang/IncompatibleClassChangeError"]
            }
            invokevirtual | invokespecial => {
                &["java/lang/NoSuchMethodError", "java/lang/AbstractMethodError", "java/lang/IncompatibleClassChangeError"]
            }
            invokestatic => &["java/lang/NoSuchMethodError", "java/lang/IncompatibleClassChangeError"],
            invokeinterface => {
                &["java/lang/NoSuchMethodError", "java/lang/AbstractMethodError", "java/lang/IncompatibleClassChangeError"]
            }
            invokedynamic => &["java/lang/BootstrapMethodError"],
            ldc | ldc_w | ldc2_w => &["java/lang/NoClassDefFoundError"],
            _ => &[],
        }
    }

    /// Exception classes this instruction's *execution* can raise at
    /// runtime (§3's `rt_throws` flag), again grounded in the JVM
    /// specification's per-opcode "Run-time Exceptions" list.
    pub fn rt_throws(&self) -> &'static [&'static str] {
        use Opcode::*;
        match self.opcode() {
            idiv | ldiv | irem | lrem => &["java/lang/ArithmeticException"],
            iaload | laload | faload | daload | aaload | baload | caload | saload => {
                &["java/lang/NullPointerException", "java/lang/ArrayIndexOutOfBoundsException"]
            }
            iastore | lastore | fastore | dastore | bastore | castore | sastore => {
                &["java/lang/NullPointerException", "java/lang/ArrayIndexOutOfBoundsException"]
            }
            aastore => &[
                "java/lang/NullPointerException",
                "java/lang/ArrayIndexOutOfBoundsException",
                "java/lang/ArrayStoreException",
            ],
            arraylength => &["java/lang/NullPointerException"],
            checkcast => &["java/lang/ClassCastException"],
            newarray | anewarray | multianewarray => &["java/lang/NegativeArraySizeException"],
            getfield | putfield => &["java/lang/NullPointerException"],
            invokevirtual | invokespecial | invokeinterface => &["java/lang/NullPointerException"],
            monitorenter | monitorexit => &["java/lang/NullPointerException"],
            athrow => &["java/lang/NullPointerException"],
            _ => &[],
        }
    }

    /// Byte length of this instruction when (re)written at `offset` — the
    /// tableswitch/lookupswitch alignment depends on where the opcode byte
    /// itself lands.
    pub fn size(&self, offset: u32) -> u32 {
        match self {
            Instruction::Simple(_) => 1,
            Instruction::LocalIndex { mutated, .. } => if *mutated { 4 } else { 2 },
            Instruction::Push { opcode: Opcode::bipush, .. } => 2,
            Instruction::Push { .. } => 3,
            Instruction::Iinc { mutated, .. } => if *mutated { 6 } else { 3 },
            Instruction::ConstRef { opcode: Opcode::ldc, .. } => 2,
            Instruction::ConstRef { .. } => 3,
            Instruction::Branch { opcode: Opcode::goto_w | Opcode::jsr_w, .. } => 5,
            Instruction::Branch { .. } => 3,
            Instruction::NewArray { .. } => 2,
            Instruction::MultiANewArray { .. } => 4,
            Instruction::InvokeInterface { .. } => 5,
            Instruction::InvokeDynamic { .. } => 5,
            Instruction::TableSwitch { offsets, .. } => {
                1 + padding(offset) + 12 + 4 * offsets.len() as u32
            }
            Instruction::LookupSwitch { pairs, .. } => {
                1 + padding(offset) + 8 + 8 * pairs.len() as u32
            }
            Instruction::Wide(inner) => inner.size(offset),
        }
    }
}

/// Bare mnemonic-plus-operand rendering, with no constant-pool resolution
/// (a disassembler wanting `#7 // Method foo:()V`-style comments resolves
/// the pool reference itself and appends it after this).
impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Simple(op) => write!(f, "{}", op.mnemonic()),
            Instruction::LocalIndex { opcode, index, .. } => write!(f, "{} {index}", opcode.mnemonic()),
            Instruction::Push { opcode, value } => write!(f, "{} {value}", opcode.mnemonic()),
            Instruction::Iinc { index, delta, .. } => write!(f, "iinc {index}, {delta}"),
            Instruction::ConstRef { opcode, index } => write!(f, "{} #{index}", opcode.mnemonic()),
            Instruction::Branch { opcode, delta } => write!(f, "{} {delta:+}", opcode.mnemonic()),
            Instruction::NewArray { atype } => write!(f, "newarray {}", atype_name(*atype)),
            Instruction::MultiANewArray { index, dimensions } => {
                write!(f, "multianewarray #{index}, {dimensions}")
            }
            Instruction::InvokeInterface { index, count, .. } => {
                write!(f, "invokeinterface #{index}, {count}")
            }
            Instruction::InvokeDynamic { index, .. } => write!(f, "invokedynamic #{index}"),
            Instruction::TableSwitch { default, low, offsets, .. } => {
                write!(f, "tableswitch {{ default: {default}")?;
                for (i, offset) in offsets.iter().enumerate() {
                    write!(f, ", {}: {offset:+}", low + i as i32)?;
                }
                write!(f, " }}")
            }
            Instruction::LookupSwitch { default, pairs } => {
                write!(f, "lookupswitch {{ default: {default}")?;
                for (value, offset) in pairs {
                    write!(f, ", {value}: {offset:+}")?;
                }
                write!(f, " }}")
            }
            Instruction::Wide(inner) => write!(f, "wide {inner}"),
        }
    }
}

/// The primitive element type named by a `newarray` `atype` byte (4..=11).
fn atype_name(atype: u8) -> &'static str {
    match atype {
        4 => "boolean",
        5 => "char",
        6 => "float",
        7 => "double",
        8 => "byte",
        9 => "short",
        10 => "int",
        11 => "long",
        _ => "unknown",
    }
}

/// Padding bytes before a switch's aligned operand table: `(4 - (offset+1)
/// mod 4) mod 4`, counted from the opcode's own offset.
fn padding(opcode_offset: u32) -> u32 {
    (4 - (opcode_offset + 1) % 4) % 4
}

const MUTATED_OPCODES: &[Opcode] = &[
    Opcode::iload,
    Opcode::lload,
    Opcode::fload,
    Opcode::dload,
    Opcode::aload,
    Opcode::istore,
    Opcode::lstore,
    Opcode::fstore,
    Opcode::dstore,
    Opcode::astore,
    Opcode::ret,
];

/// Reads one instruction at the current stream position. `offset` is the
/// opcode byte's position in the method, needed for switch-table padding.
/// Takes a `Cursor<&[u8]>` rather than a generic `Read` because the `wide`
/// standalone case (§4.5) needs to rewind one byte.
pub fn read(r: &mut Cursor<&[u8]>, offset: u32) -> Result<Instruction, CodecError> {
    let byte = primitive::read_u8(r)?;
    let opcode = Opcode::from_u8(byte).ok_or(CodecError::BadOpcode { offset, opcode: byte })?;
    read_opcode(r, opcode, offset)
}

fn read_opcode(r: &mut Cursor<&[u8]>, opcode: Opcode, offset: u32) -> Result<Instruction, CodecError> {
    use Opcode::*;
    Ok(match opcode {
        Opcode::wide => {
            let inner_byte = primitive::read_u8(r)?;
            let inner_opcode = Opcode::from_u8(inner_byte)
                .ok_or(CodecError::BadOpcode { offset: offset + 1, opcode: inner_byte })?;
            if MUTATED_OPCODES.contains(&inner_opcode) {
                Instruction::Wide(Box::new(read_mutated(r, inner_opcode)?))
            } else {
                // No mutated form for this opcode: `wide` stands alone and
                // the stream is left positioned before `inner_opcode`'s byte
                // so the caller re-reads it as the next instruction.
                r.seek(SeekFrom::Current(-1))?;
                Instruction::Simple(Opcode::wide)
            }
        }
        iload | lload | fload | dload | aload | istore | lstore | fstore | dstore | astore | ret => {
            Instruction::LocalIndex { opcode, index: primitive::read_u8(r)? as u16, mutated: false }
        }
        iload_0 | iload_1 | iload_2 | iload_3 | lload_0 | lload_1 | lload_2 | lload_3 | fload_0
        | fload_1 | fload_2 | fload_3 | dload_0 | dload_1 | dload_2 | dload_3 | aload_0 | aload_1
        | aload_2 | aload_3 | istore_0 | istore_1 | istore_2 | istore_3 | lstore_0 | lstore_1
        | lstore_2 | lstore_3 | fstore_0 | fstore_1 | fstore_2 | fstore_3 | dstore_0 | dstore_1
        | dstore_2 | dstore_3 | astore_0 | astore_1 | astore_2 | astore_3 | nop | aconst_null
        | iconst_m1 | iconst_0 | iconst_1 | iconst_2 | iconst_3 | iconst_4 | iconst_5 | lconst_0
        | lconst_1 | fconst_0 | fconst_1 | fconst_2 | dconst_0 | dconst_1 | iaload | laload
        | faload | daload | aaload | baload | caload | saload | iastore | lastore | fastore
        | dastore | aastore | bastore | castore | sastore | pop | pop2 | dup | dup_x1 | dup_x2
        | dup2 | dup2_x1 | dup2_x2 | swap | iadd | ladd | fadd | dadd | isub | lsub | fsub | dsub
        | imul | lmul | fmul | dmul | idiv | ldiv | fdiv | ddiv | irem | lrem | frem | drem
        | ineg | lneg | fneg | dneg | ishl | lshl | ishr | lshr | iushr | lushr | iand | land
        | ior | lor | ixor | lxor | i2l | i2f | i2d | l2i | l2f | l2d | f2i | f2l | f2d | d2i
        | d2l | d2f | i2b | i2c | i2s | lcmp | fcmpl | fcmpg | dcmpl | dcmpg | ireturn | lreturn
        | freturn | dreturn | areturn | return_ | arraylength | athrow | monitorenter
        | monitorexit | breakpoint | impdep1 | impdep2 => Instruction::Simple(opcode),
        bipush => Instruction::Push { opcode, value: primitive::read_u8(r)? as i8 as i32 },
        sipush => Instruction::Push { opcode, value: primitive::read_i16(r)? as i32 },
        Opcode::iinc => Instruction::Iinc {
            index: primitive::read_u8(r)? as u16,
            delta: primitive::read_u8(r)? as i8 as i32,
            mutated: false,
        },
        ldc => Instruction::ConstRef { opcode, index: primitive::read_u8(r)? as u16 },
        ldc_w | ldc2_w | new | anewarray | checkcast | instanceof | getstatic | putstatic
        | getfield | putfield | invokevirtual | invokespecial | invokestatic => {
            Instruction::ConstRef { opcode, index: primitive::read_u16(r)? }
        }
        goto_ | jsr | ifeq | ifne | iflt | ifge | ifgt | ifle | if_icmpeq | if_icmpne
        | if_icmplt | if_icmpge | if_icmpgt | if_icmple | if_acmpeq | if_acmpne | ifnull
        | ifnonnull => Instruction::Branch { opcode, delta: primitive::read_i16(r)? as i32 },
        goto_w | jsr_w => Instruction::Branch { opcode, delta: primitive::read_i32(r)? },
        Opcode::newarray => Instruction::NewArray { atype: primitive::read_u8(r)? },
        Opcode::multianewarray => Instruction::MultiANewArray {
            index: primitive::read_u16(r)?,
            dimensions: primitive::read_u8(r)?,
        },
        Opcode::invokeinterface => Instruction::InvokeInterface {
            index: primitive::read_u16(r)?,
            count: primitive::read_u8(r)?,
            reserved: primitive::read_u8(r)?,
        },
        Opcode::invokedynamic => {
            Instruction::InvokeDynamic { index: primitive::read_u16(r)?, reserved: primitive::read_u16(r)? }
        }
        Opcode::tableswitch => {
            skip_padding(r, offset)?;
            let default = primitive::read_i32(r)?;
            let low = primitive::read_i32(r)?;
            let high = primitive::read_i32(r)?;
            let count = (high - low + 1).max(0) as usize;
            let mut offsets = Vec::with_capacity(count);
            for _ in 0..count {
                offsets.push(primitive::read_i32(r)?);
            }
            Instruction::TableSwitch { default, low, high, offsets }
        }
        Opcode::lookupswitch => {
            skip_padding(r, offset)?;
            let default = primitive::read_i32(r)?;
            let npairs = primitive::read_i32(r)?.max(0) as usize;
            let mut pairs = Vec::with_capacity(npairs);
            for _ in 0..npairs {
                let m = primitive::read_i32(r)?;
                let o = primitive::read_i32(r)?;
                pairs.push((m, o));
            }
            Instruction::LookupSwitch { default, pairs }
        }
    })
}

/// Reads the widened operand form after a `wide` prefix for an opcode
/// known to be in [`MUTATED_OPCODES`].
fn read_mutated<R: Read>(r: &mut R, opcode: Opcode) -> Result<Instruction, CodecError> {
    Ok(if opcode == Opcode::iinc {
        Instruction::Iinc { index: primitive::read_u16(r)?, delta: primitive::read_i16(r)? as i32, mutated: true }
    } else {
        Instruction::LocalIndex { opcode, index: primitive::read_u16(r)?, mutated: true }
    })
}

fn skip_padding<R: Read>(r: &mut R, opcode_offset: u32) -> io::Result<()> {
    let mut pad = vec![0u8; padding(opcode_offset) as usize];
    r.read_exact(&mut pad)
}

/// Writes one instruction at `offset` (needed for switch padding).
pub fn write<W: Write>(w: &mut W, insn: &Instruction, offset: u32) -> io::Result<()> {
    match insn {
        Instruction::Simple(op) => primitive::write_u8(w, *op as u8)?,
        Instruction::LocalIndex { opcode, index, mutated } => {
            if *mutated {
                primitive::write_u8(w, Opcode::wide as u8)?;
                primitive::write_u8(w, *opcode as u8)?;
                primitive::write_u16(w, *index)?;
            } else {
                primitive::write_u8(w, *opcode as u8)?;
                primitive::write_u8(w, *index as u8)?;
            }
        }
        Instruction::Push { opcode, value } => {
            primitive::write_u8(w, *opcode as u8)?;
            if *opcode == Opcode::bipush {
                primitive::write_u8(w, *value as i8 as u8)?;
            } else {
                primitive::write_i16(w, *value as i16)?;
            }
        }
        Instruction::Iinc { index, delta, mutated } => {
            if *mutated {
                primitive::write_u8(w, Opcode::wide as u8)?;
                primitive::write_u8(w, Opcode::iinc as u8)?;
                primitive::write_u16(w, *index)?;
                primitive::write_i16(w, *delta as i16)?;
            } else {
                primitive::write_u8(w, Opcode::iinc as u8)?;
                primitive::write_u8(w, *index as u8)?;
                primitive::write_u8(w, *delta as i8 as u8)?;
            }
        }
        Instruction::ConstRef { opcode, index } => {
            primitive::write_u8(w, *opcode as u8)?;
            if *opcode == Opcode::ldc {
                primitive::write_u8(w, *index as u8)?;
            } else {
                primitive::write_u16(w, *index)?;
            }
        }
        Instruction::Branch { opcode, delta } => {
            primitive::write_u8(w, *opcode as u8)?;
            if matches!(opcode, Opcode::goto_w | Opcode::jsr_w) {
                primitive::write_i32(w, *delta)?;
            } else {
                primitive::write_i16(w, *delta as i16)?;
            }
        }
        Instruction::NewArray { atype } => {
            primitive::write_u8(w, Opcode::newarray as u8)?;
            primitive::write_u8(w, *atype)?;
        }
        Instruction::MultiANewArray { index, dimensions } => {
            primitive::write_u8(w, Opcode::multianewarray as u8)?;
            primitive::write_u16(w, *index)?;
            primitive::write_u8(w, *dimensions)?;
        }
        Instruction::InvokeInterface { index, count, reserved } => {
            primitive::write_u8(w, Opcode::invokeinterface as u8)?;
            primitive::write_u16(w, *index)?;
            primitive::write_u8(w, *count)?;
            primitive::write_u8(w, *reserved)?;
        }
        Instruction::InvokeDynamic { index, reserved } => {
            primitive::write_u8(w, Opcode::invokedynamic as u8)?;
            primitive::write_u16(w, *index)?;
            primitive::write_u16(w, *reserved)?;
        }
        Instruction::TableSwitch { default, low, high, offsets } => {
            primitive::write_u8(w, Opcode::tableswitch as u8)?;
            write_padding(w, offset)?;
            primitive::write_i32(w, *default)?;
            primitive::write_i32(w, *low)?;
            primitive::write_i32(w, *high)?;
            for o in offsets {
                primitive::write_i32(w, *o)?;
            }
        }
        Instruction::LookupSwitch { default, pairs } => {
            primitive::write_u8(w, Opcode::lookupswitch as u8)?;
            write_padding(w, offset)?;
            primitive::write_i32(w, *default)?;
            primitive::write_i32(w, pairs.len() as i32)?;
            for (m, o) in pairs {
                primitive::write_i32(w, *m)?;
                primitive::write_i32(w, *o)?;
            }
        }
        Instruction::Wide(inner) => write(w, inner, offset)?,
    }
    Ok(())
}

fn write_padding<W: Write>(w: &mut W, opcode_offset: u32) -> io::Result<()> {
    let pad = vec![0u8; padding(opcode_offset) as usize];
    w.write_all(&pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use std::io::Cursor;

    /// A handful of fixed-size instruction shapes, for a round-trip property
    /// test — switch variants are excluded since their size depends on the
    /// offset they're written at, which this generator doesn't model.
    #[derive(Debug, Clone)]
    struct FixedSizeInsn(Instruction);

    impl Arbitrary for FixedSizeInsn {
        fn arbitrary(g: &mut Gen) -> Self {
            let shape = u8::arbitrary(g) % 5;
            FixedSizeInsn(match shape {
                0 => Instruction::Simple(Opcode::nop),
                1 => Instruction::Push { opcode: Opcode::sipush, value: i16::arbitrary(g) as i32 },
                2 => Instruction::LocalIndex { opcode: Opcode::iload, index: u8::arbitrary(g) as u16, mutated: false },
                3 => Instruction::Iinc {
                    index: u8::arbitrary(g) as u16,
                    delta: i8::arbitrary(g) as i32,
                    mutated: false,
                },
                _ => Instruction::ConstRef { opcode: Opcode::getstatic, index: u16::arbitrary(g) },
            })
        }
    }

    #[quickcheck]
    fn instruction_round_trips_through_bytes(insn: FixedSizeInsn) -> bool {
        let mut buf = Vec::new();
        write(&mut buf, &insn.0, 0).unwrap();
        let mut cursor = Cursor::new(buf.as_slice());
        read(&mut cursor, 0).unwrap() == insn.0
    }

    fn round_trip(insn: Instruction, offset: u32) -> Instruction {
        let mut buf = Vec::new();
        write(&mut buf, &insn, offset).unwrap();
        assert_eq!(buf.len() as u32, insn.size(offset));
        let mut cursor = Cursor::new(buf.as_slice());
        read(&mut cursor, offset).unwrap()
    }

    #[test]
    fn simple_instruction_round_trips() {
        let insn = Instruction::Simple(Opcode::iconst_0);
        assert_eq!(round_trip(insn.clone(), 0), insn);
    }

    #[test]
    fn bipush_round_trips_negative_value() {
        let insn = Instruction::Push { opcode: Opcode::bipush, value: -5 };
        assert_eq!(round_trip(insn.clone(), 0), insn);
    }

    #[test]
    fn local_index_round_trips() {
        let insn = Instruction::LocalIndex { opcode: Opcode::iload, index: 200, mutated: false };
        assert_eq!(round_trip(insn.clone(), 0), insn);
    }

    #[test]
    fn wide_mutated_iinc_round_trips() {
        let insn = Instruction::Wide(Box::new(Instruction::Iinc { index: 300, delta: -1000, mutated: true }));
        assert_eq!(round_trip(insn.clone(), 0), insn);
    }

    #[test]
    fn invokeinterface_preserves_reserved_byte() {
        let insn = Instruction::InvokeInterface { index: 7, count: 2, reserved: 0 };
        assert_eq!(round_trip(insn.clone(), 0), insn);
    }

    #[test]
    fn tableswitch_padding_boundary_cases() {
        assert_eq!(padding(0), 3);
        assert_eq!(padding(3), 0);
        assert_eq!(padding(2), 1);
    }

    #[test]
    fn tableswitch_round_trips_with_alignment() {
        let insn = Instruction::TableSwitch { default: 12, low: 0, high: 1, offsets: vec![16, 20] };
        assert_eq!(round_trip(insn.clone(), 3), insn);
    }

    #[test]
    fn lookupswitch_round_trips() {
        let insn = Instruction::LookupSwitch { default: 20, pairs: vec![(0, 12), (1, 16)] };
        assert_eq!(round_trip(insn.clone(), 0), insn);
    }

    #[test]
    fn unknown_opcode_is_fatal() {
        let bytes = [0xCBu8];
        let mut cursor = Cursor::new(&bytes[..]);
        let err = read(&mut cursor, 0).unwrap_err();
        assert!(matches!(err, CodecError::BadOpcode { opcode: 0xCB, .. }));
    }

    #[test]
    fn wide_followed_by_non_mutable_opcode_stands_alone() {
        let bytes = [Opcode::wide as u8, Opcode::nop as u8];
        let mut cursor = Cursor::new(&bytes[..]);
        let first = read(&mut cursor, 0).unwrap();
        assert_eq!(first, Instruction::Simple(Opcode::wide));
        let second = read(&mut cursor, 1).unwrap();
        assert_eq!(second, Instruction::Simple(Opcode::nop));
    }

    #[test]
    fn display_renders_mnemonic_and_operand() {
        let insn = Instruction::ConstRef { opcode: Opcode::invokevirtual, index: 12 };
        assert_eq!(insn.to_string(), "invokevirtual #12");
        let branch = Instruction::Branch { opcode: Opcode::goto_, delta: -4 };
        assert_eq!(branch.to_string(), "goto -4");
    }
}
