//! `StackMapTable` frames (§4.4): seven frame kinds distinguished by a
//! single tag byte range, each declaring a delta from the previous frame's
//! offset plus a locals/stack adjustment.

use std::io::{self, Cursor, Write};

use crate::primitive;

/// A verification type as it appears in a stack map frame's locals/stack
/// lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    UninitializedThis,
    Object { class_index: u16 },
    Uninitialized { offset: u16 },
}

impl VerificationType {
    /// `Long`/`Double` occupy two local slots; the second is an implicit
    /// `Top` the reader must synthesize when reconstructing explicit
    /// frames from a (possibly truncated) locals list.
    pub fn is_wide(&self) -> bool {
        matches!(self, VerificationType::Long | VerificationType::Double)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Tag 0..63: delta = tag, no locals change, empty stack.
    SameFrame { tag: u8 },
    /// Tag 64..127: delta = tag - 64, one stack item.
    SameLocals1StackItem { tag: u8, stack: VerificationTypeWire },
    /// Tag 247: explicit u16 delta, one stack item.
    SameLocals1StackItemExt { offset_delta: u16, stack: VerificationTypeWire },
    /// Tag 248..250: explicit delta, chops `251 - tag` locals.
    ChopFrame { tag: u8, offset_delta: u16 },
    /// Tag 251: explicit delta, no locals change, empty stack.
    SameFrameExt { offset_delta: u16 },
    /// Tag 252..254: explicit delta, appends `tag - 251` locals.
    AppendFrame { tag: u8, offset_delta: u16, locals: Vec<VerificationTypeWire> },
    /// Tag 255: explicit delta and full locals/stack lists.
    FullFrame {
        offset_delta: u16,
        locals: Vec<VerificationTypeWire>,
        stack: Vec<VerificationTypeWire>,
    },
}

/// `VerificationType` paired with the raw wire tag, so structural equality
/// (and round-trip) doesn't depend on re-deriving the tag from the variant.
pub type VerificationTypeWire = VerificationType;

impl Frame {
    pub fn tag(&self) -> u8 {
        match self {
            Frame::SameFrame { tag } => *tag,
            Frame::SameLocals1StackItem { tag, .. } => *tag,
            Frame::SameLocals1StackItemExt { .. } => 247,
            Frame::ChopFrame { tag, .. } => *tag,
            Frame::SameFrameExt { .. } => 251,
            Frame::AppendFrame { tag, .. } => *tag,
            Frame::FullFrame { .. } => 255,
        }
    }

    pub fn offset_delta(&self) -> u16 {
        match self {
            Frame::SameFrame { tag } => *tag as u16,
            Frame::SameLocals1StackItem { tag, .. } => (*tag - 64) as u16,
            Frame::SameLocals1StackItemExt { offset_delta, .. }
            | Frame::ChopFrame { offset_delta, .. }
            | Frame::SameFrameExt { offset_delta }
            | Frame::AppendFrame { offset_delta, .. }
            | Frame::FullFrame { offset_delta, .. } => *offset_delta,
        }
    }
}

fn read_verification_type(r: &mut Cursor<&[u8]>) -> io::Result<VerificationType> {
    Ok(match primitive::read_u8(r)? {
        0 => VerificationType::Top,
        1 => VerificationType::Integer,
        2 => VerificationType::Float,
        3 => VerificationType::Double,
        4 => VerificationType::Long,
        5 => VerificationType::Null,
        6 => VerificationType::UninitializedThis,
        7 => VerificationType::Object { class_index: primitive::read_u16(r)? },
        8 => VerificationType::Uninitialized { offset: primitive::read_u16(r)? },
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown verification_type_info tag {other}"),
            ))
        }
    })
}

fn write_verification_type<W: Write>(w: &mut W, vt: &VerificationType) -> io::Result<()> {
    match vt {
        VerificationType::Top => primitive::write_u8(w, 0)?,
        VerificationType::Integer => primitive::write_u8(w, 1)?,
        VerificationType::Float => primitive::write_u8(w, 2)?,
        VerificationType::Double => primitive::write_u8(w, 3)?,
        VerificationType::Long => primitive::write_u8(w, 4)?,
        VerificationType::Null => primitive::write_u8(w, 5)?,
        VerificationType::UninitializedThis => primitive::write_u8(w, 6)?,
        VerificationType::Object { class_index } => {
            primitive::write_u8(w, 7)?;
            primitive::write_u16(w, *class_index)?;
        }
        VerificationType::Uninitialized { offset } => {
            primitive::write_u8(w, 8)?;
            primitive::write_u16(w, *offset)?;
        }
    }
    Ok(())
}

pub fn read_frame(r: &mut Cursor<&[u8]>) -> io::Result<Frame> {
    let tag = primitive::read_u8(r)?;
    Ok(match tag {
        0..=63 => Frame::SameFrame { tag },
        64..=127 => Frame::SameLocals1StackItem { tag, stack: read_verification_type(r)? },
        247 => Frame::SameLocals1StackItemExt {
            offset_delta: primitive::read_u16(r)?,
            stack: read_verification_type(r)?,
        },
        248..=250 => Frame::ChopFrame { tag, offset_delta: primitive::read_u16(r)? },
        251 => Frame::SameFrameExt { offset_delta: primitive::read_u16(r)? },
        252..=254 => {
            let offset_delta = primitive::read_u16(r)?;
            let count = (tag - 251) as usize;
            let mut locals = Vec::with_capacity(count);
            for _ in 0..count {
                locals.push(read_verification_type(r)?);
            }
            Frame::AppendFrame { tag, offset_delta, locals }
        }
        255 => {
            let offset_delta = primitive::read_u16(r)?;
            let locals_count = primitive::read_u16(r)?;
            let mut locals = Vec::with_capacity(locals_count as usize);
            for _ in 0..locals_count {
                locals.push(read_verification_type(r)?);
            }
            let stack_count = primitive::read_u16(r)?;
            let mut stack = Vec::with_capacity(stack_count as usize);
            for _ in 0..stack_count {
                stack.push(read_verification_type(r)?);
            }
            Frame::FullFrame { offset_delta, locals, stack }
        }
        128..=246 => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("reserved stack map frame tag {tag}"),
            ))
        }
    })
}

pub fn write_frame<W: Write>(w: &mut W, frame: &Frame) -> io::Result<()> {
    primitive::write_u8(w, frame.tag())?;
    match frame {
        Frame::SameFrame { .. } => {}
        Frame::SameLocals1StackItem { stack, .. } => write_verification_type(w, stack)?,
        Frame::SameLocals1StackItemExt { offset_delta, stack } => {
            primitive::write_u16(w, *offset_delta)?;
            write_verification_type(w, stack)?;
        }
        Frame::ChopFrame { offset_delta, .. } => primitive::write_u16(w, *offset_delta)?,
        Frame::SameFrameExt { offset_delta } => primitive::write_u16(w, *offset_delta)?,
        Frame::AppendFrame { offset_delta, locals, .. } => {
            primitive::write_u16(w, *offset_delta)?;
            for local in locals {
                write_verification_type(w, local)?;
            }
        }
        Frame::FullFrame { offset_delta, locals, stack } => {
            primitive::write_u16(w, *offset_delta)?;
            primitive::write_u16(w, locals.len() as u16)?;
            for local in locals {
                write_verification_type(w, local)?;
            }
            primitive::write_u16(w, stack.len() as u16)?;
            for item in stack {
                write_verification_type(w, item)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(frame: Frame) -> Frame {
        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).unwrap();
        let mut cursor = Cursor::new(buf.as_slice());
        read_frame(&mut cursor).unwrap()
    }

    #[test]
    fn same_frame_round_trips() {
        assert_eq!(round_trip(Frame::SameFrame { tag: 12 }), Frame::SameFrame { tag: 12 });
    }

    #[test]
    fn full_frame_round_trips_with_wide_locals() {
        let frame = Frame::FullFrame {
            offset_delta: 10,
            locals: vec![VerificationType::Long, VerificationType::Object { class_index: 3 }],
            stack: vec![VerificationType::Integer],
        };
        assert_eq!(round_trip(frame.clone()), frame);
    }

    #[test]
    fn chop_frame_delta_matches_tag() {
        let frame = Frame::ChopFrame { tag: 249, offset_delta: 4 };
        assert_eq!(frame.offset_delta(), 4);
        assert_eq!(round_trip(frame.clone()), frame);
    }

    #[test]
    fn append_frame_locals_count_matches_tag_offset() {
        let frame = Frame::AppendFrame {
            tag: 253,
            offset_delta: 1,
            locals: vec![VerificationType::Integer, VerificationType::Float],
        };
        assert_eq!(round_trip(frame.clone()), frame);
    }
}
