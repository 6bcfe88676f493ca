//! Annotation payloads shared by the `RuntimeVisible/InvisibleAnnotations`,
//! parameter-annotation, type-annotation, and `AnnotationDefault`
//! attributes (§4.4). Treated as opaque data by the CFG core — nothing
//! here interprets the referenced UTF8s as Java source types.

use std::io::{self, Cursor, Write};

use crate::primitive;

/// One `name => value` pair inside an annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub type_index: u16,
    pub elements: Vec<(u16, ElementValue)>,
}

/// A tagged sum keyed by the one-byte ASCII tag from §4.4: primitive
/// constants (`BCDFIJSZ`), `s` string, `e` enum constant, `c` class, `@`
/// nested annotation, `[` array.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Const { tag: u8, const_value_index: u16 },
    Enum { type_name_index: u16, const_name_index: u16 },
    Class { class_info_index: u16 },
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

/// One segment of a `TypePath`: a type-path kind byte plus a type-argument
/// index (only meaningful for kind 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypePathSegment {
    pub kind: u8,
    pub type_argument_index: u8,
}

/// The ten `target_info` shapes a `TypeAnnotation` can carry, keyed by the
/// target-kind byte that precedes them in the stream. Several shapes are
/// shared by more than one `target_kind` value (e.g. `0x00`/`0x01` both
/// decode to `TypeParameter`); `kind` carries the byte actually read so
/// `write_type_annotation` round-trips it rather than normalizing to one
/// fixed member of the pair.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetInfo {
    TypeParameter { kind: u8, index: u8 },
    Supertype { index: u16 },
    TypeParameterBound { kind: u8, type_parameter_index: u8, bound_index: u8 },
    Empty { kind: u8 },
    FormalParameter { index: u8 },
    Throws { index: u16 },
    LocalVar { kind: u8, table: Vec<LocalVarTargetEntry> },
    Catch { index: u16 },
    Offset { kind: u8, offset: u16 },
    TypeArgument { kind: u8, offset: u16, index: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVarTargetEntry {
    pub start_pc: u16,
    pub length: u16,
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnnotation {
    pub target_info: TargetInfo,
    pub type_path: Vec<TypePathSegment>,
    pub annotation: Annotation,
}

pub fn read_annotation(r: &mut Cursor<&[u8]>) -> io::Result<Annotation> {
    let type_index = primitive::read_u16(r)?;
    let count = primitive::read_u16(r)?;
    let mut elements = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name_index = primitive::read_u16(r)?;
        let value = read_element_value(r)?;
        elements.push((name_index, value));
    }
    Ok(Annotation { type_index, elements })
}

pub fn write_annotation<W: Write>(w: &mut W, annotation: &Annotation) -> io::Result<()> {
    primitive::write_u16(w, annotation.type_index)?;
    primitive::write_u16(w, annotation.elements.len() as u16)?;
    for (name_index, value) in &annotation.elements {
        primitive::write_u16(w, *name_index)?;
        write_element_value(w, value)?;
    }
    Ok(())
}

/// An `AnnotationDefault` attribute's body is a single bare `element_value`.
pub fn read_element_value(r: &mut Cursor<&[u8]>) -> io::Result<ElementValue> {
    let tag = primitive::read_u8(r)?;
    Ok(match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => {
            ElementValue::Const { tag, const_value_index: primitive::read_u16(r)? }
        }
        b'e' => ElementValue::Enum {
            type_name_index: primitive::read_u16(r)?,
            const_name_index: primitive::read_u16(r)?,
        },
        b'c' => ElementValue::Class { class_info_index: primitive::read_u16(r)? },
        b'@' => ElementValue::Annotation(Box::new(read_annotation(r)?)),
        b'[' => {
            let count = primitive::read_u16(r)?;
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                values.push(read_element_value(r)?);
            }
            ElementValue::Array(values)
        }
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown element_value tag {other:#04X}"),
            ))
        }
    })
}

pub fn write_element_value<W: Write>(w: &mut W, value: &ElementValue) -> io::Result<()> {
    match value {
        ElementValue::Const { tag, const_value_index } => {
            primitive::write_u8(w, *tag)?;
            primitive::write_u16(w, *const_value_index)?;
        }
        ElementValue::Enum { type_name_index, const_name_index } => {
            primitive::write_u8(w, b'e')?;
            primitive::write_u16(w, *type_name_index)?;
            primitive::write_u16(w, *const_name_index)?;
        }
        ElementValue::Class { class_info_index } => {
            primitive::write_u8(w, b'c')?;
            primitive::write_u16(w, *class_info_index)?;
        }
        ElementValue::Annotation(annotation) => {
            primitive::write_u8(w, b'@')?;
            write_annotation(w, annotation)?;
        }
        ElementValue::Array(values) => {
            primitive::write_u8(w, b'[')?;
            primitive::write_u16(w, values.len() as u16)?;
            for value in values {
                write_element_value(w, value)?;
            }
        }
    }
    Ok(())
}

pub fn read_type_annotation(r: &mut Cursor<&[u8]>) -> io::Result<TypeAnnotation> {
    let target_kind = primitive::read_u8(r)?;
    let target_info = match target_kind {
        0x00 | 0x01 => TargetInfo::TypeParameter { kind: target_kind, index: primitive::read_u8(r)? },
        0x10 => TargetInfo::Supertype { index: primitive::read_u16(r)? },
        0x11 | 0x12 => TargetInfo::TypeParameterBound {
            kind: target_kind,
            type_parameter_index: primitive::read_u8(r)?,
            bound_index: primitive::read_u8(r)?,
        },
        0x13 | 0x14 | 0x15 => TargetInfo::Empty { kind: target_kind },
        0x16 => TargetInfo::FormalParameter { index: primitive::read_u8(r)? },
        0x17 => TargetInfo::Throws { index: primitive::read_u16(r)? },
        0x40 | 0x41 => {
            let count = primitive::read_u16(r)?;
            let mut table = Vec::with_capacity(count as usize);
            for _ in 0..count {
                table.push(LocalVarTargetEntry {
                    start_pc: primitive::read_u16(r)?,
                    length: primitive::read_u16(r)?,
                    index: primitive::read_u16(r)?,
                });
            }
            TargetInfo::LocalVar { kind: target_kind, table }
        }
        0x42 => TargetInfo::Catch { index: primitive::read_u16(r)? },
        0x43 | 0x44 | 0x45 | 0x46 => {
            TargetInfo::Offset { kind: target_kind, offset: primitive::read_u16(r)? }
        }
        0x47 | 0x48 | 0x49 | 0x4A | 0x4B => TargetInfo::TypeArgument {
            kind: target_kind,
            offset: primitive::read_u16(r)?,
            index: primitive::read_u8(r)?,
        },
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown type annotation target_kind {other:#04X}"),
            ))
        }
    };
    let path_length = primitive::read_u8(r)?;
    let mut type_path = Vec::with_capacity(path_length as usize);
    for _ in 0..path_length {
        type_path.push(TypePathSegment {
            kind: primitive::read_u8(r)?,
            type_argument_index: primitive::read_u8(r)?,
        });
    }
    let annotation = read_annotation(r)?;
    Ok(TypeAnnotation { target_info, type_path, annotation })
}

pub fn write_type_annotation<W: Write>(w: &mut W, ta: &TypeAnnotation) -> io::Result<()> {
    match &ta.target_info {
        TargetInfo::TypeParameter { kind, index } => {
            primitive::write_u8(w, *kind)?;
            primitive::write_u8(w, *index)?;
        }
        TargetInfo::Supertype { index } => {
            primitive::write_u8(w, 0x10)?;
            primitive::write_u16(w, *index)?;
        }
        TargetInfo::TypeParameterBound { kind, type_parameter_index, bound_index } => {
            primitive::write_u8(w, *kind)?;
            primitive::write_u8(w, *type_parameter_index)?;
            primitive::write_u8(w, *bound_index)?;
        }
        TargetInfo::Empty { kind } => primitive::write_u8(w, *kind)?,
        TargetInfo::FormalParameter { index } => {
            primitive::write_u8(w, 0x16)?;
            primitive::write_u8(w, *index)?;
        }
        TargetInfo::Throws { index } => {
            primitive::write_u8(w, 0x17)?;
            primitive::write_u16(w, *index)?;
        }
        TargetInfo::LocalVar { kind, table } => {
            primitive::write_u8(w, *kind)?;
            primitive::write_u16(w, table.len() as u16)?;
            for entry in table {
                primitive::write_u16(w, entry.start_pc)?;
                primitive::write_u16(w, entry.length)?;
                primitive::write_u16(w, entry.index)?;
            }
        }
        TargetInfo::Catch { index } => {
            primitive::write_u8(w, 0x42)?;
            primitive::write_u16(w, *index)?;
        }
        TargetInfo::Offset { kind, offset } => {
            primitive::write_u8(w, *kind)?;
            primitive::write_u16(w, *offset)?;
        }
        TargetInfo::TypeArgument { kind, offset, index } => {
            primitive::write_u8(w, *kind)?;
            primitive::write_u16(w, *offset)?;
            primitive::write_u8(w, *index)?;
        }
    }
    primitive::write_u8(w, ta.type_path.len() as u8)?;
    for segment in &ta.type_path {
        primitive::write_u8(w, segment.kind)?;
        primitive::write_u8(w, segment.type_argument_index)?;
    }
    write_annotation(w, &ta.annotation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_nested_annotation() {
        let annotation = Annotation {
            type_index: 5,
            elements: vec![
                (6, ElementValue::Const { tag: b'I', const_value_index: 7 }),
                (8, ElementValue::Annotation(Box::new(Annotation { type_index: 9, elements: vec![] }))),
            ],
        };
        let mut buf = Vec::new();
        write_annotation(&mut buf, &annotation).unwrap();
        let mut cursor = Cursor::new(buf.as_slice());
        assert_eq!(read_annotation(&mut cursor).unwrap(), annotation);
    }

    /// 0x01 (method type parameter) and 0x00 (class type parameter) share
    /// `TargetInfo::TypeParameter`'s shape; the non-default kind byte must
    /// still round-trip rather than collapse to 0x00.
    #[test]
    fn type_annotation_preserves_non_default_target_kind() {
        let ta = TypeAnnotation {
            target_info: TargetInfo::TypeParameter { kind: 0x01, index: 2 },
            type_path: vec![],
            annotation: Annotation { type_index: 1, elements: vec![] },
        };
        let mut buf = Vec::new();
        write_type_annotation(&mut buf, &ta).unwrap();
        assert_eq!(buf[0], 0x01);
        let mut cursor = Cursor::new(buf.as_slice());
        assert_eq!(read_type_annotation(&mut cursor).unwrap(), ta);
    }

    #[test]
    fn round_trips_localvar_type_annotation() {
        let ta = TypeAnnotation {
            target_info: TargetInfo::LocalVar {
                kind: 0x40,
                table: vec![LocalVarTargetEntry { start_pc: 0, length: 10, index: 1 }],
            },
            type_path: vec![TypePathSegment { kind: 0, type_argument_index: 0 }],
            annotation: Annotation { type_index: 1, elements: vec![] },
        };
        let mut buf = Vec::new();
        write_type_annotation(&mut buf, &ta).unwrap();
        let mut cursor = Cursor::new(buf.as_slice());
        assert_eq!(read_type_annotation(&mut cursor).unwrap(), ta);
    }
}
