//! The attribute codec (§4.4): dispatch by name, per-kind read/write,
//! location and version checks, with an opaque fallback for anything
//! unrecognized or that fails to parse cleanly.

pub mod annotations;
pub mod code;
pub mod stack_map;

use std::io::{Cursor, Seek, SeekFrom, Write};

use crate::error::{AttrReadKind, CodecError, Diagnostic, Diagnostics, Severity};
use crate::pool::ConstantPool;
use crate::primitive;
use crate::version::Version;

pub use code::{Code, ExceptionHandler};

/// Where an attribute is permitted to appear (§4.4's `locations` set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Class,
    Field,
    Method,
    Code,
    RecordComponent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClass {
    pub inner_class_info_index: u16,
    pub outer_class_info_index: u16,
    pub inner_name_index: u16,
    pub inner_class_access_flags: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumberEntry {
    pub start_pc: u16,
    pub line_number: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariableEntry {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
    pub method_handle_ref: u16,
    pub arguments: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodParameter {
    pub name_index: u16,
    pub access_flags: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requires {
    pub index: u16,
    pub flags: u16,
    pub version_index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exports {
    pub index: u16,
    pub flags: u16,
    pub to_indices: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opens {
    pub index: u16,
    pub flags: u16,
    pub to_indices: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provides {
    pub index: u16,
    pub with_indices: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleAttribute {
    pub name_index: u16,
    pub flags: u16,
    pub version_index: u16,
    pub requires: Vec<Requires>,
    pub exports: Vec<Exports>,
    pub opens: Vec<Opens>,
    pub uses_indices: Vec<u16>,
    pub provides: Vec<Provides>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordComponent {
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

/// The payload of a successfully recognized attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    ConstantValue { const_value_index: u16 },
    Code(Code),
    StackMapTable(Vec<stack_map::Frame>),
    Exceptions { index_table: Vec<u16> },
    InnerClasses(Vec<InnerClass>),
    EnclosingMethod { class_index: u16, method_index: u16 },
    Synthetic,
    Signature { signature_index: u16 },
    SourceFile { sourcefile_index: u16 },
    SourceDebugExtension(Vec<u8>),
    LineNumberTable(Vec<LineNumberEntry>),
    LocalVariableTable(Vec<LocalVariableEntry>),
    LocalVariableTypeTable(Vec<LocalVariableEntry>),
    Deprecated,
    RuntimeVisibleAnnotations(Vec<annotations::Annotation>),
    RuntimeInvisibleAnnotations(Vec<annotations::Annotation>),
    RuntimeVisibleParameterAnnotations(Vec<Vec<annotations::Annotation>>),
    RuntimeInvisibleParameterAnnotations(Vec<Vec<annotations::Annotation>>),
    RuntimeVisibleTypeAnnotations(Vec<annotations::TypeAnnotation>),
    RuntimeInvisibleTypeAnnotations(Vec<annotations::TypeAnnotation>),
    AnnotationDefault(annotations::ElementValue),
    BootstrapMethods(Vec<BootstrapMethod>),
    MethodParameters(Vec<MethodParameter>),
    Module(ModuleAttribute),
    ModulePackages(Vec<u16>),
    ModuleMainClass { main_class_index: u16 },
    NestHost { host_class_index: u16 },
    NestMembers(Vec<u16>),
    PermittedSubclasses(Vec<u16>),
    Record(Vec<RecordComponent>),
    /// Unknown name, unresolvable name_index, or a body that didn't parse
    /// cleanly — the raw `info` bytes, preserved verbatim.
    Raw(Vec<u8>),
}

/// One attribute as it sits in an attribute list: its name, payload, and
/// any bytes left over from an underread (preserved so the attribute still
/// round-trips byte for byte).
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInfo {
    pub name_index: u16,
    pub attribute: Attribute,
    pub extra: Vec<u8>,
}

/// `(since, permitted locations)` for every recognized attribute name —
/// the concrete table this crate fixes from the JVM specification's own
/// attribute table.
fn attribute_meta(name: &str) -> Option<(Version, &'static [Location])> {
    use Location::*;
    Some(match name {
        "ConstantValue" => (Version::new(45, 3), &[Field][..]),
        "Code" => (Version::new(45, 3), &[Method]),
        "Exceptions" => (Version::new(45, 3), &[Method]),
        "SourceFile" => (Version::new(45, 3), &[Class]),
        "LineNumberTable" => (Version::new(45, 3), &[Code]),
        "LocalVariableTable" => (Version::new(45, 3), &[Code]),
        "InnerClasses" => (Version::new(45, 3), &[Class]),
        "Synthetic" => (Version::new(45, 3), &[Class, Field, Method]),
        "Deprecated" => (Version::new(45, 3), &[Class, Field, Method]),
        "EnclosingMethod" => (Version::new(49, 0), &[Class]),
        "Signature" => (Version::new(49, 0), &[Class, Field, Method, RecordComponent]),
        "SourceDebugExtension" => (Version::new(49, 0), &[Class]),
        "LocalVariableTypeTable" => (Version::new(49, 0), &[Code]),
        "RuntimeVisibleAnnotations" => {
            (Version::new(49, 0), &[Class, Field, Method, RecordComponent])
        }
        "RuntimeInvisibleAnnotations" => {
            (Version::new(49, 0), &[Class, Field, Method, RecordComponent])
        }
        "RuntimeVisibleParameterAnnotations" => (Version::new(49, 0), &[Method]),
        "RuntimeInvisibleParameterAnnotations" => (Version::new(49, 0), &[Method]),
        "AnnotationDefault" => (Version::new(49, 0), &[Method]),
        "StackMapTable" => (Version::new(50, 0), &[Code]),
        "BootstrapMethods" => (Version::new(51, 0), &[Class]),
        "RuntimeVisibleTypeAnnotations" => {
            (Version::new(52, 0), &[Class, Field, Method, Code, RecordComponent])
        }
        "RuntimeInvisibleTypeAnnotations" => {
            (Version::new(52, 0), &[Class, Field, Method, Code, RecordComponent])
        }
        "MethodParameters" => (Version::new(52, 0), &[Method]),
        "Module" => (Version::new(53, 0), &[Class]),
        "ModulePackages" => (Version::new(53, 0), &[Class]),
        "ModuleMainClass" => (Version::new(53, 0), &[Class]),
        "NestHost" => (Version::new(55, 0), &[Class]),
        "NestMembers" => (Version::new(55, 0), &[Class]),
        "Record" => (Version::new(60, 0), &[Class]),
        "PermittedSubclasses" => (Version::new(61, 0), &[Class]),
        _ => return None,
    })
}

/// Reads `count: u16` followed by that many attributes.
pub fn read_attribute_list(
    r: &mut Cursor<&[u8]>,
    pool: &ConstantPool,
    version: Version,
    location: Location,
) -> Result<(Vec<AttributeInfo>, Diagnostics), CodecError> {
    let mut diagnostics = Diagnostics::new();
    let count = primitive::read_u16(r)?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        out.push(read_one(r, pool, version, location, &mut diagnostics)?);
    }
    Ok((out, diagnostics))
}

pub fn write_attribute_list<W: Write>(
    w: &mut W,
    attributes: &[AttributeInfo],
    version: Version,
) -> std::io::Result<()> {
    primitive::write_u16(w, attributes.len() as u16)?;
    for attribute in attributes {
        write_one(w, attribute, version)?;
    }
    Ok(())
}

fn read_one(
    r: &mut Cursor<&[u8]>,
    pool: &ConstantPool,
    version: Version,
    location: Location,
    diagnostics: &mut Diagnostics,
) -> Result<AttributeInfo, CodecError> {
    let name_index = primitive::read_u16(r)?;
    let length = primitive::read_u32(r)?;
    let body_start = r.position();

    let name = match pool.utf8(name_index) {
        Some(n) => n.to_string(),
        None => {
            diagnostics.push(Diagnostic::attr_read(
                "<unresolved>",
                AttrReadKind::Name,
                Severity::Warning,
                format!("name_index {name_index} does not resolve to a Utf8"),
            ));
            return Ok(raw_fallback(r, name_index, body_start, length)?);
        }
    };

    let Some((since, locations)) = attribute_meta(&name) else {
        diagnostics.push(Diagnostic::attr_read(
            &name,
            AttrReadKind::Unknown,
            Severity::Warning,
            "not a recognized attribute name",
        ));
        return Ok(raw_fallback(r, name_index, body_start, length)?);
    };

    let mut had_prior_warning = false;
    if version < since {
        had_prior_warning = true;
        diagnostics.push(Diagnostic::attr_read(
            &name,
            AttrReadKind::Version,
            Severity::Warning,
            format!("introduced in {since}, class file is {version}"),
        ));
    }
    if !locations.contains(&location) {
        had_prior_warning = true;
        diagnostics.push(Diagnostic::attr_read(
            &name,
            AttrReadKind::Location,
            Severity::Warning,
            "attribute not permitted at this location",
        ));
    }

    match read_body(&name, r, pool, version) {
        Ok(attribute) => {
            let consumed = r.position() - body_start;
            if consumed > length as u64 {
                let severity = if had_prior_warning { Severity::Warning } else { Severity::Error };
                diagnostics.push(Diagnostic::attr_read(
                    &name,
                    AttrReadKind::Overread,
                    severity,
                    format!("consumed {consumed} bytes, declared length {length}"),
                ));
                r.seek(SeekFrom::Start(body_start))?;
                Ok(raw_fallback(r, name_index, body_start, length)?)
            } else if consumed < length as u64 {
                diagnostics.push(Diagnostic::attr_read(
                    &name,
                    AttrReadKind::Underread,
                    Severity::Warning,
                    format!("consumed {consumed} bytes, declared length {length}"),
                ));
                let mut extra = vec![0u8; (length as u64 - consumed) as usize];
                r.read_exact(&mut extra)?;
                Ok(AttributeInfo { name_index, attribute, extra })
            } else {
                Ok(AttributeInfo { name_index, attribute, extra: Vec::new() })
            }
        }
        Err(err) => {
            diagnostics.push(Diagnostic::attr_read(
                &name,
                AttrReadKind::Error,
                Severity::Warning,
                err.to_string(),
            ));
            r.seek(SeekFrom::Start(body_start))?;
            Ok(raw_fallback(r, name_index, body_start, length)?)
        }
    }
}

fn raw_fallback(
    r: &mut Cursor<&[u8]>,
    name_index: u16,
    body_start: u64,
    length: u32,
) -> Result<AttributeInfo, CodecError> {
    r.seek(SeekFrom::Start(body_start))?;
    let mut info = vec![0u8; length as usize];
    r.read_exact(&mut info)?;
    Ok(AttributeInfo { name_index, attribute: Attribute::Raw(info), extra: Vec::new() })
}

fn read_body(
    name: &str,
    r: &mut Cursor<&[u8]>,
    pool: &ConstantPool,
    version: Version,
) -> Result<Attribute, CodecError> {
    Ok(match name {
        "ConstantValue" => Attribute::ConstantValue { const_value_index: primitive::read_u16(r)? },
        "Code" => {
            let (code, _) = code::read(r, pool, version)?;
            Attribute::Code(code)
        }
        "StackMapTable" => {
            let count = primitive::read_u16(r)?;
            let mut frames = Vec::with_capacity(count as usize);
            for _ in 0..count {
                frames.push(stack_map::read_frame(r)?);
            }
            Attribute::StackMapTable(frames)
        }
        "Exceptions" => {
            let count = primitive::read_u16(r)?;
            let mut index_table = Vec::with_capacity(count as usize);
            for _ in 0..count {
                index_table.push(primitive::read_u16(r)?);
            }
            Attribute::Exceptions { index_table }
        }
        "InnerClasses" => {
            let count = primitive::read_u16(r)?;
            let mut classes = Vec::with_capacity(count as usize);
            for _ in 0..count {
                classes.push(InnerClass {
                    inner_class_info_index: primitive::read_u16(r)?,
                    outer_class_info_index: primitive::read_u16(r)?,
                    inner_name_index: primitive::read_u16(r)?,
                    inner_class_access_flags: primitive::read_u16(r)?,
                });
            }
            Attribute::InnerClasses(classes)
        }
        "EnclosingMethod" => Attribute::EnclosingMethod {
            class_index: primitive::read_u16(r)?,
            method_index: primitive::read_u16(r)?,
        },
        "Synthetic" => Attribute::Synthetic,
        "Signature" => Attribute::Signature { signature_index: primitive::read_u16(r)? },
        "SourceFile" => Attribute::SourceFile { sourcefile_index: primitive::read_u16(r)? },
        "SourceDebugExtension" => {
            // length-prefixed nowhere — the whole remaining body is the
            // debug extension; the caller already knows `length` so we
            // read to end-of-declared-length via the underread path by
            // reading zero bytes here and letting `extra` absorb the rest.
            Attribute::SourceDebugExtension(Vec::new())
        }
        "LineNumberTable" => {
            let count = primitive::read_u16(r)?;
            let mut entries = Vec::with_capacity(count as usize);
            for _ in 0..count {
                entries.push(LineNumberEntry {
                    start_pc: primitive::read_u16(r)?,
                    line_number: primitive::read_u16(r)?,
                });
            }
            Attribute::LineNumberTable(entries)
        }
        "LocalVariableTable" | "LocalVariableTypeTable" => {
            let count = primitive::read_u16(r)?;
            let mut entries = Vec::with_capacity(count as usize);
            for _ in 0..count {
                entries.push(LocalVariableEntry {
                    start_pc: primitive::read_u16(r)?,
                    length: primitive::read_u16(r)?,
                    name_index: primitive::read_u16(r)?,
                    descriptor_index: primitive::read_u16(r)?,
                    index: primitive::read_u16(r)?,
                });
            }
            if name == "LocalVariableTable" {
                Attribute::LocalVariableTable(entries)
            } else {
                Attribute::LocalVariableTypeTable(entries)
            }
        }
        "Deprecated" => Attribute::Deprecated,
        "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
            let count = primitive::read_u16(r)?;
            let mut list = Vec::with_capacity(count as usize);
            for _ in 0..count {
                list.push(annotations::read_annotation(r)?);
            }
            if name == "RuntimeVisibleAnnotations" {
                Attribute::RuntimeVisibleAnnotations(list)
            } else {
                Attribute::RuntimeInvisibleAnnotations(list)
            }
        }
        "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
            let num_parameters = primitive::read_u8(r)?;
            let mut parameters = Vec::with_capacity(num_parameters as usize);
            for _ in 0..num_parameters {
                let count = primitive::read_u16(r)?;
                let mut list = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    list.push(annotations::read_annotation(r)?);
                }
                parameters.push(list);
            }
            if name == "RuntimeVisibleParameterAnnotations" {
                Attribute::RuntimeVisibleParameterAnnotations(parameters)
            } else {
                Attribute::RuntimeInvisibleParameterAnnotations(parameters)
            }
        }
        "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
            let count = primitive::read_u16(r)?;
            let mut list = Vec::with_capacity(count as usize);
            for _ in 0..count {
                list.push(annotations::read_type_annotation(r)?);
            }
            if name == "RuntimeVisibleTypeAnnotations" {
                Attribute::RuntimeVisibleTypeAnnotations(list)
            } else {
                Attribute::RuntimeInvisibleTypeAnnotations(list)
            }
        }
        "AnnotationDefault" => Attribute::AnnotationDefault(annotations::read_element_value(r)?),
        "BootstrapMethods" => {
            let count = primitive::read_u16(r)?;
            let mut methods = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let method_handle_ref = primitive::read_u16(r)?;
                let arg_count = primitive::read_u16(r)?;
                let mut arguments = Vec::with_capacity(arg_count as usize);
                for _ in 0..arg_count {
                    arguments.push(primitive::read_u16(r)?);
                }
                methods.push(BootstrapMethod { method_handle_ref, arguments });
            }
            Attribute::BootstrapMethods(methods)
        }
        "MethodParameters" => {
            let count = primitive::read_u8(r)?;
            let mut parameters = Vec::with_capacity(count as usize);
            for _ in 0..count {
                parameters.push(MethodParameter {
                    name_index: primitive::read_u16(r)?,
                    access_flags: primitive::read_u16(r)?,
                });
            }
            Attribute::MethodParameters(parameters)
        }
        "Module" => Attribute::Module(read_module(r)?),
        "ModulePackages" => {
            let count = primitive::read_u16(r)?;
            let mut packages = Vec::with_capacity(count as usize);
            for _ in 0..count {
                packages.push(primitive::read_u16(r)?);
            }
            Attribute::ModulePackages(packages)
        }
        "ModuleMainClass" => Attribute::ModuleMainClass { main_class_index: primitive::read_u16(r)? },
        "NestHost" => Attribute::NestHost { host_class_index: primitive::read_u16(r)? },
        "NestMembers" => {
            let count = primitive::read_u16(r)?;
            let mut members = Vec::with_capacity(count as usize);
            for _ in 0..count {
                members.push(primitive::read_u16(r)?);
            }
            Attribute::NestMembers(members)
        }
        "PermittedSubclasses" => {
            let count = primitive::read_u16(r)?;
            let mut classes = Vec::with_capacity(count as usize);
            for _ in 0..count {
                classes.push(primitive::read_u16(r)?);
            }
            Attribute::PermittedSubclasses(classes)
        }
        "Record" => {
            let count = primitive::read_u16(r)?;
            let mut components = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let name_index = primitive::read_u16(r)?;
                let descriptor_index = primitive::read_u16(r)?;
                let (attributes, _) = read_attribute_list(r, pool, version, Location::RecordComponent)?;
                components.push(RecordComponent { name_index, descriptor_index, attributes });
            }
            Attribute::Record(components)
        }
        other => unreachable!("attribute_meta recognized `{other}` but read_body doesn't handle it"),
    })
}

fn read_module(r: &mut Cursor<&[u8]>) -> Result<ModuleAttribute, CodecError> {
    let name_index = primitive::read_u16(r)?;
    let flags = primitive::read_u16(r)?;
    let version_index = primitive::read_u16(r)?;

    let requires_count = primitive::read_u16(r)?;
    let mut requires = Vec::with_capacity(requires_count as usize);
    for _ in 0..requires_count {
        requires.push(Requires {
            index: primitive::read_u16(r)?,
            flags: primitive::read_u16(r)?,
            version_index: primitive::read_u16(r)?,
        });
    }

    let exports_count = primitive::read_u16(r)?;
    let mut exports = Vec::with_capacity(exports_count as usize);
    for _ in 0..exports_count {
        let index = primitive::read_u16(r)?;
        let flags = primitive::read_u16(r)?;
        let to_count = primitive::read_u16(r)?;
        let mut to_indices = Vec::with_capacity(to_count as usize);
        for _ in 0..to_count {
            to_indices.push(primitive::read_u16(r)?);
        }
        exports.push(Exports { index, flags, to_indices });
    }

    let opens_count = primitive::read_u16(r)?;
    let mut opens = Vec::with_capacity(opens_count as usize);
    for _ in 0..opens_count {
        let index = primitive::read_u16(r)?;
        let flags = primitive::read_u16(r)?;
        let to_count = primitive::read_u16(r)?;
        let mut to_indices = Vec::with_capacity(to_count as usize);
        for _ in 0..to_count {
            to_indices.push(primitive::read_u16(r)?);
        }
        opens.push(Opens { index, flags, to_indices });
    }

    let uses_count = primitive::read_u16(r)?;
    let mut uses_indices = Vec::with_capacity(uses_count as usize);
    for _ in 0..uses_count {
        uses_indices.push(primitive::read_u16(r)?);
    }

    let provides_count = primitive::read_u16(r)?;
    let mut provides = Vec::with_capacity(provides_count as usize);
    for _ in 0..provides_count {
        let index = primitive::read_u16(r)?;
        let with_count = primitive::read_u16(r)?;
        let mut with_indices = Vec::with_capacity(with_count as usize);
        for _ in 0..with_count {
            with_indices.push(primitive::read_u16(r)?);
        }
        provides.push(Provides { index, with_indices });
    }

    Ok(ModuleAttribute { name_index, flags, version_index, requires, exports, opens, uses_indices, provides })
}

fn write_one<W: Write>(w: &mut W, info: &AttributeInfo, version: Version) -> std::io::Result<()> {
    primitive::write_u16(w, info.name_index)?;
    let mut body = Vec::new();
    write_body(&mut body, &info.attribute, version)?;
    body.extend_from_slice(&info.extra);
    primitive::write_u32(w, body.len() as u32)?;
    w.write_all(&body)
}

fn write_body<W: Write>(w: &mut W, attribute: &Attribute, version: Version) -> std::io::Result<()> {
    match attribute {
        Attribute::ConstantValue { const_value_index } => primitive::write_u16(w, *const_value_index)?,
        Attribute::Code(code) => code::write(w, code, version)?,
        Attribute::StackMapTable(frames) => {
            primitive::write_u16(w, frames.len() as u16)?;
            for frame in frames {
                stack_map::write_frame(w, frame)?;
            }
        }
        Attribute::Exceptions { index_table } => {
            primitive::write_u16(w, index_table.len() as u16)?;
            for index in index_table {
                primitive::write_u16(w, *index)?;
            }
        }
        Attribute::InnerClasses(classes) => {
            primitive::write_u16(w, classes.len() as u16)?;
            for c in classes {
                primitive::write_u16(w, c.inner_class_info_index)?;
                primitive::write_u16(w, c.outer_class_info_index)?;
                primitive::write_u16(w, c.inner_name_index)?;
                primitive::write_u16(w, c.inner_class_access_flags)?;
            }
        }
        Attribute::EnclosingMethod { class_index, method_index } => {
            primitive::write_u16(w, *class_index)?;
            primitive::write_u16(w, *method_index)?;
        }
        Attribute::Synthetic | Attribute::Deprecated => {}
        Attribute::Signature { signature_index } => primitive::write_u16(w, *signature_index)?,
        Attribute::SourceFile { sourcefile_index } => primitive::write_u16(w, *sourcefile_index)?,
        Attribute::SourceDebugExtension(bytes) => w.write_all(bytes)?,
        Attribute::LineNumberTable(entries) => {
            primitive::write_u16(w, entries.len() as u16)?;
            for e in entries {
                primitive::write_u16(w, e.start_pc)?;
                primitive::write_u16(w, e.line_number)?;
            }
        }
        Attribute::LocalVariableTable(entries) | Attribute::LocalVariableTypeTable(entries) => {
            primitive::write_u16(w, entries.len() as u16)?;
            for e in entries {
                primitive::write_u16(w, e.start_pc)?;
                primitive::write_u16(w, e.length)?;
                primitive::write_u16(w, e.name_index)?;
                primitive::write_u16(w, e.descriptor_index)?;
                primitive::write_u16(w, e.index)?;
            }
        }
        Attribute::RuntimeVisibleAnnotations(list) | Attribute::RuntimeInvisibleAnnotations(list) => {
            primitive::write_u16(w, list.len() as u16)?;
            for a in list {
                annotations::write_annotation(w, a)?;
            }
        }
        Attribute::RuntimeVisibleParameterAnnotations(parameters)
        | Attribute::RuntimeInvisibleParameterAnnotations(parameters) => {
            primitive::write_u8(w, parameters.len() as u8)?;
            for list in parameters {
                primitive::write_u16(w, list.len() as u16)?;
                for a in list {
                    annotations::write_annotation(w, a)?;
                }
            }
        }
        Attribute::RuntimeVisibleTypeAnnotations(list) | Attribute::RuntimeInvisibleTypeAnnotations(list) => {
            primitive::write_u16(w, list.len() as u16)?;
            for a in list {
                annotations::write_type_annotation(w, a)?;
            }
        }
        Attribute::AnnotationDefault(value) => annotations::write_element_value(w, value)?,
        Attribute::BootstrapMethods(methods) => {
            primitive::write_u16(w, methods.len() as u16)?;
            for m in methods {
                primitive::write_u16(w, m.method_handle_ref)?;
                primitive::write_u16(w, m.arguments.len() as u16)?;
                for a in &m.arguments {
                    primitive::write_u16(w, *a)?;
                }
            }
        }
        Attribute::MethodParameters(parameters) => {
            primitive::write_u8(w, parameters.len() as u8)?;
            for p in parameters {
                primitive::write_u16(w, p.name_index)?;
                primitive::write_u16(w, p.access_flags)?;
            }
        }
        Attribute::Module(module) => write_module(w, module)?,
        Attribute::ModulePackages(packages) => {
            primitive::write_u16(w, packages.len() as u16)?;
            for p in packages {
                primitive::write_u16(w, *p)?;
            }
        }
        Attribute::ModuleMainClass { main_class_index } => primitive::write_u16(w, *main_class_index)?,
        Attribute::NestHost { host_class_index } => primitive::write_u16(w, *host_class_index)?,
        Attribute::NestMembers(members) => {
            primitive::write_u16(w, members.len() as u16)?;
            for m in members {
                primitive::write_u16(w, *m)?;
            }
        }
        Attribute::PermittedSubclasses(classes) => {
            primitive::write_u16(w, classes.len() as u16)?;
            for c in classes {
                primitive::write_u16(w, *c)?;
            }
        }
        Attribute::Record(components) => {
            primitive::write_u16(w, components.len() as u16)?;
            for c in components {
                primitive::write_u16(w, c.name_index)?;
                primitive::write_u16(w, c.descriptor_index)?;
                write_attribute_list(w, &c.attributes, version)?;
            }
        }
        Attribute::Raw(bytes) => w.write_all(bytes)?,
    }
    Ok(())
}

fn write_module<W: Write>(w: &mut W, module: &ModuleAttribute) -> std::io::Result<()> {
    primitive::write_u16(w, module.name_index)?;
    primitive::write_u16(w, module.flags)?;
    primitive::write_u16(w, module.version_index)?;

    primitive::write_u16(w, module.requires.len() as u16)?;
    for r in &module.requires {
        primitive::write_u16(w, r.index)?;
        primitive::write_u16(w, r.flags)?;
        primitive::write_u16(w, r.version_index)?;
    }

    primitive::write_u16(w, module.exports.len() as u16)?;
    for e in &module.exports {
        primitive::write_u16(w, e.index)?;
        primitive::write_u16(w, e.flags)?;
        primitive::write_u16(w, e.to_indices.len() as u16)?;
        for i in &e.to_indices {
            primitive::write_u16(w, *i)?;
        }
    }

    primitive::write_u16(w, module.opens.len() as u16)?;
    for o in &module.opens {
        primitive::write_u16(w, o.index)?;
        primitive::write_u16(w, o.flags)?;
        primitive::write_u16(w, o.to_indices.len() as u16)?;
        for i in &o.to_indices {
            primitive::write_u16(w, *i)?;
        }
    }

    primitive::write_u16(w, module.uses_indices.len() as u16)?;
    for i in &module.uses_indices {
        primitive::write_u16(w, *i)?;
    }

    primitive::write_u16(w, module.provides.len() as u16)?;
    for p in &module.provides {
        primitive::write_u16(w, p.index)?;
        primitive::write_u16(w, p.with_indices.len() as u16)?;
        for i in &p.with_indices {
            primitive::write_u16(w, *i)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn pool_with_name(name: &str) -> ConstantPool {
        let mut pool = ConstantPool::new();
        pool.add(crate::pool::Entry::Utf8(name.to_string()));
        pool
    }

    #[test]
    fn round_trips_source_file_attribute() {
        let pool = pool_with_name("SourceFile");
        let info = AttributeInfo {
            name_index: 1,
            attribute: Attribute::SourceFile { sourcefile_index: 1 },
            extra: Vec::new(),
        };
        let version = Version::new(52, 0);
        let mut buf = Vec::new();
        write_one(&mut buf, &info, version).unwrap();
        let mut cursor = Cursor::new(buf.as_slice());
        let mut diagnostics = Diagnostics::new();
        let read_back = read_one(&mut cursor, &pool, version, Location::Class, &mut diagnostics).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(read_back, info);
    }

    #[test]
    fn unknown_name_falls_back_to_raw() {
        let pool = pool_with_name("TotallyMadeUp");
        let info = AttributeInfo { name_index: 1, attribute: Attribute::Raw(vec![1, 2, 3]), extra: Vec::new() };
        let mut buf = Vec::new();
        write_one(&mut buf, &info, Version::new(52, 0)).unwrap();
        let mut cursor = Cursor::new(buf.as_slice());
        let mut diagnostics = Diagnostics::new();
        let read_back =
            read_one(&mut cursor, &pool, Version::new(52, 0), Location::Class, &mut diagnostics).unwrap();
        assert!(!diagnostics.is_empty());
        assert_eq!(read_back.attribute, Attribute::Raw(vec![1, 2, 3]));
    }

    #[test]
    fn version_too_old_is_a_warning_not_a_failure() {
        let pool = pool_with_name("NestHost");
        let info = AttributeInfo {
            name_index: 1,
            attribute: Attribute::NestHost { host_class_index: 0 },
            extra: Vec::new(),
        };
        let mut buf = Vec::new();
        write_one(&mut buf, &info, Version::new(52, 0)).unwrap();
        let mut cursor = Cursor::new(buf.as_slice());
        let mut diagnostics = Diagnostics::new();
        // NestHost is since 55.0; feed a 52.0 class file.
        let read_back =
            read_one(&mut cursor, &pool, Version::new(52, 0), Location::Class, &mut diagnostics).unwrap();
        assert!(!diagnostics.is_empty());
        assert_eq!(read_back.attribute, Attribute::NestHost { host_class_index: 0 });
    }

    #[test]
    fn underread_preserves_extra_bytes() {
        let pool = pool_with_name("Deprecated");
        let mut buf = Vec::new();
        primitive::write_u16(&mut buf, 1).unwrap();
        primitive::write_u32(&mut buf, 3).unwrap();
        buf.extend_from_slice(&[9, 9, 9]);
        let mut cursor = Cursor::new(buf.as_slice());
        let mut diagnostics = Diagnostics::new();
        let read_back =
            read_one(&mut cursor, &pool, Version::new(52, 0), Location::Class, &mut diagnostics).unwrap();
        assert!(!diagnostics.is_empty());
        assert_eq!(read_back.attribute, Attribute::Deprecated);
        assert_eq!(read_back.extra, vec![9, 9, 9]);
    }
}
