//! The top-level class-file record (§3, §6 byte layout): magic, version,
//! constant pool, access flags, `this`/`super`/interfaces, and the
//! field/method/attribute lists that hang off it.

use std::io::{self, Cursor, Read, Write};

use crate::access_flags::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};
use crate::attributes::code::Code;
use crate::attributes::{read_attribute_list, write_attribute_list, Attribute, AttributeInfo, Location};
use crate::cfg::Graph;
use crate::error::{CodecError, Diagnostics};
use crate::pool::ConstantPool;
use crate::primitive;
use crate::version::Version;

const MAGIC: u32 = 0xCAFE_BABE;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub access: FieldAccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl FieldInfo {
    pub fn name<'a>(&self, pool: &'a ConstantPool) -> Option<&'a str> {
        pool.utf8(self.name_index)
    }

    pub fn descriptor<'a>(&self, pool: &'a ConstantPool) -> Option<&'a str> {
        pool.utf8(self.descriptor_index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub access: MethodAccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl MethodInfo {
    pub fn name<'a>(&self, pool: &'a ConstantPool) -> Option<&'a str> {
        pool.utf8(self.name_index)
    }

    pub fn descriptor<'a>(&self, pool: &'a ConstantPool) -> Option<&'a str> {
        pool.utf8(self.descriptor_index)
    }

    /// The method's `Code` attribute, if it has a body. Abstract and
    /// native methods don't carry one.
    pub fn code(&self) -> Option<&Code> {
        self.attributes.iter().find_map(|info| match &info.attribute {
            Attribute::Code(code) => Some(code),
            _ => None,
        })
    }

    /// Disassembles this method's body into a [`Graph`]. Fails with
    /// [`CodecError::NoCode`] when the method has no `Code` attribute.
    pub fn disassemble(&self, pool: &ConstantPool) -> Result<(Graph, Diagnostics), CodecError> {
        let code = self.code().ok_or(CodecError::NoCode)?;
        Graph::disassemble(code, pool)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub version: Version,
    pub pool: ConstantPool,
    pub access: ClassAccessFlags,
    pub this: u16,
    /// `None` for `java/lang/Object`, the one class with no superclass.
    pub super_: Option<u16>,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
    pub fn this_name(&self) -> Option<&str> {
        self.pool.class_name(self.this)
    }

    pub fn super_name(&self) -> Option<&str> {
        self.super_.and_then(|index| self.pool.class_name(index))
    }

    pub fn read<R: Read>(r: &mut R) -> Result<(ClassFile, Diagnostics), CodecError> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        let mut cursor = Cursor::new(bytes.as_slice());

        let magic = primitive::read_u32(&mut cursor)?;
        if magic != MAGIC {
            return Err(CodecError::BadMagic { found: magic });
        }

        let mut diagnostics = Diagnostics::new();
        // The on-disk order is minor then major, unlike every other
        // (major, minor) pairing this crate exposes.
        let minor = primitive::read_u16(&mut cursor)?;
        let major = primitive::read_u16(&mut cursor)?;
        let version = Version::new(major, minor);

        let (pool, pool_diagnostics) = ConstantPool::read(&mut cursor)?;
        diagnostics.extend(pool_diagnostics);

        let access = ClassAccessFlags::from_bits_retain(primitive::read_u16(&mut cursor)?);
        let this = primitive::read_u16(&mut cursor)?;
        let super_raw = primitive::read_u16(&mut cursor)?;
        let super_ = if super_raw == 0 { None } else { Some(super_raw) };

        let interface_count = primitive::read_u16(&mut cursor)?;
        let mut interfaces = Vec::with_capacity(interface_count as usize);
        for _ in 0..interface_count {
            interfaces.push(primitive::read_u16(&mut cursor)?);
        }

        let field_count = primitive::read_u16(&mut cursor)?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let field_access = FieldAccessFlags::from_bits_retain(primitive::read_u16(&mut cursor)?);
            let name_index = primitive::read_u16(&mut cursor)?;
            let descriptor_index = primitive::read_u16(&mut cursor)?;
            let (attributes, attr_diagnostics) =
                read_attribute_list(&mut cursor, &pool, version, Location::Field)?;
            diagnostics.extend(attr_diagnostics);
            fields.push(FieldInfo { access: field_access, name_index, descriptor_index, attributes });
        }

        let method_count = primitive::read_u16(&mut cursor)?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            let method_access = MethodAccessFlags::from_bits_retain(primitive::read_u16(&mut cursor)?);
            let name_index = primitive::read_u16(&mut cursor)?;
            let descriptor_index = primitive::read_u16(&mut cursor)?;
            let (attributes, attr_diagnostics) =
                read_attribute_list(&mut cursor, &pool, version, Location::Method)?;
            diagnostics.extend(attr_diagnostics);
            methods.push(MethodInfo { access: method_access, name_index, descriptor_index, attributes });
        }

        let (attributes, attr_diagnostics) =
            read_attribute_list(&mut cursor, &pool, version, Location::Class)?;
        diagnostics.extend(attr_diagnostics);

        Ok((
            ClassFile { version, pool, access, this, super_, interfaces, fields, methods, attributes },
            diagnostics,
        ))
    }

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        primitive::write_u32(w, MAGIC)?;
        primitive::write_u16(w, self.version.minor)?;
        primitive::write_u16(w, self.version.major)?;
        self.pool.write(w)?;
        primitive::write_u16(w, self.access.bits())?;
        primitive::write_u16(w, self.this)?;
        primitive::write_u16(w, self.super_.unwrap_or(0))?;

        primitive::write_u16(w, self.interfaces.len() as u16)?;
        for interface in &self.interfaces {
            primitive::write_u16(w, *interface)?;
        }

        primitive::write_u16(w, self.fields.len() as u16)?;
        for field in &self.fields {
            primitive::write_u16(w, field.access.bits())?;
            primitive::write_u16(w, field.name_index)?;
            primitive::write_u16(w, field.descriptor_index)?;
            write_attribute_list(w, &field.attributes, self.version)?;
        }

        primitive::write_u16(w, self.methods.len() as u16)?;
        for method in &self.methods {
            primitive::write_u16(w, method.access.bits())?;
            primitive::write_u16(w, method.name_index)?;
            primitive::write_u16(w, method.descriptor_index)?;
            write_attribute_list(w, &method.attributes, self.version)?;
        }

        write_attribute_list(w, &self.attributes, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{Instruction, Opcode};
    use crate::pool::Entry;

    /// S1 — the minimum-viable `public class Empty extends java/lang/Object`.
    fn empty_class_pool() -> ConstantPool {
        let mut pool = ConstantPool::new();
        pool.add(Entry::Utf8("Empty".to_string()));
        pool.add(Entry::Class { name_index: 1 });
        pool.add(Entry::Utf8("java/lang/Object".to_string()));
        pool.add(Entry::Class { name_index: 3 });
        pool
    }

    #[test]
    fn round_trips_minimum_viable_class() {
        let class = ClassFile {
            version: Version::new(52, 0),
            pool: empty_class_pool(),
            access: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            this: 2,
            super_: Some(4),
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            attributes: vec![],
        };
        let mut buf = Vec::new();
        class.write(&mut buf).unwrap();
        let (read_back, diagnostics) = ClassFile::read(&mut Cursor::new(buf)).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(read_back.this_name(), Some("Empty"));
        assert_eq!(read_back.super_name(), Some("java/lang/Object"));
        assert_eq!(read_back, class);
    }

    #[test]
    fn bad_magic_is_fatal() {
        let bytes = [0u8; 4];
        let err = ClassFile::read(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, CodecError::BadMagic { found: 0 }));
    }

    #[test]
    fn method_with_no_code_attribute_refuses_disassembly() {
        let method = MethodInfo {
            access: MethodAccessFlags::ABSTRACT | MethodAccessFlags::PUBLIC,
            name_index: 1,
            descriptor_index: 1,
            attributes: vec![],
        };
        let pool = ConstantPool::new();
        assert!(method.code().is_none());
        assert!(matches!(method.disassemble(&pool), Err(CodecError::NoCode)));
    }

    #[test]
    fn method_with_code_disassembles() {
        let code = Code {
            max_stack: 1,
            max_locals: 1,
            insns: vec![(0, Instruction::Simple(Opcode::return_))],
            handlers: vec![],
            attributes: vec![],
        };
        let method = MethodInfo {
            access: MethodAccessFlags::PUBLIC,
            name_index: 1,
            descriptor_index: 1,
            attributes: vec![AttributeInfo {
                name_index: 2,
                attribute: Attribute::Code(code),
                extra: vec![],
            }],
        };
        let pool = ConstantPool::new();
        let (graph, diagnostics) = method.disassemble(&pool).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(graph.edges_from(crate::cfg::BlockLabel::ENTRY).count(), 1);
    }
}
