//! A bidirectional codec for the JVM class-file format (versions 45.0
//! through 66.0) plus a control-flow graph builder for method bytecode.
//!
//! [`ClassFile::read`]/[`ClassFile::write`] handle the top-level record;
//! [`cfg::Graph::disassemble`] turns a method's [`attributes::code::Code`]
//! into basic blocks connected by typed edges. Everything fatal comes back
//! as a [`error::CodecError`]; everything recoverable (a dangling pool
//! reference, an attribute that fails to parse cleanly) is pushed onto the
//! [`error::Diagnostics`] returned alongside the parsed value instead of
//! aborting the read.

pub mod access_flags;
pub mod attributes;
pub mod cfg;
pub mod classfile;
pub mod descriptor;
pub mod error;
pub mod instruction;
pub mod pool;
pub mod primitive;
pub mod version;

pub use classfile::{ClassFile, FieldInfo, MethodInfo};
pub use error::{CodecError, Diagnostic, Diagnostics};
pub use version::Version;

use std::io;
use std::path::Path;

/// Reads and parses the class file at `path`. A thin collaborator over
/// [`ClassFile::read`] — not part of the core codec.
pub fn read_path(path: impl AsRef<Path>) -> Result<(ClassFile, Diagnostics), CodecError> {
    let mut file = std::fs::File::open(path)?;
    ClassFile::read(&mut file)
}

/// Serializes `class` into a freshly allocated byte vector.
pub fn to_vec(class: &ClassFile) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    class.write(&mut buf)?;
    Ok(buf)
}
