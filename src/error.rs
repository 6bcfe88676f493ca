//! Fatal errors and the recoverable diagnostics tree (§7).
//!
//! `CodecError` is returned from a `Result::Err` and aborts the read of
//! whatever it's scoped to (a pool, a method's Code, the whole class file).
//! Everything else is recoverable and gets pushed onto a [`Diagnostics`]
//! accumulator that rides alongside the parsed value instead of short
//! circuiting it, per the teacher's habit of keeping partially-malformed
//! input inspectable rather than discarding it.

use std::io;

use thiserror::Error;
use tracing::warn;

/// Fatal, scope-aborting failures.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("not a class file: expected magic 0xCAFEBABE, found {found:#010X}")]
    BadMagic { found: u32 },

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownTag { tag: u8, index: u16 },

    #[error("unknown opcode {opcode:#04X} at offset {offset}")]
    BadOpcode { offset: u32, opcode: u8 },

    #[error("disassembler split at offset {offset} falls inside an instruction")]
    BadSplit { offset: u32 },

    #[error("method has no Code attribute to disassemble (abstract or native)")]
    NoCode,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Non-fatal condition severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// The `kind` of an attribute-read diagnostic (§7's `AttrRead.kind` set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrReadKind {
    /// `name_index` does not resolve to a UTF8 entry.
    Name,
    /// Attribute name is not one of the recognized subtypes.
    Unknown,
    /// Class-file version predates the attribute's `since`.
    Version,
    /// Attribute appeared in a location it isn't permitted in.
    Location,
    /// Subtype reader consumed more bytes than `length` declared.
    Overread,
    /// Subtype reader consumed fewer bytes than `length` declared.
    Underread,
    /// Subtype reader failed for some other reason.
    Error,
}

impl AttrReadKind {
    fn tag(&self) -> &'static str {
        match self {
            AttrReadKind::Name => "name",
            AttrReadKind::Unknown => "unknown",
            AttrReadKind::Version => "version",
            AttrReadKind::Location => "location",
            AttrReadKind::Overread => "overread",
            AttrReadKind::Underread => "underread",
            AttrReadKind::Error => "error",
        }
    }
}

/// One recoverable finding, tagged with where it happened and how bad it is.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Error, message: message.into() }
    }

    /// `severity` is the caller's call: §7 makes `overread` an error only
    /// when no prior warning was already raised for the same attribute,
    /// and a warning otherwise — every other kind is always a warning.
    pub fn attr_read(name: &str, kind: AttrReadKind, severity: Severity, detail: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            message: format!("attribute `{name}`: {} ({})", detail.into(), kind.tag()),
        }
    }

    pub fn bad_reference(at: u16, expected: &str) -> Self {
        Diagnostic::warning(format!("pool reference at index {at}: expected {expected}"))
    }

    pub fn descriptor_parse(raw: &str, reason: impl Into<String>) -> Self {
        Diagnostic::warning(format!("descriptor `{raw}` unparseable: {}", reason.into()))
    }
}

/// Accumulates [`Diagnostic`]s produced while reading a class file, a pool,
/// or a method's Code attribute. Threaded through every reader rather than
/// returned as an error so a partially-malformed input stays inspectable.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => warn!(message = %diagnostic.message, "diagnostic"),
            Severity::Error => warn!(message = %diagnostic.message, severity = "error", "diagnostic"),
        }
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        for entry in other.entries {
            self.push(entry);
        }
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }
}
