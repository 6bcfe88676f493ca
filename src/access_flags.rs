//! Access-flag bitsets (§6).
//!
//! The teacher's `access_flags.rs` hand-rolls `#[repr(u16)] enum` plus a
//! manual `from_u16() -> Vec<Self>` per flag family. `bitflags` gives the
//! same per-bit semantics with derived set operations, so a `ClassFile`'s
//! `access` field becomes an ordinary bitset value instead of a `Vec` the
//! caller has to search.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ClassAccessFlags: u16 {
        const PUBLIC     = 0x0001;
        const FINAL      = 0x0010;
        const SUPER      = 0x0020;
        const INTERFACE  = 0x0200;
        const ABSTRACT   = 0x0400;
        const SYNTHETIC  = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM       = 0x4000;
        const MODULE     = 0x8000;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct FieldAccessFlags: u16 {
        const PUBLIC    = 0x0001;
        const PRIVATE   = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC    = 0x0008;
        const FINAL     = 0x0010;
        const VOLATILE  = 0x0040;
        const TRANSIENT = 0x0080;
        const SYNTHETIC = 0x1000;
        const ENUM      = 0x4000;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct MethodAccessFlags: u16 {
        const PUBLIC       = 0x0001;
        const PRIVATE      = 0x0002;
        const PROTECTED    = 0x0004;
        const STATIC       = 0x0008;
        const FINAL        = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE       = 0x0040;
        const VARARGS      = 0x0080;
        const NATIVE       = 0x0100;
        const ABSTRACT     = 0x0400;
        const STRICT       = 0x0800;
        const SYNTHETIC    = 0x1000;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct InnerClassAccessFlags: u16 {
        const PUBLIC    = 0x0001;
        const PRIVATE   = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC    = 0x0008;
        const FINAL     = 0x0010;
        const INTERFACE = 0x0200;
        const ABSTRACT  = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM      = 0x4000;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ModuleFlags: u16 {
        const OPEN      = 0x0020;
        const SYNTHETIC = 0x1000;
        const MANDATED  = 0x8000;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct RequireFlags: u16 {
        const TRANSITIVE  = 0x0020;
        const STATIC_PHASE = 0x0040;
        const SYNTHETIC   = 0x1000;
        const MANDATED    = 0x8000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_flags() {
        let flags = ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER;
        assert_eq!(flags.bits(), 0x0021);
        assert!(flags.contains(ClassAccessFlags::PUBLIC));
        assert!(!flags.contains(ClassAccessFlags::FINAL));
    }

    #[test]
    fn preserves_unknown_bits_on_round_trip() {
        let flags = MethodAccessFlags::from_bits_retain(0xFFFF);
        assert_eq!(flags.bits(), 0xFFFF);
    }
}
