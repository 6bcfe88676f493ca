//! The constant pool (§4.3): a numbered, partially-wide-occupying table of
//! heterogeneous, cross-referencing entries.
//!
//! Cross-references are stored as raw `u16` indices rather than resolved
//! pointers or a first-pass/second-pass placeholder scheme — §9 calls this
//! out as the preferred design ("it sidesteps shared ownership and matches
//! the on-disk model"), and it has the pleasant side effect that forward
//! references just work without a resolution pass: `get()` looks the index
//! up in `self.slots` whenever it's needed, so a `Class` naming a UTF8 that
//! appears later in the pool resolves correctly the first time it's asked.

pub mod mutf8;

use std::io::{self, Read, Write};

use tracing::trace;

use crate::error::{CodecError, Diagnostic, Diagnostics};
use crate::primitive;

/// One constant pool entry. Cross-references are the referenced entry's
/// raw pool index; `ConstantPool::get`/accessor helpers perform the lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    Fieldref { class_index: u16, name_and_type_index: u16 },
    Methodref { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodref { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
}

impl Entry {
    pub fn tag(&self) -> u8 {
        match self {
            Entry::Utf8(_) => 1,
            Entry::Integer(_) => 3,
            Entry::Float(_) => 4,
            Entry::Long(_) => 5,
            Entry::Double(_) => 6,
            Entry::Class { .. } => 7,
            Entry::String { .. } => 8,
            Entry::Fieldref { .. } => 9,
            Entry::Methodref { .. } => 10,
            Entry::InterfaceMethodref { .. } => 11,
            Entry::NameAndType { .. } => 12,
            Entry::MethodHandle { .. } => 15,
            Entry::MethodType { .. } => 16,
            Entry::Dynamic { .. } => 17,
            Entry::InvokeDynamic { .. } => 18,
            Entry::Module { .. } => 19,
            Entry::Package { .. } => 20,
        }
    }

    /// Wide entries (`Long`, `Double`) occupy two consecutive pool slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, Entry::Long(_) | Entry::Double(_))
    }

    /// Whether the entry may be the target of an `ldc`-family instruction.
    pub fn is_loadable(&self) -> bool {
        matches!(
            self,
            Entry::Integer(_)
                | Entry::Float(_)
                | Entry::Long(_)
                | Entry::Double(_)
                | Entry::Class { .. }
                | Entry::String { .. }
                | Entry::MethodHandle { .. }
                | Entry::MethodType { .. }
                | Entry::Dynamic { .. }
        )
    }
}

/// A pool slot, tracking why `get()` might not find a usable entry.
#[derive(Debug, Clone)]
enum Slot {
    /// Index 0, and any index beyond the last written entry.
    Unused,
    /// The second index of a wide entry.
    Reserved,
    Entry(Entry),
}

/// The result of looking an index up in the pool.
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
    Resolved(&'a Entry),
    Unused,
    Reserved,
    OutOfRange,
}

impl<'a> Lookup<'a> {
    pub fn entry(self) -> Option<&'a Entry> {
        match self {
            Lookup::Resolved(entry) => Some(entry),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    slots: Vec<Slot>,
}

impl ConstantPool {
    /// An empty pool: just the reserved index-0 slot.
    pub fn new() -> Self {
        ConstantPool { slots: vec![Slot::Unused] }
    }

    /// The next free index — also the `count` value written to the header.
    pub fn len(&self) -> u16 {
        self.slots.len() as u16
    }

    pub fn is_empty(&self) -> bool {
        self.slots.len() <= 1
    }

    pub fn get(&self, index: u16) -> Lookup<'_> {
        match self.slots.get(index as usize) {
            None => Lookup::OutOfRange,
            Some(Slot::Unused) => Lookup::Unused,
            Some(Slot::Reserved) => Lookup::Reserved,
            Some(Slot::Entry(entry)) => Lookup::Resolved(entry),
        }
    }

    pub fn utf8(&self, index: u16) -> Option<&str> {
        match self.get(index).entry()? {
            Entry::Utf8(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn class_name(&self, index: u16) -> Option<&str> {
        match self.get(index).entry()? {
            Entry::Class { name_index } => self.utf8(*name_index),
            _ => None,
        }
    }

    pub fn name_and_type(&self, index: u16) -> Option<(&str, &str)> {
        match self.get(index).entry()? {
            Entry::NameAndType { name_index, descriptor_index } => {
                Some((self.utf8(*name_index)?, self.utf8(*descriptor_index)?))
            }
            _ => None,
        }
    }

    /// Adds `entry`, returning its existing index if a structurally equal
    /// entry is already present, otherwise appending at the next free
    /// index (advancing by 2 and leaving a `Reserved` slot for wide
    /// entries).
    pub fn add(&mut self, entry: Entry) -> u16 {
        for (index, slot) in self.slots.iter().enumerate() {
            if let Slot::Entry(existing) = slot {
                if *existing == entry {
                    return index as u16;
                }
            }
        }
        let index = self.slots.len() as u16;
        let wide = entry.is_wide();
        trace!(index, tag = entry.tag(), wide, "pool.add");
        self.slots.push(Slot::Entry(entry));
        if wide {
            self.slots.push(Slot::Reserved);
        }
        index
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.slots.push(Slot::Unused);
    }

    /// Reads `count` then that many entries, dispatching on tag byte.
    /// Indices advance by 2 for wide entries, leaving a `Reserved` slot.
    pub fn read<R: Read>(r: &mut R) -> Result<(ConstantPool, Diagnostics), CodecError> {
        let mut diagnostics = Diagnostics::new();
        let count = primitive::read_u16(r)?;
        let mut pool = ConstantPool { slots: vec![Slot::Unused] };
        let mut index = 1u16;
        while index < count {
            let tag = primitive::read_u8(r)?;
            let entry = read_entry(r, tag, index)?;
            let wide = entry.is_wide();
            trace!(index, tag, wide, "pool.read_entry");
            pool.slots.push(Slot::Entry(entry));
            index += 1;
            if wide {
                pool.slots.push(Slot::Reserved);
                index += 1;
            }
        }
        validate_references(&pool, &mut diagnostics);
        Ok((pool, diagnostics))
    }

    /// Writes `count` followed by every entry in ascending index order,
    /// skipping `Reserved` slots (the wide entry that owns them already
    /// wrote both logical slots' worth of payload).
    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        primitive::write_u16(w, self.len())?;
        for slot in self.slots.iter().skip(1) {
            if let Slot::Entry(entry) = slot {
                write_entry(w, entry)?;
            }
        }
        Ok(())
    }
}

fn read_entry<R: Read>(r: &mut R, tag: u8, index: u16) -> Result<Entry, CodecError> {
    Ok(match tag {
        1 => {
            let length = primitive::read_u16(r)?;
            let mut bytes = vec![0u8; length as usize];
            r.read_exact(&mut bytes)?;
            Entry::Utf8(mutf8::decode(&bytes))
        }
        3 => Entry::Integer(primitive::read_i32(r)?),
        4 => Entry::Float(primitive::read_f32(r)?),
        5 => Entry::Long(primitive::read_i64(r)?),
        6 => Entry::Double(primitive::read_f64(r)?),
        7 => Entry::Class { name_index: primitive::read_u16(r)? },
        8 => Entry::String { string_index: primitive::read_u16(r)? },
        9 => Entry::Fieldref {
            class_index: primitive::read_u16(r)?,
            name_and_type_index: primitive::read_u16(r)?,
        },
        10 => Entry::Methodref {
            class_index: primitive::read_u16(r)?,
            name_and_type_index: primitive::read_u16(r)?,
        },
        11 => Entry::InterfaceMethodref {
            class_index: primitive::read_u16(r)?,
            name_and_type_index: primitive::read_u16(r)?,
        },
        12 => Entry::NameAndType {
            name_index: primitive::read_u16(r)?,
            descriptor_index: primitive::read_u16(r)?,
        },
        15 => Entry::MethodHandle {
            kind: primitive::read_u8(r)?,
            reference_index: primitive::read_u16(r)?,
        },
        16 => Entry::MethodType { descriptor_index: primitive::read_u16(r)? },
        17 => Entry::Dynamic {
            bootstrap_method_attr_index: primitive::read_u16(r)?,
            name_and_type_index: primitive::read_u16(r)?,
        },
        18 => Entry::InvokeDynamic {
            bootstrap_method_attr_index: primitive::read_u16(r)?,
            name_and_type_index: primitive::read_u16(r)?,
        },
        19 => Entry::Module { name_index: primitive::read_u16(r)? },
        20 => Entry::Package { name_index: primitive::read_u16(r)? },
        other => return Err(CodecError::UnknownTag { tag: other, index }),
    })
}

fn write_entry<W: Write>(w: &mut W, entry: &Entry) -> io::Result<()> {
    primitive::write_u8(w, entry.tag())?;
    match entry {
        Entry::Utf8(s) => {
            let bytes = mutf8::encode(s);
            primitive::write_u16(w, bytes.len() as u16)?;
            w.write_all(&bytes)?;
        }
        Entry::Integer(v) => primitive::write_i32(w, *v)?,
        Entry::Float(v) => primitive::write_f32(w, *v)?,
        Entry::Long(v) => primitive::write_i64(w, *v)?,
        Entry::Double(v) => primitive::write_f64(w, *v)?,
        Entry::Class { name_index } => primitive::write_u16(w, *name_index)?,
        Entry::String { string_index } => primitive::write_u16(w, *string_index)?,
        Entry::Fieldref { class_index, name_and_type_index }
        | Entry::Methodref { class_index, name_and_type_index }
        | Entry::InterfaceMethodref { class_index, name_and_type_index } => {
            primitive::write_u16(w, *class_index)?;
            primitive::write_u16(w, *name_and_type_index)?;
        }
        Entry::NameAndType { name_index, descriptor_index } => {
            primitive::write_u16(w, *name_index)?;
            primitive::write_u16(w, *descriptor_index)?;
        }
        Entry::MethodHandle { kind, reference_index } => {
            primitive::write_u8(w, *kind)?;
            primitive::write_u16(w, *reference_index)?;
        }
        Entry::MethodType { descriptor_index } => primitive::write_u16(w, *descriptor_index)?,
        Entry::Dynamic { bootstrap_method_attr_index, name_and_type_index }
        | Entry::InvokeDynamic { bootstrap_method_attr_index, name_and_type_index } => {
            primitive::write_u16(w, *bootstrap_method_attr_index)?;
            primitive::write_u16(w, *name_and_type_index)?;
        }
        Entry::Module { name_index } | Entry::Package { name_index } => {
            primitive::write_u16(w, *name_index)?
        }
    }
    Ok(())
}

/// Walks every reference-carrying entry and records a `BadReference`
/// diagnostic for anything pointing at an unused/reserved/out-of-range
/// slot or the wrong variant — per §7, recoverable, the placeholder index
/// is kept so lossy pools still round-trip.
fn validate_references(pool: &ConstantPool, diagnostics: &mut Diagnostics) {
    let check_utf8 = |pool: &ConstantPool, idx: u16, diags: &mut Diagnostics| {
        if !matches!(pool.get(idx), Lookup::Resolved(Entry::Utf8(_))) {
            diags.push(Diagnostic::bad_reference(idx, "Utf8"));
        }
    };
    let check_class = |pool: &ConstantPool, idx: u16, diags: &mut Diagnostics| {
        if !matches!(pool.get(idx), Lookup::Resolved(Entry::Class { .. })) {
            diags.push(Diagnostic::bad_reference(idx, "Class"));
        }
    };
    let check_nat = |pool: &ConstantPool, idx: u16, diags: &mut Diagnostics| {
        if !matches!(pool.get(idx), Lookup::Resolved(Entry::NameAndType { .. })) {
            diags.push(Diagnostic::bad_reference(idx, "NameAndType"));
        }
    };

    for slot in pool.slots.iter().skip(1) {
        let Slot::Entry(entry) = slot else { continue };
        match entry {
            Entry::Class { name_index } => check_utf8(pool, *name_index, diagnostics),
            Entry::String { string_index } => check_utf8(pool, *string_index, diagnostics),
            Entry::Fieldref { class_index, name_and_type_index }
            | Entry::Methodref { class_index, name_and_type_index }
            | Entry::InterfaceMethodref { class_index, name_and_type_index } => {
                check_class(pool, *class_index, diagnostics);
                check_nat(pool, *name_and_type_index, diagnostics);
            }
            Entry::NameAndType { name_index, descriptor_index } => {
                check_utf8(pool, *name_index, diagnostics);
                check_utf8(pool, *descriptor_index, diagnostics);
            }
            Entry::MethodHandle { reference_index, .. } => {
                match pool.get(*reference_index) {
                    Lookup::Resolved(Entry::Fieldref { .. })
                    | Lookup::Resolved(Entry::Methodref { .. })
                    | Lookup::Resolved(Entry::InterfaceMethodref { .. }) => {}
                    _ => diagnostics.push(Diagnostic::bad_reference(
                        *reference_index,
                        "Fieldref|Methodref|InterfaceMethodref",
                    )),
                }
            }
            Entry::MethodType { descriptor_index } => check_utf8(pool, *descriptor_index, diagnostics),
            Entry::Dynamic { name_and_type_index, .. }
            | Entry::InvokeDynamic { name_and_type_index, .. } => {
                check_nat(pool, *name_and_type_index, diagnostics);
            }
            Entry::Module { name_index } | Entry::Package { name_index } => {
                check_utf8(pool, *name_index, diagnostics)
            }
            Entry::Utf8(_) | Entry::Integer(_) | Entry::Float(_) | Entry::Long(_) | Entry::Double(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;
    use std::io::Cursor;

    impl Arbitrary for Entry {
        fn arbitrary(g: &mut Gen) -> Self {
            let variant = u8::arbitrary(g) % 15;
            match variant {
                0 => Entry::Utf8(String::arbitrary(g)),
                1 => Entry::Integer(i32::arbitrary(g)),
                2 => Entry::Float(f32::arbitrary(g)),
                3 => Entry::Long(i64::arbitrary(g)),
                4 => Entry::Double(f64::arbitrary(g)),
                5 => Entry::Class { name_index: u16::arbitrary(g) },
                6 => Entry::String { string_index: u16::arbitrary(g) },
                7 => Entry::Fieldref {
                    class_index: u16::arbitrary(g),
                    name_and_type_index: u16::arbitrary(g),
                },
                8 => Entry::Methodref {
                    class_index: u16::arbitrary(g),
                    name_and_type_index: u16::arbitrary(g),
                },
                9 => Entry::InterfaceMethodref {
                    class_index: u16::arbitrary(g),
                    name_and_type_index: u16::arbitrary(g),
                },
                10 => Entry::NameAndType {
                    name_index: u16::arbitrary(g),
                    descriptor_index: u16::arbitrary(g),
                },
                11 => Entry::MethodHandle {
                    kind: u8::arbitrary(g),
                    reference_index: u16::arbitrary(g),
                },
                12 => Entry::MethodType { descriptor_index: u16::arbitrary(g) },
                13 => Entry::Dynamic {
                    bootstrap_method_attr_index: u16::arbitrary(g),
                    name_and_type_index: u16::arbitrary(g),
                },
                _ => Entry::Module { name_index: u16::arbitrary(g) },
            }
        }
    }

    /// Every entry's on-disk form round-trips byte for byte, independent of
    /// which slot it lands in (`write_entry`/`read_entry` don't see indices).
    #[quickcheck]
    fn entry_round_trips_through_bytes(entry: Entry) -> bool {
        let mut buf = Vec::new();
        write_entry(&mut buf, &entry).unwrap();
        let tag = buf[0];
        let read_back = read_entry(&mut Cursor::new(&buf[1..]), tag, 1).unwrap();
        read_back == entry
    }

    #[test]
    fn add_is_idempotent() {
        let mut pool = ConstantPool::new();
        let a = pool.add(Entry::Utf8("hello".to_string()));
        let b = pool.add(Entry::Utf8("hello".to_string()));
        assert_eq!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn wide_entry_reserves_following_slot() {
        let mut pool = ConstantPool::new();
        let index = pool.add(Entry::Long(42));
        assert!(matches!(pool.get(index + 1), Lookup::Reserved));
        assert_eq!(pool.len(), index + 2);
    }

    #[test]
    fn lookup_by_value_never_returns_reserved_slot() {
        let mut pool = ConstantPool::new();
        let first = pool.add(Entry::Long(7));
        let second = pool.add(Entry::Long(7));
        assert_eq!(first, second);
    }

    #[test]
    fn only_wide_pool_index_matches_boundary_case() {
        let mut pool = ConstantPool::new();
        pool.add(Entry::Long(1));
        pool.add(Entry::Double(2.0));
        assert_eq!(pool.len() - 1, 2 * 2);
    }

    #[test]
    fn round_trips_bytes() {
        let mut pool = ConstantPool::new();
        pool.add(Entry::Utf8("Empty".to_string()));
        pool.add(Entry::Class { name_index: 1 });
        let mut buf = Vec::new();
        pool.write(&mut buf).unwrap();
        let (read_back, diagnostics) = ConstantPool::read(&mut Cursor::new(buf)).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(read_back.class_name(2), Some("Empty"));
    }

    #[test]
    fn forward_reference_resolves_without_a_second_pass() {
        // Class at index 1 refers to a Utf8 at index 2, which appears later
        // in the pool than the entry that references it.
        let mut buf = Vec::new();
        primitive::write_u16(&mut buf, 3).unwrap();
        primitive::write_u8(&mut buf, 7).unwrap();
        primitive::write_u16(&mut buf, 2).unwrap();
        primitive::write_u8(&mut buf, 1).unwrap();
        primitive::write_u16(&mut buf, 5).unwrap();
        buf.extend_from_slice(b"Empty");
        let (pool, diagnostics) = ConstantPool::read(&mut Cursor::new(buf)).unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(pool.class_name(1), Some("Empty"));
    }

    #[test]
    fn bad_reference_is_recoverable() {
        let mut buf = Vec::new();
        primitive::write_u16(&mut buf, 2).unwrap();
        primitive::write_u8(&mut buf, 7).unwrap();
        primitive::write_u16(&mut buf, 99).unwrap();
        let (pool, diagnostics) = ConstantPool::read(&mut Cursor::new(buf)).unwrap();
        assert!(!diagnostics.is_empty());
        assert!(matches!(pool.get(1), Lookup::Resolved(Entry::Class { .. })));
    }

    #[test]
    fn unknown_tag_is_fatal() {
        let mut buf = Vec::new();
        primitive::write_u16(&mut buf, 2).unwrap();
        primitive::write_u8(&mut buf, 200).unwrap();
        let result = ConstantPool::read(&mut Cursor::new(buf));
        assert!(matches!(result, Err(CodecError::UnknownTag { tag: 200, .. })));
    }
}
