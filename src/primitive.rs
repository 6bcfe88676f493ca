//! Big-endian fixed-width primitive codec (§4.1).
//!
//! The class-file format is big-endian throughout. This module is a thin,
//! no-alloc wrapper over [`byteorder`] so the rest of the crate reads and
//! writes through one vocabulary instead of sprinkling `::<BE>` everywhere.

use std::io::{self, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, BE};

pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    r.read_u8()
}

pub fn read_u16<R: Read>(r: &mut R) -> io::Result<u16> {
    r.read_u16::<BE>()
}

pub fn read_i16<R: Read>(r: &mut R) -> io::Result<i16> {
    r.read_i16::<BE>()
}

pub fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    r.read_u32::<BE>()
}

pub fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    r.read_i32::<BE>()
}

pub fn read_i64<R: Read>(r: &mut R) -> io::Result<i64> {
    r.read_i64::<BE>()
}

pub fn read_f32<R: Read>(r: &mut R) -> io::Result<f32> {
    r.read_f32::<BE>()
}

pub fn read_f64<R: Read>(r: &mut R) -> io::Result<f64> {
    r.read_f64::<BE>()
}

/// Reads a `(high, low)` pair of u32s, as used by the `Long`/`Double`
/// constant-pool entries before they are folded into a single 64-bit value.
pub fn read_u32_pair<R: Read>(r: &mut R) -> io::Result<(u32, u32)> {
    Ok((read_u32(r)?, read_u32(r)?))
}

pub fn write_u8<W: Write>(w: &mut W, v: u8) -> io::Result<()> {
    w.write_u8(v)
}

pub fn write_u16<W: Write>(w: &mut W, v: u16) -> io::Result<()> {
    w.write_u16::<BE>(v)
}

pub fn write_i16<W: Write>(w: &mut W, v: i16) -> io::Result<()> {
    w.write_i16::<BE>(v)
}

pub fn write_u32<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_u32::<BE>(v)
}

pub fn write_i32<W: Write>(w: &mut W, v: i32) -> io::Result<()> {
    w.write_i32::<BE>(v)
}

pub fn write_i64<W: Write>(w: &mut W, v: i64) -> io::Result<()> {
    w.write_i64::<BE>(v)
}

pub fn write_f32<W: Write>(w: &mut W, v: f32) -> io::Result<()> {
    w.write_f32::<BE>(v)
}

pub fn write_f64<W: Write>(w: &mut W, v: f64) -> io::Result<()> {
    w.write_f64::<BE>(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_every_width() {
        let mut buf = Vec::new();
        write_u16(&mut buf, 0xBEEF).unwrap();
        write_i32(&mut buf, -12345).unwrap();
        write_f64(&mut buf, 3.5).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_u16(&mut cursor).unwrap(), 0xBEEF);
        assert_eq!(read_i32(&mut cursor).unwrap(), -12345);
        assert_eq!(read_f64(&mut cursor).unwrap(), 3.5);
    }
}
