//! Basic byte-level decoding and encoding primitives,
//! parameterized by byte order.
//!
//! These are the lowest layer of the codec:
//! fixed-width integer and floating point values and attribute tags,
//! with no knowledge of element headers or values.
use byteordered::byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use byteordered::Endianness;
use dcmkit_core::Tag;
use std::io::{Read, Result as IoResult, Write};

/// A byte order aware decoder of primitive values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicDecoder {
    endianness: Endianness,
}

impl BasicDecoder {
    /// Create a decoder for the given byte order.
    pub fn new(endianness: Endianness) -> Self {
        BasicDecoder { endianness }
    }

    /// The byte order of this decoder.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Decode an attribute tag (group then element).
    pub fn decode_tag<S: ?Sized + Read>(&self, source: &mut S) -> IoResult<Tag> {
        let group = self.decode_us(source)?;
        let element = self.decode_us(source)?;
        Ok(Tag(group, element))
    }

    /// Decode an unsigned short.
    pub fn decode_us<S: ?Sized + Read>(&self, source: &mut S) -> IoResult<u16> {
        match self.endianness {
            Endianness::Little => source.read_u16::<LittleEndian>(),
            Endianness::Big => source.read_u16::<BigEndian>(),
        }
    }

    /// Decode an unsigned long (32 bits).
    pub fn decode_ul<S: ?Sized + Read>(&self, source: &mut S) -> IoResult<u32> {
        match self.endianness {
            Endianness::Little => source.read_u32::<LittleEndian>(),
            Endianness::Big => source.read_u32::<BigEndian>(),
        }
    }

    /// Decode an unsigned very long (64 bits).
    pub fn decode_uv<S: ?Sized + Read>(&self, source: &mut S) -> IoResult<u64> {
        match self.endianness {
            Endianness::Little => source.read_u64::<LittleEndian>(),
            Endianness::Big => source.read_u64::<BigEndian>(),
        }
    }

    /// Decode a signed short.
    pub fn decode_ss<S: ?Sized + Read>(&self, source: &mut S) -> IoResult<i16> {
        match self.endianness {
            Endianness::Little => source.read_i16::<LittleEndian>(),
            Endianness::Big => source.read_i16::<BigEndian>(),
        }
    }

    /// Decode a signed long (32 bits).
    pub fn decode_sl<S: ?Sized + Read>(&self, source: &mut S) -> IoResult<i32> {
        match self.endianness {
            Endianness::Little => source.read_i32::<LittleEndian>(),
            Endianness::Big => source.read_i32::<BigEndian>(),
        }
    }

    /// Decode a single precision floating point number.
    pub fn decode_fl<S: ?Sized + Read>(&self, source: &mut S) -> IoResult<f32> {
        match self.endianness {
            Endianness::Little => source.read_f32::<LittleEndian>(),
            Endianness::Big => source.read_f32::<BigEndian>(),
        }
    }

    /// Decode a double precision floating point number.
    pub fn decode_fd<S: ?Sized + Read>(&self, source: &mut S) -> IoResult<f64> {
        match self.endianness {
            Endianness::Little => source.read_f64::<LittleEndian>(),
            Endianness::Big => source.read_f64::<BigEndian>(),
        }
    }
}

/// A byte order aware encoder of primitive values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicEncoder {
    endianness: Endianness,
}

impl BasicEncoder {
    /// Create an encoder for the given byte order.
    pub fn new(endianness: Endianness) -> Self {
        BasicEncoder { endianness }
    }

    /// The byte order of this encoder.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Encode an attribute tag (group then element).
    pub fn encode_tag<W: ?Sized + Write>(&self, to: &mut W, tag: Tag) -> IoResult<()> {
        self.encode_us(to, tag.group())?;
        self.encode_us(to, tag.element())
    }

    /// Encode an unsigned short.
    pub fn encode_us<W: ?Sized + Write>(&self, to: &mut W, value: u16) -> IoResult<()> {
        match self.endianness {
            Endianness::Little => to.write_u16::<LittleEndian>(value),
            Endianness::Big => to.write_u16::<BigEndian>(value),
        }
    }

    /// Encode an unsigned long (32 bits).
    pub fn encode_ul<W: ?Sized + Write>(&self, to: &mut W, value: u32) -> IoResult<()> {
        match self.endianness {
            Endianness::Little => to.write_u32::<LittleEndian>(value),
            Endianness::Big => to.write_u32::<BigEndian>(value),
        }
    }

    /// Encode an unsigned very long (64 bits).
    pub fn encode_uv<W: ?Sized + Write>(&self, to: &mut W, value: u64) -> IoResult<()> {
        match self.endianness {
            Endianness::Little => to.write_u64::<LittleEndian>(value),
            Endianness::Big => to.write_u64::<BigEndian>(value),
        }
    }

    /// Encode a signed short.
    pub fn encode_ss<W: ?Sized + Write>(&self, to: &mut W, value: i16) -> IoResult<()> {
        match self.endianness {
            Endianness::Little => to.write_i16::<LittleEndian>(value),
            Endianness::Big => to.write_i16::<BigEndian>(value),
        }
    }

    /// Encode a signed long (32 bits).
    pub fn encode_sl<W: ?Sized + Write>(&self, to: &mut W, value: i32) -> IoResult<()> {
        match self.endianness {
            Endianness::Little => to.write_i32::<LittleEndian>(value),
            Endianness::Big => to.write_i32::<BigEndian>(value),
        }
    }

    /// Encode a single precision floating point number.
    pub fn encode_fl<W: ?Sized + Write>(&self, to: &mut W, value: f32) -> IoResult<()> {
        match self.endianness {
            Endianness::Little => to.write_f32::<LittleEndian>(value),
            Endianness::Big => to.write_f32::<BigEndian>(value),
        }
    }

    /// Encode a double precision floating point number.
    pub fn encode_fd<W: ?Sized + Write>(&self, to: &mut W, value: f64) -> IoResult<()> {
        match self.endianness {
            Endianness::Little => to.write_f64::<LittleEndian>(value),
            Endianness::Big => to.write_f64::<BigEndian>(value),
        }
    }
}

/// Byte-swap a buffer of fixed-width binary values in place,
/// for VRs whose values toggle with the byte order.
///
/// `unit` is the width of one value in bytes.
/// A trailing partial unit, which can only appear in malformed data,
/// is left untouched.
pub fn swap_bytes(data: &mut [u8], unit: usize) {
    if unit <= 1 {
        return;
    }
    for chunk in data.chunks_exact_mut(unit) {
        chunk.reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_tag_both_orders() {
        let bytes = [0x02, 0x00, 0x10, 0x00];
        let le = BasicDecoder::new(Endianness::Little);
        assert_eq!(le.decode_tag(&mut &bytes[..]).unwrap(), Tag(0x0002, 0x0010));
        let bytes = [0x00, 0x02, 0x00, 0x10];
        let be = BasicDecoder::new(Endianness::Big);
        assert_eq!(be.decode_tag(&mut &bytes[..]).unwrap(), Tag(0x0002, 0x0010));
    }

    #[test]
    fn encode_decode_roundtrip() {
        for endianness in [Endianness::Little, Endianness::Big] {
            let enc = BasicEncoder::new(endianness);
            let dec = BasicDecoder::new(endianness);
            let mut buf = Vec::new();
            enc.encode_us(&mut buf, 0xCAFE).unwrap();
            enc.encode_ul(&mut buf, 0xDEAD_BEEF).unwrap();
            enc.encode_fd(&mut buf, 0.5).unwrap();
            let mut cursor = &buf[..];
            assert_eq!(dec.decode_us(&mut cursor).unwrap(), 0xCAFE);
            assert_eq!(dec.decode_ul(&mut cursor).unwrap(), 0xDEAD_BEEF);
            assert_eq!(dec.decode_fd(&mut cursor).unwrap(), 0.5);
        }
    }

    #[test]
    fn swap_bytes_by_unit() {
        let mut data = [1, 2, 3, 4];
        swap_bytes(&mut data, 2);
        assert_eq!(data, [2, 1, 4, 3]);
        let mut data = [1, 2, 3, 4];
        swap_bytes(&mut data, 4);
        assert_eq!(data, [4, 3, 2, 1]);
        // trailing partial unit is preserved
        let mut data = [1, 2, 3];
        swap_bytes(&mut data, 2);
        assert_eq!(data, [2, 1, 3]);
    }
}
