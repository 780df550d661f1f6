//! Cursors over raw bytes.
//!
//! GIF packs the flag fields of its descriptors most significant bit first, but packs LZW codes
//! least significant bit first. Each convention gets its own reader so neither has to carry a
//! mode switch.
use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::traits::Primitive;

use super::decoder::DecodingError;

/// Cursor over an immutable byte buffer.
///
/// Multi-byte integers default to big-endian, with `_le` variants for little-endian data. Bits
/// are read most significant first. Byte reads on a cursor that is not byte-aligned take the next
/// eight bits.
///
/// A failed read never moves the cursor.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    index: usize,
    bit_offset: u8,
}

impl<'a> BinaryReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        BinaryReader { data, index: 0, bit_offset: 0 }
    }

    /// Creates a reader positioned at byte `offset`, which may equal `data.len()`.
    pub fn with_offset(data: &'a [u8], offset: usize) -> Result<Self, DecodingError> {
        if offset > data.len() {
            return Err(DecodingError::UnexpectedEndOfData { offset: data.len() });
        }
        Ok(BinaryReader { data, index: offset, bit_offset: 0 })
    }

    /// Index of the current byte.
    #[inline]
    pub fn position(&self) -> usize {
        self.index
    }

    /// Bits already consumed from the current byte, `0..=7`.
    #[inline]
    pub fn bit_offset(&self) -> u8 {
        self.bit_offset
    }

    /// Number of whole bytes left.
    #[inline]
    pub fn remaining(&self) -> usize {
        (self.total_bits() - self.bit_pos()) / 8
    }

    /// True if at least one unread bit remains.
    #[inline]
    pub fn can_read_more(&self) -> bool {
        self.index < self.data.len()
    }

    #[inline]
    fn bit_pos(&self) -> usize {
        self.index * 8 + usize::from(self.bit_offset)
    }

    #[inline]
    fn total_bits(&self) -> usize {
        self.data.len().saturating_mul(8)
    }

    #[inline]
    fn seek_bits(&mut self, pos: usize) {
        self.index = pos / 8;
        self.bit_offset = (pos % 8) as u8;
    }

    /// Absolute bit position `offset_bits` past the cursor.
    fn pos_after(&self, offset_bits: usize) -> Result<usize, DecodingError> {
        self.bit_pos()
            .checked_add(offset_bits)
            .ok_or(DecodingError::UnexpectedEndOfData { offset: self.data.len() })
    }

    fn ensure_bits(&self, start: usize, count: usize) -> Result<(), DecodingError> {
        match start.checked_add(count) {
            Some(end) if end <= self.total_bits() => Ok(()),
            _ => Err(DecodingError::UnexpectedEndOfData { offset: start / 8 }),
        }
    }

    #[inline]
    fn bit_at(&self, pos: usize) -> u8 {
        (self.data[pos / 8] >> (7 - pos % 8)) & 1
    }

    fn bits_at(&self, start: usize, count: u8) -> Result<u32, DecodingError> {
        self.ensure_bits(start, usize::from(count))?;
        Ok((start..start + usize::from(count))
            .fold(0, |value, pos| (value << 1) | u32::from(self.bit_at(pos))))
    }

    fn fill_at(&self, start: usize, buf: &mut [u8]) -> Result<(), DecodingError> {
        self.ensure_bits(start, buf.len().saturating_mul(8))?;
        if start % 8 == 0 {
            let from = start / 8;
            buf.copy_from_slice(&self.data[from..from + buf.len()]);
        } else {
            for (i, byte) in buf.iter_mut().enumerate() {
                *byte = self.bits_at(start + i * 8, 8)? as u8;
            }
        }
        Ok(())
    }

    fn peek_with<T: Primitive>(&self, offset: usize, convert: fn(&[u8]) -> T) -> Result<T, DecodingError> {
        let start = self.pos_after(offset.saturating_mul(8))?;
        let mut raw = [0; 4];
        let raw = &mut raw[..T::SIZE];
        self.fill_at(start, raw)?;
        Ok(convert(raw))
    }

    /// Peeks a big-endian `T` located `offset` bytes past the cursor.
    #[inline]
    pub fn peek_be<T: Primitive>(&self, offset: usize) -> Result<T, DecodingError> {
        self.peek_with(offset, T::from_be_slice)
    }

    /// Peeks a little-endian `T` located `offset` bytes past the cursor.
    #[inline]
    pub fn peek_le<T: Primitive>(&self, offset: usize) -> Result<T, DecodingError> {
        self.peek_with(offset, T::from_le_slice)
    }

    /// Reads a big-endian `T`.
    #[inline]
    pub fn read_be<T: Primitive>(&mut self) -> Result<T, DecodingError> {
        let value = self.peek_be(0)?;
        self.seek_bits(self.bit_pos() + T::SIZE * 8);
        Ok(value)
    }

    /// Reads a little-endian `T`.
    #[inline]
    pub fn read_le<T: Primitive>(&mut self) -> Result<T, DecodingError> {
        let value = self.peek_le(0)?;
        self.seek_bits(self.bit_pos() + T::SIZE * 8);
        Ok(value)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, DecodingError> {
        self.read_be()
    }

    #[inline]
    pub fn peek_u8(&self, offset: usize) -> Result<u8, DecodingError> {
        self.peek_be(offset)
    }

    #[inline]
    pub fn read_i8(&mut self) -> Result<i8, DecodingError> {
        self.read_be()
    }

    #[inline]
    pub fn peek_i8(&self, offset: usize) -> Result<i8, DecodingError> {
        self.peek_be(offset)
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16, DecodingError> {
        self.read_be()
    }

    #[inline]
    pub fn read_u16_le(&mut self) -> Result<u16, DecodingError> {
        self.read_le()
    }

    #[inline]
    pub fn peek_u16(&self, offset: usize) -> Result<u16, DecodingError> {
        self.peek_be(offset)
    }

    #[inline]
    pub fn peek_u16_le(&self, offset: usize) -> Result<u16, DecodingError> {
        self.peek_le(offset)
    }

    #[inline]
    pub fn read_i16(&mut self) -> Result<i16, DecodingError> {
        self.read_be()
    }

    #[inline]
    pub fn read_i16_le(&mut self) -> Result<i16, DecodingError> {
        self.read_le()
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32, DecodingError> {
        self.read_be()
    }

    #[inline]
    pub fn read_u32_le(&mut self) -> Result<u32, DecodingError> {
        self.read_le()
    }

    #[inline]
    pub fn read_i32(&mut self) -> Result<i32, DecodingError> {
        self.read_be()
    }

    #[inline]
    pub fn read_i32_le(&mut self) -> Result<i32, DecodingError> {
        self.read_le()
    }

    /// Reads `count` big-endian values. Nothing is consumed unless all of them are available.
    pub fn read_be_array<T: Primitive>(&mut self, count: usize) -> Result<Vec<T>, DecodingError> {
        self.ensure_bits(self.bit_pos(), count.saturating_mul(T::SIZE * 8))?;
        (0..count).map(|_| self.read_be()).collect()
    }

    /// Reads `count` little-endian values. Nothing is consumed unless all of them are available.
    pub fn read_le_array<T: Primitive>(&mut self, count: usize) -> Result<Vec<T>, DecodingError> {
        self.ensure_bits(self.bit_pos(), count.saturating_mul(T::SIZE * 8))?;
        (0..count).map(|_| self.read_le()).collect()
    }

    pub fn read_u8_array(&mut self, count: usize) -> Result<Vec<u8>, DecodingError> {
        Ok(self.read_slice(count)?.into_owned())
    }

    /// Reads `count` raw bytes, borrowing them when the cursor is byte-aligned.
    pub fn read_slice(&mut self, count: usize) -> Result<Cow<'a, [u8]>, DecodingError> {
        let start = self.bit_pos();
        self.ensure_bits(start, count.saturating_mul(8))?;
        let bytes = if self.bit_offset == 0 {
            let data: &'a [u8] = self.data;
            Cow::Borrowed(&data[self.index..self.index + count])
        } else {
            let mut owned = vec![0; count];
            self.fill_at(start, &mut owned)?;
            Cow::Owned(owned)
        };
        self.seek_bits(start + count * 8);
        Ok(bytes)
    }

    /// Peeks a fixed-length ASCII string, mapping each byte to one `char`.
    pub fn peek_ascii(&self, len: usize) -> Result<String, DecodingError> {
        let start = self.bit_pos();
        self.ensure_bits(start, len.saturating_mul(8))?;
        (0..len)
            .map(|i| self.bits_at(start + i * 8, 8).map(|b| char::from(b as u8)))
            .collect()
    }

    /// Reads a fixed-length ASCII string, mapping each byte to one `char`.
    pub fn read_ascii(&mut self, len: usize) -> Result<String, DecodingError> {
        let text = self.peek_ascii(len)?;
        self.seek_bits(self.bit_pos() + len * 8);
        Ok(text)
    }

    /// Reads up to a NUL byte and consumes it.
    pub fn read_c_string(&mut self) -> Result<String, DecodingError> {
        let start = self.bit_pos();
        let mut text = String::new();
        loop {
            match self.read_u8() {
                Ok(0) => return Ok(text),
                Ok(b) => text.push(char::from(b)),
                Err(err) => {
                    self.seek_bits(start);
                    return Err(err);
                }
            }
        }
    }

    /// Skips `count` whole bytes.
    pub fn skip(&mut self, count: usize) -> Result<(), DecodingError> {
        self.skip_bits(count.saturating_mul(8))
    }

    /// Reads the bit at the cursor, counted from the most significant bit of the current byte.
    #[inline]
    pub fn read_bit(&mut self) -> Result<u8, DecodingError> {
        let bit = self.peek_bit(0)?;
        self.seek_bits(self.bit_pos() + 1);
        Ok(bit)
    }

    /// Peeks the bit located `offset` bits past the cursor.
    #[inline]
    pub fn peek_bit(&self, offset: usize) -> Result<u8, DecodingError> {
        let pos = self.pos_after(offset)?;
        self.ensure_bits(pos, 1)?;
        Ok(self.bit_at(pos))
    }

    #[inline]
    pub fn read_flag(&mut self) -> Result<bool, DecodingError> {
        Ok(self.read_bit()? == 1)
    }

    #[inline]
    pub fn peek_flag(&self, offset: usize) -> Result<bool, DecodingError> {
        Ok(self.peek_bit(offset)? == 1)
    }

    /// Folds `count` bits into an integer, first bit most significant.
    ///
    /// # Panics:
    /// *   If `count > 32`.
    pub fn read_unsigned_bits(&mut self, count: u8) -> Result<u32, DecodingError> {
        let value = self.peek_unsigned_bits(count, 0)?;
        self.seek_bits(self.bit_pos() + usize::from(count));
        Ok(value)
    }

    /// Like [`Self::read_unsigned_bits`], starting `offset` bits past the cursor.
    ///
    /// # Panics:
    /// *   If `count > 32`.
    pub fn peek_unsigned_bits(&self, count: u8, offset: usize) -> Result<u32, DecodingError> {
        assert!(count <= 32, "at most 32 bits fit into the result");
        self.bits_at(self.pos_after(offset)?, count)
    }

    pub fn skip_bits(&mut self, count: usize) -> Result<(), DecodingError> {
        let start = self.bit_pos();
        self.ensure_bits(start, count)?;
        self.seek_bits(start + count);
        Ok(())
    }

    /// Reads one byte and checks it against a fixed value of the format.
    pub fn validate_u8(&mut self, expected: u8) -> Result<(), DecodingError> {
        let offset = self.index;
        let found = self.read_u8()?;
        if found != expected {
            return Err(DecodingError::ValidationMismatch { offset, expected, found });
        }
        Ok(())
    }
}

/// Bit cursor for LZW code streams.
///
/// Reads from the least significant unread bit of the current byte towards the most significant
/// one, and the first bit read becomes the least significant bit of the result.
#[derive(Debug, Clone)]
pub struct LsbBitReader<'a> {
    data: &'a [u8],
    index: usize,
    bit_offset: u8,
}

impl<'a> LsbBitReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        LsbBitReader { data, index: 0, bit_offset: 0 }
    }

    /// Reads `count` bits. Fails without consuming anything if fewer remain.
    ///
    /// # Panics:
    /// *   If `count > 16`.
    pub fn read_bits(&mut self, count: u8) -> Result<u16, DecodingError> {
        assert!(count <= 16, "LZW codes are at most 12 bits wide");
        if self.remaining_bits() < usize::from(count) {
            return Err(DecodingError::UnexpectedEndOfData { offset: self.index });
        }
        let mut value = 0u16;
        for position in 0..count {
            let bit = (self.data[self.index] >> self.bit_offset) & 1;
            value |= u16::from(bit) << position;
            if self.bit_offset == 7 {
                self.bit_offset = 0;
                self.index += 1;
            } else {
                self.bit_offset += 1;
            }
        }
        Ok(value)
    }

    /// True if at least one unread bit remains.
    #[inline]
    pub fn can_read_more(&self) -> bool {
        self.index < self.data.len()
    }

    #[inline]
    pub fn remaining_bits(&self) -> usize {
        (self.data.len() - self.index) * 8 - usize::from(self.bit_offset)
    }
}

#[cfg(test)]
mod test {
    use super::{BinaryReader, LsbBitReader};
    use crate::DecodingError;
    use alloc::borrow::Cow;
    use alloc::vec::Vec;

    #[test]
    fn msb_and_lsb_orders_are_mirrored() {
        let data = [0b1011_0010];

        let mut msb = BinaryReader::new(&data);
        let bits: Vec<u8> = (0..8).map(|_| msb.read_bit().unwrap()).collect();
        assert_eq!(bits, [1, 0, 1, 1, 0, 0, 1, 0]);
        assert!(!msb.can_read_more());

        let mut lsb = LsbBitReader::new(&data);
        let bits: Vec<u16> = (0..8).map(|_| lsb.read_bits(1).unwrap()).collect();
        assert_eq!(bits, [0, 1, 0, 0, 1, 1, 0, 1]);
        assert!(!lsb.can_read_more());
    }

    #[test]
    fn unsigned_bits_fold_msb_first() {
        let data = [0b1011_0010, 0b0100_0000];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_unsigned_bits(3).unwrap(), 0b101);
        assert_eq!(reader.read_unsigned_bits(6).unwrap(), 0b10010_0);
        assert_eq!(reader.position(), 1);
        assert_eq!(reader.bit_offset(), 1);
        assert!(reader.read_flag().unwrap());
    }

    #[test]
    fn lsb_codes_span_bytes() {
        // CLEAR(4), 0, 1, 0 at three bits, END(5) at four bits
        let data = [0x44, 0x50];
        let mut reader = LsbBitReader::new(&data);
        assert_eq!(reader.read_bits(3).unwrap(), 4);
        assert_eq!(reader.read_bits(3).unwrap(), 0);
        assert_eq!(reader.read_bits(3).unwrap(), 1);
        assert_eq!(reader.read_bits(3).unwrap(), 0);
        assert_eq!(reader.remaining_bits(), 4);
        assert_eq!(reader.read_bits(4).unwrap(), 5);
        assert_eq!(
            reader.read_bits(1),
            Err(DecodingError::UnexpectedEndOfData { offset: 2 })
        );
    }

    #[test]
    fn integers_by_byte_order() {
        let data = [0x12, 0x34, 0xFF, 0xFE, 0x01, 0x00, 0x00, 0x80];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.peek_u16(0).unwrap(), 0x1234);
        assert_eq!(reader.peek_u16_le(0).unwrap(), 0x3412);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_i16().unwrap(), -2);
        assert_eq!(reader.read_u32_le().unwrap(), 0x8000_0001);
        assert!(!reader.can_read_more());
    }

    #[test]
    fn peeks_do_not_move() {
        let data = [0xAB, 0xCD];
        let reader = BinaryReader::new(&data);
        assert_eq!(reader.peek_u8(1).unwrap(), 0xCD);
        assert_eq!(reader.peek_bit(8).unwrap(), 1);
        assert_eq!(reader.peek_unsigned_bits(4, 4).unwrap(), 0xB);
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.remaining(), 2);
    }

    #[test]
    fn unaligned_bytes() {
        let data = [0b1111_0000, 0b1010_1010];
        let mut reader = BinaryReader::new(&data);
        reader.skip_bits(4).unwrap();
        assert_eq!(reader.peek_u8(0).unwrap(), 0b0000_1010);
        let bytes = reader.read_slice(1).unwrap();
        assert!(matches!(bytes, Cow::Owned(_)));
        assert_eq!(&*bytes, &[0b0000_1010]);
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.read_unsigned_bits(4).unwrap(), 0b1010);
    }

    #[test]
    fn aligned_slices_are_borrowed() {
        let data = *b"GIF89a";
        let mut reader = BinaryReader::new(&data);
        assert!(matches!(reader.read_slice(3).unwrap(), Cow::Borrowed(b"GIF")));
        assert_eq!(reader.read_ascii(3).unwrap(), "89a");
    }

    #[test]
    fn strings() {
        let data = b"NETSCAPE\0rest";
        let mut reader = BinaryReader::new(data);
        assert_eq!(reader.peek_ascii(3).unwrap(), "NET");
        assert_eq!(reader.read_c_string().unwrap(), "NETSCAPE");
        assert_eq!(reader.position(), 9);
        assert!(reader.read_c_string().is_err());
        assert_eq!(reader.position(), 9);
    }

    #[test]
    fn arrays() {
        let data = [0, 1, 0, 2, 0, 3];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_be_array::<u16>(2).unwrap(), [1, 2]);
        assert!(reader.read_le_array::<u16>(2).is_err());
        assert_eq!(reader.read_le_array::<u16>(1).unwrap(), [0x0300]);
    }

    #[test]
    fn reads_past_end_fail_in_place() {
        let data = [0x01];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(
            reader.read_u16(),
            Err(DecodingError::UnexpectedEndOfData { offset: 0 })
        );
        assert_eq!(reader.position(), 0);
        reader.skip_bits(7).unwrap();
        assert!(reader.read_unsigned_bits(2).is_err());
        assert_eq!(reader.read_bit().unwrap(), 1);
        assert!(reader.read_bit().is_err());
        assert!(reader.skip(1).is_err());
    }

    #[test]
    fn validate_reports_offset() {
        let data = [0x21, 0xF8];
        let mut reader = BinaryReader::with_offset(&data, 1).unwrap();
        assert_eq!(
            reader.validate_u8(0xF9),
            Err(DecodingError::ValidationMismatch { offset: 1, expected: 0xF9, found: 0xF8 })
        );
        assert!(BinaryReader::with_offset(&data, 3).is_err());
        assert!(!BinaryReader::with_offset(&data, 2).unwrap().can_read_more());
    }
}
