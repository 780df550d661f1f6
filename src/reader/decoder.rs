use alloc::vec::Vec;
use core::fmt;

use log::trace;

use crate::common::{
    Block, ColorTable, DisposalMethod, Extension, GraphicControl, ImageDescriptor, Repeat,
    ScreenDescriptor,
};
use crate::MemoryLimit;

use super::binary::BinaryReader;
use super::lzw::LzwDecoder;

/// GIF palettes are RGB
pub const PLTE_CHANNELS: usize = 3;

const EXT_NAME_NETSCAPE: &[u8] = b"NETSCAPE2.0";

/// Violation of the LZW code stream contract.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The code stream did not start with a CLEAR code.
    MissingClearCode {
        /// The first code found instead.
        found: u16,
    },
    /// More than 4096 codes were registered without a CLEAR in between.
    TableOverflow,
    /// The minimum code size is outside `1..=8`.
    InvalidCodeSize(u8),
}

impl fmt::Display for ProtocolError {
    #[cold]
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ProtocolError::MissingClearCode { found } => {
                write!(fmt, "lzw stream starts with code {} instead of clear", found)
            }
            ProtocolError::TableOverflow => fmt.write_str("lzw code table overflow without clear"),
            ProtocolError::InvalidCodeSize(size) => {
                write!(fmt, "invalid minimal code size {}", size)
            }
        }
    }
}

/// Decoding error.
///
/// Every error aborts the decode; nothing is partially rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodingError {
    /// The file does not start with `GIF`.
    InvalidSignature {
        /// The first three bytes.
        found: [u8; 3],
    },
    /// The version is not `89a`.
    UnsupportedVersion {
        /// The version bytes.
        found: [u8; 3],
    },
    /// The input ended before a required read.
    ///
    /// `offset` is a position in the file, or in the concatenated image data for LZW codes.
    UnexpectedEndOfData {
        /// Byte position of the read that failed.
        offset: usize,
    },
    /// A block starts with a byte that is neither an extension, an image nor the trailer.
    UnknownBlockIntroducer {
        /// Position of the introducer.
        offset: usize,
        /// The introducer byte.
        found: u8,
    },
    /// The LZW code stream breaks the CLEAR/END/table growth rules.
    Protocol(ProtocolError),
    /// An LZW code refers to a table entry that does not exist and cannot be inferred.
    CorruptedStream {
        /// The offending code.
        code: u16,
        /// The code the table would have assigned next.
        next_code: u16,
    },
    /// A byte with a fixed value in the format has a different value.
    ValidationMismatch {
        /// Position of the byte.
        offset: usize,
        /// The value required by the format.
        expected: u8,
        /// The value found.
        found: u8,
    },
    /// Decoding would exceed the configured memory limit.
    MemoryLimit,
    /// A frame does not fit inside the logical screen.
    FrameOutOfBounds,
    /// An image has neither a local nor a global color table.
    MissingColorTable,
    /// The trailer was reached before any image.
    NoImageData,
}

impl fmt::Display for DecodingError {
    #[cold]
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DecodingError::InvalidSignature { ref found } => {
                write!(fmt, "malformed GIF header: signature \"{}\"", found.escape_ascii())
            }
            DecodingError::UnsupportedVersion { ref found } => {
                write!(fmt, "unsupported GIF version \"{}\"", found.escape_ascii())
            }
            DecodingError::UnexpectedEndOfData { offset } => {
                write!(fmt, "unexpected end of data at byte {}", offset)
            }
            DecodingError::UnknownBlockIntroducer { offset, found } => {
                write!(fmt, "unknown block type {:#04x} at byte {}", found, offset)
            }
            DecodingError::Protocol(ref err) => fmt::Display::fmt(err, fmt),
            DecodingError::CorruptedStream { code, next_code } => write!(
                fmt,
                "corrupted lzw stream: code {} with next free code {}",
                code, next_code
            ),
            DecodingError::ValidationMismatch { offset, expected, found } => write!(
                fmt,
                "expected {:#04x}, got {:#04x} at byte {}",
                expected, found, offset
            ),
            DecodingError::MemoryLimit => fmt.write_str("memory limit reached"),
            DecodingError::FrameOutOfBounds => fmt.write_str("frame descriptor is out-of-bounds"),
            DecodingError::MissingColorTable => {
                fmt.write_str("no color table available for current frame")
            }
            DecodingError::NoImageData => fmt.write_str("file does not contain any image data"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodingError {
    #[cold]
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            DecodingError::Protocol(ref err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}

impl From<ProtocolError> for DecodingError {
    #[inline]
    fn from(err: ProtocolError) -> Self {
        DecodingError::Protocol(err)
    }
}

/// Reads the blocks of a GIF file one at a time.
///
/// Knows the byte layout of every block but nothing about how blocks relate to each other; the
/// pairing of control extensions with images lives in [`crate::Decoder`].
pub(crate) struct BlockReader<'a> {
    reader: BinaryReader<'a>,
    memory_limit: MemoryLimit,
}

impl<'a> BlockReader<'a> {
    pub(crate) fn new(data: &'a [u8], memory_limit: MemoryLimit) -> Self {
        BlockReader {
            reader: BinaryReader::new(data),
            memory_limit,
        }
    }

    fn read_tag(&mut self) -> Result<[u8; 3], DecodingError> {
        let raw = self.reader.read_slice(3)?;
        let mut tag = [0; 3];
        tag.copy_from_slice(&raw);
        Ok(tag)
    }

    /// Checks the `GIF` signature, then the `89a` version.
    pub(crate) fn read_header(&mut self) -> Result<(), DecodingError> {
        let signature = self.read_tag()?;
        if &signature != b"GIF" {
            return Err(DecodingError::InvalidSignature { found: signature });
        }
        let version = self.read_tag()?;
        if &version != b"89a" {
            return Err(DecodingError::UnsupportedVersion { found: version });
        }
        Ok(())
    }

    pub(crate) fn read_screen_descriptor(&mut self) -> Result<ScreenDescriptor, DecodingError> {
        let r = &mut self.reader;
        let width = r.read_u16_le()?;
        let height = r.read_u16_le()?;
        let has_global_color_table = r.read_flag()?;
        let color_resolution = r.read_unsigned_bits(3)? as u8;
        let sorted = r.read_flag()?;
        let table_bits = r.read_unsigned_bits(3)?;
        let background_color_index = r.read_u8()?;
        let pixel_aspect_ratio = r.read_u8()?;
        Ok(ScreenDescriptor {
            width,
            height,
            has_global_color_table,
            color_resolution,
            sorted,
            global_color_table_size: 2 << table_bits,
            background_color_index,
            pixel_aspect_ratio,
        })
    }

    /// Reads `entries` RGB triplets.
    pub(crate) fn read_color_table(&mut self, entries: usize) -> Result<ColorTable, DecodingError> {
        let raw = self.reader.read_slice(entries * PLTE_CHANNELS)?;
        Ok(ColorTable::from_rgb(&raw))
    }

    /// Reads the introducer of the next block.
    pub(crate) fn read_block_start(&mut self) -> Result<Block, DecodingError> {
        let offset = self.reader.position();
        let found = self.reader.read_u8()?;
        trace!("block {:#04x} at byte {}", found, offset);
        Block::from_u8(found).ok_or(DecodingError::UnknownBlockIntroducer { offset, found })
    }

    /// Label of the extension whose introducer was just read.
    pub(crate) fn peek_extension_label(&self) -> Result<u8, DecodingError> {
        self.reader.peek_u8(0)
    }

    /// Reads a graphic control extension, starting at its label.
    pub(crate) fn read_graphic_control(&mut self) -> Result<GraphicControl, DecodingError> {
        let r = &mut self.reader;
        r.validate_u8(Extension::Control as u8)?;
        r.validate_u8(4)?;
        r.skip_bits(3)?;
        let disposal = r.read_unsigned_bits(3)? as u8;
        let user_input = r.read_flag()?;
        let transparent_color_flag = r.read_flag()?;
        let delay = r.read_u16_le()?;
        let transparent_index = r.read_u8()?;
        r.validate_u8(0)?;
        Ok(GraphicControl {
            disposal_method: DisposalMethod::from_u8(disposal).unwrap_or(DisposalMethod::Any),
            user_input,
            transparent_color_flag,
            delay,
            transparent_index,
        })
    }

    /// Reads any other extension, starting at its label, returning the label and its data.
    pub(crate) fn read_other_extension(&mut self) -> Result<(u8, Vec<u8>), DecodingError> {
        let label = self.reader.read_u8()?;
        let data = self.read_sub_blocks()?;
        Ok((label, data))
    }

    /// Reads an image descriptor and its local color table. The image data is left unread.
    pub(crate) fn read_image_descriptor(&mut self) -> Result<ImageDescriptor, DecodingError> {
        let r = &mut self.reader;
        let left = r.read_u16_le()?;
        let top = r.read_u16_le()?;
        let width = r.read_u16_le()?;
        let height = r.read_u16_le()?;
        let local_color_table_flag = r.read_flag()?;
        let interlaced = r.read_flag()?;
        let sorted = r.read_flag()?;
        r.skip_bits(2)?;
        let local_color_table_size = 2 << r.read_unsigned_bits(3)?;
        let local_color_table = if local_color_table_flag {
            Some(self.read_color_table(local_color_table_size)?)
        } else {
            None
        };
        Ok(ImageDescriptor {
            left,
            top,
            width,
            height,
            local_color_table,
            interlaced,
            sorted,
            local_color_table_size,
            ..ImageDescriptor::default()
        })
    }

    /// Reads the image data following a descriptor and decompresses it into `frame`.
    pub(crate) fn read_image_data(
        &mut self,
        frame: &mut ImageDescriptor,
        palette_len: usize,
        check_end_code: bool,
    ) -> Result<(), DecodingError> {
        let min_code_size = self.reader.read_u8()?;
        frame.lzw_min_code_size = min_code_size;
        let mut lzw = LzwDecoder::new(min_code_size, palette_len)?;
        lzw.check_end_code(check_end_code);
        lzw.set_output_limit(self.memory_limit.max_bytes());

        let data = self.read_sub_blocks()?;
        frame.index_stream = lzw.decode(&data)?;
        Ok(())
    }

    /// Concatenates length-prefixed sub-blocks up to the zero-length terminator.
    pub(crate) fn read_sub_blocks(&mut self) -> Result<Vec<u8>, DecodingError> {
        let mut data = Vec::new();
        loop {
            let len = usize::from(self.reader.read_u8()?);
            if len == 0 {
                return Ok(data);
            }
            self.memory_limit.try_reserve(&mut data, len)?;
            data.extend_from_slice(&self.reader.read_slice(len)?);
        }
    }
}

/// Loop count carried by a `NETSCAPE2.0` application extension.
pub(crate) fn netscape_repeat(data: &[u8]) -> Option<Repeat> {
    let rest = data.strip_prefix(EXT_NAME_NETSCAPE)?;
    match *rest {
        [1, lo, hi, ..] => Some(match u16::from_le_bytes([lo, hi]) {
            0 => Repeat::Infinite,
            n => Repeat::Finite(n),
        }),
        _ => None,
    }
}
