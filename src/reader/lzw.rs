//! LZW decompression of GIF image data.
use alloc::vec;
use alloc::vec::Vec;
use core::ops::ControlFlow;

use log::{debug, trace};

use super::binary::LsbBitReader;
use super::decoder::{DecodingError, ProtocolError};

/// Codes never grow wider than this.
pub const MAX_CODE_SIZE: u8 = 12;

/// Number of codes addressable with `MAX_CODE_SIZE` bits.
pub const MAX_ENTRIES: usize = 1 << MAX_CODE_SIZE;

/// Meaning of one code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeEntry {
    /// Color table indices emitted for the code.
    Sequence(Vec<u8>),
    /// Resets the table.
    Clear,
    /// Ends the image data.
    End,
}

/// Code table of the decompressor.
///
/// Codes `0..root` are single indices, `root` is CLEAR, `root + 1` is END and everything above
/// is registered while decoding. At most [`MAX_ENTRIES`] codes exist at once.
#[derive(Debug, Clone)]
pub struct CodeTable {
    entries: Vec<CodeEntry>,
    min_code_size: u8,
}

impl CodeTable {
    pub fn new(min_code_size: u8) -> Self {
        let mut table = CodeTable {
            entries: Vec::with_capacity(MAX_ENTRIES),
            min_code_size,
        };
        table.reset();
        table
    }

    /// Drops all registered codes.
    pub fn reset(&mut self) {
        let root = 1u16 << self.min_code_size;
        self.entries.clear();
        self.entries.extend((0..root).map(|index| CodeEntry::Sequence(vec![index as u8])));
        self.entries.push(CodeEntry::Clear);
        self.entries.push(CodeEntry::End);
    }

    #[inline]
    pub fn clear_code(&self) -> u16 {
        1 << self.min_code_size
    }

    #[inline]
    pub fn end_code(&self) -> u16 {
        self.clear_code() + 1
    }

    /// The code the next registration will receive.
    #[inline]
    pub fn next_code(&self) -> u16 {
        self.entries.len() as u16
    }

    #[inline]
    pub fn get(&self, code: u16) -> Option<&CodeEntry> {
        self.entries.get(usize::from(code))
    }

    /// Sequence of `code`, `None` for unassigned and control codes.
    #[inline]
    pub fn sequence(&self, code: u16) -> Option<&[u8]> {
        match self.get(code) {
            Some(CodeEntry::Sequence(sequence)) => Some(sequence),
            _ => None,
        }
    }

    /// Registers `sequence` at [`Self::next_code`].
    pub fn insert(&mut self, sequence: Vec<u8>) -> Result<u16, DecodingError> {
        if self.entries.len() >= MAX_ENTRIES {
            return Err(ProtocolError::TableOverflow.into());
        }
        let code = self.next_code();
        self.entries.push(CodeEntry::Sequence(sequence));
        Ok(code)
    }
}

/// Turns the concatenated sub-blocks of one image into its index stream.
#[derive(Debug, Clone)]
pub struct LzwDecoder {
    table: CodeTable,
    min_code_size: u8,
    code_size: u8,
    prev: Option<u16>,
    check_end_code: bool,
    output_limit: usize,
}

impl LzwDecoder {
    /// Creates a decoder for data compressed with `min_code_size` root bits.
    ///
    /// `palette_len` is the size of the color table the indices refer to.
    pub fn new(min_code_size: u8, palette_len: usize) -> Result<Self, DecodingError> {
        // Indices are bytes, so more than 8 root bits cannot address a color table.
        if !(1..=8).contains(&min_code_size) {
            return Err(ProtocolError::InvalidCodeSize(min_code_size).into());
        }
        if palette_len > 1 << min_code_size {
            debug!(
                "color table has {} entries but {}-bit root codes only address {}",
                palette_len,
                min_code_size,
                1 << min_code_size
            );
        }
        Ok(LzwDecoder {
            table: CodeTable::new(min_code_size),
            min_code_size,
            code_size: min_code_size + 1,
            prev: None,
            check_end_code: true,
            output_limit: usize::MAX,
        })
    }

    /// Configure if the data must contain an END code.
    ///
    /// The default is `true`. When turned off, running out of data returns the indices decoded
    /// so far.
    pub fn check_end_code(&mut self, check: bool) {
        self.check_end_code = check;
    }

    /// Maximum number of indices to produce before failing with `MemoryLimit`.
    pub fn set_output_limit(&mut self, limit: usize) {
        self.output_limit = limit;
    }

    /// Width of the next code to be read.
    #[inline]
    pub fn code_size(&self) -> u8 {
        self.code_size
    }

    #[inline]
    pub fn table(&self) -> &CodeTable {
        &self.table
    }

    fn reset(&mut self) {
        self.table.reset();
        self.code_size = self.min_code_size + 1;
        self.prev = None;
    }

    /// Decodes one image's worth of compressed data.
    pub fn decode(&mut self, data: &[u8]) -> Result<Vec<u8>, DecodingError> {
        self.reset();
        let mut reader = LsbBitReader::new(data);

        let first = reader.read_bits(self.code_size)?;
        if first != self.table.clear_code() {
            return Err(ProtocolError::MissingClearCode { found: first }.into());
        }

        let mut output = Vec::new();
        loop {
            if !self.check_end_code && reader.remaining_bits() < usize::from(self.code_size) {
                debug!("image data ended without end code after {} indices", output.len());
                return Ok(output);
            }
            let code = reader.read_bits(self.code_size)?;
            if self.process_code(code, &mut output)?.is_break() {
                return Ok(output);
            }
        }
    }

    fn process_code(
        &mut self,
        code: u16,
        output: &mut Vec<u8>,
    ) -> Result<ControlFlow<()>, DecodingError> {
        let next_code = self.table.next_code();
        let limit = self.output_limit;
        match self.table.get(code) {
            Some(CodeEntry::Clear) => {
                trace!("clear code after {} indices", output.len());
                self.reset();
                return Ok(ControlFlow::Continue(()));
            }
            Some(CodeEntry::End) => return Ok(ControlFlow::Break(())),
            Some(CodeEntry::Sequence(sequence)) => {
                let first = sequence[0];
                append(output, sequence, limit)?;
                if let Some(prev) = self.prev {
                    self.register(prev, first)?;
                }
            }
            None if code == next_code => {
                // The encoder used the entry it was just about to add: the previous sequence
                // followed by its own first index.
                let prev = self
                    .prev
                    .ok_or(DecodingError::CorruptedStream { code, next_code })?;
                let first = self
                    .table
                    .sequence(prev)
                    .map(|sequence| sequence[0])
                    .ok_or(DecodingError::CorruptedStream { code, next_code })?;
                let registered = self.register(prev, first)?;
                let sequence = self
                    .table
                    .sequence(registered)
                    .ok_or(DecodingError::CorruptedStream { code, next_code })?;
                append(output, sequence, limit)?;
            }
            None => return Err(DecodingError::CorruptedStream { code, next_code }),
        }
        self.prev = Some(code);
        Ok(ControlFlow::Continue(()))
    }

    /// Registers the sequence of `prev` extended by `index` and widens codes when needed.
    fn register(&mut self, prev: u16, index: u8) -> Result<u16, DecodingError> {
        let mut sequence = match self.table.sequence(prev) {
            Some(sequence) => sequence.to_vec(),
            None => {
                return Err(DecodingError::CorruptedStream {
                    code: prev,
                    next_code: self.table.next_code(),
                })
            }
        };
        sequence.push(index);
        let code = self.table.insert(sequence)?;
        if usize::from(self.table.next_code()) == 1 << self.code_size
            && self.code_size < MAX_CODE_SIZE
        {
            self.code_size += 1;
        }
        Ok(code)
    }
}

#[inline]
fn append(output: &mut Vec<u8>, sequence: &[u8], limit: usize) -> Result<(), DecodingError> {
    if output.len().saturating_add(sequence.len()) > limit {
        return Err(DecodingError::MemoryLimit);
    }
    output
        .try_reserve(sequence.len())
        .map_err(|_| DecodingError::MemoryLimit)?;
    output.extend_from_slice(sequence);
    Ok(())
}
