use alloc::vec::Vec;
use core::iter::FusedIterator;
use core::num::NonZeroU64;

use log::{debug, trace, warn};

use crate::common::{
    Block, ColorTable, Extension, GraphicControl, ImageDescriptor, Repeat, ScreenDescriptor,
};

mod binary;
mod converter;
mod decoder;
mod lzw;

pub use self::binary::{BinaryReader, LsbBitReader};
pub use self::converter::{PixelBuffer, Renderer};
pub use self::decoder::{DecodingError, ProtocolError, PLTE_CHANNELS};
pub use self::lzw::{CodeEntry, CodeTable, LzwDecoder};

use self::converter::N_CHANNELS;
use self::decoder::{netscape_repeat, BlockReader};

const DEFAULT_MEMORY_LIMIT: NonZeroU64 = match NonZeroU64::new(50_000_000) {
    Some(limit) => limit,
    None => unreachable!(),
};

#[derive(Clone, Debug, PartialEq, Eq)]
/// The maximum amount of memory the decoder is allowed to use for each buffer it allocates
pub enum MemoryLimit {
    /// Enforce no memory limit.
    ///
    /// If you intend to process images from unknown origins this is a potentially dangerous
    /// constant to use. A few kilobytes of LZW data can expand to many megabytes of indices.
    Unlimited,
    /// Limit each buffer to this many bytes.
    ///
    /// Applies separately to the collected image data, the decoded index stream, the
    /// rendered pixel buffer, and each extension's data.
    Bytes(NonZeroU64),
}

impl MemoryLimit {
    pub(crate) fn check_size(&self, size: usize) -> Result<(), DecodingError> {
        match self {
            Self::Unlimited => Ok(()),
            Self::Bytes(limit) => {
                if size as u64 <= limit.get() {
                    Ok(())
                } else {
                    Err(DecodingError::MemoryLimit)
                }
            }
        }
    }

    /// Largest buffer this limit allows, saturated to the address space.
    pub(crate) fn max_bytes(&self) -> usize {
        match self {
            Self::Unlimited => usize::MAX,
            Self::Bytes(limit) => usize::try_from(limit.get()).unwrap_or(usize::MAX),
        }
    }

    fn buffer_size(&self, width: u16, height: u16) -> Option<usize> {
        let pixels = u64::from(width) * u64::from(height);
        // At most 16GiB, well within u64 range
        let total_bytes = pixels * N_CHANNELS as u64;
        let usize_bytes = usize::try_from(total_bytes).ok()?;

        match self {
            Self::Unlimited => Some(usize_bytes),
            Self::Bytes(limit) => {
                if total_bytes > limit.get() {
                    None
                } else {
                    Some(usize_bytes)
                }
            }
        }
    }

    #[inline]
    pub(crate) fn try_reserve(
        &self,
        vec: &mut Vec<u8>,
        additional: usize,
    ) -> Result<(), DecodingError> {
        let len = vec
            .len()
            .checked_add(additional)
            .ok_or(DecodingError::MemoryLimit)?;
        self.check_size(len)?;
        vec.try_reserve(additional)
            .map_err(|_| DecodingError::MemoryLimit)?;
        Ok(())
    }
}

/// Options for opening a GIF decoder. [`DecodeOptions::read_info`] will start the decoder.
#[derive(Clone, Debug)]
pub struct DecodeOptions {
    memory_limit: MemoryLimit,
    check_frame_consistency: bool,
    check_for_end_code: bool,
    allow_other_extensions: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeOptions {
    /// Creates a new decoder builder
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self {
            memory_limit: MemoryLimit::Bytes(DEFAULT_MEMORY_LIMIT), // 50 MB
            check_frame_consistency: false,
            check_for_end_code: true,
            allow_other_extensions: false,
        }
    }

    /// Configure a memory limit for decoding.
    pub fn set_memory_limit(&mut self, limit: MemoryLimit) {
        self.memory_limit = limit;
    }

    /// Configure if frames must be within the screen descriptor.
    ///
    /// The default is `false`.
    ///
    /// When turned on, every frame descriptor must fit within the logical screen or
    /// [`DecodingError::FrameOutOfBounds`] is returned. When turned off, frames may be larger
    /// than the screen or offset past its edges; rendering clips them.
    pub fn check_frame_consistency(&mut self, check: bool) {
        self.check_frame_consistency = check;
    }

    /// Configure if LZW encoded blocks must end with a marker end code.
    ///
    /// The default is `true`.
    ///
    /// When turned on, image data that runs out before the END code is an
    /// [`DecodingError::UnexpectedEndOfData`]. When turned off, the indices decoded so far are
    /// kept. Note that this might silently ignore some bits of the last byte.
    pub fn check_lzw_end_code(&mut self, check: bool) {
        self.check_for_end_code = check;
    }

    /// Configure if extensions other than graphic control are accepted.
    ///
    /// The default is `false`, in which case every extension is read as a graphic control
    /// extension and any other label is a [`DecodingError::ValidationMismatch`].
    ///
    /// When turned on, a `NETSCAPE2.0` application extension sets [`Decoder::repeat`], comment
    /// extensions are collected into [`Decoder::comments`], and everything else is skipped
    /// using its sub-block framing.
    pub fn allow_other_extensions(&mut self, allow: bool) {
        self.allow_other_extensions = allow;
    }

    /// Reads the header, the logical screen descriptor and the global color table.
    ///
    /// Returns a [`Decoder`] positioned at the first block. All decoder configuration has to be
    /// done beforehand.
    pub fn read_info(self, data: &[u8]) -> Result<Decoder<'_>, DecodingError> {
        Decoder::with_no_init(data, self).init()
    }

    /// Decodes every frame in `data` and renders the first one.
    pub fn decode(self, data: &[u8]) -> Result<DecodedImage, DecodingError> {
        self.read_info(data)?.decode_all()
    }
}

/// Decodes `data` with the default options.
///
/// ```
/// let data = [
///     b'G', b'I', b'F', b'8', b'9', b'a', 3, 0, 1, 0, 0x80, 0, 0,
///     255, 0, 0, 0, 0, 255, // global color table: red, blue
///     0x2C, 0, 0, 0, 0, 3, 0, 1, 0, 0,
///     2, 2, 0x44, 0x50, 0, // image data: clear, 0, 1, 0, end
///     0x3B,
/// ];
/// let image = gifview::decode(&data).unwrap();
/// assert_eq!(image.images[0].index_stream, [0, 1, 0]);
/// assert_eq!(image.pixels.pixel(1, 0), Some([0, 0, 255, 255]));
/// ```
pub fn decode(data: &[u8]) -> Result<DecodedImage, DecodingError> {
    DecodeOptions::new().decode(data)
}

/// Everything found in one GIF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// The logical screen descriptor.
    pub screen: ScreenDescriptor,
    /// The global color table, if the file has one.
    pub global_color_table: Option<ColorTable>,
    /// Every graphic control extension, in file order.
    pub controls: Vec<GraphicControl>,
    /// Every image block, in file order.
    pub images: Vec<ImageDescriptor>,
    /// The first image rendered onto a screen-sized canvas.
    pub pixels: PixelBuffer,
    /// Loop count; only read when other extensions are allowed.
    pub repeat: Repeat,
    /// Comment extension contents; only read when other extensions are allowed.
    pub comments: Vec<Vec<u8>>,
}

/// GIF decoder. Create [`DecodeOptions`] to get started, and call [`DecodeOptions::read_info`].
pub struct Decoder<'a> {
    blocks: BlockReader<'a>,
    options: DecodeOptions,
    screen: ScreenDescriptor,
    global_color_table: Option<ColorTable>,
    bg_color: Option<u8>,
    pending_control: Option<GraphicControl>,
    controls: Vec<GraphicControl>,
    repeat: Repeat,
    comments: Vec<Vec<u8>>,
    frames_read: usize,
    at_eof: bool,
}

impl<'a> Decoder<'a> {
    /// Create a new decoder with default options.
    #[inline]
    pub fn new(data: &'a [u8]) -> Result<Self, DecodingError> {
        DecodeOptions::new().read_info(data)
    }

    /// Return a builder that allows configuring limits etc.
    #[must_use]
    #[inline]
    pub fn build() -> DecodeOptions {
        DecodeOptions::new()
    }

    fn with_no_init(data: &'a [u8], options: DecodeOptions) -> Self {
        Self {
            blocks: BlockReader::new(data, options.memory_limit.clone()),
            options,
            screen: ScreenDescriptor {
                width: 0,
                height: 0,
                has_global_color_table: false,
                color_resolution: 0,
                sorted: false,
                global_color_table_size: 2,
                background_color_index: 0,
                pixel_aspect_ratio: 0,
            },
            global_color_table: None,
            bg_color: None,
            pending_control: None,
            controls: Vec::new(),
            repeat: Repeat::default(),
            comments: Vec::new(),
            frames_read: 0,
            at_eof: false,
        }
    }

    fn init(mut self) -> Result<Self, DecodingError> {
        self.blocks.read_header()?;
        self.screen = self.blocks.read_screen_descriptor()?;
        debug!(
            "logical screen {}x{}, global color table: {}",
            self.screen.width, self.screen.height, self.screen.has_global_color_table
        );
        if self.screen.has_global_color_table {
            let table = self
                .blocks
                .read_color_table(self.screen.global_color_table_size)?;
            // If the background color is invalid, ignore it
            let bg = self.screen.background_color_index;
            if usize::from(bg) < table.len() {
                self.bg_color = Some(bg);
            } else {
                warn!("background index {} outside the global color table", bg);
            }
            self.global_color_table = Some(table);
        }
        Ok(self)
    }

    /// Reads blocks up to and including the next image, and decodes its index stream.
    ///
    /// Returns `Ok(None)` once the trailer is reached. Reaching the trailer before any image is
    /// [`DecodingError::NoImageData`].
    ///
    /// You can also call `.into_iter()` on the decoder to use it as a regular iterator.
    pub fn read_next_frame(&mut self) -> Result<Option<ImageDescriptor>, DecodingError> {
        while !self.at_eof {
            match self.blocks.read_block_start()? {
                Block::Extension => self.read_extension()?,
                Block::Image => return self.read_image().map(Some),
                Block::Trailer => {
                    self.at_eof = true;
                    if self.frames_read == 0 {
                        return Err(DecodingError::NoImageData);
                    }
                }
            }
        }
        Ok(None)
    }

    fn read_extension(&mut self) -> Result<(), DecodingError> {
        let label = self.blocks.peek_extension_label()?;
        if label == Extension::Control as u8 || !self.options.allow_other_extensions {
            let control = self.blocks.read_graphic_control()?;
            if self.pending_control.replace(control).is_some() {
                warn!("graphic control extension replaces an unused one");
            }
            self.controls.push(control);
            return Ok(());
        }

        let (label, data) = self.blocks.read_other_extension()?;
        match Extension::from_u8(label) {
            Some(Extension::Application) => {
                if let Some(repeat) = netscape_repeat(&data) {
                    self.repeat = repeat;
                }
            }
            Some(Extension::Comment) => self.comments.push(data),
            _ => trace!("skipped extension {:#04x}, {} bytes", label, data.len()),
        }
        Ok(())
    }

    fn read_image(&mut self) -> Result<ImageDescriptor, DecodingError> {
        let mut frame = self.blocks.read_image_descriptor()?;
        frame.control = self.pending_control.take();

        if self.options.check_frame_consistency
            && (u32::from(frame.left) + u32::from(frame.width) > u32::from(self.screen.width)
                || u32::from(frame.top) + u32::from(frame.height) > u32::from(self.screen.height))
        {
            return Err(DecodingError::FrameOutOfBounds);
        }

        let palette_len = frame
            .local_color_table
            .as_ref()
            .or(self.global_color_table.as_ref())
            .map(ColorTable::len)
            .ok_or(DecodingError::MissingColorTable)?;

        self.blocks
            .read_image_data(&mut frame, palette_len, self.options.check_for_end_code)?;
        debug!(
            "frame {}: {}x{} at ({}, {}), {} indices",
            self.frames_read,
            frame.width,
            frame.height,
            frame.left,
            frame.top,
            frame.index_stream.len()
        );
        self.frames_read += 1;
        Ok(frame)
    }

    fn decode_all(mut self) -> Result<DecodedImage, DecodingError> {
        let mut images = Vec::new();
        while let Some(frame) = self.read_next_frame()? {
            images.push(frame);
        }
        let first = images.first().ok_or(DecodingError::NoImageData)?;
        let pixels = self.render(first)?;
        Ok(DecodedImage {
            screen: self.screen,
            global_color_table: self.global_color_table,
            controls: self.controls,
            images,
            pixels,
            repeat: self.repeat,
            comments: self.comments,
        })
    }

    /// Renders `frame` onto a screen-sized canvas through its active color table.
    pub fn render(&self, frame: &ImageDescriptor) -> Result<PixelBuffer, DecodingError> {
        self.options
            .memory_limit
            .buffer_size(self.screen.width, self.screen.height)
            .ok_or(DecodingError::MemoryLimit)?;
        let table = frame
            .local_color_table
            .as_ref()
            .or(self.global_color_table.as_ref())
            .ok_or(DecodingError::MissingColorTable)?;
        Ok(Renderer::new(table, frame.transparent()).render_frame(
            self.screen.width,
            self.screen.height,
            frame,
        ))
    }

    /// The logical screen descriptor
    #[inline]
    pub fn screen(&self) -> &ScreenDescriptor {
        &self.screen
    }

    /// The global color table
    pub fn global_color_table(&self) -> Option<&ColorTable> {
        self.global_color_table.as_ref()
    }

    /// Width of the image
    #[inline]
    pub fn width(&self) -> u16 {
        self.screen.width
    }

    /// Height of the image
    #[inline]
    pub fn height(&self) -> u16 {
        self.screen.height
    }

    /// Graphic control extensions read so far
    pub fn controls(&self) -> &[GraphicControl] {
        &self.controls
    }

    /// Comments read so far
    pub fn comments(&self) -> &[Vec<u8>] {
        &self.comments
    }

    /// Index of the background color in the global palette
    ///
    /// `None` without a global color table, or if the index lies outside it.
    pub fn bg_color(&self) -> Option<usize> {
        self.bg_color.map(usize::from)
    }

    /// Number of loop repetitions
    #[inline]
    pub fn repeat(&self) -> Repeat {
        self.repeat
    }
}

impl<'a> IntoIterator for Decoder<'a> {
    type Item = Result<ImageDescriptor, DecodingError>;
    type IntoIter = DecoderIter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        DecoderIter {
            inner: self,
            ended: false,
        }
    }
}

/// Use `decoder.into_iter()` to iterate over the frames
pub struct DecoderIter<'a> {
    inner: Decoder<'a>,
    ended: bool,
}

impl<'a> DecoderIter<'a> {
    /// The decoder, for its accessors.
    pub fn decoder(&self) -> &Decoder<'a> {
        &self.inner
    }
}

impl FusedIterator for DecoderIter<'_> {}

impl Iterator for DecoderIter<'_> {
    type Item = Result<ImageDescriptor, DecodingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.ended {
            match self.inner.read_next_frame() {
                Ok(Some(frame)) => Some(Ok(frame)),
                Ok(None) => {
                    self.ended = true;
                    None
                }
                Err(err) => {
                    self.ended = true;
                    Some(Err(err))
                }
            }
        } else {
            None
        }
    }
}
