//! Types shared by the container parser, the LZW decoder and the renderer
use alloc::vec::Vec;

/// Disposal method
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum DisposalMethod {
    /// Decoder is not required to take any action.
    Any = 0,
    /// Do not dispose.
    Keep = 1,
    /// Restore to background color.
    Background = 2,
    /// Restore to previous.
    Previous = 3,
}

impl DisposalMethod {
    /// Converts `u8` to `Option<Self>`
    pub fn from_u8(n: u8) -> Option<DisposalMethod> {
        match n {
            0 => Some(DisposalMethod::Any),
            1 => Some(DisposalMethod::Keep),
            2 => Some(DisposalMethod::Background),
            3 => Some(DisposalMethod::Previous),
            _ => None
        }
    }
}

/// Known GIF block types
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Block {
    /// Image block.
    Image = 0x2C,
    /// Extension block.
    Extension = 0x21,
    /// Image trailer.
    Trailer = 0x3B
}

impl Block {
    /// Converts `u8` to `Option<Self>`
    pub fn from_u8(n: u8) -> Option<Block> {
        match n {
            0x2C => Some(Block::Image),
            0x21 => Some(Block::Extension),
            0x3B => Some(Block::Trailer),
            _ => None
        }
    }
}

/// Known GIF extensions
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Extension {
    /// Text extension.
    Text = 0x01,
    /// Control extension.
    Control = 0xF9,
    /// Comment extension.
    Comment = 0xFE,
    /// Application extension.
    Application = 0xFF
}

impl Extension {
    /// Converts `u8` to `Option<Self>`
    pub fn from_u8(n: u8) -> Option<Extension> {
        match n {
            0x01 => Some(Extension::Text),
            0xF9 => Some(Extension::Control),
            0xFE => Some(Extension::Comment),
            0xFF => Some(Extension::Application),
            _ => None
        }
    }
}

/// Number of animation loops, from the `NETSCAPE2.0` application extension.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Repeat {
    /// Finite number of repetitions.
    Finite(u16),
    /// Looping without end.
    Infinite,
}

impl Default for Repeat {
    fn default() -> Self {
        Repeat::Finite(0)
    }
}

/// One color table entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Expands to RGBA with the given alpha.
    #[inline]
    pub const fn with_alpha(self, a: u8) -> [u8; 4] {
        [self.r, self.g, self.b, a]
    }
}

/// A global or local color table.
///
/// Always holds exactly the number of entries declared by its descriptor, a power of two between
/// 2 and 256.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColorTable {
    entries: Vec<Rgb>,
}

impl ColorTable {
    /// Builds a table from packed `R, G, B` triplets. A trailing partial triplet is ignored.
    pub fn from_rgb(raw: &[u8]) -> Self {
        let entries = raw
            .chunks_exact(3)
            .map(|c| Rgb { r: c[0], g: c[1], b: c[2] })
            .collect();
        ColorTable { entries }
    }

    /// Entry at `index`, if the table is large enough.
    #[inline]
    pub fn get(&self, index: u8) -> Option<Rgb> {
        self.entries.get(usize::from(index)).copied()
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Rgb] {
        &self.entries
    }
}

/// Logical screen descriptor, the canvas every frame is drawn on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScreenDescriptor {
    /// Canvas width.
    pub width: u16,
    /// Canvas height.
    pub height: u16,
    /// True if a global color table follows the descriptor.
    pub has_global_color_table: bool,
    /// Bits per primary color of the original image, minus one.
    pub color_resolution: u8,
    /// True if the global color table is sorted by importance.
    pub sorted: bool,
    /// Number of entries in the global color table, `2^(n+1)`.
    ///
    /// Declared even when `has_global_color_table` is false.
    pub global_color_table_size: usize,
    /// Index of the background color in the global color table.
    pub background_color_index: u8,
    /// Raw aspect ratio byte, `0` if no aspect ratio is given.
    pub pixel_aspect_ratio: u8,
}

/// Graphic control extension.
///
/// Applies to the image block following it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GraphicControl {
    /// Disposal method. Reserved values are reported as `Any`.
    pub disposal_method: DisposalMethod,
    /// True if the frame needs user input to be displayed.
    pub user_input: bool,
    /// True if `transparent_index` is meaningful.
    pub transparent_color_flag: bool,
    /// Frame delay in units of 10 ms.
    pub delay: u16,
    /// Index treated as fully transparent if the flag is set.
    pub transparent_index: u8,
}

impl GraphicControl {
    /// Transparent index (if available).
    #[inline]
    pub fn transparent(&self) -> Option<u8> {
        if self.transparent_color_flag {
            Some(self.transparent_index)
        } else {
            None
        }
    }
}

/// An image block: its descriptor fields plus the decoded index stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageDescriptor {
    /// Offset from the left border of the canvas.
    pub left: u16,
    /// Offset from the top border of the canvas.
    pub top: u16,
    /// Width of the frame.
    pub width: u16,
    /// Height of the frame.
    pub height: u16,
    /// Frame local color table if available.
    pub local_color_table: Option<ColorTable>,
    /// True if the image is interlaced. The index stream is never reordered.
    pub interlaced: bool,
    /// True if the local color table is sorted.
    pub sorted: bool,
    /// Declared size of the local color table, present or not.
    pub local_color_table_size: usize,
    /// Root code size of the LZW data.
    pub lzw_min_code_size: u8,
    /// One color table index per pixel, in reading order.
    pub index_stream: Vec<u8>,
    /// The control extension that preceded this image, if any.
    pub control: Option<GraphicControl>,
}

impl ImageDescriptor {
    /// True if a local color table is present.
    #[inline]
    pub fn local_color_table_flag(&self) -> bool {
        self.local_color_table.is_some()
    }

    /// Transparent index taken from the paired control extension.
    #[inline]
    pub fn transparent(&self) -> Option<u8> {
        self.control.as_ref().and_then(GraphicControl::transparent)
    }

    /// Number of pixels described by `width` and `height`.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }
}
