//! # GIF89a decoder
//!
//! Decodes a GIF file held in memory into RGBA pixels plus the metadata of every frame.
//!
//! Header flags are read most significant bit first with [`BinaryReader`], LZW codes least
//! significant bit first with [`LsbBitReader`]. [`LzwDecoder`] rebuilds the index stream of each
//! image and [`Renderer`] maps it through the active color table.
//!
//! # Examples
//!
//! Decode a whole file at once and get the first frame rendered:
//! ```rust,no_run
//! let data = std::fs::read("animation.gif").unwrap();
//! let image = gifview::decode(&data).unwrap();
//! println!("{}x{}, {} frames", image.pixels.width(), image.pixels.height(), image.images.len());
//! ```
//!
//! Or walk the frames one by one with [`DecodeOptions`]:
//! ```rust,no_run
//! # let data = std::fs::read("animation.gif").unwrap();
//! let mut options = gifview::DecodeOptions::new();
//! options.allow_other_extensions(true);
//! let mut decoder = options.read_info(&data).unwrap();
//! while let Some(frame) = decoder.read_next_frame().unwrap() {
//!     let pixels = decoder.render(&frame).unwrap();
//!     // Process every frame
//! }
//! ```
#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod common;
mod reader;
mod traits;

pub use crate::common::{
    Block, ColorTable, DisposalMethod, Extension, GraphicControl, ImageDescriptor, Repeat, Rgb,
    ScreenDescriptor,
};

pub use crate::reader::{decode, DecodeOptions, DecodedImage, Decoder, DecoderIter, MemoryLimit};
pub use crate::reader::{
    BinaryReader, CodeEntry, CodeTable, LsbBitReader, LzwDecoder, PixelBuffer, Renderer,
};
pub use crate::reader::{DecodingError, ProtocolError, PLTE_CHANNELS};
pub use crate::traits::Primitive;

