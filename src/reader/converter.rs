use alloc::vec;
use alloc::vec::Vec;

use log::warn;

use crate::common::{ColorTable, ImageDescriptor};

pub(crate) const N_CHANNELS: usize = 4;

/// Decoded RGBA pixels, row by row.
///
/// Pixels that no index wrote to stay `[0, 0, 0, 0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u16,
    height: u16,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// RGBA value at (`x`, `y`).
    pub fn pixel(&self, x: u16, y: u16) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (usize::from(y) * usize::from(self.width) + usize::from(x)) * N_CHANNELS;
        let rgba = self.data.get(offset..offset + N_CHANNELS)?;
        Some([rgba[0], rgba[1], rgba[2], rgba[3]])
    }

    /// Raw RGBA bytes, `width * height * 4` of them.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Iterates over all pixels in reading order.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.data
            .chunks_exact(N_CHANNELS)
            .map(|rgba| [rgba[0], rgba[1], rgba[2], rgba[3]])
    }
}

/// Maps index streams through a color table.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    table: &'a ColorTable,
    transparent: Option<u8>,
}

impl<'a> Renderer<'a> {
    /// Pixels whose index equals `transparent` get an alpha of zero.
    #[must_use]
    pub fn new(table: &'a ColorTable, transparent: Option<u8>) -> Self {
        Renderer { table, transparent }
    }

    /// Renders `indices` onto a `width` by `height` buffer, one index per pixel.
    ///
    /// Indices without a color table entry are skipped, as are indices past the end of the
    /// buffer.
    pub fn render(&self, width: u16, height: u16, indices: &[u8]) -> PixelBuffer {
        let mut buffer = blank(width, height);
        self.blit(&mut buffer, 0, 0, width, indices);
        buffer
    }

    /// Renders a frame at its offset on a `screen_width` by `screen_height` canvas.
    ///
    /// Parts of the frame outside the canvas are clipped.
    pub fn render_frame(
        &self,
        screen_width: u16,
        screen_height: u16,
        frame: &ImageDescriptor,
    ) -> PixelBuffer {
        let mut buffer = blank(screen_width, screen_height);
        let indices = frame
            .index_stream
            .get(..frame.pixel_count())
            .unwrap_or(&frame.index_stream);
        self.blit(&mut buffer, frame.left, frame.top, frame.width, indices);
        buffer
    }

    fn blit(&self, buffer: &mut PixelBuffer, left: u16, top: u16, width: u16, indices: &[u8]) {
        if width == 0 {
            return;
        }
        let (screen_width, screen_height) = (usize::from(buffer.width), usize::from(buffer.height));
        let (left, top) = (usize::from(left), usize::from(top));
        let mut skipped = 0usize;
        for (row, line) in indices.chunks(usize::from(width)).enumerate() {
            let y = top + row;
            if y >= screen_height {
                break;
            }
            for (column, &idx) in line.iter().enumerate() {
                let x = left + column;
                if x >= screen_width {
                    break;
                }
                let color = match self.table.get(idx) {
                    Some(color) => color,
                    None => {
                        skipped += 1;
                        continue;
                    }
                };
                let alpha = if self.transparent == Some(idx) { 0x00 } else { 0xFF };
                let offset = (y * screen_width + x) * N_CHANNELS;
                buffer.data[offset..offset + N_CHANNELS].copy_from_slice(&color.with_alpha(alpha));
            }
        }
        if skipped > 0 {
            warn!(
                "{} pixels refer to indices beyond the {}-entry color table",
                skipped,
                self.table.len()
            );
        }
    }
}

fn blank(width: u16, height: u16) -> PixelBuffer {
    PixelBuffer {
        width,
        height,
        data: vec![0; usize::from(width) * usize::from(height) * N_CHANNELS],
    }
}
