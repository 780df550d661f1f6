#![allow(dead_code)]

pub const RED: [u8; 3] = [0xFF, 0x00, 0x00];
pub const GREEN: [u8; 3] = [0x00, 0xFF, 0x00];
pub const BLUE: [u8; 3] = [0x00, 0x00, 0xFF];
pub const WHITE: [u8; 3] = [0xFF, 0xFF, 0xFF];

fn table_bits(len: usize) -> u8 {
    assert!(len.is_power_of_two() && (2..=256).contains(&len), "bad table size {}", len);
    len.trailing_zeros() as u8 - 1
}

/// Writes GIF files block by block, compressing image data with weezl.
pub struct GifBuilder {
    data: Vec<u8>,
}

impl GifBuilder {
    pub fn new(width: u16, height: u16, global: Option<&[[u8; 3]]>) -> Self {
        let mut data = b"GIF89a".to_vec();
        data.extend(width.to_le_bytes());
        data.extend(height.to_le_bytes());
        match global {
            Some(table) => {
                data.extend([0x80 | table_bits(table.len()), 0, 0]);
                data.extend(table.iter().flatten());
            }
            None => data.extend([0, 0, 0]),
        }
        GifBuilder { data }
    }

    pub fn graphic_control(mut self, disposal: u8, delay: u16, transparent: Option<u8>) -> Self {
        let flags = (disposal << 2) | u8::from(transparent.is_some());
        self.data.extend([0x21, 0xF9, 4, flags]);
        self.data.extend(delay.to_le_bytes());
        self.data.extend([transparent.unwrap_or(0), 0]);
        self
    }

    pub fn extension(mut self, label: u8, payload: &[u8]) -> Self {
        self.data.extend([0x21, label]);
        self.sub_blocks(payload);
        self
    }

    pub fn netscape_loop(mut self, count: u16) -> Self {
        self.data.extend([0x21, 0xFF, 11]);
        self.data.extend(b"NETSCAPE2.0");
        self.data.extend([3, 1]);
        self.data.extend(count.to_le_bytes());
        self.data.push(0);
        self
    }

    pub fn image(
        self,
        (left, top): (u16, u16),
        (width, height): (u16, u16),
        local: Option<&[[u8; 3]]>,
        indices: &[u8],
    ) -> Self {
        let min_code_size = match local {
            Some(table) => table_bits(table.len()) + 1,
            None => 8,
        };
        self.image_with_code_size((left, top), (width, height), local, min_code_size.max(2), indices)
    }

    pub fn image_with_code_size(
        self,
        (left, top): (u16, u16),
        (width, height): (u16, u16),
        local: Option<&[[u8; 3]]>,
        min_code_size: u8,
        indices: &[u8],
    ) -> Self {
        let compressed = weezl::encode::Encoder::new(weezl::BitOrder::Lsb, min_code_size)
            .encode(indices)
            .unwrap();
        self.raw_image((left, top), (width, height), local, min_code_size, &compressed)
    }

    pub fn raw_image(
        mut self,
        (left, top): (u16, u16),
        (width, height): (u16, u16),
        local: Option<&[[u8; 3]]>,
        min_code_size: u8,
        compressed: &[u8],
    ) -> Self {
        self.data.push(0x2C);
        for value in [left, top, width, height] {
            self.data.extend(value.to_le_bytes());
        }
        match local {
            Some(table) => {
                self.data.push(0x80 | table_bits(table.len()));
                self.data.extend(table.iter().flatten());
            }
            None => self.data.push(0),
        }
        self.data.push(min_code_size);
        self.sub_blocks(compressed);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.data.push(0x3B);
        self.data
    }

    fn sub_blocks(&mut self, payload: &[u8]) {
        for chunk in payload.chunks(255) {
            self.data.push(chunk.len() as u8);
            self.data.extend_from_slice(chunk);
        }
        self.data.push(0);
    }
}

/// An animation exercising every block kind.
pub fn animation() -> Vec<u8> {
    let indices: Vec<u8> = (0..64u32).map(|i| (i % 3) as u8).collect();
    GifBuilder::new(8, 8, Some(&[RED, GREEN, BLUE, WHITE]))
        .netscape_loop(0)
        .extension(0xFE, b"made by hand")
        .graphic_control(1, 10, None)
        .image((0, 0), (8, 8), None, &indices)
        .graphic_control(2, 20, Some(0))
        .image((2, 2), (4, 4), Some(&[BLUE, RED]), &[0, 1, 1, 0, 1, 0, 0, 1, 0, 0, 1, 1, 1, 1, 0, 0])
        .finish()
}
