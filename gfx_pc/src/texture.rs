//! Conversion of N64 texel formats to RGBA32.
//!
//! Reads past the end of the source data produce transparent black texels instead of
//! failing, since the cache key only bounds how much of the image was loaded.

#![allow(missing_docs)]

use core::fmt;

use bytemuck::cast_slice;

use crate::cmd::{ComponentSize, ImageFormat, Rgba32, TextureLUT};

/// Decoded RGBA32 texture data.
#[derive(Clone, PartialEq, Eq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub rgba8: Vec<u8>,
}

impl fmt::Debug for TextureData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureData")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl TextureData {
    #[track_caller]
    pub fn new(width: u32, height: u32, rgba8: Vec<u8>) -> Self {
        assert!(4 * width as usize * height as usize <= rgba8.len());
        Self {
            width,
            height,
            rgba8,
        }
    }

    /// The texels in row major order.
    pub fn pixels(&self) -> &[[u8; 4]] {
        let len = 4 * self.width as usize * self.height as usize;
        cast_slice(&self.rgba8[..len])
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width {
            return None;
        }
        self.pixels()
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

/// Where the texels of a texture sit in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureLayout {
    pub width: u32,
    pub height: u32,
    /// Distance between the starts of two rows.
    pub row_stride_bytes: u32,
}

/// The palette banks used by color indexed formats.
#[derive(Debug, Clone, Copy, Default)]
pub struct Palettes<'a> {
    pub banks: [&'a [u8]; 2],
    pub tlut: TextureLUT,
}

impl<'a> Palettes<'a> {
    fn color(&self, bank: usize, index: usize) -> [u8; 4] {
        let data = self.banks[bank];
        let i = index * 2;
        let entry = match data.get(i..i + 2) {
            Some(b) => u16::from_be_bytes([b[0], b[1]]),
            None => 0,
        };
        match self.tlut {
            TextureLUT::Ia16 => {
                let [i, a] = entry.to_be_bytes();
                [i, i, i, a]
            }
            _ => {
                let c = Rgba32::from_rgba16(entry);
                [c.r, c.g, c.b, c.a]
            }
        }
    }
}

struct Texels<'a> {
    data: &'a [u8],
    layout: TextureLayout,
}

impl<'a> Texels<'a> {
    fn byte(&self, offset: usize) -> u8 {
        self.data.get(offset).copied().unwrap_or(0)
    }

    fn row_start(&self, y: u32) -> usize {
        y as usize * self.layout.row_stride_bytes as usize
    }

    /// Calls `f` with the row start offset and x coordinate of every texel.
    fn decode(&self, mut f: impl FnMut(usize, u32) -> [u8; 4]) -> TextureData {
        let TextureLayout { width, height, .. } = self.layout;
        let mut rgba8 = Vec::with_capacity(4 * width as usize * height as usize);
        for y in 0..height {
            let row = self.row_start(y);
            for x in 0..width {
                rgba8.extend(f(row, x));
            }
        }
        TextureData::new(width, height, rgba8)
    }
}

fn scale_3_8(v: u8) -> u8 {
    v * 0x24
}

fn scale_4_8(v: u8) -> u8 {
    v * 0x11
}

/// Returns true if [decode_texture] can decode the format and size combination.
pub fn is_supported_format(fmt: ImageFormat, size: ComponentSize) -> bool {
    use ComponentSize::*;
    use ImageFormat::*;

    matches!(
        (fmt, size),
        (Rgba, Bits16 | Bits32)
            | (Ia, Bits4 | Bits8 | Bits16)
            | (I, Bits4 | Bits8)
            | (Ci, Bits4 | Bits8)
    )
}

/// Decodes a texture to RGBA32.
///
/// # Panics
/// Panics if the format and size combination is not one the RDP can sample.
pub fn decode_texture(
    fmt: ImageFormat,
    size: ComponentSize,
    data: &[u8],
    layout: TextureLayout,
    palettes: Palettes<'_>,
    palette_index: u32,
) -> TextureData {
    use ComponentSize::*;
    use ImageFormat::*;

    let t = Texels { data, layout };
    match (fmt, size) {
        (Rgba, Bits16) => t.decode(|row, x| {
            let i = row + 2 * x as usize;
            let c = Rgba32::from_rgba16(u16::from_be_bytes([t.byte(i), t.byte(i + 1)]));
            [c.r, c.g, c.b, c.a]
        }),
        (Rgba, Bits32) => t.decode(|row, x| {
            let i = row + 4 * x as usize;
            [t.byte(i), t.byte(i + 1), t.byte(i + 2), t.byte(i + 3)]
        }),
        (Ia, Bits4) => t.decode(|row, x| {
            let b = t.byte(row + x as usize / 2);
            let v = if x % 2 == 0 { b >> 4 } else { b & 0xF };
            let intensity = scale_3_8(v >> 1);
            [intensity, intensity, intensity, (v & 0x1) * 0xFF]
        }),
        (Ia, Bits8) => t.decode(|row, x| {
            let b = t.byte(row + x as usize);
            let intensity = scale_4_8(b >> 4);
            [intensity, intensity, intensity, scale_4_8(b & 0xF)]
        }),
        (Ia, Bits16) => t.decode(|row, x| {
            let i = row + 2 * x as usize;
            let intensity = t.byte(i);
            [intensity, intensity, intensity, t.byte(i + 1)]
        }),
        (I, Bits4) => t.decode(|row, x| {
            let b = t.byte(row + x as usize / 2);
            let v = scale_4_8(if x % 2 == 0 { b >> 4 } else { b & 0xF });
            [v, v, v, v]
        }),
        (I, Bits8) => t.decode(|row, x| {
            let v = t.byte(row + x as usize);
            [v, v, v, v]
        }),
        (Ci, Bits4) => {
            let bank = (palette_index / 8) as usize % 2;
            let base = (palette_index % 8) as usize * 16;
            t.decode(|row, x| {
                let b = t.byte(row + x as usize / 2);
                let index = if x % 2 == 0 { b >> 4 } else { b & 0xF };
                palettes.color(bank, base + index as usize)
            })
        }
        (Ci, Bits8) => t.decode(|row, x| {
            let index = t.byte(row + x as usize) as usize;
            palettes.color(index / 128, index % 128)
        }),
        _ => panic!("unsupported texture format {:?} {:?}", fmt, size),
    }
}

/// Copies pre-decoded RGBA32 data, padding with transparent texels if it is short.
pub fn raw_texture(data: &[u8], width: u32, height: u32) -> TextureData {
    let len = 4 * width as usize * height as usize;
    let mut rgba8 = data[..len.min(data.len())].to_vec();
    rgba8.resize(len, 0);
    TextureData::new(width, height, rgba8)
}

#[cfg(test)]
mod test {
    use super::*;

    fn layout(width: u32, height: u32, row_stride_bytes: u32) -> TextureLayout {
        TextureLayout {
            width,
            height,
            row_stride_bytes,
        }
    }

    #[test]
    fn test_rgba16_with_stride() {
        // 1x2 texture inside a 2 texel wide image.
        let data = [0xF8, 0x01, 0x00, 0x00, 0x07, 0xC1, 0x00, 0x00];
        let tex = decode_texture(
            ImageFormat::Rgba,
            ComponentSize::Bits16,
            &data,
            layout(1, 2, 4),
            Palettes::default(),
            0,
        );
        assert_eq!(tex.rgba8, vec![255, 0, 0, 255, 0, 255, 0, 255]);
        assert_eq!(tex.pixel(0, 1), Some([0, 255, 0, 255]));
        assert_eq!(tex.pixel(1, 0), None);
    }

    #[test]
    fn test_intensity_formats() {
        let tex = decode_texture(
            ImageFormat::Ia,
            ComponentSize::Bits8,
            &[0xF8],
            layout(1, 1, 1),
            Palettes::default(),
            0,
        );
        assert_eq!(tex.rgba8, vec![0xFF, 0xFF, 0xFF, 0x88]);

        let tex = decode_texture(
            ImageFormat::I,
            ComponentSize::Bits4,
            &[0x0F],
            layout(2, 1, 1),
            Palettes::default(),
            0,
        );
        assert_eq!(tex.rgba8, vec![0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);

        let tex = decode_texture(
            ImageFormat::Ia,
            ComponentSize::Bits4,
            &[0xF0],
            layout(2, 1, 1),
            Palettes::default(),
            0,
        );
        assert_eq!(tex.rgba8, vec![0xFC, 0xFC, 0xFC, 0xFF, 0, 0, 0, 0]);
    }

    #[test]
    fn test_ci4_palette_selection() {
        let mut bank0 = vec![0; 256];
        // Palette 1, entry 2: opaque white.
        bank0[(16 + 2) * 2] = 0xFF;
        bank0[(16 + 2) * 2 + 1] = 0xFF;
        let palettes = Palettes {
            banks: [&bank0, &[]],
            tlut: TextureLUT::Rgba16,
        };
        let tex = decode_texture(
            ImageFormat::Ci,
            ComponentSize::Bits4,
            &[0x20],
            layout(2, 1, 1),
            palettes,
            1,
        );
        assert_eq!(tex.rgba8, vec![255, 255, 255, 255, 0, 0, 0, 0]);
    }

    #[test]
    fn test_ci8_ia16_palette() {
        let mut bank1 = vec![0; 256];
        bank1[2] = 0x80;
        bank1[3] = 0x40;
        let palettes = Palettes {
            banks: [&[], &bank1],
            tlut: TextureLUT::Ia16,
        };
        let tex = decode_texture(
            ImageFormat::Ci,
            ComponentSize::Bits8,
            &[129],
            layout(1, 1, 1),
            palettes,
            0,
        );
        assert_eq!(tex.rgba8, vec![0x80, 0x80, 0x80, 0x40]);
    }

    #[test]
    fn test_short_data_reads_as_transparent() {
        let tex = decode_texture(
            ImageFormat::Rgba,
            ComponentSize::Bits32,
            &[1, 2, 3, 4],
            layout(2, 1, 8),
            Palettes::default(),
            0,
        );
        assert_eq!(tex.rgba8, vec![1, 2, 3, 4, 0, 0, 0, 0]);
    }

    #[test]
    fn test_supported_formats() {
        assert!(is_supported_format(ImageFormat::Ci, ComponentSize::Bits4));
        assert!(is_supported_format(ImageFormat::Rgba, ComponentSize::Bits32));
        assert!(!is_supported_format(ImageFormat::Rgba, ComponentSize::Bits8));
        assert!(!is_supported_format(ImageFormat::Yuv, ComponentSize::Bits16));
    }

    #[test]
    #[should_panic(expected = "unsupported texture format")]
    fn test_unsupported_format_panics() {
        decode_texture(
            ImageFormat::Yuv,
            ComponentSize::Bits16,
            &[],
            layout(1, 1, 2),
            Palettes::default(),
            0,
        );
    }
}
