//! Rasterizer state: tiles, texture loads, othermode, color registers and render targets.

#![allow(missing_docs)]

use crate::{
    cmd::*,
    error::GfxResult,
    memory::{Arena, Pointer},
    resource::RawTexMetadata,
};

pub const NUM_TILES: usize = 8;

/// The cycle type bits of the high othermode word.
pub const CYCLE_TYPE_SHIFT: u32 = 20;
pub const TEXTURE_FILTER_SHIFT: u32 = 12;
pub const TEXTURE_LUT_SHIFT: u32 = 14;
pub const TEXTURE_LOD_FLAG: u32 = 1 << 16;

/// Both othermode words. `h` is the high word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OtherMode {
    pub h: u32,
    pub l: u32,
}

impl OtherMode {
    pub fn cycle_type(self) -> CycleType {
        CycleType::try_from(((self.h >> CYCLE_TYPE_SHIFT) & 0x3) as u8).unwrap_or_default()
    }

    pub fn texture_filter(self) -> TextureFilter {
        TextureFilter::try_from(((self.h >> TEXTURE_FILTER_SHIFT) & 0x3) as u8).unwrap_or_default()
    }

    pub fn texture_lut(self) -> TextureLUT {
        TextureLUT::try_from(((self.h >> TEXTURE_LUT_SHIFT) & 0x3) as u8).unwrap_or_default()
    }

    pub fn texture_lod(self) -> bool {
        self.h & TEXTURE_LOD_FLAG != 0
    }

    pub fn alpha_compare(self) -> AlphaCompare {
        AlphaCompare::try_from((self.l & 0x3) as u8).unwrap_or_default()
    }

    pub fn render_mode(self) -> RenderMode {
        RenderMode::from(self.l)
    }

    /// Blending against memory with `1 - alpha`.
    pub fn use_alpha(self) -> bool {
        let cycle = self.render_mode().blend_cycle2;
        cycle.color2 == BlendColor::Memory && cycle.alpha2 == BlendAlpha2::OneMinusAlpha
    }

    pub fn use_fog(self) -> bool {
        self.render_mode().blend_cycle1.color1 == BlendColor::Fog
    }

    pub fn texture_edge(self) -> bool {
        self.render_mode()
            .flags
            .contains(RenderModeFlags::CVG_X_ALPHA)
    }

    /// Blends a zero alpha input against memory, which draws nothing.
    pub fn invisible(self) -> bool {
        let cycle = self.render_mode().blend_cycle2;
        cycle.alpha1 == BlendAlpha1::Zero && cycle.color2 == BlendColor::Memory
    }

    pub fn z_update(self) -> bool {
        self.render_mode().flags.contains(RenderModeFlags::Z_UPDATE)
    }

    pub fn z_decal(self) -> bool {
        self.render_mode().z_mode == ZMode::Decal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tile {
    pub params: TileParams,
    pub size: TileSize,
    pub line_size_bytes: u32,
    /// Which of the two loaded texture slots this tile samples.
    pub tmem_index: usize,
}

/// The image most recently set with SETTIMG.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureImage {
    pub fmt: ImageFormat,
    pub size: ComponentSize,
    pub width: u32,
    pub addr: Pointer,
    pub metadata: RawTexMetadata,
}

/// Texture data copied into one half of texture memory by LOADBLOCK or LOADTILE.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadedTexture {
    pub addr: Option<Pointer>,
    /// Bytes covered in the source image, used as part of the cache key.
    pub orig_size_bytes: u32,
    pub size_bytes: u32,
    pub full_image_line_size_bytes: u32,
    pub line_size_bytes: u32,
    pub metadata: RawTexMetadata,
}

/// A rectangle in window pixels with a bottom left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone)]
pub struct RdpState {
    pub palettes: [Option<Pointer>; 2],
    pub texture_to_load: Option<TextureImage>,
    pub loaded_textures: [LoadedTexture; 2],
    pub tiles: [Tile; NUM_TILES],
    /// The tile selected by the TEXTURE command.
    pub first_tile_index: usize,
    pub textures_changed: [bool; 2],
    pub other_mode: OtherMode,
    pub combine_mode: CombineMode,
    pub grayscale: bool,
    pub env_color: Rgba32,
    pub prim_color: Rgba32,
    pub fog_color: Rgba32,
    pub fill_color: Rgba32,
    pub blend_color: Rgba32,
    pub grayscale_color: Rgba32,
    pub prim_lod_fraction: u8,
    pub viewport: ScreenRect,
    pub scissor: ScreenRect,
    pub viewport_or_scissor_changed: bool,
    pub color_image: Option<Pointer>,
    pub depth_image: Option<Pointer>,
}

impl Default for RdpState {
    fn default() -> Self {
        Self {
            palettes: [None; 2],
            texture_to_load: None,
            loaded_textures: [LoadedTexture::default(); 2],
            tiles: [Tile::default(); NUM_TILES],
            first_tile_index: 0,
            textures_changed: [true; 2],
            other_mode: OtherMode::default(),
            combine_mode: CombineMode::default(),
            grayscale: false,
            env_color: Rgba32::default(),
            prim_color: Rgba32::default(),
            fog_color: Rgba32::default(),
            fill_color: Rgba32::default(),
            blend_color: Rgba32::default(),
            grayscale_color: Rgba32::new(255, 255, 255, 255),
            prim_lod_fraction: 0,
            viewport: ScreenRect::default(),
            scissor: ScreenRect::default(),
            viewport_or_scissor_changed: true,
            color_image: None,
            depth_image: None,
        }
    }
}

impl RdpState {
    pub fn mark_textures_changed(&mut self) {
        self.textures_changed = [true; 2];
    }

    pub fn set_texture_image(&mut self, image: TextureImage) {
        self.texture_to_load = Some(image);
    }

    pub fn set_tile(&mut self, tile: TileIndex, mut params: TileParams) {
        if params.cms == WrapMode::WRAP && params.masks == 0 {
            params.cms = WrapMode::CLAMP;
        }
        if params.cmt == WrapMode::WRAP && params.maskt == 0 {
            params.cmt = WrapMode::CLAMP;
        }
        let t = &mut self.tiles[tile.0 as usize];
        t.params = params;
        t.line_size_bytes = params.line * 8;
        t.tmem_index = usize::from(params.tmem != 0);
        self.mark_textures_changed();
    }

    pub fn set_tile_size(&mut self, tile: TileIndex, size: TileSize) {
        self.tiles[tile.0 as usize].size = size;
        self.mark_textures_changed();
    }

    fn image_to_load(&self, op: &str) -> Option<TextureImage> {
        if self.texture_to_load.is_none() {
            tracing::warn!("{} without a texture image", op);
        }
        self.texture_to_load
    }

    pub fn load_tlut(&mut self, tile: TileIndex, high_index: u32) {
        let image = match self.image_to_load("LOADTLUT") {
            Some(image) => image,
            None => return,
        };
        match self.tiles[tile.0 as usize].params.tmem {
            256 => {
                self.palettes[0] = Some(image.addr);
                if high_index == 255 {
                    self.palettes[1] = Some(image.addr.add(2 * 128));
                }
            }
            384 => self.palettes[1] = Some(image.addr),
            tmem => tracing::warn!("LOADTLUT to tmem {} outside the palette banks", tmem),
        }
    }

    pub fn load_block(&mut self, tile: TileIndex, block: TextureBlock) {
        let image = match self.image_to_load("LOADBLOCK") {
            Some(image) => image,
            None => return,
        };
        let size_bytes = (block.lrs + 1) << image.size.load_shift();
        let tmem_index = self.tiles[tile.0 as usize].tmem_index;
        self.loaded_textures[tmem_index] = LoadedTexture {
            addr: Some(image.addr),
            orig_size_bytes: size_bytes,
            size_bytes,
            full_image_line_size_bytes: size_bytes,
            line_size_bytes: size_bytes,
            metadata: image.metadata,
        };
        self.textures_changed[tmem_index] = true;
    }

    pub fn load_tile(&mut self, tile: TileIndex, size: TileSize) {
        let image = match self.image_to_load("LOADTILE") {
            Some(image) => image,
            None => return,
        };
        let shift = image.size.load_shift();
        let offset_x = size.uls >> 2;
        let offset_y = size.ult >> 2;
        let tile_width = (size.lrs.saturating_sub(size.uls) >> 2) + 1;
        let tile_height = (size.lrt.saturating_sub(size.ult) >> 2) + 1;
        let full_image_line_size_bytes = image.width << shift;
        let line_size_bytes = tile_width << shift;
        let start_offset = full_image_line_size_bytes * offset_y + (offset_x << shift);

        let tmem_index = self.tiles[tile.0 as usize].tmem_index;
        self.loaded_textures[tmem_index] = LoadedTexture {
            addr: Some(image.addr.add(start_offset)),
            orig_size_bytes: line_size_bytes * tile_height,
            size_bytes: line_size_bytes * tile_height,
            full_image_line_size_bytes,
            line_size_bytes,
            metadata: image.metadata,
        };
        self.tiles[tile.0 as usize].size = size;
        self.textures_changed[tmem_index] = true;
    }

    pub fn set_other_mode(&mut self, h: u32, l: u32) {
        self.other_mode = OtherMode { h, l };
    }

    /// The fill color register holds two RGBA5551 pixels; the first is used.
    pub fn set_fill_color(&mut self, packed: u32) {
        self.fill_color = Rgba32::from_rgba16((packed >> 16) as u16);
    }
}

/// A viewport as stored in display list memory, in quarter pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub scale: [i16; 4],
    pub trans: [i16; 4],
}

impl Viewport {
    pub fn read(arena: &Arena, pointer: Pointer) -> GfxResult<Self> {
        let mut vp = Self::default();
        for i in 0..4 {
            vp.scale[i] = arena.read_i16(pointer.add(2 * i as u32))?;
            vp.trans[i] = arena.read_i16(pointer.add(8 + 2 * i as u32))?;
        }
        Ok(vp)
    }

    /// The viewport in native pixels with a top left origin. `y` is the bottom edge.
    pub fn native_rect(&self) -> ScreenRect {
        let width = 2.0 * self.scale[0] as f32 / 4.0;
        let height = 2.0 * self.scale[1] as f32 / 4.0;
        ScreenRect {
            x: self.trans[0] as f32 / 4.0 - width / 2.0,
            y: self.trans[1] as f32 / 4.0 + height / 2.0,
            width,
            height,
        }
    }
}

/// A scissor rectangle in native pixels with a top left origin. `y` is the bottom edge.
pub fn scissor_native_rect(rect: Rectangle<u32>) -> ScreenRect {
    ScreenRect {
        x: rect.ulx as f32 / 4.0,
        y: rect.lry as f32 / 4.0,
        width: rect.lrx.saturating_sub(rect.ulx) as f32 / 4.0,
        height: rect.lry.saturating_sub(rect.uly) as f32 / 4.0,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::BufferHandle;

    fn image(size: ComponentSize, width: u32) -> TextureImage {
        TextureImage {
            fmt: ImageFormat::Rgba,
            size,
            width,
            addr: Pointer::new(BufferHandle(3), 0x100),
            metadata: RawTexMetadata::default(),
        }
    }

    #[test]
    fn test_set_tile_clamps_unmasked_wrap() {
        let mut rdp = RdpState::default();
        rdp.textures_changed = [false; 2];
        rdp.set_tile(
            TileIndex(0),
            TileParams {
                line: 4,
                tmem: 256,
                cms: WrapMode::WRAP,
                masks: 0,
                cmt: WrapMode::MIRROR,
                maskt: 5,
                ..Default::default()
            },
        );
        let tile = rdp.tiles[0];
        assert_eq!(tile.params.cms, WrapMode::CLAMP);
        assert_eq!(tile.params.cmt, WrapMode::MIRROR);
        assert_eq!(tile.line_size_bytes, 32);
        assert_eq!(tile.tmem_index, 1);
        assert_eq!(rdp.textures_changed, [true; 2]);
    }

    #[test]
    fn test_load_block_size() {
        let mut rdp = RdpState::default();
        rdp.set_texture_image(image(ComponentSize::Bits16, 1));
        // 32x32 RGBA16: lrs = texels - 1
        rdp.load_block(TileIndex::LOAD, TextureBlock {
            uls: 0,
            ult: 0,
            lrs: 1023,
            dxt: 0,
        });
        assert_eq!(rdp.loaded_textures[0].size_bytes, 2048);
        assert_eq!(rdp.loaded_textures[0].orig_size_bytes, 2048);
    }

    #[test]
    fn test_load_tile_offsets() {
        let mut rdp = RdpState::default();
        rdp.set_texture_image(image(ComponentSize::Bits16, 64));
        // 16x8 sub-image at (4, 2) of a 64 texel wide image.
        rdp.load_tile(TileIndex::LOAD, TileSize {
            uls: 4 << 2,
            ult: 2 << 2,
            lrs: 19 << 2,
            lrt: 9 << 2,
        });
        let loaded = rdp.loaded_textures[0];
        assert_eq!(loaded.full_image_line_size_bytes, 128);
        assert_eq!(loaded.line_size_bytes, 32);
        assert_eq!(loaded.size_bytes, 32 * 8);
        assert_eq!(loaded.orig_size_bytes, 32 * 8);
        assert_eq!(
            loaded.addr,
            Some(Pointer::new(BufferHandle(3), 0x100 + 2 * 128 + 8))
        );
    }

    #[test]
    fn test_load_tlut_banks() {
        let mut rdp = RdpState::default();
        rdp.set_texture_image(image(ComponentSize::Bits16, 1));
        rdp.set_tile(TileIndex::LOAD, TileParams {
            tmem: 256,
            ..Default::default()
        });
        rdp.load_tlut(TileIndex::LOAD, 255);
        assert_eq!(rdp.palettes[0], Some(Pointer::new(BufferHandle(3), 0x100)));
        assert_eq!(rdp.palettes[1], Some(Pointer::new(BufferHandle(3), 0x200)));
    }

    #[test]
    fn test_other_mode_flags() {
        let mut om = OtherMode::default();
        // G_RM_AA_ZB_XLU_SURF | G_RM_AA_ZB_XLU_SURF2
        om.l = 0x0050_49D8;
        om.h = 1 << CYCLE_TYPE_SHIFT;
        assert!(om.use_alpha());
        assert!(!om.use_fog());
        assert!(!om.z_update());
        assert_eq!(om.cycle_type(), CycleType::TwoCycle);
        assert_eq!(om.texture_filter(), TextureFilter::Point);
    }

    #[test]
    fn test_viewport_rect() {
        let vp = Viewport {
            scale: [640, 480, 511, 0],
            trans: [640, 480, 511, 0],
        };
        let rect = vp.native_rect();
        assert_eq!(rect.x, 0.0);
        assert_eq!(rect.y, 240.0);
        assert_eq!(rect.width, 320.0);
        assert_eq!(rect.height, 240.0);
    }
}
