//! S2DEX background and sprite commands.
//!
//! Backgrounds and sprites are drawn as texture rectangles. The texture is loaded through
//! the regular tile and load machinery, so it shares the texture cache with 3D draws.

#![allow(missing_docs)]

use crate::{
    backend::{RenderingApi, WindowManagerApi},
    cmd::*,
    error::GfxResult,
    interpret::Interpreter,
    memory::{Arena, Pointer},
    rdp::TextureImage,
    resource::RawTexMetadata,
};

const OBJ_FLAG_FLIP_S: u8 = 0x01;
const OBJ_FLAG_FLIP_T: u8 = 0x10;

const TXTR_BLOCK: u32 = 0x0000_1033;
const TXTR_TILE: u32 = 0x00FC_1034;
const TXTR_TLUT: u32 = 0x0000_0030;

const SPRITE_SIZE: u32 = 24;

/// The 2D object matrix. Only the translation and base scale position sprites.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjMatrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    /// Translation in 10.2 screen pixels.
    pub x: i16,
    pub y: i16,
    /// Scale in 5.10.
    pub base_scale_x: u16,
    pub base_scale_y: u16,
}

impl Default for ObjMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            x: 0,
            y: 0,
            base_scale_x: 1 << 10,
            base_scale_y: 1 << 10,
        }
    }
}

impl ObjMatrix {
    fn read(arena: &Arena, pointer: Pointer) -> GfxResult<Self> {
        let fixed = |offset: u32| -> GfxResult<f32> {
            Ok(arena.read_i32(pointer.add(offset))? as f32 / 65536.0)
        };
        Ok(Self {
            a: fixed(0)?,
            b: fixed(4)?,
            c: fixed(8)?,
            d: fixed(12)?,
            x: arena.read_i16(pointer.add(16))?,
            y: arena.read_i16(pointer.add(18))?,
            base_scale_x: arena.read_u16(pointer.add(20))?,
            base_scale_y: arena.read_u16(pointer.add(22))?,
        })
    }

    fn read_sub(&mut self, arena: &Arena, pointer: Pointer) -> GfxResult<()> {
        self.x = arena.read_i16(pointer)?;
        self.y = arena.read_i16(pointer.add(2))?;
        self.base_scale_x = arena.read_u16(pointer.add(4))?;
        self.base_scale_y = arena.read_u16(pointer.add(6))?;
        Ok(())
    }
}

/// State carried between S2DEX commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct S2dexState {
    pub matrix: ObjMatrix,
    pub render_mode: u32,
}

/// A background image description. Sizes and positions are 10.2 pixels.
#[derive(Debug, Clone, Copy)]
struct ObjBg {
    image_x: u16,
    image_w: u16,
    frame_x: i16,
    frame_w: u16,
    image_y: u16,
    image_h: u16,
    frame_y: i16,
    frame_h: u16,
    image_ptr: u32,
    image_fmt: u8,
    image_siz: u8,
    image_pal: u16,
    /// 5.10 scale of the one cycle variant.
    scale_w: u16,
    scale_h: u16,
}

impl ObjBg {
    fn read(arena: &Arena, pointer: Pointer, scaled: bool) -> GfxResult<Self> {
        let u16_at = |offset: u32| arena.read_u16(pointer.add(offset));
        let i16_at = |offset: u32| arena.read_i16(pointer.add(offset));
        let (scale_w, scale_h) = if scaled {
            (u16_at(28)?, u16_at(30)?)
        } else {
            (1 << 10, 1 << 10)
        };
        Ok(Self {
            image_x: u16_at(0)?,
            image_w: u16_at(2)?,
            frame_x: i16_at(4)?,
            frame_w: u16_at(6)?,
            image_y: u16_at(8)?,
            image_h: u16_at(10)?,
            frame_y: i16_at(12)?,
            frame_h: u16_at(14)?,
            image_ptr: arena.read_u32(pointer.add(16))?,
            image_fmt: arena.read_u8(pointer.add(22))?,
            image_siz: arena.read_u8(pointer.add(23))?,
            image_pal: u16_at(24)?,
            scale_w,
            scale_h,
        })
    }
}

/// A sprite drawn from texture memory.
#[derive(Debug, Clone, Copy)]
struct ObjSprite {
    /// 10.2 screen position.
    obj_x: i16,
    obj_y: i16,
    /// 5.10 texels per pixel.
    scale_w: u16,
    scale_h: u16,
    /// 10.5 texels.
    image_w: u16,
    image_h: u16,
    /// Row length and texture memory address, in 64 bit words.
    image_stride: u16,
    image_adrs: u16,
    image_fmt: u8,
    image_siz: u8,
    image_pal: u8,
    image_flags: u8,
}

impl ObjSprite {
    fn read(arena: &Arena, pointer: Pointer) -> GfxResult<Self> {
        let u16_at = |offset: u32| arena.read_u16(pointer.add(offset));
        let u8_at = |offset: u32| arena.read_u8(pointer.add(offset));
        Ok(Self {
            obj_x: arena.read_i16(pointer)?,
            scale_w: u16_at(2)?,
            image_w: u16_at(4)?,
            obj_y: arena.read_i16(pointer.add(8))?,
            scale_h: u16_at(10)?,
            image_h: u16_at(12)?,
            image_stride: u16_at(16)?,
            image_adrs: u16_at(18)?,
            image_fmt: u8_at(20)?,
            image_siz: u8_at(21)?,
            image_pal: u8_at(22)?,
            image_flags: u8_at(23)?,
        })
    }
}

/// A texture load into texture memory.
#[derive(Debug, Clone, Copy)]
struct ObjTxtr {
    kind: u32,
    image: u32,
    tmem: u16,
    /// Block size, tile width or palette head, depending on the kind.
    size: u16,
    /// Block line, tile height or palette count, depending on the kind.
    line: u16,
}

impl ObjTxtr {
    fn read(arena: &Arena, pointer: Pointer) -> GfxResult<Self> {
        Ok(Self {
            kind: arena.read_u32(pointer)?,
            image: arena.read_u32(pointer.add(4))?,
            tmem: arena.read_u16(pointer.add(8))?,
            size: arena.read_u16(pointer.add(10))?,
            line: arena.read_u16(pointer.add(12))?,
        })
    }
}

fn image_format(fmt: u8) -> ImageFormat {
    ImageFormat::try_from(fmt).unwrap_or_else(|_| {
        tracing::warn!("invalid image format {}", fmt);
        ImageFormat::Rgba
    })
}

fn component_size(siz: u8) -> ComponentSize {
    ComponentSize::try_from(siz & 0x3).unwrap_or(ComponentSize::Bits16)
}

fn clamped_tile(
    fmt: ImageFormat,
    size: ComponentSize,
    line: u32,
    tmem: u32,
    palette: u32,
) -> TileParams {
    TileParams {
        fmt,
        size,
        line,
        tmem,
        palette,
        cmt: WrapMode::CLAMP,
        cms: WrapMode::CLAMP,
        ..TileParams::default()
    }
}

/// Divides a 10.2 screen quantity by a 5.10 scale.
fn scaled(value: i32, scale: u16) -> i32 {
    (value as i64 * 1024 / scale.max(1) as i64) as i32
}

impl<R: RenderingApi, W: WindowManagerApi> Interpreter<R, W> {
    pub(crate) fn execute_s2dex(&mut self, cmd: S2dexCommand) -> GfxResult<()> {
        match cmd {
            S2dexCommand::BgCopy(addr) => {
                let bg = ObjBg::read(&self.arena, self.segments.resolve(addr)?, false)?;
                self.draw_background(bg, true)?;
            }
            S2dexCommand::Bg1Cyc(addr) => {
                let bg = ObjBg::read(&self.arena, self.segments.resolve(addr)?, true)?;
                self.draw_background(bg, false)?;
            }
            S2dexCommand::ObjRectangle(addr) => {
                let sprite = ObjSprite::read(&self.arena, self.segments.resolve(addr)?)?;
                self.draw_sprite(sprite, false)?;
            }
            S2dexCommand::ObjRectangleR(addr) => {
                let sprite = ObjSprite::read(&self.arena, self.segments.resolve(addr)?)?;
                self.draw_sprite(sprite, true)?;
            }
            S2dexCommand::ObjLoadTxtr(addr) => {
                let txtr = ObjTxtr::read(&self.arena, self.segments.resolve(addr)?)?;
                self.load_obj_texture(txtr)?;
            }
            S2dexCommand::ObjLoadTxtrRect(addr) | S2dexCommand::ObjLoadTxtrRectR(addr) => {
                let pointer = self.segments.resolve(addr)?;
                let txtr = ObjTxtr::read(&self.arena, pointer)?;
                let sprite = ObjSprite::read(&self.arena, pointer.add(SPRITE_SIZE))?;
                self.load_obj_texture(txtr)?;
                let relative = matches!(cmd, S2dexCommand::ObjLoadTxtrRectR(_));
                self.draw_sprite(sprite, relative)?;
            }
            S2dexCommand::ObjMatrix(addr) => {
                self.s2dex.matrix = ObjMatrix::read(&self.arena, self.segments.resolve(addr)?)?;
            }
            S2dexCommand::ObjSubMatrix(addr) => {
                let pointer = self.segments.resolve(addr)?;
                self.s2dex.matrix.read_sub(&self.arena, pointer)?;
            }
            S2dexCommand::ObjRenderMode(mode) => {
                tracing::trace!("object render mode {:#010X}", mode);
                self.s2dex.render_mode = mode;
            }
        }
        Ok(())
    }

    fn set_texture_image_at(
        &mut self,
        fmt: ImageFormat,
        size: ComponentSize,
        width: u32,
        addr: u32,
    ) -> GfxResult<()> {
        let addr = self.segments.resolve(addr)?;
        self.rdp.set_texture_image(TextureImage {
            fmt,
            size,
            width,
            addr,
            metadata: RawTexMetadata::default(),
        });
        Ok(())
    }

    /// Draws a texture rectangle whose coordinates are exact in every cycle type.
    fn draw_obj_rectangle(&mut self, mut tex_rect: TextureRectangle) -> GfxResult<()> {
        if self.rdp.other_mode.cycle_type() == CycleType::Copy {
            tex_rect.dsdx = tex_rect.dsdx.saturating_mul(4);
            tex_rect.rect.lrx -= 1 << 2;
            tex_rect.rect.lry -= 1 << 2;
        }
        self.texture_rectangle(tex_rect, false)
    }

    fn draw_background(&mut self, bg: ObjBg, copy: bool) -> GfxResult<()> {
        let fmt = image_format(bg.image_fmt);
        let size = component_size(bg.image_siz);
        let width = (bg.image_w >> 2) as u32;
        let height = (bg.image_h >> 2) as u32;
        let row_bytes = (width * size.num_bits() + 7) / 8;

        self.set_texture_image_at(fmt, size, width, bg.image_ptr)?;
        self.rdp
            .set_tile(TileIndex::LOAD, clamped_tile(fmt, size, 0, 0, 0));
        self.rdp.load_block(
            TileIndex::LOAD,
            TextureBlock {
                uls: 0,
                ult: 0,
                lrs: ((row_bytes * height) >> size.load_shift()).saturating_sub(1),
                dxt: 0,
            },
        );
        self.rdp.set_tile(
            TileIndex::RENDER,
            clamped_tile(fmt, size, (row_bytes + 7) / 8, 0, bg.image_pal as u32),
        );
        self.rdp.set_tile_size(
            TileIndex::RENDER,
            TileSize {
                uls: 0,
                ult: 0,
                lrs: bg.image_w as u32,
                lrt: bg.image_h as u32,
            },
        );

        let (frame_w, frame_h) = if copy {
            (bg.image_w as i32, bg.image_h as i32)
        } else {
            (bg.frame_w as i32, bg.frame_h as i32)
        };
        let rect = Rectangle {
            ulx: bg.frame_x as i32,
            uly: bg.frame_y as i32,
            lrx: bg.frame_x as i32 + frame_w,
            lry: bg.frame_y as i32 + frame_h,
        };
        self.draw_obj_rectangle(TextureRectangle {
            rect,
            tile: TileIndex::RENDER,
            s: (bg.image_x << 3) as i16,
            t: (bg.image_y << 3) as i16,
            dsdx: bg.scale_w.min(0x7FFF) as i16,
            dtdy: bg.scale_h.min(0x7FFF) as i16,
        })
    }

    fn draw_sprite(&mut self, sprite: ObjSprite, relative: bool) -> GfxResult<()> {
        let fmt = image_format(sprite.image_fmt);
        let size = component_size(sprite.image_siz);
        let width = (sprite.image_w >> 5) as u32;
        let height = (sprite.image_h >> 5) as u32;

        self.rdp.set_tile(
            TileIndex::RENDER,
            clamped_tile(
                fmt,
                size,
                sprite.image_stride as u32,
                sprite.image_adrs as u32,
                sprite.image_pal as u32,
            ),
        );
        self.rdp.set_tile_size(
            TileIndex::RENDER,
            TileSize {
                uls: 0,
                ult: 0,
                lrs: width.saturating_sub(1) << 2,
                lrt: height.saturating_sub(1) << 2,
            },
        );

        // Screen size in 10.2 pixels.
        let mut screen_w = scaled((width << 2) as i32, sprite.scale_w);
        let mut screen_h = scaled((height << 2) as i32, sprite.scale_h);
        let (mut ulx, mut uly) = (sprite.obj_x as i32, sprite.obj_y as i32);
        if relative {
            let m = self.s2dex.matrix;
            ulx = m.x as i32 + scaled(ulx, m.base_scale_x);
            uly = m.y as i32 + scaled(uly, m.base_scale_y);
            screen_w = scaled(screen_w, m.base_scale_x);
            screen_h = scaled(screen_h, m.base_scale_y);
        }

        let mut dsdx = sprite.scale_w.min(0x7FFF) as i16;
        let mut dtdy = sprite.scale_h.min(0x7FFF) as i16;
        let mut s = 0;
        let mut t = 0;
        if sprite.image_flags & OBJ_FLAG_FLIP_S != 0 {
            s = (width << 5) as i16;
            dsdx = -dsdx;
        }
        if sprite.image_flags & OBJ_FLAG_FLIP_T != 0 {
            t = (height << 5) as i16;
            dtdy = -dtdy;
        }

        self.draw_obj_rectangle(TextureRectangle {
            rect: Rectangle {
                ulx,
                uly,
                lrx: ulx + screen_w,
                lry: uly + screen_h,
            },
            tile: TileIndex::RENDER,
            s,
            t,
            dsdx,
            dtdy,
        })
    }

    fn load_obj_texture(&mut self, txtr: ObjTxtr) -> GfxResult<()> {
        let tmem = txtr.tmem as u32;
        match txtr.kind {
            TXTR_BLOCK => {
                self.set_texture_image_at(ImageFormat::Rgba, ComponentSize::Bits16, 1, txtr.image)?;
                self.rdp.set_tile(
                    TileIndex::LOAD,
                    clamped_tile(ImageFormat::Rgba, ComponentSize::Bits16, 0, tmem, 0),
                );
                self.rdp.load_block(
                    TileIndex::LOAD,
                    TextureBlock {
                        uls: 0,
                        ult: 0,
                        lrs: txtr.size as u32,
                        dxt: txtr.line as u32,
                    },
                );
            }
            TXTR_TILE => {
                let width = txtr.size as u32 + 1;
                self.set_texture_image_at(
                    ImageFormat::Rgba,
                    ComponentSize::Bits16,
                    width,
                    txtr.image,
                )?;
                self.rdp.set_tile(
                    TileIndex::LOAD,
                    clamped_tile(
                        ImageFormat::Rgba,
                        ComponentSize::Bits16,
                        (width * 2 + 7) / 8,
                        tmem,
                        0,
                    ),
                );
                self.rdp.load_tile(
                    TileIndex::LOAD,
                    TileSize {
                        uls: 0,
                        ult: 0,
                        lrs: (width - 1) << 2,
                        lrt: txtr.line as u32,
                    },
                );
            }
            TXTR_TLUT => {
                let head = txtr.size as u32;
                self.set_texture_image_at(ImageFormat::Rgba, ComponentSize::Bits16, 1, txtr.image)?;
                self.rdp.set_tile(
                    TileIndex::LOAD,
                    clamped_tile(ImageFormat::Rgba, ComponentSize::Bits16, 0, head, 0),
                );
                self.rdp.load_tlut(TileIndex::LOAD, txtr.line as u32);
            }
            kind => tracing::warn!("unknown object texture load type {:#X}", kind),
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_obj_matrix_read() {
        let mut arena = Arena::new();
        let mut data = Vec::new();
        for v in [0x0002_0000i32, 0, 0, 0x0000_8000] {
            data.extend(v.to_be_bytes());
        }
        data.extend(40i16.to_be_bytes());
        data.extend((-8i16).to_be_bytes());
        data.extend(0x0800u16.to_be_bytes());
        data.extend(0x0400u16.to_be_bytes());
        let handle = arena.insert(data);
        let m = ObjMatrix::read(&arena, Pointer::new(handle, 0)).unwrap();
        assert_eq!(m.a, 2.0);
        assert_eq!(m.d, 0.5);
        assert_eq!((m.x, m.y), (40, -8));
        assert_eq!((m.base_scale_x, m.base_scale_y), (0x800, 0x400));
    }

    #[test]
    fn test_scaled() {
        assert_eq!(scaled(64, 1 << 10), 64);
        assert_eq!(scaled(64, 2 << 10), 32);
        assert_eq!(scaled(-64, 1 << 9), -128);
        assert_eq!(scaled(64, 0), 64 * 1024);
    }
}
