//! Display list command decoding.
//!
//! [decode_command] turns the [RawGfxCommand] at the execution pointer into a [GfxCommand].
//! Some commands span several 64 bit words (texture rectangles and most extension opcodes),
//! so the words following the command are passed in as well and [Decoded::len] reports how
//! many were consumed.
//!
//! Opcodes are looked up in the extension table, then the RDP table, and finally the table
//! of the active microcode. Anything left over decodes to [GfxCommand::Unknown].

#![allow(missing_docs)]

use std::fmt;

use crate::{cmd::*, ucode::*};

/// The two 32 bit words of a display list command.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawGfxCommand {
    pub w0: u32,
    pub w1: u32,
}

impl RawGfxCommand {
    pub fn new(w0: u32, w1: u32) -> Self {
        Self { w0, w1 }
    }

    pub fn opcode(self) -> u8 {
        (self.w0 >> 24) as u8
    }

    /// Reads both words as a 64 bit resource hash.
    pub fn hash(self) -> u64 {
        ((self.w0 as u64) << 32) | self.w1 as u64
    }
}

impl fmt::Debug for RawGfxCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RawGfxCommand {{ w0: {:#010X}, w1: {:#010X} }}",
            self.w0, self.w1
        )
    }
}

/// A decoded command and the number of 64 bit words it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decoded {
    pub command: GfxCommand,
    pub len: usize,
}

impl Decoded {
    fn single(command: GfxCommand) -> Self {
        Self { command, len: 1 }
    }
}

/// Decodes the command `raw`, where `following` holds the words after it in the same buffer.
pub fn decode_command(ucode: Ucode, raw: RawGfxCommand, following: &[RawGfxCommand]) -> Decoded {
    let opcode = raw.opcode();
    let decoded = if let Ok(op) = OtrOpcode::try_from(opcode) {
        decode_otr(op, raw, following)
    } else if let Ok(op) = RdpOpcode::try_from(opcode) {
        decode_rdp(op, raw, following)
    } else {
        match ucode {
            Ucode::F3d => F3dOpcode::try_from(opcode)
                .ok()
                .and_then(|op| decode_f3d(op, raw)),
            Ucode::F3dex => F3dexOpcode::try_from(opcode)
                .ok()
                .and_then(|op| decode_f3dex(op, raw)),
            Ucode::F3dex2 => F3dex2Opcode::try_from(opcode)
                .ok()
                .and_then(|op| decode_f3dex2(op, raw)),
            Ucode::S2dex => S2dexOpcode::try_from(opcode)
                .ok()
                .and_then(|op| decode_s2dex(op, raw)),
        }
        .map(Decoded::single)
    };
    decoded.unwrap_or_else(|| Decoded::single(GfxCommand::Unknown { ucode, raw }))
}

fn rsp(command: RspCommand) -> Option<GfxCommand> {
    Some(GfxCommand::Rsp(command))
}

fn sign_extend_24(v: u32) -> i32 {
    ((v << 8) as i32) >> 8
}

fn image_format(w0: u32) -> Option<(ImageFormat, ComponentSize)> {
    let fmt = ImageFormat::try_from(((w0 >> 21) & 0x7) as u8).ok()?;
    let size = ComponentSize::try_from(((w0 >> 19) & 0x3) as u8).ok()?;
    Some((fmt, size))
}

fn image(w0: u32, w1: u32) -> Option<Image> {
    let (fmt, size) = image_format(w0)?;
    Some(Image {
        fmt,
        size,
        width: (w0 & 0xFFF) + 1,
        img: w1,
    })
}

fn tile_size(w0: u32, w1: u32) -> TileSize {
    TileSize {
        uls: (w0 >> 12) & 0xFFF,
        ult: w0 & 0xFFF,
        lrs: (w1 >> 12) & 0xFFF,
        lrt: w1 & 0xFFF,
    }
}

fn tile_index(w1: u32) -> TileIndex {
    TileIndex(((w1 >> 24) & 0x7) as u8)
}

fn combine_mode(w0: u32, w1: u32) -> CombineMode {
    let cc1 = [
        ((w0 >> 20) & 0xF) as u8,
        ((w1 >> 28) & 0xF) as u8,
        ((w0 >> 15) & 0x1F) as u8,
        ((w1 >> 15) & 0x7) as u8,
    ];
    let ac1 = [
        ((w0 >> 12) & 0x7) as u8,
        ((w1 >> 12) & 0x7) as u8,
        ((w0 >> 9) & 0x7) as u8,
        ((w1 >> 9) & 0x7) as u8,
    ];
    let cc2 = [
        ((w0 >> 5) & 0xF) as u8,
        ((w1 >> 24) & 0xF) as u8,
        (w0 & 0x1F) as u8,
        ((w1 >> 6) & 0x7) as u8,
    ];
    let ac2 = [
        ((w1 >> 21) & 0x7) as u8,
        ((w1 >> 3) & 0x7) as u8,
        ((w1 >> 18) & 0x7) as u8,
        (w1 & 0x7) as u8,
    ];
    CombineMode {
        color1: cc1.into(),
        alpha1: ac1.into(),
        color2: cc2.into(),
        alpha2: ac2.into(),
    }
}

fn decode_rdp(op: RdpOpcode, raw: RawGfxCommand, following: &[RawGfxCommand]) -> Option<Decoded> {
    let RawGfxCommand { w0, w1 } = raw;
    let command = match op {
        RdpOpcode::TextureRectangle | RdpOpcode::TextureRectangleFlip => {
            let (coords, deltas) = match following {
                [coords, deltas, ..] => (*coords, *deltas),
                _ => return None,
            };
            let rect = TextureRectangle {
                rect: Rectangle {
                    ulx: ((w1 >> 12) & 0xFFF) as i32,
                    uly: (w1 & 0xFFF) as i32,
                    lrx: ((w0 >> 12) & 0xFFF) as i32,
                    lry: (w0 & 0xFFF) as i32,
                },
                tile: tile_index(w1),
                s: (coords.w1 >> 16) as i16,
                t: coords.w1 as i16,
                dsdx: (deltas.w1 >> 16) as i16,
                dtdy: deltas.w1 as i16,
            };
            return Some(Decoded {
                command: GfxCommand::Rdp(RdpCommand::TextureRectangle {
                    rect,
                    flip: op == RdpOpcode::TextureRectangleFlip,
                }),
                len: 3,
            });
        }
        RdpOpcode::LoadSync | RdpOpcode::PipeSync | RdpOpcode::TileSync | RdpOpcode::FullSync => {
            RdpCommand::Sync
        }
        RdpOpcode::SetKeyGb | RdpOpcode::SetKeyR | RdpOpcode::SetConvert => {
            RdpCommand::Unimplemented(Unimplemented { w0, w1 })
        }
        RdpOpcode::SetScissor => RdpCommand::SetScissor(
            ScissorMode::try_from(((w1 >> 24) & 0xFF) as u8).ok()?,
            Rectangle {
                ulx: (w0 >> 12) & 0xFFF,
                uly: w0 & 0xFFF,
                lrx: (w1 >> 12) & 0xFFF,
                lry: w1 & 0xFFF,
            },
        ),
        RdpOpcode::SetPrimDepth => RdpCommand::SetPrimDepth(PrimDepth {
            z: (w1 >> 16) as u16,
            dz: w1 as u16,
        }),
        RdpOpcode::SetOtherMode => RdpCommand::SetOtherMode {
            h: w0 & 0x00FF_FFFF,
            l: w1,
        },
        RdpOpcode::LoadTlut => RdpCommand::LoadTlut {
            tile: tile_index(w1),
            high_index: (w1 >> 14) & 0x3FF,
        },
        RdpOpcode::SetTileSize => RdpCommand::SetTileSize(tile_index(w1), tile_size(w0, w1)),
        RdpOpcode::LoadBlock => RdpCommand::LoadBlock(
            tile_index(w1),
            TextureBlock {
                uls: (w0 >> 12) & 0xFFF,
                ult: w0 & 0xFFF,
                lrs: (w1 >> 12) & 0xFFF,
                dxt: w1 & 0xFFF,
            },
        ),
        RdpOpcode::LoadTile => RdpCommand::LoadTile(tile_index(w1), tile_size(w0, w1)),
        RdpOpcode::SetTile => {
            let (fmt, size) = image_format(w0)?;
            RdpCommand::SetTile(
                tile_index(w1),
                TileParams {
                    fmt,
                    size,
                    line: (w0 >> 9) & 0x1FF,
                    tmem: w0 & 0x1FF,
                    palette: (w1 >> 20) & 0xF,
                    cmt: (((w1 >> 18) & 0x3) as u8).into(),
                    maskt: (w1 >> 14) & 0xF,
                    shiftt: (w1 >> 10) & 0xF,
                    cms: (((w1 >> 8) & 0x3) as u8).into(),
                    masks: (w1 >> 4) & 0xF,
                    shifts: w1 & 0xF,
                },
            )
        }
        RdpOpcode::FillRectangle => RdpCommand::FillRectangle(Rectangle {
            ulx: ((w1 >> 12) & 0xFFF) as i32,
            uly: (w1 & 0xFFF) as i32,
            lrx: ((w0 >> 12) & 0xFFF) as i32,
            lry: (w0 & 0xFFF) as i32,
        }),
        RdpOpcode::SetFillColor => RdpCommand::SetFillColor(w1),
        RdpOpcode::SetFogColor => RdpCommand::SetFogColor(Rgba32::from_word(w1)),
        RdpOpcode::SetBlendColor => RdpCommand::SetBlendColor(Rgba32::from_word(w1)),
        RdpOpcode::SetPrimColor => RdpCommand::SetPrimColor {
            color: Rgba32::from_word(w1),
            min_level: (w0 >> 8) as u8,
            lod_fraction: w0 as u8,
        },
        RdpOpcode::SetEnvColor => RdpCommand::SetEnvColor(Rgba32::from_word(w1)),
        RdpOpcode::SetCombine => RdpCommand::SetCombine(combine_mode(w0, w1)),
        RdpOpcode::SetTextureImage => RdpCommand::SetTextureImage(image(w0, w1)?),
        RdpOpcode::SetDepthImage => RdpCommand::SetDepthImage(w1),
        RdpOpcode::SetColorImage => RdpCommand::SetColorImage(image(w0, w1)?),
    };
    Some(Decoded::single(GfxCommand::Rdp(command)))
}

fn decode_otr(op: OtrOpcode, raw: RawGfxCommand, following: &[RawGfxCommand]) -> Option<Decoded> {
    use OtrCommand::*;

    let RawGfxCommand { w0, w1 } = raw;
    let next = following.first().copied();
    let (command, len) = match op {
        OtrOpcode::SetTextureImageHash | OtrOpcode::SetTextureImageFilepath => {
            let (fmt, size) = image_format(w0)?;
            let (source, len) = if op == OtrOpcode::SetTextureImageHash {
                (ResourceSource::Hash(next?.hash()), 2)
            } else {
                (ResourceSource::Path(w1), 1)
            };
            let command = SetTextureImage {
                fmt,
                size,
                width: (w0 & 0xFFF) + 1,
                source,
            };
            (command, len)
        }
        OtrOpcode::SetFramebuffer => (SetFramebuffer(w1), 1),
        OtrOpcode::ResetFramebuffer => (ResetFramebuffer, 1),
        OtrOpcode::SetTextureImageFramebuffer => (SetTextureImageFramebuffer(w1), 1),
        OtrOpcode::VertexFilepath | OtrOpcode::VertexHash => {
            let n = (w0 >> 12) & 0xFF;
            let dest = ((w0 >> 1) & 0x7F).checked_sub(n)?;
            let (source, offset) = if op == OtrOpcode::VertexHash {
                (ResourceSource::Hash(next?.hash()), w1)
            } else {
                (ResourceSource::Path(w1), next?.w0)
            };
            let command = Vertex {
                source,
                offset,
                n,
                dest,
            };
            (command, 2)
        }
        OtrOpcode::DisplayListFilepath => {
            let branch = (w0 >> 16) & 0xFF != 0;
            let command = DisplayList {
                source: ResourceSource::Path(w1),
                branch,
            };
            (command, 1)
        }
        OtrOpcode::DisplayListHash => {
            let branch = (w0 >> 16) & 0xFF != 0;
            let command = DisplayList {
                source: ResourceSource::Hash(next?.hash()),
                branch,
            };
            (command, 2)
        }
        OtrOpcode::Marker => (Marker(next?.hash()), 2),
        OtrOpcode::InvalidateTextureCache => (InvalidateTextureCache(w1), 1),
        OtrOpcode::BranchZHash => {
            let command = BranchZ {
                source: ResourceSource::Hash(next?.hash()),
                vertex: (w0 & 0xFFF) / 2,
                zval: w1,
            };
            (command, 2)
        }
        OtrOpcode::MatrixHash => {
            let command = Matrix {
                source: ResourceSource::Hash(next?.hash()),
                params: matrix_params(Ucode::F3dex2, (w0 & 0xFF) as u8),
            };
            (command, 2)
        }
        OtrOpcode::TextureRectangleWide => {
            let (lower, deltas) = match following {
                [lower, deltas, ..] => (*lower, *deltas),
                _ => return None,
            };
            let command = TextureRectangleWide(TextureRectangle {
                rect: Rectangle {
                    ulx: sign_extend_24(lower.w0),
                    uly: sign_extend_24(lower.w1),
                    lrx: sign_extend_24(w0),
                    lry: sign_extend_24(w1),
                },
                tile: TileIndex(((lower.w0 >> 24) & 0x7) as u8),
                s: (deltas.w0 >> 16) as i16,
                t: deltas.w0 as i16,
                dsdx: (deltas.w1 >> 16) as i16,
                dtdy: deltas.w1 as i16,
            });
            (command, 3)
        }
        OtrOpcode::FillWideRectangle => {
            let upper = next?;
            let command = FillWideRectangle(Rectangle {
                ulx: sign_extend_24(upper.w0),
                uly: sign_extend_24(upper.w1),
                lrx: sign_extend_24(w0),
                lry: sign_extend_24(w1),
            });
            (command, 2)
        }
        OtrOpcode::SetGrayscale => (SetGrayscale(w1 != 0), 1),
        OtrOpcode::ExtraGeometryMode => {
            let command = ExtraGeometryMode {
                clear: ExtraGeometryModes::from_bits_truncate(!(w0 | 0xFF00_0000)),
                set: ExtraGeometryModes::from_bits_truncate(w1),
            };
            (command, 1)
        }
        OtrOpcode::CopyFramebuffer => {
            let command = CopyFramebuffer {
                dst: w0 & 0x00FF_FFFF,
                src: w1,
            };
            (command, 1)
        }
        OtrOpcode::SetIntensity => (SetIntensity(Rgba32::from_word(w1)), 1),
    };
    Some(Decoded {
        command: GfxCommand::Otr(command),
        len,
    })
}

fn matrix_params(ucode: Ucode, p: u8) -> MatrixParams {
    let c = ucode.constants();
    let push = p & c.mtx_push != 0;
    MatrixParams {
        projection: p & c.mtx_projection != 0,
        load: p & c.mtx_load != 0,
        push: push != c.mtx_push_inverted,
    }
}

fn decode_gbi1_movemem(ucode: Ucode, w0: u32, w1: u32) -> Option<GfxCommand> {
    let c = ucode.constants();
    let index = ((w0 >> 16) & 0xFF) as u8;
    let command = match index {
        i if i == c.mv_viewport => RspCommand::Viewport(w1),
        i if i == c.mv_lookat_x => RspCommand::LookAt {
            axis: LookAtAxis::X,
            light: w1,
        },
        i if i == c.mv_lookat_y => RspCommand::LookAt {
            axis: LookAtAxis::Y,
            light: w1,
        },
        i if (c.mv_light..=c.mv_light + 14).contains(&i) && (i - c.mv_light) % 2 == 0 => {
            RspCommand::Light {
                index: ((i - c.mv_light) / 2) as u32,
                light: w1,
            }
        }
        _ => return None,
    };
    rsp(command)
}

fn decode_gbi2_movemem(w0: u32, w1: u32) -> Option<GfxCommand> {
    let c = Ucode::F3dex2.constants();
    let index = (w0 & 0xFF) as u8;
    let offset = ((w0 >> 8) & 0xFF) * 8;
    let command = if index == c.mv_viewport {
        RspCommand::Viewport(w1)
    } else if index == c.mv_light {
        match offset / 24 {
            0 => RspCommand::LookAt {
                axis: LookAtAxis::X,
                light: w1,
            },
            1 => RspCommand::LookAt {
                axis: LookAtAxis::Y,
                light: w1,
            },
            n => RspCommand::Light {
                index: n - 2,
                light: w1,
            },
        }
    } else {
        return None;
    };
    rsp(command)
}

fn decode_moveword(ucode: Ucode, w0: u32, w1: u32) -> Option<GfxCommand> {
    let c = ucode.constants();
    let (index, offset) = if ucode.is_gbi2() {
        (((w0 >> 16) & 0xFF) as u8, w0 & 0xFFFF)
    } else {
        ((w0 & 0xFF) as u8, (w0 >> 8) & 0xFFFF)
    };
    let light_stride = if ucode.is_gbi2() { 0x18 } else { 0x20 };
    let command = match index {
        i if i == c.mw_numlight => {
            let n = if ucode.is_gbi2() {
                w1 / 24
            } else {
                (w1.wrapping_sub(0x8000_0000) / 32).saturating_sub(1)
            };
            RspCommand::NumLights(n)
        }
        i if i == c.mw_segment => RspCommand::Segment {
            segment: (offset / 4) as u8,
            base: w1,
        },
        i if i == c.mw_fog => RspCommand::FogFactor {
            mul: (w1 >> 16) as i16,
            offset: w1 as i16,
        },
        i if i == c.mw_lightcol => {
            // Each light color is written twice; only the first copy is used.
            if offset % light_stride != 0 {
                return Some(GfxCommand::NoOp);
            }
            RspCommand::LightColor {
                index: offset / light_stride,
                color: Rgba32::from_word(w1),
            }
        }
        i if i == c.mw_perspnorm => RspCommand::PerspNormalize(w1 as u16),
        i if i == c.mw_clip => return Some(GfxCommand::NoOp),
        _ => return None,
    };
    rsp(command)
}

fn gbi1_other_mode(w0: u32, w1: u32) -> Option<OtherModeUpdate> {
    let shift = (w0 >> 8) & 0xFF;
    let len = w0 & 0xFF;
    (shift + len <= 32).then_some(OtherModeUpdate {
        shift,
        len,
        data: w1,
    })
}

fn gbi2_other_mode(w0: u32, w1: u32) -> Option<OtherModeUpdate> {
    let len = (w0 & 0xFF) + 1;
    let shift = 32u32.checked_sub((w0 >> 8) & 0xFF)?.checked_sub(len)?;
    Some(OtherModeUpdate {
        shift,
        len,
        data: w1,
    })
}

fn triangle(word: u32, scale: u32) -> [u32; 3] {
    [
        ((word >> 16) & 0xFF) / scale,
        ((word >> 8) & 0xFF) / scale,
        (word & 0xFF) / scale,
    ]
}

fn display_list(w0: u32, w1: u32) -> Option<GfxCommand> {
    match (w0 >> 16) & 0xFF {
        0 => rsp(RspCommand::DisplayList {
            dl: w1,
            branch: false,
        }),
        1 => rsp(RspCommand::DisplayList {
            dl: w1,
            branch: true,
        }),
        _ => None,
    }
}

fn cull_display_list(ucode: Ucode, w0: u32, w1: u32) -> Option<GfxCommand> {
    let scale = ucode.constants().cull_index_scale;
    let first = (w0 & 0xFFFF) / scale;
    let end = (w1 & 0xFFFF) / scale;
    // F3D stores the end vertex plus one, masked to four bits.
    let last = if ucode == Ucode::F3d {
        end.wrapping_sub(1) & 0xF
    } else {
        end
    };
    rsp(RspCommand::CullDisplayList { first, last })
}

fn gbi1_texture(w0: u32, w1: u32, on: bool) -> Option<GfxCommand> {
    rsp(RspCommand::Texture {
        sc: (w1 >> 16) as u16,
        tc: w1 as u16,
        level: ((w0 >> 11) & 0x7) as u8,
        tile: ((w0 >> 8) & 0x7) as u8,
        on,
    })
}

fn geometry_mode(ucode: Ucode, clear: u32, set: u32) -> Option<GfxCommand> {
    let c = ucode.constants();
    rsp(RspCommand::GeometryMode {
        clear: c.decode_geometry_mode(clear),
        set: c.decode_geometry_mode(set),
    })
}

fn modify_vertex(w0: u32, w1: u32) -> Option<GfxCommand> {
    rsp(RspCommand::ModifyVertex {
        index: (w0 & 0xFFFF) / 2,
        field: VertexField::try_from(((w0 >> 16) & 0xFF) as u8).ok()?,
        value: w1,
    })
}

fn branch_z(w0: u32, w1: u32) -> Option<GfxCommand> {
    rsp(RspCommand::BranchZ {
        vertex: (w0 & 0xFFF) / 2,
        zval: w1,
    })
}

fn decode_f3d(op: F3dOpcode, raw: RawGfxCommand) -> Option<GfxCommand> {
    use RspCommand::*;

    let RawGfxCommand { w0, w1 } = raw;
    let ucode = Ucode::F3d;
    match op {
        F3dOpcode::SpNoop => Some(GfxCommand::NoOp),
        F3dOpcode::Mtx => rsp(Matrix {
            matrix: w1,
            params: matrix_params(ucode, ((w0 >> 16) & 0xFF) as u8),
        }),
        F3dOpcode::MoveMem => decode_gbi1_movemem(ucode, w0, w1),
        F3dOpcode::Vtx => rsp(Vertex {
            v: w1,
            n: ((w0 >> 20) & 0xF) + 1,
            dest: (w0 >> 16) & 0xF,
        }),
        F3dOpcode::Dl => display_list(w0, w1),
        F3dOpcode::RdpHalfCont => Some(GfxCommand::NoOp),
        F3dOpcode::RdpHalf2 => rsp(RdpHalf2(w1)),
        F3dOpcode::RdpHalf1 => rsp(RdpHalf1(w1)),
        F3dOpcode::ClearGeometryMode => geometry_mode(ucode, w1, 0),
        F3dOpcode::SetGeometryMode => geometry_mode(ucode, 0, w1),
        F3dOpcode::EndDl => rsp(EndDisplayList),
        F3dOpcode::SetOtherModeL => rsp(SetOtherModeL(gbi1_other_mode(w0, w1)?)),
        F3dOpcode::SetOtherModeH => rsp(SetOtherModeH(gbi1_other_mode(w0, w1)?)),
        F3dOpcode::Texture => gbi1_texture(w0, w1, w0 & 0xFF != 0),
        F3dOpcode::MoveWord => decode_moveword(ucode, w0, w1),
        F3dOpcode::PopMtx => rsp(PopMatrix { count: 1 }),
        F3dOpcode::CullDl => cull_display_list(ucode, w0, w1),
        F3dOpcode::Tri1 => rsp(Triangle1 {
            v: triangle(w1, ucode.constants().vertex_index_scale),
        }),
    }
}

fn decode_f3dex(op: F3dexOpcode, raw: RawGfxCommand) -> Option<GfxCommand> {
    use RspCommand::*;

    let RawGfxCommand { w0, w1 } = raw;
    let ucode = Ucode::F3dex;
    let scale = ucode.constants().vertex_index_scale;
    match op {
        F3dexOpcode::SpNoop => Some(GfxCommand::NoOp),
        F3dexOpcode::Mtx => rsp(Matrix {
            matrix: w1,
            params: matrix_params(ucode, ((w0 >> 16) & 0xFF) as u8),
        }),
        F3dexOpcode::MoveMem => decode_gbi1_movemem(ucode, w0, w1),
        F3dexOpcode::Vtx => rsp(Vertex {
            v: w1,
            n: (w0 >> 10) & 0x3F,
            dest: ((w0 >> 16) & 0xFF) / 2,
        }),
        F3dexOpcode::Dl => display_list(w0, w1),
        F3dexOpcode::LoadUcode => rsp(LoadUcode(w1)),
        F3dexOpcode::BranchZ => branch_z(w0, w1),
        F3dexOpcode::Tri2 => rsp(Triangle2 {
            v: [triangle(w0, scale), triangle(w1, scale)],
        }),
        F3dexOpcode::ModifyVtx => modify_vertex(w0, w1),
        F3dexOpcode::RdpHalf2 => rsp(RdpHalf2(w1)),
        F3dexOpcode::RdpHalf1 => rsp(RdpHalf1(w1)),
        F3dexOpcode::ClearGeometryMode => geometry_mode(ucode, w1, 0),
        F3dexOpcode::SetGeometryMode => geometry_mode(ucode, 0, w1),
        F3dexOpcode::EndDl => rsp(EndDisplayList),
        F3dexOpcode::SetOtherModeL => rsp(SetOtherModeL(gbi1_other_mode(w0, w1)?)),
        F3dexOpcode::SetOtherModeH => rsp(SetOtherModeH(gbi1_other_mode(w0, w1)?)),
        F3dexOpcode::Texture => gbi1_texture(w0, w1, w0 & 0xFF != 0),
        F3dexOpcode::MoveWord => decode_moveword(ucode, w0, w1),
        F3dexOpcode::PopMtx => rsp(PopMatrix { count: 1 }),
        F3dexOpcode::CullDl => cull_display_list(ucode, w0, w1),
        F3dexOpcode::Tri1 => rsp(Triangle1 {
            v: triangle(w1, scale),
        }),
    }
}

/// Decodes the opcodes that F3DEX2 and S2DEX share.
fn decode_gbi2_common(ucode: Ucode, opcode: u8, raw: RawGfxCommand) -> Option<GfxCommand> {
    use RspCommand::*;

    let RawGfxCommand { w0, w1 } = raw;
    match F3dex2Opcode::try_from(opcode).ok()? {
        F3dex2Opcode::MoveWord => decode_moveword(ucode, w0, w1),
        F3dex2Opcode::LoadUcode => rsp(LoadUcode(w1)),
        F3dex2Opcode::Dl => display_list(w0, w1),
        F3dex2Opcode::EndDl => rsp(EndDisplayList),
        F3dex2Opcode::Noop | F3dex2Opcode::SpNoop => Some(GfxCommand::NoOp),
        F3dex2Opcode::RdpHalf1 => rsp(RdpHalf1(w1)),
        F3dex2Opcode::RdpHalf2 => rsp(RdpHalf2(w1)),
        F3dex2Opcode::SetOtherModeL => rsp(SetOtherModeL(gbi2_other_mode(w0, w1)?)),
        F3dex2Opcode::SetOtherModeH => rsp(SetOtherModeH(gbi2_other_mode(w0, w1)?)),
        _ => None,
    }
}

fn decode_f3dex2(op: F3dex2Opcode, raw: RawGfxCommand) -> Option<GfxCommand> {
    use RspCommand::*;

    let RawGfxCommand { w0, w1 } = raw;
    let ucode = Ucode::F3dex2;
    let scale = ucode.constants().vertex_index_scale;
    match op {
        F3dex2Opcode::Vtx => {
            let n = (w0 >> 12) & 0xFF;
            rsp(Vertex {
                v: w1,
                n,
                dest: ((w0 >> 1) & 0x7F).checked_sub(n)?,
            })
        }
        F3dex2Opcode::ModifyVtx => modify_vertex(w0, w1),
        F3dex2Opcode::CullDl => cull_display_list(ucode, w0, w1),
        F3dex2Opcode::BranchZ => branch_z(w0, w1),
        F3dex2Opcode::Tri1 => rsp(Triangle1 {
            v: triangle(w0, scale),
        }),
        F3dex2Opcode::Tri2 | F3dex2Opcode::Quad => rsp(Triangle2 {
            v: [triangle(w0, scale), triangle(w1, scale)],
        }),
        F3dex2Opcode::Special3
        | F3dex2Opcode::Special2
        | F3dex2Opcode::Special1
        | F3dex2Opcode::DmaIo => Some(GfxCommand::NoOp),
        F3dex2Opcode::Texture => gbi1_texture(w0, w1, (w0 >> 1) & 0x7F != 0),
        F3dex2Opcode::PopMtx => rsp(PopMatrix { count: w1 / 64 }),
        F3dex2Opcode::GeometryMode => geometry_mode(ucode, !(w0 | 0xFF00_0000), w1),
        F3dex2Opcode::Mtx => rsp(Matrix {
            matrix: w1,
            params: matrix_params(ucode, (w0 & 0xFF) as u8),
        }),
        F3dex2Opcode::MoveMem => decode_gbi2_movemem(w0, w1),
        _ => decode_gbi2_common(ucode, op.into(), raw),
    }
}

fn decode_s2dex(op: S2dexOpcode, raw: RawGfxCommand) -> Option<GfxCommand> {
    use S2dexCommand::*;

    let w1 = raw.w1;
    let command = match op {
        S2dexOpcode::ObjRectangle => ObjRectangle(w1),
        S2dexOpcode::ObjRectangleR => ObjRectangleR(w1),
        S2dexOpcode::ObjLoadTxtr => ObjLoadTxtr(w1),
        S2dexOpcode::ObjLdtxRect => ObjLoadTxtrRect(w1),
        S2dexOpcode::ObjLdtxRectR => ObjLoadTxtrRectR(w1),
        S2dexOpcode::Bg1Cyc => Bg1Cyc(w1),
        S2dexOpcode::BgCopy => BgCopy(w1),
        S2dexOpcode::ObjRenderMode => ObjRenderMode(w1),
        S2dexOpcode::ObjMoveMem => match (raw.w0 >> 16) & 0xFF {
            0 => ObjMatrix(w1),
            2 => ObjSubMatrix(w1),
            _ => return None,
        },
        S2dexOpcode::ObjSprite | S2dexOpcode::ObjLdtxSprite | S2dexOpcode::SelectDl => {
            return None
        }
        _ => return decode_gbi2_common(Ucode::S2dex, op.into(), raw),
    };
    Some(GfxCommand::S2dex(command))
}
