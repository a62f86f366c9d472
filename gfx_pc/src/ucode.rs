//! Microcode families and their opcode tables.
//!
//! Opcodes are looked up in three tables in order: the extension opcodes ([OtrOpcode]), the
//! fixed RDP opcodes ([RdpOpcode]), and the opcodes of the active microcode family.

#![allow(missing_docs)]

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use crate::cmd::GeometryModes;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    TryFromPrimitive,
    IntoPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u32)]
pub enum Ucode {
    F3d = 0,
    F3dex = 1,
    F3dex2 = 2,
    S2dex = 3,
}

impl Default for Ucode {
    fn default() -> Self {
        Self::F3dex2
    }
}

impl Ucode {
    pub fn constants(self) -> &'static UcodeConstants {
        match self {
            Ucode::F3d => &F3D_CONSTANTS,
            Ucode::F3dex => &F3DEX_CONSTANTS,
            Ucode::F3dex2 | Ucode::S2dex => &F3DEX2_CONSTANTS,
        }
    }

    /// True for the families using the second GBI revision encoding.
    pub fn is_gbi2(self) -> bool {
        matches!(self, Ucode::F3dex2 | Ucode::S2dex)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum OtrOpcode {
    SetTextureImageHash = 0x20,
    SetFramebuffer = 0x21,
    ResetFramebuffer = 0x22,
    SetTextureImageFramebuffer = 0x23,
    VertexFilepath = 0x24,
    SetTextureImageFilepath = 0x25,
    DisplayListFilepath = 0x27,
    DisplayListHash = 0x31,
    VertexHash = 0x32,
    Marker = 0x33,
    InvalidateTextureCache = 0x34,
    BranchZHash = 0x35,
    MatrixHash = 0x36,
    TextureRectangleWide = 0x37,
    FillWideRectangle = 0x38,
    SetGrayscale = 0x39,
    ExtraGeometryMode = 0x3A,
    CopyFramebuffer = 0x3B,
    SetIntensity = 0x40,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum RdpOpcode {
    TextureRectangle = 0xE4,
    TextureRectangleFlip = 0xE5,
    LoadSync = 0xE6,
    PipeSync = 0xE7,
    TileSync = 0xE8,
    FullSync = 0xE9,
    SetKeyGb = 0xEA,
    SetKeyR = 0xEB,
    SetConvert = 0xEC,
    SetScissor = 0xED,
    SetPrimDepth = 0xEE,
    SetOtherMode = 0xEF,
    LoadTlut = 0xF0,
    SetTileSize = 0xF2,
    LoadBlock = 0xF3,
    LoadTile = 0xF4,
    SetTile = 0xF5,
    FillRectangle = 0xF6,
    SetFillColor = 0xF7,
    SetFogColor = 0xF8,
    SetBlendColor = 0xF9,
    SetPrimColor = 0xFA,
    SetEnvColor = 0xFB,
    SetCombine = 0xFC,
    SetTextureImage = 0xFD,
    SetDepthImage = 0xFE,
    SetColorImage = 0xFF,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum F3dOpcode {
    SpNoop = 0x00,
    Mtx = 0x01,
    MoveMem = 0x03,
    Vtx = 0x04,
    Dl = 0x06,
    RdpHalfCont = 0xB2,
    RdpHalf2 = 0xB3,
    RdpHalf1 = 0xB4,
    ClearGeometryMode = 0xB6,
    SetGeometryMode = 0xB7,
    EndDl = 0xB8,
    SetOtherModeL = 0xB9,
    SetOtherModeH = 0xBA,
    Texture = 0xBB,
    MoveWord = 0xBC,
    PopMtx = 0xBD,
    CullDl = 0xBE,
    Tri1 = 0xBF,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum F3dexOpcode {
    SpNoop = 0x00,
    Mtx = 0x01,
    MoveMem = 0x03,
    Vtx = 0x04,
    Dl = 0x06,
    LoadUcode = 0xAF,
    BranchZ = 0xB0,
    Tri2 = 0xB1,
    ModifyVtx = 0xB2,
    RdpHalf2 = 0xB3,
    RdpHalf1 = 0xB4,
    ClearGeometryMode = 0xB6,
    SetGeometryMode = 0xB7,
    EndDl = 0xB8,
    SetOtherModeL = 0xB9,
    SetOtherModeH = 0xBA,
    Texture = 0xBB,
    MoveWord = 0xBC,
    PopMtx = 0xBD,
    CullDl = 0xBE,
    Tri1 = 0xBF,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum F3dex2Opcode {
    Noop = 0x00,
    Vtx = 0x01,
    ModifyVtx = 0x02,
    CullDl = 0x03,
    BranchZ = 0x04,
    Tri1 = 0x05,
    Tri2 = 0x06,
    Quad = 0x07,
    Special3 = 0xD3,
    Special2 = 0xD4,
    Special1 = 0xD5,
    DmaIo = 0xD6,
    Texture = 0xD7,
    PopMtx = 0xD8,
    GeometryMode = 0xD9,
    Mtx = 0xDA,
    MoveWord = 0xDB,
    MoveMem = 0xDC,
    LoadUcode = 0xDD,
    Dl = 0xDE,
    EndDl = 0xDF,
    SpNoop = 0xE0,
    RdpHalf1 = 0xE1,
    SetOtherModeL = 0xE2,
    SetOtherModeH = 0xE3,
    RdpHalf2 = 0xF1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum S2dexOpcode {
    Noop = 0x00,
    ObjRectangle = 0x01,
    ObjSprite = 0x02,
    SelectDl = 0x04,
    ObjLoadTxtr = 0x05,
    ObjLdtxSprite = 0x06,
    ObjLdtxRect = 0x07,
    ObjLdtxRectR = 0x08,
    Bg1Cyc = 0x09,
    BgCopy = 0x0A,
    ObjRenderMode = 0x0B,
    ObjRectangleR = 0xDA,
    MoveWord = 0xDB,
    ObjMoveMem = 0xDC,
    LoadUcode = 0xDD,
    Dl = 0xDE,
    EndDl = 0xDF,
    SpNoop = 0xE0,
    RdpHalf1 = 0xE1,
    SetOtherModeL = 0xE2,
    SetOtherModeH = 0xE3,
    RdpHalf2 = 0xF1,
}

/// Per-family encoding constants used while decoding.
#[derive(Debug)]
pub struct UcodeConstants {
    pub mtx_projection: u8,
    pub mtx_load: u8,
    pub mtx_push: u8,
    /// The push bit is stored inverted in the command.
    pub mtx_push_inverted: bool,
    /// Vertex indices in triangle commands are stored multiplied by this.
    pub vertex_index_scale: u32,
    /// Vertex indices in CULLDL are stored multiplied by this.
    pub cull_index_scale: u32,
    /// Mapping from raw geometry mode bits to [GeometryModes].
    pub geometry_modes: &'static [(u32, GeometryModes)],
    pub mv_viewport: u8,
    pub mv_lookat_y: u8,
    pub mv_lookat_x: u8,
    /// First light index (GBI1) or the light movemem index (GBI2).
    pub mv_light: u8,
    pub mw_numlight: u8,
    pub mw_clip: u8,
    pub mw_segment: u8,
    pub mw_fog: u8,
    pub mw_lightcol: u8,
    pub mw_perspnorm: u8,
}

impl UcodeConstants {
    pub fn decode_geometry_mode(&self, raw: u32) -> GeometryModes {
        self.geometry_modes
            .iter()
            .filter(|(bit, _)| raw & bit != 0)
            .fold(GeometryModes::empty(), |acc, (_, mode)| acc | *mode)
    }

    pub fn encode_geometry_mode(&self, modes: GeometryModes) -> u32 {
        self.geometry_modes
            .iter()
            .filter(|(_, mode)| modes.contains(*mode))
            .fold(0, |acc, (bit, _)| acc | bit)
    }
}

const GBI1_GEOMETRY_MODES: &[(u32, GeometryModes)] = &[
    (0x0000_0001, GeometryModes::ZBUFFER),
    (0x0000_0002, GeometryModes::TEXTURE_ENABLE),
    (0x0000_0004, GeometryModes::SHADE),
    (0x0000_0200, GeometryModes::SHADING_SMOOTH),
    (0x0000_1000, GeometryModes::CULL_FRONT),
    (0x0000_2000, GeometryModes::CULL_BACK),
    (0x0001_0000, GeometryModes::FOG),
    (0x0002_0000, GeometryModes::LIGHTING),
    (0x0004_0000, GeometryModes::TEXTURE_GEN),
    (0x0008_0000, GeometryModes::TEXTURE_GEN_LINEAR),
    (0x0010_0000, GeometryModes::LOD),
    (0x0080_0000, GeometryModes::CLIPPING),
];

const GBI2_GEOMETRY_MODES: &[(u32, GeometryModes)] = &[
    (0x0000_0001, GeometryModes::ZBUFFER),
    (0x0000_0004, GeometryModes::SHADE),
    (0x0000_0200, GeometryModes::CULL_FRONT),
    (0x0000_0400, GeometryModes::CULL_BACK),
    (0x0001_0000, GeometryModes::FOG),
    (0x0002_0000, GeometryModes::LIGHTING),
    (0x0004_0000, GeometryModes::TEXTURE_GEN),
    (0x0008_0000, GeometryModes::TEXTURE_GEN_LINEAR),
    (0x0010_0000, GeometryModes::LOD),
    (0x0020_0000, GeometryModes::SHADING_SMOOTH),
    (0x0040_0000, GeometryModes::LIGHTING_POSITIONAL),
    (0x0080_0000, GeometryModes::CLIPPING),
];

const GBI1_CONSTANTS: UcodeConstants = UcodeConstants {
    mtx_projection: 0x01,
    mtx_load: 0x02,
    mtx_push: 0x04,
    mtx_push_inverted: false,
    vertex_index_scale: 10,
    cull_index_scale: 40,
    geometry_modes: GBI1_GEOMETRY_MODES,
    mv_viewport: 0x80,
    mv_lookat_y: 0x82,
    mv_lookat_x: 0x84,
    mv_light: 0x86,
    mw_numlight: 0x02,
    mw_clip: 0x04,
    mw_segment: 0x06,
    mw_fog: 0x08,
    mw_lightcol: 0x0A,
    mw_perspnorm: 0x0E,
};

pub static F3D_CONSTANTS: UcodeConstants = GBI1_CONSTANTS;

pub static F3DEX_CONSTANTS: UcodeConstants = UcodeConstants {
    vertex_index_scale: 2,
    cull_index_scale: 2,
    ..GBI1_CONSTANTS
};

// Lookat and lights share one movemem index; the offset selects between them.
pub static F3DEX2_CONSTANTS: UcodeConstants = UcodeConstants {
    mtx_projection: 0x04,
    mtx_load: 0x02,
    mtx_push: 0x01,
    mtx_push_inverted: true,
    vertex_index_scale: 2,
    cull_index_scale: 2,
    geometry_modes: GBI2_GEOMETRY_MODES,
    mv_viewport: 8,
    mv_lookat_y: 10,
    mv_lookat_x: 10,
    mv_light: 10,
    mw_numlight: 0x02,
    mw_clip: 0x04,
    mw_segment: 0x06,
    mw_fog: 0x08,
    mw_lightcol: 0x0A,
    mw_perspnorm: 0x0E,
};

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_geometry_mode_bits_differ_between_revisions() {
        let f3d = Ucode::F3d.constants();
        let ex2 = Ucode::F3dex2.constants();
        assert_eq!(f3d.decode_geometry_mode(0x2000), GeometryModes::CULL_BACK);
        assert_eq!(ex2.decode_geometry_mode(0x0400), GeometryModes::CULL_BACK);
        assert_eq!(
            ex2.decode_geometry_mode(0x0022_0005),
            GeometryModes::ZBUFFER
                | GeometryModes::SHADE
                | GeometryModes::LIGHTING
                | GeometryModes::SHADING_SMOOTH
        );
        let modes = GeometryModes::FOG | GeometryModes::CULL_FRONT;
        assert_eq!(
            f3d.decode_geometry_mode(f3d.encode_geometry_mode(modes)),
            modes
        );
    }

    #[test]
    fn test_opcode_tables() {
        assert_eq!(F3dex2Opcode::try_from(0xDE).unwrap(), F3dex2Opcode::Dl);
        assert_eq!(F3dOpcode::try_from(0xBF).unwrap(), F3dOpcode::Tri1);
        assert!(F3dOpcode::try_from(0xB1).is_err());
        assert_eq!(RdpOpcode::try_from(0xFC).unwrap(), RdpOpcode::SetCombine);
        assert_eq!(Ucode::try_from(3).unwrap(), Ucode::S2dex);
    }
}
