//! Rust types representing decoded display list commands.

#![allow(missing_docs)]

use core::fmt;

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{decode::RawGfxCommand, ucode::Ucode};

/// A decoded display list command.
///
/// Addresses are left in their segmented form and resolved when the command executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GfxCommand {
    NoOp,
    Unknown {
        ucode: Ucode,
        raw: RawGfxCommand,
    },
    Rsp(RspCommand),
    Rdp(RdpCommand),
    S2dex(S2dexCommand),
    Otr(OtrCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RspCommand {
    Matrix {
        matrix: u32,
        params: MatrixParams,
    },
    PopMatrix {
        count: u32,
    },
    Viewport(u32),
    Light {
        /// Zero based light index.
        index: u32,
        light: u32,
    },
    LookAt {
        axis: LookAtAxis,
        light: u32,
    },
    Vertex {
        v: u32,
        n: u32,
        dest: u32,
    },
    ModifyVertex {
        index: u32,
        field: VertexField,
        value: u32,
    },
    Triangle1 {
        v: [u32; 3],
    },
    Triangle2 {
        v: [[u32; 3]; 2],
    },
    CullDisplayList {
        first: u32,
        last: u32,
    },
    /// Branches to the list given by the preceding RDPHALF_1.
    BranchZ {
        vertex: u32,
        zval: u32,
    },
    DisplayList {
        dl: u32,
        branch: bool,
    },
    EndDisplayList,
    Texture {
        sc: u16,
        tc: u16,
        level: u8,
        tile: u8,
        on: bool,
    },
    GeometryMode {
        clear: GeometryModes,
        set: GeometryModes,
    },
    SetOtherModeH(OtherModeUpdate),
    SetOtherModeL(OtherModeUpdate),
    NumLights(u32),
    Segment {
        segment: u8,
        base: u32,
    },
    FogFactor {
        mul: i16,
        offset: i16,
    },
    LightColor {
        index: u32,
        color: Rgba32,
    },
    PerspNormalize(u16),
    RdpHalf1(u32),
    RdpHalf2(u32),
    LoadUcode(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RdpCommand {
    SetColorImage(Image),
    SetDepthImage(u32),
    SetTextureImage(Image),
    SetCombine(CombineMode),
    SetEnvColor(Rgba32),
    SetPrimColor {
        color: Rgba32,
        min_level: u8,
        lod_fraction: u8,
    },
    SetBlendColor(Rgba32),
    SetFogColor(Rgba32),
    /// Two packed RGBA5551 pixels, or a depth value.
    SetFillColor(u32),
    FillRectangle(Rectangle<i32>),
    SetTile(TileIndex, TileParams),
    LoadTile(TileIndex, TileSize),
    LoadBlock(TileIndex, TextureBlock),
    SetTileSize(TileIndex, TileSize),
    LoadTlut {
        tile: TileIndex,
        high_index: u32,
    },
    SetOtherMode {
        h: u32,
        l: u32,
    },
    SetPrimDepth(PrimDepth),
    SetScissor(ScissorMode, Rectangle<u32>),
    TextureRectangle {
        rect: TextureRectangle,
        flip: bool,
    },
    /// SETCONVERT, SETKEYR, SETKEYGB.
    Unimplemented(Unimplemented),
    Sync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum S2dexCommand {
    BgCopy(u32),
    Bg1Cyc(u32),
    ObjRectangle(u32),
    ObjRectangleR(u32),
    ObjLoadTxtr(u32),
    ObjLoadTxtrRect(u32),
    ObjLoadTxtrRectR(u32),
    ObjMatrix(u32),
    ObjSubMatrix(u32),
    ObjRenderMode(u32),
}

/// Where an extension command finds its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceSource {
    Hash(u64),
    /// Segmented address of a NUL terminated path.
    Path(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtrCommand {
    SetTextureImage {
        fmt: ImageFormat,
        size: ComponentSize,
        width: u32,
        source: ResourceSource,
    },
    SetFramebuffer(u32),
    ResetFramebuffer,
    SetTextureImageFramebuffer(u32),
    Vertex {
        source: ResourceSource,
        offset: u32,
        n: u32,
        dest: u32,
    },
    DisplayList {
        source: ResourceSource,
        branch: bool,
    },
    Marker(u64),
    InvalidateTextureCache(u32),
    BranchZ {
        source: ResourceSource,
        vertex: u32,
        zval: u32,
    },
    Matrix {
        source: ResourceSource,
        params: MatrixParams,
    },
    TextureRectangleWide(TextureRectangle),
    FillWideRectangle(Rectangle<i32>),
    SetGrayscale(bool),
    ExtraGeometryMode {
        clear: ExtraGeometryModes,
        set: ExtraGeometryModes,
    },
    CopyFramebuffer {
        dst: u32,
        src: u32,
    },
    SetIntensity(Rgba32),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Unimplemented {
    pub w0: u32,
    pub w1: u32,
}

impl fmt::Debug for Unimplemented {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unimplemented {{ w0: {:#010X}, w1: {:#010X} }}",
            self.w0, self.w1
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MatrixParams {
    pub projection: bool,
    pub load: bool,
    pub push: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookAtAxis {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum VertexField {
    Rgba = 0x10,
    St = 0x14,
    XyScreen = 0x18,
    ZScreen = 0x1C,
}

/// A masked write into one of the othermode words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OtherModeUpdate {
    pub shift: u32,
    pub len: u32,
    pub data: u32,
}

impl OtherModeUpdate {
    pub fn apply(self, word: u32) -> u32 {
        let mask = (((1u64 << self.len) - 1) << self.shift) as u32;
        (word & !mask) | (self.data & mask)
    }
}

bitflags! {
    /// Geometry mode flags independent of the microcode's bit assignment.
    pub struct GeometryModes: u32 {
        const ZBUFFER             = 0x00000001;
        const TEXTURE_ENABLE      = 0x00000002;
        const SHADE               = 0x00000004;
        const CULL_FRONT          = 0x00000200;
        const CULL_BACK           = 0x00000400;
        const FOG                 = 0x00010000;
        const LIGHTING            = 0x00020000;
        const TEXTURE_GEN         = 0x00040000;
        const TEXTURE_GEN_LINEAR  = 0x00080000;
        const LOD                 = 0x00100000;
        const SHADING_SMOOTH      = 0x00200000;
        const LIGHTING_POSITIONAL = 0x00400000;
        const CLIPPING            = 0x00800000;
        const CULL_BOTH           = Self::CULL_FRONT.bits | Self::CULL_BACK.bits;
    }
}

impl Default for GeometryModes {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    pub struct ExtraGeometryModes: u32 {
        const INVERT_CULLING        = 0x00000001;
        const ALWAYS_EXECUTE_BRANCH = 0x00000002;
    }
}

impl Default for ExtraGeometryModes {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum TextureFilter {
    Point = 0,
    Average = 3,
    Bilerp = 2,
}

impl Default for TextureFilter {
    fn default() -> Self {
        Self::Point
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum TextureLUT {
    None = 0,
    Rgba16 = 2,
    Ia16 = 3,
}

impl Default for TextureLUT {
    fn default() -> Self {
        Self::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum CycleType {
    OneCycle = 0,
    TwoCycle = 1,
    Copy = 2,
    Fill = 3,
}

impl Default for CycleType {
    fn default() -> Self {
        Self::OneCycle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum AlphaCompare {
    None = 0,
    Threshold = 1,
    Dither = 3,
}

impl Default for AlphaCompare {
    fn default() -> Self {
        Self::None
    }
}

/// The render mode half of the low othermode word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderMode {
    pub flags: RenderModeFlags,
    pub cvg_dst: CvgDst,
    pub z_mode: ZMode,
    pub blend_cycle1: BlendMode,
    pub blend_cycle2: BlendMode,
}

impl From<u32> for RenderMode {
    fn from(w1: u32) -> Self {
        let field = |shift: u32| ((w1 >> shift) & 0x3) as u8;
        Self {
            flags: RenderModeFlags::from_bits_truncate(w1 as u16),
            cvg_dst: CvgDst::from_bits(field(8)),
            z_mode: ZMode::from_bits(field(10)),
            blend_cycle1: BlendMode {
                color1: BlendColor::from_bits(field(30)),
                alpha1: BlendAlpha1::from_bits(field(26)),
                color2: BlendColor::from_bits(field(22)),
                alpha2: BlendAlpha2::from_bits(field(18)),
            },
            blend_cycle2: BlendMode {
                color1: BlendColor::from_bits(field(28)),
                alpha1: BlendAlpha1::from_bits(field(24)),
                color2: BlendColor::from_bits(field(20)),
                alpha2: BlendAlpha2::from_bits(field(16)),
            },
        }
    }
}

bitflags! {
    pub struct RenderModeFlags: u16 {
        const ANTI_ALIASING = 0x0008;
        const Z_COMPARE     = 0x0010;
        const Z_UPDATE      = 0x0020;
        const IMAGE_READ    = 0x0040;
        const CLEAR_ON_CVG  = 0x0080;
        const CVG_X_ALPHA   = 0x1000;
        const ALPHA_CVG_SEL = 0x2000;
        const FORCE_BLEND   = 0x4000;
    }
}

// Every two bit value is meaningful for these fields.
macro_rules! two_bit_enum {
    ($name:ident { $($variant:ident = $value:literal),* $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant = $value),*
        }

        impl $name {
            pub fn from_bits(v: u8) -> Self {
                match v & 0x3 {
                    $($value => Self::$variant,)*
                    _ => unreachable!(),
                }
            }
        }
    };
}

two_bit_enum!(CvgDst {
    Clamp = 0,
    Wrap = 1,
    Full = 2,
    Save = 3,
});

two_bit_enum!(ZMode {
    Opaque = 0,
    Interpenetrating = 1,
    Translucent = 2,
    Decal = 3,
});

two_bit_enum!(BlendColor {
    Input = 0,
    Memory = 1,
    Blend = 2,
    Fog = 3,
});

two_bit_enum!(BlendAlpha1 {
    Input = 0,
    Fog = 1,
    Shade = 2,
    Zero = 3,
});

two_bit_enum!(BlendAlpha2 {
    OneMinusAlpha = 0,
    Memory = 1,
    One = 2,
    Zero = 3,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendMode {
    pub color1: BlendColor,
    pub alpha1: BlendAlpha1,
    pub color2: BlendColor,
    pub alpha2: BlendAlpha2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Image {
    pub fmt: ImageFormat,
    pub size: ComponentSize,
    pub width: u32,
    pub img: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ImageFormat {
    Rgba = 0,
    Yuv = 1,
    Ci = 2,
    Ia = 3,
    I = 4,
}

impl Default for ImageFormat {
    fn default() -> Self {
        Self::Rgba
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ComponentSize {
    Bits4 = 0,
    Bits8 = 1,
    Bits16 = 2,
    Bits32 = 3,
}

impl Default for ComponentSize {
    fn default() -> Self {
        Self::Bits4
    }
}

impl ComponentSize {
    pub fn num_bits(self) -> u32 {
        match self {
            ComponentSize::Bits4 => 4,
            ComponentSize::Bits8 => 8,
            ComponentSize::Bits16 => 16,
            ComponentSize::Bits32 => 32,
        }
    }

    /// log2 of the bytes per texel used for texture loads. 4 bit texels load like 8 bit ones.
    pub fn load_shift(self) -> u32 {
        match self {
            ComponentSize::Bits4 | ComponentSize::Bits8 => 0,
            ComponentSize::Bits16 => 1,
            ComponentSize::Bits32 => 2,
        }
    }

    /// Converts a row length in bytes to a row length in texels.
    pub fn bytes_to_texels(self, bytes: u32) -> u32 {
        match self {
            ComponentSize::Bits4 => bytes * 2,
            ComponentSize::Bits8 => bytes,
            ComponentSize::Bits16 => bytes / 2,
            ComponentSize::Bits32 => bytes / 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CombineMode {
    pub color1: ColorCombineMode,
    pub alpha1: ColorCombineMode,
    pub color2: ColorCombineMode,
    pub alpha2: ColorCombineMode,
}

impl CombineMode {
    pub fn one_cycle(color: ColorCombineMode, alpha: ColorCombineMode) -> Self {
        Self {
            color1: color,
            alpha1: alpha,
            color2: color,
            alpha2: alpha,
        }
    }

    /// Packs the equation into the 64 bit word used as the combiner cache key.
    ///
    /// Cycle `i` stores its color equation at bit `28 * i` and its alpha equation at bit
    /// `28 * i + 16`.
    pub fn to_packed(self) -> u64 {
        (self.color1.pack_color() as u64)
            | ((self.alpha1.pack_alpha() as u64) << 16)
            | ((self.color2.pack_color() as u64) << 28)
            | ((self.alpha2.pack_alpha() as u64) << 44)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColorCombineMode {
    /// [A, B, C, D]  ->  (A - B) * C + D
    pub args: [u8; 4],
}

impl From<[u8; 4]> for ColorCombineMode {
    fn from(args: [u8; 4]) -> Self {
        Self { args }
    }
}

impl ColorCombineMode {
    pub fn pack_color(self) -> u32 {
        let [a, b, c, d] = self.args.map(u32::from);
        (a & 0xF) | ((b & 0xF) << 4) | ((c & 0x1F) << 8) | ((d & 0x7) << 13)
    }

    pub fn pack_alpha(self) -> u32 {
        let [a, b, c, d] = self.args.map(u32::from);
        (a & 0x7) | ((b & 0x7) << 3) | ((c & 0x7) << 6) | ((d & 0x7) << 9)
    }
}

/// Color combiner input selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ColorCombineComponent {
    Combined = 0,
    Texel0 = 1,
    Texel1 = 2,
    Prim = 3,
    Shade = 4,
    Env = 5,
    One = 6,
    Noise = 7,
    Texel0Alpha = 8,
    Texel1Alpha = 9,
    PrimAlpha = 10,
    ShadeAlpha = 11,
    EnvAlpha = 12,
    LodFraction = 13,
    PrimLodFraction = 14,
    K5 = 15,
    Zero = 31,
}

/// Alpha combiner input selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum AlphaCombineComponent {
    CombinedOrLodFraction = 0,
    Texel0 = 1,
    Texel1 = 2,
    Prim = 3,
    Shade = 4,
    Env = 5,
    OneOrPrimLodFraction = 6,
    Zero = 7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba32 {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_word(w: u32) -> Self {
        Self {
            r: (w >> 24) as u8,
            g: (w >> 16) as u8,
            b: (w >> 8) as u8,
            a: w as u8,
        }
    }

    pub fn rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn from_rgb_a([r, g, b]: [u8; 3], a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Expands an RGBA5551 pixel.
    pub fn from_rgba16(rgba16: u16) -> Self {
        let scale = |v: u16| (v as u32 * 0xFF / 0x1F) as u8;
        Self {
            r: scale((rgba16 >> 11) & 0x1F),
            g: scale((rgba16 >> 6) & 0x1F),
            b: scale((rgba16 >> 1) & 0x1F),
            a: (rgba16 & 0x1) as u8 * 0xFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rectangle<T> {
    pub ulx: T,
    pub uly: T,
    pub lrx: T,
    pub lry: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TileParams {
    pub fmt: ImageFormat,
    pub size: ComponentSize,
    /// Row length in 64 bit words.
    pub line: u32,
    /// Address in 64 bit words.
    pub tmem: u32,
    pub palette: u32,
    pub cmt: WrapMode,
    pub maskt: u32,
    pub shiftt: u32,
    pub cms: WrapMode,
    pub masks: u32,
    pub shifts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WrapMode {
    pub mirror: bool,
    pub clamp: bool,
}

impl From<u8> for WrapMode {
    fn from(v: u8) -> Self {
        Self {
            mirror: v & 0x1 != 0,
            clamp: v & 0x2 != 0,
        }
    }
}

impl From<WrapMode> for u8 {
    fn from(m: WrapMode) -> Self {
        let mut v = 0;
        if m.mirror {
            v |= 0x1;
        }
        if m.clamp {
            v |= 0x2;
        }
        v
    }
}

impl WrapMode {
    pub const WRAP: Self = Self {
        mirror: false,
        clamp: false,
    };
    pub const MIRROR: Self = Self {
        mirror: true,
        clamp: false,
    };
    pub const CLAMP: Self = Self {
        mirror: false,
        clamp: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureBlock {
    pub uls: u32,
    pub ult: u32,
    pub lrs: u32,
    pub dxt: u32,
}

/// Tile coordinates in 10.2 fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TileSize {
    pub uls: u32,
    pub ult: u32,
    pub lrs: u32,
    pub lrt: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileIndex(pub u8);

impl TileIndex {
    pub const LOAD: TileIndex = TileIndex(7);
    pub const RENDER: TileIndex = TileIndex(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimDepth {
    pub z: u16,
    pub dz: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
#[allow(clippy::enum_variant_names)]
pub enum ScissorMode {
    NonInterlace = 0,
    OddInterlace = 3,
    EvenInterlace = 2,
}

impl Default for ScissorMode {
    fn default() -> Self {
        Self::NonInterlace
    }
}

/// A textured rectangle. Screen coordinates are 10.2, `s`/`t` are S10.5, and `dsdx`/`dtdy`
/// are S5.10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureRectangle {
    pub rect: Rectangle<i32>,
    pub tile: TileIndex,
    pub s: i16,
    pub t: i16,
    pub dsdx: i16,
    pub dtdy: i16,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_other_mode_update() {
        let update = OtherModeUpdate {
            shift: 20,
            len: 2,
            data: 2 << 20,
        };
        assert_eq!(update.apply(0xFFFF_FFFF), 0xFFEF_FFFF);
        let full = OtherModeUpdate {
            shift: 0,
            len: 32,
            data: 0x1234_5678,
        };
        assert_eq!(full.apply(0xFFFF_FFFF), 0x1234_5678);
    }

    #[test]
    fn test_rgba16_expansion() {
        assert_eq!(Rgba32::from_rgba16(0xFFFF), Rgba32::new(255, 255, 255, 255));
        assert_eq!(Rgba32::from_rgba16(0xF800), Rgba32::new(255, 0, 0, 0));
        assert_eq!(Rgba32::from_rgba16(0x0001), Rgba32::new(0, 0, 0, 255));
    }

    #[test]
    fn test_render_mode_fields() {
        // G_RM_AA_ZB_XLU_SURF | G_RM_AA_ZB_XLU_SURF2
        let mode = RenderMode::from(0x0050_49D8);
        assert!(mode.flags.contains(RenderModeFlags::Z_COMPARE));
        assert!(!mode.flags.contains(RenderModeFlags::Z_UPDATE));
        assert_eq!(mode.blend_cycle2.color2, BlendColor::Memory);
        assert_eq!(mode.blend_cycle2.alpha2, BlendAlpha2::OneMinusAlpha);
        assert_eq!(mode.z_mode, ZMode::Translucent);
    }
}
