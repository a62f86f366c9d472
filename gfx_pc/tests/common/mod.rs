#![allow(dead_code)]

use gfx_pc::{
    recorder::{HeadlessWindow, RecordingBackend},
    GfxConfig, Interpreter, Pointer,
};

/// The segment test data is mapped to.
pub const SEGMENT: u8 = 6;

pub const FMT_RGBA: u32 = 0;
pub const FMT_CI: u32 = 2;
pub const SIZ_4B: u32 = 0;
pub const SIZ_16B: u32 = 2;

pub const LOAD_TILE: u32 = 7;
pub const RENDER_TILE: u32 = 0;

pub const SHADE: ([u8; 4], [u8; 4]) = ([15, 15, 31, 4], [7, 7, 7, 4]);
pub const TEXEL0: ([u8; 4], [u8; 4]) = ([15, 15, 31, 1], [7, 7, 7, 1]);

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub type TestInterpreter = Interpreter<RecordingBackend, HeadlessWindow>;

pub fn interpreter() -> TestInterpreter {
    interpreter_with(GfxConfig::default())
}

pub fn interpreter_with(config: GfxConfig) -> TestInterpreter {
    init_logging();
    Interpreter::without_resources(RecordingBackend::new(), HeadlessWindow::new(320, 240), config)
}

/// Runs one full frame and returns the display list result.
pub fn run_frame(gfx: &mut TestInterpreter, dl: Pointer) -> gfx_pc::GfxResult<()> {
    gfx.start_frame();
    let result = gfx.run(dl, &Default::default());
    gfx.end_frame();
    result
}

/// A segment image: display list words followed by data blobs.
///
/// Commands are F3DEX2 encoded. Data is appended with [Segment::data] and addressed through
/// [SEGMENT].
#[derive(Debug, Default)]
pub struct Segment {
    bytes: Vec<u8>,
}

impl Segment {
    pub fn new() -> Self {
        Self::default()
    }

    /// The segmented address of the next byte.
    pub fn here(&self) -> u32 {
        ((SEGMENT as u32) << 24) | self.bytes.len() as u32
    }

    pub fn offset(&self) -> u32 {
        self.bytes.len() as u32
    }

    pub fn word(&mut self, w0: u32, w1: u32) -> &mut Self {
        self.bytes.extend_from_slice(&w0.to_be_bytes());
        self.bytes.extend_from_slice(&w1.to_be_bytes());
        self
    }

    /// Appends raw bytes, 8 byte aligned, and returns their segmented address.
    pub fn data(&mut self, data: &[u8]) -> u32 {
        while self.bytes.len() % 8 != 0 {
            self.bytes.push(0);
        }
        let addr = self.here();
        self.bytes.extend_from_slice(data);
        addr
    }

    pub fn vtx(&mut self, addr: u32, n: u32, dest: u32) -> &mut Self {
        self.word((0x01 << 24) | (n << 12) | ((dest + n) << 1), addr)
    }

    pub fn tri1(&mut self, v0: u32, v1: u32, v2: u32) -> &mut Self {
        self.word((0x05 << 24) | (v0 * 2) << 16 | (v1 * 2) << 8 | v2 * 2, 0)
    }

    pub fn cull_dl(&mut self, first: u32, last: u32) -> &mut Self {
        self.word((0x03 << 24) | first * 2, last * 2)
    }

    pub fn rdp_half1(&mut self, w1: u32) -> &mut Self {
        self.word(0xE1 << 24, w1)
    }

    pub fn branch_z(&mut self, dl: u32, vertex: u32, zval: u32) -> &mut Self {
        self.rdp_half1(dl);
        self.word((0x04 << 24) | (vertex * 5) << 12 | vertex * 2, zval)
    }

    pub fn end_dl(&mut self) -> &mut Self {
        self.word(0xDF << 24, 0)
    }

    pub fn geometry_mode(&mut self, clear: u32, set: u32) -> &mut Self {
        self.word((0xD9 << 24) | (!clear & 0x00FF_FFFF), set)
    }

    pub fn texture(&mut self, sc: u16, tc: u16, tile: u32, on: bool) -> &mut Self {
        self.word(
            (0xD7 << 24) | tile << 8 | (on as u32) << 1,
            (sc as u32) << 16 | tc as u32,
        )
    }

    pub fn set_other_mode_h(&mut self, shift: u32, len: u32, data: u32) -> &mut Self {
        self.word((0xE3 << 24) | (32 - shift - len) << 8 | (len - 1), data)
    }

    /// SETCOMBINE with the same color and alpha equations in both cycles.
    pub fn set_combine(&mut self, (color, alpha): ([u8; 4], [u8; 4])) -> &mut Self {
        let [a, b, c, d] = color.map(u32::from);
        let [aa, ab, ac, ad] = alpha.map(u32::from);
        let w0 = (0xFC << 24)
            | (a & 0xF) << 20
            | (c & 0x1F) << 15
            | (aa & 0x7) << 12
            | (ac & 0x7) << 9
            | (a & 0xF) << 5
            | (c & 0x1F);
        let w1 = (b & 0xF) << 28
            | (b & 0xF) << 24
            | (aa & 0x7) << 21
            | (ac & 0x7) << 18
            | (d & 0x7) << 15
            | (ab & 0x7) << 12
            | (ad & 0x7) << 9
            | (d & 0x7) << 6
            | (ab & 0x7) << 3
            | (ad & 0x7);
        self.word(w0, w1)
    }

    pub fn set_scissor(&mut self, ulx: u32, uly: u32, lrx: u32, lry: u32) -> &mut Self {
        self.word(
            (0xED << 24) | (ulx << 2) << 12 | (uly << 2),
            (lrx << 2) << 12 | (lry << 2),
        )
    }

    pub fn set_texture_image(&mut self, fmt: u32, siz: u32, width: u32, addr: u32) -> &mut Self {
        self.word((0xFD << 24) | fmt << 21 | siz << 19 | (width - 1), addr)
    }

    pub fn set_tile(
        &mut self,
        fmt: u32,
        siz: u32,
        line: u32,
        tmem: u32,
        tile: u32,
        palette: u32,
    ) -> &mut Self {
        self.word(
            (0xF5 << 24) | fmt << 21 | siz << 19 | line << 9 | tmem,
            tile << 24 | palette << 20,
        )
    }

    pub fn load_block(&mut self, tile: u32, lrs: u32, dxt: u32) -> &mut Self {
        self.word(0xF3 << 24, tile << 24 | lrs << 12 | dxt)
    }

    pub fn load_tlut(&mut self, tile: u32, count: u32) -> &mut Self {
        self.word(0xF0 << 24, tile << 24 | ((count - 1) << 2) << 12)
    }

    pub fn load_tile(&mut self, tile: u32, width: u32, height: u32) -> &mut Self {
        self.word(0xF4 << 24, tile << 24 | ((width - 1) << 2) << 12 | ((height - 1) << 2))
    }

    pub fn set_tile_size(&mut self, tile: u32, width: u32, height: u32) -> &mut Self {
        self.word(0xF2 << 24, tile << 24 | ((width - 1) << 2) << 12 | ((height - 1) << 2))
    }

    /// The extension command that drops cached textures loaded from `addr`.
    pub fn invalidate_texture_cache(&mut self, addr: u32) -> &mut Self {
        self.word(0x34 << 24, addr)
    }

    /// The usual sequence for a 16 bit texture: LOADBLOCK through the load tile, then the
    /// render tile's format and size.
    pub fn load_texture_16b(&mut self, addr: u32, width: u32, height: u32) -> &mut Self {
        let line = (width * 2 + 7) / 8;
        self.set_texture_image(FMT_RGBA, SIZ_16B, 1, addr)
            .set_tile(FMT_RGBA, SIZ_16B, 0, 0, LOAD_TILE, 0)
            .load_block(LOAD_TILE, width * height - 1, 0)
            .set_tile(FMT_RGBA, SIZ_16B, line, 0, RENDER_TILE, 0)
            .set_tile_size(RENDER_TILE, width, height)
    }

    /// The same texture loaded as a rectangle with LOADTILE.
    pub fn load_texture_tile_16b(&mut self, addr: u32, width: u32, height: u32) -> &mut Self {
        self.load_subtexture_16b(addr, width, width, height)
    }

    /// Loads the top left `width * height` texels of an image `image_width` texels wide.
    pub fn load_subtexture_16b(
        &mut self,
        addr: u32,
        image_width: u32,
        width: u32,
        height: u32,
    ) -> &mut Self {
        let line = (width * 2 + 7) / 8;
        self.set_texture_image(FMT_RGBA, SIZ_16B, image_width, addr)
            .set_tile(FMT_RGBA, SIZ_16B, line, 0, LOAD_TILE, 0)
            .load_tile(LOAD_TILE, width, height)
            .set_tile(FMT_RGBA, SIZ_16B, line, 0, RENDER_TILE, 0)
            .set_tile_size(RENDER_TILE, width, height)
    }

    /// A 4 bit color indexed texture with a 16 entry palette.
    pub fn load_texture_ci4(&mut self, addr: u32, tlut: u32, width: u32, height: u32) -> &mut Self {
        // G_TT_RGBA16
        self.set_other_mode_h(14, 2, 2 << 14)
            .set_texture_image(FMT_RGBA, SIZ_16B, 1, tlut)
            .set_tile(FMT_RGBA, SIZ_4B, 0, 256, LOAD_TILE, 0)
            .load_tlut(LOAD_TILE, 16);
        // 4 bit textures are loaded as 16 bit words.
        let line = (width / 2 + 7) / 8;
        self.set_texture_image(FMT_CI, SIZ_16B, 1, addr)
            .set_tile(FMT_CI, SIZ_16B, 0, 0, LOAD_TILE, 0)
            .load_block(LOAD_TILE, (width * height + 3) / 4 - 1, 0)
            .set_tile(FMT_CI, SIZ_4B, line, 0, RENDER_TILE, 0)
            .set_tile_size(RENDER_TILE, width, height)
    }

    /// Loads the image into the interpreter and maps [SEGMENT] to it.
    pub fn install(&self, gfx: &mut TestInterpreter) -> Pointer {
        let base = gfx.load_buffer(self.bytes.clone());
        gfx.set_segment(SEGMENT, Some(base));
        base
    }
}

/// Encodes vertices as `(x, y, z, s, t, rgba)`.
pub fn vertices(vs: &[(i16, i16, i16, i16, i16, [u8; 4])]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for &(x, y, z, s, t, rgba) in vs {
        if cfg!(feature = "gbi-floats") {
            for c in [x, y, z] {
                bytes.extend_from_slice(&(c as f32).to_be_bytes());
            }
        } else {
            for c in [x, y, z] {
                bytes.extend_from_slice(&c.to_be_bytes());
            }
        }
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&s.to_be_bytes());
        bytes.extend_from_slice(&t.to_be_bytes());
        bytes.extend_from_slice(&rgba);
        if cfg!(feature = "gbi-floats") {
            bytes.extend_from_slice(&[0, 0]);
        }
    }
    bytes
}

pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// A triangle inside the clip volume under identity matrices.
pub fn visible_triangle() -> Vec<u8> {
    vertices(&[
        (0, 0, 0, 0, 0, WHITE),
        (1, 0, 0, 512, 0, WHITE),
        (0, 1, 0, 0, 512, WHITE),
    ])
}

/// A triangle entirely past the right clip plane.
pub fn offscreen_triangle() -> Vec<u8> {
    vertices(&[
        (5, 0, 0, 0, 0, WHITE),
        (6, 0, 0, 0, 0, WHITE),
        (5, 1, 0, 0, 0, WHITE),
    ])
}

/// A `width * height` RGBA16 texture filled with `texel`.
pub fn rgba16_texture(width: u32, height: u32, texel: u16) -> Vec<u8> {
    (0..width * height).flat_map(|_| texel.to_be_bytes()).collect()
}
