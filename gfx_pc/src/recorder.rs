//! A headless backend that records everything the interpreter asks it to do.

#![allow(missing_docs)]

use core::fmt;

use derivative::Derivative;

use crate::{
    backend::*,
    combiner::decode_shader_id,
    texture::TextureData,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScreenRectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerState {
    pub linear_filter: bool,
    pub cms: u32,
    pub cmt: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextureState {
    pub data: Option<TextureData>,
    pub sampler: Option<SamplerState>,
    pub num_uploads: usize,
    pub deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderState {
    pub shader: Option<ShaderId>,
    pub depth_test: bool,
    pub depth_mask: bool,
    pub zmode_decal: bool,
    pub use_alpha: bool,
}

/// One `draw_triangles` call and the state it was issued with.
#[derive(Clone, PartialEq)]
pub struct DrawCall {
    pub framebuffer: FramebufferId,
    pub viewport: ScreenRectangle,
    pub scissor: ScreenRectangle,
    pub state: RenderState,
    pub textures: [Option<TextureId>; 2],
    pub vertex_buffer: Vec<f32>,
    pub num_tris: usize,
}

impl fmt::Debug for DrawCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawCall")
            .field("framebuffer", &self.framebuffer)
            .field("viewport", &self.viewport)
            .field("scissor", &self.scissor)
            .field("state", &self.state)
            .field("textures", &self.textures)
            .field("num_tris", &self.num_tris)
            .finish_non_exhaustive()
    }
}

impl DrawCall {
    /// The number of floats per vertex.
    pub fn vertex_stride(&self) -> usize {
        if self.num_tris == 0 {
            0
        } else {
            self.vertex_buffer.len() / (3 * self.num_tris)
        }
    }
}

/// A [RenderingApi] that keeps the frame contents in memory instead of drawing them.
#[derive(Debug, Derivative)]
#[derivative(Default)]
pub struct RecordingBackend {
    #[derivative(Default(value = "true"))]
    z_is_from_0_to_1: bool,
    viewport: ScreenRectangle,
    scissor: ScreenRectangle,
    state: RenderState,
    tile: usize,
    selected: [Option<TextureId>; 2],
    #[derivative(Default(value = "FramebufferId::WINDOW"))]
    framebuffer: FramebufferId,
    textures: Vec<TextureState>,
    shaders: Vec<(u64, u32)>,
    framebuffers: Vec<Option<FramebufferParams>>,
    draws: Vec<DrawCall>,
    copies: Vec<(FramebufferId, FramebufferId)>,
    frames: usize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    pub fn take_draws(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.draws)
    }

    pub fn textures(&self) -> &[TextureState] {
        &self.textures
    }

    pub fn texture(&self, id: TextureId) -> Option<&TextureState> {
        self.textures.get(id.0 as usize)
    }

    /// Every shader created, as `(shader_id0, shader_id1)`, indexed by [ShaderId].
    pub fn shaders(&self) -> &[(u64, u32)] {
        &self.shaders
    }

    pub fn framebuffer_params(&self, fb: FramebufferId) -> Option<FramebufferParams> {
        self.framebuffers.get(fb.0 as usize).copied().flatten()
    }

    pub fn copies(&self) -> &[(FramebufferId, FramebufferId)] {
        &self.copies
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn total_uploads(&self) -> usize {
        self.textures.iter().map(|t| t.num_uploads).sum()
    }

    fn selected_texture(&mut self) -> Option<&mut TextureState> {
        let id = self.selected[self.tile]?;
        self.textures.get_mut(id.0 as usize)
    }
}

impl RenderingApi for RecordingBackend {
    fn z_is_from_0_to_1(&self) -> bool {
        self.z_is_from_0_to_1
    }

    fn unload_shader(&mut self, _old_prg: ShaderId) {
        self.state.shader = None;
    }

    fn load_shader(&mut self, new_prg: ShaderId) {
        self.state.shader = Some(new_prg);
    }

    fn create_and_load_new_shader(&mut self, shader_id0: u64, shader_id1: u32) -> ShaderId {
        let id = ShaderId(self.shaders.len());
        self.shaders.push((shader_id0, shader_id1));
        self.state.shader = Some(id);
        id
    }

    fn lookup_shader(&self, shader_id0: u64, shader_id1: u32) -> Option<ShaderId> {
        self.shaders
            .iter()
            .position(|&ids| ids == (shader_id0, shader_id1))
            .map(ShaderId)
    }

    fn shader_get_info(&self, prg: ShaderId) -> ShaderInfo {
        match self.shaders.get(prg.0) {
            Some(&(id0, id1)) => {
                let features = decode_shader_id(id0, id1);
                ShaderInfo {
                    num_inputs: features.num_inputs as u8,
                    used_textures: features.used_textures,
                }
            }
            None => ShaderInfo {
                num_inputs: 0,
                used_textures: [false, false],
            },
        }
    }

    fn new_texture(&mut self) -> TextureId {
        let id = TextureId(self.textures.len() as u32);
        self.textures.push(TextureState::default());
        id
    }

    fn select_texture(&mut self, tile: usize, texture_id: TextureId) {
        assert!(
            (texture_id.0 as usize) < self.textures.len(),
            "invalid texture id"
        );
        self.tile = tile;
        self.selected[tile] = Some(texture_id);
    }

    fn upload_texture(&mut self, rgba32_buf: &[u8], width: u32, height: u32) {
        if let Some(texture) = self.selected_texture() {
            texture.data = Some(TextureData::new(width, height, rgba32_buf.to_vec()));
            texture.num_uploads += 1;
            texture.deleted = false;
        }
    }

    fn set_sampler_parameters(&mut self, tile: usize, linear_filter: bool, cms: u32, cmt: u32) {
        self.tile = tile;
        if let Some(texture) = self.selected_texture() {
            texture.sampler = Some(SamplerState {
                linear_filter,
                cms,
                cmt,
            });
        }
    }

    fn delete_texture(&mut self, texture_id: TextureId) {
        if let Some(texture) = self.textures.get_mut(texture_id.0 as usize) {
            texture.data = None;
            texture.deleted = true;
        }
    }

    fn set_depth_test_and_mask(&mut self, depth_test: bool, z_upd: bool) {
        self.state.depth_test = depth_test;
        self.state.depth_mask = z_upd;
    }

    fn set_zmode_decal(&mut self, zmode_decal: bool) {
        self.state.zmode_decal = zmode_decal;
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.viewport = ScreenRectangle {
            x,
            y,
            width,
            height,
        };
    }

    fn set_scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.scissor = ScreenRectangle {
            x,
            y,
            width,
            height,
        };
    }

    fn set_use_alpha(&mut self, use_alpha: bool) {
        self.state.use_alpha = use_alpha;
    }

    fn draw_triangles(&mut self, buf_vbo: &[f32], buf_vbo_num_tris: usize) {
        self.draws.push(DrawCall {
            framebuffer: self.framebuffer,
            viewport: self.viewport,
            scissor: self.scissor,
            state: self.state,
            textures: self.selected,
            vertex_buffer: buf_vbo.to_vec(),
            num_tris: buf_vbo_num_tris,
        });
    }

    fn init(&mut self) {}

    fn on_resize(&mut self) {}

    fn start_frame(&mut self) {
        self.frames += 1;
    }

    fn end_frame(&mut self) {}

    fn finish_render(&mut self) {}

    fn create_framebuffer(&mut self) -> FramebufferId {
        if self.framebuffers.is_empty() {
            // Id 0 is the window.
            self.framebuffers.push(None);
        }
        let id = FramebufferId(self.framebuffers.len() as u32);
        self.framebuffers.push(None);
        id
    }

    fn update_framebuffer_parameters(&mut self, fb: FramebufferId, params: FramebufferParams) {
        if let Some(slot) = self.framebuffers.get_mut(fb.0 as usize) {
            *slot = Some(params);
        }
    }

    fn start_draw_to_framebuffer(&mut self, fb: FramebufferId, _noise_scale: f32) {
        self.framebuffer = fb;
    }

    fn clear_framebuffer(&mut self, _color: bool, _depth: bool) {}

    fn copy_framebuffer(&mut self, dst: FramebufferId, src: FramebufferId) {
        self.copies.push((dst, src));
    }

    fn select_texture_fb(&mut self, _fb: FramebufferId) {
        self.tile = 0;
        self.selected[0] = None;
    }

    fn get_pixel_depth(&mut self, _fb: FramebufferId, _x: f32, _y: f32) -> f32 {
        0.0
    }
}

/// A [WindowManagerApi] with a fixed size and no events.
#[derive(Debug, Clone, Derivative)]
#[derivative(Default)]
pub struct HeadlessWindow {
    #[derivative(Default(value = "320"))]
    pub width: u32,
    #[derivative(Default(value = "240"))]
    pub height: u32,
    /// When set, `start_frame` reports that the frame should be dropped.
    pub drop_frames: bool,
    pub target_fps: u32,
    pub max_frame_latency: u32,
    pub frames_started: usize,
    pub frames_presented: usize,
}

impl HeadlessWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }
}

impl WindowManagerApi for HeadlessWindow {
    fn get_dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn handle_events(&mut self) {}

    fn start_frame(&mut self) -> bool {
        if self.drop_frames {
            false
        } else {
            self.frames_started += 1;
            true
        }
    }

    fn swap_buffers_begin(&mut self) {}

    fn swap_buffers_end(&mut self) {
        self.frames_presented += 1;
    }

    fn set_target_fps(&mut self, fps: u32) {
        self.target_fps = fps;
    }

    fn set_max_frame_latency(&mut self, latency: u32) {
        self.max_frame_latency = latency;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shader_lookup_by_id_pair() {
        let mut backend = RecordingBackend::new();
        assert_eq!(backend.lookup_shader(1, 2), None);
        let id = backend.create_and_load_new_shader(1, 2);
        assert_eq!(backend.lookup_shader(1, 2), Some(id));
        assert_eq!(backend.lookup_shader(1, 3), None);
    }

    #[test]
    fn test_texture_upload_and_draw() {
        let mut backend = RecordingBackend::new();
        let tex = backend.new_texture();
        backend.select_texture(1, tex);
        backend.upload_texture(&[1, 2, 3, 4], 1, 1);
        backend.set_sampler_parameters(1, true, 0, 2);
        backend.draw_triangles(&[0.0; 12], 1);

        let state = backend.texture(tex).unwrap();
        assert_eq!(state.num_uploads, 1);
        assert_eq!(state.sampler.unwrap().cmt, 2);
        assert_eq!(backend.draws()[0].textures, [None, Some(tex)]);
        assert_eq!(backend.draws()[0].vertex_stride(), 4);
    }

    #[test]
    fn test_framebuffer_ids_skip_window() {
        let mut backend = RecordingBackend::new();
        let fb = backend.create_framebuffer();
        assert_ne!(fb, FramebufferId::WINDOW);
        assert_eq!(backend.framebuffer_params(fb), None);
    }
}
