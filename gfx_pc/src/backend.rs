//! The interface between the interpreter and the platform renderer and window.
//!
//! The interpreter only calls into these traits. Implementations never call back into the
//! interpreter during a frame.

#![allow(missing_docs)]

/// A compiled shader program owned by the rendering backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub usize);

/// A texture owned by the rendering backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// A render target owned by the rendering backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferId(pub u32);

impl FramebufferId {
    /// The window's own render target.
    pub const WINDOW: FramebufferId = FramebufferId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderInfo {
    pub num_inputs: u8,
    pub used_textures: [bool; 2],
}

/// Parameters of an off-screen render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferParams {
    pub width: u32,
    pub height: u32,
    pub msaa_level: u32,
    pub render_target: bool,
    pub has_depth_buffer: bool,
}

/// A renderer that draws batches of triangles produced by the interpreter.
///
/// Each vertex of `draw_triangles` is a run of floats:
/// - the clip space position `x, y, z, w`
/// - for each used texture, `u, v`, followed by the clamp limits for clamped axes
/// - the fog color and factor if fog is enabled
/// - the grayscale color if grayscale is enabled
/// - for each shader input, `r, g, b` and `a` if the shader blends with alpha
pub trait RenderingApi {
    fn z_is_from_0_to_1(&self) -> bool;
    fn unload_shader(&mut self, old_prg: ShaderId);
    fn load_shader(&mut self, new_prg: ShaderId);
    fn create_and_load_new_shader(&mut self, shader_id0: u64, shader_id1: u32) -> ShaderId;
    fn lookup_shader(&self, shader_id0: u64, shader_id1: u32) -> Option<ShaderId>;
    fn shader_get_info(&self, prg: ShaderId) -> ShaderInfo;
    fn new_texture(&mut self) -> TextureId;
    fn select_texture(&mut self, tile: usize, texture_id: TextureId);
    /// Uploads RGBA32 data to the selected texture.
    fn upload_texture(&mut self, rgba32_buf: &[u8], width: u32, height: u32);
    fn set_sampler_parameters(&mut self, tile: usize, linear_filter: bool, cms: u32, cmt: u32);
    fn delete_texture(&mut self, texture_id: TextureId);
    fn set_depth_test_and_mask(&mut self, depth_test: bool, z_upd: bool);
    fn set_zmode_decal(&mut self, zmode_decal: bool);
    fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn set_scissor(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn set_use_alpha(&mut self, use_alpha: bool);
    fn draw_triangles(&mut self, buf_vbo: &[f32], buf_vbo_num_tris: usize);
    fn init(&mut self);
    fn on_resize(&mut self);
    fn start_frame(&mut self);
    fn end_frame(&mut self);
    fn finish_render(&mut self);
    fn create_framebuffer(&mut self) -> FramebufferId;
    fn update_framebuffer_parameters(&mut self, fb: FramebufferId, params: FramebufferParams);
    fn start_draw_to_framebuffer(&mut self, fb: FramebufferId, noise_scale: f32);
    fn clear_framebuffer(&mut self, color: bool, depth: bool);
    fn copy_framebuffer(&mut self, dst: FramebufferId, src: FramebufferId);
    /// Binds a framebuffer's color output as texture 0.
    fn select_texture_fb(&mut self, fb: FramebufferId);
    fn get_pixel_depth(&mut self, fb: FramebufferId, x: f32, y: f32) -> f32;
}

/// The window the frames are presented in.
pub trait WindowManagerApi {
    fn get_dimensions(&self) -> (u32, u32);
    fn handle_events(&mut self);
    /// Returns false if this frame should be dropped.
    fn start_frame(&mut self) -> bool;
    fn swap_buffers_begin(&mut self);
    fn swap_buffers_end(&mut self);
    fn set_target_fps(&mut self, fps: u32);
    fn set_max_frame_latency(&mut self, latency: u32);
}
