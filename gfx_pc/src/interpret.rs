//! The display list interpreter.
//!
//! An [Interpreter] owns the RSP and RDP state and walks a display list one command at a time,
//! turning draws into batched triangles for a [RenderingApi]. The host drives it once per
//! frame:
//!
//! ```ignore
//! interpreter.start_frame();
//! interpreter.run(root_dl, &HashMap::new())?;
//! interpreter.end_frame();
//! ```
//!
//! Display list data lives in the interpreter's [Arena]. Segmented addresses are resolved
//! through the segment table when a command executes, so segments can be remapped between
//! frames.

use std::collections::HashMap;

use derivative::Derivative;

use crate::{
    backend::{FramebufferId, RenderingApi, WindowManagerApi},
    batch::VertexBatch,
    cmd::*,
    combiner::CombinerPool,
    config::GfxConfig,
    decode::{decode_command, RawGfxCommand},
    draw::RenderingState,
    error::{GfxError, GfxResult},
    exec::{ExecStack, COMMAND_SIZE},
    framebuffer::Framebuffers,
    matrix::Matrixf,
    memory::{Arena, BufferHandle, Pointer, SegmentTable},
    rdp::{scissor_native_rect, OtherMode, RdpState, ScreenRect, TextureImage, Viewport},
    resource::{
        LoadedResource, NoResources, RawTexMetadata, ResourceCache, ResourceKind, ResourceManager,
        ResourceRef,
    },
    rsp::{Light, RspState, TextureScale, MAX_VERTICES},
    s2dex::S2dexState,
    texture_cache::{TextureCache, TextureCacheStats},
    ucode::Ucode,
};

/// Replacement matrices keyed by the address of the matrix they stand in for.
pub type MatrixReplacements = HashMap<Pointer, Matrixf>;

/// Interprets display lists and submits the resulting draws to a rendering backend.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Interpreter<R, W> {
    pub(crate) rapi: R,
    pub(crate) wapi: W,
    pub(crate) config: GfxConfig,
    pub(crate) arena: Arena,
    pub(crate) segments: SegmentTable,
    #[derivative(Debug = "ignore")]
    pub(crate) resources: Box<dyn ResourceManager>,
    pub(crate) resource_cache: ResourceCache,
    pub(crate) exec: ExecStack,
    pub(crate) ucode: Ucode,
    pub(crate) rsp: RspState,
    pub(crate) rdp: RdpState,
    pub(crate) extra_geometry_mode: ExtraGeometryModes,
    pub(crate) rdp_half1: u32,
    pub(crate) combiners: CombinerPool,
    pub(crate) textures: TextureCache,
    pub(crate) framebuffers: Framebuffers,
    pub(crate) batch: VertexBatch,
    pub(crate) rendering_state: RenderingState,
    pub(crate) s2dex: S2dexState,
}

impl<R: RenderingApi, W: WindowManagerApi> Interpreter<R, W> {
    /// Creates an interpreter and initializes the backend and window.
    ///
    /// Extension commands that reference resources by hash or path look them up in
    /// `resources`.
    pub fn new(
        mut rapi: R,
        mut wapi: W,
        config: GfxConfig,
        resources: impl ResourceManager + 'static,
    ) -> Self {
        rapi.init();
        wapi.set_target_fps(config.target_fps);
        wapi.set_max_frame_latency(config.max_frame_latency);

        let mut framebuffers = Framebuffers::new(config.native_width, config.native_height);
        let (width, height) = wapi.get_dimensions();
        framebuffers.set_window_dimensions(&mut rapi, width, height);

        tracing::info!(
            "initialized for {:?} at {}x{}",
            config.initial_ucode,
            config.native_width,
            config.native_height
        );
        Self {
            rapi,
            wapi,
            arena: Arena::new(),
            segments: SegmentTable::default(),
            resources: Box::new(resources),
            resource_cache: ResourceCache::default(),
            exec: ExecStack::default(),
            ucode: config.initial_ucode,
            rsp: RspState::default(),
            rdp: RdpState::default(),
            extra_geometry_mode: ExtraGeometryModes::empty(),
            rdp_half1: 0,
            combiners: CombinerPool::new(),
            textures: TextureCache::new(config.texture_cache_capacity),
            framebuffers,
            batch: VertexBatch::new(config.max_buffered_triangles),
            rendering_state: RenderingState::default(),
            s2dex: S2dexState::default(),
            config,
        }
    }

    /// Creates an interpreter without a resource manager.
    pub fn without_resources(rapi: R, wapi: W, config: GfxConfig) -> Self {
        Self::new(rapi, wapi, config, NoResources)
    }

    /// The settings the interpreter was created with.
    pub fn config(&self) -> &GfxConfig {
        &self.config
    }

    /// The rendering backend.
    pub fn rapi(&self) -> &R {
        &self.rapi
    }

    /// The rendering backend, mutably.
    pub fn rapi_mut(&mut self) -> &mut R {
        &mut self.rapi
    }

    /// The window backend.
    pub fn wapi(&self) -> &W {
        &self.wapi
    }

    /// The window backend, mutably.
    pub fn wapi_mut(&mut self) -> &mut W {
        &mut self.wapi
    }

    /// The memory display lists are read from.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// The memory display lists and the data they reference are read from.
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// Copies `data` into the arena and returns a pointer to its start.
    pub fn load_buffer(&mut self, data: Vec<u8>) -> Pointer {
        let handle: BufferHandle = self.arena.insert(data);
        Pointer::new(handle, 0)
    }

    /// Maps a segment for subsequent frames. Display lists can also remap segments.
    pub fn set_segment(&mut self, segment: u8, base: Option<Pointer>) {
        self.segments.set(segment, base);
    }

    /// The current segment mappings.
    pub fn segments(&self) -> &SegmentTable {
        &self.segments
    }

    /// The microcode commands are currently decoded for.
    pub fn ucode(&self) -> Ucode {
        self.ucode
    }

    /// Switches the microcode used to decode subsequent commands.
    pub fn set_ucode(&mut self, ucode: Ucode) {
        self.ucode = ucode;
    }

    /// The geometry state.
    pub fn rsp(&self) -> &RspState {
        &self.rsp
    }

    /// The rasterizer state.
    pub fn rdp(&self) -> &RdpState {
        &self.rdp
    }

    /// The textures uploaded so far.
    pub fn texture_cache(&self) -> &TextureCache {
        &self.textures
    }

    /// Hit, miss and eviction counts of the texture cache.
    pub fn texture_cache_stats(&self) -> TextureCacheStats {
        self.textures.stats()
    }

    /// Every combiner created so far.
    pub fn combiners(&self) -> &CombinerPool {
        &self.combiners
    }

    /// The number of draw calls issued since creation.
    pub fn num_flushes(&self) -> usize {
        self.batch.num_flushes()
    }

    /// Creates an off-screen render target that display lists can draw into.
    ///
    /// Display lists address it in a `native_width` x `native_height` coordinate space. If
    /// `resize` is set, the target is scaled along with the window.
    pub fn create_framebuffer(
        &mut self,
        width: u32,
        height: u32,
        native_width: u32,
        native_height: u32,
        resize: bool,
    ) -> FramebufferId {
        let msaa_level = self.config.msaa_level;
        self.framebuffers.create(
            &mut self.rapi,
            width,
            height,
            native_width,
            native_height,
            msaa_level,
            resize,
        )
    }

    /// Reads back the depth at a point of a render target.
    pub fn get_pixel_depth(&mut self, fb: FramebufferId, x: f32, y: f32) -> f32 {
        self.rapi.get_pixel_depth(fb, x, y)
    }

    /// Drops every cached texture that was loaded from `addr`.
    pub fn invalidate_texture(&mut self, addr: Pointer) {
        self.flush();
        self.textures.invalidate(addr);
        self.rdp.mark_textures_changed();
    }

    /// Drops the whole texture cache, deleting the backend textures.
    pub fn clear_texture_cache(&mut self) {
        self.flush();
        for id in self.textures.clear() {
            self.rapi.delete_texture(id);
        }
        self.rendering_state.textures = [None; 2];
        self.rdp.mark_textures_changed();
    }

    /// Polls window events and picks up window size changes.
    pub fn start_frame(&mut self) {
        self.wapi.handle_events();
        let (width, height) = self.wapi.get_dimensions();
        if self
            .framebuffers
            .set_window_dimensions(&mut self.rapi, width, height)
        {
            tracing::debug!("window resized to {}x{}", width, height);
            self.rapi.on_resize();
        }
    }

    /// Interprets the display list at `dl` and submits the frame.
    ///
    /// Matrices whose address appears in `mtx_replacements` are replaced before they are
    /// applied. If the window asks for the frame to be dropped, nothing is interpreted.
    pub fn run(&mut self, dl: Pointer, mtx_replacements: &MatrixReplacements) -> GfxResult<()> {
        if !self.wapi.start_frame() {
            tracing::debug!("dropping frame");
            return Ok(());
        }

        self.rapi.start_frame();
        self.framebuffers.set_active(None);
        self.rapi
            .start_draw_to_framebuffer(FramebufferId::WINDOW, self.framebuffers.noise_scale());
        self.rsp.reset();
        self.extra_geometry_mode = ExtraGeometryModes::empty();
        self.rendering_state = RenderingState::default();

        let (width, height) = self.framebuffers.native_dimensions();
        let full_screen = self.framebuffers.adjust_viewport_or_scissor(ScreenRect {
            x: 0.0,
            y: height as f32,
            width: width as f32,
            height: height as f32,
        });
        self.rdp.viewport = full_screen;
        self.rdp.scissor = full_screen;
        self.rdp.viewport_or_scissor_changed = true;

        self.exec.start(dl);
        let result = self.interpret(mtx_replacements);
        if let Err(error) = &result {
            tracing::error!("display list aborted: {} (in {:?})", error, self.exec.labels());
        }

        self.flush();
        self.rapi.end_frame();
        self.wapi.swap_buffers_begin();
        result
    }

    /// Finishes presenting the frame submitted by [Interpreter::run].
    pub fn end_frame(&mut self) {
        self.rapi.finish_render();
        self.wapi.swap_buffers_end();
    }

    fn interpret(&mut self, mtx_replacements: &MatrixReplacements) -> GfxResult<()> {
        while let Some(pc) = self.exec.current() {
            let raw = self.arena.read_command(pc)?;
            let mut following = [RawGfxCommand::default(); 2];
            let mut num_following = 0;
            for (i, slot) in following.iter_mut().enumerate() {
                match self.arena.read_command(pc.add((i as u32 + 1) * COMMAND_SIZE)) {
                    Ok(cmd) => {
                        *slot = cmd;
                        num_following += 1;
                    }
                    Err(_) => break,
                }
            }
            let decoded = decode_command(self.ucode, raw, &following[..num_following]);
            self.exec.advance(decoded.len);
            self.execute(decoded.command, mtx_replacements)?;
        }
        Ok(())
    }

    fn execute(&mut self, cmd: GfxCommand, mtx_replacements: &MatrixReplacements) -> GfxResult<()> {
        match cmd {
            GfxCommand::NoOp => {}
            GfxCommand::Unknown { ucode, raw } => {
                tracing::warn!("unknown {:?} command {:?}", ucode, raw);
            }
            GfxCommand::Rsp(cmd) => self.execute_rsp(cmd, mtx_replacements)?,
            GfxCommand::Rdp(cmd) => self.execute_rdp(cmd)?,
            GfxCommand::S2dex(cmd) => self.execute_s2dex(cmd)?,
            GfxCommand::Otr(cmd) => self.execute_otr(cmd, mtx_replacements)?,
        }
        Ok(())
    }

    fn load_matrix(
        &mut self,
        pointer: Pointer,
        params: MatrixParams,
        mtx_replacements: &MatrixReplacements,
    ) -> GfxResult<()> {
        let matrix = match mtx_replacements.get(&pointer) {
            Some(matrix) => *matrix,
            None => Matrixf::read(&self.arena, pointer)?,
        };
        self.rsp
            .matrix(matrix, params.projection, params.load, params.push);
        Ok(())
    }

    fn load_vertices(&mut self, pointer: Pointer, n: u32, dest: u32) -> GfxResult<()> {
        let aspect_scale = self.framebuffers.aspect_scale();
        self.rsp
            .load_vertices(&self.arena, pointer, n as usize, dest as usize, aspect_scale)
    }

    fn call_display_list(&mut self, target: Pointer, label: String, branch: bool) {
        tracing::trace!("{} {}", if branch { "branch to" } else { "call" }, label);
        if branch {
            self.exec.branch(target, label);
        } else {
            self.exec.call(target, label);
        }
    }

    fn branch_z(&mut self, vertex: u32, zval: u32) -> bool {
        if vertex as usize >= MAX_VERTICES {
            tracing::warn!("BRANCH_Z on vertex {} out of range", vertex);
            return false;
        }
        let vertex = self.rsp.vertices[vertex as usize];
        vertex.z <= zval as i32 as f32
            || self
                .extra_geometry_mode
                .contains(ExtraGeometryModes::ALWAYS_EXECUTE_BRANCH)
    }

    fn execute_rsp(
        &mut self,
        cmd: RspCommand,
        mtx_replacements: &MatrixReplacements,
    ) -> GfxResult<()> {
        match cmd {
            RspCommand::Matrix { matrix, params } => {
                let pointer = self.segments.resolve(matrix)?;
                self.load_matrix(pointer, params, mtx_replacements)?;
            }
            RspCommand::PopMatrix { count } => self.rsp.pop_matrix(count),
            RspCommand::Viewport(addr) => {
                let vp = Viewport::read(&self.arena, self.segments.resolve(addr)?)?;
                self.set_viewport(vp);
            }
            RspCommand::Light { index, light } => {
                let light = Light::read(&self.arena, self.segments.resolve(light)?)?;
                self.rsp.set_light(index as usize, light);
            }
            RspCommand::LookAt { axis, light } => {
                let light = Light::read(&self.arena, self.segments.resolve(light)?)?;
                let axis = match axis {
                    LookAtAxis::X => 0,
                    LookAtAxis::Y => 1,
                };
                self.rsp.set_lookat(axis, light);
            }
            RspCommand::Vertex { v, n, dest } => {
                let pointer = self.segments.resolve(v)?;
                self.load_vertices(pointer, n, dest)?;
            }
            RspCommand::ModifyVertex {
                index,
                field,
                value,
            } => self.rsp.modify_vertex(index as usize, field, value),
            RspCommand::Triangle1 { v } => self.draw_dl_triangle(v)?,
            RspCommand::Triangle2 { v } => {
                self.draw_dl_triangle(v[0])?;
                self.draw_dl_triangle(v[1])?;
            }
            RspCommand::CullDisplayList { first, last } => {
                if self.rsp.all_rejected(first as usize, last as usize) {
                    tracing::trace!("culled display list");
                    self.exec.ret();
                }
            }
            RspCommand::BranchZ { vertex, zval } => {
                if self.branch_z(vertex, zval) {
                    let target = self.segments.resolve(self.rdp_half1)?;
                    self.call_display_list(target, format!("{:#010X}", self.rdp_half1), true);
                }
            }
            RspCommand::DisplayList { dl, branch } => {
                let target = self.segments.resolve(dl)?;
                self.call_display_list(target, format!("{:#010X}", dl), branch);
            }
            RspCommand::EndDisplayList => self.exec.ret(),
            RspCommand::Texture { sc, tc, tile, .. } => {
                self.rsp.texture_scale = TextureScale { s: sc, t: tc };
                if self.rdp.first_tile_index != tile as usize {
                    self.rdp.mark_textures_changed();
                }
                self.rdp.first_tile_index = tile as usize;
            }
            RspCommand::GeometryMode { clear, set } => {
                self.rsp.geometry_mode = (self.rsp.geometry_mode & !clear) | set;
            }
            RspCommand::SetOtherModeH(update) => {
                let OtherMode { h, l } = self.rdp.other_mode;
                self.rdp.set_other_mode(update.apply(h), l);
            }
            RspCommand::SetOtherModeL(update) => {
                let OtherMode { h, l } = self.rdp.other_mode;
                self.rdp.set_other_mode(h, update.apply(l));
            }
            RspCommand::NumLights(n) => self.rsp.set_num_lights(n),
            RspCommand::Segment { segment, base } => {
                let base = if base == 0 {
                    None
                } else {
                    Some(self.segments.resolve(base)?)
                };
                self.segments.set(segment, base);
            }
            RspCommand::FogFactor { mul, offset } => {
                self.rsp.fog_mul = mul;
                self.rsp.fog_offset = offset;
            }
            RspCommand::LightColor { index, color } => {
                self.rsp.set_light_color(index as usize, color)
            }
            RspCommand::PerspNormalize(_) | RspCommand::RdpHalf2(_) => {}
            RspCommand::RdpHalf1(w) => self.rdp_half1 = w,
            RspCommand::LoadUcode(ucode) => match Ucode::try_from(ucode) {
                Ok(ucode) => {
                    tracing::debug!("switching to {:?}", ucode);
                    self.ucode = ucode;
                }
                Err(_) => tracing::warn!("unknown microcode {}", ucode),
            },
        }
        Ok(())
    }

    fn set_viewport(&mut self, vp: Viewport) {
        self.rdp.viewport = self
            .framebuffers
            .adjust_viewport_or_scissor(vp.native_rect());
        self.rdp.viewport_or_scissor_changed = true;
    }

    fn draw_dl_triangle(&mut self, v: [u32; 3]) -> GfxResult<()> {
        if v.iter().any(|&i| i as usize >= MAX_VERTICES) {
            tracing::warn!("triangle {:?} references a vertex out of range", v);
            return Ok(());
        }
        self.draw_triangle(v.map(|i| i as usize), false)
    }

    fn execute_rdp(&mut self, cmd: RdpCommand) -> GfxResult<()> {
        match cmd {
            RdpCommand::SetColorImage(image) => {
                self.rdp.color_image = self.segments.resolve(image.img).ok()
            }
            RdpCommand::SetDepthImage(addr) => {
                self.rdp.depth_image = self.segments.resolve(addr).ok()
            }
            RdpCommand::SetTextureImage(image) => {
                let addr = self.segments.resolve(image.img)?;
                self.rdp.set_texture_image(TextureImage {
                    fmt: image.fmt,
                    size: image.size,
                    width: image.width,
                    addr,
                    metadata: RawTexMetadata::default(),
                });
            }
            RdpCommand::SetCombine(mode) => self.rdp.combine_mode = mode,
            RdpCommand::SetEnvColor(color) => self.rdp.env_color = color,
            RdpCommand::SetPrimColor {
                color,
                lod_fraction,
                ..
            } => {
                self.rdp.prim_color = color;
                self.rdp.prim_lod_fraction = lod_fraction;
            }
            RdpCommand::SetBlendColor(color) => self.rdp.blend_color = color,
            RdpCommand::SetFogColor(color) => self.rdp.fog_color = color,
            RdpCommand::SetFillColor(packed) => self.rdp.set_fill_color(packed),
            RdpCommand::FillRectangle(rect) => self.fill_rectangle(rect)?,
            RdpCommand::SetTile(tile, params) => self.rdp.set_tile(tile, params),
            RdpCommand::LoadTile(tile, size) => self.rdp.load_tile(tile, size),
            RdpCommand::LoadBlock(tile, block) => self.rdp.load_block(tile, block),
            RdpCommand::SetTileSize(tile, size) => self.rdp.set_tile_size(tile, size),
            RdpCommand::LoadTlut { tile, high_index } => self.rdp.load_tlut(tile, high_index),
            RdpCommand::SetOtherMode { h, l } => self.rdp.set_other_mode(h, l),
            RdpCommand::SetPrimDepth(depth) => tracing::trace!("ignoring {:?}", depth),
            RdpCommand::SetScissor(_, rect) => {
                self.rdp.scissor = self
                    .framebuffers
                    .adjust_viewport_or_scissor(scissor_native_rect(rect));
                self.rdp.viewport_or_scissor_changed = true;
            }
            RdpCommand::TextureRectangle { rect, flip } => self.texture_rectangle(rect, flip)?,
            RdpCommand::Unimplemented(cmd) => tracing::trace!("ignoring {:?}", cmd),
            RdpCommand::Sync => {}
        }
        Ok(())
    }

    /// Loads an extension resource into the arena. Unresolved resources are logged and skipped.
    fn load_resource(
        &mut self,
        source: ResourceSource,
        kind: ResourceKind,
    ) -> GfxResult<Option<LoadedResource>> {
        let resource = match source {
            ResourceSource::Hash(hash) => ResourceRef::Hash(hash),
            ResourceSource::Path(addr) => {
                ResourceRef::Path(self.arena.read_path(self.segments.resolve(addr)?)?)
            }
        };
        match self.resource_cache.get_or_load(
            &mut self.arena,
            self.resources.as_mut(),
            &resource,
            kind,
        ) {
            Ok(loaded) => Ok(Some(loaded)),
            Err(GfxError::MissingResource(resource)) => {
                tracing::warn!("unresolved {:?} resource {}", kind, resource);
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    fn execute_otr(
        &mut self,
        cmd: OtrCommand,
        mtx_replacements: &MatrixReplacements,
    ) -> GfxResult<()> {
        match cmd {
            OtrCommand::SetTextureImage {
                fmt,
                size,
                width,
                source,
            } => {
                if let Some(loaded) = self.load_resource(source, ResourceKind::Texture)? {
                    self.rdp.set_texture_image(TextureImage {
                        fmt,
                        size,
                        width,
                        addr: loaded.pointer(),
                        metadata: loaded.metadata,
                    });
                }
            }
            OtrCommand::SetFramebuffer(fb) => {
                self.flush();
                self.framebuffers.set_active(Some(FramebufferId(fb)));
                if let Some(fb) = self.framebuffers.active() {
                    self.rapi
                        .start_draw_to_framebuffer(fb, self.framebuffers.noise_scale());
                    self.rapi.clear_framebuffer(false, true);
                }
                self.retarget();
            }
            OtrCommand::ResetFramebuffer => {
                self.flush();
                self.framebuffers.set_active(None);
                let noise_scale = self.framebuffers.noise_scale();
                self.rapi.start_draw_to_framebuffer(FramebufferId::WINDOW, noise_scale);
                self.retarget();
            }
            OtrCommand::SetTextureImageFramebuffer(fb) => {
                self.flush();
                self.rapi.select_texture_fb(FramebufferId(fb));
                self.rdp.textures_changed = [false; 2];
                self.rendering_state.textures[0] = None;
            }
            OtrCommand::Vertex {
                source,
                offset,
                n,
                dest,
            } => {
                if let Some(loaded) = self.load_resource(source, ResourceKind::Vertices)? {
                    self.load_vertices(loaded.pointer().add(offset), n, dest)?;
                }
            }
            OtrCommand::DisplayList { source, branch } => {
                if let Some(loaded) = self.load_resource(source, ResourceKind::DisplayList)? {
                    self.call_display_list(loaded.pointer(), format!("{:?}", source), branch);
                }
            }
            OtrCommand::Marker(hash) => tracing::trace!("marker {:#018X}", hash),
            OtrCommand::InvalidateTextureCache(0) => self.clear_texture_cache(),
            OtrCommand::InvalidateTextureCache(addr) => match self.segments.resolve(addr) {
                Ok(addr) => self.invalidate_texture(addr),
                Err(error) => tracing::warn!("texture invalidation: {}", error),
            },
            OtrCommand::BranchZ {
                source,
                vertex,
                zval,
            } => {
                if self.branch_z(vertex, zval) {
                    if let Some(loaded) = self.load_resource(source, ResourceKind::DisplayList)? {
                        self.call_display_list(loaded.pointer(), format!("{:?}", source), true);
                    }
                }
            }
            OtrCommand::Matrix { source, params } => {
                if let Some(loaded) = self.load_resource(source, ResourceKind::Matrix)? {
                    self.load_matrix(loaded.pointer(), params, mtx_replacements)?;
                }
            }
            OtrCommand::TextureRectangleWide(rect) => self.texture_rectangle(rect, false)?,
            OtrCommand::FillWideRectangle(rect) => self.fill_rectangle(rect)?,
            OtrCommand::SetGrayscale(enabled) => self.rdp.grayscale = enabled,
            OtrCommand::ExtraGeometryMode { clear, set } => {
                self.extra_geometry_mode = (self.extra_geometry_mode & !clear) | set;
            }
            OtrCommand::CopyFramebuffer { dst, src } => {
                self.flush();
                self.rapi
                    .copy_framebuffer(FramebufferId(dst), FramebufferId(src));
            }
            OtrCommand::SetIntensity(color) => self.rdp.grayscale_color = color,
        }
        Ok(())
    }

    /// Forces the viewport and scissor to be reapplied after the render target changes.
    fn retarget(&mut self) {
        self.rendering_state.viewport = None;
        self.rendering_state.scissor = None;
        self.rdp.viewport_or_scissor_changed = true;
    }
}
