//! Triangle emission.
//!
//! Every triangle passes through [Interpreter::draw_triangle], which brings the backend up to
//! date with the RSP and RDP state before appending the triangle's vertices to the batch. Any
//! state change that affects the pending triangles flushes them first, so a draw call always
//! covers triangles that share one rendering state.
//!
//! Rectangles are drawn as two triangles over four reserved vertex slots past the ones display
//! lists can load.

use crate::{
    backend::{RenderingApi, ShaderId, WindowManagerApi},
    cmd::*,
    combiner::{ColorCombiner, ColorCombinerKey, ShaderOptions},
    config::FilterMode,
    error::GfxResult,
    interpret::Interpreter,
    memory::Pointer,
    rdp::{LoadedTexture, ScreenRect, Tile, NUM_TILES, TEXTURE_FILTER_SHIFT},
    resource::TextureType,
    rsp::{LoadedVertex, MAX_VERTICES, RECT_VERTICES},
    texture::{
        decode_texture, is_supported_format, raw_texture, Palettes, TextureData, TextureLayout,
    },
    texture_cache::{SamplerParams, TextureCacheKey},
};

/// The backend state as last set by the interpreter. `None` forces the next draw to set it.
#[derive(Debug, Clone, Default)]
pub(crate) struct RenderingState {
    pub depth_test_and_mask: Option<(bool, bool)>,
    pub decal_mode: Option<bool>,
    pub alpha_blend: Option<bool>,
    pub viewport: Option<ScreenRect>,
    pub scissor: Option<ScreenRect>,
    pub shader: Option<ShaderId>,
    /// The texture bound to each texture unit, if it came from the cache.
    pub textures: [Option<TextureCacheKey>; 2],
}

const RECT_UL: usize = MAX_VERTICES;
const RECT_LL: usize = MAX_VERTICES + 1;
const RECT_LR: usize = MAX_VERTICES + 2;
const RECT_UR: usize = MAX_VERTICES + 3;

/// The size in texels a texture is sampled at, derived from its tile and load.
fn texel_dims(tile: &Tile, loaded: &LoadedTexture) -> (u32, u32) {
    let line = tile.line_size_bytes.max(1);
    let mut height = loaded.size_bytes / line;
    let width = match tile.params.size {
        ComponentSize::Bits4 => line * 2,
        ComponentSize::Bits8 => line,
        ComponentSize::Bits16 => line / 2,
        ComponentSize::Bits32 => {
            height /= 2;
            line / 2
        }
    };
    (width.max(1), height.max(1))
}

fn row_bytes(size: ComponentSize, width: u32) -> u32 {
    (width * size.num_bits() + 7) / 8
}

fn splat(value: u8) -> Rgba32 {
    Rgba32::new(value, value, value, value)
}

fn round_px(v: f32) -> i32 {
    v.round() as i32
}

/// The texture coordinate `length` pixels past `start`, stepping `delta` (s5.10) per pixel.
/// Coordinates are s10.5.
fn texrect_end(start: i16, delta: i16, length: i32) -> i32 {
    let end = ((i64::from(start) << 7) + i64::from(delta) * i64::from(length)) >> 7;
    end.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl<R: RenderingApi, W: WindowManagerApi> Interpreter<R, W> {
    /// Draws the pending triangles.
    pub(crate) fn flush(&mut self) {
        self.batch.flush(&mut self.rapi);
    }

    fn is_culled(&self, v: &[LoadedVertex; 3]) -> bool {
        let cull = self.rsp.geometry_mode & GeometryModes::CULL_BOTH;
        if cull.is_empty() {
            return false;
        }
        let dx1 = v[0].x / v[0].w - v[1].x / v[1].w;
        let dy1 = v[0].y / v[0].w - v[1].y / v[1].w;
        let dx2 = v[2].x / v[2].w - v[1].x / v[1].w;
        let dy2 = v[2].y / v[2].w - v[1].y / v[1].w;
        let mut cross = dx1 * dy2 - dy1 * dx2;

        // A vertex behind the camera flips the winding of the projected triangle.
        if (v[0].w < 0.0) ^ (v[1].w < 0.0) ^ (v[2].w < 0.0) {
            cross = -cross;
        }
        if self
            .extra_geometry_mode
            .contains(ExtraGeometryModes::INVERT_CULLING)
        {
            cross = -cross;
        }

        if cull == GeometryModes::CULL_FRONT {
            cross <= 0.0
        } else if cull == GeometryModes::CULL_BACK {
            cross >= 0.0
        } else {
            true
        }
    }

    fn apply_depth_and_viewport(&mut self) {
        let depth_test = self.rsp.geometry_mode.contains(GeometryModes::ZBUFFER);
        let depth_mask = self.rdp.other_mode.z_update();
        if self.rendering_state.depth_test_and_mask != Some((depth_test, depth_mask)) {
            self.flush();
            self.rapi.set_depth_test_and_mask(depth_test, depth_mask);
            self.rendering_state.depth_test_and_mask = Some((depth_test, depth_mask));
        }

        let decal = self.rdp.other_mode.z_decal();
        if self.rendering_state.decal_mode != Some(decal) {
            self.flush();
            self.rapi.set_zmode_decal(decal);
            self.rendering_state.decal_mode = Some(decal);
        }

        if self.rdp.viewport_or_scissor_changed {
            let viewport = self.rdp.viewport;
            if self.rendering_state.viewport != Some(viewport) {
                self.flush();
                self.rapi.set_viewport(
                    round_px(viewport.x),
                    round_px(viewport.y),
                    round_px(viewport.width),
                    round_px(viewport.height),
                );
                self.rendering_state.viewport = Some(viewport);
            }
            let scissor = self.rdp.scissor;
            if self.rendering_state.scissor != Some(scissor) {
                self.flush();
                self.rapi.set_scissor(
                    round_px(scissor.x),
                    round_px(scissor.y),
                    round_px(scissor.width),
                    round_px(scissor.height),
                );
                self.rendering_state.scissor = Some(scissor);
            }
            self.rdp.viewport_or_scissor_changed = false;
        }
    }

    fn shader_options(&self) -> ShaderOptions {
        let om = self.rdp.other_mode;
        let mut options = ShaderOptions::empty();
        options.set(ShaderOptions::ALPHA, om.use_alpha() || om.texture_edge());
        options.set(ShaderOptions::FOG, om.use_fog());
        options.set(ShaderOptions::TEXTURE_EDGE, om.texture_edge());
        options.set(ShaderOptions::NOISE, om.alpha_compare() == AlphaCompare::Dither);
        options.set(ShaderOptions::TWO_CYCLE, om.cycle_type() == CycleType::TwoCycle);
        options.set(
            ShaderOptions::ALPHA_THRESHOLD,
            om.alpha_compare() == AlphaCompare::Threshold,
        );
        options.set(ShaderOptions::INVISIBLE, om.invisible());
        options.set(ShaderOptions::GRAYSCALE, self.rdp.grayscale);
        options
    }

    /// Returns the combiner for the current combine mode and othermode.
    fn current_combiner(&mut self) -> ColorCombiner {
        let key = ColorCombinerKey::new(self.rdp.combine_mode.to_packed(), self.shader_options());
        let Self {
            combiners,
            batch,
            rapi,
            ..
        } = self;
        combiners
            .lookup_or_create(key, || batch.flush(rapi))
            .clone()
    }

    /// Uploads or looks up the texture for texture unit `slot` and binds it.
    fn import_texture(&mut self, slot: usize, tile_index: usize) -> GfxResult<()> {
        let tile = self.rdp.tiles[tile_index];
        let loaded = self.rdp.loaded_textures[tile.tmem_index];
        let addr = match loaded.addr {
            Some(addr) => addr,
            None => {
                tracing::warn!("tile {} is sampled before any texture load", tile_index);
                return Ok(());
            }
        };
        let TileParams {
            fmt,
            size,
            palette,
            ..
        } = tile.params;
        let key = TextureCacheKey {
            addr,
            palettes: if fmt == ImageFormat::Ci {
                self.rdp.palettes
            } else {
                [None; 2]
            },
            fmt,
            size,
            palette_index: if fmt == ImageFormat::Ci { palette } else { 0 },
            orig_size_bytes: loaded.orig_size_bytes,
        };
        self.rendering_state.textures[slot] = Some(key);

        if let Some(entry) = self.textures.lookup(&key) {
            let texture_id = entry.texture_id;
            self.rapi.select_texture(slot, texture_id);
            return Ok(());
        }

        let rapi = &mut self.rapi;
        let texture_id = self
            .textures
            .insert(key, Some(SamplerParams::default()), || rapi.new_texture())
            .texture_id;
        self.rapi.select_texture(slot, texture_id);
        self.rapi.set_sampler_parameters(slot, false, 0, 0);

        let data = if loaded.metadata.kind == TextureType::Raw {
            raw_texture(
                self.arena.tail(addr)?,
                loaded.metadata.width,
                loaded.metadata.height,
            )
        } else {
            self.decode_loaded_texture(&tile, &loaded, addr)?
        };
        tracing::trace!(
            "uploading {}x{} {:?} {:?} texture from {}",
            data.width,
            data.height,
            fmt,
            size,
            addr
        );
        self.rapi
            .upload_texture(&data.rgba8, data.width, data.height);
        Ok(())
    }

    fn decode_loaded_texture(
        &self,
        tile: &Tile,
        loaded: &LoadedTexture,
        addr: Pointer,
    ) -> GfxResult<TextureData> {
        let TileParams {
            fmt,
            size,
            palette,
            ..
        } = tile.params;
        if !is_supported_format(fmt, size) {
            panic!("unsupported texture format {:?} {:?} at {}", fmt, size, addr);
        }

        let (width, height) = texel_dims(tile, loaded);
        let row_stride_bytes = if loaded.full_image_line_size_bytes == loaded.size_bytes {
            row_bytes(size, width)
        } else {
            loaded.full_image_line_size_bytes
        };
        let palettes = Palettes {
            banks: [
                self.palette_bank(self.rdp.palettes[0]),
                self.palette_bank(self.rdp.palettes[1]),
            ],
            tlut: self.rdp.other_mode.texture_lut(),
        };
        Ok(decode_texture(
            fmt,
            size,
            self.arena.tail(addr)?,
            TextureLayout {
                width,
                height,
                row_stride_bytes,
            },
            palettes,
            palette,
        ))
    }

    /// The 256 bytes of a palette bank, or nothing if the bank was never loaded.
    fn palette_bank(&self, addr: Option<Pointer>) -> &[u8] {
        match addr.map(|addr| self.arena.tail(addr)) {
            Some(Ok(data)) => &data[..data.len().min(256)],
            _ => &[],
        }
    }

    fn apply_shader(&mut self, combiner: &ColorCombiner, clamp_variant: usize) -> ShaderId {
        let key = combiner.key;
        let prg = match combiner.programs[clamp_variant] {
            Some(prg) => prg,
            None => {
                let (id0, id1) = combiner.shader_id(clamp_variant);
                let prg = match self.rapi.lookup_shader(id0, id1) {
                    Some(prg) => prg,
                    None => {
                        self.flush();
                        if let Some(old) = self.rendering_state.shader {
                            self.rapi.unload_shader(old);
                        }
                        let prg = self.rapi.create_and_load_new_shader(id0, id1);
                        tracing::debug!("compiled shader {:#018X} {:#06X}", id0, id1);
                        self.rendering_state.shader = Some(prg);
                        prg
                    }
                };
                if let Some(combiner) = self.combiners.get_mut(&key) {
                    combiner.programs[clamp_variant] = Some(prg);
                }
                prg
            }
        };
        if self.rendering_state.shader != Some(prg) {
            self.flush();
            if let Some(old) = self.rendering_state.shader {
                self.rapi.unload_shader(old);
            }
            self.rapi.load_shader(prg);
            self.rendering_state.shader = Some(prg);
        }
        prg
    }

    fn input_color(
        &self,
        source: Option<ColorCombineComponent>,
        vertex: &LoadedVertex,
        first: &LoadedVertex,
    ) -> Rgba32 {
        let rdp = &self.rdp;
        match source {
            Some(ColorCombineComponent::Prim) => rdp.prim_color,
            Some(ColorCombineComponent::Shade) => vertex.color,
            Some(ColorCombineComponent::Env) => rdp.env_color,
            Some(ColorCombineComponent::PrimAlpha) => splat(rdp.prim_color.a),
            Some(ColorCombineComponent::ShadeAlpha) => splat(vertex.color.a),
            Some(ColorCombineComponent::EnvAlpha) => splat(rdp.env_color.a),
            Some(ColorCombineComponent::PrimLodFraction) => splat(rdp.prim_lod_fraction),
            Some(ColorCombineComponent::LodFraction) => {
                if rdp.other_mode.texture_lod() {
                    let fraction = ((first.w - 3000.0) / 3000.0).clamp(0.0, 1.0);
                    splat((fraction * 255.0) as u8)
                } else {
                    splat(0)
                }
            }
            _ => Rgba32::default(),
        }
    }

    /// Draws the triangle over the vertex slots `indices`.
    ///
    /// `is_rect` is set for the halves of rectangles, which sample texel centers differently.
    pub(crate) fn draw_triangle(&mut self, indices: [usize; 3], is_rect: bool) -> GfxResult<()> {
        let verts = indices.map(|i| self.rsp.vertices[i]);
        if verts[0].clip_rej & verts[1].clip_rej & verts[2].clip_rej != 0 {
            return Ok(());
        }
        if self.is_culled(&verts) {
            return Ok(());
        }

        self.apply_depth_and_viewport();

        let om = self.rdp.other_mode;
        let use_alpha = om.use_alpha() || om.texture_edge();
        let use_fog = om.use_fog();
        let linear_filter = self.config.texture_filter == FilterMode::Linear
            && om.texture_filter() != TextureFilter::Point;
        let combiner = self.current_combiner();

        let mut clamp_variant = 0;
        let mut dims = [(1, 1); 2];
        let mut clamp_limits = [(0.0, 0.0); 2];
        for i in 0..2 {
            if !combiner.used_textures[i] {
                continue;
            }
            let tile_index = (self.rdp.first_tile_index + i) % NUM_TILES;
            if self.rdp.textures_changed[i] {
                self.flush();
                self.import_texture(i, tile_index)?;
                self.rdp.textures_changed[i] = false;
            }

            let tile = self.rdp.tiles[tile_index];
            let loaded = self.rdp.loaded_textures[tile.tmem_index];
            let (width, height) = texel_dims(&tile, &loaded);
            dims[i] = (width, height);

            let tile_width = (tile.size.lrs.saturating_sub(tile.size.uls) + 4) / 4;
            let tile_height = (tile.size.lrt.saturating_sub(tile.size.ult) + 4) / 4;
            let mut cms = u8::from(tile.params.cms) as u32;
            let mut cmt = u8::from(tile.params.cmt) as u32;
            let mirror = |cm: u32| cm & 1;
            if cms & 2 != 0 && (mirror(cms) != 0 || width << mirror(cms) != tile_width) {
                clamp_variant |= 1 << (2 * i);
                cms &= !2;
            }
            if cmt & 2 != 0 && (mirror(cmt) != 0 || height << mirror(cmt) != tile_height) {
                clamp_variant |= 1 << (2 * i + 1);
                cmt &= !2;
            }
            clamp_limits[i] = (
                (tile_width as f32 - 0.5) / width as f32,
                (tile_height as f32 - 0.5) / height as f32,
            );

            let sampler = SamplerParams {
                linear_filter,
                cms,
                cmt,
            };
            let current = match self.rendering_state.textures[i] {
                Some(key) => self.textures.entry_mut(&key).and_then(|e| e.sampler),
                None => None,
            };
            if current != Some(sampler) {
                self.flush();
                self.rapi
                    .set_sampler_parameters(i, sampler.linear_filter, sampler.cms, sampler.cmt);
                if let Some(entry) = self.rendering_state.textures[i]
                    .and_then(|key| self.textures.entry_mut(&key))
                {
                    entry.sampler = Some(sampler);
                }
            }
        }

        let prg = self.apply_shader(&combiner, clamp_variant);
        if self.rendering_state.alpha_blend != Some(use_alpha) {
            self.flush();
            self.rapi.set_use_alpha(use_alpha);
            self.rendering_state.alpha_blend = Some(use_alpha);
        }

        let info = self.rapi.shader_get_info(prg);
        let z_is_from_0_to_1 = self.rapi.z_is_from_0_to_1();
        let first_tile = self.rdp.first_tile_index;
        for v in &verts {
            let z = if z_is_from_0_to_1 {
                (v.z + v.w) / 2.0
            } else {
                v.z
            };
            self.batch.extend(&[v.x, v.y, z, v.w]);

            for t in 0..2 {
                if !info.used_textures[t] {
                    continue;
                }
                let tile = self.rdp.tiles[(first_tile + t) % NUM_TILES];
                let mut u = v.u as f32 / 32.0;
                let mut tv = v.v as f32 / 32.0;
                let shift = |coord: f32, shift: u32| match shift {
                    0 => coord,
                    1..=10 => coord / (1 << shift) as f32,
                    _ => coord * (1 << (16 - shift.min(16))) as f32,
                };
                u = shift(u, tile.params.shifts);
                tv = shift(tv, tile.params.shiftt);
                u -= tile.size.uls as f32 / 4.0;
                tv -= tile.size.ult as f32 / 4.0;
                if linear_filter && !is_rect {
                    u += 0.5;
                    tv += 0.5;
                }
                let (width, height) = dims[t];
                self.batch.push(u / width as f32);
                self.batch.push(tv / height as f32);
                if clamp_variant & (1 << (2 * t)) != 0 {
                    self.batch.push(clamp_limits[t].0);
                }
                if clamp_variant & (1 << (2 * t + 1)) != 0 {
                    self.batch.push(clamp_limits[t].1);
                }
            }

            if use_fog {
                let fog = self.rdp.fog_color;
                self.batch.extend(&[
                    fog.r as f32 / 255.0,
                    fog.g as f32 / 255.0,
                    fog.b as f32 / 255.0,
                    v.color.a as f32 / 255.0,
                ]);
            }

            if self.rdp.grayscale {
                let gray = self.rdp.grayscale_color;
                self.batch.extend(&[
                    gray.r as f32 / 255.0,
                    gray.g as f32 / 255.0,
                    gray.b as f32 / 255.0,
                    gray.a as f32 / 255.0,
                ]);
            }

            for j in 0..info.num_inputs as usize {
                for k in 0..1 + usize::from(use_alpha) {
                    let source = combiner.shader_input_mapping[k][j];
                    let color = self.input_color(source, v, &verts[0]);
                    if k == 0 {
                        self.batch.extend(&[
                            color.r as f32 / 255.0,
                            color.g as f32 / 255.0,
                            color.b as f32 / 255.0,
                        ]);
                    } else if use_fog && source == Some(ColorCombineComponent::Shade) {
                        // Shade alpha carries the fog factor.
                        self.batch.push(1.0);
                    } else {
                        self.batch.push(color.a as f32 / 255.0);
                    }
                }
            }
        }

        if self.batch.end_triangle() {
            self.flush();
        }
        Ok(())
    }

    /// Draws a screen aligned rectangle over the reserved vertex slots, whose texture
    /// coordinates and colors the caller has already set. Coordinates are 10.2 native pixels.
    fn draw_rectangle(&mut self, rect: Rectangle<i32>, full_window: bool) -> GfxResult<()> {
        let saved_h = self.rdp.other_mode.h;
        if self.rdp.other_mode.cycle_type() == CycleType::Copy {
            // Point sampling.
            self.rdp.other_mode.h &= !(0x3 << TEXTURE_FILTER_SHIFT);
        }

        let half_width = self.config.half_width();
        let half_height = self.config.half_height();
        let aspect_scale = self.framebuffers.aspect_scale();
        let ndc_x = |x: i32| (x as f32 / (4.0 * half_width) - 1.0) * aspect_scale;
        let ndc_y = |y: i32| -(y as f32 / (4.0 * half_height)) + 1.0;
        let (ulx, lrx) = if full_window {
            (-1.0, 1.0)
        } else {
            (ndc_x(rect.ulx), ndc_x(rect.lrx))
        };
        let uly = ndc_y(rect.uly);
        let lry = ndc_y(rect.lry);

        for (slot, (x, y)) in [
            (RECT_UL, (ulx, uly)),
            (RECT_LL, (ulx, lry)),
            (RECT_LR, (lrx, lry)),
            (RECT_UR, (lrx, uly)),
        ] {
            let vertex = &mut self.rsp.vertices[slot];
            vertex.x = x;
            vertex.y = y;
            vertex.z = -1.0;
            vertex.w = 1.0;
            vertex.clip_rej = 0;
        }

        let (native_width, native_height) = self.framebuffers.native_dimensions();
        let saved_viewport = self.rdp.viewport;
        let saved_geometry_mode = self.rsp.geometry_mode;
        self.rdp.viewport = self.framebuffers.adjust_viewport_or_scissor(ScreenRect {
            x: 0.0,
            y: native_height as f32,
            width: native_width as f32,
            height: native_height as f32,
        });
        self.rdp.viewport_or_scissor_changed = true;
        self.rsp.geometry_mode = GeometryModes::empty();

        let result = self
            .draw_triangle([RECT_UL, RECT_LL, RECT_UR], true)
            .and_then(|_| self.draw_triangle([RECT_LL, RECT_LR, RECT_UR], true));

        self.rsp.geometry_mode = saved_geometry_mode;
        self.rdp.viewport = saved_viewport;
        self.rdp.viewport_or_scissor_changed = true;
        self.rdp.other_mode.h = saved_h;
        result
    }

    /// Fills a rectangle with the fill color, or the combiner output outside fill mode.
    pub(crate) fn fill_rectangle(&mut self, mut rect: Rectangle<i32>) -> GfxResult<()> {
        if self.rdp.color_image.is_some() && self.rdp.color_image == self.rdp.depth_image {
            // Depth buffer clears are handled by the backend.
            return Ok(());
        }

        let (native_width, native_height) = self.framebuffers.native_dimensions();
        let full_window = rect.ulx == 0
            && rect.uly == 0
            && rect.lrx == ((native_width as i32 - 1) << 2)
            && rect.lry == ((native_height as i32 - 1) << 2);

        let cycle_type = self.rdp.other_mode.cycle_type();
        if matches!(cycle_type, CycleType::Copy | CycleType::Fill) {
            rect.lrx += 1 << 2;
            rect.lry += 1 << 2;
        }

        let fill_color = self.rdp.fill_color;
        for vertex in &mut self.rsp.vertices[MAX_VERTICES..MAX_VERTICES + RECT_VERTICES] {
            vertex.color = fill_color;
        }

        let saved_combine_mode = self.rdp.combine_mode;
        if cycle_type == CycleType::Fill {
            let shade = [0, 0, 0, u8::from(ColorCombineComponent::Shade)];
            self.rdp.combine_mode = CombineMode::one_cycle(
                ColorCombineMode::from(shade),
                ColorCombineMode::from(shade),
            );
        }
        let result = self.draw_rectangle(rect, full_window);
        self.rdp.combine_mode = saved_combine_mode;
        result
    }

    /// Draws a textured rectangle. `flip` swaps the s and t axes.
    pub(crate) fn texture_rectangle(
        &mut self,
        tex_rect: TextureRectangle,
        flip: bool,
    ) -> GfxResult<()> {
        let TextureRectangle {
            mut rect,
            tile,
            s,
            t,
            mut dsdx,
            dtdy,
        } = tex_rect;

        let saved_combine_mode = self.rdp.combine_mode;
        if self.rdp.other_mode.cycle_type() == CycleType::Copy {
            // Copy mode steps four texels per pixel.
            dsdx >>= 2;
            let texel0 = [0, 0, 0, u8::from(ColorCombineComponent::Texel0)];
            self.rdp.combine_mode = CombineMode::one_cycle(
                ColorCombineMode::from(texel0),
                ColorCombineMode::from(texel0),
            );
            rect.lrx += 1 << 2;
            rect.lry += 1 << 2;
        }

        let (width, height) = if flip {
            (rect.lry - rect.uly, rect.lrx - rect.ulx)
        } else {
            (rect.lrx - rect.ulx, rect.lry - rect.uly)
        };
        let uls = s as i32;
        let ult = t as i32;
        let lrs = texrect_end(s, dsdx, width);
        let lrt = texrect_end(t, dtdy, height);

        let (ll, ur) = if flip {
            ((lrs, ult), (uls, lrt))
        } else {
            ((uls, lrt), (lrs, ult))
        };
        for (slot, (u, v)) in [
            (RECT_UL, (uls, ult)),
            (RECT_LL, ll),
            (RECT_LR, (lrs, lrt)),
            (RECT_UR, ur),
        ] {
            let vertex = &mut self.rsp.vertices[slot];
            vertex.u = u;
            vertex.v = v;
        }

        let saved_tile = self.rdp.first_tile_index;
        let tile = tile.0 as usize;
        if tile != saved_tile {
            self.rdp.mark_textures_changed();
        }
        self.rdp.first_tile_index = tile;

        let result = self.draw_rectangle(rect, false);

        if tile != saved_tile {
            self.rdp.mark_textures_changed();
        }
        self.rdp.first_tile_index = saved_tile;
        self.rdp.combine_mode = saved_combine_mode;
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_texrect_end() {
        // One texel per pixel across a 32 pixel (quarter pixel units) rectangle.
        assert_eq!(texrect_end(0, 1 << 10, 32 << 2), 32 << 5);
        assert_eq!(texrect_end(64, -(1 << 10), 8 << 2), 64 - (8 << 5));
    }

    #[test]
    fn test_texrect_end_wide_extremes() {
        let width = (1 << 23) - 1;
        assert_eq!(texrect_end(i16::MAX, i16::MAX, width), 2_147_450_623);
        assert_eq!(texrect_end(i16::MIN, i16::MIN, width), i32::MIN);
    }
}
