//! The vertex pipeline: matrices, lights, vertex transform, fog and clip rejection.

#![allow(missing_docs)]

use crate::{
    cmd::{GeometryModes, Rgba32, VertexField},
    error::GfxResult,
    matrix::{dot, normalize, Matrixf, MatrixStack},
    memory::{Arena, Pointer},
};

/// The number of vertex slots addressable by display lists.
pub const MAX_VERTICES: usize = 64;
/// Slots after the regular vertices used for synthesized rectangles.
pub const RECT_VERTICES: usize = 4;
pub const MAX_LIGHTS: usize = 32;

#[cfg(not(feature = "gbi-floats"))]
pub const VERTEX_SIZE: u32 = 16;
#[cfg(feature = "gbi-floats")]
pub const VERTEX_SIZE: u32 = 24;

pub const LIGHT_SIZE: usize = 16;

pub const CLIP_X_NEG: u8 = 0x01;
pub const CLIP_X_POS: u8 = 0x02;
pub const CLIP_Y_NEG: u8 = 0x04;
pub const CLIP_Y_POS: u8 = 0x08;
pub const CLIP_Z_NEG: u8 = 0x10;
pub const CLIP_Z_POS: u8 = 0x20;

/// A vertex as stored in display list memory.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vtx {
    pub ob: [f32; 3],
    pub flag: u16,
    pub tc: [i16; 2],
    /// Either a color or a signed normal plus alpha.
    pub cn: [u8; 4],
}

impl Vtx {
    pub fn read(arena: &Arena, pointer: Pointer) -> GfxResult<Self> {
        let b = arena.bytes(pointer, VERTEX_SIZE as usize)?;
        let i16_at = |i: usize| i16::from_be_bytes([b[i], b[i + 1]]);
        if cfg!(feature = "gbi-floats") {
            let f32_at = |i: usize| f32::from_be_bytes([b[i], b[i + 1], b[i + 2], b[i + 3]]);
            Ok(Self {
                ob: [f32_at(0), f32_at(4), f32_at(8)],
                flag: i16_at(12) as u16,
                tc: [i16_at(14), i16_at(16)],
                cn: [b[18], b[19], b[20], b[21]],
            })
        } else {
            Ok(Self {
                ob: [i16_at(0) as f32, i16_at(2) as f32, i16_at(4) as f32],
                flag: i16_at(6) as u16,
                tc: [i16_at(8), i16_at(10)],
                cn: [b[12], b[13], b[14], b[15]],
            })
        }
    }

    fn normal(&self) -> [f32; 3] {
        [
            self.cn[0] as i8 as f32,
            self.cn[1] as i8 as f32,
            self.cn[2] as i8 as f32,
        ]
    }
}

/// A directional or positional light.
///
/// Both layouts share the color bytes; a positional light stores a non-zero `kc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Light {
    pub col: [u8; 3],
    pub colc: [u8; 3],
    pub dir: [i8; 3],
    pub kc: u8,
    pub kl: u8,
    pub kq: u8,
    pub pos: [i16; 3],
}

impl Light {
    pub fn from_bytes(b: &[u8]) -> Self {
        Self {
            col: [b[0], b[1], b[2]],
            kc: b[3],
            colc: [b[4], b[5], b[6]],
            kl: b[7],
            dir: [b[8] as i8, b[9] as i8, b[10] as i8],
            pos: [
                i16::from_be_bytes([b[8], b[9]]),
                i16::from_be_bytes([b[10], b[11]]),
                i16::from_be_bytes([b[12], b[13]]),
            ],
            kq: b[14],
        }
    }

    pub fn read(arena: &Arena, pointer: Pointer) -> GfxResult<Self> {
        Ok(Self::from_bytes(arena.bytes(pointer, LIGHT_SIZE)?))
    }

    fn dir_f32(&self) -> [f32; 3] {
        [
            self.dir[0] as f32 / 127.0,
            self.dir[1] as f32 / 127.0,
            self.dir[2] as f32 / 127.0,
        ]
    }
}

/// A transformed vertex ready for triangle emission.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoadedVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
    pub u: i32,
    pub v: i32,
    /// When fog is enabled the alpha channel holds the fog factor.
    pub color: Rgba32,
    pub clip_rej: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureScale {
    pub s: u16,
    pub t: u16,
}

/// The vertex pipeline registers.
#[derive(Debug, Clone)]
pub struct RspState {
    pub modelview: MatrixStack,
    pub projection: Matrixf,
    /// `modelview.top() * projection`
    pub mp: Matrixf,
    pub geometry_mode: GeometryModes,
    pub fog_mul: i16,
    pub fog_offset: i16,
    pub texture_scale: TextureScale,
    /// Directional lights followed by the ambient light.
    pub lights: [Light; MAX_LIGHTS + 1],
    /// Including the ambient light.
    pub num_lights: usize,
    pub lookat: [Light; 2],
    lights_changed: bool,
    light_coeffs: [[f32; 3]; MAX_LIGHTS],
    lookat_coeffs: [[f32; 3]; 2],
    pub vertices: [LoadedVertex; MAX_VERTICES + RECT_VERTICES],
}

impl Default for RspState {
    fn default() -> Self {
        Self {
            modelview: MatrixStack::default(),
            projection: Matrixf::identity(),
            mp: Matrixf::identity(),
            geometry_mode: GeometryModes::empty(),
            fog_mul: 0,
            fog_offset: 0,
            texture_scale: TextureScale::default(),
            lights: [Light::default(); MAX_LIGHTS + 1],
            num_lights: 1,
            lookat: [Light::default(); 2],
            lights_changed: true,
            light_coeffs: [[0.0; 3]; MAX_LIGHTS],
            lookat_coeffs: [[0.0; 3]; 2],
            vertices: [LoadedVertex::default(); MAX_VERTICES + RECT_VERTICES],
        }
    }
}

impl RspState {
    /// Resets the per-frame state.
    pub fn reset(&mut self) {
        self.modelview.reset();
        self.projection = Matrixf::identity();
        self.mp = Matrixf::identity();
        self.lights_changed = true;
    }

    fn update_mp(&mut self) {
        self.mp = self.modelview.top() * &self.projection;
    }

    pub fn matrix(&mut self, matrix: Matrixf, projection: bool, load: bool, push: bool) {
        if projection {
            if load {
                self.projection = matrix;
            } else {
                self.projection = &matrix * &self.projection;
            }
        } else {
            if push {
                self.modelview.push();
            }
            if load {
                self.modelview.load(matrix);
            } else {
                self.modelview.mul(&matrix);
            }
            self.lights_changed = true;
        }
        self.update_mp();
    }

    pub fn pop_matrix(&mut self, count: u32) {
        self.modelview.pop(count);
        self.lights_changed = true;
        self.update_mp();
    }

    pub fn set_num_lights(&mut self, num_directional: u32) {
        self.num_lights = (num_directional as usize).min(MAX_LIGHTS) + 1;
        self.lights_changed = true;
    }

    pub fn set_light(&mut self, index: usize, light: Light) {
        if let Some(slot) = self.lights.get_mut(index) {
            *slot = light;
            self.lights_changed = true;
        } else {
            tracing::warn!("light index {} out of range", index);
        }
    }

    pub fn set_light_color(&mut self, index: usize, color: Rgba32) {
        if let Some(slot) = self.lights.get_mut(index) {
            slot.col = color.rgb();
            slot.colc = color.rgb();
            self.lights_changed = true;
        } else {
            tracing::warn!("light index {} out of range", index);
        }
    }

    pub fn set_lookat(&mut self, axis: usize, light: Light) {
        self.lookat[axis] = light;
        self.lights_changed = true;
    }

    fn update_light_coeffs(&mut self) {
        let mv = *self.modelview.top();
        let directional = self.num_lights - 1;
        for (coeffs, light) in self.light_coeffs[..directional]
            .iter_mut()
            .zip(&self.lights)
        {
            *coeffs = normalize(mv.transposed_mul(light.dir_f32()));
        }
        for (coeffs, light) in self.lookat_coeffs.iter_mut().zip(&self.lookat) {
            *coeffs = normalize(mv.transposed_mul(light.dir_f32()));
        }
        self.lights_changed = false;
    }

    /// Transforms `n` vertices at `pointer` into slots starting at `dest`.
    ///
    /// `aspect_scale` adjusts x for a window whose aspect ratio differs from 4:3.
    pub fn load_vertices(
        &mut self,
        arena: &Arena,
        pointer: Pointer,
        n: usize,
        dest: usize,
        aspect_scale: f32,
    ) -> GfxResult<()> {
        let n = if dest + n > MAX_VERTICES {
            tracing::warn!("vertex load of {} at {} exceeds the vertex buffer", n, dest);
            MAX_VERTICES.saturating_sub(dest)
        } else {
            n
        };
        for i in 0..n {
            let vtx = Vtx::read(arena, pointer.add(i as u32 * VERTEX_SIZE))?;
            self.vertices[dest + i] = self.transform_vertex(&vtx, aspect_scale);
        }
        Ok(())
    }

    pub fn transform_vertex(&mut self, vtx: &Vtx, aspect_scale: f32) -> LoadedVertex {
        let [x, y, z, w] = self.mp.transform_point(vtx.ob);
        let x = x * aspect_scale;

        let mut u = (vtx.tc[0] as i32 * self.texture_scale.s as i32) >> 16;
        let mut v = (vtx.tc[1] as i32 * self.texture_scale.t as i32) >> 16;

        let rgb = if self.geometry_mode.contains(GeometryModes::LIGHTING) {
            if self.lights_changed {
                self.update_light_coeffs();
            }
            let rgb = self.light_vertex(vtx);

            if self.geometry_mode.contains(GeometryModes::TEXTURE_GEN) {
                let normal = vtx.normal();
                let dotx = (dot(normal, self.lookat_coeffs[0]) / 127.0).clamp(-1.0, 1.0);
                let doty = (dot(normal, self.lookat_coeffs[1]) / 127.0).clamp(-1.0, 1.0);
                let linear = self.geometry_mode.contains(GeometryModes::TEXTURE_GEN_LINEAR);
                let (dotx, doty) = if linear {
                    ((-dotx).acos() / 4.0, (-doty).acos() / 4.0)
                } else {
                    ((dotx + 1.0) / 4.0, (doty + 1.0) / 4.0)
                };
                u = (dotx * self.texture_scale.s as f32) as i32;
                v = (doty * self.texture_scale.t as f32) as i32;
            }
            rgb
        } else {
            [vtx.cn[0], vtx.cn[1], vtx.cn[2]]
        };

        let mut clip_rej = 0;
        if x < -w {
            clip_rej |= CLIP_X_NEG;
        }
        if x > w {
            clip_rej |= CLIP_X_POS;
        }
        if y < -w {
            clip_rej |= CLIP_Y_NEG;
        }
        if y > w {
            clip_rej |= CLIP_Y_POS;
        }
        if z < -w {
            clip_rej |= CLIP_Z_NEG;
        }
        if z > w {
            clip_rej |= CLIP_Z_POS;
        }

        let alpha = if self.geometry_mode.contains(GeometryModes::FOG) {
            self.fog_factor(z, w)
        } else {
            vtx.cn[3]
        };

        LoadedVertex {
            x,
            y,
            z,
            w,
            u,
            v,
            color: Rgba32::from_rgb_a(rgb, alpha),
            clip_rej,
        }
    }

    fn light_vertex(&self, vtx: &Vtx) -> [u8; 3] {
        let ambient = self.lights[self.num_lights - 1].col;
        let mut color = ambient.map(|c| c as f32);
        let normal = vtx.normal();
        let positional = self
            .geometry_mode
            .contains(GeometryModes::LIGHTING_POSITIONAL);

        for (i, light) in self.lights[..self.num_lights - 1].iter().enumerate() {
            let intensity = if positional && light.kc != 0 {
                self.positional_intensity(light, vtx, normal)
            } else {
                dot(normal, self.light_coeffs[i]) / 127.0
            };
            let intensity = intensity.clamp(-1.0, 1.0);
            if intensity > 0.0 {
                for (c, lc) in color.iter_mut().zip(light.col) {
                    *c += intensity * lc as f32;
                }
            }
        }
        color.map(|c| c.clamp(0.0, 255.0) as u8)
    }

    fn positional_intensity(&self, light: &Light, vtx: &Vtx, normal: [f32; 3]) -> f32 {
        let mv = self.modelview.top();
        let [vx, vy, vz, _] = mv.transform_point(vtx.ob);
        let delta = [
            light.pos[0] as f32 - vx,
            light.pos[1] as f32 - vy,
            light.pos[2] as f32 - vz,
        ];
        let dist_sq = dot(delta, delta);
        let dist = dist_sq.sqrt();
        let dir = normalize(delta);

        // The normal is rotated into view space the same way positions are.
        let m = &mv.0;
        let view_normal = normalize([
            normal[0] * m[0][0] + normal[1] * m[1][0] + normal[2] * m[2][0],
            normal[0] * m[0][1] + normal[1] * m[1][1] + normal[2] * m[2][1],
            normal[0] * m[0][2] + normal[1] * m[1][2] + normal[2] * m[2][2],
        ]);

        let atten = 1.0 + (dist * light.kl as f32 + dist_sq * light.kq as f32) / 65536.0;
        dot(view_normal, dir) / atten
    }

    fn fog_factor(&self, z: f32, w: f32) -> u8 {
        let w = if w.abs() < 0.001 { 0.001 } else { w };
        let mut winv = 1.0 / w;
        if winv < 0.0 {
            winv = 32767.0;
        }
        let fog = z * winv * self.fog_mul as f32 + self.fog_offset as f32;
        fog.clamp(0.0, 255.0) as u8
    }

    pub fn modify_vertex(&mut self, index: usize, field: VertexField, value: u32) {
        let vertex = match self.vertices.get_mut(index) {
            Some(vertex) => vertex,
            None => {
                tracing::warn!("modify vertex index {} out of range", index);
                return;
            }
        };
        match field {
            VertexField::Rgba => vertex.color = Rgba32::from_word(value),
            VertexField::St => {
                vertex.u = (value >> 16) as i16 as i32;
                vertex.v = value as i16 as i32;
            }
            VertexField::XyScreen | VertexField::ZScreen => {
                tracing::warn!("unsupported vertex modification {:?}", field);
            }
        }
    }

    /// Returns true if every vertex in `first..=last` shares a clip rejection bit.
    pub fn all_rejected(&self, first: usize, last: usize) -> bool {
        let last = last.min(MAX_VERTICES - 1);
        if first > last {
            return false;
        }
        self.vertices[first..=last]
            .iter()
            .fold(0xFF, |rej, v| rej & v.clip_rej)
            != 0
    }
}

#[cfg(all(test, not(feature = "gbi-floats")))]
mod test {
    use super::*;

    fn vtx(x: i16, y: i16, z: i16, cn: [u8; 4]) -> Vtx {
        Vtx {
            ob: [x as f32, y as f32, z as f32],
            flag: 0,
            tc: [64, 32],
            cn,
        }
    }

    #[test]
    fn test_clip_rejection_bits() {
        let mut rsp = RspState::default();
        let inside = rsp.transform_vertex(&vtx(0, 0, 0, [255; 4]), 1.0);
        assert_eq!(inside.clip_rej, 0);
        let left = rsp.transform_vertex(&vtx(-2, 0, 0, [255; 4]), 1.0);
        assert_eq!(left.clip_rej, CLIP_X_NEG);
        let far = rsp.transform_vertex(&vtx(0, 5, 5, [255; 4]), 1.0);
        assert_eq!(far.clip_rej, CLIP_Y_POS | CLIP_Z_POS);
    }

    #[test]
    fn test_texture_scale() {
        let mut rsp = RspState::default();
        rsp.texture_scale = TextureScale {
            s: 0x8000,
            t: 0xFFFF,
        };
        let v = rsp.transform_vertex(&vtx(0, 0, 0, [0; 4]), 1.0);
        assert_eq!(v.u, 32);
        assert_eq!(v.v, 31);
    }

    #[test]
    fn test_directional_lighting() {
        let mut rsp = RspState::default();
        rsp.geometry_mode = GeometryModes::LIGHTING;
        rsp.set_num_lights(1);
        let mut sun = Light::default();
        sun.col = [200, 100, 0];
        sun.dir = [0, 127, 0];
        rsp.set_light(0, sun);
        let mut ambient = Light::default();
        ambient.col = [40, 40, 40];
        rsp.set_light(1, ambient);

        // Normal facing the light.
        let lit = rsp.transform_vertex(&vtx(0, 0, 0, [0, 127, 0, 255]), 1.0);
        assert_eq!(lit.color.rgb(), [240, 140, 40]);
        // Normal facing away only gets ambient.
        let unlit = rsp.transform_vertex(&vtx(0, 0, 0, [0, 0x81, 0, 255]), 1.0);
        assert_eq!(unlit.color.rgb(), [40, 40, 40]);
    }

    fn env_mapped(mode: GeometryModes) -> LoadedVertex {
        let mut rsp = RspState::default();
        rsp.geometry_mode = GeometryModes::LIGHTING | GeometryModes::TEXTURE_GEN | mode;
        rsp.texture_scale = TextureScale {
            s: 0x1000,
            t: 0x1000,
        };
        let mut lookat_x = Light::default();
        lookat_x.dir = [127, 0, 0];
        rsp.set_lookat(0, lookat_x);
        rsp.transform_vertex(&vtx(0, 0, 0, [127, 0, 0, 255]), 1.0)
    }

    #[test]
    fn test_texture_gen() {
        // Normal along the lookat x axis, perpendicular to the (unset) y axis.
        let v = env_mapped(GeometryModes::empty());
        assert_eq!((v.u, v.v), (2048, 1024));
    }

    #[test]
    fn test_texture_gen_linear() {
        let v = env_mapped(GeometryModes::TEXTURE_GEN_LINEAR);
        let pi = std::f32::consts::PI;
        assert_eq!(v.u, (pi / 4.0 * 4096.0) as i32);
        assert_eq!(v.v, (pi / 8.0 * 4096.0) as i32);
    }

    #[test]
    fn test_fog_replaces_alpha() {
        let mut rsp = RspState::default();
        rsp.geometry_mode = GeometryModes::FOG;
        rsp.fog_mul = 128;
        rsp.fog_offset = 64;
        let v = rsp.transform_vertex(&vtx(0, 0, 0, [1, 2, 3, 4]), 1.0);
        assert_eq!(v.color.a, 64);
        assert_eq!(v.color.rgb(), [1, 2, 3]);
    }

    #[test]
    fn test_cull_range() {
        let mut rsp = RspState::default();
        rsp.vertices[0].clip_rej = CLIP_X_NEG | CLIP_Y_NEG;
        rsp.vertices[1].clip_rej = CLIP_X_NEG;
        assert!(rsp.all_rejected(0, 1));
        rsp.vertices[2].clip_rej = CLIP_X_POS;
        assert!(!rsp.all_rejected(0, 2));
    }
}
