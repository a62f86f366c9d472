#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::{error::GfxResult, ucode::Ucode};

/// Interpreter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GfxConfig {
    /// The resolution display lists are authored against.
    pub native_width: u32,
    pub native_height: u32,
    pub texture_cache_capacity: usize,
    pub max_buffered_triangles: usize,
    pub msaa_level: u32,
    pub texture_filter: FilterMode,
    pub target_fps: u32,
    pub max_frame_latency: u32,
    pub initial_ucode: Ucode,
}

impl Default for GfxConfig {
    fn default() -> Self {
        Self {
            native_width: 320,
            native_height: 240,
            texture_cache_capacity: 500,
            max_buffered_triangles: 256,
            msaa_level: 1,
            texture_filter: FilterMode::default(),
            target_fps: 60,
            max_frame_latency: 1,
            initial_ucode: Ucode::F3dex2,
        }
    }
}

impl GfxConfig {
    pub fn from_json(json: &str) -> GfxResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn half_width(&self) -> f32 {
        self.native_width as f32 / 2.0
    }

    pub fn half_height(&self) -> f32 {
        self.native_height as f32 / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    /// Always sample nearest.
    Point,
    /// Follow the texture filter selected by the display list.
    Linear,
}

impl Default for FilterMode {
    fn default() -> Self {
        Self::Linear
    }
}
