//! An interpreter for Nintendo 64 GBI display lists that renders through a pluggable PC
//! graphics backend.
//!
//! Display lists for the F3D, F3DEX, F3DEX2 and S2DEX microcodes are decoded into typed
//! commands ([cmd]) and executed by an [Interpreter], which emulates the RSP geometry stage
//! and the RDP rasterizer state closely enough to produce batches of triangles, textures and
//! shader identities for a [RenderingApi].
//!
//! The crate has no platform backend of its own. [recorder::RecordingBackend] records every
//! draw call and is used for tests and offline inspection.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
#![allow(clippy::map_entry, clippy::needless_range_loop, clippy::too_many_arguments)]

pub use backend::*;
pub use config::*;
pub use error::*;
pub use interpret::{Interpreter, MatrixReplacements};
pub use memory::{Arena, BufferHandle, Pointer};
pub use resource::{
    RawTexMetadata, Resource, ResourceManager, ResourceRef, TextureResource, TextureType,
};
pub use ucode::Ucode;

mod backend;
mod batch;
pub mod cmd;
pub mod combiner;
mod config;
pub mod decode;
mod draw;
mod error;
pub mod exec;
pub mod framebuffer;
pub mod interpret;
pub mod matrix;
pub mod memory;
pub mod rdp;
pub mod recorder;
pub mod resource;
pub mod rsp;
pub mod s2dex;
pub mod texture;
pub mod texture_cache;
pub mod ucode;
