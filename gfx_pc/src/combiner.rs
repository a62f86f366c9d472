//! Reduction of the RDP color combiner equation to a canonical shader identity.
//!
//! A combine mode selects, for each cycle and for both color and alpha, four inputs of the
//! equation `(A - B) * C + D`. Inputs that vary per draw (primitive, shade, environment and
//! LOD colors) are assigned numbered shader input slots in the order they are first
//! referenced, while texels and constants map to fixed codes. The resulting pair
//! `(shader_id0, shader_id1)` only depends on the optical formula, so different combine modes
//! that compute the same thing share one compiled shader.

#![allow(missing_docs)]

use std::collections::HashMap;

use bitflags::bitflags;

use crate::{
    backend::ShaderId,
    cmd::{AlphaCombineComponent, ColorCombineComponent},
};

/// The maximum number of per-vertex inputs a shader can read.
pub const MAX_SHADER_INPUTS: usize = 7;

/// The number of texture clamp combinations, see [ShaderOptions::TEXEL0_CLAMP_S].
pub const NUM_CLAMP_VARIANTS: usize = 16;

/// Argument codes stored in `shader_id0`, four bits each.
pub mod shader_item {
    pub const ZERO: u8 = 0;
    /// Codes `INPUT_1..=INPUT_7` select a per-vertex input.
    pub const INPUT_1: u8 = 1;
    pub const INPUT_7: u8 = 7;
    pub const TEXEL0: u8 = 8;
    pub const TEXEL0_ALPHA: u8 = 9;
    pub const TEXEL1: u8 = 10;
    pub const TEXEL1_ALPHA: u8 = 11;
    pub const ONE: u8 = 12;
    pub const COMBINED: u8 = 13;
    pub const NOISE: u8 = 14;
}

bitflags! {
    /// Options that affect the generated shader, stored in `shader_id1`.
    pub struct ShaderOptions: u32 {
        const ALPHA           = 1 << 0;
        const FOG             = 1 << 1;
        const TEXTURE_EDGE    = 1 << 2;
        const NOISE           = 1 << 3;
        const TWO_CYCLE       = 1 << 4;
        const ALPHA_THRESHOLD = 1 << 5;
        const INVISIBLE       = 1 << 6;
        const GRAYSCALE       = 1 << 7;
        const TEXEL0_CLAMP_S  = 1 << 8;
        const TEXEL0_CLAMP_T  = 1 << 9;
        const TEXEL1_CLAMP_S  = 1 << 10;
        const TEXEL1_CLAMP_T  = 1 << 11;
    }
}

impl Default for ShaderOptions {
    fn default() -> Self {
        Self::empty()
    }
}

impl ShaderOptions {
    /// The shift that turns a clamp variant index into the clamp option bits.
    pub const CLAMP_SHIFT: u32 = 8;

    /// Options that make the alpha channel of the equation observable.
    pub fn uses_alpha(self) -> bool {
        self.intersects(
            Self::ALPHA | Self::TEXTURE_EDGE | Self::ALPHA_THRESHOLD | Self::NOISE,
        )
    }
}

/// Color selector 7 in the multiplier position reads the combined alpha.
const COMBINED_ALPHA: u8 = 7;

/// The alpha equations of both cycles inside a packed combine mode.
const ALPHA_MASK: u64 = (0xFFF << 16) | (0xFFF << 44);

/// Identifies one combiner: the packed combine mode plus the options derived from othermode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorCombinerKey {
    pub combine_mode: u64,
    pub options: ShaderOptions,
}

impl ColorCombinerKey {
    /// Builds a key, dropping the alpha equations if nothing observes alpha.
    pub fn new(combine_mode: u64, options: ShaderOptions) -> Self {
        let combine_mode = if options.uses_alpha() {
            combine_mode
        } else {
            combine_mode & !ALPHA_MASK
        };
        Self {
            combine_mode,
            options,
        }
    }
}

/// A combiner equation reduced to shader form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorCombiner {
    pub key: ColorCombinerKey,
    pub shader_id0: u64,
    pub shader_id1: u32,
    pub used_textures: [bool; 2],
    /// The source of each shader input, for the color and alpha channels.
    pub shader_input_mapping: [[Option<ColorCombineComponent>; MAX_SHADER_INPUTS]; 2],
    pub num_inputs: usize,
    /// Backend programs by clamp variant.
    pub programs: [Option<ShaderId>; NUM_CLAMP_VARIANTS],
}

impl ColorCombiner {
    /// The shader id pair for a clamp variant.
    pub fn shader_id(&self, clamp_variant: usize) -> (u64, u32) {
        (
            self.shader_id0,
            self.shader_id1 | ((clamp_variant as u32 & 0xF) << ShaderOptions::CLAMP_SHIFT),
        )
    }
}

/// Per-channel slot assignment for the shader inputs.
#[derive(Default)]
struct InputSlots {
    sources: Vec<ColorCombineComponent>,
}

impl InputSlots {
    fn slot(&mut self, source: ColorCombineComponent) -> u8 {
        let index = match self.sources.iter().position(|&s| s == source) {
            Some(index) => index,
            None => {
                self.sources.push(source);
                self.sources.len() - 1
            }
        };
        shader_item::INPUT_1 + index as u8
    }

    fn mapping(&self) -> [Option<ColorCombineComponent>; MAX_SHADER_INPUTS] {
        let mut mapping = [None; MAX_SHADER_INPUTS];
        for (slot, &source) in mapping.iter_mut().zip(&self.sources) {
            *slot = Some(source);
        }
        mapping
    }
}

fn unpack_cycle(combine_mode: u64, cycle: u32) -> ([u8; 4], [u8; 4]) {
    let bits = |shift: u32, mask: u64| ((combine_mode >> (cycle * 28 + shift)) & mask) as u8;
    let mut rgb = [bits(0, 0xF), bits(4, 0xF), bits(8, 0x1F), bits(13, 0x7)];
    let mut alpha = [bits(16, 0x7), bits(19, 0x7), bits(22, 0x7), bits(25, 0x7)];

    let zero = ColorCombineComponent::Zero as u8;
    // Out of range selectors read as zero.
    if rgb[0] >= 8 {
        rgb[0] = zero;
    }
    if rgb[1] >= 8 {
        rgb[1] = zero;
    }
    if rgb[2] >= 16 {
        rgb[2] = zero;
    }
    if rgb[3] == 7 {
        rgb[3] = zero;
    }

    if rgb[0] == rgb[1] || rgb[2] == zero {
        rgb[..3].fill(zero);
    }
    let alpha_zero = AlphaCombineComponent::Zero as u8;
    if alpha[0] == alpha[1] || alpha[2] == alpha_zero {
        alpha[..3].fill(alpha_zero);
    }
    (rgb, alpha)
}

fn color_item(
    arg: u8,
    used_textures: &mut [bool; 2],
    slots: &mut InputSlots,
) -> u8 {
    use ColorCombineComponent::*;
    match ColorCombineComponent::try_from(arg) {
        Ok(Combined) => shader_item::COMBINED,
        Ok(Texel0) => {
            used_textures[0] = true;
            shader_item::TEXEL0
        }
        Ok(Texel1) => {
            used_textures[1] = true;
            shader_item::TEXEL1
        }
        Ok(Texel0Alpha) => {
            used_textures[0] = true;
            shader_item::TEXEL0_ALPHA
        }
        Ok(Texel1Alpha) => {
            used_textures[1] = true;
            shader_item::TEXEL1_ALPHA
        }
        Ok(Noise) => shader_item::NOISE,
        Ok(One) => shader_item::ONE,
        Ok(
            source @ (Prim | Shade | Env | PrimAlpha | ShadeAlpha | EnvAlpha | LodFraction
            | PrimLodFraction),
        ) => slots.slot(source),
        Ok(K5) | Ok(Zero) | Err(_) => shader_item::ZERO,
    }
}

fn alpha_item(
    arg: u8,
    position: usize,
    used_textures: &mut [bool; 2],
    slots: &mut InputSlots,
) -> u8 {
    use AlphaCombineComponent::*;
    match AlphaCombineComponent::try_from(arg) {
        // Selector 0 and 6 mean something else in the multiplier position.
        Ok(CombinedOrLodFraction) if position == 2 => {
            slots.slot(ColorCombineComponent::LodFraction)
        }
        Ok(CombinedOrLodFraction) => shader_item::COMBINED,
        Ok(OneOrPrimLodFraction) if position == 2 => {
            slots.slot(ColorCombineComponent::PrimLodFraction)
        }
        Ok(OneOrPrimLodFraction) => shader_item::ONE,
        Ok(Texel0) => {
            used_textures[0] = true;
            shader_item::TEXEL0
        }
        Ok(Texel1) => {
            used_textures[1] = true;
            shader_item::TEXEL1
        }
        Ok(Prim) => slots.slot(ColorCombineComponent::Prim),
        Ok(Shade) => slots.slot(ColorCombineComponent::Shade),
        Ok(Env) => slots.slot(ColorCombineComponent::Env),
        Ok(Zero) | Err(_) => shader_item::ZERO,
    }
}

/// Reduces a combiner key to its canonical shader form.
pub fn generate_combiner(key: ColorCombinerKey) -> ColorCombiner {
    let two_cycle = key.options.contains(ShaderOptions::TWO_CYCLE);
    let mut items = [[[shader_item::ZERO; 4]; 2]; 2];
    let mut used_textures = [false; 2];
    let mut color_slots = InputSlots::default();
    let mut alpha_slots = InputSlots::default();

    let num_cycles = if two_cycle { 2 } else { 1 };
    for cycle in 0..num_cycles {
        let (rgb, alpha) = unpack_cycle(key.combine_mode, cycle);

        if cycle == 1 {
            let combined = ColorCombineComponent::Combined as u8;
            let alpha_combined = AlphaCombineComponent::CombinedOrLodFraction as u8;
            if !rgb.contains(&combined) {
                items[0][0] = [shader_item::ZERO; 4];
            }
            let reads_combined_alpha = rgb[2] == COMBINED_ALPHA
                || alpha[0] == alpha_combined
                || alpha[1] == alpha_combined
                || alpha[3] == alpha_combined;
            if !reads_combined_alpha {
                items[0][1] = [shader_item::ZERO; 4];
            }
        }

        for (i, &arg) in rgb.iter().enumerate() {
            items[cycle as usize][0][i] = color_item(arg, &mut used_textures, &mut color_slots);
        }
        for (i, &arg) in alpha.iter().enumerate() {
            items[cycle as usize][1][i] =
                alpha_item(arg, i, &mut used_textures, &mut alpha_slots);
        }
    }

    let mut shader_id0 = 0u64;
    for (cycle, channels) in items.iter().enumerate() {
        for (channel, args) in channels.iter().enumerate() {
            for (i, &item) in args.iter().enumerate() {
                shader_id0 |= (item as u64) << (cycle * 32 + channel * 16 + i * 4);
            }
        }
    }

    let num_inputs = color_slots
        .sources
        .len()
        .max(alpha_slots.sources.len())
        .min(MAX_SHADER_INPUTS);

    ColorCombiner {
        key,
        shader_id0,
        shader_id1: key.options.bits(),
        used_textures,
        shader_input_mapping: [color_slots.mapping(), alpha_slots.mapping()],
        num_inputs,
        programs: [None; NUM_CLAMP_VARIANTS],
    }
}

/// The features of a shader, recovered from its id pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShaderFeatures {
    pub num_inputs: usize,
    pub used_textures: [bool; 2],
    pub options: ShaderOptions,
}

/// Recovers what a shader reads from its id pair.
pub fn decode_shader_id(shader_id0: u64, shader_id1: u32) -> ShaderFeatures {
    let mut features = ShaderFeatures {
        options: ShaderOptions::from_bits_truncate(shader_id1),
        ..Default::default()
    };
    for i in 0..16 {
        let item = ((shader_id0 >> (i * 4)) & 0xF) as u8;
        match item {
            shader_item::INPUT_1..=shader_item::INPUT_7 => {
                features.num_inputs = features.num_inputs.max(item as usize);
            }
            shader_item::TEXEL0 | shader_item::TEXEL0_ALPHA => features.used_textures[0] = true,
            shader_item::TEXEL1 | shader_item::TEXEL1_ALPHA => features.used_textures[1] = true,
            _ => {}
        }
    }
    features
}

/// Every combiner created so far. Combiners are never evicted.
#[derive(Debug, Default)]
pub struct CombinerPool {
    combiners: HashMap<ColorCombinerKey, ColorCombiner>,
    prev_key: Option<ColorCombinerKey>,
}

impl CombinerPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.combiners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combiners.is_empty()
    }

    pub fn get(&self, key: &ColorCombinerKey) -> Option<&ColorCombiner> {
        self.combiners.get(key)
    }

    pub fn get_mut(&mut self, key: &ColorCombinerKey) -> Option<&mut ColorCombiner> {
        self.combiners.get_mut(key)
    }

    /// Returns the combiner for `key`, creating it on a miss.
    ///
    /// `on_miss` runs before a new combiner is created.
    pub fn lookup_or_create(
        &mut self,
        key: ColorCombinerKey,
        on_miss: impl FnOnce(),
    ) -> &mut ColorCombiner {
        if self.prev_key != Some(key) && !self.combiners.contains_key(&key) {
            on_miss();
            let combiner = generate_combiner(key);
            tracing::debug!(
                "created combiner {:#018X} {:?}: shader {:#018X} {:#06X}",
                key.combine_mode,
                key.options,
                combiner.shader_id0,
                combiner.shader_id1
            );
            self.combiners.insert(key, combiner);
        }
        self.prev_key = Some(key);
        self.combiners
            .entry(key)
            .or_insert_with(|| generate_combiner(key))
    }
}
