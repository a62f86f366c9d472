//! Matrices as the RSP stores them.
//!
//! Matrices use the row vector convention: a point is transformed as `p * M`, so the
//! translation lives in the last row and `A * B` applies `A` first.

#![allow(missing_docs)]

use core::fmt;
use std::ops;

use crate::{
    error::GfxResult,
    memory::{Arena, Pointer},
};

/// The size in bytes of a matrix in display list memory.
pub const MATRIX_SIZE: usize = 64;

/// The maximum depth of the modelview stack.
pub const MATRIX_STACK_CAPACITY: usize = 11;

#[derive(Clone, Copy, PartialEq, Default)]
pub struct Matrixf(pub [[f32; 4]; 4]);

impl Matrixf {
    pub fn identity() -> Self {
        Self([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Decodes an S15.16 matrix: sixteen integer halves followed by sixteen fraction halves.
    pub fn from_fixed(words: &[u32; 16]) -> Self {
        let mut r = Self::default();
        for i in 0..4 {
            for j in [0, 2] {
                let int_part = words[i * 2 + j / 2];
                let frac_part = words[8 + i * 2 + j / 2];
                r.0[i][j] = ((int_part & 0xFFFF_0000) | (frac_part >> 16)) as i32 as f32 / 65536.0;
                r.0[i][j + 1] = ((int_part << 16) | (frac_part & 0xFFFF)) as i32 as f32 / 65536.0;
            }
        }
        r
    }

    pub fn to_fixed(&self) -> [u32; 16] {
        let mut words = [0; 16];
        for i in 0..4 {
            for j in [0, 2] {
                let v1 = (self.0[i][j] * 65536.0) as i32 as u32;
                let v2 = (self.0[i][j + 1] * 65536.0) as i32 as u32;
                words[i * 2 + j / 2] = (v1 & 0xFFFF_0000) | (v2 >> 16);
                words[8 + i * 2 + j / 2] = (v1 << 16) | (v2 & 0xFFFF);
            }
        }
        words
    }

    pub fn from_floats(values: &[f32; 16]) -> Self {
        let mut r = Self::default();
        for (i, row) in r.0.iter_mut().enumerate() {
            row.copy_from_slice(&values[i * 4..i * 4 + 4]);
        }
        r
    }

    /// Reads a matrix in the layout selected by the `gbi-floats` feature.
    pub fn read(arena: &Arena, pointer: Pointer) -> GfxResult<Self> {
        let bytes = arena.bytes(pointer, MATRIX_SIZE)?;
        let mut words = [0u32; 16];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        if cfg!(feature = "gbi-floats") {
            Ok(Self::from_floats(&words.map(f32::from_bits)))
        } else {
            Ok(Self::from_fixed(&words))
        }
    }

    pub fn translate(x: f32, y: f32, z: f32) -> Self {
        let mut m = Self::identity();
        m.0[3] = [x, y, z, 1.0];
        m
    }

    pub fn scale(x: f32, y: f32, z: f32) -> Self {
        let mut m = Self::identity();
        m.0[0][0] = x;
        m.0[1][1] = y;
        m.0[2][2] = z;
        m
    }

    /// Transforms a point, returning clip coordinates.
    pub fn transform_point(&self, p: [f32; 3]) -> [f32; 4] {
        let m = &self.0;
        let mut out = [0.0; 4];
        for (j, o) in out.iter_mut().enumerate() {
            *o = p[0] * m[0][j] + p[1] * m[1][j] + p[2] * m[2][j] + m[3][j];
        }
        out
    }

    /// Multiplies the upper 3x3 block by a column vector, which maps a world space direction
    /// into model space for an orthonormal matrix.
    pub fn transposed_mul(&self, v: [f32; 3]) -> [f32; 3] {
        let m = &self.0;
        let mut out = [0.0; 3];
        for (i, o) in out.iter_mut().enumerate() {
            *o = v[0] * m[i][0] + v[1] * m[i][1] + v[2] * m[i][2];
        }
        out
    }
}

impl fmt::Debug for Matrixf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrixf [")?;
        for row in &self.0 {
            write!(f, "  [ ")?;
            for v in row {
                write!(f, "\t{:.3} ", v)?;
            }
            writeln!(f, "\t]")?;
        }
        write!(f, "]")?;
        Ok(())
    }
}

impl ops::Mul<&Matrixf> for &Matrixf {
    type Output = Matrixf;

    fn mul(self, rhs: &Matrixf) -> Self::Output {
        let mut out = Matrixf::default();
        for i in 0..4 {
            for j in 0..4 {
                for k in 0..4 {
                    out.0[i][j] += self.0[i][k] * rhs.0[k][j];
                }
            }
        }
        out
    }
}

pub fn normalize(v: [f32; 3]) -> [f32; 3] {
    let mag = dot(v, v).sqrt();
    if mag == 0.0 {
        v
    } else {
        [v[0] / mag, v[1] / mag, v[2] / mag]
    }
}

pub fn dot(v: [f32; 3], w: [f32; 3]) -> f32 {
    v[0] * w[0] + v[1] * w[1] + v[2] * w[2]
}

/// The modelview stack. It always holds at least one matrix.
#[derive(Debug, Clone)]
pub struct MatrixStack {
    stack: Vec<Matrixf>,
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self {
            stack: vec![Matrixf::identity()],
        }
    }
}

impl MatrixStack {
    pub fn top(&self) -> &Matrixf {
        // The stack is never empty.
        &self.stack[self.stack.len() - 1]
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Duplicates the top matrix. Pushes past the capacity are ignored.
    pub fn push(&mut self) {
        if self.stack.len() < MATRIX_STACK_CAPACITY {
            let top = *self.top();
            self.stack.push(top);
        }
    }

    /// Pops up to `count` matrices, stopping at the bottom of the stack.
    pub fn pop(&mut self, count: u32) {
        for _ in 0..count {
            if self.stack.len() <= 1 {
                break;
            }
            self.stack.pop();
        }
    }

    pub fn load(&mut self, m: Matrixf) {
        let i = self.stack.len() - 1;
        self.stack[i] = m;
    }

    /// Replaces the top with `m * top`.
    pub fn mul(&mut self, m: &Matrixf) {
        let i = self.stack.len() - 1;
        self.stack[i] = m * &self.stack[i];
    }

    pub fn reset(&mut self) {
        self.stack.clear();
        self.stack.push(Matrixf::identity());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fixed_point_round_trip_values() {
        let m = Matrixf([
            [1.5, -2.0, 0.25, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, -1.0, 0.0],
            [100.0, -50.5, 3.0, 1.0],
        ]);
        assert_eq!(Matrixf::from_fixed(&m.to_fixed()), m);

        let words = Matrixf::identity().to_fixed();
        assert_eq!(words[0], 0x0001_0000);
        assert_eq!(words[2], 0x0000_0001);
        assert_eq!(words[8], 0);
    }

    #[test]
    fn test_row_vector_convention() {
        let m = &Matrixf::scale(2.0, 2.0, 2.0) * &Matrixf::translate(1.0, 0.0, 0.0);
        assert_eq!(m.transform_point([1.0, 1.0, 1.0]), [3.0, 2.0, 2.0, 1.0]);
    }

    #[test]
    fn test_stack_limits() {
        let mut stack = MatrixStack::default();
        for _ in 0..20 {
            stack.push();
        }
        assert_eq!(stack.depth(), MATRIX_STACK_CAPACITY);

        stack.load(Matrixf::scale(2.0, 2.0, 2.0));
        stack.pop(100);
        assert_eq!(stack.depth(), 1);
        assert_eq!(*stack.top(), Matrixf::identity());
    }
}
