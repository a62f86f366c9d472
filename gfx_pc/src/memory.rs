//! Display list and asset memory.
//!
//! All data the interpreter reads (display lists, vertices, matrices, lights, textures) lives in
//! an [Arena] of byte buffers. A [Pointer] is a buffer handle plus a byte offset, and the
//! [SegmentTable] maps the segment number in the top byte of a segmented address to a base
//! pointer.
//!
//! Multi-byte values are stored big endian, matching the layout produced for the console.

#![allow(missing_docs)]

use core::fmt;

use crate::{
    decode::RawGfxCommand,
    error::{GfxError, GfxResult},
};

/// The number of addressable segments.
pub const NUM_SEGMENTS: usize = 16;

/// A handle to a buffer in an [Arena].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BufferHandle(pub u32);

/// A location inside an arena buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pointer {
    pub buffer: BufferHandle,
    pub offset: u32,
}

impl Pointer {
    pub fn new(buffer: BufferHandle, offset: u32) -> Self {
        Self { buffer, offset }
    }

    /// Returns the pointer `bytes` bytes after this one.
    pub fn add(self, bytes: u32) -> Self {
        Self {
            buffer: self.buffer,
            offset: self.offset.wrapping_add(bytes),
        }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{:#X}", self.buffer.0, self.offset)
    }
}

/// Owner of every buffer the interpreter can address.
#[derive(Default)]
pub struct Arena {
    buffers: Vec<Vec<u8>>,
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("num_buffers", &self.buffers.len())
            .finish_non_exhaustive()
    }
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a buffer and returns its handle. Handles are never reused.
    pub fn insert(&mut self, data: Vec<u8>) -> BufferHandle {
        let handle = BufferHandle(self.buffers.len() as u32);
        self.buffers.push(data);
        handle
    }

    /// Replaces the contents of an existing buffer.
    ///
    /// Texture cache entries keyed on this buffer are not invalidated automatically.
    pub fn replace(&mut self, handle: BufferHandle, data: Vec<u8>) -> GfxResult<()> {
        let buffer = self
            .buffers
            .get_mut(handle.0 as usize)
            .ok_or(GfxError::InvalidBuffer(Pointer::new(handle, 0)))?;
        *buffer = data;
        Ok(())
    }

    pub fn buffer(&self, handle: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(handle.0 as usize).map(Vec::as_slice)
    }

    pub fn buffer_mut(&mut self, handle: BufferHandle) -> Option<&mut Vec<u8>> {
        self.buffers.get_mut(handle.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Returns `len` bytes starting at `pointer`.
    pub fn bytes(&self, pointer: Pointer, len: usize) -> GfxResult<&[u8]> {
        let buffer = self
            .buffer(pointer.buffer)
            .ok_or(GfxError::InvalidBuffer(pointer))?;
        let start = pointer.offset as usize;
        start
            .checked_add(len)
            .and_then(|end| buffer.get(start..end))
            .ok_or(GfxError::OutOfBounds { pointer, len })
    }

    /// Returns the bytes from `pointer` to the end of its buffer.
    pub fn tail(&self, pointer: Pointer) -> GfxResult<&[u8]> {
        let buffer = self
            .buffer(pointer.buffer)
            .ok_or(GfxError::InvalidBuffer(pointer))?;
        buffer
            .get(pointer.offset as usize..)
            .ok_or(GfxError::OutOfBounds { pointer, len: 0 })
    }

    pub fn read_u8(&self, pointer: Pointer) -> GfxResult<u8> {
        Ok(self.bytes(pointer, 1)?[0])
    }

    pub fn read_u16(&self, pointer: Pointer) -> GfxResult<u16> {
        let b = self.bytes(pointer, 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_i16(&self, pointer: Pointer) -> GfxResult<i16> {
        Ok(self.read_u16(pointer)? as i16)
    }

    pub fn read_u32(&self, pointer: Pointer) -> GfxResult<u32> {
        let b = self.bytes(pointer, 4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&self, pointer: Pointer) -> GfxResult<i32> {
        Ok(self.read_u32(pointer)? as i32)
    }

    pub fn read_f32(&self, pointer: Pointer) -> GfxResult<f32> {
        Ok(f32::from_bits(self.read_u32(pointer)?))
    }

    /// Reads the two command words at `pointer`.
    pub fn read_command(&self, pointer: Pointer) -> GfxResult<RawGfxCommand> {
        Ok(RawGfxCommand {
            w0: self.read_u32(pointer)?,
            w1: self.read_u32(pointer.add(4))?,
        })
    }

    /// Reads a NUL terminated resource path.
    pub fn read_path(&self, pointer: Pointer) -> GfxResult<String> {
        let tail = self.tail(pointer)?;
        let end = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(GfxError::UnterminatedString(pointer))?;
        Ok(String::from_utf8_lossy(&tail[..end]).into_owned())
    }
}

/// Maps segment numbers to base pointers.
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    segments: [Option<Pointer>; NUM_SEGMENTS],
}

impl SegmentTable {
    pub fn set(&mut self, segment: u8, base: Option<Pointer>) {
        if let Some(entry) = self.segments.get_mut(segment as usize) {
            *entry = base;
        } else {
            tracing::warn!("segment {} out of range", segment);
        }
    }

    pub fn get(&self, segment: u8) -> Option<Pointer> {
        self.segments.get(segment as usize).copied().flatten()
    }

    /// Resolves a segmented address of the form `0x0SOOOOOO`.
    pub fn resolve(&self, address: u32) -> GfxResult<Pointer> {
        let segment = ((address >> 24) & 0x0F) as u8;
        let offset = address & 0x00FF_FFFF;
        let base = self
            .get(segment)
            .ok_or(GfxError::UnmappedSegment(segment))?;
        Ok(base.add(offset))
    }
}

/// Builds a segmented address.
pub fn segmented_address(segment: u8, offset: u32) -> u32 {
    ((segment as u32 & 0x0F) << 24) | (offset & 0x00FF_FFFF)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_big_endian_reads() {
        let mut arena = Arena::new();
        let handle = arena.insert(vec![0x12, 0x34, 0x56, 0x78, 0xFF, 0xFE]);
        let ptr = Pointer::new(handle, 0);
        assert_eq!(arena.read_u16(ptr).unwrap(), 0x1234);
        assert_eq!(arena.read_u32(ptr).unwrap(), 0x12345678);
        assert_eq!(arena.read_i16(ptr.add(4)).unwrap(), -2);
        assert!(matches!(
            arena.read_u32(ptr.add(4)),
            Err(GfxError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_segment_resolution() {
        let mut arena = Arena::new();
        let handle = arena.insert(vec![0; 64]);
        let mut segments = SegmentTable::default();
        segments.set(6, Some(Pointer::new(handle, 16)));

        let ptr = segments.resolve(segmented_address(6, 8)).unwrap();
        assert_eq!(ptr, Pointer::new(handle, 24));
        assert!(matches!(
            segments.resolve(segmented_address(2, 0)),
            Err(GfxError::UnmappedSegment(2))
        ));
    }

    #[test]
    fn test_read_path() {
        let mut arena = Arena::new();
        let handle = arena.insert(b"textures/foo\0bar".to_vec());
        assert_eq!(
            arena.read_path(Pointer::new(handle, 0)).unwrap(),
            "textures/foo"
        );
        assert!(arena.read_path(Pointer::new(handle, 13)).is_err());
    }
}
