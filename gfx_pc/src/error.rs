#![allow(missing_docs)]

use core::fmt;
use std::error;

use crate::{memory::Pointer, resource::ResourceRef};

#[derive(Debug)]
pub enum GfxError {
    InvalidBuffer(Pointer),
    OutOfBounds { pointer: Pointer, len: usize },
    UnmappedSegment(u8),
    MissingResource(ResourceRef),
    UnexpectedResource(ResourceRef),
    UnterminatedString(Pointer),
    Config(serde_json::Error),
}

impl fmt::Display for GfxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GfxError::InvalidBuffer(pointer) => write!(f, "invalid buffer handle: {}", pointer),
            GfxError::OutOfBounds { pointer, len } => {
                write!(f, "out of bounds read: {} bytes at {}", len, pointer)
            }
            GfxError::UnmappedSegment(segment) => {
                write!(f, "segment {:#04X} is not mapped", segment)
            }
            GfxError::MissingResource(resource) => {
                write!(f, "resource not found: {}", resource)
            }
            GfxError::UnexpectedResource(resource) => {
                write!(f, "resource has the wrong type: {}", resource)
            }
            GfxError::UnterminatedString(pointer) => {
                write!(f, "unterminated resource path at {}", pointer)
            }
            GfxError::Config(error) => write!(f, "invalid config: {}", error),
        }
    }
}

impl error::Error for GfxError {}

impl From<serde_json::Error> for GfxError {
    fn from(v: serde_json::Error) -> Self {
        Self::Config(v)
    }
}

pub type GfxResult<T> = Result<T, GfxError>;
