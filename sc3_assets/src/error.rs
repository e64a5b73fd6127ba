use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssetError>;

/// Errors raised while decoding model and animation files.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("asset stream ended before the structure was complete")]
    Truncated,

    #[error("bad magic: expected {expected:?}, found {found:?}")]
    BadMagic { expected: [u8; 4], found: [u8; 4] },

    #[error("{count} bones exceeds the limit of {max}")]
    TooManyBones { count: usize, max: usize },

    #[error("track {track} {channel} range {offset}+{count} exceeds {available} keyframes")]
    TrackOutOfBounds {
        track: usize,
        channel: &'static str,
        offset: u32,
        count: u16,
        available: usize,
    },

    #[error("track {track} {channel} keyframes are not sorted by time")]
    UnsortedKeyframes { track: usize, channel: &'static str },

    #[error("bone index {bone} out of range for {bone_count} bones")]
    BoneOutOfRange { bone: usize, bone_count: usize },

    #[error("mesh {mesh} index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        mesh: usize,
        index: u16,
        vertex_count: usize,
    },

    #[error("animation {id} blob at {offset}+{length} lies outside the model file")]
    AnimationOutOfBounds { id: u16, offset: u32, length: u32 },

    #[error("IO error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for AssetError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            AssetError::Truncated
        } else {
            AssetError::Io(err)
        }
    }
}
