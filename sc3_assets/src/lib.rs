//! Binary loaders for the 3D assets driven by SC3 scripts: skinned models,
//! their skeletal animation clips, and clip playback.

pub mod animation;
pub mod error;
pub mod model;
pub mod player;
mod reader;

pub use animation::{
    Animation, BoneTrack, CoordKeyframe, KeyframeRange, QuatKeyframe, ScalarChannel,
};
pub use error::{AssetError, Result};
pub use model::{Bone, MAX_BONES, MODEL_MAGIC, Mesh, Model, Vertex};
pub use player::{AnimationPlayer, BoneTransform};
