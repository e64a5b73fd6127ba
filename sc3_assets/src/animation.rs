//! Skeletal animation clips.
//!
//! A clip owns two flat keyframe arrays (scalar coordinates and rotations). Each bone
//! track only stores `(offset, count)` windows into those arrays, so many bones share
//! one contiguous, time-sorted block of keyframes.

use std::io::{Read, Write};

use glam::Quat;

use crate::error::{AssetError, Result};
use crate::model::{MAX_BONES, Model};
use crate::reader::{
    capacity_hint, read_f32, read_quat, read_u16, read_u32, write_f32, write_quat, write_u16,
    write_u32,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordKeyframe {
    pub time: f32,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuatKeyframe {
    pub time: f32,
    pub value: Quat,
}

/// Window into one of the animation's keyframe arrays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyframeRange {
    pub offset: u32,
    pub count: u16,
}

impl KeyframeRange {
    pub const EMPTY: Self = Self {
        offset: 0,
        count: 0,
    };

    #[inline]
    pub const fn new(offset: u32, count: u16) -> Self {
        Self { offset, count }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.count == 0
    }

    #[inline]
    fn end(self) -> usize {
        self.offset as usize + self.count as usize
    }

    #[inline]
    fn as_range(self) -> std::ops::Range<usize> {
        self.offset as usize..self.end()
    }
}

/// The six scalar channels of a bone track, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarChannel {
    TranslateX = 0,
    TranslateY = 1,
    TranslateZ = 2,
    ScaleX = 3,
    ScaleY = 4,
    ScaleZ = 5,
}

impl ScalarChannel {
    pub const ALL: [ScalarChannel; 6] = [
        ScalarChannel::TranslateX,
        ScalarChannel::TranslateY,
        ScalarChannel::TranslateZ,
        ScalarChannel::ScaleX,
        ScalarChannel::ScaleY,
        ScalarChannel::ScaleZ,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ScalarChannel::TranslateX => "translate.x",
            ScalarChannel::TranslateY => "translate.y",
            ScalarChannel::TranslateZ => "translate.z",
            ScalarChannel::ScaleX => "scale.x",
            ScalarChannel::ScaleY => "scale.y",
            ScalarChannel::ScaleZ => "scale.z",
        }
    }
}

const ROTATION_CHANNEL: &str = "rotation";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoneTrack {
    pub bone: u16,
    pub scalar: [KeyframeRange; 6],
    pub rotation: KeyframeRange,
}

impl BoneTrack {
    #[inline]
    pub fn channel(&self, channel: ScalarChannel) -> KeyframeRange {
        self.scalar[channel as usize]
    }
}

#[derive(Debug, Clone)]
pub struct Animation {
    /// Per-model ID.
    pub id: u16,
    /// Whole clip duration in seconds.
    pub duration: f32,
    tracks: Vec<BoneTrack>,
    coord_keyframes: Vec<CoordKeyframe>,
    quat_keyframes: Vec<QuatKeyframe>,
}

impl Animation {
    /// Builds a clip from already decoded parts, applying the same checks as [`Animation::load`].
    pub fn from_parts(
        id: u16,
        duration: f32,
        tracks: Vec<BoneTrack>,
        coord_keyframes: Vec<CoordKeyframe>,
        quat_keyframes: Vec<QuatKeyframe>,
        bone_count: usize,
    ) -> Result<Self> {
        let animation = Self {
            id,
            duration,
            tracks,
            coord_keyframes,
            quat_keyframes,
        };
        animation.validate(bone_count)?;
        Ok(animation)
    }

    /// Reads one animation blob. `model` supplies the skeleton the tracks must target.
    pub fn load<R: Read>(stream: &mut R, model: &Model, id: u16) -> Result<Self> {
        let duration = read_f32(stream)?;
        let track_count = read_u32(stream)? as usize;
        let coord_count = read_u32(stream)? as usize;
        let quat_count = read_u32(stream)? as usize;

        if track_count > MAX_BONES {
            return Err(AssetError::TooManyBones {
                count: track_count,
                max: MAX_BONES,
            });
        }

        let mut tracks = Vec::with_capacity(track_count);
        for _ in 0..track_count {
            let bone = read_u16(stream)?;
            let _pad = read_u16(stream)?;

            let mut offsets = [0u32; 7];
            for offset in &mut offsets {
                *offset = read_u32(stream)?;
            }
            let mut counts = [0u16; 7];
            for count in &mut counts {
                *count = read_u16(stream)?;
            }

            let mut scalar = [KeyframeRange::EMPTY; 6];
            for (i, range) in scalar.iter_mut().enumerate() {
                *range = KeyframeRange::new(offsets[i], counts[i]);
            }
            tracks.push(BoneTrack {
                bone,
                scalar,
                rotation: KeyframeRange::new(offsets[6], counts[6]),
            });
        }

        let mut coord_keyframes = Vec::with_capacity(capacity_hint(coord_count));
        for _ in 0..coord_count {
            coord_keyframes.push(CoordKeyframe {
                time: read_f32(stream)?,
                value: read_f32(stream)?,
            });
        }

        let mut quat_keyframes = Vec::with_capacity(capacity_hint(quat_count));
        for _ in 0..quat_count {
            quat_keyframes.push(QuatKeyframe {
                time: read_f32(stream)?,
                value: read_quat(stream)?,
            });
        }

        Self::from_parts(
            id,
            duration,
            tracks,
            coord_keyframes,
            quat_keyframes,
            model.bone_count(),
        )
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write_f32(writer, self.duration)?;
        write_u32(writer, self.tracks.len() as u32)?;
        write_u32(writer, self.coord_keyframes.len() as u32)?;
        write_u32(writer, self.quat_keyframes.len() as u32)?;

        for track in &self.tracks {
            write_u16(writer, track.bone)?;
            write_u16(writer, 0)?;
            for range in track.scalar.iter().chain(std::iter::once(&track.rotation)) {
                write_u32(writer, range.offset)?;
            }
            for range in track.scalar.iter().chain(std::iter::once(&track.rotation)) {
                write_u16(writer, range.count)?;
            }
        }
        for key in &self.coord_keyframes {
            write_f32(writer, key.time)?;
            write_f32(writer, key.value)?;
        }
        for key in &self.quat_keyframes {
            write_f32(writer, key.time)?;
            write_quat(writer, key.value)?;
        }
        Ok(())
    }

    fn validate(&self, bone_count: usize) -> Result<()> {
        if self.tracks.len() > MAX_BONES {
            return Err(AssetError::TooManyBones {
                count: self.tracks.len(),
                max: MAX_BONES,
            });
        }

        for (index, track) in self.tracks.iter().enumerate() {
            if track.bone as usize >= bone_count {
                return Err(AssetError::BoneOutOfRange {
                    bone: track.bone as usize,
                    bone_count,
                });
            }

            for channel in ScalarChannel::ALL {
                let range = track.channel(channel);
                let keys = checked_window(&self.coord_keyframes, range, index, channel.name())?;
                if !is_time_sorted(keys.iter().map(|k| k.time)) {
                    return Err(AssetError::UnsortedKeyframes {
                        track: index,
                        channel: channel.name(),
                    });
                }
            }

            let keys =
                checked_window(&self.quat_keyframes, track.rotation, index, ROTATION_CHANNEL)?;
            if !is_time_sorted(keys.iter().map(|k| k.time)) {
                return Err(AssetError::UnsortedKeyframes {
                    track: index,
                    channel: ROTATION_CHANNEL,
                });
            }
        }
        Ok(())
    }

    #[inline]
    pub fn bone_track_count(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn tracks(&self) -> &[BoneTrack] {
        &self.tracks
    }

    #[inline]
    pub fn coord_keyframe_count(&self) -> usize {
        self.coord_keyframes.len()
    }

    #[inline]
    pub fn quat_keyframe_count(&self) -> usize {
        self.quat_keyframes.len()
    }

    /// Keyframes of one scalar channel. Ranges are validated at load time.
    pub fn scalar_keys(&self, track: &BoneTrack, channel: ScalarChannel) -> &[CoordKeyframe] {
        &self.coord_keyframes[track.channel(channel).as_range()]
    }

    pub fn rotation_keys(&self, track: &BoneTrack) -> &[QuatKeyframe] {
        &self.quat_keyframes[track.rotation.as_range()]
    }
}

fn checked_window<'a, T>(
    keys: &'a [T],
    range: KeyframeRange,
    track: usize,
    channel: &'static str,
) -> Result<&'a [T]> {
    keys.get(range.as_range())
        .ok_or(AssetError::TrackOutOfBounds {
            track,
            channel,
            offset: range.offset,
            count: range.count,
            available: keys.len(),
        })
}

fn is_time_sorted(mut times: impl Iterator<Item = f32>) -> bool {
    let Some(mut previous) = times.next() else {
        return true;
    };
    for time in times {
        if time < previous {
            return false;
        }
        previous = time;
    }
    true
}
