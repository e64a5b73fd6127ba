//! Playback of an [`Animation`] against its model's skeleton.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use crate::animation::{Animation, CoordKeyframe, QuatKeyframe, ScalarChannel};
use crate::model::{Bone, Model};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl BoneTransform {
    pub fn rest(bone: &Bone) -> Self {
        Self {
            translation: bone.translation,
            rotation: bone.rotation,
            scale: bone.scale,
        }
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// One playing instance of a shared, immutable clip.
#[derive(Debug, Clone)]
pub struct AnimationPlayer {
    animation: Arc<Animation>,
    time: f32,
    looping: bool,
}

impl AnimationPlayer {
    pub fn new(animation: Arc<Animation>, looping: bool) -> Self {
        Self {
            animation,
            time: 0.0,
            looping,
        }
    }

    #[inline]
    pub fn animation(&self) -> &Arc<Animation> {
        &self.animation
    }

    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn finished(&self) -> bool {
        !self.looping && self.time >= self.animation.duration
    }

    pub fn advance(&mut self, delta: f32) {
        let duration = self.animation.duration;
        self.time += delta.max(0.0);
        if duration <= 0.0 {
            self.time = 0.0;
        } else if self.looping {
            self.time = self.time.rem_euclid(duration);
        } else {
            self.time = self.time.min(duration);
        }
    }

    /// Local transform for every bone of `model`; bones without a track stay at rest.
    pub fn sample(&self, model: &Model) -> Vec<BoneTransform> {
        let mut pose: Vec<BoneTransform> = model.bones.iter().map(BoneTransform::rest).collect();

        for track in self.animation.tracks() {
            let Some(out) = pose.get_mut(track.bone as usize) else {
                continue;
            };
            let scalar =
                |channel, rest| sample_scalar(self.animation.scalar_keys(track, channel), self.time, rest);

            out.translation = Vec3::new(
                scalar(ScalarChannel::TranslateX, out.translation.x),
                scalar(ScalarChannel::TranslateY, out.translation.y),
                scalar(ScalarChannel::TranslateZ, out.translation.z),
            );
            out.scale = Vec3::new(
                scalar(ScalarChannel::ScaleX, out.scale.x),
                scalar(ScalarChannel::ScaleY, out.scale.y),
                scalar(ScalarChannel::ScaleZ, out.scale.z),
            );
            out.rotation =
                sample_rotation(self.animation.rotation_keys(track), self.time, out.rotation);
        }
        pose
    }
}

/// Index of the first key strictly after `time`, plus the bracketing keys.
fn bracket<T>(keys: &[T], time: f32, key_time: impl Fn(&T) -> f32) -> Option<(&T, &T)> {
    let next = keys.partition_point(|k| key_time(k) <= time);
    if next == 0 || next >= keys.len() {
        return None;
    }
    Some((&keys[next - 1], &keys[next]))
}

fn blend_factor(start: f32, end: f32, time: f32) -> f32 {
    let span = end - start;
    if span <= f32::EPSILON {
        1.0
    } else {
        ((time - start) / span).clamp(0.0, 1.0)
    }
}

fn sample_scalar(keys: &[CoordKeyframe], time: f32, rest: f32) -> f32 {
    let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
        return rest;
    };
    if time <= first.time {
        return first.value;
    }
    match bracket(keys, time, |k| k.time) {
        Some((a, b)) => {
            let t = blend_factor(a.time, b.time, time);
            a.value + (b.value - a.value) * t
        }
        None => last.value,
    }
}

fn sample_rotation(keys: &[QuatKeyframe], time: f32, rest: Quat) -> Quat {
    let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
        return rest;
    };
    if time <= first.time {
        return first.value;
    }
    match bracket(keys, time, |k| k.time) {
        Some((a, b)) => a.value.slerp(b.value, blend_factor(a.time, b.time, time)),
        None => last.value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{BoneTrack, KeyframeRange};

    fn key(time: f32, value: f32) -> CoordKeyframe {
        CoordKeyframe { time, value }
    }

    fn clip(duration: f32) -> Arc<Animation> {
        let mut track = BoneTrack {
            bone: 1,
            ..BoneTrack::default()
        };
        track.scalar[ScalarChannel::TranslateX as usize] = KeyframeRange::new(0, 2);
        track.rotation = KeyframeRange::new(0, 2);
        Arc::new(
            Animation::from_parts(
                0,
                duration,
                vec![track],
                vec![key(0.0, 0.0), key(1.0, 10.0)],
                vec![
                    QuatKeyframe {
                        time: 0.0,
                        value: Quat::IDENTITY,
                    },
                    QuatKeyframe {
                        time: 1.0,
                        value: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
                    },
                ],
                2,
            )
            .unwrap(),
        )
    }

    fn model() -> Model {
        let child = Bone {
            parent: Some(0),
            translation: Vec3::new(0.0, 2.0, 0.0),
            ..Bone::root()
        };
        Model::new(0, vec![Bone::root(), child], Vec::new())
    }

    #[test]
    fn scalar_channel_interpolates_linearly() {
        let mut player = AnimationPlayer::new(clip(1.0), false);
        player.advance(0.25);
        let pose = player.sample(&model());

        assert!((pose[1].translation.x - 2.5).abs() < 1e-5);
        // Untracked channels keep the rest value.
        assert_eq!(pose[1].translation.y, 2.0);
        assert_eq!(pose[1].scale, Vec3::ONE);
        // Untracked bones keep the rest pose.
        assert_eq!(pose[0], BoneTransform::rest(&Bone::root()));
    }

    #[test]
    fn rotation_channel_slerps() {
        let mut player = AnimationPlayer::new(clip(1.0), false);
        player.advance(0.5);
        let pose = player.sample(&model());

        let expected = Quat::from_rotation_z(std::f32::consts::FRAC_PI_4);
        assert!(pose[1].rotation.angle_between(expected) < 1e-4);
    }

    #[test]
    fn looping_player_wraps_time() {
        let mut player = AnimationPlayer::new(clip(1.0), true);
        player.advance(1.25);
        assert!((player.time() - 0.25).abs() < 1e-5);
        assert!(!player.finished());
    }

    #[test]
    fn one_shot_player_clamps_and_finishes() {
        let mut player = AnimationPlayer::new(clip(1.0), false);
        player.advance(3.0);
        assert_eq!(player.time(), 1.0);
        assert!(player.finished());
        let pose = player.sample(&model());
        assert_eq!(pose[1].translation.x, 10.0);
    }

    #[test]
    fn sampling_before_first_key_holds_first_value() {
        let keys = [key(0.5, 3.0), key(1.0, 4.0)];
        assert_eq!(sample_scalar(&keys, 0.0, 9.0), 3.0);
        assert_eq!(sample_scalar(&[], 0.0, 9.0), 9.0);
    }

    #[test]
    fn coincident_keys_take_the_later_value() {
        let keys = [key(0.0, 1.0), key(0.5, 2.0), key(0.5, 7.0), key(1.0, 8.0)];
        assert_eq!(sample_scalar(&keys, 0.5, 0.0), 7.0);
    }
}
