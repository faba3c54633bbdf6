//! Keyframe animation clips and the mixers that play them on registered objects.

use glam::{EulerRot, Quat, Vec3};

use crate::object::Object3D;

/// Node property a track drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackProperty {
    Translation,
    Rotation,
    Scale,
}

/// Keyframes for one property of one named node. Rotations are stored as
/// `xyzw` quaternions, everything else as `xyz`.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub node: String,
    pub property: TrackProperty,
    pub times: Vec<f32>,
    pub values: Vec<f32>,
}

impl Track {
    fn stride(&self) -> usize {
        match self.property {
            TrackProperty::Rotation => 4,
            TrackProperty::Translation | TrackProperty::Scale => 3,
        }
    }

    fn keyframe(&self, index: usize) -> &[f32] {
        let stride = self.stride();
        &self.values[index * stride..index * stride + stride]
    }

    /// Linearly interpolated value at `time`, clamped to the first and last keys.
    fn sample(&self, time: f32) -> Option<Sample> {
        let keys = self.times.len().min(self.values.len() / self.stride());
        if keys == 0 {
            return None;
        }
        let next = self.times[..keys].partition_point(|&t| t <= time);
        let (a, b, t) = if next == 0 {
            (0, 0, 0.0)
        } else if next >= keys {
            (keys - 1, keys - 1, 0.0)
        } else {
            let (t0, t1) = (self.times[next - 1], self.times[next]);
            let span = (t1 - t0).max(f32::EPSILON);
            (next - 1, next, (time - t0) / span)
        };
        let (from, to) = (self.keyframe(a), self.keyframe(b));
        Some(match self.property {
            TrackProperty::Rotation => {
                let from = Quat::from_slice(from).normalize();
                let to = Quat::from_slice(to).normalize();
                Sample::Rotation(from.slerp(to, t))
            }
            TrackProperty::Translation => {
                Sample::Translation(Vec3::from_slice(from).lerp(Vec3::from_slice(to), t))
            }
            TrackProperty::Scale => {
                Sample::Scale(Vec3::from_slice(from).lerp(Vec3::from_slice(to), t))
            }
        })
    }
}

#[derive(Clone, Copy)]
enum Sample {
    Translation(Vec3),
    Rotation(Quat),
    Scale(Vec3),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<Track>,
}

impl AnimationClip {
    /// Clip whose duration is the latest keyframe time of its tracks.
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks
            .iter()
            .flat_map(|track| track.times.iter().copied())
            .fold(0.0, f32::max);
        Self {
            name: name.into(),
            duration,
            tracks,
        }
    }

    /// Writes the clip's pose at `time` into the matching nodes of `root`.
    pub fn apply(&self, root: &mut Object3D, time: f32) {
        for track in &self.tracks {
            let Some(sample) = track.sample(time) else {
                continue;
            };
            root.traverse_mut(&mut |node| {
                if node.name != track.node {
                    return;
                }
                match sample {
                    Sample::Translation(value) => node.transform.position = value,
                    Sample::Scale(value) => node.transform.scale = value,
                    Sample::Rotation(value) => {
                        let (x, y, z) = value.to_euler(EulerRot::XYZ);
                        node.transform.rotation = Vec3::new(x, y, z);
                    }
                }
            });
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    Once,
    #[default]
    Repeat,
}

/// Playback state of one clip on a mixer.
#[derive(Debug, Clone)]
pub struct AnimationAction {
    pub clip: AnimationClip,
    pub time: f32,
    pub time_scale: f32,
    pub loop_mode: LoopMode,
    playing: bool,
}

impl AnimationAction {
    fn new(clip: AnimationClip) -> Self {
        Self {
            clip,
            time: 0.0,
            time_scale: 1.0,
            loop_mode: LoopMode::default(),
            playing: false,
        }
    }

    pub fn play(&mut self) -> &mut Self {
        self.playing = true;
        self
    }

    pub fn stop(&mut self) -> &mut Self {
        self.playing = false;
        self.time = 0.0;
        self
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    fn advance(&mut self, delta: f32) {
        if !self.playing {
            return;
        }
        self.time += delta * self.time_scale;
        let duration = self.clip.duration;
        if duration <= 0.0 {
            self.time = 0.0;
            return;
        }
        match self.loop_mode {
            LoopMode::Repeat => self.time = self.time.rem_euclid(duration),
            LoopMode::Once if self.time >= duration => {
                self.time = duration;
                self.playing = false;
            }
            LoopMode::Once => {}
        }
    }
}

/// Drives animation actions for one registered object.
#[derive(Debug, Clone)]
pub struct AnimationMixer {
    root: String,
    actions: Vec<AnimationAction>,
    time: f32,
}

impl AnimationMixer {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            actions: Vec::new(),
            time: 0.0,
        }
    }

    /// Id of the registered object this mixer animates.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Total time the mixer has been advanced.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Action for `clip`; asking twice for the same clip returns the same action.
    pub fn clip_action(&mut self, clip: &AnimationClip) -> &mut AnimationAction {
        let index = match self
            .actions
            .iter()
            .position(|action| action.clip.name == clip.name)
        {
            Some(index) => index,
            None => {
                self.actions.push(AnimationAction::new(clip.clone()));
                self.actions.len() - 1
            }
        };
        &mut self.actions[index]
    }

    pub fn actions(&self) -> &[AnimationAction] {
        &self.actions
    }

    pub fn stop_all_actions(&mut self) {
        for action in &mut self.actions {
            action.stop();
        }
    }

    /// Advances every playing action and poses `root`.
    pub fn update(&mut self, delta: f32, root: &mut Object3D) {
        self.time += delta;
        for action in &mut self.actions {
            if !action.playing {
                continue;
            }
            action.advance(delta);
            action.clip.apply(root, action.time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide() -> AnimationClip {
        AnimationClip::new(
            "slide",
            vec![Track {
                node: "box".into(),
                property: TrackProperty::Translation,
                times: vec![0.0, 2.0],
                values: vec![0.0, 0.0, 0.0, 4.0, 0.0, 0.0],
            }],
        )
    }

    fn rig() -> Object3D {
        let mut root = Object3D::group("rig");
        root.add(Object3D::group("box"));
        root
    }

    #[test]
    fn duration_is_the_last_keyframe() {
        assert_eq!(slide().duration, 2.0);
        assert_eq!(AnimationClip::new("empty", Vec::new()).duration, 0.0);
    }

    #[test]
    fn mixer_interpolates_and_loops() {
        let mut root = rig();
        let mut mixer = AnimationMixer::new("rig");
        mixer.clip_action(&slide()).play();

        mixer.update(0.5, &mut root);
        assert_eq!(root.children[0].transform.position, Vec3::new(1.0, 0.0, 0.0));

        mixer.update(2.0, &mut root);
        assert!((mixer.actions()[0].time - 0.5).abs() < 1e-6);
        assert_eq!(mixer.time(), 2.5);
    }

    #[test]
    fn once_clamps_and_stops() {
        let mut root = rig();
        let mut mixer = AnimationMixer::new("rig");
        mixer.clip_action(&slide()).play().loop_mode = LoopMode::Once;
        mixer.update(5.0, &mut root);
        assert!(!mixer.actions()[0].is_playing());
        assert_eq!(root.children[0].transform.position, Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn clip_action_is_reused_per_clip() {
        let mut mixer = AnimationMixer::new("rig");
        mixer.clip_action(&slide()).play();
        mixer.clip_action(&slide());
        assert_eq!(mixer.actions().len(), 1);
        assert!(mixer.actions()[0].is_playing());
    }

    #[test]
    fn rotation_tracks_slerp() {
        let clip = AnimationClip::new(
            "turn",
            vec![Track {
                node: "box".into(),
                property: TrackProperty::Rotation,
                times: vec![0.0, 1.0],
                values: Quat::IDENTITY
                    .to_array()
                    .into_iter()
                    .chain(Quat::from_rotation_y(1.0).to_array())
                    .collect(),
            }],
        );
        let mut root = rig();
        clip.apply(&mut root, 0.5);
        assert!((root.children[0].transform.rotation.y - 0.5).abs() < 1e-5);
    }
}
