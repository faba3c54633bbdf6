use std::sync::Arc;

use glam::{Quat, Vec3};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::camera::PerspectiveCamera;
use crate::loader::AudioBuffer;

/// Options accepted by `play_audio` and `play_positional_audio`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioOptions {
    pub volume: f32,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub autoplay: bool,
    pub ref_distance: f32,
    pub max_distance: f32,
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            volume: 1.0,
            looping: false,
            autoplay: true,
            ref_distance: 1.0,
            max_distance: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioKind {
    Global,
    Positional {
        position: Vec3,
        ref_distance: f32,
        max_distance: f32,
    },
}

/// A configured voice: buffer plus playback parameters.
#[derive(Debug, Clone)]
pub struct AudioHandle {
    pub buffer: Arc<AudioBuffer>,
    pub volume: f32,
    pub looping: bool,
    pub kind: AudioKind,
    playing: bool,
}

impl AudioHandle {
    pub fn new(buffer: Arc<AudioBuffer>, kind: AudioKind, options: &AudioOptions) -> Self {
        Self {
            buffer,
            volume: options.volume,
            looping: options.looping,
            kind,
            playing: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> Option<Vec3> {
        match self.kind {
            AudioKind::Positional { position, .. } => Some(position),
            AudioKind::Global => None,
        }
    }

    pub fn set_position(&mut self, value: Vec3) {
        if let AudioKind::Positional { position, .. } = &mut self.kind {
            *position = value;
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioSourceEntry {
    pub id: String,
    pub handle: AudioHandle,
}

impl AudioSourceEntry {
    pub fn is_positional(&self) -> bool {
        matches!(self.handle.kind, AudioKind::Positional { .. })
    }
}

/// Audio output device owned by the host.
pub trait AudioSink: Send {
    fn play(&mut self, id: &str, handle: &AudioHandle);
    fn stop(&mut self, id: &str);

    /// Called every frame with the listener pose.
    fn set_listener(&mut self, _listener: &AudioListener) {}
}

/// Sink for hosts without audio output.
#[derive(Debug, Default)]
pub struct NullAudioSink;

impl AudioSink for NullAudioSink {
    fn play(&mut self, id: &str, handle: &AudioHandle) {
        debug!("audio: {id} would play {}", handle.buffer.path);
    }

    fn stop(&mut self, id: &str) {
        debug!("audio: {id} stopped");
    }
}

/// Ear of the scene; follows the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioListener {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for AudioListener {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

impl AudioListener {
    pub fn follow(&mut self, camera: &PerspectiveCamera) {
        self.position = camera.position;
        self.orientation = camera.orientation;
    }
}

/// Audio sources keyed by id, one entry per id.
#[derive(Debug, Default)]
pub struct AudioRegistry {
    entries: Vec<AudioSourceEntry>,
}

impl AudioRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&AudioSourceEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut AudioSourceEntry> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Updates an existing source instead of creating a duplicate: positional sources
    /// move to `position` and, with `autoplay`, a stopped source resumes.
    pub fn reuse(
        &mut self,
        sink: &mut dyn AudioSink,
        id: &str,
        position: Option<Vec3>,
        autoplay: bool,
    ) -> Option<&AudioHandle> {
        let existing = self.get_mut(id)?;
        if let Some(position) = position {
            existing.handle.set_position(position);
        }
        if autoplay && !existing.handle.playing {
            sink.play(id, &existing.handle);
            existing.handle.playing = true;
        }
        debug!("audio: reusing source {id}");
        Some(&existing.handle)
    }

    /// Registers `handle` under `id`, or reuses the existing source when the id is
    /// taken. Returns true when a new entry was created.
    pub fn insert_or_reuse(
        &mut self,
        sink: &mut dyn AudioSink,
        id: &str,
        mut handle: AudioHandle,
        autoplay: bool,
    ) -> bool {
        if self.reuse(sink, id, handle.position(), autoplay).is_some() {
            return false;
        }
        if autoplay {
            sink.play(id, &handle);
            handle.playing = true;
        }
        self.entries.push(AudioSourceEntry {
            id: id.to_string(),
            handle,
        });
        true
    }

    pub fn stop(&mut self, sink: &mut dyn AudioSink, id: &str) -> bool {
        match self.get_mut(id) {
            Some(entry) if entry.handle.playing => {
                sink.stop(id);
                entry.handle.playing = false;
                true
            }
            _ => false,
        }
    }

    /// Stops and forgets the source. Unknown ids are ignored.
    pub fn remove(&mut self, sink: &mut dyn AudioSink, id: &str) -> Option<AudioSourceEntry> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        let entry = self.entries.remove(index);
        if entry.handle.playing {
            sink.stop(id);
        }
        Some(entry)
    }

    pub fn clear(&mut self, sink: &mut dyn AudioSink) -> Vec<AudioSourceEntry> {
        for entry in &self.entries {
            if entry.handle.playing {
                sink.stop(&entry.id);
            }
        }
        std::mem::take(&mut self.entries)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AudioSourceEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::AudioFormat;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl AudioSink for Recorder {
        fn play(&mut self, id: &str, _handle: &AudioHandle) {
            self.events.push(format!("play {id}"));
        }

        fn stop(&mut self, id: &str) {
            self.events.push(format!("stop {id}"));
        }
    }

    fn buffer() -> Arc<AudioBuffer> {
        Arc::new(AudioBuffer {
            path: "ping.wav".into(),
            format: AudioFormat::Wav,
            bytes: Arc::from(&b"RIFF"[..]),
        })
    }

    fn positional(x: f32) -> AudioHandle {
        AudioHandle::new(
            buffer(),
            AudioKind::Positional {
                position: Vec3::new(x, 0.0, 0.0),
                ref_distance: 1.0,
                max_distance: 100.0,
            },
            &AudioOptions::default(),
        )
    }

    #[test]
    fn options_defaults_and_loop_key() {
        let options: AudioOptions = serde_json::from_str(r#"{"loop": true, "refDistance": 2}"#).unwrap();
        assert!(options.looping);
        assert!(options.autoplay);
        assert_eq!(options.ref_distance, 2.0);
        assert_eq!(options.max_distance, 100.0);
        assert_eq!(options.volume, 1.0);
    }

    #[test]
    fn reusing_an_id_moves_positional_sources() {
        let mut sink = Recorder::default();
        let mut registry = AudioRegistry::new();
        assert!(registry.insert_or_reuse(&mut sink, "bird", positional(1.0), true));
        assert!(!registry.insert_or_reuse(&mut sink, "bird", positional(5.0), true));

        assert_eq!(registry.len(), 1);
        let entry = registry.get("bird").unwrap();
        assert!(entry.is_positional());
        assert_eq!(entry.handle.position(), Some(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(sink.events, vec!["play bird"]);
    }

    #[test]
    fn autoplay_off_keeps_the_source_silent() {
        let mut sink = Recorder::default();
        let mut registry = AudioRegistry::new();
        let handle = AudioHandle::new(buffer(), AudioKind::Global, &AudioOptions::default());
        registry.insert_or_reuse(&mut sink, "music", handle, false);
        assert!(!registry.get("music").unwrap().handle.is_playing());
        assert!(!registry.stop(&mut sink, "music"));
        assert!(sink.events.is_empty());
    }

    #[test]
    fn remove_and_clear_stop_playing_sources() {
        let mut sink = Recorder::default();
        let mut registry = AudioRegistry::new();
        registry.insert_or_reuse(&mut sink, "a", positional(0.0), true);
        registry.insert_or_reuse(&mut sink, "b", positional(0.0), true);
        assert!(registry.remove(&mut sink, "a").is_some());
        assert!(registry.remove(&mut sink, "a").is_none());
        assert_eq!(registry.clear(&mut sink).len(), 1);
        assert_eq!(sink.events, vec!["play a", "play b", "stop a", "stop b"]);
    }

    #[test]
    fn listener_tracks_camera_pose() {
        let mut camera = PerspectiveCamera::default();
        camera.position = Vec3::new(1.0, 2.0, 3.0);
        let mut listener = AudioListener::default();
        listener.follow(&camera);
        assert_eq!(listener.position, camera.position);
    }
}
