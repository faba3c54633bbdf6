//! Core of a 3D scene runtime.
//!
//! The crate keeps track of the objects, audio sources and animation mixers that
//! make up a scene, drives them once per frame from a tick source, and hands the
//! result to a renderer through an optional post-processing pipeline. Drawing,
//! input capture and audio output stay with the host behind the [`Renderer`],
//! [`InputSurface`] and [`AudioSink`] traits, so the whole runtime can run
//! headless in tools and tests.

pub mod animation;
pub mod app;
pub mod audio;
pub mod camera;
pub mod config;
pub mod controls;
pub mod error;
pub mod frame_loop;
pub mod input;
pub mod loader;
pub mod manifest;
pub mod object;
pub mod primitives;
pub mod raycast;
pub mod registry;
pub mod render;
pub mod runtime;
pub mod scene;
mod xml;

pub use animation::{AnimationAction, AnimationClip, AnimationMixer, LoopMode};
pub use audio::{AudioHandle, AudioOptions, AudioSink, NullAudioSink};
pub use camera::PerspectiveCamera;
pub use config::{CameraConfig, RuntimeConfig};
pub use controls::{BindingId, Control, ControlKind, ControlSelector, InputSurface};
pub use error::{LoadError, RegistryError, RuntimeError};
pub use frame_loop::{FrameErrorPolicy, FrameLoop, LoopHandle, ManualTicks, PacedTicks, TickSource};
pub use input::InputState;
pub use loader::{AssetLoader, AssetSource, FileSource, Font, Load, MemorySource, Model, Texture};
pub use manifest::SceneManifest;
pub use object::{Color, Object3D};
pub use primitives::{PrimitiveOptions, TextOptions};
pub use registry::{FrameContext, ObjectRegistry};
pub use render::{Pass, Pipeline, Renderer, ShaderPass, Viewport};
pub use runtime::{RuntimeBuilder, SceneRuntime};
pub use scene::Scene;
