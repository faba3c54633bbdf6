//! Asset loaders. Every load runs on a worker thread and settles a one-shot
//! future exactly once.

mod audio;
mod font;
mod gltf;
mod obj;
mod texture;

use std::collections::HashMap;
use std::fs::File;
use std::future::Future;
use std::io::Read;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;

use futures::channel::oneshot;
use futures::FutureExt;
use log::{debug, error, info};
use parking_lot::RwLock;

use crate::animation::AnimationClip;
use crate::error::LoadError;
use crate::object::Object3D;

pub use self::audio::{AudioBuffer, AudioFormat};
pub use self::font::{Font, FontBounds, Glyph};
pub use self::gltf::decode_gltf;
pub use self::obj::{decode_obj, parse_obj, ObjMesh};
pub use self::texture::{decode_hdr, decode_texture, ColorSpace, Texels, Texture, TextureMapping};

const READ_CHUNK: usize = 64 * 1024;

/// Loaded model: the scene graph subtree plus any animation clips it carries.
#[derive(Debug, Clone)]
pub struct Model {
    pub root: Object3D,
    pub animations: Vec<AnimationClip>,
}

/// External storage the loaders read from. Paths are passed through unmodified.
pub trait AssetSource: Send + Sync {
    /// Reads the whole asset, reporting `(loaded, total)` bytes along the way.
    fn read(&self, path: &str, progress: &mut dyn FnMut(u64, u64)) -> Result<Vec<u8>, LoadError>;
}

/// Reads assets from the local file system, optionally below a root directory.
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    root: Option<PathBuf>,
}

impl FileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path),
            None => PathBuf::from(path),
        }
    }
}

impl AssetSource for FileSource {
    fn read(&self, path: &str, progress: &mut dyn FnMut(u64, u64)) -> Result<Vec<u8>, LoadError> {
        let resolved = self.resolve(path);
        let mut file = File::open(&resolved).map_err(|err| LoadError::read_failed(path, err))?;
        let total = file
            .metadata()
            .map(|meta| meta.len())
            .map_err(|err| LoadError::read_failed(path, err))?;
        let mut data = Vec::with_capacity(total as usize);
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            let read = file
                .read(&mut chunk)
                .map_err(|err| LoadError::read_failed(path, err))?;
            if read == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..read]);
            progress(data.len() as u64, total);
        }
        Ok(data)
    }
}

/// In-memory assets, for hosts that fetch bytes themselves and for tests.
#[derive(Debug, Default)]
pub struct MemorySource {
    files: RwLock<HashMap<String, Arc<[u8]>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        let data: Arc<[u8]> = Arc::from(data.into().into_boxed_slice());
        self.files.write().insert(path.into(), data);
    }
}

impl AssetSource for MemorySource {
    fn read(&self, path: &str, progress: &mut dyn FnMut(u64, u64)) -> Result<Vec<u8>, LoadError> {
        let data = self
            .files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::read_failed(path, "no such asset"))?;
        progress(data.len() as u64, data.len() as u64);
        Ok(data.to_vec())
    }
}

/// Tracks how many loads have been started and finished, logging overall progress.
#[derive(Debug, Default)]
pub struct LoadingManager {
    started: AtomicUsize,
    finished: AtomicUsize,
}

impl LoadingManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn item_start(&self, path: &str) {
        self.started.fetch_add(1, Ordering::AcqRel);
        debug!("loading {path}");
    }

    fn item_end(&self, path: &str) {
        let finished = self.finished.fetch_add(1, Ordering::AcqRel) + 1;
        let started = self.started.load(Ordering::Acquire).max(finished);
        info!(
            "Loading: {}% ({path})",
            (finished as f32 / started as f32 * 100.0).round()
        );
    }

    pub fn pending(&self) -> usize {
        self.started
            .load(Ordering::Acquire)
            .saturating_sub(self.finished.load(Ordering::Acquire))
    }
}

/// Keeps one load counted as pending until dropped.
struct PendingLoad {
    manager: Arc<LoadingManager>,
    path: String,
}

impl PendingLoad {
    fn start(manager: Arc<LoadingManager>, path: &str) -> Self {
        manager.item_start(path);
        Self {
            manager,
            path: path.to_string(),
        }
    }
}

impl Drop for PendingLoad {
    fn drop(&mut self) {
        self.manager.item_end(&self.path);
    }
}

/// One-shot future settled by a loader thread.
///
/// Resolves with the asset or rejects with a [`LoadError`], exactly once.
#[must_use = "a load does nothing useful unless awaited"]
pub struct Load<T> {
    path: String,
    receiver: oneshot::Receiver<Result<T, LoadError>>,
}

impl<T> Load<T> {
    /// A load that has already failed, without touching the source.
    pub fn rejected(err: LoadError) -> Self {
        let (sender, receiver) = oneshot::channel();
        let path = err.path().to_string();
        let _ = sender.send(Err(err));
        Self { path, receiver }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl<T> Future for Load<T> {
    type Output = Result<T, LoadError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.receiver.poll_unpin(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(LoadError::Interrupted {
                path: self.path.clone(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Front end for all asset loads. Nothing is cached: every call starts a new load.
#[derive(Clone)]
pub struct AssetLoader {
    source: Arc<dyn AssetSource>,
    manager: Arc<LoadingManager>,
}

impl AssetLoader {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            manager: Arc::new(LoadingManager::new()),
        }
    }

    pub fn manager(&self) -> &LoadingManager {
        &self.manager
    }

    /// Reads `path` on a worker thread and hands the bytes to `decode`.
    pub fn spawn<T, F>(&self, path: &str, decode: F) -> Load<T>
    where
        T: Send + 'static,
        F: FnOnce(&str, Vec<u8>) -> Result<T, LoadError> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let source = Arc::clone(&self.source);
        let pending = PendingLoad::start(Arc::clone(&self.manager), path);

        let worker = thread::Builder::new()
            .name(format!("load:{path}"))
            .spawn(move || {
                // Unwinding drops `pending` before `sender`.
                let sender = sender;
                let pending = pending;
                let path = pending.path.clone();
                let mut on_progress = |loaded: u64, total: u64| {
                    if total > 0 {
                        debug!("{path}: {}% loaded", loaded as f64 / total as f64 * 100.0);
                    }
                };
                let result = source
                    .read(&path, &mut on_progress)
                    .and_then(|bytes| decode(&path, bytes));
                if let Err(err) = &result {
                    error!("Error loading {path}: {err}");
                }
                drop(pending);
                let _ = sender.send(result);
            });
        // A failed spawn drops the closure, which ends the item and cancels the load.
        if let Err(err) = worker {
            error!("unable to start loader thread for {path}: {err}");
        }

        Load {
            path: path.to_string(),
            receiver,
        }
    }

    /// Colour texture tagged as sRGB.
    pub fn load_texture(&self, path: &str) -> Load<Texture> {
        self.spawn(path, |path, bytes| decode_texture(path, &bytes))
    }

    /// High dynamic range environment map with equirectangular reflection mapping.
    pub fn load_hdr(&self, path: &str) -> Load<Texture> {
        self.spawn(path, |path, bytes| decode_hdr(path, &bytes))
    }

    pub fn load_gltf(&self, path: &str) -> Load<Model> {
        self.spawn(path, |path, bytes| decode_gltf(path, &bytes))
    }

    pub fn load_obj(&self, path: &str) -> Load<Model> {
        self.spawn(path, |path, bytes| decode_obj(path, &bytes))
    }

    /// Picks the model loader from the file extension. FBX files are rejected
    /// up front.
    pub fn load_model(&self, path: &str) -> Load<Model> {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".obj") {
            self.load_obj(path)
        } else if lower.ends_with(".fbx") {
            Load::rejected(LoadError::Unsupported {
                path: path.to_string(),
                format: "FBX".into(),
            })
        } else {
            self.load_gltf(path)
        }
    }

    /// Typeface JSON font for [`create_text`](crate::primitives::create_text).
    pub fn load_font(&self, path: &str) -> Load<Font> {
        self.spawn(path, |path, bytes| Font::from_json(path, &bytes))
    }

    pub fn load_audio(&self, path: &str) -> Load<AudioBuffer> {
        self.spawn(path, |path, bytes| AudioBuffer::decode(path, bytes))
    }
}
