use thiserror::Error;

/// Reasons a loader future can reject with.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("unable to read {path}: {message}")]
    Source { path: String, message: String },
    #[error("unable to decode {path}: {message}")]
    Decode { path: String, message: String },
    #[error("no animations found in model {path}")]
    NoAnimations { path: String },
    #[error("model {path} has {available} animation(s), clip {index} requested")]
    MissingClip {
        path: String,
        index: usize,
        available: usize,
    },
    #[error("loader for {path} stopped before settling")]
    Interrupted { path: String },
    #[error("{path}: {format} assets are not supported")]
    Unsupported { path: String, format: String },
}

impl LoadError {
    pub fn read_failed(path: &str, err: impl std::fmt::Display) -> Self {
        Self::Source {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    pub fn decode_failed(path: &str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            path: path.to_string(),
            message: format!("{err:#}"),
        }
    }

    /// Path of the asset whose load failed.
    pub fn path(&self) -> &str {
        match self {
            Self::Source { path, .. }
            | Self::Decode { path, .. }
            | Self::NoAnimations { path }
            | Self::MissingClip { path, .. }
            | Self::Interrupted { path }
            | Self::Unsupported { path, .. } => path,
        }
    }
}

/// Failures reported by the object and audio registries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("an object with id `{0}` is already registered")]
    DuplicateId(String),
}

/// Failures of runtime operations that load an asset and then register it.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_reports_its_path() {
        let err = LoadError::read_failed("assets/missing.png", "file not found");
        assert_eq!(err.path(), "assets/missing.png");
        assert_eq!(
            err.to_string(),
            "unable to read assets/missing.png: file not found"
        );
    }

    #[test]
    fn missing_clip_message_names_the_index() {
        let err = LoadError::MissingClip {
            path: "walk.gltf".into(),
            index: 3,
            available: 1,
        };
        assert!(err.to_string().contains("clip 3"));
    }
}
