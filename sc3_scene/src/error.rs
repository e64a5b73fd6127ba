use std::io;

use sc3_assets::AssetError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("failed to start loader pool: {0}")]
    LoaderPool(#[from] rayon::ThreadPoolBuildError),
}

/// Why a single resource load ended in `Failed`.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("asset read failed: {0}")]
    Io(#[from] io::Error),

    #[error("asset decode failed: {0}")]
    Asset(#[from] AssetError),
}
