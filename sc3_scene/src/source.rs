use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use sc3_bridge::ResourceCategory;

/// Where raw asset bytes come from. Called from loader worker threads.
pub trait AssetSource: Send + Sync {
    fn read(&self, category: ResourceCategory, asset_id: u32) -> io::Result<Vec<u8>>;
}

/// Loose files on disk: `<root>/bg/<id>.mdl` and `<root>/chara/<id>.mdl`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, category: ResourceCategory, asset_id: u32) -> PathBuf {
        let dir = match category {
            ResourceCategory::Background => "bg",
            ResourceCategory::Character => "chara",
        };
        self.root.join(dir).join(format!("{asset_id}.mdl"))
    }
}

impl AssetSource for DirectorySource {
    fn read(&self, category: ResourceCategory, asset_id: u32) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(category, asset_id))
    }
}

/// In-memory assets, filled up front.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    files: AHashMap<(ResourceCategory, u32), Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: ResourceCategory, asset_id: u32, bytes: Vec<u8>) {
        self.files.insert((category, asset_id), bytes);
    }

    pub fn with(mut self, category: ResourceCategory, asset_id: u32, bytes: Vec<u8>) -> Self {
        self.insert(category, asset_id, bytes);
        self
    }
}

impl AssetSource for MemorySource {
    fn read(&self, category: ResourceCategory, asset_id: u32) -> io::Result<Vec<u8>> {
        self.files
            .get(&(category, asset_id))
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no {} asset {asset_id}", category.name()),
                )
            })
    }
}
