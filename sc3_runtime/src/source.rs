use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sc3_vm::ScriptSource;

/// Compiled scripts on disk at `<root>/script/<id>.scx`.
#[derive(Debug, Clone)]
pub struct DirectoryScriptSource {
    root: PathBuf,
}

impl DirectoryScriptSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: u32) -> PathBuf {
        self.root.join("script").join(format!("{id}.scx"))
    }
}

impl ScriptSource for DirectoryScriptSource {
    fn read_script(&self, id: u32) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(id))
    }
}
