//! Headless SC3 runtime: one project, one VM, one scene, stepped a frame at a time.

pub mod error;
pub mod runtime;
pub mod source;

pub use error::RuntimeError;
pub use runtime::{FrameReport, Runtime, RuntimeSources};
pub use source::DirectoryScriptSource;
