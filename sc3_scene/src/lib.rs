pub mod coordinator;
pub mod error;
pub mod scene;
pub mod source;

pub use coordinator::{Background3D, LoadCoordinator, LoadedResource, LoaderWorkers, PumpReport};
pub use error::{LoadError, SceneError};
pub use scene::{CHARACTER_BUFFER_COUNT, CharacterInstance, Scene};
pub use source::{AssetSource, DirectorySource, MemorySource};
