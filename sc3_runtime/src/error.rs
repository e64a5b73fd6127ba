use sc3_project::ProjectError;
use sc3_scene::SceneError;
use sc3_vm::{DecodeError, ThreadFault, VmError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("project: {0}")]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Vm(#[from] VmError),

    #[error("unknown instruction set `{0}`")]
    UnknownInstructionSet(String),

    #[error("start script buffer {buffer} is out of range (max {max})")]
    StartBuffer { buffer: u32, max: usize },

    #[error("start script {id} could not be read")]
    StartScriptMissing { id: u32 },

    #[error("start script {id} is malformed: {source}")]
    StartScript {
        id: u32,
        #[source]
        source: DecodeError,
    },

    #[error("start thread could not be created: {0}")]
    StartThread(#[from] ThreadFault),
}
