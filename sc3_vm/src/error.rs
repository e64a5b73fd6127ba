use sc3_ids::ThreadID;
use thiserror::Error;

/// Malformed script data. Always fatal: the VM state can no longer be trusted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("read of {needed} bytes at offset {offset} runs past end of stream ({len} bytes)")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("unknown expression token {byte:#04x} at offset {offset}")]
    UnknownToken { offset: usize, byte: u8 },

    #[error("expression stack overflow at offset {offset}")]
    StackOverflow { offset: usize },

    #[error("expression stack underflow at offset {offset}")]
    StackUnderflow { offset: usize },

    #[error("expression ended at offset {offset} with {depth} values on the stack")]
    Unbalanced { offset: usize, depth: usize },

    #[error("{bank} index {index} out of range")]
    VariableOutOfRange { bank: &'static str, index: i64 },

    #[error("{table} {index} out of range ({count} entries)")]
    LabelOutOfRange {
        table: &'static str,
        index: i64,
        count: usize,
    },

    #[error("script {script}: bad header ({reason})")]
    BadHeader { script: u32, reason: &'static str },
}

/// A content-level failure confined to one thread. The thread is terminated;
/// the scheduler and every other thread keep running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThreadFault {
    #[error("call stack overflow (depth {depth})")]
    CallStackOverflow { depth: usize },

    #[error("return with an empty call stack")]
    CallStackUnderflow,

    #[error("thread pool exhausted ({max} threads)")]
    ThreadPoolExhausted { max: usize },

    #[error("no script loaded in buffer {buffer}")]
    NoScript { buffer: i64 },

    #[error("script in buffer {buffer} has no label {label}")]
    NoLabel { buffer: usize, label: i32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("thread {thread} at pc {pc:#x}: {source}")]
    Decode {
        thread: ThreadID,
        pc: usize,
        #[source]
        source: DecodeError,
    },
}

/// What a handler can fail with.
#[derive(Debug)]
pub(crate) enum ExecError {
    Decode(DecodeError),
    Fault(ThreadFault),
}

impl From<DecodeError> for ExecError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

impl From<ThreadFault> for ExecError {
    fn from(err: ThreadFault) -> Self {
        Self::Fault(err)
    }
}
