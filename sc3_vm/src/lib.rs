//! SC3 script virtual machine: inline expression evaluation, opcode dispatch,
//! cooperative script threads and their scheduler.

mod arena;
pub mod cursor;
pub mod error;
pub mod expression;
pub mod globals;
mod instructions;
pub mod opcode;
pub mod script;
pub mod table;
pub mod thread;
pub mod vm;

#[cfg(test)]
mod testing;

pub use arena::ThreadArena;
pub use error::{DecodeError, ThreadFault, VmError};
pub use expression::{EXPR_STACK_DEPTH, ExprScope, THREAD_LOCAL_COUNT, evaluate, evaluate_at};
pub use globals::{FLAG_COUNT, GLOBAL_WORK_COUNT, Globals};
pub use instructions::STUB_TARGET;
pub use script::{MAX_SCRIPT_BUFFERS, SCRIPT_MAGIC, Script, ScriptSource};
pub use table::{InstructionSet, InstructionTable, OpcodeKind};
pub use thread::{CALL_STACK_DEPTH, CallStack, ScriptThread, ThreadState, WaitCondition};
pub use vm::{TickReport, Vm, VmOptions};
