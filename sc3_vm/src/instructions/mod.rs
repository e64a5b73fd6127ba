//! Instruction handlers. Each handler consumes its own operands through [`Exec`].

pub(crate) mod control;
pub(crate) mod graphics3d;
pub(crate) mod scene;

use std::sync::Arc;

use log::{Level, debug, log_enabled, warn};
use sc3_bridge::SceneBridge;

use crate::cursor::Cursor;
use crate::error::{DecodeError, ExecError};
use crate::expression::{self, ExprScope};
use crate::globals::Globals;
use crate::script::Script;
use crate::thread::{ScriptThread, WaitCondition};
use crate::vm::Host;

pub const STUB_TARGET: &str = "sc3_vm::stub";

/// How the thread proceeds after an instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Step {
    Next,
    Yield,
    Wait(WaitCondition),
    Suspend,
    Exit,
}

pub(crate) type HandlerResult = Result<Step, ExecError>;

/// Everything one instruction may touch.
pub(crate) struct Exec<'a> {
    pub thread: &'a mut ScriptThread,
    pub script: Arc<Script>,
    /// Next byte to read; becomes the thread's pc when the handler returns.
    pub pc: usize,
    pub opcode: u16,
    pub name: &'static str,
    pub globals: &'a mut Globals,
    pub scene: &'a mut dyn SceneBridge,
    pub host: &'a mut Host,
}

impl Exec<'_> {
    pub fn expr(&mut self) -> Result<i32, DecodeError> {
        let mut cursor = Cursor::new(self.script.code(), self.pc);
        let mut scope = ExprScope {
            globals: &mut *self.globals,
            locals: &mut self.thread.locals,
            result: self.thread.result,
        };
        let value = expression::evaluate(&mut cursor, &mut scope)?;
        self.pc = cursor.position();
        Ok(value)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let mut cursor = Cursor::new(self.script.code(), self.pc);
        let value = cursor.read_u8()?;
        self.pc = cursor.position();
        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let mut cursor = Cursor::new(self.script.code(), self.pc);
        let value = cursor.read_u16()?;
        self.pc = cursor.position();
        Ok(value)
    }

    pub fn jump(&mut self, label: i32) -> Result<(), DecodeError> {
        self.pc = self.script.label(label)?;
        Ok(())
    }

    #[inline]
    pub fn set_result(&mut self, value: i32) {
        self.thread.result = value;
    }

    /// Logs a stubbed instruction with its decoded operands.
    pub fn stub(&self, operands: &[(&str, i32)]) {
        if log_enabled!(target: STUB_TARGET, Level::Warn) {
            warn!(
                target: STUB_TARGET,
                "STUB instruction {}({})",
                self.name,
                format_operands(operands)
            );
        }
    }

    /// Debug trace for implemented instructions whose operands are only partly understood.
    pub fn trace(&self, operands: &[(&str, i32)]) {
        if log_enabled!(target: STUB_TARGET, Level::Debug) {
            debug!(
                target: STUB_TARGET,
                "{}({})",
                self.name,
                format_operands(operands)
            );
        }
    }
}

fn format_operands(operands: &[(&str, i32)]) -> String {
    operands
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Confirmed no-op.
pub(crate) fn empty(_exec: &mut Exec<'_>) -> HandlerResult {
    Ok(Step::Next)
}

/// Anything not in the table. Skips only the opcode bytes.
pub(crate) fn unknown(exec: &mut Exec<'_>) -> HandlerResult {
    warn!(
        target: STUB_TARGET,
        "STUB unknown instruction {:04X} at {:#x} in script {}",
        exec.opcode,
        exec.pc - 2,
        exec.script.id()
    );
    Ok(Step::Next)
}
