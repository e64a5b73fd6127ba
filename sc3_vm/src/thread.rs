use std::sync::Arc;

use sc3_bridge::SlotKey;

use crate::error::ThreadFault;
use crate::expression::THREAD_LOCAL_COUNT;
use crate::script::Script;

pub const CALL_STACK_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitCondition {
    /// Seconds left.
    Timer { remaining: f32 },
    Signal { flag: u32 },
    /// Until the slot is no longer `Loading`; the status code lands in the result register.
    Resource { slot: SlotKey },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ThreadState {
    #[default]
    Running,
    Waiting(WaitCondition),
    Suspended,
    Terminated,
}

#[derive(Debug, Clone, Default)]
pub struct CallStack {
    frames: [u32; CALL_STACK_DEPTH],
    len: usize,
}

impl CallStack {
    pub fn push(&mut self, return_pc: usize) -> Result<(), ThreadFault> {
        let slot = self
            .frames
            .get_mut(self.len)
            .ok_or(ThreadFault::CallStackOverflow {
                depth: CALL_STACK_DEPTH,
            })?;
        *slot = return_pc as u32;
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<usize, ThreadFault> {
        if self.len == 0 {
            return Err(ThreadFault::CallStackUnderflow);
        }
        self.len -= 1;
        Ok(self.frames[self.len] as usize)
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.len
    }
}

/// One cooperative execution context. Owns its cursor position, locals and call stack;
/// shares the script bytes.
#[derive(Debug, Clone)]
pub struct ScriptThread {
    pub(crate) script: Arc<Script>,
    pub(crate) buffer: usize,
    pub(crate) pc: usize,
    pub(crate) call_stack: CallStack,
    pub(crate) locals: [i32; THREAD_LOCAL_COUNT],
    pub(crate) result: i32,
    pub(crate) state: ThreadState,
    pub(crate) paused: bool,
}

impl ScriptThread {
    pub fn new(script: Arc<Script>, buffer: usize, pc: usize) -> Self {
        Self {
            script,
            buffer,
            pc,
            call_stack: CallStack::default(),
            locals: [0; THREAD_LOCAL_COUNT],
            result: 0,
            state: ThreadState::Running,
            paused: false,
        }
    }

    #[inline]
    pub fn script(&self) -> &Arc<Script> {
        &self.script
    }

    #[inline]
    pub fn buffer(&self) -> usize {
        self.buffer
    }

    #[inline]
    pub fn pc(&self) -> usize {
        self.pc
    }

    #[inline]
    pub fn state(&self) -> ThreadState {
        self.state
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn result(&self) -> i32 {
        self.result
    }

    #[inline]
    pub fn locals(&self) -> &[i32; THREAD_LOCAL_COUNT] {
        &self.locals
    }

    #[inline]
    pub fn call_depth(&self) -> usize {
        self.call_stack.depth()
    }

    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.state == ThreadState::Terminated
    }

    pub(crate) fn terminate(&mut self) {
        self.state = ThreadState::Terminated;
    }
}
