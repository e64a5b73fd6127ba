//! The scheduler. Threads run in creation order, each up to a fixed instruction budget
//! per tick. Lifecycle changes issued by scripts are queued and applied after every
//! thread has had its turn.

use std::sync::Arc;

use log::{debug, error, warn};
use sc3_bridge::SceneBridge;
use sc3_ids::ThreadID;

use crate::arena::ThreadArena;
use crate::cursor::Cursor;
use crate::error::{DecodeError, ExecError, ThreadFault, VmError};
use crate::globals::Globals;
use crate::instructions::{Exec, Step};
use crate::script::{MAX_SCRIPT_BUFFERS, Script, ScriptSource};
use crate::table::{InstructionSet, InstructionTable};
use crate::thread::{ScriptThread, ThreadState, WaitCondition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmOptions {
    pub instruction_set: InstructionSet,
    /// `Call` carries a u16 return-table id instead of returning to the next instruction.
    pub use_return_ids: bool,
    pub instructions_per_tick: u32,
    pub max_threads: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            instruction_set: InstructionSet::Mo6tw,
            use_return_ids: false,
            instructions_per_tick: 1000,
            max_threads: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub executed: u64,
    pub live_threads: usize,
    pub faulted: usize,
}

/// Deferred thread lifecycle request; applied in issue order at the end of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Spawn(ThreadID),
    Kill(i32),
    Pause(i32),
    Resume(i32),
}

/// VM state handlers may reach besides the running thread and globals.
pub(crate) struct Host {
    pub options: VmOptions,
    pub buffers: [Option<Arc<Script>>; MAX_SCRIPT_BUFFERS],
    pub source: Option<Arc<dyn ScriptSource>>,
    pub threads: ThreadArena,
    pub deferred: Vec<Lifecycle>,
}

impl Host {
    fn buffer(&self, buffer: i64) -> Option<(usize, &Arc<Script>)> {
        let index = usize::try_from(buffer).ok()?;
        self.buffers.get(index)?.as_ref().map(|s| (index, s))
    }

    /// Creates a thread at `label` of the script in `buffer`. It is stored right away
    /// but only joins the run order when the caller says so.
    pub fn spawn(&mut self, buffer: i64, label: i32) -> Result<ThreadID, ThreadFault> {
        let (index, script) = self
            .buffer(buffer)
            .ok_or(ThreadFault::NoScript { buffer })?;
        let pc = script.label(label).map_err(|_| ThreadFault::NoLabel {
            buffer: index,
            label,
        })?;
        if self.threads.len() >= self.options.max_threads {
            return Err(ThreadFault::ThreadPoolExhausted {
                max: self.options.max_threads,
            });
        }
        let thread = ScriptThread::new(Arc::clone(script), index, pc);
        Ok(self.threads.insert(thread))
    }

    /// Loads script `id` from the configured source into `buffer`. A missing source or
    /// unreadable file is reported as `false`; a corrupt file is a decode error.
    pub fn load_script_from_source(&mut self, buffer: i64, id: i32) -> Result<bool, DecodeError> {
        let Some(index) = usize::try_from(buffer)
            .ok()
            .filter(|&b| b < MAX_SCRIPT_BUFFERS)
        else {
            warn!("script load into invalid buffer {buffer}");
            return Ok(false);
        };
        let Some(source) = &self.source else {
            warn!("script load of {id} requested but no script source is configured");
            return Ok(false);
        };
        let bytes = match source.read_script(id as u32) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("failed to read script {id}: {err}");
                return Ok(false);
            }
        };
        let script = Script::parse(id as u32, bytes)?;
        debug!("script {id} loaded into buffer {index}");
        self.buffers[index] = Some(Arc::new(script));
        Ok(true)
    }
}

pub struct Vm {
    host: Host,
    globals: Globals,
    table: InstructionTable,
    order: Vec<ThreadID>,
}

impl Vm {
    /// `max_threads` is capped so every live thread keeps a distinct script handle.
    pub fn new(mut options: VmOptions, scripts: Option<Arc<dyn ScriptSource>>) -> Self {
        let handle_limit = ThreadID::MAX_SCRIPT_INDEX as usize;
        if options.max_threads > handle_limit {
            warn!(
                "max_threads {} exceeds the script handle range, capped to {handle_limit}",
                options.max_threads
            );
            options.max_threads = handle_limit;
        }
        Self {
            table: InstructionTable::new(options.instruction_set),
            host: Host {
                options,
                buffers: Default::default(),
                source: scripts,
                threads: ThreadArena::with_capacity(options.max_threads),
                deferred: Vec::new(),
            },
            globals: Globals::new(),
            order: Vec::new(),
        }
    }

    #[inline]
    pub fn options(&self) -> &VmOptions {
        &self.host.options
    }

    #[inline]
    pub fn table(&self) -> &InstructionTable {
        &self.table
    }

    #[inline]
    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    #[inline]
    pub fn globals_mut(&mut self) -> &mut Globals {
        &mut self.globals
    }

    /// Puts `script` into a buffer. Threads already running the old script keep it.
    pub fn load_script(&mut self, buffer: usize, script: Script) -> Option<Arc<Script>> {
        let slot = self.host.buffers.get_mut(buffer)?;
        let script = Arc::new(script);
        *slot = Some(Arc::clone(&script));
        Some(script)
    }

    pub fn load_script_by_id(&mut self, buffer: usize, id: u32) -> Result<bool, DecodeError> {
        self.host.load_script_from_source(buffer as i64, id as i32)
    }

    pub fn script(&self, buffer: usize) -> Option<&Arc<Script>> {
        self.host.buffers.get(buffer)?.as_ref()
    }

    /// Starts a thread immediately; it runs from the next tick.
    pub fn spawn(&mut self, buffer: usize, label: i32) -> Result<ThreadID, ThreadFault> {
        let id = self.host.spawn(buffer as i64, label)?;
        self.order.push(id);
        Ok(id)
    }

    pub fn thread(&self, id: ThreadID) -> Option<&ScriptThread> {
        self.host.threads.get(id)
    }

    /// Live threads in run order.
    #[inline]
    pub fn thread_ids(&self) -> &[ThreadID] {
        &self.order
    }

    #[inline]
    pub fn live_threads(&self) -> usize {
        self.order.len()
    }

    pub fn tick(
        &mut self,
        delta: f32,
        scene: &mut dyn SceneBridge,
    ) -> Result<TickReport, VmError> {
        let mut report = TickReport::default();
        let order = self.order.clone();

        for id in order {
            let Some(mut thread) = self.host.threads.checkout(id) else {
                continue;
            };
            let outcome = self.advance(id, &mut thread, delta, scene, &mut report);
            self.host.threads.checkin(id, thread);
            outcome?;
        }

        self.apply_deferred();
        self.reap();
        report.live_threads = self.order.len();
        Ok(report)
    }

    fn advance(
        &mut self,
        id: ThreadID,
        thread: &mut ScriptThread,
        delta: f32,
        scene: &mut dyn SceneBridge,
        report: &mut TickReport,
    ) -> Result<(), VmError> {
        if thread.paused || !self.poll_wait(thread, delta, scene) {
            return Ok(());
        }

        let budget = self.host.options.instructions_per_tick;
        let mut executed = 0;
        while executed < budget {
            let start = thread.pc;
            let script = Arc::clone(&thread.script);
            if start >= script.code_end() {
                debug!("thread {id} ran off the end of script {}", script.id());
                thread.terminate();
                break;
            }

            let decode = |source| VmError::Decode {
                thread: id,
                pc: start,
                source,
            };
            let opcode = Cursor::new(script.code(), start)
                .read_opcode()
                .map_err(decode)?;
            let entry = self.table.entry(opcode);

            let mut exec = Exec {
                thread: &mut *thread,
                script,
                pc: start + 2,
                opcode,
                name: entry.name,
                globals: &mut self.globals,
                scene: &mut *scene,
                host: &mut self.host,
            };
            let result = (entry.handler)(&mut exec);
            let next_pc = exec.pc;
            executed += 1;

            let step = match result {
                Ok(step) => step,
                Err(ExecError::Decode(source)) => return Err(decode(source)),
                Err(ExecError::Fault(fault)) => {
                    error!("thread {id} faulted at {start:#x} ({}): {fault}", entry.name);
                    thread.terminate();
                    report.faulted += 1;
                    break;
                }
            };

            thread.pc = next_pc;
            match step {
                Step::Next => {}
                Step::Yield => break,
                Step::Wait(condition) => {
                    thread.state = ThreadState::Waiting(condition);
                    break;
                }
                Step::Suspend => {
                    thread.state = ThreadState::Suspended;
                    break;
                }
                Step::Exit => {
                    thread.terminate();
                    break;
                }
            }
        }

        report.executed += executed as u64;
        Ok(())
    }

    /// Re-checks a waiting thread. Returns whether it may run this tick.
    fn poll_wait(&self, thread: &mut ScriptThread, delta: f32, scene: &dyn SceneBridge) -> bool {
        match &mut thread.state {
            ThreadState::Running => true,
            ThreadState::Suspended | ThreadState::Terminated => false,
            ThreadState::Waiting(condition) => {
                let ready = match condition {
                    WaitCondition::Timer { remaining } => {
                        *remaining -= delta;
                        *remaining <= 0.0
                    }
                    WaitCondition::Signal { flag } => {
                        self.globals.flag(*flag as i64).unwrap_or(true)
                    }
                    WaitCondition::Resource { slot } => {
                        let status = scene.slot_status(*slot);
                        if status.is_settled() {
                            thread.result = status.script_code();
                        }
                        status.is_settled()
                    }
                };
                if ready {
                    thread.state = ThreadState::Running;
                }
                ready
            }
        }
    }

    fn apply_deferred(&mut self) {
        for request in std::mem::take(&mut self.host.deferred) {
            match request {
                Lifecycle::Spawn(id) => {
                    if self.host.threads.contains(id) {
                        self.order.push(id);
                    }
                }
                Lifecycle::Kill(handle) => {
                    if let Some(thread) = self.resolve(handle, "kill") {
                        thread.terminate();
                    }
                }
                Lifecycle::Pause(handle) => {
                    if let Some(thread) = self.resolve(handle, "pause") {
                        thread.paused = true;
                    }
                }
                Lifecycle::Resume(handle) => {
                    if let Some(thread) = self.resolve(handle, "resume") {
                        thread.paused = false;
                        if thread.state == ThreadState::Suspended {
                            thread.state = ThreadState::Running;
                        }
                    }
                }
            }
        }
    }

    fn resolve(&mut self, handle: i32, action: &str) -> Option<&mut ScriptThread> {
        let thread = self
            .host
            .threads
            .resolve_script_handle(handle)
            .and_then(|id| self.host.threads.get_mut(id));
        if thread.is_none() {
            warn!("{action} of stale thread handle {handle:#x} ignored");
        }
        thread
    }

    fn reap(&mut self) {
        let threads = &mut self.host.threads;
        self.order.retain(|&id| {
            let finished = threads.get(id).is_none_or(ScriptThread::is_terminated);
            if finished {
                threads.remove(id);
            }
            !finished
        });
    }
}
