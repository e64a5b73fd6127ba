use log::info;

use super::{Exec, HandlerResult, Step};
use crate::thread::WaitCondition;
use crate::vm::Lifecycle;

pub(crate) fn end(_exec: &mut Exec<'_>) -> HandlerResult {
    Ok(Step::Exit)
}

pub(crate) fn yield_now(_exec: &mut Exec<'_>) -> HandlerResult {
    Ok(Step::Yield)
}

pub(crate) fn jump(exec: &mut Exec<'_>) -> HandlerResult {
    let label = exec.expr()?;
    exec.jump(label)?;
    Ok(Step::Next)
}

pub(crate) fn jump_if(exec: &mut Exec<'_>) -> HandlerResult {
    let condition = exec.expr()?;
    let label = exec.expr()?;
    if condition != 0 {
        exec.jump(label)?;
    }
    Ok(Step::Next)
}

pub(crate) fn call(exec: &mut Exec<'_>) -> HandlerResult {
    let label = exec.expr()?;
    let return_pc = if exec.host.options.use_return_ids {
        let id = exec.read_u16()?;
        exec.script.return_address(id)?
    } else {
        exec.pc
    };
    exec.thread.call_stack.push(return_pc)?;
    exec.jump(label)?;
    Ok(Step::Next)
}

pub(crate) fn ret(exec: &mut Exec<'_>) -> HandlerResult {
    exec.pc = exec.thread.call_stack.pop()?;
    Ok(Step::Next)
}

pub(crate) fn wait(exec: &mut Exec<'_>) -> HandlerResult {
    let millis = exec.expr()?;
    Ok(Step::Wait(WaitCondition::Timer {
        remaining: millis.max(0) as f32 / 1000.0,
    }))
}

pub(crate) fn assign(exec: &mut Exec<'_>) -> HandlerResult {
    exec.expr()?;
    Ok(Step::Next)
}

pub(crate) fn thread_create(exec: &mut Exec<'_>) -> HandlerResult {
    let buffer = exec.expr()?;
    let label = exec.expr()?;
    let id = exec.host.spawn(buffer as i64, label)?;
    exec.host.deferred.push(Lifecycle::Spawn(id));
    exec.set_result(id.to_script_handle());
    Ok(Step::Next)
}

pub(crate) fn thread_kill(exec: &mut Exec<'_>) -> HandlerResult {
    let handle = exec.expr()?;
    exec.host.deferred.push(Lifecycle::Kill(handle));
    Ok(Step::Next)
}

pub(crate) fn thread_pause(exec: &mut Exec<'_>) -> HandlerResult {
    let handle = exec.expr()?;
    exec.host.deferred.push(Lifecycle::Pause(handle));
    Ok(Step::Next)
}

pub(crate) fn thread_resume(exec: &mut Exec<'_>) -> HandlerResult {
    let handle = exec.expr()?;
    exec.host.deferred.push(Lifecycle::Resume(handle));
    Ok(Step::Next)
}

pub(crate) fn suspend(_exec: &mut Exec<'_>) -> HandlerResult {
    Ok(Step::Suspend)
}

pub(crate) fn signal_set(exec: &mut Exec<'_>) -> HandlerResult {
    let flag = exec.expr()?;
    exec.globals.set_flag(flag as i64, true)?;
    Ok(Step::Next)
}

pub(crate) fn signal_clear(exec: &mut Exec<'_>) -> HandlerResult {
    let flag = exec.expr()?;
    exec.globals.set_flag(flag as i64, false)?;
    Ok(Step::Next)
}

pub(crate) fn signal_wait(exec: &mut Exec<'_>) -> HandlerResult {
    let flag = exec.expr()?;
    if exec.globals.flag(flag as i64)? {
        return Ok(Step::Next);
    }
    Ok(Step::Wait(WaitCondition::Signal { flag: flag as u32 }))
}

pub(crate) fn script_load(exec: &mut Exec<'_>) -> HandlerResult {
    let buffer = exec.expr()?;
    let script_id = exec.expr()?;
    let loaded = exec.host.load_script_from_source(buffer as i64, script_id)?;
    exec.set_result(loaded as i32);
    Ok(Step::Next)
}

pub(crate) fn debug_print(exec: &mut Exec<'_>) -> HandlerResult {
    let value = exec.expr()?;
    info!("script {} @ {:#x}: {value}", exec.script.id(), exec.pc);
    Ok(Step::Next)
}
