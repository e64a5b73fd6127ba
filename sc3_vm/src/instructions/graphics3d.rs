//! 3D character instructions. Several are only partly understood and stay stubs.

use log::warn;
use sc3_bridge::SlotKey;

use super::{Exec, HandlerResult, Step};

fn animation_id(exec: &Exec<'_>, buffer: i32, animation: i32) -> Option<u16> {
    let id = u16::try_from(animation).ok();
    if id.is_none() {
        warn!(
            "{} on buffer {buffer}: animation {animation} out of range, ignored",
            exec.name
        );
    }
    id
}

pub(crate) fn cha_load_3d(exec: &mut Exec<'_>) -> HandlerResult {
    let buffer = exec.expr()?;
    let unk01 = exec.expr()?;
    let model = exec.expr()?;
    exec.trace(&[("bufferId", buffer), ("unk01", unk01), ("modelId", model)]);
    exec.scene
        .request_load(SlotKey::character(buffer as u32), model as u32);
    Ok(Step::Next)
}

pub(crate) fn cha_release_3d(exec: &mut Exec<'_>) -> HandlerResult {
    let buffer = exec.expr()?;
    exec.scene.release(SlotKey::character(buffer as u32));
    Ok(Step::Next)
}

pub(crate) fn cha_play_anim_3d_maybe(exec: &mut Exec<'_>) -> HandlerResult {
    let buffer = exec.expr()?;
    let animation = exec.expr()?;
    let mode = exec.read_u8()?;
    exec.trace(&[
        ("bufferId", buffer),
        ("animationId", animation),
        ("unk01", mode as i32),
    ]);
    if let Some(animation) = animation_id(exec, buffer, animation) {
        exec.scene.play_animation(buffer as u32, animation, mode);
    }
    Ok(Step::Next)
}

pub(crate) fn cha_unk_0207_3d(exec: &mut Exec<'_>) -> HandlerResult {
    let buffer = exec.expr()?;
    let unk01 = exec.read_u8()?;
    exec.stub(&[("bufferId", buffer), ("unk01", unk01 as i32)]);
    Ok(Step::Next)
}

pub(crate) fn unk_0208(exec: &mut Exec<'_>) -> HandlerResult {
    let mut args = [0; 5];
    for arg in &mut args {
        *arg = exec.expr()?;
    }
    exec.stub(&[
        ("arg1", args[0]),
        ("arg2", args[1]),
        ("arg3", args[2]),
        ("arg4", args[3]),
        ("arg5", args[4]),
    ]);
    Ok(Step::Next)
}

pub(crate) fn cha_set_anim_3d(exec: &mut Exec<'_>) -> HandlerResult {
    let buffer = exec.expr()?;
    let animation = exec.expr()?;
    exec.trace(&[("bufferId", buffer), ("animationId", animation)]);
    if let Some(animation) = animation_id(exec, buffer, animation) {
        exec.scene.set_animation(buffer as u32, animation);
    }
    Ok(Step::Next)
}

pub(crate) fn unk_0219(exec: &mut Exec<'_>) -> HandlerResult {
    let buffer = exec.expr()?;
    exec.stub(&[("bufferId", buffer)]);
    Ok(Step::Next)
}
