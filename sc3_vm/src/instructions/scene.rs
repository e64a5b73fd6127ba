use log::warn;
use sc3_bridge::{ResourceCategory, SlotKey};

use super::{Exec, HandlerResult, Step};
use crate::thread::WaitCondition;

pub(crate) fn bg_load(exec: &mut Exec<'_>) -> HandlerResult {
    let background = exec.expr()?;
    exec.scene.request_load(SlotKey::BACKGROUND, background as u32);
    Ok(Step::Next)
}

pub(crate) fn bg_release(exec: &mut Exec<'_>) -> HandlerResult {
    exec.scene.release(SlotKey::BACKGROUND);
    Ok(Step::Next)
}

/// Blocks until the slot settles, then leaves its status code in the result register.
pub(crate) fn load_wait(exec: &mut Exec<'_>) -> HandlerResult {
    let category = exec.read_u8()?;
    let index = exec.expr()?;
    let Some(category) = ResourceCategory::from_script(category) else {
        warn!("load wait on unknown resource category {category}");
        exec.set_result(0);
        return Ok(Step::Next);
    };

    let slot = SlotKey::new(category, index as u32);
    let status = exec.scene.slot_status(slot);
    if status.is_settled() {
        exec.set_result(status.script_code());
        return Ok(Step::Next);
    }
    Ok(Step::Wait(WaitCondition::Resource { slot }))
}
