//! Test helpers: a tiny script assembler and a scene that records intents.

use ahash::AHashMap;
use sc3_bridge::{LoadStatus, SceneBridge, SlotKey};
use sc3_ids::LoadHandle;

use crate::expression::token;
use crate::script::Script;

#[derive(Default)]
pub(crate) struct Asm {
    code: Vec<u8>,
    labels: Vec<Option<u32>>,
}

impl Asm {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.code.len()
    }

    /// New label at the current position.
    pub fn label(&mut self) -> i32 {
        self.labels.push(Some(self.code.len() as u32));
        self.labels.len() as i32 - 1
    }

    /// New label placed later with [`Asm::place`].
    pub fn forward(&mut self) -> i32 {
        self.labels.push(None);
        self.labels.len() as i32 - 1
    }

    pub fn place(&mut self, label: i32) {
        self.labels[label as usize] = Some(self.code.len() as u32);
    }

    pub fn op(&mut self, opcode: u16) -> &mut Self {
        self.code.extend_from_slice(&opcode.to_be_bytes());
        self
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.code.push(value);
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.code.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// A constant expression.
    pub fn imm(&mut self, value: i32) -> &mut Self {
        push_imm(&mut self.code, value);
        self.code.push(token::END);
        self
    }

    /// Raw expression tokens; the `End` token is appended.
    pub fn expr(&mut self, tokens: &[u8]) -> &mut Self {
        self.code.extend_from_slice(tokens);
        self.code.push(token::END);
        self
    }

    pub fn build(&self, id: u32) -> Script {
        self.build_with_returns(id, &[])
    }

    pub fn build_with_returns(&self, id: u32, return_addresses: &[u32]) -> Script {
        let labels: Vec<u32> = self
            .labels
            .iter()
            .map(|l| l.expect("label never placed"))
            .collect();
        Script::build(id, &self.code, &labels, return_addresses)
    }
}

pub(crate) fn push_imm(out: &mut Vec<u8>, value: i32) {
    match value {
        0..=0x7F => out.push(token::SMALL_IMM | value as u8),
        -128..=127 => out.extend_from_slice(&[token::IMM_I8, value as u8]),
        -32768..=32767 => {
            out.push(token::IMM_I16);
            out.extend_from_slice(&(value as i16).to_le_bytes());
        }
        _ => {
            out.push(token::IMM_I32);
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
}

/// `global[index] = value` as expression tokens (without `End`).
pub(crate) fn store_global(index: u16, value: i32) -> Vec<u8> {
    let mut out = Vec::new();
    push_imm(&mut out, value);
    out.push(token::STORE_GLOBAL);
    out.extend_from_slice(&index.to_le_bytes());
    out
}

/// `global[index] += 1` as expression tokens (without `End`).
pub(crate) fn increment_global(index: u16) -> Vec<u8> {
    let [lo, hi] = index.to_le_bytes();
    vec![
        token::LOAD_GLOBAL,
        lo,
        hi,
        token::SMALL_IMM | 1,
        token::ADD,
        token::STORE_GLOBAL,
        lo,
        hi,
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Intent {
    Load(SlotKey, u32),
    Release(SlotKey),
    Play(u32, u16, u8),
    Set(u32, u16),
}

#[derive(Debug, Default)]
struct TestSlot {
    generation: u32,
    status: LoadStatus,
}

/// Loads finish only when the test says so.
#[derive(Debug, Default)]
pub(crate) struct TestScene {
    slots: AHashMap<SlotKey, TestSlot>,
    pub intents: Vec<Intent>,
}

impl TestScene {
    /// Completes one specific request; stale handles are ignored.
    pub fn complete(&mut self, handle: LoadHandle, status: LoadStatus) -> bool {
        let Some(slot) = SlotKey::of_handle(handle) else {
            return false;
        };
        match self.slots.get_mut(&slot) {
            Some(state)
                if state.generation == handle.generation()
                    && state.status == LoadStatus::Loading =>
            {
                state.status = status;
                true
            }
            _ => false,
        }
    }
}

impl SceneBridge for TestScene {
    fn request_load(&mut self, slot: SlotKey, asset_id: u32) -> LoadHandle {
        self.intents.push(Intent::Load(slot, asset_id));
        let state = self.slots.entry(slot).or_default();
        state.generation += 1;
        state.status = LoadStatus::Loading;
        slot.handle(state.generation)
    }

    fn release(&mut self, slot: SlotKey) {
        self.intents.push(Intent::Release(slot));
        if let Some(state) = self.slots.get_mut(&slot) {
            state.generation += 1;
            state.status = LoadStatus::Unloaded;
        }
    }

    fn slot_status(&self, slot: SlotKey) -> LoadStatus {
        self.slots.get(&slot).map_or(LoadStatus::Unloaded, |s| s.status)
    }

    fn poll_status(&self, handle: LoadHandle) -> LoadStatus {
        match SlotKey::of_handle(handle).and_then(|slot| self.slots.get(&slot)) {
            Some(state) if state.generation == handle.generation() => state.status,
            _ => LoadStatus::Unloaded,
        }
    }

    fn play_animation(&mut self, buffer: u32, animation: u16, mode: u8) {
        self.intents.push(Intent::Play(buffer, animation, mode));
    }

    fn set_animation(&mut self, buffer: u32, animation: u16) {
        self.intents.push(Intent::Set(buffer, animation));
    }
}
