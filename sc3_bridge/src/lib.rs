//! Contract between the script VM and the scene that owns loaded resources.
//! The VM only ever sees slot keys, load handles and load status, never the resources themselves.

use sc3_ids::LoadHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceCategory {
    Background = 1,
    Character = 2,
}

impl ResourceCategory {
    /// Decodes the category byte used by script instructions.
    pub const fn from_script(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Background),
            2 => Some(Self::Character),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Character => "character",
        }
    }
}

/// A logical load slot, e.g. "current background" or "character buffer N".
/// At most one load is in flight per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub category: ResourceCategory,
    pub index: u32,
}

impl SlotKey {
    /// Largest slot index that still packs into a [`LoadHandle`].
    pub const MAX_INDEX: u32 = 0x00FF_FFFF;

    pub const BACKGROUND: SlotKey = SlotKey::new(ResourceCategory::Background, 0);

    #[inline]
    pub const fn new(category: ResourceCategory, index: u32) -> Self {
        Self { category, index }
    }

    #[inline]
    pub const fn character(buffer: u32) -> Self {
        Self::new(ResourceCategory::Character, buffer)
    }

    /// Packs the slot into the index half of a [`LoadHandle`]: category in the top byte.
    #[inline]
    pub const fn packed(self) -> u32 {
        ((self.category as u32) << 24) | (self.index & Self::MAX_INDEX)
    }

    pub const fn unpack(packed: u32) -> Option<Self> {
        match ResourceCategory::from_script((packed >> 24) as u8) {
            Some(category) => Some(Self::new(category, packed & Self::MAX_INDEX)),
            None => None,
        }
    }

    #[inline]
    pub const fn fits_handle(self) -> bool {
        self.index <= Self::MAX_INDEX
    }

    #[inline]
    pub const fn handle(self, generation: u32) -> LoadHandle {
        LoadHandle::from_parts(self.packed(), generation)
    }

    #[inline]
    pub const fn of_handle(handle: LoadHandle) -> Option<Self> {
        Self::unpack(handle.index())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

impl LoadStatus {
    /// Value scripts observe in the thread result register after a load wait.
    pub const fn script_code(self) -> i32 {
        match self {
            Self::Unloaded => 0,
            Self::Loading => 1,
            Self::Loaded => 2,
            Self::Failed => 3,
        }
    }

    #[inline]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Loading)
    }
}

/// Intents the VM issues to the scene. Requests never block; completion is only
/// observable by polling status on a later tick.
pub trait SceneBridge {
    /// Starts loading `asset_id` into `slot`, superseding any earlier request for that slot.
    fn request_load(&mut self, slot: SlotKey, asset_id: u32) -> LoadHandle;

    fn release(&mut self, slot: SlotKey);

    fn slot_status(&self, slot: SlotKey) -> LoadStatus;

    /// Status of one specific request. A superseded or released handle reports `Unloaded`.
    fn poll_status(&self, handle: LoadHandle) -> LoadStatus;

    fn play_animation(&mut self, buffer: u32, animation: u16, mode: u8);

    fn set_animation(&mut self, buffer: u32, animation: u16);
}
