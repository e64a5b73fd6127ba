//! Opcode-indexed dispatch. Lookup is a direct array index; slots without a known
//! instruction resolve to the logging stub so partly understood scripts keep running.

use crate::instructions::{self, Exec, HandlerResult, control, graphics3d, scene};
use crate::opcode::*;

pub(crate) type Handler = fn(&mut Exec<'_>) -> HandlerResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeKind {
    Implemented,
    /// Decodes and logs its operands, changes nothing.
    Stub,
    /// Known to do nothing in shipped scripts.
    Empty,
    Unknown,
}

#[derive(Clone, Copy)]
pub(crate) struct Entry {
    pub kind: OpcodeKind,
    pub name: &'static str,
    pub handler: Handler,
}

const UNKNOWN: Entry = Entry {
    kind: OpcodeKind::Unknown,
    name: "Unknown",
    handler: instructions::unknown,
};

const fn implemented(name: &'static str, handler: Handler) -> Entry {
    Entry {
        kind: OpcodeKind::Implemented,
        name,
        handler,
    }
}

const fn stub(name: &'static str, handler: Handler) -> Entry {
    Entry {
        kind: OpcodeKind::Stub,
        name,
        handler,
    }
}

const fn empty(name: &'static str) -> Entry {
    Entry {
        kind: OpcodeKind::Empty,
        name,
        handler: instructions::empty,
    }
}

pub const MO6TW_TABLE_LEN: usize = UNK_0240 as usize + 1;

const fn build_mo6tw() -> [Entry; MO6TW_TABLE_LEN] {
    let mut t = [UNKNOWN; MO6TW_TABLE_LEN];

    t[END as usize] = implemented("End", control::end);
    t[YIELD as usize] = implemented("Yield", control::yield_now);
    t[JUMP as usize] = implemented("Jump", control::jump);
    t[JUMP_IF as usize] = implemented("JumpIf", control::jump_if);
    t[CALL as usize] = implemented("Call", control::call);
    t[RETURN as usize] = implemented("Return", control::ret);
    t[WAIT as usize] = implemented("Wait", control::wait);
    t[ASSIGN as usize] = implemented("Assign", control::assign);
    t[THREAD_CREATE as usize] = implemented("ThreadCreate", control::thread_create);
    t[THREAD_KILL as usize] = implemented("ThreadKill", control::thread_kill);
    t[THREAD_PAUSE as usize] = implemented("ThreadPause", control::thread_pause);
    t[THREAD_RESUME as usize] = implemented("ThreadResume", control::thread_resume);
    t[SUSPEND as usize] = implemented("Suspend", control::suspend);
    t[SIGNAL_SET as usize] = implemented("SignalSet", control::signal_set);
    t[SIGNAL_CLEAR as usize] = implemented("SignalClear", control::signal_clear);
    t[SIGNAL_WAIT as usize] = implemented("SignalWait", control::signal_wait);
    t[SCRIPT_LOAD as usize] = implemented("ScriptLoad", control::script_load);
    t[DEBUG_PRINT as usize] = implemented("DebugPrint", control::debug_print);

    t[BG_LOAD as usize] = implemented("BGload", scene::bg_load);
    t[BG_RELEASE as usize] = implemented("BGrelease", scene::bg_release);
    t[LOAD_WAIT as usize] = implemented("LoadWait", scene::load_wait);

    t[CHA_LOAD_3D as usize] = implemented("CHAload3D", graphics3d::cha_load_3d);
    t[CHA_RELEASE_3D as usize] = implemented("CHArelease3D", graphics3d::cha_release_3d);
    t[UNK_0204 as usize] = empty("Unk0204");
    t[CHA_SWAP_3D_MAYBE as usize] = empty("CHAswap3DMaybe");
    t[CHA_PLAY_ANIM_3D_MAYBE as usize] =
        implemented("CHAplayAnim3DMaybe", graphics3d::cha_play_anim_3d_maybe);
    t[CHA_UNK_0207_3D as usize] = stub("CHAUnk02073D", graphics3d::cha_unk_0207_3d);
    t[UNK_0208 as usize] = stub("Unk0208", graphics3d::unk_0208);
    t[CHA_SET_ANIM_3D as usize] = implemented("CHAsetAnim3D", graphics3d::cha_set_anim_3d);
    let mut op = UNK_0210 as usize;
    while op <= UNK_0218 as usize {
        t[op] = empty("Unk02xx");
        op += 1;
    }
    t[UNK_0219 as usize] = stub("Unk0219", graphics3d::unk_0219);
    t[UNK_0240 as usize] = empty("Unk0240");

    t
}

static MO6TW: [Entry; MO6TW_TABLE_LEN] = build_mo6tw();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstructionSet {
    #[default]
    Mo6tw,
}

impl InstructionSet {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "mo6tw" => Some(Self::Mo6tw),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Mo6tw => "mo6tw",
        }
    }
}

#[derive(Clone, Copy)]
pub struct InstructionTable {
    set: InstructionSet,
    entries: &'static [Entry],
}

impl InstructionTable {
    pub fn new(set: InstructionSet) -> Self {
        let entries: &'static [Entry] = match set {
            InstructionSet::Mo6tw => &MO6TW,
        };
        Self { set, entries }
    }

    #[inline]
    pub fn set(&self) -> InstructionSet {
        self.set
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub(crate) fn entry(&self, opcode: u16) -> Entry {
        self.entries.get(opcode as usize).copied().unwrap_or(UNKNOWN)
    }

    pub fn kind(&self, opcode: u16) -> OpcodeKind {
        self.entry(opcode).kind
    }

    pub fn name(&self, opcode: u16) -> &'static str {
        self.entry(opcode).name
    }
}

impl std::fmt::Debug for InstructionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstructionTable")
            .field("set", &self.set)
            .field("len", &self.entries.len())
            .finish()
    }
}
