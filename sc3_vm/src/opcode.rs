//! Opcode numbers, `group << 8 | index`.

// Group 0x00: control flow and threads.
pub const END: u16 = 0x0000;
pub const YIELD: u16 = 0x0001;
pub const JUMP: u16 = 0x0002;
pub const JUMP_IF: u16 = 0x0003;
pub const CALL: u16 = 0x0004;
pub const RETURN: u16 = 0x0005;
pub const WAIT: u16 = 0x0006;
pub const ASSIGN: u16 = 0x0007;
pub const THREAD_CREATE: u16 = 0x0008;
pub const THREAD_KILL: u16 = 0x0009;
pub const THREAD_PAUSE: u16 = 0x000A;
pub const THREAD_RESUME: u16 = 0x000B;
pub const SUSPEND: u16 = 0x000C;
pub const SIGNAL_SET: u16 = 0x000D;
pub const SIGNAL_CLEAR: u16 = 0x000E;
pub const SIGNAL_WAIT: u16 = 0x000F;
pub const SCRIPT_LOAD: u16 = 0x0010;
pub const DEBUG_PRINT: u16 = 0x0011;

// Group 0x01: background.
pub const BG_LOAD: u16 = 0x0100;
pub const BG_RELEASE: u16 = 0x0101;
pub const LOAD_WAIT: u16 = 0x0102;

// Group 0x02: 3D characters.
pub const CHA_LOAD_3D: u16 = 0x0200;
pub const CHA_RELEASE_3D: u16 = 0x0201;
pub const UNK_0204: u16 = 0x0204;
pub const CHA_SWAP_3D_MAYBE: u16 = 0x0205;
pub const CHA_PLAY_ANIM_3D_MAYBE: u16 = 0x0206;
pub const CHA_UNK_0207_3D: u16 = 0x0207;
pub const UNK_0208: u16 = 0x0208;
pub const CHA_SET_ANIM_3D: u16 = 0x0209;
pub const UNK_0210: u16 = 0x0210;
pub const UNK_0218: u16 = 0x0218;
pub const UNK_0219: u16 = 0x0219;
pub const UNK_0240: u16 = 0x0240;
