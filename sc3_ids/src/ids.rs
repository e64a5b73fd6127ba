//! Type-safe generational identifiers for VM threads and resource loads.
//! All IDs use u64 = index (low 32 bits) | generation (high 32 bits). Index 0 = nil.
//! IDs are handed out by their owning arena/coordinator; slot reuse bumps generation so stale IDs are invalid.

use std::fmt;
use std::hash::Hash;

// ---- Generational ID: base encoding ----
// u64 layout: low 32 = index (0 = nil, 1.. = slot), high 32 = generation.

macro_rules! define_generational_id {
    ($type_name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $type_name(pub u64);

        impl $type_name {
            #[inline]
            pub const fn nil() -> Self {
                Self(0)
            }

            #[inline]
            pub const fn index(self) -> u32 {
                (self.0 & 0xFFFF_FFFF) as u32
            }

            #[inline]
            pub const fn generation(self) -> u32 {
                (self.0 >> 32) as u32
            }

            #[inline]
            pub const fn from_parts(index: u32, generation: u32) -> Self {
                Self((index as u64) | ((generation as u64) << 32))
            }

            #[inline]
            pub const fn as_u64(self) -> u64 {
                self.0
            }

            #[inline]
            pub const fn from_u64(value: u64) -> Self {
                Self(value)
            }

            #[inline]
            pub const fn is_nil(self) -> bool {
                self.0 == 0
            }
        }

        impl Default for $type_name {
            fn default() -> Self {
                Self::nil()
            }
        }

        impl fmt::Debug for $type_name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    concat!(stringify!($type_name), "({}:{})"),
                    self.index(),
                    self.generation()
                )
            }
        }

        impl fmt::Display for $type_name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", self.index(), self.generation())
            }
        }
    };
}

define_generational_id!(
    ThreadID,
    "Script thread ID, allocated by the VM thread arena."
);
define_generational_id!(
    LoadHandle,
    "Resource load handle: index is the packed slot key, generation counts requests for that slot."
);

/// Script-visible thread handles squeeze the ID into a positive i32:
/// bits 0..16 = index, bits 16..31 = low 15 bits of the generation.
const SCRIPT_HANDLE_INDEX_BITS: u32 = 16;
const SCRIPT_HANDLE_GENERATION_MASK: u32 = 0x7FFF;

impl ThreadID {
    /// Largest index representable in a script handle.
    pub const MAX_SCRIPT_INDEX: u32 = (1 << SCRIPT_HANDLE_INDEX_BITS) - 1;

    #[inline]
    pub const fn to_script_handle(self) -> i32 {
        let index = self.index() & Self::MAX_SCRIPT_INDEX;
        let generation = self.generation() & SCRIPT_HANDLE_GENERATION_MASK;
        ((generation << SCRIPT_HANDLE_INDEX_BITS) | index) as i32
    }

    /// Inverse of [`ThreadID::to_script_handle`]. The generation is truncated, so the
    /// arena compares it with [`ThreadID::matches_script_generation`].
    #[inline]
    pub const fn from_script_handle(handle: i32) -> Self {
        let raw = handle as u32;
        Self::from_parts(
            raw & Self::MAX_SCRIPT_INDEX,
            (raw >> SCRIPT_HANDLE_INDEX_BITS) & SCRIPT_HANDLE_GENERATION_MASK,
        )
    }

    #[inline]
    pub const fn matches_script_generation(self, full_generation: u32) -> bool {
        self.generation() == full_generation & SCRIPT_HANDLE_GENERATION_MASK
    }
}
