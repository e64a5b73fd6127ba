//! SC3 script container.
//!
//! Layout (little-endian):
//! - `SC3\0`, u32 string table offset, u32 return table offset
//! - label table: u32 code offsets from byte 12 up to the first label's target
//!   (or the string table, whichever comes first)
//! - code, then the string table
//! - return table: u32 code offsets from its offset to end of file

use std::io;

use crate::cursor::Cursor;
use crate::error::DecodeError;

pub const SCRIPT_MAGIC: [u8; 4] = *b"SC3\0";

/// Script buffers the VM can hold at once.
pub const MAX_SCRIPT_BUFFERS: usize = 16;

const HEADER_LEN: usize = 12;

/// Supplies script files by numeric id.
pub trait ScriptSource: Send + Sync {
    fn read_script(&self, id: u32) -> io::Result<Vec<u8>>;
}

/// A parsed, immutable script. Shared by every thread running it.
#[derive(Debug, Clone)]
pub struct Script {
    id: u32,
    bytes: Vec<u8>,
    code_end: usize,
    labels: Vec<u32>,
    return_addresses: Vec<u32>,
}

impl Script {
    pub fn parse(id: u32, bytes: Vec<u8>) -> Result<Self, DecodeError> {
        let bad = |reason| DecodeError::BadHeader { script: id, reason };
        if bytes.len() < HEADER_LEN || bytes[..4] != SCRIPT_MAGIC {
            return Err(bad("missing SC3 magic"));
        }

        let mut header = Cursor::new(&bytes, 4);
        let string_table = header.read_u32()? as usize;
        let return_table = header.read_u32()? as usize;
        if string_table < HEADER_LEN || string_table > bytes.len() {
            return Err(bad("string table offset out of range"));
        }
        if return_table < string_table || return_table > bytes.len() {
            return Err(bad("return table offset out of range"));
        }

        let mut labels = Vec::new();
        let mut table = Cursor::new(&bytes, HEADER_LEN);
        let mut table_end = string_table;
        while table.position() + 4 <= table_end {
            let offset = table.read_u32()?;
            if offset as usize > string_table {
                return Err(bad("label points past code"));
            }
            if labels.is_empty() {
                table_end = table_end.min(offset as usize);
            }
            labels.push(offset);
        }
        let code_start = table.position();
        if labels.iter().any(|&offset| (offset as usize) < code_start) {
            return Err(bad("label points before code"));
        }

        if (bytes.len() - return_table) % 4 != 0 {
            return Err(bad("truncated return table"));
        }
        let mut return_addresses = Vec::with_capacity((bytes.len() - return_table) / 4);
        let mut table = Cursor::new(&bytes, return_table);
        while table.remaining() > 0 {
            let offset = table.read_u32()?;
            if (offset as usize) < code_start || offset as usize > string_table {
                return Err(bad("return address outside code"));
            }
            return_addresses.push(offset);
        }

        Ok(Self {
            id,
            bytes,
            code_end: string_table,
            labels,
            return_addresses,
        })
    }

    /// Lays out a container around `code`. Label and return offsets are relative to the
    /// start of `code`; label 0 is added at the start of code when `labels` is empty.
    pub fn build(id: u32, code: &[u8], labels: &[u32], return_addresses: &[u32]) -> Self {
        let labels: Vec<u32> = if labels.is_empty() {
            vec![0]
        } else {
            labels.to_vec()
        };
        let code_start = HEADER_LEN + labels.len() * 4;
        let code_end = code_start + code.len();

        let mut bytes = Vec::with_capacity(code_end + return_addresses.len() * 4);
        bytes.extend_from_slice(&SCRIPT_MAGIC);
        bytes.extend_from_slice(&(code_end as u32).to_le_bytes());
        bytes.extend_from_slice(&(code_end as u32).to_le_bytes());
        for label in &labels {
            bytes.extend_from_slice(&(code_start as u32 + label).to_le_bytes());
        }
        bytes.extend_from_slice(code);
        for offset in return_addresses {
            bytes.extend_from_slice(&(code_start as u32 + offset).to_le_bytes());
        }

        Self {
            id,
            bytes,
            code_end,
            labels: labels.iter().map(|l| code_start as u32 + l).collect(),
            return_addresses: return_addresses
                .iter()
                .map(|r| code_start as u32 + r)
                .collect(),
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The whole file.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Everything up to the string table. Reaching the end of this at an
    /// instruction boundary ends the thread.
    #[inline]
    pub fn code(&self) -> &[u8] {
        &self.bytes[..self.code_end]
    }

    #[inline]
    pub fn code_end(&self) -> usize {
        self.code_end
    }

    #[inline]
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn label(&self, index: i32) -> Result<usize, DecodeError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.labels.get(i))
            .map(|&offset| offset as usize)
            .ok_or(DecodeError::LabelOutOfRange {
                table: "label",
                index: index as i64,
                count: self.labels.len(),
            })
    }

    pub fn return_address(&self, id: u16) -> Result<usize, DecodeError> {
        self.return_addresses
            .get(id as usize)
            .map(|&offset| offset as usize)
            .ok_or(DecodeError::LabelOutOfRange {
                table: "return id",
                index: id as i64,
                count: self.return_addresses.len(),
            })
    }
}
