use crate::error::DecodeError;

pub const GLOBAL_WORK_COUNT: usize = 8000;
pub const FLAG_COUNT: usize = 10000;

/// Script-global variable banks. Owned by the VM; only the running thread touches them.
#[derive(Debug, Clone)]
pub struct Globals {
    work: Box<[i32]>,
    flags: Box<[u64]>,
}

impl Default for Globals {
    fn default() -> Self {
        Self::new()
    }
}

impl Globals {
    pub fn new() -> Self {
        Self {
            work: vec![0; GLOBAL_WORK_COUNT].into_boxed_slice(),
            flags: vec![0; FLAG_COUNT.div_ceil(64)].into_boxed_slice(),
        }
    }

    fn work_index(index: i64) -> Result<usize, DecodeError> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < GLOBAL_WORK_COUNT)
            .ok_or(DecodeError::VariableOutOfRange {
                bank: "global",
                index,
            })
    }

    fn flag_index(index: i64) -> Result<usize, DecodeError> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < FLAG_COUNT)
            .ok_or(DecodeError::VariableOutOfRange { bank: "flag", index })
    }

    pub fn work(&self, index: i64) -> Result<i32, DecodeError> {
        Ok(self.work[Self::work_index(index)?])
    }

    pub fn set_work(&mut self, index: i64, value: i32) -> Result<(), DecodeError> {
        self.work[Self::work_index(index)?] = value;
        Ok(())
    }

    pub fn flag(&self, index: i64) -> Result<bool, DecodeError> {
        let i = Self::flag_index(index)?;
        Ok(self.flags[i / 64] & (1 << (i % 64)) != 0)
    }

    pub fn set_flag(&mut self, index: i64, value: bool) -> Result<(), DecodeError> {
        let i = Self::flag_index(index)?;
        if value {
            self.flags[i / 64] |= 1 << (i % 64);
        } else {
            self.flags[i / 64] &= !(1 << (i % 64));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_bank_bounds() {
        let mut globals = Globals::new();
        globals.set_work(7999, -4).unwrap();
        assert_eq!(globals.work(7999).unwrap(), -4);
        assert!(globals.work(8000).is_err());
        assert!(globals.set_work(-1, 0).is_err());
    }

    #[test]
    fn flags_are_independent_bits() {
        let mut globals = Globals::new();
        globals.set_flag(63, true).unwrap();
        globals.set_flag(64, true).unwrap();
        globals.set_flag(63, false).unwrap();
        assert!(!globals.flag(63).unwrap());
        assert!(globals.flag(64).unwrap());
        assert!(globals.flag(9999).is_ok());
        assert_eq!(
            globals.flag(10000),
            Err(DecodeError::VariableOutOfRange {
                bank: "flag",
                index: 10000
            })
        );
    }
}
