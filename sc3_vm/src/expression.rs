//! Inline expressions: a postfix token run ending in `End`, evaluated left to right
//! on a small fixed stack. Encoding order is evaluation order.

use crate::cursor::Cursor;
use crate::error::DecodeError;
use crate::globals::Globals;

pub const EXPR_STACK_DEPTH: usize = 16;
pub const THREAD_LOCAL_COUNT: usize = 32;

pub mod token {
    pub const END: u8 = 0x00;

    pub const ADD: u8 = 0x01;
    pub const SUB: u8 = 0x02;
    pub const MUL: u8 = 0x03;
    pub const DIV: u8 = 0x04;
    pub const MOD: u8 = 0x05;
    pub const BIT_AND: u8 = 0x06;
    pub const BIT_OR: u8 = 0x07;
    pub const BIT_XOR: u8 = 0x08;
    pub const SHL: u8 = 0x09;
    pub const SHR: u8 = 0x0A;

    pub const EQ: u8 = 0x0C;
    pub const NE: u8 = 0x0D;
    pub const LT: u8 = 0x0E;
    pub const LE: u8 = 0x0F;
    pub const GT: u8 = 0x10;
    pub const GE: u8 = 0x11;
    pub const LOGICAL_AND: u8 = 0x12;
    pub const LOGICAL_OR: u8 = 0x13;

    pub const NEG: u8 = 0x14;
    pub const NOT: u8 = 0x15;
    pub const BIT_NOT: u8 = 0x16;

    pub const STORE_GLOBAL: u8 = 0x20;
    pub const STORE_LOCAL: u8 = 0x21;
    pub const LOAD_GLOBAL: u8 = 0x28;
    pub const LOAD_LOCAL: u8 = 0x29;
    pub const LOAD_FLAG: u8 = 0x2A;
    pub const LOAD_RESULT: u8 = 0x2B;

    pub const IMM_I8: u8 = 0x30;
    pub const IMM_I16: u8 = 0x31;
    pub const IMM_I32: u8 = 0x32;

    /// `0x80..=0xFF` push `byte & 0x7F`.
    pub const SMALL_IMM: u8 = 0x80;
}

/// Variables an expression may read or write.
pub struct ExprScope<'a> {
    pub globals: &'a mut Globals,
    pub locals: &'a mut [i32; THREAD_LOCAL_COUNT],
    pub result: i32,
}

struct Stack {
    values: [i32; EXPR_STACK_DEPTH],
    len: usize,
}

impl Stack {
    fn push(&mut self, value: i32, offset: usize) -> Result<(), DecodeError> {
        let slot = self
            .values
            .get_mut(self.len)
            .ok_or(DecodeError::StackOverflow { offset })?;
        *slot = value;
        self.len += 1;
        Ok(())
    }

    fn pop(&mut self, offset: usize) -> Result<i32, DecodeError> {
        if self.len == 0 {
            return Err(DecodeError::StackUnderflow { offset });
        }
        self.len -= 1;
        Ok(self.values[self.len])
    }
}

fn local_index(index: u8) -> Result<usize, DecodeError> {
    let i = index as usize;
    if i < THREAD_LOCAL_COUNT {
        Ok(i)
    } else {
        Err(DecodeError::VariableOutOfRange {
            bank: "local",
            index: i as i64,
        })
    }
}

#[inline]
fn truth(value: bool) -> i32 {
    value as i32
}

fn binary(op: u8, a: i32, b: i32) -> Option<i32> {
    use token::*;
    Some(match op {
        ADD => a.wrapping_add(b),
        SUB => a.wrapping_sub(b),
        MUL => a.wrapping_mul(b),
        DIV if b == 0 => 0,
        DIV => a.wrapping_div(b),
        MOD if b == 0 => 0,
        MOD => a.wrapping_rem(b),
        BIT_AND => a & b,
        BIT_OR => a | b,
        BIT_XOR => a ^ b,
        SHL => a.wrapping_shl(b as u32 & 31),
        SHR => a.wrapping_shr(b as u32 & 31),
        EQ => truth(a == b),
        NE => truth(a != b),
        LT => truth(a < b),
        LE => truth(a <= b),
        GT => truth(a > b),
        GE => truth(a >= b),
        LOGICAL_AND => truth(a != 0 && b != 0),
        LOGICAL_OR => truth(a != 0 || b != 0),
        _ => return None,
    })
}

/// Evaluates one expression starting at the cursor and leaves the cursor just past its
/// `End` token.
pub fn evaluate(cursor: &mut Cursor<'_>, scope: &mut ExprScope<'_>) -> Result<i32, DecodeError> {
    let mut stack = Stack {
        values: [0; EXPR_STACK_DEPTH],
        len: 0,
    };

    loop {
        let offset = cursor.position();
        let byte = cursor.read_u8()?;
        match byte {
            token::END => {
                return match stack.len {
                    1 => Ok(stack.values[0]),
                    depth => Err(DecodeError::Unbalanced { offset, depth }),
                };
            }
            token::SMALL_IMM..=0xFF => stack.push((byte & 0x7F) as i32, offset)?,
            token::IMM_I8 => stack.push(cursor.read_i8()? as i32, offset)?,
            token::IMM_I16 => stack.push(cursor.read_i16()? as i32, offset)?,
            token::IMM_I32 => stack.push(cursor.read_i32()?, offset)?,
            token::LOAD_GLOBAL => {
                let index = cursor.read_u16()?;
                stack.push(scope.globals.work(index as i64)?, offset)?;
            }
            token::LOAD_LOCAL => {
                let index = local_index(cursor.read_u8()?)?;
                stack.push(scope.locals[index], offset)?;
            }
            token::LOAD_FLAG => {
                let index = cursor.read_u16()?;
                stack.push(truth(scope.globals.flag(index as i64)?), offset)?;
            }
            token::LOAD_RESULT => stack.push(scope.result, offset)?,
            token::STORE_GLOBAL => {
                let index = cursor.read_u16()?;
                let value = stack.pop(offset)?;
                scope.globals.set_work(index as i64, value)?;
                stack.push(value, offset)?;
            }
            token::STORE_LOCAL => {
                let index = local_index(cursor.read_u8()?)?;
                let value = stack.pop(offset)?;
                scope.locals[index] = value;
                stack.push(value, offset)?;
            }
            token::NEG => {
                let a = stack.pop(offset)?;
                stack.push(a.wrapping_neg(), offset)?;
            }
            token::NOT => {
                let a = stack.pop(offset)?;
                stack.push(truth(a == 0), offset)?;
            }
            token::BIT_NOT => {
                let a = stack.pop(offset)?;
                stack.push(!a, offset)?;
            }
            _ => {
                // Check the token before touching the stack so unknown bytes report as such.
                if binary(byte, 0, 1).is_none() {
                    return Err(DecodeError::UnknownToken { offset, byte });
                }
                let b = stack.pop(offset)?;
                let a = stack.pop(offset)?;
                let value = binary(byte, a, b).ok_or(DecodeError::UnknownToken { offset, byte })?;
                stack.push(value, offset)?;
            }
        }
    }
}

/// Evaluates the expression at `start` in `bytes`, returning its value and encoded length.
pub fn evaluate_at(
    bytes: &[u8],
    start: usize,
    scope: &mut ExprScope<'_>,
) -> Result<(i32, usize), DecodeError> {
    let mut cursor = Cursor::new(bytes, start);
    let value = evaluate(&mut cursor, scope)?;
    Ok((value, cursor.position() - start))
}

#[cfg(test)]
mod tests {
    use super::token::*;
    use super::*;

    fn eval(
        bytes: &[u8],
        globals: &mut Globals,
        locals: &mut [i32; THREAD_LOCAL_COUNT],
    ) -> Result<(i32, usize), DecodeError> {
        let mut scope = ExprScope {
            globals,
            locals,
            result: 77,
        };
        evaluate_at(bytes, 0, &mut scope)
    }

    fn eval_pure(bytes: &[u8]) -> Result<i32, DecodeError> {
        eval(bytes, &mut Globals::new(), &mut [0; THREAD_LOCAL_COUNT]).map(|(v, _)| v)
    }

    #[test]
    fn immediates_of_every_width() {
        assert_eq!(eval_pure(&[0x85, END]), Ok(5));
        assert_eq!(eval_pure(&[IMM_I8, 0xFE, END]), Ok(-2));
        assert_eq!(eval_pure(&[IMM_I16, 0x00, 0x80, END]), Ok(-32768));
        assert_eq!(
            eval_pure(&[IMM_I32, 0x78, 0x56, 0x34, 0x12, END]),
            Ok(0x1234_5678)
        );
    }

    #[test]
    fn operators_apply_in_encoding_order() {
        // (10 - 3) * 2
        assert_eq!(eval_pure(&[0x8A, 0x83, SUB, 0x82, MUL, END]), Ok(14));
        // 10 - (3 * 2)
        assert_eq!(eval_pure(&[0x8A, 0x83, 0x82, MUL, SUB, END]), Ok(4));
    }

    #[test]
    fn comparisons_and_logic_yield_zero_or_one() {
        assert_eq!(eval_pure(&[0x82, 0x83, LT, END]), Ok(1));
        assert_eq!(eval_pure(&[0x82, 0x83, GE, END]), Ok(0));
        assert_eq!(eval_pure(&[0x82, 0x80, LOGICAL_AND, END]), Ok(0));
        assert_eq!(eval_pure(&[0x82, 0x80, LOGICAL_OR, END]), Ok(1));
        assert_eq!(eval_pure(&[0x85, NOT, END]), Ok(0));
        assert_eq!(eval_pure(&[0x85, NEG, END]), Ok(-5));
        assert_eq!(eval_pure(&[0x80, BIT_NOT, END]), Ok(-1));
    }

    #[test]
    fn arithmetic_edge_cases_do_not_fail() {
        assert_eq!(eval_pure(&[0x85, 0x80, DIV, END]), Ok(0));
        assert_eq!(eval_pure(&[0x85, 0x80, MOD, END]), Ok(0));
        assert_eq!(
            eval_pure(&[IMM_I32, 0xFF, 0xFF, 0xFF, 0x7F, 0x81, ADD, END]),
            Ok(i32::MIN)
        );
        assert_eq!(
            eval_pure(&[IMM_I32, 0x00, 0x00, 0x00, 0x80, IMM_I8, 0xFF, DIV, END]),
            Ok(i32::MIN)
        );
        // Shift amount is masked: 1 << 33 == 1 << 1.
        assert_eq!(eval_pure(&[0x81, 0xA1, SHL, END]), Ok(2));
    }

    #[test]
    fn stores_write_and_leave_value_on_stack() {
        let mut globals = Globals::new();
        let mut locals = [0; THREAD_LOCAL_COUNT];
        let bytes = [0x89, STORE_GLOBAL, 0x10, 0x00, STORE_LOCAL, 3, END];

        let (value, consumed) = eval(&bytes, &mut globals, &mut locals).unwrap();
        assert_eq!(value, 9);
        assert_eq!(consumed, bytes.len());
        assert_eq!(globals.work(16).unwrap(), 9);
        assert_eq!(locals[3], 9);
    }

    #[test]
    fn loads_read_banks_and_result_register() {
        let mut globals = Globals::new();
        globals.set_work(2, 40).unwrap();
        globals.set_flag(5, true).unwrap();
        let mut locals = [0; THREAD_LOCAL_COUNT];
        locals[1] = 1;

        let bytes = [
            LOAD_GLOBAL, 2, 0, LOAD_LOCAL, 1, ADD, LOAD_FLAG, 5, 0, ADD, LOAD_RESULT, ADD, END,
        ];
        assert_eq!(
            eval(&bytes, &mut globals, &mut locals).map(|(v, _)| v),
            Ok(40 + 1 + 1 + 77)
        );
    }

    #[test]
    fn evaluation_is_deterministic() {
        let mut globals = Globals::new();
        globals.set_work(0, 12).unwrap();
        let mut locals = [0; THREAD_LOCAL_COUNT];
        let bytes = [LOAD_GLOBAL, 0, 0, 0x85, MUL, 0x83, MOD, END];

        let first = eval(&bytes, &mut globals, &mut locals);
        let second = eval(&bytes, &mut globals, &mut locals);
        assert_eq!(first, second);
        assert_eq!(first, Ok((0, bytes.len())));
    }

    #[test]
    fn malformed_sequences_are_decode_errors() {
        assert_eq!(
            eval_pure(&[0x81, 0x0B, END]),
            Err(DecodeError::UnknownToken {
                offset: 1,
                byte: 0x0B
            })
        );
        assert_eq!(
            eval_pure(&[0x81, 0x82, END]),
            Err(DecodeError::Unbalanced {
                offset: 2,
                depth: 2
            })
        );
        assert_eq!(eval_pure(&[END]), Err(DecodeError::Unbalanced { offset: 0, depth: 0 }));
        assert_eq!(
            eval_pure(&[0x81, ADD, END]),
            Err(DecodeError::StackUnderflow { offset: 1 })
        );
        assert!(matches!(
            eval_pure(&[0x81; EXPR_STACK_DEPTH + 1]),
            Err(DecodeError::StackOverflow { offset: 16 })
        ));
        assert!(matches!(
            eval_pure(&[IMM_I16, 0x01]),
            Err(DecodeError::OutOfBounds { .. })
        ));
        assert!(matches!(
            eval_pure(&[LOAD_LOCAL, 32, END]),
            Err(DecodeError::VariableOutOfRange { bank: "local", .. })
        ));
        // Runs off the end without an End token.
        assert!(matches!(
            eval_pure(&[0x81]),
            Err(DecodeError::OutOfBounds { .. })
        ));
    }
}
