//! 单元编解码
//!
//! UnitPool section 存放单元本体（不含行号），LineInfo section 单独
//! 存放行号表，Release 构建可整体剥离。所有多字节字段小端编码。
//!
//! 单元布局：
//! ```text
//! name      u16 长度 + UTF-8 字节
//! n_args    u8
//! n_locals  u16
//! code      u32 长度 + 字节
//! constants u16 个数 + (tag u8 [+ 负载])
//! tokens    u16 个数 + (u16 长度 + UTF-8 字节)
//! ```

use crate::core::{Constant, Unit};

// 常量池 tag
const TAG_NONE: u8 = 0x00;
const TAG_TRUE: u8 = 0x01;
const TAG_FALSE: u8 = 0x02;
const TAG_INT: u8 = 0x03;
const TAG_STR: u8 = 0x04;

/// 编解码错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// 数据在预期长度前结束
    UnexpectedEnd { offset: usize },
    /// 未知常量 tag
    BadTag { tag: u8, offset: usize },
    /// 字符串不是合法 UTF-8
    BadUtf8 { offset: usize },
    /// 行号表与单元不匹配
    LineCountMismatch { unit: usize, expected: usize, got: usize },
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::UnexpectedEnd { offset } => {
                write!(f, "unexpected end of data at offset {}", offset)
            }
            CodecError::BadTag { tag, offset } => {
                write!(f, "unknown constant tag 0x{:02X} at offset {}", tag, offset)
            }
            CodecError::BadUtf8 { offset } => {
                write!(f, "invalid UTF-8 string at offset {}", offset)
            }
            CodecError::LineCountMismatch {
                unit,
                expected,
                got,
            } => {
                write!(
                    f,
                    "line table for unit {} has {} entries, code has {} bytes",
                    unit, got, expected
                )
            }
        }
    }
}

impl std::error::Error for CodecError {}

// ==================== 写入 ====================

fn put_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u16).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn encode_unit(out: &mut Vec<u8>, unit: &Unit) {
    put_str(out, &unit.name);
    out.push(unit.n_args);
    out.extend_from_slice(&unit.n_locals.to_le_bytes());

    out.extend_from_slice(&(unit.code.len() as u32).to_le_bytes());
    out.extend_from_slice(&unit.code);

    out.extend_from_slice(&(unit.constants.len() as u16).to_le_bytes());
    for constant in &unit.constants {
        match constant {
            Constant::None => out.push(TAG_NONE),
            Constant::True => out.push(TAG_TRUE),
            Constant::False => out.push(TAG_FALSE),
            Constant::Int(n) => {
                out.push(TAG_INT);
                out.extend_from_slice(&n.to_le_bytes());
            }
            Constant::Str(s) => {
                out.push(TAG_STR);
                put_str(out, s);
            }
        }
    }

    out.extend_from_slice(&(unit.tokens.len() as u16).to_le_bytes());
    for token in &unit.tokens {
        put_str(out, token);
    }
}

/// 编码单元池（不含行号表）
pub fn encode_units(units: &[Unit]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(units.len() as u16).to_le_bytes());
    for unit in units {
        encode_unit(&mut out, unit);
    }
    out
}

/// 编码行号表（与 encode_units 的单元顺序一致）
pub fn encode_lines(units: &[Unit]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(units.len() as u16).to_le_bytes());
    for unit in units {
        out.extend_from_slice(&(unit.lines.len() as u32).to_le_bytes());
        for &line in &unit.lines {
            out.extend_from_slice(&(line as u32).to_le_bytes());
        }
    }
    out
}

// ==================== 读取 ====================

/// 字节游标，所有读取都带边界检查
struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(CodecError::UnexpectedEnd { offset: self.pos })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i64(&mut self) -> Result<i64, CodecError> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn str(&mut self) -> Result<String, CodecError> {
        let offset = self.pos;
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::BadUtf8 { offset })
    }
}

fn decode_unit(cur: &mut ByteCursor<'_>) -> Result<Unit, CodecError> {
    let name = cur.str()?;
    let n_args = cur.u8()?;
    let n_locals = cur.u16()?;

    let code_len = cur.u32()? as usize;
    let code = cur.take(code_len)?.to_vec();

    let const_count = cur.u16()? as usize;
    let mut constants = Vec::with_capacity(const_count);
    for _ in 0..const_count {
        let offset = cur.pos;
        let constant = match cur.u8()? {
            TAG_NONE => Constant::None,
            TAG_TRUE => Constant::True,
            TAG_FALSE => Constant::False,
            TAG_INT => Constant::Int(cur.i64()?),
            TAG_STR => Constant::Str(cur.str()?),
            tag => return Err(CodecError::BadTag { tag, offset }),
        };
        constants.push(constant);
    }

    let token_count = cur.u16()? as usize;
    let mut tokens = Vec::with_capacity(token_count);
    for _ in 0..token_count {
        tokens.push(cur.str()?);
    }

    Ok(Unit {
        name,
        n_args,
        n_locals,
        code,
        constants,
        tokens,
        lines: Vec::new(),
    })
}

/// 解码单元池；行号表留空，由 `apply_lines` 或剥离填充补齐
pub fn decode_units(data: &[u8]) -> Result<Vec<Unit>, CodecError> {
    let mut cur = ByteCursor::new(data);
    let count = cur.u16()? as usize;
    let mut units = Vec::with_capacity(count);
    for _ in 0..count {
        units.push(decode_unit(&mut cur)?);
    }
    Ok(units)
}

/// 把行号表写回单元；每个表长度必须与 code 字节数一致
pub fn apply_lines(units: &mut [Unit], data: &[u8]) -> Result<(), CodecError> {
    let mut cur = ByteCursor::new(data);
    let count = cur.u16()? as usize;
    if count != units.len() {
        return Err(CodecError::LineCountMismatch {
            unit: 0,
            expected: units.len(),
            got: count,
        });
    }
    for (idx, unit) in units.iter_mut().enumerate() {
        let line_count = cur.u32()? as usize;
        if line_count != unit.code.len() {
            return Err(CodecError::LineCountMismatch {
                unit: idx,
                expected: unit.code.len(),
                got: line_count,
            });
        }
        let mut lines = Vec::with_capacity(line_count);
        for _ in 0..line_count {
            lines.push(cur.u32()? as usize);
        }
        unit.lines = lines;
    }
    Ok(())
}

/// 剥离构建的占位行号：全 0 表示未知
pub fn fill_stripped_lines(units: &mut [Unit]) {
    for unit in units {
        unit.lines = vec![0; unit.code.len()];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OpCode;

    fn sample_unit() -> Unit {
        let mut unit = Unit::new("sample");
        unit.n_args = 1;
        unit.n_locals = 2;
        unit.add_constant(Constant::Int(42));
        unit.add_constant(Constant::Str("hello".into()));
        unit.add_constant(Constant::None);
        unit.add_token("len");
        unit.add_token("value");
        unit.write_op_u8(OpCode::LoadConst, 0, 1);
        unit.write_op(OpCode::Return, 2);
        unit
    }

    #[test]
    fn test_unit_roundtrip() {
        let original = sample_unit();
        let encoded = encode_units(std::slice::from_ref(&original));
        let decoded = decode_units(&encoded).unwrap();

        assert_eq!(decoded.len(), 1);
        let unit = &decoded[0];
        assert_eq!(unit.name, "sample");
        assert_eq!(unit.n_args, 1);
        assert_eq!(unit.n_locals, 2);
        assert_eq!(unit.code, original.code);
        assert_eq!(unit.constants, original.constants);
        assert_eq!(unit.tokens, original.tokens);
        assert!(unit.lines.is_empty());
    }

    #[test]
    fn test_lines_roundtrip() {
        let original = sample_unit();
        let encoded = encode_units(std::slice::from_ref(&original));
        let line_data = encode_lines(std::slice::from_ref(&original));

        let mut decoded = decode_units(&encoded).unwrap();
        apply_lines(&mut decoded, &line_data).unwrap();
        assert_eq!(decoded[0].lines, original.lines);
    }

    #[test]
    fn test_truncated_data_is_rejected() {
        let encoded = encode_units(&[sample_unit()]);
        let result = decode_units(&encoded[..encoded.len() - 3]);
        assert!(matches!(result, Err(CodecError::UnexpectedEnd { .. })));
    }

    #[test]
    fn test_bad_constant_tag_is_rejected() {
        let mut unit = Unit::new("t");
        unit.add_constant(Constant::None);
        let mut encoded = encode_units(&[unit]);
        // 单元名("t"=3B) + n_args(1) + n_locals(2) + code 长度(4) + 常量个数(2) 之后是 tag
        let tag_offset = encoded.len() - 3;
        encoded[tag_offset] = 0x7F;
        let result = decode_units(&encoded);
        assert!(matches!(result, Err(CodecError::BadTag { tag: 0x7F, .. })));
    }

    #[test]
    fn test_line_count_mismatch_is_rejected() {
        let original = sample_unit();
        let encoded = encode_units(std::slice::from_ref(&original));
        let other = Unit::new("empty");
        let line_data = encode_lines(std::slice::from_ref(&other));

        let mut decoded = decode_units(&encoded).unwrap();
        let result = apply_lines(&mut decoded, &line_data);
        assert!(matches!(result, Err(CodecError::LineCountMismatch { .. })));
    }

    #[test]
    fn test_stripped_lines_are_zero() {
        let mut units = vec![sample_unit()];
        units[0].lines.clear();
        fill_stripped_lines(&mut units);
        assert_eq!(units[0].lines.len(), units[0].code.len());
        assert!(units[0].lines.iter().all(|&l| l == 0));
        assert_eq!(units[0].line_at(0), None);
    }
}
