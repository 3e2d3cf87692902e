//! 程序装载
//!
//! 把整套单元打包进容器，或从 .lumod/.lumor 内容恢复为可执行程序。
//! 文件 IO 集中在这一层，reader/writer 只处理字节。

use std::path::Path;

use thiserror::Error;

use crate::core::Unit;

use super::header::BuildMode;
use super::reader::{BinaryReader, ReadError};
use super::section::SectionKind;
use super::unit_codec::{self, CodecError};
use super::writer::{BinaryWriter, WriteOptions};

/// 装载完成的程序
#[derive(Debug, Clone)]
pub struct Program {
    pub units: Vec<Unit>,
    /// 入口单元下标（装载时已验证在界内）
    pub entry_unit: usize,
    pub build_mode: BuildMode,
}

impl Program {
    pub fn entry(&self) -> &Unit {
        &self.units[self.entry_unit]
    }
}

/// 装载错误
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read program file")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("program contains no units")]
    NoUnits,
    #[error("entry unit {index} out of range ({count} units)")]
    BadEntryIndex { index: usize, count: usize },
}

/// 编码整套程序为容器字节
pub fn encode_program(units: &[Unit], entry_unit: u16, options: &WriteOptions) -> Vec<u8> {
    let mut writer = BinaryWriter::new(options);
    writer.write_section(SectionKind::UnitPool, &unit_codec::encode_units(units));
    if !options.strip_lines {
        writer.write_section(SectionKind::LineInfo, &unit_codec::encode_lines(units));
    }
    writer.set_entry(entry_unit);
    writer.finish()
}

/// 从容器字节解码程序
pub fn decode_program(data: Vec<u8>) -> Result<Program, LoadError> {
    let reader = BinaryReader::from_bytes(data)?;

    let mut units = unit_codec::decode_units(reader.read_section(SectionKind::UnitPool)?)?;
    if units.is_empty() {
        return Err(LoadError::NoUnits);
    }

    if reader.has_section(SectionKind::LineInfo) {
        unit_codec::apply_lines(&mut units, reader.read_section(SectionKind::LineInfo)?)?;
    } else {
        unit_codec::fill_stripped_lines(&mut units);
    }

    let entry_unit = reader.header().entry_unit_idx as usize;
    if entry_unit >= units.len() {
        return Err(LoadError::BadEntryIndex {
            index: entry_unit,
            count: units.len(),
        });
    }

    Ok(Program {
        units,
        entry_unit,
        build_mode: reader.header().build_mode,
    })
}

/// 从文件装载程序
pub fn load_program_file(path: impl AsRef<Path>) -> Result<Program, LoadError> {
    let data = std::fs::read(path)?;
    decode_program(data)
}

/// 把程序写入文件
pub fn save_program_file(
    path: impl AsRef<Path>,
    units: &[Unit],
    entry_unit: u16,
    options: &WriteOptions,
) -> Result<(), LoadError> {
    std::fs::write(path, encode_program(units, entry_unit, options))?;
    Ok(())
}
