//! Lumo 二进制格式支持
//!
//! 提供 .lumod (Debug) 和 .lumor (Release) 文件的读写支持。
//!
//! # 文件格式
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      File Header (64 bytes)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     Section Directory                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Unit Pool Section    │  字节码单元（代码、常量、标记名）        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Line Info Section    │  行号表（Release 可剥离）              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # 示例
//!
//! ```rust,ignore
//! use lumo_core::binary::{decode_program, encode_program, WriteOptions};
//!
//! // 写入
//! let bytes = encode_program(&units, 0, &WriteOptions::default());
//!
//! // 读取
//! let program = decode_program(bytes)?;
//! let entry = program.entry();
//! ```

mod header;
mod loader;
mod reader;
mod section;
mod unit_codec;
mod writer;

// 公开导出
pub use header::{BuildMode, FeatureFlags, FileHeader, HeaderError, HEADER_SIZE, MAGIC};
pub use loader::{
    decode_program, encode_program, load_program_file, save_program_file, LoadError, Program,
};
pub use reader::{BinaryReader, FileInfo, ReadError};
pub use section::{SectionDirectory, SectionEntry, SectionError, SectionKind};
pub use unit_codec::CodecError;
pub use writer::{BinaryWriter, WriteOptions};

/// 文件扩展名常量
pub mod ext {
    /// 源码文件
    pub const SOURCE: &str = "lumo";
    /// Debug 编译产物
    pub const DEBUG: &str = "lumod";
    /// Release 编译产物
    pub const RELEASE: &str = "lumor";
}

/// 从文件扩展名检测构建模式
pub fn detect_build_mode_from_ext(path: impl AsRef<std::path::Path>) -> Option<BuildMode> {
    let path = path.as_ref();
    let ext = path.extension()?.to_str()?;

    match ext {
        "lumod" => Some(BuildMode::Debug),
        "lumor" => Some(BuildMode::Release),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Constant, OpCode, Unit};

    #[test]
    fn test_file_extensions() {
        assert_eq!(ext::SOURCE, "lumo");
        assert_eq!(ext::DEBUG, "lumod");
        assert_eq!(ext::RELEASE, "lumor");
    }

    #[test]
    fn test_detect_build_mode() {
        use std::path::Path;

        assert_eq!(
            detect_build_mode_from_ext(Path::new("test.lumod")),
            Some(BuildMode::Debug)
        );
        assert_eq!(
            detect_build_mode_from_ext(Path::new("test.lumor")),
            Some(BuildMode::Release)
        );
        assert_eq!(detect_build_mode_from_ext(Path::new("test.lumo")), None);
        assert_eq!(detect_build_mode_from_ext(Path::new("test")), None);
    }

    #[test]
    fn test_roundtrip() {
        // 完整的编码-解码测试
        let mut unit = Unit::new("main");
        let greeting = unit.add_constant(Constant::Str("hello".to_string()));
        unit.write_op_u8(OpCode::LoadConst, greeting as u8, 1);
        unit.write_op(OpCode::Print, 1);
        unit.write_op(OpCode::LoadNone, 2);
        unit.write_op(OpCode::Return, 2);

        let bytes = encode_program(&[unit.clone()], 0, &WriteOptions::default());

        // 头部与目录可独立检视
        let reader = BinaryReader::from_bytes(bytes.clone()).unwrap();
        assert_eq!(reader.header().build_mode, BuildMode::Debug);
        assert!(reader.has_section(SectionKind::UnitPool));
        assert!(reader.has_section(SectionKind::LineInfo));

        let program = decode_program(bytes).unwrap();
        assert_eq!(program.units.len(), 1);
        assert_eq!(program.entry().name, "main");
        assert_eq!(program.entry().code, unit.code);
        assert_eq!(program.entry().constants, unit.constants);
        assert_eq!(program.entry().lines, unit.lines);
    }
}
