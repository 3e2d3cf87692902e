//! 二进制文件写入器
//!
//! 将编译产物写入 .lumod/.lumor 容器格式。

use super::header::{BuildMode, FeatureFlags, FileHeader, HEADER_SIZE};
use super::section::{SectionDirectory, SectionEntry, SectionKind};

/// 写入选项
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// 构建模式
    pub build_mode: BuildMode,
    /// 剥离行号信息
    pub strip_lines: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            build_mode: BuildMode::Debug,
            strip_lines: false,
        }
    }
}

impl WriteOptions {
    /// Release 预设：剥离行号
    pub fn release() -> Self {
        Self {
            build_mode: BuildMode::Release,
            strip_lines: true,
        }
    }
}

/// 二进制写入器
pub struct BinaryWriter {
    header: FileHeader,
    sections: SectionDirectory,
    /// 当前写入位置
    current_offset: u32,
    buffer: Vec<u8>,
}

impl BinaryWriter {
    pub fn new(options: &WriteOptions) -> Self {
        let mut header = FileHeader::new(options.build_mode);
        if !options.strip_lines {
            header.flags.insert(FeatureFlags::HAS_LINE_INFO);
        }

        let mut buffer = Vec::with_capacity(1024);
        // 预留文件头空间
        buffer.resize(HEADER_SIZE, 0);

        Self {
            header,
            sections: SectionDirectory::new(),
            current_offset: HEADER_SIZE as u32,
            buffer,
        }
    }

    pub fn current_offset(&self) -> u32 {
        self.current_offset
    }

    /// 对齐到指定边界
    fn align_to(&mut self, alignment: u32) {
        let rem = self.current_offset % alignment;
        if rem != 0 {
            let padding = alignment - rem;
            self.buffer.resize(self.buffer.len() + padding as usize, 0);
            self.current_offset += padding;
        }
    }

    /// 写入 section 数据，返回其在文件中的偏移
    pub fn write_section(&mut self, kind: SectionKind, data: &[u8]) -> u32 {
        self.align_to(8);

        let offset = self.current_offset;
        self.sections
            .add(SectionEntry::new(kind, offset, data.len() as u32));
        self.buffer.extend_from_slice(data);
        self.current_offset += data.len() as u32;

        offset
    }

    /// 设置入口单元
    pub fn set_entry(&mut self, unit_idx: u16) {
        self.header.entry_unit_idx = unit_idx;
        self.header.flags.insert(FeatureFlags::IS_EXECUTABLE);
    }

    pub fn set_source_hash(&mut self, hash: [u8; 16]) {
        self.header.source_hash = hash;
    }

    /// 完成写入：落盘 section directory 并回填文件头
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to(8);
        let section_dir_offset = self.current_offset;
        let section_dir_data = self.sections.to_bytes();
        let section_dir_size = section_dir_data.len() as u32;

        self.buffer.extend_from_slice(&section_dir_data);

        self.header.section_count = self.sections.count() as u16;
        self.header.section_dir_offset = section_dir_offset;
        self.header.section_dir_size = section_dir_size;

        self.buffer[..HEADER_SIZE].copy_from_slice(&self.header.to_bytes());
        self.buffer
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn sections(&self) -> &SectionDirectory {
        &self.sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_basic() {
        let mut writer = BinaryWriter::new(&WriteOptions::default());
        writer.write_section(SectionKind::UnitPool, b"unit data");
        writer.set_entry(0);

        let data = writer.finish();
        assert!(data.len() >= HEADER_SIZE);
        assert_eq!(&data[0..4], b"LUMO");
    }

    #[test]
    fn test_sections_are_aligned() {
        let mut writer = BinaryWriter::new(&WriteOptions::default());
        let off1 = writer.write_section(SectionKind::UnitPool, b"12345");
        let off2 = writer.write_section(SectionKind::LineInfo, b"x");

        assert_eq!(off1 % 8, 0);
        assert_eq!(off2 % 8, 0);
        assert!(off2 > off1);
        assert_eq!(writer.sections().count(), 2);
    }

    #[test]
    fn test_release_options_strip_lines() {
        let writer = BinaryWriter::new(&WriteOptions::release());
        assert!(!writer.header().flags.contains(FeatureFlags::HAS_LINE_INFO));
        assert_eq!(writer.header().build_mode, BuildMode::Release);
    }
}
