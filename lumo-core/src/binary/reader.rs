//! 二进制文件读取器
//!
//! 从 .lumod/.lumor 字节内容解析文件头与 section；文件 IO 在加载器层。

use super::header::{FeatureFlags, FileHeader, HeaderError, HEADER_SIZE};
use super::section::{SectionDirectory, SectionEntry, SectionError, SectionKind};

/// 读取错误
#[derive(Debug, Clone)]
pub enum ReadError {
    Header(HeaderError),
    Section(SectionError),
    /// 数据不足一个文件头
    TooShort,
    /// Section directory 越过文件末尾
    InvalidOffset,
    /// Section 数据越过文件末尾
    InvalidSectionSize,
    SectionNotFound(SectionKind),
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Header(e) => write!(f, "header error: {}", e),
            ReadError::Section(e) => write!(f, "section error: {}", e),
            ReadError::TooShort => write!(f, "data too short"),
            ReadError::InvalidOffset => write!(f, "section directory out of bounds"),
            ReadError::InvalidSectionSize => write!(f, "section data out of bounds"),
            ReadError::SectionNotFound(k) => write!(f, "section not found: {:?}", k),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Header(e) => Some(e),
            ReadError::Section(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HeaderError> for ReadError {
    fn from(e: HeaderError) -> Self {
        ReadError::Header(e)
    }
}

impl From<SectionError> for ReadError {
    fn from(e: SectionError) -> Self {
        ReadError::Section(e)
    }
}

/// 二进制读取器
pub struct BinaryReader {
    data: Vec<u8>,
    header: FileHeader,
    sections: SectionDirectory,
}

impl BinaryReader {
    /// 从字节数组创建读取器，解析并验证文件头与 section directory
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, ReadError> {
        if data.len() < HEADER_SIZE {
            return Err(ReadError::TooShort);
        }

        let header = FileHeader::from_bytes(&data[..HEADER_SIZE])?;
        header.validate()?;

        let dir_start = header.section_dir_offset as usize;
        let dir_end = dir_start
            .checked_add(header.section_dir_size as usize)
            .ok_or(ReadError::InvalidOffset)?;
        if dir_start < HEADER_SIZE || dir_end > data.len() {
            return Err(ReadError::InvalidOffset);
        }

        let sections = SectionDirectory::from_bytes(&data[dir_start..dir_end])?;

        Ok(Self {
            data,
            header,
            sections,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn sections(&self) -> &SectionDirectory {
        &self.sections
    }

    /// 读取指定 section 的数据
    pub fn read_section(&self, kind: SectionKind) -> Result<&[u8], ReadError> {
        let entry = self
            .sections
            .find(kind)
            .ok_or(ReadError::SectionNotFound(kind))?;

        let start = entry.offset as usize;
        let end = start
            .checked_add(entry.size as usize)
            .ok_or(ReadError::InvalidSectionSize)?;
        if end > self.data.len() {
            return Err(ReadError::InvalidSectionSize);
        }
        Ok(&self.data[start..end])
    }

    pub fn has_section(&self, kind: SectionKind) -> bool {
        self.sections.find(kind).is_some()
    }

    pub fn section_entries(&self) -> &[SectionEntry] {
        &self.sections.entries
    }

    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }
}

/// 文件格式信息（inspect 输出）
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub magic: [u8; 4],
    pub version: (u8, u8, u8),
    pub build_mode: String,
    pub section_count: usize,
    pub total_size: usize,
    pub has_line_info: bool,
    pub is_executable: bool,
    pub entry_unit_idx: u16,
}

impl FileInfo {
    pub fn from_reader(reader: &BinaryReader) -> Self {
        let h = &reader.header;
        Self {
            magic: h.magic,
            version: (h.version_major, h.version_minor, h.version_patch),
            build_mode: match h.build_mode {
                super::header::BuildMode::Debug => "Debug".to_string(),
                super::header::BuildMode::Release => "Release".to_string(),
            },
            section_count: reader.sections.count(),
            total_size: reader.data.len(),
            has_line_info: h.flags.contains(FeatureFlags::HAS_LINE_INFO),
            is_executable: h.flags.contains(FeatureFlags::IS_EXECUTABLE),
            entry_unit_idx: h.entry_unit_idx,
        }
    }
}

impl std::fmt::Display for FileInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Lumo Binary Module")?;
        writeln!(
            f,
            "  Magic: {}",
            std::str::from_utf8(&self.magic).unwrap_or("INVALID")
        )?;
        writeln!(
            f,
            "  Version: {}.{}.{}",
            self.version.0, self.version.1, self.version.2
        )?;
        writeln!(f, "  Build Mode: {}", self.build_mode)?;
        writeln!(f, "  Sections: {}", self.section_count)?;
        writeln!(f, "  Total Size: {} bytes", self.total_size)?;
        writeln!(f, "  Has Line Info: {}", self.has_line_info)?;
        writeln!(f, "  Is Executable: {}", self.is_executable)?;
        write!(f, "  Entry Unit: {}", self.entry_unit_idx)
    }
}

#[cfg(test)]
mod tests {
    use super::super::writer::{BinaryWriter, WriteOptions};
    use super::*;

    fn create_test_binary() -> Vec<u8> {
        let mut writer = BinaryWriter::new(&WriteOptions::default());
        writer.write_section(SectionKind::UnitPool, b"unit pool data");
        writer.write_section(SectionKind::LineInfo, &[0x01, 0x02, 0x03]);
        writer.set_entry(0);
        writer.finish()
    }

    #[test]
    fn test_reader_basic() {
        let reader = BinaryReader::from_bytes(create_test_binary()).unwrap();
        assert_eq!(reader.header().magic, super::super::header::MAGIC);
        assert_eq!(reader.sections().count(), 2);
    }

    #[test]
    fn test_read_section() {
        let reader = BinaryReader::from_bytes(create_test_binary()).unwrap();
        assert_eq!(
            reader.read_section(SectionKind::UnitPool).unwrap(),
            b"unit pool data"
        );
        assert_eq!(
            reader.read_section(SectionKind::LineInfo).unwrap(),
            &[0x01, 0x02, 0x03]
        );
    }

    #[test]
    fn test_has_section() {
        let reader = BinaryReader::from_bytes(create_test_binary()).unwrap();
        assert!(reader.has_section(SectionKind::UnitPool));
        assert!(!reader.has_section(SectionKind::Signature));
    }

    #[test]
    fn test_section_not_found() {
        let reader = BinaryReader::from_bytes(create_test_binary()).unwrap();
        assert!(matches!(
            reader.read_section(SectionKind::Signature),
            Err(ReadError::SectionNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_magic_rejected() {
        let mut data = create_test_binary();
        data[0] = b'X';
        assert!(BinaryReader::from_bytes(data).is_err());
    }

    #[test]
    fn test_truncated_directory_rejected() {
        let data = create_test_binary();
        // 截掉 directory 尾部
        let truncated = data[..data.len() - 4].to_vec();
        assert!(BinaryReader::from_bytes(truncated).is_err());
    }

    #[test]
    fn test_file_info() {
        let reader = BinaryReader::from_bytes(create_test_binary()).unwrap();
        let info = FileInfo::from_reader(&reader);
        assert_eq!(info.build_mode, "Debug");
        assert!(info.has_line_info);
        assert!(info.is_executable);
        let text = info.to_string();
        assert!(text.contains("Lumo Binary Module"));
        assert!(text.contains("Sections: 2"));
    }
}
