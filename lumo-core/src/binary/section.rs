//! Section 定义和管理
//!
//! Section Directory 管理文件中所有 section 的偏移和大小。

/// Section 类型
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// 单元池（字节码、常量池、标识符表）
    UnitPool = 0x01,
    /// 行号信息（Release 可剥离）
    LineInfo = 0x02,
    /// 签名（预留）
    Signature = 0x03,
}

impl SectionKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(SectionKind::UnitPool),
            0x02 => Some(SectionKind::LineInfo),
            0x03 => Some(SectionKind::Signature),
            _ => None,
        }
    }
}

/// Section Directory 条目 (12 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionEntry {
    /// Section 类型 (1 byte)
    pub kind: SectionKind,
    /// 对齐填充 (1 byte)
    pub padding: u8,
    /// 标志（预留，2 bytes）
    pub flags: u16,
    /// 在文件中的偏移 (4 bytes)
    pub offset: u32,
    /// 大小 (4 bytes)
    pub size: u32,
}

impl SectionEntry {
    /// 条目大小: 12 bytes
    pub const ENTRY_SIZE: usize = 12;

    pub fn new(kind: SectionKind, offset: u32, size: u32) -> Self {
        Self {
            kind,
            padding: 0,
            flags: 0,
            offset,
            size,
        }
    }

    pub fn to_bytes(&self) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        bytes[0] = self.kind as u8;
        bytes[1] = self.padding;
        bytes[2..4].copy_from_slice(&self.flags.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.offset.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.size.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SectionError> {
        if bytes.len() < Self::ENTRY_SIZE {
            return Err(SectionError::TooShort);
        }
        let kind = SectionKind::from_u8(bytes[0]).ok_or(SectionError::InvalidKind(bytes[0]))?;
        Ok(Self {
            kind,
            padding: bytes[1],
            flags: u16::from_le_bytes([bytes[2], bytes[3]]),
            offset: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            size: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        })
    }
}

/// Section Directory
#[derive(Debug, Clone, Default)]
pub struct SectionDirectory {
    pub entries: Vec<SectionEntry>,
}

impl SectionDirectory {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, entry: SectionEntry) {
        self.entries.push(entry);
    }

    pub fn find(&self, kind: SectionKind) -> Option<&SectionEntry> {
        self.entries.iter().find(|e| e.kind == kind)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn serialized_size(&self) -> usize {
        self.entries.len() * SectionEntry::ENTRY_SIZE
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.serialized_size());
        for entry in &self.entries {
            bytes.extend_from_slice(&entry.to_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SectionError> {
        if bytes.len() % SectionEntry::ENTRY_SIZE != 0 {
            return Err(SectionError::InvalidSize);
        }
        let count = bytes.len() / SectionEntry::ENTRY_SIZE;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let start = i * SectionEntry::ENTRY_SIZE;
            entries.push(SectionEntry::from_bytes(
                &bytes[start..start + SectionEntry::ENTRY_SIZE],
            )?);
        }
        Ok(Self { entries })
    }
}

/// Section 错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionError {
    TooShort,
    InvalidKind(u8),
    InvalidSize,
}

impl std::fmt::Display for SectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionError::TooShort => write!(f, "section data too short"),
            SectionError::InvalidKind(k) => write!(f, "invalid section kind: {}", k),
            SectionError::InvalidSize => write!(f, "invalid section data size"),
        }
    }
}

impl std::error::Error for SectionError {}
