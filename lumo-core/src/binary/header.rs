//! 二进制文件头定义
//!
//! 64 字节固定大小的文件头：Magic、版本、构建信息、Section Directory 位置与入口单元。

/// 文件头魔数: "LUMO"
pub const MAGIC: [u8; 4] = [b'L', b'U', b'M', b'O'];

/// 当前文件格式版本
pub const VERSION_MAJOR: u8 = 0;
pub const VERSION_MINOR: u8 = 1;
pub const VERSION_PATCH: u8 = 0;

/// 文件头大小: 64 字节
pub const HEADER_SIZE: usize = 64;

/// 构建模式
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Debug 模式（携带行号信息）
    Debug = 0x01,
    /// Release 模式（行号信息可剥离）
    Release = 0x02,
}

/// 特性标志位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags(pub u32);

impl FeatureFlags {
    /// 包含行号信息 section
    pub const HAS_LINE_INFO: u32 = 0x0001;
    /// 可执行（header 的入口单元有效）
    pub const IS_EXECUTABLE: u32 = 0x0002;
    /// 剥离源码路径
    pub const STRIP_SOURCE: u32 = 0x0004;

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn contains(&self, flag: u32) -> bool {
        (self.0 & flag) != 0
    }

    pub fn insert(&mut self, flag: u32) {
        self.0 |= flag;
    }

    pub fn remove(&mut self, flag: u32) {
        self.0 &= !flag;
    }
}

/// 文件头 (64 字节)
///
/// ```text
/// 0..4   magic "LUMO"        4..7   version (major/minor/patch)
/// 7      保留                 8      build_mode
/// 9..12  保留                 12..16 build_timestamp (u32 LE)
/// 16..20 flags (u32 LE)      20..22 section_count (u16 LE)
/// 22..26 section_dir_offset  26..30 section_dir_size
/// 30..32 entry_unit_idx      32..48 source_hash
/// 48..64 保留
/// ```
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub version_major: u8,
    pub version_minor: u8,
    pub version_patch: u8,
    pub reserved1: u8,

    pub build_mode: BuildMode,
    pub reserved2: [u8; 3],
    /// 构建时间戳 (Unix 秒)
    pub build_timestamp: u32,

    pub flags: FeatureFlags,

    pub section_count: u16,
    pub section_dir_offset: u32,
    pub section_dir_size: u32,

    /// 入口单元在 UnitPool 中的下标
    pub entry_unit_idx: u16,
    /// 源码哈希（增量构建检测）
    pub source_hash: [u8; 16],
    pub reserved3: [u8; 16],
}

impl FileHeader {
    pub fn new(build_mode: BuildMode) -> Self {
        Self {
            magic: MAGIC,
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            version_patch: VERSION_PATCH,
            reserved1: 0,
            build_mode,
            reserved2: [0; 3],
            build_timestamp: current_timestamp(),
            flags: FeatureFlags::empty(),
            section_count: 0,
            section_dir_offset: 0,
            section_dir_size: 0,
            entry_unit_idx: 0,
            source_hash: [0; 16],
            reserved3: [0; 16],
        }
    }

    /// 序列化为字节数组
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];

        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version_major;
        bytes[5] = self.version_minor;
        bytes[6] = self.version_patch;
        bytes[7] = self.reserved1;

        bytes[8] = self.build_mode as u8;
        bytes[9..12].copy_from_slice(&self.reserved2);
        bytes[12..16].copy_from_slice(&self.build_timestamp.to_le_bytes());

        bytes[16..20].copy_from_slice(&self.flags.0.to_le_bytes());

        bytes[20..22].copy_from_slice(&self.section_count.to_le_bytes());
        bytes[22..26].copy_from_slice(&self.section_dir_offset.to_le_bytes());
        bytes[26..30].copy_from_slice(&self.section_dir_size.to_le_bytes());

        bytes[30..32].copy_from_slice(&self.entry_unit_idx.to_le_bytes());
        bytes[32..48].copy_from_slice(&self.source_hash);
        bytes[48..64].copy_from_slice(&self.reserved3);

        bytes
    }

    /// 从字节数组反序列化
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < HEADER_SIZE {
            return Err(HeaderError::TooShort);
        }

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        if magic != MAGIC {
            return Err(HeaderError::InvalidMagic(magic));
        }

        let build_mode = match bytes[8] {
            0x01 => BuildMode::Debug,
            0x02 => BuildMode::Release,
            n => return Err(HeaderError::InvalidBuildMode(n)),
        };

        let mut reserved2 = [0u8; 3];
        reserved2.copy_from_slice(&bytes[9..12]);

        let build_timestamp = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        let flags = FeatureFlags(u32::from_le_bytes([
            bytes[16], bytes[17], bytes[18], bytes[19],
        ]));

        let section_count = u16::from_le_bytes([bytes[20], bytes[21]]);
        let section_dir_offset = u32::from_le_bytes([bytes[22], bytes[23], bytes[24], bytes[25]]);
        let section_dir_size = u32::from_le_bytes([bytes[26], bytes[27], bytes[28], bytes[29]]);

        let entry_unit_idx = u16::from_le_bytes([bytes[30], bytes[31]]);

        let mut source_hash = [0u8; 16];
        source_hash.copy_from_slice(&bytes[32..48]);
        let mut reserved3 = [0u8; 16];
        reserved3.copy_from_slice(&bytes[48..64]);

        Ok(Self {
            magic,
            version_major: bytes[4],
            version_minor: bytes[5],
            version_patch: bytes[6],
            reserved1: bytes[7],
            build_mode,
            reserved2,
            build_timestamp,
            flags,
            section_count,
            section_dir_offset,
            section_dir_size,
            entry_unit_idx,
            source_hash,
            reserved3,
        })
    }

    /// 验证文件头（主版本必须一致）
    pub fn validate(&self) -> Result<(), HeaderError> {
        if self.magic != MAGIC {
            return Err(HeaderError::InvalidMagic(self.magic));
        }
        if self.version_major != VERSION_MAJOR {
            return Err(HeaderError::UnsupportedVersion {
                major: self.version_major,
                minor: self.version_minor,
                patch: self.version_patch,
            });
        }
        Ok(())
    }
}

/// 文件头错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    TooShort,
    InvalidMagic([u8; 4]),
    InvalidBuildMode(u8),
    UnsupportedVersion { major: u8, minor: u8, patch: u8 },
}

impl std::fmt::Display for HeaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeaderError::TooShort => write!(f, "header too short"),
            HeaderError::InvalidMagic(m) => {
                write!(f, "invalid magic: {:02x?} (expected LUMO)", m)
            }
            HeaderError::InvalidBuildMode(n) => write!(f, "invalid build mode: {}", n),
            HeaderError::UnsupportedVersion {
                major,
                minor,
                patch,
            } => {
                write!(f, "unsupported format version: {}.{}.{}", major, minor, patch)
            }
        }
    }
}

impl std::error::Error for HeaderError {}

/// 当前 Unix 时间戳（秒）
fn current_timestamp() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as u32
}
