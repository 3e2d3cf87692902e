//! 内存流设备（Runtime 层）
//!
//! 核心只提供同步内存流：能力由标志声明，缺失能力的操作
//! 统一报告 `Unsupported`，由调用方映射为语言级异常。
//! 不做任何阻塞 IO。

/// readall 的分块大小
const READALL_CHUNK: usize = 256;

/// 流能力标志
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamCaps {
    pub read: bool,
    pub write: bool,
}

impl StreamCaps {
    pub const READ_WRITE: StreamCaps = StreamCaps {
        read: true,
        write: true,
    };
    pub const READ_ONLY: StreamCaps = StreamCaps {
        read: true,
        write: false,
    };
    pub const WRITE_ONLY: StreamCaps = StreamCaps {
        read: false,
        write: true,
    };
}

/// 流操作错误
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamError {
    /// 设备不具备该能力
    Unsupported,
    /// 流已关闭
    Closed,
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamError::Unsupported => write!(f, "Operation not supported"),
            StreamError::Closed => write!(f, "I/O operation on closed stream"),
        }
    }
}

impl std::error::Error for StreamError {}

/// 内存流
///
/// 读写共用一块缓冲：读取从 `pos` 前进，写入追加到末尾。
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryStream {
    caps: StreamCaps,
    data: Vec<u8>,
    pos: usize,
    closed: bool,
}

impl MemoryStream {
    /// 创建空流
    pub fn new(caps: StreamCaps) -> Self {
        Self {
            caps,
            data: Vec::new(),
            pos: 0,
            closed: false,
        }
    }

    /// 以初始内容创建流
    pub fn with_data(data: Vec<u8>, caps: StreamCaps) -> Self {
        Self {
            caps,
            data,
            pos: 0,
            closed: false,
        }
    }

    pub fn caps(&self) -> StreamCaps {
        self.caps
    }

    /// 未读取的字节数
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// 关闭流（之后所有读写报 Closed）
    pub fn close(&mut self) {
        self.closed = true;
    }

    fn check_readable(&self) -> Result<(), StreamError> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        if !self.caps.read {
            return Err(StreamError::Unsupported);
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<(), StreamError> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        if !self.caps.write {
            return Err(StreamError::Unsupported);
        }
        Ok(())
    }

    // ==================== 读取 ====================

    /// 读取最多 n 个字节（到达末尾返回空）
    pub fn read(&mut self, n: usize) -> Result<Vec<u8>, StreamError> {
        self.check_readable()?;
        let end = (self.pos + n).min(self.data.len());
        let chunk = self.data[self.pos..end].to_vec();
        self.pos = end;
        Ok(chunk)
    }

    /// 读取全部剩余内容（按固定块大小循环读取）
    pub fn readall(&mut self) -> Result<Vec<u8>, StreamError> {
        self.check_readable()?;
        let mut out = Vec::new();
        loop {
            let chunk = self.read(READALL_CHUNK)?;
            if chunk.is_empty() {
                break;
            }
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }

    /// 读取一行（逐字节，含换行符；到达末尾返回已读部分）
    pub fn readline(&mut self) -> Result<Vec<u8>, StreamError> {
        self.check_readable()?;
        let mut line = Vec::new();
        loop {
            let byte = self.read(1)?;
            let Some(&b) = byte.first() else {
                break;
            };
            line.push(b);
            if b == b'\n' {
                break;
            }
        }
        Ok(line)
    }

    // ==================== 写入 ====================

    /// 追加写入，返回写入的字节数
    pub fn write(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        self.check_writable()?;
        self.data.extend_from_slice(data);
        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_in_chunks() {
        let mut s = MemoryStream::with_data(b"hello world".to_vec(), StreamCaps::READ_ONLY);
        assert_eq!(s.read(5).unwrap(), b"hello");
        assert_eq!(s.read(100).unwrap(), b" world");
        assert_eq!(s.read(1).unwrap(), b"");
        assert_eq!(s.remaining(), 0);
    }

    #[test]
    fn test_readall_crosses_chunk_boundary() {
        // 超过一个分块大小，确认循环读取完整
        let data: Vec<u8> = (0..700).map(|i| (i % 251) as u8).collect();
        let mut s = MemoryStream::with_data(data.clone(), StreamCaps::READ_ONLY);
        assert_eq!(s.readall().unwrap(), data);
        assert_eq!(s.readall().unwrap(), b"");
    }

    #[test]
    fn test_readline() {
        let mut s = MemoryStream::with_data(b"one\ntwo\nlast".to_vec(), StreamCaps::READ_ONLY);
        assert_eq!(s.readline().unwrap(), b"one\n");
        assert_eq!(s.readline().unwrap(), b"two\n");
        assert_eq!(s.readline().unwrap(), b"last");
        assert_eq!(s.readline().unwrap(), b"");
    }

    #[test]
    fn test_write_then_read() {
        let mut s = MemoryStream::new(StreamCaps::READ_WRITE);
        assert_eq!(s.write(b"abc").unwrap(), 3);
        assert_eq!(s.write(b"def").unwrap(), 3);
        assert_eq!(s.readall().unwrap(), b"abcdef");
    }

    #[test]
    fn test_missing_capability() {
        let mut s = MemoryStream::new(StreamCaps::WRITE_ONLY);
        let err = s.read(1).unwrap_err();
        assert_eq!(err, StreamError::Unsupported);
        assert_eq!(err.to_string(), "Operation not supported");

        let mut s = MemoryStream::with_data(b"x".to_vec(), StreamCaps::READ_ONLY);
        assert_eq!(s.write(b"y").unwrap_err(), StreamError::Unsupported);
    }

    #[test]
    fn test_closed_stream() {
        let mut s = MemoryStream::new(StreamCaps::READ_WRITE);
        s.close();
        assert_eq!(s.read(1).unwrap_err(), StreamError::Closed);
        assert_eq!(s.write(b"x").unwrap_err(), StreamError::Closed);
    }
}
