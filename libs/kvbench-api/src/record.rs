use serde::{Deserialize, Serialize};

use crate::error::WireError;

// ═══════════════════════════════════════════════════════════════
//  Op
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Read,
    Write,
}

impl Op {
    pub fn code(self) -> u32 {
        match self {
            Op::Read => 0,
            Op::Write => 1,
        }
    }

    pub fn from_code(code: u32) -> Result<Self, WireError> {
        match code {
            0 => Ok(Op::Read),
            1 => Ok(Op::Write),
            other => Err(WireError::UnknownOp(other)),
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Op::Read => f.write_str("read"),
            Op::Write => f.write_str("write"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Layout
// ═══════════════════════════════════════════════════════════════

/// Byte layout of the request/reply frame for a given value size.
///
/// All integers are little-endian and packed with no gaps:
///
/// ```text
/// 0        4        8            8+V              16+V          24+V
/// | op u32 | key u32 | value [V]  | server_latency | issue_time  |
/// ```
///
/// With `value_size = 8` this is the legacy 32-byte header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    value_size: usize,
}

impl Layout {
    const OP: usize = 0;
    const KEY: usize = 4;
    const VALUE: usize = 8;
    const FIXED: usize = 24;

    pub const fn new(value_size: usize) -> Self {
        Self { value_size }
    }

    pub const fn value_size(&self) -> usize {
        self.value_size
    }

    /// Total frame length in bytes.
    pub const fn frame_len(&self) -> usize {
        Self::FIXED + self.value_size
    }

    const fn server_latency_offset(&self) -> usize {
        Self::VALUE + self.value_size
    }

    const fn issue_time_offset(&self) -> usize {
        Self::VALUE + self.value_size + 8
    }

    /// Writes `record` into `buf`, replacing its contents.
    pub fn encode(&self, record: &Record, buf: &mut Vec<u8>) -> Result<(), WireError> {
        if record.value.len() != self.value_size {
            return Err(WireError::ValueSize {
                expected: self.value_size,
                actual: record.value.len(),
            });
        }
        buf.clear();
        buf.reserve(self.frame_len());
        buf.extend_from_slice(&record.op.code().to_le_bytes());
        buf.extend_from_slice(&record.key.to_le_bytes());
        buf.extend_from_slice(&record.value);
        buf.extend_from_slice(&record.server_latency.to_le_bytes());
        buf.extend_from_slice(&record.issue_time.to_le_bytes());
        Ok(())
    }

    pub fn decode(&self, buf: &[u8]) -> Result<Record, WireError> {
        self.check(buf)?;
        let op = Op::from_code(read_u32(buf, Self::OP))?;
        Ok(Record {
            op,
            key: read_u32(buf, Self::KEY),
            value: buf[Self::VALUE..Self::VALUE + self.value_size].to_vec(),
            server_latency: read_u64(buf, self.server_latency_offset()),
            issue_time: read_u64(buf, self.issue_time_offset()),
        })
    }

    /// Validates the frame and returns only its `issue_time`, without copying
    /// the value payload.
    pub fn peek_issue_time(&self, buf: &[u8]) -> Result<u64, WireError> {
        self.check(buf)?;
        Op::from_code(read_u32(buf, Self::OP))?;
        Ok(read_u64(buf, self.issue_time_offset()))
    }

    /// Overwrites the `issue_time` field of an already encoded frame.
    ///
    /// # Panics
    /// If `buf` is shorter than [`Layout::frame_len`].
    pub fn stamp_issue_time(&self, buf: &mut [u8], issue_time: u64) {
        let at = self.issue_time_offset();
        buf[at..at + 8].copy_from_slice(&issue_time.to_le_bytes());
    }

    /// Overwrites the `server_latency` field of an already encoded frame.
    ///
    /// # Panics
    /// If `buf` is shorter than [`Layout::frame_len`].
    pub fn stamp_server_latency(&self, buf: &mut [u8], ts: u64) {
        let at = self.server_latency_offset();
        buf[at..at + 8].copy_from_slice(&ts.to_le_bytes());
    }

    fn check(&self, buf: &[u8]) -> Result<(), WireError> {
        if buf.len() != self.frame_len() {
            return Err(WireError::Length {
                expected: self.frame_len(),
                actual: buf.len(),
            });
        }
        Ok(())
    }
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

// ═══════════════════════════════════════════════════════════════
//  Record
// ═══════════════════════════════════════════════════════════════

/// One request or reply. The same shape travels in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub op: Op,
    pub key: u32,
    pub value: Vec<u8>,
    /// Set by the service when it replies. Informational only.
    pub server_latency: u64,
    /// Set by the client right before sending, echoed back untouched.
    pub issue_time: u64,
}

impl Record {
    pub fn read(key: u32, value_size: usize) -> Self {
        Self {
            op: Op::Read,
            key,
            value: vec![0; value_size],
            server_latency: 0,
            issue_time: 0,
        }
    }

    pub fn write(key: u32, value: Vec<u8>) -> Self {
        Self {
            op: Op::Write,
            key,
            value,
            server_latency: 0,
            issue_time: 0,
        }
    }

    pub fn is_write(&self) -> bool {
        self.op == Op::Write
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_has_no_padding() {
        assert_eq!(Layout::new(8).frame_len(), 32);
        assert_eq!(Layout::new(128).frame_len(), 152);
        assert_eq!(Layout::new(1).frame_len(), 25);
    }

    #[test]
    fn field_offsets_match_legacy_header() {
        let layout = Layout::new(8);
        let record = Record {
            op: Op::Write,
            key: 0x0102_0304,
            value: vec![0xAA; 8],
            server_latency: 0x1111_2222_3333_4444,
            issue_time: 0x5555_6666_7777_8888,
        };
        let mut buf = Vec::new();
        layout.encode(&record, &mut buf).unwrap();

        assert_eq!(&buf[0..4], &[1, 0, 0, 0]);
        assert_eq!(&buf[4..8], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&buf[8..16], &[0xAA; 8]);
        assert_eq!(&buf[16..24], &0x1111_2222_3333_4444u64.to_le_bytes());
        assert_eq!(&buf[24..32], &0x5555_6666_7777_8888u64.to_le_bytes());
        assert_eq!(layout.decode(&buf).unwrap(), record);
    }

    #[test]
    fn stamping_rewrites_in_place() {
        let layout = Layout::new(16);
        let mut buf = Vec::new();
        layout.encode(&Record::read(7, 16), &mut buf).unwrap();

        layout.stamp_issue_time(&mut buf, 42);
        layout.stamp_server_latency(&mut buf, 99);

        let decoded = layout.decode(&buf).unwrap();
        assert_eq!(decoded.issue_time, 42);
        assert_eq!(decoded.server_latency, 99);
        assert_eq!(decoded.key, 7);
        assert_eq!(layout.peek_issue_time(&buf).unwrap(), 42);
    }

    #[test]
    fn undersized_frame_is_rejected() {
        let layout = Layout::new(128);
        let err = layout.decode(&[0u8; 40]).unwrap_err();
        assert_eq!(err, WireError::Length { expected: 152, actual: 40 });
        assert!(layout.peek_issue_time(&[]).is_err());
    }

    #[test]
    fn unknown_op_is_rejected() {
        let layout = Layout::new(8);
        let mut buf = Vec::new();
        layout.encode(&Record::read(1, 8), &mut buf).unwrap();
        buf[0] = 7;
        assert_eq!(layout.decode(&buf).unwrap_err(), WireError::UnknownOp(7));
        assert_eq!(layout.peek_issue_time(&buf).unwrap_err(), WireError::UnknownOp(7));
    }

    #[test]
    fn encode_rejects_wrong_value_size() {
        let layout = Layout::new(8);
        let mut buf = Vec::new();
        let err = layout.encode(&Record::write(1, vec![b'x'; 3]), &mut buf).unwrap_err();
        assert_eq!(err, WireError::ValueSize { expected: 8, actual: 3 });
    }
}
