use std::collections::HashMap;
use std::sync::RwLock;

use crate::clock::now_ns;
use crate::record::{Op, Record};

/// Marker placed in the value field of a read reply when the key is absent.
pub const NOT_FOUND: &[u8] = b"null";

// ═══════════════════════════════════════════════════════════════
//  MemoryKv
// ═══════════════════════════════════════════════════════════════

/// In-memory key-value map answering request records.
///
/// Values are stored at the fixed size of the wire layout: shorter inputs are
/// zero-padded, longer ones truncated.
pub struct MemoryKv {
    map: RwLock<HashMap<u32, Vec<u8>>>,
    value_size: usize,
}

impl MemoryKv {
    pub fn new(value_size: usize) -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
            value_size,
        }
    }

    pub fn value_size(&self) -> usize {
        self.value_size
    }

    pub fn put(&self, key: u32, value: &[u8]) {
        let value = self.fit(value);
        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
        map.insert(key, value);
    }

    pub fn get(&self, key: u32) -> Option<Vec<u8>> {
        let map = self.map.read().unwrap_or_else(|e| e.into_inner());
        map.get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Executes `request` and builds the reply: writes are persisted and
    /// echoed, reads carry the stored value or [`NOT_FOUND`]. `issue_time` is
    /// echoed unchanged and `server_latency` is stamped with the reply time.
    pub fn apply(&self, request: &Record) -> Record {
        let value = match request.op {
            Op::Write => {
                self.put(request.key, &request.value);
                self.fit(&request.value)
            }
            Op::Read => self.get(request.key).unwrap_or_else(|| self.fit(NOT_FOUND)),
        };
        Record {
            op: request.op,
            key: request.key,
            value,
            server_latency: now_ns(),
            issue_time: request.issue_time,
        }
    }

    fn fit(&self, value: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; self.value_size];
        let n = value.len().min(self.value_size);
        out[..n].copy_from_slice(&value[..n]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_returns_value() {
        let kv = MemoryKv::new(4);
        let mut req = Record::write(10, b"abcd".to_vec());
        req.issue_time = 123;
        let reply = kv.apply(&req);
        assert_eq!(reply.op, Op::Write);
        assert_eq!(reply.issue_time, 123);
        assert!(reply.server_latency > 0);

        let reply = kv.apply(&Record::read(10, 4));
        assert_eq!(reply.value, b"abcd");
        assert_eq!(kv.len(), 1);
    }

    #[test]
    fn read_of_missing_key_returns_sentinel() {
        let kv = MemoryKv::new(8);
        let reply = kv.apply(&Record::read(5, 8));
        assert_eq!(reply.value, b"null\0\0\0\0");

        let tiny = MemoryKv::new(2);
        assert_eq!(tiny.apply(&Record::read(5, 2)).value, b"nu");
    }

    #[test]
    fn values_are_fitted_to_layout() {
        let kv = MemoryKv::new(4);
        kv.put(1, b"ab");
        kv.put(2, b"abcdef");
        assert_eq!(kv.get(1).unwrap(), b"ab\0\0");
        assert_eq!(kv.get(2).unwrap(), b"abcd");
        assert!(kv.get(3).is_none());
    }
}
