use anyhow::Result;
use dashmap::DashMap;

pub const TRANSACTION_PREFIX: &str = "tx/";
pub const RESULT_PREFIX: &str = "result/";
pub const EVENT_PREFIX: &str = "event/";

/// Keys are zero-padded so lexical order matches numeric order.
pub fn transaction_key(id: u64) -> String {
    format!("{TRANSACTION_PREFIX}{id:020}")
}

pub fn result_key(id: u64) -> String {
    format!("{RESULT_PREFIX}{id:020}")
}

pub fn event_key(seq: u64) -> String {
    format!("{EVENT_PREFIX}{seq:020}")
}

/// Opaque key/value store mirrored for display.
pub trait StateMirror: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;
}

/// In-process mirror, used by tests and when persistence is disabled.
#[derive(Debug, Default)]
pub struct MemoryMirror {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StateMirror for MemoryMirror {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_sort_numerically() {
        assert!(transaction_key(9) < transaction_key(10));
        assert_eq!(result_key(3), "result/00000000000000000003");
    }

    #[test]
    fn memory_mirror_overwrites() {
        let mirror = MemoryMirror::new();
        assert_eq!(mirror.get("k").unwrap(), None);
        mirror.set("k", b"one").unwrap();
        mirror.set("k", b"two").unwrap();
        assert_eq!(mirror.get("k").unwrap(), Some(b"two".to_vec()));
        assert_eq!(mirror.len(), 1);
    }
}
