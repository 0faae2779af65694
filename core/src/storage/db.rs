use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options};

use super::mirror::{EVENT_PREFIX, RESULT_PREFIX, StateMirror, TRANSACTION_PREFIX};

const CF_TRANSACTIONS: &str = "transactions";
const CF_RESULTS: &str = "results";
const CF_EVENTS: &str = "events";

/// RocksDB-backed mirror. Keys are routed to a column family by prefix;
/// anything else lands in the default family.
#[derive(Clone)]
pub struct RocksDbMirror {
    db: Arc<DB>,
}

impl RocksDbMirror {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![
            ColumnFamilyDescriptor::new(CF_TRANSACTIONS, Options::default()),
            ColumnFamilyDescriptor::new(CF_RESULTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_EVENTS, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, families)
            .map_err(|e| anyhow::anyhow!("Failed to open RocksDB: {}", e))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn family_for(key: &str) -> Option<&'static str> {
        if key.starts_with(TRANSACTION_PREFIX) {
            Some(CF_TRANSACTIONS)
        } else if key.starts_with(RESULT_PREFIX) {
            Some(CF_RESULTS)
        } else if key.starts_with(EVENT_PREFIX) {
            Some(CF_EVENTS)
        } else {
            None
        }
    }

    /// Number of entries mirrored into a family, for status output
    pub fn count(&self, family: &str) -> Result<usize> {
        let cf = self
            .db
            .cf_handle(family)
            .with_context(|| format!("{family} CF missing"))?;

        let mut count = 0;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }
}

impl StateMirror for RocksDbMirror {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = match Self::family_for(key) {
            Some(family) => {
                let cf = self
                    .db
                    .cf_handle(family)
                    .with_context(|| format!("{family} CF missing"))?;
                self.db.get_cf(cf, key.as_bytes())?
            }
            None => self.db.get(key.as_bytes())?,
        };
        Ok(value)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        match Self::family_for(key) {
            Some(family) => {
                let cf = self
                    .db
                    .cf_handle(family)
                    .with_context(|| format!("{family} CF missing"))?;
                self.db.put_cf(cf, key.as_bytes(), value)?;
            }
            None => self.db.put(key.as_bytes(), value)?,
        }
        Ok(())
    }
}
