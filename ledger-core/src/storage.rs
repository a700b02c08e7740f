//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `blocks` - Committed blocks (key: big-endian block number)

use crate::{
    error::{Error, Result},
    types::Block,
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, DB};

/// Column family names
const CF_BLOCKS: &str = "blocks";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: DB,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("path", &self.db.path())
            .finish()
    }
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![ColumnFamilyDescriptor::new(
            CF_BLOCKS,
            Self::cf_options_blocks(),
        )];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = ?path, "Opened block store");

        Ok(Self { db })
    }

    fn cf_options_blocks() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    /// Put block
    pub fn put_block(&self, block: &Block) -> Result<()> {
        let cf = self.cf_handle(CF_BLOCKS)?;
        let key = block.header.number.to_be_bytes();
        let value = bincode::serialize(block)?;

        self.db.put_cf(cf, key, value)?;

        tracing::debug!(
            number = block.header.number,
            tx_count = block.tx_count(),
            "Block stored"
        );

        Ok(())
    }

    /// Get block by number
    pub fn get_block(&self, number: u64) -> Result<Block> {
        let cf = self.cf_handle(CF_BLOCKS)?;
        let key = number.to_be_bytes();

        let value = self
            .db
            .get_cf(cf, key)?
            .ok_or(Error::BlockNotFound(number))?;

        let block: Block = bincode::deserialize(&value)?;
        Ok(block)
    }

    /// Get latest block
    pub fn get_latest_block(&self) -> Result<Option<Block>> {
        let cf = self.cf_handle(CF_BLOCKS)?;

        // Big-endian keys sort numerically, so the last key is the tip
        match self.db.iterator_cf(cf, IteratorMode::End).next() {
            Some(item) => {
                let (_, value) = item?;
                let block: Block = bincode::deserialize(&value)?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockData;
    use tempfile::TempDir;

    fn test_config() -> (Config, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (config, temp_dir)
    }

    #[test]
    fn test_storage_open() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();
        assert!(storage.db.cf_handle(CF_BLOCKS).is_some());
        assert!(storage.get_latest_block().unwrap().is_none());
    }

    #[test]
    fn test_put_and_get_block() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        let block = Block::new(0, [0u8; 32], BlockData::new(vec![b"tx".to_vec()]));
        storage.put_block(&block).unwrap();

        let retrieved = storage.get_block(0).unwrap();
        assert_eq!(retrieved, block);
        assert!(matches!(storage.get_block(1), Err(Error::BlockNotFound(1))));
    }

    #[test]
    fn test_latest_block_orders_numerically() {
        let (config, _temp) = test_config();
        let storage = Storage::open(&config).unwrap();

        // 255 and 256 differ in their first non-zero byte position
        for number in [1u64, 256, 255] {
            let block = Block::new(number, [0u8; 32], BlockData::default());
            storage.put_block(&block).unwrap();
        }

        let latest = storage.get_latest_block().unwrap().unwrap();
        assert_eq!(latest.header.number, 256);
    }

    #[test]
    fn test_reopen_keeps_blocks() {
        let (config, _temp) = test_config();
        {
            let storage = Storage::open(&config).unwrap();
            let block = Block::new(0, [0u8; 32], BlockData::default());
            storage.put_block(&block).unwrap();
        }

        let storage = Storage::open(&config).unwrap();
        assert_eq!(storage.get_latest_block().unwrap().unwrap().header.number, 0);
    }
}
