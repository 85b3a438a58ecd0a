//! 记录文件 IO 实现
//!
//! 提供基于文件系统的默认记录文件读写实现
use std::path::Path;

use tracing::info;

use super::traits::{StoreReader, StoreWriter};
use crate::codec::{self, LoadOutcome};
use crate::store::{GradePolicy, RecordStore};
use crate::utils::{create_backup, RecordError, Result};

/// 默认的记录文件读取器（基于 std::fs）
#[derive(Debug, Clone, Default)]
pub struct CsvStoreReader;

impl StoreReader for CsvStoreReader {
    fn read(&self, path: &Path, policy: GradePolicy) -> Result<LoadOutcome> {
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RecordError::FileNotFound(path.to_path_buf()),
            _ => RecordError::Io(e),
        })?;
        let outcome = codec::decode(&data, policy)?;

        info!(
            path = %path.display(),
            records = outcome.store.len(),
            skipped = outcome.skipped_duplicates,
            "student records loaded"
        );
        Ok(outcome)
    }
}

/// 默认的记录文件写入器（基于 std::fs）
#[derive(Debug, Clone, Default)]
pub struct CsvStoreWriter {
    /// 覆盖前是否为已有文件创建带时间戳的备份
    pub backup: bool,
}

impl CsvStoreWriter {
    pub fn with_backup(backup: bool) -> Self {
        CsvStoreWriter { backup }
    }
}

impl StoreWriter for CsvStoreWriter {
    fn write(&self, store: &RecordStore, path: &Path) -> Result<()> {
        let data = codec::encode(store)?;

        // 确保父目录存在
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        if self.backup && path.exists() {
            let backup_path = create_backup(path)?;
            info!(backup = %backup_path.display(), "previous record file backed up");
        }

        std::fs::write(path, data)?;

        info!(path = %path.display(), records = store.len(), "student records saved");
        Ok(())
    }
}
