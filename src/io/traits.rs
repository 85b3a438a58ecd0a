//! IO 抽象层 - trait 定义
//!
//! 编解码（`codec`）只处理字节，文件访问由这里的 trait 负责。
use std::path::Path;

use crate::codec::LoadOutcome;
use crate::store::{GradePolicy, RecordStore};
use crate::utils::Result;

/// 记录文件读取 trait
///
/// # 职责
/// - 读取记录文件并解码为新的 RecordStore
/// - 文件不存在时返回 `RecordError::FileNotFound`
pub trait StoreReader {
    /// 读取记录文件
    ///
    /// # 参数
    /// * `path` - 文件路径
    /// * `policy` - 新存储使用的成绩策略
    fn read(&self, path: &Path, policy: GradePolicy) -> Result<LoadOutcome>;
}

/// 记录文件写入 trait
///
/// # 职责
/// - 将存储编码并整体覆盖写入目标文件
pub trait StoreWriter {
    /// 写入记录文件
    ///
    /// # 参数
    /// * `store` - 要写入的存储
    /// * `path` - 目标文件路径
    fn write(&self, store: &RecordStore, path: &Path) -> Result<()>;
}
