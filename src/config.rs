//! 配置加载
//!
//! 优先级：命令行参数 > TOML 配置文件 > 编译期默认值
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::store::GradePolicy;
use crate::utils::{RecordError, Result};
use crate::DEFAULT_DATA_FILE;

/// 运行配置
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// 记录文件路径
    pub data_file: PathBuf,
    /// 成绩数量策略
    pub grade_policy: GradePolicy,
    /// 启动时若记录文件存在则自动加载
    pub autoload: bool,
    /// 保存前备份已有文件
    pub backup_on_save: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            grade_policy: GradePolicy::default(),
            autoload: true,
            backup_on_save: false,
        }
    }
}

impl Config {
    /// 解析 TOML 文本
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RecordError::Config(format!("Parse TOML failed: {}", e)))
    }

    /// 读取 TOML 配置文件
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RecordError::FileNotFound(path.to_path_buf()),
            _ => RecordError::Config(format!("Read TOML failed: {}", e)),
        })?;
        Self::from_toml_str(&content)
    }

    /// 按优先级合成最终配置
    ///
    /// * `config_path` - 可选的配置文件，未提供时使用默认值
    /// * `data_file` - 命令行指定的记录文件，覆盖配置文件中的值
    pub fn resolve(config_path: Option<&Path>, data_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(path) = data_file {
            config.data_file = path.to_path_buf();
        }

        Ok(config)
    }
}
