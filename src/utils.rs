use thiserror::Error;
use std::path::{Path, PathBuf};

/// 自定义错误类型
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Grade must be between 0 and 100, got {0}")]
    InvalidGrade(f64),

    #[error("Student ID {0} already exists")]
    DuplicateId(String),

    #[error("No student found with ID: {0}")]
    NotFound(String),

    #[error("Grade index {index} out of range (record has {len} grades)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Cannot delete the only grade of student {0}")]
    LastGradeProtected(String),

    #[error("File not found: {0:?}")]
    FileNotFound(PathBuf),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

/// 库内统一结果类型
pub type Result<T> = std::result::Result<T, RecordError>;

/// 成绩允许的最小值
pub const MIN_GRADE: f64 = 0.0;
/// 成绩允许的最大值
pub const MAX_GRADE: f64 = 100.0;

/// 检查成绩是否在 [0, 100] 区间内（NaN 视为无效）
pub fn is_valid_grade(grade: f64) -> bool {
    (MIN_GRADE..=MAX_GRADE).contains(&grade)
}

/// 校验单个成绩
pub fn validate_grade(grade: f64) -> Result<f64> {
    if is_valid_grade(grade) {
        Ok(grade)
    } else {
        Err(RecordError::InvalidGrade(grade))
    }
}

/// 创建文件备份
///
/// 备份文件名形如 `student_records.2024-05-01-12-30-00.bak`
pub fn create_backup(file_path: &Path) -> Result<PathBuf> {
    if !file_path.exists() {
        return Err(RecordError::FileNotFound(file_path.to_path_buf()));
    }

    let timestamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S");
    let backup_path = file_path.with_extension(format!("{}.bak", timestamp));

    std::fs::copy(file_path, &backup_path)?;

    Ok(backup_path)
}
