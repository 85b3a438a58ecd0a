pub mod auth;
pub mod codec;
pub mod config;
pub mod grades;
pub mod io;
pub mod report;
pub mod shell;
pub mod store;
pub mod student;
pub mod utils;

// 重新导出主要结构
pub use auth::{CredentialTable, Permissions, Role, Session};
pub use codec::{load, save, LoadOutcome};
pub use config::Config;
pub use grades::{LetterGrade, PassStatus};
pub use report::{export_json, summarize, Report};
pub use shell::{Shell, ShellExit};
pub use store::{GradePolicy, RecordStore};
pub use student::StudentRecord;
pub use utils::{RecordError, Result};

// 常量定义
pub const DEFAULT_DATA_FILE: &str = "student_records.csv";
