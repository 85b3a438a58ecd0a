//! IO 抽象层模块
//!
//! 该模块提供了记录文件读写的抽象接口，遵循依赖倒置原则。
//! 控制台交互层只依赖 trait，测试时可注入内存实现。
//!
//! # 架构设计
//!
//! - **traits**: 定义 StoreReader/StoreWriter trait 接口
//! - **csv_io**: 基于文件系统的默认实现
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use student_records::io::{CsvStoreReader, StoreReader};
//!
//! let outcome = CsvStoreReader.read(Path::new("student_records.csv"), GradePolicy::default())?;
//! ```
pub mod traits;
pub mod csv_io;

// === 导出 trait 定义 ===
pub use traits::{StoreReader, StoreWriter};

// === 导出默认实现 ===
pub use csv_io::{CsvStoreReader, CsvStoreWriter};
