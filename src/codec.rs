//! 存储持久化编解码模块
//!
//! 磁盘格式为 UTF-8 逗号分隔文本：
//!
//! ```text
//! ID,Name,Grades
//! S1001,Alice Johnson,85.0;92.0;78.0
//! S1002,"Smith, Bob",
//! ```
//!
//! - 含逗号、引号或换行的字段按标准方式加引号转义
//! - 成绩之间用 `;` 连接，没有成绩时为空字符串
//! - 行尾为 `\r\n`，读取时兼容 `\n`
use std::path::Path;

use tracing::warn;

use crate::io::{CsvStoreReader, CsvStoreWriter, StoreReader, StoreWriter};
use crate::store::{GradePolicy, RecordStore};
use crate::student::StudentRecord;
use crate::utils::{is_valid_grade, RecordError, Result};

/// 文件头列名
pub const HEADER: [&str; 3] = ["ID", "Name", "Grades"];

/// 成绩列表内部分隔符
pub const GRADE_SEPARATOR: char = ';';

/// 加载结果
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// 加载得到的新存储
    pub store: RecordStore,
    /// 因学号重复被跳过的行数（保留首次出现的行）
    pub skipped_duplicates: usize,
}

/// 将存储写入文件（整体覆盖）
pub fn save(store: &RecordStore, path: &Path) -> Result<()> {
    CsvStoreWriter::default().write(store, path)
}

/// 从文件加载存储
///
/// 文件不存在时返回 `FileNotFound`
pub fn load(path: &Path, policy: GradePolicy) -> Result<LoadOutcome> {
    CsvStoreReader.read(path, policy)
}

/// 格式化单个成绩
///
/// 整数值保留一位小数（`85.0`），其余使用最短往返表示（`92.5`）
pub fn format_grade(grade: f64) -> String {
    if grade.fract() == 0.0 && grade.is_finite() {
        format!("{:.1}", grade)
    } else {
        format!("{}", grade)
    }
}

/// 将成绩列表编码为 `;` 分隔的字符串
pub fn format_grades(grades: &[f64]) -> String {
    grades
        .iter()
        .map(|g| format_grade(*g))
        .collect::<Vec<_>>()
        .join(&GRADE_SEPARATOR.to_string())
}

/// 解析 `;` 分隔的成绩字符串，空字符串得到空列表
pub fn parse_grades(field: &str) -> std::result::Result<Vec<f64>, String> {
    if field.trim().is_empty() {
        return Ok(Vec::new());
    }

    field
        .split(GRADE_SEPARATOR)
        .map(|token| {
            let token = token.trim();
            let grade: f64 = token
                .parse()
                .map_err(|_| format!("invalid grade value '{}'", token))?;
            if !is_valid_grade(grade) {
                return Err(format!("grade {} is outside 0-100", token));
            }
            Ok(grade)
        })
        .collect()
}

/// 将存储编码为文件字节
pub fn encode(store: &RecordStore) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(HEADER).map_err(csv_write_error)?;

    for record in store {
        let grades = format_grades(&record.grades);
        writer
            .write_record([record.id.as_str(), record.name.as_str(), grades.as_str()])
            .map_err(csv_write_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| RecordError::Io(e.into_error()))
}

/// 从文件字节解码存储
pub fn decode(data: &[u8], policy: GradePolicy) -> Result<LoadOutcome> {
    let text = decode_text(data)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut store = RecordStore::with_policy(policy);
    let mut skipped_duplicates = 0;
    let mut header_seen = false;

    for row in reader.records() {
        let row = row.map_err(|e| RecordError::Parse {
            line: e.position().map(|p| p.line()).unwrap_or(0),
            message: e.to_string(),
        })?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);

        if !header_seen {
            header_seen = true;
            check_header(&row, line)?;
            continue;
        }

        let record = parse_row(&row, line)?;
        let id = record.id.clone();
        if !store.push_loaded(record) {
            warn!(line, id = %id, "duplicate student ID in file, keeping the first row");
            skipped_duplicates += 1;
        }
    }

    Ok(LoadOutcome {
        store,
        skipped_duplicates,
    })
}

/// 解码文件文本：识别 BOM，拒绝无效编码
fn decode_text(data: &[u8]) -> Result<String> {
    let (encoding, bom_len) =
        encoding_rs::Encoding::for_bom(data).unwrap_or((encoding_rs::UTF_8, 0));

    encoding
        .decode_without_bom_handling_and_without_replacement(&data[bom_len..])
        .map(|text| text.into_owned())
        .ok_or_else(|| RecordError::Parse {
            line: 0,
            message: format!("file is not valid {}", encoding.name()),
        })
}

/// 首行必须是文件头（忽略大小写和首尾空白），否则拒绝整个文件
fn check_header(row: &csv::StringRecord, line: u64) -> Result<()> {
    let matches = row.len() == HEADER.len()
        && row
            .iter()
            .zip(HEADER)
            .all(|(found, expected)| found.trim().eq_ignore_ascii_case(expected));

    if matches {
        Ok(())
    } else {
        Err(RecordError::Parse {
            line,
            message: format!("expected header {}", HEADER.join(",")),
        })
    }
}

/// 解析单行数据
fn parse_row(row: &csv::StringRecord, line: u64) -> Result<StudentRecord> {
    let parse_error = |message: String| RecordError::Parse { line, message };

    if row.len() != HEADER.len() {
        return Err(parse_error(format!(
            "expected {} fields, found {}",
            HEADER.len(),
            row.len()
        )));
    }

    let id = &row[0];
    let name = &row[1];
    if id.is_empty() {
        return Err(parse_error("student ID is empty".to_string()));
    }
    if name.is_empty() {
        return Err(parse_error("student name is empty".to_string()));
    }

    let grades = parse_grades(&row[2]).map_err(parse_error)?;

    Ok(StudentRecord::new(id, name, grades))
}

fn csv_write_error(err: csv::Error) -> RecordError {
    RecordError::Io(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> RecordStore {
        let mut store = RecordStore::new();
        store.insert("S1001", "Alice Johnson", vec![85.5, 92.0, 78.0]).unwrap();
        store.insert("S1002", "Smith, Bob \"Bobby\"", vec![55.0]).unwrap();
        store
    }

    #[test]
    fn test_format_grade() {
        assert_eq!(format_grade(85.0), "85.0");
        assert_eq!(format_grade(85.5), "85.5");
        assert_eq!(format_grade(0.0), "0.0");
        assert_eq!(format_grade(100.0), "100.0");
        assert_eq!(format_grade(33.333), "33.333");
    }

    #[test]
    fn test_parse_grades() {
        assert_eq!(parse_grades("").unwrap(), Vec::<f64>::new());
        assert_eq!(parse_grades("85.5;92.0;78").unwrap(), vec![85.5, 92.0, 78.0]);
        assert_eq!(parse_grades(" 90 ; 80 ").unwrap(), vec![90.0, 80.0]);
        assert!(parse_grades("85;abc").is_err());
        assert!(parse_grades("85;;90").is_err());
        assert!(parse_grades("101").is_err());
        assert!(parse_grades("NaN").is_err());
    }

    #[test]
    fn test_encode_exact_bytes() {
        let data = encode(&create_test_store()).unwrap();
        let text = String::from_utf8(data).unwrap();

        assert_eq!(
            text,
            "ID,Name,Grades\r\n\
             S1001,Alice Johnson,85.5;92.0;78.0\r\n\
             S1002,\"Smith, Bob \"\"Bobby\"\"\",55.0\r\n"
        );
    }

    #[test]
    fn test_encode_empty_store_is_header_only() {
        let data = encode(&RecordStore::new()).unwrap();
        assert_eq!(data, b"ID,Name,Grades\r\n");

        let outcome = decode(&data, GradePolicy::default()).unwrap();
        assert!(outcome.store.is_empty());
    }

    #[test]
    fn test_decode_roundtrip() {
        let store = create_test_store();
        let outcome = decode(&encode(&store).unwrap(), GradePolicy::default()).unwrap();

        assert_eq!(outcome.store.records(), store.records());
        assert_eq!(outcome.skipped_duplicates, 0);
    }

    #[test]
    fn test_decode_empty_grades_and_lf_endings() {
        let data = b"ID,Name,Grades\nS1,Alice,\nS2,Bob,70.0\n";
        let outcome = decode(data, GradePolicy::RequireAtLeastOne).unwrap();

        assert_eq!(outcome.store.len(), 2);
        assert!(outcome.store.find_by_id("S1").unwrap().grades.is_empty());
        assert_eq!(outcome.store.find_by_id("S2").unwrap().grades, vec![70.0]);
    }

    #[test]
    fn test_decode_keeps_first_duplicate() {
        let data = b"ID,Name,Grades\nS1,Alice,90\nS1,Impostor,10\nS2,Bob,70\n";
        let outcome = decode(data, GradePolicy::default()).unwrap();

        assert_eq!(outcome.skipped_duplicates, 1);
        assert_eq!(outcome.store.len(), 2);
        assert_eq!(outcome.store.find_by_id("S1").unwrap().name, "Alice");
    }

    #[test]
    fn test_decode_non_numeric_grade() {
        let data = b"ID,Name,Grades\nS1,Alice,90\nS2,Bob,70;x\n";
        match decode(data, GradePolicy::default()) {
            Err(RecordError::Parse { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("'x'"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_bad_rows() {
        let policy = GradePolicy::default();
        assert!(matches!(decode(b"ID,Name,Grades\nS1,Alice\n", policy), Err(RecordError::Parse { .. })));
        assert!(matches!(decode(b"ID,Name,Grades\n,Alice,90\n", policy), Err(RecordError::Parse { .. })));
        assert!(matches!(decode(b"ID,Name,Grades\nS1,,90\n", policy), Err(RecordError::Parse { .. })));
        assert!(matches!(decode(b"ID,Name,Grades\nS1,Alice,150\n", policy), Err(RecordError::Parse { .. })));
    }

    #[test]
    fn test_decode_zero_byte_file() {
        let outcome = decode(b"", GradePolicy::default()).unwrap();
        assert!(outcome.store.is_empty());
    }

    #[test]
    fn test_decode_strips_utf8_bom() {
        let mut data = vec![0xEF, 0xBB, 0xBF];
        data.extend_from_slice("ID,Name,Grades\r\nS1,Zoë,88.0\r\n".as_bytes());

        let outcome = decode(&data, GradePolicy::default()).unwrap();
        assert_eq!(outcome.store.find_by_id("S1").unwrap().name, "Zoë");
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let data = b"ID,Name,Grades\nS1,\xFF\xFE\xFD,88\n";
        // 首字节不是 BOM，按 UTF-8 解码失败
        assert!(matches!(decode(&data[..], GradePolicy::default()), Err(RecordError::Parse { .. })));
    }

    #[test]
    fn test_decode_header_case_insensitive() {
        let outcome = decode(b"id,name,grades\nS1,Alice,90\n", GradePolicy::default()).unwrap();
        assert_eq!(outcome.store.len(), 1);
    }

    #[test]
    fn test_decode_rejects_headerless_file() {
        match decode(b"S1,Alice,90\nS2,Bob,80\n", GradePolicy::default()) {
            Err(RecordError::Parse { line, message }) => {
                assert_eq!(line, 1);
                assert!(message.contains("ID,Name,Grades"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            decode(b"ID,Name\nS1,Alice\n", GradePolicy::default()),
            Err(RecordError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_decode_applies_policy() {
        let outcome = decode(b"ID,Name,Grades\nS1,Alice,90\n", GradePolicy::AllowEmpty).unwrap();
        assert_eq!(outcome.store.policy(), GradePolicy::AllowEmpty);
    }
}
