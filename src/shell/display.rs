use std::io::{self, Write};

use crate::codec::format_grade;
use crate::store::RecordStore;
use crate::student::StudentRecord;

const DETAIL_RULE: &str = "========================================";

/// 成绩列表的显示文本，如 `85.0, 92.0, 78.0`
pub fn grades_text(grades: &[f64]) -> String {
    grades
        .iter()
        .map(|g| format_grade(*g))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 输出单个学生的详细信息
pub fn write_student_details<W: Write>(out: &mut W, record: &StudentRecord) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", DETAIL_RULE)?;
    writeln!(out, "学号: {}", record.id)?;
    writeln!(out, "姓名: {}", record.name)?;
    if record.has_grades() {
        writeln!(out, "成绩: {}", grades_text(&record.grades))?;
        writeln!(out, "平均分: {:.2}", record.average())?;
        writeln!(out, "等级: {}", record.letter_grade())?;
        writeln!(out, "状态: {}", record.status())?;
    } else {
        writeln!(out, "成绩: 暂无成绩记录")?;
    }
    writeln!(out, "{}", DETAIL_RULE)
}

/// 输出带编号（从 1 开始）的成绩列表
pub fn write_numbered_grades<W: Write>(out: &mut W, grades: &[f64]) -> io::Result<()> {
    writeln!(out, "\n当前成绩:")?;
    for (i, grade) in grades.iter().enumerate() {
        writeln!(out, "{}. {}", i + 1, format_grade(*grade))?;
    }
    Ok(())
}

/// 输出全部学生的汇总表
pub fn write_student_table<W: Write>(out: &mut W, store: &RecordStore) -> io::Result<()> {
    writeln!(out, "\n--- 全部学生 ---")?;
    writeln!(out, "{:<10} {:<20} {:<10} {:<10} {:<5}", "ID", "Name", "Average", "Status", "Grade")?;
    writeln!(out, "{}", "-".repeat(60))?;

    for record in store {
        if record.has_grades() {
            writeln!(
                out,
                "{:<10} {:<20} {:<10.2} {:<10} {:<5}",
                record.id,
                record.name,
                record.average(),
                record.status().to_string(),
                record.letter_grade().to_string()
            )?;
        } else {
            writeln!(out, "{:<10} {:<20} {:<10} {:<10} {:<5}", record.id, record.name, "-", "-", "-")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grades_text() {
        assert_eq!(grades_text(&[85.0, 92.5]), "85.0, 92.5");
        assert_eq!(grades_text(&[]), "");
    }

    #[test]
    fn test_student_details() {
        let record = StudentRecord::new("S1001", "Alice Johnson", vec![85.0, 92.0, 78.0]);
        let mut out = Vec::new();
        write_student_details(&mut out, &record).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("学号: S1001"));
        assert!(text.contains("成绩: 85.0, 92.0, 78.0"));
        assert!(text.contains("平均分: 85.00"));
        assert!(text.contains("等级: B"));
        assert!(text.contains("状态: Pass"));
    }

    #[test]
    fn test_student_table() {
        let mut store = RecordStore::new();
        store.insert("S1002", "Bob Smith", vec![55.0, 58.0, 52.0]).unwrap();

        let mut out = Vec::new();
        write_student_table(&mut out, &store).unwrap();
        let text = String::from_utf8(out).unwrap();

        let row = text.lines().find(|l| l.starts_with("S1002")).unwrap();
        assert!(row.contains("Bob Smith"));
        assert!(row.contains("55.00"));
        assert!(row.contains("Fail"));
        assert!(row.trim_end().ends_with('F'));
    }
}
