use std::collections::BTreeMap;

use serde::Serialize;

use crate::grades::{self, LetterGrade, PassStatus};
use crate::store::RecordStore;
use crate::student::StudentRecord;
use crate::utils::Result;

/// 成绩汇总报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// 学生总数
    pub total: usize,
    /// 及格人数
    pub passed: usize,
    /// 不及格人数
    pub failed: usize,
    /// 无成绩人数（不计入及格/不及格、等级分布和总平均分）
    pub no_grades: usize,
    /// 有成绩学生的平均分之平均
    pub overall_average: f64,
    /// 字母等级分布，A..F 全部列出
    pub distribution: BTreeMap<LetterGrade, usize>,
}

impl Report {
    /// 某个等级的人数
    pub fn count(&self, letter: LetterGrade) -> usize {
        self.distribution.get(&letter).copied().unwrap_or(0)
    }

    fn percent(&self, count: usize) -> f64 {
        count as f64 / self.total as f64 * 100.0
    }
}

/// 生成汇总报告，存储为空时返回 `None`（无可报告内容）
pub fn summarize(store: &RecordStore) -> Option<Report> {
    if store.is_empty() {
        return None;
    }

    let mut distribution: BTreeMap<LetterGrade, usize> =
        LetterGrade::ALL.iter().map(|letter| (*letter, 0)).collect();
    let mut passed = 0;
    let mut failed = 0;
    let mut no_grades = 0;
    let mut average_sum = 0.0;

    for record in store {
        if !record.has_grades() {
            no_grades += 1;
            continue;
        }

        let avg = record.average();
        average_sum += avg;
        match grades::pass_fail(avg) {
            PassStatus::Pass => passed += 1,
            PassStatus::Fail => failed += 1,
        }
        *distribution.entry(grades::letter_grade(avg)).or_insert(0) += 1;
    }

    let graded = passed + failed;
    let overall_average = if graded == 0 {
        0.0
    } else {
        average_sum / graded as f64
    };

    Some(Report {
        total: store.len(),
        passed,
        failed,
        no_grades,
        overall_average,
        distribution,
    })
}

/// JSON导出结构：全部记录 + 汇总报告
#[derive(Serialize)]
struct Export<'a> {
    records: &'a [StudentRecord],
    report: Option<Report>,
}

/// 将全部记录和汇总报告导出为格式化的 JSON 文本
pub fn export_json(store: &RecordStore) -> Result<String> {
    let export = Export {
        records: store.records(),
        report: summarize(store),
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== 成绩统计报告 ===")?;
        writeln!(f, "学生总数: {}", self.total)?;
        writeln!(f, "及格: {} ({:.1}%)", self.passed, self.percent(self.passed))?;
        writeln!(f, "不及格: {} ({:.1}%)", self.failed, self.percent(self.failed))?;
        if self.no_grades > 0 {
            writeln!(f, "无成绩: {} ({:.1}%)", self.no_grades, self.percent(self.no_grades))?;
        }
        writeln!(f, "总平均分: {:.2}", self.overall_average)?;
        writeln!(f)?;
        writeln!(f, "=== 等级分布 ===")?;
        for letter in LetterGrade::ALL {
            let count = self.count(letter);
            writeln!(f, "{}: {} 人 ({:.1}%)", letter, count, self.percent(count))?;
        }
        Ok(())
    }
}
