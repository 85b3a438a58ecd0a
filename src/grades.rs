use serde::{Deserialize, Serialize};
use std::fmt;

/// 及格线
pub const PASSING_AVERAGE: f64 = 60.0;

/// 字母等级
///
/// 下界均为闭区间：A ≥ 90，B ≥ 80，C ≥ 70，D ≥ 60，其余为 F
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    /// 按 A..F 顺序排列的全部等级
    pub const ALL: [LetterGrade; 5] = [
        LetterGrade::A,
        LetterGrade::B,
        LetterGrade::C,
        LetterGrade::D,
        LetterGrade::F,
    ];

    /// 等级对应的字母
    pub fn as_str(&self) -> &'static str {
        match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 及格状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassStatus {
    Pass,
    Fail,
}

impl fmt::Display for PassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassStatus::Pass => f.write_str("Pass"),
            PassStatus::Fail => f.write_str("Fail"),
        }
    }
}

/// 计算平均分，空序列返回 0.0
pub fn average(grades: &[f64]) -> f64 {
    if grades.is_empty() {
        return 0.0;
    }
    grades.iter().sum::<f64>() / grades.len() as f64
}

/// 平均分转换为字母等级
pub fn letter_grade(average: f64) -> LetterGrade {
    if average >= 90.0 {
        LetterGrade::A
    } else if average >= 80.0 {
        LetterGrade::B
    } else if average >= 70.0 {
        LetterGrade::C
    } else if average >= 60.0 {
        LetterGrade::D
    } else {
        LetterGrade::F
    }
}

/// 判定是否及格
pub fn pass_fail(average: f64) -> PassStatus {
    if average >= PASSING_AVERAGE {
        PassStatus::Pass
    } else {
        PassStatus::Fail
    }
}
