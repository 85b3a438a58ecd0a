use serde::{Deserialize, Serialize};

use crate::grades::{self, LetterGrade, PassStatus};

/// 学生记录
///
/// - `id`：外部分配，区分大小写，在整个存储中唯一
/// - `name`：非空姓名
/// - `grades`：按录入顺序排列的成绩，每项位于 [0, 100]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    /// 学号
    pub id: String,
    /// 姓名
    pub name: String,
    /// 成绩列表
    pub grades: Vec<f64>,
}

impl StudentRecord {
    /// 创建新的学生记录（不做校验，校验由 RecordStore 负责）
    pub fn new(id: impl Into<String>, name: impl Into<String>, grades: Vec<f64>) -> Self {
        StudentRecord {
            id: id.into(),
            name: name.into(),
            grades,
        }
    }

    /// 平均分
    pub fn average(&self) -> f64 {
        grades::average(&self.grades)
    }

    /// 字母等级
    pub fn letter_grade(&self) -> LetterGrade {
        grades::letter_grade(self.average())
    }

    /// 及格状态
    pub fn status(&self) -> PassStatus {
        grades::pass_fail(self.average())
    }

    /// 是否已有成绩
    pub fn has_grades(&self) -> bool {
        !self.grades.is_empty()
    }

    /// 姓名是否包含查询串（忽略大小写）
    pub fn name_contains(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(&query.to_lowercase())
    }
}
