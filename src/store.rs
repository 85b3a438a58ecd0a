use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::student::StudentRecord;
use crate::utils::{validate_grade, RecordError, Result};

/// 成绩数量策略
///
/// - `RequireAtLeastOne`：新建记录必须带成绩，且不能删除最后一个成绩
/// - `AllowEmpty`：允许无成绩的记录，也允许删光成绩
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GradePolicy {
    #[default]
    #[serde(rename = "require-one")]
    RequireAtLeastOne,
    AllowEmpty,
}

/// 学生记录存储
///
/// 按插入顺序保存记录，所有查找均为线性扫描。
/// 每个修改操作都先完成校验再修改，失败时存储保持原状。
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<StudentRecord>,
    policy: GradePolicy,
}

impl RecordStore {
    /// 创建空存储（默认策略）
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定成绩策略创建空存储
    pub fn with_policy(policy: GradePolicy) -> Self {
        RecordStore {
            records: Vec::new(),
            policy,
        }
    }

    /// 当前成绩策略
    pub fn policy(&self) -> GradePolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按存储顺序遍历记录
    pub fn iter(&self) -> std::slice::Iter<'_, StudentRecord> {
        self.records.iter()
    }

    /// 只读视图
    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    /// 添加新学生
    ///
    /// # 错误
    /// - `InvalidInput`：学号或姓名为空、成绩越界，或策略要求至少一个成绩而 `grades` 为空
    /// - `DuplicateId`：学号已存在（区分大小写）
    pub fn insert(&mut self, id: &str, name: &str, grades: Vec<f64>) -> Result<()> {
        if id.is_empty() {
            return Err(RecordError::InvalidInput("student ID cannot be empty".to_string()));
        }
        if name.is_empty() {
            return Err(RecordError::InvalidInput("student name cannot be empty".to_string()));
        }
        if let Some(bad) = grades.iter().find(|g| validate_grade(**g).is_err()) {
            return Err(RecordError::InvalidInput(format!(
                "grade {} is outside 0-100",
                bad
            )));
        }
        if grades.is_empty() && self.policy == GradePolicy::RequireAtLeastOne {
            return Err(RecordError::InvalidInput(
                "at least one grade is required".to_string(),
            ));
        }
        if self.contains(id) {
            return Err(RecordError::DuplicateId(id.to_string()));
        }

        debug!(id, name, grade_count = grades.len(), "inserting student");
        self.records.push(StudentRecord::new(id, name, grades));
        Ok(())
    }

    /// 学号是否存在
    pub fn contains(&self, id: &str) -> bool {
        self.find_by_id(id).is_some()
    }

    /// 按学号精确查找
    pub fn find_by_id(&self, id: &str) -> Option<&StudentRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// 按姓名子串查找（忽略大小写），按存储顺序返回全部匹配
    pub fn find_by_name_substring(&self, query: &str) -> Vec<&StudentRecord> {
        self.records.iter().filter(|r| r.name_contains(query)).collect()
    }

    /// 追加成绩
    pub fn add_grade(&mut self, id: &str, grade: f64) -> Result<()> {
        let record = self.find_mut(id)?;
        validate_grade(grade)?;

        record.grades.push(grade);
        debug!(id, grade, "grade added");
        Ok(())
    }

    /// 替换指定位置（从 0 开始）的成绩
    pub fn set_grade(&mut self, id: &str, index: usize, grade: f64) -> Result<()> {
        let record = self.find_mut(id)?;
        let len = record.grades.len();
        if index >= len {
            return Err(RecordError::IndexOutOfRange { index, len });
        }
        validate_grade(grade)?;

        let old = std::mem::replace(&mut record.grades[index], grade);
        debug!(id, index, old, new = grade, "grade updated");
        Ok(())
    }

    /// 删除指定位置（从 0 开始）的成绩，返回被删除的值
    ///
    /// `RequireAtLeastOne` 策略下不能删除最后一个成绩
    pub fn delete_grade(&mut self, id: &str, index: usize) -> Result<f64> {
        let policy = self.policy;
        let record = self.find_mut(id)?;
        let len = record.grades.len();
        if index >= len {
            return Err(RecordError::IndexOutOfRange { index, len });
        }
        if len == 1 && policy == GradePolicy::RequireAtLeastOne {
            return Err(RecordError::LastGradeProtected(id.to_string()));
        }

        let removed = record.grades.remove(index);
        debug!(id, index, removed, "grade deleted");
        Ok(removed)
    }

    /// 追加一条已解析的记录（用于文件加载），重复学号时返回 false 且不修改存储
    pub(crate) fn push_loaded(&mut self, record: StudentRecord) -> bool {
        if self.contains(&record.id) {
            return false;
        }
        self.records.push(record);
        true
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut StudentRecord> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RecordError::NotFound(id.to_string()))
    }
}

impl<'a> IntoIterator for &'a RecordStore {
    type Item = &'a StudentRecord;
    type IntoIter = std::slice::Iter<'a, StudentRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 创建测试用的存储
    fn create_test_store() -> RecordStore {
        let mut store = RecordStore::new();
        store.insert("S1001", "Alice Johnson", vec![85.0, 92.0, 78.0]).unwrap();
        store.insert("S1002", "Bob Smith", vec![55.0, 58.0, 52.0]).unwrap();
        store
    }

    #[test]
    fn test_insert_and_find() {
        let store = create_test_store();

        let alice = store.find_by_id("S1001").unwrap();
        assert_eq!(alice.name, "Alice Johnson");
        assert_eq!(alice.grades, vec![85.0, 92.0, 78.0]);

        assert!(store.find_by_id("s1001").is_none());
        assert!(store.find_by_id("S9999").is_none());
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut store = create_test_store();
        store.insert("A0001", "Carol", vec![70.0]).unwrap();

        let ids: Vec<&str> = store.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["S1001", "S1002", "A0001"]);
    }

    #[test]
    fn test_duplicate_id_leaves_store_unchanged() {
        let mut store = create_test_store();

        let result = store.insert("S1001", "Someone Else", vec![99.0]);
        assert!(matches!(result, Err(RecordError::DuplicateId(ref id)) if id == "S1001"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.find_by_id("S1001").unwrap().name, "Alice Johnson");

        // 区分大小写
        assert!(store.insert("s1001", "Lowercase", vec![80.0]).is_ok());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_insert_invalid_input() {
        let mut store = RecordStore::new();

        assert!(matches!(store.insert("", "Alice", vec![90.0]), Err(RecordError::InvalidInput(_))));
        assert!(matches!(store.insert("S1", "", vec![90.0]), Err(RecordError::InvalidInput(_))));
        assert!(matches!(store.insert("S1", "Alice", vec![90.0, 101.0]), Err(RecordError::InvalidInput(_))));
        assert!(matches!(store.insert("S1", "Alice", vec![-1.0]), Err(RecordError::InvalidInput(_))));
        assert!(matches!(store.insert("S1", "Alice", vec![]), Err(RecordError::InvalidInput(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_allow_empty_policy_insert() {
        let mut store = RecordStore::with_policy(GradePolicy::AllowEmpty);
        store.insert("S1", "Alice", vec![]).unwrap();
        assert!(!store.find_by_id("S1").unwrap().has_grades());
    }

    #[test]
    fn test_find_by_name_substring() {
        let store = create_test_store();

        let found = store.find_by_name_substring("jo");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "S1001");

        let found = store.find_by_name_substring("SMITH");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "S1002");

        assert!(store.find_by_name_substring("zed").is_empty());
        assert_eq!(store.find_by_name_substring("").len(), 2);
    }

    #[test]
    fn test_add_grade() {
        let mut store = create_test_store();

        store.add_grade("S1001", 100.0).unwrap();
        assert_eq!(store.find_by_id("S1001").unwrap().grades.len(), 4);

        assert!(matches!(store.add_grade("S1001", 100.5), Err(RecordError::InvalidGrade(_))));
        assert!(matches!(store.add_grade("S9999", 50.0), Err(RecordError::NotFound(_))));
        assert_eq!(store.find_by_id("S1001").unwrap().grades.len(), 4);
    }

    #[test]
    fn test_set_grade() {
        let mut store = create_test_store();

        store.set_grade("S1002", 1, 61.0).unwrap();
        assert_eq!(store.find_by_id("S1002").unwrap().grades, vec![55.0, 61.0, 52.0]);

        assert!(matches!(
            store.set_grade("S1002", 3, 70.0),
            Err(RecordError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert!(matches!(store.set_grade("S1002", 0, -5.0), Err(RecordError::InvalidGrade(_))));
        assert!(matches!(store.set_grade("nobody", 0, 50.0), Err(RecordError::NotFound(_))));
        assert_eq!(store.find_by_id("S1002").unwrap().grades, vec![55.0, 61.0, 52.0]);
    }

    #[test]
    fn test_delete_grade() {
        let mut store = create_test_store();

        assert_eq!(store.delete_grade("S1001", 0).unwrap(), 85.0);
        assert_eq!(store.find_by_id("S1001").unwrap().grades, vec![92.0, 78.0]);

        assert!(matches!(
            store.delete_grade("S1001", 2),
            Err(RecordError::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(matches!(store.delete_grade("S0000", 0), Err(RecordError::NotFound(_))));
    }

    #[test]
    fn test_last_grade_protected() {
        let mut store = RecordStore::new();
        store.insert("S1", "Alice", vec![88.0]).unwrap();

        for _ in 0..3 {
            assert!(matches!(store.delete_grade("S1", 0), Err(RecordError::LastGradeProtected(_))));
            assert_eq!(store.find_by_id("S1").unwrap().grades, vec![88.0]);
        }
    }

    #[test]
    fn test_allow_empty_policy_delete_last() {
        let mut store = RecordStore::with_policy(GradePolicy::AllowEmpty);
        store.insert("S1", "Alice", vec![88.0]).unwrap();

        assert_eq!(store.delete_grade("S1", 0).unwrap(), 88.0);
        assert!(store.find_by_id("S1").unwrap().grades.is_empty());
        assert!(matches!(
            store.delete_grade("S1", 0),
            Err(RecordError::IndexOutOfRange { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_push_loaded_skips_duplicates() {
        let mut store = create_test_store();
        assert!(!store.push_loaded(StudentRecord::new("S1001", "Dup", vec![])));
        assert!(store.push_loaded(StudentRecord::new("S1003", "Carol", vec![])));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_policy_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: GradePolicy,
        }
        let w: Wrapper = toml::from_str(r#"policy = "require-one""#).unwrap();
        assert_eq!(w.policy, GradePolicy::RequireAtLeastOne);
        let w: Wrapper = toml::from_str(r#"policy = "allow-empty""#).unwrap();
        assert_eq!(w.policy, GradePolicy::AllowEmpty);
    }
}
