//! 控制台交互层
//!
//! 登录门禁 + 数字菜单。输入输出通过泛型 `BufRead`/`Write` 注入，
//! 当前会话作为参数在各操作之间传递，不使用全局状态。
//! 输入结束（EOF）在任何提示处都视为退出。
mod display;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use tracing::{info, warn};

use crate::auth::{CredentialTable, Permissions, Session, MAX_LOGIN_ATTEMPTS};
use crate::io::{CsvStoreReader, CsvStoreWriter, StoreReader, StoreWriter};
use crate::report;
use crate::store::{GradePolicy, RecordStore};
use crate::utils::{validate_grade, RecordError};

pub use display::{grades_text, write_numbered_grades, write_student_details, write_student_table};

const BANNER_RULE: &str = "==================================================";

/// 会话结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellExit {
    /// 用户选择退出或输入结束
    Exit,
    /// 登录尝试次数用尽
    LoginFailed,
}

/// 单个操作执行后的去向
enum Step {
    Continue,
    Quit,
}

/// 主菜单的结束方式
enum MenuOutcome {
    Logout,
    Exit,
}

/// 登录结果
enum LoginOutcome {
    LoggedIn(Session),
    Exhausted,
    Eof,
}

/// 菜单驱动的控制台
pub struct Shell<R, W> {
    input: R,
    output: W,
    store: RecordStore,
    credentials: CredentialTable,
    data_file: PathBuf,
    reader: Box<dyn StoreReader>,
    writer: Box<dyn StoreWriter>,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    /// 创建控制台，使用默认账户表和基于文件系统的读写器
    pub fn new(input: R, output: W, store: RecordStore, data_file: PathBuf) -> Self {
        Shell {
            input,
            output,
            store,
            credentials: CredentialTable::default(),
            data_file,
            reader: Box::new(CsvStoreReader),
            writer: Box::new(CsvStoreWriter::default()),
        }
    }

    pub fn with_credentials(mut self, credentials: CredentialTable) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_reader(mut self, reader: Box<dyn StoreReader>) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_writer(mut self, writer: Box<dyn StoreWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// 取回存储和输出（用于测试检查）
    pub fn into_parts(self) -> (RecordStore, W) {
        (self.store, self.output)
    }

    /// 运行登录 + 菜单循环，直到退出或登录失败
    pub fn run(&mut self) -> io::Result<ShellExit> {
        loop {
            let session = match self.login()? {
                LoginOutcome::LoggedIn(session) => session,
                LoginOutcome::Exhausted => return Ok(ShellExit::LoginFailed),
                LoginOutcome::Eof => return Ok(ShellExit::Exit),
            };

            match self.main_menu(&session)? {
                MenuOutcome::Logout => {
                    info!(user = %session.username, "logged out");
                    continue;
                }
                MenuOutcome::Exit => return Ok(ShellExit::Exit),
            }
        }
    }

    fn login(&mut self) -> io::Result<LoginOutcome> {
        writeln!(self.output, "{}", BANNER_RULE)?;
        writeln!(self.output, "学生成绩管理系统 - 登录")?;
        writeln!(self.output, "{}", BANNER_RULE)?;

        let mut attempts = MAX_LOGIN_ATTEMPTS;
        while attempts > 0 {
            let Some(username) = self.prompt("用户名: ")? else {
                return Ok(LoginOutcome::Eof);
            };
            let Some(password) = self.prompt("密码: ")? else {
                return Ok(LoginOutcome::Eof);
            };

            if let Some(session) = self.credentials.authenticate(&username, &password) {
                info!(user = %session.username, role = %session.role, "login succeeded");
                writeln!(self.output, "\n登录成功！欢迎 {} ({})", session.username, session.role)?;
                return Ok(LoginOutcome::LoggedIn(session));
            }

            attempts -= 1;
            warn!(user = %username, remaining = attempts, "login failed");
            if attempts > 0 {
                writeln!(self.output, "\n用户名或密码错误！剩余 {} 次尝试。", attempts)?;
            } else {
                writeln!(self.output, "\n登录尝试次数已用尽，程序退出...")?;
            }
        }

        Ok(LoginOutcome::Exhausted)
    }

    fn main_menu(&mut self, session: &Session) -> io::Result<MenuOutcome> {
        loop {
            writeln!(self.output)?;
            writeln!(self.output, "{}", BANNER_RULE)?;
            writeln!(self.output, "学生成绩管理系统")?;
            writeln!(self.output, "当前用户: {} ({})", session.username, session.role)?;
            writeln!(self.output, "{}", BANNER_RULE)?;
            writeln!(self.output, "\n1. 添加学生（仅管理员）")?;
            writeln!(self.output, "2. 查询学生")?;
            writeln!(self.output, "3. 查看全部学生")?;
            writeln!(self.output, "4. 编辑成绩（仅管理员）")?;
            writeln!(self.output, "5. 生成报告")?;
            writeln!(self.output, "6. 保存到文件（仅管理员）")?;
            writeln!(self.output, "7. 从文件加载")?;
            writeln!(self.output, "8. 注销")?;
            writeln!(self.output, "9. 退出")?;

            let Some(choice) = self.prompt("\n请选择 (1-9): ")? else {
                return Ok(MenuOutcome::Exit);
            };

            let step = match choice.as_str() {
                "1" => self.add_student(session)?,
                "2" => self.search_student()?,
                "3" => self.view_all_students()?,
                "4" => self.edit_grades(session)?,
                "5" => self.generate_report()?,
                "6" => self.save_to_file(session)?,
                "7" => self.load_from_file(session)?,
                "8" => {
                    writeln!(self.output, "\n正在注销...")?;
                    return Ok(MenuOutcome::Logout);
                }
                "9" => {
                    writeln!(self.output, "\n感谢使用学生成绩管理系统！")?;
                    return Ok(MenuOutcome::Exit);
                }
                _ => {
                    writeln!(self.output, "\n无效选项，请重试。")?;
                    Step::Continue
                }
            };

            if let Step::Quit = step {
                return Ok(MenuOutcome::Exit);
            }
        }
    }

    /// 权限检查，拒绝时输出提示并返回 false
    fn permitted(&mut self, session: &Session, permission: Permissions, action: &str) -> io::Result<bool> {
        match session.require(permission, action) {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(user = %session.username, action, "permission denied");
                writeln!(self.output, "\n错误: {}", e)?;
                Ok(false)
            }
        }
    }

    fn add_student(&mut self, session: &Session) -> io::Result<Step> {
        if !self.permitted(session, Permissions::ADD_STUDENT, "add students")? {
            return Ok(Step::Continue);
        }

        writeln!(self.output, "\n--- 添加学生 ---")?;
        let Some(id) = self.prompt("学号 (例如 S1001): ")? else {
            return Ok(Step::Quit);
        };
        if id.is_empty() {
            writeln!(self.output, "\n错误: 学号不能为空！")?;
            return Ok(Step::Continue);
        }
        if self.store.contains(&id) {
            writeln!(self.output, "\n错误: 学号 {} 已存在！", id)?;
            return Ok(Step::Continue);
        }

        let Some(name) = self.prompt("姓名: ")? else {
            return Ok(Step::Quit);
        };
        if name.is_empty() {
            writeln!(self.output, "\n错误: 姓名不能为空！")?;
            return Ok(Step::Continue);
        }

        writeln!(self.output, "\n请输入成绩（直接回车结束）:")?;
        let mut grades = Vec::new();
        loop {
            let Some(line) = self.prompt(&format!("成绩 {}: ", grades.len() + 1))? else {
                return Ok(Step::Quit);
            };
            if line.is_empty() {
                if grades.is_empty() && self.store.policy() == GradePolicy::RequireAtLeastOne {
                    writeln!(self.output, "至少需要一个成绩！")?;
                    continue;
                }
                break;
            }
            match parse_grade_input(&line) {
                Ok(grade) => grades.push(grade),
                Err(e) => writeln!(self.output, "{}", e)?,
            }
        }

        match self.store.insert(&id, &name, grades) {
            Ok(()) => writeln!(self.output, "\n学生 {} 添加成功！", name)?,
            Err(e) => writeln!(self.output, "\n错误: {}", e)?,
        }
        Ok(Step::Continue)
    }

    fn search_student(&mut self) -> io::Result<Step> {
        writeln!(self.output, "\n--- 查询学生 ---")?;
        writeln!(self.output, "1. 按学号查询")?;
        writeln!(self.output, "2. 按姓名查询")?;

        let Some(choice) = self.prompt("\n请选择 (1-2): ")? else {
            return Ok(Step::Quit);
        };

        match choice.as_str() {
            "1" => {
                let Some(id) = self.prompt("学号: ")? else {
                    return Ok(Step::Quit);
                };
                match self.store.find_by_id(&id) {
                    Some(record) => write_student_details(&mut self.output, record)?,
                    None => writeln!(self.output, "\n未找到学号为 {} 的学生", id)?,
                }
            }
            "2" => {
                let Some(query) = self.prompt("姓名（支持部分匹配）: ")? else {
                    return Ok(Step::Quit);
                };
                let found = self.store.find_by_name_substring(&query);
                if found.is_empty() {
                    writeln!(self.output, "\n未找到姓名包含 {} 的学生", query)?;
                } else {
                    writeln!(self.output, "\n找到 {} 名学生:", found.len())?;
                    for record in found {
                        write_student_details(&mut self.output, record)?;
                    }
                }
            }
            _ => writeln!(self.output, "\n无效选项！")?,
        }
        Ok(Step::Continue)
    }

    fn view_all_students(&mut self) -> io::Result<Step> {
        if self.store.is_empty() {
            writeln!(self.output, "\n系统中没有学生！")?;
        } else {
            write_student_table(&mut self.output, &self.store)?;
        }
        Ok(Step::Continue)
    }

    fn edit_grades(&mut self, session: &Session) -> io::Result<Step> {
        if !self.permitted(session, Permissions::EDIT_GRADES, "edit grades")? {
            return Ok(Step::Continue);
        }

        writeln!(self.output, "\n--- 编辑学生成绩 ---")?;
        let Some(id) = self.prompt("学号: ")? else {
            return Ok(Step::Quit);
        };
        let grades = match self.store.find_by_id(&id) {
            Some(record) => {
                write_student_details(&mut self.output, record)?;
                record.grades.clone()
            }
            None => {
                writeln!(self.output, "\n未找到学号 {}！", id)?;
                return Ok(Step::Continue);
            }
        };

        writeln!(self.output, "\n1. 添加成绩")?;
        writeln!(self.output, "2. 修改成绩")?;
        writeln!(self.output, "3. 删除成绩")?;
        let Some(choice) = self.prompt("\n请选择 (1-3): ")? else {
            return Ok(Step::Quit);
        };

        match choice.as_str() {
            "1" => {
                let Some(line) = self.prompt("新成绩: ")? else {
                    return Ok(Step::Quit);
                };
                match parse_grade_input(&line).and_then(|g| self.store.add_grade(&id, g)) {
                    Ok(()) => writeln!(self.output, "\n成绩添加成功！")?,
                    Err(e) => writeln!(self.output, "\n错误: {}", e)?,
                }
            }
            "2" => {
                if grades.is_empty() {
                    writeln!(self.output, "\n没有可修改的成绩！")?;
                    return Ok(Step::Continue);
                }
                write_numbered_grades(&mut self.output, &grades)?;
                let Some(line) = self.prompt("\n要修改的成绩序号: ")? else {
                    return Ok(Step::Quit);
                };
                let Some(index) = parse_position(&line, grades.len()) else {
                    writeln!(self.output, "\n无效的成绩序号！")?;
                    return Ok(Step::Continue);
                };
                let Some(line) = self.prompt("新成绩: ")? else {
                    return Ok(Step::Quit);
                };
                match parse_grade_input(&line).and_then(|g| self.store.set_grade(&id, index, g)) {
                    Ok(()) => writeln!(self.output, "\n成绩修改成功！")?,
                    Err(e) => writeln!(self.output, "\n错误: {}", e)?,
                }
            }
            "3" => {
                if grades.is_empty() {
                    writeln!(self.output, "\n没有可删除的成绩！")?;
                    return Ok(Step::Continue);
                }
                write_numbered_grades(&mut self.output, &grades)?;
                let Some(line) = self.prompt("\n要删除的成绩序号: ")? else {
                    return Ok(Step::Quit);
                };
                let Some(index) = parse_position(&line, grades.len()) else {
                    writeln!(self.output, "\n无效的成绩序号！")?;
                    return Ok(Step::Continue);
                };
                match self.store.delete_grade(&id, index) {
                    Ok(removed) => writeln!(self.output, "\n成绩 {} 删除成功！", grades_text(&[removed]))?,
                    Err(RecordError::LastGradeProtected(_)) => {
                        writeln!(self.output, "\n不能删除唯一的成绩！")?
                    }
                    Err(e) => writeln!(self.output, "\n错误: {}", e)?,
                }
            }
            _ => writeln!(self.output, "\n无效选项！")?,
        }
        Ok(Step::Continue)
    }

    fn generate_report(&mut self) -> io::Result<Step> {
        match report::summarize(&self.store) {
            Some(report) => write!(self.output, "\n{}", report)?,
            None => writeln!(self.output, "\n没有学生，无法生成报告！")?,
        }
        Ok(Step::Continue)
    }

    fn save_to_file(&mut self, session: &Session) -> io::Result<Step> {
        if !self.permitted(session, Permissions::SAVE, "save data")? {
            return Ok(Step::Continue);
        }
        if self.store.is_empty() {
            writeln!(self.output, "\n没有可保存的数据！")?;
            return Ok(Step::Continue);
        }

        match self.writer.write(&self.store, &self.data_file) {
            Ok(()) => writeln!(self.output, "\n数据已保存到 {}", self.data_file.display())?,
            Err(e) => {
                warn!(error = %e, "save failed");
                writeln!(self.output, "\n保存文件失败: {}", e)?;
            }
        }
        Ok(Step::Continue)
    }

    fn load_from_file(&mut self, session: &Session) -> io::Result<Step> {
        if !self.permitted(session, Permissions::LOAD, "load data")? {
            return Ok(Step::Continue);
        }

        match self.reader.read(&self.data_file, self.store.policy()) {
            Ok(outcome) => {
                self.store = outcome.store;
                writeln!(
                    self.output,
                    "\n已从 {} 加载 {} 条学生记录",
                    self.data_file.display(),
                    self.store.len()
                )?;
                if outcome.skipped_duplicates > 0 {
                    writeln!(self.output, "跳过 {} 条重复学号的记录", outcome.skipped_duplicates)?;
                }
            }
            Err(RecordError::FileNotFound(path)) => {
                writeln!(self.output, "\n文件 {} 不存在！", path.display())?;
            }
            Err(e) => {
                warn!(error = %e, "load failed");
                writeln!(self.output, "\n加载文件失败: {}", e)?;
            }
        }
        Ok(Step::Continue)
    }

    /// 输出提示并读取一行，返回去掉首尾空白的内容；输入结束时返回 None
    fn prompt(&mut self, message: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

/// 解析用户输入的成绩
pub fn parse_grade_input(input: &str) -> Result<f64, RecordError> {
    let grade: f64 = input
        .trim()
        .parse()
        .map_err(|_| RecordError::InvalidInput(format!("'{}' is not a number", input.trim())))?;
    validate_grade(grade)
}

/// 将从 1 开始的序号转换为下标，越界时返回 None
fn parse_position(input: &str, len: usize) -> Option<usize> {
    let position: usize = input.trim().parse().ok()?;
    if position == 0 || position > len {
        return None;
    }
    Some(position - 1)
}
