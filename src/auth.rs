use std::collections::HashMap;
use std::fmt;

use crate::utils::{RecordError, Result};

/// 最大登录尝试次数
pub const MAX_LOGIN_ATTEMPTS: u32 = 3;

bitflags::bitflags! {
    /// 受限操作的权限（查询、列表、报告对所有登录用户开放）
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u8 {
        const ADD_STUDENT = 0x01;
        const EDIT_GRADES = 0x02;
        const SAVE = 0x04;
        const LOAD = 0x08;
    }
}

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// 角色拥有的权限
    pub fn permissions(&self) -> Permissions {
        match self {
            Role::Admin => Permissions::all(),
            Role::User => Permissions::LOAD,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::User => f.write_str("user"),
        }
    }
}

#[derive(Debug, Clone)]
struct Credential {
    password: String,
    role: Role,
}

/// 固定账户表（明文比对，不做任何加固）
#[derive(Debug, Clone)]
pub struct CredentialTable {
    accounts: HashMap<String, Credential>,
}

impl Default for CredentialTable {
    fn default() -> Self {
        CredentialTable::new(&[
            ("admin", "admin123", Role::Admin),
            ("user", "user123", Role::User),
        ])
    }
}

impl CredentialTable {
    pub fn new(accounts: &[(&str, &str, Role)]) -> Self {
        let accounts = accounts
            .iter()
            .map(|(username, password, role)| {
                (
                    username.to_string(),
                    Credential {
                        password: password.to_string(),
                        role: *role,
                    },
                )
            })
            .collect();
        CredentialTable { accounts }
    }

    /// 校验用户名和密码，成功时返回会话
    pub fn authenticate(&self, username: &str, password: &str) -> Option<Session> {
        self.accounts
            .get(username)
            .filter(|credential| credential.password == password)
            .map(|credential| Session {
                username: username.to_string(),
                role: credential.role,
            })
    }
}

/// 已登录会话
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub role: Role,
}

impl Session {
    pub fn can(&self, permission: Permissions) -> bool {
        self.role.permissions().contains(permission)
    }

    /// 检查权限，缺少时返回 `PermissionDenied`
    pub fn require(&self, permission: Permissions, action: &str) -> Result<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(RecordError::PermissionDenied(format!(
                "only administrators can {}",
                action
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_accounts() {
        let table = CredentialTable::default();

        let admin = table.authenticate("admin", "admin123").unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.username, "admin");

        let user = table.authenticate("user", "user123").unwrap();
        assert_eq!(user.role, Role::User);
    }

    #[test]
    fn test_rejects_bad_credentials() {
        let table = CredentialTable::default();
        assert!(table.authenticate("admin", "user123").is_none());
        assert!(table.authenticate("Admin", "admin123").is_none());
        assert!(table.authenticate("nobody", "").is_none());
        assert!(table.authenticate("", "").is_none());
    }

    #[test]
    fn test_role_permissions() {
        let admin = Role::Admin.permissions();
        assert!(admin.contains(Permissions::ADD_STUDENT | Permissions::EDIT_GRADES | Permissions::SAVE));

        let user = Role::User.permissions();
        assert_eq!(user, Permissions::LOAD);
        assert!(user.contains(Permissions::LOAD));
        assert!(!user.contains(Permissions::ADD_STUDENT));
        assert!(!user.contains(Permissions::EDIT_GRADES));
        assert!(!user.contains(Permissions::SAVE));
    }

    #[test]
    fn test_session_require() {
        let table = CredentialTable::default();
        let user = table.authenticate("user", "user123").unwrap();

        assert!(user.require(Permissions::LOAD, "load data").is_ok());
        match user.require(Permissions::SAVE, "save data") {
            Err(RecordError::PermissionDenied(msg)) => assert!(msg.contains("save data")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
