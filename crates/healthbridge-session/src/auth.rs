//! 会话与身份管理
//!
//! 状态流转：`SPLASH → 未登录{登录页} → 未登录{注册页} → 已登录 → 未登录{登录页}`。

use healthbridge_core::{IdGenerator, Identity, UserRole};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// 医生账号的默认专长
pub const DEFAULT_DOCTOR_SPECIALTY: &str = "General Practitioner";

/// 非患者角色使用的默认头像
pub const ROLE_DEFAULT_AVATAR: &str = "https://picsum.photos/seed/doc1/200/200";

/// 未登录时的子视图
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthView {
    Login,
    SignUp,
}

/// 会话阶段
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    Splash,
    SignedOut(AuthView),
    Authenticated(Identity),
}

/// 会话管理器
#[derive(Debug)]
pub struct SessionManager {
    phase: SessionPhase,
    selected_role: UserRole,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Splash,
            selected_role: UserRole::Patient,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn selected_role(&self) -> UserRole {
        self.selected_role
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.phase {
            SessionPhase::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    pub fn auth_view(&self) -> Option<AuthView> {
        match self.phase {
            SessionPhase::SignedOut(view) => Some(view),
            _ => None,
        }
    }

    /// 启动画面结束，进入登录页
    pub fn finish_splash(&mut self) -> bool {
        if self.phase != SessionPhase::Splash {
            return false;
        }
        self.phase = SessionPhase::SignedOut(AuthView::Login);
        info!("Splash finished, showing login");
        true
    }

    /// 选择角色并进入注册页
    pub fn select_role(&mut self, role: UserRole) -> bool {
        if !matches!(self.phase, SessionPhase::SignedOut(_)) {
            debug!("Ignoring role selection outside of the auth flow");
            return false;
        }
        self.selected_role = role;
        self.phase = SessionPhase::SignedOut(AuthView::SignUp);
        info!("Role {} selected, showing sign-up", role);
        true
    }

    /// 从注册页返回登录页
    pub fn back_to_login(&mut self) -> bool {
        if self.auth_view() != Some(AuthView::SignUp) {
            return false;
        }
        self.phase = SessionPhase::SignedOut(AuthView::Login);
        true
    }

    /// 完成注册并登录
    ///
    /// 姓名或邮箱为空时不做任何事（表单本地校验），返回 `None`。
    pub fn complete_sign_up(
        &mut self,
        name: &str,
        email: &str,
        ids: &mut dyn IdGenerator,
    ) -> Option<&Identity> {
        if self.auth_view() != Some(AuthView::SignUp) {
            debug!("Ignoring sign-up outside of the sign-up view");
            return None;
        }

        let name = name.trim();
        let email = email.trim();
        if name.is_empty() || email.is_empty() {
            debug!("Sign-up skipped: name and email are required");
            return None;
        }

        let role = self.selected_role;
        let avatar = match role {
            UserRole::Patient => format!("https://picsum.photos/seed/{}/200/200", name),
            UserRole::Doctor | UserRole::Admin => ROLE_DEFAULT_AVATAR.to_string(),
        };
        let specialty = (role == UserRole::Doctor).then(|| DEFAULT_DOCTOR_SPECIALTY.to_string());

        let identity = Identity {
            id: ids.next_id(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            avatar,
            specialty,
        };
        info!("Signed up {} as {}", identity.id, role);

        self.phase = SessionPhase::Authenticated(identity);
        self.identity()
    }

    /// 退出登录，返回被清除的身份
    pub fn sign_out(&mut self) -> Option<Identity> {
        match std::mem::replace(&mut self.phase, SessionPhase::SignedOut(AuthView::Login)) {
            SessionPhase::Authenticated(identity) => {
                info!("Signed out {}", identity.id);
                Some(identity)
            }
            previous => {
                self.phase = previous;
                None
            }
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
