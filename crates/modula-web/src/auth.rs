//! 认证中间件
//!
//! 简化的Bearer token身份：token即用户ID。中间件按ID加载用户、
//! 检查激活状态，并把调用方注入请求扩展供处理器提取。真实的
//! 凭证机制（密码、JWT签名）不在本服务范围内。

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use modula_core::{ModulaError, User, UserRole};
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::AppState;

/// 已认证的调用方
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn is_admin(&self) -> bool {
        self.0.role == UserRole::Admin
    }

    /// 调用方是否可以操作某专业人员拥有的资源
    pub fn can_access(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.0.id == owner_id
    }
}

/// 认证中间件：解析Bearer token并加载调用方
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => {
            return Err(ModulaError::Unauthorized("token ausente".to_string()).into());
        }
    };

    let user_id = Uuid::parse_str(token.trim())
        .map_err(|_| ModulaError::Unauthorized("token inválido".to_string()))?;

    let user = state
        .queries()
        .get_user_by_id(&user_id)
        .await?
        .ok_or_else(|| ModulaError::Unauthorized("usuário não encontrado".to_string()))?;

    if !user.is_active {
        return Err(ModulaError::Forbidden("usuário inativo".to_string()).into());
    }

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}
