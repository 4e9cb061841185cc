//! # Módula Web模块
//!
//! HTTP接口层：路由、处理器、认证中间件和错误到响应的映射。
//! 只做参数解析、权限检查和持久化编排，业务规则在下层crate。

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod transfers;

pub use error::{ApiError, ApiResult};
pub use server::{AppState, WebServer};
