//! 中间件模块

pub mod user_auth;

pub use user_auth::{UserAuthMiddleware, UserId};
