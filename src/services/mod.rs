//! 业务逻辑服务模块
//!
//! 封装行情获取、持仓存储和盈亏计算逻辑

pub mod traits;             // 行情源 / 存储接口抽象
pub mod polygon;            // Polygon.io 行情客户端
pub mod supabase;           // Supabase 持仓存储客户端
pub mod portfolio_service;  // 持仓业务编排
