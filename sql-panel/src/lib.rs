//! SQL 查询调试面板
//!
//! 提供以下功能：
//! - 记录每个请求中执行的 SQL 语句（耗时、参数、调用位置）
//! - 在调试工具栏中展示查询列表
//! - 通过签名令牌重放 SELECT 语句或查看执行计划

pub mod availability;
#[cfg(feature = "database")]
pub mod db;
pub mod handlers;
pub mod panel;
pub mod recorder;
pub mod render;
pub mod routes;
pub mod signer;
pub mod state;
pub mod toolbar;
