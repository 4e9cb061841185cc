//! # Módula数据库模块
//!
//! PostgreSQL持久化层：连接池、表结构、行模型和查询操作。
//! 只依赖单行读写的原子性，核心逻辑不使用跨行事务。

pub mod connection;
pub mod models;
pub mod queries;

pub use connection::DatabasePool;
pub use queries::DatabaseQueries;
