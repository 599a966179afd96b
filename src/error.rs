use thiserror::Error;

/// 外围协作层 (数据库、配置、导出) 的错误; 对账引擎本身不会失败
#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 批量写入超时
    #[error("insert into {table} timed out after {seconds}s")]
    InsertTimeout { table: &'static str, seconds: u64 },
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
