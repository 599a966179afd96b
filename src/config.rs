use crate::models::QuantityBasis;
use bigdecimal::BigDecimal;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub recon: ReconConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// 对账规则参数 (显式传给引擎, 引擎本身不读环境变量)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    /// 单价容差, |a - b| < price_tolerance 视为一致
    pub price_tolerance: BigDecimal,
    /// 规格错配的数量接近阈值 (含)
    pub proximity_tolerance: BigDecimal,
    /// |q| <= zero_tolerance 视为零库存
    pub zero_tolerance: BigDecimal,
    /// 交叉对照中 |现存差额| > significant_difference 的行单独报告
    pub significant_difference: BigDecimal,
    /// 旧编码映射后的标准规格
    pub standard_size: String,
    /// 标准单位标记, 追加在规格之后 (01 -> 01G)
    pub unit_marker: String,
    pub quantity_basis: QuantityBasis,
    /// 对比结果 CSV 导出路径, 为空则不导出
    pub export_csv: Option<String>,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            price_tolerance: decimal("0.01"),
            proximity_tolerance: BigDecimal::from(5),
            zero_tolerance: BigDecimal::from(0),
            significant_difference: BigDecimal::from(5),
            standard_size: "01".to_string(),
            unit_marker: "G".to_string(),
            quantity_basis: QuantityBasis::OnHand,
            export_csv: None,
        }
    }
}

fn decimal(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap_or_default()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/order_recon".to_string(),
            },
            recon: ReconConfig::default(),
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 -> recon.toml (可选) -> 环境变量
    ///
    /// 环境变量使用 `RECON__` 前缀与 `__` 分隔, 如 `RECON__RECON__PRICE_TOLERANCE`;
    /// 同时兼容 `DATABASE_URL`、`SERVER_HOST`、`SERVER_PORT`。
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();
        let recon = &defaults.recon;

        let mut builder = Config::builder()
            .set_default("server.host", defaults.server.host.clone())?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("database.url", defaults.database.url.clone())?
            .set_default("recon.price_tolerance", recon.price_tolerance.to_string())?
            .set_default("recon.proximity_tolerance", recon.proximity_tolerance.to_string())?
            .set_default("recon.zero_tolerance", recon.zero_tolerance.to_string())?
            .set_default(
                "recon.significant_difference",
                recon.significant_difference.to_string(),
            )?
            .set_default("recon.standard_size", recon.standard_size.clone())?
            .set_default("recon.unit_marker", recon.unit_marker.clone())?
            .set_default("recon.quantity_basis", "on_hand")?
            .add_source(File::with_name("recon").required(false))
            .add_source(Environment::with_prefix("RECON").separator("__"));

        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }
        if let Ok(host) = std::env::var("SERVER_HOST") {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
        {
            builder = builder.set_override("server.port", i64::from(port))?;
        }

        builder.build()?.try_deserialize()
    }
}
