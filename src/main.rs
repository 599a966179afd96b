use axum::{
    routing::{get, post},
    Router,
};
use order_recon_rust::{api, create_pool, AppConfig, ReconService};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database.url).await?;
    info!("Database pool created");

    let service = Arc::new(ReconService::new(pool, config.recon.clone()));

    // 构建路由
    let app = Router::new()
        .route("/health", get(api::health_check))
        .route("/api/recon/orders", post(api::reconcile_orders))
        .route("/api/recon/stock", post(api::inspect_stock))
        .route("/api/recon/orders/run", post(api::run_order_reconciliation))
        .route("/api/recon/stock/run", post(api::run_stock_cross_reference))
        .with_state(service)
        .layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/recon/orders      - 订单对账 (提交数据)");
    info!("  POST /api/recon/stock       - 库存核对 (提交数据)");
    info!("  POST /api/recon/orders/run  - 订单对账 (暂存表, 替换 order_comparison)");
    info!("  POST /api/recon/stock/run   - 库存交叉对照 (暂存表, 替换 stock_cross_reference)");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
