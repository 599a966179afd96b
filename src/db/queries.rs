use crate::error::{AppError, Result};
use crate::models::{
    parse_timestamp, ComparisonRow, CrossReferenceRow, ErpRef, LegacyCodeMap, Measure, OrderLine,
    StockRecord,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::path::Path;
use std::time::{Duration, Instant};

const INSERT_CHUNK: usize = 1000;
const INSERT_TIMEOUT_SECS: u64 = 30;

/// 暂存的订单明细 (数值列按文本读取, 由引擎宽松解析)
#[derive(Debug, Clone, FromRow)]
pub struct StagedOrderRow {
    pub order_number: Option<String>,
    pub erp_order_name: Option<String>,
    pub item_code: Option<String>,
    pub item_name: Option<String>,
    pub quantity: Option<String>,
    pub unit_price: Option<String>,
    pub payment_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub ordered_at: Option<String>,
}

impl StagedOrderRow {
    /// ERP 手工单没有前台单号时, 退回 ERP 自己的单号作为连接锚点
    pub fn into_order_line(self) -> OrderLine {
        let order_number = self
            .order_number
            .filter(|n| !n.trim().is_empty())
            .or(self.erp_order_name)
            .unwrap_or_default();
        OrderLine {
            order_number,
            item_code: self.item_code,
            item_name: self.item_name.unwrap_or_default(),
            quantity: Measure::parse(self.quantity.as_deref()),
            unit_price: Measure::parse(self.unit_price.as_deref()),
            payment_status: self.payment_status.unwrap_or_default(),
            fulfillment_status: self.fulfillment_status.unwrap_or_default(),
            ordered_at: parse_timestamp(self.ordered_at.as_deref()),
        }
    }
}

/// ERP 库存 (quant), 产品以 `[id, "显示名"]` 形式暂存为两列
#[derive(Debug, Clone, FromRow)]
pub struct StagedErpStockRow {
    pub product_id: i64,
    pub product_name: String,
    pub location_name: Option<String>,
    pub quantity: Option<String>,
    pub available_quantity: Option<String>,
}

impl StagedErpStockRow {
    pub fn into_stock_record(self) -> StockRecord {
        let product = ErpRef::new(self.product_id, self.product_name);
        let item_code = product.default_code().unwrap_or_else(|| {
            tracing::debug!("ERP 产品 {} 没有内部编码: {}", product.id, product.display_name);
            String::new()
        });
        StockRecord {
            item_code,
            location_or_channel: self.location_name,
            quantity_on_hand: Measure::parse(self.quantity.as_deref()),
            quantity_available: Measure::parse(self.available_quantity.as_deref()),
            quantity_committed: Measure::Absent,
            title: Some(product.display_name),
            listing_status: None,
        }
    }
}

/// 前台库存导出
#[derive(Debug, Clone, FromRow)]
pub struct StagedStorefrontStockRow {
    pub sku: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub on_hand: Option<String>,
    pub available: Option<String>,
    pub committed: Option<String>,
}

impl StagedStorefrontStockRow {
    pub fn into_stock_record(self) -> StockRecord {
        StockRecord {
            item_code: self.sku.unwrap_or_default(),
            location_or_channel: None,
            quantity_on_hand: Measure::parse(self.on_hand.as_deref()),
            quantity_available: Measure::parse(self.available.as_deref()),
            quantity_committed: Measure::parse(self.committed.as_deref()),
            title: self.title,
            listing_status: self.status,
        }
    }
}

/// 查询前台订单明细
pub async fn list_storefront_lines(pool: &PgPool) -> Result<Vec<OrderLine>> {
    let rows = sqlx::query_as::<_, StagedOrderRow>(
        r#"
        SELECT order_name AS order_number,
               NULL::text AS erp_order_name,
               lineitem_sku AS item_code,
               lineitem_name AS item_name,
               lineitem_quantity::text AS quantity,
               lineitem_price::text AS unit_price,
               financial_status AS payment_status,
               fulfillment_status,
               created_at::text AS ordered_at
        FROM storefront_orders
        "#
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(StagedOrderRow::into_order_line).collect())
}

/// 查询ERP订单明细
pub async fn list_erp_lines(pool: &PgPool) -> Result<Vec<OrderLine>> {
    let rows = sqlx::query_as::<_, StagedOrderRow>(
        r#"
        SELECT storefront_order_number AS order_number,
               erp_order_name,
               product_default_code AS item_code,
               product_name AS item_name,
               product_quantity::text AS quantity,
               product_unit_price::text AS unit_price,
               payment_status,
               delivery_status AS fulfillment_status,
               order_date::text AS ordered_at
        FROM erp_orders
        "#
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(StagedOrderRow::into_order_line).collect())
}

/// 查询旧编码对照表
pub async fn load_legacy_map(pool: &PgPool) -> Result<LegacyCodeMap> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT legacy_sku, base_sku
        FROM legacy_lookup
        WHERE legacy_sku IS NOT NULL AND base_sku IS NOT NULL
        ORDER BY legacy_sku
        "#
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

/// 查询ERP库存 (成品库位, 不含批次追踪)
pub async fn list_erp_stock(pool: &PgPool) -> Result<Vec<StockRecord>> {
    let rows = sqlx::query_as::<_, StagedErpStockRow>(
        r#"
        SELECT product_id,
               product_name,
               location_name,
               quantity::text AS quantity,
               available_quantity::text AS available_quantity
        FROM erp_stock
        "#
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(StagedErpStockRow::into_stock_record).collect())
}

/// 查询前台库存 (过滤未入库存管理的商品)
pub async fn list_storefront_stock(pool: &PgPool) -> Result<Vec<StockRecord>> {
    let rows = sqlx::query_as::<_, StagedStorefrontStockRow>(
        r#"
        SELECT sku,
               title,
               status,
               on_hand::text AS on_hand,
               available::text AS available,
               committed::text AS committed
        FROM storefront_inventory
        WHERE coalesce(available::text, '') <> 'not stocked'
        "#
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(StagedStorefrontStockRow::into_stock_record)
        .collect())
}

/// 单侧订单字段的扁平形式 (写库与导出共用)
struct SideColumns {
    order_number: Option<String>,
    item_code: Option<String>,
    item_name: Option<String>,
    quantity: Option<BigDecimal>,
    unit_price: Option<BigDecimal>,
    payment_status: Option<String>,
    fulfillment_status: Option<String>,
    ordered_at: Option<DateTime<Utc>>,
}

impl SideColumns {
    fn from_line(line: Option<&OrderLine>) -> Self {
        Self {
            order_number: line.map(|l| l.order_number.clone()),
            item_code: line.and_then(|l| l.item_code.clone()),
            item_name: line.map(|l| l.item_name.clone()),
            quantity: line.and_then(|l| l.quantity.value().cloned()),
            unit_price: line.and_then(|l| l.unit_price.value().cloned()),
            payment_status: line.map(|l| l.payment_status.clone()),
            fulfillment_status: line.map(|l| l.fulfillment_status.clone()),
            ordered_at: line.and_then(|l| l.ordered_at),
        }
    }

    fn csv_fields(&self) -> Vec<String> {
        vec![
            self.order_number.clone().unwrap_or_default(),
            self.item_code.clone().unwrap_or_default(),
            self.item_name.clone().unwrap_or_default(),
            option_to_csv(&self.quantity),
            option_to_csv(&self.unit_price),
            self.payment_status.clone().unwrap_or_default(),
            self.fulfillment_status.clone().unwrap_or_default(),
            self.ordered_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
        ]
    }
}

/// 执行批量写入, 超时视为失败
async fn execute_with_timeout(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    mut query_builder: QueryBuilder<'_, Postgres>,
    table: &'static str,
) -> Result<u64> {
    let execute_start = Instant::now();
    let execute_result = tokio::time::timeout(
        Duration::from_secs(INSERT_TIMEOUT_SECS),
        query_builder.build().execute(&mut **tx),
    )
    .await;

    match execute_result {
        Ok(Ok(result)) => {
            tracing::debug!(
                "✓ INSERT {} 成功, 影响 {} 行, 耗时: {:?}",
                table,
                result.rows_affected(),
                execute_start.elapsed()
            );
            Ok(result.rows_affected())
        }
        Ok(Err(e)) => {
            tracing::error!(
                "✗ INSERT {} 失败, 耗时: {:?}, 错误: {:?}",
                table,
                execute_start.elapsed(),
                e
            );
            Err(AppError::Database(e))
        }
        Err(_) => {
            tracing::error!("✗ INSERT {} 超时 (>{}秒)!", table, INSERT_TIMEOUT_SECS);
            Err(AppError::InsertTimeout {
                table,
                seconds: INSERT_TIMEOUT_SECS,
            })
        }
    }
}

/// 用本次结果整体替换对比表 (单事务: 清空 + 分块插入)
pub async fn replace_comparison(pool: &PgPool, rows: &[ComparisonRow]) -> Result<u64> {
    let start_time = Instant::now();
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM order_comparison")
        .execute(&mut *tx)
        .await?;

    let mut inserted = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut query_builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO order_comparison (
                order_key, item_key,
                sf_order_number, sf_item_code, sf_item_name, sf_quantity, sf_unit_price,
                sf_payment_status, sf_fulfillment_status, sf_ordered_at,
                erp_order_number, erp_item_code, erp_item_name, erp_quantity, erp_unit_price,
                erp_payment_status, erp_fulfillment_status, erp_ordered_at,
                present_on_storefront, present_on_erp, quantity_match, price_match,
                sync_status, compared_at
            ) ",
        );

        query_builder.push_values(chunk, |mut b, row| {
            let sf = SideColumns::from_line(row.storefront.as_ref());
            let erp = SideColumns::from_line(row.erp.as_ref());
            b.push_bind(row.key.order_number.clone())
                .push_bind(row.key.item_code.clone());
            for side in [sf, erp] {
                b.push_bind(side.order_number)
                    .push_bind(side.item_code)
                    .push_bind(side.item_name)
                    .push_bind(side.quantity)
                    .push_bind(side.unit_price)
                    .push_bind(side.payment_status)
                    .push_bind(side.fulfillment_status)
                    .push_bind(side.ordered_at);
            }
            b.push_bind(row.present_on_storefront)
                .push_bind(row.present_on_erp)
                .push_bind(row.quantity_match)
                .push_bind(row.price_match)
                .push_bind(row.sync_status.as_str())
                .push_bind(row.compared_at);
        });

        inserted += execute_with_timeout(&mut tx, query_builder, "order_comparison").await?;
    }

    tx.commit().await?;
    tracing::info!(
        "order_comparison 已替换: {} 行, 耗时: {:?}",
        inserted,
        start_time.elapsed()
    );
    Ok(inserted)
}

/// 用本次结果整体替换库存交叉对照表
pub async fn replace_cross_reference(pool: &PgPool, rows: &[CrossReferenceRow]) -> Result<u64> {
    let start_time = Instant::now();
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM stock_cross_reference")
        .execute(&mut *tx)
        .await?;

    let mut inserted = 0;
    for chunk in rows.chunks(INSERT_CHUNK) {
        let mut query_builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO stock_cross_reference (
                item_code, location, location_count,
                erp_on_hand, erp_available,
                storefront_on_hand, storefront_available, storefront_committed,
                diff_on_hand, diff_available, title, listing_status,
                potential_correct_code, potential_correct_size, size_mismatch_note
            ) ",
        );

        query_builder.push_values(chunk, |mut b, row| {
            b.push_bind(&row.item_code)
                .push_bind(&row.location)
                .push_bind(row.location_count as i64)
                .push_bind(&row.erp_on_hand)
                .push_bind(&row.erp_available)
                .push_bind(&row.storefront_on_hand)
                .push_bind(&row.storefront_available)
                .push_bind(&row.storefront_committed)
                .push_bind(&row.diff_on_hand)
                .push_bind(&row.diff_available)
                .push_bind(&row.title)
                .push_bind(&row.listing_status)
                .push_bind(&row.potential_correct_code)
                .push_bind(&row.potential_correct_size)
                .push_bind(&row.size_mismatch_note);
        });

        inserted += execute_with_timeout(&mut tx, query_builder, "stock_cross_reference").await?;
    }

    tx.commit().await?;
    tracing::info!(
        "stock_cross_reference 已替换: {} 行, 耗时: {:?}",
        inserted,
        start_time.elapsed()
    );
    Ok(inserted)
}

/// 将 Option<BigDecimal> 转换为 CSV 字符串
fn option_to_csv(val: &Option<BigDecimal>) -> String {
    val.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

/// 导出对比结果到 CSV 文件 (带表头)
pub fn export_to_csv(rows: &[ComparisonRow], output_path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path)?;

    let mut header = vec!["order_key".to_string(), "item_key".to_string()];
    for side in ["storefront", "erp"] {
        for field in [
            "order_number",
            "item_code",
            "item_name",
            "quantity",
            "unit_price",
            "payment_status",
            "fulfillment_status",
            "ordered_at",
        ] {
            header.push(format!("{}_{}", side, field));
        }
    }
    header.extend(
        [
            "present_on_storefront",
            "present_on_erp",
            "quantity_match",
            "price_match",
            "sync_status",
            "compared_at",
        ]
        .map(str::to_string),
    );
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.key.order_number.clone().unwrap_or_default(),
            row.key.item_code.clone().unwrap_or_default(),
        ];
        record.extend(SideColumns::from_line(row.storefront.as_ref()).csv_fields());
        record.extend(SideColumns::from_line(row.erp.as_ref()).csv_fields());
        record.extend([
            row.present_on_storefront.to_string(),
            row.present_on_erp.to_string(),
            row.quantity_match.to_string(),
            row.price_match.to_string(),
            row.sync_status.to_string(),
            row.compared_at.to_rfc3339(),
        ]);
        writer.write_record(&record)?;
    }

    writer.flush()?;
    tracing::info!("对比结果已导出到 {}", output_path.display());
    Ok(())
}
