use crate::models::{CrossReferenceRow, MismatchCandidate, StockRecord};
use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// ERP 某编码在某库位的库存合计
struct ErpTotal {
    code: String,
    location: Option<String>,
    on_hand: BigDecimal,
    available: BigDecimal,
}

/// 前台某编码的库存 (重复商品逐列取最大值, 文本列同样取字典序最大)
#[derive(Default)]
struct StorefrontTotal {
    on_hand: BigDecimal,
    available: BigDecimal,
    committed: BigDecimal,
    title: Option<String>,
    status: Option<String>,
}

/// 构建 ERP 与前台的库存交叉对照
///
/// 只保留 ERP 现存量非零、且前台商品为 active (或前台没有该商品) 的行;
/// 规格错配候选按 ERP 编码挂到对应行上, 多个候选时行会重复。
pub fn build_cross_reference(
    erp: &[StockRecord],
    storefront: &[StockRecord],
    candidates: &[MismatchCandidate],
) -> Vec<CrossReferenceRow> {
    // 1. ERP 按 (编码, 库位) 汇总
    let mut erp_totals: IndexMap<(String, Option<String>), ErpTotal> = IndexMap::new();
    for r in erp {
        let code = r.item_code.trim();
        if code.is_empty() {
            continue;
        }
        let location = r.location_or_channel.clone();
        let total = erp_totals
            .entry((code.to_lowercase(), location.clone()))
            .or_insert_with(|| ErpTotal {
                code: code.to_string(),
                location,
                on_hand: BigDecimal::zero(),
                available: BigDecimal::zero(),
            });
        if let Some(v) = r.quantity_on_hand.value() {
            total.on_hand += v;
        }
        if let Some(v) = r.quantity_available.value() {
            total.available += v;
        }
    }

    // 2. 每个编码有库存的库位数
    let mut location_counts: HashMap<String, usize> = HashMap::new();
    for ((code, _), total) in &erp_totals {
        if !total.on_hand.is_zero() {
            *location_counts.entry(code.clone()).or_insert(0) += 1;
        }
    }

    // 3. 前台按编码合并
    let mut sf_totals: HashMap<String, StorefrontTotal> = HashMap::new();
    for r in storefront {
        let code = r.item_code.trim();
        if code.is_empty() {
            continue;
        }
        let total = sf_totals.entry(code.to_lowercase()).or_default();
        keep_max(&mut total.on_hand, r.quantity_on_hand.value());
        keep_max(&mut total.available, r.quantity_available.value());
        keep_max(&mut total.committed, r.quantity_committed.value());
        keep_max_text(&mut total.title, r.title.as_deref());
        keep_max_text(&mut total.status, r.listing_status.as_deref());
    }

    let mut candidates_by_code: HashMap<String, Vec<&MismatchCandidate>> = HashMap::new();
    for c in candidates {
        candidates_by_code
            .entry(c.erp_item_code.trim().to_lowercase())
            .or_default()
            .push(c);
    }

    // 4. 左连接 + 过滤
    let mut rows = Vec::new();
    for ((code, _), total) in &erp_totals {
        if total.on_hand.is_zero() {
            continue;
        }
        let sf = sf_totals.get(code);
        let active = sf
            .and_then(|s| s.status.as_deref())
            .map_or(true, |s| s.trim().eq_ignore_ascii_case("active"));
        if !active {
            continue;
        }

        let base = CrossReferenceRow {
            item_code: total.code.clone(),
            location: total.location.clone(),
            location_count: location_counts.get(code).copied().unwrap_or(0),
            erp_on_hand: total.on_hand.clone(),
            erp_available: total.available.clone(),
            storefront_on_hand: sf.map(|s| s.on_hand.clone()),
            storefront_available: sf.map(|s| s.available.clone()),
            storefront_committed: sf.map(|s| s.committed.clone()),
            diff_on_hand: sf.map(|s| &total.on_hand - &s.on_hand),
            diff_available: sf.map(|s| &total.available - &s.available),
            title: sf.and_then(|s| s.title.clone()),
            listing_status: sf.and_then(|s| s.status.clone()),
            potential_correct_code: None,
            potential_correct_size: None,
            size_mismatch_note: None,
        };

        match candidates_by_code.get(code) {
            Some(found) => {
                for c in found {
                    rows.push(CrossReferenceRow {
                        potential_correct_code: Some(c.storefront_item_code.clone()),
                        potential_correct_size: Some(c.storefront_size.clone()),
                        size_mismatch_note: Some(c.note.clone()),
                        ..base.clone()
                    });
                }
            }
            None => rows.push(base),
        }
    }

    rows.sort_by(compare_rows);

    tracing::info!(
        "库存交叉对照: ERP {} 个库位记录, 输出 {} 行, 其中 {} 行有规格错配提示",
        erp_totals.len(),
        rows.len(),
        rows.iter().filter(|r| r.size_mismatch_note.is_some()).count()
    );

    rows
}

/// 差异显著的行: 前台有该商品, ERP 现存为正, 且现存差额绝对值超过阈值
///
/// 同一 (编码, 库位) 因多个错配候选而重复时只保留一行; 按差额绝对值降序。
pub fn significant_mismatches(
    rows: &[CrossReferenceRow],
    threshold: &BigDecimal,
) -> Vec<CrossReferenceRow> {
    let mut seen = HashSet::new();
    let mut found: Vec<(BigDecimal, &CrossReferenceRow)> = rows
        .iter()
        .filter(|r| r.storefront_on_hand.is_some() && r.erp_on_hand > BigDecimal::zero())
        .filter_map(|r| {
            let gap = r.diff_on_hand.as_ref()?.abs();
            (gap > *threshold).then_some((gap, r))
        })
        .filter(|(_, r)| seen.insert((r.item_code.to_lowercase(), r.location.clone())))
        .collect();
    found.sort_by(|a, b| b.0.cmp(&a.0));

    for (gap, r) in found.iter().take(5) {
        tracing::info!(
            "库存差异显著: {} (ERP: {}, 前台: {:?}, 差额 {})",
            r.item_code,
            r.erp_on_hand,
            r.storefront_on_hand,
            gap
        );
    }
    found.into_iter().map(|(_, r)| r.clone()).collect()
}

fn keep_max(current: &mut BigDecimal, candidate: Option<&BigDecimal>) {
    if let Some(v) = candidate {
        if *v > *current {
            *current = v.clone();
        }
    }
}

/// 重复商品的 draft/active 组合取到 draft, 整行被状态过滤掉
fn keep_max_text(current: &mut Option<String>, candidate: Option<&str>) {
    let Some(v) = candidate.map(str::trim).filter(|v| !v.is_empty()) else {
        return;
    };
    if current.as_deref().map_or(true, |c| v > c) {
        *current = Some(v.to_string());
    }
}

/// 有前台库存时取差额绝对值, 否则取 ERP 数量
fn discrepancy(
    erp: &BigDecimal,
    storefront: Option<&BigDecimal>,
    diff: Option<&BigDecimal>,
) -> BigDecimal {
    match (storefront, diff) {
        (Some(s), Some(d)) if !s.is_zero() => d.abs(),
        _ => erp.clone(),
    }
}

/// 排序: 有错配提示的在前 -> 库位 -> 现存差异降序 -> 可用差异降序
fn compare_rows(a: &CrossReferenceRow, b: &CrossReferenceRow) -> Ordering {
    let unflagged = |r: &CrossReferenceRow| r.size_mismatch_note.is_none();
    unflagged(a)
        .cmp(&unflagged(b))
        .then_with(|| a.location.cmp(&b.location))
        .then_with(|| {
            let da = discrepancy(
                &a.erp_on_hand,
                a.storefront_on_hand.as_ref(),
                a.diff_on_hand.as_ref(),
            );
            let db = discrepancy(
                &b.erp_on_hand,
                b.storefront_on_hand.as_ref(),
                b.diff_on_hand.as_ref(),
            );
            db.cmp(&da)
        })
        .then_with(|| {
            let da = discrepancy(
                &a.erp_available,
                a.storefront_available.as_ref(),
                a.diff_available.as_ref(),
            );
            let db = discrepancy(
                &b.erp_available,
                b.storefront_available.as_ref(),
                b.diff_available.as_ref(),
            );
            db.cmp(&da)
        })
}
