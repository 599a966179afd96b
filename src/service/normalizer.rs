use crate::models::CanonicalKey;

/// 规范化订单号: 去空白、去掉前台的 `#` 前缀、转小写; 空值返回 None
pub fn normalize_order_number(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim().trim_start_matches('#').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// 规范化商品编码: 去空白、转小写; 空值返回 None (不会返回空串)
pub fn normalize_item_code(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// 构建连接键 (调用方负责先做旧编码解析)
pub fn canonical_key(order_number: Option<&str>, item_code: Option<&str>) -> CanonicalKey {
    CanonicalKey {
        order_number: normalize_order_number(order_number),
        item_code: normalize_item_code(item_code),
    }
}
