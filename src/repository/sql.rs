// ==========================================
// 内容排期系统 - 仓储共用 SQL 工具
// ==========================================

use chrono::NaiveDateTime;
use rusqlite::types::Value;

/// IN 列表占位符: "?, ?, ?"
pub(crate) fn placeholders(n: usize) -> String {
    std::iter::repeat("?").take(n).collect::<Vec<_>>().join(", ")
}

/// ID 列表转绑定参数
pub(crate) fn id_values(ids: &[String]) -> Vec<Value> {
    ids.iter().map(|id| Value::from(id.clone())).collect()
}

/// 时刻绑定参数（与 rusqlite 写入 NaiveDateTime 的文本格式一致）
pub(crate) fn datetime_value(ts: NaiveDateTime) -> Value {
    Value::from(ts.format("%F %T%.f").to_string())
}
