// ==========================================
// LYRIQ 车源价格追踪 - 字段提取器
// ==========================================
// 职责: 原始单元格 → 类型化值（纯函数）
// 红线: 从不失败；无法解析时降级为 0 / ""
// ==========================================

use crate::domain::types::DriveType;

// ==========================================
// 数值提取
// ==========================================

/// 金额提取（售价 / 月供）
///
/// 仅保留数字、逗号、小数点，去掉逗号后按浮点解析并截断。
/// - "$37,900.00" → 37900
/// - "$1,068/mo est." → 1068
/// - "" / "N/A" → 0
pub fn extract_currency(raw: &str) -> u64 {
    if raw.trim().is_empty() {
        return 0;
    }

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    match cleaned.parse::<f64>() {
        // as 转换对超大值饱和
        Ok(value) if value.is_finite() && value > 0.0 => value.trunc() as u64,
        _ => 0,
    }
}

/// 里程提取: 仅保留数字（逗号视为千分位）
pub fn extract_mileage(raw: &str) -> u64 {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse::<u64>().unwrap_or(0)
}

/// 年款提取: 仅保留数字，不做位数校验（范围校验见配置 year_bounds）
pub fn extract_year(raw: &str) -> u32 {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse::<u32>().unwrap_or(0)
}

// ==========================================
// 文本提取
// ==========================================

/// 驱动形式: 完整描述 → AWD / RWD / FWD，无法识别时返回去空白的原文
pub fn extract_drive_type(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    match DriveType::from_description(trimmed) {
        Some(drive) => drive.code().to_string(),
        None => trimmed.to_string(),
    }
}

/// 配置名清洗: 去掉末尾的 " AWD"，再去掉末尾的 " RWD"
///
/// - "Tech AWD" → "Tech"
/// - "Sport 1 RWD" → "Sport 1"
/// - "AWD" → "AWD"（前面没有空白，不剥离）
pub fn clean_trim(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = strip_drive_token(trimmed, "AWD");
    strip_drive_token(stripped, "RWD").to_string()
}

/// 剥离 "<空白>+token" 结尾（区分大小写）
fn strip_drive_token<'a>(value: &'a str, token: &str) -> &'a str {
    match value.strip_suffix(token) {
        Some(head) if head.ends_with(char::is_whitespace) => head.trim_end(),
        _ => value,
    }
}

// ==========================================
// 列名规范化
// ==========================================

/// 列名规范化: 小写，空格与连字符替换为下划线（幂等）
pub fn normalize_field_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// 列名别名 → 规范字段名（导出文件历史上的拼写差异）
pub fn resolve_field_alias(normalized: &str) -> &str {
    match normalized {
        "milege" => "mileage",
        "phone" => "request_info",
        other => other,
    }
}

/// 表头单元格 → 规范列名（去空白 + 规范化 + 别名）
pub fn canonical_column_name(header: &str) -> String {
    let normalized = normalize_field_name(header.trim());
    resolve_field_alias(&normalized).to_string()
}
