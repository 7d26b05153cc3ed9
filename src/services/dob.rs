//! 出生日期规范化 - 业务能力层
//!
//! 只负责"把一个日期字符串规范化为 MM/DD/YYYY"这一件事。
//!
//! 接受的字面格式：
//! 1. `YYYY-MM-DD`
//! 2. `M/D/YY`（两位年份按分界值解析：<= 30 -> 20xx，否则 19xx）
//! 3. `MM-DD-YYYY` / `MM/DD/YYYY`
//! 4. 其余可解析的常见日历写法（兜底格式表）
//!
//! 年份限定在 1900..=2100，日期必须是真实存在的日历日。

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// 规范化输出格式
const CANONICAL_FORMAT: &str = "%m/%d/%Y";

/// 两位年份的分界值：<= 30 解析到 2000 年代，否则 1900 年代
const SHORT_YEAR_PIVOT: u32 = 30;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

/// 兜底格式表（按尝试顺序）
const FALLBACK_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m.%d.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

fn short_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2})$").expect("固定正则必然合法"))
}

fn us_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})[-/](\d{1,2})[-/](\d{4})$").expect("固定正则必然合法")
    })
}

/// 把任意受支持写法的日期规范化为 `MM/DD/YYYY`
///
/// 无法按任何规则解析时返回 `None`。
pub fn normalize_dob(raw: &str) -> Option<String> {
    let input = raw.trim();
    if input.is_empty() {
        return None;
    }

    // 1. ISO 格式 YYYY-MM-DD
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return canonicalize(date);
    }

    // 2. 两位年份 M/D/YY
    if let Some(caps) = short_year_re().captures(input) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let short: u32 = caps[3].parse().ok()?;
        let year = if short <= SHORT_YEAR_PIVOT {
            2000 + short as i32
        } else {
            1900 + short as i32
        };
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        return canonicalize(date);
    }

    // 3. 四位年份 MM-DD-YYYY / MM/DD/YYYY
    if let Some(caps) = us_date_re().captures(input) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        return canonicalize(date);
    }

    // 4. 兜底格式表
    for format in FALLBACK_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return canonicalize(date);
        }
    }

    None
}

/// 校验年份范围并输出规范形式
fn canonicalize(date: NaiveDate) -> Option<String> {
    if date.year() < MIN_YEAR || date.year() > MAX_YEAR {
        return None;
    }
    Some(date.format(CANONICAL_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_literal_forms_canonicalize_identically() {
        // 三种写法必须收敛到同一个规范形式
        assert_eq!(normalize_dob("1961-02-23").as_deref(), Some("02/23/1961"));
        assert_eq!(normalize_dob("02/23/1961").as_deref(), Some("02/23/1961"));
        assert_eq!(normalize_dob("2/23/61").as_deref(), Some("02/23/1961"));
    }

    #[test]
    fn test_dash_separated_us_form() {
        assert_eq!(normalize_dob("02-23-1961").as_deref(), Some("02/23/1961"));
        assert_eq!(normalize_dob("7-4-1976").as_deref(), Some("07/04/1976"));
    }

    #[test]
    fn test_short_year_pivot() {
        // <= 30 解析到 2000 年代
        assert_eq!(normalize_dob("1/2/30").as_deref(), Some("01/02/2030"));
        assert_eq!(normalize_dob("1/2/00").as_deref(), Some("01/02/2000"));
        // > 30 解析到 1900 年代
        assert_eq!(normalize_dob("1/2/31").as_deref(), Some("01/02/1931"));
        assert_eq!(normalize_dob("12/31/99").as_deref(), Some("12/31/1999"));
    }

    #[test]
    fn test_fallback_formats() {
        assert_eq!(
            normalize_dob("February 23, 1961").as_deref(),
            Some("02/23/1961")
        );
        assert_eq!(normalize_dob("Feb 23, 1961").as_deref(), Some("02/23/1961"));
        assert_eq!(normalize_dob("1961/02/23").as_deref(), Some("02/23/1961"));
        assert_eq!(normalize_dob("23 February 1961").as_deref(), Some("02/23/1961"));
    }

    #[test]
    fn test_idempotent_on_canonical_form() {
        let canonical = normalize_dob("1961-02-23").unwrap();
        assert_eq!(normalize_dob(&canonical), Some(canonical.clone()));
    }

    #[test]
    fn test_rejects_impossible_dates() {
        assert_eq!(normalize_dob("02/31/1961"), None);
        assert_eq!(normalize_dob("13/01/1961"), None);
        assert_eq!(normalize_dob("00/10/1961"), None);
    }

    #[test]
    fn test_rejects_out_of_range_years() {
        assert_eq!(normalize_dob("1899-12-31"), None);
        assert_eq!(normalize_dob("2101-01-01"), None);
        assert_eq!(normalize_dob("01/01/1900").as_deref(), Some("01/01/1900"));
        assert_eq!(normalize_dob("12/31/2100").as_deref(), Some("12/31/2100"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(normalize_dob(""), None);
        assert_eq!(normalize_dob("not a date"), None);
        assert_eq!(normalize_dob("1961"), None);
    }
}
