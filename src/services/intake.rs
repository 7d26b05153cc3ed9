//! 批次文本解析 - 业务能力层
//!
//! 负责把一段多行输入文本解析为有效记录和带原因的拒绝。
//!
//! 纯函数：同样的输入必然得到同样的输出，没有任何副作用。
//!
//! 解析步骤：
//! 1. 按行切分，丢弃空行和 `#` 开头的注释行
//! 2. 规范化全角字符 / 特殊标点，折叠内部空白，统一 `,` / `|` 分隔符
//! 3. 切成恰好 4 个字段，逐字段独立校验
//!
//! 字段顺序固定：姓氏、出生日期、邮编、后四位。

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{ParseOutcome, Record, RejectKind, Rejection};
use crate::services::dob;

/// 注释行前缀
const COMMENT_PREFIX: char = '#';

/// 一行应当包含的字段数
const FIELD_COUNT: usize = 4;

fn last_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z' -]*$").expect("固定正则必然合法"))
}

fn zip_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("固定正则必然合法"))
}

fn last4_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}$").expect("固定正则必然合法"))
}

/// 解析一段批次文本
///
/// 每一条保留行产生且仅产生一个 [`ParseOutcome`]，顺序与输入一致。
/// 有效记录按出现顺序从 1 开始连续编号；拒绝行携带它在保留行中的序号。
pub fn parse_batch(text: &str) -> Vec<ParseOutcome> {
    let mut outcomes = Vec::new();
    let mut line_no = 0usize;
    let mut next_index = 1usize;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
            continue;
        }
        line_no += 1;

        match parse_record(line) {
            Ok(fields) => {
                outcomes.push(ParseOutcome::Valid(Record {
                    index: next_index,
                    last_name: fields.last_name,
                    dob: fields.dob,
                    zip: fields.zip,
                    last4: fields.last4,
                }));
                next_index += 1;
            }
            Err((kind, offending_value)) => {
                outcomes.push(ParseOutcome::Rejected(Rejection {
                    line_no,
                    raw_line: line.to_string(),
                    kind,
                    offending_value,
                }));
            }
        }
    }

    outcomes
}

/// 解析出的四个字段（尚未编号）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFields {
    pub last_name: String,
    pub dob: String,
    pub zip: String,
    pub last4: String,
}

/// 解析单行输入
///
/// 校验不会悄悄短路：第一个失败的字段决定拒绝原因，并携带原始字段值。
pub fn parse_record(line: &str) -> Result<ParsedFields, (RejectKind, Option<String>)> {
    let normalized = normalize_line(line);
    if normalized.is_empty() {
        return Err((RejectKind::EmptyLine, None));
    }

    let fields: Vec<&str> = normalized.split(',').map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err((
            RejectKind::BadFieldCount { got: fields.len() },
            Some(normalized.clone()),
        ));
    }

    let last_name = fields[0];
    if !last_name_re().is_match(last_name) {
        return Err((RejectKind::InvalidLastName, Some(last_name.to_string())));
    }

    let dob = dob::normalize_dob(fields[1])
        .ok_or_else(|| (RejectKind::InvalidDob, Some(fields[1].to_string())))?;

    let zip = fields[2];
    if !zip_re().is_match(zip) {
        return Err((RejectKind::InvalidZip, Some(zip.to_string())));
    }

    let last4 = fields[3];
    if !last4_re().is_match(last4) {
        return Err((RejectKind::InvalidLast4, Some(last4.to_string())));
    }

    Ok(ParsedFields {
        last_name: last_name.to_string(),
        dob,
        zip: zip.to_string(),
        last4: last4.to_string(),
    })
}

/// 规范化一行文本
///
/// 全角字符映射为 ASCII，`|` 系分隔符统一为 `,`，空白折叠为单个空格。
fn normalize_line(line: &str) -> String {
    let mapped: String = line.chars().map(normalize_char).collect();
    let collapsed = mapped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.replace('|', ",").trim().to_string()
}

/// 单字符宽度 / 标点规范化
fn normalize_char(c: char) -> char {
    match c {
        // 全角标点
        '，' | '、' => ',',
        '｜' => '|',
        '／' => '/',
        '－' | '—' | '–' => '-',
        '＇' | '\u{2018}' | '\u{2019}' => '\'',
        // 全角空格
        '\u{3000}' => ' ',
        // 全角数字 / 字母整体平移到 ASCII 区
        '０'..='９' | 'Ａ'..='Ｚ' | 'ａ'..='ｚ' => {
            char::from_u32(c as u32 - 0xFEE0).unwrap_or(c)
        }
        _ => c,
    }
}
