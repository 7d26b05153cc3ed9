//! 核验记录
//!
//! 一条经过解析和规范化的输入记录，构造完成后不可变。

use serde::{Deserialize, Serialize};

/// 一条待核验的记录
///
/// 由 intake 解析产生。`index` 在本批次的有效记录中从 1 开始连续编号，
/// 调度器和汇总器都以它作为稳定排序键。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// 有效记录序号（1 开始，连续）
    pub index: usize,
    /// 姓氏（仅字母 / 撇号 / 连字符 / 空格）
    pub last_name: String,
    /// 出生日期（规范化为 MM/DD/YYYY）
    pub dob: String,
    /// 美国邮编（5 位或 5+4 位）
    pub zip: String,
    /// 证件后四位（4 位数字）
    pub last4: String,
}

impl Record {
    /// 还原为规范化的一行输入文本
    ///
    /// 再次解析该文本必须得到字段完全相同的记录（幂等性）。
    pub fn canonical_line(&self) -> String {
        format!("{},{},{},{}", self.last_name, self.dob, self.zip, self.last4)
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {} ({})", self.index, self.last_name, self.zip)
    }
}
