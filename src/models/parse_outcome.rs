//! 解析结果
//!
//! 每一条保留下来的输入行都产生且仅产生一个 [`ParseOutcome`]，顺序与输入一致。

use serde::Serialize;

use crate::models::record::Record;

/// 单行解析被拒绝的原因
///
/// 每个拒绝原因都要携带足够的信息，使失败能在测试中复现。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectKind {
    /// 规范化后为空行
    #[error("空行")]
    EmptyLine,
    /// 字段数量不是 4
    #[error("字段数量错误: 期望 4 个, 实际 {got} 个")]
    BadFieldCount { got: usize },
    /// 姓氏包含非法字符或为空
    #[error("姓氏格式无效")]
    InvalidLastName,
    /// 出生日期无法按任何已知格式解析
    #[error("出生日期无法解析")]
    InvalidDob,
    /// 邮编不是 5 位或 5+4 位格式
    #[error("邮编格式无效")]
    InvalidZip,
    /// 后四位不是恰好 4 位数字
    #[error("后四位格式无效")]
    InvalidLast4,
}

/// 一条被拒绝的输入行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// 在保留行（去掉空行和注释后）中的序号，从 1 开始
    pub line_no: usize,
    /// 原始输入行（已去除首尾空白）
    pub raw_line: String,
    /// 拒绝原因
    pub kind: RejectKind,
    /// 触发拒绝的字段原始值（若能定位到具体字段）
    pub offending_value: Option<String>,
}

impl Rejection {
    /// 人类可读的拒绝说明
    pub fn reason(&self) -> String {
        match &self.offending_value {
            Some(value) => format!("{} (字段值: {})", self.kind, value),
            None => self.kind.to_string(),
        }
    }
}

/// 单行输入的解析结果：有效记录或带原因的拒绝
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParseOutcome {
    Valid(Record),
    Rejected(Rejection),
}

impl ParseOutcome {
    pub fn as_valid(&self) -> Option<&Record> {
        match self {
            ParseOutcome::Valid(record) => Some(record),
            ParseOutcome::Rejected(_) => None,
        }
    }

    pub fn as_rejected(&self) -> Option<&Rejection> {
        match self {
            ParseOutcome::Valid(_) => None,
            ParseOutcome::Rejected(rejection) => Some(rejection),
        }
    }
}
