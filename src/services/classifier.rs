//! 页面证据判定 - 业务能力层
//!
//! 只负责"从一次页面文本快照得出结论"这一件事：
//! - 不持有会话，不发起任何交互
//! - 输入是一份完整的可见文本快照，保证单次扫描的原子性
//!
//! 词表优先级：不匹配词表先于成功词表。把"匹配"误判为成功是本领域
//! 代价最高的错误，所以同一次扫描里两类证据并存时必须判为不匹配。

/// 单次扫描得出的结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// 页面出现不匹配证据
    Mismatched,
    /// 页面出现成功证据
    Matched,
}

/// 不匹配词表（优先级高）
const MISMATCH_MARKERS: &[&str] = &[
    "unable to confirm",
    "does not match",
    "do not match",
    "no match",
    "could not be verified",
    "cannot be verified",
    "could not confirm",
    "not recognized",
    "incorrect information",
    "please try again",
];

/// 成功词表
const SUCCESS_MARKERS: &[&str] = &[
    "verified",
    "security code",
    "identity confirmed",
    "has been confirmed",
    "successfully",
    "your code",
];

/// 扫描一份页面文本快照
///
/// 返回 `None` 表示本次扫描没有任何证据，调用方继续轮询直到截止。
pub fn classify_scan(text: &str) -> Option<Verdict> {
    let haystack = text.to_lowercase();

    if MISMATCH_MARKERS.iter().any(|m| haystack.contains(m)) {
        return Some(Verdict::Mismatched);
    }
    if SUCCESS_MARKERS.iter().any(|m| haystack.contains(m)) {
        return Some(Verdict::Matched);
    }
    None
}
