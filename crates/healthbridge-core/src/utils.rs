//! 通用工具函数

use chrono::NaiveDate;
use uuid::Uuid;

/// 展示日期格式，例如 "Oct 25, 2024"
pub const DISPLAY_DATE_FORMAT: &str = "%b %-d, %Y";

/// 新实体ID生成器
///
/// 通过注入生成器替代随机ID，测试可以得到确定的ID序列。
pub trait IdGenerator: Send {
    fn next_id(&mut self) -> String;
}

/// 随机ID生成器（9位小写字母数字）
#[derive(Debug, Default, Clone)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().simple().to_string()[..9].to_string()
    }
}

/// 顺序ID生成器：`{prefix}{n}`，n 从 1 开始
#[derive(Debug, Clone)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: u64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&mut self) -> String {
        self.counter += 1;
        format!("{}{}", self.prefix, self.counter)
    }
}

/// 格式化展示日期
pub fn format_display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

/// 解析日期输入，接受 `2024-10-25` 或 `Oct 25, 2024`
pub fn parse_calendar_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%b %d, %Y"))
        .ok()
}

/// 通话时长格式 `m:ss`
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// 医生时间线上展示的短编号，例如 `#PX-APT1`
pub fn short_reference(id: &str) -> String {
    let head: String = id.chars().take(4).collect();
    format!("#PX-{}", head.to_uppercase())
}
