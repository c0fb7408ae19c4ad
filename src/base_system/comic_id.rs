//! 漫画 ID/链接解析与规范化。

use regex::Regex;
use std::sync::OnceLock;

static RE_URL: OnceLock<Regex> = OnceLock::new();
static RE_HTML: OnceLock<Regex> = OnceLock::new();
static RE_SHOW: OnceLock<Regex> = OnceLock::new();

fn re_url() -> &'static Regex {
    RE_URL.get_or_init(|| Regex::new(r"https?://\S+").expect("compile RE_URL"))
}

fn re_html() -> &'static Regex {
    RE_HTML.get_or_init(|| Regex::new(r"/html/(\d+)\.html").expect("compile RE_HTML"))
}

fn re_show() -> &'static Regex {
    RE_SHOW.get_or_init(|| {
        Regex::new(r"/(?:cool|best-manga)-(\d+)\.html").expect("compile RE_SHOW")
    })
}

/// 接受纯数字 ID，或目录页 / 阅读页链接。
pub fn parse_comic_id(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Some(trimmed.to_string());
    }

    let target = re_url()
        .find(trimmed)
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    re_html()
        .captures(target)
        .or_else(|| re_show().captures(target))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
