//! ComicKey 解码：按固定宽度分块，定位当前章节的 Subkey。

use std::fmt;

use thiserror::Error;

use super::{slice_chars, slice_digits};

/// 每章密钥块的宽度。
pub const BLOCK_WIDTH: usize = 50;

const CHAPTER_FIELD: (usize, usize) = (0, 4);
const PAGE_COUNT_FIELD: (usize, usize) = (7, 3);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("comic key is empty")]
    EmptyKey,
    #[error("no key block for chapter {chapter} and the fallback block has no digits")]
    NoBlock { chapter: u32 },
    #[error("subkey has no page count digits")]
    MissingPageCount,
}

/// 单章的密钥片段。
///
/// 命中分块时是原样的 50 个字符；未命中时退回到「最后 50 个字符只保留数字」，
/// 此时长度会变短，URL 推导里的固定偏移不再可靠，`is_fallback` 用来标记这种情况。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subkey {
    raw: String,
    fallback: bool,
}

impl Subkey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            fallback: false,
        }
    }

    fn from_fallback(raw: String) -> Self {
        Self {
            raw,
            fallback: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

impl fmt::Display for Subkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// 从整本漫画的 key 中取出第 `chapter` 章（从 1 开始）的 Subkey。
///
/// 比较的是块前 4 个字符过滤后的数字串与 `chapter` 的十进制写法（不补零），
/// 所以 `"0003"` 不会匹配第 3 章。
pub fn decode(key: &str, chapter: u32) -> Result<Subkey, DecodeError> {
    if key.is_empty() {
        return Err(DecodeError::EmptyKey);
    }

    let wanted = chapter.to_string();
    let len = key.chars().count();
    for i in 0..len / BLOCK_WIDTH {
        let start = i * BLOCK_WIDTH;
        if slice_digits(key, start + CHAPTER_FIELD.0, CHAPTER_FIELD.1) == wanted {
            return Ok(Subkey::new(slice_chars(key, start, BLOCK_WIDTH)));
        }
    }

    let tail = slice_digits(key, len.saturating_sub(BLOCK_WIDTH), BLOCK_WIDTH);
    if tail.is_empty() {
        return Err(DecodeError::NoBlock { chapter });
    }
    Ok(Subkey::from_fallback(tail))
}

pub fn page_count(subkey: &Subkey) -> Result<u32, DecodeError> {
    let digits = slice_digits(subkey.as_str(), PAGE_COUNT_FIELD.0, PAGE_COUNT_FIELD.1);
    digits.parse().map_err(|_| DecodeError::MissingPageCount)
}
