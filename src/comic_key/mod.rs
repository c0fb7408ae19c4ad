//! 章节密钥解码与图片地址推导（纯函数，无 I/O）。
//!
//! - `decoder`：ComicKey → Subkey，以及从 Subkey 读取页数
//! - `url`：Subkey + 页码 → 图片 URL

pub mod decoder;
pub mod url;

pub use decoder::{DecodeError, Subkey, decode, page_count};
pub use url::{ResolveError, resolve_url};

/// 按字符截取 `[start, start + count)`，越界部分截断，起点越界返回空串。
pub(crate) fn slice_chars(s: &str, start: usize, count: usize) -> String {
    s.chars().skip(start).take(count).collect()
}

/// 截取后只保留 ASCII 数字。
pub(crate) fn slice_digits(s: &str, start: usize, count: usize) -> String {
    s.chars()
        .skip(start)
        .take(count)
        .filter(|c| c.is_ascii_digit())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_helpers_truncate_out_of_range() {
        assert_eq!(slice_chars("abcdef", 4, 10), "ef");
        assert_eq!(slice_chars("abc", 5, 2), "");
        assert_eq!(slice_digits("a1b2c3", 0, 4), "12");
        assert_eq!(slice_digits("12", 3, 3), "");
    }
}
