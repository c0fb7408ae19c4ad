//! 由 Subkey 推导每一页的图片地址。

use thiserror::Error;

use super::decoder::Subkey;
use super::{slice_chars, slice_digits};

const HASH_BASE: usize = 10;
const HASH_LEN: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("page numbers start at 1")]
    InvalidPage,
    #[error("subkey field `{field}` is empty")]
    EmptyField { field: &'static str },
}

/// 页码对应的 hash 字段偏移（相对于 offset 10），页码从 1 开始。
pub fn hash_offset(page: u32) -> usize {
    let n = page.saturating_sub(1) as usize;
    (n / 10) % 10 + (n % 10) * 3
}

pub fn resolve_url(subkey: &Subkey, comic_id: &str, page: u32) -> Result<String, ResolveError> {
    if page == 0 {
        return Err(ResolveError::InvalidPage);
    }
    let raw = subkey.as_str();

    let server = non_empty("server", slice_digits(raw, 4, 2))?;
    let serial = non_empty("serial", slice_digits(raw, 6, 1))?;
    let series = non_empty("series", slice_digits(raw, 0, 4))?;
    // hash 取原始字符，不做数字过滤
    let hash = non_empty("hash", slice_chars(raw, hash_offset(page) + HASH_BASE, HASH_LEN))?;

    Ok(format!(
        "http://img{server}.8comic.com/{serial}/{comic_id}/{series}/{page:03}_{hash}.jpg"
    ))
}

fn non_empty(field: &'static str, value: String) -> Result<String, ResolveError> {
    if value.is_empty() {
        Err(ResolveError::EmptyField { field })
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0-3 series, 4-5 server, 6 serial, 7-9 page count, 10.. hash area
    const SUBKEY: &str = "0012071024abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMN";

    #[test]
    fn hash_offset_literals() {
        assert_eq!(hash_offset(1), 0);
        assert_eq!(hash_offset(2), 3);
        assert_eq!(hash_offset(10), 27);
        assert_eq!(hash_offset(11), 1);
        assert_eq!(hash_offset(12), 4);
        assert_eq!(hash_offset(101), 0);
    }

    #[test]
    fn resolves_first_pages() {
        let sub = Subkey::new(SUBKEY);
        assert_eq!(SUBKEY.len(), 50);
        assert_eq!(
            resolve_url(&sub, "103", 1).unwrap(),
            "http://img07.8comic.com/1/103/0012/001_abc.jpg"
        );
        assert_eq!(
            resolve_url(&sub, "103", 2).unwrap(),
            "http://img07.8comic.com/1/103/0012/002_def.jpg"
        );
        assert_eq!(
            resolve_url(&sub, "103", 11).unwrap(),
            "http://img07.8comic.com/1/103/0012/011_bcd.jpg"
        );
    }

    #[test]
    fn resolve_is_pure() {
        let sub = Subkey::new(SUBKEY);
        let a = resolve_url(&sub, "8", 7).unwrap();
        let b = resolve_url(&sub, "8", 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn non_digit_fields_are_filtered() {
        let sub = Subkey::new("a1b2c3d4xxhhh");
        // series "12", server "3"（"c3" 过滤后）, serial 无数字
        assert_eq!(
            resolve_url(&sub, "1", 1),
            Err(ResolveError::EmptyField { field: "serial" })
        );

        let sub = Subkey::new("a1b2c345xxhhh");
        assert_eq!(
            resolve_url(&sub, "1", 1).unwrap(),
            "http://img3.8comic.com/4/1/12/001_hhh.jpg"
        );
    }

    #[test]
    fn missing_hash_is_an_error() {
        let sub = Subkey::new("0012071024");
        assert_eq!(
            resolve_url(&sub, "1", 1),
            Err(ResolveError::EmptyField { field: "hash" })
        );
    }

    #[test]
    fn page_zero_is_rejected() {
        let sub = Subkey::new(SUBKEY);
        assert_eq!(resolve_url(&sub, "1", 0), Err(ResolveError::InvalidPage));
    }
}
