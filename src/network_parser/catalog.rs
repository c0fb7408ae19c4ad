//! 目录页 / 阅读页的文本解析：书名、作者、分类、章节列表、章节密钥。

use std::sync::OnceLock;

use anyhow::{Result, anyhow};
use regex::Regex;
use scraper::{Html, Selector};

use crate::base_system::context::safe_fs_name;

/// 这些分类的阅读页走 `cool-<id>.html`，其余走 `best-manga-<id>.html`。
const COOL_CATEGORIES: [u32; 12] = [1, 2, 4, 5, 6, 7, 9, 12, 17, 19, 21, 22];

fn sel_title() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    S.get_or_init(|| Selector::parse(r##"font[color="#FF6600"]"##).unwrap())
}

fn sel_row() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    S.get_or_init(|| Selector::parse("tr").unwrap())
}

fn sel_chapter_link() -> &'static Selector {
    static S: OnceLock<Selector> = OnceLock::new();
    S.get_or_init(|| Selector::parse("a.Ch").unwrap())
}

fn re_author() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"作者.+\s+(.+)").unwrap())
}

fn re_category() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r",(\d+)\);").unwrap())
}

fn re_chapter_no() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"-(\d+)\.html").unwrap())
}

fn re_comic_key() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"var cs='([^']+)';").unwrap())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRef {
    /// 在目录中的位置（从 1 开始），也是解码密钥时使用的章节号。
    pub index: u32,
    /// 站点上的章节编号（`?ch=` 参数）。
    pub number: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComicCatalog {
    pub comic_id: String,
    pub name: String,
    pub author: String,
    pub category: u32,
    pub chapters: Vec<ChapterRef>,
}

impl ComicCatalog {
    pub fn full_name(&self) -> String {
        format!("[{}]{}", self.author, self.name)
    }

    /// 用作目录名的 `[作者]书名`。
    pub fn folder_name(&self) -> String {
        safe_fs_name(&self.full_name(), "_", 120)
    }
}

pub fn show_url(show_base: &str, category: u32, comic_id: &str) -> String {
    let base = show_base.trim().trim_end_matches('/');
    if COOL_CATEGORIES.contains(&category) {
        format!("{base}/cool-{comic_id}.html")
    } else {
        format!("{base}/best-manga-{comic_id}.html")
    }
}

pub fn catalog_url(catalog_base: &str, comic_id: &str) -> String {
    format!("{}/{comic_id}.html", catalog_base.trim().trim_end_matches('/'))
}

pub fn parse_catalog(html: &str, comic_id: &str, show_base: &str) -> Result<ComicCatalog> {
    let document = Html::parse_document(html);

    let name = document
        .select(sel_title())
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("目录页中找不到书名"))?;

    // 每行单独成行，作者名不会和下一行的文字连在一起
    let rows = document
        .select(sel_row())
        .map(|row| row.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");
    let author = re_author()
        .captures(&rows)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("目录页中找不到作者"))?;

    let onclicks: Vec<&str> = document
        .select(sel_chapter_link())
        .filter_map(|a| a.value().attr("onclick"))
        .collect();
    let first = onclicks
        .first()
        .ok_or_else(|| anyhow!("目录页中没有章节链接"))?;

    let category = re_category()
        .captures(first)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .ok_or_else(|| anyhow!("无法从章节链接解析分类: {first}"))?;

    let show = show_url(show_base, category, comic_id);
    let chapters = onclicks
        .iter()
        .filter_map(|onclick| re_chapter_no().captures(onclick))
        .filter_map(|c| c.get(1))
        .zip(1u32..)
        .map(|(number, index)| ChapterRef {
            index,
            number: number.as_str().to_string(),
            url: format!("{show}?ch={}", number.as_str()),
        })
        .collect();

    Ok(ComicCatalog {
        comic_id: comic_id.to_string(),
        name,
        author,
        category,
        chapters,
    })
}

pub fn extract_comic_key(html: &str) -> Option<String> {
    re_comic_key()
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOW: &str = "http://new.comicvip.com/show/";

    const CATALOG: &str = r##"
<html><body>
<table>
<tr><td><font color="#FF6600" size="3"><b>航海王</b></font></td></tr>
<tr><td>作者：</td>
    <td>尾田榮一郎</td></tr>
</table>
<table>
<tr><td><a href="#" class="Ch" onclick="cview('103-1.html',6);return false;">1</a></td>
<td><a href='#' onclick="cview('103-2.html',6);return false;" class='Ch'>2</a></td>
<td><a href="#" class="other" onclick="cview('103-99.html',6);return false;">x</a></td>
<td><a class=Ch onclick="cview('103-5.html',6);return false;">5</a></td></tr>
</table>
</body></html>
"##;

    #[test]
    fn parses_catalog_page() {
        let catalog = parse_catalog(CATALOG, "103", SHOW).unwrap();
        assert_eq!(catalog.name, "航海王");
        assert_eq!(catalog.author, "尾田榮一郎");
        assert_eq!(catalog.category, 6);
        assert_eq!(catalog.full_name(), "[尾田榮一郎]航海王");

        let numbers: Vec<_> = catalog.chapters.iter().map(|c| c.number.as_str()).collect();
        assert_eq!(numbers, vec!["1", "2", "5"]);
        assert_eq!(catalog.chapters[2].index, 3);
        assert_eq!(
            catalog.chapters[2].url,
            "http://new.comicvip.com/show/cool-103.html?ch=5"
        );
    }

    #[test]
    fn show_url_depends_on_category() {
        assert_eq!(
            show_url(SHOW, 12, "7"),
            "http://new.comicvip.com/show/cool-7.html"
        );
        assert_eq!(
            show_url(SHOW, 10, "7"),
            "http://new.comicvip.com/show/best-manga-7.html"
        );
        assert_eq!(
            catalog_url("http://www.comicvip.com/html/", "7"),
            "http://www.comicvip.com/html/7.html"
        );
    }

    #[test]
    fn missing_title_is_an_error() {
        let html = "<table><tr><td>作者：</td>\n<td>x</td></tr></table>";
        let err = parse_catalog(html, "1", SHOW).unwrap_err();
        assert!(err.to_string().contains("书名"));
    }

    #[test]
    fn missing_chapters_is_an_error() {
        let html = r##"<font color="#FF6600">t</font><table><tr><td>作者：</td>
<td>a</td></tr></table>"##;
        let err = parse_catalog(html, "1", SHOW).unwrap_err();
        assert!(err.to_string().contains("章节"));
    }

    #[test]
    fn entities_and_nested_markup_in_title_are_decoded() {
        let html = r##"<font color="#FF6600"><b>One &amp; <i>Two</i></b></font>
<table><tr><td>作者：</td>
<td>x</td></tr></table>
<a class="Ch big" onclick="cview('1-3.html',10);return false;">3</a>"##;
        let catalog = parse_catalog(html, "1", SHOW).unwrap();
        assert_eq!(catalog.name, "One & Two");
        assert_eq!(catalog.category, 10);
        assert_eq!(
            catalog.chapters[0].url,
            "http://new.comicvip.com/show/best-manga-1.html?ch=3"
        );
    }

    #[test]
    fn extracts_comic_key_from_script() {
        let html = "<script>var y=1;var cs='0012071024abc';var z=2;</script>";
        assert_eq!(extract_comic_key(html).as_deref(), Some("0012071024abc"));
        assert_eq!(extract_comic_key("<script></script>"), None);
    }
}
