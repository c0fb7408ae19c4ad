use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONNECTION, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use tracing::{debug, info, warn};

use super::catalog::{self, ChapterRef, ComicCatalog};
use crate::base_system::context::Config;

const PAGE_RETRIES: usize = 3;

/// 目录页与阅读页的 HTTP 客户端（页面文本，带简单的退避重试）。
pub struct ComicWebNetwork {
    client: Client,
    catalog_base: String,
    show_base: String,
}

impl ComicWebNetwork {
    pub fn new(cfg: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"),
        );
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&cfg.user_agent)
                .unwrap_or(HeaderValue::from_static("Mozilla/5.0")),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(cfg.request_timeout.max(1)))
            .build()
            .context("init web client")?;

        Ok(Self {
            client,
            catalog_base: cfg.catalog_base_url.clone(),
            show_base: cfg.show_base_url.clone(),
        })
    }

    pub fn get_catalog(&self, comic_id: &str) -> Result<ComicCatalog> {
        let url = catalog::catalog_url(&self.catalog_base, comic_id);
        let html = self
            .get_text(&url, None)
            .with_context(|| format!("获取目录页失败: comic_id={comic_id}"))?;
        let parsed = catalog::parse_catalog(&html, comic_id, &self.show_base)
            .with_context(|| format!("解析目录页失败: {url}"))?;
        info!(
            target: "catalog",
            comic_id,
            chapters = parsed.chapters.len(),
            "目录解析完成: {}", parsed.full_name()
        );
        Ok(parsed)
    }

    /// 拉取章节阅读页并取出整部漫画的密钥串。
    pub fn fetch_comic_key(&self, chapter: &ChapterRef, referer: &str) -> Result<String> {
        let html = self
            .get_text(&chapter.url, Some(referer))
            .with_context(|| format!("获取阅读页失败: {}", chapter.url))?;
        catalog::extract_comic_key(&html)
            .ok_or_else(|| anyhow!("阅读页中找不到密钥: {}", chapter.url))
    }

    fn get_text(&self, url: &str, referer: Option<&str>) -> Result<String> {
        let mut last_error = None;
        for attempt in 1..=PAGE_RETRIES {
            debug!(target: "catalog", attempt, url, "请求页面");
            let mut req = self.client.get(url);
            if let Some(r) = referer.and_then(|r| HeaderValue::from_str(r).ok()) {
                req = req.header(REFERER, r);
            }
            match req.send().and_then(|r| r.error_for_status()).and_then(|r| r.text()) {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(target: "catalog", attempt, url, error = %e, "请求页面失败");
                    last_error = Some(e);
                    if attempt < PAGE_RETRIES {
                        std::thread::sleep(Duration::from_millis(600u64 << (attempt - 1)));
                    }
                }
            }
        }
        Err(match last_error {
            Some(e) => anyhow!(e),
            None => anyhow!("request not sent: {url}"),
        })
    }
}
