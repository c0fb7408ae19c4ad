use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONNECTION, HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;

use crate::base_system::context::Config;
use crate::download::fetch_pool::PageFetcher;

/// 图片下载客户端，所有页面线程共享同一个连接池。
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(cfg: &Config) -> Result<Self> {
        // reqwest is built without a gzip decoder; ask for identity so the body is the raw image.
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("image/*,*/*;q=0.8"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        if let Ok(ua) = HeaderValue::from_str(&cfg.user_agent) {
            headers.insert(USER_AGENT, ua);
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(cfg.request_timeout.max(1)));
        if cfg.min_connect_timeout > 0.0 {
            builder = builder.connect_timeout(Duration::from_secs_f64(cfg.min_connect_timeout));
        }
        let client = builder.build().context("init image client")?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if url.trim().is_empty() {
            bail!("empty image url");
        }
        let resp = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("GET {url}"))?;
        let resp = resp.error_for_status()?;
        let bytes = resp.bytes().with_context(|| format!("read body of {url}"))?;
        if bytes.is_empty() {
            bail!("empty body from {url}");
        }
        Ok(bytes.to_vec())
    }
}
