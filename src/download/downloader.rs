//! 整部漫画的下载编排：目录 → 逐章取密钥 → 解码 → 调度下载。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, anyhow};
use tracing::{error, info, warn};

use super::fetch_pool::PageFetcher;
use super::models::{ChapterFailure, ChapterRange, ChapterReport, DownloadResult};
use super::scheduler::{FetchScheduler, SchedulerOptions};
use crate::base_system::context::Config;
use crate::comic_key::decode;
use crate::network_parser::catalog::{self, ChapterRef, ComicCatalog};
use crate::network_parser::network::ComicWebNetwork;

/// 目录与章节密钥的来源。
pub trait ComicSource {
    fn catalog(&self, comic_id: &str) -> Result<ComicCatalog>;
    fn comic_key(&self, chapter: &ChapterRef, referer: &str) -> Result<String>;
}

impl ComicSource for ComicWebNetwork {
    fn catalog(&self, comic_id: &str) -> Result<ComicCatalog> {
        self.get_catalog(comic_id)
    }

    fn comic_key(&self, chapter: &ChapterRef, referer: &str) -> Result<String> {
        self.fetch_comic_key(chapter, referer)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DownloadRequest {
    pub from: Option<usize>,
    pub to: Option<usize>,
}

pub struct ComicDownload {
    pub catalog: ComicCatalog,
    /// `<save_path>/<[作者]书名>`
    pub root: PathBuf,
    pub result: DownloadResult,
}

pub struct ComicDownloader<S> {
    source: S,
    config: Config,
    scheduler: FetchScheduler,
}

impl<S: ComicSource> ComicDownloader<S> {
    pub fn new(source: S, config: Config, fetcher: Arc<dyn PageFetcher>) -> Self {
        let scheduler = FetchScheduler::new(fetcher, SchedulerOptions::from_config(&config));
        Self {
            source,
            config,
            scheduler,
        }
    }

    pub fn with_options(mut self, options: SchedulerOptions) -> Self {
        let fetcher = self.scheduler.fetcher();
        self.scheduler = FetchScheduler::new(fetcher, options);
        self
    }

    /// 按顺序下载范围内的每一章。
    ///
    /// 单章的密钥 / 解码 / 地址错误记录到结果里后继续下一章；写盘失败同样只影响当前章。
    pub fn download(&mut self, comic_id: &str, request: DownloadRequest) -> Result<ComicDownload> {
        let start = Instant::now();
        let catalog = self.source.catalog(comic_id)?;
        let total = catalog.chapters.len();
        let range = ChapterRange::from_bounds(request.from, request.to, total).ok_or_else(|| {
            anyhow!(
                "章节范围无效: from={:?} to={:?}，共 {} 章",
                request.from,
                request.to,
                total
            )
        })?;

        let root = self.config.default_save_dir().join(catalog.folder_name());
        let referer = catalog::catalog_url(&self.config.catalog_base_url, comic_id);
        info!(
            target: "download",
            comic_id,
            start = range.start,
            end = range.end,
            "开始下载：{} ({} 章)", catalog.full_name(), range.end - range.start + 1
        );

        let mut result = DownloadResult::default();
        for chapter in catalog
            .chapters
            .iter()
            .filter(|c| range.contains(c.index as usize))
        {
            match self.download_chapter(comic_id, chapter, &referer, &root) {
                Ok(report) if report.is_complete() => result.completed.push(report),
                Ok(report) => {
                    warn!(
                        target: "download",
                        chapter = chapter.index,
                        abandoned = ?report.abandoned,
                        "第 {} 话未完整下载", chapter.index
                    );
                    result.incomplete.push(report);
                }
                Err(e) => {
                    error!(target: "download", chapter = chapter.index, ch = %chapter.number, "第 {} 话下载失败: {:#}", chapter.index, e);
                    result.failed.push(ChapterFailure {
                        chapter: chapter.index,
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        info!(
            target: "download",
            completed = result.completed.len(),
            incomplete = result.incomplete.len(),
            failed = result.failed.len(),
            pages = result.pages_written(),
            "下载完成：{}，用时 {:.1}s", catalog.full_name(), start.elapsed().as_secs_f32()
        );
        Ok(ComicDownload {
            catalog,
            root,
            result,
        })
    }

    fn download_chapter(
        &mut self,
        comic_id: &str,
        chapter: &ChapterRef,
        referer: &str,
        root: &Path,
    ) -> Result<ChapterReport> {
        let key = self.source.comic_key(chapter, referer)?;
        let subkey = decode(&key, chapter.index)?;
        let report = self
            .scheduler
            .run_chapter(&subkey, comic_id, chapter.index, root)?;
        Ok(report)
    }
}

/// 使用真实网络下载一部漫画。
pub fn download_comic(
    config: &Config,
    comic_id: &str,
    request: DownloadRequest,
    fetcher: Arc<dyn PageFetcher>,
) -> Result<ComicDownload> {
    let network = ComicWebNetwork::new(config)?;
    ComicDownloader::new(network, config.clone(), fetcher).download(comic_id, request)
}
