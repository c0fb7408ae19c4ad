//! 单章调度：跳过已存在的页，所有剩余页同时发出请求，再按发出顺序逐个有限等待。
//!
//! 等待超时或失败的页移到队尾，请求本身不取消也不重发；之后对该页的等待看到的
//! 仍是同一个请求的结果。一个失败的请求会一直返回同一个失败，是否放弃由
//! [`RetryPolicy`] 决定（默认不放弃）。

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::fetch_pool::{FetchOutcome, FetchPool, PageFetcher};
use super::models::{ChapterReport, PageState};
use super::page_store::{self, PageStore};
use super::progress::{ProgressCallback, ProgressReporter};
use crate::base_system::context::Config;
use crate::base_system::cooldown_retry::RetryPolicy;
use crate::comic_key::{DecodeError, ResolveError, Subkey, page_count, resolve_url};

#[derive(Debug, Error)]
pub enum ChapterError {
    #[error("chapter {chapter}: {source}")]
    Decode {
        chapter: u32,
        #[source]
        source: DecodeError,
    },
    #[error("chapter {chapter} page {page}: {source}")]
    Resolve {
        chapter: u32,
        page: u32,
        #[source]
        source: ResolveError,
    },
    #[error("chapter {chapter}: page count is zero")]
    NoPages { chapter: u32 },
    #[error("write {}: {source}", .path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    pub wait_timeout: Duration,
    /// `None`：每页一个线程。
    pub workers: Option<usize>,
    pub retry: RetryPolicy,
    pub show_progress: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(10),
            workers: None,
            retry: RetryPolicy::default(),
            show_progress: false,
        }
    }
}

impl SchedulerOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            wait_timeout: cfg.page_wait(),
            workers: cfg.worker_limit(),
            retry: RetryPolicy::from_config(cfg),
            show_progress: true,
        }
    }
}

enum WaitError {
    Timeout,
    Failure(String),
}

struct PageTask {
    page: u32,
    path: PathBuf,
    state: PageState,
    rx: Receiver<FetchOutcome>,
    failure: Option<String>,
    waits: u32,
}

impl PageTask {
    fn issue(pool: &FetchPool, page: u32, path: PathBuf, url: String) -> Self {
        debug!(target: "scheduler", page, %url, "发出页面请求");
        Self {
            page,
            path,
            state: PageState::InFlight,
            rx: pool.submit(page, url),
            failure: None,
            waits: 0,
        }
    }

    /// 默认策略下一个永久失败的页面会无限重排，计数到上限后停住。
    fn note_failed_wait(&mut self, report: &mut ChapterReport) {
        self.waits = self.waits.saturating_add(1);
        report.requeued = report.requeued.saturating_add(1);
    }

    fn wait(&mut self, timeout: Duration) -> Result<Vec<u8>, WaitError> {
        self.state = PageState::InFlight;
        if let Some(msg) = &self.failure {
            self.state = PageState::TimedOut;
            return Err(WaitError::Failure(msg.clone()));
        }
        let outcome = match self.rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => {
                self.state = PageState::TimedOut;
                return Err(WaitError::Timeout);
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err("fetch worker exited without a result".to_string())
            }
        };
        match outcome {
            Ok(bytes) => {
                self.state = PageState::Completed;
                Ok(bytes)
            }
            Err(msg) => {
                self.state = PageState::TimedOut;
                self.failure = Some(msg.clone());
                Err(WaitError::Failure(msg))
            }
        }
    }
}

pub struct FetchScheduler {
    fetcher: Arc<dyn PageFetcher>,
    options: SchedulerOptions,
    progress: Option<ProgressCallback>,
}

impl FetchScheduler {
    pub fn new(fetcher: Arc<dyn PageFetcher>, options: SchedulerOptions) -> Self {
        Self {
            fetcher,
            options,
            progress: None,
        }
    }

    pub fn with_progress(mut self, cb: ProgressCallback) -> Self {
        self.progress = Some(cb);
        self
    }

    pub fn fetcher(&self) -> Arc<dyn PageFetcher> {
        Arc::clone(&self.fetcher)
    }

    /// 下载一章的全部页面到 `<comic_root>/<chapter:04>/`，队列清空后才返回。
    ///
    /// 页数或地址无法解析时在发出任何请求之前返回错误；写盘失败会中止本章。
    pub fn run_chapter(
        &mut self,
        subkey: &Subkey,
        comic_id: &str,
        chapter: u32,
        comic_root: &Path,
    ) -> Result<ChapterReport, ChapterError> {
        let started = Instant::now();
        let pages =
            page_count(subkey).map_err(|source| ChapterError::Decode { chapter, source })?;
        if pages == 0 {
            return Err(ChapterError::NoPages { chapter });
        }
        if subkey.is_fallback() {
            warn!(target: "scheduler", chapter, "未找到本章密钥块，使用末尾块的数字作为密钥，地址可能无效");
        }

        let store = PageStore::for_chapter(comic_root, chapter);
        let mut report = ChapterReport {
            chapter,
            page_count: pages,
            ..Default::default()
        };

        let mut planned = Vec::new();
        for page in 1..=pages {
            let path = store.page_path(page);
            if page_store::exists(&path) {
                report.skipped += 1;
                continue;
            }
            let url = resolve_url(subkey, comic_id, page).map_err(|source| {
                ChapterError::Resolve {
                    chapter,
                    page,
                    source,
                }
            })?;
            planned.push((page, path, url));
        }

        if planned.is_empty() {
            info!(target: "scheduler", chapter, pages, "本章已全部下载，跳过");
            report.elapsed = started.elapsed();
            return Ok(report);
        }
        info!(
            target: "scheduler",
            chapter,
            pages,
            skipped = report.skipped,
            pending = planned.len(),
            "开始下载第 {} 话", chapter
        );

        let mut progress = ProgressReporter::new(
            chapter,
            pages,
            report.skipped,
            self.progress.take(),
            self.options.show_progress,
        );
        let pool = FetchPool::new(Arc::clone(&self.fetcher), self.options.workers);
        let mut queue: VecDeque<PageTask> = planned
            .into_iter()
            .map(|(page, path, url)| PageTask::issue(&pool, page, path, url))
            .collect();

        let drained = self.drain(&mut queue, &mut report, &mut progress);
        self.progress = progress.finish();
        drained?;

        // 放弃的页面可能仍在下载，不等待它们
        if report.abandoned.is_empty() {
            pool.shutdown();
        }

        report.abandoned.sort_unstable();
        report.elapsed = started.elapsed();
        info!(
            target: "scheduler",
            chapter,
            written = report.written,
            requeued = report.requeued,
            abandoned = report.abandoned.len(),
            "第 {} 话完成，用时 {:.1}s", chapter, report.elapsed.as_secs_f32()
        );
        Ok(report)
    }

    fn drain(
        &self,
        queue: &mut VecDeque<PageTask>,
        report: &mut ChapterReport,
        progress: &mut ProgressReporter,
    ) -> Result<(), ChapterError> {
        let retry = self.options.retry;
        while let Some(mut task) = queue.pop_front() {
            let first_failure = task.failure.is_none();
            match task.wait(self.options.wait_timeout) {
                Ok(bytes) => {
                    page_store::write(&task.path, &bytes).map_err(|source| {
                        ChapterError::Store {
                            path: task.path.clone(),
                            source,
                        }
                    })?;
                    report.written += 1;
                    progress.inc_done();
                }
                Err(err) => {
                    task.note_failed_wait(report);
                    match &err {
                        WaitError::Timeout => {
                            debug!(target: "scheduler", page = task.page, waits = task.waits, "等待超时，移到队尾");
                        }
                        WaitError::Failure(msg) if first_failure => {
                            warn!(target: "scheduler", page = task.page, error = %msg, "页面下载失败");
                        }
                        WaitError::Failure(_) => {}
                    }

                    if retry.exhausted(task.waits) {
                        warn!(target: "scheduler", page = task.page, waits = task.waits, "达到等待上限，放弃该页");
                        report.abandoned.push(task.page);
                        continue;
                    }
                    retry.cooldown();
                    task.state = PageState::Pending;
                    queue.push_back(task);
                    progress.inc_requeued();
                }
            }
        }
        Ok(())
    }
}
