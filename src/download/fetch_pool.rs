//! 页面并发下载工作池。
//!
//! 每次 `submit` 立即返回一个只会收到一次结果的通道。默认每页一个线程；
//! 设置了上限时改为固定数量的工作线程共享一个任务队列。已发出的请求不会被取消。

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel as channel;
use tracing::{debug, warn};

/// 下载单页图片的能力。测试中可替换为确定性的假实现。
pub trait PageFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

impl<F> PageFetcher for F
where
    F: Fn(&str) -> anyhow::Result<Vec<u8>> + Send + Sync + 'static,
{
    fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        self(url)
    }
}

/// 失败原因只保留文本，便于在重复等待时原样返回。
pub(crate) type FetchOutcome = Result<Vec<u8>, String>;

pub(crate) struct PageJob {
    page: u32,
    url: String,
    reply: channel::Sender<FetchOutcome>,
}

impl PageJob {
    fn run(self, fetcher: &dyn PageFetcher) {
        let outcome = fetcher.fetch(&self.url).map_err(|e| format!("{e:#}"));
        if let Err(err) = &outcome {
            debug!(target: "scheduler", page = self.page, error = %err, "页面请求失败");
        }
        // 接收端可能已放弃该页
        let _ = self.reply.send(outcome);
    }
}

pub(crate) enum FetchPool {
    PerPage {
        fetcher: Arc<dyn PageFetcher>,
    },
    Workers {
        tx: Option<channel::Sender<PageJob>>,
        handles: Vec<JoinHandle<()>>,
    },
}

impl FetchPool {
    pub(crate) fn new(fetcher: Arc<dyn PageFetcher>, workers: Option<usize>) -> Self {
        let Some(workers) = workers else {
            return Self::PerPage { fetcher };
        };

        let workers = workers.max(1);
        let (tx, rx) = channel::unbounded::<PageJob>();
        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx = rx.clone();
            let fetcher = Arc::clone(&fetcher);
            let spawned = thread::Builder::new()
                .name(format!("page-worker-{idx}"))
                .spawn(move || {
                    for job in rx.iter() {
                        job.run(fetcher.as_ref());
                    }
                });
            match spawned {
                Ok(h) => handles.push(h),
                Err(err) => warn!(target: "scheduler", error = %err, "创建下载线程失败"),
            }
        }

        Self::Workers {
            tx: Some(tx),
            handles,
        }
    }

    /// 发出一页的请求。线程创建失败时发送端随任务一起被丢弃，
    /// 接收端会得到 `Disconnected`，由调度器按失败处理。
    pub(crate) fn submit(&self, page: u32, url: String) -> channel::Receiver<FetchOutcome> {
        let (reply, rx) = channel::bounded(1);
        let job = PageJob { page, url, reply };

        match self {
            Self::PerPage { fetcher } => {
                let fetcher = Arc::clone(fetcher);
                let spawned = thread::Builder::new()
                    .name(format!("page-{page:03}"))
                    .spawn(move || job.run(fetcher.as_ref()));
                if let Err(err) = spawned {
                    warn!(target: "scheduler", page, error = %err, "创建下载线程失败");
                }
            }
            Self::Workers { tx, .. } => {
                if let Some(tx) = tx {
                    let _ = tx.send(job);
                }
            }
        }
        rx
    }

    /// 关闭任务队列并等待工作线程退出；只应在所有已提交的任务都有结果后调用。
    pub(crate) fn shutdown(self) {
        if let Self::Workers { mut tx, handles } = self {
            tx.take();
            for h in handles {
                let _ = h.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn per_page_pool_returns_each_result() {
        let fetcher: Arc<dyn PageFetcher> =
            Arc::new(|url: &str| Ok::<_, anyhow::Error>(url.as_bytes().to_vec()));
        let pool = FetchPool::new(fetcher, None);
        let rx1 = pool.submit(1, "a".to_string());
        let rx2 = pool.submit(2, "b".to_string());
        assert_eq!(rx2.recv().unwrap().unwrap(), b"b");
        assert_eq!(rx1.recv().unwrap().unwrap(), b"a");
        pool.shutdown();
    }

    #[test]
    fn bounded_pool_never_exceeds_limit() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
        let fetcher: Arc<dyn PageFetcher> = Arc::new(move |_: &str| {
            let now = a.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            a.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(vec![1])
        });

        let pool = FetchPool::new(fetcher, Some(2));
        let receivers: Vec<_> = (1..=6).map(|p| pool.submit(p, String::new())).collect();
        for rx in receivers {
            assert!(rx.recv().unwrap().is_ok());
        }
        pool.shutdown();
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn failures_are_reported_as_text() {
        let fetcher: Arc<dyn PageFetcher> =
            Arc::new(|_: &str| Err::<Vec<u8>, _>(anyhow::anyhow!("HTTP 403")));
        let pool = FetchPool::new(fetcher, None);
        let rx = pool.submit(1, "u".to_string());
        assert_eq!(rx.recv().unwrap().unwrap_err(), "HTTP 403");
    }
}
