//! 下载相关的数据模型定义。
//!
//! 包含页面任务状态、单章结果、整部漫画结果、章节范围、进度快照等。

use std::time::Duration;

/// 单页任务的生命周期：`Pending → InFlight → {Completed | TimedOut}`，
/// `TimedOut` 会回到 `Pending` 并排到队尾。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Pending,
    InFlight,
    Completed,
    TimedOut,
}

/// 一章下载结束后的统计。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterReport {
    pub chapter: u32,
    pub page_count: u32,
    /// 已存在于磁盘、未发起请求的页。
    pub skipped: u32,
    pub written: u32,
    /// 所有页面的等待失败次数之和。
    pub requeued: u32,
    /// 达到重试上限后放弃的页码（默认策略下永远为空）。
    pub abandoned: Vec<u32>,
    pub elapsed: Duration,
}

impl ChapterReport {
    pub fn is_complete(&self) -> bool {
        self.abandoned.is_empty() && self.skipped + self.written == self.page_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterFailure {
    pub chapter: u32,
    pub reason: String,
}

#[derive(Debug, Default, Clone)]
pub struct DownloadResult {
    pub completed: Vec<ChapterReport>,
    pub incomplete: Vec<ChapterReport>,
    pub failed: Vec<ChapterFailure>,
}

impl DownloadResult {
    pub fn pages_written(&self) -> u32 {
        self.completed
            .iter()
            .chain(self.incomplete.iter())
            .map(|r| r.written)
            .sum()
    }

    pub fn has_errors(&self) -> bool {
        !self.failed.is_empty() || !self.incomplete.is_empty()
    }
}

/// 章节范围（从 1 开始，闭区间）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterRange {
    pub start: usize,
    pub end: usize,
}

impl ChapterRange {
    pub fn from_bounds(from: Option<usize>, to: Option<usize>, total: usize) -> Option<Self> {
        if total == 0 {
            return None;
        }
        let start = from.unwrap_or(1).max(1);
        let end = to.unwrap_or(total).min(total);
        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, chapter: usize) -> bool {
        (self.start..=self.end).contains(&chapter)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub chapter: u32,
    pub pages_done: u32,
    pub pages_total: u32,
    pub requeued: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_clamped_to_catalog() {
        assert_eq!(
            ChapterRange::from_bounds(None, None, 5),
            Some(ChapterRange { start: 1, end: 5 })
        );
        assert_eq!(
            ChapterRange::from_bounds(Some(0), Some(9), 5),
            Some(ChapterRange { start: 1, end: 5 })
        );
        assert_eq!(ChapterRange::from_bounds(Some(4), Some(2), 5), None);
        assert_eq!(ChapterRange::from_bounds(None, None, 0), None);
        assert!(ChapterRange { start: 2, end: 3 }.contains(3));
        assert!(!ChapterRange { start: 2, end: 3 }.contains(1));
    }

    #[test]
    fn report_completeness() {
        let mut r = ChapterReport {
            chapter: 1,
            page_count: 4,
            skipped: 1,
            written: 3,
            ..Default::default()
        };
        assert!(r.is_complete());
        r.abandoned.push(2);
        assert!(!r.is_complete());
    }
}
