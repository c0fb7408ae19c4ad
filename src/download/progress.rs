//! 进度上报与 CLI 进度条管理。

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::models::ProgressSnapshot;

pub type ProgressCallback = Box<dyn FnMut(ProgressSnapshot) + Send>;

pub(crate) struct ProgressReporter {
    pub(crate) snapshot: ProgressSnapshot,
    cb: Option<ProgressCallback>,
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    /// 有回调时只走回调；否则在 stderr 上画一个进度条（`show_bar` 为 false 时不画）。
    pub(crate) fn new(
        chapter: u32,
        pages_total: u32,
        already_done: u32,
        cb: Option<ProgressCallback>,
        show_bar: bool,
    ) -> Self {
        let bar = (cb.is_none() && show_bar && already_done < pages_total).then(|| {
            let style = ProgressStyle::with_template(
                "{prefix} [{elapsed_precise}] {wide_bar} {pos}/{len} ({msg})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
            let bar = ProgressBar::with_draw_target(
                Some(u64::from(pages_total)),
                ProgressDrawTarget::stderr(),
            );
            bar.set_style(style);
            bar.set_prefix(format!("第 {chapter} 话"));
            bar.set_position(u64::from(already_done));
            bar
        });

        let mut reporter = Self {
            snapshot: ProgressSnapshot {
                chapter,
                pages_done: already_done,
                pages_total,
                requeued: 0,
            },
            cb,
            bar,
        };
        reporter.emit();
        reporter
    }

    fn emit(&mut self) {
        if let Some(cb) = self.cb.as_mut() {
            cb(self.snapshot);
        }
    }

    pub(crate) fn inc_done(&mut self) {
        self.snapshot.pages_done = (self.snapshot.pages_done + 1).min(self.snapshot.pages_total);
        if let Some(bar) = self.bar.as_ref() {
            bar.inc(1);
        }
        self.emit();
    }

    pub(crate) fn inc_requeued(&mut self) {
        self.snapshot.requeued = self.snapshot.requeued.saturating_add(1);
        if let Some(bar) = self.bar.as_ref() {
            bar.set_message(format!("重排 {}", self.snapshot.requeued));
        }
        self.emit();
    }

    pub(crate) fn finish(mut self) -> Option<ProgressCallback> {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        self.cb.take()
    }
}
