//! 下载流程模块入口。
//!
//! 子模块：
//! - `models`：数据模型（PageState / ChapterReport / DownloadResult / ProgressSnapshot 等）
//! - `page_store`：页面文件布局与原子写入
//! - `fetch_pool`：页面请求线程（每页一个线程或固定数量工作线程）
//! - `scheduler`：单章调度：并发发出请求，按发出顺序有限等待，超时移到队尾
//! - `progress`：进度上报与 CLI 进度条
//! - `downloader`：整部漫画的下载编排

pub mod downloader;
pub mod fetch_pool;
pub mod models;
pub mod page_store;
pub mod progress;
pub mod scheduler;
