//! ComicVIP 漫画下载器。
//!
//! 按章节下载图片到 `<save_path>/<[作者]书名>/<章节:04>/<页:03>.jpg`，可选打包为 CBZ / 电子书。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置/日志/重试/路径等基础设施
//! - `comic_key`：章节密钥解码与图片地址计算
//! - `download`：单章调度与整部漫画的下载编排
//! - `network_parser`：目录页 / 阅读页的请求与解析
//! - `third_party`：图片下载客户端
//! - `packager`：CBZ 打包与外部电子书转换

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::{error, info, warn};

mod base_system;
mod comic_key;
mod download;
mod network_parser;
mod packager;
mod third_party;

use base_system::comic_id::parse_comic_id;
use base_system::config::load_or_create_with_base;
use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};
use download::downloader::{DownloadRequest, download_comic};
use download::fetch_pool::PageFetcher;
use packager::Packager;
use third_party::media_fetch::HttpPageFetcher;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "comic-vip-downloader")]
#[command(about = "ComicVIP comic downloader")]
struct Cli {
    /// 漫画 ID 或目录页 / 阅读页链接，可以给多个
    comics: Vec<String>,

    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// 从第几话开始（从 1 开始，包含）
    #[arg(long)]
    from: Option<usize>,

    /// 到第几话结束（包含）
    #[arg(long)]
    to: Option<usize>,

    /// 只下载图片，不打包
    #[arg(long, default_value_t = false)]
    no_package: bool,

    /// 显示版本信息后退出
    #[arg(long, default_value_t = false)]
    version: bool,

    /// 数据目录路径（用于存放 config.yml 和 logs 等文件）
    #[arg(long)]
    data_dir: Option<String>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.version {
        println!("ComicVIP Downloader v{}", VERSION);
        return Ok(ExitCode::SUCCESS);
    }

    let data_dir = cli.data_dir.as_deref().map(Path::new);
    let _log = init_logging(cli.debug, data_dir)?;
    info!(target: "startup", "当前版本: v{}", VERSION);

    let mut config =
        load_or_create_with_base::<Config>(data_dir).map_err(|e| anyhow!(e.to_string()))?;
    if cli.no_package {
        config.enable_packaging = false;
    }

    if cli.comics.is_empty() {
        warn!(target: "startup", "没有指定漫画 ID");
        return Ok(ExitCode::from(2));
    }

    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpPageFetcher::new(&config)?);
    let request = DownloadRequest {
        from: cli.from,
        to: cli.to,
    };

    let mut ok = true;
    for input in &cli.comics {
        let Some(comic_id) = parse_comic_id(input) else {
            error!(target: "startup", "无法识别的漫画 ID 或链接: {}", input);
            ok = false;
            continue;
        };
        if let Err(e) = run_comic(&config, &comic_id, request, Arc::clone(&fetcher)) {
            error!(target: "download", comic_id = %comic_id, "下载失败: {:#}", e);
            ok = false;
        }
    }

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// 下载一部漫画并打包完整下载的章节；有章节失败或不完整时返回错误。
fn run_comic(
    config: &Config,
    comic_id: &str,
    request: DownloadRequest,
    fetcher: Arc<dyn PageFetcher>,
) -> Result<()> {
    let download = download_comic(config, comic_id, request, fetcher)?;
    let result = &download.result;

    if config.enable_packaging {
        let packager = Packager::from_config(config);
        for report in &result.completed {
            if let Err(e) = packager.package_chapter(&download.catalog, &download.root, report.chapter)
            {
                error!(target: "package", chapter = report.chapter, "打包失败: {}", e);
            }
        }
        packager.finish_comic();
    }

    if result.has_errors() {
        let failed: Vec<u32> = result.failed.iter().map(|f| f.chapter).collect();
        let incomplete: Vec<u32> = result.incomplete.iter().map(|r| r.chapter).collect();
        return Err(anyhow!(
            "{}: 失败章节 {:?}，未完整章节 {:?}",
            download.catalog.full_name(),
            failed,
            incomplete
        ));
    }
    Ok(())
}

fn init_logging(debug: bool, base_dir: Option<&Path>) -> Result<LogSystem> {
    let opts = LogOptions {
        debug,
        use_color: true,
        archive_on_exit: true,
        console: true,
    };
    LogSystem::init_with_base(opts, base_dir).map_err(|e| anyhow!(e))
}
