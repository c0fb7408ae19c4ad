//! 调用外部转换程序（calibre `ebook-convert`）把 CBZ 转成电子书。

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::PackageError;
use crate::base_system::context::{Config, safe_fs_name};

#[derive(Debug, Clone)]
pub struct EbookConverter {
    pub bin: String,
    pub output_profile: String,
    pub format: String,
    pub right_to_left: bool,
}

/// 一章电子书的元数据。
#[derive(Debug, Clone, Copy)]
pub struct ChapterBook<'a> {
    pub name: &'a str,
    pub author: &'a str,
    pub full_name: &'a str,
    pub chapter: u32,
}

impl EbookConverter {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            bin: cfg.ebook_convert_bin.clone(),
            output_profile: cfg.ebook_output_profile.clone(),
            format: cfg.ebook_format.trim().trim_start_matches('.').to_string(),
            right_to_left: cfg.ebook_right_to_left,
        }
    }

    /// `<out_dir>/<[作者]书名>-<章节:04>.<格式>`
    pub fn output_path(&self, out_dir: &Path, book: &ChapterBook<'_>) -> PathBuf {
        let stem = safe_fs_name(book.full_name, "_", 120);
        out_dir.join(format!("{stem}-{:04}.{}", book.chapter, self.format))
    }

    /// 不经过 shell，书名里的引号等字符原样作为参数传入。
    pub fn command(&self, cbz: &Path, out: &Path, book: &ChapterBook<'_>) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg(cbz).arg(out);
        cmd.args(self.options(book));
        cmd
    }

    fn options(&self, book: &ChapterBook<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--authors".into(),
            book.author.into(),
            "--series".into(),
            book.full_name.into(),
            "--series-index".into(),
            book.chapter.to_string().into(),
            "--output-profile".into(),
            self.output_profile.as_str().into(),
        ];
        if self.right_to_left {
            args.push("--right2left".into());
        }
        args.push("--title".into());
        args.push(format!("{} #{}", book.name, book.chapter).into());
        args
    }

    pub fn convert(
        &self,
        cbz: &Path,
        out_dir: &Path,
        book: &ChapterBook<'_>,
    ) -> Result<PathBuf, PackageError> {
        std::fs::create_dir_all(out_dir)?;
        let out = self.output_path(out_dir, book);
        let mut cmd = self.command(cbz, &out, book);
        debug!(target: "package", ?cmd, "调用转换程序");

        let output = cmd.output().map_err(|source| PackageError::ConverterSpawn {
            bin: self.bin.clone(),
            source,
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PackageError::Converter {
                status: output.status.to_string(),
                stderr: stderr.trim().chars().take(500).collect(),
            });
        }
        Ok(out)
    }
}
