//! 下载完成后的打包：章节目录 → CBZ → （可选）电子书。

pub mod cbz;
pub mod convert;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::base_system::context::{Config, safe_fs_name};
use crate::base_system::file_cleaner;
use crate::download::page_store::PageStore;
use crate::network_parser::catalog::ComicCatalog;
use convert::{ChapterBook, EbookConverter};

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("zip: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("章节目录为空: {}", .0.display())]
    EmptyChapter(PathBuf),
    #[error("无法启动转换程序 {bin}: {source}")]
    ConverterSpawn {
        bin: String,
        #[source]
        source: io::Error,
    },
    #[error("转换程序退出状态 {status}: {stderr}")]
    Converter { status: String, stderr: String },
}

pub struct Packager {
    zip_cache: PathBuf,
    generated: PathBuf,
    keep_zip_cache: bool,
    converter: Option<EbookConverter>,
}

impl Packager {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            zip_cache: cfg.zip_cache_dir(),
            generated: cfg.generated_dir(),
            keep_zip_cache: cfg.keep_zip_cache,
            converter: cfg
                .enable_ebook_convert
                .then(|| EbookConverter::from_config(cfg)),
        }
    }

    /// 打包一章，返回最终产物路径。
    ///
    /// 不转换电子书时 CBZ 直接写到输出目录，否则先写到 zip 缓存目录再交给转换程序。
    pub fn package_chapter(
        &self,
        catalog: &ComicCatalog,
        comic_root: &Path,
        chapter: u32,
    ) -> Result<PathBuf, PackageError> {
        let store = PageStore::for_chapter(comic_root, chapter);
        let dir = store.chapter_dir();
        let full_name = catalog.full_name();

        let Some(converter) = &self.converter else {
            let out = self.generated.join(format!(
                "{}-{chapter:04}.cbz",
                safe_fs_name(&full_name, "_", 120)
            ));
            let pages = cbz::create_cbz(dir, &out)?;
            info!(target: "package", chapter, pages, "已生成 {}", out.display());
            return Ok(out);
        };

        let cbz_path = self.zip_cache.join(format!("{chapter:04}.cbz"));
        cbz::create_cbz(dir, &cbz_path)?;
        let book = ChapterBook {
            name: &catalog.name,
            author: &catalog.author,
            full_name: &full_name,
            chapter,
        };
        let out = converter.convert(&cbz_path, &self.generated, &book)?;
        info!(target: "package", chapter, "已生成 {}", out.display());
        Ok(out)
    }

    /// 一部漫画处理完后清理 zip 缓存目录。
    pub fn finish_comic(&self) {
        if self.keep_zip_cache || self.converter.is_none() {
            return;
        }
        if let Err(e) = file_cleaner::remove_cache_dir(&self.zip_cache) {
            warn!(target: "package", error = %e, "清理 zip 缓存失败: {}", self.zip_cache.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn catalog() -> ComicCatalog {
        ComicCatalog {
            comic_id: "103".to_string(),
            name: "航海王".to_string(),
            author: "尾田".to_string(),
            category: 6,
            chapters: Vec::new(),
        }
    }

    fn config(base: &Path) -> Config {
        Config {
            generated_path: base.join("generated").to_string_lossy().into_owned(),
            zip_cache_path: base.join("zip_cache").to_string_lossy().into_owned(),
            enable_ebook_convert: false,
            ..Config::default()
        }
    }

    #[test]
    fn writes_cbz_to_output_when_conversion_is_off() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("materials").join("[尾田]航海王");
        let chapter = root.join("0002");
        fs::create_dir_all(&chapter).unwrap();
        fs::write(chapter.join("001.jpg"), b"img").unwrap();

        let packager = Packager::from_config(&config(dir.path()));
        let out = packager.package_chapter(&catalog(), &root, 2).unwrap();
        assert_eq!(
            out,
            dir.path().join("generated").join("[尾田]航海王-0002.cbz")
        );
        assert!(out.is_file());

        packager.finish_comic();
        assert!(!dir.path().join("zip_cache").exists());
    }

    #[test]
    fn failed_conversion_leaves_cache_until_finish() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("comic");
        fs::create_dir_all(root.join("0001")).unwrap();
        fs::write(root.join("0001").join("001.jpg"), b"img").unwrap();

        let mut cfg = config(dir.path());
        cfg.enable_ebook_convert = true;
        cfg.ebook_convert_bin = dir
            .path()
            .join("missing-converter")
            .to_string_lossy()
            .into_owned();
        let packager = Packager::from_config(&cfg);

        let err = packager.package_chapter(&catalog(), &root, 1).unwrap_err();
        assert!(matches!(err, PackageError::ConverterSpawn { .. }));
        assert!(dir.path().join("zip_cache").join("0001.cbz").is_file());

        packager.finish_comic();
        assert!(!dir.path().join("zip_cache").exists());
    }
}
