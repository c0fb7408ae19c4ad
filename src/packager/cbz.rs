//! 章节目录 → CBZ（zip）。

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use zip::CompressionMethod;
use zip::write::FileOptions;

use super::PackageError;

/// 章节目录中的页面文件，跳过以 `.` 开头的文件（包括写入中的临时文件），按文件名排序。
pub fn chapter_pages(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut pages: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| e.path())
        .collect();
    pages.sort();
    Ok(pages)
}

/// 打包整个章节目录，返回写入的页数。
pub fn create_cbz(dir: &Path, out: &Path) -> Result<usize, PackageError> {
    let pages = chapter_pages(dir)?;
    if pages.is_empty() {
        return Err(PackageError::EmptyChapter(dir.to_path_buf()));
    }
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut zip = zip::ZipWriter::new(File::create(out)?);
    // jpg 本身已压缩
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    for page in &pages {
        let name = page
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        zip.start_file(name, options)?;
        let mut src = File::open(page)?;
        io::copy(&mut src, &mut zip)?;
    }
    zip.finish()?;
    Ok(pages.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn packs_pages_in_order_and_skips_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        let chapter = dir.path().join("0001");
        fs::create_dir_all(&chapter).unwrap();
        fs::write(chapter.join("002.jpg"), b"two").unwrap();
        fs::write(chapter.join("001.jpg"), b"one").unwrap();
        fs::write(chapter.join(".tmpAbc"), b"partial").unwrap();
        fs::write(chapter.join(".DS_Store"), b"x").unwrap();

        let out = dir.path().join("cache").join("0001.cbz");
        assert_eq!(create_cbz(&chapter, &out).unwrap(), 2);

        let mut zip = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        assert_eq!(zip.len(), 2);
        assert_eq!(zip.by_index(0).unwrap().name(), "001.jpg");
        let mut body = String::new();
        zip.by_name("002.jpg")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "two");
    }

    #[test]
    fn empty_chapter_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("x.cbz");
        let err = create_cbz(dir.path(), &out).unwrap_err();
        assert!(matches!(err, PackageError::EmptyChapter(_)));
        assert!(!out.exists());
    }
}
