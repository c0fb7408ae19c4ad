//! 页面文件存储：`<comic_root>/<章节:04>/<页码:03>.jpg`。

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

#[derive(Debug, Clone)]
pub struct PageStore {
    chapter_dir: PathBuf,
}

impl PageStore {
    pub fn for_chapter(comic_root: &Path, chapter: u32) -> Self {
        Self {
            chapter_dir: comic_root.join(chapter_dir_name(chapter)),
        }
    }

    pub fn chapter_dir(&self) -> &Path {
        &self.chapter_dir
    }

    pub fn page_path(&self, page: u32) -> PathBuf {
        self.chapter_dir.join(page_file_name(page))
    }
}

pub fn chapter_dir_name(chapter: u32) -> String {
    format!("{chapter:04}")
}

pub fn page_file_name(page: u32) -> String {
    format!("{page:03}.jpg")
}

pub fn exists(path: &Path) -> bool {
    path.is_file()
}

/// 先写入同目录下的临时文件（以 `.` 开头），完成后再 rename 到目标路径，
/// 目标路径上不会出现写了一半的文件。
pub fn write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_zero_padded() {
        let store = PageStore::for_chapter(Path::new("/comics/[a]b"), 7);
        assert_eq!(store.chapter_dir(), Path::new("/comics/[a]b/0007"));
        assert_eq!(store.page_path(3), Path::new("/comics/[a]b/0007/003.jpg"));
        assert_eq!(store.page_path(120), Path::new("/comics/[a]b/0007/120.jpg"));
    }

    #[test]
    fn write_creates_parents_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::for_chapter(dir.path(), 1);
        let path = store.page_path(1);
        assert!(!exists(&path));

        write(&path, b"\xff\xd8jpeg").unwrap();
        assert!(exists(&path));
        assert_eq!(fs::read(&path).unwrap(), b"\xff\xd8jpeg");

        let names: Vec<_> = fs::read_dir(store.chapter_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("001.jpg")]);
    }

    #[test]
    fn write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0001").join("002.jpg");
        write(&path, b"old").unwrap();
        write(&path, b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn directory_is_not_a_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("001.jpg");
        fs::create_dir_all(&path).unwrap();
        assert!(!exists(&path));
    }
}
