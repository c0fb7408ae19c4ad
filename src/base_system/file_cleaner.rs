//! 缓存与临时文件清理。

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

/// 删除整个缓存目录，目录不存在时视为成功。
pub fn remove_cache_dir(path: impl AsRef<Path>) -> io::Result<()> {
    let path = path.as_ref();
    match fs::remove_dir_all(path) {
        Ok(()) => {
            debug!(target: "cleanup", path = %path.display(), "已清理缓存目录");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            warn!(target: "cleanup", path = %path.display(), error = %err, "清理缓存目录失败");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_existing_and_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("zip_cache");
        fs::create_dir_all(&cache).unwrap();
        fs::write(cache.join("0001.cbz"), b"x").unwrap();

        remove_cache_dir(&cache).unwrap();
        assert!(!cache.exists());
        remove_cache_dir(&cache).unwrap();
    }
}
