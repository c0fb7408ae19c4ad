//! 全局配置结构（Config）与默认值。
//!
//! 该模块同时提供生成 `config.yml` 的字段元信息。

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigSpec, FieldMeta};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 路径配置
    #[serde(default = "default_save_path")]
    pub save_path: String,
    #[serde(default = "default_generated_path")]
    pub generated_path: String,
    #[serde(default = "default_zip_cache_path")]
    pub zip_cache_path: String,

    // 网络配置
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_min_connect_timeout")]
    pub min_connect_timeout: f64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_catalog_base_url")]
    pub catalog_base_url: String,
    #[serde(default = "default_show_base_url")]
    pub show_base_url: String,

    // 调度配置
    #[serde(default = "default_page_wait_timeout")]
    pub page_wait_timeout: u64,
    #[serde(default)]
    pub max_workers: usize,
    #[serde(default)]
    pub max_page_waits: u32,
    #[serde(default)]
    pub retry_backoff_ms: u64,

    // 打包配置
    #[serde(default = "default_true")]
    pub enable_packaging: bool,
    #[serde(default = "default_true")]
    pub enable_ebook_convert: bool,
    #[serde(default = "default_ebook_convert_bin")]
    pub ebook_convert_bin: String,
    #[serde(default = "default_ebook_output_profile")]
    pub ebook_output_profile: String,
    #[serde(default = "default_ebook_format")]
    pub ebook_format: String,
    #[serde(default = "default_true")]
    pub ebook_right_to_left: bool,
    #[serde(default = "default_false")]
    pub keep_zip_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            save_path: default_save_path(),
            generated_path: default_generated_path(),
            zip_cache_path: default_zip_cache_path(),
            request_timeout: default_request_timeout(),
            min_connect_timeout: default_min_connect_timeout(),
            user_agent: default_user_agent(),
            catalog_base_url: default_catalog_base_url(),
            show_base_url: default_show_base_url(),
            page_wait_timeout: default_page_wait_timeout(),
            max_workers: 0,
            max_page_waits: 0,
            retry_backoff_ms: 0,
            enable_packaging: default_true(),
            enable_ebook_convert: default_true(),
            ebook_convert_bin: default_ebook_convert_bin(),
            ebook_output_profile: default_ebook_output_profile(),
            ebook_format: default_ebook_format(),
            ebook_right_to_left: default_true(),
            keep_zip_cache: default_false(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 19] = [
            FieldMeta {
                name: "save_path",
                description: "漫画图片保存目录（每部漫画一个 [作者]书名 子目录）",
            },
            FieldMeta {
                name: "generated_path",
                description: "电子书输出目录",
            },
            FieldMeta {
                name: "zip_cache_path",
                description: "CBZ 临时目录",
            },
            FieldMeta {
                name: "request_timeout",
                description: "单次 HTTP 请求超时时间（秒）",
            },
            FieldMeta {
                name: "min_connect_timeout",
                description: "连接超时时间（秒），0 表示使用默认值",
            },
            FieldMeta {
                name: "user_agent",
                description: "请求使用的 User-Agent",
            },
            FieldMeta {
                name: "catalog_base_url",
                description: "漫画目录页地址前缀",
            },
            FieldMeta {
                name: "show_base_url",
                description: "章节阅读页地址前缀",
            },
            FieldMeta {
                name: "page_wait_timeout",
                description: "轮询单页结果的最长等待时间（秒），超时后该页移到队尾",
            },
            FieldMeta {
                name: "max_workers",
                description: "同时下载的最大页数，0 表示每页一个线程（不限制）",
            },
            FieldMeta {
                name: "max_page_waits",
                description: "单页最多等待失败次数，0 表示不限制（永久失败的页面会一直重试）",
            },
            FieldMeta {
                name: "retry_backoff_ms",
                description: "单页重新排队前的冷却时间（毫秒）",
            },
            FieldMeta {
                name: "enable_packaging",
                description: "下载完成后是否打包为 CBZ",
            },
            FieldMeta {
                name: "enable_ebook_convert",
                description: "是否调用外部转换程序生成电子书",
            },
            FieldMeta {
                name: "ebook_convert_bin",
                description: "电子书转换程序路径（calibre 的 ebook-convert）",
            },
            FieldMeta {
                name: "ebook_output_profile",
                description: "转换输出设备配置",
            },
            FieldMeta {
                name: "ebook_format",
                description: "电子书格式, 例如: [mobi, epub, azw3]",
            },
            FieldMeta {
                name: "ebook_right_to_left",
                description: "是否按从右到左的阅读顺序排版",
            },
            FieldMeta {
                name: "keep_zip_cache",
                description: "转换完成后是否保留 CBZ 临时目录",
            },
        ];
        &FIELDS
    }
}

impl Config {
    pub fn default_save_dir(&self) -> PathBuf {
        if self.save_path.trim().is_empty() {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        } else {
            PathBuf::from(&self.save_path)
        }
    }

    pub fn generated_dir(&self) -> PathBuf {
        PathBuf::from(self.generated_path.trim())
    }

    pub fn zip_cache_dir(&self) -> PathBuf {
        PathBuf::from(self.zip_cache_path.trim())
    }

    pub fn page_wait(&self) -> Duration {
        Duration::from_secs(self.page_wait_timeout.max(1))
    }

    /// `None` 表示不限制并发（每页一个线程）。
    pub fn worker_limit(&self) -> Option<usize> {
        match self.max_workers {
            0 => None,
            n => Some(n),
        }
    }
}

pub fn safe_fs_name(name: &str, replacement: &str, max_len: usize) -> String {
    let mut cleaned: String = name
        .chars()
        .map(|ch| match ch {
            ':' => '：',
            '"' => '＂',
            '<' => '《',
            '>' => '》',
            '/' | '\\' => '、',
            '|' => '｜',
            '?' => '？',
            '*' => '＊',
            c if (c as u32) < 32 => replacement.chars().next().unwrap_or('_'),
            _ => ch,
        })
        .collect();

    cleaned = cleaned.trim().to_string();
    while cleaned.ends_with('.') {
        cleaned.pop();
    }

    if cleaned.is_empty() {
        cleaned.push_str("unnamed");
    }

    if cleaned.len() > max_len {
        // 避免在多字节 UTF-8 字符中间截断导致 panic
        let mut end = max_len;
        while !cleaned.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        cleaned.truncate(end);
        while cleaned.ends_with(' ') || cleaned.ends_with('.') {
            cleaned.pop();
        }
        if cleaned.is_empty() {
            cleaned.push_str("unnamed");
        }
    }

    cleaned
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_save_path() -> String {
    "materials".to_string()
}

fn default_generated_path() -> String {
    "generated".to_string()
}

fn default_zip_cache_path() -> String {
    "zip_cache".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_min_connect_timeout() -> f64 {
    0.0
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36".to_string()
}

fn default_catalog_base_url() -> String {
    "http://www.comicvip.com/html/".to_string()
}

fn default_show_base_url() -> String {
    "http://new.comicvip.com/show/".to_string()
}

fn default_page_wait_timeout() -> u64 {
    10
}

fn default_ebook_convert_bin() -> String {
    "ebook-convert".to_string()
}

fn default_ebook_output_profile() -> String {
    "kindle_pw".to_string()
}

fn default_ebook_format() -> String {
    "mobi".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_fs_name_replaces_forbidden_chars() {
        assert_eq!(safe_fs_name("a/b:c", "_", 120), "a、b：c");
        assert_eq!(safe_fs_name("  . ", "_", 120), "unnamed");
        assert_eq!(safe_fs_name("title.", "_", 120), "title");
    }

    #[test]
    fn safe_fs_name_truncates_on_char_boundary() {
        let s = safe_fs_name("漫画漫画", "_", 7);
        assert_eq!(s, "漫画");
    }

    #[test]
    fn field_table_covers_every_key() {
        let value = serde_yaml::to_value(Config::default()).unwrap();
        let map = value.as_mapping().unwrap();
        assert_eq!(map.len(), Config::fields().len());
        for field in Config::fields() {
            assert!(map.contains_key(serde_yaml::Value::String(field.name.to_string())));
        }
    }

    #[test]
    fn worker_limit_zero_is_unbounded() {
        let mut cfg = Config::default();
        assert_eq!(cfg.worker_limit(), None);
        cfg.max_workers = 4;
        assert_eq!(cfg.worker_limit(), Some(4));
        assert_eq!(cfg.page_wait(), Duration::from_secs(10));
    }
}
