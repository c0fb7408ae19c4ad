//! 目录页 / 阅读页的拉取与解析（密钥串的来源）。

pub mod catalog;
pub mod network;
