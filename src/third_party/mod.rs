//! 与第三方主机直接交互的客户端。

pub mod media_fetch;
