//! 服务器启动/运行错误
//!
//! 请求级错误统一使用 [`AppError`]；这里只覆盖进程生命周期中的失败。

use crate::utils::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("初始化失败: {0}")]
    Init(#[from] AppError),

    #[error("监听端口失败: {0}")]
    Bind(std::io::Error),

    #[error("HTTP 服务异常退出: {0}")]
    Serve(std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
