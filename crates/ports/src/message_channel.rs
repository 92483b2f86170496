//! Message Channel trait 定义

use async_trait::async_trait;
use cuba_errors::AppResult;

/// 消息通道 trait
///
/// 一个进程持有一条长连接；同一 `key` 的消息按发送顺序投递。
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// 幂等声明通道（已存在视为成功）
    async fn declare(&self, channel: &str) -> AppResult<()>;

    /// 发送一条消息，阻塞直到被接受或失败
    async fn send(&self, channel: &str, key: &str, payload: &[u8]) -> AppResult<()>;
}
