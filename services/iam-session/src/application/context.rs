//! 请求上下文

use std::future::Future;
use std::time::Duration;

use cuba_errors::{AppError, AppResult};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 请求级取消与截止时间
///
/// 每个步骤的 I/O 都在 [`RequestContext::run`] 中执行，上下文结束时
/// 正在等待的步骤立即返回 `Cancelled`，已提交的步骤不回滚。
#[derive(Debug, Clone)]
pub struct RequestContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// 永不结束的上下文
    pub fn background() -> Self {
        Self::new(CancellationToken::new())
    }

    pub fn new(cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            deadline: None,
        }
    }

    /// 从父令牌派生，父令牌取消时一并结束
    pub fn child_of(parent: &CancellationToken) -> Self {
        Self::new(parent.child_token())
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_done(&self) -> bool {
        self.cancellation.is_cancelled()
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// 在上下文约束下执行一个步骤
    pub async fn run<T, F>(&self, step: &str, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        if self.cancellation.is_cancelled() {
            return Err(AppError::cancelled(format!("{} not started: request cancelled", step)));
        }

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => {
                Err(AppError::cancelled(format!("{} aborted: request cancelled", step)))
            }
            _ = deadline => {
                Err(AppError::cancelled(format!("{} aborted: deadline exceeded", step)))
            }
            result = fut => result,
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_passes_result_through() {
        let ctx = RequestContext::background();
        let value = ctx.run("step", async { Ok::<_, AppError>(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert!(!ctx.is_done());
    }

    #[tokio::test]
    async fn test_cancelled_context_rejects_step() {
        let ctx = RequestContext::background();
        ctx.cancellation().cancel();

        let err = ctx.run("step", async { Ok::<_, AppError>(()) }).await.unwrap_err();
        assert!(matches!(err, AppError::Cancelled(_)));
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn test_deadline_aborts_slow_step() {
        let ctx = RequestContext::background().with_timeout(Duration::from_millis(20));

        let err = ctx
            .run("slow", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, AppError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Cancelled(_)));
    }

    #[tokio::test]
    async fn test_child_follows_parent() {
        let parent = CancellationToken::new();
        let ctx = RequestContext::child_of(&parent);
        assert!(!ctx.is_done());
        parent.cancel();
        assert!(ctx.is_done());
    }
}
