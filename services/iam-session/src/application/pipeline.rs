//! 有序步骤流水线
//!
//! 必需步骤失败时中止整个流程；尽力而为步骤失败只记录，结果通过
//! `degraded` 返回给调用方。

use std::future::Future;

use cuba_errors::AppResult;
use serde::Serialize;
use tracing::warn;

use super::RequestContext;
use crate::infrastructure::observability::metrics;

/// 尽力而为步骤的未完成状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StepStatus {
    /// 执行失败或执行中被中止
    Failed(String),
    /// 上下文已结束，未执行
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: &'static str,
    pub status: StepStatus,
}

pub struct PipelineRun<'a> {
    operation: &'static str,
    ctx: &'a RequestContext,
    degraded: Vec<StepFailure>,
}

impl<'a> PipelineRun<'a> {
    pub fn new(operation: &'static str, ctx: &'a RequestContext) -> Self {
        Self {
            operation,
            ctx,
            degraded: Vec::new(),
        }
    }

    /// 必需步骤：错误原样返回
    pub async fn required<T, F>(&mut self, step: &'static str, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        self.ctx.run(step, fut).await
    }

    /// 尽力而为步骤：错误被记录，不影响流程
    pub async fn best_effort<F>(&mut self, step: &'static str, fut: F)
    where
        F: Future<Output = AppResult<()>>,
    {
        let status = if self.ctx.is_done() {
            StepStatus::Skipped
        } else {
            match self.ctx.run(step, fut).await {
                Ok(()) => return,
                Err(e) => StepStatus::Failed(e.to_string()),
            }
        };

        warn!(
            operation = self.operation,
            step = step,
            status = ?status,
            "Best-effort step did not complete"
        );
        metrics::record_best_effort_failure(self.operation, step);
        self.degraded.push(StepFailure { step, status });
    }

    pub fn finish(self) -> Vec<StepFailure> {
        self.degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuba_errors::AppError;

    #[tokio::test]
    async fn test_best_effort_failure_is_collected() {
        let ctx = RequestContext::background();
        let mut run = PipelineRun::new("test", &ctx);

        run.best_effort("ok", async { Ok::<_, AppError>(()) }).await;
        run.best_effort("broken", async { Err(AppError::delivery("down")) })
            .await;

        let degraded = run.finish();
        assert_eq!(degraded.len(), 1);
        assert_eq!(degraded[0].step, "broken");
        assert!(matches!(&degraded[0].status, StepStatus::Failed(msg) if msg.contains("down")));
    }

    #[tokio::test]
    async fn test_required_failure_propagates() {
        let ctx = RequestContext::background();
        let mut run = PipelineRun::new("test", &ctx);

        let err = run
            .required("lookup", async { Err::<(), _>(AppError::not_found("x")) })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(run.finish().is_empty());
    }

    #[tokio::test]
    async fn test_best_effort_skipped_after_cancel() {
        let ctx = RequestContext::background();
        ctx.cancellation().cancel();
        let mut run = PipelineRun::new("test", &ctx);

        run.best_effort("publish", async { Err(AppError::internal("ran after cancel")) })
            .await;

        let degraded = run.finish();
        assert_eq!(degraded[0].status, StepStatus::Skipped);
    }
}
