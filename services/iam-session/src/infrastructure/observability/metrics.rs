//! IAM Session Metrics
//!
//! 业务指标记录

use metrics::counter;

/// 记录注册结果
pub fn record_register(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!("iam_session_register_total", &labels).increment(1);
}

/// 记录登录结果
pub fn record_login(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!("iam_session_login_total", &labels).increment(1);
}

/// 记录授权校验结果
pub fn record_authorize(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!("iam_session_authorize_total", &labels).increment(1);
}

/// 记录尽力而为步骤的失败
pub fn record_best_effort_failure(operation: &str, step: &str) {
    let labels = [
        ("operation", operation.to_string()),
        ("step", step.to_string()),
    ];
    counter!("iam_session_best_effort_failures_total", &labels).increment(1);
}
