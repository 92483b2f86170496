//! 认证协调器
//!
//! 注册与登录流程：
//! 1. 仓储写入或查找（必需）
//! 2. 签发凭证（必需）
//! 3. 记录到 Token Store（尽力而为）
//! 4. 发布认证事件（尽力而为）
//!
//! 返回结果只取决于必需步骤；尽力而为步骤的失败体现在 `degraded` 中。

use std::sync::Arc;

use cuba_auth_core::{CredentialCodec, VerifiedCredential};
use cuba_common::IdentityId;
use cuba_errors::AppResult;
use tracing::{info, warn};

use super::{PipelineRun, RequestContext, StepFailure};
use crate::domain::repositories::{IdentityRepository, TokenSet, TokenStore};
use crate::domain::{AuthEvent, Identity};
use crate::error::AuthError;
use crate::infrastructure::events::AuthEventPublisher;
use crate::infrastructure::observability::metrics;

/// 注册命令
#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub handle: String,
    pub display_name: String,
    pub contact: String,
    pub secret: String,
}

/// 登录命令
#[derive(Debug, Clone)]
pub struct LoginCommand {
    pub handle: String,
    pub secret: String,
}

/// 注册或登录成功的结果
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub identity: Identity,
    pub credential: String,
    /// 未完成的尽力而为步骤
    pub degraded: Vec<StepFailure>,
}

impl AuthOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// 授权校验通过的结果
#[derive(Debug, Clone)]
pub struct Authorization {
    pub identity: Identity,
    pub credential: VerifiedCredential,
}

pub struct AuthCoordinator {
    identities: Arc<dyn IdentityRepository>,
    codec: Arc<CredentialCodec>,
    tokens: Arc<dyn TokenStore>,
    publisher: Arc<dyn AuthEventPublisher>,
    channel: String,
}

impl AuthCoordinator {
    pub fn new(
        identities: Arc<dyn IdentityRepository>,
        codec: Arc<CredentialCodec>,
        tokens: Arc<dyn TokenStore>,
        publisher: Arc<dyn AuthEventPublisher>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            identities,
            codec,
            tokens,
            publisher,
            channel: channel.into(),
        }
    }

    pub async fn register(
        &self,
        ctx: &RequestContext,
        command: RegisterCommand,
    ) -> AppResult<AuthOutcome> {
        info!(handle = %command.handle, "Handling RegisterCommand");

        let result = self.run_register(ctx, command).await;
        metrics::record_register(outcome_label(&result));
        result
    }

    pub async fn login(&self, ctx: &RequestContext, command: LoginCommand) -> AppResult<AuthOutcome> {
        info!(handle = %command.handle, "Handling LoginCommand");

        let result = self.run_login(ctx, command).await;
        metrics::record_login(outcome_label(&result));
        result
    }

    /// 校验凭证属于该 handle 对应的身份
    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        handle: &str,
        credential: &str,
    ) -> AppResult<Authorization> {
        let result = self.run_authorize(ctx, handle, credential).await;
        match &result {
            Ok(auth) => {
                info!(identity_id = %auth.identity.id, "Credential authorized");
                metrics::record_authorize("allowed");
            }
            Err(e) => {
                warn!(handle = handle, error = %e, "Authorization denied");
                metrics::record_authorize("denied");
            }
        }
        result
    }

    /// 从活跃集合中移除一个凭证
    pub async fn logout(
        &self,
        ctx: &RequestContext,
        identity_id: &IdentityId,
        credential: &str,
    ) -> AppResult<()> {
        ctx.run(
            "token_remove",
            self.tokens.remove_credential(identity_id, credential),
        )
        .await?;
        info!(identity_id = %identity_id, "Credential removed from active set");
        Ok(())
    }

    pub async fn active_credentials(
        &self,
        ctx: &RequestContext,
        identity_id: &IdentityId,
    ) -> AppResult<TokenSet> {
        ctx.run("token_get", self.tokens.get(identity_id)).await
    }

    async fn run_register(
        &self,
        ctx: &RequestContext,
        command: RegisterCommand,
    ) -> AppResult<AuthOutcome> {
        let identity = Identity::register(
            &command.handle,
            &command.display_name,
            &command.contact,
            &command.secret,
        )?;

        let mut run = PipelineRun::new("register", ctx);
        run.required("identity_insert", self.identities.insert(&identity))
            .await?;
        info!(identity_id = %identity.id, handle = %identity.handle, "Identity registered");

        self.issue(run, identity).await
    }

    async fn run_login(&self, ctx: &RequestContext, command: LoginCommand) -> AppResult<AuthOutcome> {
        let mut run = PipelineRun::new("login", ctx);
        let identity = run
            .required("identity_lookup", self.identities.find_by_handle(&command.handle))
            .await?;

        if !identity.secret.matches(&command.secret) {
            warn!(identity_id = %identity.id, "Login rejected: secret mismatch");
            return Err(AuthError::InvalidCredentials.into());
        }

        self.issue(run, identity).await
    }

    async fn run_authorize(
        &self,
        ctx: &RequestContext,
        handle: &str,
        credential: &str,
    ) -> AppResult<Authorization> {
        let identity = ctx
            .run("identity_lookup", self.identities.find_by_handle(handle))
            .await?;
        let verified = ctx
            .run("credential_verify", async { self.codec.verify(credential) })
            .await?;

        if verified.identity_id != identity.id {
            return Err(AuthError::IdentityMismatch.into());
        }

        Ok(Authorization {
            identity,
            credential: verified,
        })
    }

    /// 签发凭证并执行尽力而为步骤
    async fn issue(&self, mut run: PipelineRun<'_>, identity: Identity) -> AppResult<AuthOutcome> {
        let credential = run
            .required("credential_mint", async { self.codec.mint(&identity.id) })
            .await?;

        run.best_effort(
            "token_store",
            self.tokens.add_credential(&identity.id, &credential),
        )
        .await;

        let event = AuthEvent::new(identity.id, credential.clone());
        run.best_effort(
            "publish_event",
            self.publisher.publish_auth_event(&self.channel, &event),
        )
        .await;

        Ok(AuthOutcome {
            identity,
            credential,
            degraded: run.finish(),
        })
    }
}

fn outcome_label(result: &AppResult<AuthOutcome>) -> &'static str {
    match result {
        Ok(outcome) if outcome.is_degraded() => "degraded",
        Ok(_) => "success",
        Err(_) => "failure",
    }
}
