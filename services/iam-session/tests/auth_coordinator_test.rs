//! 认证协调器测试

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use cuba_adapter_redis::InMemoryKeyValueStore;
use cuba_auth_core::{CredentialCodec, FixedClock, SigningKey};
use cuba_common::IdentityId;
use cuba_errors::{AppError, AppResult};
use iam_session::application::{
    AuthCoordinator, LoginCommand, RegisterCommand, RequestContext, StepStatus,
};
use iam_session::domain::AuthEvent;
use iam_session::domain::repositories::{IdentityRepository, TokenSet, TokenStore};
use iam_session::infrastructure::cache::KvTokenStore;
use iam_session::infrastructure::events::{AuthEventPublisher, InMemoryEventBus};
use iam_session::infrastructure::persistence::RedisIdentityRepository;
use mockall::mock;
use tokio_util::sync::CancellationToken;

const CHANNEL: &str = "user_id_jwt";

mock! {
    pub Tokens {}

    #[async_trait]
    impl TokenStore for Tokens {
        async fn add_credential(&self, identity_id: &IdentityId, credential: &str) -> AppResult<()>;
        async fn replace_all(&self, identity_id: &IdentityId, credentials: Vec<String>) -> AppResult<()>;
        async fn remove_credential(&self, identity_id: &IdentityId, credential: &str) -> AppResult<()>;
        async fn get(&self, identity_id: &IdentityId) -> AppResult<TokenSet>;
    }
}

mock! {
    pub Publisher {}

    #[async_trait]
    impl AuthEventPublisher for Publisher {
        async fn publish_auth_event(&self, channel: &str, event: &AuthEvent) -> AppResult<()>;
    }
}

struct Harness {
    coordinator: AuthCoordinator,
    identities: Arc<dyn IdentityRepository>,
    token_kv: Arc<InMemoryKeyValueStore>,
    bus: Arc<InMemoryEventBus>,
    clock: Arc<FixedClock>,
    codec: Arc<CredentialCodec>,
}

fn codec_with_clock() -> (Arc<CredentialCodec>, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let codec = Arc::new(CredentialCodec::new(
        Arc::new(SigningKey::from_secret(b"coordinator-test-key")),
        chrono::Duration::hours(24),
        "iam-session",
        clock.clone(),
    ));
    (codec, clock)
}

fn harness() -> Harness {
    let (codec, clock) = codec_with_clock();
    let identities: Arc<dyn IdentityRepository> = Arc::new(RedisIdentityRepository::new(
        Arc::new(InMemoryKeyValueStore::new()),
    ));
    let token_kv = Arc::new(InMemoryKeyValueStore::new());
    let tokens = Arc::new(KvTokenStore::new(token_kv.clone()));
    let bus = Arc::new(InMemoryEventBus::new());

    let coordinator = AuthCoordinator::new(
        identities.clone(),
        codec.clone(),
        tokens,
        bus.clone(),
        CHANNEL,
    );

    Harness {
        coordinator,
        identities,
        token_kv,
        bus,
        clock,
        codec,
    }
}

/// 替换 Token Store 与事件发布器
fn mocked(
    tokens: Arc<dyn TokenStore>,
    publisher: Arc<dyn AuthEventPublisher>,
) -> (AuthCoordinator, Arc<dyn IdentityRepository>) {
    let (codec, _) = codec_with_clock();
    let identities: Arc<dyn IdentityRepository> = Arc::new(RedisIdentityRepository::new(
        Arc::new(InMemoryKeyValueStore::new()),
    ));
    let coordinator = AuthCoordinator::new(
        identities.clone(),
        codec,
        tokens,
        publisher,
        CHANNEL,
    );
    (coordinator, identities)
}

fn alice() -> RegisterCommand {
    RegisterCommand {
        handle: "alice".to_string(),
        display_name: "Alice A".to_string(),
        contact: "a@x.com".to_string(),
        secret: "s3cret".to_string(),
    }
}

fn login(handle: &str, secret: &str) -> LoginCommand {
    LoginCommand {
        handle: handle.to_string(),
        secret: secret.to_string(),
    }
}

#[tokio::test]
async fn test_register_then_authorize() {
    let h = harness();
    let ctx = RequestContext::background();

    let outcome = h.coordinator.register(&ctx, alice()).await.unwrap();
    assert!(!outcome.is_degraded());
    assert_eq!(outcome.identity.handle, "alice");

    let auth = h
        .coordinator
        .authorize(&ctx, "alice", &outcome.credential)
        .await
        .unwrap();
    assert_eq!(auth.identity.id, outcome.identity.id);
    assert_eq!(auth.credential.identity_id, outcome.identity.id);

    let active = h
        .coordinator
        .active_credentials(&ctx, &outcome.identity.id)
        .await
        .unwrap();
    assert_eq!(active.credentials, vec![outcome.credential.clone()]);

    let events = h.bus.get_events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, CHANNEL);
    assert_eq!(
        events[0].1,
        AuthEvent::new(outcome.identity.id, outcome.credential)
    );
}

#[tokio::test]
async fn test_register_duplicate_is_conflict() {
    let h = harness();
    let ctx = RequestContext::background();
    h.coordinator.register(&ctx, alice()).await.unwrap();

    let mut again = alice();
    again.contact = "other@x.com".to_string();
    let err = h.coordinator.register(&ctx, again).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(h.bus.get_events().await.len(), 1);
}

#[tokio::test]
async fn test_register_rejects_invalid_input() {
    let h = harness();
    let mut bad = alice();
    bad.contact = "not-an-address".to_string();

    let err = h
        .coordinator
        .register(&RequestContext::background(), bad)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(h.bus.get_events().await.is_empty());
}

#[tokio::test]
async fn test_login_issues_additional_credential() {
    let h = harness();
    let ctx = RequestContext::background();
    let registered = h.coordinator.register(&ctx, alice()).await.unwrap();

    h.clock.advance(chrono::Duration::seconds(1));
    let outcome = h.coordinator.login(&ctx, login("alice", "s3cret")).await.unwrap();
    assert_eq!(outcome.identity.id, registered.identity.id);
    assert_ne!(outcome.credential, registered.credential);

    let active = h
        .coordinator
        .active_credentials(&ctx, &registered.identity.id)
        .await
        .unwrap();
    assert_eq!(active.len(), 2);
    assert!(active.contains(&outcome.credential));
    assert_eq!(h.bus.get_events().await.len(), 2);
}

#[tokio::test]
async fn test_login_wrong_secret_short_circuits() {
    let mut tokens = MockTokens::new();
    tokens.expect_add_credential().never();
    let mut publisher = MockPublisher::new();
    publisher.expect_publish_auth_event().never();

    let (coordinator, identities) = mocked(Arc::new(tokens), Arc::new(publisher));
    let alice = iam_session::domain::Identity::register("alice", "Alice A", "a@x.com", "s3cret")
        .unwrap();
    identities.insert(&alice).await.unwrap();

    let err = coordinator
        .login(&RequestContext::background(), login("alice", "wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_login_unknown_handle() {
    let h = harness();
    let err = h
        .coordinator
        .login(&RequestContext::background(), login("nobody", "pw"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(h.bus.get_events().await.is_empty());
}

#[tokio::test]
async fn test_best_effort_failures_do_not_fail_register() {
    let mut tokens = MockTokens::new();
    tokens
        .expect_add_credential()
        .times(1)
        .returning(|_, _| Err(AppError::store_unavailable("connection refused")));
    let mut publisher = MockPublisher::new();
    publisher
        .expect_publish_auth_event()
        .times(1)
        .returning(|_, _| Err(AppError::delivery("broker down")));

    let (coordinator, identities) = mocked(Arc::new(tokens), Arc::new(publisher));
    let outcome = coordinator
        .register(&RequestContext::background(), alice())
        .await
        .unwrap();

    assert!(outcome.is_degraded());
    let steps: Vec<_> = outcome.degraded.iter().map(|f| f.step).collect();
    assert_eq!(steps, vec!["token_store", "publish_event"]);
    assert!(
        outcome
            .degraded
            .iter()
            .all(|f| matches!(f.status, StepStatus::Failed(_)))
    );

    // 注册已提交
    assert_eq!(
        identities.find_by_handle("alice").await.unwrap().id,
        outcome.identity.id
    );
}

#[tokio::test]
async fn test_token_store_outage_still_returns_valid_credential() {
    let h = harness();
    h.token_kv.set_unavailable(true);
    let ctx = RequestContext::background();

    let outcome = h.coordinator.register(&ctx, alice()).await.unwrap();
    assert_eq!(outcome.degraded.len(), 1);
    assert_eq!(outcome.degraded[0].step, "token_store");

    h.coordinator
        .authorize(&ctx, "alice", &outcome.credential)
        .await
        .unwrap();
    assert_eq!(h.bus.get_events().await.len(), 1);
}

#[tokio::test]
async fn test_authorize_rejects_foreign_credential() {
    let h = harness();
    let ctx = RequestContext::background();
    h.coordinator.register(&ctx, alice()).await.unwrap();
    let bob = h
        .coordinator
        .register(
            &ctx,
            RegisterCommand {
                handle: "bob".to_string(),
                display_name: "Bob".to_string(),
                contact: "b@x.com".to_string(),
                secret: "pw".to_string(),
            },
        )
        .await
        .unwrap();

    let err = h
        .coordinator
        .authorize(&ctx, "alice", &bob.credential)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(err.is_authorization_denied());
}

#[tokio::test]
async fn test_authorize_rejects_bad_credentials() {
    let h = harness();
    let ctx = RequestContext::background();
    let outcome = h.coordinator.register(&ctx, alice()).await.unwrap();

    let err = h
        .coordinator
        .authorize(&ctx, "alice", "garbage")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MalformedCredential(_)));

    let (other_codec, _) = {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let codec = CredentialCodec::new(
            Arc::new(SigningKey::from_secret(b"some-other-key")),
            chrono::Duration::hours(24),
            "iam-session",
            clock.clone(),
        );
        (codec, clock)
    };
    let forged = other_codec.mint(&outcome.identity.id).unwrap();
    let err = h
        .coordinator
        .authorize(&ctx, "alice", &forged)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidSignature(_)));

    h.clock.advance(chrono::Duration::hours(24) + chrono::Duration::seconds(1));
    let err = h
        .coordinator
        .authorize(&ctx, "alice", &outcome.credential)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CredentialExpired(_)));
    assert!(err.is_authorization_denied());

    // Token Store 中仍有记录也不影响过期判断
    assert!(
        h.coordinator
            .active_credentials(&ctx, &outcome.identity.id)
            .await
            .unwrap()
            .contains(&outcome.credential)
    );
    assert_eq!(h.codec.is_expired(&outcome.credential), Some(true));
}

#[tokio::test]
async fn test_logout_removes_credential() {
    let h = harness();
    let ctx = RequestContext::background();
    let outcome = h.coordinator.register(&ctx, alice()).await.unwrap();
    let id = outcome.identity.id;

    h.coordinator
        .logout(&ctx, &id, &outcome.credential)
        .await
        .unwrap();
    assert!(h.coordinator.active_credentials(&ctx, &id).await.unwrap().is_empty());

    let err = h
        .coordinator
        .logout(&ctx, &id, &outcome.credential)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CredentialNotFound(_)));

    let err = h
        .coordinator
        .logout(&ctx, &IdentityId::new(), "cred")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_cancelled_request_commits_nothing() {
    let h = harness();
    let ctx = RequestContext::background();
    ctx.cancellation().cancel();

    let err = h.coordinator.register(&ctx, alice()).await.unwrap_err();
    assert!(matches!(err, AppError::Cancelled(_)));
    assert!(matches!(
        h.identities.find_by_handle("alice").await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(h.bus.get_events().await.is_empty());
}

/// 记录凭证时取消请求，模拟调用方在流程中途放弃
struct CancellingTokens {
    token: CancellationToken,
}

#[async_trait]
impl TokenStore for CancellingTokens {
    async fn add_credential(&self, _: &IdentityId, _: &str) -> AppResult<()> {
        self.token.cancel();
        Ok(())
    }

    async fn replace_all(&self, _: &IdentityId, _: Vec<String>) -> AppResult<()> {
        Ok(())
    }

    async fn remove_credential(&self, _: &IdentityId, _: &str) -> AppResult<()> {
        Ok(())
    }

    async fn get(&self, identity_id: &IdentityId) -> AppResult<TokenSet> {
        Ok(TokenSet::empty(*identity_id))
    }
}

#[tokio::test]
async fn test_cancel_mid_flow_skips_remaining_best_effort_steps() {
    let ctx = RequestContext::background();
    let tokens = CancellingTokens {
        token: ctx.cancellation().clone(),
    };
    let mut publisher = MockPublisher::new();
    publisher.expect_publish_auth_event().never();

    let (coordinator, identities) = mocked(Arc::new(tokens), Arc::new(publisher));
    let outcome = coordinator.register(&ctx, alice()).await.unwrap();

    assert!(ctx.is_done());
    assert_eq!(outcome.degraded.len(), 1);
    assert_eq!(outcome.degraded[0].step, "publish_event");
    assert_eq!(outcome.degraded[0].status, StepStatus::Skipped);
    assert!(identities.find_by_handle("alice").await.is_ok());
}
