use super::*;
use crate::email::{EmailMessage, EmailSender, LogEmailSender};
use crate::store::MemoryStore;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

const ID: &str = "a@x.com";

/// Keeps every message so tests can read the mailed code.
#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingSender {
    fn count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or_default()
    }

    fn last_code(&self) -> Option<String> {
        let sent = self.sent.lock().ok()?;
        sent.last()
            .and_then(|message| message.data.get("otp"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
    }
}

#[async_trait]
impl EmailSender for RecordingSender {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow!("recording sender poisoned"))?
            .push(message.clone());
        Ok(())
    }
}

struct FailingSender;

#[async_trait]
impl EmailSender for FailingSender {
    async fn send(&self, _message: &EmailMessage) -> Result<()> {
        Err(anyhow!("relay unavailable"))
    }
}

/// Store that never answers.
struct StalledStore;

#[async_trait]
impl OtpStore for StalledStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn delete(&self, _keys: &[String]) -> Result<(), StoreError> {
        std::future::pending().await
    }

    async fn increment_below(
        &self,
        _key: &str,
        _limit: u64,
        _ttl: Duration,
    ) -> Result<Option<u64>, StoreError> {
        std::future::pending().await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        std::future::pending().await
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    sender: Arc<RecordingSender>,
    gatekeeper: Gatekeeper,
    keys: OtpKeys,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let sender = Arc::new(RecordingSender::default());
    let gatekeeper = Gatekeeper::new(store.clone(), sender.clone(), OtpPolicy::new());
    Harness {
        store,
        sender,
        gatekeeper,
        keys: OtpKeys::default(),
    }
}

impl Harness {
    async fn issue(&self) -> Result<String> {
        self.gatekeeper
            .request_otp(ID, "Alice", EmailTemplate::UserActivation)
            .await?;
        self.stored_code()
            .await?
            .ok_or_else(|| anyhow!("no code stored"))
    }

    async fn stored_code(&self) -> Result<Option<String>> {
        Ok(self.store.get(&self.keys.otp(ID)).await?)
    }

    async fn present(&self, key: String) -> Result<bool> {
        Ok(self.store.get(&key).await?.is_some())
    }
}

fn wrong_code(code: &str) -> &'static str {
    if code == "0000" { "1111" } else { "0000" }
}

#[tokio::test(start_paused = true)]
async fn issue_stores_code_and_cooldown_with_ttls() -> Result<()> {
    let h = harness();
    let code = h.issue().await?;

    assert_eq!(code.len(), 4);
    let value: u32 = code.parse()?;
    assert!((1000..9999).contains(&value));
    assert_eq!(h.sender.last_code().as_deref(), Some(code.as_str()));

    assert_eq!(h.store.ttl(&h.keys.otp(ID)).await, Some(Duration::from_secs(300)));
    assert_eq!(
        h.store.ttl(&h.keys.cooldown(ID)).await,
        Some(Duration::from_secs(60))
    );
    assert_eq!(
        h.store.get(&h.keys.request_count(ID)).await?.as_deref(),
        Some("1")
    );
    assert_eq!(
        h.store.ttl(&h.keys.request_count(ID)).await,
        Some(Duration::from_secs(3600))
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn round_trip_succeeds_exactly_once() -> Result<()> {
    let h = harness();
    let code = h.issue().await?;

    h.gatekeeper.verify(ID, &code).await?;
    assert!(!h.present(h.keys.otp(ID)).await?);
    assert!(!h.present(h.keys.attempts(ID)).await?);

    let second = h.gatekeeper.verify(ID, &code).await;
    assert!(matches!(second, Err(OtpError::NotFound)));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn second_request_within_cooldown_is_rejected_before_tracking() -> Result<()> {
    let h = harness();
    h.issue().await?;

    let result = h
        .gatekeeper
        .request_otp(ID, "Alice", EmailTemplate::UserActivation)
        .await;
    assert!(matches!(result, Err(OtpError::Cooldown { .. })));

    // Neither counted nor mailed.
    assert_eq!(
        h.store.get(&h.keys.request_count(ID)).await?.as_deref(),
        Some("1")
    );
    assert_eq!(h.sender.count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn third_request_in_the_hour_sets_spam_lock() -> Result<()> {
    let h = harness();
    h.issue().await?;
    tokio::time::advance(Duration::from_secs(61)).await;
    h.issue().await?;
    tokio::time::advance(Duration::from_secs(61)).await;

    let third = h
        .gatekeeper
        .request_otp(ID, "Alice", EmailTemplate::UserActivation)
        .await;
    assert!(matches!(third, Err(OtpError::Spam { .. })));
    assert!(h.present(h.keys.spam_lock(ID)).await?);
    assert_eq!(
        h.store.ttl(&h.keys.spam_lock(ID)).await,
        Some(Duration::from_secs(3600))
    );
    // Counter frozen, nothing mailed for the rejected request.
    assert_eq!(
        h.store.get(&h.keys.request_count(ID)).await?.as_deref(),
        Some("2")
    );
    assert_eq!(h.sender.count(), 2);

    // From now on the spam lock answers first.
    tokio::time::advance(Duration::from_secs(61)).await;
    let fourth = h
        .gatekeeper
        .request_otp(ID, "Alice", EmailTemplate::UserActivation)
        .await;
    assert!(matches!(fourth, Err(OtpError::Spam { .. })));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn spam_lock_expires_after_an_hour() -> Result<()> {
    let h = harness();
    h.issue().await?;
    tokio::time::advance(Duration::from_secs(61)).await;
    h.issue().await?;
    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(h.gatekeeper.request_otp(ID, "Alice", EmailTemplate::UserActivation).await.is_err());

    tokio::time::advance(Duration::from_secs(3600)).await;
    h.issue().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn wrong_codes_count_down_then_lock() -> Result<()> {
    let h = harness();
    let code = h.issue().await?;
    let wrong = wrong_code(&code);

    let first = h.gatekeeper.verify(ID, wrong).await;
    match first {
        Err(err @ OtpError::Mismatch { remaining: 2 }) => {
            assert_eq!(err.to_string(), "Incorrect OTP. 2 attempts left!");
        }
        other => return Err(anyhow!("unexpected first result: {other:?}")),
    }

    let second = h.gatekeeper.verify(ID, wrong).await;
    match second {
        Err(err @ OtpError::Mismatch { remaining: 1 }) => {
            assert_eq!(err.to_string(), "Incorrect OTP. 1 attempt left!");
        }
        other => return Err(anyhow!("unexpected second result: {other:?}")),
    }

    let third = h.gatekeeper.verify(ID, wrong).await;
    assert!(matches!(third, Err(OtpError::ExhaustedLocked { .. })));
    assert!(h.present(h.keys.lock(ID)).await?);
    assert_eq!(
        h.store.ttl(&h.keys.lock(ID)).await,
        Some(Duration::from_secs(1800))
    );
    assert!(!h.present(h.keys.otp(ID)).await?);
    assert!(!h.present(h.keys.attempts(ID)).await?);

    // The locked identifier cannot get a new code even though cooldown and
    // spam windows are clear.
    tokio::time::advance(Duration::from_secs(61)).await;
    let reissue = h
        .gatekeeper
        .request_otp(ID, "Alice", EmailTemplate::UserActivation)
        .await;
    assert!(matches!(reissue, Err(OtpError::Locked { .. })));

    // The correct code is gone as well.
    assert!(matches!(
        h.gatekeeper.verify(ID, &code).await,
        Err(OtpError::NotFound)
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn lockout_expires_after_thirty_minutes() -> Result<()> {
    let h = harness();
    let code = h.issue().await?;
    let wrong = wrong_code(&code);
    for _ in 0..3 {
        let _ = h.gatekeeper.verify(ID, wrong).await;
    }

    tokio::time::advance(Duration::from_secs(1799)).await;
    assert!(matches!(
        h.gatekeeper.check_restrictions(ID).await,
        Err(OtpError::Locked { .. })
    ));

    tokio::time::advance(Duration::from_secs(1)).await;
    h.gatekeeper.check_restrictions(ID).await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn correct_code_clears_attempts_whatever_the_count() -> Result<()> {
    for failures in 0..=2 {
        let h = harness();
        let code = h.issue().await?;
        for _ in 0..failures {
            let _ = h.gatekeeper.verify(ID, wrong_code(&code)).await;
        }

        h.gatekeeper.verify(ID, &code).await?;
        assert!(!h.present(h.keys.otp(ID)).await?, "failures = {failures}");
        assert!(!h.present(h.keys.attempts(ID)).await?, "failures = {failures}");
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn verify_without_code_is_not_found() -> Result<()> {
    let h = harness();
    assert!(matches!(
        h.gatekeeper.verify(ID, "1234").await,
        Err(OtpError::NotFound)
    ));
    // No attempt is counted for a missing code.
    assert!(!h.present(h.keys.attempts(ID)).await?);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn expired_code_is_not_found() -> Result<()> {
    let h = harness();
    let code = h.issue().await?;
    tokio::time::advance(Duration::from_secs(300)).await;
    assert!(matches!(
        h.gatekeeper.verify(ID, &code).await,
        Err(OtpError::NotFound)
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn attempt_window_resets_after_five_minutes() -> Result<()> {
    let h = harness();
    let code = h.issue().await?;
    let _ = h.gatekeeper.verify(ID, wrong_code(&code)).await;

    // Re-issue a fresh code after the attempts counter expired.
    tokio::time::advance(Duration::from_secs(300)).await;
    let code = h.issue().await?;
    assert!(matches!(
        h.gatekeeper.verify(ID, wrong_code(&code)).await,
        Err(OtpError::Mismatch { remaining: 2 })
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn identifiers_are_normalized() -> Result<()> {
    let h = harness();
    let code = h.issue().await?;
    h.gatekeeper.verify("  A@X.COM ", &code).await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn restriction_priority_is_lock_then_spam_then_cooldown() -> Result<()> {
    let h = harness();
    let ttl = Duration::from_secs(60);
    h.store.set(&h.keys.cooldown(ID), "locked", ttl).await?;
    assert!(matches!(
        h.gatekeeper.check_restrictions(ID).await,
        Err(OtpError::Cooldown { .. })
    ));

    h.store.set(&h.keys.spam_lock(ID), "locked", ttl).await?;
    assert!(matches!(
        h.gatekeeper.check_restrictions(ID).await,
        Err(OtpError::Spam { .. })
    ));

    h.store.set(&h.keys.lock(ID), "locked", ttl).await?;
    assert!(matches!(
        h.gatekeeper.check_restrictions(ID).await,
        Err(OtpError::Locked { .. })
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_delivery_still_stores_code_and_cooldown() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let gatekeeper = Gatekeeper::new(store.clone(), Arc::new(FailingSender), OtpPolicy::new());
    let keys = OtpKeys::default();

    let receipt = gatekeeper
        .request_otp(ID, "Alice", EmailTemplate::ForgotPassword)
        .await?;
    assert!(!receipt.delivered);
    assert!(store.get(&keys.otp(ID)).await?.is_some());
    assert!(store.get(&keys.cooldown(ID)).await?.is_some());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stalled_store_times_out() -> Result<()> {
    let gatekeeper = Gatekeeper::new(
        Arc::new(StalledStore),
        Arc::new(LogEmailSender),
        OtpPolicy::new().with_store_timeout_millis(500),
    );

    let result = gatekeeper.check_restrictions(ID).await;
    match result {
        Err(OtpError::Timeout { operation, timeout }) => {
            assert_eq!(operation, "check_lock");
            assert_eq!(timeout, Duration::from_millis(500));
        }
        other => return Err(anyhow!("expected timeout, got {other:?}")),
    }

    assert!(matches!(
        gatekeeper.verify(ID, "1234").await,
        Err(OtpError::Timeout { .. })
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn reset_grant_is_single_use() -> Result<()> {
    let h = harness();
    assert!(!h.gatekeeper.reset_granted(ID).await?);

    h.gatekeeper.grant_reset(ID).await?;
    assert!(h.gatekeeper.reset_granted(ID).await?);
    assert!(h.gatekeeper.consume_reset_grant(ID).await?);
    assert!(!h.gatekeeper.consume_reset_grant(ID).await?);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn reset_grant_expires() -> Result<()> {
    let h = harness();
    h.gatekeeper.grant_reset(ID).await?;
    tokio::time::advance(Duration::from_secs(300)).await;
    assert!(!h.gatekeeper.consume_reset_grant(ID).await?);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn key_prefix_isolates_deployments() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let gatekeeper = Gatekeeper::new(
        store.clone(),
        Arc::new(LogEmailSender),
        OtpPolicy::new().with_key_prefix("shop:".to_string()),
    );
    gatekeeper
        .request_otp(ID, "Alice", EmailTemplate::UserActivation)
        .await?;

    assert!(store.get("shop:otp:a@x.com").await?.is_some());
    assert!(store.get("otp:a@x.com").await?.is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn rejections_report_configured_waits() -> Result<()> {
    let gatekeeper = Gatekeeper::new(
        Arc::new(MemoryStore::new()),
        Arc::new(LogEmailSender),
        OtpPolicy::new()
            .with_cooldown_seconds(120)
            .with_lock_seconds(600),
    );
    gatekeeper
        .request_otp(ID, "Alice", EmailTemplate::UserActivation)
        .await?;

    match gatekeeper
        .request_otp(ID, "Alice", EmailTemplate::UserActivation)
        .await
    {
        Err(err @ OtpError::Cooldown { .. }) => assert_eq!(
            err.to_string(),
            "Please wait 2 minutes before requesting a new OTP!"
        ),
        other => return Err(anyhow!("expected cooldown, got {other:?}")),
    }

    // Codes start at 1000, so "0000" never matches.
    for _ in 0..3 {
        let _ = gatekeeper.verify(ID, "0000").await;
    }
    match gatekeeper.check_restrictions(ID).await {
        Err(err @ OtpError::Locked { .. }) => assert_eq!(
            err.to_string(),
            "Account locked due to multiple failed attempts! Try again after 10 minutes"
        ),
        other => return Err(anyhow!("expected lock, got {other:?}")),
    }
    Ok(())
}

#[test]
fn generated_codes_stay_in_range() {
    for _ in 0..1000 {
        let code = generate_code();
        let value: u32 = code.parse().unwrap_or_default();
        assert!((1000..9999).contains(&value), "code out of range: {code}");
    }
}
