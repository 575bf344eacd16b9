//! Signup verification codes
//!
//! In-memory store of pending verification codes. A code is a 4-digit
//! numeric PIN, valid for a configurable window (default 10 minutes), with a
//! bounded number of attempts before it is invalidated and a cooldown
//! between resends. Codes are checked for real; there is no accept-all path.
//!
//! All checks take `now` as an argument so expiry and cooldown behavior is
//! testable without a clock.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

/// Number of digits in a verification code
pub const CODE_LENGTH: usize = 4;

/// Verification policy knobs
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// How long a code stays valid
    pub expiry: Duration,
    /// Minimum time between resends
    pub resend_cooldown: Duration,
    /// Attempts before the code is invalidated
    pub max_attempts: u32,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            expiry: Duration::seconds(600),
            resend_cooldown: Duration::seconds(30),
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone)]
struct PendingCode {
    code: String,
    issued_at: DateTime<Utc>,
    attempts: u32,
}

/// Result of checking a submitted code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeCheck {
    /// Code matched; the pending entry is consumed
    Confirmed,
    /// Code did not match; attempts remain
    Mismatch { remaining_attempts: u32 },
    /// Too many wrong attempts; the code was invalidated
    AttemptsExhausted,
    /// The code aged out; a resend is required
    Expired,
    /// No code is pending for this identifier
    NoPending,
}

/// Result of a resend request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendOutcome {
    /// A fresh code was issued
    Reissued,
    /// Cooldown still running; nothing was changed
    CoolingDown { remaining_seconds: i64 },
    /// No pending signup for this identifier
    NoPending,
}

/// In-memory verification code store, keyed by identifier
pub struct VerificationStore {
    config: VerificationConfig,
    codes: DashMap<String, PendingCode>,
}

impl VerificationStore {
    pub fn new(config: VerificationConfig) -> Self {
        Self {
            config,
            codes: DashMap::new(),
        }
    }

    /// Issue a fresh code for an identifier, replacing any pending one.
    /// Returns the code so the caller can dispatch it.
    pub fn issue(&self, identifier: &str, now: DateTime<Utc>) -> String {
        let code = generate_code();
        debug!("Issued verification code for {}", identifier);
        self.codes.insert(
            identifier.to_string(),
            PendingCode {
                code: code.clone(),
                issued_at: now,
                attempts: 0,
            },
        );
        code
    }

    /// Seconds left on the resend cooldown for a pending code, if any
    pub fn cooldown_remaining(&self, identifier: &str, now: DateTime<Utc>) -> Option<i64> {
        let pending = self.codes.get(identifier)?;
        let remaining = self.config.resend_cooldown - (now - pending.issued_at);
        if remaining > Duration::zero() {
            Some(remaining.num_seconds().max(1))
        } else {
            None
        }
    }

    /// Re-issue a code if the cooldown has elapsed. A resend during the
    /// cooldown changes nothing.
    pub fn resend(&self, identifier: &str, now: DateTime<Utc>) -> ResendOutcome {
        if !self.codes.contains_key(identifier) {
            return ResendOutcome::NoPending;
        }
        if let Some(remaining_seconds) = self.cooldown_remaining(identifier, now) {
            return ResendOutcome::CoolingDown { remaining_seconds };
        }

        self.issue(identifier, now);
        ResendOutcome::Reissued
    }

    /// Check a submitted code. A match consumes the pending entry; a
    /// mismatch burns one attempt.
    pub fn check(&self, identifier: &str, submitted: &str, now: DateTime<Utc>) -> CodeCheck {
        let mut entry = match self.codes.get_mut(identifier) {
            Some(entry) => entry,
            None => return CodeCheck::NoPending,
        };

        if now - entry.issued_at > self.config.expiry {
            drop(entry);
            self.codes.remove(identifier);
            return CodeCheck::Expired;
        }

        if entry.code == submitted {
            drop(entry);
            self.codes.remove(identifier);
            return CodeCheck::Confirmed;
        }

        entry.attempts += 1;
        if entry.attempts >= self.config.max_attempts {
            drop(entry);
            self.codes.remove(identifier);
            return CodeCheck::AttemptsExhausted;
        }

        let remaining_attempts = self.config.max_attempts - entry.attempts;
        CodeCheck::Mismatch { remaining_attempts }
    }

    /// Whether a code is pending for this identifier
    pub fn has_pending(&self, identifier: &str) -> bool {
        self.codes.contains_key(identifier)
    }

    /// Drop entries older than the expiry window
    pub fn sweep(&self, now: DateTime<Utc>) {
        let expiry = self.config.expiry;
        self.codes.retain(|_, pending| now - pending.issued_at <= expiry);
    }

    #[cfg(test)]
    fn pending_code(&self, identifier: &str) -> Option<String> {
        self.codes.get(identifier).map(|p| p.code.clone())
    }
}

fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("{:04}", n)
}

/// Periodically sweep expired codes
pub fn spawn_sweep_task(store: Arc<VerificationStore>, period: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            store.sweep(Utc::now());
        }
    });
}
