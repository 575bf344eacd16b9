//! Multi-step signup flow
//!
//! Three states: collecting details, awaiting the verification code,
//! confirmed. Transitions are forward-only; abandoning the flow simply
//! leaves the entry to be swept with its code. Confirmed is terminal.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use super::verification::{CodeCheck, ResendOutcome, VerificationStore};
use crate::types::{Result, SluiceError};

/// Signup flow states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupState {
    CollectingDetails,
    AwaitingCode,
    Confirmed,
}

/// One applicant's progress through signup
#[derive(Debug, Clone)]
pub struct SignupFlow {
    identifier: String,
    state: SignupState,
}

impl SignupFlow {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            state: SignupState::CollectingDetails,
        }
    }

    pub fn state(&self) -> SignupState {
        self.state
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Details accepted: dispatch a code and move to awaiting-code.
    pub fn submit_details(&mut self, store: &VerificationStore, now: DateTime<Utc>) -> Result<String> {
        match self.state {
            SignupState::CollectingDetails => {
                let code = store.issue(&self.identifier, now);
                self.state = SignupState::AwaitingCode;
                Ok(code)
            }
            _ => Err(SluiceError::Validation(
                "signup details were already submitted".into(),
            )),
        }
    }

    /// Check a submitted code; a match confirms the flow.
    pub fn submit_code(
        &mut self,
        store: &VerificationStore,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<CodeCheck> {
        match self.state {
            SignupState::AwaitingCode => {
                let check = store.check(&self.identifier, code, now);
                if check == CodeCheck::Confirmed {
                    self.state = SignupState::Confirmed;
                }
                Ok(check)
            }
            SignupState::CollectingDetails => Err(SluiceError::Validation(
                "no code was dispatched for this signup".into(),
            )),
            SignupState::Confirmed => Err(SluiceError::Validation(
                "signup is already confirmed".into(),
            )),
        }
    }

    /// Ask for a fresh code. Gated by the store's cooldown; a blocked
    /// resend leaves the flow state untouched.
    pub fn resend(&self, store: &VerificationStore, now: DateTime<Utc>) -> Result<ResendOutcome> {
        match self.state {
            SignupState::AwaitingCode => Ok(store.resend(&self.identifier, now)),
            _ => Err(SluiceError::Validation(
                "no verification is in progress".into(),
            )),
        }
    }
}

/// Outcome of starting (or restarting) a signup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginOutcome {
    /// Flow created and a verification code dispatched
    Started { code: String },
    /// A code went out recently; nothing was reissued
    CoolingDown { remaining_seconds: i64 },
}

/// Registry of in-flight signup flows, keyed by identifier
pub struct SignupFlows {
    store: Arc<VerificationStore>,
    flows: DashMap<String, SignupFlow>,
}

impl SignupFlows {
    pub fn new(store: Arc<VerificationStore>) -> Self {
        Self {
            store,
            flows: DashMap::new(),
        }
    }

    /// Begin (or restart) a signup for an identifier and dispatch its code.
    /// A restart is gated by the same cooldown as a resend, so re-submitting
    /// the details form cannot mint codes faster than the resend control.
    pub fn begin(&self, identifier: &str, now: DateTime<Utc>) -> Result<BeginOutcome> {
        if let Some(remaining_seconds) = self.store.cooldown_remaining(identifier, now) {
            return Ok(BeginOutcome::CoolingDown { remaining_seconds });
        }
        let mut flow = SignupFlow::new(identifier);
        let code = flow.submit_details(&self.store, now)?;
        self.flows.insert(identifier.to_string(), flow);
        Ok(BeginOutcome::Started { code })
    }

    /// Submit a verification code for a pending signup.
    pub fn verify(&self, identifier: &str, code: &str, now: DateTime<Utc>) -> Result<CodeCheck> {
        let mut flow = self
            .flows
            .get_mut(identifier)
            .ok_or_else(|| SluiceError::NotFound(format!("no signup in progress for {identifier}")))?;

        let check = flow.submit_code(&self.store, code, now)?;
        let confirmed = flow.state() == SignupState::Confirmed;
        drop(flow);

        if confirmed {
            self.flows.remove(identifier);
        }
        Ok(check)
    }

    /// Resend the code for a pending signup.
    pub fn resend(&self, identifier: &str, now: DateTime<Utc>) -> Result<ResendOutcome> {
        let flow = self
            .flows
            .get(identifier)
            .ok_or_else(|| SluiceError::NotFound(format!("no signup in progress for {identifier}")))?;

        flow.resend(&self.store, now)
    }
}
