//! Locked/Unlocked state machine in front of the chat view.

use super::{ChatContext, SessionStore};
use crate::error::ChatError;
use crate::identity::DeviceId;
use tracing::{info, warn};

pub const EMPTY_PASSPHRASE_ERROR: &str = "Please enter a password";
pub const INCORRECT_PASSPHRASE_ERROR: &str = "Incorrect password. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Verifying,
    Unlocked,
}

pub struct UnlockGate {
    state: LockState,
    session: SessionStore,
    device_id: DeviceId,
    pending: Option<String>,
    error: Option<String>,
}

impl UnlockGate {
    /// A passphrase already held by the session store starts the gate unlocked.
    pub fn new(session: SessionStore, device_id: DeviceId) -> Self {
        let state = if session.get().is_some() {
            LockState::Unlocked
        } else {
            LockState::Locked
        };

        Self {
            state,
            session,
            device_id,
            pending: None,
            error: None,
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == LockState::Unlocked
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn context(&self) -> Option<ChatContext> {
        if !self.is_unlocked() {
            return None;
        }
        self.session
            .get()
            .map(|passphrase| ChatContext::new(passphrase, self.device_id.clone()))
    }

    /// Starts verification. Returns the passphrase to check remotely, or
    /// `None` when the input is blank or a check is already running.
    pub fn submit(&mut self, passphrase: &str) -> Option<String> {
        if self.state != LockState::Locked {
            return None;
        }

        if passphrase.trim().is_empty() {
            self.error = Some(EMPTY_PASSPHRASE_ERROR.to_string());
            return None;
        }

        self.error = None;
        self.state = LockState::Verifying;
        self.pending = Some(passphrase.to_string());
        Some(passphrase.to_string())
    }

    /// Applies a verification outcome. Outcomes for a passphrase other than
    /// the pending one are ignored. Returns whether the gate is now unlocked.
    pub fn complete(&mut self, passphrase: &str, outcome: Result<bool, ChatError>) -> bool {
        if self.state != LockState::Verifying || self.pending.as_deref() != Some(passphrase) {
            return self.is_unlocked();
        }
        self.pending = None;

        match outcome {
            Ok(true) => match self.session.set(passphrase) {
                Ok(()) => {
                    info!("chat unlocked");
                    self.state = LockState::Unlocked;
                    self.error = None;
                }
                Err(err) => {
                    warn!(error = %err, "failed to store session passphrase");
                    self.state = LockState::Locked;
                    self.error = Some(err.to_string());
                }
            },
            Ok(false) => {
                self.state = LockState::Locked;
                self.error = Some(INCORRECT_PASSPHRASE_ERROR.to_string());
            }
            Err(err) => {
                warn!(error = %err, "passphrase verification failed");
                self.state = LockState::Locked;
                self.error = Some(if err.is_auth() {
                    INCORRECT_PASSPHRASE_ERROR.to_string()
                } else {
                    err.to_string()
                });
            }
        }

        self.is_unlocked()
    }

    /// Replaces the stored passphrase after a successful remote change.
    pub fn replace_passphrase(&mut self, passphrase: &str) -> Result<(), ChatError> {
        if !self.is_unlocked() {
            return Err(ChatError::NotAuthenticated);
        }
        self.session.set(passphrase)
    }

    pub fn lock(&mut self) {
        if let Err(err) = self.session.clear() {
            warn!(error = %err, "failed to clear session passphrase");
        }
        self.state = LockState::Locked;
        self.pending = None;
        self.error = None;
        info!("chat locked");
    }
}
