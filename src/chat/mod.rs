//! Data layer between the UI and the remote store.

use crate::codec;
use crate::error::{ChatError, Result};
use crate::remote::{Message, RemoteActor, RemoteError};
use crate::session::ChatContext;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::{self, Duration};
use tracing::{debug, warn};

pub mod client;
pub mod poller;

pub use client::ChatClient;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;
pub const FETCH_RETRY_DELAY: Duration = Duration::from_millis(1000);

#[derive(Clone)]
pub struct ChatService {
    actor: Arc<dyn RemoteActor>,
    invalidation: Arc<Notify>,
}

impl ChatService {
    pub fn new(actor: Arc<dyn RemoteActor>) -> Self {
        Self {
            actor,
            invalidation: Arc::new(Notify::new()),
        }
    }

    /// Signalled whenever a mutation makes the cached message list stale.
    pub fn invalidation(&self) -> Arc<Notify> {
        Arc::clone(&self.invalidation)
    }

    fn invalidate(&self) {
        self.invalidation.notify_one();
    }

    /// Full-set fetch. Transport failures are retried once after
    /// [`FETCH_RETRY_DELAY`]; a rejected passphrase is not.
    pub async fn fetch_messages(&self, ctx: &ChatContext) -> Result<Vec<Message>> {
        match self.actor.get_messages(ctx.passphrase(), None).await {
            Ok(messages) => Ok(messages),
            Err(err @ RemoteError::Rejected(_)) => Err(err.into()),
            Err(err) => {
                warn!(error = %err, "message fetch failed, retrying once");
                time::sleep(FETCH_RETRY_DELAY).await;
                let messages = self.actor.get_messages(ctx.passphrase(), None).await?;
                Ok(messages)
            }
        }
    }

    pub async fn send_message(&self, ctx: &ChatContext, text: &str) -> Result<Message> {
        let content = codec::encode(text, ctx.device_id());
        let message = self.actor.add_message(ctx.passphrase(), &content).await?;
        debug!(message_id = message.message_id, "message sent");
        self.invalidate();
        Ok(message)
    }

    pub async fn clear_chat(&self, ctx: &ChatContext) -> Result<()> {
        self.actor.clear_chat(ctx.passphrase()).await?;
        debug!("chat cleared");
        self.invalidate();
        Ok(())
    }

    /// There is no dedicated endpoint, so a successful fetch counts as valid.
    pub async fn verify_passphrase(&self, passphrase: &str) -> Result<bool> {
        match self.actor.get_messages(passphrase, None).await {
            Ok(_) => Ok(true),
            Err(RemoteError::Rejected(_)) => Ok(false),
            Err(err @ RemoteError::Transport(_)) => Err(err.into()),
        }
    }

    pub async fn change_passphrase(&self, ctx: &ChatContext, new_passphrase: &str) -> Result<()> {
        if new_passphrase.trim().is_empty() {
            return Err(ChatError::Config("new password must not be empty".to_string()));
        }
        self.actor
            .set_password(ctx.passphrase(), new_passphrase)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::remote::{Message, MemoryActor, RemoteActor, RemoteError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Wraps a [`MemoryActor`], counting fetches and optionally failing the
    /// next `n` of them with a transport error.
    #[derive(Default)]
    pub struct CountingActor {
        pub inner: MemoryActor,
        pub fetches: AtomicUsize,
        pub fail_next_fetches: AtomicUsize,
        pub fail_writes: AtomicBool,
    }

    impl CountingActor {
        pub fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn take_failure(&self) -> bool {
            self.fail_next_fetches
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }

        fn write_failure(&self) -> Result<(), RemoteError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(RemoteError::Transport("connection reset".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RemoteActor for CountingActor {
        async fn add_message(&self, password: &str, content: &str) -> Result<Message, RemoteError> {
            self.write_failure()?;
            self.inner.add_message(password, content).await
        }

        async fn clear_chat(&self, password: &str) -> Result<(), RemoteError> {
            self.write_failure()?;
            self.inner.clear_chat(password).await
        }

        async fn get_messages(
            &self,
            password: &str,
            since_message_id: Option<u64>,
        ) -> Result<Vec<Message>, RemoteError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.take_failure() {
                return Err(RemoteError::Transport("connection reset".to_string()));
            }
            self.inner.get_messages(password, since_message_id).await
        }

        async fn set_password(&self, old_password: &str, new_password: &str) -> Result<(), RemoteError> {
            self.write_failure()?;
            self.inner.set_password(old_password, new_password).await
        }
    }
}
