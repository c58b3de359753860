use super::{poller, ChatService};
use crate::event::AppEvent;
use crate::session::ChatContext;
use std::sync::mpsc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::debug;

/// UI-facing handle. Every call returns immediately; outcomes arrive later
/// as [`AppEvent`]s on the channel the UI drains each frame.
pub struct ChatClient {
    service: ChatService,
    tx: mpsc::Sender<AppEvent>,
    runtime_handle: Handle,
    poll_interval: Duration,
    poller: Option<JoinHandle<()>>,
}

impl ChatClient {
    pub fn new(
        service: ChatService,
        tx: mpsc::Sender<AppEvent>,
        runtime_handle: Handle,
        poll_interval: Duration,
    ) -> Self {
        Self {
            service,
            tx,
            runtime_handle,
            poll_interval,
            poller: None,
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn start_polling(&mut self, ctx: ChatContext) {
        self.stop_polling();
        self.poller = Some(poller::spawn(
            &self.runtime_handle,
            self.service.clone(),
            ctx,
            self.poll_interval,
            self.tx.clone(),
        ));
    }

    pub fn stop_polling(&mut self) {
        if let Some(handle) = self.poller.take() {
            handle.abort();
            debug!("message polling stopped");
        }
    }

    pub fn verify(&self, passphrase: String) {
        let tx = self.tx.clone();
        let service = self.service.clone();

        self.runtime_handle.spawn(async move {
            let result = service.verify_passphrase(&passphrase).await;
            let _ = tx.send(AppEvent::VerifyFinished { passphrase, result });
        });
    }

    pub fn send(&self, ctx: ChatContext, text: String) {
        let tx = self.tx.clone();
        let service = self.service.clone();

        self.runtime_handle.spawn(async move {
            let result = service.send_message(&ctx, &text).await;
            let _ = tx.send(AppEvent::SendFinished(result));
        });
    }

    pub fn clear(&self, ctx: ChatContext) {
        let tx = self.tx.clone();
        let service = self.service.clone();

        self.runtime_handle.spawn(async move {
            let result = service.clear_chat(&ctx).await;
            let _ = tx.send(AppEvent::ClearFinished(result));
        });
    }

    pub fn change_passphrase(&self, ctx: ChatContext, passphrase: String) {
        let tx = self.tx.clone();
        let service = self.service.clone();

        self.runtime_handle.spawn(async move {
            let result = service.change_passphrase(&ctx, &passphrase).await;
            let _ = tx.send(AppEvent::PassphraseChanged { passphrase, result });
        });
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        self.stop_polling();
    }
}
