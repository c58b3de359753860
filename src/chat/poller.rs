use super::ChatService;
use crate::event::AppEvent;
use crate::session::ChatContext;
use std::pin::pin;
use std::sync::mpsc;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, trace};

/// Drops a permit left by a mutation that finished while nothing was polling.
fn discard_pending_invalidation(invalidation: &Notify) {
    let notified = pin!(invalidation.notified());
    if notified.enable() {
        trace!("discarded stale invalidation");
    }
}

/// Refetches the full message list every `interval`, or sooner when the
/// service signals invalidation. The first fetch happens immediately.
pub fn spawn(
    runtime_handle: &Handle,
    service: ChatService,
    ctx: ChatContext,
    interval: Duration,
    tx: mpsc::Sender<AppEvent>,
) -> JoinHandle<()> {
    let invalidation = service.invalidation();
    discard_pending_invalidation(&invalidation);

    runtime_handle.spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(interval_ms = interval.as_millis() as u64, "message polling started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = invalidation.notified() => {
                    trace!("message list invalidated");
                    ticker.reset();
                }
            }

            let result = service.fetch_messages(&ctx).await;
            if tx.send(AppEvent::MessagesFetched(result)).is_err() {
                debug!("event channel closed, stopping message polling");
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::spawn;
    use crate::chat::test_support::CountingActor;
    use crate::chat::ChatService;
    use crate::event::AppEvent;
    use crate::identity::DeviceId;
    use crate::session::ChatContext;
    use std::sync::mpsc;
    use std::sync::Arc;
    use tokio::runtime::Handle;
    use tokio::time::{sleep, Duration};

    fn ctx() -> ChatContext {
        ChatContext::new("icp", DeviceId::new("device_1_abc"))
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_fixed_interval_until_aborted() {
        let actor = Arc::new(CountingActor::default());
        let service = ChatService::new(actor.clone());
        let (tx, rx) = mpsc::channel();

        let handle = spawn(
            &Handle::current(),
            service,
            ctx(),
            Duration::from_millis(3000),
            tx,
        );

        sleep(Duration::from_millis(6500)).await;
        assert_eq!(actor.fetch_count(), 3);
        let fetched = rx.try_iter().count();
        assert_eq!(fetched, 3);

        handle.abort();
        sleep(Duration::from_millis(1)).await;
        let after_abort = actor.fetch_count();
        sleep(Duration::from_secs(30)).await;
        assert_eq!(actor.fetch_count(), after_abort);
    }

    #[tokio::test(start_paused = true)]
    async fn send_triggers_refetch_before_next_tick() {
        let actor = Arc::new(CountingActor::default());
        let service = ChatService::new(actor.clone());
        let (tx, rx) = mpsc::channel();

        let handle = spawn(
            &Handle::current(),
            service.clone(),
            ctx(),
            Duration::from_millis(3000),
            tx,
        );
        sleep(Duration::from_millis(100)).await;
        assert_eq!(actor.fetch_count(), 1);

        service
            .send_message(&ctx(), "hello")
            .await
            .expect("send should succeed");
        sleep(Duration::from_millis(100)).await;
        assert_eq!(actor.fetch_count(), 2);

        let last = rx.try_iter().last().expect("poller should have published");
        match last {
            AppEvent::MessagesFetched(Ok(messages)) => assert_eq!(messages.len(), 1),
            other => panic!("unexpected event: {other:?}"),
        }
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn mutation_without_poller_does_not_double_fetch_on_start() {
        let actor = Arc::new(CountingActor::default());
        let service = ChatService::new(actor.clone());
        service
            .send_message(&ctx(), "sent while locked")
            .await
            .expect("send should succeed");

        let (tx, rx) = mpsc::channel();
        let handle = spawn(
            &Handle::current(),
            service,
            ctx(),
            Duration::from_millis(3000),
            tx,
        );
        sleep(Duration::from_millis(100)).await;
        assert_eq!(actor.fetch_count(), 1);
        assert_eq!(rx.try_iter().count(), 1);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_receiver_is_dropped() {
        let actor = Arc::new(CountingActor::default());
        let (tx, rx) = mpsc::channel();
        drop(rx);

        let handle = spawn(
            &Handle::current(),
            ChatService::new(actor.clone()),
            ctx(),
            Duration::from_millis(3000),
            tx,
        );
        sleep(Duration::from_millis(10_000)).await;
        assert!(handle.is_finished());
        assert_eq!(actor.fetch_count(), 1);
    }
}
