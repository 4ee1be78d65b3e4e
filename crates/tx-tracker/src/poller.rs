//! Polls the assets service for the state of one operation.

use std::sync::Arc;

use bitcoin::Txid;
use rgbpp_rpc::{errors::ServiceError, traits::AssetsService, types::TransactionState};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::PollerConfig,
    errors::{PollError, PollResult},
    event::PollEvent,
    subscription::Subscription,
};

/// Buffer slots kept for state changes, one per state rank.
const STATE_EVENT_SLOTS: usize = 5;

/// Follows operations by the txid of their binding transaction.
///
/// The reported state never moves backwards: an answer ranking below the current state is
/// dropped. A missing proof counts as [`TransactionState::AwaitingProof`] and is retried without
/// an error event.
#[derive(Debug)]
pub struct StatePoller<A> {
    service: Arc<A>,

    config: PollerConfig,
}

impl<A> Clone for StatePoller<A> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            config: self.config,
        }
    }
}

impl<A: AssetsService + 'static> StatePoller<A> {
    /// Creates a poller asking `service`.
    pub const fn new(service: Arc<A>, config: PollerConfig) -> Self {
        Self { service, config }
    }

    /// Polls until the operation reaches a terminal state, which is returned.
    ///
    /// A [`TransactionState::Failed`] state is returned as is; see
    /// [`IntoPollResult`](crate::errors::IntoPollResult) to turn it into an error.
    pub async fn poll_state(
        &self,
        btc_txid: Txid,
        cancel: CancellationToken,
    ) -> PollResult<TransactionState> {
        self.run(btc_txid, cancel, None).await
    }

    /// Polls on a background task, publishing every state change and lookup error.
    ///
    /// The task resolves to the same value [`poll_state`](Self::poll_state) would. The event
    /// buffer is bounded by [`PollerConfig::event_buffer`]. State changes always fit, lookup
    /// errors are dropped while a subscriber lags behind.
    pub fn spawn(
        &self,
        btc_txid: Txid,
        cancel: CancellationToken,
    ) -> (Subscription<PollEvent>, JoinHandle<PollResult<TransactionState>>) {
        let capacity = self.config.event_buffer.max(STATE_EVENT_SLOTS + 1);
        let (sender, receiver) = mpsc::channel(capacity);
        let poller = self.clone();

        let handle = tokio::spawn(async move { poller.run(btc_txid, cancel, Some(sender)).await });

        (Subscription::from_receiver(receiver), handle)
    }

    async fn run(
        &self,
        btc_txid: Txid,
        cancel: CancellationToken,
        events: Option<mpsc::Sender<PollEvent>>,
    ) -> PollResult<TransactionState> {
        let publish = |event: PollEvent| {
            let Some(events) = &events else {
                return;
            };

            if matches!(event, PollEvent::Error(_)) && events.capacity() <= STATE_EVENT_SLOTS {
                debug!(%btc_txid, "event buffer is full, dropping lookup error");
                return;
            }

            // nobody listening is fine
            if let Err(TrySendError::Full(event)) = events.try_send(event) {
                warn!(%btc_txid, ?event, "event buffer overflow");
            }
        };

        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut current = TransactionState::Preparing;
        let mut attempts = 0u32;
        publish(PollEvent::State(current.clone()));

        info!(%btc_txid, "polling transaction state");

        loop {
            if self
                .config
                .max_attempts
                .is_some_and(|max_attempts| attempts >= max_attempts)
            {
                warn!(%btc_txid, %attempts, state = %current, "giving up on transaction");
                return Err(PollError::AttemptsExhausted {
                    attempts,
                    last: current,
                });
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(%btc_txid, "polling cancelled");
                    return Err(PollError::Cancelled);
                }
                _ = interval.tick() => {}
            }

            attempts += 1;

            let observed = match self.service.get_transaction_job(btc_txid).await {
                Ok(job) => job.transaction_state(),
                Err(ServiceError::ProofNotReady) => TransactionState::AwaitingProof,
                Err(err) => {
                    warn!(%btc_txid, %err, %attempts, "could not fetch transaction job");
                    publish(PollEvent::Error(err));
                    continue;
                }
            };

            if observed.rank() <= current.rank() {
                if observed != current {
                    debug!(%btc_txid, %observed, %current, "ignoring stale state");
                }
                continue;
            }

            info!(%btc_txid, from = %current, to = %observed, "transaction state changed");
            current = observed;
            publish(PollEvent::State(current.clone()));

            if current.is_terminal() {
                return Ok(current);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Once, time::Duration};

    use futures::StreamExt;
    use rgbpp_common::logging::{self, LoggerConfig};
    use rgbpp_rpc::types::{ServiceJob, ServiceJobState};
    use rgbpp_test_utils::{
        cells::txid,
        mocks::{job, MockAssetsService},
    };

    use super::*;
    use crate::errors::IntoPollResult;

    fn init_logging() {
        static INIT: Once = Once::new();
        INIT.call_once(|| logging::init(LoggerConfig::new("rgbpp-tx-tracker-tests".to_string())));
    }

    fn poller(
        service: MockAssetsService,
        config: PollerConfig,
    ) -> (Arc<MockAssetsService>, StatePoller<MockAssetsService>) {
        init_logging();
        let service = Arc::new(service);
        (service.clone(), StatePoller::new(service, config))
    }

    fn config() -> PollerConfig {
        PollerConfig::default().with_interval(Duration::from_secs(5))
    }

    #[tokio::test(start_paused = true)]
    async fn missing_proof_is_retried_until_completion() {
        let responses = (0..5)
            .map(|_| Err(ServiceError::ProofNotReady))
            .chain([Ok(job(ServiceJobState::Completed))]);
        let (service, poller) = poller(
            MockAssetsService::new().with_job_responses(responses),
            config(),
        );

        let (events, handle) = poller.spawn(txid(0x01), CancellationToken::new());
        let state = handle.await.unwrap().unwrap();
        let events: Vec<_> = events.collect().await;

        assert_eq!(state, TransactionState::Completed);
        assert_eq!(service.job_queries(), 6);
        assert_eq!(
            events,
            vec![
                PollEvent::State(TransactionState::Preparing),
                PollEvent::State(TransactionState::AwaitingProof),
                PollEvent::State(TransactionState::Completed),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn state_never_moves_backwards() {
        let (_, poller) = poller(
            MockAssetsService::new().with_job_responses([
                Ok(job(ServiceJobState::Active)),
                Ok(job(ServiceJobState::Waiting)),
                Err(ServiceError::ProofNotReady),
                Ok(job(ServiceJobState::Completed)),
            ]),
            config(),
        );

        let (events, handle) = poller.spawn(txid(0x02), CancellationToken::new());
        assert_eq!(handle.await.unwrap(), Ok(TransactionState::Completed));

        let events: Vec<_> = events.collect().await;
        assert_eq!(
            events,
            vec![
                PollEvent::State(TransactionState::Preparing),
                PollEvent::State(TransactionState::Finalizing),
                PollEvent::State(TransactionState::Completed),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_errors_are_published_and_polling_goes_on() {
        let unavailable = ServiceError::Status {
            status: 503,
            message: "unavailable".to_string(),
        };
        let (_, poller) = poller(
            MockAssetsService::new().with_job_responses([
                Err(unavailable.clone()),
                Ok(job(ServiceJobState::Completed)),
            ]),
            config(),
        );

        let (events, handle) = poller.spawn(txid(0x03), CancellationToken::new());
        assert_eq!(handle.await.unwrap(), Ok(TransactionState::Completed));

        let events: Vec<_> = events.collect().await;
        assert!(events.contains(&PollEvent::Error(unavailable)));
        assert_eq!(
            events.last(),
            Some(&PollEvent::State(TransactionState::Completed))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_job_is_terminal() {
        let failed = ServiceJob {
            state: ServiceJobState::Failed,
            attempts: 3,
            failed_reason: Some("CKB tx rejected".to_string()),
        };
        let (_, poller) = poller(
            MockAssetsService::new().with_job_responses([Ok(failed)]),
            config(),
        );

        let state = poller
            .poll_state(txid(0x04), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            state,
            TransactionState::Failed("CKB tx rejected".to_string())
        );
        assert_eq!(
            state.into_result(),
            Err(PollError::StateTerminalFailed("CKB tx rejected".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let (service, poller) = poller(MockAssetsService::new(), config().with_max_attempts(3));

        let err = poller
            .poll_state(txid(0x05), CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            PollError::AttemptsExhausted {
                attempts: 3,
                last: TransactionState::AwaitingProof,
            }
        );
        assert_eq!(service.job_queries(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_polling() {
        let (service, poller) = poller(MockAssetsService::new(), config());
        let cancel = CancellationToken::new();

        let (mut events, handle) = poller.spawn(txid(0x06), cancel.clone());

        assert_eq!(
            events.next().await,
            Some(PollEvent::State(TransactionState::Preparing))
        );
        assert_eq!(
            events.next().await,
            Some(PollEvent::State(TransactionState::AwaitingProof))
        );

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), Err(PollError::Cancelled));
        assert!(service.job_queries() >= 1);
        assert_eq!(events.backlog(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn lagging_subscriber_keeps_a_bounded_backlog() {
        let unavailable = ServiceError::Status {
            status: 503,
            message: "unavailable".to_string(),
        };
        let responses = (0..100)
            .map(|_| Err(unavailable.clone()))
            .chain([Ok(job(ServiceJobState::Completed))]);
        let (service, poller) = poller(
            MockAssetsService::new().with_job_responses(responses),
            config().with_event_buffer(8),
        );

        let (events, handle) = poller.spawn(txid(0x07), CancellationToken::new());
        assert_eq!(handle.await.unwrap(), Ok(TransactionState::Completed));
        assert_eq!(service.job_queries(), 101);
        assert!(events.backlog() <= 8);

        let events: Vec<_> = events.collect().await;
        assert_eq!(events.first(), Some(&PollEvent::State(TransactionState::Preparing)));
        assert_eq!(
            events.last(),
            Some(&PollEvent::State(TransactionState::Completed))
        );
        assert!(events.contains(&PollEvent::Error(unavailable)));
    }
}
