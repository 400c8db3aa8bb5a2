//! Block-confirmation state machine.
//!
//! One waiter runs per `hashblock` delivery: after a start delay it polls
//! the indexing service's status until the service reports the target block
//! hash as its latest parsed block, then fetches that block's protocol
//! messages by index and fires them through the registry. States:
//! `Polling → Found → Fetching → Delivered`.
//!
//! Mismatches and RPC errors both consume poll attempts; errors sleep the
//! exponential error backoff instead of the plain interval. An exhausted
//! attempt budget is a distinct terminal failure. A fetch error is fatal to
//! this task only — the relay loop and sibling tasks are unaffected.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chainrelay_core::error::RpcError;
use chainrelay_core::indexer::{IndexingApi, LastBlock, ProtocolMessage};
use chainrelay_core::notify::{NotifierRegistry, RelayEvent};

use crate::config::ConfirmConfig;

/// Where a confirmation task currently is. Used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfirmState {
    Polling,
    Found,
    Fetching,
    Delivered,
}

impl std::fmt::Display for ConfirmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Polling => "polling",
            Self::Found => "found",
            Self::Fetching => "fetching",
            Self::Delivered => "delivered",
        };
        f.write_str(s)
    }
}

/// Terminal failure of one confirmation task. Never crosses into the relay
/// loop.
#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("indexing service did not confirm block {block_hash} within {polls} polls")]
    DeadlineExceeded { block_hash: String, polls: u32 },

    #[error("message fetch for block {block_hash} failed: {source}")]
    Fetch {
        block_hash: String,
        #[source]
        source: RpcError,
    },

    #[error("confirmation for block {block_hash} cancelled")]
    Cancelled { block_hash: String },
}

/// Waits for the indexing service to parse one block, then delivers its
/// protocol messages.
pub struct ConfirmationWaiter {
    api: Arc<dyn IndexingApi>,
    registry: Arc<NotifierRegistry>,
    config: ConfirmConfig,
    cancel: CancellationToken,
}

impl ConfirmationWaiter {
    pub fn new(
        api: Arc<dyn IndexingApi>,
        registry: Arc<NotifierRegistry>,
        config: ConfirmConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            registry,
            config,
            cancel,
        }
    }

    /// Drive the state machine to completion for one block hash.
    pub async fn run(&self, block_hash: &str) -> Result<(), ConfirmError> {
        self.sleep(self.config.start_delay(), block_hash).await?;

        debug!(block_hash, state = %ConfirmState::Polling, "waiting for indexing service");
        let last = self.poll(block_hash).await?;

        debug!(
            block_hash,
            block_index = last.block_index,
            state = %ConfirmState::Fetching,
            "block confirmed, fetching messages"
        );
        let blocks = self
            .race_cancel(self.api.blocks(&[last.block_index]), block_hash)
            .await?
            .map_err(|e| ConfirmError::Fetch {
                block_hash: block_hash.into(),
                source: e,
            })?;

        let messages: Vec<ProtocolMessage> = blocks
            .into_iter()
            .flat_map(|b| b.messages)
            .map(ProtocolMessage::decode_bindings)
            .collect();

        info!(
            block_hash,
            messages = messages.len(),
            state = %ConfirmState::Delivered,
            "protocol messages delivered"
        );
        self.registry.fire(&RelayEvent::ProtocolMessages { messages });
        Ok(())
    }

    /// Poll the status endpoint until it reports the target block hash.
    async fn poll(&self, block_hash: &str) -> Result<LastBlock, ConfirmError> {
        let mut polls = 0u32;
        let mut consecutive_errors = 0u32;

        loop {
            let result = self
                .race_cancel(self.api.running_info(), block_hash)
                .await?;
            polls += 1;

            match result {
                Ok(info) => {
                    consecutive_errors = 0;
                    if let Some(last) = info.last_block {
                        if last.block_hash == block_hash {
                            debug!(block_hash, polls, state = %ConfirmState::Found, "status matched");
                            return Ok(last);
                        }
                    }
                    if !self.config.within_budget(polls) {
                        return Err(ConfirmError::DeadlineExceeded {
                            block_hash: block_hash.into(),
                            polls,
                        });
                    }
                    self.sleep(self.config.poll_interval(), block_hash).await?;
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(block_hash, polls, error = %e, "status poll failed, backing off");
                    if !self.config.within_budget(polls) {
                        return Err(ConfirmError::DeadlineExceeded {
                            block_hash: block_hash.into(),
                            polls,
                        });
                    }
                    self.sleep(self.config.error_backoff.delay(consecutive_errors), block_hash)
                        .await?;
                }
            }
        }
    }

    async fn sleep(&self, duration: Duration, block_hash: &str) -> Result<(), ConfirmError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ConfirmError::Cancelled {
                block_hash: block_hash.into(),
            }),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    async fn race_cancel<T>(
        &self,
        fut: impl Future<Output = T>,
        block_hash: &str,
    ) -> Result<T, ConfirmError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ConfirmError::Cancelled {
                block_hash: block_hash.into(),
            }),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackoffConfig;
    use async_trait::async_trait;
    use chainrelay_core::error::NotifyError;
    use chainrelay_core::indexer::{ParsedBlock, RunningInfo};
    use chainrelay_core::notify::{EventKind, Notifier};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Status script: each poll consumes the next item; the last item
    /// repeats once the script is exhausted.
    enum StatusStep {
        Info(RunningInfo),
        Fail,
    }

    struct ScriptedApi {
        script: Vec<StatusStep>,
        cursor: AtomicUsize,
        fetch_calls: Mutex<Vec<Vec<u64>>>,
        fetch_result: Result<Vec<ParsedBlock>, ()>,
    }

    impl ScriptedApi {
        fn new(script: Vec<StatusStep>, fetch_result: Result<Vec<ParsedBlock>, ()>) -> Self {
            Self {
                script,
                cursor: AtomicUsize::new(0),
                fetch_calls: Mutex::new(vec![]),
                fetch_result,
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetch_calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl IndexingApi for ScriptedApi {
        async fn running_info(&self) -> Result<RunningInfo, RpcError> {
            let i = self.cursor.fetch_add(1, Ordering::Relaxed);
            let step = &self.script[i.min(self.script.len() - 1)];
            match step {
                StatusStep::Info(info) => Ok(info.clone()),
                StatusStep::Fail => Err(RpcError::Http("connection refused".into())),
            }
        }

        async fn blocks(&self, block_indexes: &[u64]) -> Result<Vec<ParsedBlock>, RpcError> {
            self.fetch_calls.lock().unwrap().push(block_indexes.to_vec());
            self.fetch_result
                .clone()
                .map_err(|_| RpcError::Http("fetch failed".into()))
        }
    }

    struct Recorder(Arc<Mutex<Vec<RelayEvent>>>);

    impl Notifier for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }
        fn notify(&self, event: &RelayEvent) -> Result<(), NotifyError> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn status(hash: &str, index: u64) -> StatusStep {
        StatusStep::Info(RunningInfo {
            last_block: Some(LastBlock {
                block_index: index,
                block_hash: hash.into(),
            }),
        })
    }

    fn parsed_block(bindings: &str) -> ParsedBlock {
        ParsedBlock {
            block_index: Some(7),
            messages: vec![ProtocolMessage(json!({"bindings": bindings}))],
        }
    }

    fn make_waiter(
        api: Arc<ScriptedApi>,
        config: ConfirmConfig,
    ) -> (ConfirmationWaiter, Arc<Mutex<Vec<RelayEvent>>>) {
        let seen = Arc::new(Mutex::new(vec![]));
        let mut registry = NotifierRegistry::new();
        registry.register(
            EventKind::ProtocolMessages,
            Arc::new(Recorder(Arc::clone(&seen))),
        );
        let waiter = ConfirmationWaiter::new(
            api,
            Arc::new(registry),
            config,
            CancellationToken::new(),
        );
        (waiter, seen)
    }

    fn fast_config(max_polls: u32) -> ConfirmConfig {
        ConfirmConfig {
            start_delay_ms: 10,
            poll_interval_ms: 10,
            max_polls,
            error_backoff: BackoffConfig {
                initial_ms: 10,
                multiplier: 2.0,
                max_ms: 40,
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn match_on_third_poll_fetches_once() {
        let api = Arc::new(ScriptedApi::new(
            vec![
                status("other", 5),
                status("other", 6),
                status("ab12", 7),
            ],
            Ok(vec![parsed_block("{\"x\":1}")]),
        ));
        let (waiter, seen) = make_waiter(Arc::clone(&api), fast_config(10));

        waiter.run("ab12").await.unwrap();

        assert_eq!(api.fetch_count(), 1);
        assert_eq!(api.fetch_calls.lock().unwrap()[0], vec![7]);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        match &seen[0] {
            RelayEvent::ProtocolMessages { messages } => {
                assert_eq!(messages[0].0["bindings"], json!({"x": 1}));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_bindings_delivered_verbatim() {
        let api = Arc::new(ScriptedApi::new(
            vec![status("ab12", 7)],
            Ok(vec![parsed_block("not json")]),
        ));
        let (waiter, seen) = make_waiter(api, fast_config(10));

        waiter.run("ab12").await.unwrap();

        let seen = seen.lock().unwrap();
        match &seen[0] {
            RelayEvent::ProtocolMessages { messages } => {
                assert_eq!(messages[0].0["bindings"], "not json");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn never_matching_status_exhausts_budget() {
        let api = Arc::new(ScriptedApi::new(vec![status("other", 5)], Ok(vec![])));
        let (waiter, seen) = make_waiter(Arc::clone(&api), fast_config(5));

        let err = waiter.run("ab12").await.unwrap_err();

        match err {
            ConfirmError::DeadlineExceeded { polls, .. } => assert_eq!(polls, 5),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(api.fetch_count(), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rpc_errors_during_polling_are_retried() {
        let api = Arc::new(ScriptedApi::new(
            vec![StatusStep::Fail, StatusStep::Fail, status("ab12", 7)],
            Ok(vec![parsed_block("{}")]),
        ));
        let (waiter, seen) = make_waiter(Arc::clone(&api), fast_config(10));

        waiter.run("ab12").await.unwrap();

        assert_eq!(api.fetch_count(), 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_is_task_fatal() {
        let api = Arc::new(ScriptedApi::new(vec![status("ab12", 7)], Err(())));
        let (waiter, seen) = make_waiter(api, fast_config(10));

        let err = waiter.run("ab12").await.unwrap_err();

        assert!(matches!(err, ConfirmError::Fetch { .. }));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_the_task_quietly() {
        let api = Arc::new(ScriptedApi::new(vec![status("other", 5)], Ok(vec![])));
        let (mut waiter, seen) = make_waiter(api, fast_config(0));
        let cancel = CancellationToken::new();
        waiter.cancel = cancel.clone();

        let handle = tokio::spawn(async move { waiter.run("ab12").await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ConfirmError::Cancelled { .. }));
        assert!(seen.lock().unwrap().is_empty());
    }
}
