// SPDX-License-Identifier: Apache-2.0

//! Agent wiring: resolves the configuration, builds the watcher, engine,
//! and dispatcher, and runs them until cancellation.

use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tower::BoxError;
use tracing::{debug, error, info, warn};

use crate::bounded_channel::{self, BoundedSender};
use crate::init::args::AgentRun;
use crate::init::wait;
use crate::notifiers::{Alert, AlertDispatcher, TelegramConfig, TelegramNotifier};
use crate::tailer::{TailConfig, TailEngine};
use crate::watcher::{FileWatcher, WatcherConfig, create_watcher};

/// Capacity of the engine -> dispatcher alert channel
const ALERT_QUEUE_SIZE: usize = 1_000;

/// How long to wait for the engine thread to observe cancellation and exit
const ENGINE_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to wait for the dispatcher to drain in-flight alerts
const DISPATCHER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Agent {
    args: Box<AgentRun>,
}

impl Agent {
    pub fn new(args: Box<AgentRun>) -> Self {
        Agent { args }
    }

    /// Run the agent until the cancellation token fires.
    ///
    /// Configuration validation happens first; an invalid configuration is
    /// the only error that aborts startup. Everything after that point is
    /// contained: file errors are retried and delivery failures are logged.
    pub async fn run(self, cancel_token: CancellationToken) -> Result<(), BoxError> {
        // Watcher events carry absolute paths, so the engine's path table
        // must hold absolute paths too.
        let files = self
            .args
            .file
            .iter()
            .map(|p| std::path::absolute(p))
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| -> BoxError { format!("failed to resolve file path: {}", e).into() })?;

        let tail_config = TailConfig {
            files,
            keywords: self.args.keyword.clone(),
            word_limit: self.args.words,
        };
        tail_config.validate().map_err(|e| -> BoxError { e.into() })?;

        let telegram_config = TelegramConfig {
            api_endpoint: self.args.api_endpoint.clone(),
            bot_token: self.args.bot_token.clone(),
            chats: self.args.chat_id.clone(),
        };
        telegram_config
            .validate()
            .map_err(|e| -> BoxError { e.into() })?;

        info!(
            files = ?tail_config.files,
            keywords = ?tail_config.keywords,
            words = tail_config.word_limit,
            chats = telegram_config.chats.len(),
            "Starting tailgram agent"
        );

        let (alerts_tx, alerts_rx) = bounded_channel::bounded::<Alert>(ALERT_QUEUE_SIZE);

        let notifier = TelegramNotifier::new(&telegram_config)?;

        let mut task_set: JoinSet<Result<(), BoxError>> = JoinSet::new();

        let dispatcher_cancel = cancel_token.clone();
        let chats = telegram_config.chats.clone();
        task_set.spawn(async move {
            let mut dispatcher = AlertDispatcher::new(alerts_rx, notifier, chats);
            dispatcher.run(dispatcher_cancel).await;
            Ok(())
        });

        let engine_handle = self.spawn_engine(&tail_config, alerts_tx, cancel_token.clone())?;

        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Agent cancelled, starting shutdown sequence");
            }
            res = wait::wait_for_any_task(&mut task_set) => {
                match res {
                    Ok(()) => warn!("Unexpected early exit of alert dispatcher"),
                    Err(e) => {
                        error!(error = %e, "Alert dispatcher failed");
                        cancel_token.cancel();
                        let _ = self.join_engine(engine_handle).await;
                        return Err(e);
                    }
                }
            }
        }

        // Engine first: it observes the token within its event wait interval
        // and drops the alert sender, letting the dispatcher drain and exit.
        self.join_engine(engine_handle).await?;

        wait::wait_for_tasks_with_timeout(&mut task_set, DISPATCHER_DRAIN_TIMEOUT).await?;

        info!("Agent stopped");
        Ok(())
    }

    /// Build the watcher and start the engine on its own OS thread.
    fn spawn_engine(
        &self,
        tail_config: &TailConfig,
        alerts_tx: BoundedSender<Alert>,
        cancel: CancellationToken,
    ) -> Result<std::thread::JoinHandle<()>, BoxError> {
        let watcher_config = WatcherConfig {
            mode: self.args.watch_mode,
            ..Default::default()
        };

        let mut watcher = create_watcher(&watcher_config, &[])?;
        for path in &tail_config.files {
            if let Err(e) = watcher.watch(path) {
                // The file may appear later; poll mode will pick it up, and
                // an unwatchable parent directory is worth knowing about.
                warn!(file = ?path, error = %e, "Failed to watch file");
            }
        }

        info!(
            backend = watcher.backend_name(),
            native = watcher.is_native(),
            "File watcher initialized"
        );

        let engine = TailEngine::new(tail_config, alerts_tx);
        Ok(std::thread::spawn(move || engine.run(watcher, cancel)))
    }

    /// Join the engine thread without blocking the runtime.
    async fn join_engine(&self, handle: std::thread::JoinHandle<()>) -> Result<(), BoxError> {
        let join_result = timeout(
            ENGINE_JOIN_TIMEOUT,
            tokio::task::spawn_blocking(move || handle.join()),
        )
        .await;

        match join_result {
            Ok(Ok(Ok(()))) => {
                debug!("Engine thread joined successfully");
                Ok(())
            }
            Ok(Ok(Err(_))) => {
                error!("Engine thread panicked");
                Err("engine thread panicked".into())
            }
            Ok(Err(e)) => {
                error!("Failed to join engine thread: {}", e);
                Err(e.into())
            }
            Err(_) => {
                warn!("Timeout waiting for engine thread to join");
                Ok(())
            }
        }
    }
}
