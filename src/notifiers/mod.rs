// SPDX-License-Identifier: Apache-2.0

//! Alert delivery: the notifier capability and the dispatcher task that
//! fans matches out to every configured chat destination.

pub mod telegram;

pub use telegram::{TelegramConfig, TelegramNotifier};

use std::path::PathBuf;

use async_trait::async_trait;
use http::StatusCode;
use thiserror::Error;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bounded_channel::BoundedReceiver;

/// A keyword match ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// File the matching line was read from
    pub source: PathBuf,
    /// The keyword that matched
    pub keyword: String,
    /// The truncated message to deliver
    pub message: String,
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("invalid api endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("failed to build request: {0}")]
    Request(#[from] http::Error),

    #[error("http transport error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("failed reading response body: {0}")]
    Body(#[from] hyper::Error),

    #[error("api returned status {0}")]
    Api(StatusCode),
}

/// Capability for delivering a text message to a single chat destination.
///
/// Implementations perform the network call; retry or backoff policy, if
/// any, belongs to them. The dispatcher treats every failure as non-fatal.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat: &str, text: &str) -> Result<(), NotifyError>;
}

/// Drains the alert channel and delivers each alert to every configured
/// chat. Delivery to each chat is independent: a failure is logged and the
/// remaining chats still receive the alert.
pub struct AlertDispatcher<N> {
    rx: BoundedReceiver<Alert>,
    notifier: N,
    chats: Vec<String>,
}

impl<N: Notifier> AlertDispatcher<N> {
    pub fn new(rx: BoundedReceiver<Alert>, notifier: N, chats: Vec<String>) -> Self {
        Self {
            rx,
            notifier,
            chats,
        }
    }

    pub async fn run(&mut self, cancel_token: CancellationToken) {
        loop {
            select! {
                alert = self.rx.next() => match alert {
                    Some(alert) => self.fan_out(alert).await,
                    None => break,
                },
                _ = cancel_token.cancelled() => break,
            }
        }
        debug!("exiting alert dispatcher")
    }

    async fn fan_out(&self, alert: Alert) {
        for chat in &self.chats {
            match self.notifier.send(chat, &alert.message).await {
                Ok(()) => {
                    debug!(
                        chat = chat.as_str(),
                        keyword = alert.keyword.as_str(),
                        source = ?alert.source,
                        "alert delivered"
                    );
                }
                Err(e) => {
                    warn!(
                        chat = chat.as_str(),
                        source = ?alert.source,
                        error = %e,
                        "failed to deliver alert"
                    );
                }
            }
        }
    }
}
