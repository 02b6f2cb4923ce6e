// SPDX-License-Identifier: Apache-2.0

//! Telegram bot API notifier.
//!
//! Delivers alerts as `sendMessage` calls: an HTTPS POST of a form-encoded
//! `chat_id`/`text` body to `<endpoint>/bot<token>/sendMessage`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, Request, Uri};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tracing::debug;
use url::form_urlencoded;

use super::{Notifier, NotifyError};

const DEFAULT_API_ENDPOINT: &str = "https://api.telegram.org";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Configuration for the Telegram notifier
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Base URL of the bot API
    pub api_endpoint: String,
    /// Bot token used to authenticate `sendMessage` calls
    pub bot_token: String,
    /// Chat ids to deliver alerts to, in configured order
    pub chats: Vec<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            bot_token: String::new(),
            chats: Vec::new(),
        }
    }
}

impl TelegramConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.api_endpoint.is_empty() {
            return Err("API endpoint must be specified".to_string());
        }

        if self.bot_token.is_empty() {
            return Err("Bot token must be specified".to_string());
        }

        if self.chats.is_empty() {
            return Err("At least one chat id must be specified".to_string());
        }

        Ok(())
    }
}

/// Notifier that posts alerts to the Telegram bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: HyperClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
    send_url: Uri,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self, NotifyError> {
        let send_url: Uri = format!(
            "{}/bot{}/sendMessage",
            config.api_endpoint.trim_end_matches('/'),
            config.bot_token
        )
        .parse()
        .map_err(|e| NotifyError::InvalidEndpoint(format!("{}: {}", config.api_endpoint, e)))?;

        Ok(Self {
            client: build_hyper_client(),
            send_url,
        })
    }

    fn build_request(&self, chat: &str, text: &str) -> Result<Request<Full<Bytes>>, NotifyError> {
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("chat_id", chat)
            .append_pair("text", text)
            .finish();

        let req = Request::builder()
            .method(Method::POST)
            .uri(self.send_url.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(Full::new(Bytes::from(body)))?;

        Ok(req)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat: &str, text: &str) -> Result<(), NotifyError> {
        let req = self.build_request(chat, text)?;

        let resp = self.client.request(req).await?;
        let status = resp.status();

        // The API reply is only interesting for diagnostics
        let body = resp.into_body().collect().await?.to_bytes();
        debug!(
            chat,
            status = status.as_u16(),
            response = %String::from_utf8_lossy(&body),
            "sendMessage response"
        );

        if !status.is_success() {
            return Err(NotifyError::Api(status));
        }

        Ok(())
    }
}

fn build_hyper_client() -> HyperClient<HttpsConnector<HttpConnector>, Full<Bytes>> {
    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();

    hyper_util::client::legacy::Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .timer(TokioTimer::new())
        .build::<_, Full<Bytes>>(https)
}
