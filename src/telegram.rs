//! Telegram Bot API transport
//!
//! Long-polls `getUpdates`, hands every message to the flow controller on its
//! own task and delivers the replies.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::config::TelegramConfig;
use crate::conversation::{FlowController, Inbound, Reply, SessionId};
use crate::http::USER_AGENT;

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Bot API response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        if !self.ok {
            return Err(anyhow!(
                "{method} failed: {}",
                self.description.unwrap_or_else(|| "no description".to_string())
            ));
        }
        self.result
            .ok_or_else(|| anyhow!("{method} returned no result"))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: SessionId,
}

impl Message {
    /// Commands start with `/`, optionally addressed as `/cmd@BotName`
    #[must_use]
    pub fn classify(&self) -> Inbound {
        let Some(text) = self.text.as_deref() else {
            return Inbound::Other;
        };
        match text.strip_prefix('/') {
            Some(command) => {
                let name = command.split_whitespace().next().unwrap_or_default();
                let name = name.split('@').next().unwrap_or_default();
                Inbound::Command(name.to_lowercase())
            }
            None => Inbound::Text(text.to_string()),
        }
    }
}

pub struct TelegramClient {
    client: Client,
    /// `{api_base_url}/bot{token}`; never logged
    endpoint: String,
    poll_timeout: u32,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig, token: &str) -> Result<Self> {
        // Long polls hold the connection for the whole poll timeout
        let timeout = Duration::from_secs(u64::from(config.poll_timeout_seconds) + 15);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .with_context(|| "Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}", config.api_base_url.trim_end_matches('/'), token),
            poll_timeout: config.poll_timeout_seconds,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.endpoint, method)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T> {
        let response: ApiResponse<T> = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("{method} request failed: {}", e.without_url()))?
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse {method} response: {}", e.without_url()))?;
        response.into_result(method)
    }

    /// Updates after `offset`, waiting up to the poll timeout for new ones
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": self.poll_timeout,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    #[instrument(skip(self, text))]
    pub async fn send_message(&self, chat_id: SessionId, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, caption))]
    pub async fn send_photo(
        &self,
        chat_id: SessionId,
        image: &Path,
        caption: Option<&str>,
    ) -> Result<()> {
        let bytes = tokio::fs::read(image)
            .await
            .with_context(|| format!("Failed to read {}", image.display()))?;
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "panchangam.png".to_string());

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("photo", Part::bytes(bytes).file_name(file_name).mime_str("image/png")?);
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let response: ApiResponse<serde_json::Value> = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| anyhow!("sendPhoto request failed: {}", e.without_url()))?
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse sendPhoto response: {}", e.without_url()))?;
        response.into_result("sendPhoto").map(|_| ())
    }

    /// Send every reply in order; photos are deleted once sent
    pub async fn deliver(&self, chat_id: SessionId, replies: Vec<Reply>) {
        for reply in replies {
            let sent = match reply {
                Reply::Text(text) => self.send_message(chat_id, &text).await,
                Reply::Photo { artifact, caption } => {
                    self.send_photo(chat_id, artifact.path(), caption.as_deref())
                        .await
                }
            };
            if let Err(e) = sent {
                error!("Failed to deliver reply to chat {}: {:#}", chat_id, e);
            }
        }
    }
}

/// Poll for updates until Ctrl-C
pub async fn run_bot(
    client: Arc<TelegramClient>,
    controller: Arc<FlowController>,
    sweep_interval: Duration,
) -> Result<()> {
    let sweeper = {
        let controller = controller.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            loop {
                ticker.tick().await;
                controller.evict_idle().await;
            }
        })
    };

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut offset = 0;
    let mut backoff = Duration::from_secs(1);
    info!("Bot is polling for updates");

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
            polled = client.get_updates(offset) => match polled {
                Ok(updates) => {
                    backoff = Duration::from_secs(1);
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let Some(message) = update.message else {
                            continue;
                        };
                        let chat_id = message.chat.id;
                        let inbound = message.classify();
                        debug!("Update {} from chat {}: {:?}", update.update_id, chat_id, inbound);

                        let client = client.clone();
                        let controller = controller.clone();
                        tokio::spawn(async move {
                            let replies = controller.handle(chat_id, inbound).await;
                            client.deliver(chat_id, replies).await;
                        });
                    }
                }
                Err(e) => {
                    warn!("Polling failed, retrying in {}s: {:#}", backoff.as_secs(), e);
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }

    sweeper.abort();
    Ok(())
}
