//! Request flow controller
//!
//! A two-state conversation per chat: `/panchangam` opens a session awaiting
//! a location, the next text runs the pipeline. Lookup failures keep the
//! session open, every other outcome closes it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::PipelineError;
use crate::pipeline::{Pipeline, PipelineOutput};
use crate::render::RenderedArtifact;

/// Telegram chat identifier
pub type SessionId = i64;

pub const START_COMMAND: &str = "panchangam";
pub const HELP_COMMAND: &str = "help";

pub const LOCATION_PROMPT: &str = "Please enter your location (Vijayawada):";
pub const HELP_MESSAGE: &str = "This is the help message. Send /panchangam and then your location \
     to receive today's Panchangam table with local sunrise and sunset times.";
pub const DEFAULT_REPLY: &str = "You sent a text message.";
pub const EXPIRED_MESSAGE: &str = "Your request expired. Send /panchangam to start again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    AwaitingLocation,
    Complete,
}

impl ConversationState {
    /// State after a pipeline run finished with `result`
    #[must_use]
    pub fn after<T>(result: &Result<T, PipelineError>) -> Self {
        match result {
            Err(e) if e.is_retryable() => ConversationState::AwaitingLocation,
            _ => ConversationState::Complete,
        }
    }
}

/// What arrived from a chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A bot command without the leading slash
    Command(String),
    Text(String),
    /// Stickers, photos, locations and the like
    Other,
}

/// What to send back
#[derive(Debug)]
pub enum Reply {
    Text(String),
    Photo {
        artifact: RenderedArtifact,
        caption: Option<String>,
    },
}

#[derive(Debug)]
struct Session {
    state: ConversationState,
    last_activity: Instant,
}

#[derive(Debug, Default)]
struct Sessions {
    active: HashMap<SessionId, Session>,
    /// Evicted sessions and when they were evicted
    expired: HashMap<SessionId, Instant>,
}

pub struct FlowController {
    pipeline: Pipeline,
    sessions: Mutex<Sessions>,
    idle_timeout: Duration,
}

impl FlowController {
    #[must_use]
    pub fn new(pipeline: Pipeline, idle_timeout: Duration) -> Self {
        Self {
            pipeline,
            sessions: Mutex::new(Sessions::default()),
            idle_timeout,
        }
    }

    /// Current state of a chat, `None` when no session is open
    pub async fn state(&self, session: SessionId) -> Option<ConversationState> {
        self.sessions
            .lock()
            .await
            .active
            .get(&session)
            .map(|s| s.state)
    }

    #[instrument(skip(self, inbound))]
    pub async fn handle(&self, session: SessionId, inbound: Inbound) -> Vec<Reply> {
        match inbound {
            Inbound::Command(name) => self.on_command(session, &name).await,
            Inbound::Text(text) => self.on_text(session, &text).await,
            Inbound::Other => {
                debug!("Ignoring non-text message");
                Vec::new()
            }
        }
    }

    async fn on_command(&self, session: SessionId, name: &str) -> Vec<Reply> {
        match name {
            START_COMMAND => {
                let mut sessions = self.sessions.lock().await;
                sessions.expired.remove(&session);
                sessions.active.insert(
                    session,
                    Session {
                        state: ConversationState::AwaitingLocation,
                        last_activity: Instant::now(),
                    },
                );
                info!("Session opened");
                vec![Reply::Text(LOCATION_PROMPT.to_string())]
            }
            HELP_COMMAND => vec![Reply::Text(HELP_MESSAGE.to_string())],
            _ => vec![Reply::Text(DEFAULT_REPLY.to_string())],
        }
    }

    async fn on_text(&self, session: SessionId, text: &str) -> Vec<Reply> {
        // The session stays checked out while the pipeline runs
        {
            let mut sessions = self.sessions.lock().await;
            match sessions.active.remove(&session) {
                Some(open) if open.last_activity.elapsed() > self.idle_timeout => {
                    info!("Session expired before the location arrived");
                    return vec![Reply::Text(EXPIRED_MESSAGE.to_string())];
                }
                Some(_) => {}
                None => {
                    let reply = if sessions.expired.remove(&session).is_some() {
                        EXPIRED_MESSAGE
                    } else {
                        DEFAULT_REPLY
                    };
                    return vec![Reply::Text(reply.to_string())];
                }
            }
        }

        let result = self.pipeline.run(&session.to_string(), text).await;
        let next = ConversationState::after(&result);

        if next == ConversationState::AwaitingLocation {
            self.sessions.lock().await.active.insert(
                session,
                Session {
                    state: next,
                    last_activity: Instant::now(),
                },
            );
        }

        match result {
            Ok(PipelineOutput {
                location,
                times,
                artifact,
            }) => {
                info!("Session complete for {}", location.name);
                vec![Reply::Photo {
                    artifact,
                    caption: Some(format!("{}\n{}", location.name, times.summary())),
                }]
            }
            Err(e) => {
                if e.is_retryable() {
                    info!("Lookup failed, prompting again: {}", e);
                } else {
                    warn!("Session ended with error: {}", e);
                }
                vec![Reply::Text(e.user_message())]
            }
        }
    }

    /// Drop sessions idle for longer than the timeout; returns how many
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;

        let stale: Vec<SessionId> = sessions
            .active
            .iter()
            .filter(|(_, s)| now.duration_since(s.last_activity) > self.idle_timeout)
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            sessions.active.remove(id);
            sessions.expired.insert(*id, now);
        }

        // Forget evictions older than one more idle period
        let idle_timeout = self.idle_timeout;
        sessions
            .expired
            .retain(|_, evicted| now.duration_since(*evicted) <= idle_timeout);

        if !stale.is_empty() {
            info!("Evicted {} idle sessions", stale.len());
        }
        stale.len()
    }
}
