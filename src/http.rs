//! Shared HTTP client construction for the outbound services

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};

pub const USER_AGENT: &str = concat!("Panchangam/", env!("CARGO_PKG_VERSION"));

/// Client with a request timeout and retries on transient failures
pub fn build_client(timeout: Duration, max_retries: u32) -> Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .with_context(|| "Failed to create HTTP client")?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Hide credential query parameters before a URL reaches the logs
#[must_use]
pub fn redact(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let query: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if matches!(key, "key" | "api_key" | "token") => format!("{key}=***"),
            _ => pair.to_string(),
        })
        .collect();
    format!("{base}?{}", query.join("&"))
}

/// Error text for a failed request, without the request URL
#[must_use]
pub fn request_error(error: reqwest_middleware::Error) -> String {
    match error {
        reqwest_middleware::Error::Reqwest(e) => e.without_url().to_string(),
        reqwest_middleware::Error::Middleware(e) => redact_text(&format!("{e:#}")),
    }
}

/// Error text for a response body that failed to decode, without the URL
#[must_use]
pub fn decode_error(error: reqwest::Error) -> String {
    error.without_url().to_string()
}

/// Redact every URL-looking token in free text
fn redact_text(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            if word.contains("://") {
                redact(word)
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
