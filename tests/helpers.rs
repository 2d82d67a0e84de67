#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use brochure::config::{ProviderConfig, ProviderKind};
use brochure::providers::{HttpTransport, ProviderClient};
use brochure::retry::{RetryPolicy, Sleeper};

pub const OPENAI_KEY: &str = "sk-test-0123456789abcdefgh";
pub const ANTHROPIC_KEY: &str = "sk-ant-test-0123456789abcd";

/// Records requested backoff delays instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub fn instant_retry(max_retries: u32) -> (RetryPolicy, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let policy = RetryPolicy::new(max_retries).with_sleeper(sleeper.clone());
    (policy, sleeper)
}

pub fn provider_client(
    kind: ProviderKind,
    base_url: &str,
    max_retries: u32,
) -> (ProviderClient, Arc<RecordingSleeper>) {
    let api_key = match kind {
        ProviderKind::OpenAi => OPENAI_KEY,
        ProviderKind::Anthropic => ANTHROPIC_KEY,
    };
    let config = ProviderConfig {
        kind,
        api_key: api_key.to_string(),
        model: "test-model".to_string(),
        max_retries,
    };
    let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
    let (retry, sleeper) = instant_retry(max_retries);

    let client = ProviderClient::new(config, Arc::new(transport))
        .unwrap()
        .with_base_url(base_url)
        .with_retry_policy(retry);
    (client, sleeper)
}

pub fn html_page(title: &str, body: &str) -> String {
    format!("<html><head><title>{title}</title></head><body>{body}</body></html>")
}
