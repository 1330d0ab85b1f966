/*!
 * Mock provider implementations for testing.
 *
 * `MockConverter` stands in for the OCR backend and `MockCorrector` for the
 * correction backend. Both count their calls so tests can assert on how
 * often the pipeline reached the external service. `MockAuthorizationPrompt`
 * answers the first-run consent prompt with a fixed code.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use super::credentials::AuthorizationPrompt;
use super::{BatchTextCorrector, ImageToTextConverter};

/// Boilerplate the mock converter puts in front of every text, mimicking
/// the title lines of a Drive export
pub const MOCK_HEADER: &str = "\u{feff}________________\r";

/// Mock OCR backend
#[derive(Debug, Default)]
pub struct MockConverter {
    /// Texts by source filename; unknown names get a generated text
    texts: HashMap<String, String>,
    /// Source filenames that fail
    failing: Vec<String>,
    /// Simulated latency per call
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl MockConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `text` (after the mock header) for `source_name`
    pub fn with_text(mut self, source_name: &str, text: &str) -> Self {
        self.texts.insert(source_name.to_string(), text.to_string());
        self
    }

    /// Fail every call for `source_name`
    pub fn failing_for(mut self, source_name: &str) -> Self {
        self.failing.push(source_name.to_string());
        self
    }

    /// Sleep this long inside every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were in flight at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Source names seen, in call order
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }

    /// The raw text the mock produces for `source_name`
    pub fn raw_text_for(&self, source_name: &str) -> String {
        let body = self.texts.get(source_name).cloned()
            .unwrap_or_else(|| format!("Text of {}", source_name));
        format!("{}\n\n{}\n", MOCK_HEADER, body)
    }
}

#[async_trait]
impl ImageToTextConverter for MockConverter {
    async fn convert(&self, source_name: &str, _image: Vec<u8>) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(source_name.to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.iter().any(|name| name == source_name) {
            return Err(ProviderError::RequestFailed(format!("Simulated OCR failure for {}", source_name)));
        }

        Ok(self.raw_text_for(source_name))
    }
}

/// Behavior mode for the mock corrector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Prefixes every text with `[FIXED] `
    Working,
    /// Always fails with an error
    Failing,
    /// Fails the first `n` calls, then works
    FailTimes(usize),
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Works but returns one entry fewer than submitted
    DropLast,
    /// Works but returns one extra entry
    ExtraEntry,
    /// Works but leaves the entry at this batch index blank
    BlankAt(usize),
    /// Returns the texts unchanged
    Echo,
}

/// Mock correction backend
#[derive(Debug)]
pub struct MockCorrector {
    behavior: MockBehavior,
    request_count: Arc<AtomicUsize>,
    batches: Mutex<Vec<Vec<String>>>,
}

impl MockCorrector {
    /// Create a new mock corrector with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Create a working mock corrector that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock corrector that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock corrector that drops the last entry of every batch
    pub fn drop_last() -> Self {
        Self::new(MockBehavior::DropLast)
    }

    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Batches received, in call order
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().clone()
    }

    fn fixed(texts: &[String]) -> Vec<String> {
        texts.iter().map(|t| format!("[FIXED] {}", t)).collect()
    }
}

#[async_trait]
impl BatchTextCorrector for MockCorrector {
    async fn correct_batch(&self, texts: &[String]) -> Result<Vec<String>, ProviderError> {
        let call = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.batches.lock().push(texts.to_vec());

        match self.behavior {
            MockBehavior::Working => Ok(Self::fixed(texts)),
            MockBehavior::Echo => Ok(texts.to_vec()),
            MockBehavior::Failing => Err(ProviderError::ConnectionError("Simulated connection failure".to_string())),
            MockBehavior::FailTimes(n) => {
                if call <= n {
                    Err(ProviderError::RateLimitExceeded(format!("Simulated failure {} of {}", call, n)))
                } else {
                    Ok(Self::fixed(texts))
                }
            }
            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && call % fail_every == 0 {
                    Err(ProviderError::RequestFailed(format!("Simulated failure on request {}", call)))
                } else {
                    Ok(Self::fixed(texts))
                }
            }
            MockBehavior::DropLast => {
                let mut fixed = Self::fixed(texts);
                fixed.pop();
                Ok(fixed)
            }
            MockBehavior::ExtraEntry => {
                let mut fixed = Self::fixed(texts);
                fixed.push("[FIXED] extra".to_string());
                Ok(fixed)
            }
            MockBehavior::BlankAt(index) => {
                let mut fixed = Self::fixed(texts);
                if let Some(entry) = fixed.get_mut(index) {
                    entry.clear();
                }
                Ok(fixed)
            }
        }
    }
}

/// Answers the consent prompt with a fixed input and records the URLs shown
#[derive(Debug, Default)]
pub struct MockAuthorizationPrompt {
    input: String,
    urls: Mutex<Vec<String>>,
}

impl MockAuthorizationPrompt {
    pub fn answering(input: &str) -> Self {
        Self {
            input: input.to_string(),
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Consent URLs the prompt was shown
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl AuthorizationPrompt for MockAuthorizationPrompt {
    async fn authorization_code(&self, auth_url: &str) -> Result<String, ProviderError> {
        self.urls.lock().push(auth_url.to_string());
        Ok(self.input.clone())
    }
}
