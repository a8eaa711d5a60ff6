//! Throttled notifier.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{NotifierConfig, ThrottleScope};
use crate::job::Job;
use crate::metrics;
use crate::transport::Transport;

const GLOBAL_CONTEXT: &str = "*";

/// Sends progress messages through a transport, dropping intermediate
/// updates that arrive within `interval` of the last one for the same
/// context.
pub struct Notifier {
    transport: Arc<dyn Transport>,
    interval: Duration,
    scope: ThrottleScope,
    /// Last time an intermediate update was sent, per context.
    last_sent: Mutex<HashMap<String, Instant>>,
}

impl Notifier {
    pub fn new(transport: Arc<dyn Transport>, config: &NotifierConfig) -> Self {
        Self::with_interval(transport, config.interval(), config.scope)
    }

    /// Creates a notifier with an explicit interval.
    pub fn with_interval(
        transport: Arc<dyn Transport>,
        interval: Duration,
        scope: ThrottleScope,
    ) -> Self {
        Self {
            transport,
            interval,
            scope,
            last_sent: Mutex::new(HashMap::new()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn context_key(&self, job: &Job) -> String {
        match self.scope {
            ThrottleScope::Global => GLOBAL_CONTEXT.to_string(),
            ThrottleScope::PerBatch => job.batch_id.clone(),
            ThrottleScope::PerJob => job.id.to_string(),
        }
    }

    /// Claims the current window for `key`. Returns false when an update was
    /// already sent within the interval.
    ///
    /// Throttling is leading-edge: the first update of a window goes out and
    /// every later one in the same window is dropped, not deferred. The most
    /// recent progress of a window is therefore only seen if another update
    /// arrives after the window closes, or through the job's final message.
    fn claim_window(&self, key: String) -> bool {
        let now = Instant::now();
        let mut last_sent = self
            .last_sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match last_sent.get(&key) {
            Some(last) if now.duration_since(*last) < self.interval => false,
            _ => {
                last_sent.insert(key, now);
                true
            }
        }
    }

    /// Sends an intermediate update unless the job's context is throttled.
    /// A suppressed update is discarded.
    ///
    /// Returns true when the message was delivered.
    pub async fn report(&self, job: &Job, message: &str) -> bool {
        if !self.claim_window(self.context_key(job)) {
            metrics::NOTIFICATIONS
                .with_label_values(&["suppressed"])
                .inc();
            debug!(job_id = %job.id, "Progress update throttled");
            return false;
        }
        self.send(&job.destination, message).await
    }

    /// Sends a job's final message, bypassing the throttle.
    pub async fn report_final(&self, job: &Job, message: &str) -> bool {
        self.send(&job.destination, message).await
    }

    /// Sends an unthrottled message not tied to a job.
    pub async fn announce(&self, destination: &str, message: &str) -> bool {
        self.send(destination, message).await
    }

    async fn send(&self, destination: &str, message: &str) -> bool {
        match self.transport.send_message(destination, message).await {
            Ok(()) => {
                metrics::NOTIFICATIONS.with_label_values(&["sent"]).inc();
                true
            }
            Err(e) => {
                metrics::NOTIFICATIONS.with_label_values(&["failed"]).inc();
                warn!(destination, error = %e, "Failed to send notification");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobKind;
    use crate::testing::MockTransport;

    fn job(batch: &str, seq: usize) -> Job {
        Job::new(batch, "https://h/a.pdf", seq, 3, "chat", JobKind::Plain)
    }

    fn notifier(transport: &Arc<MockTransport>, interval: Duration, scope: ThrottleScope) -> Notifier {
        Notifier::with_interval(transport.clone(), interval, scope)
    }

    #[tokio::test]
    async fn test_burst_sends_one_intermediate_plus_final() {
        let transport = Arc::new(MockTransport::new());
        let notifier = notifier(&transport, Duration::from_secs(10), ThrottleScope::PerJob);
        let job = job("b", 1);

        let mut sent = 0;
        for i in 0..100 {
            if notifier.report(&job, &format!("progress {}", i)).await {
                sent += 1;
            }
        }
        assert!(notifier.report_final(&job, "done").await);

        assert_eq!(sent, 1);
        let messages = transport.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "progress 0");
        assert_eq!(messages[1].text, "done");
    }

    #[tokio::test]
    async fn test_window_reopens_after_interval() {
        let transport = Arc::new(MockTransport::new());
        let notifier = notifier(&transport, Duration::from_millis(50), ThrottleScope::PerJob);
        let job = job("b", 1);

        assert!(notifier.report(&job, "a").await);
        assert!(!notifier.report(&job, "b").await);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(notifier.report(&job, "c").await);
    }

    #[tokio::test]
    async fn test_suppressed_update_is_dropped_not_deferred() {
        let transport = Arc::new(MockTransport::new());
        let notifier = notifier(&transport, Duration::from_millis(50), ThrottleScope::PerJob);
        let job = job("b", 1);

        assert!(notifier.report(&job, "10%").await);
        assert!(!notifier.report(&job, "60%").await);
        tokio::time::sleep(Duration::from_millis(80)).await;

        let texts: Vec<String> = transport
            .messages()
            .await
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["10%"]);
    }

    #[tokio::test]
    async fn test_scopes() {
        let transport = Arc::new(MockTransport::new());
        let interval = Duration::from_secs(10);

        let per_job = notifier(&transport, interval, ThrottleScope::PerJob);
        assert!(per_job.report(&job("b", 1), "x").await);
        assert!(per_job.report(&job("b", 2), "x").await);

        let per_batch = notifier(&transport, interval, ThrottleScope::PerBatch);
        assert!(per_batch.report(&job("b1", 1), "x").await);
        assert!(!per_batch.report(&job("b1", 2), "x").await);
        assert!(per_batch.report(&job("b2", 1), "x").await);

        let global = notifier(&transport, interval, ThrottleScope::Global);
        assert!(global.report(&job("b1", 1), "x").await);
        assert!(!global.report(&job("b2", 1), "x").await);
    }

    #[tokio::test]
    async fn test_send_failure_is_not_escalated() {
        let transport = Arc::new(MockTransport::new());
        transport.set_fail_messages(true).await;
        let notifier = notifier(&transport, Duration::from_secs(10), ThrottleScope::PerJob);

        assert!(!notifier.report_final(&job("b", 1), "done").await);
        assert!(!notifier.announce("chat", "hello").await);
    }
}
