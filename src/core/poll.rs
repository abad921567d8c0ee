//! Availability polling
//!
//! After an upload the PPA builds the package; it is available once the
//! binary can be downloaded. The poller probes at a fixed interval until the
//! probe reports success. There is no attempt limit unless one is configured.

use crate::core::config::PollConfig;
use crate::core::error::UploadError;
use log::{debug, info};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Options for polling behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between a failed probe and the next one
    pub interval: Duration,
    /// Maximum number of probes; `None` polls forever
    pub max_attempts: Option<u32>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_attempts: None,
        }
    }
}

impl From<&PollConfig> for PollOptions {
    fn from(config: &PollConfig) -> Self {
        Self {
            interval: config.interval(),
            max_attempts: config.max_attempts,
        }
    }
}

/// Repeats a probe until it reports the artifact as available
///
/// # Examples
///
/// ```no_run
/// use nightly_ppa_upload::core::{AvailabilityPoller, PollOptions};
///
/// # async fn example() -> Result<(), nightly_ppa_upload::UploadError> {
/// let poller = AvailabilityPoller::new(PollOptions::default());
/// let attempts = poller
///     .poll("http://ppa.example.org/pkg.deb", || async { Ok(true) })
///     .await?;
/// assert_eq!(attempts, 1);
/// # Ok(())
/// # }
/// ```
pub struct AvailabilityPoller {
    options: PollOptions,
}

impl AvailabilityPoller {
    pub fn new(options: PollOptions) -> Self {
        Self { options }
    }

    /// Probe `url` until `probe` returns `Ok(true)`.
    ///
    /// Returns the number of probes made. `Ok(false)` means "not yet" and is
    /// followed by a sleep of `interval`; an `Err` from the probe ends the poll.
    pub async fn poll<F, Fut>(&self, url: &str, mut probe: F) -> Result<u32, UploadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, UploadError>>,
    {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!("availability probe #{} for {}", attempt, url);

            if probe().await? {
                return Ok(attempt);
            }

            if let Some(max) = self.options.max_attempts
                && attempt >= max
            {
                return Err(UploadError::AvailabilityExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                });
            }

            info!(
                "{} not available yet, retrying in {}s",
                url,
                self.options.interval.as_secs()
            );
            sleep(self.options.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    type ReadyProbe = std::future::Ready<Result<bool, UploadError>>;

    /// Paused-clock timers resolve at millisecond granularity
    fn assert_about(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(50),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    fn failing_then_ok(failures: u32) -> (Arc<AtomicU32>, impl FnMut() -> ReadyProbe) {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let probe = move || {
            let count = counter_clone.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(count >= failures))
        };
        (counter, probe)
    }

    #[tokio::test(start_paused = true)]
    async fn test_available_on_first_attempt() {
        let poller = AvailabilityPoller::new(PollOptions::default());
        let start = Instant::now();

        let attempts = poller.poll("url", || async { Ok(true) }).await.unwrap();

        assert_eq!(attempts, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_n_failures_give_n_plus_one_attempts() {
        let poller = AvailabilityPoller::new(PollOptions::default());
        let (counter, probe) = failing_then_ok(4);
        let start = Instant::now();

        let attempts = poller.poll("url", probe).await.unwrap();

        assert_eq!(attempts, 5);
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert_about(start.elapsed(), Duration::from_secs(4 * 60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_spaced_by_interval() {
        let poller = AvailabilityPoller::new(PollOptions::default());
        let start = Instant::now();
        let mut seen = Vec::new();

        poller
            .poll("url", || {
                seen.push(start.elapsed());
                let done = seen.len() == 3;
                async move { Ok(done) }
            })
            .await
            .unwrap();

        assert_eq!(seen.len(), 3);
        assert_about(seen[0], Duration::ZERO);
        assert_about(seen[1] - seen[0], Duration::from_secs(60));
        assert_about(seen[2] - seen[1], Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_attempts_reached() {
        let poller = AvailabilityPoller::new(PollOptions {
            interval: Duration::from_secs(10),
            max_attempts: Some(3),
        });
        let (counter, probe) = failing_then_ok(u32::MAX);

        let result = poller.poll("http://ppa/pkg.deb", probe).await;

        assert!(matches!(
            result,
            Err(UploadError::AvailabilityExhausted { attempts: 3, .. })
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_error_stops_polling() {
        let poller = AvailabilityPoller::new(PollOptions::default());
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = poller
            .poll("url", move || {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                async { Err(UploadError::ConfigError("wget missing".to_string())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_options_from_config() {
        let config = PollConfig {
            interval_secs: 30,
            max_attempts: Some(7),
        };

        let options = PollOptions::from(&config);

        assert_eq!(options.interval, Duration::from_secs(30));
        assert_eq!(options.max_attempts, Some(7));
        assert_eq!(PollOptions::default().max_attempts, None);
    }
}
