//! Bounded retries and the per-document deadline.

use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// How often a failing page is retried, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// The operation succeeded on attempt `attempts`.
    Success { value: T, attempts: u32 },
    /// Every attempt failed; `last_error` is from the final one.
    Exhausted { attempts: u32, last_error: Error },
}

impl<T> RetryOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Success { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Success { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// A policy that tries once and never waits.
    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Total number of attempts the policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run `op` until it succeeds or the attempts run out.
    ///
    /// `op` receives the 1-based attempt number. Exhaustion is a normal
    /// outcome; only an expired `deadline` (checked before every attempt and
    /// while waiting) or a timeout raised by `op` itself is returned as `Err`.
    pub fn run<T, F>(&self, deadline: &Deadline, mut op: F) -> Result<RetryOutcome<T>>
    where
        F: FnMut(u32) -> Result<T>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            deadline.check()?;
            attempt += 1;

            match op(attempt) {
                Ok(value) => {
                    return Ok(RetryOutcome::Success {
                        value,
                        attempts: attempt,
                    })
                }
                Err(e @ Error::PipelineTimeout(_)) => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    return Ok(RetryOutcome::Exhausted {
                        attempts: attempt,
                        last_error: e,
                    })
                }
                Err(e) => {
                    log::warn!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        max_attempts,
                        e,
                        self.delay
                    );
                    deadline.sleep(self.delay)?;
                }
            }
        }
    }
}

/// Point in time after which a document's processing is abandoned.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires: Option<Instant>,
    limit: Duration,
}

impl Deadline {
    /// A deadline `limit` from now; `None` never expires.
    pub fn after(limit: Option<Duration>) -> Self {
        Self {
            expires: limit.and_then(|l| Instant::now().checked_add(l)),
            limit: limit.unwrap_or_default(),
        }
    }

    /// A deadline that never expires.
    pub fn none() -> Self {
        Self::after(None)
    }

    pub fn limit(&self) -> Option<Duration> {
        self.expires.map(|_| self.limit)
    }

    /// Time left, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.expires.is_some_and(|at| Instant::now() >= at)
    }

    /// Fail with [`Error::PipelineTimeout`] once expired.
    pub fn check(&self) -> Result<()> {
        if self.is_expired() {
            Err(Error::PipelineTimeout(self.limit))
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration`, cut short by the deadline.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let wait = match self.remaining() {
            Some(left) => duration.min(left),
            None => duration,
        };
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
        self.check()
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_first_attempt() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let outcome = policy.run(&Deadline::none(), |_| Ok::<_, Error>(7)).unwrap();
        match outcome {
            RetryOutcome::Success { value, attempts } => {
                assert_eq!(value, 7);
                assert_eq!(attempts, 1);
            }
            RetryOutcome::Exhausted { .. } => panic!("expected success"),
        }
    }

    #[test]
    fn test_success_after_retries() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let outcome = policy
            .run(&Deadline::none(), |attempt| {
                if attempt < 3 {
                    Err(Error::TextExtract("flaky".into()))
                } else {
                    Ok("page")
                }
            })
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.attempts(), 3);
    }

    #[test]
    fn test_exhausted() {
        let policy = RetryPolicy::new(2, Duration::ZERO);
        let mut calls = 0;
        let outcome: RetryOutcome<()> = policy
            .run(&Deadline::none(), |_| {
                calls += 1;
                Err(Error::TextExtract("corrupt".into()))
            })
            .unwrap();

        assert_eq!(calls, 3);
        match outcome {
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.to_string().contains("corrupt"));
            }
            RetryOutcome::Success { .. } => panic!("expected exhaustion"),
        }
    }

    #[test]
    fn test_no_retry() {
        let policy = RetryPolicy::no_retry();
        assert_eq!(policy.max_attempts(), 1);
        let outcome: RetryOutcome<()> = policy
            .run(&Deadline::none(), |_| Err(Error::Ocr("x".into())))
            .unwrap();
        assert_eq!(outcome.attempts(), 1);
    }

    #[test]
    fn test_expired_deadline_stops_before_first_attempt() {
        let deadline = Deadline::after(Some(Duration::ZERO));
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let mut called = false;
        let result = policy.run(&deadline, |_| {
            called = true;
            Ok(())
        });

        assert!(matches!(result, Err(Error::PipelineTimeout(_))));
        assert!(!called);
    }

    #[test]
    fn test_deadline_cuts_retry_delay() {
        let deadline = Deadline::after(Some(Duration::from_millis(20)));
        let policy = RetryPolicy::new(10, Duration::from_secs(30));
        let started = Instant::now();
        let result: Result<RetryOutcome<()>> =
            policy.run(&deadline, |_| Err(Error::TextExtract("slow".into())));

        assert!(matches!(result, Err(Error::PipelineTimeout(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_unbounded_deadline() {
        let deadline = Deadline::none();
        assert!(!deadline.is_expired());
        assert!(deadline.remaining().is_none());
        assert!(deadline.limit().is_none());
        assert!(deadline.check().is_ok());
    }
}
