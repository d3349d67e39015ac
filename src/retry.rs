// sfpd-align/src/retry.rs

use std::{thread, time::Duration};

use log::debug;

/// Bounded retry with a fixed delay and no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

/// Why a retried operation finally failed.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed with a transient error; holds the last one.
    Exhausted { attempts: u32, last: E },
    /// An attempt failed with an error that is not retried.
    Aborted(E),
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        RetryPolicy {
            max_attempts,
            delay,
        }
    }

    /// Runs `op` until it succeeds, fails with an error `is_transient` rejects,
    /// or `max_attempts` attempts have been made. Sleeps between attempts.
    pub fn run<T, E>(
        &self,
        is_transient: impl FnMut(&E) -> bool,
        op: impl FnMut(u32) -> Result<T, E>,
    ) -> Result<T, RetryError<E>> {
        self.run_with_sleep(is_transient, thread::sleep, op)
    }

    /// Same as [`RetryPolicy::run`] with a caller-supplied sleep.
    pub fn run_with_sleep<T, E>(
        &self,
        mut is_transient: impl FnMut(&E) -> bool,
        mut sleep: impl FnMut(Duration),
        mut op: impl FnMut(u32) -> Result<T, E>,
    ) -> Result<T, RetryError<E>> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if !is_transient(&err) => return Err(RetryError::Aborted(err)),
                Err(err) if attempt >= max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                Err(_) => {
                    debug!(
                        "retry: attempt {}/{} hit a transient error, waiting {:?}",
                        attempt, max_attempts, self.delay
                    );
                    sleep(self.delay);
                    attempt += 1;
                }
            }
        }
    }
}
