use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed,
    /// Delay grows by `factor` after every failed attempt.
    Exponential { factor: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
            backoff: Backoff::Fixed,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Pause after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { factor } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let secs = self.delay.as_secs_f64() * factor.powi(exponent);
                Duration::try_from_secs_f64(secs)
                    .unwrap_or(self.max_delay)
                    .min(self.max_delay)
            }
        }
    }

    /// Run `op` until it succeeds or the attempt budget is spent, sleeping
    /// between attempts. `on_failure` sees every failed attempt. Returns the
    /// last error when every attempt failed.
    pub fn run<T, E, F, L>(&self, mut op: F, mut on_failure: L) -> Result<T, E>
    where
        F: FnMut(u32) -> Result<T, E>,
        L: FnMut(u32, &E),
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    on_failure(attempt, &err);
                    if attempt >= max_attempts {
                        return Err(err);
                    }
                }
            }
            thread::sleep(self.delay_after(attempt));
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_wait(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::ZERO,
            backoff: Backoff::Fixed,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_fixed_delay_is_constant() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(5));
        assert_eq!(policy.delay_after(7), Duration::from_secs(5));
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            delay: Duration::from_secs(1),
            backoff: Backoff::Exponential { factor: 2.0 },
            max_delay: Duration::from_secs(10),
        };
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(5), Duration::from_secs(10));
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn test_succeeds_on_later_attempt() {
        let mut failures = Vec::new();
        let result: Result<&str, String> = no_wait(3).run(
            |attempt| {
                if attempt < 3 {
                    Err(format!("attempt {}", attempt))
                } else {
                    Ok("done")
                }
            },
            |attempt, _| failures.push(attempt),
        );
        assert_eq!(result, Ok("done"));
        assert_eq!(failures, vec![1, 2]);
    }

    #[test]
    fn test_exhaustion_returns_last_error() {
        let mut calls = 0;
        let result: Result<(), String> = no_wait(3).run(
            |attempt| {
                calls += 1;
                Err(format!("attempt {}", attempt))
            },
            |_, _| {},
        );
        assert_eq!(result, Err("attempt 3".to_string()));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let mut calls = 0;
        let _: Result<(), ()> = no_wait(0).run(
            |_| {
                calls += 1;
                Err(())
            },
            |_, _| {},
        );
        assert_eq!(calls, 1);
    }
}
