//! Pacing between consecutive workflow updates.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// The wait was interrupted by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancelled while throttling")]
pub struct Cancelled;

/// Delays every call to [`wait`](Self::wait) except the first by a fixed
/// amount.
///
/// The first update of a rotation goes out immediately; each later update
/// waits `delay` so the platform is not hit with a burst.
#[derive(Debug, Clone)]
pub struct ThrottleGate {
    delay: Duration,
    armed: bool,
}

impl ThrottleGate {
    /// Create a gate that has not been passed yet.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            armed: false,
        }
    }

    /// The configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait for the next slot.
    ///
    /// Returns [`Cancelled`] as soon as `cancel` fires, including when it
    /// already fired before the call.
    pub async fn wait(&mut self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }

        if !self.armed {
            self.armed = true;
            return Ok(());
        }

        if self.delay.is_zero() {
            return Ok(());
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Cancelled),
            () = tokio::time::sleep(self.delay) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn first_wait_is_immediate() {
        let cancel = CancellationToken::new();
        let mut gate = ThrottleGate::new(Duration::from_millis(100));

        let start = Instant::now();
        gate.wait(&cancel).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn later_waits_sleep_for_the_delay() {
        let cancel = CancellationToken::new();
        let mut gate = ThrottleGate::new(Duration::from_millis(100));

        let start = Instant::now();
        for _ in 0..3 {
            gate.wait(&cancel).await.unwrap();
        }
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn cancellation_interrupts_sleep() {
        let cancel = CancellationToken::new();
        let mut gate = ThrottleGate::new(Duration::from_secs(30));
        gate.wait(&cancel).await.unwrap();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        assert_eq!(gate.wait(&cancel).await, Err(Cancelled));
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn already_cancelled_token_fails_fast() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut gate = ThrottleGate::new(Duration::ZERO);
        assert_eq!(gate.wait(&cancel).await, Err(Cancelled));
    }
}
