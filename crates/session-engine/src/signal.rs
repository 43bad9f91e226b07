//! Per-activation cancellation.

use std::time::Duration;

use tokio::sync::watch;

/// Owner side of one session activation.
///
/// Dropping the activation cancels every token handed out from it.
#[derive(Debug)]
pub struct Activation {
    generation: u64,
    cancel_tx: watch::Sender<bool>,
}

impl Activation {
    pub fn new(generation: u64) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            generation,
            cancel_tx,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A token for the background loop of this activation.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            generation: self.generation,
            rx: self.cancel_tx.subscribe(),
        }
    }

    /// Signal cancellation. Repeated calls are harmless.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }
}

/// Loop side of one session activation.
#[derive(Debug, Clone)]
pub struct CancelToken {
    generation: u64,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the activation has been cancelled or dropped.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolve once the activation is cancelled or dropped.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `true` if the full duration elapsed.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_sleep_completes_without_cancel() {
        let activation = Activation::new(1);
        let token = activation.token();
        assert!(token.sleep(Duration::from_millis(5)).await);
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_sleep() {
        let activation = Activation::new(3);
        let token = activation.token();
        assert_eq!(token.generation(), 3);

        let started = Instant::now();
        let sleeper = tokio::spawn(async move { token.sleep(Duration::from_secs(10)).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        activation.cancel();
        activation.cancel();

        assert!(!sleeper.await.unwrap());
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(activation.is_cancelled());
    }

    #[tokio::test]
    async fn test_dropped_activation_counts_as_cancelled() {
        let activation = Activation::new(1);
        let token = activation.token();
        drop(activation);

        assert!(token.is_cancelled());
        token.cancelled().await;
        assert!(!token.sleep(Duration::from_secs(10)).await);
    }
}
