//! Emission-rate limiting for progress values.
//!
//! A [`Throttle`] forwards at most one value per interval into a broadcast
//! channel. Values offered inside the interval are dropped, and a receiver
//! that falls behind skips the oldest buffered values, so the newest point
//! always wins. Progress is recomputable from current state, so losing
//! intermediate points is harmless.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub struct Throttle<T> {
    sender: broadcast::Sender<T>,
    limiter: Option<Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
}

impl<T: Clone> Throttle<T> {
    /// Creates a throttle over a channel holding `capacity` values.
    ///
    /// A zero `interval` forwards every value.
    pub fn new(capacity: usize, interval: Duration) -> (Self, broadcast::Receiver<T>) {
        let (sender, receiver) = broadcast::channel(capacity.max(1));
        let limiter =
            Quota::with_period(interval).map(|quota| Arc::new(RateLimiter::direct(quota)));
        (Self { sender, limiter }, receiver)
    }

    /// Forwards `value` unless the previous accepted value is younger than the
    /// interval. Returns whether the value reached the channel.
    pub fn try_emit(&self, value: T) -> bool {
        if let Some(limiter) = &self.limiter {
            if limiter.check().is_err() {
                return false;
            }
        }
        self.sender.send(value).is_ok()
    }
}

impl<T> Clone for Throttle<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::RecvError;

    #[tokio::test]
    async fn drops_values_within_interval() {
        let (throttle, _rx) = Throttle::new(4, Duration::from_millis(300));

        assert!(throttle.try_emit(1));
        assert!(!throttle.try_emit(2));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(throttle.try_emit(3));
    }

    #[tokio::test]
    async fn clones_share_one_interval() {
        let (throttle, mut rx) = Throttle::new(4, Duration::from_secs(5));
        let other = throttle.clone();

        assert!(throttle.try_emit("first"));
        assert!(!other.try_emit("second"));
        assert_eq!(rx.recv().await.unwrap(), "first");
    }

    #[tokio::test]
    async fn zero_interval_forwards_everything() {
        let (throttle, mut rx) = Throttle::new(8, Duration::ZERO);
        for value in 0..5 {
            assert!(throttle.try_emit(value));
        }
        for expected in 0..5 {
            assert_eq!(rx.recv().await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn overflow_skips_oldest_values() {
        let (throttle, mut rx) = Throttle::new(2, Duration::ZERO);
        throttle.try_emit(1);
        throttle.try_emit(2);
        throttle.try_emit(3);

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(1))));
        assert_eq!(rx.recv().await.unwrap(), 2);
        assert_eq!(rx.recv().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn reports_false_without_receivers() {
        let (throttle, rx) = Throttle::new(2, Duration::ZERO);
        drop(rx);
        assert!(!throttle.try_emit(1));
    }
}
