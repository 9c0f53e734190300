// ── Per-key debounce ──
//
// Coalesces rapid edits into one delayed write per key. Scheduling a key
// again cancels its pending timer; different keys are independent.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A timer that elapsed. Pass it to [`DebounceRegistry::claim`] to get
/// the value, unless a newer schedule superseded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<K> {
    pub key: K,
    generation: u64,
}

struct Pending<V> {
    generation: u64,
    value: V,
    timer: JoinHandle<()>,
}

pub struct DebounceRegistry<K, V> {
    delay: Duration,
    pending: HashMap<K, Pending<V>>,
    next_generation: u64,
    fired_tx: mpsc::UnboundedSender<Fired<K>>,
}

impl<K, V> DebounceRegistry<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    /// New registry plus the receiver its timers fire into.
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<Fired<K>>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        (
            Self {
                delay,
                pending: HashMap::new(),
                next_generation: 0,
                fired_tx,
            },
            fired_rx,
        )
    }

    /// Schedule `value` for `key`, replacing any pending value.
    pub fn schedule(&mut self, key: K, value: V) {
        self.next_generation += 1;
        let generation = self.next_generation;

        let tx = self.fired_tx.clone();
        let delay = self.delay;
        let fired = Fired {
            key: key.clone(),
            generation,
        };
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(fired);
        });

        if let Some(previous) = self.pending.insert(
            key,
            Pending {
                generation,
                value,
                timer,
            },
        ) {
            previous.timer.abort();
        }
    }

    /// Take the value for a fired timer. `None` if it was superseded.
    pub fn claim(&mut self, fired: &Fired<K>) -> Option<V> {
        match self.pending.get(&fired.key) {
            Some(p) if p.generation == fired.generation => {
                self.pending.remove(&fired.key).map(|p| p.value)
            }
            _ => None,
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Take every pending value now, cancelling the timers.
    pub fn drain(&mut self) -> Vec<(K, V)> {
        self.pending
            .drain()
            .map(|(key, p)| {
                p.timer.abort();
                (key, p.value)
            })
            .collect()
    }
}

impl<K, V> Drop for DebounceRegistry<K, V> {
    fn drop(&mut self) {
        for p in self.pending.values() {
            p.timer.abort();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    const DELAY: Duration = Duration::from_millis(1000);

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_coalesce() {
        let (mut registry, mut rx) = DebounceRegistry::<u8, i64>::new(DELAY);
        let start = Instant::now();

        registry.schedule(0, 200);
        tokio::time::sleep(Duration::from_millis(400)).await;
        registry.schedule(0, 205);
        tokio::time::sleep(Duration::from_millis(400)).await;
        registry.schedule(0, 210);

        let fired = rx.recv().await.unwrap();
        assert_eq!(registry.claim(&fired), Some(210));
        assert!(start.elapsed() >= Duration::from_millis(1800));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err(), "superseded timers must not fire");
        assert_eq!(registry.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let (mut registry, mut rx) = DebounceRegistry::<u8, i64>::new(DELAY);

        registry.schedule(0, 220);
        registry.schedule(1, 250);

        let mut claimed = Vec::new();
        for _ in 0..2 {
            let fired = rx.recv().await.unwrap();
            let value = registry.claim(&fired).unwrap();
            claimed.push((fired.key, value));
        }
        claimed.sort_unstable();
        assert_eq!(claimed, vec![(0, 220), (1, 250)]);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_fire_is_not_claimed() {
        let (mut registry, _rx) = DebounceRegistry::<u8, i64>::new(DELAY);
        registry.schedule(2, 1);
        let stale = Fired {
            key: 2,
            generation: 0,
        };
        assert_eq!(registry.claim(&stale), None);
        assert!(registry.is_pending(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn drain_returns_pending_and_stops_timers() {
        let (mut registry, mut rx) = DebounceRegistry::<u8, i64>::new(DELAY);
        registry.schedule(0, 1);
        registry.schedule(3, 2);

        let mut drained = registry.drain();
        drained.sort_unstable();
        assert_eq!(drained, vec![(0, 1), (3, 2)]);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(registry.pending_count(), 0);
    }
}
