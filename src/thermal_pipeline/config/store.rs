use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::thermal_pipeline::config::agc::AgcConfig;

/// Shared holder of the live [`AgcConfig`].
///
/// Readers always get a whole-struct copy and writers always replace the
/// whole struct, both inside the same critical section, so a reader can
/// never pair a new `point_x` with a stale `point_y`.
#[derive(Debug, Default)]
pub struct ConfigStore {
    inner: Mutex<AgcConfig>,
}

impl ConfigStore {
    pub fn new(initial: AgcConfig) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    /// Snapshot of the current configuration.
    pub fn read(&self) -> AgcConfig {
        *self.lock()
    }

    /// Replaces every field at once.
    pub fn update(&self, config: AgcConfig) {
        let mut guard = self.lock();
        debug!(?config, "AGC configuration updated");
        *guard = config;
    }

    /// Read-modify-write under one lock.
    pub fn modify(&self, f: impl FnOnce(&mut AgcConfig)) -> AgcConfig {
        let mut guard = self.lock();
        f(&mut guard);
        *guard
    }

    // A writer that panicked mid-update still leaves a complete `Copy` value
    // behind, so the poisoned guard is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, AgcConfig> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_update_replaces_snapshot() {
        let store = ConfigStore::new(AgcConfig::default());
        let next = AgcConfig::builder().pointer(10, 20).temp_limits(0.0, 100.0).build();

        store.update(next);

        assert_eq!(store.read(), next);
    }

    #[test]
    fn test_modify_returns_new_value() {
        let store = ConfigStore::default();
        let updated = store.modify(|c| c.norm_margin = 0.0);
        assert_eq!(updated.norm_margin, 0.0);
        assert_eq!(store.read().norm_margin, 0.0);
    }

    #[test]
    fn test_concurrent_updates_are_never_torn() {
        let store = Arc::new(ConfigStore::new(AgcConfig::builder().pointer(0, 0).build()));

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..2_000 {
                    store.update(AgcConfig::builder().pointer(i, i).build());
                }
            })
        };

        for _ in 0..2_000 {
            let snapshot = store.read();
            assert_eq!(snapshot.point_x, snapshot.point_y);
        }

        writer.join().unwrap();
        assert_eq!(store.read().point_x, 1_999);
    }
}
