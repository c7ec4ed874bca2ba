//! Single-writer rebuild trigger and atomic publication of snapshots.

use crate::compute::Snapshot;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::store::ConversionStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};
use tracing::{info, warn};

/// Where the published matrix stands relative to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RebuildStatus {
    /// Number of mutations committed through the service.
    pub committed_generation: u64,
    /// Generation of the published snapshot, if any build ever succeeded.
    pub published_generation: Option<u64>,
    /// Error of the latest rebuild, cleared by the next successful one.
    pub last_error: Option<EngineError>,
}

impl RebuildStatus {
    pub fn is_stale(&self) -> bool {
        self.published_generation != Some(self.committed_generation)
    }
}

/// Owns the store and the published snapshot.
///
/// Mutations and rebuilds run one at a time under the writer lock. Readers
/// clone the current `Arc<Snapshot>` and never wait for a rebuild; a new
/// snapshot replaces the old one in a single swap after it is complete.
/// Authorization is the caller's job.
pub struct ConversionService<S> {
    writer: Mutex<S>,
    published: RwLock<Option<Arc<Snapshot>>>,
    committed: AtomicU64,
    last_error: Mutex<Option<EngineError>>,
    config: EngineConfig,
}

impl<S: ConversionStore> ConversionService<S> {
    /// A service with nothing published yet.
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            writer: Mutex::new(store),
            published: RwLock::new(None),
            committed: AtomicU64::new(0),
            last_error: Mutex::new(None),
            config,
        }
    }

    /// Creates the service and runs the first build.
    pub fn open(store: S, config: EngineConfig) -> Result<Self> {
        let service = Self::new(store, config);
        service.refresh()?;
        Ok(service)
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    // --- Readers ---

    /// The last successfully built snapshot.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.published.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        self.current().ok_or(EngineError::NotBuilt)
    }

    pub fn status(&self) -> RebuildStatus {
        // `rebuild` publishes while holding `last_error`, so both fields come from the same rebuild.
        let last_error = self.last_error.lock().unwrap_or_else(PoisonError::into_inner);
        RebuildStatus {
            committed_generation: self.committed.load(Ordering::SeqCst),
            published_generation: self.current().map(|s| s.generation()),
            last_error: last_error.clone(),
        }
    }

    /// Read access to the store. Waits for any in-flight rebuild.
    pub fn with_store<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        let store = self.lock_writer();
        f(&*store)
    }

    // --- Writers ---

    /// Applies an administrative mutation, then rebuilds before returning.
    ///
    /// Concurrent callers queue on the writer lock. The closure is not rolled
    /// back, so whatever it changed counts as committed and a rebuild follows
    /// even when it returns an error; that error is returned first. If the
    /// rebuild is rejected, the previous snapshot stays published and the
    /// rebuild error is returned.
    pub fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut S) -> Result<T>,
    {
        let mut store = self.lock_writer();
        self.mutate_locked(&mut store, f)
    }

    /// Like [`mutate`](Self::mutate) but fails with `BuildInProgress` instead of waiting.
    pub fn try_mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut S) -> Result<T>,
    {
        let mut store = self.try_lock_writer()?;
        self.mutate_locked(&mut store, f)
    }

    /// Rebuilds from the store without a mutation (after out-of-band data fixes).
    pub fn refresh(&self) -> Result<Arc<Snapshot>> {
        let store = self.lock_writer();
        self.rebuild(&store)
    }

    pub fn try_refresh(&self) -> Result<Arc<Snapshot>> {
        let store = self.try_lock_writer()?;
        self.rebuild(&store)
    }

    fn mutate_locked<T, F>(&self, store: &mut S, f: F) -> Result<T>
    where
        F: FnOnce(&mut S) -> Result<T>,
    {
        let outcome = f(store);
        self.committed.fetch_add(1, Ordering::SeqCst);
        let rebuilt = self.rebuild(store);
        let value = outcome?;
        rebuilt?;
        Ok(value)
    }

    /// Must be called with the writer lock held.
    fn rebuild(&self, store: &S) -> Result<Arc<Snapshot>> {
        let generation = self.committed.load(Ordering::SeqCst);
        let built = store.units().and_then(|units| {
            let conversions = store.conversions()?;
            Snapshot::build(&units, &conversions, generation, &self.config)
        });

        let mut last_error = self.last_error.lock().unwrap_or_else(PoisonError::into_inner);
        match built {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *self.published.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&snapshot));
                *last_error = None;
                info!(
                    generation,
                    units = snapshot.matrix().size(),
                    hops = snapshot.graph().hop_count(),
                    "conversion matrix published"
                );
                Ok(snapshot)
            }
            Err(e) => {
                warn!(generation, error = %e, "rebuild rejected, previous matrix stays published");
                *last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    fn lock_writer(&self) -> MutexGuard<'_, S> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_lock_writer(&self) -> Result<MutexGuard<'_, S>> {
        match self.writer.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(EngineError::BuildInProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Conversion, Registry, Unit, UnitId, UnitType};
    use crate::graph::Transform;

    /// A store that can be edited without going through the service.
    #[derive(Clone)]
    struct SharedRegistry(Arc<Mutex<Registry>>);

    impl ConversionStore for SharedRegistry {
        fn units(&self) -> Result<Vec<Unit>> {
            self.0.lock().unwrap().units()
        }

        fn conversions(&self) -> Result<Vec<Conversion>> {
            self.0.lock().unwrap().conversions()
        }
    }

    fn abc_registry() -> Registry {
        let mut reg = Registry::new();
        reg.insert_unit(Unit::new(1, "A", UnitType::Quantity)).unwrap();
        reg.insert_unit(Unit::new(2, "B", UnitType::Quantity)).unwrap();
        reg.insert_unit(Unit::new(3, "C", UnitType::Quantity)).unwrap();
        reg.insert_conversion(Conversion::new(1, 2, 2.0, 0.0, true)).unwrap();
        reg.insert_conversion(Conversion::new(2, 3, 1.0, 5.0, false)).unwrap();
        reg
    }

    #[test]
    fn test_nothing_published_before_first_build() {
        let service = ConversionService::new(abc_registry(), EngineConfig::default());
        assert!(service.current().is_none());
        assert_eq!(service.snapshot().unwrap_err(), EngineError::NotBuilt);
        assert!(service.status().is_stale());

        service.refresh().unwrap();
        assert!(!service.status().is_stale());
    }

    #[test]
    fn test_scenario_then_delete_middle_unit() {
        let service = ConversionService::open(abc_registry(), EngineConfig::default()).unwrap();
        let snap = service.snapshot().unwrap();
        assert!(snap.is_reachable(UnitId(1), UnitId(3)).unwrap());
        assert!(!snap.is_reachable(UnitId(3), UnitId(1)).unwrap());
        assert!(snap.is_reachable(UnitId(2), UnitId(1)).unwrap());
        assert_eq!(snap.transform(UnitId(1), UnitId(3)).unwrap(), Transform::new(2.0, 5.0));

        let removed = service.mutate(|reg| reg.delete_unit(UnitId(2))).unwrap();
        assert_eq!(removed.len(), 2);

        let after = service.snapshot().unwrap();
        assert_eq!(after.generation(), 1);
        assert!(!after.is_reachable(UnitId(1), UnitId(3)).unwrap());
        // The snapshot taken earlier is untouched.
        assert!(snap.is_reachable(UnitId(1), UnitId(3)).unwrap());
    }

    #[test]
    fn test_removing_only_edge_flips_reachability() {
        let service = ConversionService::open(abc_registry(), EngineConfig::default()).unwrap();
        service.mutate(|reg| reg.delete_conversion(UnitId(2), UnitId(3))).unwrap();

        let snap = service.snapshot().unwrap();
        assert!(!snap.is_reachable(UnitId(2), UnitId(3)).unwrap());
        assert_eq!(
            snap.transform(UnitId(1), UnitId(3)).unwrap_err(),
            EngineError::NotReachable { source_id: UnitId(1), destination_id: UnitId(3) }
        );
    }

    #[test]
    fn test_rejected_rebuild_keeps_previous_matrix() {
        let service = ConversionService::open(abc_registry(), EngineConfig::default()).unwrap();

        let err = service
            .mutate(|reg| reg.insert_conversion(Conversion::new(3, 1, 0.0, 1.0, true)))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransform { .. }));

        let status = service.status();
        assert_eq!(status.committed_generation, 1);
        assert_eq!(status.published_generation, Some(0));
        assert!(status.is_stale());
        assert_eq!(status.last_error, Some(err));
        assert!(!service.snapshot().unwrap().is_reachable(UnitId(3), UnitId(1)).unwrap());

        // The bad record was committed; a follow-up mutation that fixes it recovers.
        service
            .with_store(|reg| reg.conversion(UnitId(3), UnitId(1)).cloned())
            .expect("conversion committed");
        service.mutate(|reg| reg.update_conversion(Conversion::new(3, 1, 0.5, 1.0, true))).unwrap();
        let status = service.status();
        assert!(!status.is_stale());
        assert!(status.last_error.is_none());
        assert!(service.snapshot().unwrap().is_reachable(UnitId(3), UnitId(1)).unwrap());
    }

    #[test]
    fn test_failed_mutation_still_rebuilds() {
        let service = ConversionService::open(abc_registry(), EngineConfig::default()).unwrap();
        let err = service.mutate(|reg| reg.delete_unit(UnitId(99))).unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));

        let status = service.status();
        assert_eq!(status.committed_generation, 1);
        assert!(!status.is_stale());
        assert!(status.last_error.is_none());
    }

    #[test]
    fn test_partially_applied_mutation_is_published() {
        let service = ConversionService::open(abc_registry(), EngineConfig::default()).unwrap();
        let err = service
            .mutate(|reg| {
                reg.delete_conversion(UnitId(1), UnitId(2))?;
                reg.delete_conversion(UnitId(9), UnitId(9))?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));

        let store_has_edge = service.with_store(|reg| reg.conversion(UnitId(1), UnitId(2)).is_some());
        assert!(!store_has_edge);

        let snap = service.snapshot().unwrap();
        assert_eq!(snap.generation(), 1);
        assert!(!snap.is_reachable(UnitId(1), UnitId(2)).unwrap());
        assert!(!service.status().is_stale());
    }

    #[test]
    fn test_refresh_after_out_of_band_edit() {
        let shared = SharedRegistry(Arc::new(Mutex::new(abc_registry())));
        let service = ConversionService::open(shared.clone(), EngineConfig::default()).unwrap();
        assert!(!service.snapshot().unwrap().is_reachable(UnitId(3), UnitId(1)).unwrap());

        // Edited behind the service's back: nothing changes until a refresh.
        shared.0.lock().unwrap().insert_conversion(Conversion::new(3, 1, 0.0, 1.0, true)).unwrap();
        let err = service.refresh().unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransform { .. }));
        assert_eq!(service.status().last_error, Some(err));
        assert!(!service.snapshot().unwrap().is_reachable(UnitId(3), UnitId(1)).unwrap());

        shared.0.lock().unwrap().update_conversion(Conversion::new(3, 1, 0.5, 1.0, true)).unwrap();
        let snap = service.refresh().unwrap();
        assert!(snap.is_reachable(UnitId(3), UnitId(1)).unwrap());
        assert_eq!(snap.generation(), 0);
        assert!(service.status().last_error.is_none());
    }

    #[test]
    fn test_try_variants_report_build_in_progress() {
        let service = ConversionService::open(abc_registry(), EngineConfig::default()).unwrap();
        service
            .mutate(|reg| {
                assert_eq!(service.try_refresh().unwrap_err(), EngineError::BuildInProgress);
                assert_eq!(
                    service.try_mutate(|_| Ok(())).unwrap_err(),
                    EngineError::BuildInProgress
                );
                // Readers are not blocked by the writer.
                assert!(service.current().is_some());
                reg.insert_unit(Unit::new(4, "D", UnitType::Flow))
            })
            .unwrap();
        assert_eq!(service.snapshot().unwrap().matrix().size(), 4);
        assert!(service.try_refresh().is_ok());
    }

    #[test]
    fn test_concurrent_mutations_serialize() {
        let service = ConversionService::open(abc_registry(), EngineConfig::default()).unwrap();
        std::thread::scope(|scope| {
            for i in 0..8u32 {
                let service = &service;
                scope.spawn(move || {
                    service
                        .mutate(|reg| reg.insert_unit(Unit::new(10 + i, format!("X{}", i), UnitType::Raw)))
                        .unwrap();
                });
            }
        });

        let snap = service.snapshot().unwrap();
        assert_eq!(snap.generation(), 8);
        assert_eq!(snap.matrix().size(), 11);
        assert!(!service.status().is_stale());
    }

    #[test]
    fn test_reads_never_observe_torn_matrix() {
        let service = ConversionService::open(abc_registry(), EngineConfig::default()).unwrap();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..50 {
                    service.mutate(|reg| reg.insert_unit(Unit::new(4, "D", UnitType::Quantity))).unwrap();
                    service
                        .mutate(|reg| reg.insert_conversion(Conversion::new(3, 4, 1.0, 0.0, true)))
                        .unwrap();
                    service.mutate(|reg| reg.delete_unit(UnitId(4))).unwrap();
                }
            });
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        let snap = service.snapshot().unwrap();
                        let size = snap.matrix().size();
                        assert!(size == 3 || size == 4, "size {}", size);
                        assert_eq!(size, snap.graph().unit_count());
                        let view = snap.matrix().to_view();
                        assert!(view.grid.iter().all(|row| row.len() == size));
                        if size == 4 {
                            // Either generation with D: D isolated, or D joined to C.
                            let joined = snap.is_reachable(UnitId(1), UnitId(4)).unwrap();
                            assert_eq!(joined, snap.graph().hop_count() == 5);
                        }
                    }
                });
            }
        });
        assert_eq!(service.snapshot().unwrap().generation(), 150);
    }
}
