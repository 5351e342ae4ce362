//! Process-wide lifecycle of the rendering backend.
//!
//! pdfium is not safe to call concurrently, so every conversion runs under
//! one process-wide lock for its whole duration. Inside the lock an init
//! counter decides when the library comes up (0 → 1) and goes down
//! (1 → 0). Concurrent conversions therefore run strictly one after the
//! other, in this process, whatever backend type they use.
//!
//! [`BackendLease`] is the only way to hold the lock. Dropping it, whether
//! the operation returned, failed, or panicked, decrements the counter,
//! shuts the engine down and only then releases the lock.

use crate::backend::RenderBackend;
use crate::error::ConvertError;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

static REGISTRY: BackendRegistry = BackendRegistry::new();

/// Holds the init counter behind the process-wide lock.
#[derive(Debug)]
pub struct BackendRegistry {
    init_count: Mutex<usize>,
}

impl BackendRegistry {
    const fn new() -> Self {
        Self {
            init_count: Mutex::new(0),
        }
    }

    /// The single registry shared by every conversion in the process.
    pub fn global() -> &'static BackendRegistry {
        &REGISTRY
    }

    /// Take the lock and bring the backend up.
    ///
    /// Blocks until no other lease is alive. If initialisation fails the
    /// counter is rolled back and the lock released before returning.
    pub fn acquire<B: RenderBackend>(
        &self,
        backend: &B,
    ) -> Result<BackendLease<'_, B::Engine>, ConvertError> {
        // A poisoned lock only means a previous holder panicked; its lease
        // already restored the counter while unwinding.
        let mut count = self.init_count.lock().unwrap_or_else(PoisonError::into_inner);

        *count += 1;
        debug_assert_eq!(*count, 1, "a lease outlived its lock");
        let engine = match backend.initialize() {
            Ok(engine) => engine,
            Err(e) => {
                *count -= 1;
                return Err(e);
            }
        };
        debug!("Rendering backend initialised (init count {})", *count);

        Ok(BackendLease {
            engine: Some(engine),
            count,
        })
    }

    /// Current init count. Outside a conversion this is always zero.
    ///
    /// Takes the backend lock, so it blocks while a conversion runs and
    /// deadlocks if called from that conversion's progress callback.
    pub fn init_count(&self) -> usize {
        *self.init_count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped ownership of an initialised engine and the process-wide lock.
#[must_use = "dropping the lease shuts the backend down immediately"]
pub struct BackendLease<'r, E> {
    engine: Option<E>,
    // Declared last: the lock is released after everything else.
    count: MutexGuard<'r, usize>,
}

impl<E> BackendLease<'_, E> {
    pub fn engine(&self) -> &E {
        // Only `drop` takes the engine out.
        self.engine.as_ref().unwrap_or_else(|| unreachable!("engine taken before drop"))
    }
}

impl<E> Drop for BackendLease<'_, E> {
    fn drop(&mut self) {
        *self.count -= 1;
        if *self.count == 0 {
            drop(self.engine.take());
            debug!("Rendering backend shut down");
        }
    }
}

/// Run `operation` with an initialised engine while holding the
/// process-wide lock.
pub fn with_rendering_backend<B, T, F>(backend: &B, operation: F) -> Result<T, ConvertError>
where
    B: RenderBackend,
    F: FnOnce(&B::Engine) -> Result<T, ConvertError>,
{
    let lease = BackendRegistry::global().acquire(backend)?;
    operation(lease.engine())
}
