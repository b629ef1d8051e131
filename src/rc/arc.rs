/*!
 * Shared-Count Handle
 *
 * Atomic reference count over a single reclamation callback
 */

use super::traits::Reclaimer;
use crate::core::{BufferError, BufferResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared count over one reclamation
///
/// A `SharedArc` is either a *root*, which owns the resource and the
/// reclaimer that will eventually receive it, or *nested* over a parent arc.
/// Nesting is how split works: each half gets a fresh arc with count 1 whose
/// release decrements the parent, so both halves are independently owned
/// while the underlying region stays alive until the last of them closes.
///
/// Count zero is a permanent terminal state: `acquire` fails once the count
/// has reached zero, and the reclaimer fires exactly once, on the thread
/// whose `release` performed the transition.
///
/// # Performance
/// - Cache-line aligned to prevent false sharing of the count
#[repr(align(64))]
pub struct SharedArc<T: Send> {
    count: AtomicUsize,
    inner: ArcInner<T>,
}

enum ArcInner<T: Send> {
    Root {
        resource: Mutex<Option<T>>,
        reclaimer: Arc<dyn Reclaimer<T>>,
    },
    Nested {
        parent: Arc<SharedArc<T>>,
    },
}

impl<T: Send> SharedArc<T> {
    /// Create a root arc owning the resource, count 1
    pub fn root(resource: T, reclaimer: Arc<dyn Reclaimer<T>>) -> Arc<Self> {
        Arc::new(Self {
            count: AtomicUsize::new(1),
            inner: ArcInner::Root {
                resource: Mutex::new(Some(resource)),
                reclaimer,
            },
        })
    }

    /// Create a nested arc with count 1, holding one count on the parent
    ///
    /// Fails with `Closed` if the parent has already reached zero.
    pub fn nested(parent: &Arc<SharedArc<T>>) -> BufferResult<Arc<Self>> {
        parent.acquire()?;
        Ok(Arc::new(Self {
            count: AtomicUsize::new(1),
            inner: ArcInner::Nested {
                parent: Arc::clone(parent),
            },
        }))
    }

    /// Add one logical owner
    ///
    /// Fails with `Closed` once the count has reached zero; the underlying
    /// resource is gone and can never be revived.
    pub fn acquire(&self) -> BufferResult<()> {
        let mut current = self.count.load(Ordering::SeqCst);
        loop {
            if current == 0 {
                return Err(BufferError::Closed);
            }
            match self.count.compare_exchange(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    /// Release one logical owner
    ///
    /// The owner that decrements the count to zero takes the resource and
    /// hands it to the reclaimer (for a root), or releases the parent arc
    /// (for a nested arc).
    pub fn release(&self) {
        let mut current: &SharedArc<T> = self;
        loop {
            let mut count = current.count.load(Ordering::SeqCst);
            loop {
                if count == 0 {
                    // Release after terminal zero is a handle bookkeeping bug;
                    // close itself stays idempotent one level up.
                    log::error!("shared count released after reaching zero");
                    return;
                }
                match current.count.compare_exchange(
                    count,
                    count - 1,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                ) {
                    Ok(_) => {
                        count -= 1;
                        break;
                    }
                    Err(actual) => count = actual,
                }
            }
            if count > 0 {
                return;
            }
            match &current.inner {
                ArcInner::Root {
                    resource,
                    reclaimer,
                } => {
                    if let Some(resource) = resource.lock().take() {
                        reclaimer.reclaim(resource);
                    }
                    return;
                }
                ArcInner::Nested { parent } => {
                    current = parent.as_ref();
                }
            }
        }
    }

    /// Current owner count
    #[inline]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Whether this arc has a single owner
    #[inline]
    pub fn is_owned(&self) -> bool {
        self.count() <= 1
    }

    /// Number of additional owners beyond the first
    #[inline]
    pub fn borrows(&self) -> usize {
        self.count().saturating_sub(1)
    }
}

impl<T: Send> std::fmt::Debug for SharedArc<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.inner {
            ArcInner::Root { .. } => "root",
            ArcInner::Nested { .. } => "nested",
        };
        f.debug_struct("SharedArc")
            .field("count", &self.count())
            .field("kind", &kind)
            .finish()
    }
}
