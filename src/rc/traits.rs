/*!
 * Reclaimer Traits
 * Callback abstractions for releasing backing memory
 */

/// Reclamation callback for a backing resource
///
/// Invoked exactly once, when the last owner of the resource releases it.
/// Implementations decide what "release" means: the default reclaimer simply
/// drops the resource, while pooled allocators recycle it.
pub trait Reclaimer<T: Send>: Send + Sync {
    /// Reclaim the resource
    ///
    /// # Panics
    ///
    /// Should NOT panic. Reclamation runs inside close paths and `Drop`
    /// implementations; log errors instead.
    fn reclaim(&self, resource: T);
}

/// Reclaimer that releases the resource by dropping it
///
/// The terminal reclamation for unpooled memory: dropping a region returns
/// it to the system allocator.
#[derive(Debug, Default)]
pub struct DropReclaimer;

impl<T: Send> Reclaimer<T> for DropReclaimer {
    #[inline]
    fn reclaim(&self, resource: T) {
        drop(resource);
    }
}
