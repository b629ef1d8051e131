/*!
 * Component Views
 *
 * Per-component introspection for scatter/gather I/O. A leaf buffer exposes
 * itself as one component; a composite exposes each non-empty part.
 */

use crate::core::Backend;

/// Readable view of one contiguous component
pub struct ReadableComponent<'a> {
    data: &'a [u8],
    native_address: Option<usize>,
    backend: Backend,
}

impl<'a> ReadableComponent<'a> {
    pub(crate) fn new(data: &'a [u8], native_address: Option<usize>, backend: Backend) -> Self {
        Self {
            data,
            native_address,
            backend,
        }
    }

    /// The readable bytes of this component
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.data
    }

    /// Native address of the first readable byte, for off-heap components
    #[inline]
    pub fn native_address(&self) -> Option<usize> {
        self.native_address
    }

    /// Whether this component is backed by an on-heap array
    #[inline]
    pub fn is_heap(&self) -> bool {
        self.backend == Backend::Heap
    }

    #[inline]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Writable view of one contiguous component
pub struct WritableComponent<'a> {
    data: &'a mut [u8],
    native_address: Option<usize>,
    backend: Backend,
}

impl<'a> WritableComponent<'a> {
    pub(crate) fn new(data: &'a mut [u8], native_address: Option<usize>, backend: Backend) -> Self {
        Self {
            data,
            native_address,
            backend,
        }
    }

    /// The writable bytes of this component
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.data
    }

    /// Native address of the first writable byte, for off-heap components
    #[inline]
    pub fn native_address(&self) -> Option<usize> {
        self.native_address
    }

    /// Whether this component is backed by an on-heap array
    #[inline]
    pub fn is_heap(&self) -> bool {
        self.backend == Backend::Heap
    }

    #[inline]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
