/*!
 * Allocator Module
 * Buffer allocators over the backend memory managers
 */

mod pooled;
mod supplier;
mod traits;
mod unpooled;

pub use pooled::{PoolStats, PooledAllocator};
pub use supplier::ConstBufferSupplier;
pub use traits::BufferAllocator;
pub use unpooled::UnpooledAllocator;
