/*!
 * Reclamation Handles
 *
 * Shared-count reclamation for buffer backing memory.
 *
 * Every backing region is owned by exactly one reclamation callback, wrapped
 * in an atomically reference-counted handle. New logical owners (slices,
 * acquires) increment the count; closing decrements it; the callback fires
 * exactly once, on the thread that decrements the count to zero. Split
 * re-parents handles so that disjoint halves of one region can be closed
 * independently without the region outliving its last owner.
 */

mod arc;
mod traits;

pub use arc::SharedArc;
pub use traits::{DropReclaimer, Reclaimer};
