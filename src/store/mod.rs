//! Store connection lifecycle.
//!
//! A [`StoreRegistry`] hands out reference-counted [`StoreHandle`]s so that
//! repositories opened against the same named store share one underlying
//! connection pool, and the pool is closed only when the last referent
//! releases it.

mod handle;
mod registry;

pub(crate) use handle::SharedStore;
pub use handle::StoreHandle;
pub use registry::{MEMORY, StoreRegistry};
