mod base;
mod destination;
mod sentry;
mod source;
mod syncer;

pub use base::*;
pub use destination::*;
pub use sentry::*;
pub use source::*;
pub use syncer::*;
