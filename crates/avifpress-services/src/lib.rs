//! Service layer: session bookkeeping, archive assembly, and folder scanning.
//!
//! Everything request-scoped and HTTP-shaped stays in the API crate; this
//! crate owns the state and orchestration that outlives a single request.

pub mod archive;
pub mod scan;
pub mod session;

pub use archive::{archive_filename, stream_zip};
pub use scan::{
    extensions_for, filter_by_period, scan_directory, DatePeriod, PeriodParam, ScannedFile,
};
pub use session::{SessionStore, SweeperHandle};
