//! Extraction plumbing shared by every container kind.
//!
//! Output is produced inside a [`Staging`] directory and only moved into the
//! destination once the whole container has been decoded.

pub mod atomic;
pub mod pages;
pub mod preflight;

pub use atomic::CommitSummary;
pub use atomic::STAGING_PREFIX;
pub use atomic::Staging;
pub use pages::render_pages;
pub use pages::write_jpeg;
pub use preflight::check_collisions;
pub use preflight::page_file_name;
pub use preflight::page_outputs;
