//! Unified extraction façade for zip, rar and 7z archives and pdf documents.
//!
//! `unbox-core` probes whether a container needs a credential and extracts
//! it into a destination directory. pdf documents are treated as page
//! containers: every page is rendered to `{destination}/{index}.jpg`.
//!
//! Every failure is classified into a closed [`ErrorKind`] taxonomy so callers
//! can react to a wrong password or an existing output without parsing
//! messages. Output is staged inside the destination and committed only once
//! the whole container has been decoded; existing files are never
//! overwritten.
//!
//! # Examples
//!
//! ```no_run
//! use unbox_core::ArchiveKind;
//! use unbox_core::ErrorKind;
//! use unbox_core::extract_with_credential;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! match extract_with_credential(ArchiveKind::Zip, "secret.zip", "out", "hunter2") {
//!     Ok(report) => println!("Extracted {} files", report.files_extracted),
//!     Err(e) if e.kind() == ErrorKind::WrongCredential => eprintln!("wrong password"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Cargo features
//!
//! - `rar` (default): rar support through the `unrar` crate.
//! - `pdfium` (default): pdf rendering through a dynamically bound pdfium
//!   library.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod archive;
pub mod config;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod report;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use api::extract;
pub use api::extract_with_credential;
pub use api::probe_protection;
pub use archive::Extractor;
pub use archive::ExtractorBuilder;
pub use config::ExtractConfig;
pub use config::SevenZipBackend;
pub use error::ErrorKind;
pub use error::ExtractError;
pub use error::Result;
pub use formats::ArchiveKind;
pub use report::ExtractionReport;
pub use report::NoopProgress;
pub use report::ProgressCallback;

pub use types::Credential;
pub use types::DestDir;
pub use types::ExtractionRequest;
pub use types::ProtectionStatus;
