//! Container format collaborators.

pub mod command;
pub mod common;
pub mod detect;
#[cfg(feature = "pdfium")]
pub mod pdf;
#[cfg(feature = "rar")]
pub mod rar;
pub mod sevenz;
pub mod traits;
pub mod zip;

pub use command::CommandOutput;
pub use command::CommandRunner;
pub use command::ProcessRunner;
pub use command::SevenZipCommand;
pub use detect::ArchiveKind;
#[cfg(feature = "pdfium")]
pub use pdf::PdfiumRenderer;
#[cfg(feature = "rar")]
pub use rar::RarCodec;
pub use sevenz::SevenZCodec;
pub use traits::ArchiveCodec;
pub use traits::PdfDocument;
pub use traits::PdfRenderer;
pub use zip::ZipCodec;
