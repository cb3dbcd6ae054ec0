//! Value types passed through extraction and probing operations.

pub mod credential;
pub mod dest_dir;
pub mod protection;
pub mod request;

pub use credential::Credential;
pub use dest_dir::DestDir;
pub use protection::ProtectionStatus;
pub use request::ExtractionRequest;
