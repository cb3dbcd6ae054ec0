//! Container kind detection.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::ExtractError;
use crate::Result;

/// ZIP local file header, empty archive and spanned archive signatures.
const ZIP_MAGICS: [&[u8]; 3] = [b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];

/// RAR 1.5-4.x and RAR 5 signatures.
const RAR_MAGICS: [&[u8]; 2] = [b"Rar!\x1a\x07\x00", b"Rar!\x1a\x07\x01\x00"];

/// 7z signature: "7z" followed by format version bytes.
const SEVENZ_MAGIC: [u8; 6] = [0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Number of leading bytes needed to recognise every supported signature.
const SNIFF_LEN: usize = 8;

/// Supported container kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// ZIP archive.
    Zip,
    /// RAR archive.
    Rar,
    /// 7z archive.
    SevenZip,
    /// PDF document treated as an ordered container of pages.
    PdfPages,
}

impl ArchiveKind {
    /// Every supported kind.
    pub const ALL: [Self; 4] = [Self::Zip, Self::Rar, Self::SevenZip, Self::PdfPages];

    /// Short lowercase name used on the command line and in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Rar => "rar",
            Self::SevenZip => "7z",
            Self::PdfPages => "pdf",
        }
    }

    /// Detects the kind of an existing file, by signature first and file
    /// extension second.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the file does not exist and `Unsupported` if
    /// neither signature nor extension is recognised.
    pub fn detect(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ExtractError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ExtractError::from(e)
            }
        })?;

        let mut header = [0u8; SNIFF_LEN];
        let mut filled = 0;
        while filled < SNIFF_LEN {
            let n = file.read(&mut header[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        Self::from_magic(&header[..filled])
            .or_else(|| Self::from_extension(path))
            .ok_or_else(|| {
                ExtractError::unsupported(format!(
                    "cannot determine container kind of {}",
                    path.display()
                ))
            })
    }

    /// Recognises a kind from the leading bytes of a file.
    #[must_use]
    pub fn from_magic(header: &[u8]) -> Option<Self> {
        if ZIP_MAGICS.iter().any(|m| header.starts_with(m)) {
            Some(Self::Zip)
        } else if RAR_MAGICS.iter().any(|m| header.starts_with(m)) {
            Some(Self::Rar)
        } else if header.starts_with(&SEVENZ_MAGIC) {
            Some(Self::SevenZip)
        } else if header.starts_with(PDF_MAGIC) {
            Some(Self::PdfPages)
        } else {
            None
        }
    }

    /// Recognises a kind from the file extension, case-insensitively.
    #[must_use]
    pub fn from_extension(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        extension.parse().ok()
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchiveKind {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "zip" => Ok(Self::Zip),
            "rar" => Ok(Self::Rar),
            "7z" | "7zip" | "sevenzip" => Ok(Self::SevenZip),
            "pdf" => Ok(Self::PdfPages),
            other => Err(ExtractError::unsupported(format!(
                "unknown container kind '{other}'"
            ))),
        }
    }
}
