//! Test fixtures and collaborator doubles.
//!
//! Zip and 7z fixtures are built on the fly with the `zip` and
//! `sevenz-rust2` writers. rar and pdf behaviour is exercised through the
//! mocks, which count the handles they
//! hand out so tests can assert that every one of them was released.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use image::Rgba;
use image::RgbaImage;
use sevenz_rust2::ArchiveEntry;
use sevenz_rust2::ArchiveWriter;
use sevenz_rust2::Password;
use sevenz_rust2::encoder_options::AesEncoderOptions;
use sevenz_rust2::encoder_options::Lzma2Options;
use zip::unstable::write::FileOptionsExt;
use zip::write::SimpleFileOptions;
use zip::write::ZipWriter;

use crate::Credential;
use crate::ExtractError;
use crate::ExtractionReport;
use crate::ProgressCallback;
use crate::Result;
use crate::formats::ArchiveCodec;
use crate::formats::ArchiveKind;
use crate::formats::CommandOutput;
use crate::formats::CommandRunner;
use crate::formats::PdfDocument;
use crate::formats::PdfRenderer;
use crate::formats::common;
use crate::types::ProtectionStatus;

#[derive(Clone, Copy)]
enum ZipEncryption<'a> {
    None,
    Aes(&'a str),
    ZipCrypto(&'a str),
}

fn write_zip(path: &Path, encryption: ZipEncryption<'_>, entries: &[(&str, &str)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let plain = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);
    let options = match encryption {
        ZipEncryption::None => plain,
        ZipEncryption::Aes(password) => plain.with_aes_encryption(zip::AesMode::Aes256, password),
        ZipEncryption::ZipCrypto(password) => {
            FileOptionsExt::with_deprecated_encryption(plain, password.as_bytes())
        }
    };

    for (name, data) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, plain).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
    }

    zip.finish().unwrap();
}

/// Writes a zip archive named `name` into `dir` and returns its path.
///
/// Each entry is a `(name, content)` pair; names ending in `/` become
/// directory entries.
pub fn create_test_zip(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    write_zip(&path, ZipEncryption::None, entries);
    path
}

/// Like [`create_test_zip`], with every file entry AES-256 encrypted under
/// `password`.
pub fn create_encrypted_zip(
    dir: &Path,
    name: &str,
    password: &str,
    entries: &[(&str, &str)],
) -> PathBuf {
    let path = dir.join(name);
    write_zip(&path, ZipEncryption::Aes(password), entries);
    path
}

/// Like [`create_test_zip`], with every file entry encrypted with legacy
/// ZipCrypto under `password`.
pub fn create_zipcrypto_zip(
    dir: &Path,
    name: &str,
    password: &str,
    entries: &[(&str, &str)],
) -> PathBuf {
    let path = dir.join(name);
    write_zip(&path, ZipEncryption::ZipCrypto(password), entries);
    path
}

fn write_7z(path: &Path, password: Option<&str>, encrypt_header: bool, entries: &[(&str, &str)]) {
    let mut writer = ArchiveWriter::create(path).unwrap();
    match password {
        Some(password) => {
            writer.set_content_methods(vec![
                AesEncoderOptions::new(Password::from(password)).into(),
                Lzma2Options::from_level(6).into(),
            ]);
            writer.set_encrypt_header(encrypt_header);
        }
        None => {
            writer.set_content_methods(vec![Lzma2Options::from_level(6).into()]);
        }
    }

    for (name, data) in entries {
        if let Some(dir) = name.strip_suffix('/') {
            writer
                .push_archive_entry::<&[u8]>(ArchiveEntry::new_directory(dir), None)
                .unwrap();
        } else {
            writer
                .push_archive_entry(ArchiveEntry::new_file(name), Some(data.as_bytes()))
                .unwrap();
        }
    }

    writer.finish().unwrap();
}

/// Writes a 7z archive named `name` into `dir` and returns its path.
///
/// Entries follow the [`create_test_zip`] convention.
pub fn create_test_7z(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    write_7z(&path, None, false, entries);
    path
}

/// Like [`create_test_7z`], with AES-256 encrypted content streams. With
/// `encrypt_header` the entry list is encrypted as well and the archive
/// cannot be listed without `password`.
pub fn create_encrypted_7z(
    dir: &Path,
    name: &str,
    password: &str,
    encrypt_header: bool,
    entries: &[(&str, &str)],
) -> PathBuf {
    let path = dir.join(name);
    write_7z(&path, Some(password), encrypt_header, entries);
    path
}

/// Counts collaborator handles that are currently open.
#[derive(Debug, Clone, Default)]
pub struct HandleCounter {
    open: Arc<AtomicUsize>,
    opened_total: Arc<AtomicUsize>,
}

impl HandleCounter {
    /// Creates a counter with no open handles.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a handle that is released when the guard drops.
    #[must_use]
    pub fn acquire(&self) -> HandleGuard {
        self.open.fetch_add(1, Ordering::SeqCst);
        self.opened_total.fetch_add(1, Ordering::SeqCst);
        HandleGuard {
            open: Arc::clone(&self.open),
        }
    }

    /// Handles acquired and not yet released.
    #[must_use]
    pub fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Handles acquired since creation.
    #[must_use]
    pub fn opened_total(&self) -> usize {
        self.opened_total.load(Ordering::SeqCst)
    }
}

/// Open handle of a [`HandleCounter`].
#[derive(Debug)]
pub struct HandleGuard {
    open: Arc<AtomicUsize>,
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

fn check_password(expected: Option<&str>, credential: Option<&Credential>) -> Result<()> {
    match (expected, credential) {
        (None, _) => Ok(()),
        (Some(_), None) => Err(ExtractError::credential_required()),
        (Some(expected), Some(given)) if given.expose() == expected => Ok(()),
        (Some(_), Some(_)) => Err(ExtractError::wrong_credential(std::io::Error::other(
            "password mismatch",
        ))),
    }
}

/// Scripted archive codec.
#[derive(Debug, Clone)]
pub struct MockCodec {
    kind: ArchiveKind,
    files: Vec<(String, String)>,
    password: Option<String>,
    listing: bool,
    fail_after: Option<usize>,
    probe_status: Option<ProtectionStatus>,
    handles: HandleCounter,
}

impl MockCodec {
    /// Codec of `kind` whose archive holds `files` as `(path, content)`.
    #[must_use]
    pub fn new(kind: ArchiveKind, files: &[(&str, &str)]) -> Self {
        Self {
            kind,
            files: files
                .iter()
                .map(|(name, data)| ((*name).to_string(), (*data).to_string()))
                .collect(),
            password: None,
            listing: true,
            fail_after: None,
            probe_status: None,
            handles: HandleCounter::new(),
        }
    }

    /// Requires `password` to list or extract.
    #[must_use]
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// Makes `entries` return `None`, like a codec that cannot list.
    #[must_use]
    pub fn without_listing(mut self) -> Self {
        self.listing = false;
        self
    }

    /// Fails with `Corrupt` after writing `count` files.
    #[must_use]
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Overrides the probe answer, which otherwise follows the password.
    #[must_use]
    pub fn probing_as(mut self, status: ProtectionStatus) -> Self {
        self.probe_status = Some(status);
        self
    }

    /// Counter of the archive handles this codec opens.
    #[must_use]
    pub fn handles(&self) -> HandleCounter {
        self.handles.clone()
    }
}

impl ArchiveCodec for MockCodec {
    fn kind(&self) -> ArchiveKind {
        self.kind
    }

    fn probe(&self, _source: &Path) -> Result<ProtectionStatus> {
        let _handle = self.handles.acquire();
        Ok(self.probe_status.unwrap_or(if self.password.is_some() {
            ProtectionStatus::Protected
        } else {
            ProtectionStatus::Unprotected
        }))
    }

    fn entries(
        &self,
        _source: &Path,
        credential: Option<&Credential>,
    ) -> Result<Option<Vec<PathBuf>>> {
        let _handle = self.handles.acquire();
        if !self.listing {
            return Ok(None);
        }
        check_password(self.password.as_deref(), credential)?;
        self.files
            .iter()
            .map(|(name, _)| common::entry_path(name))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn extract_all(
        &self,
        _source: &Path,
        dest: &Path,
        credential: Option<&Credential>,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionReport> {
        let _handle = self.handles.acquire();
        check_password(self.password.as_deref(), credential)?;

        let mut report = ExtractionReport::new(self.kind);
        let total = self.files.len();
        for (index, (name, data)) in self.files.iter().enumerate() {
            if self.fail_after == Some(index) {
                return Err(ExtractError::corrupt(format!("bad data in entry {name}")));
            }
            let relative = common::entry_path(name)?;
            progress.on_entry_start(&relative, total, index + 1);
            let written = common::extract_file(&mut data.as_bytes(), dest, &relative, &mut report)?;
            progress.on_bytes_written(written);
            progress.on_entry_complete(&relative);
        }

        Ok(report)
    }
}

/// Scripted pdf renderer.
#[derive(Debug, Clone)]
pub struct MockPdfRenderer {
    pages: usize,
    password: Option<String>,
    encrypted: Option<bool>,
    fail_on_page: Option<usize>,
    handles: HandleCounter,
}

impl MockPdfRenderer {
    /// Renderer whose documents have `pages` pages.
    #[must_use]
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            password: None,
            encrypted: Some(false),
            fail_on_page: None,
            handles: HandleCounter::new(),
        }
    }

    /// Requires `password` to open.
    #[must_use]
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self.encrypted = Some(true);
        self
    }

    /// Overrides what an opened document reports as its encryption state.
    #[must_use]
    pub fn reporting_encrypted(mut self, encrypted: Option<bool>) -> Self {
        self.encrypted = encrypted;
        self
    }

    /// Fails rendering of the zero-based page `index`.
    #[must_use]
    pub fn failing_on_page(mut self, index: usize) -> Self {
        self.fail_on_page = Some(index);
        self
    }

    /// Counter of the documents this renderer opens.
    #[must_use]
    pub fn handles(&self) -> HandleCounter {
        self.handles.clone()
    }
}

impl PdfRenderer for MockPdfRenderer {
    fn open<'a>(
        &'a self,
        _source: &Path,
        credential: Option<&'a Credential>,
    ) -> Result<Box<dyn PdfDocument + 'a>> {
        let handle = self.handles.acquire();
        check_password(self.password.as_deref(), credential)?;

        Ok(Box::new(MockPdfDocument {
            pages: self.pages,
            encrypted: self.encrypted,
            fail_on_page: self.fail_on_page,
            _handle: Some(handle),
        }))
    }
}

/// In-memory document rendering solid-colour pages.
#[derive(Debug)]
pub struct MockPdfDocument {
    pages: usize,
    encrypted: Option<bool>,
    fail_on_page: Option<usize>,
    _handle: Option<HandleGuard>,
}

impl MockPdfDocument {
    /// Unencrypted document with `pages` pages.
    #[must_use]
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            encrypted: Some(false),
            fail_on_page: None,
            _handle: None,
        }
    }

    /// Fails rendering of the zero-based page `index`.
    #[must_use]
    pub fn failing_on_page(mut self, index: usize) -> Self {
        self.fail_on_page = Some(index);
        self
    }
}

impl PdfDocument for MockPdfDocument {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn is_encrypted(&self) -> Option<bool> {
        self.encrypted
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<RgbaImage> {
        if self.fail_on_page == Some(index) || index >= self.pages {
            return Err(ExtractError::unknown(format!(
                "failed to render page {index}"
            )));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let side = (16.0 * scale).max(1.0) as u32;
        let shade = u8::try_from(index % 256).unwrap_or(0);
        Ok(RgbaImage::from_pixel(side, side, Rgba([shade, 128, 255 - shade, 255])))
    }
}

#[derive(Debug, Default)]
struct RunnerState {
    calls: Vec<(PathBuf, Vec<OsString>)>,
}

/// [`CommandRunner`] that records invocations instead of spawning.
///
/// With [`RecordingRunner::writing`] it also creates files below the
/// directory named by the `-o` argument, as `7z x` would.
#[derive(Debug, Clone)]
pub struct RecordingRunner {
    code: Option<i32>,
    stderr: String,
    outputs: Vec<(String, String)>,
    state: Arc<Mutex<RunnerState>>,
}

impl RecordingRunner {
    /// Runner whose commands exit with `code`.
    #[must_use]
    pub fn exiting_with(code: i32) -> Self {
        Self {
            code: Some(code),
            stderr: String::new(),
            outputs: Vec::new(),
            state: Arc::new(Mutex::new(RunnerState::default())),
        }
    }

    /// Writes `files` as `(relative path, content)` into the output
    /// directory on each run.
    #[must_use]
    pub fn writing(mut self, files: &[(&str, &str)]) -> Self {
        self.outputs = files
            .iter()
            .map(|(name, data)| ((*name).to_string(), (*data).to_string()))
            .collect();
        self
    }

    /// Sets the captured stderr of each run.
    #[must_use]
    pub fn with_stderr(mut self, stderr: &str) -> Self {
        self.stderr = stderr.to_string();
        self
    }

    /// Invocations recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<(PathBuf, Vec<OsString>)> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> std::io::Result<CommandOutput> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push((program.to_path_buf(), args.to_vec()));

        let output_dir = args
            .iter()
            .filter_map(|arg| arg.to_str())
            .find_map(|arg| arg.strip_prefix("-o"))
            .map(PathBuf::from);
        if let Some(dir) = output_dir {
            for (name, data) in &self.outputs {
                let path = dir.join(name);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, data)?;
            }
        }

        Ok(CommandOutput {
            code: self.code,
            stderr: self.stderr.clone(),
        })
    }
}
