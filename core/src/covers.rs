use crate::error::StorageError;
use base64::Engine as _;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

const DEFAULT_EXT: &str = "png";

// Same safe set as the usual URL path quoting: alphanumerics and `_.-~/`.
const PATH_SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'.').remove(b'-').remove(b'~').remove(b'/');

/// Directory of uploaded cover images. References are bare file names.
#[derive(Debug, Clone)]
pub struct CoverStore {
    dir: PathBuf,
}

impl CoverStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path { &self.dir }

    /// Decodes a `data:image/<ext>;base64,<payload>` URI and writes it out.
    /// Returns `Ok(None)` when the payload cannot be decoded; the image is then dropped.
    pub fn save_data_uri(&self, data_uri: &str) -> Result<Option<String>, StorageError> {
        let Some((header, payload)) = data_uri.split_once(',') else {
            tracing::warn!("cover image without payload ignored");
            return Ok(None);
        };
        let bytes = match base64::engine::general_purpose::STANDARD.decode(payload.trim()) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "undecodable cover image ignored");
                return Ok(None);
            }
        };
        let ext = extension_from_header(header);
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;

        for attempt in 0u32.. {
            let name = if attempt == 0 {
                format!("cover_{millis}.{ext}")
            } else {
                format!("cover_{millis}_{attempt}.{ext}")
            };
            match OpenOptions::new().write(true).create_new(true).open(self.dir.join(&name)) {
                Ok(mut f) => {
                    f.write_all(&bytes)?;
                    tracing::debug!(name = %name, bytes = bytes.len(), "cover stored");
                    return Ok(Some(name));
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            }
        }
        unreachable!("cover name space exhausted")
    }

    /// Path of a stored cover. Only the final path component of `name` is used.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let base = Path::new(name).file_name()?;
        let path = self.dir.join(base);
        path.is_file().then_some(path)
    }
}

pub fn public_url(reference: &str) -> String {
    format!("/uploads/{}", utf8_percent_encode(reference, PATH_SAFE))
}

pub fn content_type(name: &str) -> &'static str {
    match Path::new(name).extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg+xml") | Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

fn extension_from_header(header: &str) -> String {
    if !(header.contains(";base64") && header.contains("image/")) {
        return DEFAULT_EXT.to_string();
    }
    let mime = header.split(';').next().unwrap_or_default();
    let subtype = mime.rsplit('/').next().unwrap_or_default();
    let ext: String = subtype
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '+')
        .take(10)
        .collect::<String>()
        .to_ascii_lowercase();
    if ext.is_empty() { DEFAULT_EXT.to_string() } else { ext }
}
