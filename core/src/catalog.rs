use crate::index::{TextIndex, TfidfConfig};
use crate::recommend::{IndexState, Recommendation, Unavailable};
use crate::DocId;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io;
use std::path::Path;

const COL_ISBN: &str = "ISBN";
const COL_TITLE: &str = "Book-Title";
const COL_AUTHOR: &str = "Book-Author";
const COL_YEAR: &str = "Year-Of-Publication";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub year: String,
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Reads the semicolon-separated, Latin-1 encoded books file.
/// Rows with a missing or empty value in any of the four used columns are dropped.
pub fn load_catalog_csv<P: AsRef<Path>>(path: P) -> Result<Vec<CatalogEntry>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open catalog {}", path.display()))?;

    let headers = reader.byte_headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name.as_bytes());
    let (Some(isbn), Some(title), Some(author), Some(year)) =
        (column(COL_ISBN), column(COL_TITLE), column(COL_AUTHOR), column(COL_YEAR))
    else {
        bail!("catalog {} lacks one of the {COL_ISBN}/{COL_TITLE}/{COL_AUTHOR}/{COL_YEAR} columns", path.display());
    };

    let mut entries = Vec::new();
    let mut malformed = 0usize;
    let mut incomplete = 0usize;
    for record in reader.byte_records() {
        let record = match record {
            Ok(r) => r,
            Err(_) => {
                malformed += 1;
                continue;
            }
        };
        let field = |i: usize| record.get(i).filter(|v| !v.is_empty()).map(latin1);
        match (field(isbn), field(title), field(author), field(year)) {
            (Some(isbn), Some(title), Some(author), Some(year)) => {
                entries.push(CatalogEntry { isbn, title, author, year })
            }
            _ => incomplete += 1,
        }
    }
    if malformed > 0 {
        tracing::warn!(malformed, path = %path.display(), "skipped malformed catalog rows");
    }
    tracing::info!(entries = entries.len(), incomplete, "catalog loaded");
    Ok(entries)
}

/// Makes sure the catalog CSV exists, extracting it from `archive` when only the archive is present.
/// Returns whether the CSV is available afterwards.
pub fn ensure_dataset(csv_path: &Path, archive: Option<&Path>) -> Result<bool> {
    if csv_path.is_file() {
        return Ok(true);
    }
    let Some(archive) = archive.filter(|a| a.is_file()) else {
        return Ok(false);
    };
    extract_books_csv(archive, csv_path)
}

/// Copies the first archive member named `*books.csv` to `dest`.
pub fn extract_books_csv(archive: &Path, dest: &Path) -> Result<bool> {
    let file = File::open(archive).with_context(|| format!("failed to open {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file).context("failed to open catalog archive")?;
    for i in 0..zip.len() {
        let mut member = zip.by_index(i).with_context(|| format!("failed to read archive entry {i}"))?;
        let name = member.name().to_string();
        if member.is_dir() || !name.ends_with("books.csv") {
            continue;
        }
        if name.contains("..") {
            bail!("rejecting path with directory traversal: {name}");
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let tmp = dest.with_extension("csv.partial");
        let mut out = File::create(&tmp).with_context(|| format!("failed to create {}", tmp.display()))?;
        io::copy(&mut member, &mut out).context("failed to extract catalog")?;
        fs::rename(&tmp, dest)?;
        tracing::info!(member = %name, dest = %dest.display(), "catalog extracted");
        return Ok(true);
    }
    tracing::warn!(archive = %archive.display(), "archive has no books.csv member");
    Ok(false)
}

/// Read-only index over the reference catalog, built once at startup.
/// Corpus text is title + author.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    entries: Vec<CatalogEntry>,
    state: IndexState,
}

impl CatalogIndex {
    pub fn build(entries: Vec<CatalogEntry>) -> Self {
        Self::build_with(entries, TfidfConfig::default())
    }

    pub fn build_with(entries: Vec<CatalogEntry>, config: TfidfConfig) -> Self {
        let corpus = entries.iter().enumerate().map(|(i, e)| (i as DocId, format!("{} {}", e.title, e.author)));
        let state = IndexState::from_build(TextIndex::build(corpus, config));
        if let IndexState::Broken(err) = &state {
            tracing::warn!(error = %err, "catalog index unusable");
        }
        Self { entries, state }
    }

    pub fn unavailable() -> Self {
        Self { entries: Vec::new(), state: IndexState::Unavailable(Unavailable::DatasetMissing) }
    }

    /// Loads the dataset, if any, and builds the index. Never fails; a missing or
    /// malformed dataset yields an index that answers nothing.
    pub fn load(csv_path: &Path, archive: Option<&Path>, config: TfidfConfig) -> Self {
        match ensure_dataset(csv_path, archive) {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(path = %csv_path.display(), "catalog dataset not found; global recommendations disabled");
                return Self::unavailable();
            }
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "catalog extraction failed");
                return Self::unavailable();
            }
        }
        match load_catalog_csv(csv_path) {
            Ok(entries) => Self::build_with(entries, config),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "catalog dataset unreadable");
                Self::unavailable()
            }
        }
    }

    pub fn is_ready(&self) -> bool { self.state.text_index().is_some() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn vocabulary_len(&self) -> usize {
        self.state.text_index().map(TextIndex::vocabulary_len).unwrap_or(0)
    }

    pub fn recommend(&self, query: &str) -> Recommendation<CatalogEntry> {
        self.state.recommend(query, |position| self.entries[position].clone())
    }

    pub fn query(&self, query: &str) -> Option<CatalogEntry> { self.recommend(query).into_option() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const CSV: &[u8] = b"\"ISBN\";\"Book-Title\";\"Book-Author\";\"Year-Of-Publication\";\"Publisher\"\n\
\"0441013597\";\"Dune\";\"Frank Herbert\";\"1965\";\"Ace\"\n\
\"0553293354\";\"Foundation\";\"Isaac Asimov\";\"1951\";\"Spectra\"\n\
\"0000000000\";\"\";\"Nobody\";\"2000\";\"X\"\n\
\"2070360024\";\"L'\xe9tranger\";\"Albert Camus\";\"1942\";\"Gallimard\"\n";

    #[test]
    fn loads_latin1_and_drops_incomplete_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("books.csv");
        fs::write(&path, CSV).unwrap();
        let entries = load_catalog_csv(&path).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].title, "L'étranger");
        assert_eq!(entries[0].year, "1965");
    }

    #[test]
    fn missing_columns_are_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("books.csv");
        fs::write(&path, "a;b\n1;2\n").unwrap();
        assert!(load_catalog_csv(&path).is_err());
    }

    #[test]
    fn extracts_from_archive() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("Books.zip");
        {
            let mut w = zip::ZipWriter::new(File::create(&archive).unwrap());
            let opts = zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
            w.start_file("Books/books.csv", opts).unwrap();
            w.write_all(CSV).unwrap();
            w.finish().unwrap();
        }
        let csv_path = dir.path().join("data/books_data/books.csv");
        assert!(ensure_dataset(&csv_path, Some(&archive)).unwrap());
        let index = CatalogIndex::load(&csv_path, None, TfidfConfig::default());
        assert!(index.is_ready());
        assert_eq!(index.query("asimov").unwrap().title, "Foundation");
    }

    #[test]
    fn malformed_dataset_is_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("books.csv");
        fs::write(&path, "isbn,title,author\n1,Dune,Frank Herbert\n").unwrap();
        let index = CatalogIndex::load(&path, None, TfidfConfig::default());
        assert!(!index.is_ready());
        assert!(index.is_empty());
        assert_eq!(index.recommend("dune"), Recommendation::Unavailable(Unavailable::DatasetMissing));
        assert_eq!(index.query("dune"), None);
    }

    #[test]
    fn missing_dataset_is_unavailable() {
        let dir = tempdir().unwrap();
        let index = CatalogIndex::load(&dir.path().join("nope.csv"), None, TfidfConfig::default());
        assert!(!index.is_ready());
        assert_eq!(index.recommend("dune"), Recommendation::Unavailable(Unavailable::DatasetMissing));
    }
}
