//! Line-oriented readers with optional gzip decoding.

use crate::error::{StorageError, StorageResult};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Store-wide compression setting, fixed when the store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Plain UTF-8 text.
    #[default]
    None,
    /// Gzip-compressed UTF-8 text.
    Gzip,
}

impl Compression {
    /// Maps a boolean configuration flag to a compression setting.
    #[must_use]
    pub const fn from_flag(enabled: bool) -> Self {
        if enabled {
            Self::Gzip
        } else {
            Self::None
        }
    }

    /// Returns true for [`Compression::Gzip`].
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Gzip)
    }

    /// File extension used for data files under this setting.
    #[must_use]
    pub const fn data_extension(self) -> &'static str {
        match self {
            Self::None => ".dat",
            Self::Gzip => ".dat.gz",
        }
    }
}

/// One line of a data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number.
    pub number: usize,
    /// Line contents without the terminator.
    pub text: String,
    /// True if invalid UTF-8 was replaced with `U+FFFD`.
    pub lossy: bool,
}

/// Iterates over the lines of a possibly compressed text file.
///
/// Files are gunzipped when the store uses compression or when the file name
/// ends in `.gz`; there is no in-band compression marker. Bytes that are not
/// valid UTF-8 are replaced rather than failing the whole file.
pub struct LineReader {
    path: PathBuf,
    reader: Box<dyn BufRead + Send>,
    buf: Vec<u8>,
    number: usize,
}

impl LineReader {
    /// Opens `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] if the file cannot be opened.
    pub fn open(path: &Path, compression: Compression) -> StorageResult<Self> {
        let file = File::open(path).map_err(|e| StorageError::read(path, e))?;
        Ok(Self::from_file(path, file, compression))
    }

    /// Opens `path` for reading, returning `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Read`] for failures other than a missing file.
    pub fn open_if_exists(path: &Path, compression: Compression) -> StorageResult<Option<Self>> {
        match File::open(path) {
            Ok(file) => Ok(Some(Self::from_file(path, file, compression))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::read(path, e)),
        }
    }

    fn from_file(path: &Path, file: File, compression: Compression) -> Self {
        let gzipped =
            compression.is_enabled() || path.extension().is_some_and(|ext| ext == "gz");

        let reader: Box<dyn BufRead + Send> = if gzipped {
            Box::new(BufReader::new(GzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        Self {
            path: path.to_path_buf(),
            reader,
            buf: Vec::new(),
            number: 0,
        }
    }

    /// The file being read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for LineReader {
    type Item = StorageResult<Line>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => return None,
            Ok(_) => {}
            Err(e) => return Some(Err(StorageError::read(&self.path, e))),
        }
        self.number += 1;

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }

        let (text, lossy) = match String::from_utf8(std::mem::take(&mut self.buf)) {
            Ok(text) => (text, false),
            Err(e) => (String::from_utf8_lossy(e.as_bytes()).into_owned(), true),
        };
        Some(Ok(Line {
            number: self.number,
            text,
            lossy,
        }))
    }
}

impl std::fmt::Debug for LineReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineReader")
            .field("path", &self.path)
            .field("number", &self.number)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn numbers_lines_and_strips_carriage_returns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.dat");
        fs::write(&path, "V:1\r\n\r\n# note\nx\n").unwrap();

        let lines: Vec<Line> = LineReader::open(&path, Compression::None)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].text, "V:1");
        assert_eq!(lines[1].text, "");
        assert_eq!(lines[3].number, 4);
        assert_eq!(lines[3].text, "x");
    }

    #[test]
    fn invalid_utf8_is_replaced_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.dat");
        fs::write(&path, b"V:1\nok\nbad\xff\xfe|1\r\nlast").unwrap();

        let lines: Vec<Line> = LineReader::open(&path, Compression::None)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(lines.len(), 4);
        assert!(!lines[1].lossy);
        assert!(lines[2].lossy);
        assert_eq!(lines[2].text, "bad\u{fffd}\u{fffd}|1");
        assert_eq!(lines[3].text, "last");
        assert_eq!(lines[3].number, 4);
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempdir().unwrap();
        let reader = LineReader::open_if_exists(&dir.path().join("nope.dat"), Compression::None);
        assert!(reader.unwrap().is_none());
    }

    #[test]
    fn gz_extension_forces_decoding() {
        use flate2::write::GzEncoder;
        use std::io::Write;

        let dir = tempdir().unwrap();
        let path = dir.path().join("legacy.dat.gz");
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(b"V:1\nhello\n").unwrap();
        fs::write(&path, encoder.finish().unwrap()).unwrap();

        let text: Vec<String> = LineReader::open(&path, Compression::None)
            .unwrap()
            .map(|l| l.unwrap().text)
            .collect();
        assert_eq!(text, vec!["V:1", "hello"]);
    }

    #[test]
    fn extensions() {
        assert_eq!(Compression::from_flag(false).data_extension(), ".dat");
        assert_eq!(Compression::from_flag(true).data_extension(), ".dat.gz");
    }
}
