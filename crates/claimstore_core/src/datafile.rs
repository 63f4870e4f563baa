//! Versioned data file reading and writing shared by both stores.

use crate::error::{CoreError, CoreResult};
use crate::report::{LoadReport, SkippedLine};
use claimstore_codec::{decode_header, encode_header, is_skippable, CodecResult, FORMAT_VERSION};
use claimstore_storage::{replace_lines, Compression, LineReader};
use std::iter;
use std::path::Path;
use tracing::warn;

/// Reads every record from a data file.
///
/// Returns `None` if the file does not exist. Blank and comment lines are
/// ignored. Lines that fail to decode are logged and listed in the report.
///
/// # Errors
///
/// - [`CoreError::InvalidFormat`] if the first line is not a version header
/// - [`CoreError::FormatVersionUnsupported`] if the header is too new
/// - a storage error if the file cannot be read
pub(crate) fn read_data_file<T, F>(
    path: &Path,
    compression: Compression,
    kind: &str,
    mut decode: F,
) -> CoreResult<Option<(Vec<T>, LoadReport)>>
where
    F: FnMut(&str) -> CodecResult<T>,
{
    let Some(mut reader) = LineReader::open_if_exists(path, compression)? else {
        return Ok(None);
    };

    let missing_header =
        || CoreError::invalid_format(format!("{}: missing version header", path.display()));

    let header = reader.next().ok_or_else(missing_header)??;
    let version = decode_header(&header.text).map_err(|_| missing_header())?;
    if version > FORMAT_VERSION {
        return Err(CoreError::FormatVersionUnsupported {
            path: path.to_path_buf(),
            found: version,
            supported: FORMAT_VERSION,
        });
    }

    let mut records = Vec::new();
    let mut report = LoadReport {
        files: 1,
        ..LoadReport::default()
    };

    for line in reader {
        let line = line?;
        if is_skippable(&line.text) {
            continue;
        }
        if line.lossy {
            warn!(
                path = %path.display(),
                line = line.number,
                "replaced invalid UTF-8 in {kind} record"
            );
        }

        match decode(&line.text) {
            Ok(record) => records.push(record),
            Err(error) => {
                warn!(
                    path = %path.display(),
                    line = line.number,
                    %error,
                    "skipping malformed {kind} record"
                );
                report.skipped.push(SkippedLine {
                    path: path.to_path_buf(),
                    line: line.number,
                    error,
                });
            }
        }
    }

    report.loaded = records.len();
    Ok(Some((records, report)))
}

/// Atomically replaces a data file with a version header followed by `lines`.
pub(crate) fn write_data_file<I>(path: &Path, compression: Compression, lines: I) -> CoreResult<()>
where
    I: IntoIterator<Item = String>,
{
    let header = encode_header(FORMAT_VERSION);
    replace_lines(path, compression, iter::once(header).chain(lines))?;
    Ok(())
}
