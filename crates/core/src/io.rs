//! Reading raw CSV input and writing chat tables.

use std::io::Write;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::table::{ChatTable, RawTable};

/// Look up an encoding by its WHATWG label (`utf-8`, `macintosh`,
/// `windows-1252`, ...).
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| Error::Config(format!("unknown input encoding '{label}'")))
}

/// Read a delimited file with a header row.
///
/// Bytes are decoded with the given encoding before parsing; a byte order mark
/// is dropped and malformed sequences are replaced.
pub fn read_raw_table(path: &Path, encoding_label: &str, delimiter: u8) -> Result<RawTable> {
    let encoding = resolve_encoding(encoding_label)?;
    let bytes = std::fs::read(path)?;
    let (text, had_errors) = encoding.decode_with_bom_removal(&bytes);
    if had_errors {
        warn!(
            path = %path.display(),
            encoding = encoding.name(),
            "input contained malformed byte sequences; replaced them"
        );
    }
    let table = parse_csv(&text, delimiter)?;
    debug!(path = %path.display(), rows = table.len(), columns = table.headers.len(), "read input");
    Ok(table)
}

/// Parse delimited text with a header row into a [`RawTable`].
///
/// Records of the wrong width are kept as-is; preprocessing reports them.
pub fn parse_csv(text: &str, delimiter: u8) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawTable::new(headers, records))
}

/// Serialize a table as CSV (header first) into any writer.
pub fn write_csv<W: Write>(table: &ChatTable, writer: W) -> csv::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(table.columns())?;
    for row in table.rows() {
        csv_writer.write_record(row.cells.iter().map(|cell| cell.to_string()))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write a table to `path`, creating missing parent directories.
///
/// The CSV is written to a temporary file in the destination directory and
/// renamed over `path` once complete, so a failed write never leaves a partial
/// artifact behind.
pub fn write_table(table: &ChatTable, path: &Path) -> Result<()> {
    let output_error = |source: std::io::Error| Error::Output {
        path: path.to_path_buf(),
        source,
    };

    let dir: PathBuf = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(output_error)?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(output_error)?;
    write_csv(table, &mut tmp).map_err(|e| output_error(e.into()))?;
    tmp.as_file().sync_all().map_err(output_error)?;
    tmp.persist(path).map_err(|e| output_error(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ChatRow, KeyColumns, Value};
    use tempfile::TempDir;

    fn table() -> ChatTable {
        let keys = KeyColumns {
            conversation: 0,
            speaker: 1,
            message: 2,
        };
        let rows = vec![ChatRow {
            sequence_index: 0,
            cells: vec!["1".into(), "ann".into(), "hi, there".into(), Value::Float(0.5)],
        }];
        ChatTable::new(
            vec!["conversation_num".into(), "speaker_nickname".into(), "message".into(), "word_TTR".into()],
            keys,
            rows,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_csv() {
        let raw = parse_csv("a,b\n1,\"x, y\"\n2,z\n", b',').unwrap();
        assert_eq!(raw.headers, vec!["a", "b"]);
        assert_eq!(raw.records[0], vec!["1", "x, y"]);
        assert_eq!(raw.len(), 2);
    }

    #[test]
    fn test_parse_csv_other_delimiter() {
        let raw = parse_csv("a;b\n1;2\n", b';').unwrap();
        assert_eq!(raw.records[0], vec!["1", "2"]);
    }

    #[test]
    fn test_read_mac_roman() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("in.csv");
        // 0x8E is 'é' in Mac Roman.
        std::fs::write(&path, b"message\ncaf\x8E\n").unwrap();
        let raw = read_raw_table(&path, "macintosh", b',').unwrap();
        assert_eq!(raw.records[0][0], "café");
    }

    #[test]
    fn test_read_strips_utf8_bom() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("in.csv");
        std::fs::write(&path, b"\xEF\xBB\xBFmessage\nhi\n").unwrap();
        let raw = read_raw_table(&path, "utf-8", b',').unwrap();
        assert_eq!(raw.headers, vec!["message"]);
    }

    #[test]
    fn test_unknown_encoding() {
        assert!(matches!(resolve_encoding("not-a-charset"), Err(Error::Config(_))));
        assert!(resolve_encoding("mac_roman").is_err());
        assert!(resolve_encoding("macintosh").is_ok());
    }

    #[test]
    fn test_write_table_creates_directories() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("output/first_50/out.csv");
        write_table(&table(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "conversation_num,speaker_nickname,message,word_TTR\n1,ann,\"hi, there\",0.5\n"
        );
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_write_table_unwritable_path() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        let err = write_table(&table(), &blocker.join("out.csv")).unwrap_err();
        assert!(matches!(err, Error::Output { .. }));
    }
}
