//! The snapshot codec: a whitespace-delimited text format, one record per
//! key per line, dumped and loaded wholesale under the store's lock.
//!
//! Grounded on the teacher's `rdb_load`/`rdb_save_background` (`rdb.rs`):
//! same shape (metadata-check-then-open, `BufReader`/`BufWriter`, a
//! boolean success return, a `log()` call on every failure path) even
//! though the wire format itself is the spec's plain text rather than
//! real RDB's binary length-prefixed encoding — the teacher's LZF string
//! compression has no counterpart here and was dropped (see DESIGN.md).
//! Per-line tolerance is grounded on `examples/original_source`'s
//! `RedisDatabase::load`, which skips unparseable lines rather than
//! aborting the whole load.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use crate::log::{log, LogLevel};
use crate::store::Store;
use crate::value::Value;

/// Dumps every key in `store` to `path`, truncating any existing file.
/// Returns `false` (and logs) on any I/O failure; never panics.
pub fn dump(store: &Store, path: &str) -> bool {
    let file = match File::create(path) {
        Ok(f) => f,
        Err(e) => {
            log(LogLevel::Warning, &format!("can't open '{path}' for snapshot write: {e}"));
            return false;
        }
    };
    let mut writer = BufWriter::new(file);
    for (key, value) in store.snapshot_entries() {
        let result = match &value {
            Value::Str(v) => write_line(&mut writer, b'K', &key, std::iter::once(v.clone())),
            Value::List(l) => write_line(&mut writer, b'L', &key, l.iter().cloned()),
            Value::Hash(h) => write_hash_line(&mut writer, &key, h),
        };
        if let Err(e) = result {
            log(LogLevel::Warning, &format!("error writing snapshot: {e}"));
            return false;
        }
    }
    if let Err(e) = writer.flush() {
        log(LogLevel::Warning, &format!("error flushing snapshot: {e}"));
        return false;
    }
    true
}

fn write_line<W: Write>(
    writer: &mut W,
    tag: u8,
    key: &[u8],
    fields: impl Iterator<Item = Vec<u8>>,
) -> std::io::Result<()> {
    writer.write_all(&[tag])?;
    writer.write_all(b" ")?;
    writer.write_all(key)?;
    for field in fields {
        writer.write_all(b" ")?;
        writer.write_all(&field)?;
    }
    writer.write_all(b"\n")
}

fn write_hash_line<W: Write>(
    writer: &mut W,
    key: &[u8],
    hash: &HashMap<Vec<u8>, Vec<u8>>,
) -> std::io::Result<()> {
    writer.write_all(b"H ")?;
    writer.write_all(key)?;
    for (field, value) in hash {
        writer.write_all(b" ")?;
        writer.write_all(field)?;
        writer.write_all(b":")?;
        writer.write_all(value)?;
    }
    writer.write_all(b"\n")
}

/// Loads `path` into `store`, clearing the store first. Returns `false`
/// when the file can't even be opened, in which case the store is left
/// untouched. Once the file is open, the store is cleared and
/// repopulated even if an I/O error interrupts the read partway through
/// (the spec treats that as "start empty", not as a partial-mutation bug).
pub fn load(store: &Store, path: &str) -> bool {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            log(LogLevel::Notice, &format!("no snapshot loaded from '{path}': {e}"));
            return false;
        }
    };

    let mut entries: HashMap<Vec<u8>, Value> = HashMap::new();
    let mut ok = true;
    for line in BufReader::new(file).split(b'\n') {
        match line {
            Ok(bytes) => {
                if let Some((key, value)) = parse_line(&bytes) {
                    entries.insert(key, value);
                }
            }
            Err(e) => {
                log(LogLevel::Warning, &format!("error reading snapshot: {e}"));
                ok = false;
                break;
            }
        }
    }
    store.load_entries(entries.into_iter().collect());
    ok
}

fn split_fields(line: &[u8]) -> Vec<Vec<u8>> {
    line.split(|&b| b == b' ' || b == b'\t')
        .filter(|f| !f.is_empty())
        .map(|f| f.to_vec())
        .collect()
}

fn parse_line(line: &[u8]) -> Option<(Vec<u8>, Value)> {
    let fields = split_fields(line);
    if fields.len() < 2 {
        return None;
    }
    let key = fields[1].clone();
    match fields[0].as_slice() {
        b"K" if fields.len() >= 2 => {
            Some((key, Value::Str(fields.get(2).cloned().unwrap_or_default())))
        }
        b"L" => Some((key, Value::List(fields[2..].iter().cloned().collect()))),
        b"H" => {
            let mut hash = HashMap::new();
            for token in &fields[2..] {
                if let Some(pos) = token.iter().position(|&b| b == b':') {
                    let field = token[..pos].to_vec();
                    let value = token[pos + 1..].to_vec();
                    hash.insert(field, value);
                }
            }
            Some((key, Value::Hash(hash)))
        }
        _ => None,
    }
}
