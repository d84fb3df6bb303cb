//! Refresh-list file format.
//!
//! One `<record-type> <domain>` per line. Blank lines and lines starting with
//! `#` are ignored. Lines that do not parse are logged and skipped so a single
//! bad entry never costs the rest of the list.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;
use crate::key::QueryKey;
use crate::logging::targets;

/// Read a refresh list.
///
/// A missing file yields an empty list and a warning.
pub fn load_queries(path: &Path) -> Result<Vec<QueryKey>, PersistenceError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(
                target: targets::PERSIST,
                path = %path.display(),
                "refresh list not found, starting empty"
            );
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(PersistenceError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    Ok(parse_queries(&contents, path))
}

fn parse_queries(contents: &str, path: &Path) -> Vec<QueryKey> {
    let mut keys = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match QueryKey::parse_line(line) {
            Ok(key) => keys.push(key),
            Err(err) => tracing::warn!(
                target: targets::PERSIST,
                path = %path.display(),
                line = index + 1,
                error = %err,
                "skipping unparsable refresh list entry"
            ),
        }
    }
    keys
}

/// Write a refresh list atomically, returning the number of entries written.
pub fn save_queries<'a, I>(path: &Path, keys: I) -> Result<usize, PersistenceError>
where
    I: IntoIterator<Item = &'a QueryKey>,
{
    let write_err = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = AtomicWriter::new(path).map_err(write_err)?;
    let mut count = 0;
    for key in keys {
        writeln!(writer.file(), "{key}").map_err(write_err)?;
        count += 1;
    }
    writer.commit().map_err(write_err)?;

    tracing::debug!(target: targets::PERSIST, path = %path.display(), count, "refresh list saved");
    Ok(count)
}

/// Writes to a temporary sibling file and renames it over the target on
/// commit. Dropping without committing removes the temporary file.
struct AtomicWriter {
    target: PathBuf,
    temp: PathBuf,
    writer: Option<BufWriter<fs::File>>,
}

impl AtomicWriter {
    fn new(target: &Path) -> io::Result<Self> {
        let parent = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "queries".to_string());
        let temp = parent.join(format!(".{}.tmp.{}", file_name, std::process::id()));
        let file = fs::File::create(&temp)?;

        Ok(Self {
            target: target.to_path_buf(),
            temp,
            writer: Some(BufWriter::new(file)),
        })
    }

    fn file(&mut self) -> &mut dyn Write {
        match self.writer.as_mut() {
            Some(writer) => writer,
            None => unreachable!("writer is only taken by commit"),
        }
    }

    fn commit(mut self) -> io::Result<()> {
        let Some(mut writer) = self.writer.take() else {
            unreachable!("writer is only taken by commit");
        };
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);
        fs::rename(&self.temp, &self.target)
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        if self.temp.exists() {
            let _ = fs::remove_file(&self.temp);
        }
    }
}
