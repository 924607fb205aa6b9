use std::fs;
use std::io::{self, Write};
use std::path::Path;

use zip::write::FileOptions;
use zip::ZipWriter;

/// Writes `entries` (`(internal name, bytes)`) as `<root>/<internal name>.class`.
pub fn write_class_dir(root: &Path, entries: &[(&str, Vec<u8>)]) -> io::Result<()> {
    for (internal_name, bytes) in entries {
        let path = root.join(format!("{internal_name}.class"));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
    }
    Ok(())
}

/// Writes a jar whose entries are given verbatim (`(entry name, bytes)`), so
/// callers control `META-INF/versions/<n>/` prefixes.
pub fn write_jar(path: &Path, entries: &[(&str, Vec<u8>)]) -> io::Result<()> {
    let file = fs::File::create(path)?;
    write_zip(file, entries)
}

/// Writes a jmod: the `JM\x01\x00` magic followed by a zip whose class
/// entries live under `classes/`.
pub fn write_jmod(path: &Path, entries: &[(&str, Vec<u8>)]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(b"JM\x01\x00")?;
    write_zip(file, entries)
}

fn write_zip(file: fs::File, entries: &[(&str, Vec<u8>)]) -> io::Result<()> {
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default();
    for (name, bytes) in entries {
        zip.start_file(*name, options).map_err(io::Error::other)?;
        zip.write_all(bytes)?;
    }
    zip.finish().map_err(io::Error::other)?;
    Ok(())
}
