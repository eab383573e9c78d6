//! Storage of the database on disk.
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::info;

use crate::compact::{compact, decompact, CompactDatabase};
use crate::database::Database;
use crate::error::Error;

/// Loads a database stored in compact form.
pub fn load_database<P: AsRef<Path>>(path: P) -> Result<Database, Error> {
    let path = path.as_ref();
    info!("loading database from {}", path.display());
    let file = File::open(path).map_err(|err| Error::io(path, err))?;
    let compact_database: CompactDatabase = serde_json::from_reader(BufReader::new(file))?;
    decompact(compact_database)
}

/// Saves a database in compact form. Keys are sorted so that the file is stable
/// across runs. The file is replaced atomically.
pub fn save_database<P: AsRef<Path>>(database: &Database, path: P) -> Result<(), Error> {
    let path = path.as_ref();
    info!(
        "saving database with {} sections to {}",
        database.sections.len(),
        path.display()
    );
    // `serde_json::Value` objects are sorted maps.
    let value = serde_json::to_value(compact(database)?)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|err| Error::io(dir, err))?;
    let temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|err| Error::io(dir, err))?;
    {
        let mut writer = BufWriter::new(temp_file.as_file());
        serde_json::to_writer_pretty(&mut writer, &value)?;
        writer.flush().map_err(|err| Error::io(path, err))?;
    }
    temp_file
        .persist(path)
        .map_err(|err| Error::io(path, err.error))?;
    Ok(())
}

/// Downloads a copy of the database to `path`.
pub fn download_database<P: AsRef<Path>>(url: &str, path: P) -> Result<(), Error> {
    let path = path.as_ref();
    info!("downloading database from {}", url);
    let download_error = |reason: String| Error::Download {
        url: url.to_string(),
        reason,
    };
    let response = ureq::get(url)
        .call()
        .map_err(|err| download_error(err.to_string()))?;
    let mut body = String::new();
    response
        .into_reader()
        .read_to_string(&mut body)
        .map_err(|err| download_error(err.to_string()))?;
    // Reject anything that is not a database before writing it.
    let compact_database: CompactDatabase = serde_json::from_str(&body)?;
    info!(
        "downloaded {} sections to {}",
        compact_database.sections.len(),
        path.display()
    );
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|err| Error::io(dir, err))?;
    }
    fs::write(path, body).map_err(|err| Error::io(path, err))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::database::{Arguments, Parameters, Section, SectionId, TuningResult};

    fn database() -> Database {
        let id = SectionId {
            device: "GeForce GTX 1080".to_string(),
            device_vendor: "NVIDIA".to_string(),
            device_type: "GPU".to_string(),
            device_architecture: "SM6.1".to_string(),
            device_compute_units: 20,
            device_core_clock: 1733,
            precision: "3232".to_string(),
            kernel_family: "xgemv".to_string(),
            kernel: "Xgemv".to_string(),
            arguments: Arguments {
                arg_m: Some("256".to_string()),
                arg_n: Some("256".to_string()),
                ..Arguments::default()
            },
        };
        let mut parameters = Parameters::new();
        parameters.insert("WGS1".to_string(), 64);
        parameters.insert("WPT1".to_string(), 1);
        Database::new(vec![Section::new(
            id,
            vec![TuningResult::new(parameters, 0.125)],
        )])
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("database.json");
        save_database(&database(), &path).unwrap();
        assert_eq!(load_database(&path).unwrap(), database());
        let content = fs::read_to_string(&path).unwrap();
        let arg_m = content.find("\"arg_m\"").unwrap();
        let device = content.find("\"device\"").unwrap();
        let results = content.find("\"results\"").unwrap();
        assert!(arg_m < device && device < results);
    }

    #[test]
    fn load_missing() {
        let dir = tempfile::tempdir().unwrap();
        match load_database(dir.path().join("database.json")) {
            Err(Error::Io { .. }) => (),
            res => panic!("unexpected result {:?}", res),
        }
    }

    #[test]
    fn load_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        fs::write(&path, "{\"sections\": [{}]}").unwrap();
        match load_database(&path) {
            Err(Error::Json(_)) => (),
            res => panic!("unexpected result {:?}", res),
        }
    }
}
