//! Defines a structure to store the configuration of the database compiler. The
//! configuration is read from the file given on the command line or, if there is none,
//! from `tunedb/tunedb.toml` in the XDG configuration directories.
use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::attribute::Schema;
use crate::error::Error;

/// Stores the configuration of the database compiler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Location of a reference copy of the database, downloaded when there is no local
    /// database.
    pub database_url: String,
    /// Path of the database, relative to the library root.
    pub database_file: String,
    /// Path of the database holding only the best results, relative to the library
    /// root. Only written in verbose mode.
    pub database_best_file: String,
    /// A file that must exist under the library root, to validate the root.
    pub header_file: String,
    /// Directory where the kernel tables are written, relative to the library root.
    pub output_dir: String,
    /// Number of parameters in each row of the tables.
    pub max_parameters: usize,
    /// Kernels whose times are compared as is instead of relative to the best time of
    /// each device.
    pub unnormalized_kernels: Vec<String>,
    /// Vendor names to replace. Needs to be after plain values for TOML serialization,
    /// because it is an array of tables.
    pub vendor_aliases: Vec<VendorAlias>,
    /// Attributes used to group the database. Needs to be last for TOML
    /// serialization, because it is a table.
    pub schema: Schema,
}

impl Config {
    fn create_parser() -> Result<config::Config, Error> {
        let mut config_parser = config::Config::new();
        // An empty source fails to parse as a unit value, so at least one key must be
        // set.
        config_parser.set_default("max_parameters", 16i64)?;
        Ok(config_parser)
    }

    /// Extract the configuration from the given configuration file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut parser = Self::create_parser()?;
        parser.merge(config::File::from(path.as_ref()))?;
        Ok(parser.try_into::<Self>()?)
    }

    /// Parse the configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let mut parser = Self::create_parser()?;
        parser.merge(config::File::from_str(json, config::FileFormat::Json))?;
        Ok(parser.try_into::<Self>()?)
    }

    /// Loads the configuration from `path` if provided, from the user configuration
    /// file if it exists, or uses the default configuration.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        if let Some(path) = path {
            info!("loading configuration from {}", path.display());
            return Self::from_path(path);
        }
        match Self::user_config_path() {
            Some(path) => {
                info!("loading configuration from {}", path.display());
                Self::from_path(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Returns the path of the user configuration file, if it exists.
    fn user_config_path() -> Option<PathBuf> {
        match xdg::BaseDirectories::with_prefix("tunedb") {
            Ok(xdg_dirs) => xdg_dirs.find_config_file("tunedb.toml"),
            Err(err) => {
                debug!("no configuration directory: {}", err);
                None
            }
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", unwrap!(toml::to_string(self)))
    }
}

impl Default for Config {
    fn default() -> Self {
        let vendor_aliases = vec![
            VendorAlias::new("GenuineIntel", "Intel"),
            VendorAlias::new("Intel(R) Corporation", "Intel"),
            VendorAlias::new("Advanced Micro Devices, Inc.", "AMD"),
            VendorAlias::new("NVIDIA Corporation", "NVIDIA"),
        ];
        Config {
            database_url:
                "https://raw.githubusercontent.com/CNugteren/CLBlast-database/master/database.json"
                    .to_string(),
            database_file: "scripts/database/database.json".to_string(),
            database_best_file: "scripts/database/database_best.json".to_string(),
            header_file: "include/clblast.h".to_string(),
            output_dir: "src/database/kernels".to_string(),
            max_parameters: 16,
            unnormalized_kernels: vec!["gemm_kernel_selection".to_string()],
            vendor_aliases,
            schema: Schema::default(),
        }
    }
}

/// Another name a vendor reports itself with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VendorAlias {
    /// Name reported by the device.
    pub alias: String,
    /// Name stored in the database.
    pub name: String,
}

impl VendorAlias {
    pub fn new(alias: &str, name: &str) -> Self {
        VendorAlias {
            alias: alias.to_string(),
            name: name.to_string(),
        }
    }
}
