//! Import of the JSON files produced by the tuners.
//!
//! Tuners write one file per run. Depending on the version of the tuner, the identity
//! of the device is stored under `clblast_device_*` or `device_*` keys, numbers may be
//! stored as strings and the kernel name may be repeated in each result.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::database::{Arguments, Parameters, Section, SectionId, TuningResult};
use crate::error::{Error, ImportError};

lazy_static! {
    /// Numeric suffix appended by the tuners to kernel family names.
    static ref FAMILY_SUFFIX: Regex = unwrap!(Regex::new(r"_\d+$"));
}

/// The parameter holding the precision, redundant with the section precision.
const PRECISION_PARAMETER: &str = "PRECISION";

#[derive(Debug, Deserialize)]
struct RawTuningRun {
    #[serde(default)]
    clblast_device_name: Option<String>,
    #[serde(default)]
    clblast_device_vendor: Option<String>,
    #[serde(default)]
    clblast_device_type: Option<String>,
    #[serde(default)]
    clblast_device_architecture: Option<String>,
    #[serde(default)]
    device: Option<String>,
    #[serde(default)]
    device_vendor: Option<String>,
    #[serde(default)]
    device_type: Option<String>,
    #[serde(default)]
    device_architecture: Option<String>,
    #[serde(default, deserialize_with = "integer")]
    device_compute_units: Option<i64>,
    #[serde(default, deserialize_with = "integer")]
    device_core_clock: Option<i64>,
    #[serde(default, deserialize_with = "string_or_number")]
    precision: Option<String>,
    #[serde(default)]
    kernel_family: Option<String>,
    #[serde(default)]
    kernel: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    arg_m: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    arg_n: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    arg_k: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    arg_alpha: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    arg_beta: Option<String>,
    #[serde(default)]
    results: Vec<RawResult>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    #[serde(default)]
    kernel: Option<String>,
    time: f64,
    parameters: BTreeMap<String, i64>,
}

/// Accepts both JSON strings and numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(value) => Err(de::Error::custom(format!(
            "expected a string or a number, found {}",
            value
        ))),
    }
}

/// Accepts integers stored as JSON numbers or strings.
fn integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match string_or_number(deserializer)? {
        None => Ok(None),
        Some(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected an integer, found `{}`", s))),
    }
}

/// Normalizes the spelling of scalar arguments: real values are printed with six
/// decimals and complex values with the shortest representation of each part.
fn normalize_scalar(value: String) -> String {
    if let Ok(real) = value.parse::<f64>() {
        return format!("{:.6}", real);
    }
    let complex = value
        .strip_suffix('i')
        .and_then(|v| v.rfind('+').filter(|&i| i > 0).map(|i| (&v[..i], &v[i + 1..])))
        .and_then(|(re, im)| Some((re.parse::<f64>().ok()?, im.parse::<f64>().ok()?)));
    match complex {
        Some((re, im)) => format!("{}+{}i", re, im),
        None => value,
    }
}

/// Parses the content of a tuning-run file.
pub fn parse_tuning_run(json: &str) -> Result<Section, ImportError> {
    let raw: RawTuningRun = serde_json::from_str(json)?;
    if raw.results.is_empty() {
        return Err(ImportError::NoResults);
    }

    let device = raw
        .clblast_device_name
        .or(raw.device)
        .ok_or(ImportError::MissingField("device"))?;
    let device_vendor = raw
        .clblast_device_vendor
        .or(raw.device_vendor)
        .ok_or(ImportError::MissingField("device_vendor"))?;
    let device_type = raw
        .clblast_device_type
        .or(raw.device_type)
        .ok_or(ImportError::MissingField("device_type"))?;
    let device_architecture = raw
        .clblast_device_architecture
        .or(raw.device_architecture)
        .unwrap_or_default();
    let precision = raw.precision.ok_or(ImportError::MissingField("precision"))?;
    let kernel_family = raw
        .kernel_family
        .ok_or(ImportError::MissingField("kernel_family"))?;
    let kernel_family = FAMILY_SUFFIX.replace(&kernel_family, "").into_owned();

    let mut kernel = raw.kernel;
    let mut results = Vec::with_capacity(raw.results.len());
    for result in raw.results {
        if let Some(found) = result.kernel {
            match kernel {
                None => kernel = Some(found),
                Some(ref expected) if *expected != found => {
                    return Err(ImportError::KernelMismatch {
                        expected: expected.clone(),
                        found,
                    });
                }
                Some(_) => (),
            }
        }
        let mut parameters: Parameters = result.parameters;
        if let Some(found) = parameters.remove(PRECISION_PARAMETER) {
            if precision.parse::<i64>().ok() != Some(found) {
                return Err(ImportError::PrecisionMismatch {
                    expected: precision,
                    found,
                });
            }
        }
        results.push(TuningResult::new(parameters, result.time));
    }
    let kernel = kernel.ok_or(ImportError::MissingKernel)?;

    let id = SectionId {
        device,
        device_vendor,
        device_type,
        device_architecture,
        device_compute_units: raw.device_compute_units.unwrap_or(0),
        device_core_clock: raw.device_core_clock.unwrap_or(0),
        precision,
        kernel_family,
        kernel,
        arguments: Arguments {
            arg_m: raw.arg_m,
            arg_n: raw.arg_n,
            arg_k: raw.arg_k,
            arg_alpha: raw.arg_alpha.map(normalize_scalar),
            arg_beta: raw.arg_beta.map(normalize_scalar),
        },
    };
    debug!("imported {} results for {}", results.len(), id);
    Ok(Section::new(id, results))
}

/// Loads a tuning-run file.
pub fn load_tuning_run<P: AsRef<Path>>(path: P) -> Result<Section, ImportError> {
    let json = fs::read_to_string(path)?;
    parse_tuning_run(&json)
}

/// Lists the JSON files of a directory, sorted by name.
pub fn list_tuning_runs<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, Error> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|err| Error::io(dir, err))?;
    let mut paths = vec![];
    for entry in entries {
        let path = entry.map_err(|err| Error::io(dir, err))?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "json") {
            paths.push(path);
        }
    }
    Ok(paths.into_iter().sorted().collect())
}
