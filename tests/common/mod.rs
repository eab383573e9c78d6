//! Helpers to build databases in integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::Path;

use tunedb::database::Arguments;
use tunedb::{Database, Parameters, Section, SectionId, TuningResult};

/// Builds parameters from `(name, value)` pairs.
pub fn params(values: &[(&str, i64)]) -> Parameters {
    values.iter().map(|&(k, v)| (k.to_string(), v)).collect()
}

/// Builds a section of the `Xgemm` kernel on an AMD GPU.
pub struct SectionBuilder {
    id: SectionId,
    results: Vec<TuningResult>,
}

impl SectionBuilder {
    pub fn new(device: &str) -> Self {
        SectionBuilder {
            id: SectionId {
                device: device.to_string(),
                device_vendor: "AMD".to_string(),
                device_type: "GPU".to_string(),
                device_architecture: "gfx900".to_string(),
                device_compute_units: 64,
                device_core_clock: 1500,
                precision: "32".to_string(),
                kernel_family: "xgemm".to_string(),
                kernel: "Xgemm".to_string(),
                arguments: Arguments::default(),
            },
            results: vec![],
        }
    }

    pub fn vendor(mut self, vendor: &str) -> Self {
        self.id.device_vendor = vendor.to_string();
        self
    }

    pub fn architecture(mut self, architecture: &str) -> Self {
        self.id.device_architecture = architecture.to_string();
        self
    }

    pub fn kernel(mut self, family: &str, kernel: &str) -> Self {
        self.id.kernel_family = family.to_string();
        self.id.kernel = kernel.to_string();
        self
    }

    pub fn precision(mut self, precision: &str) -> Self {
        self.id.precision = precision.to_string();
        self
    }

    pub fn arg_m(mut self, arg_m: &str) -> Self {
        self.id.arguments.arg_m = Some(arg_m.to_string());
        self
    }

    pub fn result(mut self, parameters: &[(&str, i64)], time: f64) -> Self {
        self.results.push(TuningResult::new(params(parameters), time));
        self
    }

    pub fn get(self) -> Section {
        Section::new(self.id, self.results)
    }
}

/// Builds a database from sections.
pub fn database(sections: Vec<Section>) -> Database {
    Database::new(sections)
}

/// Writes a raw tuning run in the format of the tuners.
pub fn write_tuning_run(dir: &Path, name: &str, device: &str, results: &[(i64, f64)]) {
    let results = results
        .iter()
        .map(|&(wgs, time)| {
            serde_json::json!({
                "kernel": "XaxpyFastest",
                "time": time,
                "parameters": {"WGS": wgs, "WPT": 1, "VW": 1, "PRECISION": 32},
            })
        })
        .collect::<Vec<_>>();
    let run = serde_json::json!({
        "kernel_family": "xaxpy_1",
        "precision": "32",
        "arg_n": "4194304",
        "arg_alpha": "2.00",
        "device": device,
        "device_vendor": "NVIDIA Corporation",
        "device_type": "GPU",
        "device_core_clock": "1733",
        "device_compute_units": "20",
        "clblast_device_architecture": "SM6.1",
        "results": results,
    });
    fs::write(dir.join(name), serde_json::to_string_pretty(&run).unwrap()).unwrap();
}
