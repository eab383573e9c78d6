//! Generation of the C++ tables holding the best parameters of each kernel family.
//!
//! Each family gets its own `<family>.hpp` file with one entry per precision. Entries
//! are nested by vendor and device type, then by architecture, then by device. Each
//! device row lists the values of the parameters named in the entry header, padded
//! with zeros to a fixed width.
use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::{info, warn};

use crate::attribute::{Attribute, Record};
use crate::config::Config;
use crate::database::*;
use crate::error::Error;
use crate::group::group_by;

/// Parameter holding the precision. Never emitted.
const PRECISION_PARAMETER: &str = "PRECISION";
/// Width of device names in the tables.
const DEVICE_NAME_WIDTH: usize = 50;

const SEPARATOR: &str =
    "// =================================================================================================";

/// A generated file.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceFile {
    /// File name, relative to the output directory.
    pub name: String,
    pub contents: String,
}

/// The best parameters of one kernel on one device, as they appear in the tables.
#[derive(Debug)]
struct Row<'a> {
    id: &'a SectionId,
    architecture: &'a str,
    parameters: &'a Parameters,
}

impl<'a> Record for Row<'a> {
    fn attribute(&self, attr: Attribute) -> Option<String> {
        match attr {
            Attribute::DeviceArchitecture => Some(self.architecture.to_string()),
            attr => self.id.attribute(attr),
        }
    }
}

/// Returns the name of a precision in the tables.
pub fn precision_to_string(precision: &str) -> Result<&'static str, Error> {
    match precision {
        "16" => Ok("Half"),
        "32" => Ok("Single"),
        "64" => Ok("Double"),
        "3232" => Ok("ComplexSingle"),
        "6464" => Ok("ComplexDouble"),
        _ => Err(Error::UnknownPrecision(precision.to_string())),
    }
}

/// Capitalizes each word of a family name and removes the underscores:
/// `xgemm_direct` becomes `XgemmDirect`.
pub fn camel_case(name: &str) -> String {
    let mut camel = String::with_capacity(name.len());
    let mut new_word = true;
    for c in name.chars() {
        if c.is_alphabetic() {
            if new_word {
                camel.extend(c.to_uppercase());
            } else {
                camel.extend(c.to_lowercase());
            }
            new_word = false;
        } else {
            if c != '_' {
                camel.push(c);
            }
            new_word = true;
        }
    }
    camel
}

/// Upper-cases the first letter of a device type.
fn device_type_name(device_type: &str) -> String {
    let mut chars = device_type.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Renders the tables of all the kernel families of the database.
pub fn render_database(database: &Database, config: &Config) -> Result<Vec<SourceFile>, Error> {
    let rows = database
        .sections
        .iter()
        .filter_map(|section| match section.best() {
            Some(best) => Some(Row {
                id: &section.id,
                architecture: if section.id.device_architecture.is_empty() {
                    DEVICE_ARCHITECTURE_DEFAULT
                } else {
                    &section.id.device_architecture
                },
                parameters: &best.parameters,
            }),
            None => {
                warn!("{} has no results, not emitted", section.id);
                None
            }
        })
        .collect_vec();
    if rows.is_empty() {
        return Ok(vec![]);
    }
    group_by(&rows, &[Attribute::KernelFamily])?
        .into_iter()
        .map(|(_, family)| render_family(&family, config))
        .collect()
}

fn render_family(rows: &[&Row], config: &Config) -> Result<SourceFile, Error> {
    let family = &rows[0].id.kernel_family;
    let entry_name = camel_case(family);
    let mut out = String::new();
    out.push_str(&format!("\n{}\n", SEPARATOR));
    out.push_str("// This file is generated by tunedb from the tuning database.\n//\n");
    out.push_str(&format!(
        "// This file populates the database with best-found tuning parameters for the '{}' \
         kernels.\n//\n",
        entry_name
    ));
    out.push_str(&format!(
        "{}\n\nnamespace clblast {{\nnamespace database {{\n",
        SEPARATOR
    ));
    for (_, precision) in group_by(rows.iter().cloned(), &[Attribute::Precision])? {
        render_precision(&mut out, &entry_name, &precision, config)?;
    }
    out.push_str("\n} // namespace database\n} // namespace clblast\n");
    Ok(SourceFile {
        name: format!("{}.hpp", family),
        contents: out,
    })
}

fn render_precision(
    out: &mut String,
    entry_name: &str,
    rows: &[&Row],
    config: &Config,
) -> Result<(), Error> {
    let precision = precision_to_string(&rows[0].id.precision)?;
    let names = rows
        .iter()
        .flat_map(|row| row.parameters.keys())
        .filter(|name| name.as_str() != PRECISION_PARAMETER)
        .sorted()
        .dedup()
        .collect_vec();
    if names.len() > config.max_parameters {
        return Err(Error::TooManyParameters {
            family: rows[0].id.kernel_family.clone(),
            count: names.len(),
            max: config.max_parameters,
        });
    }
    let quoted_names = names.iter().map(|name| format!("\"{}\"", name)).join(", ");
    out.push_str(&format!(
        "\nconst DatabaseEntry {name}{precision} = {{\n  \"{name}\", Precision::k{precision}, \
         {{{names}}}, {{\n",
        name = entry_name,
        precision = precision,
        names = quoted_names
    ));

    let device_types = group_by(
        rows.iter().cloned(),
        &[Attribute::DeviceVendor, Attribute::DeviceType],
    )?;
    for (_, device_type) in device_types {
        let vendor = &device_type[0].id.device_vendor;
        let type_name = &device_type[0].id.device_type;
        if vendor == VENDOR_DEFAULT && type_name == DEVICE_TYPE_DEFAULT {
            out.push_str("    { // Default\n");
        } else {
            out.push_str(&format!("    {{ // {} {}s\n", vendor, type_name));
        }
        out.push_str(&format!(
            "      kDeviceType{}, \"{}\", {{\n",
            device_type_name(type_name),
            vendor
        ));
        for (_, architecture) in group_by(device_type, &[Attribute::DeviceArchitecture])? {
            out.push_str(&format!("        {{ \"{}\", {{\n", architecture[0].architecture));
            for (_, device) in group_by(architecture, &[Attribute::Device])? {
                let device_name = &device[0].id.device;
                let name_field = if device_name == DEVICE_NAME_DEFAULT {
                    format!("{:<width$}", "kDeviceNameDefault", width = DEVICE_NAME_WIDTH + 8)
                } else {
                    format!("Name{{\"{:<width$.width$}\"}}", device_name, width = DEVICE_NAME_WIDTH)
                };
                let values = device_values(&device, &names, config)?;
                out.push_str(&format!(
                    "          {{ {}, Params{{ {} }} }},\n",
                    name_field,
                    values.iter().join(", ")
                ));
            }
            out.push_str("        } },\n");
        }
        out.push_str("      }\n    },\n");
    }
    out.push_str(&format!("  }}\n}};\n\n{}\n", SEPARATOR));
    Ok(())
}

/// Returns the parameter values of one device, in the order of `names` and padded with
/// zeros. Kernels are merged in name order.
fn device_values(rows: &[&Row], names: &[&String], config: &Config) -> Result<Vec<i64>, Error> {
    let mut parameters = Parameters::new();
    for (_, kernel) in group_by(rows.iter().cloned(), &[Attribute::Kernel])? {
        if kernel.len() > 1 {
            warn!(
                "{} entries for kernel {} of {} in the {} tables, using the first one",
                kernel.len(),
                kernel[0].id.kernel,
                kernel[0].id.device,
                kernel[0].id.kernel_family
            );
        }
        for (name, &value) in kernel[0].parameters {
            parameters.entry(name.clone()).or_insert(value);
        }
    }
    let mut values = Vec::with_capacity(config.max_parameters);
    for &name in names {
        match parameters.get(name) {
            Some(&value) => values.push(value),
            None => {
                warn!(
                    "missing parameter {} for {} in the {} tables, using 0",
                    name, rows[0].id.device, rows[0].id.kernel_family
                );
                values.push(0);
            }
        }
    }
    values.resize(config.max_parameters, 0);
    Ok(values)
}

/// Writes the generated files to `dir`.
pub fn write_sources<P: AsRef<Path>>(dir: P, files: &[SourceFile]) -> Result<Vec<PathBuf>, Error> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|err| Error::io(dir, err))?;
    let mut paths = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file.name);
        fs::write(&path, &file.contents).map_err(|err| Error::io(&path, err))?;
        info!("wrote {}", path.display());
        paths.push(path);
    }
    Ok(paths)
}
