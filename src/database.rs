//! The tuning database: sections of tuning results, keyed by device, kernel and
//! problem arguments.
use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::attribute::{Attribute, GroupKey, Record, Schema};
use crate::config::VendorAlias;
use crate::error::Error;
use crate::group::group_by;

/// Name of the device in default sections.
pub const DEVICE_NAME_DEFAULT: &str = "default";
/// Vendor of global default sections.
pub const VENDOR_DEFAULT: &str = "default";
/// Device type of global default sections.
pub const DEVICE_TYPE_DEFAULT: &str = "All";
/// Architecture of device-type and global default sections.
pub const DEVICE_ARCHITECTURE_DEFAULT: &str = "default";

/// Values of the tuning parameters of a kernel, sorted by name.
pub type Parameters = BTreeMap<String, i64>;

/// A measured execution time for one value of the tuning parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TuningResult {
    pub parameters: Parameters,
    /// Execution time. Lower is better.
    pub time: f64,
}

impl TuningResult {
    pub fn new(parameters: Parameters, time: f64) -> Self {
        TuningResult { parameters, time }
    }

    /// Returns the sorted names of the parameters.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.keys().map(|s| s.as_str()).collect()
    }
}

/// Problem-size arguments a kernel was tuned for. Kernels only carry the arguments
/// relevant to them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg_m: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg_n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg_k: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg_alpha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg_beta: Option<String>,
}

/// Identifies a section: the device, the kernel and the arguments it was tuned on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionId {
    pub device: String,
    pub device_vendor: String,
    pub device_type: String,
    /// Empty when the architecture is unknown.
    #[serde(default)]
    pub device_architecture: String,
    pub device_compute_units: i64,
    pub device_core_clock: i64,
    /// Precision code, such as "32" or "3232".
    pub precision: String,
    pub kernel_family: String,
    pub kernel: String,
    #[serde(flatten)]
    pub arguments: Arguments,
}

impl Record for SectionId {
    fn attribute(&self, attr: Attribute) -> Option<String> {
        let value = match attr {
            Attribute::Device => self.device.clone(),
            Attribute::DeviceVendor => self.device_vendor.clone(),
            Attribute::DeviceType => self.device_type.clone(),
            Attribute::DeviceArchitecture => self.device_architecture.clone(),
            Attribute::DeviceComputeUnits => self.device_compute_units.to_string(),
            Attribute::DeviceCoreClock => self.device_core_clock.to_string(),
            Attribute::Precision => self.precision.clone(),
            Attribute::KernelFamily => self.kernel_family.clone(),
            Attribute::Kernel => self.kernel.clone(),
            Attribute::ArgM => return self.arguments.arg_m.clone(),
            Attribute::ArgN => return self.arguments.arg_n.clone(),
            Attribute::ArgK => return self.arguments.arg_k.clone(),
            Attribute::ArgAlpha => return self.arguments.arg_alpha.clone(),
            Attribute::ArgBeta => return self.arguments.arg_beta.clone(),
        };
        Some(value)
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({} {}) {}/{} precision {}",
            self.device,
            self.device_vendor,
            self.device_type,
            self.kernel_family,
            self.kernel,
            self.precision
        )
    }
}

/// The results of the tuning of a kernel on a device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(flatten)]
    pub id: SectionId,
    pub results: Vec<TuningResult>,
}

impl Section {
    pub fn new(id: SectionId, results: Vec<TuningResult>) -> Self {
        Section { id, results }
    }

    /// Returns the first result with the minimal time.
    pub fn best(&self) -> Option<&TuningResult> {
        utils::argmin_f64(self.results.iter().map(|r| r.time)).map(|i| &self.results[i])
    }

    /// Merges `results` into the section. Results with the same parameters keep the
    /// minimal time. Returns the number of new results.
    pub fn merge_results<I>(&mut self, results: I) -> usize
    where
        I: IntoIterator<Item = TuningResult>,
    {
        let mut positions = self
            .results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.parameters.clone(), i))
            .collect::<utils::HashMap<_, _>>();
        let mut num_new = 0;
        for result in results {
            match positions.get(&result.parameters) {
                Some(&i) => {
                    let existing = &mut self.results[i];
                    if result.time < existing.time {
                        existing.time = result.time;
                    }
                }
                None => {
                    positions.insert(result.parameters.clone(), self.results.len());
                    self.results.push(result);
                    num_new += 1;
                }
            }
        }
        num_new
    }

    /// Replaces vendor aliases by their canonical name. Returns `true` if the vendor
    /// was renamed.
    pub fn sanitize_vendor(&mut self, aliases: &[VendorAlias]) -> bool {
        match aliases.iter().find(|a| a.alias == self.id.device_vendor) {
            Some(alias) => {
                debug!("renaming vendor `{}` to `{}`", alias.alias, alias.name);
                self.id.device_vendor = alias.name.clone();
                true
            }
            None => false,
        }
    }
}

impl Record for Section {
    fn attribute(&self, attr: Attribute) -> Option<String> {
        self.id.attribute(attr)
    }
}

/// A list of sections, with at most one section per identity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub sections: Vec<Section>,
}

impl Database {
    pub fn new(sections: Vec<Section>) -> Self {
        Database { sections }
    }

    /// Adds a section to the database. If a section with the same identity already
    /// exists, the results are merged into it. Returns the number of new results.
    ///
    /// Each call indexes the whole database: use `indexed` to add many sections.
    pub fn add_section(&mut self, section: Section) -> usize {
        self.indexed().add_section(section)
    }

    /// Indexes the sections by identity.
    pub fn indexed(&mut self) -> IndexedDatabase<'_> {
        let mut positions = utils::HashMap::default();
        for (i, section) in self.sections.iter().enumerate() {
            positions.entry(section.id.clone()).or_insert(i);
        }
        IndexedDatabase {
            database: self,
            positions,
        }
    }

    /// Number of results in the database.
    pub fn length(&self) -> usize {
        self.sections.iter().map(|s| s.results.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Removes the sections of a device. Returns the number of sections removed.
    pub fn remove_device(&mut self, device: &str) -> usize {
        let num_sections = self.sections.len();
        self.sections.retain(|s| s.id.device != device);
        num_sections - self.sections.len()
    }

    /// Removes the sections of a kernel family. Returns the number of sections
    /// removed.
    pub fn remove_kernel_family(&mut self, family: &str) -> usize {
        let num_sections = self.sections.len();
        self.sections.retain(|s| s.id.kernel_family != family);
        num_sections - self.sections.len()
    }

    /// Adds a tuning parameter with a fixed value to the results of `kernel` that do
    /// not define it yet. Returns the number of results updated.
    pub fn add_tuning_parameter(&mut self, name: &str, kernel: &str, value: i64) -> usize {
        let mut num_updated = 0;
        for section in self.sections.iter_mut().filter(|s| s.id.kernel == kernel) {
            for result in &mut section.results {
                if !result.parameters.contains_key(name) {
                    result.parameters.insert(name.to_string(), value);
                    num_updated += 1;
                }
            }
        }
        num_updated
    }

    /// Replaces vendor aliases in all the sections. Returns the number of sections
    /// renamed.
    pub fn sanitize_vendor_names(&mut self, aliases: &[VendorAlias]) -> usize {
        let mut num_renamed = 0;
        for section in &mut self.sections {
            if section.sanitize_vendor(aliases) {
                num_renamed += 1;
            }
        }
        num_renamed
    }

    /// Removes the sections of an argument combination. Returns the number of
    /// sections removed.
    pub fn remove_argument_combination(&mut self, combination: &ArgumentCombination) -> usize {
        let num_sections = self.sections.len();
        self.sections
            .retain(|s| !combination.sections.contains(&s.id));
        let num_removed = num_sections - self.sections.len();
        info!(
            "removed {} sections with arguments {}",
            num_removed, combination.arguments
        );
        num_removed
    }
}

/// A database with its sections indexed by identity, to merge many sections.
pub struct IndexedDatabase<'a> {
    database: &'a mut Database,
    positions: utils::HashMap<SectionId, usize>,
}

impl<'a> IndexedDatabase<'a> {
    /// Adds a section, merging its results into the section with the same identity.
    /// Returns the number of new results.
    pub fn add_section(&mut self, section: Section) -> usize {
        let Section { id, results } = section;
        let sections = &mut self.database.sections;
        let index = match self.positions.get(&id) {
            Some(&index) => index,
            None => {
                self.positions.insert(id.clone(), sections.len());
                sections.push(Section::new(id, vec![]));
                sections.len() - 1
            }
        };
        sections[index].merge_results(results)
    }
}

/// The sections of a kernel tuned for a given set of arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct ArgumentCombination {
    pub arguments: GroupKey,
    pub sections: Vec<SectionId>,
}

/// A kernel tuned on the same device type with multiple sets of arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Mismatch {
    /// Device type and kernel the combinations apply to.
    pub group: GroupKey,
    pub combinations: Vec<ArgumentCombination>,
}

/// Lists the kernels tuned with multiple sets of arguments on a device type.
pub fn find_mismatched_arguments(
    database: &Database,
    schema: &Schema,
) -> Result<Vec<Mismatch>, Error> {
    if database.is_empty() {
        return Ok(vec![]);
    }
    let mut mismatches = vec![];
    for (group, sections) in group_by(&database.sections, &schema.mismatch_attributes())? {
        let combinations = group_by(sections.iter().cloned(), &schema.arguments)?;
        if combinations.len() > 1 {
            let combinations = combinations
                .into_iter()
                .map(|(arguments, sections)| ArgumentCombination {
                    arguments,
                    sections: sections.iter().map(|s| s.id.clone()).collect_vec(),
                })
                .collect_vec();
            mismatches.push(Mismatch {
                group,
                combinations,
            });
        }
    }
    Ok(mismatches)
}
