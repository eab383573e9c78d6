//! Synthesis of default parameters for devices missing from the database.
//!
//! Defaults are computed at three levels. Architecture defaults apply to unknown
//! devices of a known architecture, device-type defaults to unknown architectures of
//! a known vendor and device type, and global defaults to everything else. At each
//! level, the parameters are the ones that perform best across all the devices of
//! the group, among the parameters all of them were tuned with.
use indexmap::IndexMap;
use itertools::Itertools;
use log::{error, warn};

use crate::attribute::Record;
use crate::bests::{diagnostic, get_best_results, get_relative_bests, RelativeResult};
use crate::config::Config;
use crate::database::*;
use crate::error::Error;
use crate::group::group_by;

/// Returns the per-parameter minimum of the best parameters of each section. The
/// result may not have been tuned on any device, but small values are more likely to
/// be supported by unknown devices.
pub fn get_smallest_best_parameters(group: &[&Section]) -> Parameters {
    let mut min_parameters = Parameters::new();
    for section in group {
        let best_time = match section.best() {
            Some(best) => best.time,
            None => continue,
        };
        let bests = section
            .results
            .iter()
            .filter(|r| utils::cmp_f64(r.time, best_time) == std::cmp::Ordering::Equal);
        for result in bests {
            for (name, &value) in &result.parameters {
                min_parameters
                    .entry(name.clone())
                    .and_modify(|min| *min = std::cmp::min(*min, value))
                    .or_insert(value);
            }
        }
    }
    min_parameters
}

/// Returns the time each result of the section is normalized by.
fn baseline(section: &Section, config: &Config) -> f64 {
    if config.unnormalized_kernels.contains(&section.id.kernel) {
        return 1.0;
    }
    match section.best() {
        Some(best) if best.time > 0.0 => best.time,
        _ => 1.0,
    }
}

/// Returns the parameters that perform best across the sections of `group`.
///
/// Only parameters tuned on all the devices of the group are considered. If there
/// are none, parameters tuned on exactly the largest number of devices are used
/// instead and, if no two devices share parameters, the smallest best parameters.
/// Candidates are always tried by the same number of devices, so their summed
/// relative times are comparable.
pub fn get_common_best_parameters(
    group: &[&Section],
    group_id: &str,
    verbose: bool,
    enable_warning: bool,
    config: &Config,
) -> Result<Parameters, Error> {
    if group.is_empty() {
        return Err(Error::EmptyInput);
    }
    if let Some(section) = group.iter().find(|s| s.results.is_empty()) {
        return Err(Error::EmptyResults {
            section: section.id.to_string(),
        });
    }
    let num_devices = group.len();

    let relative_results = group
        .iter()
        .flat_map(|section| {
            let baseline = baseline(section, config);
            section
                .results
                .iter()
                .map(move |result| RelativeResult::new(result, baseline))
        })
        .collect_vec();

    let tried = group
        .iter()
        .map(|section| {
            section
                .results
                .iter()
                .map(|r| &r.parameters)
                .collect::<utils::HashSet<_>>()
        })
        .collect_vec();
    let mut common_parameters = group[0]
        .results
        .iter()
        .map(|r| &r.parameters)
        .unique()
        .filter(|p| tried[1..].iter().all(|set| set.contains(p)))
        .cloned()
        .collect_vec();

    if common_parameters.is_empty() {
        diagnostic(
            verbose,
            format_args!(
                "no common parameters for {} with {} devices",
                group_id, num_devices
            ),
        );
        let mut counts: IndexMap<&Parameters, usize> = IndexMap::new();
        for set in &tried {
            for &parameters in set {
                *counts.entry(parameters).or_insert(0) += 1;
            }
        }
        let mut num_devices_common = counts.values().cloned().max().unwrap_or(0);
        if num_devices_common <= 1 {
            if enable_warning {
                warn!(
                    "no devices share parameters for {}, using the smallest best parameters",
                    group_id
                );
            }
            let parameters = get_smallest_best_parameters(group);
            diagnostic(
                verbose,
                format_args!("smallest best parameters for {}: {:?}", group_id, parameters),
            );
            return Ok(parameters);
        }
        let num_at = |count| counts.values().filter(|&&c| c == count).count();
        if num_devices_common > 2 && num_at(num_devices_common - 1) > num_at(num_devices_common) {
            num_devices_common -= 1;
        }
        diagnostic(
            verbose,
            format_args!(
                "using parameters shared by {} of {} devices for {}",
                num_devices_common, num_devices, group_id
            ),
        );
        common_parameters = counts
            .iter()
            .filter(|&(_, &count)| count == num_devices_common)
            .map(|(&parameters, _)| parameters.clone())
            .collect_vec();
    }

    let common_results = relative_results
        .into_iter()
        .filter(|r| common_parameters.contains(&r.parameters))
        .collect_vec();
    let best = get_relative_bests(group_id, &common_results, &common_parameters, verbose);
    Ok(unwrap!(best, "no candidate parameters for {}", group_id))
}

/// Creates a default section from the identity of `section`.
fn default_section(section: &Section, parameters: Parameters) -> Section {
    let mut id = section.id.clone();
    id.device = DEVICE_NAME_DEFAULT.to_string();
    id.device_compute_units = 0;
    id.device_core_clock = 0;
    Section::new(id, vec![TuningResult::new(parameters, 0.0)])
}

/// Computes the architecture, device-type and global defaults. Fails if a kernel
/// was tuned with different arguments on the same device type.
pub fn calculate_defaults(
    database: &Database,
    config: &Config,
    verbose: bool,
) -> Result<Database, Error> {
    let schema = &config.schema;
    let mut defaults = Database::default();
    if database.is_empty() {
        return Ok(defaults);
    }

    let mut architecture_defaults = vec![];
    for (group_id, group) in group_by(&database.sections, &schema.architecture_attributes())? {
        let group_id = group_id.to_string();
        let parameters = get_common_best_parameters(&group, &group_id, verbose, false, config)?;
        architecture_defaults.push(default_section(group[0], parameters));
    }

    for (group_id, group) in group_by(&database.sections, &schema.group_attributes())? {
        if group[0].id.device_architecture.is_empty() {
            continue;
        }
        let group_id = group_id.to_string();
        let parameters = get_common_best_parameters(&group, &group_id, verbose, true, config)?;
        let mut section = default_section(group[0], parameters);
        section.id.device_architecture = DEVICE_ARCHITECTURE_DEFAULT.to_string();
        defaults.sections.push(section);
    }

    if !defaults.is_empty() {
        for (group_id, group) in group_by(&defaults.sections, &schema.mismatch_attributes())? {
            if group.len() != 1 {
                error!(
                    "entries for a single kernel with multiple argument values: {}",
                    group_id
                );
                for section in group {
                    error!("  arguments: {}", section.key(&schema.arguments));
                }
                return Err(Error::MismatchedArguments {
                    group: group_id.to_string(),
                });
            }
        }
    }
    // Empty architectures are rendered as the default architecture, which the
    // device-type default already covers.
    let group_attributes = schema.group_attributes();
    let device_type_keys = defaults
        .sections
        .iter()
        .map(|s| s.key(&group_attributes))
        .collect::<utils::HashSet<_>>();
    defaults.sections.extend(architecture_defaults.into_iter().filter(|s| {
        !s.id.device_architecture.is_empty()
            || !device_type_keys.contains(&s.key(&group_attributes))
    }));

    for (group_id, group) in group_by(&database.sections, &schema.global_attributes())? {
        let group_id = group_id.to_string();
        let parameters = get_common_best_parameters(&group, &group_id, verbose, true, config)?;
        let mut section = default_section(group[0], parameters);
        section.id.device_vendor = VENDOR_DEFAULT.to_string();
        section.id.device_type = DEVICE_TYPE_DEFAULT.to_string();
        section.id.device_architecture = DEVICE_ARCHITECTURE_DEFAULT.to_string();
        defaults.sections.push(section);
    }
    Ok(defaults)
}

/// Reduces the database to the best parameters of each device, plus defaults.
pub fn reduce(database: &Database, config: &Config, verbose: bool) -> Result<Database, Error> {
    let mut reduced = get_best_results(database, &config.schema)?;
    let defaults = calculate_defaults(database, config, verbose)?;
    reduced.sections.extend(defaults.sections);
    Ok(reduced)
}
