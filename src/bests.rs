//! Selection of the best tuning results.
use std::fmt;

use itertools::Itertools;
use log::{debug, info, warn};

use crate::attribute::Schema;
use crate::database::{Database, Parameters, Section, TuningResult};
use crate::error::Error;
use crate::group::group_by;

/// Keeps only the fastest result of each device, kernel and set of arguments.
pub fn get_best_results(database: &Database, schema: &Schema) -> Result<Database, Error> {
    let mut bests = Database::default();
    if database.is_empty() {
        return Ok(bests);
    }
    for (group_id, group) in group_by(&database.sections, &schema.best_attributes())? {
        let best = group
            .iter()
            .flat_map(|section| section.results.iter())
            .min_by(|lhs, rhs| utils::cmp_f64(lhs.time, rhs.time));
        match best {
            Some(best) => bests
                .sections
                .push(Section::new(group[0].id.clone(), vec![best.clone()])),
            None => warn!("skipping {}: no tuning results", group_id),
        }
    }
    Ok(bests)
}

/// A tuning result with its time relative to the best time of its section.
#[derive(Clone, Debug, PartialEq)]
pub struct RelativeResult {
    pub parameters: Parameters,
    pub relative_time: f64,
}

impl RelativeResult {
    /// Normalizes a result by the `baseline` time.
    pub fn new(result: &TuningResult, baseline: f64) -> Self {
        RelativeResult {
            parameters: result.parameters.clone(),
            relative_time: result.time / baseline,
        }
    }
}

/// Selects the parameters in `common_parameters` with the lowest total relative time
/// over `common_results`. Ties go to the smallest parameters.
pub fn get_relative_bests(
    group_id: &str,
    common_results: &[RelativeResult],
    common_parameters: &[Parameters],
    verbose: bool,
) -> Option<Parameters> {
    let best = common_parameters
        .iter()
        .sorted()
        .dedup()
        .map(|parameters| {
            let total: f64 = common_results
                .iter()
                .filter(|r| r.parameters == *parameters)
                .map(|r| r.relative_time)
                .sum();
            (parameters, total)
        })
        .min_by(|lhs, rhs| utils::cmp_f64(lhs.1, rhs.1));
    if let Some((parameters, total)) = best {
        diagnostic(
            verbose,
            format_args!(
                "best parameters for {}: {:?} (relative time {:.3})",
                group_id, parameters, total
            ),
        );
    }
    best.map(|(parameters, _)| parameters.clone())
}

/// Logs a step of the selection, at the info level in verbose mode.
pub(crate) fn diagnostic(verbose: bool, message: fmt::Arguments) {
    if verbose {
        info!("{}", message);
    } else {
        debug!("{}", message);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::database::{Arguments, SectionId};

    fn params(x: i64) -> Parameters {
        let mut parameters = Parameters::new();
        parameters.insert("X".to_string(), x);
        parameters
    }

    fn section(device: &str, kernel: &str, results: &[(i64, f64)]) -> Section {
        let id = SectionId {
            device: device.to_string(),
            device_vendor: "NVIDIA".to_string(),
            device_type: "GPU".to_string(),
            device_architecture: "SM7.5".to_string(),
            device_compute_units: 40,
            device_core_clock: 1770,
            precision: "64".to_string(),
            kernel_family: "xdot".to_string(),
            kernel: kernel.to_string(),
            arguments: Arguments {
                arg_n: Some("2097152".to_string()),
                ..Arguments::default()
            },
        };
        let results = results
            .iter()
            .map(|&(x, time)| TuningResult::new(params(x), time))
            .collect();
        Section::new(id, results)
    }

    /// Ensures the selected result is never slower than any original result.
    #[test]
    fn best_results() {
        let database = Database::new(vec![
            section("A", "Xdot", &[(1, 3.0), (2, 1.0), (3, 1.0)]),
            section("B", "Xdot", &[(1, 2.0)]),
            section("A", "XdotEpilogue", &[(1, 0.5), (4, 0.75)]),
            section("C", "Xdot", &[]),
        ]);
        let bests = get_best_results(&database, &Schema::default()).unwrap();
        assert_eq!(bests.sections.len(), 3);
        for best in &bests.sections {
            assert_eq!(best.results.len(), 1);
            let original = database
                .sections
                .iter()
                .find(|s| s.id == best.id)
                .unwrap();
            assert!(original.results.iter().all(|r| best.results[0].time <= r.time));
        }
        let a_xdot = bests
            .sections
            .iter()
            .find(|s| s.id.device == "A" && s.id.kernel == "Xdot")
            .unwrap();
        assert_eq!(a_xdot.results[0].parameters, params(2));
    }

    #[test]
    fn empty_database() {
        let bests = get_best_results(&Database::default(), &Schema::default()).unwrap();
        assert!(bests.is_empty());
    }

    #[test]
    fn relative_bests() {
        let results = vec![
            RelativeResult { parameters: params(1), relative_time: 1.0 },
            RelativeResult { parameters: params(2), relative_time: 1.2 },
            RelativeResult { parameters: params(1), relative_time: 1.5 },
            RelativeResult { parameters: params(2), relative_time: 1.0 },
        ];
        let candidates = vec![params(1), params(2)];
        let best = get_relative_bests("group", &results, &candidates, false);
        assert_eq!(best, Some(params(2)));
    }

    /// Ensures exact ties go to the smallest parameters.
    #[test]
    fn relative_bests_tie() {
        let results = vec![
            RelativeResult { parameters: params(3), relative_time: 1.0 },
            RelativeResult { parameters: params(1), relative_time: 1.0 },
        ];
        let candidates = vec![params(3), params(1), params(3)];
        let best = get_relative_bests("group", &results, &candidates, true);
        assert_eq!(best, Some(params(1)));
        assert_eq!(get_relative_bests("group", &results, &[], false), None);
    }
}
