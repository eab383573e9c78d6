//! Compact form of the database, as stored on disk. The parameter names are stored
//! once per section and each result only holds the comma-separated values.
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::database::{Database, Parameters, Section, SectionId, TuningResult};
use crate::error::Error;

/// A section where results are stored as `(values, time)` pairs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompactSection {
    #[serde(flatten)]
    pub id: SectionId,
    pub parameter_names: Vec<String>,
    pub results: Vec<(String, f64)>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompactDatabase {
    pub sections: Vec<CompactSection>,
}

/// Converts a database to its compact form. Fails if the results of a section do not
/// all define the same parameters.
pub fn compact(database: &Database) -> Result<CompactDatabase, Error> {
    let sections = database
        .sections
        .iter()
        .map(compact_section)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CompactDatabase { sections })
}

fn compact_section(section: &Section) -> Result<CompactSection, Error> {
    let mut parameter_names: Option<Vec<String>> = None;
    let mut results = Vec::with_capacity(section.results.len());
    for result in &section.results {
        let names = result.parameters.keys().cloned().collect_vec();
        match parameter_names {
            None => parameter_names = Some(names),
            Some(ref expected) if *expected != names => {
                return Err(Error::InconsistentParameters {
                    section: section.id.to_string(),
                    expected: expected.clone(),
                    found: names,
                });
            }
            Some(_) => (),
        }
        let values = result.parameters.values().join(",");
        results.push((values, result.time));
    }
    Ok(CompactSection {
        id: section.id.clone(),
        parameter_names: parameter_names.unwrap_or_default(),
        results,
    })
}

/// Restores the full form of a compact database.
pub fn decompact(database: CompactDatabase) -> Result<Database, Error> {
    let sections = database
        .sections
        .into_iter()
        .map(decompact_section)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Database { sections })
}

fn decompact_section(section: CompactSection) -> Result<Section, Error> {
    let CompactSection {
        id,
        parameter_names,
        results,
    } = section;
    let results = results
        .into_iter()
        .map(|(values, time)| {
            let parameters = parse_values(&values, &parameter_names)?;
            Ok(TuningResult::new(parameters, time))
        })
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(Section::new(id, results))
}

/// Parses comma-separated parameter values. An empty string holds no values.
fn parse_values(values: &str, names: &[String]) -> Result<Parameters, Error> {
    let malformed = || Error::MalformedCompactResult {
        values: values.to_string(),
        names: names.to_vec(),
    };
    let values = if values.is_empty() {
        vec![]
    } else {
        values.split(',').collect_vec()
    };
    if values.len() != names.len() {
        return Err(malformed());
    }
    names
        .iter()
        .zip_eq(values)
        .map(|(name, value)| {
            let value = value.trim().parse::<i64>().map_err(|_| malformed())?;
            Ok((name.clone(), value))
        })
        .collect()
}
