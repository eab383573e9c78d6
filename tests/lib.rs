//! Integration tests of the database compiler.
mod common;

use std::fs;

use itertools::Itertools;

use common::*;
use tunedb::bests::get_best_results;
use tunedb::compact::{compact, decompact};
use tunedb::database::find_mismatched_arguments;
use tunedb::defaults::{calculate_defaults, get_common_best_parameters, reduce};
use tunedb::emit::{render_database, write_sources};
use tunedb::group::group_by;
use tunedb::import::{list_tuning_runs, load_tuning_run};
use tunedb::io::{load_database, save_database};
use tunedb::{Attribute, Config, Database, Error};

/// Returns the common best parameters of a group of sections.
fn common_best(sections: &[tunedb::Section]) -> tunedb::Parameters {
    let group = sections.iter().collect_vec();
    get_common_best_parameters(&group, "test", false, true, &Config::default()).unwrap()
}

/// The only parameters tried on both devices are selected, even if they are not the
/// best on any of them.
#[test]
fn shared_parameters() {
    let _ = env_logger::try_init();
    let sections = vec![
        SectionBuilder::new("A")
            .result(&[("X", 1)], 2.0)
            .result(&[("X", 2)], 1.0)
            .get(),
        SectionBuilder::new("B")
            .result(&[("X", 2)], 4.0)
            .result(&[("X", 3)], 1.0)
            .get(),
    ];
    assert_eq!(common_best(&sections), params(&[("X", 2)]));
}

/// Devices without shared parameters fall back to the smallest best parameters.
#[test]
fn smallest_best_fallback() {
    let _ = env_logger::try_init();
    let sections = vec![
        SectionBuilder::new("A")
            .result(&[("X", 1)], 2.0)
            .result(&[("X", 2)], 1.0)
            .get(),
        SectionBuilder::new("B").result(&[("X", 4)], 1.0).get(),
    ];
    assert_eq!(common_best(&sections), params(&[("X", 2)]));
}

/// Parameters tried by all devices are always preferred.
#[test]
fn common_best_in_intersection() {
    let sections = vec![
        SectionBuilder::new("A")
            .result(&[("X", 1), ("Y", 1)], 1.0)
            .result(&[("X", 2), ("Y", 1)], 9.0)
            .get(),
        SectionBuilder::new("B")
            .result(&[("X", 2), ("Y", 1)], 9.0)
            .result(&[("X", 3), ("Y", 1)], 1.0)
            .get(),
        SectionBuilder::new("C")
            .result(&[("X", 1), ("Y", 1)], 2.0)
            .result(&[("X", 2), ("Y", 1)], 1.0)
            .get(),
    ];
    assert_eq!(common_best(&sections), params(&[("X", 2), ("Y", 1)]));
}

#[test]
fn compact_round_trip() {
    let section = SectionBuilder::new("Tahiti")
        .result(&[("A", 1), ("B", 2)], 0.5)
        .result(&[("A", 3), ("B", 4)], 0.25)
        .get();
    let database = database(vec![section]);
    let compacted = compact(&database).unwrap();
    assert_eq!(compacted.sections[0].parameter_names, vec!["A", "B"]);
    assert_eq!(
        compacted.sections[0].results,
        vec![("1,2".to_string(), 0.5), ("3,4".to_string(), 0.25)]
    );
    assert_eq!(decompact(compacted).unwrap(), database);
}

/// A kernel tuned with two sets of arguments on a device type aborts the synthesis.
#[test]
fn mismatched_arguments() {
    let _ = env_logger::try_init();
    let database = database(vec![
        SectionBuilder::new("A")
            .arg_m("64")
            .result(&[("X", 1)], 1.0)
            .get(),
        SectionBuilder::new("B")
            .arg_m("128")
            .result(&[("X", 1)], 1.0)
            .get(),
    ]);
    match calculate_defaults(&database, &Config::default(), false) {
        Err(Error::MismatchedArguments { group }) => assert_eq!(group, "AMD;GPU;32;xgemm;Xgemm"),
        res => panic!("unexpected result {:?}", res),
    }
    let mismatches = find_mismatched_arguments(&database, &Config::default().schema).unwrap();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].combinations.len(), 2);
}

/// Groups partition the records.
#[test]
fn grouping_partition() {
    let database = database(vec![
        SectionBuilder::new("A").result(&[("X", 1)], 1.0).get(),
        SectionBuilder::new("B").vendor("NVIDIA").result(&[("X", 1)], 1.0).get(),
        SectionBuilder::new("C").precision("64").result(&[("X", 1)], 1.0).get(),
        SectionBuilder::new("D").result(&[("X", 1)], 1.0).get(),
    ]);
    let groups = group_by(&database.sections, &Config::default().schema.group_attributes()).unwrap();
    let devices = groups
        .iter()
        .flat_map(|(_, group)| group.iter().map(|s| s.id.device.as_str()))
        .sorted()
        .collect_vec();
    assert_eq!(devices, vec!["A", "B", "C", "D"]);
    assert_eq!(groups.len(), 3);
    assert!(group_by(&Vec::<tunedb::Section>::new(), &[Attribute::Device]).is_err());
}

#[test]
fn best_results() {
    let database = database(vec![
        SectionBuilder::new("A")
            .result(&[("X", 1)], 2.0)
            .result(&[("X", 2)], 0.5)
            .result(&[("X", 3)], 0.75)
            .get(),
        SectionBuilder::new("B").result(&[("X", 4)], 3.0).get(),
    ]);
    let bests = get_best_results(&database, &Config::default().schema).unwrap();
    for (best, original) in bests.sections.iter().zip_eq(&database.sections) {
        assert_eq!(best.id, original.id);
        assert!(original.results.iter().all(|r| best.results[0].time <= r.time));
    }
}

/// Defaults are computed per architecture, per device type and globally.
#[test]
fn reduced_database() {
    let database = database(vec![
        SectionBuilder::new("Vega")
            .result(&[("X", 1)], 1.0)
            .result(&[("X", 2)], 2.0)
            .get(),
        SectionBuilder::new("Polaris")
            .architecture("gfx803")
            .result(&[("X", 1)], 3.0)
            .result(&[("X", 2)], 1.0)
            .get(),
        SectionBuilder::new("GTX 1080")
            .vendor("NVIDIA")
            .architecture("SM6.1")
            .result(&[("X", 4)], 1.0)
            .get(),
    ]);
    let reduced = reduce(&database, &Config::default(), false).unwrap();
    let rows = reduced
        .sections
        .iter()
        .map(|s| {
            (
                s.id.device.as_str(),
                s.id.device_vendor.as_str(),
                s.id.device_architecture.as_str(),
            )
        })
        .collect_vec();
    assert_eq!(
        rows,
        vec![
            ("GTX 1080", "NVIDIA", "SM6.1"),
            ("Polaris", "AMD", "gfx803"),
            ("Vega", "AMD", "gfx900"),
            ("default", "AMD", "default"),
            ("default", "NVIDIA", "default"),
            ("default", "AMD", "gfx803"),
            ("default", "AMD", "gfx900"),
            ("default", "NVIDIA", "SM6.1"),
            ("default", "default", "default"),
        ]
    );
    // X=1: 1/1 + 3/1, X=2: 2/1 + 1/1.
    assert_eq!(reduced.sections[3].results[0].parameters, params(&[("X", 2)]));
}

/// Imports tuning runs, saves the database and generates the tables.
#[test]
fn full_pipeline() {
    let _ = env_logger::try_init();
    let config = Config::default();
    let runs_dir = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    write_tuning_run(runs_dir.path(), "gtx1080.json", "GeForce GTX 1080", &[(64, 2.0), (128, 1.0)]);
    write_tuning_run(runs_dir.path(), "gtx1070.json", "GeForce GTX 1070", &[(64, 1.0), (128, 1.5)]);
    fs::write(runs_dir.path().join("broken.json"), "{ \"results\": ").unwrap();

    let mut database = Database::default();
    let mut num_imported = 0;
    for path in list_tuning_runs(runs_dir.path()).unwrap() {
        if let Ok(mut section) = load_tuning_run(&path) {
            section.sanitize_vendor(&config.vendor_aliases);
            num_imported += database.add_section(section);
        }
    }
    assert_eq!(num_imported, 4);
    assert_eq!(database.sections[0].id.device_vendor, "NVIDIA");
    assert_eq!(database.sections[0].id.kernel_family, "xaxpy");

    let reduced = reduce(&database, &config, true).unwrap();
    let files = render_database(&reduced, &config).unwrap();
    let database_path = root.path().join(&config.database_file);
    save_database(&database, &database_path).unwrap();
    let paths = write_sources(root.path().join(&config.output_dir), &files).unwrap();

    assert_eq!(load_database(&database_path).unwrap(), database);
    assert_eq!(paths.len(), 1);
    assert!(paths[0].ends_with("xaxpy.hpp"));
    let table = fs::read_to_string(&paths[0]).unwrap();
    assert!(table.contains("const DatabaseEntry XaxpySingle = {"));
    assert!(table.contains("{\"VW\", \"WGS\", \"WPT\"}"));
    assert!(table.contains("    { // NVIDIA GPUs\n"));
    assert!(table.contains("        { \"SM6.1\", {\n"));
    assert!(table.contains("Params{ 1, 128, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0 }"));
    assert!(table.contains("Params{ 1, 64, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0 }"));
    assert!(!table.contains("PRECISION"));
}
