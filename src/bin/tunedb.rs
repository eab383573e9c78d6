//! Merges new tuning results into the database and generates the parameter tables of
//! the library.
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use log::{error, info, warn};
use structopt::StructOpt;

use tunedb::bests::get_best_results;
use tunedb::database::{find_mismatched_arguments, Database};
use tunedb::defaults::reduce;
use tunedb::emit::{render_database, write_sources};
use tunedb::import::{list_tuning_runs, load_tuning_run};
use tunedb::io::{download_database, load_database, save_database};
use tunedb::{Config, Error};

#[derive(StructOpt)]
#[structopt(name = "tunedb")]
struct Opt {
    /// Folder holding the JSON files produced by the tuners.
    #[structopt(parse(from_os_str))]
    source_folder: PathBuf,

    /// Root of the library sources. The database and the tables are stored relative to
    /// this directory.
    #[structopt(parse(from_os_str))]
    library_root: PathBuf,

    /// Configuration file. Defaults to `tunedb/tunedb.toml` in the XDG configuration
    /// directories.
    #[structopt(parse(from_os_str), short = "c", long = "config")]
    config: Option<PathBuf>,

    /// Removes all the entries of a device from the database.
    #[structopt(long = "remove-device")]
    remove_device: Option<String>,

    /// Removes all the entries of a kernel family from the database.
    #[structopt(long = "remove-kernel-family")]
    remove_kernel_family: Option<String>,

    /// Adds a tuning parameter to the existing entries of a kernel.
    #[structopt(long = "add-tuning-parameter", name = "PARAMETER", requires = "KERNEL")]
    add_tuning_parameter: Option<String>,

    /// The kernel to add the tuning parameter to.
    #[structopt(
        long = "add-tuning-parameter-for-kernel",
        name = "KERNEL",
        requires = "PARAMETER"
    )]
    add_tuning_parameter_for_kernel: Option<String>,

    /// The value of the added tuning parameter.
    #[structopt(long = "add-tuning-parameter-value", default_value = "0")]
    add_tuning_parameter_value: i64,

    /// Asks which entries to remove when a kernel was tuned with different arguments.
    #[structopt(short = "i", long = "interactive")]
    interactive: bool,

    /// Logs the selection of default parameters and saves the best results database.
    #[structopt(short = "v", long = "verbose")]
    verbose: bool,

    /// Prints the configuration.
    #[structopt(long = "print-config")]
    print_config: bool,
}

/// Asks a yes/no question on the terminal.
fn confirm(question: &str) -> Result<bool, Error> {
    let stdin = io::stdin();
    loop {
        print!("{} [y/n] ", question);
        io::stdout().flush().map_err(|err| Error::io("stdout", err))?;
        let mut answer = String::new();
        let num_read = stdin
            .lock()
            .read_line(&mut answer)
            .map_err(|err| Error::io("stdin", err))?;
        match answer.trim() {
            _ if num_read == 0 => return Ok(false),
            "y" | "Y" | "yes" => return Ok(true),
            "n" | "N" | "no" => return Ok(false),
            _ => println!("please answer y or n"),
        }
    }
}

/// Lists the kernels tuned with different arguments on the same device type and
/// removes the entries the user selects. Fails in non-interactive mode.
fn remove_mismatched_arguments(
    database: &mut Database,
    config: &Config,
    interactive: bool,
) -> Result<bool, Error> {
    let mut changed = false;
    for mismatch in find_mismatched_arguments(database, &config.schema)? {
        error!(
            "entries for a single kernel with multiple argument values: {}",
            mismatch.group
        );
        for combination in &mismatch.combinations {
            error!(
                "  arguments {} in {} sections",
                combination.arguments,
                combination.sections.len()
            );
        }
        if !interactive {
            return Err(Error::MismatchedArguments {
                group: mismatch.group.to_string(),
            });
        }
        for combination in &mismatch.combinations {
            let question = format!(
                "remove the {} sections of {} with arguments {}?",
                combination.sections.len(),
                mismatch.group,
                combination.arguments
            );
            if confirm(&question)? {
                changed |= database.remove_argument_combination(combination) > 0;
            }
        }
    }
    Ok(changed)
}

fn run(opt: &Opt, config: &Config) -> Result<(), Error> {
    let root = &opt.library_root;
    if !root.join(&config.header_file).is_file() {
        return Err(Error::InvalidLibraryRoot(root.display().to_string()));
    }

    let database_path = root.join(&config.database_file);
    if !database_path.exists() {
        download_database(&config.database_url, &database_path)?;
    }
    let mut database = load_database(&database_path)?;
    let num_renamed = database.sanitize_vendor_names(&config.vendor_aliases);
    if num_renamed > 0 {
        info!("renamed the vendor of {} sections", num_renamed);
    }
    let mut changed = num_renamed > 0;
    info!(
        "database has {} sections with {} results",
        database.sections.len(),
        database.length()
    );

    let runs = list_tuning_runs(&opt.source_folder)?;
    info!(
        "importing {} tuning runs from {}",
        runs.len(),
        opt.source_folder.display()
    );
    let mut indexed = database.indexed();
    for path in runs {
        match load_tuning_run(&path) {
            Ok(mut section) => {
                section.sanitize_vendor(&config.vendor_aliases);
                let num_new = indexed.add_section(section);
                info!("{}: {} new results", path.display(), num_new);
                changed |= num_new > 0;
            }
            Err(err) => warn!("skipping {}: {}", path.display(), err),
        }
    }

    if let Some(ref device) = opt.remove_device {
        let num_removed = database.remove_device(device);
        info!("removed {} sections of device {}", num_removed, device);
        changed |= num_removed > 0;
    }
    if let Some(ref family) = opt.remove_kernel_family {
        let num_removed = database.remove_kernel_family(family);
        info!("removed {} sections of kernel family {}", num_removed, family);
        changed |= num_removed > 0;
    }
    if let (Some(name), Some(kernel)) = (
        &opt.add_tuning_parameter,
        &opt.add_tuning_parameter_for_kernel,
    ) {
        let value = opt.add_tuning_parameter_value;
        let num_updated = database.add_tuning_parameter(name, kernel, value);
        info!(
            "added parameter {}={} to {} results of {}",
            name, value, num_updated, kernel
        );
        changed |= num_updated > 0;
    }
    changed |= remove_mismatched_arguments(&mut database, config, opt.interactive)?;
    info!(
        "database now has {} sections with {} results",
        database.sections.len(),
        database.length()
    );

    let reduced = reduce(&database, config, opt.verbose)?;
    let files = render_database(&reduced, config)?;
    let bests = if opt.verbose {
        Some(get_best_results(&database, &config.schema)?)
    } else {
        None
    };

    if changed {
        save_database(&database, &database_path)?;
    }
    if let Some(bests) = bests {
        save_database(&bests, root.join(&config.database_best_file))?;
    }
    write_sources(root.join(&config.output_dir), &files)?;
    info!("generated {} tables", files.len());
    Ok(())
}

fn main() -> Result<(), failure::Error> {
    let opt = Opt::from_args();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Config::load(opt.config.as_ref().map(|path| path.as_path()))?;
    if opt.print_config {
        println!("{}", config);
    }
    run(&opt, &config)?;
    Ok(())
}
