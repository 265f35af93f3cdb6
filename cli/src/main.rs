mod error;
mod logger;
mod output;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{debug, info};
use serde::Serialize;

use astgen_core::{ErrorPolicy, LowerOptions, ModuleOutput, generate_error_report, lower_json};

use error::CliError;
use output::{FormatStyle, file_progress, render_diagnostic, summary_table};

fn main() -> ExitCode {
    let cli = Command::new("astgen")
        .version("0.1.0")
        .about("Lowers JSON syntax trees into the astgen IR")
        .subcommand_required(true)
        .arg_required_else_help(true);

    let cli = setup_cli(cli);
    let matches = cli.get_matches();
    match dispatch_commands(&matches) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{}", generate_error_report(&e));
            ExitCode::from(1)
        }
    }
}

/// Arguments shared by every subcommand.
fn common_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("input")
            .help("JSON syntax tree files or glob patterns")
            .required(true)
            .num_args(1..)
            .value_parser(clap::value_parser!(String)),
    )
    .arg(
        Arg::new("config")
            .help("TOML file with lowering options")
            .long("config")
            .value_parser(clap::value_parser!(PathBuf))
            .value_name("FILE"),
    )
    .arg(
        Arg::new("policy")
            .help("What to do after the first error in a unit")
            .long("policy")
            .value_parser(["abort", "continue"])
            .value_name("POLICY"),
    )
    .arg(
        Arg::new("sequential")
            .help("Lower declarations on the current thread only")
            .long("sequential")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("verbose")
            .help("Increase log output (-v info, -vv debug, -vvv trace)")
            .short('v')
            .long("verbose")
            .action(ArgAction::Count),
    )
}

fn setup_cli(cli: Command) -> Command {
    cli.subcommand(
        common_args(Command::new("lower").about("Lower the inputs and print the IR"))
            .arg(
                Arg::new("emit")
                    .help("Output format")
                    .long("emit")
                    .value_parser(["text", "json"])
                    .default_value("text")
                    .value_name("FORMAT"),
            )
            .arg(
                Arg::new("output")
                    .help("Write the IR to FILE instead of stdout")
                    .short('o')
                    .long("output")
                    .value_parser(clap::value_parser!(PathBuf))
                    .value_name("FILE"),
            ),
    )
    .subcommand(common_args(
        Command::new("check").about("Lower the inputs and report diagnostics with a per-unit summary"),
    ))
}

/// Returns `Ok(false)` when any unit is poisoned.
fn dispatch_commands(matches: &ArgMatches) -> Result<bool, CliError> {
    match matches.subcommand() {
        Some(("lower", sub_m)) => {
            logger::init(sub_m.get_count("verbose"));
            run_lower(sub_m)
        }
        Some(("check", sub_m)) => {
            logger::init(sub_m.get_count("verbose"));
            run_check(sub_m)
        }
        _ => Err(CliError::new("no valid subcommand was used, see --help")),
    }
}

fn load_options(sub_m: &ArgMatches) -> Result<LowerOptions, CliError> {
    let mut options = match sub_m.get_one::<PathBuf>("config") {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|e| CliError::at(path, e.to_string()))?;
            LowerOptions::from_toml_str(&text).map_err(|e| CliError::at(path, e.to_string()))?
        }
        None => LowerOptions::default(),
    };
    if let Some(policy) = sub_m.get_one::<String>("policy") {
        let policy = policy.parse::<ErrorPolicy>().map_err(CliError::new)?;
        options = options.with_error_policy(policy);
    }
    if sub_m.get_flag("sequential") {
        options = options.sequential();
    }
    debug!("options: {:?}", options);
    Ok(options)
}

fn is_pattern(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

fn collect_inputs(sub_m: &ArgMatches) -> Result<Vec<PathBuf>, CliError> {
    let mut paths = Vec::new();
    for input in sub_m.get_many::<String>("input").into_iter().flatten() {
        if !is_pattern(input) {
            paths.push(PathBuf::from(input));
            continue;
        }
        let entries = glob::glob(input).map_err(|e| CliError::new(format!("bad pattern '{}': {}", input, e)))?;
        let before = paths.len();
        for entry in entries {
            paths.push(entry.map_err(|e| CliError::new(e.to_string()))?);
        }
        if paths.len() == before {
            return Err(CliError::new(format!("no input matches '{}'", input)));
        }
    }
    Ok(paths)
}

fn lower_file(path: &Path, options: &LowerOptions) -> Result<ModuleOutput, CliError> {
    let source = fs::read_to_string(path).map_err(|e| CliError::at(path, e.to_string()))?;
    let module = lower_json(&source, options).map_err(|e| CliError::at(path, format!("invalid syntax tree: {}", e)))?;
    info!("{}: {} units", path.display(), module.units.len());
    Ok(module)
}

/// Lowers every input, printing diagnostics to stderr as each file finishes.
fn lower_inputs(sub_m: &ArgMatches) -> Result<Vec<(String, ModuleOutput)>, CliError> {
    let options = load_options(sub_m)?;
    let inputs = collect_inputs(sub_m)?;
    let style = FormatStyle::default();
    let bar = file_progress(inputs.len());

    let mut modules = Vec::with_capacity(inputs.len());
    for path in &inputs {
        bar.set_message(path.display().to_string());
        let module = lower_file(path, &options)?;
        bar.suspend(|| {
            for diag in &module.diagnostics {
                eprintln!("{}", render_diagnostic(diag, &style));
            }
        });
        bar.inc(1);
        modules.push((path.display().to_string(), module));
    }
    bar.finish_and_clear();
    Ok(modules)
}

#[derive(Serialize)]
struct FileReport<'a> {
    file: &'a str,
    module: &'a ModuleOutput,
}

fn run_lower(sub_m: &ArgMatches) -> Result<bool, CliError> {
    let modules = lower_inputs(sub_m)?;

    let text = match sub_m.get_one::<String>("emit").map(String::as_str) {
        Some("json") => {
            let reports: Vec<FileReport> =
                modules.iter().map(|(file, module)| FileReport { file, module }).collect();
            serde_json::to_string_pretty(&reports).map_err(|e| CliError::new(e.to_string()))?
        }
        _ => {
            let mut text = String::new();
            for (file, module) in &modules {
                text.push_str(&format!("; {}\n", file));
                for unit in &module.units {
                    text.push_str(&unit.stream.to_string());
                }
            }
            text
        }
    };

    match sub_m.get_one::<PathBuf>("output") {
        Some(path) => fs::write(path, text).map_err(|e| CliError::at(path, e.to_string()))?,
        None => print!("{}", text),
    }
    Ok(!modules.iter().any(|(_, m)| m.is_poisoned()))
}

fn run_check(sub_m: &ArgMatches) -> Result<bool, CliError> {
    let modules = lower_inputs(sub_m)?;
    let style = FormatStyle::default();

    let reports: Vec<(String, &ModuleOutput)> = modules.iter().map(|(f, m)| (f.clone(), m)).collect();
    println!("{}", summary_table(&reports));

    let units: usize = modules.iter().map(|(_, m)| m.units.len()).sum();
    let (errors, warnings) = modules
        .iter()
        .flat_map(|(_, m)| m.diagnostics.iter())
        .fold((0, 0), |(e, w), d| if d.is_fatal() { (e + 1, w) } else { (e, w + 1) });
    let summary = format!("{} units, {} errors, {} warnings", units, errors, warnings);
    if errors > 0 {
        println!("{}", style.error.apply_to(summary));
    } else {
        println!("{}", style.success.apply_to(summary));
    }
    Ok(!modules.iter().any(|(_, m)| m.is_poisoned()))
}
