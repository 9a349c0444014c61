use clap::{Arg, ArgMatches, Command};
use colored::*;
use log::{error, info};
use std::path::Path;

use NodalSolve::cli::CliArgs;
use NodalSolve::{engine, netlist};

fn main() {
    env_logger::init();

    let matches = create_cli().get_matches();

    if let Err(e) = run_application(&matches) {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

fn create_cli() -> Command {
    Command::new("NodalSolve")
        .version(NodalSolve::VERSION)
        .about("A DC circuit analysis engine using Modified Nodal Analysis")
        .author("NodalSolve Team")
        .arg(
            Arg::new("input")
                .help("Input netlist file (JSON with a 'components' list)")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output file for the full analysis result"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .default_value("json")
                .value_parser(["json", "csv"])
                .help("Output format"),
        )
        .arg(
            Arg::new("equations")
                .short('e')
                .long("equations")
                .action(clap::ArgAction::SetTrue)
                .help("Print only the symbolic equation set"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("Increase verbosity level"),
        )
}

fn run_application(matches: &ArgMatches) -> anyhow::Result<()> {
    let args = CliArgs::from_matches(matches)?;

    info!("{}", "Starting NodalSolve".green().bold());
    info!("Input file: {}", args.input_file.bright_blue());

    if !Path::new(&args.input_file).exists() {
        return Err(anyhow::anyhow!("Input file '{}' not found", args.input_file));
    }

    let body = std::fs::read_to_string(&args.input_file)?;
    let circuit = match netlist::circuit_from_str(&body) {
        Ok(circuit) => circuit,
        Err(e) => return Err(report_failure(e)),
    };

    let response = match engine::solve_circuit(&circuit) {
        Ok(response) => response,
        Err(e) => return Err(report_failure(e)),
    };

    if args.equations_only {
        for step in &response.analysis.solution_steps {
            println!("{}", step.equation);
        }
        return Ok(());
    }

    if let Some(output_file) = args.output_file {
        engine::export_results(&response, &output_file, &args.output_format)?;
        info!("Results exported to: {}", output_file.bright_green());
    } else {
        engine::print_summary(&response);
    }

    info!("{}", "Analysis completed successfully!".green().bold());
    Ok(())
}

fn report_failure(e: NodalSolve::CircuitError) -> anyhow::Error {
    if let Some(suggestion) = e.suggestion() {
        eprintln!("{}", format!("Suggestion: {}", suggestion).yellow());
    }
    let label = if e.is_client_error() {
        "invalid netlist"
    } else {
        "solver failure"
    };
    anyhow::anyhow!("{}: {}", label, e)
}
