//! Portal Probe CLI
//!
//! ## Usage
//!
//! ```bash
//! portal-probe journeys                          # List journeys
//! portal-probe config --config timings.yaml      # Show resolved configuration
//! portal-probe run admin-login customer-reports  # Run journeys
//! portal-probe run all --headed --json           # Everything, visible browser
//! ```

use clap::Parser;
use portal_probe::JourneyReport;
use portal_probe_cli::{
    load_suite, logging, output, runner, Cli, CliConfig, CliError, CliResult, Commands,
    ConfigArgs, RunArgs, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet))
        .with_color(cli.color.into());
    config.color.apply();
    logging::init(config.verbosity);

    match cli.command {
        Commands::Journeys => {
            print!("{}", output::render_journeys());
            Ok(())
        }
        Commands::Config(args) => run_config(&args),
        Commands::Run(args) => run_journeys(&config, &args),
    }
}

fn run_config(args: &ConfigArgs) -> CliResult<()> {
    let suite = load_suite(args.config.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&suite)?);
    Ok(())
}

fn run_journeys(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let journeys = runner::select_journeys(&args.journeys)?;
    let suite = runner::apply_run_args(load_suite(args.config.as_deref())?, args);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let reports = runtime.block_on(runner::run_journeys(&journeys, &suite, args.fail_fast))?;

    print_reports(config, args, &reports)?;
    let failed = reports.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        return Err(CliError::JourneysFailed {
            failed,
            total: reports.len(),
        });
    }
    Ok(())
}

fn print_reports(config: &CliConfig, args: &RunArgs, reports: &[JourneyReport]) -> CliResult<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(reports)?);
        return Ok(());
    }
    if config.verbosity.is_quiet() {
        return Ok(());
    }
    for report in reports {
        println!("{}", output::render_report(report));
    }
    println!("{}", output::render_summary(reports));
    Ok(())
}
