use anyhow::{Context, Result};
use archive_decompiler::cli::Cli;
use archive_decompiler::config::{resolve_decompiler, run_config};
use archive_decompiler::dispatch::Input;
use archive_decompiler::logging;
use archive_decompiler::pipeline::{RunOutcome, run};
use clap::Parser;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = run_config(&cli)?;
    logging::init(cli.verbose, cli.quiet, config.progress.bar());

    let input = Input::classify(&config.input)?;
    let decompiler = resolve_decompiler(&cli)
        .with_context(|| format!("No decompiler available for {}", input.path().display()))?;
    let outcome = run(&config, &decompiler)
        .with_context(|| format!("Cannot decompile {}", config.input.display()))?;

    if !cli.quiet {
        print_summary(&outcome);
    }

    match &outcome.error {
        Some(err) => {
            eprintln!("error: {err}");
            Ok(ExitCode::FAILURE)
        }
        None => Ok(ExitCode::SUCCESS),
    }
}

fn print_summary(outcome: &RunOutcome) {
    let report = &outcome.report;
    println!("input:       {}", report.input_path.display());
    println!("output:      {}", report.output_path.display());
    println!("duration:    {:.1}s", report.duration_seconds());
    println!(
        "processed:   {} (expected {})",
        report.processed_count, report.expected_count
    );
    println!("succeeded:   {}", report.success_count);
    println!("failed:      {}", report.failure_count);
    println!("success:     {:.1}%", report.success_rate());
    println!(
        "unicode:     {} of {} source file(s) rewritten",
        outcome.unicode.modified, outcome.unicode.visited
    );
    if let Some(files) = &outcome.report_files {
        println!("report:      {}", files.json.display());
        println!("             {}", files.html.display());
    }
}
