use anyhow::Result;
use clap::Parser;
use codesweep::cli::{Cli, Commands, OutputFormat};
use codesweep::config::AnalysisConfig;
use codesweep::core::{RepositoryResult, RunStatus};
use codesweep::io::walker::SnapshotWalker;
use codesweep::orchestrator::{AnalysisRequest, Orchestrator};
use std::process::ExitCode;
use std::time::Duration;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(status) => match status {
            RunStatus::Complete => ExitCode::SUCCESS,
            RunStatus::Partial | RunStatus::Failed => ExitCode::from(1),
        },
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<RunStatus> {
    let Commands::Analyze {
        path,
        output,
        timeout,
        jobs,
        min_severity,
        excludes,
        tools,
        events,
    } = cli.command;

    let mut config = AnalysisConfig {
        per_tool_timeout: Duration::from_secs(timeout),
        severity_threshold: min_severity,
        enabled_tools: tools.into_iter().collect(),
        ..Default::default()
    };
    if let Some(jobs) = jobs {
        config.max_concurrent_tools = jobs;
    }
    config.excluded_path_patterns.extend(excludes);

    let files = SnapshotWalker::new(path.clone()).load(&config)?;
    let orchestrator = Orchestrator::with_defaults();
    let result = orchestrator.analyze(
        AnalysisRequest {
            repository: path.display().to_string(),
            files,
        },
        &config,
        None,
    )?;

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Summary => print_summary(&result),
    }

    if events {
        for event in orchestrator.history(&result.run_id) {
            println!(
                "#{:<4} {:<15} {}",
                event.sequence, event.kind, event.payload
            );
        }
    }

    Ok(result.status)
}

fn print_summary(result: &RepositoryResult) {
    println!("run {} on {}: {}", result.run_id, result.repository, result.status);
    println!(
        "  {} files ({} unclassified, {} excluded), {} units, {} issues",
        result.overall.total_files,
        result.overall.unclassified_files,
        result.overall.excluded_files,
        result.overall.units_scheduled,
        result.overall.total_issues,
    );

    for (language, lang_result) in &result.languages {
        if lang_result.is_skipped() {
            println!("  {language}: skipped (no analyzer available)");
            continue;
        }
        println!(
            "  {language}: {} files, tools [{}], {} issues",
            lang_result.file_count,
            lang_result.tools_attempted.join(", "),
            lang_result.issues_by_severity.total(),
        );
        for tool in &lang_result.tool_results {
            let note = tool.error.as_deref().unwrap_or("");
            println!(
                "    {} {} in {:?} {}",
                tool.tool_name, tool.status, tool.duration, note
            );
        }
    }
}
