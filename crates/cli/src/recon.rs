//! `ledgercheck run|validate|init`: config-driven ledger reconciliation.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use ledgercheck_recon::config::SAMPLE_CONFIG;
use ledgercheck_recon::{ReconConfig, ReconInput, ReconResult, Side, SourceTable};

use crate::exit_codes::{EXIT_RECON_FINDINGS, EXIT_RECON_INVALID_CONFIG};
use crate::CliError;

const DEFAULT_CONFIG_NAME: &str = "ledgercheck.toml";

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Run reconciliation and voucher checks from a TOML config file
    #[command(after_help = "\
Examples:
  ledgercheck run recon.toml
  ledgercheck run recon.toml --json
  ledgercheck run recon.toml --output result.json
  ledgercheck run recon.toml --journal je-h1.csv --journal je-h2.csv --trial-balance tb.csv
  ledgercheck run recon.toml --patterns ACME --patterns Beta")]
    Run {
        /// Path to the config file
        config: PathBuf,

        /// Journal CSV file(s); replaces [journal] files. Repeatable.
        #[arg(long, value_name = "FILE")]
        journal: Vec<PathBuf>,

        /// Trial balance CSV file; replaces [trial_balance] files
        #[arg(long, value_name = "FILE")]
        trial_balance: Option<PathBuf>,

        /// Book-name patterns; replaces target_patterns. Repeatable.
        #[arg(long, value_name = "PATTERN")]
        patterns: Vec<String>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a config without running
    #[command(after_help = "\
Examples:
  ledgercheck validate recon.toml")]
    Validate {
        /// Path to the config file
        config: PathBuf,
    },

    /// Write an annotated sample config
    #[command(after_help = "\
Examples:
  ledgercheck init
  ledgercheck init year-end.toml --force")]
    Init {
        /// Destination path
        #[arg(default_value = DEFAULT_CONFIG_NAME)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run {
            config,
            journal,
            trial_balance,
            patterns,
            json,
            output,
        } => cmd_run(config, journal, trial_balance, patterns, json, output),
        ReconCommands::Validate { config } => cmd_validate(config),
        ReconCommands::Init { path, force } => cmd_init(path, force),
    }
}

fn load_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", config_path.display())))?;
    ReconConfig::from_toml(&config_str).map_err(CliError::recon)
}

/// Files for one side: command-line paths as given, otherwise the
/// configured ones resolved against the config file's directory.
fn source_paths(config: &ReconConfig, side: Side, base_dir: &Path, overrides: Vec<PathBuf>) -> Vec<PathBuf> {
    if !overrides.is_empty() {
        return overrides;
    }
    config
        .source(side)
        .files
        .iter()
        .map(|f| base_dir.join(f))
        .collect()
}

fn load_side(config: &ReconConfig, side: Side, paths: &[PathBuf]) -> Result<SourceTable, CliError> {
    if paths.is_empty() {
        let flag = match side {
            Side::Journal => "--journal",
            Side::TrialBalance => "--trial-balance",
        };
        return Err(CliError::new(
            EXIT_RECON_INVALID_CONFIG,
            format!("no {side} files configured"),
        )
        .with_hint(format!("set [{side}] files in the config or pass {flag}")));
    }

    let header_row = config.header_row(side);
    let mut tables = Vec::with_capacity(paths.len());
    for path in paths {
        let data = std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
        let table = SourceTable::from_csv(&data, header_row).map_err(|e| {
            CliError::recon(e).with_hint(format!("while reading {}", path.display()))
        })?;
        log::info!("{side}: loaded {} row(s) from {}", table.rows.len(), path.display());
        tables.push(table);
    }
    Ok(SourceTable::concat(tables))
}

fn cmd_run(
    config_path: PathBuf,
    journal: Vec<PathBuf>,
    trial_balance: Option<PathBuf>,
    patterns: Vec<String>,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let mut config = load_config(&config_path)?;
    if !patterns.is_empty() {
        config.target_patterns = patterns;
    }

    // Resolve file paths relative to config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let je_paths = source_paths(&config, Side::Journal, base_dir, journal);
    let tb_paths = source_paths(
        &config,
        Side::TrialBalance,
        base_dir,
        trial_balance.into_iter().collect(),
    );

    let input = ReconInput {
        journal: load_side(&config, Side::Journal, &je_paths)?,
        trial_balance: load_side(&config, Side::TrialBalance, &tb_paths)?,
    };

    let result = ledgercheck_recon::run(&config, &input).map_err(CliError::recon)?;

    let json_str = result.to_json_pretty().map_err(CliError::recon)?;
    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }
    if json_output {
        println!("{json_str}");
    }

    print_summary(&result);

    if result.has_findings() {
        return Err(CliError::new(EXIT_RECON_FINDINGS, "findings require review"));
    }
    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    eprintln!(
        "recon '{}': {} account(s): {} aligned, {} differing, {} journal-only, {} trial-balance-only",
        result.meta.config_name, s.total_keys, s.aligned, s.differing, s.source_a_only, s.source_b_only,
    );
    if let Some(reason) = result.matches.empty_reason {
        eprintln!("  nothing reconciled: {reason}");
    }
    if s.differing + s.source_a_only + s.source_b_only > 0 {
        eprintln!(
            "  net difference: debit {:.2}, credit {:.2}",
            s.net_totals.debit, s.net_totals.credit
        );
    }

    let gaps = &result.gaps;
    match &gaps.skipped {
        Some(reason) => eprintln!("voucher sequence: skipped ({reason})"),
        None => {
            let range = gaps
                .stats
                .period_range
                .map(|r| format!(", period {r}"))
                .unwrap_or_default();
            eprintln!(
                "voucher sequence: {} group(s), {} voucher(s), {} gap(s), {} missing{range}",
                gaps.stats.group_count, gaps.stats.voucher_count, gaps.stats.gap_count, gaps.stats.missing_total,
            );
            for g in gaps.gaps.iter().take(10) {
                let period = match (g.year, &g.month) {
                    (Some(y), Some(m)) => format!("{y}-{m}"),
                    (Some(y), None) => y.to_string(),
                    (None, Some(m)) => m.clone(),
                    (None, None) => "unknown period".to_string(),
                };
                eprintln!(
                    "  {} {}: {} ~ {} ({} missing, between {} and {})",
                    g.book, period, g.start_id, g.end_id, g.size, g.before_id, g.after_id,
                );
            }
            if gaps.gaps.len() > 10 {
                eprintln!("  ... {} more in JSON output", gaps.gaps.len() - 10);
            }
        }
    }

    let balance = &result.balance;
    match &balance.skipped {
        Some(reason) => eprintln!("voucher balance: skipped ({reason})"),
        None => eprintln!(
            "voucher balance: {} voucher(s), {} unbalanced ({:.2}% balanced)",
            balance.stats.total, balance.stats.unbalanced, balance.stats.balanced_pct,
        ),
    }
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "valid: recon '{}' with {} journal file(s), {} trial balance file(s), threshold {}",
        config.name,
        config.journal.files.len(),
        config.trial_balance.files.len(),
        config.threshold,
    );
    Ok(())
}

fn cmd_init(path: PathBuf, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::usage(format!("{} already exists", path.display()))
            .with_hint("pass --force to overwrite"));
    }
    std::fs::write(&path, SAMPLE_CONFIG)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}
