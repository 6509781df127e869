//! mirrorkit-sync
//!
//! Command-line front end for one-way structural directory mirroring.

mod cli;
mod error;

use std::time::{Duration, Instant};

use clap::Parser;
use mirrorkit_io_sync::{ReportSync, SyncError, sync_tree};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use error::{CliError, Result};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }

    match run(&cli) {
        Ok((report, t_elapsed)) => {
            println!("{report}");
            println!("elapsed: {:.3}s", t_elapsed.as_secs_f64());
        }
        Err(e) => {
            match &e {
                CliError::Sync(SyncError::Copy(copy_errors)) => {
                    eprintln!("Process ended with errors:\n{copy_errors}")
                }
                _ => eprintln!("error: {e}"),
            }
            std::process::exit(e.exit_code());
        }
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))
}

/// Run one sync; on success returns the report and the wall-clock time taken.
fn run(cli: &Cli) -> Result<(ReportSync, Duration)> {
    let t_start = Instant::now();
    let res_sync = sync_tree(&cli.source, &cli.destination, cli.to_options());
    let t_elapsed = t_start.elapsed();
    tracing::info!(elapsed_ms = t_elapsed.as_millis() as u64, "sync finished");
    Ok((res_sync?, t_elapsed))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;

    use super::run;
    use crate::cli::Cli;

    #[test]
    fn run_mirrors_source_and_reports() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        fs::create_dir_all(src.join("dir_a")).expect("mkdir");
        fs::write(src.join("dir_a/file_a_a"), "x").expect("write");
        fs::write(src.join("file_a"), "y").expect("write");

        let cli = Cli::try_parse_from([
            "mirrorkit-sync",
            "-s",
            src.to_str().expect("utf8"),
            "-d",
            dst.to_str().expect("utf8"),
        ])
        .expect("parse");
        let (report, t_elapsed) = run(&cli).expect("run");

        assert_eq!(report.cnt_copied, 2);
        assert!(t_elapsed.as_nanos() > 0);
        assert!(dst.join("dir_a/file_a_a").exists());
        assert!(dst.join("file_a").exists());
    }

    #[test]
    fn run_same_directory_maps_to_input_exit_code() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let c_dir = tmp.path().to_str().expect("utf8");

        let cli = Cli::try_parse_from(["mirrorkit-sync", "-s", c_dir, "-d", c_dir]).expect("parse");
        let err = run(&cli).expect_err("same dir");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn run_missing_source_maps_to_input_exit_code() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cli = Cli::try_parse_from([
            "mirrorkit-sync",
            "-s",
            tmp.path().join("nope").to_str().expect("utf8"),
            "-d",
            tmp.path().join("dst").to_str().expect("utf8"),
        ])
        .expect("parse");
        let err = run(&cli).expect_err("missing source");
        assert_eq!(err.exit_code(), 2);
    }
}
