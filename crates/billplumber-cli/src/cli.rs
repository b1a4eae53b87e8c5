use std::path::PathBuf;

use billplumber::TableSettings;
use clap::{ArgAction, Parser};

/// Convert WeChat Pay bill statements into spreadsheets and spending reports.
///
/// Every `.zip` archive and `.pdf` file in the input directory is parsed;
/// each statement becomes `<name>.xlsx` plus `<name>.html` in the output
/// directory, and two or more statements are also merged into
/// `merged_bill.xlsx` and `merged_bill.html`.
#[derive(Debug, Parser)]
#[command(name = "billplumber", about, version)]
pub struct Cli {
    /// Directory holding the .zip and .pdf statements
    #[arg(long, value_name = "DIR", default_value = "input")]
    pub input: PathBuf,

    /// Directory receiving the generated files
    #[arg(long, value_name = "DIR", default_value = "output")]
    pub output: PathBuf,

    /// Archive / PDF password; repeat to supply candidates for retries
    #[arg(long = "password", value_name = "PW")]
    pub passwords: Vec<String>,

    /// Skip the HTML reports
    #[arg(long)]
    pub no_report: bool,

    /// Snap tolerance for aligning nearby ruling lines (default: 3.0)
    #[arg(long, default_value_t = 3.0)]
    pub snap_tolerance: f64,

    /// Join tolerance for merging collinear ruling lines (default: 3.0)
    #[arg(long, default_value_t = 3.0)]
    pub join_tolerance: f64,

    /// Text tolerance for grouping cell characters (default: 3.0)
    #[arg(long, default_value_t = 3.0)]
    pub text_tolerance: f64,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Table detection settings from the tolerance flags.
    pub fn table_settings(&self) -> TableSettings {
        TableSettings::default()
            .with_snap_tolerance(self.snap_tolerance)
            .with_join_tolerance(self.join_tolerance)
            .with_text_tolerance(self.text_tolerance)
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["billplumber"]);
        assert_eq!(cli.input, PathBuf::from("input"));
        assert_eq!(cli.output, PathBuf::from("output"));
        assert!(cli.passwords.is_empty());
        assert!(!cli.no_report);
        assert_eq!(cli.log_filter(), "warn");

        let settings = cli.table_settings();
        assert_eq!(settings.snap_x_tolerance, 3.0);
        assert_eq!(settings.join_y_tolerance, 3.0);
        assert_eq!(settings.text_x_tolerance, 3.0);
    }

    #[test]
    fn directories_and_repeated_passwords() {
        let cli = Cli::parse_from([
            "billplumber",
            "--input",
            "bills",
            "--output",
            "out",
            "--password",
            "123456",
            "--password",
            "654321",
            "--no-report",
        ]);
        assert_eq!(cli.input, PathBuf::from("bills"));
        assert_eq!(cli.output, PathBuf::from("out"));
        assert_eq!(cli.passwords, vec!["123456", "654321"]);
        assert!(cli.no_report);
    }

    #[test]
    fn tolerances_feed_table_settings() {
        let cli = Cli::parse_from([
            "billplumber",
            "--snap-tolerance",
            "1.5",
            "--join-tolerance",
            "2",
            "--text-tolerance",
            "4",
        ]);
        let settings = cli.table_settings();
        assert_eq!(settings.snap_y_tolerance, 1.5);
        assert_eq!(settings.join_x_tolerance, 2.0);
        assert_eq!(settings.text_y_tolerance, 4.0);
    }

    #[test]
    fn verbosity_flags() {
        assert_eq!(Cli::parse_from(["billplumber", "-v"]).log_filter(), "debug");
        assert_eq!(Cli::parse_from(["billplumber", "-vv"]).log_filter(), "trace");
        assert_eq!(Cli::parse_from(["billplumber", "-q"]).log_filter(), "error");
        assert!(Cli::try_parse_from(["billplumber", "-v", "-q"]).is_err());
    }
}
