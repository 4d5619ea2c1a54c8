use std::path::PathBuf;

use clap::Parser;

/// Conveyor: build, test, report and publish pipeline
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Working directory containing the source checkout
    #[arg(long, default_value = ".")]
    pub workdir: PathBuf,

    /// Test execution key; when empty the test-tracker upload is skipped
    #[arg(long, default_value = "")]
    pub test_execution_key: String,

    /// Test plan key forwarded to the issue tracker
    #[arg(long, default_value = "")]
    pub test_plan_key: String,

    /// Display name of whoever (or whatever) triggered this run
    #[arg(long, default_value = "")]
    pub triggered_by: String,

    /// Base interpreter used to create the tool environment
    #[arg(long, default_value = "python3")]
    pub python: PathBuf,

    /// Report renderer program producing the versioned HTML/PDF pair
    #[arg(long, default_value = "render-report")]
    pub renderer: PathBuf,

    /// Simulate the run: report what each stage would do without executing
    #[arg(long)]
    pub dry_run: bool,
}
