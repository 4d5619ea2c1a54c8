mod cli; // Declare the cli module

use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use conveyor_core::environment::{EnvSecretProvider, RunContext, RunParams};
use conveyor_core::pipeline::{RunLock, StageContext};
use conveyor_core::publish::{ConfluencePublisher, JiraTracker, MailPublisher, RtmPublisher};
use conveyor_core::runner::process::{GitCheckout, ProcessRenderer, PytestRunner, Virtualenv};
use conveyor_core::stages::{Collaborators, build_pipeline};

use cli::CliArgs;

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = CliArgs::parse();
    std::process::exit(run(args).await);
}

async fn run(args: CliArgs) -> i32 {
    let params = RunParams::new(&args.test_execution_key, &args.test_plan_key, &args.triggered_by);

    let run = match RunContext::build(&EnvSecretProvider, params, args.workdir.clone()) {
        Ok(run) => Arc::new(run),
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return 1;
        }
    };

    // Exclusive run lock; held for the duration of the run
    let _lock = match RunLock::acquire(run.paths.workdir.join(".conveyor.lock")) {
        Ok(lock) => lock,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };

    let env = Virtualenv {
        base_python: args.python,
        root: run.paths.workdir.join(".venv"),
    };
    let python = env.interpreter();

    let collaborators = Collaborators {
        scm: Arc::new(GitCheckout {
            workdir: run.paths.workdir.clone(),
            remote: run.scm.remote.clone(),
            branch: run.scm.branch.clone(),
        }),
        env: Arc::new(env),
        runner: Arc::new(PytestRunner {
            python,
            workdir: run.paths.workdir.clone(),
            report_dir: run.paths.report_dir.clone(),
        }),
        renderer: Arc::new(ProcessRenderer {
            program: args.renderer,
            report_dir: run.paths.report_dir.clone(),
        }),
        wiki: Arc::new(ConfluencePublisher::new()),
        tracker: Arc::new(RtmPublisher::new()),
        issues: Arc::new(JiraTracker::new()),
        mailer: Arc::new(MailPublisher::new()),
    };

    let pipeline = build_pipeline(collaborators);
    let mut context = if args.dry_run {
        StageContext::new_dry_run(run)
    } else {
        StageContext::new_live(run)
    };

    info!("Starting pipeline run");
    let summary = pipeline.execute(&mut context).await;
    println!("{}", summary);
    if let Some(stage) = &summary.aborted_by {
        error!("Run aborted by stage '{}'", stage);
    }
    summary.exit_code()
}
