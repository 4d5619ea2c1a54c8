#![cfg(test)]

use std::fs;
use std::fs::File;
use std::sync::atomic::Ordering;

use crate::environment::RunParams;
use crate::pipeline::{StageContext, StageState};
use crate::stages::build_pipeline;

use super::common::{Harness, write_report_pair};

#[tokio::test]
async fn full_run_publishes_everywhere() {
    let harness = Harness::new(RunParams::new("RT-12", "RT-PLAN-1", "jdoe"));
    // Two historical report pairs and an up-to-date dependency snapshot
    write_report_pair(&harness.run.paths.report_dir, 1);
    write_report_pair(&harness.run.paths.report_dir, 2);
    fs::copy(&harness.run.paths.manifest, &harness.run.paths.snapshot).unwrap();

    let pipeline = build_pipeline(harness.collaborators());
    let mut context = harness.live_context();
    let summary = pipeline.execute(&mut context).await;

    assert!(summary.success(), "{}", summary);
    assert_eq!(summary.exit_code(), 0);
    for report in &summary.reports {
        assert_eq!(report.state, StageState::Succeeded, "stage {}", report.stage_id);
    }

    assert_eq!(harness.scm.syncs.load(Ordering::SeqCst), 1);
    assert_eq!(harness.env.installs.load(Ordering::SeqCst), 0, "unchanged manifest, no install");

    // Versions 1 and 2 exist, so this run produced version 3
    let v3_html = harness.run.paths.report_dir.join("test_result_report_v3.html");
    assert!(v3_html.is_file());

    // The archive carries the version-3 pair
    let archive = zip::ZipArchive::new(File::open(&harness.run.paths.archive).unwrap()).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    assert!(names.contains(&"test_result_report_v3.html"), "members: {:?}", names);
    assert!(names.contains(&"test_result_report_v3.pdf"));

    assert_eq!(harness.wiki.call_count().await, 1);
    assert_eq!(harness.tracker.call_count().await, 1, "execution key present, upload ran");
    // The attach stage received the freshly created key and the v3 report
    assert_eq!(*harness.issues.attached.lock().await, vec![("RT-900".to_string(), 3)]);
    assert_eq!(harness.mailer.call_count().await, 1);
}

#[tokio::test]
async fn archive_is_rebuilt_from_report_directory() {
    let harness = Harness::new(RunParams::default());
    // A stale archive from a previous run must be fully replaced
    fs::write(&harness.run.paths.archive, b"stale bytes").unwrap();

    let pipeline = build_pipeline(harness.collaborators());
    let mut context = harness.live_context();
    let summary = pipeline.execute(&mut context).await;
    assert!(summary.success(), "{}", summary);

    let archive = zip::ZipArchive::new(File::open(&harness.run.paths.archive).unwrap()).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    assert!(names.contains(&"test_result_report_v1.html"), "members: {:?}", names);
    assert!(names.contains(&"test_result_report_v1.pdf"));
    assert!(names.contains(&"version.txt"));
}

#[tokio::test]
async fn missing_execution_key_skips_tracker_upload_only() {
    let harness = Harness::new(RunParams::new("", "", ""));

    let pipeline = build_pipeline(harness.collaborators());
    let mut context = harness.live_context();
    let summary = pipeline.execute(&mut context).await;

    assert!(summary.success(), "a skipped upload is not a failure: {}", summary);
    assert_eq!(summary.state_of("publish.tracker_upload"), Some(StageState::Skipped));
    assert_eq!(harness.tracker.call_count().await, 0);
    // Every other publishing stage still ran
    assert_eq!(summary.state_of("publish.wiki"), Some(StageState::Succeeded));
    assert_eq!(summary.state_of("publish.email"), Some(StageState::Succeeded));
}

#[tokio::test]
async fn wiki_rejection_is_recoverable() {
    let mut harness = Harness::new(RunParams::default());
    harness.wiki = super::common::ScriptedPublisher::failing("wiki", "HTTP 401: unauthorized");

    let pipeline = build_pipeline(harness.collaborators());
    let mut context = harness.live_context();
    let summary = pipeline.execute(&mut context).await;

    assert!(summary.success(), "wiki failure must not abort the run: {}", summary);
    assert_eq!(summary.state_of("publish.wiki"), Some(StageState::Failed));
    assert_eq!(summary.state_of("pipeline.archive"), Some(StageState::Succeeded));
    assert_eq!(harness.mailer.call_count().await, 1, "email still goes out");
}

#[tokio::test]
async fn rejected_execution_create_fails_attachment_fatally() {
    let mut harness = Harness::new(RunParams::default());
    harness.issues = super::common::ScriptedTracker::rejecting();

    let pipeline = build_pipeline(harness.collaborators());
    let mut context = harness.live_context();
    let summary = pipeline.execute(&mut context).await;

    assert!(!summary.success());
    assert_eq!(summary.state_of("publish.execution_create"), Some(StageState::Failed));
    assert_eq!(summary.aborted_by.as_deref(), Some("publish.attach_reports"));
    assert_eq!(summary.state_of("publish.email"), Some(StageState::Pending));
    assert!(harness.issues.attached.lock().await.is_empty());
    assert_eq!(harness.mailer.call_count().await, 0);
}

#[tokio::test]
async fn first_run_installs_and_commits_snapshot() {
    let harness = Harness::new(RunParams::default());
    assert!(!harness.run.paths.snapshot.exists());

    let pipeline = build_pipeline(harness.collaborators());
    let mut context = harness.live_context();
    let summary = pipeline.execute(&mut context).await;
    assert!(summary.success(), "{}", summary);

    assert_eq!(harness.env.installs.load(Ordering::SeqCst), 1);
    let snapshot = fs::read(&harness.run.paths.snapshot).unwrap();
    let manifest = fs::read(&harness.run.paths.manifest).unwrap();
    assert_eq!(snapshot, manifest, "snapshot mirrors the installed manifest");

    // A second run over the same working directory skips the install
    let pipeline = build_pipeline(harness.collaborators());
    let mut context = harness.live_context();
    let summary = pipeline.execute(&mut context).await;
    assert!(summary.success(), "{}", summary);
    assert_eq!(harness.env.installs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dry_run_executes_no_collaborator() {
    let harness = Harness::new(RunParams::new("RT-12", "", ""));

    let pipeline = build_pipeline(harness.collaborators());
    let mut context = StageContext::new_dry_run(harness.run.clone());
    let summary = pipeline.execute(&mut context).await;

    assert!(summary.success());
    assert_eq!(harness.scm.syncs.load(Ordering::SeqCst), 0);
    assert_eq!(harness.env.installs.load(Ordering::SeqCst), 0);
    assert_eq!(harness.wiki.call_count().await, 0);
    assert_eq!(harness.mailer.call_count().await, 0);
    assert!(!harness.run.paths.archive.exists());
    // Every gated-in stage reports the action it would take
    for report in &summary.reports {
        assert_eq!(report.state, StageState::Succeeded, "stage {}", report.stage_id);
        assert!(report.detail.is_some());
    }
}
