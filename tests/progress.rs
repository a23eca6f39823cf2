//! Progress, stage, and cancellation integration tests.

mod common;

use std::sync::Arc;

use common::{RecordingProgress, StubProbe, StubSampler};
use framegrab::{
    CancellationToken, ExtractOptions, ExtractionPipeline, ExtractionRequest, Notice,
    OutputFormat, RunStage,
};

// ── CancellationToken ──────────────────────────────────────────────

#[test]
fn cancellation_token_default_not_cancelled() {
    let token = CancellationToken::new();
    assert!(!token.is_cancelled());
}

#[test]
fn cancellation_token_cancel() {
    let token = CancellationToken::new();
    token.cancel();
    assert!(token.is_cancelled());
}

#[test]
fn cancellation_token_clone_shares_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn cancellation_token_default_trait() {
    let token = CancellationToken::default();
    assert!(!token.is_cancelled());
}

// ── RunStage ───────────────────────────────────────────────────────

#[test]
fn happy_path_edges_are_legal() {
    let path = [
        RunStage::Idle,
        RunStage::Validating,
        RunStage::Sampling,
        RunStage::Targeting,
        RunStage::Summarizing,
        RunStage::Done,
    ];
    for pair in path.windows(2) {
        assert!(pair[0].can_advance_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
    }
}

#[test]
fn terminal_stages_have_no_exits() {
    for next in [RunStage::Idle, RunStage::Validating, RunStage::Sampling, RunStage::Done] {
        assert!(!RunStage::Done.can_advance_to(next));
        assert!(!RunStage::Failed.can_advance_to(next));
    }
    assert!(RunStage::Failed.is_terminal());
    assert!(!RunStage::Targeting.is_terminal());
}

#[test]
fn targeting_cannot_be_skipped_into_done() {
    assert!(!RunStage::Targeting.can_advance_to(RunStage::Done));
    assert!(!RunStage::Validating.can_advance_to(RunStage::Targeting));
}

// ── Notice ─────────────────────────────────────────────────────────

#[test]
fn notice_messages() {
    let ignored = Notice::SizeTargetIgnored {
        input: "abc".to_string(),
    };
    assert!(ignored.to_string().contains("ignoring size setting"));

    let upgraded = Notice::FormatUpgraded {
        requested: OutputFormat::Png,
        effective: OutputFormat::Jpeg,
    };
    assert_eq!(
        upgraded.to_string(),
        "PNG chosen with a target size; frames will be written as JPG to meet the size target"
    );

    let unavailable = Notice::MetadataUnavailable {
        reason: "no such file".to_string(),
    };
    assert!(unavailable.to_string().contains("no such file"));
}

// ── ProgressInfo ───────────────────────────────────────────────────

#[test]
fn progress_info_carries_stage_and_frame_counts() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let progress = Arc::new(RecordingProgress::default());
    let mut request = ExtractionRequest::new("clip.mp4");
    request.output_root = root.path().to_path_buf();
    request.requested_format = OutputFormat::Jpeg;
    request.size_target_kb = Some("10".to_string());

    ExtractionPipeline::new()
        .with_probe(Arc::new(StubProbe::returning(2.0, 25.0)))
        .with_sampler(Arc::new(StubSampler::writing(2, 50_000)))
        .with_reencoder(Arc::new(common::CurveReencoder::new(common::inverse_curve(
            400_000,
        ))))
        .with_options(ExtractOptions::new().with_progress(progress.clone()))
        .run(&request)
        .expect("run should succeed");

    let infos = progress.infos.lock().unwrap();
    let adjusting: Vec<_> = infos
        .iter()
        .filter(|info| info.label.starts_with("adjusting frame"))
        .collect();
    assert_eq!(adjusting.len(), 2);
    assert_eq!(adjusting[0].label, "adjusting frame 1/2");
    assert_eq!(adjusting[0].stage, RunStage::Targeting);
    assert_eq!((adjusting[1].current, adjusting[1].total), (2, Some(2)));
    assert!(adjusting[1].estimated_remaining.is_some());

    let last = infos.last().unwrap();
    assert_eq!(last.stage, RunStage::Done);
    assert_eq!(last.percentage, 100);
}
