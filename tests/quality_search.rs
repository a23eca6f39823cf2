//! QualitySearch integration tests against deterministic encoder curves.

mod common;

use std::fs;
use std::path::Path;

use common::{CurveReencoder, inverse_curve, scratch_files};
use framegrab::{QualitySearch, QualitySearchResult};

fn source_frame(directory: &Path) -> std::path::PathBuf {
    let source = directory.join("frame_0001.jpg");
    fs::write(&source, vec![b'f'; 4096]).expect("Failed to write source frame");
    source
}

/// Candidate with the minimal |size - target| among the probed qualities,
/// first one winning ties.
fn expected_best(qualities: &[u8], size_of: impl Fn(u8) -> u64, target: u64) -> u8 {
    let mut best = qualities[0];
    for &quality in qualities {
        if size_of(quality).abs_diff(target) < size_of(best).abs_diff(target) {
            best = quality;
        }
    }
    best
}

// ── Probe budget and range ─────────────────────────────────────────

#[test]
fn search_spends_exactly_six_probes() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let source = source_frame(directory.path());
    let reencoder = CurveReencoder::new(inverse_curve(600_000));

    let result = QualitySearch::default().search(&reencoder, &source, 30_000);

    assert_eq!(result.probes_run, 6);
    assert_eq!(reencoder.call_count(), 6);
}

#[test]
fn probes_follow_binary_search_order() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let source = source_frame(directory.path());
    // 600_000 / q: q=16 -> 37_500 > 30_000, so the search moves to coarser q.
    let reencoder = CurveReencoder::new(inverse_curve(600_000));

    let _ = QualitySearch::default().search(&reencoder, &source, 30_000);

    assert_eq!(reencoder.qualities(), vec![16, 24, 20, 18, 19, 19]);
}

#[test]
fn quality_stays_in_range_when_every_size_is_under_target() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let source = source_frame(directory.path());
    let reencoder = CurveReencoder::new(inverse_curve(3_100));

    let result = QualitySearch::default().search(&reencoder, &source, 1_000_000);

    let qualities = reencoder.qualities();
    assert_eq!(qualities.len(), 6);
    assert!(qualities.iter().all(|q| (2..=31).contains(q)), "{qualities:?}");
    assert_eq!(result.chosen_quality(), Some(2));
}

#[test]
fn quality_stays_in_range_when_every_size_is_over_target() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let source = source_frame(directory.path());
    let reencoder = CurveReencoder::new(inverse_curve(10_000_000));

    let result = QualitySearch::default().search(&reencoder, &source, 10);

    let qualities = reencoder.qualities();
    assert!(qualities.iter().all(|q| (2..=31).contains(q)), "{qualities:?}");
    assert_eq!(result.chosen_quality(), Some(31));
}

#[test]
fn custom_range_and_budget_are_honoured() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let source = source_frame(directory.path());
    let reencoder = CurveReencoder::new(inverse_curve(600_000));

    let result = QualitySearch::default()
        .with_range(5, 9)
        .with_probe_budget(3)
        .search(&reencoder, &source, 1);

    assert_eq!(result.probes_run, 3);
    assert!(reencoder.qualities().iter().all(|q| (5..=9).contains(q)));
}

// ── Best-candidate selection ───────────────────────────────────────

#[test]
fn chooses_minimal_difference_among_probed_qualities() {
    for target in [1_000_u64, 20_000, 37_000, 55_000, 150_000, 400_000] {
        let directory = tempfile::tempdir().expect("Failed to create temp dir");
        let source = source_frame(directory.path());
        let reencoder = CurveReencoder::new(inverse_curve(600_000));

        let result = QualitySearch::default().search(&reencoder, &source, target);

        let expected = expected_best(&reencoder.qualities(), |q| 600_000 / u64::from(q), target);
        assert_eq!(result.chosen_quality(), Some(expected), "target {target}");
        assert_eq!(
            result.achieved_size_bytes(),
            Some(600_000 / u64::from(expected))
        );
    }
}

#[test]
fn ties_keep_the_first_candidate() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let source = source_frame(directory.path());
    // q=16 and q=24 are both 100 bytes from the target.
    let reencoder = CurveReencoder::new(|_: &Path, quality: u8| match quality {
        16 => Some(1_100),
        24 => Some(900),
        _ => Some(5_000),
    });

    let result = QualitySearch::default().search(&reencoder, &source, 1_000);

    assert_eq!(&reencoder.qualities()[..2], &[16, 24]);
    assert_eq!(result.chosen_quality(), Some(16));
    assert_eq!(result.achieved_size_bytes(), Some(1_100));
}

// ── Scratch files ──────────────────────────────────────────────────

#[test]
fn only_the_winner_survives() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let source = source_frame(directory.path());
    let reencoder = CurveReencoder::new(inverse_curve(600_000));

    let result = QualitySearch::default().search(&reencoder, &source, 30_000);

    let best = result.best.expect("a winner");
    assert!(best.path.exists());
    assert_eq!(fs::metadata(&best.path).unwrap().len(), best.size_bytes);
    assert_eq!(scratch_files(directory.path()).len(), 1);
    assert!(source.exists(), "the source frame is never touched");
}

#[test]
fn failure_on_first_probe_leaves_nothing() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let source = source_frame(directory.path());
    let reencoder = CurveReencoder::new(|_: &Path, _: u8| None);

    let result: QualitySearchResult = QualitySearch::default().search(&reencoder, &source, 30_000);

    assert!(result.best.is_none());
    assert_eq!(result.probes_run, 1);
    assert!(scratch_files(directory.path()).is_empty());
}

#[test]
fn failure_mid_search_keeps_earlier_best() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let source = source_frame(directory.path());
    // Third probe is q=20 for this target; refuse it.
    let reencoder = CurveReencoder::new(|_: &Path, quality: u8| {
        (quality != 20).then(|| 600_000 / u64::from(quality))
    });

    let result = QualitySearch::default().search(&reencoder, &source, 30_000);

    assert_eq!(reencoder.qualities(), vec![16, 24, 20]);
    assert_eq!(result.probes_run, 3);
    // 600_000/16 = 37_500 (diff 7_500) vs 600_000/24 = 25_000 (diff 5_000).
    assert_eq!(result.chosen_quality(), Some(24));
    assert_eq!(scratch_files(directory.path()).len(), 1);
}
