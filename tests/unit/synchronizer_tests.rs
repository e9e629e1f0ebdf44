/*!
 * Tests for active cue resolution against a linear scan
 */

use std::sync::Arc;

use subcue::cue::{Cue, SubtitleFormat, Track};
use subcue::dispatcher::SubtitleParserDispatcher;
use subcue::synchronizer::{Synchronizer, active_cues};

use crate::common::SRT_SAMPLE;

fn brute_force(track: &Track, position_ms: u64, offset_ms: i64) -> Vec<Cue> {
    let Ok(adjusted) = u64::try_from(i128::from(position_ms) - i128::from(offset_ms)) else {
        return Vec::new();
    };
    track
        .cues()
        .iter()
        .filter(|cue| cue.contains(adjusted))
        .cloned()
        .collect()
}

/// Dense overlapping track with cues of very different lengths
fn dense_track() -> Track {
    let cues = (0..200u64)
        .filter_map(|i| {
            let start = i * 350;
            let length = 200 + (i * 7919) % 4_000;
            Cue::new(start, start + length, format!("cue {}", i))
        })
        .collect();
    Track::new(SubtitleFormat::Srt, cues)
}

#[test]
fn test_activeCues_shouldMatchLinearScan() {
    let track = dense_track();
    for offset in [-1_500i64, 0, 750] {
        for position in (0..75_000u64).step_by(97) {
            assert_eq!(
                active_cues(&track, position, offset),
                brute_force(&track, position, offset),
                "position {} offset {}",
                position,
                offset
            );
        }
    }
}

#[test]
fn test_activeCues_onCueBoundaries_shouldMatchLinearScan() {
    let track = dense_track();
    for cue in track.cues() {
        for position in [cue.start_ms(), cue.end_ms(), cue.end_ms() + 1] {
            assert_eq!(active_cues(&track, position, 0), brute_force(&track, position, 0));
        }
    }
}

#[test]
fn test_synchronizer_withParsedTrack_shouldFollowPlayback() {
    let track = SubtitleParserDispatcher::parse_content(SRT_SAMPLE, SubtitleFormat::Srt).unwrap();
    let mut sync = Synchronizer::new();
    sync.load_track(Arc::new(track));
    sync.start_synchronization();

    let texts = |cues: Vec<Cue>| cues.into_iter().map(|c| c.text().to_string()).collect::<Vec<_>>();
    assert_eq!(texts(sync.update_position(500).unwrap()), Vec::<String>::new());
    assert_eq!(texts(sync.update_position(2_000).unwrap()), vec!["This is a test subtitle."]);
    assert_eq!(
        texts(sync.update_position(8_700).unwrap()),
        vec!["It contains multiple entries.", "For testing purposes."]
    );

    // A positive offset delays the subtitles
    sync.set_offset(1_000);
    assert!(sync.update_position(1_500).unwrap().is_empty());
    assert_eq!(sync.update_position(2_000).unwrap().len(), 1);
}

#[test]
fn test_activeCues_withExtremeOffsets_shouldReturnEmptyWithoutOverflow() {
    let track = dense_track();
    for (position, offset) in [
        (5, i64::MIN),
        (5, i64::MAX),
        (u64::MAX, 0),
        (u64::MAX, i64::MIN),
        (u64::MAX, i64::MAX),
        (0, i64::MIN + 1),
    ] {
        assert!(active_cues(&track, position, offset).is_empty(), "position {} offset {}", position, offset);
    }

    // A huge positive offset can still bring a far position back onto the track
    let far = i64::MAX as u64 + 1_000;
    let cues = active_cues(&track, far, i64::MAX);
    assert!(!cues.is_empty());
    assert_eq!(cues, brute_force(&track, 1_000, 0));
}

#[test]
fn test_synchronizer_withSaturatedOffsetAndHugeJumps_shouldKeepWorking() {
    let track = SubtitleParserDispatcher::parse_content(SRT_SAMPLE, SubtitleFormat::Srt).unwrap();
    let mut sync = Synchronizer::new();
    sync.load_track(Arc::new(track));
    sync.start_synchronization();

    assert_eq!(sync.adjust_offset(i64::MIN), i64::MIN);
    assert_eq!(sync.adjust_offset(-1), i64::MIN);
    assert!(sync.update_position(5).unwrap().is_empty());
    assert!(sync.update_position(u64::MAX).unwrap().is_empty());

    sync.set_offset(0);
    assert!(sync.update_position(0).unwrap().is_empty());
    assert!(sync.update_position(u64::MAX).unwrap().is_empty());
    assert_eq!(sync.update_position(2_000).unwrap().len(), 1);

    let stats = sync.stats();
    assert!(stats.sample_count >= 2);
    assert!(stats.max_abs_drift_ms > 0);
}
