//! Controller tests against the manually clocked test audio graph

use std::sync::Arc;

use tokio::sync::oneshot;

use super::*;
use crate::config::AudioConfig;
use crate::error::SyncError;
use crate::session::ConfigSource;
use crate::test_utils::{ScriptedEngine, TestAudioGraph, TestBackend, TestModel, ramp_audio};

const MOUTH: usize = 1;

fn model() -> TestModel {
    TestModel::with_parameters(&["ParamAngleX", "ParamMouthOpenY"])
}

fn controller(graph: &TestAudioGraph) -> PlaybackController<TestBackend> {
    PlaybackController::new(graph.backend(), &SyncConfig::default())
}

fn session(engine: ScriptedEngine) -> SyncSession {
    SyncSession::new(Box::new(engine), ConfigSource::Bytes, 48_000)
}

fn talking_engine() -> ScriptedEngine {
    ScriptedEngine::new().with_mouth(&[MOUTH]).writing(MOUTH, 0.8)
}

fn segment(len: usize) -> Arc<DecodedAudio> {
    Arc::new(ramp_audio(len, 48_000))
}

// =============================================================
// play / stop
// =============================================================

#[test]
fn test_play_starts_source_and_anchors_clock() {
    let graph = TestAudioGraph::new();
    let mut c = controller(&graph);
    let mut m = model();
    graph.set_time(5.0);

    c.play_decoded(segment(48_000), true, &mut m).unwrap();

    assert!(c.is_playing());
    assert!(graph.probe(0).started);
    assert_eq!(graph.probe(0).frames, 48_000);
    assert_eq!(c.driver().clock_state().previous_clock_time, 5.0);
    assert_eq!(c.driver().clock_state().elapsed_audio_time, 0.0);
}

#[test]
fn test_play_with_stop_others_resets_everything() {
    let graph = TestAudioGraph::new();
    let mut c = controller(&graph);
    let mut m = model();
    c.replace_session(session(talking_engine().consuming(0)));

    let mut first = c.play_decoded(segment(48_000), true, &mut m).unwrap();
    graph.advance(0.25);
    c.update(&mut m).unwrap();
    assert_eq!(m.parameter_value(MOUTH), Some(0.8));
    assert_eq!(c.driver().accumulator().len(), 12_000);

    let (_tx, rx) = oneshot::channel();
    c.append_play(QueuedSegment::Pending(rx));
    assert_eq!(c.queued(), 1);

    c.play_decoded(segment(100), true, &mut m).unwrap();

    let old = graph.probe(0);
    assert!(old.stopped && old.disconnected);
    assert_eq!(m.parameter_value(MOUTH), Some(0.0));
    assert!(c.driver().accumulator().is_empty());
    assert_eq!(c.queued(), 0);
    assert!(graph.probe(1).started);
    assert_eq!(first.try_outcome(), Some(PlaybackOutcome::Stopped));
}

#[test]
fn test_play_without_stop_others_keeps_queue() {
    let graph = TestAudioGraph::new();
    let mut c = controller(&graph);
    let mut m = model();
    c.replace_session(session(talking_engine()));

    c.play_decoded(segment(48_000), true, &mut m).unwrap();
    graph.advance(0.1);
    c.update(&mut m);

    let (_tx, rx) = oneshot::channel();
    c.append_play(QueuedSegment::Pending(rx));
    c.play_decoded(segment(200), false, &mut m).unwrap();

    assert!(graph.probe(0).stopped);
    assert_eq!(c.queued(), 1);
    // Mouth untouched
    assert_eq!(m.parameter_value(MOUTH), Some(0.8));
}

#[test]
fn test_create_failure_is_returned() {
    let graph = TestAudioGraph::new();
    let mut c = controller(&graph);
    let mut m = model();
    graph.fail_create(true);

    let result = c.play_decoded(segment(10), true, &mut m);
    assert!(matches!(result, Err(SyncError::Backend(_))));
    assert!(!c.is_playing());
    assert!(c.update(&mut m).is_none());
}

#[test]
fn test_stop_without_session_is_quiet() {
    let graph = TestAudioGraph::new();
    let mut c = controller(&graph);
    let mut m = model();

    c.stop(&mut m);
    c.reset(&mut m);
    assert_eq!(m.set_calls(), 0);
}

#[test]
fn test_mouth_reset_failure_is_swallowed() {
    let graph = TestAudioGraph::new();
    let mut c = controller(&graph);
    let mut m = model();
    m.set_parameter_value_by_index(MOUTH, 0.5);
    c.replace_session(session(ScriptedEngine::new().without_mouth()));

    c.stop(&mut m);
    assert_eq!(m.parameter_value(MOUTH), Some(0.5));
}

#[test]
fn test_mouth_reset_skips_out_of_range_indices() {
    let graph = TestAudioGraph::new();
    let mut c = controller(&graph);
    let mut m = model();
    m.set_parameter_value_by_index(MOUTH, 0.5);
    c.replace_session(session(ScriptedEngine::new().with_mouth(&[MOUTH, 7])));

    c.stop(&mut m);
    assert_eq!(m.parameter_value(MOUTH), Some(0.0));
    assert_eq!(m.set_calls(), 2);
}

// =============================================================
// per-frame update
// =============================================================

#[test]
fn test_update_without_session_only_accumulates() {
    let graph = TestAudioGraph::new();
    let mut c = controller(&graph);
    let mut m = model();

    c.play_decoded(segment(48_000), true, &mut m).unwrap();
    graph.advance(0.5);
    let report = c.update(&mut m).unwrap();

    assert_eq!(report.range, 0..24_000);
    assert!(!report.analysed);
    assert_eq!(report.trimmed, 0);
    assert_eq!(m.set_calls(), 0);
}

#[test]
fn test_update_idle_is_noop() {
    let graph = TestAudioGraph::new();
    let mut c = controller(&graph);
    let mut m = model();
    c.replace_session(session(talking_engine()));

    graph.advance(1.0);
    assert!(c.update(&mut m).is_none());
    assert_eq!(m.set_calls(), 0);
}

#[test]
fn test_end_resolves_completion_and_delays_mouth_reset() {
    let graph = TestAudioGraph::new();
    let mut c = controller(&graph);
    let mut m = model();
    c.replace_session(session(talking_engine()));

    let mut completion = c.play_decoded(segment(4_800), true, &mut m).unwrap();
    graph.advance(0.1);
    c.update(&mut m);
    assert_eq!(completion.try_outcome(), None);

    graph.end_source(0);
    c.update(&mut m);
    assert_eq!(completion.try_outcome(), Some(PlaybackOutcome::Finished));
    assert!(!c.is_playing());
    assert!(graph.probe(0).disconnected);
    assert_eq!(m.parameter_value(MOUTH), Some(0.8));

    graph.advance(0.05);
    c.update(&mut m);
    assert_eq!(m.parameter_value(MOUTH), Some(0.8));

    graph.advance(0.06);
    c.update(&mut m);
    assert_eq!(m.parameter_value(MOUTH), Some(0.0));
}

#[test]
fn test_new_play_cancels_pending_mouth_reset() {
    let graph = TestAudioGraph::new();
    let mut c = controller(&graph);
    let mut m = model();
    c.replace_session(session(talking_engine()));

    c.play_decoded(segment(4_800), true, &mut m).unwrap();
    graph.end_source(0);
    c.update(&mut m);
    assert!(c.pending_mouth_reset.is_some());

    c.play_decoded(segment(4_800), false, &mut m).unwrap();
    assert!(c.pending_mouth_reset.is_none());
}

// =============================================================
// queue
// =============================================================

#[test]
fn test_append_play_waits_for_end() {
    let graph = TestAudioGraph::new();
    let mut c = controller(&graph);
    let mut m = model();

    c.append_play(segment(1_000).into());
    c.append_play(segment(2_000).into());
    assert_eq!(graph.source_count(), 1);
    assert_eq!(graph.probe(0).frames, 1_000);
    assert_eq!(c.queued(), 1);

    graph.advance(0.01);
    c.update(&mut m);
    assert_eq!(graph.source_count(), 1);

    graph.end_source(0);
    c.update(&mut m);
    assert_eq!(graph.source_count(), 2);
    assert!(graph.probe(0).disconnected);
    assert!(graph.probe(1).started);
    assert_eq!(graph.probe(1).frames, 2_000);
    assert_eq!(c.queued(), 0);
}

#[test]
fn test_pending_segment_does_not_block() {
    let graph = TestAudioGraph::new();
    let mut c = controller(&graph);
    let mut m = model();

    let (tx, rx) = oneshot::channel();
    c.append_play(QueuedSegment::Pending(rx));
    c.update(&mut m);
    assert!(!c.is_playing());
    assert_eq!(c.queued(), 1);

    tx.send(Ok(segment(500))).unwrap();
    c.update(&mut m);
    assert!(c.is_playing());
    assert_eq!(graph.probe(0).frames, 500);
}

#[test]
fn test_abandoned_segment_is_skipped() {
    let graph = TestAudioGraph::new();
    let mut c = controller(&graph);
    let mut m = model();

    let (tx, rx) = oneshot::channel();
    c.append_play(QueuedSegment::Pending(rx));
    c.append_play(segment(300).into());
    assert!(!c.is_playing());

    drop(tx);
    c.update(&mut m);
    assert!(c.is_playing());
    assert_eq!(graph.source_count(), 1);
    assert_eq!(graph.probe(0).frames, 300);
}

#[test]
fn test_play_next_segment_on_empty_queue() {
    let graph = TestAudioGraph::new();
    let mut c = controller(&graph);
    assert!(c.play_next_segment().is_none());
}

// =============================================================
// volume
// =============================================================

#[test]
fn test_set_volume_clamps() {
    let graph = TestAudioGraph::new();
    let mut c = controller(&graph);
    assert_eq!(graph.gain(), 1.0);

    c.set_volume(0.25);
    assert_eq!(c.volume(), 0.25);
    assert_eq!(graph.gain(), 0.25);

    c.set_volume(3.0);
    assert_eq!(c.volume(), 1.0);

    c.set_volume(-1.0);
    assert_eq!(c.volume(), 0.0);

    c.set_volume(f32::NAN);
    assert_eq!(c.volume(), 0.0);
    assert_eq!(graph.gain(), 0.0);
}

#[test]
fn test_configured_volume_ceiling() {
    let graph = TestAudioGraph::new();
    let config = SyncConfig {
        audio: AudioConfig {
            volume: 5.0,
            max_volume: 2.0,
        },
        ..SyncConfig::default()
    };
    let mut c = PlaybackController::new(graph.backend(), &config);
    assert_eq!(c.volume(), 2.0);

    c.set_volume(1.5);
    assert_eq!(graph.gain(), 1.5);
}
