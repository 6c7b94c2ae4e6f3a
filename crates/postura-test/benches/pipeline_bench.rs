//! Benchmarks for the per-frame pipeline

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use postura_core::{LiftingThresholds, SessionTime, Thresholds};
use postura_experience::{PhaseMachine, PhaseTable};
use postura_pose::{
    analyze_lifting_posture, detect_correct_positioning, detect_open_posture, detect_smile,
    detect_straight_back, LandmarkSmoother,
};
use postura_test::fixtures;

fn bench_smoothing(c: &mut Criterion) {
    let mut smoother = LandmarkSmoother::new();
    let frames = [fixtures::seated(), fixtures::slouched(), fixtures::arms_open()];
    let mut i = 0;

    c.bench_function("smooth_frame", |b| {
        b.iter(|| {
            i = (i + 1) % frames.len();
            black_box(smoother.smooth(frames[i].clone()))
        })
    });
}

fn bench_calibration(c: &mut Criterion) {
    let frame = fixtures::seated();
    let t = Thresholds::default();

    c.bench_function("detect_correct_positioning", |b| {
        b.iter(|| black_box(detect_correct_positioning(black_box(&frame), &t)))
    });
}

fn bench_straight_back(c: &mut Criterion) {
    let frame = fixtures::seated();
    let t = Thresholds::default();
    let baseline = detect_straight_back(&frame, &t, None, SessionTime::ZERO).baseline;

    c.bench_function("detect_straight_back_baseline", |b| {
        b.iter(|| black_box(detect_straight_back(black_box(&frame), &t, baseline, SessionTime::ZERO)))
    });

    let standing = fixtures::standing();
    c.bench_function("detect_straight_back_hips", |b| {
        b.iter(|| black_box(detect_straight_back(black_box(&standing), &t, None, SessionTime::ZERO)))
    });
}

fn bench_gestures(c: &mut Criterion) {
    let open = fixtures::arms_open();
    let smile = fixtures::smiling();
    let t = Thresholds::default();

    c.bench_function("detect_open_posture", |b| {
        b.iter(|| black_box(detect_open_posture(black_box(&open), &t)))
    });
    c.bench_function("detect_smile", |b| {
        b.iter(|| black_box(detect_smile(black_box(&smile), &t)))
    });
}

fn bench_lifting(c: &mut Criterion) {
    let frame = fixtures::stoop_lift();
    let t = LiftingThresholds::default();

    c.bench_function("analyze_lifting_posture", |b| {
        b.iter(|| black_box(analyze_lifting_posture(black_box(&frame), &t)))
    });
}

fn bench_machine_update(c: &mut Criterion) {
    let mut machine = PhaseMachine::new(PhaseTable::default_script(), Thresholds::default());
    let frame = fixtures::off_center();
    let mut now = SessionTime::ZERO;
    machine.update(Some(&frame), now);

    // Calibration never passes, so every update evaluates the predicate
    c.bench_function("machine_update_calibration", |b| {
        b.iter(|| {
            now = now + Duration::from_millis(33);
            let progress = machine.update(black_box(Some(&frame)), now);
            machine.drain_cues().for_each(drop);
            black_box(progress)
        })
    });
}

criterion_group!(
    benches,
    bench_smoothing,
    bench_calibration,
    bench_straight_back,
    bench_gestures,
    bench_lifting,
    bench_machine_update,
);
criterion_main!(benches);
