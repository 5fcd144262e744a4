use super::*;
use crate::classifier::WindowPrediction;
use crate::errors::SceneCutError;
use crate::window::WindowPlan;
use proptest::prelude::*;

/// Prediction whose value at each position identifies the real frame it came from
fn tagged(plan: &WindowPlan, window: usize) -> WindowPrediction {
    let scores = (0..plan.window_length)
        .map(|pos| plan.source_index(window, pos) as f32 / plan.frame_count as f32)
        .collect();
    WindowPrediction::new(scores)
}

fn expected(frame_count: usize) -> Vec<f32> {
    (0..frame_count)
        .map(|i| i as f32 / frame_count as f32)
        .collect()
}

#[test]
fn test_core_regions_are_concatenated() {
    let plan = WindowPlan::new(150, 100, 50).unwrap();
    let mut stitcher = ProbabilityStitcher::new(plan);
    for w in 0..plan.window_count {
        stitcher.push(w, tagged(&plan, w)).unwrap();
    }
    let sequence = stitcher.finish().unwrap();
    assert_eq!(sequence.len(), 150);
    assert_eq!(sequence.single_frame, expected(150));
    assert_eq!(sequence.many_hot, None);
}

#[test]
fn test_out_of_order_windows_are_buffered() {
    let plan = WindowPlan::new(230, 100, 50).unwrap();
    let mut stitcher = ProbabilityStitcher::new(plan);
    for w in [3, 1, 4, 0] {
        stitcher.push(w, tagged(&plan, w)).unwrap();
    }
    assert_eq!(stitcher.stitched_windows(), 2);
    assert_eq!(stitcher.stitched_frames(), 100);

    stitcher.push(2, tagged(&plan, 2)).unwrap();
    assert_eq!(stitcher.stitched_windows(), 5);
    assert_eq!(stitcher.finish().unwrap().single_frame, expected(230));
}

#[test]
fn test_many_hot_kept_only_when_always_present() {
    let plan = WindowPlan::new(8, 4, 4).unwrap();
    let with_many_hot = |v: f32| WindowPrediction {
        single_frame: vec![0.0; 4],
        many_hot: Some(vec![v; 4]),
    };

    let mut stitcher = ProbabilityStitcher::new(plan);
    stitcher.push(0, with_many_hot(0.25)).unwrap();
    stitcher.push(1, with_many_hot(0.75)).unwrap();
    assert_eq!(
        stitcher.finish().unwrap().many_hot,
        Some(vec![0.25, 0.25, 0.25, 0.25, 0.75, 0.75, 0.75, 0.75])
    );

    let mut stitcher = ProbabilityStitcher::new(plan);
    stitcher.push(0, with_many_hot(0.25)).unwrap();
    stitcher.push(1, WindowPrediction::new(vec![0.0; 4])).unwrap();
    assert_eq!(stitcher.finish().unwrap().many_hot, None);
}

#[test]
fn test_malformed_predictions_are_rejected() {
    let plan = WindowPlan::new(150, 100, 50).unwrap();
    let mut stitcher = ProbabilityStitcher::new(plan);

    let err = stitcher
        .push(1, WindowPrediction::new(vec![0.5; 99]))
        .unwrap_err();
    assert_eq!(err.window_index, Some(1));
    assert!(err.to_string().contains("99 values"));

    let mut nan = vec![0.5; 100];
    nan[40] = f32::NAN;
    assert!(stitcher.push(0, WindowPrediction::new(nan)).is_err());
    assert!(stitcher
        .push(0, WindowPrediction::new(vec![1.5; 100]))
        .is_err());
    assert!(stitcher.push(7, tagged(&plan, 0)).is_err());

    stitcher.push(0, tagged(&plan, 0)).unwrap();
    let err = stitcher.push(0, tagged(&plan, 0)).unwrap_err();
    assert!(err.message.contains("duplicate"));
}

#[test]
fn test_missing_window_fails_finish() {
    let plan = WindowPlan::new(150, 100, 50).unwrap();
    let mut stitcher = ProbabilityStitcher::new(plan);
    stitcher.push(0, tagged(&plan, 0)).unwrap();
    stitcher.push(2, tagged(&plan, 2)).unwrap();

    match stitcher.finish() {
        Err(SceneCutError::Classifier(err)) => assert_eq!(err.window_index, Some(1)),
        other => panic!("expected classifier error, got {:?}", other),
    }
}

proptest! {
    #[test]
    fn prop_each_frame_appears_once_in_order(
        frame_count in 1usize..300,
        stride in 1usize..40,
        extra in 0usize..40,
        seed in any::<u64>(),
    ) {
        let plan = WindowPlan::new(frame_count, stride + extra, stride).unwrap();
        let mut order: Vec<usize> = (0..plan.window_count).collect();
        // Deterministic shuffle
        let mut state = seed | 1;
        for i in (1..order.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            order.swap(i, (state % (i as u64 + 1)) as usize);
        }

        let mut stitcher = ProbabilityStitcher::new(plan);
        for w in order {
            stitcher.push(w, tagged(&plan, w)).unwrap();
        }
        prop_assert_eq!(stitcher.finish().unwrap().single_frame, expected(frame_count));
    }
}
