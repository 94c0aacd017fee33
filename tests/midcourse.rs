use lunar_trajectory_planner::core::state::TrajectoryState;
use lunar_trajectory_planner::core::vector;
use lunar_trajectory_planner::transfer::{MidcourseConfig, MidcourseScheduler};

fn cruise_state() -> TrajectoryState {
    TrajectoryState::new([150_000.0, 80_000.0, 10_000.0], [-0.4, 1.1, 0.05], 100_000.0)
}

fn scheduler() -> MidcourseScheduler {
    MidcourseScheduler::new(MidcourseConfig::default()).expect("scheduler")
}

#[test]
fn half_kilometre_miss_needs_no_correction() {
    let s = scheduler();
    let center = [380_000.0, 40_000.0, 0.0];
    let predicted = [380_000.0, 40_000.5, 0.0];
    let dv = s.calculate_miss_distance_correction(&cruise_state(), &center, &predicted);
    assert_eq!(dv, vector::ZERO);
}

#[test]
fn large_miss_is_opposed_and_capped() {
    let s = scheduler();
    let center = [380_000.0, 40_000.0, 0.0];
    let predicted = [380_000.0, 140_000.0, 0.0];
    let dv = s.calculate_miss_distance_correction(&cruise_state(), &center, &predicted);
    assert!((vector::norm(&dv) - 0.1).abs() < 1e-12, "{dv:?}");
    assert!(dv[1] < 0.0);
    assert!(dv[0].abs() < 1e-12 && dv[2].abs() < 1e-12);
}

#[test]
fn small_miss_scales_with_time_to_go() {
    let s = scheduler();
    let state = cruise_state();
    let center = [380_000.0, 40_000.0, 0.0];
    let predicted = [380_000.0, 40_000.0, 20.0];
    let dv = s.calculate_miss_distance_correction(&state, &center, &predicted);
    let range = vector::norm(&vector::sub(&predicted, &state.position_km));
    let expected = 20.0 * state.speed_km_s() / range;
    assert!((vector::norm(&dv) - expected).abs() < 1e-12);
    assert!(dv[2] < 0.0);
}

#[test]
fn corrective_burn_is_zero_after_target_time() {
    let s = scheduler();
    let state = cruise_state();
    let dv = s.calculate_corrective_burn(&state, &[380_000.0, 0.0, 0.0], 90_000.0, 100_000.0);
    assert_eq!(dv, vector::ZERO);
    let dv = s.calculate_corrective_burn(&state, &[380_000.0, 0.0, 0.0], 100_000.0, 100_000.0);
    assert_eq!(dv, vector::ZERO);
}

#[test]
fn corrective_burn_matches_straight_line_rate() {
    let s = scheduler();
    let state = cruise_state();
    let target = [250_000.0, 180_000.0, 10_000.0];
    let dv = s.calculate_corrective_burn(&state, &target, 200_000.0, 100_000.0);
    let corrected = vector::add(&state.velocity_km_s, &dv);
    assert!((corrected[0] - 1.0).abs() < 1e-12);
    assert!((corrected[1] - 1.0).abs() < 1e-12);
    assert!(corrected[2].abs() < 1e-12);
}

#[test]
fn each_burn_executes_exactly_once() {
    let mut s = scheduler();
    s.schedule_burn(500.0, [0.002, 0.0, 0.0], 10.0, "TCM-2").unwrap();
    s.schedule_burn(100.0, [0.0, 0.001, 0.0], 5.0, "TCM-1").unwrap();
    s.schedule_burn(900.0, [0.0, 0.0, 0.003], 5.0, "TCM-3").unwrap();

    let start = TrajectoryState::new([7_000.0, 0.0, 0.0], [0.0, 7.5, 0.0], 0.0);
    let once = s.check_and_execute_burns(600.0, &start);
    assert_eq!(s.executed().len(), 2);
    assert_eq!(s.scheduled().len(), 1);
    assert_eq!(once.position_km, start.position_km);
    assert!((once.velocity_km_s[0] - 0.002).abs() < 1e-15);
    assert!((once.velocity_km_s[1] - 7.501).abs() < 1e-12);

    let twice = s.check_and_execute_burns(600.0, &once);
    assert_eq!(twice, once);
    assert_eq!(s.executed().len(), 2);

    let names: Vec<&str> = s
        .executed()
        .iter()
        .map(|e| e.burn.description.as_str())
        .collect();
    assert_eq!(names, ["TCM-1", "TCM-2"]);
}

#[test]
fn burn_exactly_at_current_time_is_due() {
    let mut s = scheduler();
    s.schedule_burn(250.0, [0.0, 0.0, 0.01], 0.0, "TCM").unwrap();
    let state = TrajectoryState::new([7_000.0, 0.0, 0.0], [0.0, 7.5, 0.0], 0.0);
    let out = s.check_and_execute_burns(250.0, &state);
    assert_eq!(out.velocity_km_s[2], 0.01);
    assert!(s.scheduled().is_empty());
}
