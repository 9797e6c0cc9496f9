use super::*;

#[test]
fn three_stops_hit_each_keyframe() {
    let v = [2.0, 10.0, 4.0];
    assert_eq!(interpolate(&v, 0.0), Some(2.0));
    assert_eq!(interpolate(&v, 0.5), Some(10.0));
    assert_eq!(interpolate(&v, 1.0), Some(4.0));
}

#[test]
fn values_stay_between_adjacent_stops() {
    let v = [0.0, 1.0, -1.0];
    let mut prev = interpolate(&v, 0.0).unwrap_or_default();
    for i in 1..=50 {
        let x = interpolate(&v, i as f64 / 100.0).unwrap_or_default();
        assert!((0.0..=1.0).contains(&x));
        assert!(x >= prev);
        prev = x;
    }
    for i in 51..=100 {
        let x = interpolate(&v, i as f64 / 100.0).unwrap_or_default();
        assert!((-1.0..=1.0).contains(&x));
        assert!(x <= prev);
        prev = x;
    }
}

#[test]
fn degenerate_tracks() {
    assert_eq!(interpolate(&[], 0.5), None);
    assert_eq!(interpolate(&[7.0], 0.0), Some(7.0));
    assert_eq!(interpolate(&[7.0], 1.0), Some(7.0));
}

#[test]
fn progress_outside_unit_interval_is_clamped() {
    let v = [1.0, 3.0];
    assert_eq!(interpolate(&v, -0.5), Some(1.0));
    assert_eq!(interpolate(&v, 1.3), Some(3.0));
}

#[test]
fn bracket_reports_segment_and_local_progress() {
    assert_eq!(bracket(5, 0.0), Some((0, 0.0)));
    assert_eq!(bracket(5, 1.0), Some((3, 1.0)));
    let (idx, local) = bracket(5, 0.6).unwrap_or((usize::MAX, 0.0));
    assert_eq!(idx, 2);
    assert!((local - 0.4).abs() < 1e-9);
}
