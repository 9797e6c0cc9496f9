use super::*;

#[test]
fn mul_div255_rounds_to_nearest() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(0, 255), 0);
    assert_eq!(mul_div255_u8(128, 255), 128);
    assert_eq!(mul_div255_u8(255, 128), 128);
}

#[test]
fn fnv_is_stable() {
    let mut a = Fnv1a64::new_default();
    a.write_bytes(b"hello");
    let mut b = Fnv1a64::new_default();
    b.write_bytes(b"hello");
    assert_eq!(a.finish(), b.finish());

    let mut c = Fnv1a64::new_default();
    c.write_bytes(b"hellp");
    assert_ne!(a.finish(), c.finish());
}

#[test]
fn parse_leading_f64_reads_unit_suffixed_values() {
    assert_eq!(parse_leading_f64("12deg"), Some(12.0));
    assert_eq!(parse_leading_f64("-12deg"), Some(-12.0));
    assert_eq!(parse_leading_f64("0.2em"), Some(0.2));
    assert_eq!(parse_leading_f64(" 20px"), Some(20.0));
    assert_eq!(parse_leading_f64(".5"), Some(0.5));
    assert_eq!(parse_leading_f64("1e2x"), Some(100.0));
    assert_eq!(parse_leading_f64("3em"), Some(3.0));
    assert_eq!(parse_leading_f64("blur(8px)"), None);
    assert_eq!(parse_leading_f64(""), None);
    assert_eq!(parse_leading_f64("-"), None);
}

#[test]
fn clamp01_handles_nan() {
    assert_eq!(clamp01(f64::NAN), 0.0);
    assert_eq!(clamp01(1.5), 1.0);
    assert_eq!(clamp01(-0.5), 0.0);
    assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
}
