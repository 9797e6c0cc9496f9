use super::*;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn parses_six_and_eight_digit_hex() {
    let c = Rgba::parse("#ff0000").unwrap();
    assert_eq!(c, Rgba::rgba(1.0, 0.0, 0.0, 1.0));

    // The trailing byte is an opacity byte, not an inverted transparency byte.
    let c = Rgba::parse("#00000080").unwrap();
    assert!(close(c.a, 128.0 / 255.0));
    let c = Rgba::parse("#FFFFFF00").unwrap();
    assert!(c.is_transparent());
}

#[test]
fn parses_short_hex() {
    assert_eq!(Rgba::parse("#fff").unwrap(), Rgba::WHITE);
    let c = Rgba::parse("#0f08").unwrap();
    assert!(close(c.g, 1.0));
    assert!(close(c.a, 136.0 / 255.0));
}

#[test]
fn parses_rgba_function_with_commas_and_spaces() {
    let c = Rgba::parse("rgba(255,255,255,0.7)").unwrap();
    assert_eq!(c.to_rgba8(), [255, 255, 255, 179]);

    let c = Rgba::parse("rgba(0, 0, 0, 0.5)").unwrap();
    assert!(close(c.a, 0.5));

    let c = Rgba::parse("rgb(10 20 30 / 50%)").unwrap();
    assert_eq!(c.to_rgba8(), [10, 20, 30, 128]);
}

#[test]
fn parses_hsl_and_names() {
    let c = Rgba::parse("hsl(0, 100%, 50%)").unwrap();
    assert!(close(c.r, 1.0) && close(c.g, 0.0) && close(c.b, 0.0));
    assert_eq!(Rgba::parse("transparent").unwrap(), Rgba::TRANSPARENT);
    assert_eq!(Rgba::parse("Yellow").unwrap(), Rgba::YELLOW);
}

#[test]
fn malformed_colors_fall_back_to_the_default() {
    assert!(Rgba::parse("#12345").is_err());
    assert!(Rgba::parse("rgba(1,2)").is_err());
    assert!(Rgba::parse("not-a-color").is_err());
    assert_eq!(Rgba::parse_or("#zzzzzz", Rgba::WHITE), Rgba::WHITE);
    assert_eq!(Rgba::parse_opt_or(None, Rgba::BLACK), Rgba::BLACK);
}

#[test]
fn lerp_blends_every_channel() {
    let c = Rgba::BLACK.lerp(Rgba::rgba(1.0, 1.0, 1.0, 0.0), 0.5);
    assert!(close(c.r, 0.5) && close(c.a, 0.5));
    assert!(close(Rgba::WHITE.fade(0.25).a, 0.25));
}
