//! Unit tests for size and age formatting

use mailcull::services::format::{
    age_days, format_age_days, format_kilo, format_mega, format_size, percent,
};

#[test]
fn test_format_kilo_ranges() {
    assert_eq!(format_kilo(0), "     0");
    assert_eq!(format_kilo(999), "   999");
    assert_eq!(format_kilo(1500), "1.50K");
    assert_eq!(format_kilo(160_000), "  160K");
}

#[test]
fn test_format_mega_truncates() {
    assert_eq!(format_mega(0), "    0M");
    assert_eq!(format_mega(2_999_999), "    2M");
}

#[test]
fn test_format_size_picks_unit() {
    assert_eq!(format_size(500_000), "  500K");
    assert_eq!(format_size(12_000_000), "   12M");
    assert_eq!(format_size(2_500_000_000), "2.50G");
}

#[test]
fn test_age_in_whole_days() {
    let now = 1_700_000_000;
    assert_eq!(age_days(now, now), 0);
    assert_eq!(age_days(now, now - 86_399), 0);
    assert_eq!(age_days(now, now - 21 * 86_400), 21);
    assert_eq!(format_age_days(now, now - 3 * 86_400), " 3d");
}

#[test]
fn test_percent_handles_empty_totals() {
    assert!((percent(0, 0) - 0.0).abs() < f64::EPSILON);
    assert!((percent(25, 200) - 12.5).abs() < 1e-9);
}
