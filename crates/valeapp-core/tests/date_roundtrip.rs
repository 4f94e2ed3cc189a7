use proptest::prelude::*;
use valeapp_core::dates::{decode_serial, format_for_display, to_iso, INVALID_DATE_DISPLAY};

proptest! {
    #[test]
    fn serial_survives_iso_and_display(serial in 40_001_i64..50_000) {
        let iso = to_iso(&serial.to_string()).expect("in-range serial decodes");
        let decoded = decode_serial(serial).expect("representable");
        prop_assert_eq!(&iso, &decoded.format("%Y-%m-%d").to_string());

        let display = format_for_display(&iso);
        prop_assert_ne!(display.as_str(), INVALID_DATE_DISPLAY);
        let (day, rest) = display.split_once('/').expect("day separator");
        let (month, year) = rest.split_once('/').expect("month separator");
        let rebuilt = format!("{year}-{month}-{day}");
        prop_assert_eq!(rebuilt, iso);
    }

    #[test]
    fn malformed_slash_strings_keep_their_serial(serial in 40_001_i64..50_000, d in 1_u8..31, m in 1_u8..12) {
        let text = format!("{d:02}/{m:02}/{serial}");
        prop_assert_eq!(to_iso(&text), to_iso(&serial.to_string()));
    }
}

#[test]
fn documented_examples_hold() {
    assert_eq!(valeapp_core::dates::extract_serial("01/01/45917"), Some(45917));
    assert_eq!(valeapp_core::dates::extract_serial("99999999"), None);
    assert_eq!(format_for_display("garbage"), INVALID_DATE_DISPLAY);
}
