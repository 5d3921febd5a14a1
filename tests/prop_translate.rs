use proptest::prelude::*;
use snakebite::translate::{QueryDefaults, QueryParams, Window, parse_price_range, translate};

proptest! {
    #[test]
    fn prop_window_is_start_plus_limit(start in 0usize..1_000_000, limit in 0usize..10_000) {
        let mut p = QueryParams::new();
        p.insert("start".into(), start.to_string());
        p.insert("limit".into(), limit.to_string());
        let q = translate(&p, &QueryDefaults::default()).unwrap();
        prop_assert_eq!(q.window, Window { start, end: start + limit });
    }

    #[test]
    fn prop_ordered_price_bounds_parse(a in 0u32..100_000, b in 0u32..100_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let parsed = parse_price_range(&format!("{lo}-{hi}")).unwrap();
        prop_assert_eq!(parsed, (Some(f64::from(lo)), Some(f64::from(hi))));
        if lo < hi {
            let reversed = format!("{hi},{lo}");
            prop_assert!(parse_price_range(&reversed).is_err());
        }
    }

    #[test]
    fn prop_arbitrary_values_never_panic(key in "[a-zA-Z.]{1,12}", value in ".{0,24}") {
        let mut p = QueryParams::new();
        p.insert(key, value);
        let _ = translate(&p, &QueryDefaults::default());
    }
}
