use bson::Bson;
use snakebite::query::{CmpOp, Filter, GeoPoint};
use snakebite::translate::{
    QueryDefaults, QueryParams, TranslateError, Window, collect_params, translate,
};

fn params(pairs: &[(&str, &str)]) -> QueryParams {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

fn clauses(f: &Filter) -> Vec<Filter> {
    match f {
        Filter::True => vec![],
        Filter::And(fs) => fs.clone(),
        other => vec![other.clone()],
    }
}

#[test]
fn empty_query_is_first_page_of_everything() {
    let q = translate(&QueryParams::new(), &QueryDefaults::default()).unwrap();
    assert_eq!(q.filter, Filter::True);
    assert_eq!(q.window, Window { start: 0, end: 20 });
}

#[test]
fn window_uses_start_and_limit() {
    let q = translate(&params(&[("start", "5"), ("limit", "10")]), &QueryDefaults::default()).unwrap();
    assert_eq!(q.window, Window { start: 5, end: 15 });
    assert_eq!(q.window.limit(), 10);

    let defaults = QueryDefaults { default_limit: 3, ..QueryDefaults::default() };
    let q = translate(&params(&[("start", "2")]), &defaults).unwrap();
    assert_eq!(q.window, Window { start: 2, end: 5 });
}

#[test]
fn non_numeric_pagination_is_bad_request() {
    for (k, v) in [("start", "abc"), ("limit", "ten"), ("limit", "-1"), ("start", "1.5")] {
        let err = translate(&params(&[(k, v)]), &QueryDefaults::default()).unwrap_err();
        assert!(matches!(err, TranslateError::InvalidArguments(_)), "{k}={v}");
        assert_eq!(err.title(), "Invalid Value");
        assert!(err.description().starts_with("Invalid arguments in URL query:\n"));
    }
    let huge = usize::MAX.to_string();
    let err = translate(&params(&[("start", &huge), ("limit", "1")]), &QueryDefaults::default());
    assert!(err.is_err());
}

#[test]
fn name_becomes_case_insensitive_contains() {
    let q = translate(&params(&[("name", "foo")]), &QueryDefaults::default()).unwrap();
    assert_eq!(q.filter, Filter::Contains { path: "name".into(), needle: "foo".into() });

    let q = translate(
        &params(&[("description", "Spicy"), ("menus.name", "ramen")]),
        &QueryDefaults::default(),
    )
    .unwrap();
    let cs = clauses(&q.filter);
    assert!(cs.contains(&Filter::Contains { path: "description".into(), needle: "Spicy".into() }));
    assert!(cs.contains(&Filter::Contains { path: "menus.name".into(), needle: "ramen".into() }));
}

#[test]
fn tags_pass_through_as_membership() {
    let q = translate(&params(&[("tags", "chicken"), ("menus.tags", "spicy")]), &QueryDefaults::default())
        .unwrap();
    let cs = clauses(&q.filter);
    assert!(cs.contains(&Filter::Cmp {
        path: "tags".into(),
        op: CmpOp::Eq,
        value: Bson::String("chicken".into())
    }));
    assert!(cs.contains(&Filter::Cmp {
        path: "menus.tags".into(),
        op: CmpOp::Eq,
        value: Bson::String("spicy".into())
    }));
}

#[test]
fn geolocation_builds_proximity_clause() {
    let q = translate(
        &params(&[("geolocation", "35.0,139.0"), ("maxDistance", "500")]),
        &QueryDefaults::default(),
    )
    .unwrap();
    assert_eq!(
        q.filter,
        Filter::Near {
            path: "geolocation".into(),
            point: GeoPoint::new(35.0, 139.0),
            max_distance: 500.0
        }
    );

    let q = translate(&params(&[("geolocation", "139.7,35.6")]), &QueryDefaults::default()).unwrap();
    assert!(matches!(q.filter, Filter::Near { max_distance, .. } if max_distance == 1000.0));
}

#[test]
fn malformed_geolocation_is_bad_request() {
    for raw in ["abc", "35.0", "35.0,north", ""] {
        let err = translate(&params(&[("geolocation", raw)]), &QueryDefaults::default()).unwrap_err();
        assert_eq!(err, TranslateError::InvalidGeolocation(raw.to_string()));
        assert_eq!(err.description(), format!("geolocation supplied is invalid: {raw}"));
    }
    let err = translate(
        &params(&[("geolocation", "35.0,139.0"), ("maxDistance", "far")]),
        &QueryDefaults::default(),
    )
    .unwrap_err();
    assert!(matches!(err, TranslateError::InvalidArguments(_)));
    assert!(err.description().contains("maxDistance: invalid literal 'far'"));
    assert!(!err.description().contains("geolocation"));

    let err = translate(&params(&[("maxDistance", "10")]), &QueryDefaults::default()).unwrap_err();
    assert!(matches!(err, TranslateError::InvalidArguments(_)));
}

#[test]
fn price_range_bounds_menu_price() {
    let q = translate(&params(&[("price", "10-20")]), &QueryDefaults::default()).unwrap();
    assert_eq!(
        clauses(&q.filter),
        vec![
            Filter::Cmp { path: "menus.price".into(), op: CmpOp::Gte, value: Bson::Double(10.0) },
            Filter::Cmp { path: "menus.price".into(), op: CmpOp::Lte, value: Bson::Double(20.0) },
        ]
    );

    let q = translate(&params(&[("price", "15-")]), &QueryDefaults::default()).unwrap();
    assert_eq!(
        q.filter,
        Filter::Cmp { path: "menus.price".into(), op: CmpOp::Gte, value: Bson::Double(15.0) }
    );

    let err = translate(&params(&[("price", "20-10")]), &QueryDefaults::default()).unwrap_err();
    assert!(matches!(err, TranslateError::InvalidPriceRange(_)));
}

#[test]
fn unknown_parameter_is_rejected() {
    let err = translate(&params(&[("colour", "red")]), &QueryDefaults::default()).unwrap_err();
    assert_eq!(err, TranslateError::UnknownParameter("colour".into()));
}

#[test]
fn input_is_left_untouched() {
    let p = params(&[("name", "foo"), ("start", "1"), ("price", "1-2")]);
    let before = p.clone();
    translate(&p, &QueryDefaults::default()).unwrap();
    assert_eq!(p, before);
}

#[test]
fn comma_separated_tags_match_any_value() {
    let q = translate(&params(&[("tags", "ramen, sushi")]), &QueryDefaults::default()).unwrap();
    assert_eq!(
        q.filter,
        Filter::In {
            path: "tags".into(),
            values: vec![Bson::String("ramen".into()), Bson::String("sushi".into())]
        }
    );

    let q = translate(&params(&[("menus.tags", "spicy,")]), &QueryDefaults::default()).unwrap();
    assert_eq!(
        q.filter,
        Filter::Cmp { path: "menus.tags".into(), op: CmpOp::Eq, value: Bson::String("spicy".into()) }
    );

    let err = translate(&params(&[("tags", " , ")]), &QueryDefaults::default()).unwrap_err();
    assert!(matches!(err, TranslateError::InvalidArguments(_)));
}

#[test]
fn repeated_keys_are_refused() {
    let pairs = vec![("tags".to_string(), "ramen".to_string()), ("tags".to_string(), "sushi".to_string())];
    assert_eq!(collect_params(pairs), Err(TranslateError::RepeatedParameter("tags".into())));

    let pairs = vec![("tags".to_string(), "ramen".to_string()), ("start".to_string(), "1".to_string())];
    let p = collect_params(pairs).unwrap();
    assert_eq!(p.get("tags").map(String::as_str), Some("ramen"));
    assert_eq!(p.len(), 2);
}

#[test]
fn exponent_prices_are_accepted() {
    let q = translate(&params(&[("price", "1e-3-5")]), &QueryDefaults::default()).unwrap();
    assert_eq!(
        clauses(&q.filter),
        vec![
            Filter::Cmp { path: "menus.price".into(), op: CmpOp::Gte, value: Bson::Double(0.001) },
            Filter::Cmp { path: "menus.price".into(), op: CmpOp::Lte, value: Bson::Double(5.0) },
        ]
    );
}
