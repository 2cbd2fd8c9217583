use proptest::prelude::*;
use trawler_scanner::canon::{Scope, canonicalize};
use url::Url;

fn raw_url(upper_host: bool, segments: &[String], params: &[(String, String)]) -> String {
    let host = if upper_host { "Example.TEST" } else { "example.test" };
    let mut raw = format!("http://{}/{}", host, segments.join("/"));
    if !params.is_empty() {
        let query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        raw.push('?');
        raw.push_str(&query.join("&"));
    }
    raw.push_str("#frag");
    raw
}

proptest! {
    #[test]
    fn canonical_form_is_a_fixed_point(
        upper_host in any::<bool>(),
        segments in prop::collection::vec("[a-zA-Z0-9_-]{1,10}", 0..5),
        params in prop::collection::vec(("[a-z]{1,6}", "[a-zA-Z0-9]{0,6}"), 0..4),
    ) {
        let first = canonicalize(&raw_url(upper_host, &segments, &params), None).unwrap();
        let second = canonicalize(&first.canonical, None).unwrap();

        prop_assert_eq!(&first.canonical, &second.canonical);
        prop_assert_eq!(first.hash, second.hash);
        prop_assert_eq!(&first.pattern_key, &second.pattern_key);
        prop_assert!(!first.canonical.contains('#'));
        prop_assert!(first.canonical.starts_with("http://example.test/"));
    }

    #[test]
    fn parameter_order_does_not_change_identity(
        params in prop::collection::vec(("[a-z]{1,6}", "[a-z0-9]{1,6}"), 1..5),
    ) {
        let mut reversed = params.clone();
        reversed.reverse();
        let a = canonicalize(&raw_url(false, &["p".to_string()], &params), None).unwrap();
        let b = canonicalize(&raw_url(false, &["p".to_string()], &reversed), None).unwrap();
        prop_assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn same_origin_urls_are_always_in_scope(
        segments in prop::collection::vec("[a-z0-9]{1,8}", 0..4),
    ) {
        let seed = canonicalize("http://example.test/", None).unwrap();
        let scope = Scope::new(&seed, false);
        let record = canonicalize(&raw_url(true, &segments, &[]), None).unwrap();
        prop_assert!(scope.contains(&record));
    }

    #[test]
    fn absolute_canonical_form_ignores_base(
        segments in prop::collection::vec("[a-z0-9]{1,8}", 0..4),
        base_path in "[a-z]{1,8}",
        base_host in "[a-z]{3,8}",
    ) {
        let first = canonicalize(&raw_url(false, &segments, &[]), None).unwrap();
        let base = Url::parse(&format!("https://{}.test/{}/", base_host, base_path)).unwrap();
        let again = canonicalize(&first.canonical, Some(&base)).unwrap();
        prop_assert_eq!(&first.canonical, &again.canonical);
    }
}
