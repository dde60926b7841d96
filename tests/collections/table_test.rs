/*!
 * Indexed Table Tests
 * Lookup, overwrite, duplicate handling, overlay/overlap, iteration
 */

use arena_collections::{Arena, CompressPolicy, Table};
use pretty_assertions::assert_eq;

fn arena() -> Arena {
    Arena::new(16 * 1024).unwrap()
}

#[test]
fn test_set_then_get() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.set("Host", "example.com").unwrap();
    assert_eq!(t.get("Host"), Some("example.com"));
    assert_eq!(t.get("hOST"), Some("example.com"));
    assert_eq!(t.get("Missing"), None);
}

#[test]
fn test_set_twice_keeps_single_entry() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.set("Accept", "text/plain").unwrap();
    t.set("accept", "text/html").unwrap();
    assert_eq!(t.get("Accept"), Some("text/html"));
    assert_eq!(t.len(), 1);
}

#[test]
fn test_set_collapses_added_duplicates() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.add("Via", "a").unwrap();
    t.add("Via", "b").unwrap();
    t.add("Via", "c").unwrap();
    t.add("Other", "x").unwrap();
    t.set("Via", "final").unwrap();

    assert_eq!(t.len(), 2);
    assert_eq!(t.get("Via"), Some("final"));
    assert_eq!(t.get("Other"), Some("x"));
}

#[test]
fn test_add_permits_duplicates_get_returns_first() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.add("Set-Cookie", "V1").unwrap();
    t.add("Set-Cookie", "V2").unwrap();
    assert_eq!(t.len(), 2);
    assert_eq!(t.get("Set-Cookie"), Some("V1"));
    assert_eq!(
        t.get_merged(&arena, "set-cookie").unwrap(),
        Some("V1,V2")
    );
}

#[test]
fn test_get_merged_single_and_missing() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.set("K", "only").unwrap();
    assert_eq!(t.get_merged(&arena, "K").unwrap(), Some("only"));
    assert_eq!(t.get_merged(&arena, "Nope").unwrap(), None);
}

#[test]
fn test_unset_removes_all_duplicates() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.add("Warning", "1").unwrap();
    t.set("Date", "today").unwrap();
    t.add("Warning", "2").unwrap();
    t.add("warning", "3").unwrap();

    t.unset("WARNING");
    assert_eq!(t.get("Warning"), None);
    assert_eq!(t.get("Date"), Some("today"));
    assert_eq!(t.len(), 1);
}

#[test]
fn test_unset_missing_key_is_noop() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.set("A", "1").unwrap();
    t.unset("Zzz");
    assert_eq!(t.len(), 1);
}

#[test]
fn test_unset_same_bucket_neighbor_survives() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    // Same first byte, so same bucket: the range scan must compare keys.
    t.set("alpha", "1").unwrap();
    t.set("apple", "2").unwrap();
    t.unset("alpha");
    assert_eq!(t.get("alpha"), None);
    assert_eq!(t.get("apple"), Some("2"));
}

#[test]
fn test_merge_appends_to_existing_value() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.set("Cache-Control", "no-cache").unwrap();
    t.merge("cache-control", "no-store").unwrap();
    assert_eq!(t.get("Cache-Control"), Some("no-cache, no-store"));
    assert_eq!(t.len(), 1);
}

#[test]
fn test_merge_missing_key_adds() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.merge("Vary", "accept").unwrap();
    assert_eq!(t.get("Vary"), Some("accept"));
}

#[test]
fn test_ref_variants_borrow_without_copying() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.set_ref("Connection", "keep-alive").unwrap();
    t.add_ref("Connection", "upgrade").unwrap();
    t.merge_ref("Pragma", "no-cache").unwrap();
    assert_eq!(t.get("Connection"), Some("keep-alive"));
    assert_eq!(
        t.get_merged(&arena, "Connection").unwrap(),
        Some("keep-alive,upgrade")
    );
    assert_eq!(t.get("Pragma"), Some("no-cache"));
}

#[test]
fn test_compress_merge_policy() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.add("A", "1").unwrap();
    t.add("B", "x").unwrap();
    t.add("a", "2").unwrap();

    t.compress(CompressPolicy::Merge).unwrap();
    assert_eq!(t.len(), 2);
    assert_eq!(t.get("A"), Some("1, 2"));
    assert_eq!(t.get("B"), Some("x"));

    let order: Vec<(&str, &str)> = t.entries().collect();
    assert_eq!(order, vec![("A", "1, 2"), ("B", "x")]);
}

#[test]
fn test_compress_overwrite_policy() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.add("A", "1").unwrap();
    t.add("B", "x").unwrap();
    t.add("A", "2").unwrap();

    t.compress(CompressPolicy::Overwrite).unwrap();
    assert_eq!(t.len(), 2);
    assert_eq!(t.get("A"), Some("2"));
    assert_eq!(t.get("B"), Some("x"));
}

#[test]
fn test_compress_small_table_is_noop() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.set("A", "1").unwrap();
    t.compress(CompressPolicy::Merge).unwrap();
    assert_eq!(t.get("A"), Some("1"));
    assert_eq!(t.len(), 1);
}

#[test]
fn test_overlay_prefers_overlay_entries() {
    let arena = arena();
    let mut base = Table::with_capacity(&arena, 4).unwrap();
    base.set("Shared", "base").unwrap();
    base.set("BaseOnly", "b").unwrap();
    let mut over = Table::with_capacity(&arena, 4).unwrap();
    over.set("Shared", "overlay").unwrap();
    over.set("OverOnly", "o").unwrap();

    let res = Table::overlay_in(&arena, &over, &base).unwrap();
    assert_eq!(res.get("Shared"), Some("overlay"));
    assert_eq!(res.get("BaseOnly"), Some("b"));
    assert_eq!(res.get("OverOnly"), Some("o"));
    assert_eq!(res.len(), 4);
}

#[test]
fn test_overlap_concatenates_then_compresses() {
    let arena = arena();
    let mut a = Table::with_capacity(&arena, 4).unwrap();
    a.set("K", "from-a").unwrap();
    a.set("A-Only", "1").unwrap();
    let mut b = Table::with_capacity(&arena, 4).unwrap();
    b.set("k", "from-b").unwrap();
    b.set("B-Only", "2").unwrap();

    a.overlap(&b, CompressPolicy::Merge).unwrap();
    assert_eq!(a.get("K"), Some("from-a, from-b"));
    assert_eq!(a.get("A-Only"), Some("1"));
    assert_eq!(a.get("B-Only"), Some("2"));
    assert_eq!(a.len(), 3);
}

#[test]
fn test_overlap_into_empty_copies_index() {
    let arena = arena();
    let mut a = Table::with_capacity(&arena, 4).unwrap();
    let mut b = Table::with_capacity(&arena, 4).unwrap();
    b.set("X", "1").unwrap();
    b.set("Y", "2").unwrap();

    a.overlap(&b, CompressPolicy::Overwrite).unwrap();
    assert_eq!(a.get("X"), Some("1"));
    assert_eq!(a.get("Y"), Some("2"));
}

#[test]
fn test_copy_preserves_duplicates() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.add("D", "1").unwrap();
    t.add("D", "2").unwrap();

    let copy = Table::copy_in(&arena, &t).unwrap();
    assert_eq!(copy.len(), 2);
    assert_eq!(copy.get_merged(&arena, "D").unwrap(), Some("1,2"));

    let rebuilt = Table::clone_in(&arena, &t).unwrap();
    assert_eq!(rebuilt.len(), 2);
    assert_eq!(rebuilt.get("D"), Some("1"));
}

#[test]
fn test_clear_forgets_entries() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.set("A", "1").unwrap();
    t.clear();
    assert!(t.is_empty());
    assert_eq!(t.get("A"), None);
}

#[test]
fn test_iterate_full_scan_stops_on_false() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.add("a", "1").unwrap();
    t.add("b", "2").unwrap();
    t.add("c", "3").unwrap();

    let mut visited = Vec::new();
    let rv = t.iterate(&[], |k, v| {
        visited.push((k, v));
        v != "2"
    });
    assert!(!rv);
    assert_eq!(visited, vec![("a", "1"), ("b", "2")]);
}

#[test]
fn test_iterate_keyed_scans_match_only() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.add("Accept", "text/html").unwrap();
    t.add("Host", "example.com").unwrap();
    t.add("accept", "text/plain").unwrap();

    let mut visited = Vec::new();
    let rv = t.iterate(&["ACCEPT"], |k, v| {
        visited.push((k, v));
        true
    });
    assert!(rv);
    assert_eq!(
        visited,
        vec![("Accept", "text/html"), ("accept", "text/plain")]
    );
}

#[test]
fn test_iterate_early_stop_only_ends_that_keys_scan() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 4).unwrap();
    t.add("k1", "a").unwrap();
    t.add("k1", "b").unwrap();
    t.add("k2", "c").unwrap();

    // Stopping k1's scan after its first entry must not prevent k2's scan
    // from running. Long-standing behavior, preserved deliberately.
    let mut visited = Vec::new();
    let rv = t.iterate(&["k1", "k2"], |k, v| {
        visited.push((k, v));
        !k.eq_ignore_ascii_case("k1")
    });
    assert!(!rv);
    assert_eq!(visited, vec![("k1", "a"), ("k2", "c")]);
}

#[test]
fn test_entries_insertion_order() {
    let arena = arena();
    let mut t = Table::with_capacity(&arena, 2).unwrap();
    t.add("one", "1").unwrap();
    t.add("two", "2").unwrap();
    t.add("three", "3").unwrap();

    let keys: Vec<&str> = t.entries().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["one", "two", "three"]);
}

#[test]
fn test_growth_across_bucket_ranges() {
    // Push enough same-bucket and cross-bucket keys to force several
    // reallocations of the entry array, then verify every lookup.
    let arena = Arena::new(64 * 1024).unwrap();
    let mut t = Table::with_capacity(&arena, 1).unwrap();
    let keys: Vec<String> = (0..40).map(|i| format!("key-{i}")).collect();
    for (i, k) in keys.iter().enumerate() {
        t.set(k, &i.to_string()).unwrap();
    }
    assert_eq!(t.len(), 40);
    for (i, k) in keys.iter().enumerate() {
        assert_eq!(t.get(k), Some(i.to_string().as_str()));
    }
}
