use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A small alphabet that includes 0x00 so that keys equal under zero
    // padding ("a" vs "a\0") show up often.
    prop::collection::vec(prop::sample::select(vec![0u8, b'a', b'b', 0x80, 0xFF]), 0..=6)
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 5)]
    Insert(#[proptest(strategy = "key_strategy()")] Vec<u8>, u64),
    #[proptest(weight = 3)]
    Remove(#[proptest(strategy = "key_strategy()")] Vec<u8>),
    #[proptest(weight = 2)]
    Get(#[proptest(strategy = "key_strategy()")] Vec<u8>),
}

fn apply_ops(ops: Vec<Op>) -> (PatriciaTrie, BTreeMap<Vec<u8>, u64>) {
    let mut t = PatriciaTrie::new();
    let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
    for op in ops {
        match op {
            Op::Insert(key, value) => {
                let inserted = t.insert(&key, value).is_ok();
                let expected = !m.contains_key(&key);
                assert_eq!(inserted, expected, "insert {key:?}");
                m.entry(key).or_insert(value);
            }
            Op::Remove(key) => {
                let got = t.remove(&key).ok();
                assert_eq!(got, m.remove(&key), "remove {key:?}");
            }
            Op::Get(key) => {
                assert_eq!(t.get(&key), m.get(&key).copied(), "get {key:?}");
            }
        }
        assert_eq!(t.len(), m.len());
    }
    (t, m)
}

fn entries(t: &PatriciaTrie) -> Vec<(Vec<u8>, u64)> {
    t.iter().map(|(k, v)| (k.to_vec(), v)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in prop::collection::vec(any::<Op>(), 0..=500)) {
        let (t, m) = apply_ops(ops);
        t.assert_invariants();
        let expected: Vec<(Vec<u8>, u64)> = m.into_iter().collect();
        prop_assert_eq!(entries(&t), expected);
    }

    #[test]
    fn prop_persistence_round_trip(ops in prop::collection::vec(any::<Op>(), 0..=200)) {
        let (t, m) = apply_ops(ops);
        let mut bytes = Vec::new();
        codec::encode(&t, &mut bytes).unwrap();
        let loaded = codec::decode(bytes.as_slice()).unwrap();
        loaded.assert_invariants();
        prop_assert_eq!(entries(&loaded), entries(&t));
        for key in m.keys() {
            prop_assert_eq!(loaded.get(key), t.get(key));
        }
    }

    #[test]
    fn prop_truncated_file_rejected(
        ops in prop::collection::vec(any::<Op>(), 1..=50),
        cut in any::<prop::sample::Index>(),
    ) {
        let (t, _) = apply_ops(ops);
        let mut bytes = Vec::new();
        codec::encode(&t, &mut bytes).unwrap();
        let cut = cut.index(bytes.len());
        let is_corrupt = matches!(
            codec::decode(&bytes[..cut]),
            Err(DictError::CorruptFormat(_))
        );
        prop_assert!(is_corrupt);
    }

    #[test]
    fn prop_duplicate_insert_changes_nothing(
        keys in prop::collection::btree_set(key_strategy(), 1..=40),
        pick in any::<prop::sample::Index>(),
        value in any::<u64>(),
    ) {
        let keys: Vec<Vec<u8>> = keys.into_iter().collect();
        let mut t = PatriciaTrie::new();
        for (i, k) in keys.iter().enumerate() {
            t.insert(k, i as u64).unwrap();
        }
        let before = entries(&t);
        let dup = &keys[pick.index(keys.len())];
        prop_assert!(matches!(t.insert(dup, value), Err(DictError::DuplicateKey)));
        prop_assert_eq!(entries(&t), before);
        t.assert_invariants();
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

fn small_set() -> Vec<Vec<u8>> {
    vec![
        b"".to_vec(),
        b"a".to_vec(),
        b"a\0".to_vec(),
        b"b".to_vec(),
        b"ab".to_vec(),
        b"ba".to_vec(),
    ]
}

#[test]
fn exhaustive_insert_order_small_set() {
    for_each_permutation(&small_set(), |perm| {
        let mut t = PatriciaTrie::new();
        let mut m: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for (i, k) in perm.into_iter().enumerate() {
            let v = i as u64;
            t.insert(&k, v).unwrap();
            m.insert(k, v);
            t.assert_invariants();
        }

        let expected: Vec<(Vec<u8>, u64)> = m.into_iter().collect();
        assert_eq!(entries(&t), expected);
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = small_set();

    // Insert in a fixed order, then remove in all permutations.
    let mut base_trie = PatriciaTrie::new();
    let mut base_map: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
    for (i, k) in keys.iter().enumerate() {
        let v = i as u64;
        base_trie.insert(k, v).unwrap();
        base_map.insert(k.clone(), v);
    }

    for_each_permutation(&keys, |perm| {
        let mut t = base_trie.clone();
        let mut m = base_map.clone();

        for k in perm {
            assert_eq!(t.remove(&k).ok(), m.remove(&k));
            assert_eq!(t.len(), m.len());
            t.assert_invariants();
            for (key, value) in &m {
                assert_eq!(t.get(key), Some(*value));
            }
        }
        assert!(t.is_empty());
        assert!(t.root.is_none());
    });
}

#[test]
fn cat_car_dog_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenario.dict");

    let mut t = PatriciaTrie::new();
    t.insert(b"cat", 1).unwrap();
    t.insert(b"car", 2).unwrap();
    t.insert(b"dog", 3).unwrap();
    assert_eq!(t.get(b"cat"), Some(1));
    assert_eq!(t.get(b"cow"), None);
    assert_eq!(t.remove(b"car").unwrap(), 2);
    assert_eq!(t.get(b"car"), None);
    assert_eq!(t.get(b"cat"), Some(1));

    t.save(&path).unwrap();
    let loaded = PatriciaTrie::open(&path).unwrap();
    assert_eq!(loaded.get(b"dog"), Some(3));
    assert_eq!(loaded.get(b"cat"), Some(1));
    assert_eq!(loaded.get(b"car"), None);
}
