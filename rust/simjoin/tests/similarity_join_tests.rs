use std::{collections::HashSet, sync::Arc};

use simjoin::{
    EditDistanceFeaturizer, EditDistanceParams, JoinStrategy, Record, SetMeasure,
    SetSimilarityFeaturizer, SetSimilarityParams, SimilarityFeaturizer, SimilarityJoin,
    rank::TokenRanks,
    weights::document_frequencies,
};
use simjoin_testkit::{data_gen, fixtures};
use simjoin_workflow::{Dataset, ExecutionContext, ExecutionParams};

const ROLE_COMBINATIONS: [(bool, bool); 4] = [(true, true), (false, true), (true, false), (false, false)];

fn parallel_context() -> Arc<ExecutionContext> {
    ExecutionContext::new(ExecutionParams {
        max_degree: Some(4),
        partitions_count: Some(5),
        broadcast_memory_limit: None,
    })
    .unwrap()
}

fn text_records(docs: &[String]) -> Vec<Record> {
    docs.iter()
        .enumerate()
        .map(|(i, doc)| Record::new().with("id", i.to_string()).with("text", doc.as_str()))
        .collect()
}

fn set_join(measure: SetMeasure, threshold: f64, weighted: bool, min_size: usize) -> SimilarityJoin {
    let params = SetSimilarityParams {
        min_size: Some(min_size),
        ..SetSimilarityParams::new(measure, threshold)
            .with_cols(["text"])
            .weighted(weighted)
    };
    SimilarityJoin::new(SetSimilarityFeaturizer::new(params).unwrap())
}

fn run(
    join: &SimilarityJoin,
    strategy: JoinStrategy,
    a: &Dataset<Record>,
    b: &Dataset<Record>,
    smaller_a: bool,
    containment: bool,
) -> Vec<(Record, Record)> {
    let mut pairs = join
        .clone()
        .with_strategy(strategy)
        .join(a, b, smaller_a, containment)
        .unwrap()
        .into_pairs();
    pairs.sort();
    pairs
}

fn id(record: &Record) -> &str {
    record.get("id").unwrap()
}

#[test]
fn test_prefix_filter_matches_naive() {
    let ctx = parallel_context();
    for seed in [11u64, 29] {
        let vocab = data_gen::vocabulary(60, seed);
        let base = data_gen::documents(40, &vocab, 1..8, seed + 1);
        let a = ctx.parallelize(text_records(&base));
        let b = ctx.parallelize(text_records(&data_gen::with_duplicates(
            &data_gen::documents(30, &vocab, 1..8, seed + 2),
            &vocab,
            0.5,
            seed + 3,
        )));

        for (measure, threshold) in [
            (SetMeasure::Jaccard, 0.5),
            (SetMeasure::Jaccard, 0.8),
            (SetMeasure::Dice, 0.6),
            (SetMeasure::Cosine, 0.55),
            (SetMeasure::Overlap, 2.0),
        ] {
            for weighted in [false, true] {
                let min_size = if weighted { 2 } else { 1 };
                let join = set_join(measure, threshold, weighted, min_size);
                for (smaller_a, containment) in ROLE_COMBINATIONS {
                    let naive = run(&join, JoinStrategy::Naive, &a, &b, smaller_a, containment);
                    let prefix =
                        run(&join, JoinStrategy::PrefixFilter, &a, &b, smaller_a, containment);
                    assert_eq!(
                        naive, prefix,
                        "seed={seed} {measure:?} t={threshold} weighted={weighted} \
                         smaller_a={smaller_a} containment={containment}"
                    );
                }

                // Self-join.
                let naive = run(&join, JoinStrategy::Naive, &a, &a, true, true);
                let prefix = run(&join, JoinStrategy::PrefixFilter, &a, &a, true, true);
                assert_eq!(naive, prefix, "self-join seed={seed} {measure:?} weighted={weighted}");
            }
        }
    }
}

fn titled_records(titles: &[String], texts: &[String]) -> Vec<Record> {
    titles
        .iter()
        .zip(texts)
        .enumerate()
        .map(|(i, (title, text))| {
            Record::new()
                .with("id", i.to_string())
                .with("title", title.as_str())
                .with("text", text.as_str())
        })
        .collect()
}

#[test]
fn test_prefix_filter_matches_naive_across_columns() {
    let ctx = parallel_context();
    let vocab = data_gen::vocabulary(40, 51);
    let titles = data_gen::documents(35, &vocab, 1..6, 52);
    let texts = data_gen::near_duplicates(&titles, &vocab, 0.3, 53);
    let a = ctx.parallelize(titled_records(&titles, &texts));
    let b_titles = data_gen::documents(25, &vocab, 1..6, 54);
    let b_texts = data_gen::near_duplicates(&titles[..25], &vocab, 0.3, 55);
    let b = ctx.parallelize(titled_records(&b_titles, &b_texts));

    for (measure, threshold) in [
        (SetMeasure::Jaccard, 0.5),
        (SetMeasure::Dice, 0.6),
        (SetMeasure::Cosine, 0.5),
        (SetMeasure::Overlap, 2.0),
    ] {
        for weighted in [false, true] {
            let params = SetSimilarityParams::new(measure, threshold)
                .with_cols(["title"])
                .with_secondary_cols(["text"])
                .weighted(weighted);
            let join = SimilarityJoin::new(SetSimilarityFeaturizer::new(params).unwrap());
            for (smaller_a, containment) in ROLE_COMBINATIONS {
                let naive = run(&join, JoinStrategy::Naive, &a, &b, smaller_a, containment);
                let prefix = run(&join, JoinStrategy::PrefixFilter, &a, &b, smaller_a, containment);
                assert_eq!(
                    naive, prefix,
                    "{measure:?} weighted={weighted} smaller_a={smaller_a} containment={containment}"
                );

                // The same collection read through different columns is two collections.
                let naive = run(&join, JoinStrategy::Naive, &a, &a, smaller_a, containment);
                let prefix = run(&join, JoinStrategy::PrefixFilter, &a, &a, smaller_a, containment);
                assert_eq!(naive, prefix, "{measure:?} weighted={weighted} a-a");
            }
        }
    }
}

#[test]
fn test_asymmetric_columns_are_not_a_self_join() {
    let ctx = parallel_context();
    let a = ctx.parallelize(titled_records(
        &["red apple".to_string(), "blue sky".to_string()],
        &["red apple".to_string(), "green grass".to_string()],
    ));
    let params = SetSimilarityParams::new(SetMeasure::Jaccard, 0.9)
        .with_cols(["title"])
        .with_secondary_cols(["text"]);
    let join = SimilarityJoin::new(SetSimilarityFeaturizer::new(params).unwrap());

    for strategy in [JoinStrategy::Naive, JoinStrategy::PrefixFilter] {
        let pairs = join
            .clone()
            .with_strategy(strategy)
            .join(&a, &a, true, true)
            .unwrap();
        assert!(!pairs.stats().self_join, "{strategy:?}");
        let matched = pairs.iter().map(|(l, r)| (id(l), id(r))).collect::<Vec<_>>();
        assert_eq!(matched, vec![("0", "0")], "{strategy:?}");
    }
}

#[test]
fn test_prefix_filter_prunes_candidates() {
    let ctx = parallel_context();
    let vocab = data_gen::vocabulary(200, 3);
    let docs = data_gen::with_duplicates(&data_gen::documents(150, &vocab, 4..10, 4), &vocab, 0.3, 5);
    let a = ctx.parallelize(text_records(&docs));

    let join = set_join(SetMeasure::Jaccard, 0.8, false, 1);
    let naive = join.clone().with_strategy(JoinStrategy::Naive).join(&a, &a, true, true).unwrap();
    let prefix = join.join(&a, &a, true, true).unwrap();

    let n = docs.len() as u64;
    assert_eq!(naive.stats().candidates, n * (n - 1) / 2);
    assert_eq!(prefix.stats().strategy, JoinStrategy::PrefixFilter);
    assert!(prefix.stats().self_join);
    assert!(prefix.stats().candidates < naive.stats().candidates / 2);
    assert!(prefix.stats().published_bytes > 0);
    assert_eq!(prefix.stats().scanned, n);
    assert_eq!(prefix.len(), naive.len());
    assert!(!prefix.is_empty());
}

#[test]
fn test_self_join_reports_each_pair_once() {
    let ctx = parallel_context();
    let vocab = data_gen::vocabulary(40, 8);
    let docs = data_gen::with_duplicates(&data_gen::documents(60, &vocab, 2..6, 9), &vocab, 0.5, 10);
    let records = ctx.parallelize(text_records(&docs));

    for strategy in [JoinStrategy::Naive, JoinStrategy::PrefixFilter] {
        let join = set_join(SetMeasure::Jaccard, 0.6, false, 1);
        let pairs = run(&join, strategy, &records, &records, true, true);
        assert!(!pairs.is_empty());

        let mut seen = HashSet::new();
        for (left, right) in &pairs {
            assert_ne!(id(left), id(right), "{strategy:?}");
            let key = if id(left) < id(right) {
                (id(left), id(right))
            } else {
                (id(right), id(left))
            };
            assert!(seen.insert(key), "{strategy:?} reported {key:?} twice");
        }

        // Every similar unordered pair is reported.
        let featurizer = join.featurizer();
        let weights = simjoin::TokenWeights::unweighted();
        let all = records.collect();
        let expected = (0..all.len())
            .flat_map(|i| (0..i).map(move |j| (i, j)))
            .filter(|&(i, j)| featurizer.featurize(&all[i], &all[j], &weights) == 1.0)
            .count();
        assert_eq!(pairs.len(), expected, "{strategy:?}");
    }
}

#[test]
fn test_distinct_handles_are_not_a_self_join() {
    let ctx = parallel_context();
    let docs = vec!["red apple".to_string(), "green apple".to_string()];
    let a = ctx.parallelize(text_records(&docs));
    let b = ctx.parallelize(text_records(&docs));

    let join = set_join(SetMeasure::Jaccard, 0.3, false, 1);
    for strategy in [JoinStrategy::Naive, JoinStrategy::PrefixFilter] {
        // Same content, different collections: every record meets its twin and the
        // other record, in both orientations.
        let pairs = run(&join, strategy, &a, &b, true, true);
        assert_eq!(pairs.len(), 4, "{strategy:?}");
        let pairs = run(&join, strategy, &a, &a.clone(), true, true);
        assert_eq!(pairs.len(), 1, "{strategy:?}");
        // Without containment the same handle is joined in full.
        let pairs = run(&join, strategy, &a, &a, true, false);
        assert_eq!(pairs.len(), 4, "{strategy:?}");
    }
}

#[test]
fn test_weight_corpus_selection() {
    let ctx = parallel_context();
    let a = ctx.parallelize(text_records(&["x y".to_string()]));
    let b = ctx.parallelize(text_records(&[
        "x y".to_string(),
        "y z".to_string(),
        "z".to_string(),
    ]));
    let join = set_join(SetMeasure::Jaccard, 0.5, true, 1);

    let pairs = join.join(&a, &b, true, true).unwrap();
    assert_eq!(pairs.stats().corpus_size, 3);
    assert_eq!(pairs.stats().distinct_tokens, 3);
    assert_eq!(pairs.stats().small_records, 1);
    assert_eq!(pairs.stats().large_records, 3);

    let pairs = join.join(&a, &b, false, true).unwrap();
    assert_eq!(pairs.stats().corpus_size, 1);
    assert_eq!(pairs.stats().distinct_tokens, 2);

    let pairs = join.join(&a, &b, true, false).unwrap();
    assert_eq!(pairs.stats().corpus_size, 4);
}

#[test]
fn test_containment_weights_ignore_indexed_side() {
    let ctx = parallel_context();
    let b = ctx.parallelize(text_records(&[
        "x y".to_string(),
        "y z".to_string(),
        "z".to_string(),
    ]));
    let narrow = ctx.parallelize(text_records(&["x y".to_string()]));
    let wide = ctx.parallelize(text_records(&[
        "x y".to_string(),
        "q r s t".to_string(),
        "x x y q".to_string(),
    ]));
    let join = set_join(SetMeasure::Jaccard, 0.5, true, 1);

    let narrow_pairs = join.join(&narrow, &b, true, true).unwrap();
    let wide_pairs = join.join(&wide, &b, true, true).unwrap();
    assert_eq!(narrow_pairs.stats().corpus_size, 3);
    assert_eq!(wide_pairs.stats().corpus_size, 3);
    assert_eq!(narrow_pairs.stats().distinct_tokens, 3);
    assert_eq!(wide_pairs.stats().distinct_tokens, 3);

    for a in [&narrow, &wide] {
        let naive = run(&join, JoinStrategy::Naive, a, &b, true, true);
        let prefix = run(&join, JoinStrategy::PrefixFilter, a, &b, true, true);
        assert_eq!(naive, prefix);
    }

    // The record shared by both collections is scored with the same weights.
    let shared = |pairs: &[(Record, Record)]| {
        pairs
            .iter()
            .filter(|(_, indexed)| indexed.get("text") == Some("x y"))
            .map(|(scanned, _)| scanned.get("text").unwrap().to_string())
            .collect::<Vec<_>>()
    };
    let narrow_pairs = run(&join, JoinStrategy::Auto, &narrow, &b, true, true);
    let wide_pairs = run(&join, JoinStrategy::Auto, &wide, &b, true, true);
    assert_eq!(shared(&narrow_pairs), vec!["x y".to_string()]);
    assert_eq!(shared(&narrow_pairs), shared(&wide_pairs));
}

#[test]
fn test_threshold_monotonicity() {
    let ctx = parallel_context();
    let vocab = data_gen::vocabulary(50, 21);
    let a = ctx.parallelize(text_records(&data_gen::documents(40, &vocab, 2..7, 22)));
    let b = ctx.parallelize(text_records(&data_gen::documents(40, &vocab, 2..7, 23)));

    for (measure, thresholds) in [
        (SetMeasure::Jaccard, vec![0.2, 0.4, 0.6, 0.9]),
        (SetMeasure::Dice, vec![0.3, 0.5, 0.7]),
        (SetMeasure::Cosine, vec![0.3, 0.5, 0.7]),
        (SetMeasure::Overlap, vec![1.0, 2.0, 3.0]),
    ] {
        let results = thresholds
            .iter()
            .map(|&threshold| {
                let join = set_join(measure, threshold, false, 1);
                run(&join, JoinStrategy::Auto, &a, &b, true, false)
                    .into_iter()
                    .collect::<HashSet<_>>()
            })
            .collect::<Vec<_>>();
        for pair in results.windows(2) {
            assert!(pair[1].is_subset(&pair[0]), "{measure:?}");
        }
        assert!(results[0].len() > results[results.len() - 1].len(), "{measure:?}");
    }
}

#[test]
fn test_rank_consistency() {
    let ctx = parallel_context();
    let vocab = data_gen::vocabulary(80, 31);
    let docs = data_gen::documents(200, &vocab, 1..10, 32)
        .into_iter()
        .map(|doc| {
            (
                doc.split_whitespace().map(str::to_string).collect::<Vec<_>>(),
                Record::new(),
            )
        })
        .collect::<Vec<_>>();
    let frequencies = document_frequencies(&ctx.parallelize(docs));
    let ranks = TokenRanks::from_frequencies(&frequencies);
    assert_eq!(ranks.len(), frequencies.len());

    let mut by_rank = frequencies.iter().collect::<Vec<_>>();
    by_rank.sort_by_key(|(token, _)| ranks.rank(token));
    for pair in by_rank.windows(2) {
        let ((t1, df1), (t2, df2)) = (pair[0], pair[1]);
        assert!(df1 < df2 || (df1 == df2 && t1 < t2), "{t1}:{df1} {t2}:{df2}");
    }
    let ranks_again = TokenRanks::from_frequencies(&frequencies);
    assert!(frequencies.keys().all(|t| ranks.rank(t) == ranks_again.rank(t)));
}

#[test]
fn test_jaccard_scenario() {
    let ctx = parallel_context();
    let a = ctx.parallelize(vec![Record::new().with("text", "a b c")]);
    let b = ctx.parallelize(vec![Record::new().with("text", "a b d")]);

    for strategy in [JoinStrategy::Naive, JoinStrategy::PrefixFilter] {
        for (smaller_a, containment) in ROLE_COMBINATIONS {
            let matched = run(&set_join(SetMeasure::Jaccard, 0.5, false, 1), strategy, &a, &b, smaller_a, containment);
            assert_eq!(matched.len(), 1, "{strategy:?}");
            let unmatched = run(&set_join(SetMeasure::Jaccard, 0.6, false, 1), strategy, &a, &b, smaller_a, containment);
            assert!(unmatched.is_empty(), "{strategy:?}");
        }
    }

    // Scanned record first: B is scanned when A is indexed.
    let pairs = run(&set_join(SetMeasure::Jaccard, 0.5, false, 1), JoinStrategy::Auto, &a, &b, true, true);
    assert_eq!(pairs[0].0.get("text"), Some("a b d"));
    assert_eq!(pairs[0].1.get("text"), Some("a b c"));
}

#[test]
fn test_empty_side_yields_no_pairs() {
    let ctx = parallel_context();
    let a = ctx.parallelize(text_records(&["a".to_string(), "b".to_string(), "c".to_string()]));
    let b = ctx.parallelize(Vec::new());
    let join = set_join(SetMeasure::Jaccard, 0.1, true, 1);
    for strategy in [JoinStrategy::Naive, JoinStrategy::PrefixFilter] {
        for (smaller_a, containment) in ROLE_COMBINATIONS {
            assert!(run(&join, strategy, &a, &b, smaller_a, containment).is_empty());
        }
    }
}

#[test]
fn test_unreachable_threshold_self_join() {
    let ctx = parallel_context();
    let docs = ["alpha beta", "gamma delta", "epsilon", "zeta eta theta"]
        .map(str::to_string);
    let records = ctx.parallelize(text_records(&docs));
    let join = set_join(SetMeasure::Overlap, 100.0, false, 1);
    for strategy in [JoinStrategy::Naive, JoinStrategy::PrefixFilter] {
        let pairs = join
            .clone()
            .with_strategy(strategy)
            .join(&records, &records, true, true)
            .unwrap();
        assert!(pairs.is_empty());
        assert!(pairs.stats().self_join);
    }
}

#[test]
fn test_configuration_errors() {
    let ctx = parallel_context();
    let records = ctx.parallelize(text_records(&["a b".to_string()]));

    let missing_threshold = SetSimilarityParams::default().with_cols(["text"]);
    let join = SimilarityJoin::new(SetSimilarityFeaturizer::new(missing_threshold).unwrap());
    let err = join.join(&records, &records, true, true).unwrap_err();
    assert!(err.is_config_error(), "{err}");

    let missing_min_size = SetSimilarityParams {
        min_size: None,
        ..SetSimilarityParams::new(SetMeasure::Dice, 0.5)
    };
    let join = SimilarityJoin::new(SetSimilarityFeaturizer::new(missing_min_size).unwrap());
    assert!(join.join(&records, &records, true, true).unwrap_err().is_config_error());

    let edit = SimilarityJoin::new(EditDistanceFeaturizer::new(EditDistanceParams::new(0.8)))
        .with_strategy(JoinStrategy::PrefixFilter);
    assert!(edit.join(&records, &records, true, true).unwrap_err().is_config_error());
}

#[test]
fn test_broadcast_budget_exhausted() {
    let ctx = ExecutionContext::new(ExecutionParams {
        max_degree: Some(2),
        partitions_count: Some(2),
        broadcast_memory_limit: Some(256),
    })
    .unwrap();
    let vocab = data_gen::vocabulary(30, 41);
    let a = ctx.parallelize(text_records(&data_gen::documents(50, &vocab, 3..6, 42)));
    let b = ctx.parallelize(text_records(&data_gen::documents(50, &vocab, 3..6, 43)));

    let join = set_join(SetMeasure::Jaccard, 0.5, false, 1);
    let err = join.join(&a, &b, true, true).unwrap_err();
    assert!(err.is_resource_exhausted(), "{err}");
    assert_eq!(ctx.budget().remaining(), 256);

    // Nothing is published by the all-pairs join.
    let pairs = join
        .with_strategy(JoinStrategy::Naive)
        .join(&a, &b, true, true)
        .unwrap();
    assert_eq!(pairs.stats().published_bytes, 0);
}

#[test]
fn test_edit_distance_falls_back_to_naive() {
    let ctx = parallel_context();
    let people = |names: &[&str]| {
        ctx.parallelize(
            names
                .iter()
                .map(|name| Record::new().with("name", *name))
                .collect(),
        )
    };
    let a = people(&["Jonathan Smith", "Maria Garcia", "Wei Chen"]);
    let b = people(&["Jonathon Smith", "Mario Garcia", "Anna Kowalski", "wei chen"]);

    let join = SimilarityJoin::new(EditDistanceFeaturizer::new(
        EditDistanceParams::new(0.9).with_cols(["name"]),
    ));
    let pairs = join.join(&a, &b, true, true).unwrap();
    assert_eq!(pairs.stats().strategy, JoinStrategy::Naive);
    assert_eq!(pairs.stats().candidates, 12);

    let mut matched = pairs
        .iter()
        .map(|(scanned, indexed)| (scanned.get("name").unwrap(), indexed.get("name").unwrap()))
        .collect::<Vec<_>>();
    matched.sort();
    assert_eq!(
        matched,
        vec![
            ("Jonathon Smith", "Jonathan Smith"),
            ("Mario Garcia", "Maria Garcia"),
            ("wei chen", "Wei Chen"),
        ]
    );
}

#[test]
fn test_company_fixture_self_join() {
    let companies: Vec<Record> =
        fixtures::load_json(fixtures::fixtures_dir().join("companies.json")).unwrap();
    assert_eq!(companies.len(), 6);

    let ctx = parallel_context();
    let records = ctx.parallelize(companies);
    let params = SetSimilarityParams::new(SetMeasure::Jaccard, 0.5).with_cols(["name", "city"]);
    let join = SimilarityJoin::new(SetSimilarityFeaturizer::new(params).unwrap());

    let pairs = join.join(&records, &records, true, true).unwrap();
    let mut matched = pairs
        .iter()
        .map(|(l, r)| {
            let (l, r) = (id(l), id(r));
            if l < r { (l, r) } else { (r, l) }
        })
        .collect::<Vec<_>>();
    matched.sort();
    assert_eq!(matched, vec![("1", "2"), ("3", "4")]);
}

#[test]
fn test_listing_fixture_against_companies() {
    let companies: Vec<Record> =
        fixtures::load_json(fixtures::fixtures_dir().join("companies.json")).unwrap();
    let listings: Vec<Record> =
        fixtures::load_json_lines(fixtures::fixtures_dir().join("listings.jsonl")).unwrap();
    assert_eq!(listings.len(), 4);

    let ctx = parallel_context();
    let a = ctx.parallelize(companies);
    let b = ctx.parallelize(listings);
    let params = SetSimilarityParams::new(SetMeasure::Jaccard, 0.5)
        .with_cols(["name", "city"])
        .with_secondary_cols(["company", "location"]);
    let join = SimilarityJoin::new(SetSimilarityFeaturizer::new(params).unwrap());

    for strategy in [JoinStrategy::Naive, JoinStrategy::PrefixFilter] {
        for (smaller_a, containment) in ROLE_COMBINATIONS {
            let mut matched = run(&join, strategy, &a, &b, smaller_a, containment)
                .iter()
                .map(|(l, r)| {
                    let (l, r) = (id(l).to_string(), id(r).to_string());
                    if l.starts_with('L') { (l, r) } else { (r, l) }
                })
                .collect::<Vec<_>>();
            matched.sort();
            assert_eq!(
                matched,
                [("L1", "1"), ("L2", "6"), ("L4", "3"), ("L4", "4")]
                    .map(|(l, r)| (l.to_string(), r.to_string())),
                "{strategy:?} smaller_a={smaller_a} containment={containment}"
            );
        }
    }
}
