//! Load, battery and cleanup checks shared by every real backend.

use paperbench::harness::probe_ids;
use paperbench::{BenchConfig, BenchmarkRunner, Cleanup, Loader, Operation, Store};

use super::{corpus_file, CORPUS};

/// Configuration pointing at `corpus`, with small battery sizes.
pub fn config_for(corpus: &tempfile::NamedTempFile) -> BenchConfig {
    BenchConfig::default()
        .with_data_file(corpus.path())
        .with_record_limit(0)
        .with_read_iterations(3)
        .with_bulk_size(5)
        .with_sample_paper("a", "Pavel Exner")
        .with_sample_category("hep-th")
        .with_search_term("galaxy")
}

/// Run the whole load / benchmark / cleanup cycle against `store`.
pub fn run_full_cycle(store: &mut dyn Store) {
    let corpus = corpus_file(CORPUS);
    let config = config_for(&corpus);

    // Load
    let summary = Loader::new(&config).load(store).unwrap();
    assert_eq!(summary.records, 3);
    assert_eq!(store.count_papers().unwrap(), 3);

    let sample = store.fetch_paper("a").unwrap().unwrap();
    assert_eq!(sample.title.as_deref(), Some("Alpha"));
    assert_eq!(sample.submitter.as_deref(), Some("Pavel Exner"));

    // Category membership is by whole tag
    assert_eq!(store.papers_in_category("hep-th", 100).unwrap(), vec!["a"]);
    assert_eq!(store.papers_in_category("math-ph", 100).unwrap(), vec!["a"]);
    assert!(store.papers_in_category("hep", 100).unwrap().is_empty());

    // Bulk probes
    let probes = probe_ids(5);
    store.create_probes(&probes).unwrap();
    assert_eq!(store.count_probes("bench-").unwrap(), 5);
    assert_eq!(store.delete_probes(&probes).unwrap(), 5);
    assert_eq!(store.count_probes("bench-").unwrap(), 0);
    assert_eq!(store.count_papers().unwrap(), 3);

    // Updating an unknown id creates nothing
    store.set_submitter("missing", "Nobody").unwrap();
    assert!(store.fetch_paper("missing").unwrap().is_none());
    assert_eq!(store.count_papers().unwrap(), 3);

    // Battery
    let results = BenchmarkRunner::new(&config).run(store).unwrap();
    let supported: Vec<_> = Operation::BATTERY
        .into_iter()
        .filter(|op| store.supports(*op))
        .collect();
    assert_eq!(results.len(), supported.len());
    for (result, op) in results.iter().zip(&supported) {
        assert_eq!(result.operation, op.label(store.kind()));
        assert_eq!(result.records_processed, op.records_processed(&config));
    }
    assert_eq!(store.count_papers().unwrap(), 3);
    assert_eq!(store.count_probes("bench-").unwrap(), 0);
    let sample = store.fetch_paper("a").unwrap().unwrap();
    assert_eq!(sample.submitter.as_deref(), Some("benchmark_runner"));

    // Cleanup restores the sample and is idempotent
    let cleanup = Cleanup::new(&config);
    assert_eq!(cleanup.run(store).unwrap(), 0);
    assert_eq!(cleanup.run(store).unwrap(), 0);
    let sample = store.fetch_paper("a").unwrap().unwrap();
    assert_eq!(sample.submitter.as_deref(), Some("Pavel Exner"));
    assert_eq!(store.count_papers().unwrap(), 3);

    // Cleanup also removes probes left behind by an aborted run
    store.create_probes(&probe_ids(2)).unwrap();
    assert_eq!(cleanup.run(store).unwrap(), 2);
    assert_eq!(store.count_probes("bench-").unwrap(), 0);

    // Reload replaces everything
    Loader::new(&config).load(store).unwrap();
    assert_eq!(store.count_papers().unwrap(), 3);
}
