//! End-to-end scenarios against the in-memory reference engine.

use xyston::{
    AnalysisConfig, DocumentSource, IndexKind, IndexState, SearchOptions, SearchStore,
    StoreConfig, XystonError, normalize_ranks,
};

fn default_store() -> SearchStore {
    SearchStore::open_in_memory(AnalysisConfig::default(), StoreConfig::default()).unwrap()
}

#[test]
fn shared_term_search_returns_exactly_the_sharing_documents() {
    let store = default_store();
    store
        .add_document("doc:a", DocumentSource::text("apple pie with apple filling"))
        .unwrap();
    store
        .add_document("doc:b", DocumentSource::text("apple orchard"))
        .unwrap();
    store
        .add_document("doc:c", DocumentSource::text("pear cider"))
        .unwrap();

    store
        .prepare_search("apple", &SearchOptions::default())
        .unwrap();
    let batch = store.fetch_results(true).unwrap();

    assert!(!batch.more);
    let uris: Vec<&str> = batch.hits.iter().map(|hit| hit.uri.as_str()).collect();
    // Two occurrences outrank one; doc:c does not appear at all.
    assert_eq!(uris, vec!["doc:a", "doc:b"]);

    let raw: Vec<f32> = batch.hits.iter().map(|hit| hit.score).collect();
    let normalized = normalize_ranks(&raw);
    assert_eq!(normalized.iter().copied().fold(f32::MIN, f32::max), 1.0);
    assert_eq!(normalized.len(), raw.len());
}

#[test]
fn removed_document_is_absent_from_non_empty_listing() {
    let store = default_store();
    store
        .add_document("doc:a", DocumentSource::text("ephemeral content"))
        .unwrap();
    store.remove_document("doc:a").unwrap();

    let uris = store.all_documents(true).unwrap();
    assert!(!uris.contains(&"doc:a".to_string()));

    // The same holds once the removal has been flushed.
    store.save().unwrap();
    let uris = store.all_documents(true).unwrap();
    assert!(!uris.contains(&"doc:a".to_string()));
}

#[test]
fn fetch_count_bound_caps_each_batch_not_the_search() {
    let config = StoreConfig {
        fetch_count: 1,
        ..StoreConfig::default()
    };
    let store = SearchStore::open_in_memory(AnalysisConfig::default(), config).unwrap();
    for uri in ["doc:a", "doc:b", "doc:c"] {
        store
            .add_document(uri, DocumentSource::text("bounded fetches"))
            .unwrap();
    }

    store
        .prepare_search("bounded", &SearchOptions::default())
        .unwrap();

    for _ in 0..3 {
        let batch = store.fetch_results(false).unwrap();
        assert_eq!(batch.hits.len(), 1);
        assert!(batch.more);
    }

    let batch = store.fetch_results(false).unwrap();
    assert!(batch.hits.is_empty());
    assert!(!batch.more);
    assert!(!store.is_searching());
}

#[test]
fn zero_tolerance_always_compacts() {
    let store = default_store();
    assert!(store.compact(0.0).unwrap());

    store
        .add_document("doc:a", DocumentSource::text("some content"))
        .unwrap();
    store.save().unwrap();
    assert!(store.compact(0.0).unwrap());
}

#[test]
fn full_tolerance_skips_compaction_on_a_fresh_store() {
    let store = default_store();
    assert!(!store.compact(1.0).unwrap());
}

#[test]
fn cancellation_is_idempotent_and_stateless_when_idle() {
    let store = default_store();

    // No active session: twice in a row changes nothing observable.
    store.cancel_search();
    store.cancel_search();
    assert!(!store.is_searching());

    store
        .add_document("doc:a", DocumentSource::text("cancel me"))
        .unwrap();
    store
        .prepare_search("cancel", &SearchOptions::default())
        .unwrap();
    store.cancel_search();
    store.cancel_search();

    let batch = store.fetch_results(true).unwrap();
    assert!(batch.hits.is_empty());
    assert!(!batch.more);
}

#[test]
fn term_queries_flow_through_the_registry() {
    let store = default_store();
    store
        .add_document("doc:a", DocumentSource::text("apple banana apple"))
        .unwrap();
    store
        .add_document("doc:b", DocumentSource::text("banana"))
        .unwrap();

    let registry = store.registry();
    assert_eq!(registry.all_terms().unwrap(), vec!["apple", "banana"]);
    assert_eq!(
        registry.documents_for_term("banana").unwrap(),
        vec!["doc:a", "doc:b"]
    );
    assert_eq!(registry.document_count_for_term("apple").unwrap(), 1);
    assert_eq!(registry.term_count_for_document("doc:a").unwrap(), 2);
    assert_eq!(registry.frequency_of_term("apple", "doc:a").unwrap(), 2);

    // Unknown terms and URIs are empty results, not errors.
    assert!(registry.documents_for_term("missing").unwrap().is_empty());
    assert_eq!(registry.term_count_for_document("doc:missing").unwrap(), 0);
}

#[test]
fn term_queries_without_bidirectional_indexing_are_unsupported() {
    let analysis = AnalysisConfig {
        index_kind: IndexKind::Inverted,
        ..AnalysisConfig::default()
    };
    let store = SearchStore::open_in_memory(analysis, StoreConfig::default()).unwrap();

    assert!(matches!(
        store.registry().all_terms(),
        Err(XystonError::Unsupported(_))
    ));
    assert!(matches!(
        store.registry().frequency_of_term("apple", "doc:a"),
        Err(XystonError::Unsupported(_))
    ));
}

#[test]
fn numeric_terms_are_suppressed_from_listings_when_configured() {
    let config = StoreConfig {
        ignore_numeric_terms: true,
        ..StoreConfig::default()
    };
    let store = SearchStore::open_in_memory(AnalysisConfig::default(), config).unwrap();
    store
        .add_document("doc:a", DocumentSource::text("released in 1984 by acme"))
        .unwrap();

    let terms = store.registry().all_terms().unwrap();
    assert!(!terms.contains(&"1984".to_string()));
    assert!(terms.contains(&"acme".to_string()));

    // Numeric terms are still indexed and searchable.
    store
        .prepare_search("1984", &SearchOptions::default())
        .unwrap();
    let batch = store.fetch_results(true).unwrap();
    assert_eq!(batch.hits.len(), 1);
}

#[test]
fn pending_states_resolve_at_save_boundaries() {
    let store = default_store();
    store
        .add_document("doc:a", DocumentSource::text("boundary content"))
        .unwrap();
    assert_eq!(
        store.document_state("doc:a").unwrap(),
        IndexState::PendingAdd
    );

    store.save().unwrap();
    assert_eq!(store.document_state("doc:a").unwrap(), IndexState::Indexed);

    store.remove_document("doc:a").unwrap();
    assert_eq!(
        store.document_state("doc:a").unwrap(),
        IndexState::PendingDelete
    );

    store.save().unwrap();
    assert_eq!(
        store.document_state("doc:a").unwrap(),
        IndexState::NotIndexed
    );
}

#[test]
fn path_store_reports_creation_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.xyston");

    let store =
        SearchStore::open_path(&path, AnalysisConfig::default(), StoreConfig::default()).unwrap();
    assert!(store.did_create_store());
    store
        .add_document("doc:a", DocumentSource::text("durable content"))
        .unwrap();
    store.save().unwrap();
    store.close().unwrap();

    let reopened =
        SearchStore::open_path(&path, AnalysisConfig::default(), StoreConfig::default()).unwrap();
    assert!(!reopened.did_create_store());
    assert_eq!(
        reopened.document_state("doc:a").unwrap(),
        IndexState::Indexed
    );

    // A corrupted snapshot is indistinguishable from a missing one: the
    // caller sees a fresh store and the created flag, and can rebuild.
    std::fs::write(&path, b"not a snapshot").unwrap();
    let rebuilt =
        SearchStore::open_path(&path, AnalysisConfig::default(), StoreConfig::default()).unwrap();
    assert!(rebuilt.did_create_store());
}

#[test]
fn close_without_save_discards_pending_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.xyston");

    let store =
        SearchStore::open_path(&path, AnalysisConfig::default(), StoreConfig::default()).unwrap();
    store
        .add_document("doc:a", DocumentSource::text("kept"))
        .unwrap();
    store.save().unwrap();
    store
        .add_document("doc:b", DocumentSource::text("discarded"))
        .unwrap();
    store.close().unwrap();

    let reopened =
        SearchStore::open_path(&path, AnalysisConfig::default(), StoreConfig::default()).unwrap();
    assert_eq!(
        reopened.document_state("doc:a").unwrap(),
        IndexState::Indexed
    );
    assert_eq!(
        reopened.document_state("doc:b").unwrap(),
        IndexState::NotIndexed
    );
}

#[test]
fn stop_words_and_minimum_length_shape_the_index() {
    let analysis = AnalysisConfig {
        stop_words: xyston::english_stop_words(),
        min_term_length: 2,
        ..AnalysisConfig::default()
    };
    let store = SearchStore::open_in_memory(analysis, StoreConfig::default()).unwrap();
    store
        .add_document("doc:a", DocumentSource::text("the quick brown fox"))
        .unwrap();

    let terms = store.registry().all_terms().unwrap();
    assert_eq!(terms, vec!["brown", "fox", "quick"]);

    // A query consisting solely of stop words matches nothing.
    store
        .prepare_search("the", &SearchOptions::default())
        .unwrap();
    let batch = store.fetch_results(true).unwrap();
    assert!(batch.hits.is_empty());
}
