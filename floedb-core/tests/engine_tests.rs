//! End-to-end tests for the engine: ingest, search, delete, seal,
//! snapshot, compaction, rebuild, and recall against brute force.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use floedb_core::{ErrorCode, FloeConfig, FloeDB, RecordBatchBuilder};

fn engine(dim: usize, segment_capacity: usize) -> (FloeDB, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = FloeConfig::new(dim, dir.path())
        .with_segment_capacity(segment_capacity)
        .with_ef_construction(100);
    (FloeDB::new(config).unwrap(), dir)
}

#[test]
fn test_search_returns_nearest_neighbors() {
    // dim=4; the closest vector to [0.9, 0.9, 0, 0] is [1, 1, 0, 0].
    let (mut db, _dir) = engine(4, 100);
    db.insert(1, vec![1.0, 0.0, 0.0, 0.0], "").unwrap();
    db.insert(2, vec![0.0, 1.0, 0.0, 0.0], "").unwrap();
    db.insert(3, vec![0.0, 0.0, 1.0, 0.0], "").unwrap();
    db.insert(4, vec![1.0, 1.0, 0.0, 0.0], "").unwrap();

    let results = db.search(&[0.9, 0.9, 0.0, 0.0], 2).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].record_id, 4);
    assert!((results[0].distance - 0.02_f32.sqrt()).abs() < 1e-4);
}

#[test]
fn test_insert_then_search_self_is_exact() {
    let (mut db, _dir) = engine(3, 100);
    for i in 0..30u64 {
        let v = vec![i as f32, (i * 3 % 7) as f32, (i % 5) as f32];
        db.insert(i, v.clone(), "").unwrap();

        let hit = &db.search(&v, 1).unwrap()[0];
        assert_eq!(hit.record_id, i);
        assert!(hit.distance.abs() < 1e-5);
    }
}

#[test]
fn test_seal_and_snapshot_lifecycle() {
    // dim=2, seg_cap=2: the second insert seals the active segment.
    let (mut db, _dir) = engine(2, 2);
    db.insert(1, vec![1.0, 2.0], "").unwrap();
    db.insert(2, vec![3.0, 4.0], "").unwrap();

    let stats = db.stats();
    assert_eq!(stats.total_records, 2);
    assert_eq!(stats.live_records, 2);
    assert_eq!(stats.segment_count, 1);

    // Scan sees both rows even though the active segment is now empty.
    assert_eq!(db.scan_live().unwrap().len(), 2);
}

#[test]
fn test_delete_filters_search_results() {
    let (mut db, _dir) = engine(4, 100);
    db.insert(1, vec![1.0, 0.0, 0.0, 0.0], "keep").unwrap();
    db.insert(2, vec![1.1, 0.0, 0.0, 0.0], "delete_me").unwrap();
    db.insert(3, vec![0.0, 1.0, 0.0, 0.0], "keep").unwrap();

    db.delete(2);

    let stats = db.stats();
    assert_eq!(stats.total_records, 3);
    assert_eq!(stats.live_records, 2);

    for k in 1..=3 {
        let results = db.search(&[1.05, 0.0, 0.0, 0.0], k).unwrap();
        assert!(results.iter().all(|r| r.record_id != 2));
    }
}

#[test]
fn test_compaction_merges_dirty_segments() {
    // Two sealed segments of three rows; deleting 1 and 2 pushes both
    // over the 0.5 threshold (deletes fan out to every sealed segment).
    let (mut db, _dir) = engine(4, 3);
    for i in 1..=6u64 {
        let mut v = vec![0.0; 4];
        v[(i % 4) as usize] = i as f32;
        db.insert(i, v, "").unwrap();
    }
    assert_eq!(db.stats().segment_count, 2);
    assert!(db.stats().snapshot_count >= 3);

    db.delete(1);
    db.delete(2);

    let reclaimed = db.compact(0.5).unwrap();
    assert_eq!(reclaimed, 2);

    let stats = db.stats();
    assert_eq!(stats.segment_count, 1);
    assert_eq!(stats.live_records, 4);
}

#[test]
fn test_compact_and_rebuild_restores_index() {
    let (mut db, _dir) = engine(4, 3);
    db.insert(1, vec![1.0, 0.0, 0.0, 0.0], "").unwrap();
    db.insert(2, vec![0.0, 1.0, 0.0, 0.0], "").unwrap();
    db.insert(3, vec![0.0, 0.0, 1.0, 0.0], "").unwrap();
    db.insert(4, vec![1.0, 1.0, 0.0, 0.0], "").unwrap();
    db.insert(5, vec![0.0, 1.0, 1.0, 0.0], "").unwrap();
    db.insert(6, vec![1.0, 0.0, 1.0, 0.0], "").unwrap();

    db.delete(1);
    db.delete(2);

    let reclaimed = db.compact_and_rebuild(0.5).unwrap();
    assert_eq!(reclaimed, 2);

    let stats = db.stats();
    assert_eq!(stats.live_records, 4);
    assert_eq!(stats.index_size, 4);

    let results = db.search(&[1.0, 1.0, 0.0, 0.0], 1).unwrap();
    assert_eq!(results[0].record_id, 4);
}

#[test]
fn test_deleted_record_gone_after_rebuild() {
    // insert; delete; compact_and_rebuild(0.0); search must not see it.
    let (mut db, _dir) = engine(2, 100);
    db.insert(7, vec![1.0, 1.0], "").unwrap();
    db.insert(8, vec![5.0, 5.0], "").unwrap();
    db.delete(7);

    db.compact_and_rebuild(0.0).unwrap();

    let results = db.search(&[1.0, 1.0], 1).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].record_id, 8);
    assert_eq!(db.stats().index_size, 1);
}

#[test]
fn test_delete_is_idempotent() {
    let (mut db, _dir) = engine(2, 2);
    db.insert(1, vec![1.0, 2.0], "").unwrap();
    db.insert(2, vec![3.0, 4.0], "").unwrap();

    db.delete(1);
    let live = db.stats().live_records;
    db.delete(1);
    db.delete(1);
    assert_eq!(db.stats().live_records, live);
}

#[test]
fn test_flush_with_empty_active_is_noop() {
    let (mut db, _dir) = engine(2, 10);
    db.insert(1, vec![1.0, 2.0], "").unwrap();
    db.flush().unwrap();

    let snapshots = db.stats().snapshot_count;
    db.flush().unwrap();
    assert_eq!(db.stats().snapshot_count, snapshots);
}

#[test]
fn test_batch_ingest() {
    let (mut db, _dir) = engine(4, 100);
    let batch = RecordBatchBuilder::new()
        .add_id_column("id", vec![100, 200, 300])
        .add_embedding_column(
            "embedding",
            vec![
                1.0, 2.0, 3.0, 4.0, //
                5.0, 6.0, 7.0, 8.0, //
                9.0, 10.0, 11.0, 12.0,
            ],
            4,
        )
        .unwrap()
        .add_string_column("metadata", vec!["a".into(), "b".into(), "c".into()])
        .build()
        .unwrap();

    let before = db.stats().total_records;
    let ingested = db.ingest_batch(&batch).unwrap();
    assert_eq!(ingested, 3);
    assert_eq!(db.stats().total_records, before + 3);

    let results = db.search(&[5.0, 6.0, 7.0, 8.0], 1).unwrap();
    assert_eq!(results[0].record_id, 200);
    assert_eq!(results[0].metadata, "b");
}

#[test]
fn test_batch_without_metadata_column() {
    let (mut db, _dir) = engine(2, 100);
    let batch = RecordBatchBuilder::new()
        .add_id_column("id", vec![1, 2])
        .add_embedding_column("embedding", vec![1.0, 2.0, 3.0, 4.0], 2)
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(db.ingest_batch(&batch).unwrap(), 2);
    let results = db.search(&[1.0, 2.0], 1).unwrap();
    assert_eq!(results[0].metadata, "");
}

#[test]
fn test_batch_missing_id_column_rejected() {
    let (mut db, _dir) = engine(2, 100);
    let batch = RecordBatchBuilder::new()
        .add_embedding_column("embedding", vec![1.0, 2.0], 2)
        .unwrap()
        .build()
        .unwrap();

    let err = db.ingest_batch(&batch).unwrap_err();
    assert_eq!(err.code(), ErrorCode::SchemaMismatch);
    assert_eq!(db.stats().total_records, 0);
}

#[test]
fn test_batch_wrong_list_size_is_dimension_mismatch() {
    let (mut db, _dir) = engine(4, 100);
    let batch = RecordBatchBuilder::new()
        .add_id_column("id", vec![1])
        .add_embedding_column("embedding", vec![1.0, 2.0], 2)
        .unwrap()
        .build()
        .unwrap();

    let err = db.ingest_batch(&batch).unwrap_err();
    assert_eq!(err.code(), ErrorCode::DimensionMismatch);
    assert_eq!(db.stats().total_records, 0);
}

#[test]
fn test_batch_wrong_column_type_rejected() {
    let (mut db, _dir) = engine(2, 100);
    let batch = RecordBatchBuilder::new()
        .add_id_column("id", vec![1])
        .add_string_column("embedding", vec!["not_floats".into()])
        .build()
        .unwrap();

    let err = db.ingest_batch(&batch).unwrap_err();
    assert_eq!(err.code(), ErrorCode::SchemaMismatch);
}

#[test]
fn test_dimension_validation() {
    let (mut db, _dir) = engine(4, 100);

    let err = db.insert(1, vec![1.0, 2.0], "").unwrap_err();
    assert_eq!(err.code(), ErrorCode::DimensionMismatch);
    assert_eq!(db.stats().total_records, 0);
    assert_eq!(db.stats().index_size, 0);

    db.insert(1, vec![0.0; 4], "").unwrap();
    assert!(db.search(&[0.0; 3], 1).is_err());
}

#[test]
fn test_invalid_config_rejected() {
    let dir = tempfile::tempdir().unwrap();
    assert!(FloeDB::new(FloeConfig::new(0, dir.path())).is_err());
    assert!(FloeDB::new(FloeConfig::new(4, dir.path()).with_m(0)).is_err());

    let (db, _dir) = engine(2, 100);
    let err = db.compact(1.5).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidConfig);
}

#[test]
fn test_boundary_conditions() {
    let (mut db, _dir) = engine(1, 100);

    // Empty engine.
    assert!(db.search(&[0.5], 3).unwrap().is_empty());

    // Dimension-1 vectors reduce to a scalar sort.
    for i in 0..10u64 {
        db.insert(i, vec![i as f32], "").unwrap();
    }
    let results = db.search(&[6.4], 3).unwrap();
    assert_eq!(results[0].record_id, 6);

    // k = 0.
    assert!(db.search(&[0.5], 0).unwrap().is_empty());

    // k beyond the live set returns exactly the live set.
    let results = db.search(&[0.5], 50).unwrap();
    assert_eq!(results.len(), 10);
    db.delete(3);
    let results = db.search(&[0.5], 50).unwrap();
    assert_eq!(results.len(), 9);
}

#[test]
fn test_m_one_configuration_is_legal() {
    let dir = tempfile::tempdir().unwrap();
    let config = FloeConfig::new(2, dir.path()).with_m(1);
    let mut db = FloeDB::new(config).unwrap();

    for i in 0..20u64 {
        db.insert(i, vec![i as f32, 0.0], "").unwrap();
    }
    let results = db.search(&[11.3, 0.0], 2).unwrap();
    assert_eq!(results[0].record_id, 11);
}

#[test]
fn test_snapshots_track_seal_and_compaction_events() {
    let (mut db, _dir) = engine(2, 2);
    let initial = db.latest_snapshot().unwrap();
    assert_eq!(initial.snapshot_id, 0);
    assert!(initial.sealed_segment_ids.is_empty());

    db.insert(1, vec![1.0, 0.0], "").unwrap();
    db.insert(2, vec![2.0, 0.0], "").unwrap(); // seal
    let after_seal = db.latest_snapshot().unwrap();
    assert_eq!(after_seal.snapshot_id, 1);
    assert_eq!(after_seal.sealed_segment_ids, vec![0]);

    db.delete(1);
    db.compact(0.4).unwrap();
    let after_compact = db.latest_snapshot().unwrap();
    assert_eq!(after_compact.snapshot_id, 2);
    // The dirty segment was replaced by the merged one.
    assert_eq!(after_compact.sealed_segment_ids, vec![2]);
}

#[test]
fn test_scan_at_snapshot() {
    let (mut db, _dir) = engine(2, 2);
    db.insert(1, vec![1.0, 0.0], "").unwrap();
    db.insert(2, vec![2.0, 0.0], "").unwrap(); // seal -> snapshot 1
    db.insert(3, vec![3.0, 0.0], "").unwrap();
    db.insert(4, vec![4.0, 0.0], "").unwrap(); // seal -> snapshot 2

    assert_eq!(db.scan_at_snapshot(1).unwrap().len(), 2);
    assert_eq!(db.scan_at_snapshot(2).unwrap().len(), 4);
    assert!(db.scan_at_snapshot(9).is_err());
}

#[test]
fn test_reopen_rebuilds_index_from_segments() {
    let dir = tempfile::tempdir().unwrap();
    {
        let config = FloeConfig::new(2, dir.path()).with_segment_capacity(2);
        let mut db = FloeDB::new(config).unwrap();
        db.insert(1, vec![1.0, 0.0], "first").unwrap();
        db.insert(2, vec![0.0, 1.0], "second").unwrap(); // seal
        db.insert(3, vec![5.0, 5.0], "third").unwrap();
        db.flush().unwrap();
    }

    let config = FloeConfig::new(2, dir.path()).with_segment_capacity(2);
    let db = FloeDB::open(config).unwrap();

    let stats = db.stats();
    assert_eq!(stats.total_records, 3);
    assert_eq!(stats.index_size, 3);
    assert_eq!(stats.segment_count, 2);

    let results = db.search(&[4.8, 4.9], 1).unwrap();
    assert_eq!(results[0].record_id, 3);
    assert_eq!(results[0].metadata, "third");
}

// ─── Recall against brute force ─────────────────────────────────────

fn gaussian_vector(rng: &mut StdRng, dim: usize) -> Vec<f32> {
    // Box-Muller transform over the seeded uniform stream.
    (0..dim)
        .map(|_| {
            let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
            let u2: f64 = rng.gen();
            ((-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()) as f32
        })
        .collect()
}

fn brute_force_top_k(database: &[Vec<f32>], query: &[f32], k: usize) -> HashSet<u64> {
    let mut scored: Vec<(u64, f32)> = database
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let d: f32 = v
                .iter()
                .zip(query.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            (i as u64, d)
        })
        .collect();
    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
    scored.into_iter().take(k).map(|(id, _)| id).collect()
}

#[test]
fn test_recall_at_10_on_gaussian_data() {
    let dim = 8;
    let n = 1000;
    let k = 10;

    let dir = tempfile::tempdir().unwrap();
    let config = FloeConfig::new(dim, dir.path())
        .with_ef_construction(100)
        .with_ef_search(100);
    let mut db = FloeDB::new(config).unwrap();

    let mut rng = StdRng::seed_from_u64(1234);
    let database: Vec<Vec<f32>> = (0..n).map(|_| gaussian_vector(&mut rng, dim)).collect();
    for (i, v) in database.iter().enumerate() {
        db.insert(i as u64, v.clone(), "").unwrap();
    }

    let mut total_recall = 0.0;
    let queries = 10;
    for _ in 0..queries {
        let query = gaussian_vector(&mut rng, dim);
        let truth = brute_force_top_k(&database, &query, k);
        let found: HashSet<u64> = db
            .search(&query, k)
            .unwrap()
            .iter()
            .map(|r| r.record_id)
            .collect();
        total_recall += truth.intersection(&found).count() as f64 / k as f64;
    }

    let mean_recall = total_recall / queries as f64;
    assert!(
        mean_recall >= 0.70,
        "mean recall@{} was {:.3}, expected >= 0.70",
        k,
        mean_recall
    );
}
