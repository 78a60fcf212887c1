//! Integration tests for spectral-points.

use std::time::Duration;

use spectral_points::{
    classify, distance, project, CaptureError, Embedding, EmbeddingConfig, Engine, Error,
    FrameSource, PointStore, ProjectionScalar, Representation, StoreError, SyntheticSource,
};

fn real_config() -> EmbeddingConfig {
    EmbeddingConfig {
        representation: Representation::Real,
        ..Default::default()
    }
}

fn flat_signature(len: usize) -> spectral_points::EmbeddingSignature {
    EmbeddingConfig {
        width: len,
        height: 1,
        embedding_width: len,
        embedding_height: 1,
        representation: Representation::Real,
        projection: ProjectionScalar::Magnitude,
    }
    .signature()
}

// ---------------------------------------------------------------------------
// Embedding properties
// ---------------------------------------------------------------------------

#[test]
fn test_self_distance_zero_both_representations() {
    for representation in [Representation::Real, Representation::Complex] {
        let engine = Engine::new(EmbeddingConfig {
            representation,
            ..Default::default()
        })
        .unwrap();
        let frame = SyntheticSource::new(64, 48).with_seed(3).frame_at(9);
        let a = engine.embed(&frame).unwrap();
        let b = engine.embed(&frame).unwrap();
        assert_eq!(distance(&a, &b).unwrap(), 0.0);
    }
}

#[test]
fn test_distance_symmetric_across_frames() {
    let engine = Engine::new(EmbeddingConfig::default()).unwrap();
    let source = SyntheticSource::new(64, 48);
    let a = engine.embed(&source.frame_at(1)).unwrap();
    let b = engine.embed(&source.frame_at(20)).unwrap();
    assert_eq!(distance(&a, &b).unwrap(), distance(&b, &a).unwrap());
    assert!(distance(&a, &b).unwrap() > 0.0);
}

#[test]
fn test_different_configs_not_comparable() {
    let frame = SyntheticSource::new(32, 32).frame_at(0);
    let real = Engine::new(real_config()).unwrap().embed(&frame).unwrap();
    let complex = Engine::new(EmbeddingConfig::default())
        .unwrap()
        .embed(&frame)
        .unwrap();
    assert!(distance(&real, &complex).is_err());
}

// ---------------------------------------------------------------------------
// Point store and classifier
// ---------------------------------------------------------------------------

#[test]
fn test_alice_bob_scenario() {
    let mut store = PointStore::new(flat_signature(4));
    store.learn("alice", vec![1.0, 2.0, 3.0, 4.0].into()).unwrap();
    store.learn("bob", vec![10.0, 20.0, 30.0, 40.0].into()).unwrap();

    let m = classify(&store, &vec![1.0, 2.0, 3.0, 5.0].into())
        .unwrap()
        .expect("match");
    assert_eq!(m.label, "alice");
    assert_eq!(m.distance, 1.0);
}

#[test]
fn test_empty_store_no_match() {
    let store = PointStore::new(flat_signature(4));
    assert!(classify(&store, &vec![0.0; 4].into()).unwrap().is_none());
}

#[test]
fn test_learn_persist_reload_law() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.json");
    let engine = Engine::new(real_config()).unwrap();
    let source = SyntheticSource::new(48, 48);

    let mut store = engine.empty_store();
    engine.learn(&mut store, "L", &source.frame_at(0)).unwrap();
    store.save(&path).unwrap();

    let mut reloaded = PointStore::load(&path, engine.config().signature()).unwrap();
    let before = reloaded.get("L").unwrap().len();
    let vector = engine.embed(&source.frame_at(5)).unwrap();
    reloaded.learn("L", vector.clone()).unwrap();
    reloaded.save(&path).unwrap();

    let after = PointStore::open(&path, engine.config().signature()).unwrap();
    let history = &after.get("L").unwrap().points;
    assert_eq!(history.len(), before + 1);
    assert_eq!(history.last(), Some(&vector));

    // 重新加载的向量分类回自己
    let m = classify(&after, &vector).unwrap().unwrap();
    assert_eq!((m.label.as_str(), m.distance), ("L", 0.0));
}

#[test]
fn test_store_rejects_other_representation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.json");
    PointStore::new(real_config().signature()).save(&path).unwrap();

    let result = PointStore::load(&path, EmbeddingConfig::default().signature());
    assert!(matches!(result, Err(StoreError::Incompatible { .. })));
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

#[test]
fn test_carol_projection_scenario() {
    let history: Vec<Embedding> = vec![
        vec![0.0, 1.0, 4.0, 2.0, 0.5, 3.0, 1.0, 2.5, 0.0].into(),
        vec![3.0, 0.0, 1.0, 1.5, 2.0, 0.0, 4.0, 1.0, 2.0].into(),
        vec![1.0, 3.5, 0.5, 0.0, 4.0, 1.0, 2.0, 0.0, 3.0].into(),
        vec![2.5, 2.0, 3.0, 4.0, 1.0, 2.0, 0.0, 3.0, 1.0].into(),
    ];
    let query: Embedding = vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 1.0, 1.0, 2.0].into();

    let a = project(&history, &query, ProjectionScalar::Magnitude)
        .unwrap()
        .expect("coordinate");
    let b = project(&history, &query, ProjectionScalar::Magnitude)
        .unwrap()
        .expect("coordinate");
    assert_eq!(a, b);
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// 报一次错误的帧源
struct FailingSource;

impl FrameSource for FailingSource {
    fn next_frame(&mut self) -> Result<Option<spectral_points::Frame>, CaptureError> {
        Err(CaptureError::Closed)
    }
}

#[tokio::test]
async fn test_learn_then_infer_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.json");
    let engine = Engine::new(real_config()).unwrap();

    for seed in [1, 2] {
        engine
            .run_learn(
                SyntheticSource::new(48, 48).with_seed(seed),
                &path,
                &format!("scene-{seed}"),
                Duration::ZERO,
            )
            .await
            .unwrap();
    }

    let stats = engine
        .run_infer(SyntheticSource::new(48, 48).with_seed(2).with_limit(3), &path, None)
        .await
        .unwrap();
    assert_eq!(stats.frames, 3);
    assert_eq!(stats.matched, 3);
    assert_eq!(stats.projected, 0);
}

#[tokio::test]
async fn test_learn_with_failing_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.json");
    let engine = Engine::new(real_config()).unwrap();

    let result = engine
        .run_learn(FailingSource, &path, "x", Duration::ZERO)
        .await;
    assert!(matches!(result, Err(Error::Capture(_))));
    // 失败的学习不写存储
    assert!(!path.exists());
}
