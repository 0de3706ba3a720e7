//! End-to-end commitment flow: records are committed per field, batched
//! into an aggregate root, voted to finality, and a single field is later
//! disclosed and checked against the finalized output.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use greenproof_core::config::EngineConfig;
use greenproof_core::determinism::{Record, canonicalize_to_string};
use greenproof_core::merkle::{AggregateTree, FieldTree, MerkleError, verify_proof};
use greenproof_core::registry::{Identity, StaticCapabilities};
use greenproof_core::voting::{ConsensusEngine, InputKey, ManualClock};
use serde_json::json;

fn readings() -> Vec<Record> {
    let start = Utc.with_ymd_and_hms(2022, 4, 1, 0, 0, 0).unwrap();
    vec![
        Record::from_json(json!({
            "id": "consumer-1",
            "volume": 120,
            "tags": ["solar", "residential"],
        }))
        .with("timestamp", start),
        Record::from_json(json!({
            "id": "consumer-2",
            "volume": 80.5,
            "meta": { "site": "north", "unit": "kWh" },
        }))
        .with("timestamp", start),
        Record::from_json(json!({
            "id": "generator-7",
            "volume": 210,
            "tags": ["wind"],
        }))
        .with("timestamp", start),
    ]
}

/// What each worker computes independently for a timeframe.
fn batch_root(records: &[Record]) -> (Vec<FieldTree>, AggregateTree) {
    let trees: Vec<FieldTree> = records.iter().map(|r| FieldTree::build(r).unwrap()).collect();
    let roots: Vec<_> = trees.iter().map(FieldTree::root).collect();
    let aggregate = AggregateTree::build(&roots).unwrap();
    (trees, aggregate)
}

#[test]
fn workers_agree_regardless_of_record_and_field_order() {
    let records = readings();
    let (_, forward) = batch_root(&records);

    let mut reordered: Vec<Record> = records
        .iter()
        .map(|r| {
            let mut fields: Vec<_> = r.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
            fields.reverse();
            fields.into_iter().collect()
        })
        .collect();
    reordered.reverse();
    let (_, backward) = batch_root(&reordered);

    assert_eq!(forward.root(), backward.root());
    for (a, b) in records.iter().zip(reordered.iter().rev()) {
        assert_eq!(canonicalize_to_string(a), canonicalize_to_string(b));
    }
}

#[test]
fn finalized_root_backs_single_field_disclosure() {
    let config = EngineConfig {
        majority_percentage: 51,
        ..EngineConfig::default()
    };
    let authority = Arc::new(StaticCapabilities::new());
    let mut engine = ConsensusEngine::new(
        config.clone(),
        Identity::new("owner"),
        authority.clone(),
        Arc::new(ManualClock::new(0)),
    )
    .unwrap();
    let workers: Vec<Identity> = ["w1", "w2", "w3"].into_iter().map(Identity::new).collect();
    for w in &workers {
        authority.grant(w, &config.worker_role, config.role_version);
        engine.add_worker(w.clone()).unwrap();
    }

    let timeframe = InputKey::new("2022-04-01T00:00:00.000Z");
    let (trees, aggregate) = batch_root(&readings());
    for w in &workers[..2] {
        engine.vote(w, &timeframe, aggregate.root()).unwrap();
    }
    let finalized = engine.get_match(&timeframe).unwrap();
    assert_eq!(finalized, aggregate.root());

    let generator = &trees[2];
    let disclosure = generator.precise_proof("volume").unwrap();
    assert_eq!(disclosure.value, "210");
    assert!(disclosure.verify(&generator.root()));

    let inclusion = aggregate.proof_for_root(&generator.root()).unwrap();
    assert!(verify_proof(&finalized, &generator.root(), &inclusion));
}

#[test]
fn tampered_disclosure_is_rejected() {
    let (trees, _) = batch_root(&readings());
    let tree = &trees[0];
    let honest = tree.precise_proof("volume").unwrap();

    let forged = FieldTree::build(&readings()[0].clone().with("volume", 9_999_u64)).unwrap();
    let forged_leaf = forged.leaf_for("volume").unwrap();
    assert!(!verify_proof(&tree.root(), &forged_leaf, &honest.proof));

    let mut bent = honest.proof.clone();
    bent.steps[0].is_left = !bent.steps[0].is_left;
    assert!(!verify_proof(&tree.root(), &honest.leaf, &bent));
}

#[test]
fn absent_field_has_no_proof() {
    let (trees, _) = batch_root(&readings());
    assert_eq!(
        trees[0].precise_proof("price").unwrap_err(),
        MerkleError::FieldNotFound {
            field: "price".to_string()
        }
    );
}
