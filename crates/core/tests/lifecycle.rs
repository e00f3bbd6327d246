mod common;

use common::*;
use pretty_assertions::assert_eq;
use sidetree_core::{
    admit, resolve_document, validate_and_admit, ChainState, ChainStateError, ChainStatus,
    CommitmentTrack, DIDStatePatch, Delta, DocumentState, OperationBuilder, OperationError,
    OperationRequest, OperationType, Protocol, ProtocolParameters, SignedData, UpdateRequest,
    UpdateSignedData, SHA3_256,
};
use sidetree_jws::JwkVerifier;

fn admit_raw(protocol: &Protocol, state: &ChainState, raw: &[u8]) -> ChainState {
    validate_and_admit(protocol, &JwkVerifier, state, raw)
        .unwrap()
        .state
}

#[test_log::test]
fn create_update_deactivate() {
    let protocol = Protocol::default();
    let mut rng = rng(1);
    let controller = Controller::new(&mut rng);
    let k1 = secp256k1(&mut rng).to_public();
    let builder = OperationBuilder::new(&protocol);

    let (suffix, create) = controller.create(&protocol, vec![add_public_key("k1", &k1)]);
    let state = admit_raw(&protocol, &ChainState::default(), &raw(create));
    assert!(resolve_document(&state).public_key("k1").is_some());

    let next_update = secp256k1(&mut rng);
    let update = builder
        .update(
            &suffix,
            &controller.update,
            &next_update.to_public(),
            vec![remove_public_keys(&["k1"])],
        )
        .unwrap();
    let state = admit_raw(&protocol, &state, &raw(update));
    assert_eq!(resolve_document(&state).public_keys, Some(Vec::new()));

    let deactivate = builder.deactivate(&suffix, &controller.recovery).unwrap();
    let state = admit_raw(&protocol, &state, &raw(deactivate));
    assert_eq!(state.status(), &ChainStatus::Deactivated);
    assert_eq!(resolve_document(&state), DocumentState::default());

    let late_update = builder
        .update(
            &suffix,
            &next_update,
            &secp256k1(&mut rng).to_public(),
            vec![add_public_key("k2", &k1)],
        )
        .unwrap();
    let rejection = validate_and_admit(&protocol, &JwkVerifier, &state, &raw(late_update))
        .unwrap_err();
    assert!(matches!(
        rejection.error(),
        OperationError::ChainState(ChainStateError::Deactivated)
    ));
    assert_eq!(rejection.operation_type, Some(OperationType::Update));
    assert_eq!(state.operations().len(), 3);
}

#[test_log::test]
fn commitment_is_single_use() {
    let protocol = Protocol::default();
    let mut rng = rng(2);
    let controller = Controller::new(&mut rng);
    let builder = OperationBuilder::new(&protocol);
    let (suffix, create) = controller.create(&protocol, Vec::new());
    let state = admit_raw(&protocol, &ChainState::default(), &raw(create));

    // Two operations revealing the same update key.
    let first = builder
        .update(
            &suffix,
            &controller.update,
            &secp256k1(&mut rng).to_public(),
            vec![add_service("first")],
        )
        .unwrap();
    let second = builder
        .update(
            &suffix,
            &controller.update,
            &secp256k1(&mut rng).to_public(),
            vec![add_service("second")],
        )
        .unwrap();
    let first_hash = OperationRequest::from(first.clone())
        .operation_hash(&protocol)
        .unwrap();
    let second_hash = OperationRequest::from(second.clone())
        .operation_hash(&protocol)
        .unwrap();

    let state = admit_raw(&protocol, &state, &raw(first));
    let rejection =
        validate_and_admit(&protocol, &JwkVerifier, &state, &raw(second)).unwrap_err();
    match rejection.error() {
        OperationError::CommitmentAlreadyConsumed {
            commitment,
            track,
            consumed_by,
            candidate,
        } => {
            assert_eq!(
                commitment,
                &protocol.commitment(&controller.update.to_public()).unwrap()
            );
            assert_eq!(*track, CommitmentTrack::Update);
            assert_eq!(consumed_by.index, 1);
            assert_eq!(consumed_by.operation_hash, first_hash);
            assert_eq!(candidate, &second_hash);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(resolve_document(&state).service("second").is_none());
}

#[test_log::test]
fn hash_mismatch_leaves_state_unchanged() {
    let protocol = Protocol::default();
    let mut rng = rng(3);
    let controller = Controller::new(&mut rng);
    let (suffix, create) = controller.create(&protocol, vec![add_service("s1")]);
    let state = admit_raw(&protocol, &ChainState::default(), &raw(create));
    let before = serde_json::to_value(&state).unwrap();

    let mut update = OperationBuilder::new(&protocol)
        .update(
            &suffix,
            &controller.update,
            &secp256k1(&mut rng).to_public(),
            vec![add_service("s2")],
        )
        .unwrap();
    update.delta.patches = vec![add_service("s3")];
    let rejection = validate_and_admit(&protocol, &JwkVerifier, &state, &raw(update)).unwrap_err();
    assert!(matches!(
        rejection.error(),
        OperationError::HashMismatch {
            field: "delta_hash",
            ..
        }
    ));
    assert_eq!(serde_json::to_value(&state).unwrap(), before);

    // The update key was not consumed by the rejected operation.
    let update = OperationBuilder::new(&protocol)
        .update(
            &suffix,
            &controller.update,
            &secp256k1(&mut rng).to_public(),
            vec![add_service("s2")],
        )
        .unwrap();
    admit_raw(&protocol, &state, &raw(update));
}

#[test_log::test]
fn removal_is_idempotent() {
    let protocol = Protocol::default();
    let mut rng = rng(4);
    let controller = Controller::new(&mut rng);
    let k1 = secp256k1(&mut rng).to_public();
    let (suffix, create) = controller.create(
        &protocol,
        vec![add_public_key("k1", &k1), add_service("s1")],
    );
    let state = admit_raw(&protocol, &ChainState::default(), &raw(create));

    let remove_twice = vec![remove_public_keys(&["k1"]), remove_public_keys(&["k1", "absent"])];
    let update = OperationBuilder::new(&protocol)
        .update(
            &suffix,
            &controller.update,
            &secp256k1(&mut rng).to_public(),
            remove_twice,
        )
        .unwrap();
    let state = admit_raw(&protocol, &state, &raw(update));
    let document = resolve_document(&state);
    assert!(document.public_key("k1").is_none());
    assert!(document.service("s1").is_some());
}

#[test_log::test]
fn recover_resets_document_and_commitments() {
    let protocol = Protocol::default();
    let mut rng = rng(5);
    let controller = Controller::new(&mut rng);
    let builder = OperationBuilder::new(&protocol);
    let (suffix, create) = controller.create(&protocol, vec![add_service("s1")]);
    let state = admit_raw(&protocol, &ChainState::default(), &raw(create));

    let new_recovery = secp256k1(&mut rng);
    let new_update = secp256k1(&mut rng);
    let recover = builder
        .recover(
            &suffix,
            &controller.recovery,
            &new_recovery.to_public(),
            &new_update.to_public(),
            vec![add_service("s2")],
        )
        .unwrap();
    let state = admit_raw(&protocol, &state, &raw(recover));
    let document = resolve_document(&state);
    assert!(document.service("s1").is_none());
    assert!(document.service("s2").is_some());
    assert_eq!(
        state.status(),
        &ChainStatus::Active {
            update_commitment: protocol.commitment(&new_update.to_public()).unwrap(),
            recovery_commitment: protocol.commitment(&new_recovery.to_public()).unwrap(),
        }
    );

    // The previous update key no longer opens the update commitment.
    let stale = builder
        .update(
            &suffix,
            &controller.update,
            &secp256k1(&mut rng).to_public(),
            Vec::new(),
        )
        .unwrap();
    let rejection = admit(&protocol, &JwkVerifier, &state, stale.into()).unwrap_err();
    assert!(matches!(
        rejection.error(),
        OperationError::CommitmentMismatch { .. }
    ));

    // The previous recovery key was consumed.
    let replayed = builder.deactivate(&suffix, &controller.recovery).unwrap();
    let rejection = admit(&protocol, &JwkVerifier, &state, replayed.into()).unwrap_err();
    assert!(matches!(
        rejection.error(),
        OperationError::CommitmentAlreadyConsumed {
            track: CommitmentTrack::Recovery,
            ..
        }
    ));

    let update = builder
        .update(
            &suffix,
            &new_update,
            &secp256k1(&mut rng).to_public(),
            vec![add_service("s3")],
        )
        .unwrap();
    let state = admit_raw(&protocol, &state, &raw(update));
    assert!(resolve_document(&state).service("s3").is_some());
}

#[test_log::test]
fn consumed_commitment_cannot_be_reused() {
    let protocol = Protocol::default();
    let mut rng = rng(6);
    let controller = Controller::new(&mut rng);
    let builder = OperationBuilder::new(&protocol);
    let (suffix, create) = controller.create(&protocol, Vec::new());
    let state = admit_raw(&protocol, &ChainState::default(), &raw(create));

    let u1 = secp256k1(&mut rng);
    let update = builder
        .update(&suffix, &controller.update, &u1.to_public(), Vec::new())
        .unwrap();
    let state = admit_raw(&protocol, &state, &raw(update));

    // Commit back to the consumed update key.
    let update = builder
        .update(&suffix, &u1, &controller.update.to_public(), Vec::new())
        .unwrap();
    let rejection = admit(&protocol, &JwkVerifier, &state, update.into()).unwrap_err();
    assert!(matches!(
        rejection.error(),
        OperationError::ChainState(ChainStateError::CommitmentReuse {
            track: CommitmentTrack::Update,
            ..
        })
    ));

    // Commit to the key being revealed.
    let delta = Delta {
        update_commitment: protocol.commitment(&u1.to_public()).unwrap(),
        patches: Vec::<DIDStatePatch>::new(),
    };
    let payload = UpdateSignedData {
        update_key: u1.to_public(),
        delta_hash: protocol.hash_value(&delta).unwrap(),
    };
    let jws = sidetree_jws::encode_sign(&serde_json::to_string(&payload).unwrap(), &u1).unwrap();
    let update = UpdateRequest {
        did_suffix: suffix.clone(),
        signed_data: SignedData::decode(jws).unwrap(),
        delta,
    };
    let rejection = admit(&protocol, &JwkVerifier, &state, update.into()).unwrap_err();
    assert!(matches!(
        rejection.error(),
        OperationError::ChainState(ChainStateError::CommitmentReuse { .. })
    ));
}

#[test_log::test]
fn signature_must_come_from_revealed_key() {
    let protocol = Protocol::default();
    let mut rng = rng(7);
    let controller = Controller::new(&mut rng);
    let (suffix, create) = controller.create(&protocol, Vec::new());
    let state = admit_raw(&protocol, &ChainState::default(), &raw(create));

    let attacker = secp256k1(&mut rng);
    let delta = Delta {
        update_commitment: protocol.commitment(&attacker.to_public()).unwrap(),
        patches: vec![add_service("evil")],
    };
    let payload = UpdateSignedData {
        update_key: controller.update.to_public(),
        delta_hash: protocol.hash_value(&delta).unwrap(),
    };
    let jws =
        sidetree_jws::encode_sign(&serde_json::to_string(&payload).unwrap(), &attacker).unwrap();
    let update = UpdateRequest {
        did_suffix: suffix,
        signed_data: SignedData::decode(jws).unwrap(),
        delta,
    };
    let rejection = validate_and_admit(&protocol, &JwkVerifier, &state, &raw(update)).unwrap_err();
    assert!(matches!(
        rejection.error(),
        OperationError::SignatureInvalid(_)
    ));
}

#[test_log::test]
fn chains_survive_hash_algorithm_migration() {
    let sha2 = Protocol::default();
    let sha3 = Protocol::new(ProtocolParameters {
        hash_algorithm: SHA3_256,
        ..Default::default()
    })
    .unwrap();
    let mut rng = rng(8);
    let controller = Controller::new(&mut rng);
    let k1 = secp256k1(&mut rng).to_public();

    let (suffix, create) = controller.create(&sha2, Vec::new());
    let state = admit_raw(&sha2, &ChainState::default(), &raw(create));

    let builder = OperationBuilder::new(&sha3);
    let next_update = secp256k1(&mut rng);
    let update = builder
        .update(
            &suffix,
            &controller.update,
            &next_update.to_public(),
            vec![add_public_key("k1", &k1)],
        )
        .unwrap();
    let state = admit_raw(&sha3, &state, &raw(update));
    assert!(resolve_document(&state).public_key("k1").is_some());

    let deactivate = builder.deactivate(&suffix, &controller.recovery).unwrap();
    let state = admit_raw(&sha3, &state, &raw(deactivate));
    assert_eq!(state.status(), &ChainStatus::Deactivated);
}
