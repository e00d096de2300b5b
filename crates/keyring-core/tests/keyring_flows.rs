//! End-to-end signing flows across keyrings.

// Silence unused crate dependency warnings for test binary
use alloy_rlp as _;
use bip39 as _;
use hmac as _;
use k256 as _;
use proptest as _;
use serde as _;
use sha2 as _;
use thiserror as _;
use tracing as _;
use zeroize as _;

use std::sync::Arc;

use alloy_primitives::U256;
use evm_keyring_core::crypto::recover_address;
use evm_keyring_core::{
    Address, Eip1559Transaction, Eip712Domain, Error, GnosisKeyring, HdKeyring, Keyring,
    KeyringConfig, Operation, SafeInfo, SafeTransaction, SafeTransactionStatus, SimpleKeyring,
    Transaction, TransactionEnvelope, TypedData, WatchKeyring, hash_personal_message,
};
use serde_json::json;

const PHRASE: &str = "test test test test test test test test test test test junk";

fn hd_keyring(accounts: usize) -> HdKeyring {
    let mut keyring = HdKeyring::from_mnemonic(PHRASE, "", KeyringConfig::default())
        .expect("valid mnemonic");
    for _ in 0..accounts {
        keyring.add_next_account().expect("account");
    }
    keyring
}

#[test]
fn route_requests_to_owning_keyring() {
    let hd = hd_keyring(1);
    let hd_address = hd.accounts()[0].address;

    let mut watch = WatchKeyring::new();
    let watched = Address::new([0x11; 20]);
    watch.add(watched);

    let keyrings: Vec<Box<dyn Keyring>> = vec![Box::new(hd), Box::new(watch)];
    let find = |address: &Address| {
        keyrings
            .iter()
            .find(|k| k.contains(address))
            .expect("owning keyring")
    };

    let sig = find(&hd_address)
        .sign_personal_message(&hd_address, b"route me")
        .expect("hd signs");
    assert_eq!(
        recover_address(&hash_personal_message(b"route me"), &sig).expect("recovers"),
        hd_address
    );

    assert!(matches!(
        find(&watched).sign_personal_message(&watched, b"route me"),
        Err(Error::UnsupportedOperation(_))
    ));
}

#[test]
fn signed_transaction_decodes_to_signer() {
    let keyring = hd_keyring(1);
    let from = keyring.accounts()[0].address;

    let tx = Transaction::Eip1559(Eip1559Transaction {
        chain_id: 1,
        nonce: 9,
        max_priority_fee_per_gas: U256::from(1_000_000_000u64),
        max_fee_per_gas: U256::from(30_000_000_000u64),
        gas_limit: 21000,
        to: Some(Address::new([0x22; 20])),
        value: U256::from(10u64).pow(U256::from(17u64)),
        data: vec![],
        access_list: vec![],
    });

    let raw = keyring.sign_transaction(&from, &tx).expect("signs");
    let envelope = TransactionEnvelope::decode(&raw).expect("decodes");
    assert_eq!(envelope.transaction, tx);

    let signature = envelope.signature.expect("signed");
    assert_eq!(
        recover_address(&tx.signing_hash(), &signature).expect("recovers"),
        from
    );
    assert_eq!(envelope.encode_signed().expect("re-encodes"), raw);
}

#[test]
fn typed_data_signature_recovers() {
    let mut keyring = SimpleKeyring::new();
    let account = keyring
        .import_hex_key("59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d")
        .expect("valid key");
    assert_eq!(
        account.address.to_checksum_hex(),
        "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
    );

    let typed_data = TypedData::new(
        Eip712Domain {
            name: Some("Permit".to_string()),
            version: Some("1".to_string()),
            chain_id: Some(1),
            verifying_contract: Some(Address::new([0x33; 20])),
            salt: None,
        },
        json!({
            "Permit": [
                {"name": "owner", "type": "address"},
                {"name": "value", "type": "uint256"},
                {"name": "deadline", "type": "uint256"}
            ]
        }),
        "Permit",
        json!({
            "owner": account.address.to_hex(),
            "value": "1000",
            "deadline": 1_700_000_000u64
        }),
    )
    .expect("valid types");

    let sig = keyring
        .sign_typed_data(&account.address, &typed_data)
        .expect("signs");
    let hash = typed_data.signing_hash().expect("hashes");
    assert_eq!(recover_address(&hash, &sig).expect("recovers"), account.address);
}

#[test]
fn safe_multisig_collects_hd_and_external_owners() {
    let hd = Arc::new(hd_keyring(2));
    let local: Vec<Address> = hd.accounts().iter().map(|a| a.address).collect();

    let mut external = SimpleKeyring::new();
    let outsider = external.import_key(&[0x42; 32]).expect("valid key").address;

    let info = SafeInfo {
        address: Address::new([0x5a; 20]),
        chain_id: 1,
        owners: vec![local[0], local[1], outsider],
        threshold: 3,
        nonce: 0,
    };

    let mut gnosis = GnosisKeyring::new(hd);
    gnosis.add_safe(info.clone()).expect("consistent safe");

    let mut tx = SafeTransaction::new(
        Address::new([0x01; 20]),
        U256::from(1u64),
        vec![],
        Operation::Call,
        0,
    );

    let first = gnosis.sign_safe_transaction(&info.address, &mut tx).expect("signs");
    let second = gnosis.sign_safe_transaction(&info.address, &mut tx).expect("signs");
    assert_ne!(first, second);

    // Both local owners have signed; a third local attempt adds nothing
    gnosis.sign_safe_transaction(&info.address, &mut tx).expect("signs");
    assert_eq!(tx.signature_count(), 2);
    assert!(!tx.is_executable(&info));

    let hash = tx.safe_tx_hash(&info).expect("hashes");
    let external_sig = external.sign_hash(&outsider, &hash).expect("signs");
    gnosis
        .confirm_with(&info.address, &mut tx, external_sig)
        .expect("owner signature");
    assert_eq!(tx.status(), SafeTransactionStatus::ReadyToExecute);

    let packed = tx.execution_signatures(&info).expect("threshold met");
    assert_eq!(packed.len(), 3 * 65);

    tx.mark_submitted(&info).expect("ready");
    tx.mark_confirmed(&info).expect("submitted");
    assert_eq!(tx.status(), SafeTransactionStatus::Confirmed);
}
