//! Integration tests for UserSig issuance and verification.
//!
//! Run with: cargo test --package usersig --test integration_tests

use std::io::Write;
use std::sync::Arc;
use std::thread;

use proptest::prelude::*;
use rand::RngCore;
use tempfile::NamedTempFile;
use usersig::{
    Envelope, FixedClock, Privileges, Room, TokenIssuer, TokenVerifier, UserBuf, UserSigConfig,
    UserSigError, inspect_user_sig_unverified,
};

const APP_ID: u64 = 1_400_000_000;
const KEY: &str = "5bd2850fff3ecb11d7c805251c51ee463a25727bddc2385f3fa8bfee1bb93b5e";
const NOW: i64 = 1_700_000_000;

fn issuer() -> TokenIssuer {
    TokenIssuer::new(APP_ID, KEY).with_clock(FixedClock(NOW))
}

fn verifier() -> TokenVerifier {
    TokenVerifier::new(APP_ID, KEY)
}

/// A one-day UserSig for alice round-trips and expires on time.
#[test]
fn test_alice_one_day() {
    let token = issuer().gen_user_sig("alice", 86400).unwrap();

    let document = Envelope::unpack(&token).unwrap();
    assert_eq!(document.expire, Some(86400));
    let issued_at = document.time.unwrap();

    assert!(verifier().verify_user_sig("alice", &token, issued_at).is_ok());
    assert!(verifier().verify_user_sig("alice", &token, issued_at + 86399).is_ok());
    assert!(
        verifier()
            .verify_user_sig("alice", &token, issued_at + 86401)
            .unwrap_err()
            .is_expired()
    );
}

/// A room-scoped key does not verify against a descriptor for another room.
#[test]
fn test_private_map_key_other_room() {
    let token = issuer()
        .gen_private_map_key_with_room_str("alice", 3600, "room42", Privileges::from_bits(255))
        .unwrap();

    let descriptor = |room: &str| {
        UserBuf::new(
            "alice",
            APP_ID,
            Room::Name(room.to_string()),
            3600,
            Privileges::ALL,
            &FixedClock(NOW),
        )
        .encode()
        .unwrap()
    };

    assert!(
        verifier()
            .verify_user_sig_with_buf("alice", &token, NOW, &descriptor("room42"))
            .is_ok()
    );
    let err = verifier()
        .verify_user_sig_with_buf("alice", &token, NOW, &descriptor("room43"))
        .unwrap_err();
    assert!(matches!(err, UserSigError::UserBufMismatch));
}

/// A numeric-room key carries the privilege bitmap it was issued with.
#[test]
fn test_private_map_key_numeric_room() {
    let privileges = Privileges::JOIN_ROOM | Privileges::RECV_AUDIO | Privileges::RECV_VIDEO;
    let token = issuer()
        .gen_private_map_key("alice", 600, 1001, privileges)
        .unwrap();

    let info = inspect_user_sig_unverified(&token).unwrap();
    let descriptor = info.private_map_key.unwrap();
    assert_eq!(descriptor.room, Room::Id(1001));
    assert_eq!(descriptor.privileges.bits(), 42);

    let expected = descriptor.encode().unwrap();
    let verified = verifier()
        .verify_user_sig_with_buf("alice", &token, NOW, &expected)
        .unwrap();
    assert!(verified.has_user_buf());
}

/// Issuer and verifier built from the same configuration file agree.
#[test]
fn test_config_file_flow() {
    let mut key_file = NamedTempFile::new().unwrap();
    writeln!(key_file, "{KEY}").unwrap();

    let mut config_file = NamedTempFile::new().unwrap();
    writeln!(
        config_file,
        "sdk_app_id: {APP_ID}\nkey_file: {}\ncompression_level: 6\npool_capacity: 4",
        key_file.path().display()
    )
    .unwrap();

    let config = UserSigConfig::from_file(config_file.path()).unwrap();
    let issuer = TokenIssuer::from_config(&config).unwrap();
    let verifier = TokenVerifier::from_config(&config).unwrap();

    let token = issuer.gen_default_user_sig("bob").unwrap();
    let verified = verifier.verify_user_sig_now("bob", &token).unwrap();
    assert_eq!(verified.expire, config.default_expire_seconds);

    // Tokens from the configured key also verify with the raw key.
    assert!(TokenVerifier::new(APP_ID, KEY).verify_user_sig_now("bob", &token).is_ok());
}

/// Tokens are independent of the compression level used to pack them.
#[test]
fn test_compression_level_does_not_affect_verification() {
    for level in 0..=9 {
        let token = issuer()
            .with_envelope(Envelope::new(level, 1))
            .gen_user_sig("alice", 60)
            .unwrap();
        assert!(verifier().verify_user_sig("alice", &token, NOW).is_ok());
    }
}

/// Random keys sign and verify, and never verify under a different key.
#[test]
fn test_random_keys() {
    let mut rng = rand::rng();
    for _ in 0..8 {
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        let mut other = key;
        other[0] ^= 0x80;

        let token = TokenIssuer::new(APP_ID, &key[..])
            .with_clock(FixedClock(NOW))
            .gen_user_sig("alice", 60)
            .unwrap();
        assert!(
            TokenVerifier::new(APP_ID, &key[..])
                .verify_user_sig("alice", &token, NOW)
                .is_ok()
        );
        assert!(matches!(
            TokenVerifier::new(APP_ID, &other[..])
                .verify_user_sig("alice", &token, NOW)
                .unwrap_err(),
            UserSigError::SignatureMismatch
        ));
    }
}

/// Concurrent issuance shares the compressor pool without interference.
#[test]
fn test_concurrent_issuance() {
    let issuer = Arc::new(
        TokenIssuer::new(APP_ID, KEY)
            .with_clock(FixedClock(NOW))
            .with_envelope(Envelope::new(6, 4)),
    );

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let issuer = Arc::clone(&issuer);
            thread::spawn(move || {
                (0..25)
                    .map(|j| {
                        let identifier = format!("user_{i}_{j}");
                        let token = issuer.gen_user_sig(&identifier, 60).unwrap();
                        (identifier, token)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let verifier = verifier();
    for handle in handles {
        for (identifier, token) in handle.join().unwrap() {
            assert!(verifier.verify_user_sig(&identifier, &token, NOW).is_ok());
        }
    }
}

const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789*-_";

proptest! {
    #[test]
    fn prop_round_trip(
        identifier in "[A-Za-z0-9_-]{1,32}",
        app_id in any::<u64>(),
        expire in 1i64..=10 * 365 * 86400,
        now in 0i64..=4_000_000_000,
    ) {
        let issuer = TokenIssuer::new(app_id, KEY).with_clock(FixedClock(now));
        let token = issuer.gen_user_sig(&identifier, expire).unwrap();

        let verified = TokenVerifier::new(app_id, KEY)
            .verify_user_sig(&identifier, &token, now)
            .unwrap();
        prop_assert_eq!(verified.issued_at, now);
        prop_assert_eq!(verified.expires_at, now + expire);
    }

    #[test]
    fn prop_tampered_token_is_rejected(
        index in any::<prop::sample::Index>(),
        replacement in any::<prop::sample::Index>(),
        level in 0u32..=9,
    ) {
        let token = issuer()
            .with_envelope(Envelope::new(level, 1))
            .gen_private_map_key("alice", 3600, 7, Privileges::ALL)
            .unwrap();
        let expected = inspect_user_sig_unverified(&token)
            .unwrap()
            .private_map_key
            .unwrap()
            .encode()
            .unwrap();

        let mut bytes = token.into_bytes();
        let i = index.index(bytes.len());
        let original = bytes[i];
        let candidates: Vec<u8> = TOKEN_ALPHABET.iter().copied().filter(|c| *c != original).collect();
        bytes[i] = *replacement.get(&candidates);
        let tampered = String::from_utf8(bytes).unwrap();

        let err = verifier()
            .verify_user_sig_with_buf("alice", &tampered, NOW, &expected)
            .unwrap_err();
        prop_assert!(
            matches!(err, UserSigError::Malformed { .. } | UserSigError::SignatureMismatch),
            "unexpected error: {}",
            err
        );
    }

    #[test]
    fn prop_signing_is_deterministic(
        identifier in "[a-z]{1,16}",
        user_buf in prop::option::of(prop::collection::vec(any::<u8>(), 0..64)),
    ) {
        let issue = || match &user_buf {
            Some(buf) => issuer().gen_user_sig_with_buf(&identifier, 60, buf),
            None => issuer().gen_user_sig(&identifier, 60),
        };
        let first = Envelope::unpack(&issue().unwrap()).unwrap();
        let second = Envelope::unpack(&issue().unwrap()).unwrap();
        prop_assert_eq!(first.sig, second.sig);
    }
}
