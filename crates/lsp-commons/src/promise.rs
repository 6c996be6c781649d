use crate::OpeningFeeParams;
use anyhow::bail;
use anyhow::ensure;
use anyhow::Context;
use anyhow::Result;
use secp256k1::ecdsa::RecoverableSignature;
use secp256k1::ecdsa::RecoveryId;
use secp256k1::Message;
use secp256k1::PublicKey;
use secp256k1::SecretKey;
use secp256k1::SECP256K1;
use sha2::digest::FixedOutput;
use sha2::Digest;
use sha2::Sha256;

/// Length of a compact recoverable signature: one header byte followed by `r` and `s`.
const PROMISE_LENGTH: usize = 65;

/// Header byte offset of a compact signature, as used by bitcoin message signing.
const COMPACT_HEADER_BASE: u8 = 27;

/// Added to the header byte if the signer's public key is serialized compressed.
const COMPACT_HEADER_COMPRESSED: u8 = 4;

/// SHA256 over the signed fields of the [`OpeningFeeParams`], ignoring the promise.
///
/// The fields are serialized as a JSON array in a fixed order, i.e.
/// `[min_fee_msat, proportional, valid_until, min_lifetime, max_client_to_self_delay]`, so that
/// the hash does not depend on how a JSON library orders the keys of an object.
pub fn params_hash(params: &OpeningFeeParams) -> Result<[u8; 32]> {
    let items = (
        params.min_fee_msat,
        params.proportional,
        params.valid_until.as_str(),
        params.min_lifetime,
        params.max_client_to_self_delay,
    );
    let blob = serde_json::to_vec(&items).context("Failed to serialize opening fee params")?;

    let hash = Sha256::new().chain_update(blob).finalize_fixed();

    Ok(hash.into())
}

/// Signs the [`params_hash`] of the params and returns the hex-encoded compact signature.
pub fn create_promise(secret_key: &SecretKey, params: &OpeningFeeParams) -> Result<String> {
    let message = sign_message(params).map_err(|e| {
        tracing::debug!("Failed to hash opening fee params: {e:#}");
        e
    })?;

    let signature = SECP256K1.sign_ecdsa_recoverable(&message, secret_key);
    let (recovery_id, signature) = signature.serialize_compact();

    let mut promise = Vec::with_capacity(PROMISE_LENGTH);
    promise.push(COMPACT_HEADER_BASE + COMPACT_HEADER_COMPRESSED + recovery_id.to_i32() as u8);
    promise.extend_from_slice(&signature);

    Ok(hex::encode(promise))
}

/// Succeeds only if the promise of the params was made by the owner of `public_key` over exactly
/// these params.
pub fn verify_promise(public_key: &PublicKey, params: &OpeningFeeParams) -> Result<()> {
    check_promise(public_key, params).map_err(|e| {
        tracing::debug!(promise = %params.promise, "Failed to verify promise: {e:#}");
        e
    })
}

fn check_promise(public_key: &PublicKey, params: &OpeningFeeParams) -> Result<()> {
    let message = sign_message(params)?;

    let promise = hex::decode(&params.promise).context("Promise is not hex")?;
    let signature = recoverable_signature(&promise)?;

    let signer = SECP256K1
        .recover_ecdsa(&message, &signature)
        .context("Failed to recover public key from promise")?;

    if signer != *public_key {
        bail!("Promise was not made by {public_key} but by {signer}");
    }

    Ok(())
}

fn recoverable_signature(promise: &[u8]) -> Result<RecoverableSignature> {
    ensure!(
        promise.len() == PROMISE_LENGTH,
        "Promise has invalid length {}",
        promise.len()
    );

    let header = promise[0];
    ensure!(
        (COMPACT_HEADER_BASE..COMPACT_HEADER_BASE + 2 * COMPACT_HEADER_COMPRESSED).contains(&header),
        "Promise has invalid header byte {header}"
    );

    let recovery_id = (header - COMPACT_HEADER_BASE) & !COMPACT_HEADER_COMPRESSED;
    let recovery_id = RecoveryId::from_i32(recovery_id as i32)?;

    let signature = RecoverableSignature::from_compact(&promise[1..], recovery_id)
        .context("Promise is not a valid signature")?;

    Ok(signature)
}

fn sign_message(params: &OpeningFeeParams) -> Result<Message> {
    let hash = params_hash(params)?;

    let message =
        Message::from_slice(&hash).expect("A sha256 hash always has the length of a message");
    Ok(message)
}
