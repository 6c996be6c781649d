use crate::promise::create_promise;
use anyhow::Context;
use anyhow::Result;
use secp256k1::SecretKey;
use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::UtcOffset;

/// The layout `valid_until` is written in, e.g. `2023-05-11T10:00:00.000Z`.
///
/// Always UTC with exactly three fractional digits.
pub const VALID_UNTIL_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

/// Accepts any number of fractional digits, as written by producers that trim trailing zeros.
const VALID_UNTIL_PARSE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]Z");

const VALID_UNTIL_PARSE_FORMAT_NO_FRACTION: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// The channel opening fee terms offered to a client.
///
/// The `promise` is a signature over the other five fields made with the LSP's node key, which
/// lets the LSP accept the terms later on without having to remember that it offered them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningFeeParams {
    #[serde(deserialize_with = "string_as_u64", serialize_with = "u64_as_string")]
    pub min_fee_msat: u64,
    /// Fee in parts per million of the channel size.
    pub proportional: u32,
    /// See [`VALID_UNTIL_FORMAT`].
    pub valid_until: String,
    /// Number of blocks the channel is guaranteed to stay open.
    pub min_lifetime: u32,
    pub max_client_to_self_delay: u32,
    /// Hex-encoded, empty if the params have not been signed yet.
    #[serde(default)]
    pub promise: String,
}

impl OpeningFeeParams {
    /// Unsigned params expiring at `valid_until`.
    pub fn new(
        min_fee_msat: u64,
        proportional: u32,
        valid_until: OffsetDateTime,
        min_lifetime: u32,
        max_client_to_self_delay: u32,
    ) -> Result<Self> {
        Ok(Self {
            min_fee_msat,
            proportional,
            valid_until: format_valid_until(valid_until)?,
            min_lifetime,
            max_client_to_self_delay,
            promise: String::new(),
        })
    }

    /// Attaches a promise made with `secret_key`, replacing any previous one.
    pub fn sign(mut self, secret_key: &SecretKey) -> Result<Self> {
        self.promise = create_promise(secret_key, &self)?;
        Ok(self)
    }

    pub fn is_signed(&self) -> bool {
        !self.promise.is_empty()
    }

    pub fn valid_until(&self) -> Result<OffsetDateTime> {
        parse_valid_until(&self.valid_until)
    }
}

pub fn format_valid_until(valid_until: OffsetDateTime) -> Result<String> {
    valid_until
        .to_offset(UtcOffset::UTC)
        .format(VALID_UNTIL_FORMAT)
        .with_context(|| format!("Failed to format valid_until {valid_until}"))
}

pub fn parse_valid_until(valid_until: &str) -> Result<OffsetDateTime> {
    let date_time = match PrimitiveDateTime::parse(valid_until, VALID_UNTIL_PARSE_FORMAT) {
        Ok(date_time) => date_time,
        Err(_) => PrimitiveDateTime::parse(valid_until, VALID_UNTIL_PARSE_FORMAT_NO_FRACTION)
            .with_context(|| format!("Invalid valid_until {valid_until}"))?,
    };

    Ok(date_time.assume_utc())
}

fn string_as_u64<'de, D>(de: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(de)?
        .parse()
        .map_err(serde::de::Error::custom)
}

fn u64_as_string<S>(x: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&x.to_string())
}
