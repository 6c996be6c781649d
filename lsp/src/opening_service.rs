use crate::store::FeeParamsSetting;
use crate::store::FeeParamsSettingsStore;
use anyhow::Context;
use lsp_commons::verify_promise;
use lsp_commons::OpeningFeeParams;
use secp256k1::PublicKey;
use secp256k1::SecretKey;
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Error)]
pub enum MenuError {
    /// The settings could not be loaded. The cause is only logged.
    #[error("Failed to get opening_fee_params")]
    Unavailable,
    #[error("Failed to create opening_fee_params promise: {0:#}")]
    Promise(anyhow::Error),
}

/// Issues signed [`OpeningFeeParams`] and checks the ones clients hand back to us.
///
/// Nothing about issued params is remembered, a presented promise is checked against the LSP's
/// public key only.
pub struct OpeningService<S> {
    store: S,
}

impl<S> OpeningService<S>
where
    S: FeeParamsSettingsStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The fee params configured for `token`, cheapest first.
    ///
    /// The list is sorted by `min_fee_msat` and then by `proportional`. Either every entry is
    /// signed or an error is returned.
    pub fn get_fee_params_menu(
        &self,
        token: &str,
        secret_key: &SecretKey,
    ) -> Result<Vec<OpeningFeeParams>, MenuError> {
        let settings = self.store.get_fee_params_settings(token).map_err(|e| {
            tracing::error!("Failed to fetch fee params settings: {e:#}");
            MenuError::Unavailable
        })?;

        if settings.is_empty() {
            tracing::warn!(%token, "No fee params settings found");
        }

        let mut menu = settings
            .into_iter()
            .map(|setting| signed_params(setting, secret_key))
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(|e| {
                tracing::error!("Failed to create promise: {e:#}");
                MenuError::Promise(e)
            })?;

        menu.sort_by_key(|params| (params.min_fee_msat, params.proportional));

        Ok(menu)
    }
}

impl<S> OpeningService<S> {
    /// See [`validate_opening_fee_params`].
    pub fn validate_opening_fee_params(
        &self,
        params: Option<&OpeningFeeParams>,
        public_key: &PublicKey,
    ) -> bool {
        validate_opening_fee_params(params, public_key)
    }
}

/// Whether `params` were promised by the owner of `public_key` and have not expired yet.
///
/// Why a check failed is only logged, the caller learns nothing but the outcome.
pub fn validate_opening_fee_params(
    params: Option<&OpeningFeeParams>,
    public_key: &PublicKey,
) -> bool {
    let params = match params {
        Some(params) => params,
        None => return false,
    };

    if let Err(e) = verify_promise(public_key, params) {
        tracing::debug!("Invalid opening fee params promise: {e:#}");
        return false;
    }

    let valid_until = match params.valid_until() {
        Ok(valid_until) => valid_until,
        Err(e) => {
            tracing::warn!("Failed to parse opening fee params valid_until: {e:#}");
            return false;
        }
    };

    if OffsetDateTime::now_utc() > valid_until {
        tracing::debug!(%valid_until, "Opening fee params promise expired");
        return false;
    }

    true
}

fn signed_params(
    setting: FeeParamsSetting,
    secret_key: &SecretKey,
) -> anyhow::Result<OpeningFeeParams> {
    let valid_until = OffsetDateTime::now_utc()
        .checked_add(setting.validity)
        .with_context(|| format!("Validity {:?} is out of range", setting.validity))?;

    OpeningFeeParams::new(
        setting.min_fee_msat,
        setting.proportional,
        valid_until,
        setting.max_idle_time,
        setting.max_client_to_self_delay,
    )?
    .sign(secret_key)
}
