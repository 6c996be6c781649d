use crate::db;
use anyhow::Context;
use anyhow::Result;
use diesel::r2d2::ConnectionManager;
use diesel::r2d2::Pool;
use diesel::PgConnection;
use time::Duration;

/// A template the LSP derives [`lsp_commons::OpeningFeeParams`] from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeParamsSetting {
    /// How long a promise made from this setting stays valid after it was issued.
    pub validity: Duration,
    pub min_fee_msat: u64,
    pub proportional: u32,
    /// Becomes the `min_lifetime` of the offered params.
    pub max_idle_time: u32,
    pub max_client_to_self_delay: u32,
}

/// Source of the fee params settings configured per client token.
pub trait FeeParamsSettingsStore {
    /// All settings configured for `token`, in no particular order.
    fn get_fee_params_settings(&self, token: &str) -> Result<Vec<FeeParamsSetting>>;
}

impl FeeParamsSettingsStore for Pool<ConnectionManager<PgConnection>> {
    fn get_fee_params_settings(&self, token: &str) -> Result<Vec<FeeParamsSetting>> {
        let mut conn = self.get().context("Failed to get connection")?;

        let settings = db::opening_fee_params_settings::get_by_token(&mut conn, token)
            .context("Failed to load opening fee params settings")?;

        settings
            .into_iter()
            .map(FeeParamsSetting::try_from)
            .collect()
    }
}
