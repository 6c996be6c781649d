use crate::schema::opening_fee_params_settings;
use crate::store::FeeParamsSetting;
use anyhow::ensure;
use anyhow::Context;
use anyhow::Result;
use diesel::ExpressionMethods;
use diesel::Insertable;
use diesel::PgConnection;
use diesel::QueryDsl;
use diesel::QueryResult;
use diesel::Queryable;
use diesel::RunQueryDsl;
use time::Duration;
use time::OffsetDateTime;

#[derive(Queryable, Debug, Clone, PartialEq)]
#[diesel(table_name = opening_fee_params_settings)]
pub(crate) struct OpeningFeeParamsSetting {
    pub id: i32,
    pub token: String,
    pub validity_secs: i64,
    pub min_fee_msat: i64,
    pub proportional: i32,
    pub max_idle_time: i32,
    pub max_client_to_self_delay: i32,
    pub created_at: OffsetDateTime,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = opening_fee_params_settings)]
struct NewOpeningFeeParamsSetting {
    token: String,
    validity_secs: i64,
    min_fee_msat: i64,
    proportional: i32,
    max_idle_time: i32,
    max_client_to_self_delay: i32,
}

pub(crate) fn get_by_token(
    conn: &mut PgConnection,
    token: &str,
) -> QueryResult<Vec<OpeningFeeParamsSetting>> {
    opening_fee_params_settings::table
        .filter(opening_fee_params_settings::token.eq(token))
        .load(conn)
}

pub fn insert(conn: &mut PgConnection, token: &str, setting: FeeParamsSetting) -> Result<()> {
    let setting = NewOpeningFeeParamsSetting::try_from((token, setting))?;

    let affected_rows = diesel::insert_into(opening_fee_params_settings::table)
        .values(setting)
        .execute(conn)?;

    ensure!(affected_rows > 0, "No opening fee params setting inserted");

    Ok(())
}

impl TryFrom<(&str, FeeParamsSetting)> for NewOpeningFeeParamsSetting {
    type Error = anyhow::Error;

    fn try_from((token, setting): (&str, FeeParamsSetting)) -> Result<Self, Self::Error> {
        let validity_secs = u32::try_from(setting.validity.whole_seconds())
            .with_context(|| format!("Invalid validity {:?}", setting.validity))?;

        Ok(Self {
            token: token.to_string(),
            validity_secs: validity_secs.into(),
            min_fee_msat: i64::try_from(setting.min_fee_msat)
                .with_context(|| format!("Invalid min_fee_msat {}", setting.min_fee_msat))?,
            proportional: i32::try_from(setting.proportional)
                .with_context(|| format!("Invalid proportional {}", setting.proportional))?,
            max_idle_time: i32::try_from(setting.max_idle_time)
                .with_context(|| format!("Invalid max_idle_time {}", setting.max_idle_time))?,
            max_client_to_self_delay: i32::try_from(setting.max_client_to_self_delay)
                .with_context(|| {
                    format!(
                        "Invalid max_client_to_self_delay {}",
                        setting.max_client_to_self_delay
                    )
                })?,
        })
    }
}

impl TryFrom<OpeningFeeParamsSetting> for FeeParamsSetting {
    type Error = anyhow::Error;

    fn try_from(value: OpeningFeeParamsSetting) -> Result<Self, Self::Error> {
        let id = value.id;

        Ok(Self {
            validity: Duration::seconds(
                u32::try_from(value.validity_secs)
                    .with_context(|| format!("Invalid validity_secs in setting {id}"))?
                    .into(),
            ),
            min_fee_msat: u64::try_from(value.min_fee_msat)
                .with_context(|| format!("Invalid min_fee_msat in setting {id}"))?,
            proportional: u32::try_from(value.proportional)
                .with_context(|| format!("Invalid proportional in setting {id}"))?,
            max_idle_time: u32::try_from(value.max_idle_time)
                .with_context(|| format!("Invalid max_idle_time in setting {id}"))?,
            max_client_to_self_delay: u32::try_from(value.max_client_to_self_delay)
                .with_context(|| format!("Invalid max_client_to_self_delay in setting {id}"))?,
        })
    }
}
