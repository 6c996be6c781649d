use crate::opening_service::MenuError;
use crate::opening_service::OpeningService;
use crate::store::FeeParamsSettingsStore;
use crate::AppError;
use axum::extract::State;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use lsp_commons::OpeningFeeParams;
use secp256k1::PublicKey;
use secp256k1::SecretKey;
use secp256k1::SECP256K1;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tracing::instrument;

pub struct AppState<S> {
    pub opening_service: OpeningService<S>,
    secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl<S> AppState<S> {
    pub fn new(opening_service: OpeningService<S>, secret_key: SecretKey) -> Self {
        Self {
            opening_service,
            public_key: secret_key.public_key(SECP256K1),
            secret_key,
        }
    }
}

pub fn router<S>(app_state: Arc<AppState<S>>) -> Router
where
    S: FeeParamsSettingsStore + Send + Sync + 'static,
{
    Router::new()
        .route("/api/lsp/info", get(get_lsp_info::<S>))
        .route("/api/opening_fee_params", post(post_opening_fee_params::<S>))
        .route("/health", get(get_health))
        .with_state(app_state)
}

pub async fn get_health() -> Result<Json<String>, AppError> {
    Ok(Json("Server is healthy".to_string()))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LspInfo {
    /// The key promises are made with.
    pub pubkey: PublicKey,
}

pub async fn get_lsp_info<S>(State(state): State<Arc<AppState<S>>>) -> Json<LspInfo> {
    Json(LspInfo {
        pubkey: state.public_key,
    })
}

#[derive(Debug, Deserialize)]
pub struct OpeningFeeParamsRequest {
    pub token: String,
}

#[instrument(skip_all, err(Debug))]
pub async fn post_opening_fee_params<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<OpeningFeeParamsRequest>,
) -> Result<Json<Vec<OpeningFeeParams>>, AppError>
where
    S: FeeParamsSettingsStore + Send + Sync + 'static,
{
    let menu = spawn_blocking(move || {
        state
            .opening_service
            .get_fee_params_menu(&request.token, &state.secret_key)
    })
    .await
    .map_err(|e| {
        tracing::error!("Failed to build menu: {e:#}");
        AppError::InternalServerError("Failed to get opening_fee_params".to_string())
    })?
    .map_err(|e| match e {
        MenuError::Unavailable => AppError::ServiceUnavailable(e.to_string()),
        MenuError::Promise(_) => {
            AppError::InternalServerError("Failed to get opening_fee_params".to_string())
        }
    })?;

    Ok(Json(menu))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FeeParamsSetting;
    use anyhow::bail;
    use anyhow::Result;
    use axum::body::Body;
    use axum::http::Request;
    use axum::http::StatusCode;
    use lsp_commons::verify_promise;
    use time::Duration;
    use tower::ServiceExt;

    struct StaticStore(Vec<FeeParamsSetting>);

    impl FeeParamsSettingsStore for StaticStore {
        fn get_fee_params_settings(&self, token: &str) -> Result<Vec<FeeParamsSetting>> {
            if token == "panic-token" {
                panic!("store poisoned");
            }

            if token != "valid-token" {
                bail!("unknown token {token}");
            }

            Ok(self.0.clone())
        }
    }

    fn app_state() -> Arc<AppState<StaticStore>> {
        let secret_key = SecretKey::from_slice(&[
            32, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23,
            24, 25, 26, 27, 27, 29, 30, 31,
        ])
        .unwrap();

        let store = StaticStore(vec![FeeParamsSetting {
            validity: Duration::minutes(10),
            min_fee_msat: 2_000_000,
            proportional: 4_000,
            max_idle_time: 4_320,
            max_client_to_self_delay: 2_016,
        }]);

        Arc::new(AppState::new(OpeningService::new(store), secret_key))
    }

    #[tokio::test]
    async fn menu_is_signed_by_advertised_key() {
        let state = app_state();

        let Json(info) = get_lsp_info(State(state.clone())).await;
        let Json(menu) = post_opening_fee_params(
            State(state),
            Json(OpeningFeeParamsRequest {
                token: "valid-token".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(menu.len(), 1);
        verify_promise(&info.pubkey, &menu[0]).unwrap();
    }

    #[tokio::test]
    async fn store_failure_is_service_unavailable() {
        let result = post_opening_fee_params(
            State(app_state()),
            Json(OpeningFeeParamsRequest {
                token: "other-token".to_string(),
            }),
        )
        .await;

        match result {
            Err(AppError::ServiceUnavailable(msg)) => {
                assert_eq!(msg, "Failed to get opening_fee_params")
            }
            _ => panic!("Expected service unavailable"),
        }
    }

    #[tokio::test]
    async fn crashed_menu_build_hides_cause() {
        let result = post_opening_fee_params(
            State(app_state()),
            Json(OpeningFeeParamsRequest {
                token: "panic-token".to_string(),
            }),
        )
        .await;

        match result {
            Err(AppError::InternalServerError(msg)) => {
                assert_eq!(msg, "Failed to get opening_fee_params")
            }
            _ => panic!("Expected internal server error"),
        }
    }

    #[tokio::test]
    async fn only_lsp_routes_are_served() {
        let request = |uri: &str| Request::builder().uri(uri).body(Body::empty()).unwrap();

        let response = router(app_state()).oneshot(request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router(app_state())
            .oneshot(request("/api/lsp/info"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router(app_state())
            .oneshot(request("/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
