use anyhow::Context;
use anyhow::Result;
use diesel::r2d2;
use diesel::r2d2::ConnectionManager;
use diesel::PgConnection;
use lsp::cli::Opts;
use lsp::logger;
use lsp::opening_service::OpeningService;
use lsp::routes::router;
use lsp::routes::AppState;
use lsp::run_migration;
use std::backtrace::Backtrace;
use std::sync::Arc;
use tracing::metadata::LevelFilter;

#[tokio::main]
async fn main() -> Result<()> {
    std::panic::set_hook(
        #[allow(clippy::print_stderr)]
        Box::new(|info| {
            let backtrace = Backtrace::force_capture();

            tracing::error!(%info, "Aborting after panic in task");
            eprintln!("{backtrace}");

            std::process::abort()
        }),
    );

    let opts = Opts::read();
    let http_address = opts.http_address;

    logger::init_tracing(LevelFilter::DEBUG, opts.json)?;

    let secret_key = opts.secret_key()?;

    // set up database connection pool
    let manager = ConnectionManager::<PgConnection>::new(opts.database.clone());
    let pool = r2d2::Pool::builder()
        .build(manager)
        .context("Failed to create pool")?;

    let mut conn = pool.get()?;
    run_migration(&mut conn)?;

    let app_state = Arc::new(AppState::new(OpeningService::new(pool), secret_key));
    tracing::info!(pubkey = %app_state.public_key, "Signing opening fee params promises");

    let app = router(app_state);

    tracing::debug!("Listening on http://{}", http_address);

    axum::Server::bind(&http_address)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
