pub mod handlers;

use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method};
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use ferry_core::metadata::{HEADER_COMPRESSION, HEADER_FILENAME, HEADER_FILE_SIZE, UPLOAD_PATH};

pub use handlers::ApiState;

/// Build the upload router. Anything other than `POST /upload` gets a JSON 404.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(HEADER_FILENAME),
            HeaderName::from_static(HEADER_FILE_SIZE),
            HeaderName::from_static(HEADER_COMPRESSION),
        ]);

    Router::new()
        .route(
            UPLOAD_PATH,
            post(handlers::upload::handle_upload)
                .fallback(handlers::not_found)
                .layer(DefaultBodyLimit::disable()),
        )
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(cors)
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(state: ApiState, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(%addr, upload_path = UPLOAD_PATH, "upload server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("upload server stopped");
    Ok(())
}
