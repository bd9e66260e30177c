mod context;
mod errors;
mod gateway;
mod schemas;

use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use log::info;
use matinee_collab::{Hub, RoomStore};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use context::ServerContext;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9070;

pub(crate) type Router<S> = axum::Router<ServerContext<S>>;

/// Starts the matinee server
pub async fn run_server<S>(hub: Arc<Hub<S>>)
where
    S: RoomStore,
{
    let port = env::var("MATINEE_SERVER_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let context = ServerContext { hub };

    let version_one_router = Router::new().merge(gateway::router());

    let root_router = Router::new()
        .nest("/v1", version_one_router)
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    info!("Listening on port {}", port);

    axum::serve(listener, root_router.into_make_service())
        .await
        .expect("server runs");
}
