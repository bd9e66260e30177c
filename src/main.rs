use std::sync::Arc;

use log::info;
use matinee_collab::{Hub, MemoryStore};

mod logging;

#[tokio::main]
async fn main() {
    logging::init_logger();

    info!("Starting matinee...");

    let hub = Arc::new(Hub::new(MemoryStore::new()));

    matinee_server::run_server(hub).await
}
