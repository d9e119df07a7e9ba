use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::core::config::Config;
use crate::storage::database::Database;
use crate::storage::repositories::{
    ForumRepository, PostRepository, ServiceRepository, ThreadRepository, UserRepository,
    VoteRepository,
};
use crate::web::routes;

pub struct App {
    config: Config,
    state: Arc<AppState>,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing application components");

        // Initialize database
        let db = Arc::new(Database::new(&config.database).await?);

        // Run migrations
        db.migrate().await?;

        let state = Arc::new(AppState::new(db));

        Ok(Self { config, state })
    }

    pub async fn run(self) -> Result<()> {
        let app = routes::create_router(self.state);

        let host: std::net::IpAddr = self.config.server.host.parse()?;
        let addr = SocketAddr::from((host, self.config.server.port));
        info!("Server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server shutdown complete");
        Ok(())
    }
}

pub struct AppState {
    pub db: Arc<Database>,
    pub users: UserRepository,
    pub forums: ForumRepository,
    pub threads: ThreadRepository,
    pub posts: PostRepository,
    pub votes: VoteRepository,
    pub service: ServiceRepository,
}

impl AppState {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            users: UserRepository::new(Arc::clone(&db)),
            forums: ForumRepository::new(Arc::clone(&db)),
            threads: ThreadRepository::new(Arc::clone(&db)),
            posts: PostRepository::new(Arc::clone(&db)),
            votes: VoteRepository::new(Arc::clone(&db)),
            service: ServiceRepository::new(Arc::clone(&db)),
            db,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown"),
        _ = terminate => info!("Received SIGTERM, starting shutdown"),
    }
}
