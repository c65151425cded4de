use actix_web::{dev::Service, web, App, HttpServer};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feed_service::cache::{CacheStore, MemoryCacheStore, RedisCacheStore};
use feed_service::clock::SystemClock;
use feed_service::config::{CacheBackend, Config};
use feed_service::db::{self, PgIdentityProvider, PgInteractionStore, PgPostStore, PgSocialGraph};
use feed_service::handlers::{self, FeedHandlerState};
use feed_service::jobs::cache_sweeper::start_cache_sweeper;
use feed_service::upstream::memory::{
    InMemoryIdentityProvider, InMemoryInteractionStore, InMemoryPostStore, InMemorySocialGraph,
};
use feed_service::{metrics, Collaborators, FeedEngine};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting feed-service v{}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.env);

    let clock = Arc::new(SystemClock);

    let deps = match &config.database {
        Some(db_cfg) => {
            let pool = match db::create_pool(db_cfg).await {
                Ok(pool) => pool,
                Err(e) => {
                    tracing::error!("Database pool creation failed: {:#}", e);
                    eprintln!("ERROR: Failed to create database pool: {}", e);
                    std::process::exit(1);
                }
            };
            info!("Using PostgreSQL collaborators");
            Collaborators {
                graph: Arc::new(PgSocialGraph::new(pool.clone())),
                posts: Arc::new(PgPostStore::new(pool.clone())),
                identity: Arc::new(PgIdentityProvider::new(pool.clone())),
                interactions: Arc::new(PgInteractionStore::new(pool)),
                cache: cache_store(&config).await,
                clock,
            }
        }
        None => {
            warn!("DATABASE_URL not set, running on in-memory collaborators");
            Collaborators {
                graph: Arc::new(InMemorySocialGraph::new()),
                posts: Arc::new(InMemoryPostStore::new()),
                identity: Arc::new(InMemoryIdentityProvider::new()),
                interactions: Arc::new(InMemoryInteractionStore::new()),
                cache: cache_store(&config).await,
                clock,
            }
        }
    };

    let engine = Arc::new(FeedEngine::new(
        deps,
        config.ranking.clone(),
        config.upstream.clone(),
    ));

    let sweeper_cache = engine.cache().clone();
    let sweep_interval = Duration::from_secs(config.cache.sweep_interval_secs);
    tokio::spawn(async move {
        start_cache_sweeper(sweeper_cache, sweep_interval).await;
    });
    info!("Feed cache sweeper started");

    let state = web::Data::new(FeedHandlerState { engine });

    info!("HTTP server listening on 0.0.0.0:{}", config.app.port);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .wrap_fn(|req, srv| {
                let method = req.method().to_string();
                let path = req
                    .match_pattern()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| req.path().to_string());
                let start = Instant::now();

                let fut = srv.call(req);
                async move {
                    match fut.await {
                        Ok(res) => {
                            metrics::observe_http_request(
                                &method,
                                &path,
                                res.status().as_u16(),
                                start.elapsed(),
                            );
                            Ok(res)
                        }
                        Err(err) => {
                            metrics::observe_http_request(&method, &path, 500, start.elapsed());
                            Err(err)
                        }
                    }
                }
            })
            .configure(handlers::configure)
    })
    .bind(format!("0.0.0.0:{}", config.app.port))?
    .run()
    .await
}

async fn cache_store(config: &Config) -> Arc<dyn CacheStore> {
    match config.cache.backend {
        CacheBackend::Memory => {
            info!("Using in-memory feed cache");
            Arc::new(MemoryCacheStore::new())
        }
        CacheBackend::Redis => match RedisCacheStore::new(&config.cache.redis_url).await {
            Ok(store) => {
                if let Err(e) = store.ping().await {
                    warn!("Redis ping failed at startup: {}", e);
                }
                info!("Using Redis feed cache");
                Arc::new(store)
            }
            Err(e) => {
                tracing::error!("Failed to connect to Redis: {}", e);
                eprintln!("ERROR: Failed to connect to Redis: {}", e);
                std::process::exit(1);
            }
        },
    }
}
