use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tower_livereload::LiveReloadLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vxs_router::RouteTree;
use vxs_server::{
    app, scan_routes, BuildInfo, Config, DataRenderer, DispatcherOptions, RequestDispatcher, RouteHandlers,
    RouteWatcher, StaticModules,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load_default().unwrap_or_else(|e| {
        warn!("Failed to load config: {:#}, using defaults", e);
        Config::default()
    });
    info!(
        port = config.server.port,
        routes = %config.routing.routes_dir,
        dev = config.is_dev(),
        "vxs starting"
    );

    let files = scan_routes(Path::new(&config.routing.routes_dir)).unwrap_or_else(|e| {
        error!("Failed to scan routes: {}", e);
        Vec::new()
    });
    let tree = RouteTree::build(files, config.tree_options());
    for skipped in tree.skipped() {
        error!(file = %skipped.file(), "Skipped route: {}", skipped);
    }
    info!(
        pages = tree.manifest().page_routes.len(),
        api = tree.manifest().api_routes.len(),
        "Routes built"
    );

    let build_info = match BuildInfo::load(config.build_info_path()) {
        Ok(info) => info,
        Err(e) => {
            if !config.is_dev() {
                warn!("No build info at {:?}: {}", config.build_info_path(), e);
            }
            BuildInfo::from_manifest(tree.manifest())
        }
    };

    let modules = StaticModules::for_files(tree.files(), build_info);
    let handlers = RouteHandlers::new(Arc::new(modules), Arc::new(DataRenderer))
        .with_title(config.project.name.clone())
        .with_client_entry(config.build.client_entry.clone());
    let dispatcher = Arc::new(RequestDispatcher::new(
        tree.manifest().clone(),
        Arc::new(handlers),
        DispatcherOptions::from_config(&config),
    ));
    let tree = Arc::new(RwLock::new(tree));

    let mut router = app(dispatcher.clone());

    if config.is_dev() && config.dev.hot_reload {
        let livereload = LiveReloadLayer::new();
        let reloader = livereload.reloader();

        match RouteWatcher::new(&config.routing.routes_dir) {
            Ok(watcher) => {
                let mut changes = watcher.subscribe();
                tokio::spawn(async move {
                    loop {
                        match changes.recv().await {
                            Ok(_) | Err(RecvError::Lagged(_)) => reloader.reload(),
                            Err(RecvError::Closed) => break,
                        }
                    }
                });
                watcher.spawn_reloader(tree.clone(), dispatcher.clone());
                info!("Hot reload: enabled");
            }
            Err(e) => error!("Failed to create route watcher: {}", e),
        }

        router = router.layer(livereload);
    }

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, router).await.context("Server error")?;
    Ok(())
}
