use anyhow::Context;
use rust_decimal_macros::dec;
use tokio::signal;
use tracing::info;
use uuid::Uuid;

use storefront_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    let bind_addr = cfg.bind_addr();
    let (state, event_rx) = api::AppState::new(cfg).context("failed to build services")?;

    tokio::spawn(api::events::process_events(event_rx));

    if !state.config.is_production() {
        seed_demo_catalog(&state.catalog);
    }

    let router = api::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

/// Development-only product seed so the checkout flow is exercisable out of
/// the box. Production catalogs are loaded by the catalog management side.
fn seed_demo_catalog(catalog: &api::services::catalog::CatalogService) {
    let products = [
        ("Super Muesli Nut & Seeds", dec!(510), 120),
        ("Dark Chocolate Chunky Peanut Butter", dec!(680), 85),
        ("High Protein Rolled Oats", dec!(449), 200),
        ("Creamy Stone-Ground Almond Butter", dec!(899), 5),
    ];
    for (name, price, stock) in products {
        catalog.upsert(api::models::Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            stock,
        });
    }
    info!("Seeded {} demo products", products.len());
}
