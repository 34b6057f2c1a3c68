//! Declares the window covering, then plays the part of a controller: it opens
//! the covering halfway and drives the simulated motor until it arrives.
//!
//! ```sh
//! RUST_LOG=homekit_accessory=debug cargo run --example window_covering -- homekit.toml
//! ```

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use homekit_accessory::{
    config::Settings,
    data_model::{
        accessory::LogIdentify,
        characteristic::CharacteristicType,
        handler::EmptyHandler,
        profile::window_covering::{self, PositionState, WindowCoveringHandler},
        service::ServiceType,
    },
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("homekit_accessory=info,window_covering=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(&path)
            .with_context(|| format!("Failed to load settings from {path}"))?,
        None => Settings::default(),
    };
    let aid = settings.server.accessory_id;

    let accessory = settings
        .window_covering(Arc::new(LogIdentify))
        .context("Invalid window covering declaration")?;
    let config = settings
        .server_config(vec![accessory])
        .context("Invalid server settings or setup code")?;
    info!("Pair with setup code {}", config.setup_code);

    let handler = EmptyHandler.chain(aid, ServiceType::WindowCovering, WindowCoveringHandler);
    let dispatcher = config.into_dispatcher(handler)?.into_shared();
    let database = dispatcher.lock().registry().database();
    info!("Accessory database:\n{}", serde_json::to_string_pretty(&database)?);

    let mut events = dispatcher.lock().subscribe();
    let listener = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!("EVENT/1.0 {}", event.to_json());
        }
    });

    let (identify, target) = {
        let dispatcher = dispatcher.lock();
        let registry = dispatcher.registry();
        (
            registry.locate_in_service(
                aid,
                ServiceType::AccessoryInformation,
                CharacteristicType::Identify,
            )?,
            registry.locate_in_service(
                aid,
                ServiceType::WindowCovering,
                CharacteristicType::TargetPosition,
            )?,
        )
    };
    dispatcher
        .lock()
        .handle_write_json(identify, &serde_json::json!(true))?;
    dispatcher
        .lock()
        .handle_write_json(target, &serde_json::json!(50))
        .context("Controller write rejected")?;

    // out of range, refused without touching the covering
    if let Err(e) = dispatcher
        .lock()
        .handle_write_json(target, &serde_json::json!(150))
    {
        info!("Rejected target 150 with status {}", e.status_code() as i32);
    }

    let increment = settings.window_covering.step_percent;
    let interval = Duration::from_millis(settings.window_covering.step_interval_ms);
    loop {
        tokio::time::sleep(interval).await;
        let moving = dispatcher
            .lock()
            .with_service(aid, ServiceType::WindowCovering, |ctx| {
                window_covering::step(ctx, increment)
            })?;
        if !moving {
            break;
        }
    }

    let state = dispatcher
        .lock()
        .with_service(aid, ServiceType::WindowCovering, |ctx| Ok(PositionState::of(ctx)))?;
    info!("Covering settled, state {state:?}");

    drop(dispatcher);
    listener.await?;
    Ok(())
}
