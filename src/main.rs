use std::io::BufRead;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shc_core::constants::{ENV_DISPLAY_UTC_OFFSET, ENV_MAX_PAYLOAD_BYTES, ENV_VALUE_SET_PATH};
use shc_core::{
    CardStatus, CodeSystemResolver, CompactTokenDecoder, CoreConfig, DisplayOptions,
    HealthCardTokenModel,
};

/// Main entry point for the health card scanner host
///
/// Reads one scanned QR payload per line from stdin (as a barcode scanner in keyboard mode or a
/// piped file would deliver it), feeds each into a single [`HealthCardTokenModel`], and prints
/// the resulting display rows. Malformed scans are reported and the loop continues.
///
/// # Environment Variables
/// - `SHC_VALUE_SET_PATH`: optional value-set document with extra code displays
/// - `SHC_DISPLAY_UTC_OFFSET`: offset for dates carrying a time (default: local offset)
/// - `SHC_MAX_PAYLOAD_BYTES`: decompressed payload ceiling (default: 1 MiB)
///
/// # Returns
/// * `Ok(())` - When stdin is exhausted
/// * `Err(anyhow::Error)` - If configuration is invalid or stdin cannot be read
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("shc=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = CoreConfig::from_env_values(
        std::env::var(ENV_VALUE_SET_PATH).ok(),
        std::env::var(ENV_DISPLAY_UTC_OFFSET).ok(),
        std::env::var(ENV_MAX_PAYLOAD_BYTES).ok(),
    )?;

    let resolver = CodeSystemResolver::from_config(&config);
    let options = DisplayOptions::from_config(&config);
    let mut model = HealthCardTokenModel::with_decoder(CompactTokenDecoder::new(&config), None);

    tracing::info!("++ Waiting for scans on stdin");

    for line in std::io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        model.set_numeric_serialization(Some(line));
        println!("~{} JWS characters", model.jws_character_count());

        match model.status() {
            CardStatus::Valid => {
                if let Some(card) = model.health_card() {
                    println!("Issuer: {}", card.issuer);
                }
                for row in model.rows(&resolver, &options) {
                    let icon = row.icon.map_or("-", |icon| icon.as_str());
                    println!("[{}] {}", icon, row.fields.title);
                    for extra in [row.fields.subtitle, row.fields.detail].into_iter().flatten() {
                        println!("    {}", extra);
                    }
                }
            }
            CardStatus::Invalid => {
                let reason = model
                    .last_error()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                println!("Not a readable health card: {}", reason);
            }
            CardStatus::Empty => {}
        }
    }

    Ok(())
}
