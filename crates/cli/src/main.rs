use clap::{Parser, Subcommand};
use shc_core::config::{parse_utc_offset, CoreConfig};
use shc_core::constants::{
    ENV_DISPLAY_UTC_OFFSET, ENV_ISSUER_KEYS, ENV_MAX_PAYLOAD_BYTES, ENV_VALUE_SET_PATH,
};
use shc_core::{
    estimate_char_count, numeric, CardStatus, CodeSystemResolver, CompactToken,
    CompactTokenDecoder, DisplayOptions, HealthCardTokenModel,
};
use shc_keys::IssuerKeySet;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shc")]
#[command(about = "SMART Health Card decoder")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the JWS header, payload and signature size
    Decode {
        /// QR text (`shc:/...`), bare digits, compact JWS, or `-` for stdin
        input: String,
    },
    /// Print one display row per clinical resource
    Show {
        /// QR text (`shc:/...`), bare digits, or `-` for stdin
        input: String,
        /// Value-set document (JSON or YAML) with extra code displays
        #[arg(long)]
        value_set: Option<PathBuf>,
        /// UTC offset for dates with a time, e.g. +01:00 or Z
        #[arg(long)]
        utc_offset: Option<String>,
    },
    /// Numerically encode a compact JWS as QR text
    Encode {
        /// Compact JWS, or `-` for stdin
        jws: String,
    },
    /// Verify the card signature against an issuer JWK Set
    Verify {
        /// QR text (`shc:/...`), bare digits, or `-` for stdin
        input: String,
        /// Issuer JWK Set file (defaults to SHC_ISSUER_KEYS)
        #[arg(long)]
        keys: Option<PathBuf>,
    },
    /// Estimate the JWS length carried by a numeric serialization
    Estimate {
        /// QR text (`shc:/...`), bare digits, or `-` for stdin
        input: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("shc=warn".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = CoreConfig::from_env_values(
        env_value(ENV_VALUE_SET_PATH),
        env_value(ENV_DISPLAY_UTC_OFFSET),
        env_value(ENV_MAX_PAYLOAD_BYTES),
    )?;

    match cli.command {
        Some(Commands::Decode { input }) => {
            let input = read_input(input)?;
            let decoder = CompactTokenDecoder::new(&config);
            let token = if input.contains('.') {
                decoder.parse(input.trim())?
            } else {
                decoder.decode_qr(&input)?
            };
            print_token(&token)?;
        }
        Some(Commands::Show {
            input,
            value_set,
            utc_offset,
        }) => {
            let input = read_input(input)?;
            let offset = match utc_offset {
                Some(value) => parse_utc_offset(&value)?,
                None => config.display_offset(),
            };
            let value_set = value_set.or_else(|| config.value_set_path().map(PathBuf::from));
            let config = CoreConfig::new(value_set, offset, config.max_payload_bytes())?;

            let model = decode_model(&config, input)?;
            let resolver = CodeSystemResolver::from_config(&config);
            let rows = model.rows(&resolver, &DisplayOptions::from_config(&config));
            if rows.is_empty() {
                println!("No resources found.");
            }
            for row in rows {
                let icon = row.icon.map_or("-", |icon| icon.as_str());
                println!("[{}] {}", icon, row.fields.title);
                if let Some(subtitle) = row.fields.subtitle {
                    println!("    {}", subtitle);
                }
                if let Some(detail) = row.fields.detail {
                    println!("    {}", detail);
                }
            }
        }
        Some(Commands::Encode { jws }) => {
            let jws = read_input(jws)?;
            println!("{}", numeric::to_qr_text(jws.trim())?);
        }
        Some(Commands::Verify { input, keys }) => {
            let input = read_input(input)?;
            let keys = keys
                .or_else(|| env_value(ENV_ISSUER_KEYS).map(PathBuf::from))
                .ok_or("no key set given (use --keys or SHC_ISSUER_KEYS)")?;
            let key_set = IssuerKeySet::from_file(&keys)?;

            let model = decode_model(&config, input)?;
            if model.verify_with(&key_set)? {
                println!("verified");
            } else {
                println!("signature invalid");
                std::process::exit(1);
            }
        }
        Some(Commands::Estimate { input }) => {
            let input = read_input(input)?;
            let digits = numeric::strip_scheme(&input)?;
            println!("{}", estimate_char_count(Some(digits.len())));
        }
        None => {
            println!("Use 'shc --help' for commands");
        }
    }

    Ok(())
}

fn decode_model(
    config: &CoreConfig,
    input: String,
) -> Result<HealthCardTokenModel, Box<dyn std::error::Error>> {
    let model =
        HealthCardTokenModel::with_decoder(CompactTokenDecoder::new(config), Some(input));
    match (model.status(), model.last_error()) {
        (CardStatus::Valid, _) => Ok(model),
        (_, Some(err)) => Err(format!("could not decode health card: {err}").into()),
        (_, None) => Err("could not decode health card".into()),
    }
}

fn print_token(token: &CompactToken) -> Result<(), Box<dyn std::error::Error>> {
    println!("header: {}", serde_json::to_string(token.header())?);
    match serde_json::from_slice::<serde_json::Value>(token.payload()) {
        Ok(payload) => println!("payload:\n{}", serde_json::to_string_pretty(&payload)?),
        Err(_) => println!("payload: {}", String::from_utf8_lossy(token.payload())),
    }
    println!("signature: {} bytes", token.signature().len());

    if let Ok(card) = fhir::HealthCard::from_slice(token.payload()) {
        println!("issuer: {}", card.issuer);
        if let Some(issued_at) = card.issued_at {
            println!("issued: {}", issued_at.to_rfc3339());
        }
        println!("resources: {}", card.resources().count());
    }
    Ok(())
}

fn read_input(input: String) -> std::io::Result<String> {
    if input != "-" {
        return Ok(input);
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf.trim().to_string())
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
