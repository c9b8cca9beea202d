// # advertd - headless advert runner
//
// Thin integration layer: everything about adverts lives in advert-core.
//
// The runner is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Fetching the advert configuration over HTTP
// 4. Rendering every advert into an in-memory page and driving both SDKs
// 5. Printing what the SDKs were asked to do, then closing every slot
//
// ## Configuration
//
// - `ADVERT_API_URL`: Advert configuration endpoint
// - `ADVERT_MEMBER_ID`: Member id passed in the tag page options
// - `ADVERT_BID_TIMEOUT_MS`: Bid request timeout in milliseconds
// - `ADVERT_REQUEST_TIMEOUT_SECS`: HTTP timeout for the configuration fetch
// - `ADVERT_LOG_LEVEL`: trace, debug, info, warn or error
//
// ## Example
//
// ```bash
// export ADVERT_API_URL=https://60bcfd7fb8ab3700175a005b.mockapi.io/eg/ads
// export ADVERT_LOG_LEVEL=debug
//
// advertd
// ```

use advert_core::sdk::{BiddingCall, TagCall};
use advert_core::{
    AdvertConfig, AdvertEnvironment, AdvertLoader, AdvertPage, AdvertService, AdvertSlot,
    MemoryBiddingSdk, MemoryDocument, MemoryTagSdk, TokioScheduler,
};
use advert_source_http::HttpAdvertSource;
use anyhow::{Context, Result};
use serde_json::json;
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum AdvertExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<AdvertExitCode> for ExitCode {
    fn from(code: AdvertExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    advert: AdvertConfig,
    log_level: String,
}

/// Parse an optional numeric variable, keeping `default` when unset
fn env_number<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number. Got: {}", name, value)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let defaults = AdvertConfig::default();

        Ok(Self {
            advert: AdvertConfig {
                api_url: env::var("ADVERT_API_URL").unwrap_or(defaults.api_url),
                member_id: env_number("ADVERT_MEMBER_ID", defaults.member_id)?,
                bid_timeout_ms: env_number("ADVERT_BID_TIMEOUT_MS", defaults.bid_timeout_ms)?,
                request_timeout_secs: env_number(
                    "ADVERT_REQUEST_TIMEOUT_SECS",
                    defaults.request_timeout_secs,
                )?,
            },
            log_level: env::var("ADVERT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.advert.validate()?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "ADVERT_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        if self.advert.api_url.starts_with("http://") {
            eprintln!("WARNING: ADVERT_API_URL uses HTTP (not HTTPS).");
        }

        Ok(())
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return AdvertExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return AdvertExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return AdvertExitCode::ConfigError.into();
    }

    info!("Starting advertd");
    info!("Advert configuration endpoint: {}", config.advert.api_url);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return AdvertExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run(config).await {
            error!("Runtime error: {}", e);
            AdvertExitCode::RuntimeError
        } else {
            AdvertExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Render the configured adverts into a headless page
async fn run(config: Config) -> Result<()> {
    let source = HttpAdvertSource::from_config(&config.advert)?;
    let loader = AdvertLoader::new(Box::new(source));

    let document = Arc::new(MemoryDocument::new());
    let bidding = Arc::new(MemoryBiddingSdk::ready());
    let tags = Arc::new(MemoryTagSdk::ready());
    let scheduler = Arc::new(TokioScheduler::new());

    let env = AdvertEnvironment::new(document.clone(), tags.clone(), scheduler);
    let service = AdvertService::new(bidding.clone(), tags.clone(), &config.advert);
    let page = AdvertPage::new(env, service);

    let slots = page.load(&loader).await;
    document.flush_until_idle();

    if slots.is_empty() {
        warn!("No adverts to render");
    }

    let report = json!({
        "slots": slots.iter().map(describe_slot).collect::<Vec<_>>(),
        "adUnits": bidding.calls().into_iter().find_map(|call| match call {
            BiddingCall::RequestBids { ad_units, .. } => Some(ad_units),
            _ => None,
        }),
        "tags": tags.calls().into_iter().filter_map(|call| match call {
            TagCall::DefineTag(tag) => Some(tag),
            _ => None,
        }).collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    for slot in &slots {
        slot.close();
    }
    info!("Closed {} advert slots", slots.len());

    Ok(())
}

fn describe_slot(slot: &AdvertSlot) -> serde_json::Value {
    let behaviors = slot.behaviors();
    json!({
        "id": slot.id(),
        "position": slot.advert().position.as_str(),
        "closeButton": behaviors.close_button,
        "refreshButton": behaviors.refresh_button,
        "autoRefresh": behaviors.auto_refresh,
    })
}
