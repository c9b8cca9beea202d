// # Advert Source Trait
//
// Defines the interface for retrieving the raw advert configuration.
//
// ## Implementations
//
// - HTTP: `advert-source-http` crate
//
// ## Usage
//
// ```rust,ignore
// use advert_core::{AdvertLoader, AdvertSource};
//
// #[tokio::main]
// async fn main() {
//     let source = /* AdvertSource implementation */;
//     let loader = AdvertLoader::new(Box::new(source));
//
//     // Never fails: errors are logged and an empty list returned
//     let adverts = loader.fetch_adverts().await;
//     println!("{} adverts", adverts.len());
// }
// ```

use async_trait::async_trait;

/// Trait for advert configuration sources
///
/// Sources only transport data. They do not validate entries; that is the
/// job of [`AdvertFactory`](crate::factory::AdvertFactory).
#[async_trait]
pub trait AdvertSource: Send + Sync {
    /// Fetch the raw configuration payload
    ///
    /// # Returns
    ///
    /// - `Ok(Value)`: the decoded JSON body of a successful response
    /// - `Err(Error::Transport)`: network failure or non-2xx status
    /// - `Err(Error::UnexpectedPayload)`: the body was not JSON
    async fn fetch_raw(&self) -> Result<serde_json::Value, crate::Error>;

    /// Name used in log messages
    fn source_name(&self) -> &'static str {
        "unknown"
    }
}
