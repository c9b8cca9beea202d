//! Advert loader
//!
//! Fetches the raw configuration from an [`AdvertSource`] and validates it
//! into [`Advert`]s. A bad payload must never break the page, so
//! [`AdvertLoader::fetch_adverts`] logs every failure and degrades to an
//! empty list. One attempt per call; no retry.

use tracing::{error, info, warn};

use crate::error::Result;
use crate::factory::AdvertFactory;
use crate::model::Advert;
use crate::traits::AdvertSource;

/// Fetch adapter: source + validating factory
pub struct AdvertLoader {
    source: Box<dyn AdvertSource>,
    factory: AdvertFactory,
}

impl AdvertLoader {
    pub fn new(source: Box<dyn AdvertSource>) -> Self {
        Self {
            source,
            factory: AdvertFactory::new(),
        }
    }

    /// Fetch and validate, propagating the first error
    ///
    /// # Errors
    ///
    /// - Transport errors from the source
    /// - [`Error::UnexpectedPayload`](crate::Error::UnexpectedPayload) when
    ///   the body is not an array
    /// - The validation error of the first bad entry
    pub async fn try_fetch_adverts(&self) -> Result<Vec<Advert>> {
        let raw = self.source.fetch_raw().await?;
        self.factory.from_batch(&raw)
    }

    /// Fetch and validate, returning an empty list on any failure
    pub async fn fetch_adverts(&self) -> Vec<Advert> {
        match self.try_fetch_adverts().await {
            Ok(adverts) => {
                info!(
                    "Loaded {} adverts from {}",
                    adverts.len(),
                    self.source.source_name()
                );
                adverts
            }
            Err(e) => {
                warn!(
                    "Failed to download data from the API. Errors will be swallowed so as not to interrupt the page"
                );
                error!("Advert fetch from {} failed: {}", self.source.source_name(), e);
                Vec::new()
            }
        }
    }
}
