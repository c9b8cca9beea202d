//! Page bootstrap
//!
//! Wires the pieces together the way a page load does: fetch the adverts,
//! mount one slot per advert, then start the auction and define the tags.

use tracing::info;

use crate::loader::AdvertLoader;
use crate::model::Advert;
use crate::service::AdvertService;
use crate::slot::{AdvertEnvironment, AdvertSlot};

/// Everything a page needs to show its adverts
pub struct AdvertPage {
    env: AdvertEnvironment,
    service: AdvertService,
}

impl AdvertPage {
    pub fn new(env: AdvertEnvironment, service: AdvertService) -> Self {
        Self { env, service }
    }

    /// Mount a slot per advert and drive both SDKs
    ///
    /// Returns the mounted slots, in advert order.
    pub fn render(&self, adverts: &[Advert]) -> Vec<AdvertSlot> {
        let slots: Vec<AdvertSlot> = adverts
            .iter()
            .cloned()
            .map(|advert| AdvertSlot::new(advert, self.env.clone()))
            .collect();

        for slot in &slots {
            slot.render_to_dom();
        }

        self.service
            .request_bids(adverts.iter().map(Advert::to_ad_unit).collect());
        self.service.set_page_options(adverts);

        info!("Rendered {} advert slots", slots.len());
        slots
    }

    /// Fetch the configuration, then [`AdvertPage::render`] it
    ///
    /// A failed fetch renders nothing.
    pub async fn load(&self, loader: &AdvertLoader) -> Vec<AdvertSlot> {
        let adverts = loader.fetch_adverts().await;
        self.render(&adverts)
    }
}
