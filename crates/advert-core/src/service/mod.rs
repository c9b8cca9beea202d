//! Advert service
//!
//! Drives the two advertising SDKs through their ready queues:
//!
//! ```text
//! request_bids ──▶ bidding queue: request_bids(ad units, timeout)
//!                                    │ bids back
//!                                    ▼
//!                  init_ad_server ──▶ bidding queue ──▶ tag queue:
//!                                          set_targeting_for_ast, load_tags
//!
//! set_page_options ──▶ tag queue: set_page_opts, define_tag × N
//! ```
//!
//! Both queues are FIFO and only ever appended to; each runs its commands
//! once its SDK has loaded.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::AdvertConfig;
use crate::model::{AdUnit, Advert, PageOptions};
use crate::traits::{BiddingSdk, TagSdk};

/// Sequences calls into the bidding and tag-rendering SDKs
#[derive(Clone)]
pub struct AdvertService {
    bidding: Arc<dyn BiddingSdk>,
    tags: Arc<dyn TagSdk>,
    member_id: u64,
    bid_timeout: Duration,
}

impl AdvertService {
    /// Create a service using the page options and timeout from `config`
    pub fn new(bidding: Arc<dyn BiddingSdk>, tags: Arc<dyn TagSdk>, config: &AdvertConfig) -> Self {
        Self {
            bidding,
            tags,
            member_id: config.member_id,
            bid_timeout: config.bid_timeout(),
        }
    }

    /// Request bids for the given ad units
    ///
    /// Queued on the bidding SDK; when the auction ends the ad server is
    /// initialised through [`AdvertService::init_ad_server`].
    pub fn request_bids(&self, ad_units: Vec<AdUnit>) {
        info!("Requesting bids for {} ad units", ad_units.len());

        let service = self.clone();
        self.bidding.enqueue(Box::new(move || {
            let handler = service.clone();
            service.bidding.request_bids(
                ad_units,
                service.bid_timeout,
                Box::new(move || handler.init_ad_server()),
            );
        }));
    }

    /// Hand auction results to the tag SDK and load every tag
    ///
    /// Runs at most once per page; later calls see the bidding SDK's
    /// "request sent" flag and return.
    pub fn init_ad_server(&self) {
        if self.bidding.request_sent() {
            debug!("Ad server already initialised");
            return;
        }
        self.bidding.mark_request_sent();

        let bidding = self.bidding.clone();
        let tags = self.tags.clone();
        self.bidding.enqueue(Box::new(move || {
            let loader = tags.clone();
            tags.enqueue(Box::new(move || {
                bidding.set_targeting_for_ast();
                loader.load_tags();
                info!("Ad server initialised, tags loading");
            }));
        }));
    }

    /// Set page options and define one tag per advert
    pub fn set_page_options(&self, adverts: &[Advert]) {
        let options = PageOptions {
            member: self.member_id,
        };
        let definitions: Vec<_> = adverts.iter().map(Advert::to_apn_tag).collect();
        debug!("Defining {} tags for member {}", definitions.len(), options.member);

        let tags = self.tags.clone();
        self.tags.enqueue(Box::new(move || {
            tags.set_page_opts(options);
            for definition in definitions {
                tags.define_tag(definition);
            }
        }));
    }
}
