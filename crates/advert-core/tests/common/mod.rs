//! Test doubles and common utilities for advert contract tests
//!
//! Wires the in-memory document, manual scheduler and recording SDKs into a
//! page, and provides raw payload fixtures.

#![allow(dead_code)]

use advert_core::error::Result;
use advert_core::traits::{AddedNode, AdvertSource, Document, NodeId};
use advert_core::{
    Advert, AdvertConfig, AdvertEnvironment, AdvertFactory, AdvertPage, AdvertService, AdvertSlot,
    Error, ManualScheduler, MemoryBiddingSdk, MemoryDocument, MemoryTagSdk,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A raw entry shaped like the configuration API's
pub fn raw_advert(id: &str) -> Value {
    json!({
        "unit": "/19968336/header-bid-tag-2",
        "id": id,
        "sizes": [[160, 600]],
        "refresh": true,
        "positon": "left",
        "refreshSettings": { "delay": 30000, "repeat": 50 },
        "closeBtn": true,
        "bids": [{ "bidder": "appnexus", "params": { "placementId": 13144370 } }]
    })
}

/// Validate a raw entry after applying `edit`
pub fn advert_with(id: &str, edit: impl FnOnce(&mut Value)) -> Advert {
    let mut raw = raw_advert(id);
    edit(&mut raw);
    AdvertFactory::new()
        .from_data(&raw)
        .expect("fixture is well formed")
}

/// An AdvertSource replying with a fixed body or failing with a status
pub struct StaticSource {
    reply: std::result::Result<Value, u16>,
    fetch_count: Arc<AtomicUsize>,
}

impl StaticSource {
    pub fn body(body: Value) -> Self {
        Self {
            reply: Ok(body),
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            reply: Err(status),
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        self.fetch_count.clone()
    }
}

#[async_trait::async_trait]
impl AdvertSource for StaticSource {
    async fn fetch_raw(&self) -> Result<Value> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(body) => Ok(body.clone()),
            Err(status) => Err(Error::transport(format!("HTTP error: {}", status))),
        }
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

/// In-memory page: document, timers and both SDKs
pub struct TestPage {
    pub document: Arc<MemoryDocument>,
    pub scheduler: Arc<ManualScheduler>,
    pub bidding: Arc<MemoryBiddingSdk>,
    pub tags: Arc<MemoryTagSdk>,
}

impl TestPage {
    /// Both SDKs loaded, auctions completing immediately
    pub fn ready() -> Self {
        Self {
            document: Arc::new(MemoryDocument::new()),
            scheduler: Arc::new(ManualScheduler::new()),
            bidding: Arc::new(MemoryBiddingSdk::ready()),
            tags: Arc::new(MemoryTagSdk::ready()),
        }
    }

    /// Both SDKs still loading
    pub fn loading() -> Self {
        Self {
            bidding: Arc::new(MemoryBiddingSdk::new()),
            tags: Arc::new(MemoryTagSdk::new()),
            ..Self::ready()
        }
    }

    pub fn env(&self) -> AdvertEnvironment {
        AdvertEnvironment::new(
            self.document.clone(),
            self.tags.clone(),
            self.scheduler.clone(),
        )
    }

    pub fn service(&self) -> AdvertService {
        AdvertService::new(self.bidding.clone(), self.tags.clone(), &AdvertConfig::default())
    }

    pub fn page(&self) -> AdvertPage {
        AdvertPage::new(self.env(), self.service())
    }

    pub fn mount(&self, advert: Advert) -> AdvertSlot {
        let slot = AdvertSlot::new(advert, self.env());
        slot.render_to_dom();
        slot
    }

    /// What the tag SDK does on every (re)load: swap in a fresh creative
    pub fn deliver_creative(&self, slot: &AdvertSlot) -> NodeId {
        let content = slot.content().expect("slot is mounted");
        let creative = self.document.create_element("iframe");
        self.document
            .set_id(creative, &format!("utif_{}", slot.id()));
        self.document.replace_children(content, vec![creative]);
        self.document.flush_until_idle();
        creative
    }

    /// Ids of the content element's children, in order
    pub fn child_ids(&self, slot: &AdvertSlot) -> Vec<String> {
        let content = slot.content().expect("slot is mounted");
        self.document
            .children(content)
            .into_iter()
            .filter_map(|child| self.document.element_id(child))
            .collect()
    }

    pub fn count_id(&self, slot: &AdvertSlot, id: &str) -> usize {
        self.child_ids(slot).iter().filter(|child| *child == id).count()
    }
}

/// A foreign element as it appears in a mutation record
pub fn foreign(id: &str) -> AddedNode {
    AddedNode::element(id)
}
