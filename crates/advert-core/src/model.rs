//! Validated advert model
//!
//! Everything in this module has already passed through
//! [`AdvertFactory`](crate::factory::AdvertFactory). Raw API payloads never
//! appear here; they stay `serde_json::Value` until validated.
//!
//! The SDK-facing shapes ([`AdUnit`], [`ApnTag`], [`PageOptions`]) serialize
//! with the field names the third-party SDKs expect.

use serde::Serialize;
use std::time::Duration;

/// Where on the page an advert container is pinned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Right,
    #[default]
    Bottom,
}

impl Position {
    /// Parse one of the known position names
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }

    /// The name used in CSS classes
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Bottom => "bottom",
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An allowed creative size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdvertSize {
    pub width: u32,
    pub height: u32,
}

impl AdvertSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The `[width, height]` pair both SDKs use
    pub fn as_pair(&self) -> [u32; 2] {
        [self.width, self.height]
    }
}

/// Bidder-specific parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BidderParams {
    #[serde(rename = "placementId")]
    pub placement_id: u64,
}

/// One header-bidding participant for an advert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvertBidder {
    pub bidder: String,
    pub params: BidderParams,
}

impl AdvertBidder {
    pub fn new(bidder: impl Into<String>, placement_id: u64) -> Self {
        Self {
            bidder: bidder.into(),
            params: BidderParams { placement_id },
        }
    }

    pub fn placement_id(&self) -> u64 {
        self.params.placement_id
    }
}

/// How an advert refreshes itself, if at all
///
/// The two variants are mutually exclusive once normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RefreshSettings {
    /// Refresh on a timer, `repeat` times at most
    SelfRefreshing {
        /// Delay between refreshes (in milliseconds)
        delay: u64,
        /// Maximum number of automatic refreshes
        repeat: u32,
    },

    /// Show a manual "Refresh AD" control
    ButtonRefreshing,
}

impl RefreshSettings {
    pub fn self_refreshing(delay: u64, repeat: u32) -> Self {
        Self::SelfRefreshing { delay, repeat }
    }

    pub fn is_button(&self) -> bool {
        matches!(self, Self::ButtonRefreshing)
    }

    /// Timer delay, when self-refreshing
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Self::SelfRefreshing { delay, .. } => Some(Duration::from_millis(*delay)),
            Self::ButtonRefreshing => None,
        }
    }

    /// Repeat limit, when self-refreshing
    pub fn repeat(&self) -> Option<u32> {
        match self {
            Self::SelfRefreshing { repeat, .. } => Some(*repeat),
            Self::ButtonRefreshing => None,
        }
    }
}

/// Optional behaviours attached to a slot
///
/// Decided once from the validated fields and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Behaviors {
    pub close_button: bool,
    pub refresh_button: bool,
    pub auto_refresh: bool,
}

/// A validated advert placement
///
/// Only [`AdvertFactory`](crate::factory::AdvertFactory) builds one from raw
/// data; there is no `Deserialize` shortcut around validation:
///
/// ```compile_fail
/// let raw = serde_json::json!({ "unit": "", "id": "", "sizes": [], "bids": [] });
/// let advert: advert_core::Advert = serde_json::from_value(raw).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advert {
    /// Ad-network unit identifier (tag id)
    pub unit: String,
    /// DOM id of the element displaying the advert
    pub id: String,
    pub sizes: Vec<AdvertSize>,
    pub bids: Vec<AdvertBidder>,
    pub refresh: bool,
    pub position: Position,
    #[serde(rename = "closeBtn")]
    pub close_btn: bool,
    #[serde(rename = "refreshSettings", skip_serializing_if = "Option::is_none")]
    pub refresh_settings: Option<RefreshSettings>,
}

impl Advert {
    /// Create an advert with no optional behaviours at the bottom of the page
    pub fn new(
        unit: impl Into<String>,
        id: impl Into<String>,
        sizes: Vec<AdvertSize>,
        bids: Vec<AdvertBidder>,
    ) -> Self {
        Self {
            unit: unit.into(),
            id: id.into(),
            sizes,
            bids,
            refresh: false,
            position: Position::default(),
            close_btn: false,
            refresh_settings: None,
        }
    }

    /// Validate a raw API entry
    ///
    /// Shorthand for [`AdvertFactory::from_data`](crate::factory::AdvertFactory::from_data).
    pub fn from_data(raw: &serde_json::Value) -> crate::Result<Self> {
        crate::factory::AdvertFactory::new().from_data(raw)
    }

    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_close_button(mut self, close_btn: bool) -> Self {
        self.close_btn = close_btn;
        self
    }

    pub fn with_refresh_settings(mut self, settings: Option<RefreshSettings>) -> Self {
        self.refresh_settings = settings;
        self
    }

    /// Which controls and timers this advert gets once mounted
    pub fn behaviors(&self) -> Behaviors {
        let auto_refresh = self.refresh
            && matches!(
                self.refresh_settings,
                Some(RefreshSettings::SelfRefreshing { delay, repeat }) if delay > 0 && repeat > 0
            );

        Behaviors {
            close_button: self.close_btn,
            refresh_button: self.refresh
                && self.refresh_settings.is_some_and(|settings| settings.is_button()),
            auto_refresh,
        }
    }

    pub fn close_button_id(&self) -> String {
        format!("advert_close_button_{}", self.id)
    }

    pub fn refresh_button_id(&self) -> String {
        format!("advert_refresh_button_{}", self.id)
    }

    pub fn container_id(&self) -> String {
        format!("container-for-{}", self.id)
    }

    fn size_pairs(&self) -> Vec<[u32; 2]> {
        self.sizes.iter().map(AdvertSize::as_pair).collect()
    }

    /// Bid-request shape for the bidding SDK
    pub fn to_ad_unit(&self) -> AdUnit {
        AdUnit {
            code: self.id.clone(),
            media_types: MediaTypes {
                banner: Banner {
                    sizes: self.size_pairs(),
                },
            },
            bids: self.bids.clone(),
        }
    }

    /// Tag definition for the tag-rendering SDK
    pub fn to_apn_tag(&self) -> ApnTag {
        ApnTag {
            tag_id: self.unit.clone(),
            sizes: self.size_pairs(),
            target_id: self.id.clone(),
        }
    }
}

/// Bid request for one advert (bidding SDK "ad unit")
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdUnit {
    pub code: String,
    #[serde(rename = "mediaTypes")]
    pub media_types: MediaTypes,
    pub bids: Vec<AdvertBidder>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaTypes {
    pub banner: Banner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub sizes: Vec<[u32; 2]>,
}

/// Tag definition for the tag-rendering SDK
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApnTag {
    #[serde(rename = "tagId")]
    pub tag_id: String,
    pub sizes: Vec<[u32; 2]>,
    #[serde(rename = "targetId")]
    pub target_id: String,
}

/// Page-level options for the tag-rendering SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageOptions {
    pub member: u64,
}
