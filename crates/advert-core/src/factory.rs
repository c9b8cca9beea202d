//! Validating factory for raw advert entries
//!
//! The configuration API is an external source, so nothing it returns is
//! trusted. [`AdvertFactory::from_data`] is the only way a raw
//! `serde_json::Value` becomes an [`Advert`]: missing or malformed required
//! data is rejected, optional data falls back to a sensible default.
//!
//! Truthiness follows the API's conventions: `null`, `false`, `0`, `""` and
//! absent keys all count as "not supplied".

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Advert, AdvertBidder, AdvertSize, Position, RefreshSettings};

/// Raw field the upstream API uses for the position (misspelled)
const MISSPELLED_POSITION_KEY: &str = "positon";

/// The only `btnClick` value that enables a refresh button
const BUTTON_ENABLED: &str = "enabled";

/// Builds validated [`Advert`]s from untyped API data
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvertFactory;

impl AdvertFactory {
    pub fn new() -> Self {
        Self
    }

    /// Construct a new advert from one raw API entry
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidAdvert`]: the entry is absent, or `unit`, `id`,
    ///   `sizes` or `bids` is missing, falsy or of the wrong kind
    /// - [`Error::InvalidAdvertSize`]: a size is not a `[width, height]` pair
    ///   of positive integers
    /// - [`Error::InvalidAdvertBidder`]: a bid lacks `bidder` or
    ///   `params.placementId`
    pub fn from_data(&self, raw: &Value) -> Result<Advert> {
        if !is_truthy(raw) {
            return Err(Error::invalid_advert("advert entry is empty"));
        }

        let unit = required(raw, "unit")?;
        let id = required(raw, "id")?;
        let sizes = required(raw, "sizes")?
            .as_array()
            .ok_or_else(|| Error::invalid_advert("sizes must be an array"))?;
        let bids = required(raw, "bids")?
            .as_array()
            .ok_or_else(|| Error::invalid_advert("bids must be an array"))?;

        Ok(Advert {
            unit: coerce_string(unit, "unit")?,
            id: coerce_string(id, "id")?,
            sizes: self.to_sizes(sizes)?,
            bids: self.to_bids(bids)?,
            refresh: is_truthy_field(raw, "refresh"),
            position: self.to_position(raw),
            close_btn: is_truthy_field(raw, "closeBtn"),
            refresh_settings: self.to_refresh_settings(raw.get("refreshSettings")),
        })
    }

    /// Validate a whole API response
    ///
    /// One bad entry fails the batch; there is no partial success. Advert ids
    /// become element ids, so a repeated id also fails the batch.
    pub fn from_batch(&self, raw: &Value) -> Result<Vec<Advert>> {
        let entries = raw
            .as_array()
            .ok_or_else(|| Error::unexpected_payload("Data is not an array"))?;

        let adverts = entries
            .iter()
            .map(|entry| self.from_data(entry))
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::new();
        if let Some(duplicate) = adverts.iter().find(|advert| !seen.insert(advert.id.as_str())) {
            return Err(Error::invalid_advert(format!(
                "duplicate advert id {}",
                duplicate.id
            )));
        }

        Ok(adverts)
    }

    fn to_sizes(&self, sizes: &[Value]) -> Result<Vec<AdvertSize>> {
        sizes
            .iter()
            .enumerate()
            .map(|(index, entry)| match entry.as_array().map(Vec::as_slice) {
                Some([width, height]) => Ok(AdvertSize::new(
                    dimension(width, index)?,
                    dimension(height, index)?,
                )),
                _ => Err(Error::invalid_size(format!(
                    "size {} is not a [width, height] pair",
                    index
                ))),
            })
            .collect()
    }

    fn to_bids(&self, bids: &[Value]) -> Result<Vec<AdvertBidder>> {
        bids.iter()
            .enumerate()
            .map(|(index, entry)| {
                let bidder = entry
                    .get("bidder")
                    .filter(|value| is_truthy(value))
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        Error::invalid_bidder(format!("bid {} has no bidder name", index))
                    })?;

                let placement_id = entry
                    .get("params")
                    .and_then(|params| params.get("placementId"))
                    .and_then(Value::as_u64)
                    .filter(|id| *id > 0)
                    .ok_or_else(|| {
                        Error::invalid_bidder(format!("bid {} has no placement id", index))
                    })?;

                Ok(AdvertBidder::new(bidder, placement_id))
            })
            .collect()
    }

    /// Prefers `position`, falls back to the API's misspelled `positon`
    fn to_position(&self, raw: &Value) -> Position {
        let supplied = raw
            .get("position")
            .filter(|value| is_truthy(value))
            .or_else(|| raw.get(MISSPELLED_POSITION_KEY));

        match supplied {
            None | Some(Value::Null) => Position::default(),
            Some(value) => value.as_str().and_then(Position::parse).unwrap_or_else(|| {
                debug!("Unknown advert position {}, using bottom", value);
                Position::default()
            }),
        }
    }

    /// Self-refreshing wins over the button when both are supplied
    fn to_refresh_settings(&self, settings: Option<&Value>) -> Option<RefreshSettings> {
        let settings = settings.filter(|value| is_truthy(value))?;
        let delay = settings.get("delay");
        let repeat = settings.get("repeat");

        if delay.is_some_and(is_truthy) || repeat.is_some_and(is_truthy) {
            let repeat = u32::try_from(non_negative(repeat)).unwrap_or(u32::MAX);
            return Some(RefreshSettings::self_refreshing(non_negative(delay), repeat));
        }

        match settings.get("btnClick").and_then(Value::as_str) {
            Some(BUTTON_ENABLED) => Some(RefreshSettings::ButtonRefreshing),
            _ => None,
        }
    }
}

/// JavaScript-style truthiness of a JSON value
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn is_truthy_field(raw: &Value, key: &str) -> bool {
    raw.get(key).is_some_and(is_truthy)
}

fn required<'a>(raw: &'a Value, key: &str) -> Result<&'a Value> {
    raw.get(key)
        .filter(|value| is_truthy(value))
        .ok_or_else(|| Error::invalid_advert(format!("missing {}", key)))
}

fn coerce_string(value: &Value, key: &str) -> Result<String> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        _ => Err(Error::invalid_advert(format!(
            "{} must be a string or a number",
            key
        ))),
    }
}

fn dimension(value: &Value, index: usize) -> Result<u32> {
    value
        .as_u64()
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| {
            Error::invalid_size(format!(
                "size {} has a non positive integer dimension: {}",
                index, value
            ))
        })
}

fn non_negative(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|n| *n > 0.0).map(|n| n as u64))
            .unwrap_or(0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn well_formed() -> Value {
        json!({
            "unit": "/19968336/header-bid-tag-2",
            "id": "eg-ad-1",
            "sizes": [[160, 600]],
            "refresh": true,
            "positon": "left",
            "refreshSettings": { "delay": 30000, "repeat": 50 },
            "closeBtn": true,
            "bids": [{ "bidder": "appnexus", "params": { "placementId": 13144370 } }]
        })
    }

    fn without(key: &str) -> Value {
        let mut raw = well_formed();
        raw.as_object_mut().unwrap().remove(key);
        raw
    }

    fn with(key: &str, value: Value) -> Value {
        let mut raw = well_formed();
        raw[key] = value;
        raw
    }

    fn build(raw: &Value) -> Result<Advert> {
        AdvertFactory::new().from_data(raw)
    }

    #[test]
    fn well_formed_entry_round_trips() {
        let advert = build(&well_formed()).unwrap();

        assert_eq!(advert.unit, "/19968336/header-bid-tag-2");
        assert_eq!(advert.id, "eg-ad-1");
        assert_eq!(advert.sizes, vec![AdvertSize::new(160, 600)]);
        assert_eq!(advert.bids, vec![AdvertBidder::new("appnexus", 13144370)]);
        assert!(advert.refresh);
        assert!(advert.close_btn);
        assert_eq!(advert.position, Position::Left);
        assert_eq!(
            advert.refresh_settings,
            Some(RefreshSettings::self_refreshing(30000, 50))
        );
    }

    #[test]
    fn absent_entry_is_invalid() {
        assert!(matches!(build(&Value::Null), Err(Error::InvalidAdvert(_))));
        assert!(matches!(build(&json!(false)), Err(Error::InvalidAdvert(_))));
    }

    #[test]
    fn missing_required_fields_are_invalid() {
        for key in ["unit", "id", "sizes", "bids"] {
            let result = build(&without(key));
            assert!(
                matches!(result, Err(Error::InvalidAdvert(_))),
                "missing {} should fail, got {:?}",
                key,
                result
            );
        }
    }

    #[test]
    fn falsy_required_fields_are_invalid() {
        assert!(matches!(build(&with("unit", json!(""))), Err(Error::InvalidAdvert(_))));
        assert!(matches!(build(&with("id", json!(0))), Err(Error::InvalidAdvert(_))));
        assert!(matches!(build(&with("sizes", json!(null))), Err(Error::InvalidAdvert(_))));
    }

    #[test]
    fn non_array_sizes_and_bids_are_invalid() {
        assert!(matches!(
            build(&with("sizes", json!("160x600"))),
            Err(Error::InvalidAdvert(_))
        ));
        assert!(matches!(
            build(&with("bids", json!({ "bidder": "appnexus" }))),
            Err(Error::InvalidAdvert(_))
        ));
    }

    #[test]
    fn numeric_unit_and_id_become_strings() {
        let advert = build(&with("unit", json!(1234))).unwrap();
        assert_eq!(advert.unit, "1234");

        let advert = build(&with("id", json!(42))).unwrap();
        assert_eq!(advert.id, "42");
    }

    #[test]
    fn size_arity_must_be_two() {
        for sizes in [json!([[160]]), json!([[160, 600, 1]]), json!([[]]), json!([160])] {
            let result = build(&with("sizes", sizes.clone()));
            assert!(
                matches!(result, Err(Error::InvalidAdvertSize(_))),
                "{} should fail",
                sizes
            );
        }
    }

    #[test]
    fn size_members_must_be_positive_integers() {
        assert!(matches!(
            build(&with("sizes", json!([["160", 600]]))),
            Err(Error::InvalidAdvertSize(_))
        ));
        assert!(matches!(
            build(&with("sizes", json!([[0, 600]]))),
            Err(Error::InvalidAdvertSize(_))
        ));
    }

    #[test]
    fn empty_sizes_are_allowed() {
        let advert = build(&with("sizes", json!([]))).unwrap();
        assert!(advert.sizes.is_empty());
    }

    #[test]
    fn bids_need_bidder_and_placement() {
        for bids in [
            json!([{ "params": { "placementId": 1 } }]),
            json!([{ "bidder": "", "params": { "placementId": 1 } }]),
            json!([{ "bidder": "appnexus" }]),
            json!([{ "bidder": "appnexus", "params": {} }]),
            json!([{ "bidder": "appnexus", "params": { "placementId": 0 } }]),
        ] {
            let result = build(&with("bids", bids.clone()));
            assert!(
                matches!(result, Err(Error::InvalidAdvertBidder(_))),
                "{} should fail",
                bids
            );
        }
    }

    #[test]
    fn correct_position_spelling_wins() {
        let raw = with("position", json!("right"));
        assert_eq!(build(&raw).unwrap().position, Position::Right);
    }

    #[test]
    fn invalid_positions_fall_back_to_bottom() {
        let raw = with("positon", json!("top"));
        assert_eq!(build(&raw).unwrap().position, Position::Bottom);

        let raw = without("positon");
        assert_eq!(build(&raw).unwrap().position, Position::Bottom);

        let raw = with("positon", json!(7));
        assert_eq!(build(&raw).unwrap().position, Position::Bottom);
    }

    #[test]
    fn flags_use_truthiness() {
        let raw = with("refresh", json!(0));
        assert!(!build(&raw).unwrap().refresh);

        let raw = with("closeBtn", json!("yes"));
        assert!(build(&raw).unwrap().close_btn);
    }

    #[test]
    fn disabled_button_means_no_policy() {
        let raw = with("refreshSettings", json!({ "btnClick": "disabled" }));
        assert_eq!(build(&raw).unwrap().refresh_settings, None);
    }

    #[test]
    fn enabled_button_policy() {
        let raw = with("refreshSettings", json!({ "btnClick": "enabled" }));
        assert_eq!(
            build(&raw).unwrap().refresh_settings,
            Some(RefreshSettings::ButtonRefreshing)
        );
    }

    #[test]
    fn partial_self_refresh_defaults_to_zero() {
        let raw = with("refreshSettings", json!({ "delay": 100 }));
        assert_eq!(
            build(&raw).unwrap().refresh_settings,
            Some(RefreshSettings::self_refreshing(100, 0))
        );

        let raw = with("refreshSettings", json!({ "repeat": 3 }));
        assert_eq!(
            build(&raw).unwrap().refresh_settings,
            Some(RefreshSettings::self_refreshing(0, 3))
        );
    }

    #[test]
    fn self_refresh_beats_button() {
        let raw = with(
            "refreshSettings",
            json!({ "delay": 100, "repeat": 2, "btnClick": "enabled" }),
        );
        assert_eq!(
            build(&raw).unwrap().refresh_settings,
            Some(RefreshSettings::self_refreshing(100, 2))
        );
    }

    #[test]
    fn empty_refresh_settings_mean_no_policy() {
        assert_eq!(build(&with("refreshSettings", json!({}))).unwrap().refresh_settings, None);
        assert_eq!(build(&with("refreshSettings", json!(null))).unwrap().refresh_settings, None);
        assert_eq!(
            build(&with("refreshSettings", json!({ "delay": 0, "repeat": 0 })))
                .unwrap()
                .refresh_settings,
            None
        );
    }

    #[test]
    fn batch_rejects_non_arrays_and_bad_entries() {
        let factory = AdvertFactory::new();

        assert!(matches!(
            factory.from_batch(&json!({ "not": "an array" })),
            Err(Error::UnexpectedPayload(_))
        ));

        let batch = json!([well_formed(), without("unit")]);
        assert!(matches!(factory.from_batch(&batch), Err(Error::InvalidAdvert(_))));

        let batch = json!([well_formed(), with("id", json!("eg-ad-2"))]);
        assert_eq!(factory.from_batch(&batch).unwrap().len(), 2);
    }

    #[test]
    fn batch_rejects_repeated_ids() {
        let batch = json!([well_formed(), well_formed()]);
        assert!(matches!(
            AdvertFactory::new().from_batch(&batch),
            Err(Error::InvalidAdvert(_))
        ));
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!(-1)));
    }
}
