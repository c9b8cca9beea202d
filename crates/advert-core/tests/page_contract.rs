//! Contract tests for page bootstrap: fetch, mount, auction and tag loading

mod common;

use advert_core::AdvertLoader;
use advert_core::model::PageOptions;
use advert_core::sdk::{BiddingCall, TagCall};
use advert_core::slot::{CONTAINER_CLASS, DISPLAY_CLASS};
use advert_core::traits::Document;
use common::{StaticSource, TestPage, raw_advert};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn loader(source: StaticSource) -> AdvertLoader {
    AdvertLoader::new(Box::new(source))
}

#[tokio::test]
async fn well_formed_payload_mounts_every_advert() {
    let page = TestPage::ready();
    let source = StaticSource::body(json!([raw_advert("left-ad"), raw_advert("right-ad")]));
    let fetches = source.fetch_counter();

    let slots = page.page().load(&loader(source)).await;

    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    let ids: Vec<_> = slots.iter().map(|slot| slot.id().to_string()).collect();
    assert_eq!(ids, vec!["left-ad", "right-ad"]);
    assert!(slots.iter().all(|slot| slot.is_mounted()));
    assert_eq!(page.document.observation_count(), 2);
}

#[tokio::test]
async fn containers_are_hidden_and_positioned() {
    let page = TestPage::ready();
    let source = StaticSource::body(json!([raw_advert("left-ad")]));

    let slots = page.page().load(&loader(source)).await;
    let slot = &slots[0];
    let container = slot.container().unwrap();
    let content = slot.content().unwrap();

    assert_eq!(page.document.children(page.document.body())[0], container);
    assert_eq!(page.document.element_id(container).as_deref(), Some("container-for-left-ad"));
    assert_eq!(page.document.style(container, "display").as_deref(), Some("none"));
    assert!(page.document.has_class(container, CONTAINER_CLASS));
    assert!(page.document.has_class(container, "advert_container_left"));

    assert_eq!(page.document.parent(content), Some(container));
    assert_eq!(page.document.element_id(content).as_deref(), Some("left-ad"));
    assert!(page.document.has_class(content, DISPLAY_CLASS));
    assert!(page.document.has_class(content, "advert_display_left"));
}

#[tokio::test]
async fn sdk_calls_follow_page_load_order() {
    let page = TestPage::ready();
    let source = StaticSource::body(json!([raw_advert("a"), raw_advert("b")]));

    let slots = page.page().load(&loader(source)).await;

    let ad_units: Vec<_> = slots.iter().map(|slot| slot.to_ad_unit()).collect();
    assert_eq!(
        page.bidding.calls(),
        vec![
            BiddingCall::RequestBids {
                ad_units,
                timeout: Duration::from_millis(1000),
            },
            BiddingCall::MarkRequestSent,
            BiddingCall::SetTargetingForAst,
        ]
    );

    assert_eq!(
        page.tags.calls(),
        vec![
            TagCall::ShowTag("a".to_string()),
            TagCall::ShowTag("b".to_string()),
            TagCall::LoadTags,
            TagCall::SetPageOpts(PageOptions { member: 1543 }),
            TagCall::DefineTag(slots[0].to_apn_tag()),
            TagCall::DefineTag(slots[1].to_apn_tag()),
        ]
    );
}

#[tokio::test]
async fn loading_sdks_replay_queued_commands_in_order() {
    let page = TestPage::loading();
    let source = StaticSource::body(json!([raw_advert("a")]));

    let slots = page.page().load(&loader(source)).await;
    assert!(page.bidding.calls().is_empty());
    assert!(page.tags.calls().is_empty());

    page.tags.mark_ready();
    page.bidding.mark_ready();
    assert_eq!(page.bidding.complete_auctions(), 1);

    assert_eq!(
        page.tags.calls(),
        vec![
            TagCall::ShowTag("a".to_string()),
            TagCall::SetPageOpts(PageOptions { member: 1543 }),
            TagCall::DefineTag(slots[0].to_apn_tag()),
            TagCall::LoadTags,
        ]
    );
}

#[tokio::test]
async fn http_failure_renders_nothing() {
    let page = TestPage::ready();

    let slots = page.page().load(&loader(StaticSource::status(404))).await;

    assert!(slots.is_empty());
    assert!(page.document.children(page.document.body()).is_empty());
    assert!(page.tags.calls().iter().all(|call| !matches!(call, TagCall::ShowTag(_))));
}

#[tokio::test]
async fn non_array_payload_renders_nothing() {
    let page = TestPage::ready();
    let source = StaticSource::body(json!({ "adverts": [raw_advert("a")] }));

    let slots = page.page().load(&loader(source)).await;

    assert!(slots.is_empty());
    assert_eq!(page.document.observation_count(), 0);
}

#[tokio::test]
async fn one_invalid_entry_renders_nothing() {
    let page = TestPage::ready();
    let mut broken = raw_advert("b");
    broken["sizes"] = json!([[300]]);
    let source = StaticSource::body(json!([raw_advert("a"), broken]));

    let slots = page.page().load(&loader(source)).await;

    assert!(slots.is_empty());
}

#[test]
fn closing_is_idempotent() {
    let page = TestPage::ready();
    let slots = page.page().render(&[common::advert_with("a", |_| {})]);
    let slot = &slots[0];
    let container = slot.container().unwrap();

    slot.close();
    slot.close();

    assert!(!slot.is_mounted());
    assert!(!page.document.is_connected(container));
    assert_eq!(page.document.observation_count(), 0);
}

#[test]
fn remounting_reuses_an_existing_container() {
    let page = TestPage::ready();
    let body = page.document.body();
    let existing = page.document.create_element("div");
    page.document.set_id(existing, "container-for-a");
    page.document.append_child(body, existing);

    let slot = page.mount(common::advert_with("a", |_| {}));

    assert_eq!(slot.container(), Some(existing));
    assert_eq!(page.document.children(body), vec![existing]);
}
