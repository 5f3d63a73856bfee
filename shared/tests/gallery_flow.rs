mod support;

use gallery_shared::capabilities::{MetadataRecord, MetadataValue};
use gallery_shared::detail::{DetailFields, CAPABILITY_MISSING, LOADING};
use gallery_shared::view::{ChipKind, SentinelView};
use gallery_shared::{Effect, Event, TriggerMode};
use serde_json::json;
use support::*;

fn tagged() -> Harness {
    Harness::new()
        .route(MANIFEST, manifest_of(&["a.jpg", "b.jpg", "c.jpg"]))
        .keywords("images/a.jpg", "x")
        .keywords("images/b.jpg", "y")
        .keywords("images/c.jpg", "z")
}

fn loaded_and_hydrated() -> Harness {
    let mut h = tagged();
    h.load(PAGE, true);
    assert_eq!(h.status(), "3 photos loaded (manifest fallback). Reading EXIF tags...");
    assert_eq!(h.pending.len(), 3);
    h.extract_all();
    h
}

fn numbered(count: usize) -> String {
    let names: Vec<String> = (0..count).map(|i| format!("p{i:02}.jpg")).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    manifest_of(&names)
}

#[test]
fn tag_filter_uses_or_semantics() {
    let mut h = loaded_and_hydrated();

    let chips = h.view().chips.unwrap();
    assert_eq!(chips.len(), 4);
    assert_eq!(chips[0].kind, ChipKind::All);
    assert!(chips[0].active);

    let effects = h.send(Event::TagChipToggled { key: "x".into() });
    assert!(rendered(&effects));
    assert_eq!(h.labels(), vec!["a"]);
    assert_eq!(h.status(), "1 of 3 photo for \"x\".");

    h.send(Event::TagChipToggled { key: "y".into() });
    assert_eq!(h.labels(), vec!["a", "b"]);
    assert_eq!(h.status(), "2 of 3 photos for \"x, y\".");
    let chips = h.view().chips.unwrap();
    assert!(!chips[0].active);
    assert!(chips[1].active && chips[2].active && !chips[3].active);

    h.send(Event::TagChipToggled { key: "x".into() });
    assert_eq!(h.labels(), vec!["b"]);

    h.send(Event::AllChipSelected);
    assert_eq!(h.labels(), vec!["a", "b", "c"]);
    assert_eq!(h.status(), "3 photos loaded (manifest fallback).");
}

#[test]
fn untagged_images_hide_the_chip_region() {
    let mut h = Harness::new().route(MANIFEST, manifest_of(&["a.jpg", "b.jpg", "c.jpg"]));
    h.load(PAGE, true);
    h.extract_all();

    assert_eq!(h.extractions.len(), 3);
    assert_eq!(h.view().chips, None);
    assert_eq!(h.status(), "3 photos loaded (manifest fallback).");
    assert!(h.model.hydration().is_none());
}

#[test]
fn sentinel_untracks_when_exhausted_and_retracks_when_the_subset_grows() {
    let mut h = Harness::new()
        .route(MANIFEST, numbered(40))
        .keywords("images/p00.jpg", "first");

    h.load(PAGE, true);
    assert_eq!(h.view().tiles.len(), 18);
    assert_eq!(h.view().sentinel, SentinelView { hidden: false, tracked: true });
    h.extract_all();

    h.send(Event::TagChipToggled { key: "first".into() });
    assert_eq!(h.view().tiles.len(), 1);
    assert_eq!(h.view().sentinel, SentinelView { hidden: true, tracked: false });

    h.send(Event::AllChipSelected);
    assert_eq!(h.view().tiles.len(), 18);
    assert!(h.view().sentinel.tracked);

    h.send(Event::SentinelIntersected);
    assert_eq!(h.view().tiles.len(), 30);
    let effects = h.send(Event::SentinelIntersected);
    assert!(rendered(&effects));
    assert_eq!(h.view().tiles.len(), 40);
    assert_eq!(h.view().sentinel, SentinelView { hidden: true, tracked: false });

    assert!(h.send(Event::SentinelIntersected).is_empty());
}

#[test]
fn scroll_polling_appends_within_the_lead_margin() {
    let mut h = Harness::new().route(MANIFEST, numbered(20));
    h.start(PAGE, json!({}), false, TriggerMode::ScrollPoll);

    assert!(!h.view().sentinel.tracked);
    assert!(h.send(Event::Scrolled { sentinel_top: 2000.0, viewport_height: 900.0 }).is_empty());
    assert_eq!(h.view().tiles.len(), 18);
    h.send(Event::Scrolled { sentinel_top: 1300.0, viewport_height: 900.0 });
    assert_eq!(h.view().tiles.len(), 20);
}

#[test]
fn detail_view_formats_camera_parameters() {
    let mut h = Harness::new()
        .route(MANIFEST, manifest_of(&["a.jpg", "b.jpg"]))
        .record(
            "images/a.jpg",
            MetadataRecord::new()
                .with("ExposureTime", MetadataValue::Number(0.004))
                .with("FNumber", MetadataValue::Number(2.8))
                .with("PhotographicSensitivity", MetadataValue::Number(400.0))
                .with("FocalLength", MetadataValue::Number(4.25))
                .with("XPTitle", MetadataValue::text("Morning\0 light")),
        );
    h.load(PAGE, true);
    h.pending.clear();

    // Hydration is still waiting on a.jpg, so opening it asks for nothing new.
    let effects = h.send(Event::TileActivated { index: 0 });
    assert!(rendered(&effects));
    assert!(!effects.iter().any(|e| matches!(e, Effect::Metadata(_))));
    let opened = h.view().detail.unwrap();
    assert_eq!(opened.address, "images/a.jpg");
    assert_eq!(opened.fields.shutter, LOADING);

    h.extract("images/a.jpg");
    let fields = h.view().detail.unwrap().fields;
    assert_eq!(
        fields,
        DetailFields {
            title: "Morning light".into(),
            shutter: "1/250s".into(),
            aperture: "f/2.8".into(),
            iso: "400".into(),
            focal_length: "4.3mm".into(),
        }
    );

    assert!(rendered(&h.send(Event::DetailClosed)));
    assert_eq!(h.view().detail, None);
}

#[test]
fn failed_detail_lookup_shows_unavailable() {
    let mut h = Harness::new().route(MANIFEST, manifest_of(&["a.jpg", "b.jpg"]));
    h.load(PAGE, true);
    h.extract_all();

    let effects = h.send(Event::TileActivated { index: 1 });
    assert!(effects.iter().any(|e| matches!(e, Effect::Metadata(_))));
    h.extract("images/b.jpg");
    assert_eq!(h.view().detail.unwrap().fields, DetailFields::unavailable());
}

#[test]
fn stale_detail_results_are_dropped() {
    let mut h = Harness::new().route(MANIFEST, manifest_of(&["a.jpg", "b.jpg", "c.jpg"]));
    h.load(PAGE, true);
    h.extract_all();
    h.set_record("images/a.jpg", MetadataRecord::new().with("ObjectName", MetadataValue::text("Pier")));
    h.set_record("images/c.jpg", MetadataRecord::new());

    h.send(Event::TileActivated { index: 0 });
    h.send(Event::TileActivated { index: 2 });
    assert_eq!(h.pending, vec!["images/a.jpg", "images/c.jpg"]);

    h.extract("images/c.jpg");
    let effects = h.extract("images/a.jpg");
    assert!(!rendered(&effects));

    let panel = h.view().detail.unwrap();
    assert_eq!(panel.index, 2);
    assert_eq!(panel.fields.title, "c");

    // The late answer still filled the cache.
    h.send(Event::TileActivated { index: 0 });
    assert_eq!(h.view().detail.unwrap().fields.title, "Pier");
    assert_eq!(h.extractions.len(), 5);
}

#[test]
fn missing_extractor_short_circuits_detail() {
    let mut h = tagged();
    let effects = h.load(PAGE, false);
    assert!(!effects.iter().any(|e| matches!(e, Effect::Metadata(_))));
    assert_eq!(h.status(), "3 photos loaded (manifest fallback).");

    let effects = h.send(Event::TileActivated { index: 0 });
    assert!(!effects.iter().any(|e| matches!(e, Effect::Metadata(_))));
    let fields = h.view().detail.unwrap().fields;
    assert_eq!(fields.title, "a");
    assert_eq!(fields.shutter, CAPABILITY_MISSING);
}

#[test]
fn hydration_and_detail_share_lookups() {
    let mut h = tagged();
    h.load(PAGE, true);
    h.send(Event::TileActivated { index: 1 });
    h.extract_all();

    assert_eq!(h.extractions.len(), 3);
    assert_eq!(h.view().detail.unwrap().fields.title, "b");
    assert_eq!(h.model.state().available_tags().len(), 3);
}

#[test]
fn reload_waits_on_lookups_already_in_flight() {
    let mut h = tagged();
    h.load(PAGE, true);
    let first_round = std::mem::take(&mut h.pending);

    // Reload before any answer: the pending lookups are shared, not repeated.
    h.load(PAGE, true);
    assert!(h.pending.is_empty());
    assert_eq!(h.model.load_generation(), 2);

    for address in &first_round {
        h.extract(address);
    }
    assert!(h.view().chips.is_some());
    assert_eq!(h.extractions.len(), 3);
}

#[test]
fn stale_source_responses_are_dropped() {
    let mut h = tagged();
    h.load(PAGE, false);
    let before = h.labels();

    let effects = h.send(Event::SourceFetched {
        generation: 0,
        response: Box::new(Ok(crux_http::testing::ResponseBuilder::ok()
            .body(manifest_of(&["zzz.jpg"]))
            .build())),
    });
    assert!(effects.is_empty());
    assert_eq!(h.labels(), before);
}

#[test]
fn out_of_range_tiles_and_unknown_tags_are_ignored() {
    let mut h = loaded_and_hydrated();

    assert!(h.send(Event::TileActivated { index: 99 }).is_empty());
    assert!(h.send(Event::TagChipToggled { key: "nope".into() }).is_empty());
    assert!(h.send(Event::DetailClosed).is_empty());

    // Memoized by hydration: the panel is final at once.
    let effects = h.send(Event::TileActivated { index: 0 });
    assert!(!effects.iter().any(|e| matches!(e, Effect::Metadata(_))));
    assert_eq!(h.view().detail.unwrap().fields.title, "a");
}
