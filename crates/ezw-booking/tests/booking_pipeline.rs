use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use ezw_booking::{
    submit, summary_location, token_from_query, CodecConfig, OrderSummary, SequenceIdGenerator,
    SummaryRenderer, SummaryState, TransferCodec,
};
use ezw_catalog::StaticCatalog;
use ezw_core::{BookingDraft, BookingField, UrgencyTier};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .canonicalize()
        .expect("workspace root")
}

#[test]
fn booking_reaches_summary_through_query_string() {
    let catalog = StaticCatalog::from_workspace_root(&workspace_root()).expect("catalog fixture");
    let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    let codec = TransferCodec::default();

    let draft = BookingDraft::for_worker("2")
        .with_date(today.succ_opt().unwrap())
        .with_time("02:00 PM")
        .with_location("B-12, Lajpat Nagar")
        .with_description("Kitchen sink leaking under the counter")
        .with_urgency(UrgencyTier::High);
    let request = submit(&draft, &catalog, today).expect("valid booking");
    assert_eq!(request.estimated_cost(), "700-1000");

    let location = summary_location(&codec.encode(&request).expect("token fits"));
    let (path, query) = location.split_once('?').expect("query string");
    assert_eq!(path, "/order-summary");

    let ids = SequenceIdGenerator::default();
    let renderer = SummaryRenderer::new(&catalog, &ids, codec);
    let mut summary = OrderSummary::new();
    let SummaryState::Confirmed(confirmation) = summary.resolve(&renderer, token_from_query(Some(query)))
    else {
        panic!("expected confirmed summary");
    };

    assert_eq!(confirmation.booking_id, "EZ000001");
    assert_eq!(confirmation.worker.name, "Suresh Sharma");
    assert_eq!(confirmation.service_name(), "Plumber");
    assert_eq!(confirmation.scheduled_time, "02:00 PM");
    assert_eq!(confirmation.urgency, UrgencyTier::High);
    assert_eq!(confirmation.total_cost_display(), "700-1050");
}

#[test]
fn tampered_query_lands_on_not_found() {
    let catalog = StaticCatalog::from_workspace_root(&workspace_root()).expect("catalog fixture");
    let ids = SequenceIdGenerator::default();
    let renderer = SummaryRenderer::new(&catalog, &ids, TransferCodec::default());

    for query in ["", "booking=", "booking=%7Bnope", "other=1"] {
        let state = renderer.render(token_from_query(Some(query)));
        assert!(matches!(state, SummaryState::NotFound(_)), "{query}: {state:?}");
        assert_eq!(state.recovery_path(), Some("/services"));
    }
}

#[test]
fn long_description_never_yields_unreadable_token() {
    let catalog = StaticCatalog::from_workspace_root(&workspace_root()).expect("catalog fixture");
    let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    let draft = BookingDraft::for_worker("1")
        .with_date(today)
        .with_time("11:00 AM")
        .with_location("Sector 15, Gurgaon")
        .with_description("बिजली का मीटर ठीक करें ".repeat(80));
    let request = submit(&draft, &catalog, today).expect("valid booking");

    let codec = TransferCodec::default();
    let err = codec.encode(&request).expect_err("token over the default cap");
    assert_eq!(err.field, BookingField::Description);

    let roomy = TransferCodec::new(CodecConfig {
        max_token_len: 32 * 1024,
    });
    let token = roomy.encode(&request).expect("fits the larger cap");
    assert_eq!(roomy.decode(Some(token.as_str())).expect("round trip"), request);
}
