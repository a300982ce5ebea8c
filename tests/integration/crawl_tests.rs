//! End-to-end crawl tests against a mock classifieds site

use crate::support::*;
use classifieds_harvest::crawler::{
    build_http_client, BanSignal, Coordinator, DetailEnricher, ListingWalker, PageSelectors,
    RateGovernor,
};
use classifieds_harvest::output::EnrichmentTally;
use classifieds_harvest::state::{ItemBudget, PipelineState, WalkOutcome};
use classifieds_harvest::url::{build_seed_url, parse_base};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SEED_PATH: &str = "/rossiya";

#[tokio::test]
async fn test_single_page_fewer_items_than_cap() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(
            Some("Ноутбуки"),
            &[
                Entry::new("MacBook Air", "/item/1"),
                Entry::new("MacBook Pro", "/item/2"),
            ],
            None,
        ),
    )
    .await;
    mount_item(&mock_server, 1, "ул. Ленина, 1", "8 900 111-11-11").await;
    mount_item(&mock_server, 2, "Тверская ул., 5", "8 900 222-22-22").await;

    let config = create_test_config(&mock_server.uri(), 5);
    let sink = CollectingSink::default();
    let mut coordinator = Coordinator::new(config).unwrap();
    let summary = coordinator.run_with_sink(sink.clone()).await.unwrap();

    assert_eq!(summary.walk_outcome, WalkOutcome::Exhausted);
    assert_eq!(summary.pages_fetched, 1);
    assert_eq!(summary.items_launched, 2);
    assert_eq!(summary.enrichment.emitted, 2);
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.category.as_deref(), Some("Ноутбуки"));
    assert_eq!(requests_to(&mock_server, SEED_PATH).await, 1);
    assert_eq!(coordinator.state(), PipelineState::Closed);

    let records = sink.sorted();
    assert_eq!(records[0].title, "MacBook Air");
    assert_eq!(records[0].location, "ул. Ленина, 1");
    assert_eq!(records[0].phone, "8 900 111-11-11");
    assert_eq!(records[0].url, format!("{}/item/1", mock_server.uri()));
    assert_eq!(records[1].title, "MacBook Pro");
    assert_eq!(records[1].phone, "8 900 222-22-22");
}

#[tokio::test]
async fn test_unlimited_cap_follows_every_page() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(
            Some("Ноутбуки"),
            &[Entry::new("First", "/item/1")],
            Some("/rossiya/page/2"),
        ),
    )
    .await;
    mount_page(
        &mock_server,
        "/rossiya/page/2",
        listing_page(Some("Ноутбуки"), &[Entry::new("Second", "/item/2")], None),
    )
    .await;
    mount_item(&mock_server, 1, "Москва", "111").await;
    mount_item(&mock_server, 2, "Москва", "222").await;

    let config = create_test_config(&mock_server.uri(), 0);
    let sink = CollectingSink::default();
    let summary = Coordinator::new(config)
        .unwrap()
        .run_with_sink(sink.clone())
        .await
        .unwrap();

    assert_eq!(summary.walk_outcome, WalkOutcome::Exhausted);
    assert_eq!(summary.pages_fetched, 2);
    assert_eq!(summary.items_launched, 2);
    assert_eq!(requests_to(&mock_server, SEED_PATH).await, 1);
    assert_eq!(requests_to(&mock_server, "/rossiya/page/2").await, 1);

    let phones: Vec<_> = sink.sorted().into_iter().map(|r| r.phone).collect();
    assert_eq!(phones, ["111", "222"]);
}

#[tokio::test]
async fn test_cap_stops_before_next_page() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(
            Some("Ноутбуки"),
            &[
                Entry::new("One", "/item/1"),
                Entry::new("Two", "/item/2"),
                Entry::new("Three", "/item/3"),
            ],
            Some("/rossiya/page/2"),
        ),
    )
    .await;
    mount_item(&mock_server, 1, "Москва", "111").await;
    mount_item(&mock_server, 2, "Москва", "222").await;
    mount_item(&mock_server, 3, "Москва", "333").await;

    let config = create_test_config(&mock_server.uri(), 2);
    let summary = Coordinator::new(config)
        .unwrap()
        .run_with_sink(CollectingSink::default())
        .await
        .unwrap();

    assert_eq!(summary.walk_outcome, WalkOutcome::CapReached);
    assert_eq!(summary.items_launched, 2);
    assert_eq!(summary.rows_written, 2);
    assert_eq!(requests_to(&mock_server, "/rossiya/page/2").await, 0);
    assert_eq!(requests_to(&mock_server, "/item/3").await, 0);
}

#[tokio::test]
async fn test_item_without_phone_control_is_dropped() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(
            Some("Ноутбуки"),
            &[
                Entry::new("Has phone", "/item/1"),
                Entry::new("No phone", "/item/2"),
            ],
            None,
        ),
    )
    .await;
    mount_item(&mock_server, 1, "Москва", "111").await;
    mount_page(&mock_server, "/item/2", detail_page(Some("Казань"), None)).await;

    let config = create_test_config(&mock_server.uri(), 0);
    let sink = CollectingSink::default();
    let summary = Coordinator::new(config)
        .unwrap()
        .run_with_sink(sink.clone())
        .await
        .unwrap();

    assert_eq!(summary.items_launched, 2);
    assert_eq!(summary.enrichment.emitted, 1);
    assert_eq!(summary.enrichment.no_phone_control, 1);

    let records = sink.sorted();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Has phone");
}

#[tokio::test]
async fn test_phone_ban_drops_only_that_item() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(
            Some("Ноутбуки"),
            &[
                Entry::new("One", "/item/1"),
                Entry::new("Two", "/item/2"),
                Entry::new("Three", "/item/3"),
            ],
            None,
        ),
    )
    .await;
    mount_item(&mock_server, 1, "Москва", "111").await;
    mount_page(
        &mock_server,
        "/item/2",
        detail_page(Some("Москва"), Some("/phone/2")),
    )
    .await;
    mount_status(&mock_server, "/phone/2", 403).await;
    mount_item(&mock_server, 3, "Москва", "333").await;

    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("out.csv");
    let mut config = create_test_config(&mock_server.uri(), 0);
    config.output.csv_path = Some(csv_path.clone());

    let summary = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(summary.walk_outcome, WalkOutcome::Exhausted);
    assert_eq!(summary.items_launched, 3);
    assert_eq!(summary.enrichment.banned, 1);
    assert_eq!(summary.ban_signals, 1);
    assert_eq!(summary.rows_written, 2);

    let content = std::fs::read_to_string(&csv_path).unwrap();
    let mut lines: Vec<_> = content.lines().collect();
    lines.sort();
    assert_eq!(
        lines,
        [
            format!("One,Москва,111,{}/item/1", mock_server.uri()),
            format!("Three,Москва,333,{}/item/3", mock_server.uri()),
        ]
    );
}

#[tokio::test]
async fn test_degraded_listing_stops_walker() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(None, &[Entry::new("One", "/item/1")], Some("/rossiya/page/2")),
    )
    .await;
    mount_item(&mock_server, 1, "Москва", "111").await;

    let config = create_test_config(&mock_server.uri(), 0);
    let summary = Coordinator::new(config)
        .unwrap()
        .run_with_sink(CollectingSink::default())
        .await
        .unwrap();

    assert_eq!(summary.walk_outcome, WalkOutcome::Banned);
    assert_eq!(summary.items_launched, 0);
    assert_eq!(summary.ban_signals, 1);
    assert_eq!(requests_to(&mock_server, "/item/1").await, 0);
    assert_eq!(requests_to(&mock_server, "/rossiya/page/2").await, 0);
}

#[tokio::test]
async fn test_forbidden_listing_is_a_ban() {
    let mock_server = MockServer::start().await;
    mount_status(&mock_server, SEED_PATH, 403).await;

    let config = create_test_config(&mock_server.uri(), 0);
    let summary = Coordinator::new(config)
        .unwrap()
        .run_with_sink(CollectingSink::default())
        .await
        .unwrap();

    assert_eq!(summary.walk_outcome, WalkOutcome::Banned);
    assert_eq!(summary.pages_fetched, 0);
    assert_eq!(summary.rows_written, 0);
}

#[tokio::test]
async fn test_listing_server_error_ends_walk() {
    let mock_server = MockServer::start().await;
    mount_status(&mock_server, SEED_PATH, 500).await;

    let config = create_test_config(&mock_server.uri(), 0);
    let summary = Coordinator::new(config)
        .unwrap()
        .run_with_sink(CollectingSink::default())
        .await
        .unwrap();

    assert_eq!(summary.walk_outcome, WalkOutcome::FetchFailed);
    assert_eq!(summary.ban_signals, 0);
    assert_eq!(summary.items_launched, 0);
}

#[tokio::test]
async fn test_detail_failure_does_not_stop_crawl() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(
            Some("Ноутбуки"),
            &[Entry::new("Broken", "/item/1"), Entry::new("Fine", "/item/2")],
            None,
        ),
    )
    .await;
    mount_status(&mock_server, "/item/1", 500).await;
    mount_item(&mock_server, 2, "Москва", "222").await;

    let config = create_test_config(&mock_server.uri(), 0);
    let sink = CollectingSink::default();
    let summary = Coordinator::new(config)
        .unwrap()
        .run_with_sink(sink.clone())
        .await
        .unwrap();

    assert_eq!(summary.enrichment.detail_failed, 1);
    assert_eq!(summary.enrichment.emitted, 1);
    assert_eq!(sink.sorted()[0].title, "Fine");
}

#[tokio::test]
async fn test_entry_without_link_is_skipped() {
    let mock_server = MockServer::start().await;

    let unlinked = Entry {
        title: "Unlinked".to_string(),
        location: "Москва".to_string(),
        href: None,
    };
    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(Some("Ноутбуки"), &[unlinked, Entry::new("Linked", "/item/1")], None),
    )
    .await;
    mount_item(&mock_server, 1, "Москва", "111").await;

    let config = create_test_config(&mock_server.uri(), 0);
    let summary = Coordinator::new(config)
        .unwrap()
        .run_with_sink(CollectingSink::default())
        .await
        .unwrap();

    assert_eq!(summary.entries_skipped, 1);
    assert_eq!(summary.items_launched, 1);
    assert_eq!(summary.rows_written, 1);
}

#[tokio::test]
async fn test_phone_request_carries_referer_and_async_marker() {
    let mock_server = MockServer::start().await;
    let detail_url = format!("{}/item/1", mock_server.uri());

    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(Some("Ноутбуки"), &[Entry::new("One", "/item/1")], None),
    )
    .await;
    mount_page(
        &mock_server,
        "/item/1",
        detail_page(Some("Москва"), Some("/phone/1")),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/phone/1"))
        .and(query_param("async", ""))
        .and(header("referer", detail_url.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(phone_json("111")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), 0);
    let sink = CollectingSink::default();
    let summary = Coordinator::new(config)
        .unwrap()
        .run_with_sink(sink.clone())
        .await
        .unwrap();

    assert_eq!(summary.rows_written, 1);
    assert_eq!(sink.sorted()[0].phone, "111");
}

#[tokio::test]
async fn test_empty_phone_is_not_written() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(Some("Ноутбуки"), &[Entry::new("One", "/item/1")], None),
    )
    .await;
    mount_page(
        &mock_server,
        "/item/1",
        detail_page(Some("Москва"), Some("/phone/1")),
    )
    .await;
    mount_page(&mock_server, "/phone/1", r#"{"status": "ok"}"#.to_string()).await;

    let config = create_test_config(&mock_server.uri(), 0);
    let summary = Coordinator::new(config)
        .unwrap()
        .run_with_sink(CollectingSink::default())
        .await
        .unwrap();

    assert_eq!(summary.enrichment.empty_phone, 1);
    assert_eq!(summary.rows_written, 0);
}

#[tokio::test]
async fn test_location_policy() {
    let mock_server = MockServer::start().await;

    let entry = Entry {
        title: "One".to_string(),
        location: "Подольск".to_string(),
        href: Some("/item/1".to_string()),
    };
    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(Some("Ноутбуки"), &[entry], None),
    )
    .await;
    mount_page(&mock_server, "/item/1", detail_page(None, Some("/phone/1"))).await;
    mount_page(&mock_server, "/phone/1", phone_json("111")).await;

    // Listing hint survives a detail page without an address
    let config = create_test_config(&mock_server.uri(), 0);
    let sink = CollectingSink::default();
    Coordinator::new(config)
        .unwrap()
        .run_with_sink(sink.clone())
        .await
        .unwrap();
    assert_eq!(sink.sorted()[0].location, "Подольск");

    // Last write wins
    let mut config = create_test_config(&mock_server.uri(), 0);
    config.crawler.location_fallback = false;
    let sink = CollectingSink::default();
    Coordinator::new(config)
        .unwrap()
        .run_with_sink(sink.clone())
        .await
        .unwrap();
    assert_eq!(sink.sorted()[0].location, "");
}

#[tokio::test]
async fn test_abort_on_ban_stops_launching() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(
            Some("Ноутбуки"),
            &[
                Entry::new("One", "/item/1"),
                Entry::new("Two", "/item/2"),
                Entry::new("Three", "/item/3"),
            ],
            Some("/rossiya/page/2"),
        ),
    )
    .await;
    mount_page(
        &mock_server,
        "/item/1",
        detail_page(Some("Москва"), Some("/phone/1")),
    )
    .await;
    mount_status(&mock_server, "/phone/1", 403).await;
    mount_item(&mock_server, 2, "Москва", "222").await;
    mount_item(&mock_server, 3, "Москва", "333").await;

    let mut config = create_test_config(&mock_server.uri(), 0);
    config.crawler.abort_on_ban = true;
    config.crawler.max_concurrent_enrichments = 1;

    let summary = Coordinator::new(config)
        .unwrap()
        .run_with_sink(CollectingSink::default())
        .await
        .unwrap();

    assert_eq!(summary.walk_outcome, WalkOutcome::Aborted);
    assert_eq!(summary.items_launched, 1);
    assert_eq!(summary.enrichment.banned, 1);
    assert_eq!(summary.rows_written, 0);
    assert_eq!(requests_to(&mock_server, "/item/2").await, 0);
    assert_eq!(requests_to(&mock_server, "/rossiya/page/2").await, 0);
}

#[tokio::test]
async fn test_pause_spaces_every_request() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(
            Some("Ноутбуки"),
            &[Entry::new("One", "/item/1"), Entry::new("Two", "/item/2")],
            None,
        ),
    )
    .await;
    mount_item(&mock_server, 1, "Москва", "111").await;
    mount_item(&mock_server, 2, "Москва", "222").await;

    let mut config = create_test_config(&mock_server.uri(), 0);
    config.crawler.pause_ms = 50;

    let start = Instant::now();
    let summary = Coordinator::new(config)
        .unwrap()
        .run_with_sink(CollectingSink::default())
        .await
        .unwrap();

    // One listing page, two detail pages and two phone lookups
    assert_eq!(summary.rows_written, 2);
    assert!(start.elapsed() >= Duration::from_millis(240));
}

#[tokio::test]
async fn test_unwritable_output_fails_before_requests() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(Some("Ноутбуки"), &[], None),
    )
    .await;

    let dir = tempdir().unwrap();
    let mut config = create_test_config(&mock_server.uri(), 0);
    config.output.csv_path = Some(dir.path().join("missing").join("out.csv"));

    let result = Coordinator::new(config).unwrap().run().await;

    assert!(result.is_err());
    assert_eq!(requests_to(&mock_server, SEED_PATH).await, 0);
}

#[tokio::test]
async fn test_walker_reaps_finished_tasks() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    let entries: Vec<_> = (1..=40).map(Entry::numbered).collect();
    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(Some("Ноутбуки"), &entries, None),
    )
    .await;
    for id in 1..=40 {
        mount_item(&mock_server, id, "Москва", &id.to_string()).await;
    }

    let config = create_test_config(&uri, 0);
    let client = build_http_client(&config.user_agent).unwrap();
    let governor = Arc::new(RateGovernor::unthrottled());
    let selectors = Arc::new(PageSelectors::compile(&config.selectors).unwrap());
    let ban = Arc::new(BanSignal::new(false));
    let enricher = Arc::new(DetailEnricher::new(
        client.clone(),
        Arc::clone(&governor),
        Arc::clone(&selectors),
        parse_base(&uri).unwrap(),
        true,
        Arc::clone(&ban),
    ));
    let walker = ListingWalker::new(client, governor, selectors, enricher, 2, ban);

    let (records_tx, mut records_rx) = mpsc::channel(1);
    let consumer = tokio::spawn(async move {
        let mut received = 0;
        while records_rx.recv().await.is_some() {
            received += 1;
        }
        received
    });

    let seed = build_seed_url(&uri, "rossiya", None, "macbook").unwrap();
    let mut tasks = JoinSet::new();
    let mut tally = EnrichmentTally::default();
    let report = walker
        .walk(seed, ItemBudget::new(0), &records_tx, &mut tasks, &mut tally)
        .await;

    assert_eq!(report.items_launched, 40);
    assert!(tasks.len() <= 2);
    assert!(tally.total() >= 38);

    while let Some(joined) = tasks.join_next().await {
        tally.record_joined(joined);
    }
    drop(records_tx);

    assert_eq!(tally.total(), 40);
    assert_eq!(tally.emitted, 40);
    assert_eq!(consumer.await.unwrap(), 40);
}

#[tokio::test]
async fn test_concurrency_limit_bounds_detail_requests() {
    let mock_server = MockServer::start().await;

    let entries: Vec<_> = (1..=6).map(Entry::numbered).collect();
    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(Some("Ноутбуки"), &entries, None),
    )
    .await;
    for id in 1..=6 {
        let phone_path = format!("/phone/{}", id);
        Mock::given(method("GET"))
            .and(path(format!("/item/{}", id)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(detail_page(Some("Москва"), Some(&phone_path)))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&mock_server)
            .await;
        mount_page(&mock_server, &phone_path, phone_json("111")).await;
    }

    let mut config = create_test_config(&mock_server.uri(), 0);
    config.crawler.max_concurrent_enrichments = 2;

    let start = Instant::now();
    let summary = Coordinator::new(config)
        .unwrap()
        .run_with_sink(CollectingSink::default())
        .await
        .unwrap();

    // Six slow detail pages, two at a time
    assert_eq!(summary.rows_written, 6);
    assert!(start.elapsed() >= Duration::from_millis(580));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_sink_holds_enrichers() {
    let mock_server = MockServer::start().await;

    let entries: Vec<_> = (1..=4).map(Entry::numbered).collect();
    mount_page(
        &mock_server,
        SEED_PATH,
        listing_page(Some("Ноутбуки"), &entries, None),
    )
    .await;
    for id in 1..=4 {
        mount_item(&mock_server, id, "Москва", &id.to_string()).await;
    }

    let config = create_test_config(&mock_server.uri(), 0);
    let (sink, open) = GatedSink::new();
    let received = Arc::clone(&sink.received);
    let finished = Arc::new(AtomicBool::new(false));

    let mut coordinator = Coordinator::new(config).unwrap();
    let run = async {
        let result = coordinator.run_with_sink(sink).await;
        finished.store(true, Ordering::SeqCst);
        result
    };

    let control = async {
        // Every enricher has resolved its phone and is waiting to hand off
        for _ in 0..300 {
            let phones = requests_under(&mock_server, "/phone/").await;
            let rows = received.lock().unwrap().len();
            if phones == 4 && rows == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        let rows_while_held = received.lock().unwrap().len();
        let finished_while_held = finished.load(Ordering::SeqCst);

        for _ in 0..4 {
            open.send(()).unwrap();
        }
        (rows_while_held, finished_while_held)
    };

    let (result, (rows_while_held, finished_while_held)) = tokio::join!(run, control);

    assert_eq!(rows_while_held, 1);
    assert!(!finished_while_held);
    assert_eq!(requests_under(&mock_server, "/phone/").await, 4);

    let summary = result.unwrap();
    assert_eq!(summary.rows_written, 4);
    assert_eq!(summary.enrichment.emitted, 4);
    assert_eq!(received.lock().unwrap().len(), 4);
}
