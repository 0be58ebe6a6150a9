//! End-to-end pipeline tests against a mocked ScrapingAnt endpoint

use bienici_scraper::config::{resolve_config, Config, ConfigOverrides, FetchConfig, SearchConfig};
use bienici_scraper::crawler::{Coordinator, FetchOptions, PageFetcher, ScrapingAntClient};
use bienici_scraper::normalize::Field;
use bienici_scraper::output::{CsvSink, MemorySink};
use bienici_scraper::state::{ExhaustReason, RunContext};
use bienici_scraper::url::{BieniciUrls, SearchQuery, UrlTemplate};
use bienici_scraper::ScrapeError;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITE: &str = "https://www.bienici.com";
const API_PATH: &str = "/v2/general";

/// Creates a test configuration pointing at the mock proxy
fn create_test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.fetch.api_key = "test-key".to_string();
    config.fetch.api_url = format!("{}{}", server.uri(), API_PATH);
    config.fetch.timeout_seconds = 5;
    config.fetch.max_retries = 3;
    config.fetch.base_delay_ms = 1;
    config.fetch.max_delay_ms = 5;
    config.enrichment.max_workers = 3;
    config
}

fn page_url(page: u32) -> String {
    BieniciUrls::new(SITE).search_url(&SearchQuery::from(&SearchConfig::default()), page)
}

fn listing_url(id: &str) -> String {
    format!("{}/annonce/vente/paris/appartement/2pieces/{}", SITE, id)
}

fn search_html(ids: &[&str], has_more: bool) -> String {
    let cards: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<article><a href="/annonce/vente/paris/appartement/2pieces/{}">
                   <h3>Appartement 2 pièces 40 m² 75011 Paris 11e</h3></a>
                   <div>320 000 €</div></article>"#,
                id
            )
        })
        .collect();
    let paging = if has_more {
        r#"<nav aria-label="Pagination"><a rel="next" href="?page=next">Suivante</a></nav>"#
    } else {
        r#"<nav aria-label="Pagination"></nav>"#
    };
    format!("<html><body>{}{}</body></html>", cards, paging)
}

fn detail_html(description: &str) -> String {
    format!(
        r#"<html><body><h1>Appartement 2 pièces 40 m²</h1>
           <div>Chauffage : collectif</div>
           <div><h2>Descriptif de ce bien</h2></div><div>{}</div></body></html>"#,
        description
    )
}

/// Serves `body` for proxied requests to `target`
async fn mock_target(server: &MockServer, target: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("url", target))
        .and(query_param("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mock_status(server: &MockServer, target: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("url", target))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

fn sorted_ids(sink: &MemorySink) -> Vec<String> {
    let mut ids: Vec<String> = sink
        .records()
        .iter()
        .filter_map(|r| r.listing_id().map(str::to_string))
        .collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn test_two_pages_with_repeated_listing() {
    let server = MockServer::start().await;
    mock_target(&server, &page_url(1), search_html(&["a1", "a2"], true)).await;
    mock_target(&server, &page_url(2), search_html(&["a2", "a3"], false)).await;
    for id in ["a1", "a2", "a3"] {
        mock_target(&server, &listing_url(id), detail_html(&format!("Bien {}", id))).await;
    }

    let sink = MemorySink::new();
    let coordinator = Coordinator::from_config(
        create_test_config(&server),
        Box::new(sink.clone()),
        RunContext::new(),
    )
    .expect("Failed to create coordinator");
    let report = coordinator.run().await;

    assert!(report.is_success(), "Run failed: {:?}", report.failure);
    assert_eq!(report.exhaust_reason, Some(ExhaustReason::NoMorePages));
    assert_eq!(sorted_ids(&sink), vec!["a1", "a2", "a3"]);
    assert_eq!(report.counters.pages_fetched, 2);
    assert_eq!(report.counters.duplicate_summaries, 1);
    assert_eq!(report.counters.records_written, 3);

    for record in sink.records() {
        let id = record.listing_id().unwrap().to_string();
        let description = record.get(Field::Description).and_then(|v| v.as_text());
        assert_eq!(description, Some(format!("Bien {}", id).as_str()));
        assert_eq!(
            record.get(Field::HeatingType).and_then(|v| v.as_text()),
            Some("collectif")
        );
        assert!(record.get(Field::DateScraped).is_some());
    }

    // Each page and each detail fetched exactly once
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 5);
}

#[tokio::test]
async fn test_failed_detail_keeps_summary_record() {
    let server = MockServer::start().await;
    mock_target(&server, &page_url(1), search_html(&["ok-1", "bad", "ok-2"], false)).await;
    mock_target(&server, &listing_url("ok-1"), detail_html("Premier")).await;
    mock_target(&server, &listing_url("ok-2"), detail_html("Second")).await;
    mock_status(&server, &listing_url("bad"), 500).await;

    let sink = MemorySink::new();
    let report = Coordinator::from_config(
        create_test_config(&server),
        Box::new(sink.clone()),
        RunContext::new(),
    )
    .expect("Failed to create coordinator")
    .run()
    .await;

    assert!(report.is_success());
    assert_eq!(sorted_ids(&sink), vec!["bad", "ok-1", "ok-2"]);
    assert_eq!(report.counters.details_fetched, 2);
    assert_eq!(report.counters.details_failed, 1);

    let bad = sink
        .records()
        .into_iter()
        .find(|r| r.listing_id() == Some("bad"))
        .unwrap();
    assert!(bad.get(Field::Description).is_none());
    assert!(bad.get(Field::Title).is_some());

    // The 500 is retried up to the attempt limit
    let bad_target = listing_url("bad");
    let requests = server.received_requests().await.unwrap();
    let bad_calls = requests
        .iter()
        .filter(|r| r.url.query_pairs().any(|(k, v)| k == "url" && v == bad_target))
        .count();
    assert_eq!(bad_calls, 3);
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("url", page_url(1).as_str()))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mock_target(&server, &page_url(1), search_html(&["r1"], false)).await;

    let mut config = create_test_config(&server);
    config.enrichment.fetch_details = false;

    let sink = MemorySink::new();
    let report = Coordinator::from_config(config, Box::new(sink.clone()), RunContext::new())
        .expect("Failed to create coordinator")
        .run()
        .await;

    assert!(report.is_success());
    assert_eq!(sorted_ids(&sink), vec!["r1"]);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_page_failure_aborts_and_keeps_partial_output() {
    let server = MockServer::start().await;
    mock_target(&server, &page_url(1), search_html(&["p1", "p2"], true)).await;
    mock_status(&server, &page_url(2), 403).await;

    let mut config = create_test_config(&server);
    config.enrichment.fetch_details = false;

    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("out.csv");
    let sink = CsvSink::create(&csv_path).unwrap();

    let report = Coordinator::from_config(config, Box::new(sink), RunContext::new())
        .expect("Failed to create coordinator")
        .run()
        .await;

    assert!(!report.is_success());
    match &report.failure {
        Some(ScrapeError::PageFailed { page, source }) => {
            assert_eq!(*page, 2);
            assert!(matches!(**source, ScrapeError::Upstream { status: 403, .. }));
        }
        other => panic!("Expected a page failure, got {:?}", other),
    }

    // 403 is permanent: a single attempt
    let page_two = page_url(2);
    let requests = server.received_requests().await.unwrap();
    let page_two_calls = requests
        .iter()
        .filter(|r| r.url.query_pairs().any(|(k, v)| k == "url" && v == page_two))
        .count();
    assert_eq!(page_two_calls, 1);

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let header = reader.headers().unwrap().clone();
    assert_eq!(header.len(), 36);
    assert_eq!(&header[0], "url");
    assert_eq!(&header[1], "listing_id");

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][1], "p1");
    assert_eq!(&rows[1][1], "p2");
}

#[tokio::test]
async fn test_config_file_drives_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("lyon.csv");

    let query = SearchQuery::new(
        "lyon",
        bienici_scraper::config::ContractType::Rent,
        bienici_scraper::config::PropertyType::Apartment,
    );
    let first_page = BieniciUrls::new(SITE).search_url(&query, 1);
    mock_target(&server, &first_page, search_html(&["l1", "l2", "l3"], true)).await;

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[search]
location = "lyon"
contract-type = "rent"
property-type = "apartment"

[limits]
limit = 2

[fetch]
api-url = "{}{}"
base-delay-ms = 1
max-delay-ms = 5

[enrichment]
fetch-details = false

[output]
output-path = "{}"
"#,
        server.uri(),
        API_PATH,
        csv_path.display()
    )
    .unwrap();
    file.flush().unwrap();

    let overrides = ConfigOverrides {
        api_key: Some("test-key".to_string()),
        ..ConfigOverrides::default()
    };
    let (config, hash) = resolve_config(Some(file.path()), overrides).unwrap();
    assert!(hash.is_some());

    let sink = CsvSink::create(std::path::Path::new(&config.output.output_path)).unwrap();
    let report = Coordinator::from_config(config, Box::new(sink), RunContext::new())
        .unwrap()
        .run()
        .await;

    assert!(report.is_success());
    assert_eq!(report.exhaust_reason, Some(ExhaustReason::ItemLimit));
    assert_eq!(report.counters.records_written, 2);

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    let ids: Vec<String> = reader
        .records()
        .map(|r| r.unwrap()[1].to_string())
        .collect();
    assert_eq!(ids, vec!["l1", "l2"]);
}

#[tokio::test]
async fn test_client_sends_proxy_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("url", "https://www.bienici.com/annonce/x"))
        .and(query_param("x-api-key", "secret"))
        .and(query_param("browser", "false"))
        .and(query_param("proxy_country", "FR"))
        .and(query_param("proxy_type", "datacenter"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let config = FetchConfig {
        api_key: "secret".to_string(),
        api_url: format!("{}{}", server.uri(), API_PATH),
        ..FetchConfig::default()
    };
    let client = ScrapingAntClient::new(&config).unwrap();
    let options = FetchOptions {
        render_js: false,
        proxy_type: "datacenter".to_string(),
        ..FetchOptions::from(&config)
    };

    let body = client
        .fetch("https://www.bienici.com/annonce/x", &options)
        .await
        .unwrap();
    assert_eq!(body, "<html>ok</html>");
}

#[tokio::test]
async fn test_client_classifies_statuses() {
    let server = MockServer::start().await;
    mock_status(&server, "https://www.bienici.com/busy", 429).await;
    mock_status(&server, "https://www.bienici.com/gone", 404).await;
    mock_status(&server, "https://www.bienici.com/down", 502).await;

    let config = FetchConfig {
        api_key: "secret".to_string(),
        api_url: format!("{}{}", server.uri(), API_PATH),
        ..FetchConfig::default()
    };
    let client = ScrapingAntClient::new(&config).unwrap();
    let options = FetchOptions::from(&config);

    let busy = client
        .fetch("https://www.bienici.com/busy", &options)
        .await
        .unwrap_err();
    assert!(matches!(busy, ScrapeError::RateLimited { status: 429, .. }));
    assert!(busy.is_transient());

    let gone = client
        .fetch("https://www.bienici.com/gone", &options)
        .await
        .unwrap_err();
    assert!(matches!(gone, ScrapeError::Upstream { status: 404, .. }));
    assert!(!gone.is_transient());

    let down = client
        .fetch("https://www.bienici.com/down", &options)
        .await
        .unwrap_err();
    assert!(down.is_transient());
}
