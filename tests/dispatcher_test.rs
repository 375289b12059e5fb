//! Integration tests for the dispatcher

mod common;

use common::{
    closed_port_url, test_config, Event, PanickingSink, PanickingTransport, RecordingSink,
    RefusingTransport,
};
use cors_watcher::error::TransactionError;
use cors_watcher::http::HttpClient;
use cors_watcher::models::{BaseRequest, Severity};
use cors_watcher::scanner::{build_batches, Dispatcher, GeneratorOptions};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn only(origins: &[&str]) -> GeneratorOptions {
    GeneratorOptions {
        only_file_origins: true,
        file_origins: origins.iter().map(|o| o.to_string()).collect(),
        ..GeneratorOptions::default()
    }
}

#[tokio::test]
async fn test_reflecting_server_is_flagged() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(|req: &Request| {
            let origin = req
                .headers
                .get("origin")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            ResponseTemplate::new(200)
                .insert_header("Access-Control-Allow-Origin", origin.as_str())
                .insert_header("Access-Control-Allow-Credentials", "true")
                .set_body_string("hello")
        })
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri());
    let client = HttpClient::from_config(&config).expect("client");
    let sink = RecordingSink::default();

    let requests = vec![BaseRequest::new(mock_server.uri(), "GET")];
    let batches = build_batches(&requests, &GeneratorOptions::default());
    let expected = batches[0].transactions.len();

    let dispatcher = Dispatcher::new(Arc::new(client), Box::new(sink.clone()));
    let done = dispatcher.run(batches).await.expect("run");

    assert_eq!(done.len(), 1);
    let transactions = &done[0].transactions;
    assert_eq!(transactions.len(), expected);
    assert_eq!(sink.rows().len(), expected);

    let arbitrary = transactions
        .iter()
        .find(|t| t.origin() == "https://test.com")
        .expect("arbitrary origin");
    let response = arbitrary.response().expect("response");
    assert_eq!(response.status_code, 200);
    assert_eq!(response.length, 5);
    assert!(arbitrary
        .tags
        .iter()
        .any(|t| t.info == "ACAC:true" && t.severity == Severity::High));

    let legitimate = transactions
        .iter()
        .find(|t| t.origin() == mock_server.uri())
        .expect("legitimate origin");
    assert!(legitimate
        .tags
        .iter()
        .all(|t| t.severity != Severity::High));
}

#[tokio::test]
async fn test_rows_match_transactions_and_header_comes_first() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = HttpClient::from_config(&test_config(&mock_server.uri())).expect("client");
    let sink = RecordingSink::default();

    let requests = vec![
        BaseRequest::new(format!("{}/a", mock_server.uri()), "GET"),
        BaseRequest::new(format!("{}/b", mock_server.uri()), "GET"),
    ];
    let batches = build_batches(&requests, &GeneratorOptions::default());
    let per_batch: Vec<usize> = batches.iter().map(|b| b.transactions.len()).collect();

    let dispatcher = Dispatcher::new(Arc::new(client), Box::new(sink.clone()));
    let done = dispatcher.run(batches).await.expect("run");

    let events = sink.events();
    assert_eq!(events.len(), 2 + per_batch[0] + per_batch[1] + 1);

    assert_eq!(events[0], Event::Header(format!("{}/a", mock_server.uri())));
    let second_header = 1 + per_batch[0];
    assert_eq!(
        events[second_header],
        Event::Header(format!("{}/b", mock_server.uri()))
    );
    assert!(events[1..second_header]
        .iter()
        .all(|e| matches!(e, Event::Row(_))));
    assert_eq!(events.last(), Some(&Event::Complete(2)));

    let rows: HashSet<String> = events[1..second_header]
        .iter()
        .filter_map(|e| match e {
            Event::Row(origin) => Some(origin.clone()),
            _ => None,
        })
        .collect();
    let launched: HashSet<String> = done[0]
        .transactions
        .iter()
        .map(|t| t.origin().to_string())
        .collect();
    assert_eq!(rows, launched);

    for transaction in done.iter().flat_map(|b| b.transactions.iter()) {
        assert_eq!(transaction.status_code(), 204);
        assert!(transaction.tags.is_empty());
    }
}

#[tokio::test]
async fn test_connection_refused_is_recorded() {
    let url = closed_port_url();
    let client = HttpClient::from_config(&test_config(&url)).expect("client");
    let sink = RecordingSink::default();

    let batches = build_batches(
        &[BaseRequest::new(url.as_str(), "GET")],
        &only(&["https://a.example", "https://b.example"]),
    );

    let dispatcher = Dispatcher::new(Arc::new(client), Box::new(sink.clone()));
    let done = dispatcher.run(batches).await.expect("run");

    assert_eq!(sink.rows().len(), 2);
    for transaction in &done[0].transactions {
        assert!(transaction.error().is_some());
        assert!(transaction.response().is_none());
        assert_eq!(transaction.tags.len(), 1);
        assert_eq!(transaction.tags[0].info, "Transaction Fail");
        assert_eq!(transaction.tags[0].severity, Severity::High);
    }
}

#[tokio::test]
async fn test_failures_do_not_stop_the_batch() {
    let sink = RecordingSink::default();
    let batches = build_batches(
        &[BaseRequest::new("https://example.com", "GET")],
        &GeneratorOptions::default(),
    );
    let expected = batches[0].transactions.len();

    let dispatcher = Dispatcher::new(Arc::new(RefusingTransport), Box::new(sink.clone()));
    let done = dispatcher.run(batches).await.expect("run");

    assert_eq!(done[0].transactions.len(), expected);
    assert_eq!(sink.rows().len(), expected);
    assert!(done[0]
        .transactions
        .iter()
        .all(|t| t.error() == Some(&TransactionError::Connect("connection refused".to_string()))));
}

#[tokio::test]
async fn test_panic_is_isolated_and_recorded() {
    let sink = RecordingSink::default();
    let transport = PanickingTransport {
        origin: "https://b.example".to_string(),
    };
    let batches = build_batches(
        &[BaseRequest::new("https://example.com", "GET")],
        &only(&["https://a.example", "https://b.example", "https://c.example"]),
    );

    let dispatcher = Dispatcher::new(Arc::new(transport), Box::new(sink.clone()));
    let done = dispatcher.run(batches).await.expect("run");

    let transactions = &done[0].transactions;
    assert_eq!(transactions.len(), 3);
    assert_eq!(sink.rows().len(), 3);

    let origins: Vec<&str> = transactions.iter().map(|t| t.origin()).collect();
    assert_eq!(
        origins,
        vec!["https://a.example", "https://b.example", "https://c.example"]
    );

    match transactions[1].error() {
        Some(TransactionError::Panicked(message)) => assert!(message.contains("exploded")),
        other => panic!("expected panic error, got {other:?}"),
    }
    assert_eq!(transactions[1].tags[0].info, "Transaction Fail");
    assert!(matches!(
        transactions[0].error(),
        Some(TransactionError::Connect(_))
    ));
}

#[tokio::test]
async fn test_panicking_sink_keeps_the_transaction() {
    let sink = PanickingSink {
        inner: RecordingSink::default(),
        origin: "https://b.example".to_string(),
    };
    let recorded = sink.inner.clone();
    let batches = build_batches(
        &[BaseRequest::new("https://example.com", "GET")],
        &only(&["https://a.example", "https://b.example", "https://c.example"]),
    );

    let dispatcher = Dispatcher::new(Arc::new(RefusingTransport), Box::new(sink));
    let done = dispatcher.run(batches).await.expect("run");

    let origins: Vec<&str> = done[0].transactions.iter().map(|t| t.origin()).collect();
    assert_eq!(
        origins,
        vec!["https://a.example", "https://b.example", "https://c.example"]
    );
    assert_eq!(done[0].transactions[1].tags[0].info, "Transaction Fail");

    let rows: HashSet<String> = recorded.rows().into_iter().collect();
    assert_eq!(
        rows,
        HashSet::from([
            "https://a.example".to_string(),
            "https://c.example".to_string()
        ])
    );
    assert_eq!(recorded.events().last(), Some(&Event::Complete(3)));
}

#[tokio::test]
async fn test_delay_paces_launches() {
    let sink = RecordingSink::default();
    let batches = build_batches(
        &[BaseRequest::new("https://example.com", "GET")],
        &only(&["https://a.example", "https://b.example", "https://c.example"]),
    );

    let started = Instant::now();
    let dispatcher = Dispatcher::new(Arc::new(RefusingTransport), Box::new(sink.clone()))
        .with_delay(Duration::from_millis(100));
    dispatcher.run(batches).await.expect("run");

    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(sink.rows().len(), 3);
}

#[tokio::test]
async fn test_shutdown_stops_launching() {
    let sink = RecordingSink::default();
    let batches = build_batches(
        &[
            BaseRequest::new("https://one.example", "GET"),
            BaseRequest::new("https://two.example", "GET"),
        ],
        &only(&["https://a.example", "https://b.example"]),
    );

    let (tx, rx) = watch::channel(true);
    let dispatcher =
        Dispatcher::new(Arc::new(RefusingTransport), Box::new(sink.clone())).with_shutdown(rx);
    let done = dispatcher.run(batches).await.expect("run");
    drop(tx);

    assert!(done.is_empty());
    assert_eq!(sink.events(), vec![Event::Complete(0)]);
}

#[tokio::test]
async fn test_shutdown_during_delay_joins_in_flight() {
    let sink = RecordingSink::default();
    let batches = build_batches(
        &[BaseRequest::new("https://example.com", "GET")],
        &only(&["https://a.example", "https://b.example", "https://c.example"]),
    );

    let (tx, rx) = watch::channel(false);
    let dispatcher = Dispatcher::new(Arc::new(RefusingTransport), Box::new(sink.clone()))
        .with_delay(Duration::from_secs(5))
        .with_shutdown(rx);

    let handle = tokio::spawn(async move { dispatcher.run(batches).await });
    tokio::time::sleep(Duration::from_millis(200)).await;
    tx.send(true).expect("send shutdown");

    let done = handle.await.expect("join").expect("run");
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].transactions.len(), 1);
    assert_eq!(done[0].transactions[0].origin(), "https://a.example");
    assert_eq!(sink.rows(), vec!["https://a.example".to_string()]);
}

#[tokio::test]
async fn test_origin_header_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("origin", "null"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Access-Control-Allow-Origin", "null")
                .insert_header("Vary", "Origin"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let client = HttpClient::from_config(&test_config(&mock_server.uri())).expect("client");
    let batches = build_batches(
        &[BaseRequest::new(mock_server.uri(), "GET")],
        &GeneratorOptions::default(),
    );

    let dispatcher = Dispatcher::new(Arc::new(client), Box::new(RecordingSink::default()));
    let done = dispatcher.run(batches).await.expect("run");

    let null = done[0]
        .transactions
        .iter()
        .find(|t| t.origin() == "null")
        .expect("null origin");
    let infos: Vec<&str> = null.tags.iter().map(|t| t.info.as_str()).collect();
    assert_eq!(infos, vec!["AC*", "ACAO:null"]);

    let others = done[0]
        .transactions
        .iter()
        .filter(|t| t.origin() != "null")
        .all(|t| t.status_code() == 403 && t.tags.is_empty());
    assert!(others);
}
