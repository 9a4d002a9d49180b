//! End-to-end pipeline behaviour with stubbed collaborators.

use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};

use edge_image_gateway::edge::event::{CustomOrigin, OriginProtocol};
use edge_image_gateway::pipeline::{HttpOriginFetcher, Pipeline};

mod common;
use common::{
    event_for, origin_at, settings, CopyTransformer, CountingFetcher, FailingTransformer,
    OriginReply, PartialBodyFetcher, SilentTransformer, VanishingScratchFetcher, FIXTURE_PNG,
};

fn stub_origin() -> CustomOrigin {
    CustomOrigin {
        protocol: OriginProtocol::Https,
        domain_name: "origin.example.com".into(),
        path: "/originals".into(),
    }
}

fn png_reply() -> OriginReply {
    OriginReply::new(
        200,
        &[("Content-Type", "image/png"), ("Connection", "keep-alive")],
        FIXTURE_PNG,
    )
}

#[tokio::test]
async fn test_scenario_a_resizes_and_filters_headers() {
    let scratch = tempfile::tempdir().unwrap();
    let (addr, seen) = common::start_static_origin(png_reply()).await;

    let transformer = CopyTransformer::new();
    let pipeline = Pipeline::new(
        settings(scratch.path(), 2000),
        Arc::new(HttpOriginFetcher::new().unwrap()),
        transformer.clone(),
    );

    let response = pipeline
        .invoke(&event_for(origin_at(addr), "width=50&height=50"))
        .await;

    assert_eq!(response.status, "200");
    assert_eq!(response.status_description, "OK");
    assert!(response.headers.contains("content-type"));
    assert!(!response.headers.contains("connection"));
    assert!(!response.headers.contains("content-length"));
    assert!(!response.body.as_deref().unwrap_or_default().is_empty());

    let specs = transformer.specs();
    assert_eq!(specs.len(), 1);
    assert_eq!((specs[0].width, specs[0].height), (50, 50));
    assert_eq!(specs[0].quality, 80);

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests, vec!["GET /originals/cat.png HTTP/1.1".to_string()]);
}

#[tokio::test]
async fn test_scenario_b_passes_origin_status_through() {
    let scratch = tempfile::tempdir().unwrap();
    let (addr, _) = common::start_static_origin(OriginReply::new(404, &[("X-Cache", "Miss")], b"nope")).await;

    let transformer = CopyTransformer::new();
    let pipeline = Pipeline::new(
        settings(scratch.path(), 2000),
        Arc::new(HttpOriginFetcher::new().unwrap()),
        transformer.clone(),
    );

    let response = pipeline.invoke(&event_for(origin_at(addr), "")).await;
    assert_eq!(response.status, "404");
    assert!(response.headers.is_empty());
    assert!(response.body.is_none());
    assert!(transformer.specs().is_empty());

    let json = serde_json::to_value(&response).unwrap();
    assert!(json.get("body").is_none());
    assert_eq!(json["headers"], serde_json::json!({}));
}

#[tokio::test]
async fn test_redirects_are_forwarded_not_followed() {
    let scratch = tempfile::tempdir().unwrap();
    let (addr, seen) = common::start_static_origin(OriginReply::new(
        301,
        &[("Location", "/elsewhere.png"), ("X-Amz-Cf-Id", "abc")],
        b"",
    ))
    .await;

    let pipeline = Pipeline::new(
        settings(scratch.path(), 2000),
        Arc::new(HttpOriginFetcher::new().unwrap()),
        CopyTransformer::new(),
    );

    let response = pipeline.invoke(&event_for(origin_at(addr), "")).await;
    assert_eq!(response.status, "301");
    assert_eq!(response.headers.get("location").unwrap().value, "/elsewhere.png");
    assert!(!response.headers.contains("x-amz-cf-id"));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_scenario_c_transform_failure() {
    let scratch = tempfile::tempdir().unwrap();
    let fetcher = CountingFetcher::new(png_reply());
    let pipeline = Pipeline::new(
        settings(scratch.path(), 2000),
        fetcher.clone(),
        Arc::new(FailingTransformer),
    );

    let response = pipeline.invoke(&event_for(stub_origin(), "width=10")).await;
    assert_eq!(response.status, "500");
    assert!(response.status_description.contains("resizing"));
    assert!(response.body.is_none());
    assert!(response.headers.is_empty());
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_unreadable_output_is_distinct_failure() {
    let scratch = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(
        settings(scratch.path(), 2000),
        CountingFetcher::new(png_reply()),
        Arc::new(SilentTransformer),
    );

    let response = pipeline.invoke(&event_for(stub_origin(), "")).await;
    assert_eq!(response.status, "500");
    assert_eq!(response.status_description, "Error reading the resized image");
}

#[tokio::test]
async fn test_scenario_d_oversized_request_clamps() {
    let scratch = tempfile::tempdir().unwrap();
    let transformer = CopyTransformer::new();
    let pipeline = Pipeline::new(
        settings(scratch.path(), 2000),
        CountingFetcher::new(png_reply()),
        transformer.clone(),
    );

    let response = pipeline
        .invoke(&event_for(stub_origin(), "width=99999&height=99999"))
        .await;
    assert_eq!(response.status, "200");

    let spec = &transformer.specs()[0];
    assert_eq!((spec.width, spec.height), (2000, 2000));
    assert_eq!(spec.geometry(), "2000x2000>");
}

#[tokio::test]
async fn test_absent_dimensions_use_configured_ceiling() {
    let scratch = tempfile::tempdir().unwrap();
    let transformer = CopyTransformer::new();
    let pipeline = Pipeline::new(
        settings(scratch.path(), 2500),
        CountingFetcher::new(png_reply()),
        transformer.clone(),
    );

    pipeline.invoke(&event_for(stub_origin(), "")).await;
    let spec = &transformer.specs()[0];
    assert_eq!((spec.width, spec.height), (2500, 2500));
}

#[tokio::test]
async fn test_non_numeric_rejected_without_fetching() {
    let scratch = tempfile::tempdir().unwrap();
    let fetcher = CountingFetcher::new(png_reply());
    let transformer = CopyTransformer::new();
    let pipeline = Pipeline::new(
        settings(scratch.path(), 2000),
        fetcher.clone(),
        transformer.clone(),
    );

    for query in ["width=abc", "height=ten", "width=10&height=1e3", "width=12.5"] {
        let response = pipeline.invoke(&event_for(stub_origin(), query)).await;
        assert_eq!(response.status, "400", "{query}");
        assert_eq!(response.status_description, "Invalid input");
        assert!(response.body.is_none());
    }

    assert_eq!(fetcher.calls(), 0);
    assert!(transformer.specs().is_empty());
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_lenient_policy_clamps_non_numeric() {
    let scratch = tempfile::tempdir().unwrap();
    let fetcher = CountingFetcher::new(png_reply());
    let transformer = CopyTransformer::new();
    let mut lenient = settings(scratch.path(), 2000);
    lenient.dimensions.reject_invalid = false;
    lenient.sharpen = Some("0x1".into());
    let pipeline = Pipeline::new(lenient, fetcher.clone(), transformer.clone());

    let response = pipeline.invoke(&event_for(stub_origin(), "width=abc&height=30")).await;
    assert_eq!(response.status, "200");
    assert_eq!(fetcher.calls(), 1);

    let spec = &transformer.specs()[0];
    assert_eq!((spec.width, spec.height), (2000, 30));
    assert_eq!(spec.sharpen.as_deref(), Some("0x1"));
}

#[tokio::test]
async fn test_round_trip_body_matches_fixture() {
    let scratch = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(
        settings(scratch.path(), 2000),
        CountingFetcher::new(png_reply()),
        CopyTransformer::new(),
    );

    let response = pipeline.invoke(&event_for(stub_origin(), "width=5")).await;
    let body = response.body.as_deref().unwrap();
    assert_eq!(general_purpose::STANDARD.decode(body).unwrap(), FIXTURE_PNG);
    assert_eq!(response.decoded_body().unwrap().unwrap(), FIXTURE_PNG);
}

#[tokio::test]
async fn test_identical_invocations_are_identical() {
    let scratch = tempfile::tempdir().unwrap();
    let fetcher = CountingFetcher::new(OriginReply::new(
        200,
        &[
            ("Content-Type", "image/png"),
            ("Cache-Control", "max-age=300"),
            ("ETag", "\"abc\""),
            ("X-Edge-Location", "FRA"),
        ],
        FIXTURE_PNG,
    ));
    let pipeline = Pipeline::new(settings(scratch.path(), 2000), fetcher.clone(), CopyTransformer::new());

    let event = event_for(stub_origin(), "width=8&height=8");
    let first = pipeline.invoke(&event).await;
    let second = pipeline.invoke(&event).await;

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(
        fetcher.urls()[0],
        "https://origin.example.com/originals/cat.png"
    );
}

#[tokio::test]
async fn test_scratch_is_per_invocation_and_released() {
    let scratch = tempfile::tempdir().unwrap();
    let transformer = CopyTransformer::new();
    let pipeline = Pipeline::new(
        settings(scratch.path(), 2000),
        CountingFetcher::new(png_reply()),
        transformer.clone(),
    );

    pipeline.invoke(&event_for(stub_origin(), "")).await;
    pipeline.invoke(&event_for(stub_origin(), "")).await;

    let roots = transformer.scratch_roots();
    assert_eq!(roots.len(), 2);
    assert_ne!(roots[0], roots[1]);
    assert!(roots.iter().all(|root| !root.exists()));
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unreachable_origin_is_download_error() {
    let scratch = tempfile::tempdir().unwrap();
    // Bind then drop to get a port nobody is listening on.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let pipeline = Pipeline::new(
        settings(scratch.path(), 2000),
        Arc::new(HttpOriginFetcher::new().unwrap()),
        CopyTransformer::new(),
    );
    let response = pipeline.invoke(&event_for(origin_at(addr), "")).await;
    assert_eq!(response.status, "500");
    assert_eq!(response.status_description, "Error downloading the image");
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_missing_scratch_dir_is_write_error() {
    let scratch = tempfile::tempdir().unwrap();
    let fetcher = CountingFetcher::new(png_reply());
    let pipeline = Pipeline::new(
        settings(&scratch.path().join("missing"), 2000),
        fetcher.clone(),
        CopyTransformer::new(),
    );

    let response = pipeline.invoke(&event_for(stub_origin(), "")).await;
    assert_eq!(response.status, "500");
    assert_eq!(response.status_description, "Error writing the image to a file");
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_truncated_origin_body_is_download_error() {
    let scratch = tempfile::tempdir().unwrap();
    let mut raw = b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 1000\r\n\r\n".to_vec();
    raw.extend_from_slice(&FIXTURE_PNG[..10]);
    let (addr, seen) = common::start_raw_origin(raw).await;

    let transformer = CopyTransformer::new();
    let pipeline = Pipeline::new(
        settings(scratch.path(), 2000),
        Arc::new(HttpOriginFetcher::new().unwrap()),
        transformer.clone(),
    );

    let response = pipeline.invoke(&event_for(origin_at(addr), "width=10")).await;
    assert_eq!(response.status, "500");
    assert_eq!(response.status_description, "Error downloading the image");
    assert!(response.body.is_none());
    assert!(transformer.specs().is_empty());
    assert_eq!(seen.lock().unwrap().len(), 1);
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unwritable_sink_after_success_is_write_error() {
    let scratch = tempfile::tempdir().unwrap();
    let (addr, seen) = common::start_static_origin(png_reply()).await;

    let transformer = CopyTransformer::new();
    let pipeline = Pipeline::new(
        settings(scratch.path(), 2000),
        VanishingScratchFetcher::new(),
        transformer.clone(),
    );

    let response = pipeline.invoke(&event_for(origin_at(addr), "")).await;
    assert_eq!(response.status, "500");
    assert_eq!(response.status_description, "Error writing the image to a file");
    assert!(transformer.specs().is_empty());
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_incomplete_body_is_never_transformed() {
    let scratch = tempfile::tempdir().unwrap();
    let transformer = CopyTransformer::new();
    let pipeline = Pipeline::new(
        settings(scratch.path(), 2000),
        Arc::new(PartialBodyFetcher),
        transformer.clone(),
    );

    let response = pipeline.invoke(&event_for(stub_origin(), "")).await;
    assert_eq!(response.status, "500");
    assert_eq!(response.status_description, "Error downloading the image");
    assert!(response.headers.is_empty());
    assert!(transformer.specs().is_empty());
}
