//! End-to-end generation scenarios against the mock provider and storage

mod harness;

use std::time::Duration;

use harness::config::{BUCKET, ConfigBuilder, PUBLIC_BASE, TOKEN};
use harness::mock_google::{CAPTION, MockGoogle, ProviderBehavior};
use harness::server::TestServer;
use serde_json::{Value, json};

async fn start(behavior: ProviderBehavior) -> (MockGoogle, TestServer) {
    let mock = MockGoogle::start(behavior).await.unwrap();
    let server = TestServer::start(ConfigBuilder::new(&mock).build()).await.unwrap();
    (mock, server)
}

async fn error_message(resp: reqwest::Response) -> String {
    assert_eq!(resp.status(), 500);
    let json: Value = resp.json().await.unwrap();
    json["error"]["message"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn standard_mode_generates_and_stores_images() {
    let (mock, server) = start(ProviderBehavior::Images).await;

    let resp = server
        .generate(&json!({
            "mode": "standard",
            "prompt": "a red cube on a white table",
            "aspectRatio": "4:3",
            "resolutionHint": 2048,
            "imageCount": 2
        }))
        .await;

    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    let images = json["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);

    let prefix = format!("{PUBLIC_BASE}/{BUCKET}/generated/");
    for image in images {
        assert!(image["url"].as_str().unwrap().starts_with(&prefix), "{image}");
        assert!(image["url"].as_str().unwrap().ends_with(".png"));
        assert_eq!(image["prompt"], "a red cube on a white table");
        assert_eq!(image["aspectRatio"], "4:3");
        assert_eq!(image["sizeLabel"], "2K");
        assert_eq!(image["mode"], "standard");
        assert!(image.get("auxiliaryText").is_none());
    }
    assert_ne!(images[0]["url"], images[1]["url"]);

    // One single-shot call that asked for both images
    let calls = mock.provider_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].target, "imagen-4.0-generate-001:predict");
    assert_eq!(calls[0].location, "us-central1");
    assert_eq!(calls[0].authorization.as_deref(), Some(format!("Bearer {TOKEN}").as_str()));
    assert_eq!(calls[0].body["parameters"]["sampleCount"], 2);
    assert_eq!(calls[0].body["parameters"]["sampleImageSize"], "2K");
    assert_eq!(calls[0].body["parameters"]["includeRaiReason"], true);

    // Uploaded with provenance, then made public
    let uploads = mock.uploads();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[0]["contentType"], "image/png");
    assert_eq!(uploads[0]["cacheControl"], "public, max-age=31536000");
    assert_eq!(uploads[0]["metadata"]["prompt"], "a red cube on a white table");
    assert_eq!(uploads[0]["metadata"]["mode"], "standard");

    let mut public = mock.public_objects();
    let mut uploaded: Vec<String> = uploads.iter().map(|u| u["name"].as_str().unwrap().to_owned()).collect();
    public.sort();
    uploaded.sort();
    assert_eq!(public, uploaded);
}

#[tokio::test]
async fn upscale_without_reference_image_fails_before_any_call() {
    let (mock, server) = start(ProviderBehavior::Images).await;

    let resp = server.generate(&json!({ "mode": "upscale", "upscaleLevel": 4096 })).await;

    let message = error_message(resp).await;
    assert!(message.contains("reference image"), "{message}");
    assert_eq!(mock.provider_count(), 0);
    assert!(mock.uploads().is_empty());
}

#[tokio::test]
async fn upscale_sends_factor_and_reports_it() {
    let (mock, server) = start(ProviderBehavior::Images).await;

    let resp = server
        .generate(&json!({
            "mode": "upscale",
            "upscaleLevel": 4096,
            "referenceImages": [{ "base64Data": "iVBORw0KGgo=", "mimeType": "image/png" }]
        }))
        .await;

    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["images"][0]["sizeLabel"], "x4");
    assert_eq!(json["images"][0]["prompt"], "Upscale the image");

    let calls = mock.provider_calls();
    assert_eq!(calls[0].target, "imagen-4.0-upscale-preview:predict");
    assert_eq!(calls[0].body["parameters"]["mode"], "upscale");
    assert_eq!(calls[0].body["parameters"]["upscaleConfig"]["upscaleFactor"], "x4");
}

#[tokio::test]
async fn fan_out_returns_only_the_slot_that_succeeded() {
    let (mock, server) = start(ProviderBehavior::SucceedOnce).await;

    let resp = server
        .generate(&json!({
            "mode": "multimodal-v1",
            "prompt": "a lighthouse in a storm",
            "imageCount": 4
        }))
        .await;

    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    let images = json["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0]["auxiliaryText"], CAPTION);
    assert_eq!(images[0]["mode"], "multimodal-v1");

    // One success plus three slots that each exhausted three attempts
    assert_eq!(mock.provider_count(), 1 + 3 * 3);
    assert_eq!(mock.uploads().len(), 1);
}

#[tokio::test]
async fn refusal_from_every_slot_surfaces_the_reason() {
    let (mock, server) = start(ProviderBehavior::Text(
        "I can't generate images that depict real public figures.".to_owned(),
    ))
    .await;

    let resp = server
        .generate(&json!({
            "mode": "multimodal-v2",
            "prompt": "a famous politician",
            "imageCount": 4
        }))
        .await;

    let message = error_message(resp).await;
    assert!(message.contains("I can't generate images that depict real public figures."), "{message}");

    // Refusals are never retried
    assert_eq!(mock.provider_count(), 4);
    assert!(mock.uploads().is_empty());
}

#[tokio::test]
async fn predict_refusal_is_not_retried() {
    let (mock, server) = start(ProviderBehavior::Text("Filtered by safety policy.".to_owned())).await;

    let resp = server.generate(&json!({ "mode": "fast", "prompt": "something" })).await;

    let message = error_message(resp).await;
    assert!(message.contains("Filtered by safety policy."), "{message}");
    assert_eq!(mock.provider_count(), 1);
}

#[tokio::test]
async fn exhausted_transport_failures_ask_to_retry_later() {
    let (mock, server) = start(ProviderBehavior::FailAll(503)).await;

    let resp = server.generate(&json!({ "mode": "standard", "prompt": "a cat" })).await;

    let message = error_message(resp).await;
    assert!(message.contains("try again"), "{message}");
    assert_eq!(mock.provider_count(), 3);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let (mock, server) = start(ProviderBehavior::FailFirst(2)).await;

    let resp = server.generate(&json!({ "mode": "ultra", "prompt": "a cat" })).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(mock.provider_count(), 3);
}

#[tokio::test]
async fn alias_resolves_to_canonical_mode_and_global_location() {
    let (mock, server) = start(ProviderBehavior::Images).await;

    let resp = server
        .generate(&json!({
            "mode": "multimodal",
            "prompt": "a koi pond",
            "resolutionHint": 4096,
            "referenceImages": [{ "base64Data": "cmVm" }]
        }))
        .await;

    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["images"][0]["mode"], "multimodal-v2");
    assert_eq!(json["images"][0]["sizeLabel"], "4K");

    let calls = mock.provider_calls();
    assert_eq!(calls[0].location, "global");
    assert_eq!(calls[0].target, "gemini-3-pro-image-preview:generateContent");

    let parts = calls[0].body["contents"][0]["parts"].as_array().unwrap();
    assert!(parts[0]["text"].as_str().unwrap().ends_with("a koi pond"));
    assert_eq!(parts[1]["inlineData"]["data"], "cmVm");
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
}

#[tokio::test]
async fn resolution_above_mode_ceiling_reports_served_tier() {
    let (_mock, server) = start(ProviderBehavior::Images).await;

    let resp = server
        .generate(&json!({ "mode": "ultra", "prompt": "a cat", "resolutionHint": 4096 }))
        .await;

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["images"][0]["sizeLabel"], "2K");
}

#[tokio::test]
async fn configured_model_override_is_used() {
    let mock = MockGoogle::start(ProviderBehavior::Images).await.unwrap();
    let config = ConfigBuilder::new(&mock).with_ultra_model("imagen-custom-001").build();
    let server = TestServer::start(config).await.unwrap();

    let resp = server.generate(&json!({ "mode": "ultra", "prompt": "a cat" })).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(mock.provider_calls()[0].target, "imagen-custom-001:predict");
}

#[tokio::test]
async fn unknown_mode_is_rejected() {
    let (mock, server) = start(ProviderBehavior::Images).await;

    let resp = server.generate(&json!({ "mode": "turbo", "prompt": "a cat" })).await;

    let message = error_message(resp).await;
    assert!(message.contains("unknown mode 'turbo'"), "{message}");
    assert_eq!(mock.provider_count(), 0);
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let (mock, server) = start(ProviderBehavior::Images).await;

    let resp = server
        .client()
        .post(server.url("/api/generate"))
        .header("content-type", "application/json")
        .body("{ \"mode\": ")
        .send()
        .await
        .unwrap();

    let message = error_message(resp).await;
    assert!(message.contains("malformed JSON"), "{message}");
    assert_eq!(mock.provider_count(), 0);
}

#[tokio::test]
async fn storage_failure_fails_the_request() {
    let mock = MockGoogle::start_with_failing_storage().await.unwrap();
    let server = TestServer::start(ConfigBuilder::new(&mock).build()).await.unwrap();

    let resp = server.generate(&json!({ "mode": "fast", "prompt": "a cat", "imageCount": 2 })).await;

    let message = error_message(resp).await;
    assert_eq!(message, "Failed to store generated images");
}

#[tokio::test]
async fn slow_upscale_hitting_the_ceiling_gets_guidance() {
    let mock = MockGoogle::start(ProviderBehavior::Hang(Duration::from_secs(5))).await.unwrap();
    let config = ConfigBuilder::new(&mock).with_execution_ceiling("300ms").build();
    let server = TestServer::start(config).await.unwrap();

    let resp = server
        .generate(&json!({
            "mode": "upscale",
            "referenceImages": [{ "base64Data": "iVBORw0KGgo=" }]
        }))
        .await;

    let message = error_message(resp).await;
    assert!(message.contains("smaller source image"), "{message}");
}
