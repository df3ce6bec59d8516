//! Store client integration against a local HTTP stub

mod common;

use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

use common::MockSdk;
use posterforge::error::Error;
use posterforge::platform::SessionAdapter;
use posterforge::rendering::CompositeBlob;
use posterforge::store::ImageStoreClient;
use posterforge::{EventType, RuntimeSettings};
use tiny_http::{Header, Method, Response, Server};

static INIT: Once = Once::new();

fn json_header() -> Header {
    "Content-Type: application/json".parse::<Header>().unwrap()
}

/// Start the stub store server. The first save is rejected with a
/// user-identifier validation error; later saves succeed.
fn start_store_stub() -> String {
    INIT.call_once(|| {
        std::thread::spawn(|| {
            let server = Server::http("127.0.0.1:18090").unwrap();
            let save_calls = AtomicUsize::new(0);

            for mut request in server.incoming_requests() {
                let path = request.url().to_string();
                let method = request.method().clone();
                // drain the (possibly binary multipart) body before responding
                let mut body = Vec::new();
                let _ = request.as_reader().read_to_end(&mut body);

                let response = if method == Method::Post && path.starts_with("/gba60/images") {
                    if save_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Response::from_string(r#"{"message":"The user id field is invalid"}"#)
                            .with_status_code(422)
                            .with_header(json_header())
                    } else {
                        Response::from_string(r#"{"id":"img_1","status":"saved"}"#)
                            .with_status_code(201)
                            .with_header(json_header())
                    }
                } else if path.starts_with("/gba60/images/count") {
                    Response::from_string(r#"{"count":1,"remaining":4}"#)
                        .with_header(json_header())
                } else if path.starts_with("/gba60/images/missing") {
                    Response::from_string(r#"{"message":"Image not found"}"#)
                        .with_status_code(404)
                        .with_header(json_header())
                } else if path.starts_with("/gba60/images/boom") {
                    Response::from_string("").with_status_code(500)
                } else if path.starts_with("/gba60/images") {
                    Response::from_string(r#"{"data":[]}"#).with_header(json_header())
                } else {
                    Response::from_string("Not Found").with_status_code(404)
                };
                let _ = request.respond(response);
            }
        });
        // Give the server time to start
        std::thread::sleep(std::time::Duration::from_millis(100));
    });

    "http://127.0.0.1:18090".to_string()
}

fn stub_settings() -> RuntimeSettings {
    let mut settings = RuntimeSettings::default();
    settings.store.base_url = start_store_stub();
    settings
}

fn sample_blob() -> CompositeBlob {
    CompositeBlob::new(vec![0x89, 0x50, 0x4e, 0x47], "image/png")
}

#[tokio::test]
async fn count_and_history_roundtrip() {
    let client = ImageStoreClient::new(&stub_settings()).unwrap();

    let count = client
        .image_count("dev_user_1", EventType::Cheer)
        .await
        .expect("count");
    assert_eq!(count["count"], 1);
    assert_eq!(count["remaining"], 4);

    let history = client
        .image_history("dev_user_1", EventType::Cheer)
        .await
        .expect("history");
    assert!(history["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn error_body_message_is_surfaced() {
    let client = ImageStoreClient::new(&stub_settings()).unwrap();
    let err = client.image_detail("missing", None).await.unwrap_err();
    match err {
        Error::StoreError(message) => assert_eq!(message, "Image not found"),
        other => panic!("expected store error, got {other:?}"),
    }
}

#[tokio::test]
async fn status_table_backs_up_missing_error_message() {
    let client = ImageStoreClient::new(&stub_settings()).unwrap();
    let err = client
        .image_detail("boom", Some("dev_user_1"))
        .await
        .unwrap_err();
    match err {
        Error::StoreError(message) => assert_eq!(message, "Internal server error"),
        other => panic!("expected store error, got {other:?}"),
    }
}

#[tokio::test]
async fn save_recovers_once_from_a_user_identifier_rejection() {
    let settings = stub_settings();
    let client = ImageStoreClient::new(&settings).unwrap();
    // platform disabled: the session degrades to a synthetic identity
    let session = SessionAdapter::new(&settings, MockSdk::default());
    session.initialize().await;

    let saved = client
        .save_with_recovery(&session, EventType::Cheer, "應援!", &sample_blob())
        .await
        .expect("save succeeds after the single retry");
    assert_eq!(saved["id"], "img_1");
}
