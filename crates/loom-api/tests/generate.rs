mod common;

use std::time::Duration;

use axum::http::{StatusCode, header};
use serde_json::json;

use loom_rag::chunk_text;

use common::{
    COLLECTION, Part, TestApp, VECTOR_DIM, body_bytes, body_json, empty_request, json_request, multipart_request,
    pdf_with_pages,
};

#[tokio::test]
async fn text_generation_reports_tokens_and_cost() {
    let app = TestApp::new();
    let res = app
        .send(json_request(
            "POST",
            "/generate/text",
            json!({ "model": "tinyLlama", "prompt": "hello", "temperature": 0.2 }),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["content"], "echo hello");
    assert_eq!(body["model"], "tinyLlama");
    assert_eq!(body["tokens"], 2);
    assert!((body["cost"].as_f64().unwrap() - 0.006).abs() < 1e-9);
    assert_eq!(body["request_id"].as_str().unwrap().len(), 32);
    assert_eq!(app.prompts.lock().unwrap().as_slice(), ["hello"]);
}

#[tokio::test]
async fn unsupported_text_model_is_rejected() {
    let app = TestApp::new();
    let res = app
        .send(json_request(
            "POST",
            "/generate/text",
            json!({ "model": "gpt-4", "prompt": "hello" }),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["detail"], "Model gpt-4 is not supported");
    assert!(app.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn retrieved_chunks_are_appended_to_the_prompt() {
    let app = TestApp::new();
    let chunks = chunk_text("abba dab", 8).unwrap();
    let embeddings = vec![vec![2.0, 3.0, 0.0, 1.0]];
    app.state
        .ingestor
        .store("notes.txt", &chunks, &embeddings, COLLECTION, VECTOR_DIM)
        .await
        .unwrap();

    let res = app
        .send(json_request(
            "POST",
            "/generate/text",
            json!({ "model": "gemma2b", "prompt": "a cab" }),
        ))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["content"], "echo a cab abba dab");
}

#[tokio::test]
async fn image_is_returned_as_png() {
    let app = TestApp::new();
    let res = app.send(empty_request("GET", "/generate/image?prompt=test%20cat")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");

    let png = body_bytes(res).await;
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
async fn non_square_images_are_rejected() {
    let app = TestApp::new();
    let res = app
        .send(empty_request(
            "GET",
            "/generate/image?prompt=cat&width=512&height=1024",
        ))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["detail"], "Only square images are supported");
}

#[tokio::test]
async fn audio_is_returned_as_wav() {
    let app = TestApp::new();
    let res = app.send(empty_request("GET", "/generate/audio?prompt=hi")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "audio/wav");

    let wav = body_bytes(res).await;
    assert_eq!(&wav[..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
}

#[tokio::test]
async fn unknown_voice_preset_is_rejected() {
    let app = TestApp::new();
    let res = app
        .send(empty_request("GET", "/generate/audio?prompt=hi&preset=v2/de_speaker_3"))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn video_validates_its_form() {
    let app = TestApp::new();

    let res = app
        .send(multipart_request(
            "/generate/video",
            &[Part {
                name: "num_frames",
                filename: None,
                content_type: None,
                data: b"10",
            }],
        ))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["detail"], "Missing image field");

    let res = app
        .send(multipart_request(
            "/generate/video",
            &[
                Part {
                    name: "image",
                    filename: Some("still.png"),
                    content_type: Some("image/png"),
                    data: b"not an image",
                },
                Part {
                    name: "num_frames",
                    filename: None,
                    content_type: None,
                    data: b"0",
                },
            ],
        ))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_pdf_uploads_are_rejected() {
    let app = TestApp::new();
    let res = app
        .send(multipart_request(
            "/generate/upload",
            &[Part {
                name: "file",
                filename: Some("notes.txt"),
                content_type: Some("text/plain"),
                data: b"abba dab",
            }],
        ))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(res).await["detail"],
        "Only uploading PDF documents are supported"
    );
    assert!(!app.state.settings.upload_dir.exists());
    assert!(app.index.is_empty(COLLECTION));
}

#[tokio::test]
async fn pdf_uploads_are_saved() {
    let app = TestApp::new();
    let res = app
        .send(multipart_request(
            "/generate/upload",
            &[Part {
                name: "file",
                filename: Some("report.pdf"),
                content_type: Some("application/pdf"),
                data: b"%PDF-1.4 truncated",
            }],
        ))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["filename"], "report.pdf");
    assert_eq!(body["message"], "File uploaded successfully");
    assert!(app.state.settings.upload_dir.join("report.pdf").exists());
}

#[tokio::test]
async fn uploaded_pdf_is_ingested_in_the_background() {
    let app = TestApp::new();
    let pdf = pdf_with_pages(&["abba dab cab", "bad cab dad"]);
    let res = app
        .send(multipart_request(
            "/generate/upload",
            &[Part {
                name: "file",
                filename: Some("letters.pdf"),
                content_type: Some("application/pdf"),
                data: &pdf,
            }],
        ))
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    for _ in 0..100 {
        if app.index.len(COLLECTION) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(app.index.len(COLLECTION) > 0);

    let upload_dir = &app.state.settings.upload_dir;
    assert!(upload_dir.join("letters.pdf").exists());
    let text = std::fs::read_to_string(upload_dir.join("letters.pdf.txt")).unwrap();
    assert!(text.contains("abba dab cab"));
    assert!(text.contains("bad cab dad"));
}
