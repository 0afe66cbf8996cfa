#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Every test gets its own [`TestApp`] with a fresh public directory and the
//! REAL router, so tests can run in parallel without sharing files.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use pinup_server::{AppState, Config, app};
use pinup_test_utils::{MultipartForm, TestPublicDir};

/// PIN configured for every test app.
pub const TEST_PIN: &str = "12345";

/// Test application wrapper using the REAL routes and state.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub public: TestPublicDir,
}

impl TestApp {
    /// Create a test application with default limits.
    pub async fn new() -> Self {
        Self::with_config(|config| config).await
    }

    /// Create a test application, adjusting the configuration first.
    pub async fn with_config(adjust: impl FnOnce(Config) -> Config) -> Self {
        let public = TestPublicDir::new();
        let config = adjust(Config::new(TEST_PIN).with_public_dir(public.path()));

        let state = AppState::new(config);
        state
            .storage()
            .ensure_directory()
            .await
            .expect("Failed to create upload directory");

        let router = app(state.clone());

        Self {
            router,
            state,
            public,
        }
    }

    /// Send a request through the router.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// POST a multipart form to /upload.
    pub async fn upload(&self, form: MultipartForm) -> Response {
        let content_type = form.content_type();
        self.request(
            Request::post("/upload")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(form.finish()))
                .unwrap(),
        )
        .await
    }

    /// GET a path.
    pub async fn get(&self, path: &str) -> Response {
        self.request(Request::get(path).body(Body::empty()).unwrap())
            .await
    }
}

/// A form with a PIN and one image.
pub fn image_form(pin: &str, filename: &str, data: &[u8]) -> MultipartForm {
    MultipartForm::new()
        .text("pinCode", pin)
        .file("imageFile", filename, "image/jpeg", data)
}

pub async fn response_json(response: Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap_or_else(|_| {
        let text = String::from_utf8_lossy(&body);
        panic!("Failed to parse JSON: {text}");
    })
}

pub async fn response_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}
