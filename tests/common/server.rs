//! Mock API helpers built on wiremock

use std::time::Duration;

use detail_loader::Config;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{StoryRecord, png_bytes};

/// Config whose record endpoint points at `server`
pub fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.http.record_url_template = format!("{}/stories/{{id}}", server.uri());
    config.http.request_timeout = Duration::from_secs(5);
    config
}

/// Absolute URL of `path` on `server`
pub fn url_on(server: &MockServer, path: &str) -> String {
    format!("{}{}", server.uri(), path)
}

/// Serve `story` at `/stories/{id}`, optionally delayed
pub async fn mount_story(server: &MockServer, story: &StoryRecord, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(format!("/stories/{}", story.id)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(story)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Serve a PNG of the given size at `image_path`, optionally delayed
pub async fn mount_png(
    server: &MockServer,
    image_path: &str,
    width: u32,
    height: u32,
    delay: Duration,
) {
    Mock::given(method("GET"))
        .and(path(image_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/png")
                .set_body_bytes(png_bytes(width, height))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Answer `request_path` with a bare status code
pub async fn mount_status(server: &MockServer, request_path: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(request_path))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Paths of every request the server has seen, in arrival order
pub async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}
