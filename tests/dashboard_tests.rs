use health_board::preferences::{CookieJar, DarkModePreference};
use health_board::render::{render_page, NoticeKind, TableRow, ERROR_MESSAGE};
use health_board::{Dashboard, HealthBoardClient, Phase, Theme};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn dashboard_for(server: &MockServer, preference: DarkModePreference) -> Dashboard {
    let client =
        HealthBoardClient::new(&format!("{}/api", server.uri()), Duration::from_secs(5)).unwrap();
    Dashboard::new(Arc::new(client), preference, Duration::from_secs(30))
}

async fn mount_status_config(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/status-config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "passing": {"color": "green", "pulse": false},
            "unknown": {"color": "grey", "pulse": false}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_health_500_renders_one_error_row() {
    let server = MockServer::start().await;
    mount_status_config(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dashboard = dashboard_for(&server, DarkModePreference::default());
    dashboard.initialize().await;

    assert_eq!(dashboard.phase().await, Phase::Polling);
    let table = dashboard.current_table().await;
    assert_eq!(table.rows, vec![TableRow::Notice(NoticeKind::Error)]);
    assert_eq!(table.to_html().unwrap().matches("<tr>").count(), 1);
    assert!(render_page(&table).unwrap().contains(ERROR_MESSAGE));
}

#[tokio::test]
async fn test_missing_status_config_endpoint_still_renders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Builds": {"Main Build": {"status": "passing"}, "Release Build": {}},
            "Infra": {}
        })))
        .mount(&server)
        .await;

    let dashboard = dashboard_for(&server, DarkModePreference::default());
    dashboard.initialize().await;

    let table = dashboard.current_table().await;
    assert_eq!(table.rows.len(), 3);
    assert!(table
        .item_rows()
        .all(|row| row.status.icon_class == "status-icon status-unknown"));
}

#[tokio::test]
async fn test_slow_older_response_does_not_overwrite_newer() {
    let server = MockServer::start().await;
    mount_status_config(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"Old": {}}))
                .set_delay(Duration::from_millis(500)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"New": {}})))
        .mount(&server)
        .await;

    let dashboard = dashboard_for(&server, DarkModePreference::default());

    let slow = dashboard.clone();
    let slow_fetch = tokio::spawn(async move { slow.fetch_health_data().await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    dashboard.fetch_health_data().await;
    slow_fetch.await.unwrap();

    let snapshot = dashboard.snapshot().await.unwrap();
    assert_eq!(snapshot.categories[0].name, "New");
    assert_eq!(dashboard.stats().discarded, 1);
}

#[tokio::test]
async fn test_dark_mode_cookie_persists_across_dashboards() {
    let server = MockServer::start().await;
    mount_status_config(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Infra": {}})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cookie_file = dir.path().join("cookies");

    let jar = CookieJar::load(&cookie_file).await.unwrap();
    let dashboard = dashboard_for(&server, DarkModePreference::new(jar));
    dashboard.initialize().await;
    assert_eq!(dashboard.theme().await, Theme::Light);

    assert_eq!(dashboard.toggle_dark_mode().await, Theme::Dark);
    let page = render_page(&dashboard.current_table().await).unwrap();
    assert!(page.contains(r#"<body class="dark-mode">"#));

    let contents = tokio::fs::read_to_string(&cookie_file).await.unwrap();
    assert!(contents.starts_with("darkMode=true; expires="));
    assert!(contents.trim_end().ends_with("; path=/"));

    let jar = CookieJar::load(&cookie_file).await.unwrap();
    let reopened = dashboard_for(&server, DarkModePreference::new(jar));
    reopened.initialize().await;
    assert_eq!(reopened.theme().await, Theme::Dark);
    assert_eq!(reopened.current_table().await.theme, Theme::Dark);
}
