use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use notify_debouncer_mini::notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::data;
use crate::html::{self, Page, Theme};
use crate::order::{self, HttpOrderClient, OrderSubmitter};
use crate::selection::SelectionController;
use crate::types::{DateKey, MarkedDates, WeekRow, YearMonth};

/// Application state shared across requests
pub struct AppState {
    pub controller: Mutex<SelectionController>,
    pub marked: RwLock<MarkedDates>,
    /// Outcome of the last order attempt, shown once
    pub notice: Mutex<Option<String>>,
    pub orders: HttpOrderClient,
    pub data_file: PathBuf,
    pub theme: Theme,
}

impl AppState {
    pub fn new(
        from: NaiveDate,
        marked: MarkedDates,
        orders: HttpOrderClient,
        data_file: PathBuf,
    ) -> Self {
        Self {
            controller: Mutex::new(SelectionController::new(from)),
            marked: RwLock::new(marked),
            notice: Mutex::new(None),
            orders,
            data_file,
            theme: Theme::default(),
        }
    }

    /// Re-read the marked-dates file. Returns `(offers, orders)` counts.
    pub async fn reload(&self) -> anyhow::Result<(usize, usize)> {
        let fresh = data::load_marked_dates(&self.data_file)?;
        let counts = (fresh.offer_days.len(), fresh.order_days.len());
        *self.marked.write().await = fresh;
        Ok(counts)
    }
}

/// Build the router. Every interaction is a POST followed by a redirect back
/// to the page.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/prev", post(prev_handler))
        .route("/next", post(next_handler))
        .route("/select/{date}", post(select_handler))
        .route("/order", post(order_handler))
        .route("/api/grid", get(grid_handler))
        .route("/api/refresh", get(refresh_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server with file watching
pub async fn serve(port: u16, state: AppState) -> anyhow::Result<()> {
    let state = Arc::new(state);

    start_file_watcher(state.clone())?;

    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!(%addr, "Server running");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Watch the marked-dates file and reload it when it changes
fn start_file_watcher(state: Arc<AppState>) -> anyhow::Result<()> {
    let watch_dir = match state.data_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    if !watch_dir.exists() {
        std::fs::create_dir_all(&watch_dir)?;
        info!(dir = %watch_dir.display(), "Created data directory");
    }

    let file_name = state.data_file.file_name().map(|n| n.to_os_string());

    // Create a channel to receive events
    let (tx, mut rx) = tokio::sync::mpsc::channel(10);

    // Spawn a blocking thread for the file watcher
    std::thread::spawn(move || {
        let mut debouncer = match new_debouncer(
            Duration::from_secs(1),
            move |result: DebounceEventResult| {
                if let Ok(events) = result {
                    let touched = events
                        .iter()
                        .any(|e| e.path.file_name().map(|n| n.to_os_string()) == file_name);
                    if touched {
                        let _ = tx.blocking_send(());
                    }
                }
            },
        ) {
            Ok(debouncer) => debouncer,
            Err(e) => {
                error!(error = %e, "Failed to create file watcher");
                return;
            }
        };

        if let Err(e) = debouncer
            .watcher()
            .watch(&watch_dir, RecursiveMode::NonRecursive)
        {
            error!(dir = %watch_dir.display(), error = %e, "Failed to watch data directory");
            return;
        }
        info!(dir = %watch_dir.display(), "Watching for marked-date changes");

        // Keep the watcher alive
        loop {
            std::thread::sleep(Duration::from_secs(60));
        }
    });

    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            match state.reload().await {
                Ok((offers, orders)) => info!(offers, orders, "Marked dates reloaded"),
                Err(e) => warn!(error = %e, "Failed to reload marked dates"),
            }
        }
    });

    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Serve the calendar page
async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    let controller = state.controller.lock().await.clone();
    let weeks = controller.grid(&*state.marked.read().await, today());
    let notice = state.notice.lock().await.take();

    let page = Page {
        month: controller.reference_month(),
        weeks: &weeks,
        selected: controller.selected_date(),
        submitting: controller.is_submitting(),
        notice: notice.as_deref(),
        interactive: true,
    };
    Html(html::render_page(&page, &state.theme).into_string())
}

async fn prev_handler(State(state): State<Arc<AppState>>) -> Redirect {
    state.controller.lock().await.go_to_previous_month();
    Redirect::to("/")
}

async fn next_handler(State(state): State<Arc<AppState>>) -> Redirect {
    state.controller.lock().await.go_to_next_month();
    Redirect::to("/")
}

async fn select_handler(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Response {
    match date.parse::<DateKey>() {
        Ok(key) => {
            state.controller.lock().await.select_day(key);
            Redirect::to("/").into_response()
        }
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

/// Submit the selected date.
///
/// The work runs on its own task so a client disconnecting mid-request
/// cannot leave the in-flight flag set.
async fn order_handler(State(state): State<Arc<AppState>>) -> Redirect {
    if let Err(e) = tokio::spawn(submit_selected(state)).await {
        error!(error = %e, "Order task failed");
    }
    Redirect::to("/")
}

/// begin -> submit -> finish. The controller lock is released while the
/// request is outstanding; the in-flight flag rejects overlapping submits.
async fn submit_selected(state: Arc<AppState>) {
    let Some(date) = state.controller.lock().await.begin_submission() else {
        debug!("Order ignored: nothing selected or already submitting");
        return;
    };

    let result = state.orders.submit(&date).await.map(|()| date);
    *state.notice.lock().await = Some(order::notice(&result));
    state.controller.lock().await.finish_submission();
}

/// JSON view of the widget state
#[derive(Debug, Serialize)]
pub struct GridResponse {
    pub month: YearMonth,
    pub selected: Option<DateKey>,
    pub submitting: bool,
    pub weeks: Vec<WeekRow>,
}

async fn grid_handler(State(state): State<Arc<AppState>>) -> Json<GridResponse> {
    let controller = state.controller.lock().await.clone();
    let weeks = controller.grid(&*state.marked.read().await, today());
    Json(GridResponse {
        month: controller.reference_month(),
        selected: controller.selected_date(),
        submitting: controller.is_submitting(),
        weeks,
    })
}

/// Refresh marked dates from disk (manual trigger)
async fn refresh_handler(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.reload().await {
        Ok((offers, orders)) => {
            info!(offers, orders, "Manual refresh");
            (StatusCode::OK, "OK")
        }
        Err(e) => {
            warn!(error = %e, "Refresh failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "ERROR")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::tests::spawn_endpoint;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn key(s: &str) -> DateKey {
        s.parse().unwrap()
    }

    fn test_state(order_url: &str, data_file: PathBuf) -> Arc<AppState> {
        let marked = MarkedDates::new([key("2024-03-15")], [key("2024-03-20")]);
        let orders = HttpOrderClient::new(order_url, Some(Duration::from_secs(5))).unwrap();
        Arc::new(AppState::new(date(2024, 3, 1), marked, orders, data_file))
    }

    async fn send(app: &Router, method: Method, uri: &str) -> Response {
        app.clone()
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn assert_redirect_home(response: &Response) {
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
    }

    #[tokio::test]
    async fn test_index_renders_reference_month() {
        let state = test_state("http://127.0.0.1:9/order", PathBuf::from("unused.json"));
        let app = router(state);

        let response = send(&app, Method::GET, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("March 2024"));
        assert!(body.contains(r#"action="/select/2024-03-15""#));
    }

    #[tokio::test]
    async fn test_navigation_keeps_selection() {
        let state = test_state("http://127.0.0.1:9/order", PathBuf::from("unused.json"));
        let app = router(state.clone());

        assert_redirect_home(&send(&app, Method::POST, "/select/2024-03-10").await);
        assert_redirect_home(&send(&app, Method::POST, "/next").await);

        let controller = state.controller.lock().await.clone();
        assert_eq!(controller.reference_month(), YearMonth::new(2024, 4).unwrap());
        assert_eq!(controller.selected_date(), Some(key("2024-03-10")));

        assert_redirect_home(&send(&app, Method::POST, "/prev").await);
        assert_redirect_home(&send(&app, Method::POST, "/prev").await);
        let month = state.controller.lock().await.reference_month();
        assert_eq!(month, YearMonth::new(2024, 2).unwrap());
    }

    #[tokio::test]
    async fn test_select_rejects_invalid_date() {
        let state = test_state("http://127.0.0.1:9/order", PathBuf::from("unused.json"));
        let app = router(state.clone());

        let response = send(&app, Method::POST, "/select/2024-13-01").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.controller.lock().await.selected_date(), None);
    }

    #[tokio::test]
    async fn test_grid_api() {
        let state = test_state("http://127.0.0.1:9/order", PathBuf::from("unused.json"));
        let app = router(state);

        let response = send(&app, Method::GET, "/api/grid").await;
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();

        assert_eq!(json["month"], "2024-03");
        assert_eq!(json["selected"], serde_json::Value::Null);
        assert_eq!(json["submitting"], false);

        let weeks = json["weeks"].as_array().unwrap();
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0].as_array().unwrap().len(), 7);
        assert_eq!(weeks[0][0]["key"], "2024-02-26");
        assert_eq!(weeks[0][0]["in_current_month"], false);
        assert_eq!(weeks[0][4]["day_label"], "01");
    }

    #[tokio::test]
    async fn test_order_without_selection_sends_nothing() {
        let (url, received) = spawn_endpoint(StatusCode::OK).await;
        let state = test_state(&url, PathBuf::from("unused.json"));
        let app = router(state.clone());

        assert_redirect_home(&send(&app, Method::POST, "/order").await);
        assert!(received.lock().unwrap().is_empty());
        assert!(state.notice.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_order_success_sets_notice_once() {
        let (url, received) = spawn_endpoint(StatusCode::OK).await;
        let state = test_state(&url, PathBuf::from("unused.json"));
        let app = router(state.clone());

        send(&app, Method::POST, "/select/2024-03-15").await;
        assert_redirect_home(&send(&app, Method::POST, "/order").await);

        assert_eq!(
            *received.lock().unwrap(),
            vec![serde_json::json!({ "date": "2024-03-15" })]
        );
        assert!(!state.controller.lock().await.is_submitting());

        let body = body_string(send(&app, Method::GET, "/").await).await;
        assert!(body.contains("Order for 2024-03-15 has been placed."));

        // Shown once
        let body = body_string(send(&app, Method::GET, "/").await).await;
        assert!(!body.contains("has been placed"));
    }

    #[tokio::test]
    async fn test_order_rejected_notice() {
        let (url, _) = spawn_endpoint(StatusCode::INTERNAL_SERVER_ERROR).await;
        let state = test_state(&url, PathBuf::from("unused.json"));
        let app = router(state.clone());

        send(&app, Method::POST, "/select/2024-03-15").await;
        send(&app, Method::POST, "/order").await;

        let notice = state.notice.lock().await.clone();
        assert_eq!(
            notice.as_deref(),
            Some("An error occurred while placing the order.")
        );
        // No optimistic update of order days
        assert!(!state.marked.read().await.order_days.contains(&key("2024-03-15")));
    }

    #[tokio::test]
    async fn test_order_ignored_while_in_flight() {
        let (url, received) = spawn_endpoint(StatusCode::OK).await;
        let state = test_state(&url, PathBuf::from("unused.json"));
        let app = router(state.clone());

        send(&app, Method::POST, "/select/2024-03-15").await;
        // Simulate an outstanding submission
        assert!(state.controller.lock().await.begin_submission().is_some());

        send(&app, Method::POST, "/order").await;
        assert!(received.lock().unwrap().is_empty());
        assert!(state.controller.lock().await.is_submitting());
    }

    /// Accepts connections and never answers.
    async fn spawn_silent_endpoint() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });
        format!("http://{addr}/order")
    }

    #[tokio::test]
    async fn test_cancelled_order_request_releases_in_flight() {
        let url = spawn_silent_endpoint().await;
        let orders = HttpOrderClient::new(url, Some(Duration::from_millis(500))).unwrap();
        let state = Arc::new(AppState::new(
            date(2024, 3, 1),
            MarkedDates::default(),
            orders,
            PathBuf::from("unused.json"),
        ));
        let app = router(state.clone());

        send(&app, Method::POST, "/select/2024-03-15").await;

        // Client gives up while the order endpoint is still silent
        let cancelled =
            tokio::time::timeout(Duration::from_millis(100), send(&app, Method::POST, "/order"))
                .await;
        assert!(cancelled.is_err());

        // The submission still runs to completion and clears the flag
        let released = tokio::time::timeout(Duration::from_secs(5), async {
            while state.controller.lock().await.is_submitting() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        assert!(released.is_ok());

        assert_eq!(
            state.notice.lock().await.as_deref(),
            Some("Could not connect to the server.")
        );
        assert_eq!(
            state.controller.lock().await.begin_submission(),
            Some(key("2024-03-15"))
        );
    }

    #[tokio::test]
    async fn test_refresh_reloads_marked_dates() {
        let temp_dir = TempDir::new().unwrap();
        let data_file = temp_dir.path().join("calendar.json");
        let state = test_state("http://127.0.0.1:9/order", data_file.clone());
        let app = router(state.clone());

        std::fs::write(
            &data_file,
            r#"{"offerDays":["2024-03-01","2024-03-02"],"orderDays":["2024-03-15"]}"#,
        )
        .unwrap();

        let response = send(&app, Method::GET, "/api/refresh").await;
        assert_eq!(response.status(), StatusCode::OK);

        let marked = state.marked.read().await;
        assert_eq!(marked.offer_days.len(), 2);
        assert!(marked.order_days.contains(&key("2024-03-15")));
    }

    #[tokio::test]
    async fn test_refresh_reports_bad_file() {
        let temp_dir = TempDir::new().unwrap();
        let data_file = temp_dir.path().join("calendar.json");
        std::fs::write(&data_file, "{").unwrap();
        let state = test_state("http://127.0.0.1:9/order", data_file);
        let app = router(state.clone());

        let response = send(&app, Method::GET, "/api/refresh").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // Previous data kept
        assert_eq!(state.marked.read().await.offer_days.len(), 1);
    }
}
