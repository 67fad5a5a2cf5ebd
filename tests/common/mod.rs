#![allow(dead_code)]

use bytes::Bytes;
use plate_console::config::Config;
use plate_console::session::Session;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tokio::time::sleep;
use url::Url;
use warp::http::StatusCode;
use warp::Filter;

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::builder().is_test(true).init();
    });
}

/// A canned backend answer.
#[derive(Clone, Debug)]
pub struct Scripted {
    pub delay: Duration,
    pub status: u16,
    pub body: Value,
}

pub fn ok(body: Value) -> Scripted {
    Scripted {
        delay: Duration::from_millis(0),
        status: 200,
        body,
    }
}

pub fn delayed(ms: u64, body: Value) -> Scripted {
    Scripted {
        delay: Duration::from_millis(ms),
        status: 200,
        body,
    }
}

pub fn status(code: u16, body: Value) -> Scripted {
    Scripted {
        delay: Duration::from_millis(0),
        status: code,
        body,
    }
}

/// In-process stand-in for the recognition backend. Each endpoint answers from a
/// queue of scripted replies; the last reply repeats once the queue runs down.
#[derive(Default)]
pub struct MockBackend {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requests: Mutex<Vec<(String, Bytes)>>,
}

impl MockBackend {
    pub fn script(&self, endpoint: &str, reply: Scripted) {
        self.scripts
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn hits(&self, endpoint: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| e == endpoint)
            .count()
    }

    /// Endpoints in the order they were requested.
    pub fn order(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(e, _)| e.clone())
            .collect()
    }

    pub fn bodies(&self, endpoint: &str) -> Vec<Bytes> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| e == endpoint)
            .map(|(_, b)| b.clone())
            .collect()
    }

    fn next(&self, endpoint: &str, body: Bytes) -> Scripted {
        self.requests
            .lock()
            .unwrap()
            .push((endpoint.to_string(), body));
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(endpoint) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => status(404, json!({ "error": "not scripted" })),
        }
    }
}

async fn respond(
    endpoint: String,
    body: Bytes,
    mock: Arc<MockBackend>,
) -> Result<impl warp::Reply, Infallible> {
    let reply = mock.next(&endpoint, body);
    sleep(reply.delay).await;
    Ok(warp::reply::with_status(
        warp::reply::json(&reply.body),
        StatusCode::from_u16(reply.status).unwrap(),
    ))
}

/// Serves `mock` on an ephemeral local port and returns its base URL.
pub fn start(mock: Arc<MockBackend>) -> Url {
    let routes = warp::path::param::<String>()
        .and(warp::path::end())
        .and(warp::body::bytes())
        .and(warp::any().map(move || mock.clone()))
        .and_then(respond);
    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    Url::parse(&format!("http://{}/", addr)).unwrap()
}

pub fn config(backend_url: Url) -> Config {
    Config {
        backend_url,
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        poll_interval: Duration::from_millis(100),
        request_timeout: Duration::from_secs(5),
        max_upload_bytes: 10 * 1024 * 1024,
    }
}

pub fn session(mock: &Arc<MockBackend>) -> Arc<Session> {
    Session::new(&config(start(mock.clone()))).unwrap()
}

/// A session whose uploads are capped at `max_upload_bytes`.
pub fn capped_session(mock: &Arc<MockBackend>, max_upload_bytes: u64) -> Arc<Session> {
    let mut config = config(start(mock.clone()));
    config.max_upload_bytes = max_upload_bytes;
    Session::new(&config).unwrap()
}
