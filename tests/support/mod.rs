// SPDX-License-Identifier: MPL-2.0

//! In-process stub of the hosted backend (auth + row API) and the catalog
//! search API, backed by plain in-memory row vectors.

#![allow(dead_code)]

use bookcase::config::BackendConfig;
use bookcase::supabase::SupabaseClient;
use serde_json::Value;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, Server};

#[derive(Default)]
pub struct BackendState {
    pub profiles: Vec<Value>,
    pub favorites: Vec<Value>,
    pub books: Vec<Value>,
    /// Raw volume records served by the search routes.
    pub volumes: Vec<Value>,
    /// Force the search routes to fail with this status.
    pub search_status: Option<u16>,
    /// Path-prefix → artificial processing delay.
    pub delays: Vec<(String, Duration)>,
    next_id: i64,
    seq: u64,
}

impl BackendState {
    fn alloc_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Monotonic RFC 3339 stamp; lexicographic order matches insertion.
    fn stamp(&mut self) -> String {
        self.seq += 1;
        format!("2026-08-29T00:00:00.{:06}Z", self.seq)
    }
}

pub struct StubBackend {
    server: Arc<Server>,
    pub state: Arc<Mutex<BackendState>>,
    pub url: String,
}

impl StubBackend {
    pub fn spawn() -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind stub server"));
        let addr = server.server_addr().to_ip().expect("tcp listen address");
        let url = format!("http://{addr}");
        let state = Arc::new(Mutex::new(BackendState::default()));

        let srv = Arc::clone(&server);
        let st = Arc::clone(&state);
        thread::spawn(move || {
            while let Ok(mut request) = srv.recv() {
                let response = route(&mut request, &st);
                let _ = request.respond(response);
            }
        });

        Self { server, state, url }
    }

    pub fn client(&self) -> Arc<SupabaseClient> {
        Arc::new(SupabaseClient::new(BackendConfig {
            service_url: self.url.clone(),
            anon_key: "stub-anon-key".to_string(),
        }))
    }

    pub fn delay(&self, path_prefix: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .delays
            .push((path_prefix.to_string(), delay));
    }

    pub fn seed_profile(&self, profile: Value) {
        self.state.lock().unwrap().profiles.push(profile);
    }

    pub fn seed_volumes(&self, volumes: Vec<Value>) {
        self.state.lock().unwrap().volumes = volumes;
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

/// Poll `cond` for up to two seconds.
pub async fn wait_for(cond: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

fn json_response(status: u16, body: &Value) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body.to_string())
        .with_status_code(status)
        .with_header(Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap())
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = &input[i + 1..i + 3];
                match u8::from_str_radix(hex, 16) {
                    Ok(b) => {
                        out.push(b);
                        i += 3;
                    }
                    Err(_) => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn split_url(url: &str) -> (String, Vec<(String, String)>) {
    match url.split_once('?') {
        Some((path, query)) => {
            let pairs = query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .map(|(k, v)| (percent_decode(k), percent_decode(v)))
                .collect();
            (path.to_string(), pairs)
        }
        None => (url.to_string(), Vec::new()),
    }
}

fn route(request: &mut Request, state: &Mutex<BackendState>) -> Response<std::io::Cursor<Vec<u8>>> {
    let (path, query) = split_url(request.url());
    let method = request.method().clone();

    let mut body = String::new();
    let _ = request.as_reader().read_to_string(&mut body);
    let body_json: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

    let wants_object = request.headers().iter().any(|h| {
        h.field.equiv("accept") && h.value.as_str().contains("pgrst.object")
    });

    let delay = state
        .lock()
        .unwrap()
        .delays
        .iter()
        .find(|(prefix, _)| path.starts_with(prefix))
        .map(|(_, d)| *d);
    if let Some(delay) = delay {
        thread::sleep(delay);
    }

    if path == "/auth/v1/token" {
        return auth_token(&body_json);
    }
    if path == "/auth/v1/signup" {
        return auth_signup(&body_json);
    }
    if path == "/auth/v1/logout" {
        return json_response(200, &serde_json::json!({}));
    }
    if let Some(table) = path.strip_prefix("/rest/v1/") {
        return rest(state, &method, table, &query, body_json, wants_object);
    }
    if path == "/volumes" || path.starts_with("/volumes/") {
        return volumes(state, &path);
    }

    json_response(404, &serde_json::json!({ "message": "no such route" }))
}

fn user_for(email: &str, metadata: Value) -> Value {
    let local = email.split('@').next().unwrap_or(email);
    serde_json::json!({
        "id": format!("uid-{local}"),
        "email": email,
        "user_metadata": metadata,
    })
}

fn session_for(email: &str, metadata: Value) -> Value {
    serde_json::json!({
        "access_token": format!("tok-{email}"),
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "refresh",
        "user": user_for(email, metadata),
    })
}

fn auth_token(body: &Value) -> Response<std::io::Cursor<Vec<u8>>> {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default();
    if password == "wrong" {
        return json_response(
            400,
            &serde_json::json!({ "error_description": "Invalid login credentials" }),
        );
    }
    json_response(200, &session_for(&email, serde_json::json!({})))
}

fn auth_signup(body: &Value) -> Response<std::io::Cursor<Vec<u8>>> {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let metadata = body.get("data").cloned().unwrap_or(serde_json::json!({}));
    json_response(200, &session_for(&email, metadata))
}

fn matches(row: &Value, eqs: &[(String, String)]) -> bool {
    eqs.iter().all(|(field, expected)| {
        match row.get(field) {
            Some(Value::String(s)) => s == expected,
            Some(Value::Number(n)) => n.to_string() == *expected,
            _ => false,
        }
    })
}

fn rest(
    state: &Mutex<BackendState>,
    method: &Method,
    table: &str,
    query: &[(String, String)],
    body: Value,
    wants_object: bool,
) -> Response<std::io::Cursor<Vec<u8>>> {
    let eqs: Vec<(String, String)> = query
        .iter()
        .filter(|(_, v)| v.starts_with("eq."))
        .map(|(k, v)| (k.clone(), v[3..].to_string()))
        .collect();
    let ordered_desc = query
        .iter()
        .any(|(k, v)| k == "order" && v.starts_with("created_at.desc"));
    let limit = query
        .iter()
        .find(|(k, _)| k == "limit")
        .and_then(|(_, v)| v.parse::<usize>().ok());
    let on_conflict = query
        .iter()
        .find(|(k, _)| k == "on_conflict")
        .map(|(_, v)| v.clone());

    let mut st = state.lock().unwrap();
    let new_id = st.alloc_id();
    let stamp = st.stamp();
    let rows = match table {
        "user_profiles" => &mut st.profiles,
        "user_favorites" => &mut st.favorites,
        "books" => &mut st.books,
        _ => return json_response(404, &serde_json::json!({ "message": "unknown table" })),
    };

    match method {
        Method::Get => {
            let mut found: Vec<Value> = rows.iter().filter(|r| matches(r, &eqs)).cloned().collect();
            if ordered_desc {
                found.sort_by(|a, b| {
                    let ka = a["created_at"].as_str().unwrap_or_default();
                    let kb = b["created_at"].as_str().unwrap_or_default();
                    kb.cmp(ka)
                });
            }
            if let Some(limit) = limit {
                found.truncate(limit);
            }
            if wants_object {
                match found.into_iter().next() {
                    Some(row) => json_response(200, &row),
                    None => json_response(
                        406,
                        &serde_json::json!({ "code": "PGRST116", "message": "0 rows" }),
                    ),
                }
            } else {
                json_response(200, &Value::Array(found))
            }
        }
        Method::Post => {
            let mut row = body;
            if !row.is_object() {
                return json_response(400, &serde_json::json!({ "message": "bad body" }));
            }
            if let Some(conflict_target) = on_conflict {
                let keys: Vec<&str> = conflict_target.split(',').collect();
                rows.retain(|existing| {
                    !keys.iter().all(|k| existing.get(*k) == row.get(*k))
                });
            }
            if row.get("id").is_none() {
                row["id"] = serde_json::json!(new_id);
            }
            row["created_at"] = serde_json::json!(stamp);
            rows.push(row.clone());
            if wants_object {
                json_response(201, &row)
            } else {
                json_response(201, &Value::Array(vec![row]))
            }
        }
        Method::Patch => {
            let patch = match body.as_object() {
                Some(map) => map.clone(),
                None => return json_response(400, &serde_json::json!({ "message": "bad body" })),
            };
            let mut updated: Option<Value> = None;
            for row in rows.iter_mut().filter(|r| matches(r, &eqs)) {
                for (key, value) in &patch {
                    row[key] = value.clone();
                }
                updated = Some(row.clone());
            }
            match updated {
                Some(row) if wants_object => json_response(200, &row),
                Some(row) => json_response(200, &Value::Array(vec![row])),
                None => json_response(
                    406,
                    &serde_json::json!({ "code": "PGRST116", "message": "0 rows" }),
                ),
            }
        }
        Method::Delete => {
            rows.retain(|r| !matches(r, &eqs));
            json_response(200, &Value::Array(Vec::new()))
        }
        _ => json_response(405, &serde_json::json!({ "message": "method not allowed" })),
    }
}

fn volumes(state: &Mutex<BackendState>, path: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    let st = state.lock().unwrap();
    if let Some(status) = st.search_status {
        return json_response(status, &serde_json::json!({ "error": "unavailable" }));
    }

    if let Some(id) = path.strip_prefix("/volumes/") {
        return match st.volumes.iter().find(|v| v["id"] == id) {
            Some(volume) => json_response(200, volume),
            None => json_response(404, &serde_json::json!({ "error": "not found" })),
        };
    }

    if st.volumes.is_empty() {
        // The catalog API omits `items` entirely when nothing matches.
        json_response(200, &serde_json::json!({ "kind": "books#volumes", "totalItems": 0 }))
    } else {
        json_response(
            200,
            &serde_json::json!({
                "kind": "books#volumes",
                "totalItems": st.volumes.len(),
                "items": st.volumes,
            }),
        )
    }
}
