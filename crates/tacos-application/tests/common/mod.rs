#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tacos_application::OrderingGateway;
use tacos_core::config::AdapterConfig;
use tacos_core::{Result, TacosError};
use tacos_infrastructure::{TomlIndexMappingRepository, TomlSessionRepository};
use tacos_interaction::{RemoteHttp, RemoteRequest, RemoteResponse};
use tempfile::TempDir;
use tokio::sync::Notify;

/// Holds one request in flight until the test releases it.
#[derive(Default)]
pub struct Gate {
    pub reached: Notify,
    pub release: Notify,
}

/// Replays canned responses in order and records every request.
#[derive(Default)]
pub struct ScriptedRemote {
    responses: Mutex<VecDeque<RemoteResponse>>,
    requests: Mutex<Vec<RemoteRequest>>,
    gate: Mutex<Option<(usize, Arc<Gate>)>>,
}

impl ScriptedRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, response: RemoteResponse) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<RemoteRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Pauses the `nth` request (1-based) before it is answered.
    pub fn pause_at(&self, nth: usize) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.gate.lock().unwrap() = Some((nth, gate.clone()));
        gate
    }

    pub fn pending(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteHttp for ScriptedRemote {
    async fn send(&self, request: &RemoteRequest) -> Result<RemoteResponse> {
        let number = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        let gate = match &*self.gate.lock().unwrap() {
            Some((nth, gate)) if *nth == number => Some(gate.clone()),
            _ => None,
        };
        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TacosError::unreachable(request.path.clone(), "no scripted response"))
    }
}

pub struct Harness {
    pub gateway: OrderingGateway,
    pub remote: Arc<ScriptedRemote>,
    pub sessions: Arc<TomlSessionRepository>,
    pub temp_dir: TempDir,
}

pub fn harness() -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let sessions = Arc::new(TomlSessionRepository::new(temp_dir.path()).unwrap());
    let mappings = Arc::new(TomlIndexMappingRepository::new(temp_dir.path()).unwrap());
    let remote = ScriptedRemote::new();

    let gateway = OrderingGateway::from_parts(
        sessions.clone(),
        mappings,
        remote.clone(),
        &AdapterConfig::default(),
    );

    Harness {
        gateway,
        remote,
        sessions,
        temp_dir,
    }
}

pub fn home(set_cookie: &str) -> RemoteResponse {
    RemoteResponse::new(200, "<html><body>Bienvenue</body></html>").with_set_cookie(set_cookie)
}

pub fn token_page(token: &str) -> RemoteResponse {
    RemoteResponse::new(
        200,
        format!(
            r#"<html><body><form><input type="hidden" id="csrf_token" name="csrf_token" value="{}"></form></body></html>"#,
            token
        ),
    )
}

pub fn card(slot: usize, size_title: &str, meat: &str) -> String {
    format!(
        r#"<div class="card" id="tacos-{slot}">
             <div class="card-body">
               <h6 class="card-title">{size_title} - 12 CHF.</h6>
               <p class="small"><strong>Viande:</strong> {meat}</p>
               <input type="number" class="quantity-input" value="1" readonly>
             </div>
           </div>"#
    )
}

pub fn cart(cards: &[String]) -> RemoteResponse {
    RemoteResponse::new(200, format!("<div>{}</div>", cards.concat()))
}

/// Scripts the two requests of a session handshake.
pub fn script_handshake(remote: &ScriptedRemote, token: &str) {
    remote
        .push(home("PHPSESSID=initial; path=/"))
        .push(token_page(token).with_set_cookie("lang=fr; path=/"));
}
