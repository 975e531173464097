use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::lifecycle::{Lifecycle, ReadinessGate};
use crate::observability::TimingItem;

#[derive(Serialize)]
pub struct GateStatus {
    pub phase: String,
    pub started: bool,
    pub resolved: bool,
    pub pending: Vec<String>,
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub application: String,
    pub state: String,
    pub ready: bool,
    pub error: Option<String>,
    pub gates: Vec<GateStatus>,
    pub teardown_callbacks: usize,
}

fn gate_status(gate: &ReadinessGate) -> GateStatus {
    GateStatus {
        phase: gate.phase().to_string(),
        started: gate.is_started(),
        resolved: gate.is_resolved(),
        pending: gate.pending(),
        error: gate.outcome().and_then(|o| o.err()).map(|e| e.to_string()),
    }
}

pub async fn get_status(State(lifecycle): State<Lifecycle>) -> (StatusCode, Json<SystemStatus>) {
    let outcome = lifecycle.outcome();
    let code = match outcome {
        Some(Ok(())) => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };

    let status = SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        application: lifecycle.app().name().to_string(),
        state: lifecycle.state().to_string(),
        ready: lifecycle.is_ready(),
        error: outcome.and_then(|o| o.err()).map(|e| e.to_string()),
        gates: vec![
            gate_status(lifecycle.load_gate()),
            gate_status(lifecycle.boot_gate()),
        ],
        teardown_callbacks: lifecycle.teardown_len(),
    };

    (code, Json(status))
}

pub async fn get_timings(State(lifecycle): State<Lifecycle>) -> Json<Vec<TimingItem>> {
    Json(lifecycle.app().timing().snapshot())
}
