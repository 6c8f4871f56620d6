//! Command handlers.
//!
//! Both external surfaces of the core go through here: the synchronous
//! run-to-completion operation (`DO`) and the interactive per-session
//! operations (`START`/`STEP`/`STAT`/`RESULT`/`END`).

use crate::error::ServerError;
use crate::session::{Session, SessionState};
use machsim_core::{automata, schema, SimulationRegistry};
use machsim_protocol::message::*;
use machsim_protocol::PROTOCOL_VERSION;
use serde_json::{json, Value};
use std::sync::Arc;

/// Server capabilities and limits.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub max_message_bytes: usize,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "machsim".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            max_message_bytes: machsim_protocol::MAX_MESSAGE_SIZE,
        }
    }
}

/// Command handler.
pub struct CommandHandler {
    registry: Arc<SimulationRegistry>,
    info: ServerInfo,
}

impl CommandHandler {
    /// Creates a new command handler.
    pub fn new(registry: Arc<SimulationRegistry>) -> Self {
        Self {
            registry,
            info: ServerInfo::default(),
        }
    }

    /// Creates a new command handler with custom server info.
    pub fn with_info(registry: Arc<SimulationRegistry>, info: ServerInfo) -> Self {
        Self { registry, info }
    }

    /// Returns the shared registry.
    pub fn registry(&self) -> &Arc<SimulationRegistry> {
        &self.registry
    }

    /// Handles a request and returns a response.
    pub fn handle(&self, session: &mut Session, request: &Request) -> Response {
        session.record_request();

        let result = match request.op {
            Operation::Ping => self.handle_ping(),
            Operation::Info => self.handle_info(),
            Operation::Bye => self.handle_bye(session),
            Operation::GetSchema => self.handle_get_schema(),
            Operation::Do => self.handle_do(&request.params),
            Operation::Start => self.handle_start(session, &request.params),
            Operation::Step => self.handle_step(&request.params),
            Operation::Stat => self.handle_stat(&request.params),
            Operation::Result => self.handle_result(&request.params),
            Operation::End => self.handle_end(session, &request.params),
        };

        match result {
            Ok(value) => Response::ok(&request.id, value),
            Err(e) => {
                tracing::debug!(op = ?request.op, error = %e, "request failed");
                Response::error(&request.id, ResponseError::new(e.error_code(), e.to_string()))
            }
        }
    }

    /// Ends any simulation sessions the connection left open. Called when
    /// a connection goes away so abandoned sessions cannot accumulate in
    /// the registry.
    pub fn end_abandoned(&self, session: &Session) {
        for id in session.owned_simulations() {
            if self.registry.end(id).is_ok() {
                tracing::debug!(id, session = %session.id, "ended abandoned simulation");
            }
        }
    }

    fn handle_ping(&self) -> Result<Value, ServerError> {
        Ok(json!({"pong": true}))
    }

    fn handle_info(&self) -> Result<Value, ServerError> {
        let result = InfoResult {
            server_name: self.info.name.clone(),
            server_version: self.info.version.clone(),
            protocol_version: PROTOCOL_VERSION,
            max_message_bytes: self.info.max_message_bytes,
        };
        Ok(serde_json::to_value(result)?)
    }

    fn handle_bye(&self, session: &mut Session) -> Result<Value, ServerError> {
        session.set_state(SessionState::Closing);
        Ok(json!({"goodbye": true}))
    }

    fn handle_get_schema(&self) -> Result<Value, ServerError> {
        Ok(schema::schema_document())
    }

    fn handle_do(&self, params: &Value) -> Result<Value, ServerError> {
        let p: DoParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        let machine = automata::load(&p.machine)?;
        let id = self.registry.start(machine, &p.tape);

        // The session is disposed of no matter how the run went.
        let result = self.registry.run_to_completion(id);
        self.registry.end(id)?;

        Ok(serde_json::to_value(result?)?)
    }

    fn handle_start(&self, session: &Session, params: &Value) -> Result<Value, ServerError> {
        let p: StartParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        let machine = automata::load(&p.machine)?;
        let id = self.registry.start(machine, &p.tape);
        session.track_simulation(id);

        Ok(serde_json::to_value(StartResult { id })?)
    }

    fn handle_step(&self, params: &Value) -> Result<Value, ServerError> {
        let p: SessionParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        self.registry.step(p.id)?;
        let done = self.registry.done(p.id)?;
        let report = self.registry.stat(p.id)?;

        Ok(serde_json::to_value(StepResult {
            done,
            report: serde_json::to_value(report)?,
        })?)
    }

    fn handle_stat(&self, params: &Value) -> Result<Value, ServerError> {
        let p: SessionParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        let report = self.registry.stat(p.id)?;
        Ok(serde_json::to_value(report)?)
    }

    fn handle_result(&self, params: &Value) -> Result<Value, ServerError> {
        let p: SessionParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        let result = self.registry.result(p.id)?;
        Ok(serde_json::to_value(result)?)
    }

    fn handle_end(&self, session: &Session, params: &Value) -> Result<Value, ServerError> {
        let p: SessionParams = serde_json::from_value(params.clone())
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

        self.registry.end(p.id)?;
        session.untrack_simulation(p.id);

        Ok(serde_json::to_value(EndResult {
            id: p.id,
            ended: true,
        })?)
    }
}
