use serde::{Deserialize, Serialize};

use crate::cas::{self, CasError};
use crate::types::SymbolicError;

/// A request sent to a symbolic worker as one JSON line.
///
/// Wire format: `{"id": 7, "cmd": "verify", "payload": {"lhs": "...", "rhs": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerCommand {
    /// Check whether `lhs - rhs` simplifies to zero.
    Verify { lhs: String, rhs: String },
    /// Return the canonical simplified form of `expr`.
    Simplify { expr: String },
}

/// Wire format for the outer command envelope.
#[derive(Serialize, Deserialize)]
struct CommandWire {
    id: u64,
    cmd: String,
    payload: serde_json::Value,
}

#[derive(Serialize, Deserialize)]
struct VerifyPayload {
    lhs: String,
    rhs: String,
}

#[derive(Serialize, Deserialize)]
struct SimplifyPayload {
    expr: String,
}

impl WorkerCommand {
    /// Serialize this command with a request id. No trailing newline.
    pub fn to_json(&self, id: u64) -> Result<String, serde_json::Error> {
        let (cmd, payload) = match self {
            WorkerCommand::Verify { lhs, rhs } => (
                "verify",
                serde_json::to_value(VerifyPayload {
                    lhs: lhs.clone(),
                    rhs: rhs.clone(),
                })?,
            ),
            WorkerCommand::Simplify { expr } => (
                "simplify",
                serde_json::to_value(SimplifyPayload { expr: expr.clone() })?,
            ),
        };
        serde_json::to_string(&CommandWire {
            id,
            cmd: cmd.to_string(),
            payload,
        })
    }

    /// Parse a request line on the worker side.
    ///
    /// On failure returns the id (0 when unreadable) and a fault to reply with.
    pub fn parse(json: &str) -> Result<(u64, Self), (u64, WorkerFault)> {
        let wire: CommandWire = serde_json::from_str(json)
            .map_err(|e| (0, WorkerFault::new("request", format!("invalid JSON: {e}"))))?;
        let id = wire.id;
        let bad_payload = |e: serde_json::Error| (id, WorkerFault::new("request", e.to_string()));
        let command = match wire.cmd.as_str() {
            "verify" => {
                let p: VerifyPayload = serde_json::from_value(wire.payload).map_err(bad_payload)?;
                WorkerCommand::Verify {
                    lhs: p.lhs,
                    rhs: p.rhs,
                }
            }
            "simplify" => {
                let p: SimplifyPayload =
                    serde_json::from_value(wire.payload).map_err(bad_payload)?;
                WorkerCommand::Simplify { expr: p.expr }
            }
            other => {
                return Err((
                    id,
                    WorkerFault::new("command", format!("unknown command '{other}'")),
                ))
            }
        };
        Ok((id, command))
    }
}

/// Error body `{"error": kind, "desc": text}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerFault {
    /// Error category: `parse`, `unsupported`, `too_complex`,
    /// `division_by_zero`, `request` or `command`.
    pub error: String,
    pub desc: String,
}

impl WorkerFault {
    pub fn new(error: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            desc: desc.into(),
        }
    }
}

impl From<&CasError> for WorkerFault {
    fn from(e: &CasError) -> Self {
        let kind = match e {
            CasError::Parse(_) => "parse",
            CasError::Unsupported(_) => "unsupported",
            CasError::TooComplex(_) => "too_complex",
            CasError::DivisionByZero => "division_by_zero",
        };
        WorkerFault::new(kind, e.to_string())
    }
}

/// A reply read back from a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerReply {
    Verified(bool),
    Simplified(String),
    Fault(WorkerFault),
}

#[derive(Serialize, Deserialize)]
struct ReplyWire {
    id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    equivalent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    simplified: Option<String>,
}

impl WorkerReply {
    pub fn to_json(&self, id: u64) -> Result<String, serde_json::Error> {
        match self {
            WorkerReply::Verified(eq) => serde_json::to_string(&ReplyWire {
                id,
                equivalent: Some(*eq),
                simplified: None,
            }),
            WorkerReply::Simplified(expr) => serde_json::to_string(&ReplyWire {
                id,
                equivalent: None,
                simplified: Some(expr.clone()),
            }),
            WorkerReply::Fault(fault) => serde_json::to_string(&serde_json::json!({
                "id": id,
                "error": fault.error,
                "desc": fault.desc,
            })),
        }
    }

    /// Parse a reply line, returning its request id.
    pub fn parse(json: &str) -> Result<(u64, Self), SymbolicError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| SymbolicError::Protocol(format!("Invalid JSON: {e}. Raw: {json}")))?;
        let id = value
            .get("id")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| SymbolicError::Protocol(format!("Reply without id. Raw: {json}")))?;

        if value.get("error").is_some() && value.get("desc").is_some() {
            let fault: WorkerFault = serde_json::from_value(value)
                .map_err(|e| SymbolicError::Protocol(format!("Failed to parse error: {e}")))?;
            return Ok((id, WorkerReply::Fault(fault)));
        }

        let wire: ReplyWire = serde_json::from_value(value)
            .map_err(|e| SymbolicError::Protocol(format!("Failed to parse reply: {e}. Raw: {json}")))?;
        match (wire.equivalent, wire.simplified) {
            (Some(eq), None) => Ok((id, WorkerReply::Verified(eq))),
            (None, Some(expr)) => Ok((id, WorkerReply::Simplified(expr))),
            _ => Err(SymbolicError::Protocol(format!("Ambiguous reply. Raw: {json}"))),
        }
    }
}

/// Execute a command in-process. This is the work a worker does per line.
pub fn execute(command: &WorkerCommand) -> WorkerReply {
    let outcome = match command {
        WorkerCommand::Verify { lhs, rhs } => {
            cas::equivalent_str(lhs, rhs).map(WorkerReply::Verified)
        }
        WorkerCommand::Simplify { expr } => cas::simplify_str(expr).map(WorkerReply::Simplified),
    };
    outcome.unwrap_or_else(|e| WorkerReply::Fault(WorkerFault::from(&e)))
}

/// Handle one request line and produce the reply line (no newline).
pub fn respond(line: &str) -> String {
    let (id, reply) = match WorkerCommand::parse(line) {
        Ok((id, command)) => (id, execute(&command)),
        Err((id, fault)) => (id, WorkerReply::Fault(fault)),
    };
    reply.to_json(id).unwrap_or_else(|e| {
        format!(r#"{{"id":{id},"error":"internal","desc":"{}"}}"#, e.to_string().replace('"', "'"))
    })
}
