//! Request/response contracts for the RPC method table.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub name: String,
    pub group: String,
    pub description: String,
    pub start: u64,
    pub stop: u64,
    pub now: u64,
    pub state: i32,
    pub statename: String,
    pub spawnerr: String,
    pub exitstatus: i32,
    pub logfile: String,
    pub stdout_logfile: String,
    pub stderr_logfile: String,
    pub pid: u32,
    pub directory: String,
    pub command: String,
    pub ini_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum Request {
    GetVersion,
    GetState,
    GetPid,
    GetAllProcessInfo,
    GetProcessInfo { name: String },
    StartProcess { name: String, wait: bool },
    StopProcess { name: String, wait: bool },
    RestartProcess { name: String, wait: bool },
    StartAllProcesses { wait: bool },
    StopAllProcesses { wait: bool },
    RestartAllProcesses { wait: bool },
    StartProcessGroup { name: String, wait: bool },
    StopProcessGroup { name: String, wait: bool },
    SignalProcess { name: String, signal: String },
    SignalAllProcesses { signal: String },
    SendProcessStdin { name: String, chars: String },
    ReloadConfig,
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ResponseValue {
    Version { version: String },
    State { code: i32, name: String },
    Pid { pid: u32 },
    Process(ProcessInfo),
    ProcessList(Vec<ProcessInfo>),
    Success { success: bool },
    ReloadResult {
        added: Vec<String>,
        changed: Vec<String>,
        removed: Vec<String>,
    },
}

/// A reply carries either a value or the symbolic error code and message —
/// never a raw wrapped error string (see the error-handling design notes).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Ok { result: ResponseValue },
    Err { code: String, message: String },
}

impl Response {
    pub fn ok(result: ResponseValue) -> Self {
        Response::Ok { result }
    }

    pub fn from_error(error: &supd_core::SupdError) -> Self {
        Response::Err {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}
