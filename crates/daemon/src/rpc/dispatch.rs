//! Maps an RPC `Request` onto `Supervisor` method calls and back to a
//! `Response`, keeping the error taxonomy the only thing that reaches the
//! wire (never a raw wrapped error string).

use supd_core::{Signal, SupdError};

use crate::supervisor::Supervisor;

use super::types::{Request, Response, ResponseValue};

const VERSION: &str = "3.0";

pub async fn dispatch(supervisor: &Supervisor, request: Request) -> Response {
    let result = handle(supervisor, request).await;
    match result {
        Ok(value) => Response::ok(value),
        Err(e) => Response::from_error(&e),
    }
}

async fn handle(supervisor: &Supervisor, request: Request) -> Result<ResponseValue, SupdError> {
    match request {
        Request::GetVersion => Ok(ResponseValue::Version {
            version: VERSION.to_string(),
        }),
        Request::GetState => Ok(ResponseValue::State {
            code: 1,
            name: "RUNNING".to_string(),
        }),
        Request::GetPid => Ok(ResponseValue::Pid {
            pid: std::process::id(),
        }),
        Request::GetAllProcessInfo => {
            let mut infos = Vec::new();
            supervisor.manager().for_each(|p| infos.push(supervisor.process_info(p)));
            Ok(ResponseValue::ProcessList(infos))
        }
        Request::GetProcessInfo { name } => {
            let process = supervisor.find(&name)?;
            Ok(ResponseValue::Process(supervisor.process_info(&process)))
        }
        Request::StartProcess { name, wait } => {
            supervisor.start_process(&name, wait).await?;
            Ok(success())
        }
        Request::StopProcess { name, wait } => {
            supervisor.stop_process(&name, wait).await?;
            Ok(success())
        }
        Request::RestartProcess { name, wait } => {
            supervisor.restart_process(&name, wait).await?;
            Ok(success())
        }
        Request::StartAllProcesses { wait } => {
            Ok(process_list(supervisor, supervisor.start_all(wait).await))
        }
        Request::StopAllProcesses { wait } => {
            Ok(process_list(supervisor, supervisor.stop_all(wait).await))
        }
        Request::RestartAllProcesses { wait } => {
            Ok(process_list(supervisor, supervisor.restart_all(wait).await))
        }
        Request::StartProcessGroup { name, wait } => Ok(process_list(
            supervisor,
            supervisor.start_group(&format!("{name}:*"), wait).await,
        )),
        Request::StopProcessGroup { name, wait } => Ok(process_list(
            supervisor,
            supervisor.stop_group(&format!("{name}:*"), wait).await,
        )),
        Request::SignalProcess { name, signal } => {
            supervisor.signal_process(&name, Signal::parse(&signal)?)?;
            Ok(success())
        }
        Request::SignalAllProcesses { signal } => {
            let sig = Signal::parse(&signal)?;
            Ok(process_list(supervisor, supervisor.signal_all(sig)))
        }
        Request::SendProcessStdin { name, chars } => {
            supervisor.send_stdin(&name, &chars).await?;
            Ok(success())
        }
        Request::ReloadConfig => {
            let report = supervisor.reload().await?;
            Ok(ResponseValue::ReloadResult {
                added: report.added,
                changed: report.changed,
                removed: report.removed,
            })
        }
        Request::Shutdown => {
            supervisor.request_shutdown();
            Ok(success())
        }
    }
}

fn success() -> ResponseValue {
    ResponseValue::Success { success: true }
}

fn process_list(supervisor: &Supervisor, processes: Vec<std::sync::Arc<supd_manager::Process>>) -> ResponseValue {
    ResponseValue::ProcessList(processes.iter().map(|p| supervisor.process_info(p)).collect())
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
