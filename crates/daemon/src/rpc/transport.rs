//! Binds the Unix-socket and TCP transports and drives each accepted
//! connection through the HTTP CONNECT upgrade (or the JSON `/program/list`
//! shortcut), Basic auth, and the length-framed RPC2 protocol.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, UnixListener, UnixStream};
use tracing::{info, warn};

use crate::config_view::ConfigView;
use crate::supervisor::Supervisor;

use super::auth::{self, Credentials};
use super::dispatch::dispatch;
use super::types::Request;
use super::wire;

const RPC_PATH: &str = "/RPC2";
const CONNECTED_REPLY: &str = "HTTP/1.0 200 Connected to Go RPC\r\n\r\n";

/// Binds whichever of the unix-socket / TCP transports the config
/// declares and spawns their accept loops. Returns once both are bound
/// (or skipped); the accept loops themselves run until the process exits.
pub async fn serve(
    supervisor: Arc<Supervisor>,
    view: &ConfigView,
) -> std::io::Result<Vec<tokio::task::JoinHandle<()>>> {
    let mut handles = Vec::new();

    if let Some(section) = view.get_unix_http_server() {
        if let Some(path) = &section.file {
            let _ = std::fs::remove_file(path);
            let listener = UnixListener::bind(path)?;
            info!(path, "listening on unix socket");
            let creds = credentials(section.username.clone(), section.password.clone());
            let supervisor = Arc::clone(&supervisor);
            handles.push(tokio::spawn(async move {
                accept_unix_loop(listener, supervisor, creds).await;
            }));
        }
    }

    if let Some(section) = view.get_inet_http_server() {
        if let Some(port) = &section.port {
            let addr = if port.contains(':') {
                port.clone()
            } else {
                format!("0.0.0.0:{port}")
            };
            let listener = TcpListener::bind(&addr).await?;
            info!(addr, "listening on tcp");
            let creds = credentials(section.username.clone(), section.password.clone());
            let supervisor = Arc::clone(&supervisor);
            handles.push(tokio::spawn(async move {
                accept_tcp_loop(listener, supervisor, creds).await;
            }));
        }
    }

    Ok(handles)
}

fn credentials(username: Option<String>, password: Option<String>) -> Option<Credentials> {
    match (username, password) {
        (None, None) => None,
        (username, password) => Some(Credentials {
            username: username.unwrap_or_default(),
            password: password.unwrap_or_default(),
        }),
    }
}

async fn accept_unix_loop(listener: UnixListener, supervisor: Arc<Supervisor>, creds: Option<Credentials>) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let supervisor = Arc::clone(&supervisor);
                let creds = creds.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_unix_connection(stream, supervisor, creds).await {
                        warn!(error = %e, "rpc connection ended with an error");
                    }
                });
            }
            Err(e) => warn!(error = %e, "unix accept failed"),
        }
    }
}

async fn accept_tcp_loop(listener: TcpListener, supervisor: Arc<Supervisor>, creds: Option<Credentials>) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let supervisor = Arc::clone(&supervisor);
                let creds = creds.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_tcp_connection(stream, supervisor, creds).await {
                        warn!(error = %e, "rpc connection ended with an error");
                    }
                });
            }
            Err(e) => warn!(error = %e, "tcp accept failed"),
        }
    }
}

async fn handle_unix_connection(
    stream: UnixStream,
    supervisor: Arc<Supervisor>,
    creds: Option<Credentials>,
) -> std::io::Result<()> {
    let (read_half, write_half) = tokio::io::split(stream);
    handle_connection(read_half, write_half, supervisor, creds).await
}

async fn handle_tcp_connection(
    stream: TcpStream,
    supervisor: Arc<Supervisor>,
    creds: Option<Credentials>,
) -> std::io::Result<()> {
    let (read_half, write_half) = tokio::io::split(stream);
    handle_connection(read_half, write_half, supervisor, creds).await
}

/// One connection: read the HTTP request line and headers, then branch on
/// whether it's the `CONNECT /RPC2` upgrade or the plain `GET
/// /program/list`. Everything after the upgrade is length-framed JSON.
async fn handle_connection<R, W>(
    read_half: R,
    mut write_half: W,
    supervisor: Arc<Supervisor>,
    creds: Option<Credentials>,
) -> std::io::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(read_half);
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await? == 0 {
        return Ok(());
    }
    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        if line == "\r\n" || line.is_empty() {
            break;
        }
        headers.push(line);
    }

    let authorization = headers
        .iter()
        .find_map(|h| h.strip_prefix("Authorization:").map(|v| v.trim().to_string()));

    if auth::auth_required(&creds) {
        let creds = creds.as_ref().expect("checked by auth_required");
        let ok = authorization
            .as_deref()
            .and_then(auth::decode_basic_header)
            .map(|(user, pass)| auth::verify(creds, &user, &pass))
            .unwrap_or(false);
        if !ok {
            write_half
                .write_all(
                    format!(
                        "HTTP/1.0 401 Unauthorized\r\nWWW-Authenticate: {}\r\nContent-Length: 0\r\n\r\n",
                        auth::REALM_HEADER
                    )
                    .as_bytes(),
                )
                .await?;
            return Ok(());
        }
    }

    if request_line.starts_with("CONNECT") && request_line.contains(RPC_PATH) {
        write_half.write_all(CONNECTED_REPLY.as_bytes()).await?;
        return rpc_loop(reader, write_half, supervisor).await;
    }

    if request_line.starts_with("GET") && request_line.contains("/program/list") {
        let mut infos = Vec::new();
        supervisor.manager().for_each(|p| infos.push(supervisor.process_info(p)));
        let body = serde_json::to_vec(&infos).unwrap_or_default();
        write_half
            .write_all(
                format!(
                    "HTTP/1.0 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
                    body.len()
                )
                .as_bytes(),
            )
            .await?;
        write_half.write_all(&body).await?;
        return Ok(());
    }

    write_half
        .write_all(b"HTTP/1.0 404 Not Found\r\nContent-Length: 0\r\n\r\n")
        .await?;
    Ok(())
}

async fn rpc_loop<R, W>(mut reader: R, mut writer: W, supervisor: Arc<Supervisor>) -> std::io::Result<()>
where
    R: AsyncReadExt + Unpin,
    W: AsyncWriteExt + Unpin,
{
    loop {
        let bytes = match wire::read_message(&mut reader).await {
            Ok(bytes) => bytes,
            Err(_) => return Ok(()),
        };
        let request: Request = match wire::decode(&bytes) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "malformed rpc request");
                continue;
            }
        };
        let response = dispatch(&supervisor, request).await;
        let encoded = wire::encode(&response).unwrap_or_default();
        if wire::write_message(&mut writer, &encoded).await.is_err() {
            return Ok(());
        }
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
