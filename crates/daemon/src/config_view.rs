//! ConfigView: the typed, read-only snapshot the core consumes from the
//! config collaborator. The on-disk format (TOML here; the real system's
//! INI dialect and its include-glob resolution are out of scope) is an
//! implementation detail behind this module's typed getters.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use supd_core::{AutoRestart, ProcessConfig, Signal, SupdError, SupdResult};

/// `[supervisord]`: daemon-wide settings (log file, pid file, umask).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupervisordSection {
    #[serde(default)]
    pub logfile: Option<String>,
    #[serde(default)]
    pub pidfile: Option<String>,
    #[serde(default = "default_loglevel")]
    pub loglevel: String,
}

fn default_loglevel() -> String {
    "info".to_string()
}

/// `[unix_http_server]`: Unix-socket RPC transport.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnixHttpServerSection {
    pub file: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// `[inet_http_server]`: TCP RPC transport.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InetHttpServerSection {
    pub port: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// `[supervisorctl]`: client-side defaults, carried through unused by the
/// daemon itself but still part of the typed surface the config exposes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupervisorctlSection {
    pub server_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawProgram {
    command: String,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    directory: Option<String>,
    #[serde(default)]
    environment: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    process_num: Option<u32>,
    #[serde(default)]
    autostart: Option<bool>,
    #[serde(default)]
    autorestart: Option<String>,
    #[serde(default)]
    startretries: Option<u32>,
    #[serde(default)]
    exitcodes: Option<String>,
    #[serde(default)]
    startsecs: Option<u64>,
    #[serde(default)]
    stopsignal: Option<String>,
    #[serde(default)]
    stopwaitsecs: Option<u64>,
    #[serde(default)]
    stdout_logfile: Option<String>,
    #[serde(default)]
    stderr_logfile: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawEventListener {
    #[serde(flatten)]
    program: RawProgram,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    supervisord: SupervisordSection,
    #[serde(default)]
    unix_http_server: Option<UnixHttpServerSection>,
    #[serde(default)]
    inet_http_server: Option<InetHttpServerSection>,
    #[serde(default)]
    supervisorctl: Option<SupervisorctlSection>,
    #[serde(default)]
    program: HashMap<String, RawProgram>,
    #[serde(default)]
    eventlistener: HashMap<String, RawEventListener>,
}

/// The loaded, interpolated configuration. Immutable once built; `Load`
/// produces a fresh one each reload.
#[derive(Debug, Clone, Default)]
pub struct ConfigView {
    path: PathBuf,
    supervisord: SupervisordSection,
    unix_http_server: Option<UnixHttpServerSection>,
    inet_http_server: Option<InetHttpServerSection>,
    supervisorctl: Option<SupervisorctlSection>,
    programs: Vec<ProcessConfig>,
    event_listeners: Vec<ProcessConfig>,
}

/// The interpolation tokens `%(key)s` expands against.
pub struct Interpolation<'a> {
    pub program_name: &'a str,
    pub process_num: u32,
    pub group_name: &'a str,
    pub here: &'a str,
    pub host_node_name: &'a str,
}

impl<'a> Interpolation<'a> {
    fn expand(&self, s: &str) -> String {
        s.replace("%(program_name)s", self.program_name)
            .replace("%(process_num)s", &self.process_num.to_string())
            .replace("%(group_name)s", self.group_name)
            .replace("%(here)s", self.here)
            .replace("%(host_node_name)s", self.host_node_name)
    }
}

impl ConfigView {
    /// Parses `path` and builds the fully interpolated view. The caller
    /// supplies `here` (the config file's own directory) and
    /// `host_node_name` (typically the machine hostname); both are
    /// otherwise opaque to this module.
    pub fn load(path: impl AsRef<Path>, here: &str, host_node_name: &str) -> SupdResult<Self> {
        let path = path.as_ref().to_path_buf();
        let text = std::fs::read_to_string(&path).map_err(SupdError::from)?;
        let raw: RawDocument =
            toml::from_str(&text).map_err(|e| SupdError::BadArguments(e.to_string()))?;

        let mut programs = Vec::new();
        for (name, p) in &raw.program {
            let group = p.group.clone().unwrap_or_default();
            let interp = Interpolation {
                program_name: name,
                process_num: p.process_num.unwrap_or(0),
                group_name: if group.is_empty() { name } else { &group },
                here,
                host_node_name,
            };
            programs.push(to_process_config(name, &group, p, &interp)?);
        }
        programs.sort_by(|a, b| a.name.cmp(&b.name));

        let mut event_listeners = Vec::new();
        for (name, e) in &raw.eventlistener {
            let group = e.program.group.clone().unwrap_or_default();
            let interp = Interpolation {
                program_name: name,
                process_num: e.program.process_num.unwrap_or(0),
                group_name: if group.is_empty() { name } else { &group },
                here,
                host_node_name,
            };
            event_listeners.push(to_process_config(name, &group, &e.program, &interp)?);
        }
        event_listeners.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            path,
            supervisord: raw.supervisord,
            unix_http_server: raw.unix_http_server,
            inet_http_server: raw.inet_http_server,
            supervisorctl: raw.supervisorctl,
            programs,
            event_listeners,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_supervisord(&self) -> &SupervisordSection {
        &self.supervisord
    }

    pub fn get_unix_http_server(&self) -> Option<&UnixHttpServerSection> {
        self.unix_http_server.as_ref()
    }

    pub fn get_inet_http_server(&self) -> Option<&InetHttpServerSection> {
        self.inet_http_server.as_ref()
    }

    pub fn get_supervisorctl(&self) -> Option<&SupervisorctlSection> {
        self.supervisorctl.as_ref()
    }

    pub fn get_programs(&self) -> &[ProcessConfig] {
        &self.programs
    }

    pub fn get_event_listeners(&self) -> &[ProcessConfig] {
        &self.event_listeners
    }

    /// Every distinct group across programs and event listeners, each with
    /// its sorted member list.
    pub fn get_groups(&self) -> HashMap<String, Vec<String>> {
        let mut groups: HashMap<String, Vec<String>> = HashMap::new();
        for p in self.programs.iter().chain(self.event_listeners.iter()) {
            groups.entry(p.group_or_name().to_string()).or_default().push(p.name.clone());
        }
        for members in groups.values_mut() {
            members.sort();
        }
        groups
    }

    /// All program + event-listener configs this view declares.
    pub fn all_processes(&self) -> Vec<ProcessConfig> {
        let mut all = self.programs.clone();
        all.extend(self.event_listeners.iter().cloned());
        all
    }
}

fn to_process_config(
    name: &str,
    group: &str,
    raw: &RawProgram,
    interp: &Interpolation<'_>,
) -> SupdResult<ProcessConfig> {
    let auto_restart = match raw.autorestart.as_deref() {
        None | Some("unexpected") => AutoRestart::Unexpected,
        Some("true") => AutoRestart::Always,
        Some("false") => AutoRestart::Never,
        Some(other) => {
            return Err(SupdError::BadArguments(format!(
                "unknown autorestart value {other:?}"
            )))
        }
    };

    let exit_codes = raw
        .exitcodes
        .as_deref()
        .unwrap_or("0")
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<i32>()
                .map_err(|_| SupdError::BadArguments(format!("bad exitcodes entry {s:?}")))
        })
        .collect::<SupdResult<HashSet<i32>>>()?;

    let stop_signals = raw
        .stopsignal
        .as_deref()
        .unwrap_or("TERM")
        .split(',')
        .map(Signal::parse)
        .collect::<SupdResult<Vec<Signal>>>()?;

    let environment = raw
        .environment
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (k, v) = pair
                .split_once('=')
                .ok_or_else(|| SupdError::BadArguments(format!("bad environment entry {pair:?}")))?;
            Ok((k.trim().to_string(), interp.expand(v.trim())))
        })
        .collect::<SupdResult<Vec<(String, String)>>>()?;

    Ok(ProcessConfig {
        name: name.to_string(),
        group: group.to_string(),
        command: interp.expand(&raw.command),
        directory: raw.directory.as_deref().map(|d| interp.expand(d)),
        environment,
        user: raw.user.clone(),
        process_num: raw.process_num.unwrap_or(0),
        start_retries: raw.startretries.unwrap_or(3),
        auto_start: raw.autostart.unwrap_or(true),
        auto_restart,
        exit_codes,
        start_seconds: raw.startsecs.unwrap_or(1),
        stop_signals,
        stop_wait_seconds: raw.stopwaitsecs.unwrap_or(10),
        stdout_logfile: raw.stdout_logfile.as_deref().map(|p| interp.expand(p)),
        stderr_logfile: raw.stderr_logfile.as_deref().map(|p| interp.expand(p)),
        capture_max_bytes: 0,
    })
}

#[cfg(test)]
#[path = "config_view_tests.rs"]
mod tests;
