use std::io::Write;

use supd_core::{AutoRestart, Signal};
use tempfile::NamedTempFile;

use super::*;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_a_program_with_defaults() {
    let file = write_config(
        r#"
        [program.echo-svc]
        command = "/bin/sleep 10"
        "#,
    );
    let view = ConfigView::load(file.path(), "/here", "node-1").unwrap();
    let programs = view.get_programs();
    assert_eq!(programs.len(), 1);
    assert_eq!(programs[0].name, "echo-svc");
    assert_eq!(programs[0].command, "/bin/sleep 10");
    assert!(programs[0].auto_start);
    assert_eq!(programs[0].auto_restart, AutoRestart::Unexpected);
    assert_eq!(programs[0].stop_signals, vec![Signal::Term]);
}

#[test]
fn interpolates_program_name_and_here() {
    let file = write_config(
        r#"
        [program.worker]
        command = "/usr/bin/run --name %(program_name)s --root %(here)s"
        directory = "%(here)s/work"
        "#,
    );
    let view = ConfigView::load(file.path(), "/srv/app", "node-1").unwrap();
    let program = &view.get_programs()[0];
    assert_eq!(program.command, "/usr/bin/run --name worker --root /srv/app");
    assert_eq!(program.directory.as_deref(), Some("/srv/app/work"));
}

#[test]
fn groups_programs_by_declared_group() {
    let file = write_config(
        r#"
        [program.web-1]
        command = "/bin/true"
        group = "web"

        [program.web-2]
        command = "/bin/true"
        group = "web"
        "#,
    );
    let view = ConfigView::load(file.path(), "/here", "node-1").unwrap();
    let groups = view.get_groups();
    assert_eq!(groups.get("web"), Some(&vec!["web-1".to_string(), "web-2".to_string()]));
}

#[test]
fn rejects_unknown_autorestart_value() {
    let file = write_config(
        r#"
        [program.bad]
        command = "/bin/true"
        autorestart = "sometimes"
        "#,
    );
    assert!(ConfigView::load(file.path(), "/here", "node-1").is_err());
}

#[test]
fn parses_comma_separated_environment() {
    let file = write_config(
        r#"
        [program.envy]
        command = "/bin/true"
        environment = "FOO=1,BAR=%(program_name)s"
        "#,
    );
    let view = ConfigView::load(file.path(), "/here", "node-1").unwrap();
    let env = &view.get_programs()[0].environment;
    assert!(env.contains(&("FOO".to_string(), "1".to_string())));
    assert!(env.contains(&("BAR".to_string(), "envy".to_string())));
}
