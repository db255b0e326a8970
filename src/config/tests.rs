use super::validation::{sanitize_binary, sibling_binary};
use super::RouterConfig;
use crate::keys::{KeyStroke, Modifier};
use clap::Parser;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use std::{env, fs};

fn parse(args: &[&str]) -> RouterConfig {
    let mut argv = vec!["test-app"];
    argv.extend_from_slice(args);
    RouterConfig::parse_from(argv)
}

#[test]
fn defaults_validate() {
    let mut cfg = parse(&[]);
    cfg.validate().expect("defaults are valid");
    assert_eq!(cfg.engine_cmd, "modalmate-engine");
    assert_eq!(cfg.router_timeout(), Duration::from_millis(50));
    assert_eq!(cfg.max_query_rounds, 16);
    assert_eq!(
        cfg.eligible_window_classes,
        vec!["OakProjectWindow".to_string(), "OakDocumentWindow".to_string()]
    );
}

#[test]
fn default_keystroke_lists_parse() {
    let cfg = parse(&[]);
    assert_eq!(
        cfg.insert_triggers().unwrap(),
        vec![KeyStroke::new("\u{1b}", [])]
    );
    assert_eq!(
        cfg.reserved_shortcuts().unwrap(),
        vec![
            KeyStroke::new("d", [Modifier::Control]),
            KeyStroke::new("u", [Modifier::Control]),
        ]
    );
}

#[test]
fn repeated_flags_replace_defaults() {
    let cfg = parse(&[
        "--insert-trigger",
        "<C-[>",
        "--insert-trigger",
        "<esc>",
        "--reserved-shortcut",
        "<M-f>",
    ]);
    assert_eq!(cfg.insert_triggers().unwrap().len(), 2);
    assert_eq!(
        cfg.reserved_shortcuts().unwrap(),
        vec![KeyStroke::new("f", [Modifier::Command])]
    );
}

#[test]
fn rejects_timeout_out_of_bounds() {
    let mut cfg = parse(&["--router-timeout-ms", "0"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--router-timeout-ms", "5001"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn accepts_timeout_bounds() {
    let mut cfg = parse(&["--router-timeout-ms", "1"]);
    assert!(cfg.validate().is_ok());

    let mut cfg = parse(&["--router-timeout-ms", "5000"]);
    assert!(cfg.validate().is_ok());
}

#[test]
fn rejects_query_rounds_out_of_bounds() {
    let mut cfg = parse(&["--max-query-rounds", "0"]);
    assert!(cfg.validate().is_err());

    let mut cfg = parse(&["--max-query-rounds", "129"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_invalid_keystroke_naming_the_flag() {
    let mut cfg = parse(&["--insert-trigger", "<C-d"]);
    let err = cfg.validate().unwrap_err();
    assert!(format!("{err:#}").contains("--insert-trigger"));
}

#[test]
fn rejects_reserved_shortcut_without_modifier() {
    let mut cfg = parse(&["--reserved-shortcut", "j"]);
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("--reserved-shortcut"));
}

#[test]
fn rejects_empty_window_class() {
    let mut cfg = parse(&["--eligible-window-class", "  "]);
    assert!(cfg.validate().is_err());
}

#[test]
fn engine_args_are_shell_split() {
    let cfg = parse(&[
        "--engine-cmd",
        "/bin/sh",
        "--engine-args",
        "-c 'echo \"hi there\"'",
    ]);
    let command = cfg.engine_command().unwrap();
    assert_eq!(command.program, "/bin/sh");
    assert_eq!(command.args, vec!["-c", "echo \"hi there\""]);
}

#[test]
fn engine_args_may_start_with_a_dash() {
    let cfg = parse(&[
        "--engine-cmd",
        "/bin/sh",
        "--engine-args",
        "--map insert:jk=enter_command_mode",
    ]);
    let command = cfg.engine_command().unwrap();
    assert_eq!(command.args, vec!["--map", "insert:jk=enter_command_mode"]);
    assert_eq!(cfg.router_timeout_ms, super::DEFAULT_ROUTER_TIMEOUT_MS);
}

#[test]
fn sibling_binary_finds_files_next_to_the_running_executable() {
    let exe = env::current_exe().unwrap();
    let name = exe.file_stem().unwrap().to_string_lossy().to_string();
    assert_eq!(sibling_binary(&name), Some(exe));
    assert_eq!(sibling_binary("modalmate-no-such-binary"), None);
}

#[test]
fn rejects_unbalanced_engine_args() {
    let mut cfg = parse(&["--engine-args", "'unterminated"]);
    assert!(cfg.validate().is_err());
    assert!(cfg.engine_command().is_err());
}

#[test]
fn rejects_too_many_engine_args() {
    let many = vec!["x"; 65].join(" ");
    let mut cfg = parse(&["--engine-args", &many]);
    assert!(cfg.validate().is_err());
}

#[test]
fn logging_flags_combine() {
    assert!(!parse(&[]).logging_enabled());
    assert!(parse(&["--logs"]).logging_enabled());
    assert!(!parse(&["--logs", "--no-logs"]).logging_enabled());
}

#[test]
fn sanitize_binary_accepts_allowlist_case_insensitive() {
    let sanitized =
        sanitize_binary("ModalMate-Engine", "--engine-cmd", &["modalmate-engine"]).unwrap();
    assert_eq!(sanitized, "modalmate-engine");
}

#[test]
fn sanitize_binary_rejects_empty() {
    assert!(sanitize_binary("   ", "--engine-cmd", &["modalmate-engine"]).is_err());
}

#[test]
fn sanitize_binary_rejects_unknown_bare_name() {
    let err = sanitize_binary("vim", "--engine-cmd", &["modalmate-engine"]).unwrap_err();
    assert!(err.to_string().contains("--engine-cmd"));
}

#[test]
fn sanitize_binary_rejects_missing_relative_path() {
    let result = sanitize_binary("bin/does-not-exist", "--engine-cmd", &["modalmate-engine"]);
    assert!(result.is_err());
}

#[test]
fn sanitize_binary_rejects_directory_path() {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir_path = env::temp_dir().join(format!("modalmate_dir_{unique}"));
    fs::create_dir_all(&dir_path).unwrap();
    let result = sanitize_binary(dir_path.to_str().unwrap(), "--engine-cmd", &["modalmate-engine"]);
    assert!(result.is_err());
    let _ = fs::remove_dir(&dir_path);
}

#[cfg(unix)]
#[test]
fn sanitize_binary_checks_executable_bit() {
    use std::os::unix::fs::PermissionsExt;

    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let path = env::temp_dir().join(format!("modalmate_engine_{unique}"));
    fs::write(&path, "#!/bin/sh\n").unwrap();

    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o644);
    fs::set_permissions(&path, perms.clone()).unwrap();
    assert!(sanitize_binary(path.to_str().unwrap(), "--engine-cmd", &[]).is_err());

    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    let sanitized = sanitize_binary(path.to_str().unwrap(), "--engine-cmd", &[]).unwrap();
    assert!(sanitized.ends_with(&format!("modalmate_engine_{unique}")));
    let _ = fs::remove_file(&path);
}
