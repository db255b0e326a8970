use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn engine_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_modalmate-engine").expect("modalmate-engine test binary not built")
}

struct Engine {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Engine {
    fn spawn(args: &[&str]) -> Self {
        let mut child = Command::new(engine_bin())
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn modalmate-engine");
        let stdin = child.stdin.take().expect("engine stdin");
        let stdout = BufReader::new(child.stdout.take().expect("engine stdout"));
        Self {
            child,
            stdin,
            stdout,
        }
    }

    fn send_line(&mut self, line: &str) -> serde_json::Value {
        writeln!(self.stdin, "{line}").expect("write request");
        self.stdin.flush().expect("flush request");
        let mut reply = String::new();
        self.stdout.read_line(&mut reply).expect("read reply");
        serde_json::from_str(&reply).expect("reply is JSON")
    }

    fn key(&mut self, mode: &str, characters: &str) -> serde_json::Value {
        let request = serde_json::json!({
            "action": "keyEvent",
            "keyCode": 0,
            "characters": characters,
            "modifiers": [],
            "mode": mode,
            "hasSelection": false,
            "scroll": {"x": 0, "y": 0},
        });
        self.send_line(&request.to_string())
    }

    fn finish(mut self) -> std::process::ExitStatus {
        drop(self.stdin);
        self.child.wait().expect("engine exit")
    }
}

#[test]
fn engine_answers_key_events() {
    let mut engine = Engine::spawn(&[]);
    let reply = engine.key("command", "j");
    assert_eq!(reply["action"], "moveCursor");
    assert_eq!(reply["motion"], "moveDown:");
    let reply = engine.key("insert", "\u{1b}");
    assert_eq!(reply["action"], "enterCommand");
    assert!(engine.finish().success());
}

#[test]
fn engine_waits_for_multi_key_mappings() {
    let mut engine = Engine::spawn(&[]);
    assert_eq!(engine.key("command", "g")["action"], "noop");
    let reply = engine.key("command", "g");
    assert_eq!(reply["motion"], "moveToBeginningOfDocument:");
    assert!(engine.finish().success());
}

#[test]
fn engine_reports_malformed_lines_and_keeps_going() {
    let mut engine = Engine::spawn(&[]);
    let reply = engine.send_line("{\"action\": ");
    assert_eq!(reply["action"], "error");
    assert!(reply["message"].is_string());
    assert_eq!(engine.key("command", "k")["motion"], "moveUp:");
    assert!(engine.finish().success());
}

#[test]
fn engine_accepts_extra_mappings() {
    let mut engine = Engine::spawn(&["--map", "H=move_to_beginning_of_line"]);
    assert_eq!(engine.key("command", "H")["motion"], "moveToBeginningOfLine:");
    assert!(engine.finish().success());
}

#[test]
fn engine_rejects_bad_mappings() {
    let output = Command::new(engine_bin())
        .args(["--map", "q=record_macro"])
        .stdin(Stdio::null())
        .output()
        .expect("run modalmate-engine");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--map"));
}
