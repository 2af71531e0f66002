use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const SITE: &str = "app.example.com {\n    reverse_proxy localhost:3000\n}\n";

const SERVICES: &str = "*.services.example.com {
    # API backend
    handle @api {
        reverse_proxy localhost:8080
    }
    @api host api.services.example.com
}
";

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn file(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }
}

fn caddyclub(args: &[&str], file: &Path) -> Output {
    // Run the compiled binary directly
    Command::new(env!("CARGO_BIN_EXE_caddyclub"))
        .args(args)
        .arg(file)
        .output()
        .expect("Failed to run caddyclub")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_fmt_prints_canonical_text() {
    let ws = Workspace::new();
    let path = ws.file("Caddyfile", SITE);

    let output = caddyclub(&["fmt"], &path);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "app.example.com {\n\treverse_proxy localhost:3000\n}\n");
    // Untouched without --write
    assert_eq!(std::fs::read_to_string(&path).unwrap(), SITE);
}

#[test]
fn test_fmt_write_in_place() {
    let ws = Workspace::new();
    let path = ws.file("Caddyfile", SITE);

    let output = caddyclub(&["fmt", "--write"], &path);
    assert!(output.status.success());
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "app.example.com {\n\treverse_proxy localhost:3000\n}\n"
    );
}

#[test]
fn test_adapt_outputs_admin_json() {
    let ws = Workspace::new();
    let path = ws.file("Caddyfile", SITE);

    let output = caddyclub(&["adapt"], &path);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let route = &json["apps"]["http"]["servers"]["clubs"]["routes"][0];
    assert_eq!(route["match"][0]["host"][0], "app.example.com");
    assert_eq!(route["handle"][0]["upstreams"][0]["dial"], "localhost:3000");
}

#[test]
fn test_adapt_with_options() {
    let ws = Workspace::new();
    let path = ws.file("Caddyfile", SITE);
    let options = ws.file(
        "options.toml",
        "server_name = \"edge\"\nlisten = [\":8443\"]\nterminal = true\n",
    );

    let output = Command::new(env!("CARGO_BIN_EXE_caddyclub"))
        .arg("adapt")
        .arg("--options")
        .arg(&options)
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let server = &json["apps"]["http"]["servers"]["edge"];
    assert_eq!(server["listen"], serde_json::json!([":8443"]));
    assert_eq!(server["routes"][0]["terminal"], true);
}

#[test]
fn test_unadapt_round_trip() {
    let ws = Workspace::new();
    let caddyfile = ws.file("Caddyfile", SITE);
    let adapted = caddyclub(&["adapt"], &caddyfile);
    let json = ws.file("caddy.json", &stdout(&adapted));

    let output = caddyclub(&["unadapt"], &json);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "app.example.com {\n\treverse_proxy localhost:3000\n}\n");
}

#[test]
fn test_unadapt_rejects_malformed_json() {
    let ws = Workspace::new();
    let path = ws.file("broken.json", "{ nope");
    let output = caddyclub(&["unadapt"], &path);
    assert!(!output.status.success());
}

#[test]
fn test_validate_accepts_caddyfile() {
    let ws = Workspace::new();
    let path = ws.file("Caddyfile", SITE);
    let output = caddyclub(&["validate"], &path);
    assert!(output.status.success());
    assert!(stdout(&output).contains("looks like a Caddyfile"));
}

#[test]
fn test_validate_rejects_html() {
    let ws = Workspace::new();
    let path = ws.file("index.html", "<!DOCTYPE html>\n<html></html>\n");
    let output = caddyclub(&["validate"], &path);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("HTML"));
}

#[test]
fn test_adapt_refuses_invalid_input() {
    let ws = Workspace::new();
    let path = ws.file("notes.txt", "just some notes\n");
    let output = caddyclub(&["adapt"], &path);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_services_lists_virtual_blocks() {
    let ws = Workspace::new();
    let path = ws.file("Caddyfile", SERVICES);

    let output = caddyclub(&["services"], &path);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["wildcardDomain"], "*.services.example.com");
    let service = &json["virtualBlocks"][0];
    assert_eq!(service["matcherName"], "api");
    assert_eq!(service["hostname"], "api.services.example.com");
    assert_eq!(service["description"], "API backend");
}

#[test]
fn test_services_falls_back_to_stats() {
    let ws = Workspace::new();
    let path = ws.file("Caddyfile", SITE);

    let output = caddyclub(&["services"], &path);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["siteBlocks"], 1);
    assert_eq!(json["directives"], 1);
}

#[test]
fn test_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_caddyclub"))
        .arg("version")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("Caddyclub v"));
}
