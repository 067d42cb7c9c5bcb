//! ---
//! devreg_section: "01-core-functionality"
//! devreg_subsection: "integration-tests"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Binary entrypoint for the device registry daemon."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use assert_cmd::cargo::CommandCargoExt;
use assert_cmd::Command;
use devreg_core::{Device, DeviceStore, DeviceType};
use devreg_persistence::FileDeviceStore;
use tempfile::{tempdir, TempDir};

/// Temp workspace holding a snapshot with two trees.
fn seeded() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("devices.json");
    let store = FileDeviceStore::open(&path).unwrap();
    store.put(Device::new("gw", DeviceType::Gateway)).unwrap();
    store
        .put(Device::new("sw", DeviceType::Switch).with_uplink("gw"))
        .unwrap();
    store
        .put(Device::new("ap", DeviceType::AccessPoint).with_uplink("sw"))
        .unwrap();
    store.put(Device::new("gw2", DeviceType::Gateway)).unwrap();
    (dir, path)
}

fn devregd(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("devregd").unwrap();
    cmd.current_dir(workdir).env_remove("DEVREG_CONFIG");
    cmd
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

#[test]
fn topology_prints_forest_from_data_file() {
    let (dir, path) = seeded();
    let forest = stdout_json(devregd(dir.path()).arg("--data").arg(&path).arg("topology"));
    assert_eq!(
        forest,
        serde_json::json!([
            {"macAddress": "gw", "children": [
                {"macAddress": "sw", "children": [
                    {"macAddress": "ap", "children": []}
                ]}
            ]},
            {"macAddress": "gw2", "children": []}
        ])
    );
}

#[test]
fn topology_with_mac_prints_subtree() {
    let (dir, path) = seeded();
    let tree = stdout_json(
        devregd(dir.path())
            .arg("--data")
            .arg(&path)
            .args(["topology", "sw"]),
    );
    assert_eq!(
        tree,
        serde_json::json!({"macAddress": "sw", "children": [{"macAddress": "ap", "children": []}]})
    );
}

#[test]
fn topology_of_unknown_mac_fails() {
    let (dir, path) = seeded();
    let output = devregd(dir.path())
        .arg("--data")
        .arg(&path)
        .args(["topology", "ghost"])
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("device not found: ghost"));
}

#[test]
fn env_config_selects_the_snapshot() {
    let (dir, path) = seeded();
    let config = dir.path().join("custom.toml");
    std::fs::write(
        &config,
        format!(
            "[storage]\nbackend = \"file\"\npath = {:?}\n",
            path.display().to_string()
        ),
    )
    .unwrap();

    let tree = stdout_json(
        devregd(dir.path())
            .env("DEVREG_CONFIG", &config)
            .args(["topology", "gw"]),
    );
    assert_eq!(tree["children"][0]["macAddress"], "sw");
}

#[test]
fn missing_env_config_is_an_error() {
    let dir = tempdir().unwrap();
    let output = devregd(dir.path())
        .env("DEVREG_CONFIG", dir.path().join("absent.toml"))
        .arg("topology")
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(String::from_utf8_lossy(&output.stderr).contains("unable to read config file"));
}

#[test]
fn missing_config_flag_is_an_error() {
    let dir = tempdir().unwrap();
    let output = devregd(dir.path())
        .arg("--config")
        .arg(dir.path().join("typo.toml"))
        .arg("topology")
        .assert()
        .failure()
        .get_output()
        .clone();
    assert!(String::from_utf8_lossy(&output.stderr).contains("unable to read config file"));
}

struct Daemon(Child);

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn http_get(port: u16, path: &str) -> Option<String> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).ok()?;
    write!(
        stream,
        "GET {path} HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n"
    )
    .ok()?;
    let mut response = String::new();
    stream.read_to_string(&mut response).ok()?;
    Some(response)
}

#[test]
fn run_serves_on_listen_override() {
    let (dir, path) = seeded();
    let port = free_port();
    let child = std::process::Command::cargo_bin("devregd")
        .unwrap()
        .current_dir(dir.path())
        .env_remove("DEVREG_CONFIG")
        .env("DEVREG_LOG", "warn")
        .arg("--data")
        .arg(&path)
        .arg("--listen")
        .arg(format!("127.0.0.1:{port}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let _daemon = Daemon(child);

    let deadline = Instant::now() + Duration::from_secs(15);
    let response = loop {
        if let Some(response) = http_get(port, "/devices/sw") {
            break response;
        }
        assert!(Instant::now() < deadline, "devregd never listened on {port}");
        thread::sleep(Duration::from_millis(100));
    };
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains(r#""macAddress":"sw""#), "{response}");
}
