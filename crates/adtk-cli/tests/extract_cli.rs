use std::io::Write;
use std::process::Command;

fn user_fixture() -> &'static str {
    r#"{
      "tsVersion": "5.4.0",
      "declarations": [
        {
          "symbolId": "models/user.ts:User",
          "docblockTags": [
            {"name": "entity", "text": "User"}
          ],
          "type": {
            "kind": "object",
            "properties": [
              {"name": "id", "type": {"kind": "stringPrimitive"}},
              {"name": "email", "type": {"kind": "stringPrimitive"}}
            ]
          }
        }
      ]
    }"#
}

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_adtk"))
}

#[test]
fn extract_json_reports_one_entity() {
    let dir = tempfile::tempdir().unwrap();
    let fixture_path = dir.path().join("fixture.json");
    std::fs::File::create(&fixture_path)
        .unwrap()
        .write_all(user_fixture().as_bytes())
        .unwrap();

    let cache_dir = dir.path().join("cache");
    let output = bin()
        .arg("--json")
        .arg("extract")
        .arg(&fixture_path)
        .arg("--cache-dir")
        .arg(cache_dir.to_string_lossy().into_owned())
        .output()
        .expect("adtk extract should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["ok"], serde_json::json!(true));
    assert_eq!(parsed["ir"]["entities"].as_object().unwrap().len(), 1);
}

#[test]
fn doctor_reports_cache_directory_health() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("cache");

    let output = bin()
        .arg("--json")
        .arg("doctor")
        .arg("--cache-dir")
        .arg(cache_dir.to_string_lossy().into_owned())
        .output()
        .expect("adtk doctor should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["ok"], serde_json::json!(true));
}
