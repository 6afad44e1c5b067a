use mockito::{Matcher, Server};
use predicates::{
    prelude::*,
    str::{contains, starts_with},
};

use crate::cli::{API_KEY, grafana_api_at, lines};

const FOLDER: &str = r#"{"id":1,"uid":"nErXDvCkzz","title":"Department ABC","url":"/dashboards/f/nErXDvCkzz/department-abc","version":1}"#;

#[test]
fn ls() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/folders")
        .match_header("authorization", format!("Bearer {API_KEY}").as_str())
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("limit".into(), "1000".into()),
            Matcher::UrlEncoded("page".into(), "1".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"[{"id":2,"uid":"def","title":"Nested","parentUid":"abc"},{"id":1,"uid":"abc","title":"Ops"}]"#,
        )
        .create();

    grafana_api_at(&server)
        .args(["folder", "ls"])
        .assert()
        .success()
        .stdout(lines(&["UID  TITLE   PARENT", "def  Nested  abc"]))
        .stdout(contains("abc  Ops"));

    mock.assert();
}

#[test]
fn ls_json_output() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/folders")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"id":1,"uid":"abc","title":"Ops","extra":true}]"#)
        .create();

    grafana_api_at(&server)
        .args(["-O", "json", "folder", "ls"])
        .assert()
        .success()
        .stdout(starts_with("[").and(contains(r#""extra":true"#)));
}

#[test]
fn get() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/folders/nErXDvCkzz")
        .with_status(200)
        .with_body(FOLDER)
        .create();

    grafana_api_at(&server)
        .args(["folder", "get", "nErXDvCkzz"])
        .assert()
        .success()
        .stdout(contains("Department ABC"));
}

#[test]
fn create() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/folders")
        .match_body(Matcher::Json(serde_json::json!({"title": "test-folder"})))
        .with_status(200)
        .with_body(FOLDER)
        .create();

    grafana_api_at(&server)
        .args(["folder", "create", "test-folder"])
        .assert()
        .success()
        .stderr(contains("nErXDvCkzz"));

    mock.assert();
}

#[test]
fn create_if_not_exists() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/api/folders")
        .with_status(409)
        .with_body(r#"{"message":"a folder with the same name already exists"}"#)
        .create();

    grafana_api_at(&server)
        .args(["folder", "create", "test-folder"])
        .assert()
        .failure()
        .stderr(contains("Conflict (409 Conflict)"));

    grafana_api_at(&server)
        .args(["folder", "create", "--if-not-exists", "test-folder"])
        .assert()
        .success()
        .stderr(contains("already exists"));
}

#[test]
fn rm_if_exists() {
    let mut server = Server::new();
    let _mock = server
        .mock("DELETE", "/api/folders/gone")
        .with_status(404)
        .with_body(r#"{"message":"folder not found"}"#)
        .create();

    grafana_api_at(&server)
        .args(["folder", "rm", "gone"])
        .assert()
        .failure()
        .stderr(contains("folder not found"));

    grafana_api_at(&server)
        .args(["folder", "rm", "--if-exists", "gone"])
        .assert()
        .success();
}
