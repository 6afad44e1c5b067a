use mockito::{Matcher, Server};
use predicates::{prelude::*, str::contains};
use serde_json::json;

use crate::cli::{grafana_api_at, lines};

#[test]
fn ls() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/datasources")
        .with_status(200)
        .with_body(
            r#"[{"id":1,"uid":"prom","name":"Prometheus","type":"prometheus","url":"http://p:9090","access":"proxy","isDefault":true},{"id":2,"uid":"loki","name":"Loki","type":"loki","url":"http://l:3100","access":"proxy","isDefault":false}]"#,
        )
        .create();

    grafana_api_at(&server)
        .args(["datasource", "ls"])
        .assert()
        .success()
        .stdout(lines(&[
            "ID  UID   NAME        TYPE        URL            DEFAULT",
            "1   prom  Prometheus  prometheus  http://p:9090  *",
        ]));
}

#[test]
fn get_by_name() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/datasources/name/My%20Prometheus")
        .with_status(200)
        .with_body(
            r#"{"id":1,"uid":"prom","name":"My Prometheus","type":"prometheus","url":"http://p:9090","access":"proxy","jsonData":{"httpMethod":"POST"}}"#,
        )
        .create();

    grafana_api_at(&server)
        .args(["datasource", "get", "--name", "My Prometheus"])
        .assert()
        .success()
        .stdout(contains("jsonData.httpMethod").and(contains("\"POST\"")));

    mock.assert();
}

#[test]
fn get_requires_one_selector() {
    let server = Server::new();

    grafana_api_at(&server)
        .args(["datasource", "get"])
        .assert()
        .failure();

    grafana_api_at(&server)
        .args(["datasource", "get", "--uid", "a", "--name", "b"])
        .assert()
        .failure()
        .stderr(contains("cannot be used with"));
}

#[test]
fn create_with_settings_and_headers() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/datasources")
        .match_body(Matcher::Json(json!({
            "name": "loki",
            "type": "loki",
            "url": "http://loki:3100",
            "access": "proxy",
            "isDefault": false,
            "basicAuth": false,
            "withCredentials": false,
            "jsonData": {
                "maxLines": 1000,
                "derivedFields": "none",
                "httpHeaderName1": "X-Scope-OrgID",
            },
            "secureJsonData": {
                "httpHeaderValue1": "tenant1",
            },
        })))
        .with_status(200)
        .with_body(
            r#"{"id":9,"message":"Datasource added","name":"loki","datasource":{"id":9,"uid":"c3f9","name":"loki","type":"loki"}}"#,
        )
        .create();

    grafana_api_at(&server)
        .args([
            "datasource",
            "create",
            "--name",
            "loki",
            "--type",
            "loki",
            "--url",
            "http://loki:3100",
            "--json-data",
            "maxLines=1000",
            "--json-data",
            "derivedFields=none",
            "--header",
            "X-Scope-OrgID=tenant1",
        ])
        .assert()
        .success()
        .stderr(contains("uid c3f9"));

    mock.assert();
}

#[test]
fn rm_by_id() {
    let mut server = Server::new();
    let mock = server
        .mock("DELETE", "/api/datasources/12")
        .with_status(200)
        .with_body(r#"{"message":"Data source deleted"}"#)
        .create();

    grafana_api_at(&server)
        .args(["datasource", "rm", "--id", "12"])
        .assert()
        .success();

    mock.assert();
}

#[test]
fn rm_if_exists() {
    let mut server = Server::new();
    let _mock = server
        .mock("DELETE", "/api/datasources/uid/gone")
        .with_status(404)
        .with_body(r#"{"message":"Data source not found"}"#)
        .create();

    grafana_api_at(&server)
        .args(["datasource", "rm", "--uid", "gone", "--if-exists"])
        .assert()
        .success()
        .stderr(contains("does not exist"));
}
