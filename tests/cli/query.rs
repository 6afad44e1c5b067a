use mockito::{Matcher, Server};
use predicates::{prelude::*, str::contains};
use serde_json::json;

use crate::cli::{grafana_api_at, lines};

const RESPONSE: &str = r#"{"results":{"A":{"frames":[{"schema":{"refId":"A","fields":[{"name":"time","type":"time","typeInfo":{"frame":"time.Time"}},{"name":"A-series","type":"number","typeInfo":{"frame":"int64","nullable":true}}]},"data":{"values":[[1644488152084,1644488212084,1644488272084],[1,20,null]]}}]}}}"#;

#[test]
fn query_table() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/ds/query")
        .match_body(Matcher::PartialJson(json!({
            "queries": [{"refId": "A", "datasource": {"uid": "prom"}, "expr": "up"}],
            "range": {"from": "now-1h", "to": "now"},
            "from": "now-1h",
            "to": "now",
        })))
        .with_status(200)
        .with_body(RESPONSE)
        .create();

    grafana_api_at(&server)
        .args(["query", "--datasource", "prom", "--expr", "up"])
        .assert()
        .success()
        .stdout(lines(&[
            "A",
            "time           A-series",
            "1644488152084  1",
            "1644488212084  20",
            "1644488272084  (null)",
        ]));

    mock.assert();
}

#[test]
fn query_json() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/api/ds/query")
        .with_status(200)
        .with_body(RESPONSE)
        .create();

    grafana_api_at(&server)
        .args(["-O", "json", "query", "--datasource", "prom", "--expr", "up"])
        .assert()
        .success()
        .stdout(contains(r#""refId":"A""#).and(contains("1644488152084")));
}

#[test]
fn absolute_range() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/ds/query")
        .match_body(Matcher::PartialJson(json!({
            "range": {
                "from": "2024-01-01T00:00:00.000Z",
                "to": "2024-01-01T06:00:00.000Z",
            },
            "from": "1704067200000",
            "to": "1704088800000",
        })))
        .with_status(200)
        .with_body(r#"{"results":{}}"#)
        .create();

    grafana_api_at(&server)
        .args([
            "query",
            "--datasource",
            "prom",
            "--expr",
            "up",
            "--from",
            "2024-01-01T00:00:00Z",
            "--to",
            "2024-01-01T06:00:00Z",
        ])
        .assert()
        .success();

    mock.assert();
}

#[test]
fn failed_query_is_reported() {
    let mut server = Server::new();
    let _mock = server
        .mock("POST", "/api/ds/query")
        .with_status(400)
        .with_body(r#"{"results":{"A":{"error":"parse error at char 3","status":400}}}"#)
        .create();

    grafana_api_at(&server)
        .args(["query", "--datasource", "prom", "--expr", "up{"])
        .assert()
        .failure()
        .stdout(contains("parse error at char 3"))
        .stderr(contains("1 of 1 queries failed"));
}
