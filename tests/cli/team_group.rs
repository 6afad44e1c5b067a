use mockito::{Matcher, Server};
use predicates::str::contains;

use crate::cli::{grafana_api_at, lines};

#[test]
fn ls() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/api/teams/1/groups")
        .with_status(200)
        .with_body(
            r#"[{"orgId":1,"teamId":1,"groupId":"test"},{"orgId":1,"teamId":1,"groupId":"cn=editors,ou=groups,dc=grafana,dc=org"}]"#,
        )
        .create();

    grafana_api_at(&server)
        .args(["team-group", "ls", "1"])
        .assert()
        .success()
        .stdout(lines(&[
            "TEAM  GROUP",
            "1     test",
            "1     cn=editors,ou=groups,dc=grafana,dc=org",
        ]));
}

#[test]
fn add() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/teams/1/groups")
        .match_body(Matcher::Json(serde_json::json!({"groupId": "test"})))
        .with_status(200)
        .with_body(r#"{"message":"Group added to Team"}"#)
        .create();

    grafana_api_at(&server)
        .args(["team-group", "add", "1", "test"])
        .assert()
        .success()
        .stderr(contains("Added group \"test\" to team 1"));

    mock.assert();
}

#[test]
fn rm_encodes_group() {
    let mut server = Server::new();
    let mock = server
        .mock("DELETE", "/api/teams/1/groups/cn%3Deditors%2Cou%3Dgroups")
        .with_status(200)
        .with_body(r#"{"message":"Team Group removed"}"#)
        .create();

    grafana_api_at(&server)
        .args(["team-group", "rm", "1", "cn=editors,ou=groups"])
        .assert()
        .success();

    mock.assert();
}
