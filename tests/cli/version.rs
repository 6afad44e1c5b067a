use crate::cli::grafana_api;
use predicates::prelude::*;

#[test]
fn version() {
    grafana_api()
        .args(["version"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(concat!(
            "grafana-api ",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn help_lists_commands() {
    grafana_api()
        .args(["--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("folder")
                .and(predicate::str::contains("datasource"))
                .and(predicate::str::contains("team-group"))
                .and(predicate::str::contains("query")),
        );
}

#[test]
fn missing_credential_fails() {
    grafana_api()
        .args(["folder", "ls"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key or basic auth"));
}

#[test]
fn invalid_timeout() {
    grafana_api()
        .env("GRAFANA_API_KEY", "k")
        .args(["--timeout", "0", "folder", "ls"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid timeout value: 0"));
}
