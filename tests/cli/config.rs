use std::fs;

use predicates::{prelude::*, str::contains};

use crate::cli::grafana_api;

fn home_with_config(contents: &str) -> tempfile::TempDir {
    let home = tempfile::tempdir().unwrap();
    fs::create_dir_all(home.path().join(".config")).unwrap();
    fs::write(home.path().join(".config/grafana-api.yaml"), contents).unwrap();
    home
}

const CONFIG: &str = "
profiles:
  default:
    url: https://grafana.example.com
    api_key: glsa_secret
  staging:
    url: http://staging:3000
    basic_auth: admin:hunter2
    org_id: 3
";

#[test]
fn get_default_profile() {
    let home = home_with_config(CONFIG);

    grafana_api()
        .env("HOME", home.path())
        .args(["config", "get"])
        .assert()
        .success()
        .stdout(
            contains("Profile \"default\"")
                .and(contains("https://grafana.example.com"))
                .and(contains("glsa_secret").not()),
        );
}

#[test]
fn env_overrides_file() {
    let home = home_with_config(CONFIG);

    grafana_api()
        .env("HOME", home.path())
        .env("GRAFANA_PROFILE", "staging")
        .env("GRAFANA_URL", "http://override:3000")
        .args(["-O", "json", "config", "get"])
        .assert()
        .success()
        .stdout(
            contains(r#""name":"staging""#)
                .and(contains("http://override:3000"))
                .and(contains(r#""org_id":3"#))
                .and(contains("hunter2").not()),
        );
}

#[test]
fn get_all_profiles() {
    let home = home_with_config(CONFIG);

    grafana_api()
        .env("HOME", home.path())
        .args(["config", "get", "--all"])
        .assert()
        .success()
        .stdout(
            contains("Profile \"default\"")
                .and(contains("Profile \"staging\""))
                .and(contains("Basic auth (admin)")),
        );
}

#[test]
fn unknown_profile() {
    let home = home_with_config(CONFIG);

    grafana_api()
        .env("HOME", home.path())
        .args(["--profile", "nope", "config", "get"])
        .assert()
        .failure()
        .stderr(contains("Profile 'nope' not found"));
}
