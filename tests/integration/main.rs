//! Integration tests for privrel

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tempfile::TempDir;

    const ENV_OVERRIDES: &[&str] = &[
        "PRIVREL_TOKEN_REFERENCE",
        "PRIVREL_CACHE_DAYS",
        "PRIVREL_FORCE_REFRESH",
        "PRIVREL_ACCOUNT",
    ];

    /// Command isolated from the host's config and overrides
    fn privrel(config: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("privrel");
        cmd.env("PRIVREL_CONFIG", config);
        for key in ENV_OVERRIDES {
            cmd.env_remove(key);
        }
        cmd
    }

    /// Config with a token reference, a temp cache dir and backends that do not exist
    fn write_config(temp: &TempDir) -> std::path::PathBuf {
        let path = temp.path().join("config.toml");
        let cache_dir = temp.path().join("versions");
        fs::write(
            &path,
            format!(
                r#"
[credentials]
token_reference = "op://Private/GitHub/token"
program = "privrel-test-no-such-op"

[cache]
dir = "{}"

[installer]
program = "privrel-test-no-such-ubi"
"#,
                cache_dir.display()
            ),
        )
        .unwrap();
        path
    }

    fn seed_cache(temp: &TempDir, versions: &[&str], age_secs: u64) {
        let dir = temp.path().join("versions");
        fs::create_dir_all(&dir).unwrap();
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        fs::write(
            dir.join("acme@tool.versions.json"),
            serde_json_array(versions),
        )
        .unwrap();
        fs::write(dir.join("acme@tool.timestamp"), (now - age_secs).to_string()).unwrap();
    }

    fn serde_json_array(items: &[&str]) -> String {
        let quoted: Vec<String> = items.iter().map(|v| format!("\"{}\"", v)).collect();
        format!("[{}]", quoted.join(","))
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        privrel(&temp.path().join("config.toml"))
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("list-versions"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        privrel(&temp.path().join("config.toml"))
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("privrel"));
    }

    #[test]
    fn exec_env_prints_path_extension() {
        let temp = TempDir::new().unwrap();
        privrel(&temp.path().join("config.toml"))
            .args(["exec-env", "/opt/tools/tool/1.2.0"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#"{"envVars":[{"key":"PATH","value":"/opt/tools/tool/1.2.0/bin"}]}"#,
            ));
    }

    #[test]
    fn config_path_honors_override() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("custom.toml");
        privrel(&config)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show_prints_defaults() {
        let temp = TempDir::new().unwrap();
        privrel(&temp.path().join("config.toml"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]").and(predicate::str::contains("days = 7")));
    }

    #[test]
    fn list_versions_requires_token_reference() {
        let temp = TempDir::new().unwrap();
        privrel(&temp.path().join("config.toml"))
            .args(["list-versions", "acme/tool"])
            .assert()
            .failure()
            .stderr(
                predicate::str::contains("token_reference")
                    .and(predicate::str::contains("Hint:")),
            );
    }

    #[test]
    fn invalid_env_override_is_rejected() {
        let temp = TempDir::new().unwrap();
        privrel(&temp.path().join("config.toml"))
            .env("PRIVREL_CACHE_DAYS", "a week")
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("PRIVREL_CACHE_DAYS"));
    }

    #[test]
    fn list_versions_served_from_fresh_cache() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp);
        seed_cache(&temp, &["1.0.0", "1.1.0"], 60);

        // The credential backend does not exist, so any refresh would fail
        privrel(&config)
            .args(["list-versions", "acme/tool", "--version", "v1.1.0"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#"{"versions":["1.0.0","1.1.0"]}"#));
    }

    #[test]
    fn list_versions_refreshes_for_missing_version() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp);
        seed_cache(&temp, &["1.0.0", "1.1.0"], 60);

        privrel(&config)
            .args(["list-versions", "acme/tool", "--version", "1.2.0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Credential backend unavailable"));
    }

    #[test]
    fn list_versions_refreshes_stale_cache() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp);
        seed_cache(&temp, &["1.0.0"], 8 * 24 * 60 * 60);

        privrel(&config)
            .args(["list-versions", "acme/tool"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Credential backend unavailable"));
    }

    #[test]
    fn install_reports_missing_installer() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp);
        let install_path = temp.path().join("tool");

        privrel(&config)
            .args(["install", "acme/tool", "1.2.0"])
            .arg(&install_path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Installer not found"));
    }

    #[test]
    fn cache_show_and_clear() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp);
        seed_cache(&temp, &["1.0.0", "1.1.0"], 60);

        privrel(&config)
            .args(["cache", "show", "acme/tool"])
            .assert()
            .success()
            .stdout(predicate::str::contains("fresh").and(predicate::str::contains("1.1.0")));

        privrel(&config)
            .args(["cache", "clear", "acme/tool"])
            .assert()
            .success();

        privrel(&config)
            .args(["cache", "show", "acme/tool"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached versions"));
    }

    #[test]
    fn cache_clear_all_on_empty_cache() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp);

        privrel(&config)
            .args(["cache", "clear", "--all"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 0 cache files"));
    }
}
