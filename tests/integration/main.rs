//! Integration tests for codecache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct Workspace {
        _temp: TempDir,
        config: PathBuf,
        shared: PathBuf,
        local: PathBuf,
    }

    /// A read-only shared root, a writable local root and a config using both
    fn workspace(max_lock_wait_ms: u64) -> Workspace {
        let temp = TempDir::new().unwrap();
        let shared = temp.path().join("shared");
        let local = temp.path().join("local");
        fs::create_dir_all(&shared).unwrap();

        let config = temp.path().join("config.toml");
        fs::write(
            &config,
            format!(
                "[cache]\nmax_lock_wait_ms = {}\n\n\
                 [[cache.roots]]\npath = '{}'\n\n\
                 [[cache.roots]]\npath = '{}'\nwritable = true\n\n\
                 [fetch]\nrepository_url = 'http://127.0.0.1:9'\ntimeout_secs = 1\n",
                max_lock_wait_ms,
                shared.display(),
                local.display()
            ),
        )
        .unwrap();

        Workspace {
            _temp: temp,
            config,
            shared,
            local,
        }
    }

    fn codecache(config: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("codecache");
        cmd.env("CODECACHE_CONFIG", config).env("CI", "1");
        cmd
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("codecache")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("multi-root content cache"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("codecache")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("codecache"));
    }

    #[test]
    fn config_path_honors_env() {
        let ws = workspace(1000);
        codecache(&ws.config)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let ws = workspace(1000);
        codecache(&ws.config)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("max_lock_wait_ms = 1000"));
    }

    #[test]
    fn config_init_and_set() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("fresh").join("config.toml");

        codecache(&config)
            .args(["config", "init"])
            .assert()
            .success();
        assert!(config.exists());

        codecache(&config)
            .args(["config", "set", "cache.max_lock_wait_ms", "1234"])
            .assert()
            .success();
        let content = fs::read_to_string(&config).unwrap();
        assert!(content.contains("max_lock_wait_ms = 1234"));
    }

    #[test]
    fn roots_lists_search_order() {
        let ws = workspace(1000);
        codecache(&ws.config)
            .arg("roots")
            .assert()
            .success()
            .stdout(predicate::str::contains(ws.shared.display().to_string()))
            .stdout(predicate::str::contains("read-only"));
    }

    #[test]
    fn resolve_hit_prints_path() {
        let ws = workspace(1000);
        fs::write(ws.shared.join("file.txt"), "cached").unwrap();

        codecache(&ws.config)
            .args(["resolve", "local:file.txt", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                ws.shared.join("file.txt").display().to_string(),
            ));
    }

    #[test]
    fn resolve_local_miss_fails_with_hint() {
        let ws = workspace(1000);
        codecache(&ws.config)
            .args(["resolve", "local:missing.txt"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to resolve local:missing.txt"))
            .stderr(predicate::str::contains("Hint:"));

        assert!(!ws.local.join("missing.txt").exists());
        assert!(!ws.local.join(".locks").join("missing.txt.lock").exists());
    }

    #[test]
    fn resolve_times_out_on_foreign_lock() {
        let ws = workspace(100);
        let locks = ws.local.join(".locks");
        fs::create_dir_all(&locks).unwrap();
        fs::write(locks.join("file.txt.lock"), "").unwrap();

        codecache(&ws.config)
            .args(["resolve", "local:file.txt"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not acquired within"));

        assert!(locks.join("file.txt.lock").exists());
    }

    #[test]
    fn resolve_rejects_malformed_coordinates() {
        let ws = workspace(1000);
        codecache(&ws.config)
            .args(["resolve", "a:b"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid coordinates"));
    }

    #[test]
    fn lookup_reports_missing_without_fetching() {
        let ws = workspace(1000);
        codecache(&ws.config)
            .args(["lookup", "local:file.txt"])
            .assert()
            .success()
            .stdout(predicate::str::contains("not cached"));

        assert!(!ws.local.exists());
    }

    #[test]
    fn locks_lists_held_entries() {
        let ws = workspace(1000);
        let locks = ws.local.join(".locks");
        fs::create_dir_all(&locks).unwrap();
        fs::write(locks.join("file.txt.lock"), "").unwrap();

        codecache(&ws.config)
            .arg("locks")
            .assert()
            .success()
            .stdout(predicate::str::contains("file.txt"))
            .stdout(predicate::str::contains("holder unknown"));
    }

    #[test]
    fn locks_empty() {
        let ws = workspace(1000);
        codecache(&ws.config)
            .arg("locks")
            .assert()
            .success()
            .stdout(predicate::str::contains("No entry locks held"));
    }
}
