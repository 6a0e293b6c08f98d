//! Integration tests for depstash
//!
//! Every test points `--config` at a temp file with an empty probe list so
//! no Node toolchain is needed.

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct Workspace {
        temp: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            fs::write(
                temp.path().join("config.toml"),
                "[signature]\nbinaries = []\n",
            )
            .unwrap();
            Self { temp }
        }

        fn config(&self) -> PathBuf {
            self.temp.path().join("config.toml")
        }

        fn cache(&self) -> PathBuf {
            self.temp.path().join("cache")
        }

        fn build(&self, name: &str) -> PathBuf {
            let dir = self.temp.path().join(name);
            fs::create_dir_all(&dir).unwrap();
            dir
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("depstash");
            cmd.env_remove("DEPSTASH_BUILD_DIR")
                .env_remove("DEPSTASH_CACHE_DIR")
                .arg("--config")
                .arg(self.config());
            cmd
        }

        fn run(&self, command: &str, build: &Path) -> Command {
            let mut cmd = self.cmd();
            cmd.arg(command)
                .arg("--build-dir")
                .arg(build)
                .arg("--cache-dir")
                .arg(self.cache());
            cmd
        }
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn project(build: &Path) {
        write(
            &build.join("package.json"),
            r#"{"name": "app", "cacheDirectories": ["node_modules", ".npm"]}"#,
        );
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("depstash")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("dependency cache"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("depstash")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("depstash"));
    }

    #[test]
    fn config_path() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[signature]"))
            .stdout(predicate::str::contains("default_directories"));
    }

    #[test]
    fn config_init_does_not_overwrite() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));

        ws.cmd()
            .args(["config", "init", "--force"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));

        let written = fs::read_to_string(ws.config()).unwrap();
        assert!(written.contains("node_home_env"));
    }

    #[test]
    fn invalid_config_reports_hint() {
        let ws = Workspace::new();
        fs::write(ws.config(), "[signature\nbinaries = ").unwrap();

        ws.cmd()
            .args(["status", "--cache-dir"])
            .arg(ws.cache())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn restore_on_empty_cache_succeeds() {
        let ws = Workspace::new();
        let build = ws.build("build");

        ws.run("restore", &build)
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache to restore"));

        assert_eq!(fs::read_dir(&build).unwrap().count(), 0);
    }

    #[test]
    fn save_then_restore_roundtrip() {
        let ws = Workspace::new();

        let build1 = ws.build("build1");
        project(&build1);
        write(&build1.join("node_modules/express/index.js"), "module.exports = {};");
        write(&build1.join(".npm/_cacache/index-v5/00"), "cache entry");

        ws.run("save", &build1)
            .assert()
            .success()
            .stdout(predicate::str::contains("Saved 2 directories"));

        assert!(ws.cache().join("depstash.json").is_file());
        assert!(ws.cache().join("dirs/node_modules/express/index.js").is_file());

        let build2 = ws.build("build2");
        project(&build2);
        ws.run("restore", &build2)
            .assert()
            .success()
            .stdout(predicate::str::contains("Restored 2 of 2 directories"));

        assert_eq!(
            fs::read_to_string(build2.join("node_modules/express/index.js")).unwrap(),
            "module.exports = {};"
        );
        assert_eq!(
            fs::read_to_string(build2.join(".npm/_cacache/index-v5/00")).unwrap(),
            "cache entry"
        );
    }

    #[test]
    fn reconfigured_directories_are_pruned() {
        let ws = Workspace::new();

        let build1 = ws.build("build1");
        project(&build1);
        write(&build1.join("node_modules/a/index.js"), "a");
        write(&build1.join(".npm/entry"), "npm");
        ws.run("save", &build1).assert().success();

        let build2 = ws.build("build2");
        write(
            &build2.join("package.json"),
            r#"{"cacheDirectories": ["node_modules", "bower_components"]}"#,
        );
        ws.run("restore", &build2).assert().success();
        write(&build2.join("bower_components/jquery/jquery.js"), "$");
        ws.run("save", &build2).assert().success();

        assert!(!ws.cache().join("dirs/.npm").exists());
        assert!(ws.cache().join("dirs/bower_components/jquery/jquery.js").is_file());
    }

    #[test]
    fn malformed_descriptor_fails() {
        let ws = Workspace::new();
        let build = ws.build("build");
        write(&build.join("package.json"), r#"{"cacheDirectories": "node_modules"}"#);

        ws.run("save", &build)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed parsing"));

        assert!(!ws.cache().join("depstash.json").exists());
    }

    #[test]
    fn status_without_cache() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["status", "--cache-dir"])
            .arg(ws.cache())
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache saved yet"));
    }

    #[test]
    fn status_json_after_save() {
        let ws = Workspace::new();
        let build = ws.build("build");
        project(&build);
        write(&build.join("node_modules/a/index.js"), "a");
        ws.run("save", &build).assert().success();

        let output = ws
            .cmd()
            .args(["status", "--format", "json", "--cache-dir"])
            .arg(ws.cache())
            .output()
            .unwrap();
        assert!(output.status.success());

        let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(status["reusable"], true);
        assert_eq!(status["stored"][0]["path"], "node_modules");
        assert_eq!(status["stored"][0]["present"], true);
        assert_eq!(status["stored"][1]["present"], false);
    }

    #[test]
    fn clear_requires_confirmation() {
        let ws = Workspace::new();
        let build = ws.build("build");
        project(&build);
        write(&build.join("node_modules/a/index.js"), "a");
        ws.run("save", &build).assert().success();

        ws.cmd()
            .args(["clear", "--cache-dir"])
            .arg(ws.cache())
            .write_stdin("n\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("Aborted"));
        assert!(ws.cache().join("depstash.json").exists());

        ws.cmd()
            .args(["clear", "--yes", "--cache-dir"])
            .arg(ws.cache())
            .assert()
            .success()
            .stdout(predicate::str::contains("Cache cleared"));
        assert_eq!(fs::read_dir(ws.cache()).unwrap().count(), 0);
    }

    #[test]
    fn finalize_skip_install_restores_and_saves() {
        let ws = Workspace::new();

        let build1 = ws.build("build1");
        project(&build1);
        ws.run("finalize", &build1)
            .arg("--skip-install")
            .assert()
            .success()
            .stdout(predicate::str::contains("recommended to vendor"))
            .stdout(predicate::str::contains("Skipping install"));
        assert!(ws.cache().join("depstash.json").is_file());

        let build2 = ws.build("build2");
        project(&build2);
        write(&build2.join("node_modules/lodash/index.js"), "_");
        ws.run("finalize", &build2)
            .arg("--skip-install")
            .assert()
            .success()
            .stdout(predicate::str::contains("recommended to vendor").not());
        assert!(ws.cache().join("dirs/node_modules/lodash/index.js").is_file());
    }
}
