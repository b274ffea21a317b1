//! Integration tests for cachepack

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn cachepack(config_dir: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("cachepack");
        cmd.env("CACHEPACK_CONFIG", config_dir.path().join("config.toml"));
        cmd
    }

    fn write_descriptor(root: &Path, hash: &str, backend: &str, arch: &str) {
        let dir = root.join(hash);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("add_kernel.json"),
            format!(
                r#"{{"hash":"{hash}","target":{{"backend":"{backend}","arch":{arch},"warp_size":32}},"name":"add_kernel","num_warps":4,"num_stages":3,"debug":false}}"#
            ),
        )
        .unwrap();
        fs::write(dir.join("add_kernel.cubin"), b"\x7fELF").unwrap();
    }

    fn fixture_cache() -> TempDir {
        let cache = TempDir::new().unwrap();
        write_descriptor(cache.path(), "aaa", "cuda", "80");
        write_descriptor(cache.path(), "bbb", "cuda", "80");
        write_descriptor(cache.path(), "ccc", "hip", "\"gfx90a\"");
        cache
    }

    #[test]
    fn help_displays() {
        let config = TempDir::new().unwrap();
        cachepack(&config)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Triton kernel cache images"));
    }

    #[test]
    fn version_displays() {
        let config = TempDir::new().unwrap();
        cachepack(&config)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cachepack"));
    }

    #[test]
    fn config_path_honors_env() {
        let config = TempDir::new().unwrap();
        cachepack(&config)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                config.path().join("config.toml").display().to_string(),
            ));
    }

    #[test]
    fn config_show_defaults() {
        let config = TempDir::new().unwrap();
        cachepack(&config)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[engine]"))
            .stdout(predicate::str::contains("kind = \"podman\""));
    }

    #[test]
    fn config_init_writes_file() {
        let config = TempDir::new().unwrap();
        cachepack(&config)
            .args(["config", "init"])
            .assert()
            .success();

        let written = fs::read_to_string(config.path().join("config.toml")).unwrap();
        assert!(written.contains("[staging]"));
    }

    #[test]
    fn invalid_config_reports_path() {
        let config = TempDir::new().unwrap();
        fs::write(config.path().join("config.toml"), "[engine]\nkind = \"lxc\"\n").unwrap();
        cachepack(&config)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("config.toml"));
    }

    #[test]
    fn inspect_table() {
        let config = TempDir::new().unwrap();
        let cache = fixture_cache();
        cachepack(&config)
            .args(["inspect", "--dir"])
            .arg(cache.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("3"))
            .stdout(predicate::str::contains("gfx90a"))
            .stdout(predicate::str::contains("cuda"));
    }

    #[test]
    fn inspect_json_lists_entries() {
        let config = TempDir::new().unwrap();
        let cache = fixture_cache();
        let output = cachepack(&config)
            .args(["inspect", "--format", "json", "--dir"])
            .arg(cache.path())
            .output()
            .unwrap();
        assert!(output.status.success());

        let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let entries = entries.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["hash"], "aaa");
        assert_eq!(entries[0]["arch"], "80");
        assert_eq!(entries[2]["arch"], "gfx90a");
        assert_eq!(entries[0]["dummy_key"], entries[1]["dummy_key"]);
    }

    #[test]
    fn inspect_does_not_modify_cache() {
        let config = TempDir::new().unwrap();
        let cache = fixture_cache();
        let group = cache.path().join("aaa").join("__grp__add_kernel.json");
        let original = r#"{"child_paths":{"add_kernel.json":"/home/me/.triton/cache/aaa/add_kernel.json"}}"#;
        fs::write(&group, original).unwrap();

        cachepack(&config)
            .args(["inspect", "--dir"])
            .arg(cache.path())
            .assert()
            .success();

        assert_eq!(fs::read_to_string(&group).unwrap(), original);
    }

    #[test]
    fn inspect_malformed_descriptor_fails() {
        let config = TempDir::new().unwrap();
        let cache = fixture_cache();
        fs::write(cache.path().join("aaa").join("broken.json"), "{not json").unwrap();

        cachepack(&config)
            .args(["inspect", "--dir"])
            .arg(cache.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("broken.json"));
    }

    #[test]
    fn build_missing_dir_fails() {
        let config = TempDir::new().unwrap();
        cachepack(&config)
            .args(["build", "--dir", "/nonexistent/triton/cache", "--image", "kernels"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cache directory not found"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn build_rejects_multiline_image_name() {
        let config = TempDir::new().unwrap();
        let cache = fixture_cache();
        cachepack(&config)
            .args(["build", "--image", "kernels\nCOPY / /etc", "--dir"])
            .arg(cache.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid image name"));
    }

    #[test]
    fn build_requires_image() {
        let config = TempDir::new().unwrap();
        cachepack(&config)
            .args(["build", "--dir", "/tmp"])
            .assert()
            .failure();
    }

    #[test]
    fn unknown_engine_rejected() {
        let config = TempDir::new().unwrap();
        cachepack(&config)
            .args(["labels", "--image", "kernels", "--engine", "lxc"])
            .assert()
            .failure();
    }
}
