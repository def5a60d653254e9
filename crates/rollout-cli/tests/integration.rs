use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn rollout(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("rollout").unwrap();
    cmd.current_dir(dir.path())
        .env("ROLLOUT_ROOT", dir.path())
        .env_remove("ROLLOUT_KUBECTL");
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// A stand-in cluster CLI that records its argument vector and exits with a
/// fixed code.
#[cfg(unix)]
fn fake_kubectl(dir: &TempDir, exit_code: i32) -> (std::path::PathBuf, std::path::PathBuf) {
    use std::os::unix::fs::PermissionsExt;
    let args_out = dir.path().join("kubectl-args.txt");
    let script = dir.path().join("fake-kubectl");
    std::fs::write(
        &script,
        format!("#!/bin/sh\necho \"$@\" >> {}\nexit {exit_code}\n", args_out.display()),
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    (script, args_out)
}

const TEMPLATE: &str = "\
apiVersion: apps/v1
kind: Deployment
metadata:
  name: %{name}
  namespace: web
spec:
  replicas: %{replicas}
";

// ---------------------------------------------------------------------------
// rollout resolve
// ---------------------------------------------------------------------------

#[test]
fn resolve_writes_manifest_and_sidecar() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.yaml", TEMPLATE);

    rollout(&dir)
        .args([
            "resolve",
            "--template",
            "app.yaml",
            "--set",
            "name=frontend",
            "--set",
            "replicas=3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("app.resolved.yaml"));

    let resolved = std::fs::read_to_string(dir.path().join("app.resolved.yaml")).unwrap();
    assert!(resolved.contains("name: frontend"));
    assert!(resolved.contains("replicas: 3"));
    assert!(!resolved.contains("%{"));

    let sidecar = dir.path().join("app.resolved.yaml.substitutions.json");
    let audit: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(sidecar).unwrap()).unwrap();
    assert_eq!(audit["substitutions"]["name"], "frontend");
}

#[test]
fn resolve_missing_substitution_fails_without_output() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.yaml", TEMPLATE);

    rollout(&dir)
        .args(["resolve", "--template", "app.yaml", "--set", "name=frontend"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unresolved placeholder"))
        .stderr(predicate::str::contains("replicas"));

    assert!(!dir.path().join("app.resolved.yaml").exists());
    assert!(!dir
        .path()
        .join("app.resolved.yaml.substitutions.json")
        .exists());
}

#[test]
fn resolve_injects_image_specs() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.yaml", "image: %{images}\n");
    write(&dir, "blobs/config.json", "{}");
    write(&dir, "blobs/app.digest", "sha256:abc123");
    write(
        &dir,
        "images.yaml",
        "app:latest:\n  digests: [blobs/app.digest]\n  config: blobs/config.json\n",
    );

    rollout(&dir)
        .args([
            "resolve",
            "--template",
            "app.yaml",
            "--images",
            "images.yaml",
        ])
        .assert()
        .success();

    let resolved = std::fs::read_to_string(dir.path().join("app.resolved.yaml")).unwrap();
    assert!(resolved.contains("--image_spec=name=app:latest;digest=sha256:abc123"));
}

#[test]
fn resolve_applies_stamp_values() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.yaml", "owner: %{owner}\n");
    write(&dir, "status.txt", "BUILD_USER erin\n");

    rollout(&dir)
        .args([
            "resolve",
            "--template",
            "app.yaml",
            "--set",
            "owner=deployed-by-{BUILD_USER}",
            "--stamp-file",
            "status.txt",
        ])
        .assert()
        .success();

    let resolved = std::fs::read_to_string(dir.path().join("app.resolved.yaml")).unwrap();
    assert_eq!(resolved, "owner: deployed-by-erin\n");
}

#[test]
fn resolve_undefined_stamp_key_fails() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.yaml", "owner: %{owner}\n");

    rollout(&dir)
        .args([
            "resolve",
            "--template",
            "app.yaml",
            "--set",
            "owner={NOT_A_KEY}",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("undefined stamp key"));
}

// ---------------------------------------------------------------------------
// Cluster operations
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn apply_invokes_cluster_cli_with_structured_args() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.yaml", TEMPLATE);
    let (kubectl, args_out) = fake_kubectl(&dir, 0);

    rollout(&dir)
        .env("ROLLOUT_KUBECTL", &kubectl)
        .args([
            "apply",
            "--template",
            "app.yaml",
            "--set",
            "name=frontend",
            "--set",
            "replicas=1",
            "--namespace",
            "staging",
            "--context",
            "minikube",
        ])
        .assert()
        .success();

    let argv = std::fs::read_to_string(args_out).unwrap();
    assert!(argv.starts_with("apply -f "));
    assert!(argv.contains(".rollout/app.resolved.yaml"));
    assert!(argv.contains("--context=minikube"));
    assert!(argv.contains("--namespace=staging"));
}

#[cfg(unix)]
#[test]
fn apply_twice_produces_identical_resolved_manifest() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.yaml", TEMPLATE);
    let (kubectl, _) = fake_kubectl(&dir, 0);

    let run = |dir: &TempDir| {
        rollout(dir)
            .env("ROLLOUT_KUBECTL", &kubectl)
            .args([
                "apply",
                "--template",
                "app.yaml",
                "--set",
                "name=frontend",
                "--set",
                "replicas=2",
            ])
            .assert()
            .success();
        std::fs::read_to_string(dir.path().join(".rollout/app.resolved.yaml")).unwrap()
    };

    let first = run(&dir);
    let second = run(&dir);
    assert_eq!(first, second);
}

#[cfg(unix)]
#[test]
fn delete_consumes_reversed_manifest_and_forwards_exit_code() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.yaml", TEMPLATE);
    let (kubectl, args_out) = fake_kubectl(&dir, 5);

    rollout(&dir)
        .env("ROLLOUT_KUBECTL", &kubectl)
        .args([
            "delete",
            "--template",
            "app.yaml",
            "--set",
            "name=frontend",
            "--set",
            "replicas=1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exit code 5"));

    let argv = std::fs::read_to_string(args_out).unwrap();
    assert!(argv.contains(".rollout/app.reversed.yaml"));

    let reversed =
        std::fs::read_to_string(dir.path().join(".rollout/app.reversed.yaml")).unwrap();
    assert!(reversed.contains("name: frontend"));
    assert!(!reversed.contains("replicas"));
}

#[cfg(unix)]
#[test]
fn create_with_failing_cli_surfaces_code_verbatim() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.yaml", TEMPLATE);
    let (kubectl, _) = fake_kubectl(&dir, 1);

    rollout(&dir)
        .env("ROLLOUT_KUBECTL", &kubectl)
        .args([
            "create",
            "--template",
            "app.yaml",
            "--set",
            "name=frontend",
            "--set",
            "replicas=1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'create' failed with exit code 1"));
}

#[test]
fn operation_without_tool_fails_fast() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.yaml", TEMPLATE);

    rollout(&dir)
        .env("PATH", "")
        .args([
            "apply",
            "--template",
            "app.yaml",
            "--set",
            "name=frontend",
            "--set",
            "replicas=1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no cluster CLI configured"));
}

#[test]
fn resolution_failure_never_reaches_the_cluster() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.yaml", TEMPLATE);

    // Missing 'replicas' substitution: the failure must come from resolution,
    // not from tool lookup, even though no tool exists either.
    rollout(&dir)
        .env("PATH", "")
        .args(["apply", "--template", "app.yaml", "--set", "name=frontend"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unresolved placeholder"));
}

#[cfg(unix)]
#[test]
fn describe_uses_kind_and_literal_name() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "app.yaml",
        "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: frontend\n",
    );
    let (kubectl, args_out) = fake_kubectl(&dir, 0);

    rollout(&dir)
        .env("ROLLOUT_KUBECTL", &kubectl)
        .args([
            "describe",
            "--template",
            "app.yaml",
            "--kind",
            "deployment",
            "--namespace",
            "web",
        ])
        .assert()
        .success();

    let argv = std::fs::read_to_string(args_out).unwrap();
    assert!(argv.starts_with("describe deployment frontend"));
    assert!(argv.contains("--namespace=web"));
}

#[cfg(unix)]
#[test]
fn describe_templated_name_falls_back_to_kind() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.yaml", TEMPLATE);
    let (kubectl, args_out) = fake_kubectl(&dir, 0);

    rollout(&dir)
        .env("ROLLOUT_KUBECTL", &kubectl)
        .args(["describe", "--template", "app.yaml", "--kind", "deployment"])
        .assert()
        .success();

    let argv = std::fs::read_to_string(args_out).unwrap();
    assert!(argv.starts_with("describe deployment"));
    assert!(!argv.contains("frontend"));
}

// ---------------------------------------------------------------------------
// rollout config
// ---------------------------------------------------------------------------

#[test]
fn config_check_with_defaults_succeeds() {
    let dir = TempDir::new().unwrap();
    rollout(&dir)
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config"));
}

#[test]
fn config_check_reports_bad_kubectl_path() {
    let dir = TempDir::new().unwrap();
    write(&dir, "rollout.yaml", "version: 1\nkubectl: /no/such/kubectl\n");

    rollout(&dir)
        .args(["config", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn config_show_prints_defaults() {
    let dir = TempDir::new().unwrap();
    rollout(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("version: 1"));
}

#[test]
fn resolve_requires_no_cluster_cli() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.yaml", "name: %{name}\n");

    rollout(&dir)
        .env("PATH", "")
        .args(["resolve", "--template", "app.yaml", "--set", "name=x"])
        .assert()
        .success();
}

#[cfg(unix)]
#[test]
fn cli_namespace_overrides_config_namespace() {
    let dir = TempDir::new().unwrap();
    write(&dir, "app.yaml", "name: %{name}\n");
    write(
        &dir,
        "rollout.yaml",
        "version: 1\ntarget:\n  namespace: from-config\n",
    );
    let (kubectl, args_out) = fake_kubectl(&dir, 0);

    rollout(&dir)
        .env("ROLLOUT_KUBECTL", &kubectl)
        .args([
            "apply",
            "--template",
            "app.yaml",
            "--set",
            "name=x",
            "--namespace",
            "from-flag",
        ])
        .assert()
        .success();

    let argv = std::fs::read_to_string(args_out).unwrap();
    assert!(argv.contains("--namespace=from-flag"));
    assert!(!argv.contains("from-config"));
}
