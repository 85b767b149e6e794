use rollout_core::ServicePackage;
use std::path::Path;
use tempfile::TempDir;

fn write_package(dir: &Path, manifest: &str, bins: &[&str]) {
    std::fs::create_dir_all(dir.join("src/bin")).unwrap();
    std::fs::write(dir.join("Cargo.toml"), manifest).unwrap();
    for bin in bins {
        std::fs::write(dir.join(format!("src/bin/{bin}.rs")), "fn main() {}\n").unwrap();
    }
}

#[test]
fn discover_single_package() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("src")).unwrap();
    std::fs::write(
        tmp.path().join("Cargo.toml"),
        r#"[package]
name = "lila-gif"
version = "1.2.3"
edition = "2021"
"#,
    )
    .unwrap();
    std::fs::write(tmp.path().join("src/main.rs"), "fn main() {}\n").unwrap();

    let package = ServicePackage::discover(tmp.path()).unwrap();

    assert_eq!(package.name, "lila-gif");
    assert_eq!(package.version, "1.2.3");
    assert_eq!(package.binary, "lila-gif");
    assert_eq!(package.binaries, vec!["lila-gif".to_owned()]);
}

#[test]
fn discover_respects_default_run() {
    let tmp = TempDir::new().unwrap();
    write_package(
        tmp.path(),
        r#"[package]
name = "multi"
version = "0.1.0"
edition = "2021"
default-run = "worker"
"#,
        &["server", "worker"],
    );

    let package = ServicePackage::discover(tmp.path()).unwrap();

    assert_eq!(package.binary, "worker");
    assert_eq!(package.binaries.len(), 2);
}

#[test]
fn discover_workspace_member_inherits_version() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("Cargo.toml"),
        r#"[workspace]
members = ["gif"]

[workspace.package]
version = "2.0.0"
edition = "2021"
"#,
    )
    .unwrap();

    let member = tmp.path().join("gif");
    std::fs::create_dir_all(member.join("src")).unwrap();
    std::fs::write(
        member.join("Cargo.toml"),
        r#"[package]
name = "gif"
version.workspace = true
edition.workspace = true
"#,
    )
    .unwrap();
    std::fs::write(member.join("src/main.rs"), "fn main() {}\n").unwrap();

    let package = ServicePackage::discover(&member).unwrap();

    assert_eq!(package.version, "2.0.0");
    assert_eq!(package.binary, "gif");
}

#[test]
fn discover_workspace_root_lists_members() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("Cargo.toml"),
        "[workspace]\nmembers = [\"gif\"]\n",
    )
    .unwrap();
    let member = tmp.path().join("gif");
    std::fs::create_dir_all(member.join("src")).unwrap();
    std::fs::write(
        member.join("Cargo.toml"),
        "[package]\nname = \"gif\"\nversion = \"0.1.0\"\nedition = \"2021\"\n",
    )
    .unwrap();
    std::fs::write(member.join("src/main.rs"), "fn main() {}\n").unwrap();

    let err = ServicePackage::discover(tmp.path())
        .unwrap_err()
        .to_string();

    assert!(err.contains("no package found"), "got: {err}");
    assert!(err.contains("gif"), "should list members, got: {err}");
}

#[test]
fn discover_without_manifest_errors() {
    let tmp = TempDir::new().unwrap();

    let err = ServicePackage::discover(tmp.path())
        .unwrap_err()
        .to_string();

    assert!(err.contains("cargo metadata"), "got: {err}");
}

#[test]
fn discover_ambiguous_binaries_suggests_service_name() {
    let tmp = TempDir::new().unwrap();
    write_package(
        tmp.path(),
        r#"[package]
name = "ambig"
version = "0.1.0"
edition = "2021"
"#,
        &["server", "worker"],
    );

    let err = ServicePackage::discover(tmp.path())
        .unwrap_err()
        .to_string();

    assert!(err.contains("multiple binary"), "got: {err}");
    assert!(err.contains("[service].name"), "got: {err}");
}
