use std::fmt::Write as _;
use std::path::PathBuf;

fn main() {
    // Re-run if git HEAD changes (new commits, checkouts, etc.)
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");

    let hash = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_default();

    let on_tag = std::process::Command::new("git")
        .args(["describe", "--exact-match", "--tags", "HEAD"])
        .output()
        .ok()
        .is_some_and(|o| o.status.success());

    println!("cargo:rustc-env=GIT_HASH={hash}");
    println!("cargo:rustc-env=ON_RELEASE_TAG={on_tag}");

    embed_native_libraries();
}

/// Generate `$OUT_DIR/embedded_natives.rs`: one `(resource path, bytes)` entry
/// per file under `native/`, so prebuilt codec libraries travel inside the binary.
///
/// A missing `native/` directory yields an empty table; the loader then relies
/// on an on-disk resource directory.
fn embed_native_libraries() {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR"));
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR"));
    let native_dir = manifest_dir.join("native");
    println!("cargo:rerun-if-changed=native");

    let mut files: Vec<PathBuf> = std::fs::read_dir(&native_dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect()
        })
        .unwrap_or_default();
    files.sort();

    let mut table = String::from("static EMBEDDED: &[(&str, &[u8])] = &[\n");
    for path in &files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        println!("cargo:rerun-if-changed={}", path.display());
        writeln!(
            table,
            "    (\"native/{name}\", include_bytes!({:?})),",
            path.display().to_string()
        )
        .expect("write to String");
    }
    table.push_str("];\n");

    std::fs::write(out_dir.join("embedded_natives.rs"), table)
        .expect("failed to write embedded native table");
}
