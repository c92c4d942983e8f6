//! CLI integration tests
//!
//! Tests the command-line interface end-to-end.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

const PASSWORD: &str = "test password";

/// Get path to the sealfile binary
fn sealfile_bin() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // Remove test binary name
    path.pop(); // Remove deps/
    path.push("sealfile");
    path
}

/// Run sealfile with password from stdin
fn run_sealfile_with_passphrase(args: &[&str], passphrase: &str) -> std::io::Result<Output> {
    let mut child = Command::new(sealfile_bin())
        .arg("--passphrase-stdin")
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        // Ignore BrokenPipe errors - the command may exit before reading stdin
        // if it encounters an error (e.g., file not found)
        let _ = stdin.write_all(passphrase.as_bytes());
    }

    child.wait_with_output()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn assert_success(result: &Output, what: &str) {
    assert!(
        result.status.success(),
        "{} failed: {}",
        what,
        String::from_utf8_lossy(&result.stderr)
    );
}

/// Get path to testdata directory
fn testdata_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("testdata");
    path.push(filename);
    path
}

/// Decrypt a known envelope.
#[test]
fn test_decrypt_known_envelope() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("hello-decrypted.txt");

    let result = run_sealfile_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&testdata_path("hello.txt.enc")),
            "-o",
            path_str(&output),
        ],
        "correct-horse-battery",
    )
    .unwrap();
    assert_success(&result, "decrypt");

    let decrypted = fs::read_to_string(&output).unwrap();
    let expected = fs::read_to_string(testdata_path("hello.txt")).unwrap();
    assert_eq!(decrypted, expected);
}

#[test]
fn test_encrypt_decrypt_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext_path = testdata_path("hello.txt");
    let encrypted_path = temp_dir.path().join("hello-encrypted.txt.enc");
    let decrypted_path = temp_dir.path().join("hello-decrypted.txt");

    let result = run_sealfile_with_passphrase(
        &[
            "encrypt",
            "-i",
            path_str(&plaintext_path),
            "-o",
            path_str(&encrypted_path),
        ],
        PASSWORD,
    )
    .unwrap();
    assert_success(&result, "encrypt");

    let result = run_sealfile_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&encrypted_path),
            "-o",
            path_str(&decrypted_path),
        ],
        PASSWORD,
    )
    .unwrap();
    assert_success(&result, "decrypt");

    let original = fs::read_to_string(&plaintext_path).unwrap();
    let decrypted = fs::read_to_string(&decrypted_path).unwrap();
    assert_eq!(original, decrypted);
}

#[test]
fn test_default_output_paths() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("notes.txt");
    let encrypted = temp_dir.path().join("notes.txt.enc");
    fs::write(&plaintext, "some notes").unwrap();

    let result =
        run_sealfile_with_passphrase(&["encrypt", "-i", path_str(&plaintext)], PASSWORD).unwrap();
    assert_success(&result, "encrypt");
    assert!(encrypted.exists());

    fs::remove_file(&plaintext).unwrap();

    let result =
        run_sealfile_with_passphrase(&["decrypt", "-i", path_str(&encrypted)], PASSWORD).unwrap();
    assert_success(&result, "decrypt");
    assert_eq!(fs::read_to_string(&plaintext).unwrap(), "some notes");
}

#[test]
fn test_password_with_trailing_newline_from_stdin() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("plain.txt");
    let encrypted = temp_dir.path().join("plain.txt.enc");
    let decrypted = temp_dir.path().join("decrypted.txt");
    fs::write(&plaintext, "content").unwrap();

    let result = run_sealfile_with_passphrase(
        &["encrypt", "-i", path_str(&plaintext)],
        "test password\n",
    )
    .unwrap();
    assert_success(&result, "encrypt");

    let result = run_sealfile_with_passphrase(
        &["decrypt", "-i", path_str(&encrypted), "-o", path_str(&decrypted)],
        PASSWORD,
    )
    .unwrap();
    assert_success(&result, "decrypt");
}

#[test]
fn test_weak_password_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("plain.txt");
    let encrypted = temp_dir.path().join("plain.txt.enc");
    fs::write(&plaintext, "hello").unwrap();

    let result =
        run_sealfile_with_passphrase(&["encrypt", "-i", path_str(&plaintext)], "abc").unwrap();

    assert!(!result.status.success());
    assert!(!encrypted.exists());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("at least 8 characters"),
        "Expected weak password message, got: {}",
        stderr
    );
}

#[test]
fn test_decrypt_wrong_password_fails() {
    let temp_dir = TempDir::new().unwrap();
    let decrypted = temp_dir.path().join("decrypted.txt");

    let result = run_sealfile_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&testdata_path("hello.txt.enc")),
            "-o",
            path_str(&decrypted),
        ],
        "wrong-password",
    )
    .unwrap();

    assert!(!result.status.success());
    assert!(!decrypted.exists());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert_eq!(
        stderr.trim_end(),
        "Error: failed to decrypt: wrong password or corrupted data"
    );
}

#[test]
fn test_update_operation() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext1 = temp_dir.path().join("plaintext1.txt");
    let plaintext2 = temp_dir.path().join("plaintext2.txt");
    let encrypted = temp_dir.path().join("encrypted.txt.enc");
    let decrypted = temp_dir.path().join("decrypted.txt");

    fs::write(&plaintext1, "Original content").unwrap();

    let result = run_sealfile_with_passphrase(
        &[
            "encrypt",
            "-i",
            path_str(&plaintext1),
            "-o",
            path_str(&encrypted),
        ],
        PASSWORD,
    )
    .unwrap();
    assert_success(&result, "encrypt");

    fs::write(&plaintext2, "Updated content").unwrap();

    let result = run_sealfile_with_passphrase(
        &[
            "update",
            "-i",
            path_str(&plaintext2),
            "-o",
            path_str(&encrypted),
        ],
        PASSWORD,
    )
    .unwrap();
    assert_success(&result, "update");

    let result = run_sealfile_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&encrypted),
            "-o",
            path_str(&decrypted),
        ],
        PASSWORD,
    )
    .unwrap();
    assert_success(&result, "decrypt");

    let decrypted_content = fs::read_to_string(&decrypted).unwrap();
    assert_eq!(decrypted_content, "Updated content");
}

#[test]
fn test_update_with_wrong_passphrase_fails() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext1 = temp_dir.path().join("plaintext1.txt");
    let plaintext2 = temp_dir.path().join("plaintext2.txt");
    let encrypted = temp_dir.path().join("encrypted.txt.enc");

    fs::write(&plaintext1, "Original").unwrap();
    let result = run_sealfile_with_passphrase(
        &[
            "encrypt",
            "-i",
            path_str(&plaintext1),
            "-o",
            path_str(&encrypted),
        ],
        "correct_password",
    )
    .unwrap();
    assert_success(&result, "encrypt");

    fs::write(&plaintext2, "Updated").unwrap();
    let result = run_sealfile_with_passphrase(
        &[
            "update",
            "-i",
            path_str(&plaintext2),
            "-o",
            path_str(&encrypted),
        ],
        "wrong_password",
    )
    .unwrap();

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("decrypt") || stderr.contains("password"),
        "Expected error message about decryption/password, got: {}",
        stderr
    );
}

#[test]
fn test_decrypt_nonexistent_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let nonexistent = temp_dir.path().join("nonexistent.enc");
    let output = temp_dir.path().join("output.txt");

    let result = run_sealfile_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&nonexistent),
            "-o",
            path_str(&output),
        ],
        PASSWORD,
    )
    .unwrap();

    assert!(!result.status.success());
    assert!(!output.exists());
}

#[test]
fn test_decrypt_legacy_version_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("output.txt");

    let result = run_sealfile_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&testdata_path("legacy-v1.enc")),
            "-o",
            path_str(&output),
        ],
        "correct-horse-battery",
    )
    .unwrap();

    assert!(!result.status.success());
    assert!(!output.exists());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("unsupported envelope version \"1.0.0\""),
        "Expected unsupported version message, got: {}",
        stderr
    );
}

#[test]
fn test_inspect_prints_record() {
    let result = Command::new(sealfile_bin())
        .args(["inspect", "-i", path_str(&testdata_path("hello.txt.enc"))])
        .output()
        .unwrap();
    assert_success(&result, "inspect");

    let record: serde_json::Value = serde_json::from_slice(&result.stdout).unwrap();
    assert_eq!(record["version"], "2.0.0");
    assert_eq!(record["salt"], "42".repeat(16));
    assert_eq!(record["nonce"], "24".repeat(12));
    assert_eq!(record["authTag"].as_str().map(str::len), Some(32));
}

#[test]
fn test_empty_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("empty.txt");
    let encrypted = temp_dir.path().join("empty.txt.enc");
    let decrypted = temp_dir.path().join("empty-decrypted.txt");

    fs::write(&plaintext, b"").unwrap();

    let result = run_sealfile_with_passphrase(
        &[
            "encrypt",
            "-i",
            path_str(&plaintext),
            "-o",
            path_str(&encrypted),
        ],
        PASSWORD,
    )
    .unwrap();
    assert_success(&result, "encrypt");

    let result = run_sealfile_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&encrypted),
            "-o",
            path_str(&decrypted),
        ],
        PASSWORD,
    )
    .unwrap();
    assert_success(&result, "decrypt");

    let content = fs::read(&decrypted).unwrap();
    assert_eq!(content, b"");
}

#[test]
fn test_large_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("large.txt");
    let encrypted = temp_dir.path().join("large.txt.enc");
    let decrypted = temp_dir.path().join("large-decrypted.txt");

    let large_content = vec![0x42u8; 1024 * 1024];
    fs::write(&plaintext, &large_content).unwrap();

    let result = run_sealfile_with_passphrase(
        &[
            "encrypt",
            "-i",
            path_str(&plaintext),
            "-o",
            path_str(&encrypted),
        ],
        PASSWORD,
    )
    .unwrap();
    assert_success(&result, "encrypt");

    let result = run_sealfile_with_passphrase(
        &[
            "decrypt",
            "-i",
            path_str(&encrypted),
            "-o",
            path_str(&decrypted),
        ],
        PASSWORD,
    )
    .unwrap();
    assert_success(&result, "decrypt");

    let decrypted_content = fs::read(&decrypted).unwrap();
    assert_eq!(decrypted_content, large_content);
}

/// An encrypt whose output write fails partway must not leave a truncated
/// envelope behind.
#[test]
#[cfg(unix)]
fn test_encrypt_write_failure_leaves_no_output() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext = temp_dir.path().join("big.bin");
    let encrypted = temp_dir.path().join("big.bin.enc");
    fs::write(&plaintext, vec![0u8; 200 * 1024]).unwrap();

    // Cap the file size the child may write; with SIGXFSZ ignored the
    // write fails with EFBIG instead of killing the process.
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(r#"trap "" XFSZ; ulimit -f 8; exec "$0" --passphrase-stdin encrypt -i "$1""#)
        .arg(sealfile_bin())
        .arg(&plaintext)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    {
        let stdin = child.stdin.as_mut().unwrap();
        let _ = stdin.write_all(PASSWORD.as_bytes());
    }
    let result = child.wait_with_output().unwrap();

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.starts_with("Error: failed to write"), "stderr: {}", stderr);
    assert!(!encrypted.exists());

    let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1, "stray files left in {:?}", temp_dir.path());
}
