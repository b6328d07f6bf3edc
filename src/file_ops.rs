//! File-level operations behind the command line
//!
//! Every output is written atomically (tempfile + fsync + rename) with mode
//! 0o600 on Unix, so a failed run never leaves a partial file behind.

use crate::envelope;
use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};
use crate::file_envelope::{self, SealedFile};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::info;

/// Seal a UTF-8 text file
///
/// Reads the secret from `input_path`, seals it under `key_text`, and writes
/// the base-64 envelope to `output_path`.
pub fn encrypt_file(input_path: &Path, output_path: &Path, key_text: &str) -> Result<()> {
    let plaintext = read_utf8(input_path, "input file is not valid UTF-8")?;
    let envelope = envelope::seal_text(&plaintext, key_text)
        .map_err(|e| e.with_context("encryption failed"))?;
    write_atomic(output_path, envelope.as_bytes())?;
    info!(output = %output_path.display(), "wrote envelope");
    Ok(())
}

/// Open a text envelope file
///
/// Reads the base-64 envelope from `input_path`, opens it with `key_text`,
/// and writes the secret to `output_path`.
pub fn decrypt_file(input_path: &Path, output_path: &Path, key_text: &str) -> Result<()> {
    let armored = read_utf8(input_path, "envelope file is not valid UTF-8")?;
    let plaintext = envelope::open_text(&armored, key_text)
        .map_err(|e| e.with_context("failed to decrypt"))?;
    write_atomic(output_path, plaintext.as_bytes())?;
    info!(output = %output_path.display(), "wrote decrypted secret");
    Ok(())
}

/// Seal an arbitrary file into a JSON record
///
/// The record holds the file metadata (original name, content type, base-64
/// nonce) and the base-64 ciphertext.
pub fn seal_file_record(
    input_path: &Path,
    output_path: &Path,
    key_text: &str,
    content_type: &str,
) -> Result<()> {
    let contents = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let filename = input_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let sealed = file_envelope::seal_file(&contents, &filename, content_type, key_text)
        .map_err(|e| e.with_context("encryption failed"))?;
    let json = serde_json::to_vec_pretty(&sealed).map_err(|e| {
        SealnoteError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "failed to serialize sealed file",
            e,
        )
    })?;
    write_atomic(output_path, &json)?;
    info!(output = %output_path.display(), filename = %filename, "wrote sealed file record");
    Ok(())
}

/// Open a JSON record written by [`seal_file_record`]
///
/// Returns the original filename recorded in the metadata.
pub fn open_file_record(input_path: &Path, output_path: &Path, key_text: &str) -> Result<String> {
    let json = fs::read(input_path).map_err(|e| read_error(input_path, e))?;
    let sealed: SealedFile = serde_json::from_slice(&json).map_err(|e| {
        SealnoteError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::MalformedEnvelope,
            format!("{} is not a sealed file record", input_path.display()),
            e,
        )
    })?;
    let contents = file_envelope::open_file(&sealed.metadata, &sealed.ciphertext, key_text)
        .map_err(|e| e.with_context("failed to decrypt"))?;
    write_atomic(output_path, &contents)?;
    info!(
        output = %output_path.display(),
        content_type = %sealed.metadata.content_type,
        "wrote decrypted file"
    );
    Ok(sealed.metadata.original_filename)
}

/// Atomically write `contents` to `path`
///
/// Either the old file (if any) or the complete new file exists afterwards,
/// never a partial one.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        SealnoteError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("failed to create tempfile in {}", dir.display()),
            e,
        )
    })?;

    temp_file.write_all(contents).map_err(|e| {
        SealnoteError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to write to tempfile",
            e,
        )
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| {
        SealnoteError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to flush tempfile",
            e,
        )
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        SealnoteError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| {
                SealnoteError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    "failed to set tempfile permissions",
                    e,
                )
            })?;
    }
    temp_file.persist(path).map_err(|e| {
        SealnoteError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

fn read_utf8(path: &Path, not_utf8: &str) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    String::from_utf8(bytes).map_err(|e| {
        SealnoteError::with_kind_and_source(ErrorCategory::User, ErrorKind::Io, not_utf8, e)
    })
}

fn read_error(path: &Path, err: io::Error) -> SealnoteError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    SealnoteError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key;
    use std::fs;
    use tempfile::TempDir;

    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.txt");
        let crypt_path = temp_dir.path().join("plain.txt.sealed");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        fs::write(&plain_path, "Hello, sealnote!").unwrap();
        let key_text = key::generate().unwrap();

        encrypt_file(&plain_path, &crypt_path, &key_text).unwrap();
        let armored = fs::read_to_string(&crypt_path).unwrap();
        assert!(!armored.contains("Hello"));

        decrypt_file(&crypt_path, &decrypted_path, &key_text).unwrap();
        assert_eq!(fs::read_to_string(&decrypted_path).unwrap(), "Hello, sealnote!");
    }

    #[test]
    fn test_file_record_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("photo.jpg");
        let record_path = temp_dir.path().join("photo.json");
        let out_path = temp_dir.path().join("restored.jpg");

        let contents: Vec<u8> = (0..=255).cycle().take(4096).collect();
        fs::write(&plain_path, &contents).unwrap();
        let key_text = key::generate().unwrap();

        seal_file_record(&plain_path, &record_path, &key_text, "image/jpeg").unwrap();
        let record: serde_json::Value =
            serde_json::from_slice(&fs::read(&record_path).unwrap()).unwrap();
        assert_eq!(record["metadata"]["originalFilename"], "photo.jpg");
        assert_eq!(record["metadata"]["contentType"], "image/jpeg");

        let name = open_file_record(&record_path, &out_path, &key_text).unwrap();
        assert_eq!(name, "photo.jpg");
        assert_eq!(fs::read(&out_path).unwrap(), contents);
    }

    #[test]
    fn test_wrong_key_leaves_no_output() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.txt");
        let crypt_path = temp_dir.path().join("crypt.sealed");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        fs::write(&plain_path, "secret").unwrap();
        encrypt_file(&plain_path, &crypt_path, &key::generate().unwrap()).unwrap();

        let err = decrypt_file(&crypt_path, &decrypted_path, &key::generate().unwrap())
            .expect_err("expected authentication failure");
        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
        assert!(!decrypted_path.exists());
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_non_utf8_text_input_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("binary.bin");
        let crypt_path = temp_dir.path().join("binary.sealed");
        fs::write(&plain_path, b"\xff\xfe\x00").unwrap();

        let err = encrypt_file(&plain_path, &crypt_path, &key::generate().unwrap()).unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::Io));
        assert!(!crypt_path.exists());
    }

    #[test]
    fn test_missing_input_is_user_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = encrypt_file(
            &temp_dir.path().join("missing.txt"),
            &temp_dir.path().join("out"),
            &key::generate().unwrap(),
        )
        .unwrap_err();
        assert_eq!(err.category, ErrorCategory::User);
        assert_eq!(err.kind, Some(ErrorKind::Io));
    }

    #[test]
    fn test_not_a_record() {
        let temp_dir = TempDir::new().unwrap();
        let record_path = temp_dir.path().join("bogus.json");
        fs::write(&record_path, "{\"hello\": 1}").unwrap();
        let err = open_file_record(
            &record_path,
            &temp_dir.path().join("out"),
            &key::generate().unwrap(),
        )
        .unwrap_err();
        assert_eq!(err.kind, Some(ErrorKind::MalformedEnvelope));
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("target");
        fs::write(&path, "old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    #[cfg(unix)]
    fn test_file_permissions() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("plain.txt");
        let crypt_path = temp_dir.path().join("crypt.sealed");

        fs::write(&plain_path, "test").unwrap();
        encrypt_file(&plain_path, &crypt_path, &key::generate().unwrap()).unwrap();

        let permissions = fs::metadata(&crypt_path).unwrap().permissions();
        assert_eq!(permissions.mode() & 0o777, 0o600);
    }
}
