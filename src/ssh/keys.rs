//! Host key management.

use std::path::Path;

use anyhow::{Context, Result};
use russh::keys::{decode_secret_key, encode_pkcs8_pem, Algorithm, PrivateKey};
use tracing::info;

/// Loads the Ed25519 host key from `path`, generating and persisting a new
/// one if the file does not exist. Rotating the host key makes previously
/// seen clients raise known-hosts warnings, so the key is kept stable.
pub fn load_or_generate_host_key(path: &Path) -> Result<PrivateKey> {
    if path.exists() {
        load_host_key(path)
    } else {
        let key = generate_host_key()?;
        save_host_key(&key, path)?;
        info!(path = %path.display(), "Generated new Ed25519 host key");
        Ok(key)
    }
}

fn load_host_key(path: &Path) -> Result<PrivateKey> {
    let pem = std::fs::read_to_string(path)
        .with_context(|| format!("reading host key {}", path.display()))?;
    decode_secret_key(&pem, None)
        .with_context(|| format!("decoding host key {}", path.display()))
}

fn generate_host_key() -> Result<PrivateKey> {
    PrivateKey::random(&mut rand::rngs::OsRng, Algorithm::Ed25519)
        .context("generating Ed25519 host key")
}

fn save_host_key(key: &PrivateKey, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating key directory {}", parent.display()))?;
        }
    }

    let mut pem = Vec::new();
    encode_pkcs8_pem(key, &mut pem).context("encoding host key as PKCS#8 PEM")?;

    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .with_context(|| format!("creating host key file {}", path.display()))?;
        file.write_all(&pem)
            .with_context(|| format!("writing host key {}", path.display()))?;
    }

    #[cfg(not(unix))]
    std::fs::write(path, &pem)
        .with_context(|| format!("writing host key {}", path.display()))?;

    Ok(())
}
