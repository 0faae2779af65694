//! Key files hold the 32-byte Ed25519 secret as a JSON byte array.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use cipherscreen_identity::Keypair;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// `CS_KEYPAIR`, or `~/.cipherscreen/id.json`
pub fn default_key_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CS_KEYPAIR") {
        return Ok(PathBuf::from(path));
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow!("Could not determine home directory"))?;
    Ok(Path::new(&home).join(".cipherscreen").join("id.json"))
}

pub fn write_new(path: &Path, key: &Keypair) -> Result<()> {
    if path.exists() {
        bail!(
            "File {} already exists. Remove it first or use a different filename.",
            path.display()
        );
    }
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let json = serde_json::to_string(&key.secret_bytes().to_vec())?;
    let mut f = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;

    #[cfg(unix)]
    {
        // chmod 600 (rw-------)
        let mut perms = f.metadata()?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }

    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load(path: &Path) -> Result<Keypair> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    let bytes: Vec<u8> = serde_json::from_str(&raw).context("key file is not a byte array")?;
    let seed: [u8; 32] = bytes
        .try_into()
        .map_err(|v: Vec<u8>| anyhow!("expected 32 secret bytes, found {}", v.len()))?;
    Ok(Keypair::from_secret_bytes(&seed))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn written_key_loads_back_and_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("bank.json");
        let key = Keypair::generate();

        write_new(&path, &key).unwrap();
        assert_eq!(load(&path).unwrap().identity(), key.identity());
        assert!(write_new(&path, &Keypair::generate()).is_err());
    }

    #[test]
    fn short_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[1,2,3]").unwrap();
        assert!(load(&path).is_err());
    }
}
