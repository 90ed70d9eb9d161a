//! Local credential files under `~/.lockbox` (or `$LOCKBOX_HOME`).
//!
//! - `key`: the user's base64 symmetric key, written by `lockbox init`
//! - `token`: the last session token, used when `--token` is not given
//!
//! Both files are created with mode `0600` on Unix.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use lockbox_core::UserKey;

const KEY_FILE: &str = "key";
const TOKEN_FILE: &str = "token";

/// Directory holding the local credential files.
#[derive(Debug, Clone)]
pub struct LocalDir {
    root: PathBuf,
}

impl LocalDir {
    /// `$LOCKBOX_HOME` if set, otherwise `~/.lockbox`.
    pub fn discover() -> Result<Self> {
        if let Some(home) = std::env::var_os("LOCKBOX_HOME").filter(|v| !v.is_empty()) {
            return Ok(Self::at(PathBuf::from(home)));
        }
        let home = dirs::home_dir().context("cannot determine home directory")?;
        Ok(Self::at(home.join(".lockbox")))
    }

    pub fn at(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn key_path(&self) -> PathBuf {
        self.root.join(KEY_FILE)
    }

    pub fn save_key(&self, key_b64: &str) -> Result<PathBuf> {
        // Refuse to write anything that would not load back.
        UserKey::from_base64(key_b64).context("server returned a malformed key")?;
        let path = self.key_path();
        self.write_private(&path, key_b64)?;
        Ok(path)
    }

    /// Load the stored key, if `lockbox init` has been run.
    pub fn load_key(&self) -> Result<Option<UserKey>> {
        let Some(text) = read_optional(&self.key_path())? else {
            return Ok(None);
        };
        let key = UserKey::from_base64(&text)
            .with_context(|| format!("corrupt key file {}", self.key_path().display()))?;
        Ok(Some(key))
    }

    /// Load the stored key or fail with a hint.
    pub fn require_key(&self) -> Result<UserKey> {
        match self.load_key()? {
            Some(key) => Ok(key),
            None => bail!(
                "no key at {}; run `lockbox init` first",
                self.key_path().display()
            ),
        }
    }

    pub fn save_token(&self, token: &str) -> Result<PathBuf> {
        let path = self.root.join(TOKEN_FILE);
        self.write_private(&path, token)?;
        Ok(path)
    }

    pub fn load_token(&self) -> Result<Option<String>> {
        Ok(read_optional(&self.root.join(TOKEN_FILE))?.filter(|t| !t.is_empty()))
    }

    pub fn has_token(&self) -> bool {
        self.root.join(TOKEN_FILE).exists()
    }

    fn write_private(&self, path: &Path, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt as _;
            options.mode(0o600);
        }
        let mut file = options
            .open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        writeln!(file, "{contents}").with_context(|| format!("failed to write {}", path.display()))
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text.trim().to_owned())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}
