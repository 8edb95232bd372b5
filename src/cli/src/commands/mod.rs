//! Subcommands and the ACL loading they share.

pub mod check;
pub mod roles;
pub mod table;
pub mod validate;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use paricha_core::acl::{AccessChecker, AclDocument, PredicateRegistry};
use paricha_core::config::Settings;
use paricha_core::error::ParichaError;

/// Return the default ACL path (`~/.paricha/acl.toml`).
pub fn default_acl_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".paricha").join("acl.toml"))
}

/// Where the ACL lives and the settings applied to the checker built from it.
pub struct AclSource {
    path: PathBuf,
    settings: Settings,
}

impl AclSource {
    /// Resolve the document path: `--file`, then `checker.acl_file`, then the default.
    pub fn resolve(file: Option<PathBuf>, settings: Settings) -> Result<Self> {
        let path = match file.or_else(|| settings.checker.acl_file.as_ref().map(PathBuf::from)) {
            Some(path) => path,
            None => default_acl_path()?,
        };
        debug!(path = %path.display(), "Resolved ACL document");
        Ok(Self { path, settings })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_document(&self) -> Result<AclDocument> {
        AclDocument::load(&self.path).map_err(|e| anyhow::Error::new(ParichaError::from(e)))
    }

    /// Compile `document` with the configured defaults. No named predicates
    /// are registered from the command line.
    pub fn build_checker(&self, document: &AclDocument) -> Result<AccessChecker> {
        let checker = document
            .build_checker(&PredicateRegistry::new())
            .map_err(ParichaError::from)
            .with_context(|| format!("Invalid ACL document {}", self.path.display()))?;
        Ok(self.settings.apply(checker))
    }

    /// Load and compile in one step.
    pub fn load_checker(&self) -> Result<(AclDocument, AccessChecker)> {
        let document = self.load_document()?;
        let checker = self.build_checker(&document)?;
        Ok((document, checker))
    }
}
