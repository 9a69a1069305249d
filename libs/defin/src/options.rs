//! Reader configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Toggles consulted by the import builders.
///
/// Every field defaults to off. Options can be set through the
/// [`DefReader`](crate::DefReader) setters or loaded from TOML:
///
/// ```
/// # use defin::ReaderOptions;
/// let opts = ReaderOptions::from_toml("skip_wires = true\nblock_name = \"core\"").unwrap();
/// assert!(opts.skip_wires);
/// assert_eq!(opts.block_name.as_deref(), Some("core"));
/// ```
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Do not connect net terminals.
    pub skip_connections: bool,
    /// Do not read regular wiring.
    pub skip_wires: bool,
    /// Do not read special wiring.
    pub skip_special_wires: bool,
    /// Do not read shield wiring of special nets.
    pub skip_shields: bool,
    /// Do not read special wiring shaped `BLOCKWIRE`.
    pub skip_block_wires: bool,
    /// Do not read special wiring shaped `FILLWIRE` or `FILLWIREOPC`.
    pub skip_fill_wires: bool,
    /// Keep importing past unsupported features and finish with a block even
    /// if errors were logged.
    pub continue_on_errors: bool,
    /// The name of the created block, instead of the DEF design name.
    pub block_name: Option<String>,
    /// Component and net names of the form `I<oid>` and `N<oid>` name
    /// existing objects by id, as written by a previous export.
    pub names_are_db_ids: bool,
    /// Merge the file into an existing block of the same name. Components,
    /// pins and nets that already exist are updated instead of being
    /// reported as duplicates.
    pub assembly_mode: bool,
}

impl ReaderOptions {
    /// Parses options from a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}
