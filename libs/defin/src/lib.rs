//! DEF import into an [`odb`] database.
//!
//! A [`DefReader`] reads DEF files into blocks of one database. Each call
//! checks out the DEF parser, feeds every construct through a builder and
//! then decides, from the issues logged along the way, whether the result is
//! kept.
//!
//! Problems are sorted into kinds (see [`IssueKind`]): a construct that
//! appears before DESIGN always stops the import, unsupported features stop
//! it unless errors are tolerated, and unresolved names skip the offending
//! construct. An import that logged errors fails with [`DefError::Failed`]
//! unless [`DefReader::continue_on_errors`] was set; a failed import in
//! [`Mode::Default`] leaves no trace in the database.
//!
//! # Examples
//!
//! ```no_run
//! # use defin::{DefReader, Mode};
//! # use odb::Database;
//! let mut db = Database::new();
//! let tech = db.create_tech("tech", 1000).unwrap();
//! let mut reader = DefReader::new(&mut db, Mode::Default);
//! reader.skip_wires();
//! let block = reader.create_chip(&[], "top.def.gz", tech)?;
//! # Ok::<(), defin::DefError>(())
//! ```

use std::path::Path;

use lefdef::def::{Callbacks, DefParser};
use odb::block::Block;
use odb::tech::Tech;
use odb::{Database, Id, Lib};
use serde::{Deserialize, Serialize};

mod base;
mod builder;
pub mod error;
pub mod issue;
pub mod options;

#[cfg(test)]
mod tests;

use crate::builder::{DefBuilder, Outcome, Target};

pub use crate::base::Units;
pub use crate::error::{DefError, Result};
pub use crate::issue::{Issue, IssueKind, IssueLog, Severity};
pub use crate::options::ReaderOptions;

/// What an import does with the target block.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Build a new block from scratch.
    #[default]
    Default,
    /// Update the floorplan of an existing block: die area, rows, tracks,
    /// the gcell grid, placement of existing components and pins, and
    /// connections of existing nets. Wiring is not read.
    Floorplan,
    /// Like [`Mode::Floorplan`], and also replace the wiring of existing nets.
    Incremental,
}

/// Reads DEF files into a database.
pub struct DefReader<'a> {
    db: &'a mut Database,
    mode: Mode,
    options: ReaderOptions,
    issues: IssueLog,
}

impl<'a> DefReader<'a> {
    pub fn new(db: &'a mut Database, mode: Mode) -> Self {
        Self::with_options(db, mode, ReaderOptions::default())
    }

    pub fn with_options(db: &'a mut Database, mode: Mode, options: ReaderOptions) -> Self {
        Self {
            db,
            mode,
            options,
            issues: IssueLog::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ReaderOptions {
        &mut self.options
    }

    pub fn skip_connections(&mut self) -> &mut Self {
        self.options.skip_connections = true;
        self
    }

    pub fn skip_wires(&mut self) -> &mut Self {
        self.options.skip_wires = true;
        self
    }

    pub fn skip_special_wires(&mut self) -> &mut Self {
        self.options.skip_special_wires = true;
        self
    }

    pub fn skip_shields(&mut self) -> &mut Self {
        self.options.skip_shields = true;
        self
    }

    pub fn skip_block_wires(&mut self) -> &mut Self {
        self.options.skip_block_wires = true;
        self
    }

    pub fn skip_fill_wires(&mut self) -> &mut Self {
        self.options.skip_fill_wires = true;
        self
    }

    pub fn continue_on_errors(&mut self) -> &mut Self {
        self.options.continue_on_errors = true;
        self
    }

    /// Names the created block `name` instead of the DEF design name.
    pub fn use_block_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.options.block_name = Some(name.into());
        self
    }

    pub fn names_are_db_ids(&mut self) -> &mut Self {
        self.options.names_are_db_ids = true;
        self
    }

    pub fn set_assembly_mode(&mut self) -> &mut Self {
        self.options.assembly_mode = true;
        self
    }

    /// The number of errors logged by every import of this reader.
    pub fn errors(&self) -> usize {
        self.issues.num_errors()
    }

    pub fn warnings(&self) -> usize {
        self.issues.num_warnings()
    }

    pub fn issues(&self) -> &IssueLog {
        &self.issues
    }

    /// Reads a design into the top block of a chip named after it.
    ///
    /// Masters and sites are looked up in `libs`, or in every library if
    /// `libs` is empty. In [`Mode::Floorplan`] and [`Mode::Incremental`] the
    /// chip must already exist.
    pub fn create_chip(
        &mut self,
        libs: &[Id<Lib>],
        path: impl AsRef<Path>,
        tech: Id<Tech>,
    ) -> Result<Id<Block>> {
        self.run(Target::Chip, libs, tech, path.as_ref())
    }

    /// Reads a design into a child block of `parent`.
    pub fn create_block(
        &mut self,
        parent: Id<Block>,
        libs: &[Id<Lib>],
        path: impl AsRef<Path>,
        tech: Id<Tech>,
    ) -> Result<Id<Block>> {
        self.run(Target::Child(parent), libs, tech, path.as_ref())
    }

    /// Replaces the wiring of the nets of `block` with the wiring in a file.
    ///
    /// Connections and every other construct are ignored.
    pub fn replace_wires(&mut self, block: Id<Block>, path: impl AsRef<Path>) -> Result<()> {
        let tech = self.db.block(block).tech;
        self.run(Target::Wires(block), &[], tech, path.as_ref())?;
        Ok(())
    }

    fn run(
        &mut self,
        target: Target,
        libs: &[Id<Lib>],
        tech: Id<Tech>,
        path: &Path,
    ) -> Result<Id<Block>> {
        let mut parser = DefParser::checkout();
        parser.set_callbacks(callbacks(target, self.mode));
        tracing::info!(path = ?path, mode = ?self.mode, "reading DEF");

        let mut builder = DefBuilder::new(
            &mut *self.db,
            tech,
            libs.to_vec(),
            self.mode,
            &self.options,
            target,
        );
        let parsed = parser.parse_file(path, &mut builder);
        let outcome = builder.finish();
        drop(parser);

        let errors = outcome.log.num_errors();
        let fatal = outcome
            .log
            .iter()
            .any(|issue| issue.kind == IssueKind::Structural);
        self.issues.append(outcome.log.clone());

        if parsed.is_err() || errors > 0 {
            tracing::error!(errors, "DEF parser returns an error!");
            if fatal || !self.options.continue_on_errors {
                self.discard(&outcome);
                return Err(match parsed {
                    Err(err) => err.into(),
                    Ok(()) => DefError::Failed { errors },
                });
            }
            if let Err(err) = &parsed {
                tracing::warn!("keeping partial import: {err}");
            }
        }
        let block = outcome.block.ok_or(DefError::NoDesign)?;
        tracing::info!(
            block = %self.db.block(block).name,
            errors,
            "finished reading DEF"
        );
        Ok(block)
    }

    /// Removes whatever a failed import created.
    fn discard(&mut self, outcome: &Outcome) {
        if let Some(chip) = outcome.created_chip {
            self.db.destroy_chip(chip);
        } else if let Some(block) = outcome.created_block {
            self.db.destroy_block(block);
        }
    }
}

/// The constructs each kind of import listens for.
fn callbacks(target: Target, mode: Mode) -> Callbacks {
    match (target, mode) {
        (Target::Wires(_), _) => {
            Callbacks::VERSION
                | Callbacks::DIVIDER_CHAR
                | Callbacks::BUS_BIT_CHARS
                | Callbacks::DESIGN
                | Callbacks::UNITS
                | Callbacks::VIAS
                | Callbacks::NON_DEFAULT_RULES
                | Callbacks::SPECIAL_NETS
                | Callbacks::NETS
                | Callbacks::DESIGN_END
        }
        (_, Mode::Default) => Callbacks::all(),
        (_, Mode::Floorplan | Mode::Incremental) => Callbacks::CORE,
    }
}
