//! The callback interface and the parser lease.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use bitflags::bitflags;
use flate2::read::GzDecoder;

use super::parser::Parser;
use super::*;
use crate::error::{ParseError, Result};

/// Returned by a callback to stop the parse.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Abort;

/// The result type of every [`DefCallbacks`] method.
pub type CallbackResult = std::result::Result<(), Abort>;

bitflags! {
    /// The set of constructs reported to a [`DefCallbacks`] implementation.
    ///
    /// Constructs outside the set are still parsed, but their callback is not
    /// invoked.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct Callbacks: u32 {
        const VERSION = 1 << 0;
        const DIVIDER_CHAR = 1 << 1;
        const BUS_BIT_CHARS = 1 << 2;
        const DESIGN = 1 << 3;
        const TECHNOLOGY = 1 << 4;
        const UNITS = 1 << 5;
        const HISTORY = 1 << 6;
        const PROPERTY_DEFINITIONS = 1 << 7;
        const DIE_AREA = 1 << 8;
        const ROWS = 1 << 9;
        const TRACKS = 1 << 10;
        const GCELL_GRID = 1 << 11;
        const VIAS = 1 << 12;
        const NON_DEFAULT_RULES = 1 << 13;
        const REGIONS = 1 << 14;
        const COMPONENTS = 1 << 15;
        const PINS = 1 << 16;
        const PIN_PROPERTIES = 1 << 17;
        const BLOCKAGES = 1 << 18;
        const SLOTS = 1 << 19;
        const FILLS = 1 << 20;
        const SPECIAL_NETS = 1 << 21;
        const NETS = 1 << 22;
        const GROUPS = 1 << 23;
        const STYLES = 1 << 24;
        const DESIGN_END = 1 << 25;
    }
}

impl Callbacks {
    /// The constructs every DEF import needs.
    pub const CORE: Self = Self::VERSION
        .union(Self::DIVIDER_CHAR)
        .union(Self::BUS_BIT_CHARS)
        .union(Self::DESIGN)
        .union(Self::TECHNOLOGY)
        .union(Self::UNITS)
        .union(Self::DIE_AREA)
        .union(Self::ROWS)
        .union(Self::TRACKS)
        .union(Self::GCELL_GRID)
        .union(Self::COMPONENTS)
        .union(Self::PINS)
        .union(Self::SPECIAL_NETS)
        .union(Self::NETS)
        .union(Self::DESIGN_END);
}

/// Receives DEF constructs in file order.
///
/// Every method defaults to accepting the construct and continuing. Returning
/// [`Err(Abort)`](Abort) stops the parse with [`ParseError::Aborted`].
#[allow(unused_variables)]
pub trait DefCallbacks {
    fn version(&mut self, version: f64) -> CallbackResult {
        Ok(())
    }
    fn divider_char(&mut self, divider: char) -> CallbackResult {
        Ok(())
    }
    fn bus_bit_chars(&mut self, open: char, close: char) -> CallbackResult {
        Ok(())
    }
    fn design(&mut self, name: &str) -> CallbackResult {
        Ok(())
    }
    fn technology(&mut self, name: &str) -> CallbackResult {
        Ok(())
    }
    /// `UNITS DISTANCE MICRONS <units>`.
    fn units(&mut self, units: u32) -> CallbackResult {
        Ok(())
    }
    fn history(&mut self, text: &str) -> CallbackResult {
        Ok(())
    }
    fn property_definition(&mut self, def: PropertyDefinition) -> CallbackResult {
        Ok(())
    }
    fn die_area(&mut self, area: DieArea) -> CallbackResult {
        Ok(())
    }
    fn row(&mut self, row: Row) -> CallbackResult {
        Ok(())
    }
    fn tracks(&mut self, tracks: Tracks) -> CallbackResult {
        Ok(())
    }
    fn gcell_grid(&mut self, grid: GcellGrid) -> CallbackResult {
        Ok(())
    }
    fn via(&mut self, via: Via) -> CallbackResult {
        Ok(())
    }
    fn non_default_rule(&mut self, rule: NonDefaultRule) -> CallbackResult {
        Ok(())
    }
    fn region(&mut self, region: Region) -> CallbackResult {
        Ok(())
    }
    fn component(&mut self, component: Component) -> CallbackResult {
        Ok(())
    }
    fn pin(&mut self, pin: Pin) -> CallbackResult {
        Ok(())
    }
    fn pin_properties(&mut self, props: PinProperties) -> CallbackResult {
        Ok(())
    }
    fn blockage(&mut self, blockage: Blockage) -> CallbackResult {
        Ok(())
    }
    /// The start of a SLOTS section holding `count` entries.
    fn slots(&mut self, count: u32) -> CallbackResult {
        Ok(())
    }
    fn fill(&mut self, fill: Fill) -> CallbackResult {
        Ok(())
    }
    /// The start of a STYLES section holding `count` entries.
    fn styles(&mut self, count: u32) -> CallbackResult {
        Ok(())
    }
    fn special_net(&mut self, net: SpecialNet) -> CallbackResult {
        Ok(())
    }
    fn net(&mut self, net: Net) -> CallbackResult {
        Ok(())
    }
    fn group(&mut self, group: Group) -> CallbackResult {
        Ok(())
    }
    fn design_end(&mut self) -> CallbackResult {
        Ok(())
    }
}

static PARSER_LEASE: Mutex<()> = Mutex::new(());

/// Exclusive use of the DEF reader.
///
/// Only one parse runs at a time in a process; holding a `DefParser` is the
/// capability to run one. The lease is released on drop.
pub struct DefParser {
    callbacks: Callbacks,
    _lease: MutexGuard<'static, ()>,
}

impl DefParser {
    /// Waits for the reader to become free and checks it out.
    pub fn checkout() -> Self {
        let lease = PARSER_LEASE
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Self::with_lease(lease)
    }

    /// Checks out the reader if no other parse is running.
    pub fn try_checkout() -> Option<Self> {
        match PARSER_LEASE.try_lock() {
            Ok(lease) => Some(Self::with_lease(lease)),
            Err(TryLockError::Poisoned(err)) => Some(Self::with_lease(err.into_inner())),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    fn with_lease(lease: MutexGuard<'static, ()>) -> Self {
        Self {
            callbacks: Callbacks::all(),
            _lease: lease,
        }
    }

    /// Selects which constructs are reported. All are reported by default.
    pub fn set_callbacks(&mut self, callbacks: Callbacks) {
        self.callbacks = callbacks;
    }

    /// Adds constructs to the reported set.
    pub fn enable(&mut self, callbacks: Callbacks) {
        self.callbacks |= callbacks;
    }

    pub fn callbacks(&self) -> Callbacks {
        self.callbacks
    }

    /// Parses a DEF file, decompressing it first if its name ends in `.gz`.
    pub fn parse_file<C: DefCallbacks + ?Sized>(
        &mut self,
        path: impl AsRef<Path>,
        callbacks: &mut C,
    ) -> Result<()> {
        let path = path.as_ref();
        tracing::debug!("reading DEF file: {:?}", path);
        let data = read_def(path).map_err(|err| ParseError::Io {
            path: path.into(),
            err,
        })?;
        self.parse_str(&data, callbacks)
    }

    /// Parses DEF text.
    pub fn parse_str<C: DefCallbacks + ?Sized>(
        &mut self,
        data: &str,
        callbacks: &mut C,
    ) -> Result<()> {
        let tokens = super::lexer::tokenize(data)?;
        Parser::new(tokens, self.callbacks, callbacks).parse()
    }
}

fn read_def(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut data = String::new();
    if path.extension().is_some_and(|ext| ext == "gz") {
        GzDecoder::new(file).read_to_string(&mut data)?;
    } else {
        file.read_to_string(&mut data)?;
    }
    Ok(data)
}
