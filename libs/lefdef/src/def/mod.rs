//! DEF records and the callback-driven DEF reader.
//!
//! Coordinates in these records are in DEF distance units, exactly as they
//! appear in the file. Converting them to database units is the caller's job.

mod callbacks;
mod lexer;
mod parser;
#[cfg(test)]
mod tests;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub use callbacks::{Abort, CallbackResult, Callbacks, DefCallbacks, DefParser};
pub use geometry::orientation::NamedOrientation as Orientation;
pub use geometry::point::Point;
pub use geometry::polygon::Polygon;
pub use geometry::rect::Rect;

pub type Ident = String;

/// Declares a keyword enum along with its textual form.
macro_rules! keyword_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $kw:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// The DEF keyword for this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $kw),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ();
            fn from_str(s: &str) -> Result<Self, ()> {
                match s {
                    $($kw => Ok(Self::$variant),)+
                    _ => Err(()),
                }
            }
        }
    };
}

keyword_enum!(
    /// The origin of a component or net.
    Source {
        Netlist => "NETLIST",
        Dist => "DIST",
        User => "USER",
        Timing => "TIMING",
        Test => "TEST",
    }
);

keyword_enum!(
    /// The intended use of a net or pin.
    NetUse {
        Analog => "ANALOG",
        Clock => "CLOCK",
        Ground => "GROUND",
        Power => "POWER",
        Reset => "RESET",
        Scan => "SCAN",
        Signal => "SIGNAL",
        Tieoff => "TIEOFF",
    }
);

keyword_enum!(
    /// The routing pattern of a net.
    NetPattern {
        Balanced => "BALANCED",
        Steiner => "STEINER",
        Trunk => "TRUNK",
        WiredLogic => "WIREDLOGIC",
    }
);

keyword_enum!(
    /// The direction of an I/O pin.
    PinDirection {
        Input => "INPUT",
        Output => "OUTPUT",
        InOut => "INOUT",
        Feedthru => "FEEDTHRU",
    }
);

keyword_enum!(
    /// The kind of a region.
    RegionKind {
        Fence => "FENCE",
        Guide => "GUIDE",
    }
);

keyword_enum!(
    /// The shape type attached to special wiring.
    ShapeType {
        Ring => "RING",
        PadRing => "PADRING",
        BlockRing => "BLOCKRING",
        Stripe => "STRIPE",
        FollowPin => "FOLLOWPIN",
        IoWire => "IOWIRE",
        CoreWire => "COREWIRE",
        BlockWire => "BLOCKWIRE",
        BlockageWire => "BLOCKAGEWIRE",
        FillWire => "FILLWIRE",
        FillWireOpc => "FILLWIREOPC",
        DrcFill => "DRCFILL",
    }
);

keyword_enum!(
    /// The object kind a property definition applies to.
    PropObject {
        Design => "DESIGN",
        Component => "COMPONENT",
        Net => "NET",
        SpecialNet => "SPECIALNET",
        Group => "GROUP",
        Row => "ROW",
        ComponentPin => "COMPONENTPIN",
        Region => "REGION",
        NonDefaultRule => "NONDEFAULTRULE",
    }
);

keyword_enum!(
    /// The value type of a property definition.
    PropDataType {
        Integer => "INTEGER",
        Real => "REAL",
        String => "STRING",
    }
);

/// The placement state of a component or pin.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PlacementStatus {
    /// Placed, but movable.
    Placed { pt: Point, orient: Orientation },
    /// Placed and not movable by automated tools.
    Fixed { pt: Point, orient: Orientation },
    /// Part of the cover macro; not movable by any tool.
    Cover { pt: Point, orient: Orientation },
    /// Not placed.
    Unplaced,
}

impl PlacementStatus {
    /// The location and orientation, if placed.
    pub fn location(&self) -> Option<(Point, Orientation)> {
        match *self {
            Self::Placed { pt, orient } | Self::Fixed { pt, orient } | Self::Cover { pt, orient } => {
                Some((pt, orient))
            }
            Self::Unplaced => None,
        }
    }
}

/// A `name value` property attached to an object.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: Ident,
    /// The raw value text. Quoted strings have their quotes removed.
    pub val: String,
}

/// An entry of the PROPERTYDEFINITIONS section.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    pub object: PropObject,
    pub name: Ident,
    pub data_type: PropDataType,
    pub range: Option<(f64, f64)>,
    /// The default value, or for [`PropObject::Design`] the design's value.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DieArea {
    /// Two points give a rectangle; more give a rectilinear polygon.
    pub pts: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: Ident,
    pub site: Ident,
    pub origin: Point,
    pub orient: Orientation,
    pub num_x: u32,
    pub num_y: u32,
    pub step_x: i64,
    pub step_y: i64,
    pub properties: Vec<Property>,
}

/// Which coordinate a track or gcell pattern varies.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Axis {
    /// The pattern gives x-coordinates (vertical lines).
    X,
    /// The pattern gives y-coordinates (horizontal lines).
    Y,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tracks {
    pub axis: Axis,
    pub start: i64,
    pub num: u32,
    pub step: i64,
    pub mask: Option<u32>,
    pub layers: Vec<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GcellGrid {
    pub axis: Axis,
    pub start: i64,
    pub num: u32,
    pub step: i64,
}

/// A shape on a named layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Rect(Rect),
    Polygon(Polygon),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerGeometry {
    pub layer: Ident,
    pub mask: Option<u32>,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Via {
    pub name: Ident,
    pub def: ViaDef,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViaDef {
    /// A via given by explicit shapes.
    Fixed(Vec<LayerGeometry>),
    /// A via generated from a VIARULE and its parameters.
    ViaRule(ViaRuleVia),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViaRuleVia {
    pub rule: Ident,
    pub cut_size: (i64, i64),
    pub bot_layer: Ident,
    pub cut_layer: Ident,
    pub top_layer: Ident,
    pub cut_spacing: (i64, i64),
    /// Bottom x, bottom y, top x, top y.
    pub enclosure: (i64, i64, i64, i64),
    pub rowcol: Option<(u32, u32)>,
    pub origin: Option<Point>,
    /// Bottom x, bottom y, top x, top y.
    pub offset: Option<(i64, i64, i64, i64)>,
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NdrLayer {
    pub name: Ident,
    pub width: i64,
    pub diag_width: Option<i64>,
    pub spacing: Option<i64>,
    pub wire_ext: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NonDefaultRule {
    pub name: Ident,
    pub hard_spacing: bool,
    pub layers: Vec<NdrLayer>,
    pub vias: Vec<Ident>,
    pub via_rules: Vec<Ident>,
    pub min_cuts: Vec<(Ident, u32)>,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: Ident,
    pub rects: Vec<Rect>,
    pub kind: Option<RegionKind>,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentPlaceHalo {
    pub soft: bool,
    pub left: i64,
    pub bottom: i64,
    pub right: i64,
    pub top: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: Ident,
    pub model: Ident,
    pub eeq_master: Option<Ident>,
    pub source: Option<Source>,
    pub placement: Option<PlacementStatus>,
    pub mask_shift: Option<String>,
    pub halo: Option<ComponentPlaceHalo>,
    pub route_halo: Option<(i64, Ident, Ident)>,
    pub weight: Option<u32>,
    pub region: Option<Ident>,
    pub properties: Vec<Property>,
}

impl Component {
    pub fn new(name: impl Into<Ident>, model: impl Into<Ident>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            eeq_master: None,
            source: None,
            placement: None,
            mask_shift: None,
            halo: None,
            route_halo: None,
            weight: None,
            region: None,
            properties: Vec::new(),
        }
    }
}

/// A via instance placed inside a pin port.
#[derive(Debug, Clone, PartialEq)]
pub struct PortVia {
    pub name: Ident,
    pub mask: Option<u32>,
    pub pt: Point,
}

/// One physical port of an I/O pin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PinPort {
    pub shapes: Vec<LayerGeometry>,
    pub vias: Vec<PortVia>,
    pub placement: Option<PlacementStatus>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub name: Ident,
    pub net: Ident,
    pub special: bool,
    pub direction: Option<PinDirection>,
    pub net_use: Option<NetUse>,
    pub supply_sensitivity: Option<Ident>,
    pub ground_sensitivity: Option<Ident>,
    /// Shapes given outside of a `+ PORT` statement form the first port.
    pub ports: Vec<PinPort>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PinProperties {
    /// A component name, or `PIN` for an I/O pin.
    pub component: Ident,
    pub pin: Ident,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerBlockageSpacing {
    Spacing(i64),
    DesignRuleWidth(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerBlockage {
    pub layer: Ident,
    pub component: Option<Ident>,
    pub slots: bool,
    pub fills: bool,
    pub pushdown: bool,
    pub except_pg_net: bool,
    pub spacing: Option<LayerBlockageSpacing>,
    pub mask: Option<u32>,
    pub geometry: Vec<Geometry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlacementBlockageKind {
    Soft,
    Partial(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacementBlockage {
    pub kind: Option<PlacementBlockageKind>,
    pub pushdown: bool,
    pub component: Option<Ident>,
    pub geometry: Vec<Geometry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Blockage {
    Layer(LayerBlockage),
    Placement(PlacementBlockage),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Layer {
        layer: Ident,
        mask: Option<u32>,
        opc: bool,
        geometry: Vec<Geometry>,
    },
    Via {
        via: Ident,
        mask: Option<u32>,
        opc: bool,
        pts: Vec<Point>,
    },
}

/// A `( component pin )` connection of a net.
///
/// I/O pins appear with the component name `PIN`, exactly as written.
#[derive(Debug, Clone, PartialEq)]
pub struct NetPin {
    pub component: Ident,
    pub pin: Ident,
    pub synthesized: bool,
}

/// The status keyword that starts a wiring statement.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingStatus {
    Cover,
    Fixed,
    Routed,
    NoShield,
    /// Special nets only: shielding for the named net.
    Shield(Ident),
}

/// One element of a routing path, in file order.
#[derive(Debug, Clone, PartialEq)]
pub enum PathElem {
    /// The routing layer that starts the path.
    Layer(Ident),
    /// The route width of a special wiring path.
    Width(i64),
    /// A `+ SHAPE` annotation of a special wiring path.
    Shape(ShapeType),
    Style(u32),
    Taper,
    TaperRule(Ident),
    /// A mask color for the following point, via or rect.
    Mask(u32),
    /// A point; `*` coordinates are already resolved.
    Point { x: i64, y: i64, ext: Option<i64> },
    Via {
        name: Ident,
        orient: Option<Orientation>,
    },
    /// A via array, special wiring only.
    ViaArray {
        name: Ident,
        orient: Option<Orientation>,
        num_x: u32,
        num_y: u32,
        step_x: i64,
        step_y: i64,
    },
    /// A rectangle relative to the previous point.
    Rect { dx1: i64, dy1: i64, dx2: i64, dy2: i64 },
    Virtual { x: i64, y: i64 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    pub elems: Vec<PathElem>,
}

/// A regular wiring statement and its `NEW`-separated paths.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularWiring {
    pub status: RoutingStatus,
    pub paths: Vec<Path>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Net {
    pub name: Ident,
    pub connections: Vec<NetPin>,
    pub shield_nets: Vec<Ident>,
    pub has_virtual_pins: bool,
    pub has_subnets: bool,
    pub xtalk: Option<u32>,
    pub nondefault_rule: Option<Ident>,
    pub wiring: Vec<RegularWiring>,
    pub source: Option<Source>,
    pub fixed_bump: bool,
    pub frequency: Option<f64>,
    pub original: Option<Ident>,
    pub net_use: Option<NetUse>,
    pub pattern: Option<NetPattern>,
    pub est_cap: Option<f64>,
    pub weight: Option<u32>,
    pub properties: Vec<Property>,
}

impl Net {
    pub fn new(name: impl Into<Ident>) -> Self {
        Self {
            name: name.into(),
            connections: Vec::new(),
            shield_nets: Vec::new(),
            has_virtual_pins: false,
            has_subnets: false,
            xtalk: None,
            nondefault_rule: None,
            wiring: Vec::new(),
            source: None,
            fixed_bump: false,
            frequency: None,
            original: None,
            net_use: None,
            pattern: None,
            est_cap: None,
            weight: None,
            properties: Vec::new(),
        }
    }
}

/// A fixed shape or via of special wiring.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecialShape {
    Rect { layer: Ident, rect: Rect },
    Polygon { layer: Ident, polygon: Polygon },
    Via {
        name: Ident,
        orient: Option<Orientation>,
        pts: Vec<Point>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometrySpecialWiring {
    pub status: Option<RoutingStatus>,
    pub shape: Option<ShapeType>,
    pub mask: Option<u32>,
    pub item: SpecialShape,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathSpecialWiring {
    pub status: RoutingStatus,
    pub paths: Vec<Path>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpecialWiring {
    Geometry(GeometrySpecialWiring),
    Path(PathSpecialWiring),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpecialNet {
    pub name: Ident,
    pub connections: Vec<NetPin>,
    pub voltage: Option<i64>,
    pub wiring: Vec<SpecialWiring>,
    pub source: Option<Source>,
    pub fixed_bump: bool,
    pub original: Option<Ident>,
    pub net_use: Option<NetUse>,
    pub pattern: Option<NetPattern>,
    pub est_cap: Option<f64>,
    pub weight: Option<u32>,
    pub properties: Vec<Property>,
}

impl SpecialNet {
    pub fn new(name: impl Into<Ident>) -> Self {
        Self {
            name: name.into(),
            connections: Vec::new(),
            voltage: None,
            wiring: Vec::new(),
            source: None,
            fixed_bump: false,
            original: None,
            net_use: None,
            pattern: None,
            est_cap: None,
            weight: None,
            properties: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: Ident,
    /// Component names or patterns using `*` and `?`.
    pub members: Vec<Ident>,
    pub region: Option<Ident>,
    pub properties: Vec<Property>,
}
