//! Recursive-descent DEF parser.

use std::str::FromStr;

use super::callbacks::{Callbacks, DefCallbacks};
use super::lexer::Token;
use super::*;
use crate::error::{ParseError, Result};

pub(crate) struct Parser<'c, C: ?Sized> {
    tokens: Vec<Token>,
    pos: usize,
    enabled: Callbacks,
    callbacks: &'c mut C,
}

/// Status keywords that start regular wiring.
const WIRING_STATUS: [&str; 4] = ["COVER", "FIXED", "ROUTED", "NOSHIELD"];

impl<'c, C: DefCallbacks + ?Sized> Parser<'c, C> {
    pub(crate) fn new(tokens: Vec<Token>, enabled: Callbacks, callbacks: &'c mut C) -> Self {
        Self {
            tokens,
            pos: 0,
            enabled,
            callbacks,
        }
    }

    pub(crate) fn parse(mut self) -> Result<()> {
        while let Some(tok) = self.try_next() {
            if tok.quoted {
                return Err(self.err_at(&tok, format!("unexpected string `{}`", tok.text)));
            }
            match tok.text.as_str() {
                "VERSION" => {
                    let version = self.parse_num::<f64>()?;
                    self.expect(";")?;
                    self.emit(Callbacks::VERSION, |cb| cb.version(version))?;
                }
                "NAMESCASESENSITIVE" => self.skip_statement()?,
                "DIVIDERCHAR" => {
                    let s = self.word()?;
                    self.expect(";")?;
                    let c = s.chars().next().ok_or_else(|| self.err("empty divider"))?;
                    self.emit(Callbacks::DIVIDER_CHAR, |cb| cb.divider_char(c))?;
                }
                "BUSBITCHARS" => {
                    let s = self.word()?;
                    self.expect(";")?;
                    let mut chars = s.chars();
                    let (Some(open), Some(close)) = (chars.next(), chars.next()) else {
                        return Err(self.err(format!("invalid bus bit characters `{s}`")));
                    };
                    self.emit(Callbacks::BUS_BIT_CHARS, |cb| cb.bus_bit_chars(open, close))?;
                }
                "DESIGN" => {
                    let name = self.word()?;
                    self.expect(";")?;
                    self.emit(Callbacks::DESIGN, |cb| cb.design(&name))?;
                }
                "TECHNOLOGY" => {
                    let name = self.word()?;
                    self.expect(";")?;
                    self.emit(Callbacks::TECHNOLOGY, |cb| cb.technology(&name))?;
                }
                "UNITS" => {
                    self.expect("DISTANCE")?;
                    self.expect("MICRONS")?;
                    let units = self.parse_num::<u32>()?;
                    self.expect(";")?;
                    self.emit(Callbacks::UNITS, |cb| cb.units(units))?;
                }
                "HISTORY" => {
                    let mut words = Vec::new();
                    while !self.peek_is(";") {
                        words.push(self.word()?);
                    }
                    self.expect(";")?;
                    let text = words.join(" ");
                    self.emit(Callbacks::HISTORY, |cb| cb.history(&text))?;
                }
                "PROPERTYDEFINITIONS" => self.parse_property_definitions()?,
                "DIEAREA" => {
                    let mut pts = Vec::new();
                    while !self.peek_is(";") {
                        pts.push(self.point(pts.last().copied())?);
                    }
                    self.expect(";")?;
                    if pts.len() < 2 {
                        return Err(self.err("DIEAREA needs at least two points"));
                    }
                    self.emit(Callbacks::DIE_AREA, |cb| cb.die_area(DieArea { pts }))?;
                }
                "ROW" => {
                    let row = self.parse_row()?;
                    self.emit(Callbacks::ROWS, |cb| cb.row(row))?;
                }
                "TRACKS" => {
                    let tracks = self.parse_tracks()?;
                    self.emit(Callbacks::TRACKS, |cb| cb.tracks(tracks))?;
                }
                "GCELLGRID" => {
                    let axis = self.axis()?;
                    let start = self.int()?;
                    self.expect("DO")?;
                    let num = self.parse_num()?;
                    self.expect("STEP")?;
                    let step = self.int()?;
                    self.expect(";")?;
                    let grid = GcellGrid {
                        axis,
                        start,
                        num,
                        step,
                    };
                    self.emit(Callbacks::GCELL_GRID, |cb| cb.gcell_grid(grid))?;
                }
                "VIAS" => self.section("VIAS", |p| {
                    let via = p.parse_via()?;
                    p.emit(Callbacks::VIAS, |cb| cb.via(via))
                })?,
                "STYLES" => {
                    let count = self.section_count()?;
                    self.emit(Callbacks::STYLES, |cb| cb.styles(count))?;
                    self.skip_section("STYLES")?;
                }
                "NONDEFAULTRULES" => self.section("NONDEFAULTRULES", |p| {
                    let rule = p.parse_ndr()?;
                    p.emit(Callbacks::NON_DEFAULT_RULES, |cb| cb.non_default_rule(rule))
                })?,
                "REGIONS" => self.section("REGIONS", |p| {
                    let region = p.parse_region()?;
                    p.emit(Callbacks::REGIONS, |cb| cb.region(region))
                })?,
                "COMPONENTS" => self.section("COMPONENTS", |p| {
                    let component = p.parse_component()?;
                    p.emit(Callbacks::COMPONENTS, |cb| cb.component(component))
                })?,
                "PINS" => self.section("PINS", |p| {
                    let pin = p.parse_pin()?;
                    p.emit(Callbacks::PINS, |cb| cb.pin(pin))
                })?,
                "PINPROPERTIES" => self.section("PINPROPERTIES", |p| {
                    let component = p.word()?;
                    let pin = p.word()?;
                    let mut properties = Vec::new();
                    while p.plus_option()? {
                        let kw = p.word()?;
                        if kw == "PROPERTY" {
                            p.properties(&mut properties)?;
                        } else {
                            p.skip_option(&kw)?;
                        }
                    }
                    p.expect(";")?;
                    let props = PinProperties {
                        component,
                        pin,
                        properties,
                    };
                    p.emit(Callbacks::PIN_PROPERTIES, |cb| cb.pin_properties(props))
                })?,
                "BLOCKAGES" => self.section("BLOCKAGES", |p| {
                    let blockage = p.parse_blockage()?;
                    p.emit(Callbacks::BLOCKAGES, |cb| cb.blockage(blockage))
                })?,
                "SLOTS" => {
                    let count = self.section_count()?;
                    self.emit(Callbacks::SLOTS, |cb| cb.slots(count))?;
                    self.skip_section("SLOTS")?;
                }
                "FILLS" => self.section("FILLS", |p| {
                    let fill = p.parse_fill()?;
                    p.emit(Callbacks::FILLS, |cb| cb.fill(fill))
                })?,
                "SPECIALNETS" => self.section("SPECIALNETS", |p| {
                    let net = p.parse_special_net()?;
                    p.emit(Callbacks::SPECIAL_NETS, |cb| cb.special_net(net))
                })?,
                "NETS" => self.section("NETS", |p| {
                    let net = p.parse_net()?;
                    p.emit(Callbacks::NETS, |cb| cb.net(net))
                })?,
                "GROUPS" => self.section("GROUPS", |p| {
                    let group = p.parse_group()?;
                    p.emit(Callbacks::GROUPS, |cb| cb.group(group))
                })?,
                "SCANCHAINS" => {
                    self.section_count()?;
                    self.skip_section("SCANCHAINS")?;
                }
                "COMPONENTMASKSHIFT" => self.skip_statement()?,
                "BEGINEXT" => {
                    while !self.try_next().is_some_and(|t| t.is("ENDEXT")) {
                        if self.pos >= self.tokens.len() {
                            return Err(self.err("unterminated BEGINEXT"));
                        }
                    }
                }
                "END" => {
                    self.expect("DESIGN")?;
                    self.emit(Callbacks::DESIGN_END, |cb| cb.design_end())?;
                    return Ok(());
                }
                kw => {
                    tracing::debug!(line = tok.line, "skipping unknown statement `{kw}`");
                    self.skip_statement()?;
                }
            }
        }
        Err(self.err("missing END DESIGN"))
    }

    fn emit(
        &mut self,
        flag: Callbacks,
        f: impl FnOnce(&mut C) -> super::CallbackResult,
    ) -> Result<()> {
        if !self.enabled.contains(flag) {
            return Ok(());
        }
        f(&mut *self.callbacks).map_err(|_| ParseError::Aborted {
            line: self.line(),
        })
    }

    // Token helpers.

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            line: self.line(),
            msg: msg.into(),
        }
    }

    fn err_at(&self, tok: &Token, msg: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            line: tok.line,
            msg: msg.into(),
        }
    }

    fn try_next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn next(&mut self) -> Result<Token> {
        self.try_next()
            .ok_or_else(|| self.err("unexpected end of file"))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn peek_is(&self, kw: &str) -> bool {
        self.peek().is_some_and(|t| t.is(kw))
    }

    fn word(&mut self) -> Result<String> {
        let tok = self.next()?;
        if tok.is(";") {
            return Err(self.err_at(&tok, "unexpected `;`"));
        }
        Ok(tok.text)
    }

    fn expect(&mut self, kw: &str) -> Result<()> {
        let tok = self.next()?;
        if tok.is(kw) {
            Ok(())
        } else {
            Err(self.err_at(&tok, format!("expected `{kw}`, found `{}`", tok.text)))
        }
    }

    fn parse_num<T: FromStr>(&mut self) -> Result<T> {
        let tok = self.next()?;
        tok.text
            .parse()
            .map_err(|_| self.err_at(&tok, format!("expected a number, found `{}`", tok.text)))
    }

    fn int(&mut self) -> Result<i64> {
        self.parse_num()
    }

    fn orient(&mut self) -> Result<Orientation> {
        let tok = self.next()?;
        tok.text
            .parse()
            .map_err(|_| self.err_at(&tok, format!("invalid orientation `{}`", tok.text)))
    }

    fn try_orient(&mut self) -> Option<Orientation> {
        let orient = self.peek().filter(|t| !t.quoted)?.text.parse().ok()?;
        self.pos += 1;
        Some(orient)
    }

    fn keyword<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let tok = self.next()?;
        tok.text
            .parse()
            .map_err(|_| self.err_at(&tok, format!("invalid {what} `{}`", tok.text)))
    }

    fn axis(&mut self) -> Result<Axis> {
        let tok = self.next()?;
        match tok.text.as_str() {
            "X" => Ok(Axis::X),
            "Y" => Ok(Axis::Y),
            _ => Err(self.err_at(&tok, format!("expected X or Y, found `{}`", tok.text))),
        }
    }

    /// Parses `( x y )`, resolving `*` against the previous point.
    fn point(&mut self, prev: Option<Point>) -> Result<Point> {
        let (x, y, _) = self.point_ext(prev)?;
        Ok(Point::new(x, y))
    }

    /// Parses `( x y [ext] )`, resolving `*` against the previous point.
    fn point_ext(&mut self, prev: Option<Point>) -> Result<(i64, i64, Option<i64>)> {
        self.expect("(")?;
        let x = self.coord(prev.map(|p| p.x))?;
        let y = self.coord(prev.map(|p| p.y))?;
        let ext = if self.peek_is(")") {
            None
        } else {
            Some(self.int()?)
        };
        self.expect(")")?;
        Ok((x, y, ext))
    }

    fn coord(&mut self, prev: Option<i64>) -> Result<i64> {
        if self.peek_is("*") {
            self.pos += 1;
            prev.ok_or_else(|| self.err("`*` with no previous point"))
        } else {
            self.int()
        }
    }

    fn rect(&mut self) -> Result<Rect> {
        let p0 = self.point(None)?;
        let p1 = self.point(Some(p0))?;
        Ok(Rect::from_corners(p0, p1))
    }

    fn polygon(&mut self) -> Result<Polygon> {
        let mut pts: Vec<Point> = Vec::new();
        while self.peek_is("(") {
            pts.push(self.point(pts.last().copied())?);
        }
        if pts.len() < 3 {
            return Err(self.err("a polygon needs at least three points"));
        }
        Ok(Polygon::from_verts(pts))
    }

    /// Consumes a `+` if one is next.
    fn plus_option(&mut self) -> Result<bool> {
        if self.peek_is("+") {
            self.pos += 1;
            if self.peek().is_none() {
                return Err(self.err("unexpected end of file"));
            }
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Consumes `+ MASK n` if it is next.
    fn mask_option(&mut self) -> Result<Option<u32>> {
        if self.peek_is("+") && self.peek_nth(1).is_some_and(|t| t.is("MASK")) {
            self.pos += 2;
            Ok(Some(self.parse_num()?))
        } else {
            Ok(None)
        }
    }

    /// Skips the arguments of an unrecognized `+` option.
    fn skip_option(&mut self, kw: &str) -> Result<()> {
        tracing::debug!(line = self.line(), "skipping option `{kw}`");
        while !self.peek_is("+") && !self.peek_is(";") {
            self.next()?;
        }
        Ok(())
    }

    fn skip_statement(&mut self) -> Result<()> {
        while !self.next()?.is(";") {}
        Ok(())
    }

    /// Parses `name value` pairs following `PROPERTY`.
    fn properties(&mut self, out: &mut Vec<Property>) -> Result<()> {
        while !self.peek_is("+") && !self.peek_is(";") {
            let name = self.word()?;
            let val = self.word()?;
            out.push(Property { name, val });
        }
        Ok(())
    }

    fn section_count(&mut self) -> Result<u32> {
        let count = self.parse_num()?;
        self.expect(";")?;
        Ok(count)
    }

    /// Parses `<count> ; { - item ; } END <name>`.
    fn section(
        &mut self,
        name: &str,
        mut item: impl FnMut(&mut Self) -> Result<()>,
    ) -> Result<()> {
        let count = self.section_count()?;
        let mut seen = 0;
        loop {
            let tok = self.next()?;
            if tok.is("END") {
                self.expect(name)?;
                break;
            } else if tok.is("-") {
                item(self)?;
                seen += 1;
            } else {
                return Err(self.err_at(&tok, format!("expected `-` or `END {name}`, found `{}`", tok.text)));
            }
        }
        if seen != count {
            tracing::warn!(
                "{name} section declares {count} entries, but {seen} were found"
            );
        }
        Ok(())
    }

    fn skip_section(&mut self, name: &str) -> Result<()> {
        loop {
            let tok = self.next()?;
            if tok.is("END") && self.peek_is(name) {
                self.pos += 1;
                return Ok(());
            }
        }
    }

    // Constructs.

    fn parse_property_definitions(&mut self) -> Result<()> {
        loop {
            let tok = self.next()?;
            if tok.is("END") {
                return self.expect("PROPERTYDEFINITIONS");
            }
            let object: PropObject = tok
                .text
                .parse()
                .map_err(|_| self.err_at(&tok, format!("invalid property object `{}`", tok.text)))?;
            let name = self.word()?;
            let data_type = self.keyword("property type")?;
            let mut range = None;
            let mut value = None;
            while !self.peek_is(";") {
                if self.peek_is("RANGE") {
                    self.pos += 1;
                    range = Some((self.parse_num()?, self.parse_num()?));
                } else {
                    let v = self.word()?;
                    value.get_or_insert(v);
                }
            }
            self.expect(";")?;
            let def = PropertyDefinition {
                object,
                name,
                data_type,
                range,
                value,
            };
            self.emit(Callbacks::PROPERTY_DEFINITIONS, |cb| cb.property_definition(def))?;
        }
    }

    fn parse_row(&mut self) -> Result<Row> {
        let name = self.word()?;
        let site = self.word()?;
        let x = self.int()?;
        let y = self.int()?;
        let orient = self.orient()?;
        let mut row = Row {
            name,
            site,
            origin: Point::new(x, y),
            orient,
            num_x: 1,
            num_y: 1,
            step_x: 0,
            step_y: 0,
            properties: Vec::new(),
        };
        if self.peek_is("DO") {
            self.pos += 1;
            row.num_x = self.parse_num()?;
            self.expect("BY")?;
            row.num_y = self.parse_num()?;
            if self.peek_is("STEP") {
                self.pos += 1;
                row.step_x = self.int()?;
                row.step_y = self.int()?;
            }
        }
        while self.plus_option()? {
            let kw = self.word()?;
            if kw == "PROPERTY" {
                self.properties(&mut row.properties)?;
            } else {
                self.skip_option(&kw)?;
            }
        }
        self.expect(";")?;
        Ok(row)
    }

    fn parse_tracks(&mut self) -> Result<Tracks> {
        let axis = self.axis()?;
        let start = self.int()?;
        self.expect("DO")?;
        let num = self.parse_num()?;
        self.expect("STEP")?;
        let step = self.int()?;
        let mut tracks = Tracks {
            axis,
            start,
            num,
            step,
            mask: None,
            layers: Vec::new(),
        };
        while !self.peek_is(";") {
            let kw = self.word()?;
            match kw.as_str() {
                "MASK" => {
                    tracks.mask = Some(self.parse_num()?);
                    if self.peek_is("SAMEMASK") {
                        self.pos += 1;
                    }
                }
                "LAYER" => {
                    while !self.peek_is(";") {
                        tracks.layers.push(self.word()?);
                    }
                }
                _ => return Err(self.err(format!("unexpected `{kw}` in TRACKS"))),
            }
        }
        self.expect(";")?;
        Ok(tracks)
    }

    fn parse_via(&mut self) -> Result<Via> {
        let name = self.word()?;
        let mut shapes = Vec::new();
        let mut rule: Option<ViaRuleVia> = None;
        while self.plus_option()? {
            let kw = self.word()?;
            match kw.as_str() {
                "RECT" | "POLYGON" => {
                    let layer = self.word()?;
                    let mask = self.mask_option()?;
                    let geometry = if kw == "RECT" {
                        Geometry::Rect(self.rect()?)
                    } else {
                        Geometry::Polygon(self.polygon()?)
                    };
                    shapes.push(LayerGeometry {
                        layer,
                        mask,
                        geometry,
                    });
                }
                "VIARULE" => {
                    rule = Some(ViaRuleVia {
                        rule: self.word()?,
                        cut_size: (0, 0),
                        bot_layer: String::new(),
                        cut_layer: String::new(),
                        top_layer: String::new(),
                        cut_spacing: (0, 0),
                        enclosure: (0, 0, 0, 0),
                        rowcol: None,
                        origin: None,
                        offset: None,
                        pattern: None,
                    });
                }
                _ => {
                    let Some(rule) = rule.as_mut() else {
                        return Err(self.err(format!("`{kw}` outside of a VIARULE via")));
                    };
                    match kw.as_str() {
                        "CUTSIZE" => rule.cut_size = (self.int()?, self.int()?),
                        "LAYERS" => {
                            rule.bot_layer = self.word()?;
                            rule.cut_layer = self.word()?;
                            rule.top_layer = self.word()?;
                        }
                        "CUTSPACING" => rule.cut_spacing = (self.int()?, self.int()?),
                        "ENCLOSURE" => {
                            rule.enclosure = (self.int()?, self.int()?, self.int()?, self.int()?)
                        }
                        "ROWCOL" => rule.rowcol = Some((self.parse_num()?, self.parse_num()?)),
                        "ORIGIN" => rule.origin = Some(Point::new(self.int()?, self.int()?)),
                        "OFFSET" => {
                            rule.offset =
                                Some((self.int()?, self.int()?, self.int()?, self.int()?))
                        }
                        "PATTERN" => rule.pattern = Some(self.word()?),
                        _ => self.skip_option(&kw)?,
                    }
                }
            }
        }
        self.expect(";")?;
        let def = match rule {
            Some(rule) => ViaDef::ViaRule(rule),
            None => ViaDef::Fixed(shapes),
        };
        Ok(Via { name, def })
    }

    fn parse_ndr(&mut self) -> Result<NonDefaultRule> {
        let mut rule = NonDefaultRule {
            name: self.word()?,
            hard_spacing: false,
            layers: Vec::new(),
            vias: Vec::new(),
            via_rules: Vec::new(),
            min_cuts: Vec::new(),
            properties: Vec::new(),
        };
        while self.plus_option()? {
            let kw = self.word()?;
            match kw.as_str() {
                "HARDSPACING" => rule.hard_spacing = true,
                "LAYER" => {
                    let name = self.word()?;
                    self.expect("WIDTH")?;
                    let mut layer = NdrLayer {
                        name,
                        width: self.int()?,
                        diag_width: None,
                        spacing: None,
                        wire_ext: None,
                    };
                    while !self.peek_is("+") && !self.peek_is(";") {
                        let kw = self.word()?;
                        match kw.as_str() {
                            "DIAGWIDTH" => layer.diag_width = Some(self.int()?),
                            "SPACING" => layer.spacing = Some(self.int()?),
                            "WIREEXT" => layer.wire_ext = Some(self.int()?),
                            _ => return Err(self.err(format!("unexpected `{kw}` in LAYER"))),
                        }
                    }
                    rule.layers.push(layer);
                }
                "VIA" => rule.vias.push(self.word()?),
                "VIARULE" => rule.via_rules.push(self.word()?),
                "MINCUTS" => {
                    let layer = self.word()?;
                    rule.min_cuts.push((layer, self.parse_num()?));
                }
                "PROPERTY" => self.properties(&mut rule.properties)?,
                _ => self.skip_option(&kw)?,
            }
        }
        self.expect(";")?;
        Ok(rule)
    }

    fn parse_region(&mut self) -> Result<Region> {
        let mut region = Region {
            name: self.word()?,
            rects: Vec::new(),
            kind: None,
            properties: Vec::new(),
        };
        while self.peek_is("(") {
            region.rects.push(self.rect()?);
        }
        while self.plus_option()? {
            let kw = self.word()?;
            match kw.as_str() {
                "TYPE" => region.kind = Some(self.keyword("region type")?),
                "PROPERTY" => self.properties(&mut region.properties)?,
                _ => self.skip_option(&kw)?,
            }
        }
        self.expect(";")?;
        Ok(region)
    }

    fn placement(&mut self, kw: &str) -> Result<Option<PlacementStatus>> {
        match kw {
            "PLACED" | "FIXED" | "COVER" => {}
            "UNPLACED" => return Ok(Some(PlacementStatus::Unplaced)),
            _ => return Ok(None),
        }
        let pt = self.point(None)?;
        let orient = self.orient()?;
        Ok(Some(match kw {
            "PLACED" => PlacementStatus::Placed { pt, orient },
            "FIXED" => PlacementStatus::Fixed { pt, orient },
            _ => PlacementStatus::Cover { pt, orient },
        }))
    }

    fn parse_component(&mut self) -> Result<Component> {
        let name = self.word()?;
        let model = self.word()?;
        let mut c = Component::new(name, model);
        while self.plus_option()? {
            let kw = self.word()?;
            if let Some(placement) = self.placement(&kw)? {
                c.placement = Some(placement);
                continue;
            }
            match kw.as_str() {
                "EEQMASTER" => c.eeq_master = Some(self.word()?),
                "SOURCE" => c.source = Some(self.keyword("source")?),
                "MASKSHIFT" => c.mask_shift = Some(self.word()?),
                "HALO" => {
                    let soft = self.peek_is("SOFT");
                    if soft {
                        self.pos += 1;
                    }
                    c.halo = Some(ComponentPlaceHalo {
                        soft,
                        left: self.int()?,
                        bottom: self.int()?,
                        right: self.int()?,
                        top: self.int()?,
                    });
                }
                "ROUTEHALO" => c.route_halo = Some((self.int()?, self.word()?, self.word()?)),
                "WEIGHT" => c.weight = Some(self.parse_num()?),
                "REGION" => c.region = Some(self.word()?),
                "PROPERTY" => self.properties(&mut c.properties)?,
                _ => self.skip_option(&kw)?,
            }
        }
        self.expect(";")?;
        Ok(c)
    }

    fn parse_pin(&mut self) -> Result<Pin> {
        let name = self.word()?;
        let mut pin = Pin {
            name,
            net: String::new(),
            special: false,
            direction: None,
            net_use: None,
            supply_sensitivity: None,
            ground_sensitivity: None,
            ports: Vec::new(),
        };
        let mut port: Option<PinPort> = None;
        while self.plus_option()? {
            let kw = self.word()?;
            if let Some(placement) = self.placement(&kw)? {
                port.get_or_insert_with(PinPort::default).placement = Some(placement);
                continue;
            }
            match kw.as_str() {
                "NET" => pin.net = self.word()?,
                "SPECIAL" => pin.special = true,
                "DIRECTION" => pin.direction = Some(self.keyword("pin direction")?),
                "USE" => pin.net_use = Some(self.keyword("use")?),
                "SUPPLYSENSITIVITY" => pin.supply_sensitivity = Some(self.word()?),
                "GROUNDSENSITIVITY" => pin.ground_sensitivity = Some(self.word()?),
                "PORT" => {
                    if let Some(port) = port.take() {
                        pin.ports.push(port);
                    }
                    port = Some(PinPort::default());
                }
                "LAYER" | "POLYGON" => {
                    let layer = self.word()?;
                    let mut mask = None;
                    while !self.peek_is("(") {
                        let kw = self.word()?;
                        match kw.as_str() {
                            "MASK" => mask = Some(self.parse_num()?),
                            "SPACING" | "DESIGNRULEWIDTH" => {
                                self.int()?;
                            }
                            _ => return Err(self.err(format!("unexpected `{kw}` in pin shape"))),
                        }
                    }
                    let geometry = if kw == "LAYER" {
                        Geometry::Rect(self.rect()?)
                    } else {
                        Geometry::Polygon(self.polygon()?)
                    };
                    port.get_or_insert_with(PinPort::default)
                        .shapes
                        .push(LayerGeometry {
                            layer,
                            mask,
                            geometry,
                        });
                }
                "VIA" => {
                    let name = self.word()?;
                    let mut mask = None;
                    if self.peek_is("MASK") {
                        self.pos += 1;
                        mask = Some(self.parse_num()?);
                    }
                    let pt = self.point(None)?;
                    port.get_or_insert_with(PinPort::default)
                        .vias
                        .push(PortVia { name, mask, pt });
                }
                _ => self.skip_option(&kw)?,
            }
        }
        self.expect(";")?;
        if let Some(port) = port {
            pin.ports.push(port);
        }
        Ok(pin)
    }

    fn geometries(&mut self, out: &mut Vec<Geometry>) -> Result<()> {
        loop {
            if self.peek_is("RECT") {
                self.pos += 1;
                out.push(Geometry::Rect(self.rect()?));
            } else if self.peek_is("POLYGON") {
                self.pos += 1;
                out.push(Geometry::Polygon(self.polygon()?));
            } else {
                return Ok(());
            }
        }
    }

    fn parse_blockage(&mut self) -> Result<Blockage> {
        let kind = self.word()?;
        match kind.as_str() {
            "LAYER" => {
                let mut b = LayerBlockage {
                    layer: self.word()?,
                    component: None,
                    slots: false,
                    fills: false,
                    pushdown: false,
                    except_pg_net: false,
                    spacing: None,
                    mask: None,
                    geometry: Vec::new(),
                };
                while self.plus_option()? {
                    let kw = self.word()?;
                    match kw.as_str() {
                        "COMPONENT" => b.component = Some(self.word()?),
                        "SLOTS" => b.slots = true,
                        "FILLS" => b.fills = true,
                        "PUSHDOWN" => b.pushdown = true,
                        "EXCEPTPGNET" => b.except_pg_net = true,
                        "SPACING" => b.spacing = Some(LayerBlockageSpacing::Spacing(self.int()?)),
                        "DESIGNRULEWIDTH" => {
                            b.spacing = Some(LayerBlockageSpacing::DesignRuleWidth(self.int()?))
                        }
                        "MASK" => b.mask = Some(self.parse_num()?),
                        _ => self.skip_option(&kw)?,
                    }
                }
                self.geometries(&mut b.geometry)?;
                self.expect(";")?;
                Ok(Blockage::Layer(b))
            }
            "PLACEMENT" => {
                let mut b = PlacementBlockage {
                    kind: None,
                    pushdown: false,
                    component: None,
                    geometry: Vec::new(),
                };
                while self.plus_option()? {
                    let kw = self.word()?;
                    match kw.as_str() {
                        "SOFT" => b.kind = Some(PlacementBlockageKind::Soft),
                        "PARTIAL" => {
                            b.kind = Some(PlacementBlockageKind::Partial(self.parse_num()?))
                        }
                        "PUSHDOWN" => b.pushdown = true,
                        "COMPONENT" => b.component = Some(self.word()?),
                        _ => self.skip_option(&kw)?,
                    }
                }
                self.geometries(&mut b.geometry)?;
                self.expect(";")?;
                Ok(Blockage::Placement(b))
            }
            _ => Err(self.err(format!("invalid blockage kind `{kind}`"))),
        }
    }

    fn parse_fill(&mut self) -> Result<Fill> {
        let kind = self.word()?;
        let name = self.word()?;
        let mut mask = None;
        let mut opc = false;
        while self.plus_option()? {
            let kw = self.word()?;
            match kw.as_str() {
                "MASK" => mask = Some(self.parse_num()?),
                "OPC" => opc = true,
                _ => self.skip_option(&kw)?,
            }
        }
        let fill = match kind.as_str() {
            "LAYER" => {
                let mut geometry = Vec::new();
                self.geometries(&mut geometry)?;
                Fill::Layer {
                    layer: name,
                    mask,
                    opc,
                    geometry,
                }
            }
            "VIA" => {
                let mut pts: Vec<Point> = Vec::new();
                while self.peek_is("(") {
                    pts.push(self.point(pts.last().copied())?);
                }
                Fill::Via {
                    via: name,
                    mask,
                    opc,
                    pts,
                }
            }
            _ => return Err(self.err(format!("invalid fill kind `{kind}`"))),
        };
        self.expect(";")?;
        Ok(fill)
    }

    /// Parses the `( comp pin [+ SYNTHESIZED] )` connections after a net name.
    fn connections(&mut self, out: &mut Vec<NetPin>) -> Result<()> {
        while self.peek_is("(") {
            self.pos += 1;
            let component = self.word()?;
            let pin = self.word()?;
            let mut synthesized = false;
            while self.plus_option()? {
                let kw = self.word()?;
                if kw == "SYNTHESIZED" {
                    synthesized = true;
                }
            }
            self.expect(")")?;
            out.push(NetPin {
                component,
                pin,
                synthesized,
            });
        }
        Ok(())
    }

    fn routing_status(&mut self, kw: &str) -> Result<Option<RoutingStatus>> {
        Ok(Some(match kw {
            "COVER" => RoutingStatus::Cover,
            "FIXED" => RoutingStatus::Fixed,
            "ROUTED" => RoutingStatus::Routed,
            "NOSHIELD" => RoutingStatus::NoShield,
            "SHIELD" => RoutingStatus::Shield(self.word()?),
            _ => return Ok(None),
        }))
    }

    /// Parses `layer ... { NEW layer ... }` after a wiring status.
    ///
    /// `special` selects special wiring syntax, where a width follows the layer.
    fn paths(&mut self, special: bool) -> Result<Vec<Path>> {
        let mut paths = vec![self.path(special)?];
        while self.peek_is("NEW") {
            self.pos += 1;
            paths.push(self.path(special)?);
        }
        Ok(paths)
    }

    fn path(&mut self, special: bool) -> Result<Path> {
        let mut elems = vec![PathElem::Layer(self.word()?)];
        if special {
            elems.push(PathElem::Width(self.int()?));
        }
        let mut prev: Option<Point> = None;
        loop {
            let Some(tok) = self.peek() else {
                return Err(self.err("unexpected end of file"));
            };
            if tok.quoted {
                return Err(self.err_at(tok, "unexpected string in path"));
            }
            let text = tok.text.clone();
            match text.as_str() {
                ";" | "NEW" => break,
                "+" => {
                    let Some(kw) = self.peek_nth(1).map(|t| t.text.clone()) else {
                        break;
                    };
                    match kw.as_str() {
                        "SHAPE" if special => {
                            self.pos += 2;
                            elems.push(PathElem::Shape(self.keyword("shape")?));
                        }
                        "STYLE" if special => {
                            self.pos += 2;
                            elems.push(PathElem::Style(self.parse_num()?));
                        }
                        "MASK" if special => {
                            self.pos += 2;
                            elems.push(PathElem::Mask(self.parse_num()?));
                        }
                        _ => break,
                    }
                }
                "(" => {
                    let (x, y, ext) = self.point_ext(prev)?;
                    prev = Some(Point::new(x, y));
                    elems.push(PathElem::Point { x, y, ext });
                }
                "TAPER" => {
                    self.pos += 1;
                    elems.push(PathElem::Taper);
                }
                "TAPERRULE" => {
                    self.pos += 1;
                    elems.push(PathElem::TaperRule(self.word()?));
                }
                "STYLE" => {
                    self.pos += 1;
                    elems.push(PathElem::Style(self.parse_num()?));
                }
                "MASK" => {
                    self.pos += 1;
                    elems.push(PathElem::Mask(self.parse_num()?));
                }
                "RECT" => {
                    self.pos += 1;
                    self.expect("(")?;
                    let (dx1, dy1, dx2, dy2) = (self.int()?, self.int()?, self.int()?, self.int()?);
                    self.expect(")")?;
                    elems.push(PathElem::Rect { dx1, dy1, dx2, dy2 });
                }
                "VIRTUAL" => {
                    self.pos += 1;
                    let p = self.point(prev)?;
                    prev = Some(p);
                    elems.push(PathElem::Virtual { x: p.x, y: p.y });
                }
                _ => {
                    let name = self.word()?;
                    let orient = self.try_orient();
                    if special && self.peek_is("DO") {
                        self.pos += 1;
                        let num_x = self.parse_num()?;
                        self.expect("BY")?;
                        let num_y = self.parse_num()?;
                        self.expect("STEP")?;
                        let step_x = self.int()?;
                        let step_y = self.int()?;
                        elems.push(PathElem::ViaArray {
                            name,
                            orient,
                            num_x,
                            num_y,
                            step_x,
                            step_y,
                        });
                    } else {
                        elems.push(PathElem::Via { name, orient });
                    }
                }
            }
        }
        Ok(Path { elems })
    }

    fn parse_net(&mut self) -> Result<Net> {
        let mut net = Net::new(self.word()?);
        self.connections(&mut net.connections)?;
        while self.plus_option()? {
            let kw = self.word()?;
            if WIRING_STATUS.contains(&kw.as_str()) {
                let Some(status) = self.routing_status(&kw)? else {
                    continue;
                };
                let paths = self.paths(false)?;
                net.wiring.push(RegularWiring { status, paths });
                continue;
            }
            match kw.as_str() {
                "SHIELDNET" => net.shield_nets.push(self.word()?),
                "VPIN" => {
                    net.has_virtual_pins = true;
                    self.skip_option(&kw)?;
                }
                "SUBNET" => {
                    net.has_subnets = true;
                    self.skip_subnet()?;
                }
                "XTALK" => net.xtalk = Some(self.parse_num()?),
                "NONDEFAULTRULE" => net.nondefault_rule = Some(self.word()?),
                "SOURCE" => net.source = Some(self.keyword("source")?),
                "FIXEDBUMP" => net.fixed_bump = true,
                "FREQUENCY" => net.frequency = Some(self.parse_num()?),
                "ORIGINAL" => net.original = Some(self.word()?),
                "USE" => net.net_use = Some(self.keyword("use")?),
                "PATTERN" => net.pattern = Some(self.keyword("pattern")?),
                "ESTCAP" => net.est_cap = Some(self.parse_num()?),
                "WEIGHT" => net.weight = Some(self.parse_num()?),
                "PROPERTY" => self.properties(&mut net.properties)?,
                _ => self.skip_option(&kw)?,
            }
        }
        self.expect(";")?;
        Ok(net)
    }

    /// Skips a subnet, including any wiring it carries.
    fn skip_subnet(&mut self) -> Result<()> {
        loop {
            self.skip_option("SUBNET")?;
            let wiring_follows = self.peek_is("+")
                && self
                    .peek_nth(1)
                    .is_some_and(|t| WIRING_STATUS.contains(&t.text.as_str()));
            if !wiring_follows {
                return Ok(());
            }
            self.pos += 1;
        }
    }

    fn parse_special_net(&mut self) -> Result<SpecialNet> {
        let mut net = SpecialNet::new(self.word()?);
        self.connections(&mut net.connections)?;
        while self.plus_option()? {
            let kw = self.word()?;
            if let Some(status) = self.routing_status(&kw)? {
                let mut shape = None;
                let mut mask = None;
                loop {
                    if self.peek_is("+") && self.peek_nth(1).is_some_and(|t| t.is("SHAPE")) {
                        self.pos += 2;
                        shape = Some(self.keyword("shape")?);
                    } else if let Some(m) = self.mask_option()? {
                        mask = Some(m);
                    } else {
                        break;
                    }
                }
                let geometry_follows = self.peek_is("+")
                    && self
                        .peek_nth(1)
                        .is_some_and(|t| t.is("RECT") || t.is("POLYGON") || t.is("VIA"));
                if geometry_follows {
                    self.pos += 1;
                    let kw = self.word()?;
                    let item = self.special_shape(&kw)?;
                    net.wiring.push(SpecialWiring::Geometry(GeometrySpecialWiring {
                        status: Some(status),
                        shape,
                        mask,
                        item,
                    }));
                } else {
                    let mut paths = self.paths(true)?;
                    if let (Some(shape), Some(first)) = (shape, paths.first_mut()) {
                        first.elems.insert(2.min(first.elems.len()), PathElem::Shape(shape));
                    }
                    net.wiring
                        .push(SpecialWiring::Path(PathSpecialWiring { status, paths }));
                }
                continue;
            }
            match kw.as_str() {
                "RECT" | "POLYGON" | "VIA" => {
                    let mask = self.mask_option()?;
                    let item = self.special_shape(&kw)?;
                    net.wiring.push(SpecialWiring::Geometry(GeometrySpecialWiring {
                        status: None,
                        shape: None,
                        mask,
                        item,
                    }));
                }
                "VOLTAGE" => net.voltage = Some(self.int()?),
                "SOURCE" => net.source = Some(self.keyword("source")?),
                "FIXEDBUMP" => net.fixed_bump = true,
                "ORIGINAL" => net.original = Some(self.word()?),
                "USE" => net.net_use = Some(self.keyword("use")?),
                "PATTERN" => net.pattern = Some(self.keyword("pattern")?),
                "ESTCAP" => net.est_cap = Some(self.parse_num()?),
                "WEIGHT" => net.weight = Some(self.parse_num()?),
                "PROPERTY" => self.properties(&mut net.properties)?,
                _ => self.skip_option(&kw)?,
            }
        }
        self.expect(";")?;
        Ok(net)
    }

    /// Parses the body of a `RECT`, `POLYGON` or `VIA` special wiring shape.
    fn special_shape(&mut self, kw: &str) -> Result<SpecialShape> {
        Ok(match kw {
            "RECT" => {
                let layer = self.word()?;
                self.mask_option()?;
                SpecialShape::Rect {
                    layer,
                    rect: self.rect()?,
                }
            }
            "POLYGON" => {
                let layer = self.word()?;
                self.mask_option()?;
                SpecialShape::Polygon {
                    layer,
                    polygon: self.polygon()?,
                }
            }
            _ => {
                let name = self.word()?;
                self.mask_option()?;
                let orient = self.try_orient();
                let mut pts: Vec<Point> = Vec::new();
                while self.peek_is("(") {
                    pts.push(self.point(pts.last().copied())?);
                }
                SpecialShape::Via { name, orient, pts }
            }
        })
    }

    fn parse_group(&mut self) -> Result<Group> {
        let mut group = Group {
            name: self.word()?,
            members: Vec::new(),
            region: None,
            properties: Vec::new(),
        };
        while !self.peek_is("+") && !self.peek_is(";") {
            group.members.push(self.word()?);
        }
        while self.plus_option()? {
            let kw = self.word()?;
            match kw.as_str() {
                "REGION" => group.region = Some(self.word()?),
                "PROPERTY" => self.properties(&mut group.properties)?,
                _ => self.skip_option(&kw)?,
            }
        }
        self.expect(";")?;
        Ok(group)
    }
}
