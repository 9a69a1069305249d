use std::io::Write;

use test_log::test;

use super::*;
use crate::error::ParseError;

const SAMPLE: &str = r#"
VERSION 5.8 ;
DIVIDERCHAR "/" ;
BUSBITCHARS "[]" ;
DESIGN top ;
UNITS DISTANCE MICRONS 1000 ;
# A comment line.
PROPERTYDEFINITIONS
  COMPONENT weight INTEGER RANGE 1 100 ;
  DESIGN flow STRING "signoff" ;
END PROPERTYDEFINITIONS
DIEAREA ( 0 0 ) ( 10000 10000 ) ;
ROW row0 core 0 0 N DO 20 BY 1 STEP 200 0 ;
TRACKS X 100 DO 50 STEP 200 LAYER met1 ;
GCELLGRID Y 0 DO 11 STEP 1000 ;
VIAS 1 ;
  - via12_gen + VIARULE M1M2 + CUTSIZE 40 40 + LAYERS met1 via1 met2
    + CUTSPACING 40 40 + ENCLOSURE 10 5 5 10 + ROWCOL 2 3 ;
END VIAS
COMPONENTS 2 ;
  - u1 INV + PLACED ( 100 200 ) FS + PROPERTY weight 4 ;
  - u2 NAND2 + UNPLACED ;
END COMPONENTS
PINS 1 ;
  - a + NET a + DIRECTION INPUT + USE SIGNAL
    + LAYER met2 ( -50 0 ) ( 50 100 ) + FIXED ( 0 5000 ) E ;
END PINS
SPECIALNETS 1 ;
  - VDD ( * VDD ) + ROUTED met1 200 + SHAPE STRIPE ( 0 100 ) ( 1000 * ) via12_gen
    NEW met2 200 ( 500 0 ) ( * 900 )
    + USE POWER ;
END SPECIALNETS
NETS 2 ;
  - a ( PIN a ) ( u1 A ) + ROUTED met2 ( 0 5000 ) ( 100 * 10 ) via12_gen ( 100 200 ) ;
  - n1 ( u1 Y ) ( u2 A ) + NONDEFAULTRULE wide ;
END NETS
SCANCHAINS 1 ;
  - chain + START u1 Q + STOP u2 D ;
END SCANCHAINS
END DESIGN
"#;

#[derive(Default)]
struct Recorder {
    units: Option<u32>,
    design: Option<String>,
    divider: Option<char>,
    prop_defs: Vec<PropertyDefinition>,
    die_area: Option<DieArea>,
    rows: Vec<Row>,
    tracks: Vec<Tracks>,
    grids: Vec<GcellGrid>,
    vias: Vec<Via>,
    components: Vec<Component>,
    pins: Vec<Pin>,
    special_nets: Vec<SpecialNet>,
    nets: Vec<Net>,
    ended: bool,
    abort_on_component: bool,
}

impl DefCallbacks for Recorder {
    fn units(&mut self, units: u32) -> CallbackResult {
        self.units = Some(units);
        Ok(())
    }
    fn design(&mut self, name: &str) -> CallbackResult {
        self.design = Some(name.to_string());
        Ok(())
    }
    fn divider_char(&mut self, divider: char) -> CallbackResult {
        self.divider = Some(divider);
        Ok(())
    }
    fn property_definition(&mut self, def: PropertyDefinition) -> CallbackResult {
        self.prop_defs.push(def);
        Ok(())
    }
    fn die_area(&mut self, area: DieArea) -> CallbackResult {
        self.die_area = Some(area);
        Ok(())
    }
    fn row(&mut self, row: Row) -> CallbackResult {
        self.rows.push(row);
        Ok(())
    }
    fn tracks(&mut self, tracks: Tracks) -> CallbackResult {
        self.tracks.push(tracks);
        Ok(())
    }
    fn gcell_grid(&mut self, grid: GcellGrid) -> CallbackResult {
        self.grids.push(grid);
        Ok(())
    }
    fn via(&mut self, via: Via) -> CallbackResult {
        self.vias.push(via);
        Ok(())
    }
    fn component(&mut self, component: Component) -> CallbackResult {
        if self.abort_on_component {
            return Err(Abort);
        }
        self.components.push(component);
        Ok(())
    }
    fn pin(&mut self, pin: Pin) -> CallbackResult {
        self.pins.push(pin);
        Ok(())
    }
    fn special_net(&mut self, net: SpecialNet) -> CallbackResult {
        self.special_nets.push(net);
        Ok(())
    }
    fn net(&mut self, net: Net) -> CallbackResult {
        self.nets.push(net);
        Ok(())
    }
    fn design_end(&mut self) -> CallbackResult {
        self.ended = true;
        Ok(())
    }
}

fn parse(data: &str) -> Recorder {
    let mut rec = Recorder::default();
    DefParser::checkout().parse_str(data, &mut rec).unwrap();
    rec
}

#[test]
fn parses_header_and_floorplan() {
    let rec = parse(SAMPLE);
    assert_eq!(rec.units, Some(1000));
    assert_eq!(rec.design.as_deref(), Some("top"));
    assert_eq!(rec.divider, Some('/'));
    assert!(rec.ended);

    assert_eq!(rec.prop_defs.len(), 2);
    assert_eq!(rec.prop_defs[0].range, Some((1.0, 100.0)));
    assert_eq!(rec.prop_defs[1].object, PropObject::Design);
    assert_eq!(rec.prop_defs[1].value.as_deref(), Some("signoff"));

    let area = rec.die_area.unwrap();
    assert_eq!(area.pts, vec![Point::new(0, 0), Point::new(10000, 10000)]);

    let row = &rec.rows[0];
    assert_eq!((row.num_x, row.num_y, row.step_x), (20, 1, 200));
    assert_eq!(rec.tracks[0].layers, vec!["met1".to_string()]);
    assert_eq!(rec.tracks[0].axis, Axis::X);
    assert_eq!(rec.grids[0].num, 11);

    let ViaDef::ViaRule(rule) = &rec.vias[0].def else {
        panic!("expected a generated via");
    };
    assert_eq!(rule.rowcol, Some((2, 3)));
    assert_eq!(rule.enclosure, (10, 5, 5, 10));
}

#[test]
fn parses_components_and_pins() {
    let rec = parse(SAMPLE);
    assert_eq!(rec.components.len(), 2);
    let u1 = &rec.components[0];
    assert_eq!(u1.model, "INV");
    assert_eq!(
        u1.placement,
        Some(PlacementStatus::Placed {
            pt: Point::new(100, 200),
            orient: Orientation::FS
        })
    );
    assert_eq!(u1.properties[0].val, "4");
    assert_eq!(rec.components[1].placement, Some(PlacementStatus::Unplaced));

    let pin = &rec.pins[0];
    assert_eq!(pin.net, "a");
    assert_eq!(pin.direction, Some(PinDirection::Input));
    assert_eq!(pin.ports.len(), 1);
    assert_eq!(pin.ports[0].shapes.len(), 1);
    assert!(matches!(
        pin.ports[0].placement,
        Some(PlacementStatus::Fixed { orient: Orientation::E, .. })
    ));
}

#[test]
fn resolves_star_coordinates_in_paths() {
    let rec = parse(SAMPLE);
    let a = &rec.nets[0];
    assert_eq!(a.connections[0].component, "PIN");
    let path = &a.wiring[0].paths[0];
    assert_eq!(
        path.elems,
        vec![
            PathElem::Layer("met2".into()),
            PathElem::Point { x: 0, y: 5000, ext: None },
            PathElem::Point { x: 100, y: 5000, ext: Some(10) },
            PathElem::Via { name: "via12_gen".into(), orient: None },
            PathElem::Point { x: 100, y: 200, ext: None },
        ]
    );
    assert_eq!(rec.nets[1].nondefault_rule.as_deref(), Some("wide"));
}

#[test]
fn parses_special_wiring() {
    let rec = parse(SAMPLE);
    let vdd = &rec.special_nets[0];
    assert_eq!(vdd.net_use, Some(NetUse::Power));
    assert_eq!(vdd.connections[0].component, "*");
    let SpecialWiring::Path(wiring) = &vdd.wiring[0] else {
        panic!("expected path wiring");
    };
    assert_eq!(wiring.status, RoutingStatus::Routed);
    assert_eq!(wiring.paths.len(), 2);
    assert_eq!(
        wiring.paths[0].elems[..4],
        [
            PathElem::Layer("met1".into()),
            PathElem::Width(200),
            PathElem::Shape(ShapeType::Stripe),
            PathElem::Point { x: 0, y: 100, ext: None },
        ]
    );
    assert_eq!(
        wiring.paths[1].elems[3],
        PathElem::Point { x: 500, y: 900, ext: None }
    );
}

#[test]
fn disabled_callbacks_are_not_invoked() {
    let mut rec = Recorder::default();
    let mut parser = DefParser::checkout();
    parser.set_callbacks(Callbacks::UNITS | Callbacks::DESIGN_END);
    parser.parse_str(SAMPLE, &mut rec).unwrap();
    assert_eq!(rec.units, Some(1000));
    assert!(rec.components.is_empty());
    assert!(rec.nets.is_empty());
    assert!(rec.ended);
}

#[test]
fn callback_abort_stops_parsing() {
    let mut rec = Recorder {
        abort_on_component: true,
        ..Default::default()
    };
    let err = DefParser::checkout().parse_str(SAMPLE, &mut rec).unwrap_err();
    assert!(matches!(err, ParseError::Aborted { line: 21 }), "{err}");
    assert!(rec.pins.is_empty());
    assert!(!rec.ended);
}

#[test]
fn syntax_errors_report_line() {
    let data = "VERSION 5.8 ;\nUNITS DISTANCE MICRONS lots ;\nEND DESIGN\n";
    let err = DefParser::checkout()
        .parse_str(data, &mut Recorder::default())
        .unwrap_err();
    assert_eq!(err.line(), Some(2));
}

#[test]
fn missing_end_design_is_an_error() {
    let err = DefParser::checkout()
        .parse_str("DESIGN top ;\n", &mut Recorder::default())
        .unwrap_err();
    assert!(matches!(err, ParseError::Syntax { .. }));
}

#[test]
fn lease_is_exclusive() {
    let held = DefParser::checkout();
    assert!(DefParser::try_checkout().is_none());
    drop(held);
}

#[test]
fn reads_gzipped_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("top.def.gz");
    let file = std::fs::File::create(&path).unwrap();
    let mut enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    enc.write_all(SAMPLE.as_bytes()).unwrap();
    enc.finish().unwrap();

    let mut rec = Recorder::default();
    DefParser::checkout().parse_file(&path, &mut rec).unwrap();
    assert_eq!(rec.components.len(), 2);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = DefParser::checkout()
        .parse_file("/nonexistent/top.def", &mut Recorder::default())
        .unwrap_err();
    assert!(matches!(err, ParseError::Io { .. }));
}
