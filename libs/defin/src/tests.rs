use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use geometry::prelude::*;
use odb::block::{
    NetFlags, PlacementStatus, RegionKind, RowDirection, SBoxShape, WireOp, WireType,
};
use odb::library::{IoType, SigType};
use odb::tech::{LayerKind, Tech};
use odb::via::ViaBox;
use odb::{Database, Id, PropValue, PropertyScope};
use tempfile::TempDir;
use test_log::test;

use crate::*;

const TOP: &str = r#"
VERSION 5.8 ;
DIVIDERCHAR "/" ;
BUSBITCHARS "[]" ;
DESIGN top ;
TECHNOLOGY tech ;
UNITS DISTANCE MICRONS 100 ;
PROPERTYDEFINITIONS
  COMPONENT weight INTEGER RANGE 1 100 ;
  DESIGN flow STRING "signoff" ;
END PROPERTYDEFINITIONS
DIEAREA ( 0 0 ) ( 10000 10000 ) ;
ROW row0 core 0 0 N DO 20 BY 1 STEP 200 0 ;
TRACKS X 100 DO 50 STEP 200 LAYER met1 ;
GCELLGRID Y 0 DO 11 STEP 1000 ;
COMPONENTS 2 ;
  - u1 INV + PLACED ( 100 200 ) FS + PROPERTY weight 4 ;
  - u2 NAND2 + UNPLACED ;
END COMPONENTS
PINS 1 ;
  - a + NET a + DIRECTION INPUT + USE SIGNAL
    + LAYER met2 ( -50 0 ) ( 50 100 ) + FIXED ( 0 5000 ) N ;
END PINS
SPECIALNETS 1 ;
  - VDD ( * VDD ) + ROUTED met1 200 + SHAPE STRIPE ( 0 100 ) ( 1000 * ) via12
    + USE POWER ;
END SPECIALNETS
NETS 2 ;
  - a ( PIN a ) ( u1 A ) ;
  - n1 ( u1 Y ) ( u2 A ) + ROUTED met1 ( 0 100 ) ( 1000 * ) via12 ( * 500 ) ;
END NETS
END DESIGN
"#;

struct Fixture {
    db: Database,
    tech: Id<Tech>,
    dir: TempDir,
}

impl Fixture {
    /// A technology with two routing layers and a via between them, and a
    /// library with one site and two cells.
    fn new() -> Self {
        let mut db = Database::new();
        let tech = db.create_tech("tech", 1000).unwrap();
        let t = db.tech_mut(tech);
        let met1 = t.create_layer("met1", LayerKind::Routing).unwrap();
        let via1 = t.create_layer("via1", LayerKind::Cut).unwrap();
        let met2 = t.create_layer("met2", LayerKind::Routing).unwrap();
        t.create_via(
            "via12",
            vec![
                ViaBox {
                    layer: met1,
                    rect: Rect::from_sides(-100, -100, 100, 100),
                },
                ViaBox {
                    layer: via1,
                    rect: Rect::from_sides(-50, -50, 50, 50),
                },
                ViaBox {
                    layer: met2,
                    rect: Rect::from_sides(-100, -100, 100, 100),
                },
            ],
        )
        .unwrap();

        let lib = db.create_lib("cells", tech).unwrap();
        let l = db.lib_mut(lib);
        l.create_site("core", 2000, 20000).unwrap();
        for name in ["INV", "NAND2"] {
            let m = l.create_master(name, 4000, 20000).unwrap();
            l.create_mterm(m, "A", IoType::Input, SigType::Signal).unwrap();
            l.create_mterm(m, "Y", IoType::Output, SigType::Signal).unwrap();
        }

        Self {
            db,
            tech,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn write(&self, name: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    fn import(&mut self, mode: Mode, path: &Path) -> (Result<Id<Block>>, IssueLog) {
        let tech = self.tech;
        let mut reader = DefReader::new(&mut self.db, mode);
        let result = reader.create_chip(&[], path, tech);
        (result, reader.issues().clone())
    }

    fn layer(&self, name: &str) -> Id<odb::tech::TechLayer> {
        self.db.tech(self.tech).find_layer(name).unwrap()
    }
}

#[test]
fn imports_a_design() {
    let mut f = Fixture::new();
    let path = f.write("top.def", TOP);
    let (result, issues) = f.import(Mode::Default, &path);
    let block = result.unwrap();
    assert_eq!(issues.num_errors(), 0, "{issues:?}");

    let b = f.db.block(block);
    assert_eq!(b.name, "top");
    assert_eq!(b.def_units, 100);
    assert_eq!(b.divider, b'/');
    assert_eq!(b.bus_delimiters, (b'[', b']'));
    assert_eq!(b.die_bbox(), Some(Rect::from_sides(0, 0, 100_000, 100_000)));

    let u1 = b.inst(b.find_inst("u1").unwrap());
    assert_eq!(u1.origin, Point::new(1000, 2000));
    assert_eq!(u1.orient, NamedOrientation::FS);
    assert_eq!(u1.status, PlacementStatus::Placed);
    let u2 = b.inst(b.find_inst("u2").unwrap());
    assert_eq!(u2.status, PlacementStatus::Unplaced);

    let rows: Vec<_> = b.rows().map(|(_, r)| r).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].direction, RowDirection::Horizontal);
    assert_eq!((rows[0].num_sites, rows[0].spacing), (20, 2000));

    let grid = b.find_track_grid(f.layer("met1")).unwrap();
    let x = &b.track_grid(grid).x;
    assert_eq!((x[0].start, x[0].num, x[0].step), (1000, 50, 2000));
    assert_eq!(b.gcell_grid().unwrap().y[0].step, 10_000);
}

#[test]
fn connections_keep_file_order() {
    let mut f = Fixture::new();
    let path = f.write("top.def", TOP);
    let block = f.import(Mode::Default, &path).0.unwrap();

    let b = f.db.block(block);
    let n1 = b.find_net("n1").unwrap();
    let pins: Vec<_> = b
        .net_iterms(n1)
        .map(|(_, it)| {
            let lib = f.db.lib(b.inst(it.inst).master.lib);
            format!("{}/{}", b.inst(it.inst).name, lib.mterm(it.mterm).name)
        })
        .collect();
    assert_eq!(pins, vec!["u1/Y", "u2/A"]);

    let a = b.find_net("a").unwrap();
    let bterm = b.find_bterm("a").unwrap();
    assert_eq!(b.bterm(bterm).net(), Some(a));
    assert_eq!(b.bterm(bterm).io_type, IoType::Input);
    assert_eq!(b.net_iterms(a).count(), 1);
}

#[test]
fn pin_ports_are_placed() {
    let mut f = Fixture::new();
    let path = f.write("top.def", TOP);
    let block = f.import(Mode::Default, &path).0.unwrap();

    let b = f.db.block(block);
    let bterm = b.find_bterm("a").unwrap();
    let bpins: Vec<_> = b.bterm_bpins(bterm).map(|(_, p)| p).collect();
    assert_eq!(bpins.len(), 1);
    assert_eq!(bpins[0].status, PlacementStatus::Firm);
    assert_eq!(bpins[0].boxes[0].layer, f.layer("met2"));
    assert_eq!(
        bpins[0].boxes[0].rect,
        Rect::from_sides(-500, 50_000, 500, 51_000)
    );
}

#[test]
fn regular_wiring_follows_vias() {
    let mut f = Fixture::new();
    let path = f.write("top.def", TOP);
    let block = f.import(Mode::Default, &path).0.unwrap();

    let b = f.db.block(block);
    let n1 = b.net(b.find_net("n1").unwrap());
    assert_eq!(n1.wire_type, WireType::Routed);
    let wire = b.wire(n1.wire().unwrap());
    assert_eq!(wire.num_paths(), 1);
    let met2 = f.layer("met2");
    assert!(wire
        .ops()
        .iter()
        .any(|op| matches!(op, WireOp::Via { layer, .. } if *layer == met2)));
    assert_eq!(
        wire.ops().last(),
        Some(&WireOp::Point {
            pt: Point::new(10_000, 5000),
            ext: None
        })
    );
    assert!(b.net(b.find_net("a").unwrap()).wire().is_none());
}

#[test]
fn special_wiring_is_one_swire_per_statement() {
    let mut f = Fixture::new();
    let path = f.write("top.def", TOP);
    let block = f.import(Mode::Default, &path).0.unwrap();

    let b = f.db.block(block);
    let vdd = b.find_net("VDD").unwrap();
    let net = b.net(vdd);
    assert!(net.flags.contains(NetFlags::SPECIAL | NetFlags::WILD_CONNECTED));
    assert_eq!(net.sig_type, SigType::Power);

    let swires: Vec<_> = b.net_swires(vdd).collect();
    assert_eq!(swires.len(), 1);
    let sboxes: Vec<_> = b.swire_sboxes(swires[0].0).map(|(_, s)| s.shape).collect();
    assert_eq!(sboxes.len(), 2);
    assert_eq!(
        sboxes[0],
        SBoxShape::Rect {
            layer: f.layer("met1"),
            rect: Rect::from_sides(0, 0, 10_000, 2000),
        }
    );
    assert!(matches!(
        sboxes[1],
        SBoxShape::Via { origin, .. } if origin == Point::new(10_000, 1000)
    ));
}

#[test]
fn properties_are_typed_by_their_definitions() {
    let mut f = Fixture::new();
    let path = f.write("top.def", TOP);
    let block = f.import(Mode::Default, &path).0.unwrap();

    let b = f.db.block(block);
    let u1 = b.find_inst("u1").unwrap();
    assert_eq!(b.property(u1.into(), "weight"), Some(&PropValue::Int(4)));
    assert_eq!(
        f.db.property(block.into(), "flow"),
        Some(&PropValue::String("signoff".to_string()))
    );
}

#[test]
fn floorplan_mode_updates_only_existing_objects() {
    let mut f = Fixture::new();
    let path = f.write("top.def", TOP);
    let block = f.import(Mode::Default, &path).0.unwrap();

    let update = f.write(
        "floorplan.def",
        r#"
VERSION 5.8 ;
DESIGN top ;
UNITS DISTANCE MICRONS 100 ;
COMPONENTS 2 ;
  - u1 INV + FIXED ( 500 600 ) N ;
  - u9 INV + PLACED ( 0 0 ) N ;
END COMPONENTS
NETS 1 ;
  - ghost ( u1 A ) ;
END NETS
END DESIGN
"#,
    );
    let (result, issues) = f.import(Mode::Floorplan, &update);
    assert_eq!(result.unwrap(), block);
    assert_eq!(issues.num_errors(), 0);
    assert_eq!(issues.num_warnings(), 2);
    assert!(issues.contains(144));
    assert!(issues.contains(160));

    let b = f.db.block(block);
    assert!(b.find_inst("u9").is_none());
    assert!(b.find_net("ghost").is_none());
    let u1 = b.inst(b.find_inst("u1").unwrap());
    assert_eq!(u1.origin, Point::new(5000, 6000));
    assert_eq!(u1.status, PlacementStatus::Firm);
    assert_eq!(b.net_iterms(b.find_net("n1").unwrap()).count(), 2);
}

#[test]
fn default_mode_rejects_an_existing_chip() {
    let mut f = Fixture::new();
    let path = f.write("top.def", TOP);
    f.import(Mode::Default, &path).0.unwrap();

    let (result, issues) = f.import(Mode::Default, &path);
    assert!(result.is_err());
    assert!(issues.contains(101));
    assert_eq!(f.db.chips().count(), 1);
}

#[test]
fn undefined_layers_fail_the_import_unless_tolerated() {
    let text = r#"
VERSION 5.8 ;
DESIGN top ;
UNITS DISTANCE MICRONS 1000 ;
TRACKS Y 0 DO 10 STEP 100 LAYER met1 met9 ;
END DESIGN
"#;
    let mut f = Fixture::new();
    let path = f.write("bad.def", text);
    let (result, issues) = f.import(Mode::Default, &path);
    assert!(matches!(result, Err(DefError::Failed { errors: 1 })));
    assert!(issues.contains(110));
    assert!(f.db.find_chip("top").is_none());

    let tech = f.tech;
    let mut reader = DefReader::new(&mut f.db, Mode::Default);
    reader.continue_on_errors();
    let block = reader.create_chip(&[], &path, tech).unwrap();
    assert_eq!(reader.errors(), 1);
    let met1 = f.db.tech(tech).find_layer("met1").unwrap();
    assert_eq!(f.db.block(block).track_grids().count(), 1);
    assert!(f.db.block(block).find_track_grid(met1).is_some());
}

#[test]
fn unsupported_features_stop_the_parse_unless_tolerated() {
    let text = r#"
VERSION 5.8 ;
DESIGN top ;
UNITS DISTANCE MICRONS 1000 ;
BLOCKAGES 2 ;
  - LAYER met1 POLYGON ( 0 0 ) ( 100 100 ) ( 0 100 ) ;
  - LAYER met2 RECT ( 0 0 ) ( 100 100 ) ;
END BLOCKAGES
END DESIGN
"#;
    let mut f = Fixture::new();
    let path = f.write("poly.def", text);
    let (result, issues) = f.import(Mode::Default, &path);
    assert!(matches!(result, Err(DefError::Parse(_))));
    assert!(issues.contains(133));
    assert!(f.db.find_chip("top").is_none());

    let tech = f.tech;
    let mut reader = DefReader::new(&mut f.db, Mode::Default);
    reader.continue_on_errors();
    let block = reader.create_chip(&[], &path, tech).unwrap();
    let obstructions: Vec<_> = f.db.block(block).obstructions().map(|(_, o)| o).collect();
    assert_eq!(obstructions.len(), 1);
    assert_eq!(obstructions[0].bbox, Rect::from_sides(0, 0, 100, 100));
}

#[test]
fn constructs_before_design_are_fatal() {
    let text = r#"
VERSION 5.8 ;
DIEAREA ( 0 0 ) ( 10 10 ) ;
DESIGN top ;
END DESIGN
"#;
    let mut f = Fixture::new();
    let path = f.write("early.def", text);
    let tech = f.tech;
    let mut reader = DefReader::new(&mut f.db, Mode::Default);
    reader.continue_on_errors();
    let result = reader.create_chip(&[], &path, tech);
    assert!(matches!(result, Err(DefError::Parse(_))));
    assert!(reader.issues().contains(100));
    assert_eq!(f.db.chips().count(), 0);
}

#[test]
fn units_finer_than_the_database_are_unsupported() {
    let text = r#"
VERSION 5.8 ;
DESIGN top ;
UNITS DISTANCE MICRONS 2000 ;
END DESIGN
"#;
    let mut f = Fixture::new();
    let path = f.write("fine.def", text);
    let (result, issues) = f.import(Mode::Default, &path);
    assert!(result.is_err());
    assert!(issues.contains(130));
}

#[test]
fn reads_gzipped_files() {
    let mut f = Fixture::new();
    let path = f.dir.path().join("top.def.gz");
    let mut enc = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
    enc.write_all(TOP.as_bytes()).unwrap();
    enc.finish().unwrap();

    let block = f.import(Mode::Default, &path).0.unwrap();
    assert_eq!(f.db.block(block).num_insts(), 2);
}

#[test]
fn options_load_from_toml() {
    let mut f = Fixture::new();
    let def = f.write("top.def", TOP);
    let opts = f.write("opts.toml", "skip_wires = true\nblock_name = \"core\"\n");
    let options = ReaderOptions::load(&opts).unwrap();
    assert!(options.skip_wires);

    let tech = f.tech;
    let mut reader = DefReader::with_options(&mut f.db, Mode::Default, options);
    let block = reader.create_chip(&[], &def, tech).unwrap();

    let b = f.db.block(block);
    assert_eq!(b.name, "core");
    let n1 = b.find_net("n1").unwrap();
    assert!(b.net(n1).wire().is_none());
    assert_eq!(b.net_iterms(n1).count(), 2);
    assert_eq!(b.net_swires(b.find_net("VDD").unwrap()).count(), 1);
}

#[test]
fn replace_wires_keeps_connections() {
    let mut f = Fixture::new();
    let path = f.write("top.def", TOP);
    let block = f.import(Mode::Default, &path).0.unwrap();

    let wires = f.write(
        "wires.def",
        r#"
VERSION 5.8 ;
DESIGN top ;
UNITS DISTANCE MICRONS 100 ;
NETS 1 ;
  - n1 ( u1 Y ) + ROUTED met2 ( 0 0 ) ( 0 1000 ) ;
END NETS
END DESIGN
"#,
    );
    let mut reader = DefReader::new(&mut f.db, Mode::Default);
    reader.replace_wires(block, &wires).unwrap();
    assert_eq!(reader.errors(), 0);

    let b = f.db.block(block);
    let n1 = b.find_net("n1").unwrap();
    assert_eq!(b.net_iterms(n1).count(), 2);
    let wire = b.wire(b.net(n1).wire().unwrap());
    assert!(matches!(
        wire.ops()[0],
        WireOp::Path { layer, .. } if layer == f.layer("met2")
    ));
    assert_eq!(wire.ops().len(), 3);
}

#[test]
fn regions_and_groups() {
    let text = r#"
VERSION 5.8 ;
DESIGN top ;
UNITS DISTANCE MICRONS 1000 ;
REGIONS 1 ;
  - fence1 ( 0 0 ) ( 1000 1000 ) + TYPE FENCE ;
END REGIONS
COMPONENTS 3 ;
  - u1 INV ;
  - u2 INV ;
  - v1 NAND2 ;
END COMPONENTS
GROUPS 1 ;
  - g1 u* + REGION fence1 ;
END GROUPS
END DESIGN
"#;
    let mut f = Fixture::new();
    let path = f.write("groups.def", text);
    let block = f.import(Mode::Default, &path).0.unwrap();

    let b = f.db.block(block);
    let region = b.find_region("fence1").unwrap();
    assert_eq!(b.region(region).kind, RegionKind::Exclusive);
    assert_eq!(b.region(region).boxes, vec![Rect::from_sides(0, 0, 1000, 1000)]);

    let group = b.group(b.find_group("g1").unwrap());
    assert_eq!(group.region, Some(region));
    let names: Vec<_> = group.insts().iter().map(|&i| b.inst(i).name.as_str()).collect();
    assert_eq!(names, vec!["u1", "u2"]);
}

#[test]
fn names_can_be_database_ids() {
    let mut f = Fixture::new();
    let path = f.write("top.def", TOP);
    let block = f.import(Mode::Default, &path).0.unwrap();
    let u1 = f.db.block(block).find_inst("u1").unwrap();

    let update = f.write(
        "ids.def",
        &format!(
            r#"
VERSION 5.8 ;
DESIGN top ;
UNITS DISTANCE MICRONS 100 ;
COMPONENTS 1 ;
  - I{} INV + PLACED ( 0 0 ) N ;
END COMPONENTS
END DESIGN
"#,
            u1.oid()
        ),
    );
    let tech = f.tech;
    let mut reader = DefReader::new(&mut f.db, Mode::Floorplan);
    reader.names_are_db_ids();
    reader.create_chip(&[], &update, tech).unwrap();
    assert_eq!(reader.warnings(), 0);
    assert_eq!(f.db.block(block).inst(u1).origin, Point::zero());
}

#[test]
fn def_distances_scale_to_database_units() {
    let units = Units::new(1000, 100);
    assert_eq!(units.dbdist(250), 2500);
    assert_eq!(units.dbdist(-3), -30);
    assert_eq!(units.dbdist_f64(0.25), 3);
    assert_eq!(units.dbdist_f64(-0.25), -3);
    assert_eq!(
        units.rect(Rect::from_sides(0, 0, 5, 10)),
        Rect::from_sides(0, 0, 50, 100)
    );
}

#[test]
fn pins_without_a_net_are_rejected() {
    let text = r#"
VERSION 5.8 ;
DESIGN top ;
UNITS DISTANCE MICRONS 1000 ;
PINS 3 ;
  - p + DIRECTION INPUT ;
  - q + DIRECTION OUTPUT ;
  - r + NET r + DIRECTION INPUT ;
END PINS
END DESIGN
"#;
    let mut f = Fixture::new();
    let path = f.write("pins.def", text);
    let (result, issues) = f.import(Mode::Default, &path);
    assert!(matches!(result, Err(DefError::Failed { errors: 2 })));
    assert!(issues.contains(152));

    let tech = f.tech;
    let mut reader = DefReader::new(&mut f.db, Mode::Default);
    reader.continue_on_errors();
    let block = reader.create_chip(&[], &path, tech).unwrap();
    assert_eq!(reader.errors(), 2);

    let b = f.db.block(block);
    assert!(b.find_net("").is_none());
    assert!(b.find_bterm("p").is_none());
    assert!(b.find_bterm("q").is_none());
    let r = b.find_bterm("r").unwrap();
    assert_eq!(b.bterm(r).net(), b.find_net("r"));
}

#[test]
fn rejected_units_keep_the_database_scale() {
    let text = r#"
VERSION 5.8 ;
DESIGN top ;
UNITS DISTANCE MICRONS 2000 ;
DIEAREA ( 0 0 ) ( 100 100 ) ;
END DESIGN
"#;
    let mut f = Fixture::new();
    let path = f.write("fine.def", text);
    let tech = f.tech;
    let mut reader = DefReader::new(&mut f.db, Mode::Default);
    reader.continue_on_errors();
    let block = reader.create_chip(&[], &path, tech).unwrap();
    assert_eq!(reader.errors(), 1);
    assert!(reader.issues().contains(130));
    assert!(reader.issues().contains(138));
    assert_eq!(
        f.db.block(block).die_bbox(),
        Some(Rect::from_sides(0, 0, 100, 100))
    );
}

#[test]
fn incremental_mode_replaces_wiring_of_existing_nets() {
    let mut f = Fixture::new();
    let path = f.write("top.def", TOP);
    let block = f.import(Mode::Default, &path).0.unwrap();

    let update = f.write(
        "incremental.def",
        r#"
VERSION 5.8 ;
DESIGN top ;
UNITS DISTANCE MICRONS 100 ;
SPECIALNETS 1 ;
  - VDD + ROUTED met2 100 ( 0 0 ) ( 0 1000 ) ;
END SPECIALNETS
NETS 2 ;
  - n1 ( u1 Y ) + ROUTED met2 ( 0 0 ) ( 0 1000 ) ;
  - ghost ( u1 A ) + ROUTED met1 ( 0 0 ) ( 1000 0 ) ;
END NETS
END DESIGN
"#,
    );
    let (result, issues) = f.import(Mode::Incremental, &update);
    assert_eq!(result.unwrap(), block);
    assert_eq!(issues.num_errors(), 0);
    assert_eq!(issues.num_warnings(), 1);
    assert!(issues.contains(160));

    let b = f.db.block(block);
    assert!(b.find_net("ghost").is_none());
    let n1 = b.find_net("n1").unwrap();
    assert_eq!(b.net_iterms(n1).count(), 2);
    let wire = b.wire(b.net(n1).wire().unwrap());
    assert_eq!(wire.ops().len(), 3);
    assert!(matches!(
        wire.ops()[0],
        WireOp::Path { layer, .. } if layer == f.layer("met2")
    ));

    let vdd = b.find_net("VDD").unwrap();
    let swires: Vec<_> = b.net_swires(vdd).collect();
    assert_eq!(swires.len(), 1);
    let sboxes: Vec<_> = b.swire_sboxes(swires[0].0).map(|(_, s)| s.shape).collect();
    assert_eq!(
        sboxes,
        vec![SBoxShape::Rect {
            layer: f.layer("met2"),
            rect: Rect::from_sides(-500, 0, 500, 10_000),
        }]
    );
}

const SPECIAL_SHAPES: &str = r#"
VERSION 5.8 ;
DESIGN top ;
UNITS DISTANCE MICRONS 1000 ;
SPECIALNETS 2 ;
  - VSS + ROUTED met1 200 ( 0 0 ) ( 1000 0 ) ;
  - VDD + ROUTED met1 200 ( 0 1000 ) ( 1000 * )
    + SHIELD VSS met2 100 ( 0 2000 ) ( 1000 * )
    + ROUTED met1 200 + SHAPE FILLWIRE ( 0 3000 ) ( 1000 * )
    + ROUTED met1 200 + SHAPE BLOCKWIRE ( 0 4000 ) ( 1000 * ) ;
END SPECIALNETS
END DESIGN
"#;

#[test]
fn special_wiring_keeps_shields_and_fills_by_default() {
    let mut f = Fixture::new();
    let path = f.write("shapes.def", SPECIAL_SHAPES);
    let block = f.import(Mode::Default, &path).0.unwrap();

    let b = f.db.block(block);
    let vss = b.find_net("VSS").unwrap();
    let vdd = b.find_net("VDD").unwrap();
    let swires: Vec<_> = b.net_swires(vdd).map(|(id, w)| (id, w.shield)).collect();
    assert_eq!(swires.len(), 4);
    assert_eq!(swires.iter().filter(|(_, shield)| *shield == Some(vss)).count(), 1);
    let sboxes: usize = swires.iter().map(|&(id, _)| b.swire_sboxes(id).count()).sum();
    assert_eq!(sboxes, 4);
}

#[test]
fn skipped_special_shapes_are_not_read() {
    let mut f = Fixture::new();
    let path = f.write("shapes.def", SPECIAL_SHAPES);
    let tech = f.tech;
    let mut reader = DefReader::new(&mut f.db, Mode::Default);
    reader.skip_shields().skip_fill_wires().skip_block_wires();
    let block = reader.create_chip(&[], &path, tech).unwrap();
    assert_eq!(reader.errors(), 0);

    let b = f.db.block(block);
    let vdd = b.find_net("VDD").unwrap();
    let swires: Vec<_> = b.net_swires(vdd).collect();
    assert_eq!(swires.len(), 1);
    assert_eq!(swires[0].1.shield, None);
    let sboxes: Vec<_> = b.swire_sboxes(swires[0].0).map(|(_, s)| s.shape).collect();
    assert_eq!(
        sboxes,
        vec![SBoxShape::Rect {
            layer: f.layer("met1"),
            rect: Rect::from_sides(0, 900, 1000, 1100),
        }]
    );
}

#[test]
fn assembly_mode_merges_into_the_existing_top_block() {
    let first = r#"
VERSION 5.8 ;
DESIGN top ;
UNITS DISTANCE MICRONS 1000 ;
REGIONS 1 ;
  - fence1 ( 0 0 ) ( 1000 1000 ) + TYPE FENCE ;
END REGIONS
COMPONENTS 2 ;
  - u1 INV ;
  - u2 INV ;
END COMPONENTS
GROUPS 1 ;
  - g1 u* + REGION fence1 ;
END GROUPS
END DESIGN
"#;
    let second = r#"
VERSION 5.8 ;
DESIGN top ;
UNITS DISTANCE MICRONS 1000 ;
COMPONENTS 1 ;
  - u3 NAND2 ;
END COMPONENTS
GROUPS 1 ;
  - g1 u1 u* ;
END GROUPS
END DESIGN
"#;
    let mut f = Fixture::new();
    let path = f.write("first.def", first);
    let block = f.import(Mode::Default, &path).0.unwrap();

    let path = f.write("second.def", second);
    let tech = f.tech;
    let mut reader = DefReader::new(&mut f.db, Mode::Default);
    reader.set_assembly_mode();
    assert_eq!(reader.create_chip(&[], &path, tech).unwrap(), block);
    assert_eq!(reader.errors(), 0);
    assert_eq!(f.db.chips().count(), 1);

    let b = f.db.block(block);
    assert_eq!(b.num_insts(), 3);
    let group = b.group(b.find_group("g1").unwrap());
    assert_eq!(group.region, b.find_region("fence1"));
    let names: Vec<_> = group.insts().iter().map(|&i| b.inst(i).name.as_str()).collect();
    assert_eq!(names, vec!["u1", "u2", "u3"]);
}

#[test]
fn replace_wires_reads_local_vias() {
    let mut f = Fixture::new();
    let path = f.write("top.def", TOP);
    let block = f.import(Mode::Default, &path).0.unwrap();

    let wires = f.write(
        "wires.def",
        r#"
VERSION 5.8 ;
DESIGN top ;
UNITS DISTANCE MICRONS 100 ;
VIAS 1 ;
  - local12 + RECT met1 ( -10 -10 ) ( 10 10 ) + RECT via1 ( -5 -5 ) ( 5 5 )
    + RECT met2 ( -10 -10 ) ( 10 10 ) ;
END VIAS
NETS 1 ;
  - n1 + ROUTED met1 ( 0 0 ) ( 1000 0 ) local12 ;
END NETS
END DESIGN
"#,
    );
    let mut reader = DefReader::new(&mut f.db, Mode::Default);
    reader.replace_wires(block, &wires).unwrap();
    assert_eq!(reader.errors(), 0);

    let b = f.db.block(block);
    assert!(b.find_via("local12").is_some());
    let wire = b.wire(b.net(b.find_net("n1").unwrap()).wire().unwrap());
    let met2 = f.layer("met2");
    assert!(wire
        .ops()
        .iter()
        .any(|op| matches!(op, WireOp::Via { layer, .. } if *layer == met2)));
}
