use test_log::test;

use super::*;
use crate::library::{IoType, SigType};
use crate::tech::LayerKind;
use crate::{Database, PropValue};

fn setup() -> (Database, Id<Block>, MasterRef) {
    let mut db = Database::new();
    let tech = db.create_tech("tech", 1000).unwrap();
    db.tech_mut(tech)
        .create_layer("M1", LayerKind::Routing)
        .unwrap();
    let lib = db.create_lib("lib", tech).unwrap();
    let l = db.lib_mut(lib);
    let inv = l.create_master("INV", 200, 1000).unwrap();
    l.create_mterm(inv, "A", IoType::Input, SigType::Signal)
        .unwrap();
    l.create_mterm(inv, "Z", IoType::Output, SigType::Signal)
        .unwrap();
    let chip = db.create_chip("chip").unwrap();
    let block = db.create_block(chip, None, "top", tech).unwrap();
    (db, block, MasterRef { lib, master: inv })
}

fn m1(db: &Database, block: Id<Block>) -> Id<crate::tech::TechLayer> {
    db.tech(db.block(block).tech).find_layer("M1").unwrap()
}

#[test]
fn create_box_vertical_segment() {
    let (db, block, _) = setup();
    let layer = m1(&db, block);
    let shape = create_box(layer, Point::new(0, 0), None, Point::new(0, 100), None, 10);
    assert_eq!(
        shape,
        Some(SBoxShape::Rect {
            layer,
            rect: Rect::from_sides(-5, 0, 5, 100)
        })
    );
}

#[test]
fn create_box_applies_only_given_extensions() {
    let (db, block, _) = setup();
    let layer = m1(&db, block);
    let shape = create_box(
        layer,
        Point::new(100, 0),
        Some(5),
        Point::new(0, 0),
        None,
        20,
    );
    assert_eq!(
        shape,
        Some(SBoxShape::Rect {
            layer,
            rect: Rect::from_sides(0, -10, 105, 10)
        })
    );
}

#[test]
fn create_box_45_degree_segment_is_an_octagon() {
    let (db, block, _) = setup();
    let layer = m1(&db, block);
    let shape = create_box(layer, Point::new(0, 0), None, Point::new(100, 100), None, 7);
    let Some(SBoxShape::Oct { oct, .. }) = shape else {
        panic!("expected an octagon, got {shape:?}");
    };
    assert_eq!(oct.center_low(), Point::new(0, 0));
    assert_eq!(oct.center_high(), Point::new(100, 100));
}

#[test]
fn create_box_skips_zero_length_segments() {
    let (db, block, _) = setup();
    let layer = m1(&db, block);
    let p = Point::new(30, 40);
    assert_eq!(create_box(layer, p, Some(5), p, Some(5), 10), None);
}

#[test]
#[should_panic(expected = "not orthogonal nor 45-degree")]
fn create_box_rejects_other_angles() {
    let (db, block, _) = setup();
    let layer = m1(&db, block);
    create_box(layer, Point::new(0, 0), None, Point::new(30, 100), None, 10);
}

#[test]
fn instances_get_one_terminal_per_master_terminal() {
    let (mut db, block, inv) = setup();
    let u1 = db.create_inst(block, "u1", inv).unwrap();
    assert!(db.create_inst(block, "u1", inv).is_none());

    let z = db.lib(inv.lib).find_mterm(inv.master, "Z").unwrap();
    let b = db.block(block);
    assert_eq!(b.inst(u1).iterms().len(), 2);
    let iterm = b.find_iterm(u1, z).unwrap();
    assert_eq!(b.iterm(iterm).inst, u1);
    assert_eq!(b.find_inst("u1"), Some(u1));
}

#[test]
fn connecting_a_terminal_moves_it_between_nets() {
    let (mut db, block, inv) = setup();
    let u1 = db.create_inst(block, "u1", inv).unwrap();
    let b = db.block_mut(block);
    let n1 = b.create_net("n1").unwrap();
    let n2 = b.create_net("n2").unwrap();
    let a = b.inst(u1).iterms()[0];

    b.connect_iterm(a, n1);
    assert_eq!(b.iterm(a).net(), Some(n1));
    b.connect_iterm(a, n2);
    assert_eq!(b.net_iterms(n1).count(), 0);
    assert_eq!(b.net_iterms(n2).map(|(id, _)| id).collect::<Vec<_>>(), vec![a]);

    b.disconnect_iterm(a);
    assert_eq!(b.iterm(a).net(), None);
    assert_eq!(b.net_iterms(n2).count(), 0);
}

#[test]
fn normalizing_a_net_restores_connection_order() {
    let (mut db, block, inv) = setup();
    let insts: Vec<_> = (0..4)
        .map(|i| db.create_inst(block, &format!("u{i}"), inv).unwrap())
        .collect();
    let b = db.block_mut(block);
    let net = b.create_net("n").unwrap();
    let iterms: Vec<_> = insts.iter().map(|&i| b.inst(i).iterms()[1]).collect();
    for &it in &iterms {
        b.connect_iterm(it, net);
    }
    b.create_property(net.into(), "first", PropValue::Int(1))
        .unwrap();
    b.create_property(net.into(), "second", PropValue::Int(2))
        .unwrap();

    b.normalize_net(net);
    let order: Vec<_> = b.net_iterms(net).map(|(id, _)| id).collect();
    assert_eq!(order, iterms);
    let props = b.property_ids(net.into());
    assert_eq!(b.properties().get(props[0]).name, "first");
}

#[test]
fn destroying_a_net_drops_its_wiring() {
    let (mut db, block, inv) = setup();
    let layer = m1(&db, block);
    let u1 = db.create_inst(block, "u1", inv).unwrap();
    let b = db.block_mut(block);
    let net = b.create_net("n").unwrap();
    let a = b.inst(u1).iterms()[0];
    b.connect_iterm(a, net);
    let bterm = b.create_bterm(net, "in").unwrap();

    let mut encoder = WireEncoder::new();
    encoder.new_path(layer, WireType::Routed, None);
    encoder.add_point(Point::new(0, 0), None);
    encoder.add_point(Point::new(0, 100), Some(5));
    let wire = encoder.commit(b, net).unwrap();
    assert_eq!(b.net(net).wire(), Some(wire));
    assert_eq!(b.wire(wire).num_paths(), 1);

    let swire = b.create_swire(net, WireType::Fixed, None);
    let shape = create_box(layer, Point::new(0, 0), None, Point::new(50, 0), None, 10).unwrap();
    b.create_sbox(swire, shape, WireShapeType::Stripe, 0);
    b.create_property(net.into(), "p", PropValue::Bool(true))
        .unwrap();

    b.destroy_net(net);
    assert_eq!(b.find_net("n"), None);
    assert_eq!(b.iterm(a).net(), None);
    assert_eq!(b.bterm(bterm).net(), None);
    assert!(b.wires.is_empty());
    assert!(b.swires.is_empty());
    assert!(b.sboxes.is_empty());
    assert!(b.properties().is_empty());
}

#[test]
fn destroying_an_instance_disconnects_its_terminals() {
    let (mut db, block, inv) = setup();
    let u1 = db.create_inst(block, "u1", inv).unwrap();
    let b = db.block_mut(block);
    let net = b.create_net("n").unwrap();
    let group = b.create_group("g").unwrap();
    b.add_group_inst(group, u1);
    for it in b.inst(u1).iterms().to_vec() {
        b.connect_iterm(it, net);
    }

    b.destroy_inst(u1);
    assert_eq!(b.net_iterms(net).count(), 0);
    assert!(b.iterms.is_empty());
    assert!(b.group(group).insts().is_empty());
    assert_eq!(b.find_inst("u1"), None);
}

#[test]
fn committing_an_empty_encoder_unroutes_the_net() {
    let (mut db, block, _) = setup();
    let layer = m1(&db, block);
    let b = db.block_mut(block);
    let net = b.create_net("n").unwrap();

    let mut encoder = WireEncoder::new();
    encoder.new_path(layer, WireType::Routed, None);
    encoder.add_point(Point::new(0, 0), None);
    encoder.add_point(Point::new(100, 0), None);
    encoder.commit(b, net).unwrap();
    assert!(encoder.is_empty());

    encoder.new_path(layer, WireType::Routed, None);
    encoder.clear();
    assert_eq!(encoder.commit(b, net), None);
    assert_eq!(b.net(net).wire(), None);
    assert!(b.wires.is_empty());
}

#[test]
fn block_terminal_pins_keep_creation_order_after_normalize() {
    let (mut db, block, _) = setup();
    let b = db.block_mut(block);
    let net = b.create_net("n").unwrap();
    let bterm = b.create_bterm(net, "n").unwrap();
    assert!(b.create_bterm(net, "n").is_none());
    let pins: Vec<_> = (0..3).map(|_| b.create_bpin(bterm)).collect();

    b.normalize_bterm(bterm);
    let order: Vec<_> = b.bterm_bpins(bterm).map(|(id, _)| id).collect();
    assert_eq!(order, pins);
    assert_eq!(
        b.net_bterms(net).map(|(id, _)| id).collect::<Vec<_>>(),
        vec![bterm]
    );
}

#[test]
fn track_grids_are_unique_per_layer() {
    let (db, block, _) = setup();
    let layer = m1(&db, block);
    let mut db = db;
    let b = db.block_mut(block);
    let grid = b.create_track_grid(layer).unwrap();
    assert!(b.create_track_grid(layer).is_none());
    b.track_grid_mut(grid).x.push(GridPattern {
        start: 100,
        num: 10,
        step: 200,
        first_mask: 0,
    });
    assert_eq!(b.find_track_grid(layer), Some(grid));
    b.destroy_track_grid(grid);
    assert_eq!(b.find_track_grid(layer), None);
}
