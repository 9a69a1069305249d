use geometry::prelude::*;
use test_log::test;

use crate::block::{GCellGrid, GridPattern, RegionKind, RuleRef, SBoxShape, WireShapeType, WireType};
use crate::hash::{hash_index, HashTable, CHAIN_LENGTH};
use crate::id::Id;
use crate::library::{IoType, SigType};
use crate::list::{intrusive_list, IntrusiveList};
use crate::object::{ObjectRef, ObjectType};
use crate::paged::PagedVec;
use crate::stream::{IStream, OStream, Persist, Schema, SchemaRev, MAGIC};
use crate::table::Table;
use crate::tech::{LayerFlags, LayerKind};
use crate::via::ViaParams;
use crate::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: String,
    number: u32,
    next: Option<Id<Node>>,
    name_next: Option<Id<Node>>,
}

impl Node {
    fn new(name: impl Into<String>, number: u32) -> Self {
        Self {
            name: name.into(),
            number,
            next: None,
            name_next: None,
        }
    }
}

hash_index!(NodeNames, Node, str, name, name_next);
intrusive_list!(NodeList, Node, next);

fn round_trip<T: Persist>(value: &T) -> T {
    let mut s = OStream::new(Vec::new(), Schema::default()).unwrap();
    value.write(&mut s).unwrap();
    let bytes = s.into_inner();
    let mut s = IStream::new(&bytes[..]).unwrap();
    T::read(&mut s).unwrap()
}

#[test]
fn paged_vec_addresses_are_stable_across_pages() {
    let mut v: PagedVec<u32> = PagedVec::new();
    for i in 0..1000 {
        v.push_back(i);
    }
    assert_eq!(v.len(), 1000);
    assert_eq!(v.num_pages(), 8);
    for i in 0..1000 {
        assert_eq!(v[i], i as u32);
    }
    assert_eq!(v.get(1000), None);
}

#[test]
fn page_table_grows_by_half() {
    let mut v: PagedVec<u32, 1> = PagedVec::new();
    let mut sizes = Vec::new();
    for i in 0..26 {
        v.push_back(i);
        if sizes.last() != Some(&v.page_table_size()) {
            sizes.push(v.page_table_size());
        }
    }
    assert_eq!(sizes, vec![1, 2, 3, 4, 6, 9, 13]);
}

#[test]
fn freed_chunks_are_reused_before_growing() {
    let mut v: PagedVec<u32, 2> = PagedVec::new();
    let chunks: Vec<_> = (0..5).map(|_| v.get_idx(3, 7)).collect();
    assert_eq!(chunks, vec![0, 3, 6, 9, 12]);
    let len = v.len();

    for &c in &chunks {
        v.free_idx(c);
    }
    let mut reused: Vec<_> = (0..5).map(|_| v.get_idx(3, 1)).collect();
    assert_eq!(v.len(), len);
    reused.sort();
    assert_eq!(reused, chunks);
    assert!(v.iter().all(|&x| x == 1));

    assert_eq!(v.get_idx(3, 0), 15);
}

#[test]
#[should_panic(expected = "chunk sizes must be uniform")]
fn chunk_sizes_must_be_uniform() {
    let mut v: PagedVec<u32> = PagedVec::new();
    v.get_idx(2, 0);
    v.get_idx(3, 0);
}

#[test]
fn paged_vec_round_trips() {
    let empty: PagedVec<u64> = PagedVec::new();
    assert_eq!(round_trip(&empty), empty);

    let mut v: PagedVec<i64, 3> = PagedVec::new();
    for i in 0..50 {
        v.push_back(i * i - 100);
    }
    let read = round_trip(&v);
    assert_eq!(read, v);
    assert_eq!(read.num_pages(), 7);
}

#[test]
fn table_reserves_oid_zero() {
    let mut t = Table::new();
    let id = t.create(Node::new("a", 0));
    assert_eq!(id.oid(), 1);
    assert!(!t.is_valid_oid(0));
    assert_eq!(t.len(), 1);
}

#[test]
fn table_reissues_freed_oids_oldest_first() {
    let mut t = Table::new();
    let ids: Vec<_> = (0..6).map(|i| t.create(Node::new(format!("n{i}"), i))).collect();
    t.destroy(ids[3]);
    t.destroy(ids[1]);
    assert!(!t.is_valid(ids[3]));
    assert_eq!(t.len(), 4);

    assert_eq!(t.create(Node::new("x", 10)), ids[3]);
    assert_eq!(t.create(Node::new("y", 11)), ids[1]);
    assert_eq!(t.create(Node::new("z", 12)).oid(), 7);
    assert_eq!(t.get(ids[1]).name, "y");
}

#[test]
#[should_panic(expected = "is not live")]
fn destroyed_objects_cannot_be_accessed() {
    let mut t = Table::new();
    let id = t.create(Node::new("a", 0));
    t.destroy(id);
    t.get(id);
}

#[test]
fn table_round_trips_across_pages() {
    let empty: Table<u32> = Table::new();
    assert_eq!(round_trip(&empty), empty);

    let mut t = Table::new();
    let ids: Vec<_> = (0..300u32).map(|i| t.create(i)).collect();
    for id in ids.iter().step_by(7) {
        t.destroy(*id);
    }
    t.set_prop_head(ids[1].oid(), Id::from_raw(3));
    let mut read = round_trip(&t);
    assert_eq!(read, t);
    assert_eq!(read.create(1000), ids[0]);
}

#[test]
fn hash_table_tracks_inserts_and_removes() {
    let mut t = Table::new();
    let mut h: HashTable<NodeNames> = HashTable::new();
    assert_eq!(h.num_buckets(), 0);
    assert_eq!(h.find(&t, "n0"), None);

    let ids: Vec<_> = (0..100)
        .map(|i| {
            let id = t.create(Node::new(format!("n{i}"), i));
            h.insert(&mut t, id);
            assert!(h.num_buckets().is_power_of_two());
            assert!(h.len() / h.num_buckets() <= CHAIN_LENGTH as usize);
            id
        })
        .collect();
    assert_eq!(h.num_buckets(), 32);
    for (i, &id) in ids.iter().enumerate() {
        assert_eq!(h.find(&t, &format!("n{i}")), Some(id));
    }

    for &id in &ids[..90] {
        assert!(h.remove(&mut t, id));
        assert!(h.num_buckets().is_power_of_two());
    }
    assert!(!h.remove(&mut t, ids[0]));
    assert_eq!(h.len(), 10);
    assert!(h.num_buckets() < 32);
    for (i, &id) in ids.iter().enumerate() {
        let found = h.find(&t, &format!("n{i}"));
        assert_eq!(found, (i >= 90).then_some(id));
    }
    assert!(h.has_member(&t, "n95"));
}

#[test]
fn hash_table_round_trips() {
    let mut t = Table::new();
    let mut h: HashTable<NodeNames> = HashTable::new();
    for i in 0..40 {
        let id = t.create(Node::new(format!("n{i}"), i));
        h.insert(&mut t, id);
    }
    let read = round_trip(&h);
    assert_eq!(read, h);
    assert_eq!(read.find(&t, "n17"), h.find(&t, "n17"));
}

#[test]
fn reversing_a_prepended_list_restores_creation_order() {
    let mut t = Table::new();
    let mut head = None;
    for i in 0..5 {
        let id = t.create(Node::new(format!("n{i}"), i));
        NodeList::push_front(&mut head, &mut t, id);
    }
    let order = |head: Option<Id<Node>>, t: &Table<Node>| -> Vec<u32> {
        NodeList::iter(head, t).map(|(_, n)| n.number).collect()
    };
    assert_eq!(order(head, &t), vec![4, 3, 2, 1, 0]);
    assert_eq!(NodeList::size(head, &t), 5);

    NodeList::normalize(&mut head, &mut t);
    assert_eq!(order(head, &t), vec![0, 1, 2, 3, 4]);

    let third = t.ids()[2];
    assert!(NodeList::unlink(&mut head, &mut t, third));
    assert!(!NodeList::unlink(&mut head, &mut t, third));
    assert_eq!(order(head, &t), vec![0, 1, 3, 4]);
}

#[test]
fn master_terminals_keep_creation_order() {
    let mut db = Database::new();
    let tech = db.create_tech("tech", 1000).unwrap();
    let lib = db.create_lib("lib", tech).unwrap();
    let lib = db.lib_mut(lib);
    let nand = lib.create_master("NAND2", 400, 1000).unwrap();
    for name in ["A", "B", "Z"] {
        lib.create_mterm(nand, name, IoType::Input, SigType::Signal)
            .unwrap();
    }
    assert!(lib
        .create_mterm(nand, "A", IoType::Input, SigType::Signal)
        .is_none());

    let names: Vec<_> = lib.mterms(nand).map(|(_, t)| t.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "Z"]);
    let z = lib.find_mterm(nand, "Z").unwrap();
    assert_eq!(lib.mterm(z).index, 2);
    assert_eq!(lib.num_mterms(nand), 3);
}

#[test]
fn layers_are_indexed_by_name_and_number() {
    let mut tech = Tech::new("tech", 2000);
    let m1 = tech.create_layer("M1", LayerKind::Routing).unwrap();
    let v1 = tech.create_layer("V1", LayerKind::Cut).unwrap();
    let m2 = tech.create_layer("M2", LayerKind::Routing).unwrap();
    assert!(tech.create_layer("M1", LayerKind::Routing).is_none());

    assert_eq!(tech.find_layer("V1"), Some(v1));
    assert_eq!(tech.find_layer_by_number(2), Some(m2));
    assert_eq!(tech.find_routing_layer(2), Some(m2));
    assert_eq!(tech.layer(m1).routing_level, 1);
    assert_eq!(tech.layer(v1).routing_level, 0);
    assert_eq!(tech.num_routing_layers(), 2);
}

#[test]
fn properties_attach_through_the_side_table() {
    let mut tech = Tech::new("tech", 1000);
    let m1 = tech.create_layer("M1", LayerKind::Routing).unwrap();
    let m2 = tech.create_layer("M2", LayerKind::Routing).unwrap();
    let obj = ObjectRef::from(m1);

    for (i, name) in ["a", "b", "c"].into_iter().enumerate() {
        assert!(tech
            .create_property(obj, name, PropValue::Int(i as i32))
            .is_some());
    }
    assert!(tech
        .create_property(obj, "a", PropValue::Bool(true))
        .is_none());
    let inst = ObjectRef {
        kind: ObjectType::Inst,
        oid: 1,
    };
    assert!(tech
        .create_property(inst, "a", PropValue::Bool(true))
        .is_none());

    let names = |tech: &Tech| -> Vec<String> {
        tech.property_ids(obj)
            .into_iter()
            .map(|id| tech.properties().get(id).name.clone())
            .collect()
    };
    assert_eq!(names(&tech), vec!["c", "b", "a"]);
    tech.normalize_properties(obj);
    assert_eq!(names(&tech), vec!["a", "b", "c"]);

    assert_eq!(tech.property(obj, "b"), Some(&PropValue::Int(1)));
    assert!(tech.property_ids(m2.into()).is_empty());

    let b = tech.find_property(obj, "b").unwrap();
    assert!(tech.destroy_property(obj, b));
    assert_eq!(names(&tech), vec!["a", "c"]);
    tech.destroy_properties(obj);
    assert!(tech.properties().is_empty());
}

#[test]
fn via_params_generate_enclosures_and_cuts() {
    let mut tech = Tech::new("tech", 1000);
    let m1 = tech.create_layer("M1", LayerKind::Routing).unwrap();
    let v1 = tech.create_layer("V1", LayerKind::Cut).unwrap();
    let m2 = tech.create_layer("M2", LayerKind::Routing).unwrap();

    let mut params = ViaParams::new(m1, v1, m2, (10, 10));
    params.num_rows = 2;
    params.num_cols = 2;
    params.cut_spacing = (5, 5);
    params.bot_enclosure = (2, 3);
    params.top_offset = Point::new(0, 10);

    let boxes = params.boxes();
    assert_eq!(boxes.len(), 6);
    assert_eq!(params.cut_bbox(), Rect::from_sides(-12, -12, 13, 13));
    assert_eq!(boxes[0].layer, m1);
    assert_eq!(boxes[0].rect, Rect::from_sides(-14, -15, 15, 16));
    assert_eq!(boxes[1].rect, Rect::from_sides(-12, -12, -2, -2));
    assert_eq!(boxes[2].rect, Rect::from_sides(3, -12, 13, -2));
    assert_eq!(boxes[3].rect, Rect::from_sides(-12, 3, -2, 13));
    assert_eq!(boxes[5].layer, m2);
    assert_eq!(boxes[5].rect, Rect::from_sides(-12, -2, 13, 23));

    let via = tech.create_via("VIA12", boxes).unwrap();
    assert_eq!(tech.via(via).layer_range(&tech), Some((m1, m2)));
}

#[test]
fn layer_flags_have_a_fixed_bit_layout() {
    assert_eq!(LayerFlags::RECT_ONLY.bits(), 1);
    assert_eq!(LayerFlags::RIGHT_WAY_ON_GRID_ONLY.bits(), 4);
    assert_eq!(LayerFlags::MASKED.bits(), 16);

    let flags = LayerFlags::RECT_ONLY | LayerFlags::MASKED;
    let mut s = OStream::new(Vec::new(), Schema::default()).unwrap();
    flags.write(&mut s).unwrap();
    let bytes = s.into_inner();
    assert_eq!(&bytes[..4], &MAGIC);
    assert_eq!(&bytes[8..], &[0x11, 0, 0, 0]);
    assert_eq!(round_trip(&flags), flags);
}

#[test]
fn streams_reject_bad_headers() {
    let err = Database::read(&b"GDS\0\x01\x00\x00\x00"[..]).unwrap_err();
    assert!(matches!(err, Error::BadMagic));

    let mut header = MAGIC.to_vec();
    header.extend_from_slice(&[1, 0, 99, 0]);
    let err = Database::read(&header[..]).unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedSchema {
            major: 1,
            minor: 99
        }
    ));

    let err = Database::read(&MAGIC[..]).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

/// A database exercising every schema-gated field.
fn sample_database() -> (Database, Id<Block>) {
    let mut db = Database::new();
    let tech = db.create_tech("tech", 1000).unwrap();
    let t = db.tech_mut(tech);
    let m1 = t.create_layer("M1", LayerKind::Routing).unwrap();
    let v1 = t.create_layer("V1", LayerKind::Cut).unwrap();
    let m2 = t.create_layer("M2", LayerKind::Routing).unwrap();
    t.layer_mut(m1).flags = LayerFlags::RECT_ONLY;
    let ndr = t.rules.create_ndr("double", false).unwrap();
    t.rules.create_layer_rule(ndr, m1, 200).unwrap();

    let lib = db.create_lib("lib", tech).unwrap();
    let l = db.lib_mut(lib);
    let inv = l.create_master("INV", 200, 1000).unwrap();
    l.create_mterm(inv, "A", IoType::Input, SigType::Signal)
        .unwrap();
    l.create_mterm(inv, "Z", IoType::Output, SigType::Signal)
        .unwrap();
    let master = db.find_master("INV").unwrap();

    let chip = db.create_chip("chip").unwrap();
    let block = db.create_block(chip, None, "top", tech).unwrap();
    let u1 = db.create_inst(block, "u1", master).unwrap();

    let b = db.block_mut(block);
    b.die_area = Polygon::from_verts(vec![
        Point::new(0, 0),
        Point::new(1000, 0),
        Point::new(1000, 1000),
        Point::new(0, 1000),
    ]);
    b.gcell_grid_mut().x.push(GridPattern {
        start: 0,
        num: 10,
        step: 100,
        first_mask: 0,
    });
    let net = b.create_net("a").unwrap();
    b.net_mut(net).ndr = Some(RuleRef::Tech(ndr));
    let iterm = b.inst(u1).iterms()[0];
    b.connect_iterm(iterm, net);

    let vdd = b.create_net("VDD").unwrap();
    let swire = b.create_swire(vdd, WireType::Routed, None);
    b.create_sbox(
        swire,
        SBoxShape::Rect {
            layer: m2,
            rect: Rect::from_sides(0, 0, 1000, 20),
        },
        WireShapeType::Stripe,
        2,
    );
    let region = b.create_region("fence").unwrap();
    b.region_mut(region).kind = RegionKind::Exclusive;
    b.create_rule_via("via_gen", None, ViaParams::new(m1, v1, m2, (10, 10)))
        .unwrap();
    b.create_property(net.into(), "weight", PropValue::Double(2.5))
        .unwrap();
    (db, block)
}

#[test]
fn database_round_trips() {
    let (db, _) = sample_database();
    let bytes = db.write(Vec::new()).unwrap();
    let read = Database::read(&bytes[..]).unwrap();
    assert_eq!(read, db);
    assert_eq!(Database::read(&read.write(Vec::new()).unwrap()[..]).unwrap(), db);
}

#[test]
fn older_schemas_omit_newer_fields() {
    let (db, block) = sample_database();
    let bytes = db
        .write_with_schema(Vec::new(), Schema::new(SchemaRev::Initial))
        .unwrap();
    let read = Database::read(&bytes[..]).unwrap();
    let (old, new) = (read.block(block), db.block(block));

    assert!(new.gcell_grid().is_some());
    assert_eq!(old.gcell_grid(), None::<&GCellGrid>);

    let net = old.find_net("a").unwrap();
    assert!(new.net(net).ndr.is_some());
    assert_eq!(old.net(net).ndr, None);
    assert_eq!(old.net_iterms(net).count(), 1);

    let vdd = old.find_net("VDD").unwrap();
    let (swire, _) = old.net_swires(vdd).next().unwrap();
    let (_, sbox) = old.swire_sboxes(swire).next().unwrap();
    assert_eq!(sbox.mask, 0);

    let region = old.find_region("fence").unwrap();
    assert_eq!(old.region(region).kind, RegionKind::Inclusive);

    let via = old.find_via("via_gen").unwrap();
    assert!(new.via(via).params.is_some());
    assert_eq!(old.via(via).params, None);
    assert_eq!(old.via(via).boxes, new.via(via).boxes);

    assert_eq!(
        old.property(net.into(), "weight"),
        Some(&PropValue::Double(2.5))
    );
}

#[test]
fn tables_resolve_through_the_database_scope() {
    let (db, block) = sample_database();
    let scope = Scope::Block(block);
    let table = db.resolve_table(scope, ObjectType::Net).unwrap();
    assert_eq!(table.object_type(), ObjectType::Net);
    assert_eq!(table.len(), 2);

    let table = db.resolve_table(scope, ObjectType::Chip).unwrap();
    assert_eq!(table.object_type(), ObjectType::Chip);

    let tech = db.block(block).tech;
    assert!(db
        .resolve_table(Scope::Tech(tech), ObjectType::Inst)
        .is_none());
    assert!(db
        .resolve_table(Scope::Tech(tech), ObjectType::TechLayer)
        .is_some());
}

#[test]
fn destroying_a_chip_destroys_its_blocks() {
    let (mut db, top) = sample_database();
    let chip = db.block(top).chip;
    let tech = db.block(top).tech;
    let child = db.create_block(chip, Some(top), "sub", tech).unwrap();
    assert!(db.create_block(chip, Some(top), "sub", tech).is_none());
    assert!(db.create_block(chip, None, "other", tech).is_none());
    assert_eq!(db.block(top).children(), &[child]);

    db.destroy_chip(chip);
    assert!(!db.is_valid_block(top));
    assert!(!db.is_valid_block(child));
    assert_eq!(db.chips().count(), 0);
}
