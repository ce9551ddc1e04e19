use crate::test_writer::SkelWriter;
use crate::{Curve, Document, Error, VertexDelta};

fn assert_approx(a: f32, b: f32, ctx: &str) {
    if (a - b).abs() > 1e-6 {
        panic!("{ctx}: expected {b}, got {a}");
    }
}

/// 3.6 setup section shared by every animation test:
/// bones `root`, `arm`; slots `body`, `hand`; IK `aim`; transform `copy`; path `follow`
/// (fixed position, percent spacing); default skin with mesh `mesh` on `body`; empty skin
/// `alt`; event `step` with default string `left`.
fn write_setup(w: &mut SkelWriter) {
    w.header("3.6.0", 0.0, 0.0);
    w.len(2).default_bone("root", None, 6).default_bone("arm", Some(0), 6);
    w.len(2).default_slot("body", 0, 6).default_slot("hand", 1, 6);

    w.len(1);
    w.str("aim").varint(0, true).len(1).len(1).len(0).f32(1.0).u8(1);

    w.len(1);
    w.str("copy").varint(1, true).len(1).len(1).len(0).bool(false).bool(false);
    for _ in 0..10 {
        w.f32(0.0);
    }

    w.len(1);
    w.str("follow").varint(2, true).len(1).len(1).len(0);
    w.len(0).len(2).len(0);
    w.f32(0.0).f32(0.0).f32(0.0).f32(1.0).f32(1.0);

    w.len(1).len(0).len(1);
    w.str("mesh").string(None).u8(2).string(None).color([0xFF; 4]).len(3);
    for uv in [0.0, 0.0, 1.0, 0.0, 0.0, 1.0] {
        w.f32(uv);
    }
    w.len(3).u16(0).u16(1).u16(2);
    w.bool(false);
    for _ in 0..6 {
        w.f32(0.0);
    }
    w.len(3);
    w.len(1).str("alt").len(0);

    w.len(1).str("step").varint(1, false).f32(0.5).str("left");
}

/// Which timeline groups of a single animation the test fills in; every other group is empty.
#[derive(Default)]
struct Groups<'f> {
    slots: Option<&'f dyn Fn(&mut SkelWriter)>,
    bones: Option<&'f dyn Fn(&mut SkelWriter)>,
    ik: Option<&'f dyn Fn(&mut SkelWriter)>,
    transform: Option<&'f dyn Fn(&mut SkelWriter)>,
    path: Option<&'f dyn Fn(&mut SkelWriter)>,
    deform: Option<&'f dyn Fn(&mut SkelWriter)>,
    draw_order: Option<&'f dyn Fn(&mut SkelWriter)>,
    events: Option<&'f dyn Fn(&mut SkelWriter)>,
}

fn decode_animation(name: &str, groups: Groups<'_>, scale: f32) -> Result<Document, Error> {
    let mut w = SkelWriter::new();
    write_setup(&mut w);
    w.len(1).str(name);
    for group in [
        groups.slots,
        groups.bones,
        groups.ik,
        groups.transform,
        groups.path,
        groups.deform,
        groups.draw_order,
        groups.events,
    ] {
        match group {
            Some(write) => write(&mut w),
            None => {
                w.len(0);
            }
        }
    }
    Document::from_skel_bytes_with_scale(&w.finish(), scale)
}

#[test]
fn setup_section_decodes() {
    let doc = decode_animation("idle", Groups::default(), 1.0).unwrap();
    assert_eq!(doc.bones.len(), 2);
    assert_eq!(doc.slots.len(), 2);
    assert_eq!(doc.path[0].target, "body");
    assert_eq!(
        doc.skins.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["default", "alt"]
    );

    let idle = doc.animation("idle").unwrap();
    assert_eq!(idle.duration, 0.0);
    assert!(idle.slots.is_empty() && idle.bones.is_empty());
    assert!(idle.deform.is_empty());
    assert_eq!(idle.draw_order, None);
    assert_eq!(idle.events, None);
}

#[test]
fn rotate_timeline_sets_duration() {
    let bones = |w: &mut SkelWriter| {
        w.len(1).len(1).len(1);
        w.u8(0).len(3);
        w.f32(0.0).f32(0.0).u8(0);
        w.f32(0.5).f32(90.0).u8(0);
        w.f32(1.2).f32(180.0);
    };
    let doc = decode_animation(
        "spin",
        Groups {
            bones: Some(&bones),
            ..Groups::default()
        },
        1.0,
    )
    .unwrap();

    let spin = doc.animation("spin").unwrap();
    assert_approx(spin.duration, 1.2, "duration");
    let rotate = spin.bones["arm"].rotate.as_ref().unwrap();
    assert_eq!(rotate.len(), 3);
    assert_eq!(rotate[1].angle, 90.0);
    assert!(rotate.iter().all(|f| f.curve == Curve::Linear));
    assert_eq!(spin.bones["arm"].translate, None);
}

#[test]
fn curves_follow_every_frame_but_the_last() {
    let bones = |w: &mut SkelWriter| {
        w.len(1).len(0).len(2);
        w.u8(1).len(3);
        w.f32(0.0).f32(1.0).f32(2.0).u8(1);
        w.f32(0.25).f32(3.0).f32(4.0);
        w.u8(2).f32(0.25).f32(0.0).f32(0.75).f32(1.0);
        w.f32(1.0).f32(5.0).f32(6.0);
        w.u8(2).len(1);
        w.f32(0.5).f32(2.0).f32(3.0);
    };
    let doc = decode_animation(
        "walk",
        Groups {
            bones: Some(&bones),
            ..Groups::default()
        },
        2.0,
    )
    .unwrap();

    let root = &doc.animation("walk").unwrap().bones["root"];
    let translate = root.translate.as_ref().unwrap();
    assert_eq!(translate[0].curve, Curve::Stepped);
    assert_eq!(
        translate[1].curve,
        Curve::Bezier {
            cx1: 0.25,
            cy1: 0.0,
            cx2: 0.75,
            cy2: 1.0
        }
    );
    assert_eq!(translate[2].curve, Curve::Linear);
    assert_eq!((translate[2].x, translate[2].y), (10.0, 12.0));

    // Scale values are ratios.
    let scale = root.scale.as_ref().unwrap();
    assert_eq!((scale[0].x, scale[0].y), (2.0, 3.0));
    assert_approx(doc.animation("walk").unwrap().duration, 1.0, "duration");
}

#[test]
fn slot_timelines_decode() {
    let slots = |w: &mut SkelWriter| {
        w.len(1).len(1).len(3);
        w.u8(0).len(2);
        w.f32(0.0).str("fist");
        w.f32(0.4).string(None);
        w.u8(1).len(2);
        w.f32(0.0).color([0xFF, 0x00, 0x00, 0xFF]).u8(1);
        w.f32(0.3).color([0xFF; 4]);
        w.u8(2).len(1);
        w.f32(0.1).color([0xFF; 4]).color([0x00, 0x00, 0x00, 0xFF]);
    };
    let doc = decode_animation(
        "grab",
        Groups {
            slots: Some(&slots),
            ..Groups::default()
        },
        1.0,
    )
    .unwrap();

    let grab = doc.animation("grab").unwrap();
    let hand = &grab.slots["hand"];
    let attachment = hand.attachment.as_ref().unwrap();
    assert_eq!(attachment[0].name.as_deref(), Some("fist"));
    assert_eq!(attachment[1].name, None);
    let color = hand.color.as_ref().unwrap();
    assert_eq!(color[0].color.to_string(), "ff0000ff");
    assert_eq!(color[0].curve, Curve::Stepped);
    let two_color = hand.two_color.as_ref().unwrap();
    assert_eq!(two_color[0].dark.to_string(), "000000ff");
    assert_approx(grab.duration, 0.4, "duration");
}

#[test]
fn constraint_timelines_decode() {
    let ik = |w: &mut SkelWriter| {
        w.len(1).len(0).len(2);
        w.f32(0.0).f32(1.0).u8(1).u8(0);
        w.f32(0.5).f32(0.0).u8(0xFF);
    };
    let transform = |w: &mut SkelWriter| {
        w.len(1).len(0).len(1);
        w.f32(0.7).f32(1.0).f32(0.5).f32(0.25).f32(0.125);
    };
    let path = |w: &mut SkelWriter| {
        w.len(1).len(0).len(3);
        w.u8(0).len(1).f32(0.0).f32(10.0);
        w.u8(1).len(1).f32(0.0).f32(0.5);
        w.u8(2).len(2);
        w.f32(0.0).f32(1.0).f32(1.0).u8(1);
        w.f32(2.0).f32(0.0).f32(0.5);
    };
    let doc = decode_animation(
        "reach",
        Groups {
            ik: Some(&ik),
            transform: Some(&transform),
            path: Some(&path),
            ..Groups::default()
        },
        3.0,
    )
    .unwrap();

    let reach = doc.animation("reach").unwrap();
    let aim = &reach.ik["aim"];
    assert!(aim[0].bend_positive);
    assert!(!aim[1].bend_positive);
    assert_eq!(aim[1].mix, 0.0);

    let copy = &reach.transform["copy"];
    assert_eq!(copy[0].time, 0.7);
    assert_eq!(copy[0].shear_mix, 0.125);

    let follow = &reach.paths["follow"];
    // Fixed position is a length, percent spacing is not.
    assert_eq!(follow.position.as_ref().unwrap()[0].position, 30.0);
    assert_eq!(follow.spacing.as_ref().unwrap()[0].spacing, 0.5);
    let mix = follow.mix.as_ref().unwrap();
    assert_eq!(mix[0].curve, Curve::Stepped);
    assert_eq!(mix[1].translate_mix, 0.5);

    assert_approx(reach.duration, 2.0, "duration");
}

#[test]
fn deform_frames_carry_sparse_offsets() {
    let deform = |w: &mut SkelWriter| {
        w.len(1).len(0);
        w.len(1).len(0);
        w.len(1).str("mesh").len(2);
        w.f32(0.0).len(0).u8(0);
        w.f32(0.6).len(2).len(4).f32(1.5).f32(-1.0);
    };
    let doc = decode_animation(
        "bulge",
        Groups {
            deform: Some(&deform),
            ..Groups::default()
        },
        2.0,
    )
    .unwrap();

    let bulge = doc.animation("bulge").unwrap();
    let frames = &bulge.deform["default"]["body"]["mesh"];
    assert_eq!(frames[0].delta, None);
    assert_eq!(
        frames[1].delta,
        Some(VertexDelta {
            offset: 4,
            vertices: vec![3.0, -2.0],
        })
    );
    assert_approx(bulge.duration, 0.6, "duration");
}

#[test]
fn deform_skin_index_is_checked() {
    let deform = |w: &mut SkelWriter| {
        w.len(1).len(2);
    };
    let result = decode_animation(
        "bad",
        Groups {
            deform: Some(&deform),
            ..Groups::default()
        },
        1.0,
    );
    assert!(matches!(
        result,
        Err(Error::UnknownReference { kind: "skin", index: 2, len: 2, .. })
    ));
}

#[test]
fn draw_order_offsets_are_signed() {
    let draw_order = |w: &mut SkelWriter| {
        w.len(1);
        w.f32(0.8).len(2);
        w.len(1).varint(-1, true);
        w.len(0).varint(1, true);
    };
    let doc = decode_animation(
        "swap",
        Groups {
            draw_order: Some(&draw_order),
            ..Groups::default()
        },
        1.0,
    )
    .unwrap();

    let swap = doc.animation("swap").unwrap();
    let frames = swap.draw_order.as_ref().unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].offsets[0].slot, "hand");
    assert_eq!(frames[0].offsets[0].offset, -1);
    assert_eq!(frames[0].offsets[1].slot, "body");
    assert_eq!(frames[0].offsets[1].offset, 1);
    assert_approx(swap.duration, 0.8, "duration");
}

#[test]
fn event_keys_fall_back_to_default_string() {
    let events = |w: &mut SkelWriter| {
        w.len(2);
        w.f32(0.1).len(0).varint(5, false).f32(0.25).bool(false);
        w.f32(0.9).len(0).varint(-2, false).f32(0.0).bool(true).str("right");
    };
    let doc = decode_animation(
        "run",
        Groups {
            events: Some(&events),
            ..Groups::default()
        },
        1.0,
    )
    .unwrap();

    let run = doc.animation("run").unwrap();
    let keys = run.events.as_ref().unwrap();
    assert_eq!(keys[0].name, "step");
    assert_eq!(keys[0].int_value, 5);
    assert_eq!(keys[0].float_value, 0.25);
    assert_eq!(keys[0].string.as_deref(), Some("left"));
    assert_eq!(keys[1].int_value, -2);
    assert_eq!(keys[1].string.as_deref(), Some("right"));
    assert_approx(run.duration, 0.9, "duration");
}

#[test]
fn unknown_event_index_is_reported() {
    let events = |w: &mut SkelWriter| {
        w.len(1).f32(0.0).len(1);
    };
    let result = decode_animation(
        "bad",
        Groups {
            events: Some(&events),
            ..Groups::default()
        },
        1.0,
    );
    assert!(matches!(
        result,
        Err(Error::UnknownReference { kind: "event", index: 1, len: 1, .. })
    ));
}

#[test]
fn empty_timelines_do_not_extend_duration() {
    let bones = |w: &mut SkelWriter| {
        w.len(1).len(0).len(2);
        w.u8(0).len(0);
        w.u8(3).len(1).f32(0.3).f32(1.0).f32(0.0);
    };
    let doc = decode_animation(
        "lean",
        Groups {
            bones: Some(&bones),
            ..Groups::default()
        },
        1.0,
    )
    .unwrap();

    let lean = doc.animation("lean").unwrap();
    assert_eq!(lean.bones["root"].rotate.as_ref().map(Vec::len), Some(0));
    assert_eq!(lean.bones["root"].shear.as_ref().unwrap()[0].x, 1.0);
    assert_approx(lean.duration, 0.3, "duration");
}

#[test]
fn unknown_curve_type_is_reported() {
    let bones = |w: &mut SkelWriter| {
        w.len(1).len(0).len(1);
        w.u8(0).len(2);
        w.f32(0.0).f32(0.0).u8(3);
    };
    match decode_animation(
        "bad",
        Groups {
            bones: Some(&bones),
            ..Groups::default()
        },
        1.0,
    ) {
        Err(Error::InvalidValue { context, value, .. }) => {
            assert_eq!(context, "curve type");
            assert_eq!(value, 3);
        }
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

#[test]
fn unknown_timeline_type_is_reported() {
    let bones = |w: &mut SkelWriter| {
        w.len(1).len(0).len(1).u8(7).len(0);
    };
    let result = decode_animation(
        "bad",
        Groups {
            bones: Some(&bones),
            ..Groups::default()
        },
        1.0,
    );
    assert!(matches!(
        result,
        Err(Error::InvalidValue { context: "bone timeline type", value: 7, .. })
    ));
}
