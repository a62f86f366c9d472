mod common;

use common::*;
use gfx_pc::{GfxConfig, GfxError};

/// Appends a display list that loads the visible triangle and draws it `count` times.
fn triangles(seg: &mut Segment, count: usize) -> u32 {
    let v = seg.data(&visible_triangle());
    let dl = seg.offset();
    seg.set_combine(SHADE).vtx(v, 3, 0);
    for _ in 0..count {
        seg.tri1(0, 1, 2);
    }
    seg.end_dl();
    dl
}

#[test]
fn test_single_triangle() {
    let mut gfx = interpreter();
    let mut seg = Segment::new();
    let dl = triangles(&mut seg, 1);
    let base = seg.install(&mut gfx);

    run_frame(&mut gfx, base.add(dl)).unwrap();

    let draws = gfx.rapi().draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].num_tris, 1);
    // Position plus the shade color. Alpha blending is off, so no alpha.
    assert_eq!(draws[0].vertex_stride(), 4 + 3);
    assert_eq!(gfx.rapi().frames(), 1);
    assert_eq!(gfx.wapi().frames_presented, 1);
}

#[test]
fn test_batch_splits_at_ceiling() {
    let mut gfx = interpreter();
    let mut seg = Segment::new();
    let dl = triangles(&mut seg, 257);
    let base = seg.install(&mut gfx);

    run_frame(&mut gfx, base.add(dl)).unwrap();

    let counts: Vec<usize> = gfx.rapi().draws().iter().map(|d| d.num_tris).collect();
    assert_eq!(counts, vec![256, 1]);
    assert_eq!(gfx.num_flushes(), 2);
}

#[test]
fn test_configured_batch_size() {
    let mut gfx = interpreter_with(GfxConfig {
        max_buffered_triangles: 4,
        ..Default::default()
    });
    let mut seg = Segment::new();
    let dl = triangles(&mut seg, 10);
    let base = seg.install(&mut gfx);

    run_frame(&mut gfx, base.add(dl)).unwrap();

    let counts: Vec<usize> = gfx.rapi().draws().iter().map(|d| d.num_tris).collect();
    assert_eq!(counts, vec![4, 4, 2]);
}

#[test]
fn test_trivial_reject() {
    let mut gfx = interpreter();
    let mut seg = Segment::new();
    let v = seg.data(&offscreen_triangle());
    let dl = seg.offset();
    seg.set_combine(SHADE).vtx(v, 3, 0).tri1(0, 1, 2).end_dl();
    let base = seg.install(&mut gfx);

    run_frame(&mut gfx, base.add(dl)).unwrap();

    assert!(gfx.rapi().draws().is_empty());
}

#[test]
fn test_back_face_culling() {
    let mut gfx = interpreter();
    let mut seg = Segment::new();
    let v = seg.data(&visible_triangle());
    let dl = seg.offset();
    seg.set_combine(SHADE)
        .geometry_mode(0, 0x0400)
        .vtx(v, 3, 0)
        .tri1(0, 1, 2)
        .tri1(0, 2, 1)
        .end_dl();
    let base = seg.install(&mut gfx);

    run_frame(&mut gfx, base.add(dl)).unwrap();

    let draws = gfx.rapi().draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].num_tris, 1);
}

#[test]
fn test_scissor_change_flushes() {
    let mut gfx = interpreter();
    let mut seg = Segment::new();
    let v = seg.data(&visible_triangle());
    let dl = seg.offset();
    seg.set_combine(SHADE)
        .vtx(v, 3, 0)
        .set_scissor(0, 0, 320, 240)
        .tri1(0, 1, 2)
        .tri1(0, 1, 2)
        .set_scissor(0, 0, 160, 120)
        .tri1(0, 1, 2)
        .end_dl();
    let base = seg.install(&mut gfx);

    run_frame(&mut gfx, base.add(dl)).unwrap();

    let draws = gfx.rapi().draws();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].num_tris, 2);
    assert_eq!(draws[1].num_tris, 1);
    assert_ne!(draws[0].scissor, draws[1].scissor);
    assert_eq!(draws[0].viewport, draws[1].viewport);
}

#[test]
fn test_unknown_opcode_is_skipped() {
    let mut gfx = interpreter();
    let mut seg = Segment::new();
    let v = seg.data(&visible_triangle());
    let dl = seg.offset();
    seg.set_combine(SHADE)
        .vtx(v, 3, 0)
        .word(0x7000_0000, 0x1234_5678)
        .tri1(0, 1, 2)
        .end_dl();
    let base = seg.install(&mut gfx);

    run_frame(&mut gfx, base.add(dl)).unwrap();

    assert_eq!(gfx.rapi().draws().len(), 1);
}

#[test]
fn test_cull_display_list() {
    let mut gfx = interpreter();
    let mut seg = Segment::new();
    let mut data = offscreen_triangle();
    data.extend(visible_triangle());
    let v = seg.data(&data);

    let culled = seg.offset();
    seg.set_combine(SHADE)
        .vtx(v, 6, 0)
        .cull_dl(0, 2)
        .tri1(3, 4, 5)
        .end_dl();
    let kept = seg.offset();
    seg.set_combine(SHADE)
        .vtx(v, 6, 0)
        .cull_dl(3, 5)
        .tri1(3, 4, 5)
        .end_dl();
    let base = seg.install(&mut gfx);

    run_frame(&mut gfx, base.add(culled)).unwrap();
    assert!(gfx.rapi_mut().take_draws().is_empty());

    run_frame(&mut gfx, base.add(kept)).unwrap();
    assert_eq!(gfx.rapi_mut().take_draws().len(), 1);
}

#[test]
fn test_branch_z() {
    let mut gfx = interpreter();
    let mut seg = Segment::new();
    let v = seg.data(&visible_triangle());

    let target = seg.here();
    seg.tri1(0, 1, 2).end_dl();
    let taken = seg.offset();
    seg.set_combine(SHADE)
        .vtx(v, 3, 0)
        .branch_z(target, 0, 0x7FFF_FFFF)
        .end_dl();
    let not_taken = seg.offset();
    seg.set_combine(SHADE)
        .vtx(v, 3, 0)
        .branch_z(target, 0, -1000i32 as u32)
        .end_dl();
    let base = seg.install(&mut gfx);

    run_frame(&mut gfx, base.add(taken)).unwrap();
    assert_eq!(gfx.rapi_mut().take_draws().len(), 1);

    run_frame(&mut gfx, base.add(not_taken)).unwrap();
    assert!(gfx.rapi_mut().take_draws().is_empty());
}

#[test]
fn test_unmapped_segment_aborts_frame() {
    let mut gfx = interpreter();
    let mut seg = Segment::new();
    let v = seg.data(&visible_triangle());
    let dl = seg.offset();
    seg.set_combine(SHADE)
        .vtx(v, 3, 0)
        .tri1(0, 1, 2)
        .vtx(0x0900_0000, 3, 0)
        .tri1(0, 1, 2)
        .end_dl();
    let base = seg.install(&mut gfx);

    let result = run_frame(&mut gfx, base.add(dl));

    assert!(matches!(result, Err(GfxError::UnmappedSegment(9))));
    // Triangles before the fault are still submitted.
    assert_eq!(gfx.rapi().draws().len(), 1);
    assert_eq!(gfx.wapi().frames_presented, 1);
}

#[test]
fn test_dropped_frame() {
    let mut gfx = interpreter();
    let mut seg = Segment::new();
    let dl = triangles(&mut seg, 1);
    let base = seg.install(&mut gfx);
    gfx.wapi_mut().drop_frames = true;

    run_frame(&mut gfx, base.add(dl)).unwrap();

    assert!(gfx.rapi().draws().is_empty());
    assert_eq!(gfx.rapi().frames(), 0);
}
