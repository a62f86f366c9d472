mod common;

use common::*;
use gfx_pc::texture_cache::TextureCacheStats;

/// Appends a display list that draws the visible triangle with a 16x16 RGBA16 texture.
fn textured_triangle(seg: &mut Segment, texture: u32, v: u32) -> u32 {
    let dl = seg.offset();
    seg.set_combine(TEXEL0)
        .texture(0xFFFF, 0xFFFF, RENDER_TILE, true)
        .load_texture_16b(texture, 16, 16)
        .vtx(v, 3, 0)
        .tri1(0, 1, 2)
        .end_dl();
    dl
}

#[test]
fn test_texture_reused_across_frames() {
    let mut gfx = interpreter();
    let mut seg = Segment::new();
    let texture = seg.data(&rgba16_texture(16, 16, 0xF801));
    let v = seg.data(&visible_triangle());
    let dl = textured_triangle(&mut seg, texture, v);
    let base = seg.install(&mut gfx);

    run_frame(&mut gfx, base.add(dl)).unwrap();
    assert_eq!(
        gfx.texture_cache_stats(),
        TextureCacheStats {
            hits: 0,
            misses: 1,
            evictions: 0
        }
    );

    run_frame(&mut gfx, base.add(dl)).unwrap();
    assert_eq!(gfx.texture_cache_stats().hits, 1);
    assert_eq!(gfx.texture_cache_stats().misses, 1);

    let rapi = gfx.rapi();
    assert_eq!(rapi.textures().len(), 1);
    assert_eq!(rapi.total_uploads(), 1);
    let data = rapi.textures()[0].data.as_ref().unwrap();
    assert_eq!((data.width, data.height), (16, 16));
    assert_eq!(&data.rgba8[..4], &[255, 0, 0, 255]);

    assert_eq!(rapi.draws().len(), 2);
    for draw in rapi.draws() {
        assert_eq!(draw.num_tris, 1);
        assert!(draw.textures[0].is_some());
    }
    // One combiner and one program serve both frames.
    assert_eq!(gfx.combiners().len(), 1);
    assert_eq!(rapi.shaders().len(), 1);
}

#[test]
fn test_invalidation_forces_reload() {
    let mut gfx = interpreter();
    let mut seg = Segment::new();
    let texture = seg.data(&rgba16_texture(16, 16, 0x07C1));
    let v = seg.data(&visible_triangle());
    let mut frame = |invalidate: bool| {
        let dl = seg.offset();
        if invalidate {
            seg.invalidate_texture_cache(texture);
        }
        seg.set_combine(TEXEL0)
            .texture(0xFFFF, 0xFFFF, RENDER_TILE, true)
            .load_texture_tile_16b(texture, 16, 16)
            .vtx(v, 3, 0)
            .tri1(0, 1, 2)
            .end_dl();
        dl
    };
    let first = frame(false);
    let again = frame(false);
    let invalidated = frame(true);
    let base = seg.install(&mut gfx);

    run_frame(&mut gfx, base.add(first)).unwrap();
    run_frame(&mut gfx, base.add(again)).unwrap();
    assert_eq!(gfx.texture_cache_stats().hits, 1);

    run_frame(&mut gfx, base.add(invalidated)).unwrap();
    let stats = gfx.texture_cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    // The invalidated backend texture is reused for the reload.
    assert_eq!(gfx.rapi().textures().len(), 1);
    assert_eq!(gfx.rapi().total_uploads(), 2);
    let data = gfx.rapi().textures()[0].data.as_ref().unwrap();
    assert_eq!((data.width, data.height), (16, 16));
}

#[test]
fn test_host_invalidation() {
    let mut gfx = interpreter();
    let mut seg = Segment::new();
    let texture = seg.data(&rgba16_texture(16, 16, 0x07C1));
    let v = seg.data(&visible_triangle());
    let dl = textured_triangle(&mut seg, texture, v);
    let base = seg.install(&mut gfx);

    run_frame(&mut gfx, base.add(dl)).unwrap();
    gfx.invalidate_texture(base.add(texture & 0x00FF_FFFF));
    assert!(gfx.texture_cache().is_empty());
    run_frame(&mut gfx, base.add(dl)).unwrap();
    assert_eq!(gfx.texture_cache_stats().misses, 2);

    gfx.clear_texture_cache();
    assert!(gfx.texture_cache().is_empty());
    assert!(gfx.rapi().textures()[0].deleted);
}

#[test]
fn test_palette_is_part_of_key() {
    let mut gfx = interpreter();
    let mut seg = Segment::new();
    let texture = seg.data(&[0x01; 16 * 16 / 2]);
    let red = seg.data(&[0xF8, 0x01].repeat(16));
    let blue = seg.data(&[0x00, 0x3F].repeat(16));
    let v = seg.data(&visible_triangle());

    let mut frame = |tlut: u32| {
        let dl = seg.offset();
        seg.set_combine(TEXEL0)
            .texture(0xFFFF, 0xFFFF, RENDER_TILE, true)
            .load_texture_ci4(texture, tlut, 16, 16)
            .vtx(v, 3, 0)
            .tri1(0, 1, 2)
            .end_dl();
        dl
    };
    let with_red = frame(red);
    let with_blue = frame(blue);
    let base = seg.install(&mut gfx);

    run_frame(&mut gfx, base.add(with_red)).unwrap();
    run_frame(&mut gfx, base.add(with_blue)).unwrap();
    run_frame(&mut gfx, base.add(with_red)).unwrap();

    let stats = gfx.texture_cache_stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits, 1);
    assert_eq!(gfx.texture_cache().len(), 2);

    let textures = gfx.rapi().textures();
    assert_eq!(textures.len(), 2);
    let texel = |i: usize| textures[i].data.as_ref().unwrap().rgba8[..4].to_vec();
    assert_eq!(texel(0), vec![255, 0, 0, 255]);
    assert_eq!(texel(1), vec![0, 0, 255, 255]);
}

#[test]
fn test_lru_eviction() {
    let mut gfx = interpreter_with(gfx_pc::GfxConfig {
        texture_cache_capacity: 2,
        ..Default::default()
    });
    let mut seg = Segment::new();
    let a = seg.data(&rgba16_texture(16, 16, 0xF801));
    let b = seg.data(&rgba16_texture(16, 16, 0x07C1));
    let c = seg.data(&rgba16_texture(16, 16, 0x003F));
    let v = seg.data(&visible_triangle());
    let dls: Vec<u32> = [a, b, a, c, b]
        .iter()
        .map(|&texture| textured_triangle(&mut seg, texture, v))
        .collect();
    let base = seg.install(&mut gfx);

    // a, b miss; a hits and becomes most recent; c evicts b; b misses and evicts a.
    for dl in dls {
        run_frame(&mut gfx, base.add(dl)).unwrap();
    }

    assert_eq!(
        gfx.texture_cache_stats(),
        TextureCacheStats {
            hits: 1,
            misses: 4,
            evictions: 2
        }
    );
    assert_eq!(gfx.texture_cache().len(), 2);
    // Evicted ids are recycled.
    assert_eq!(gfx.rapi().textures().len(), 2);
}

#[test]
fn test_tile_width_is_part_of_key() {
    let mut gfx = interpreter();
    let mut seg = Segment::new();
    let image = seg.data(&rgba16_texture(64, 8, 0xF801));
    let v = seg.data(&visible_triangle());
    let mut frame = |width: u32| {
        let dl = seg.offset();
        seg.set_combine(TEXEL0)
            .texture(0xFFFF, 0xFFFF, RENDER_TILE, true)
            .load_subtexture_16b(image, 64, width, 8)
            .vtx(v, 3, 0)
            .tri1(0, 1, 2)
            .end_dl();
        dl
    };
    let narrow = frame(16);
    let wide = frame(32);
    let base = seg.install(&mut gfx);

    // Both loads start at the image origin.
    run_frame(&mut gfx, base.add(narrow)).unwrap();
    run_frame(&mut gfx, base.add(wide)).unwrap();

    let stats = gfx.texture_cache_stats();
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits, 0);
    let dims: Vec<(u32, u32)> = gfx
        .rapi()
        .textures()
        .iter()
        .map(|t| {
            let data = t.data.as_ref().unwrap();
            (data.width, data.height)
        })
        .collect();
    assert_eq!(dims, vec![(16, 8), (32, 8)]);
}
