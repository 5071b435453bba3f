//! Integration tests for the box service.
//!
//! These tests run complete requests through a `ServerContext` backed by an
//! in-memory tile source:
//! - Cache miss, then hit with identical bytes
//! - Rejection of malformed requests
//! - Water inference for boxes without points
//! - Payload compression round trip

use std::sync::Arc;

use voxelserver::cache::BoxCache;
use voxelserver::classify::classes::{BLOCK_DIRT, BLOCK_STILL_WATER, GROUND};
use voxelserver::classify::DEFAULT_MAX_WATER_DEPTH;
use voxelserver::codec::{compress, decompress, BoxPayload, EMPTY_MAX_HEIGHT};
use voxelserver::config::ConfigFile;
use voxelserver::coord::TileId;
use voxelserver::point::Point;
use voxelserver::request::{BoxParams, BoxRequest, InvalidBoxError};
use voxelserver::service::{BoxError, ServeOutcome, ServerContext};
use voxelserver::tile::{MemoryTile, MemoryTileSource};

// =============================================================================
// Test Helpers
// =============================================================================

/// A 16 by 16 patch of ground points at `z` under the box at the tile corner.
fn ground_patch(z: f64) -> Vec<Point> {
    let mut points = Vec::new();
    for x in 0..16 {
        for y in 984..1000 {
            points.push(Point::new(x as f64 + 0.5, y as f64 + 0.5, z, GROUND));
        }
    }
    points
}

fn quiet_config() -> ConfigFile {
    let mut config = ConfigFile::default();
    config.stats.report_interval_secs = 0;
    config.cache.hash_bits = 4;
    config.tiles.readers = 2;
    config
}

fn context(tile: MemoryTile) -> ServerContext {
    let source = MemoryTileSource::new().with_tile(TileId::new(0, 0), tile);
    ServerContext::with_source(&quiet_config(), Arc::new(source)).unwrap()
}

/// Blocks of one column of a 16 by 16 box, bottom of the window first.
fn column_blocks(payload: &BoxPayload, x: usize, z: usize) -> Vec<u32> {
    payload
        .blocks
        .iter()
        .skip(x + z * 16)
        .step_by(16 * 16)
        .copied()
        .collect()
}

fn params() -> BoxParams {
    BoxParams::new((0, 1000, 0), (0, 0, 0), (16, 32, 16)).with_world_hash(7)
}

// =============================================================================
// Requests
// =============================================================================

#[test]
fn test_miss_generates_terrain() {
    let ctx = context(MemoryTile::new().with_points(ground_patch(10.5)));
    let mut out = Vec::new();

    let served = ctx.service().handle(&params(), &mut out).unwrap();
    assert_eq!(served.outcome, ServeOutcome::Miss { collision: false });

    let payload = BoxPayload::decode(&out).unwrap();
    assert_ne!(payload.max_height, EMPTY_MAX_HEIGHT);
    assert_eq!(payload.max_height, 11);
    assert_eq!(payload.world_hash, 7);
    assert_eq!(payload.columns.len(), 16 * 16);
    assert!(payload.blocks.contains(&BLOCK_DIRT));

    let snapshot = ctx.counters().snapshot();
    assert_eq!(snapshot.requests_served, 1);
    assert_eq!(snapshot.boxes_created, 1);
    assert_eq!(snapshot.cache_misses, 1);
    assert_eq!(ctx.registry().ref_count(TileId::new(0, 0)), Some(0));
}

#[test]
fn test_repeat_request_hits_cache() {
    let ctx = context(MemoryTile::new().with_points(ground_patch(10.5)));
    let service = ctx.service();

    let mut first = Vec::new();
    service.handle(&params(), &mut first).unwrap();
    let mut second = Vec::new();
    let served = service.handle(&params(), &mut second).unwrap();

    assert_eq!(served.outcome, ServeOutcome::Hit);
    assert_eq!(first, second);
    assert_eq!(ctx.counters().snapshot().boxes_created, 1);
    assert_eq!(ctx.counters().snapshot().cache_hits, 1);
}

#[test]
fn test_malformed_box_rejected_before_cache() {
    let ctx = context(MemoryTile::new().with_points(ground_patch(10.5)));
    let service = ctx.service();
    let mut bad = params();
    bad.sx = 3;

    let mut out = Vec::new();
    let err = service.handle(&bad, &mut out).unwrap_err();
    assert!(matches!(
        err,
        BoxError::InvalidBox(InvalidBoxError::NotPowerOfTwo { axis: "sx", .. })
    ));
    assert!(err.is_client_error());
    assert!(out.is_empty());
    assert_eq!(service.cache_stats().valid, 0);
    assert_eq!(ctx.counters().snapshot().invalid_requests, 1);
    assert_eq!(ctx.counters().snapshot().boxes_created, 0);
}

#[test]
fn test_water_box_without_points() {
    let ctx = context(
        MemoryTile::new()
            .with_uniform_color(16, [40, 70, 95])
            .with_uniform_height(16, 12.0),
    );
    let mut out = Vec::new();
    ctx.service().handle(&params(), &mut out).unwrap();

    let payload = BoxPayload::decode(&out).unwrap();
    assert_eq!(payload.max_height, 13);
    assert!(payload.columns.iter().all(|&c| c == 12));

    // Every column is a GROUND bed under max-depth water below the surface.
    let offset = payload.shrink_offset.max(0) as usize;
    for (x, z) in [(0, 0), (7, 9), (15, 15)] {
        let column = column_blocks(&payload, x, z);
        let surface = 12 - offset;
        assert_eq!(column[surface], BLOCK_STILL_WATER);
        let below = column[..surface]
            .iter()
            .rev()
            .take_while(|&&b| b == BLOCK_STILL_WATER)
            .count();
        assert_eq!(below, DEFAULT_MAX_WATER_DEPTH);
        assert_eq!(column[surface - below - 1], BLOCK_DIRT);
    }
}

#[test]
fn test_shallow_water_box_keeps_bed() {
    let ctx = context(
        MemoryTile::new()
            .with_uniform_color(16, [40, 70, 95])
            .with_uniform_height(16, 3.0),
    );
    let mut out = Vec::new();
    ctx.service().handle(&params(), &mut out).unwrap();

    let payload = BoxPayload::decode(&out).unwrap();
    assert_eq!(payload.max_height, 4);
    let column = column_blocks(&payload, 4, 4);
    assert_eq!(column[0], BLOCK_DIRT);
    assert!(column[1..=3].iter().all(|&b| b == BLOCK_STILL_WATER));
}

#[test]
fn test_missing_tile_gives_empty_box() {
    let ctx = context(MemoryTile::new().with_points(ground_patch(10.5)));
    let far = BoxParams::new((50_000, 50_000, 0), (0, 0, 0), (16, 32, 16));
    let mut out = Vec::new();
    ctx.service().handle(&far, &mut out).unwrap();
    assert_eq!(BoxPayload::decode(&out).unwrap().max_height, EMPTY_MAX_HEIGHT);
}

// =============================================================================
// Payloads
// =============================================================================

#[test]
fn test_solid_payload_compresses_and_restores() {
    let params = BoxParams::new((0, 0, 0), (0, 0, 0), (64, 64, 64));
    let request = BoxRequest::validate(&params, 1 << 22).unwrap();
    let mut payload = BoxPayload::empty(&request);
    payload.blocks = vec![BLOCK_DIRT; 64 * 64 * 64];
    payload.max_height = 64;

    let raw = payload.encode().unwrap();
    let packed = compress(&raw);
    assert!(packed.len() < raw.len() / 10);

    let restored = decompress(&packed).unwrap();
    assert_eq!(restored, raw);
    assert_eq!(BoxPayload::decode(&restored).unwrap(), payload);
}

#[test]
fn test_cached_payload_survives_compression() {
    let ctx = context(MemoryTile::new().with_points(ground_patch(10.5)));
    let service = ctx.service();
    let mut first = Vec::new();
    service.handle(&params(), &mut first).unwrap();
    assert_eq!(service.cache_stats().compressed, 1);

    let mut second = Vec::new();
    service.handle(&params(), &mut second).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_standalone_cache_is_empty() {
    let cache = BoxCache::new(3);
    assert_eq!(cache.len(), 8);
    assert_eq!(cache.stats().valid, 0);
}
