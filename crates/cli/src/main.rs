//! CLI for tile-slicer - slice GeoJSON features into vector-tile pieces.
//!
//! This is a thin wrapper around the tile-slicer-core library: it reads a
//! GeoJSON file, projects each feature into world tile coordinates at the
//! requested zoom (Web Mercator), slices it, and reports which tiles the
//! feature lands in and which tiles it fills entirely.

use std::collections::HashSet;
use std::f64::consts::PI;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use geo::{Coord, Geometry, MapCoords};
use geojson::GeoJson;
use tile_slicer_core::{ring_groups, TileCoord, TileExtents, TiledGeometry};

/// Web Mercator latitude limit; beyond it the projection diverges.
const MAX_LATITUDE: f64 = 85.05112878;

#[derive(Parser, Debug)]
#[command(
    name = "tile-slicer",
    about = "Slice GeoJSON features into vector-tile pieces",
    version
)]
struct Args {
    /// Input GeoJSON file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Zoom level to slice at
    #[arg(long, default_value = "10")]
    zoom: u8,

    /// Clip buffer in pixels of a 256px tile
    #[arg(long, default_value = "8")]
    buffer_pixels: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Project lng/lat degrees to world coordinates where the whole world spans
/// `world` units (Web Mercator).
fn lng_lat_to_world(c: Coord<f64>, world: f64) -> Coord<f64> {
    let x = (c.x + 180.0) / 360.0 * world;
    let lat_rad = c.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * world;
    Coord { x, y }
}

/// Pull every feature geometry out of a parsed GeoJSON document.
fn collect_geometries(geojson: GeoJson) -> Result<Vec<Geometry<f64>>> {
    let geometries = match geojson {
        GeoJson::Geometry(geometry) => vec![geometry.try_into()?],
        GeoJson::Feature(feature) => match feature.geometry {
            Some(geometry) => vec![geometry.try_into()?],
            None => Vec::new(),
        },
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .filter_map(|feature| feature.geometry)
            .map(|geometry| geometry.try_into())
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };
    Ok(geometries)
}

/// Slice one feature, dispatching points to the dedicated fast path.
fn slice_feature(
    geometry: &Geometry<f64>,
    extents: TileExtents,
    buffer: f64,
    zoom: u8,
) -> Result<TiledGeometry> {
    match geometry {
        Geometry::Point(point) => {
            let coords = [lng_lat_to_world(point.0, 1.0)];
            Ok(TiledGeometry::slice_points(extents, buffer, zoom, &coords))
        }
        Geometry::MultiPoint(points) => {
            let coords: Vec<Coord<f64>> = points
                .0
                .iter()
                .map(|point| lng_lat_to_world(point.0, 1.0))
                .collect();
            Ok(TiledGeometry::slice_points(extents, buffer, zoom, &coords))
        }
        other => {
            let world = (1u32 << zoom) as f64;
            let projected = other.map_coords(|c| lng_lat_to_world(c, world));
            let shapes = ring_groups(&projected)?;
            Ok(TiledGeometry::slice_shapes(
                extents,
                buffer,
                shapes.area,
                zoom,
                &shapes.groups,
            ))
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let content = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let geojson: GeoJson = content
        .parse()
        .with_context(|| format!("Failed to parse {} as GeoJSON", args.input.display()))?;
    let geometries = collect_geometries(geojson).context("Failed to convert feature geometry")?;

    let extents = TileExtents::full_at_zoom(args.zoom);
    let buffer = args.buffer_pixels as f64 / 256.0;

    let mut data_tiles: HashSet<TileCoord> = HashSet::new();
    let mut filled_tiles: HashSet<TileCoord> = HashSet::new();
    for (index, geometry) in geometries.iter().enumerate() {
        let sliced = slice_feature(geometry, extents, buffer, args.zoom)
            .with_context(|| format!("Failed to slice feature {index}"))?;

        let before = data_tiles.len();
        for (tile, _) in sliced.tile_data() {
            data_tiles.insert(tile);
        }
        filled_tiles.extend(sliced.filled_tiles());
        log::debug!(
            "feature {index}: {} tiles with geometry",
            data_tiles.len() - before
        );
    }

    println!(
        "✓ Sliced {} features at z{}: {} tiles with geometry, {} filled tiles",
        geometries.len(),
        args.zoom,
        data_tiles.len(),
        filled_tiles.len()
    );

    Ok(())
}
