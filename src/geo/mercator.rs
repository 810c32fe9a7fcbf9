/// Spherical Web Mercator, as used by slippy-map tile servers
use std::f64::consts::PI;

/// Edge length of one raster tile in pixels
pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the square Web Mercator world
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// A geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Position in world pixels at a given zoom (origin at the north-west corner)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

/// Width of the whole world in pixels at `zoom`
pub fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * f64::from(1u32 << zoom)
}

pub fn project(position: LatLng, zoom: u8) -> WorldPoint {
    let size = world_size(zoom);
    let lat = position.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();

    let x = (position.lng + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;

    WorldPoint { x, y }
}

pub fn unproject(point: WorldPoint, zoom: u8) -> LatLng {
    let size = world_size(zoom);

    let lng = point.x / size * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * point.y / size);
    let lat = n.sinh().atan().to_degrees();

    LatLng { lat, lng }
}

/// Tile column/row containing a world point, wrapped horizontally
pub fn tile_of(point: WorldPoint, zoom: u8) -> (u32, u32) {
    let count = 1i64 << zoom;
    let column = (point.x / TILE_SIZE).floor() as i64;
    let row = ((point.y / TILE_SIZE).floor() as i64).clamp(0, count - 1);
    (column.rem_euclid(count) as u32, row as u32)
}
