/// Tile map shown under every reseña card
///
/// `MapView` is the per-card map instance: viewport, open popup and
/// lifecycle. `MapCanvas` is the canvas program drawing tiles, markers
/// and the popup for one frame and turning mouse input into `MapEvent`s.
use cgmath::Vector2;
use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Frame, Image, Path, Program, Stroke, Text};
use iced::{Color, Pixels, Point, Rectangle, Renderer, Size, Theme};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::geo::mercator::{self, LatLng, WorldPoint, TILE_SIZE};
use crate::geo::sexagesimal::{self, Axis};
use crate::state::data::Resena;
use crate::tiles::{TileCache, TileKey, TileState};

/// Zoom level a new map starts at
pub const INITIAL_ZOOM: u8 = 13;
const MIN_ZOOM: u8 = 1;
const MAX_ZOOM: u8 = 19;

/// Height of the map widget in every card
pub const MAP_HEIGHT: f32 = 400.0;

/// Widest map expected on screen; tiles are requested for this width
const VIEWPORT_HINT: Size = Size::new(1600.0, MAP_HEIGHT);

/// Pointer movement below this is a click, not a drag
const DRAG_THRESHOLD: f32 = 3.0;

/// Marker icon: 24x36 anchored at the bottom center
const MARKER_HEAD_RADIUS: f32 = 10.0;
const MARKER_HEIGHT: f32 = 36.0;

const DEFAULT_MARKER: Color = Color::from_rgb(0.165, 0.506, 0.796);
const OWNER_MARKER: Color = Color::from_rgb(0.796, 0.169, 0.243);

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// One record placed on a map
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Record the marker stands for
    pub id: i64,
    pub position: LatLng,
    /// The record owning the map
    pub highlighted: bool,
    pub popup: Vec<String>,
}

/// Markers of the map owned by `owner_id`: the owner's one is highlighted
pub fn highlight(markers: &[Marker], owner_id: i64) -> Vec<Marker> {
    markers
        .iter()
        .map(|m| Marker {
            highlighted: m.id == owner_id,
            ..m.clone()
        })
        .collect()
}

/// Place one marker per record in `visible`, none highlighted yet.
///
/// Records whose coordinates cannot be decoded are left off the map.
pub fn place_markers(visible: &[&Resena]) -> Vec<Marker> {
    visible
        .iter()
        .filter_map(|r| {
            let position = match decode_position(r) {
                Ok(position) => position,
                Err(e) => {
                    warn!("📍 No marker for reseña {}: {e}", r.num);
                    return None;
                }
            };
            Some(Marker {
                id: r.id,
                position,
                highlighted: false,
                popup: vec![
                    r.title.clone(),
                    format!("Num. expediente: {}", r.num),
                    format!("Latitud: {}", r.latitude),
                    format!("Longitud: {}", r.longitude),
                ],
            })
        })
        .collect()
}

fn decode_position(r: &Resena) -> Result<LatLng, sexagesimal::CoordError> {
    Ok(LatLng::new(
        sexagesimal::decode(&r.latitude)?,
        sexagesimal::decode(&r.longitude)?,
    ))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub anchor: LatLng,
    pub lines: Vec<String>,
    /// Lift above the anchor in pixels (markers open above their icon)
    pub lift: f32,
}

/// Input from the canvas
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// Dragged by this many screen pixels
    Panned(Vector2<f64>),
    /// Wheel steps, with the cursor offset from the map center in pixels
    Zoomed { steps: i32, anchor: Vector2<f64> },
    /// Click on an empty spot of the map
    Clicked(LatLng),
    MarkerClicked(Popup),
}

/// Per-card map instance
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    instance: u64,
    center: LatLng,
    zoom: u8,
    popup: Option<Popup>,
    disposed: bool,
}

impl MapView {
    /// Create the map centered on `owner`'s coordinates
    pub fn new(owner: &Resena) -> Self {
        let center = decode_position(owner).unwrap_or_else(|e| {
            warn!("🗺️  Reseña {} has no usable position ({e}), centering on 0,0", owner.num);
            LatLng::new(0.0, 0.0)
        });

        let instance = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        debug!("🗺️  Map #{instance} created for reseña {}", owner.num);

        Self {
            instance,
            center,
            zoom: INITIAL_ZOOM,
            popup: None,
            disposed: false,
        }
    }

    #[cfg(test)]
    pub fn instance(&self) -> u64 {
        self.instance
    }

    #[cfg(test)]
    pub fn center(&self) -> LatLng {
        self.center
    }

    #[cfg(test)]
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    #[cfg(test)]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release the viewport; the map asks for no more tiles afterwards
    pub fn dispose(&mut self) {
        if !self.disposed {
            debug!("🗺️  Map #{} disposed", self.instance);
        }
        self.disposed = true;
        self.popup = None;
    }

    pub fn update(&mut self, event: MapEvent) {
        if self.disposed {
            return;
        }
        match event {
            MapEvent::Panned(delta) => {
                let world = mercator::project(self.center, self.zoom);
                self.center = unproject_wrapped(
                    WorldPoint {
                        x: world.x - delta.x,
                        y: world.y - delta.y,
                    },
                    self.zoom,
                );
            }
            MapEvent::Zoomed { steps, anchor } => self.zoom_at(steps, anchor),
            MapEvent::Clicked(position) => self.click(position),
            MapEvent::MarkerClicked(popup) => self.popup = Some(popup),
        }
    }

    /// Read-only popup with the clicked point in sexagesimal form
    fn click(&mut self, position: LatLng) {
        self.popup = Some(Popup {
            anchor: position,
            lines: vec![
                "Ha clicado en las coordenadas:".to_string(),
                format!("Latitud: {}", sexagesimal::encode(position.lat, Axis::Lat)),
                format!("Longitud: {}", sexagesimal::encode(position.lng, Axis::Lng)),
            ],
            lift: 0.0,
        });
    }

    /// Change zoom keeping the world point under `anchor` in place
    fn zoom_at(&mut self, steps: i32, anchor: Vector2<f64>) {
        let target = (i32::from(self.zoom) + steps).clamp(i32::from(MIN_ZOOM), i32::from(MAX_ZOOM)) as u8;
        if target == self.zoom {
            return;
        }

        let world = mercator::project(self.center, self.zoom);
        let factor = 2f64.powi(i32::from(target) - i32::from(self.zoom));
        let under_cursor = Vector2::new(world.x + anchor.x, world.y + anchor.y) * factor;

        self.center = unproject_wrapped(
            WorldPoint {
                x: under_cursor.x - anchor.x,
                y: under_cursor.y - anchor.y,
            },
            target,
        );
        self.zoom = target;
    }

    /// Top-left corner of a viewport of `size` in world pixels
    fn origin(&self, size: Size) -> WorldPoint {
        let center = mercator::project(self.center, self.zoom);
        WorldPoint {
            x: center.x - f64::from(size.width) / 2.0,
            y: center.y - f64::from(size.height) / 2.0,
        }
    }

    fn to_screen(&self, position: LatLng, size: Size) -> Point {
        let origin = self.origin(size);
        let world = mercator::project(position, self.zoom);
        let span = mercator::world_size(self.zoom);

        // Pick the copy of the world closest to the viewport
        let left = f64::from(size.width) / 2.0 - span / 2.0;
        let dx = (world.x - origin.x - left).rem_euclid(span) + left;

        Point::new(dx as f32, (world.y - origin.y) as f32)
    }

    fn to_position(&self, point: Point, size: Size) -> LatLng {
        let origin = self.origin(size);
        unproject_wrapped(
            WorldPoint {
                x: origin.x + f64::from(point.x),
                y: origin.y + f64::from(point.y),
            },
            self.zoom,
        )
    }

    /// Tiles covering a viewport of `size`, with their screen offsets
    fn tiles_in(&self, size: Size) -> Vec<(TileKey, Point)> {
        if self.disposed {
            return Vec::new();
        }
        let origin = self.origin(size);
        let count = 1i64 << self.zoom;

        let first_col = (origin.x / TILE_SIZE).floor() as i64;
        let last_col = ((origin.x + f64::from(size.width)) / TILE_SIZE).floor() as i64;
        let first_row = ((origin.y / TILE_SIZE).floor() as i64).max(0);
        let last_row = (((origin.y + f64::from(size.height)) / TILE_SIZE).floor() as i64).min(count - 1);

        let mut tiles = Vec::new();
        for row in first_row..=last_row {
            for col in first_col..=last_col {
                let corner = WorldPoint {
                    x: col as f64 * TILE_SIZE,
                    y: row as f64 * TILE_SIZE,
                };
                let (x, y) = mercator::tile_of(corner, self.zoom);
                let key = TileKey { z: self.zoom, x, y };
                let offset = Point::new(
                    (col as f64 * TILE_SIZE - origin.x) as f32,
                    (row as f64 * TILE_SIZE - origin.y) as f32,
                );
                tiles.push((key, offset));
            }
        }
        tiles
    }

    /// Tiles this map wants loaded
    pub fn wanted_tiles(&self) -> Vec<TileKey> {
        self.tiles_in(VIEWPORT_HINT)
            .into_iter()
            .map(|(key, _)| key)
            .collect()
    }
}

/// Unproject and bring the longitude back into [-180, 180]
fn unproject_wrapped(point: WorldPoint, zoom: u8) -> LatLng {
    let span = mercator::world_size(zoom);
    let y = point.y.clamp(0.0, span);
    let mut position = mercator::unproject(WorldPoint { x: point.x, y }, zoom);
    position.lng = (position.lng + 180.0).rem_euclid(360.0) - 180.0;
    position
}

/// Canvas program drawing one map
pub struct MapCanvas<'a> {
    pub view: &'a MapView,
    pub markers: Vec<Marker>,
    pub tiles: &'a TileCache,
}

impl MapCanvas<'_> {
    /// Index of the marker whose icon contains `point`
    fn marker_at(&self, point: Point, size: Size) -> Option<usize> {
        // Later markers are drawn on top, so test them first
        self.markers.iter().enumerate().rev().find_map(|(i, marker)| {
            let tip = self.view.to_screen(marker.position, size);
            let inside = (point.x - tip.x).abs() <= MARKER_HEAD_RADIUS + 2.0
                && point.y <= tip.y
                && point.y >= tip.y - MARKER_HEIGHT;
            inside.then_some(i)
        })
    }

    fn draw_tiles(&self, frame: &mut Frame, size: Size) {
        for (key, offset) in self.view.tiles_in(size) {
            let bounds = Rectangle::new(offset, Size::new(TILE_SIZE as f32, TILE_SIZE as f32));
            match self.tiles.get(&key) {
                Some(TileState::Ready(handle)) => {
                    frame.draw_image(bounds, Image::new(handle.clone()));
                }
                _ => {
                    frame.fill_rectangle(bounds.position(), bounds.size(), Color::from_rgb8(0xdd, 0xdd, 0xdd));
                    frame.stroke(
                        &Path::rectangle(bounds.position(), bounds.size()),
                        Stroke::default()
                            .with_color(Color::from_rgb8(0xcc, 0xcc, 0xcc))
                            .with_width(1.0),
                    );
                }
            }
        }
    }

    fn draw_marker(&self, frame: &mut Frame, marker: &Marker, size: Size) {
        let tip = self.view.to_screen(marker.position, size);
        let head = Point::new(tip.x, tip.y - MARKER_HEIGHT + MARKER_HEAD_RADIUS + 2.0);
        let color = if marker.highlighted {
            OWNER_MARKER
        } else {
            DEFAULT_MARKER
        };

        let pin = Path::new(|b| {
            b.move_to(tip);
            b.line_to(Point::new(head.x - MARKER_HEAD_RADIUS * 0.8, head.y + MARKER_HEAD_RADIUS * 0.6));
            b.line_to(Point::new(head.x + MARKER_HEAD_RADIUS * 0.8, head.y + MARKER_HEAD_RADIUS * 0.6));
            b.close();
        });
        frame.fill(&pin, color);
        frame.fill(&Path::circle(head, MARKER_HEAD_RADIUS), color);
        frame.fill(&Path::circle(head, MARKER_HEAD_RADIUS * 0.4), Color::WHITE);
    }

    fn draw_popup(&self, frame: &mut Frame, popup: &Popup, size: Size) {
        const LINE: f32 = 18.0;
        const PAD: f32 = 8.0;

        let anchor = self.view.to_screen(popup.anchor, size);
        let longest = popup.lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let width = longest as f32 * 7.2 + PAD * 2.0;
        let height = popup.lines.len() as f32 * LINE + PAD * 2.0;
        let top_left = Point::new(anchor.x - width / 2.0, anchor.y - popup.lift - height - 8.0);

        let arrow = Path::new(|b| {
            b.move_to(Point::new(anchor.x, anchor.y - popup.lift));
            b.line_to(Point::new(anchor.x - 8.0, anchor.y - popup.lift - 9.0));
            b.line_to(Point::new(anchor.x + 8.0, anchor.y - popup.lift - 9.0));
            b.close();
        });
        let body = Path::rectangle(top_left, Size::new(width, height));
        frame.fill(&body, Color::WHITE);
        frame.fill(&arrow, Color::WHITE);
        frame.stroke(&body, Stroke::default().with_color(Color::from_rgb8(0x99, 0x99, 0x99)).with_width(1.0));

        for (i, line) in popup.lines.iter().enumerate() {
            frame.fill_text(Text {
                content: line.clone(),
                position: Point::new(top_left.x + PAD, top_left.y + PAD + i as f32 * LINE),
                color: Color::from_rgb8(0x33, 0x33, 0x33),
                size: Pixels(13.0),
                ..Text::default()
            });
        }
    }
}

impl Program<MapEvent> for MapCanvas<'_> {
    type State = DragState;

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<canvas::Geometry> {
        let size = bounds.size();
        let mut frame = Frame::new(renderer, size);

        frame.fill_rectangle(Point::ORIGIN, size, Color::from_rgb8(0xe5, 0xe3, 0xdf));
        self.draw_tiles(&mut frame, size);

        for marker in &self.markers {
            self.draw_marker(&mut frame, marker, size);
        }

        if let Some(popup) = self.view.popup() {
            self.draw_popup(&mut frame, popup, size);
        }

        frame.fill_text(Text {
            content: "© OpenStreetMap contributors".to_string(),
            position: Point::new(size.width - 190.0, size.height - 16.0),
            color: Color::from_rgb8(0x55, 0x55, 0x55),
            size: Pixels(11.0),
            ..Text::default()
        });

        vec![frame.into_geometry()]
    }

    fn update(
        &self,
        state: &mut Self::State,
        event: canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> (canvas::event::Status, Option<MapEvent>) {
        let size = bounds.size();

        match event {
            // Mouse wheel zooms around the cursor
            canvas::Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                let Some(pos) = cursor.position_in(bounds) else {
                    return (canvas::event::Status::Ignored, None);
                };
                let steps = match delta {
                    mouse::ScrollDelta::Lines { y, .. } => y.signum() as i32,
                    mouse::ScrollDelta::Pixels { y, .. } => (y / 50.0).round() as i32,
                };
                if steps == 0 {
                    return (canvas::event::Status::Captured, None);
                }
                let anchor = Vector2::new(
                    f64::from(pos.x - size.width / 2.0),
                    f64::from(pos.y - size.height / 2.0),
                );
                return (
                    canvas::event::Status::Captured,
                    Some(MapEvent::Zoomed { steps, anchor }),
                );
            }

            // Button press - start a drag or a click
            canvas::Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                if let Some(pos) = cursor.position_in(bounds) {
                    state.is_dragging = true;
                    state.moved = false;
                    state.press_position = Some(pos);
                    state.last_position = Some(pos);
                    return (canvas::event::Status::Captured, None);
                }
            }

            // Button release - a press that never moved is a click
            canvas::Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                if !state.is_dragging {
                    return (canvas::event::Status::Ignored, None);
                }
                let was_click = !state.moved;
                let press = state.press_position;
                *state = DragState::default();

                if let (true, Some(pos)) = (was_click, press) {
                    let event = match self.marker_at(pos, size) {
                        Some(i) => {
                            let marker = &self.markers[i];
                            MapEvent::MarkerClicked(Popup {
                                anchor: marker.position,
                                lines: marker.popup.clone(),
                                lift: MARKER_HEIGHT - 12.0,
                            })
                        }
                        None => MapEvent::Clicked(self.view.to_position(pos, size)),
                    };
                    return (canvas::event::Status::Captured, Some(event));
                }
                return (canvas::event::Status::Captured, None);
            }

            // Mouse move - pan if dragging
            canvas::Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                if state.is_dragging {
                    if let (Some(current), Some(last), Some(press)) =
                        (cursor.position_in(bounds), state.last_position, state.press_position)
                    {
                        if !state.moved && current.distance(press) < DRAG_THRESHOLD {
                            return (canvas::event::Status::Captured, None);
                        }
                        state.moved = true;
                        state.last_position = Some(current);

                        let delta = Vector2::new(
                            f64::from(current.x - last.x),
                            f64::from(current.y - last.y),
                        );
                        return (canvas::event::Status::Captured, Some(MapEvent::Panned(delta)));
                    }
                }
            }

            _ => {}
        }

        (canvas::event::Status::Ignored, None)
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> mouse::Interaction {
        if state.is_dragging && state.moved {
            mouse::Interaction::Grabbing
        } else if cursor.is_over(bounds) {
            mouse::Interaction::Grab
        } else {
            mouse::Interaction::default()
        }
    }
}

/// State for drag interactions
#[derive(Debug, Clone, Default)]
pub struct DragState {
    pub is_dragging: bool,
    pub moved: bool,
    pub press_position: Option<Point>,
    pub last_position: Option<Point>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resena(id: i64, num: &str, lat: &str, lng: &str) -> Resena {
        Resena {
            id,
            num: num.into(),
            title: format!("Vértice {num}"),
            latitude: lat.into(),
            longitude: lng.into(),
            ..Default::default()
        }
    }

    #[test]
    fn highlights_only_the_owner() {
        let a = resena(1, "1", "40° 0' 0.00000\" N", "3° 30' 0.00000\" W");
        let b = resena(2, "2", "41° 0' 0.00000\" N", "3° 0' 0.00000\" W");
        let markers = highlight(&place_markers(&[&a, &b]), 2);

        assert_eq!(markers.len(), 2);
        assert!(!markers[0].highlighted);
        assert!(markers[1].highlighted);
        assert_eq!(markers[0].position, LatLng::new(40.0, -3.5));
        assert_eq!(
            markers[1].popup,
            vec![
                "Vértice 2".to_string(),
                "Num. expediente: 2".to_string(),
                "Latitud: 41° 0' 0.00000\" N".to_string(),
                "Longitud: 3° 0' 0.00000\" W".to_string(),
            ]
        );
    }

    #[test]
    fn undecodable_records_get_no_marker() {
        let good = resena(1, "1", "40° 0' 0.00000\" N", "3° 30' 0.00000\" W");
        let bad = resena(2, "2", "sin datos", "3° 0' 0.00000\" W");
        let markers = highlight(&place_markers(&[&good, &bad]), 1);
        assert_eq!(markers.len(), 1);
        assert!(markers[0].highlighted);
    }

    #[test]
    fn far_away_longitudes_land_on_screen_quickly() {
        let owner = resena(1, "1", "40° 0' 0.00000\" N", "3° 0' 0.00000\" W");
        let overflowing = resena(2, "2", "40° 0' 0.00000\" N", &format!("{}° 0' 0.00000\" E", "9".repeat(400)));
        let huge = resena(3, "3", "40° 0' 0.00000\" N", &format!("{}° 0' 0.00000\" E", "9".repeat(20)));
        let markers = highlight(&place_markers(&[&owner, &overflowing, &huge]), 1);

        // The overflowing record gets no marker at all
        assert_eq!(markers.len(), 2);

        let map = MapView::new(&owner);
        let size = Size::new(800.0, 400.0);
        let span = mercator::world_size(map.zoom()) as f32;
        for marker in &markers {
            let p = map.to_screen(marker.position, size);
            assert!(p.x.is_finite());
            assert!(p.x >= 400.0 - span / 2.0 - 1.0 && p.x <= 400.0 + span / 2.0 + 1.0);
        }
    }

    #[test]
    fn new_map_centers_on_owner() {
        let owner = resena(1, "1", "40° 30' 0.00000\" N", "3° 30' 0.00000\" W");
        let map = MapView::new(&owner);
        assert_eq!(map.center(), LatLng::new(40.5, -3.5));
        assert_eq!(map.zoom(), INITIAL_ZOOM);
        assert!(map.popup().is_none());
    }

    #[test]
    fn broken_owner_coordinates_center_on_origin() {
        let owner = resena(1, "1", "", "");
        assert_eq!(MapView::new(&owner).center(), LatLng::new(0.0, 0.0));
    }

    #[test]
    fn instances_are_distinct() {
        let owner = resena(1, "1", "40° 0' 0.00000\" N", "3° 0' 0.00000\" W");
        assert_ne!(MapView::new(&owner).instance(), MapView::new(&owner).instance());
    }

    #[test]
    fn click_opens_sexagesimal_popup() {
        let owner = resena(1, "1", "40° 0' 0.00000\" N", "3° 0' 0.00000\" W");
        let mut map = MapView::new(&owner);
        map.update(MapEvent::Clicked(LatLng::new(-12.5, -3.5)));

        let popup = map.popup().unwrap();
        assert_eq!(popup.anchor, LatLng::new(-12.5, -3.5));
        assert_eq!(popup.lines[1], "Latitud: 12° 30' 0.00000\" S");
        assert_eq!(popup.lines[2], "Longitud: 3° 30' 0.00000\" W");
        // The owner record is untouched
        assert_eq!(owner.latitude, "40° 0' 0.00000\" N");
    }

    #[test]
    fn screen_and_geo_positions_agree() {
        let owner = resena(1, "1", "40° 0' 0.00000\" N", "3° 0' 0.00000\" W");
        let map = MapView::new(&owner);
        let size = Size::new(800.0, 400.0);

        let center = map.to_screen(map.center(), size);
        assert!((center.x - 400.0).abs() < 0.01);
        assert!((center.y - 200.0).abs() < 0.01);

        let back = map.to_position(Point::new(400.0, 200.0), size);
        assert!((back.lat - 40.0).abs() < 1e-6);
        assert!((back.lng + 3.0).abs() < 1e-6);
    }

    #[test]
    fn panning_moves_center_against_drag() {
        let owner = resena(1, "1", "40° 0' 0.00000\" N", "3° 0' 0.00000\" W");
        let mut map = MapView::new(&owner);
        map.update(MapEvent::Panned(Vector2::new(100.0, 0.0)));
        // Dragging right reveals what is to the west
        assert!(map.center().lng < -3.0);
        assert!((map.center().lat - 40.0).abs() < 1e-9);
    }

    #[test]
    fn zoom_is_clamped_and_keeps_center_when_anchored_there() {
        let owner = resena(1, "1", "40° 0' 0.00000\" N", "3° 0' 0.00000\" W");
        let mut map = MapView::new(&owner);

        map.update(MapEvent::Zoomed { steps: 1, anchor: Vector2::new(0.0, 0.0) });
        assert_eq!(map.zoom(), INITIAL_ZOOM + 1);
        assert!((map.center().lat - 40.0).abs() < 1e-9);

        map.update(MapEvent::Zoomed { steps: 50, anchor: Vector2::new(0.0, 0.0) });
        assert_eq!(map.zoom(), MAX_ZOOM);
        map.update(MapEvent::Zoomed { steps: -50, anchor: Vector2::new(0.0, 0.0) });
        assert_eq!(map.zoom(), MIN_ZOOM);
    }

    #[test]
    fn wanted_tiles_cover_viewport_at_current_zoom() {
        let owner = resena(1, "1", "40° 0' 0.00000\" N", "3° 0' 0.00000\" W");
        let map = MapView::new(&owner);
        let tiles = map.wanted_tiles();

        assert!(!tiles.is_empty());
        assert!(tiles.iter().all(|k| k.z == INITIAL_ZOOM));
        // 1600x400 needs at least 7 columns and 2 rows
        assert!(tiles.len() >= 14);
    }

    #[test]
    fn disposed_map_ignores_input_and_wants_nothing() {
        let owner = resena(1, "1", "40° 0' 0.00000\" N", "3° 0' 0.00000\" W");
        let mut map = MapView::new(&owner);
        map.update(MapEvent::Clicked(LatLng::new(1.0, 1.0)));
        map.dispose();

        assert!(map.is_disposed());
        assert!(map.popup().is_none());
        assert!(map.wanted_tiles().is_empty());

        map.update(MapEvent::Clicked(LatLng::new(1.0, 1.0)));
        assert!(map.popup().is_none());
    }
}
