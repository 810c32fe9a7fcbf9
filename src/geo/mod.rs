/// Geographic helpers
///
/// - Sexagesimal <-> decimal degree conversion (sexagesimal.rs)
/// - Web Mercator projection and tile indexing for the map (mercator.rs)

pub mod mercator;
pub mod sexagesimal;
