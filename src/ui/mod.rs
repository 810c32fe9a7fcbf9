/// Widgets: the reseña list, the cards and their maps
pub mod card;
pub mod list;
pub mod map;
