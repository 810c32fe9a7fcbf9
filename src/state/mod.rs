/// State management module
///
/// This module handles all application state, including:
/// - The record store and its background helpers (library.rs)
/// - The reseña record itself (data.rs)
/// - Local edit state of a card's form (edit.rs)

pub mod data;
pub mod edit;
pub mod library;
