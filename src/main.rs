use iced::widget::{button, column, row, scrollable, text, text_input};
use iced::{Alignment, Element, Length, Task, Theme};
use rfd::FileDialog;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod export;
mod geo;
mod media;
mod state;
mod tiles;
mod ui;

use config::Settings;
use state::data::Resena;
use state::library::{self, ImportResult, Library};
use tiles::{TileCache, TileKey, TileSource};
use ui::card::{self, Action, Card};
use ui::list;
use ui::map::{self, Marker};

/// The collection, the search term and the cards of the visible records
#[derive(Debug, Default)]
struct Listing {
    /// Full collection as last fetched from the store
    resenas: Vec<Resena>,
    search: String,
    /// Cards of the visible records, keyed by record id
    cards: BTreeMap<i64, Card>,
    /// Decoded positions of the visible records
    markers: Vec<Marker>,
}

impl Listing {
    fn visible(&self) -> Vec<&Resena> {
        list::filter(&self.resenas, &self.search)
    }

    /// A fresh copy of the collection arrived from the store
    fn replace(&mut self, resenas: Vec<Resena>) -> Vec<Card> {
        self.resenas = resenas;
        self.sync()
    }

    fn set_search(&mut self, search: String) -> Vec<Card> {
        self.search = search;
        self.sync()
    }

    /// Drop a record the store deleted
    fn remove(&mut self, num: &str) -> Vec<Card> {
        self.resenas.retain(|r| r.num != num);
        self.sync()
    }

    /// Bring cards and markers in line with the visible records.
    /// Returns the cards that left, already disposed.
    fn sync(&mut self) -> Vec<Card> {
        let visible = list::filter(&self.resenas, &self.search);
        self.markers = map::place_markers(&visible);
        sync_cards(&mut self.cards, &visible)
    }

    fn wanted_tiles(&self) -> HashSet<TileKey> {
        self.cards.values().flat_map(Card::wanted_tiles).collect()
    }
}

/// Create cards for newly visible records, refresh the others and
/// dispose the rest. Returns the disposed cards.
fn sync_cards(cards: &mut BTreeMap<i64, Card>, visible: &[&Resena]) -> Vec<Card> {
    let ids: HashSet<i64> = visible.iter().map(|r| r.id).collect();

    for resena in visible {
        cards
            .entry(resena.id)
            .and_modify(|card| card.sync(resena))
            .or_insert_with(|| Card::new(resena));
    }

    let gone: Vec<i64> = cards.keys().filter(|id| !ids.contains(*id)).copied().collect();
    gone.into_iter()
        .filter_map(|id| cards.remove(&id))
        .map(|mut card| {
            card.dispose();
            card
        })
        .collect()
}

/// Main application state
struct Resenas {
    settings: Settings,
    listing: Listing,
    tiles: TileCache,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    Loaded(Result<Vec<Resena>, String>),
    SearchChanged(String),
    Card(i64, card::Message),
    Saved(i64, Result<(), String>),
    Deleted(String, Result<(), String>),
    Exported(Result<PathBuf, String>),
    TileLoaded(TileKey, Result<Vec<u8>, String>),
    /// User clicked the "Importar JSON" button
    ImportJson,
    ImportComplete(Result<ImportResult, String>),
}

impl Resenas {
    fn new(settings: Settings, tiles: TileCache) -> (Self, Task<Message>) {
        let fetch = Task::perform(
            library::fetch_all(settings.database.clone()),
            Message::Loaded,
        );

        (
            Resenas {
                settings,
                listing: Listing::default(),
                tiles,
                status: "Cargando reseñas...".to_string(),
            },
            fetch,
        )
    }

    fn db_path(&self) -> PathBuf {
        self.settings.database.clone()
    }

    fn refetch(&self) -> Task<Message> {
        Task::perform(library::fetch_all(self.db_path()), Message::Loaded)
    }

    /// Start downloads for tiles the mounted maps need
    fn request_tiles(&mut self) -> Task<Message> {
        let wanted = self.listing.wanted_tiles();

        let fresh = self.tiles.missing(wanted.iter().copied());
        self.tiles.evict(&wanted);

        Task::batch(fresh.into_iter().map(|key| {
            let request = self.tiles.request(key);
            Task::perform(request.fetch(), move |result| Message::TileLoaded(key, result))
        }))
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Loaded(Ok(resenas)) => {
                self.status = format!("{} reseñas", resenas.len());
                self.listing.replace(resenas);
                self.request_tiles()
            }
            Message::Loaded(Err(e)) => {
                error!("❌ Could not load reseñas: {e}");
                self.status = format!("No se pudieron cargar las reseñas: {e}");
                Task::none()
            }
            Message::SearchChanged(search) => {
                self.listing.set_search(search);
                self.request_tiles()
            }
            Message::Card(id, message) => {
                let Listing { resenas, cards, .. } = &mut self.listing;
                let Some(resena) = resenas.iter().find(|r| r.id == id) else {
                    return Task::none();
                };
                let Some(card) = cards.get_mut(&id) else {
                    return Task::none();
                };

                let moves_map = matches!(message, card::Message::Map(_));
                match card.update(message, resena) {
                    Action::None if moves_map => self.request_tiles(),
                    Action::None => Task::none(),
                    Action::Run(task) => task.map(move |m| Message::Card(id, m)),
                    Action::Save(resena) => {
                        info!("💾 Saving reseña {}", resena.num);
                        Task::perform(library::save(self.db_path(), resena), move |result| {
                            Message::Saved(id, result)
                        })
                    }
                    Action::Delete(num) => {
                        info!("🗑️  Deleting reseña {num}");
                        let db_path = self.db_path();
                        Task::perform(library::remove(db_path, num.clone()), move |result| {
                            Message::Deleted(num.clone(), result)
                        })
                    }
                    Action::Export(path, resena) => {
                        self.status = format!("Generando {}...", path.display());
                        Task::perform(export::export_to(path, resena), Message::Exported)
                    }
                }
            }
            Message::Saved(id, result) => {
                if let Some(card) = self.listing.cards.get_mut(&id) {
                    card.save_finished(result.is_ok());
                }
                match result {
                    Ok(()) => {
                        self.status = "Reseña guardada.".to_string();
                        self.refetch()
                    }
                    // Already logged by the store; the form stays open
                    Err(_) => Task::none(),
                }
            }
            Message::Deleted(num, Ok(())) => {
                self.listing.remove(&num);
                self.status = format!("Reseña {num} eliminada.");
                self.refetch()
            }
            Message::Deleted(_, Err(_)) => Task::none(),
            Message::Exported(Ok(path)) => {
                self.status = format!("✅ PDF guardado en {}", path.display());
                Task::none()
            }
            Message::Exported(Err(e)) => {
                self.status = format!("No se pudo generar el PDF: {e}");
                Task::none()
            }
            Message::TileLoaded(key, result) => {
                self.tiles.finish(key, result);
                Task::none()
            }
            Message::ImportJson => {
                // Show the native file picker dialog
                let picked = FileDialog::new()
                    .set_title("Importar reseñas")
                    .add_filter("JSON", &["json"])
                    .pick_file();

                match picked {
                    Some(path) => {
                        self.status = format!("Importando {}...", path.display());
                        Task::perform(
                            library::import_json(path, self.db_path()),
                            Message::ImportComplete,
                        )
                    }
                    None => Task::none(),
                }
            }
            Message::ImportComplete(Ok(result)) => {
                self.status = format!(
                    "✅ Importación completa: {} nuevas, {} duplicadas omitidas.",
                    result.imported_count, result.skipped_count
                );
                self.refetch()
            }
            Message::ImportComplete(Err(e)) => {
                warn!("⚠️  Import failed: {e}");
                self.status = format!("No se pudo importar: {e}");
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<'_, Message> {
        let visible = self.listing.visible();

        let toolbar = row![
            text_input("Buscar por número de expediente", &self.listing.search)
                .on_input(Message::SearchChanged)
                .padding(10)
                .width(Length::Fill),
            button("Importar JSON")
                .on_press(Message::ImportJson)
                .padding(10),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        let cards = list::view(&visible, |id| {
            let card = self.listing.cards.get(&id)?;
            let resena = visible.iter().find(|r| r.id == id).copied()?;
            let markers = map::highlight(&self.listing.markers, id);
            Some(
                card.view(resena, markers, &self.tiles)
                    .map(move |m| Message::Card(id, m)),
            )
        });

        column![
            toolbar,
            text(&self.status).size(14),
            scrollable(cards).height(Length::Fill),
        ]
        .spacing(15)
        .padding(20)
        .into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Light
    }
}

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("resenas=info")),
        )
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("❌ {e}");
            std::process::exit(1);
        }
    };

    // Create the schema up front; the app cannot work without its store
    match Library::open(&settings.database) {
        Ok(library) => info!(
            "📚 Using store at {} ({} reseñas)",
            library.path().display(),
            library.count().unwrap_or(0)
        ),
        Err(e) => {
            error!("❌ Could not open {}: {e}", settings.database.display());
            std::process::exit(1);
        }
    }

    let tiles = match TileCache::new(
        TileSource::new(settings.tile_url.clone()),
        settings.tile_cache.clone(),
        &settings.user_agent,
    ) {
        Ok(tiles) => tiles,
        Err(e) => {
            error!("❌ Could not set up tile client: {e}");
            std::process::exit(1);
        }
    };

    iced::application("Reseñas", Resenas::update, Resenas::view)
        .theme(Resenas::theme)
        .centered()
        .run_with(move || Resenas::new(settings, tiles))
}
