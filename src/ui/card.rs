/// One reseña: print layout, actions, edit form and map
use iced::widget::{
    button, canvas, column, container, horizontal_space, image, row, text, text_input, Column,
};
use iced::{Alignment, Color, Element, Length, Task};
use iced_aw::Wrap;
use rfd::FileDialog;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use tracing::warn;

use super::map::{MapCanvas, MapEvent, MapView, Marker, MAP_HEIGHT};
use crate::export::{self, Photo};
use crate::media;
use crate::state::data::Resena;
use crate::state::edit::{EditForm, ImageField, TextField};
use crate::tiles::{TileCache, TileKey};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

const HEADING: Color = Color::from_rgb(0.45, 0.45, 0.45);
const ACCENT: Color = Color::from_rgb(0.2, 0.45, 0.8);

#[derive(Debug, Clone)]
pub enum Message {
    Edit,
    CloseEdit,
    TextChanged(TextField, String),
    PickImage(ImageField),
    ImageEncoded(ImageField, Result<String, String>),
    Submit,
    AskDelete,
    ConfirmDelete,
    CancelDelete,
    Export,
    Map(MapEvent),
}

/// What the application has to do after a card handled a message
pub enum Action {
    None,
    Run(Task<Message>),
    /// Send the whole record to the store
    Save(Resena),
    /// Delete by record number
    Delete(String),
    Export(PathBuf, Resena),
}

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Display,
    ConfirmDelete,
    Editing(EditForm),
}

/// Decoded photos of the record, rebuilt when a payload changes
#[derive(Debug, Clone, Default)]
struct Photos {
    fingerprint: u64,
    logo: Option<image::Handle>,
    general: Option<image::Handle>,
    location: Option<image::Handle>,
    detail: Option<image::Handle>,
}

impl Photos {
    fn fingerprint(r: &Resena) -> u64 {
        let mut hasher = DefaultHasher::new();
        for field in ImageField::ALL {
            field.get(r).hash(&mut hasher);
        }
        hasher.finish()
    }

    fn refresh(&mut self, r: &Resena) {
        let fingerprint = Self::fingerprint(r);
        if fingerprint == self.fingerprint && self.fingerprint != 0 {
            return;
        }
        *self = Photos {
            fingerprint,
            logo: handle(&r.logo),
            general: handle(&r.general_photo),
            location: handle(&r.location_photo),
            detail: handle(&r.detail_photo),
        };
    }

    fn get(&self, payload_field: ImageField) -> Option<&image::Handle> {
        match payload_field {
            ImageField::Logo => self.logo.as_ref(),
            ImageField::General => self.general.as_ref(),
            ImageField::Location => self.location.as_ref(),
            ImageField::Detail => self.detail.as_ref(),
        }
    }
}

fn handle(payload: &str) -> Option<image::Handle> {
    if payload.is_empty() {
        return None;
    }
    match media::decode_payload(payload) {
        Ok(bytes) => Some(image::Handle::from_bytes(bytes)),
        Err(e) => {
            warn!("🖼️  Unreadable image payload: {e}");
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct Card {
    mode: Mode,
    map: Option<MapView>,
    photos: Photos,
}

impl Card {
    pub fn new(resena: &Resena) -> Self {
        let mut card = Self {
            mode: Mode::Display,
            map: None,
            photos: Photos::default(),
        };
        card.sync(resena);
        card
    }

    /// Take in a fresh copy of the record. The map is only created once.
    pub fn sync(&mut self, resena: &Resena) {
        self.photos.refresh(resena);
        if self.map.is_none() {
            self.map = Some(MapView::new(resena));
        }
    }

    /// The card left the visible set
    pub fn dispose(&mut self) {
        if let Some(map) = self.map.as_mut() {
            map.dispose();
        }
    }

    pub fn map(&self) -> Option<&MapView> {
        self.map.as_ref()
    }

    pub fn form(&self) -> Option<&EditForm> {
        match &self.mode {
            Mode::Editing(form) => Some(form),
            _ => None,
        }
    }

    pub fn confirming_delete(&self) -> bool {
        self.mode == Mode::ConfirmDelete
    }

    pub fn wanted_tiles(&self) -> Vec<TileKey> {
        self.map.as_ref().map(MapView::wanted_tiles).unwrap_or_default()
    }

    pub fn update(&mut self, message: Message, resena: &Resena) -> Action {
        match message {
            Message::Edit => {
                self.mode = Mode::Editing(EditForm::new(resena));
                Action::None
            }
            Message::CloseEdit => {
                self.mode = Mode::Display;
                Action::None
            }
            Message::TextChanged(field, value) => {
                if let Mode::Editing(form) = &mut self.mode {
                    form.set_text(field, value);
                }
                Action::None
            }
            Message::PickImage(field) => {
                let picked = FileDialog::new()
                    .set_title(field.label().trim_end_matches(':'))
                    .add_filter("Imágenes", &IMAGE_EXTENSIONS)
                    .pick_file();

                match picked {
                    Some(path) => Action::Run(Task::perform(media::encode_file(path), move |r| {
                        Message::ImageEncoded(field, r)
                    })),
                    None => Action::None,
                }
            }
            Message::ImageEncoded(field, result) => {
                match (result, &mut self.mode) {
                    (Ok(payload), Mode::Editing(form)) => form.set_image(field, payload),
                    (Ok(_), _) => {}
                    (Err(e), _) => warn!("⚠️  Could not load image: {e}"),
                }
                Action::None
            }
            Message::Submit => match &mut self.mode {
                Mode::Editing(form) if !form.saving => match form.submit() {
                    Ok(record) => Action::Save(record),
                    Err(_) => Action::None,
                },
                _ => Action::None,
            },
            Message::AskDelete => {
                self.mode = Mode::ConfirmDelete;
                Action::None
            }
            Message::CancelDelete => {
                self.mode = Mode::Display;
                Action::None
            }
            Message::ConfirmDelete => {
                // The prompt closes whatever the store answers
                self.mode = Mode::Display;
                Action::Delete(resena.num.clone())
            }
            Message::Export => {
                let target = FileDialog::new()
                    .set_title("Generar PDF")
                    .set_file_name(export::export_file_name(resena))
                    .add_filter("PDF", &["pdf"])
                    .save_file();

                match target {
                    Some(path) => Action::Export(path, resena.clone()),
                    None => Action::None,
                }
            }
            Message::Map(event) => {
                if let Some(map) = self.map.as_mut() {
                    map.update(event);
                }
                Action::None
            }
        }
    }

    /// The store answered a submission
    pub fn save_finished(&mut self, ok: bool) {
        if let Mode::Editing(form) = &mut self.mode {
            if ok {
                self.mode = Mode::Display;
            } else {
                form.save_failed();
            }
        }
    }

    pub fn view<'a>(
        &'a self,
        resena: &'a Resena,
        markers: Vec<Marker>,
        tiles: &'a TileCache,
    ) -> Element<'a, Message> {
        let mut content = Column::new()
            .push(self.sheet(resena))
            .push(actions())
            .spacing(15)
            .padding(20);

        if self.confirming_delete() {
            content = content.push(
                row![
                    text("¿Seguro que quiere eliminar esta reseña?"),
                    button("Sí").on_press(Message::ConfirmDelete),
                    button("No").on_press(Message::CancelDelete),
                ]
                .spacing(10)
                .align_y(Alignment::Center),
            );
        }

        if let Some(form) = self.form() {
            content = content.push(edit_form(form));
        }

        if let Some(map) = self.map() {
            let map_canvas = canvas(MapCanvas {
                view: map,
                markers,
                tiles,
            })
            .width(Length::Fill)
            .height(Length::Fixed(MAP_HEIGHT));
            content = content.push(Element::from(map_canvas).map(Message::Map));
        }

        container(content)
            .width(Length::Fill)
            .style(container::bordered_box)
            .into()
    }

    /// Fixed print layout
    fn sheet<'a>(&'a self, resena: &'a Resena) -> Element<'a, Message> {
        let sheet = export::sheet(resena);

        let mut header = row![text(sheet.place).color(ACCENT).width(Length::Fill)]
            .spacing(20)
            .align_y(Alignment::Center);
        if let Some(logo) = self.photos.get(ImageField::Logo) {
            header = header.push(image(logo.clone()).height(Length::Fixed(70.0)));
        }
        header = header.push(column![
            text(format!("Marca: {}", sheet.brand)),
            text(format!("Num. expediente: {}", sheet.num)),
        ]);

        let mut left = Column::new().spacing(6).width(Length::FillPortion(1));
        for section in sheet.sections {
            left = left.push(heading(section.title));
            for (label, value) in section.rows {
                left = left.push(row![text(label), horizontal_space(), text(value.to_string())]);
            }
        }
        left = left.push(self.photo(sheet.general, ImageField::General));

        let [location, detail] = sheet.side;
        let right = column![
            self.photo(location, ImageField::Location),
            self.photo(detail, ImageField::Detail),
        ]
        .spacing(6)
        .width(Length::FillPortion(1));

        column![
            text(sheet.title.to_string()).size(26),
            header,
            row![left, right].spacing(30),
        ]
        .spacing(12)
        .into()
    }

    fn photo<'a>(&'a self, photo: Photo<'_>, field: ImageField) -> Element<'a, Message> {
        let mut block = Column::new().push(heading(photo.title)).spacing(6);
        if let Some(handle) = self.photos.get(field) {
            block = block.push(image(handle.clone()).width(Length::Fill));
        }
        block.into()
    }
}

fn heading<'a>(title: &'static str) -> Element<'a, Message> {
    text(title).size(14).color(HEADING).into()
}

fn actions<'a>() -> Element<'a, Message> {
    Wrap::with_elements(vec![
        container(button("Editar reseña").on_press(Message::Edit)).padding(4).into(),
        container(button("Eliminar reseña").on_press(Message::AskDelete)).padding(4).into(),
        container(button("Generar PDF").on_press(Message::Export)).padding(4).into(),
    ])
    .into()
}

fn edit_form(form: &EditForm) -> Element<'_, Message> {
    let draft = form.draft();

    let mut fields = Column::new().spacing(8).push(
        row![
            text("Editar reseña").size(22),
            horizontal_space(),
            button("×").on_press(Message::CloseEdit),
        ]
        .align_y(Alignment::Center),
    );

    for field in TextField::ALL {
        fields = fields.push(
            row![
                text(field.label()).width(Length::Fixed(220.0)),
                text_input("", field.get(draft)).on_input(move |v| Message::TextChanged(field, v)),
            ]
            .align_y(Alignment::Center),
        );
    }

    for field in ImageField::ALL {
        let label = if field.get(draft).is_empty() {
            "Seleccionar archivo"
        } else {
            "Cambiar archivo"
        };
        fields = fields.push(
            row![
                text(field.label()).width(Length::Fixed(220.0)),
                button(label).on_press(Message::PickImage(field)),
            ]
            .align_y(Alignment::Center),
        );
    }

    if let Some(error) = form.error {
        fields = fields.push(text(error).color(Color::from_rgb(0.8, 0.2, 0.2)));
    }

    fields = fields.push(
        button(if form.saving { "Guardando..." } else { "Guardar cambios" })
            .on_press_maybe((!form.saving).then_some(Message::Submit)),
    );

    container(fields)
        .padding(20)
        .style(container::rounded_box)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::mercator::LatLng;
    use crate::state::edit::INVALID_COORDINATES;
    use pretty_assertions::assert_eq;

    fn resena() -> Resena {
        Resena {
            id: 7,
            num: "1203".into(),
            title: "Vértice".into(),
            latitude: "40° 30' 15.12345\" N".into(),
            longitude: "3° 20' 10.00000\" W".into(),
            ..Default::default()
        }
    }

    #[test]
    fn map_is_created_once_per_card() {
        let r = resena();
        let mut card = Card::new(&r);
        let first = card.map().unwrap().instance();

        let mut moved = r.clone();
        moved.latitude = "10° 0' 0.00000\" N".into();
        card.sync(&moved);
        card.sync(&moved);

        assert_eq!(card.map().unwrap().instance(), first);
    }

    #[test]
    fn dispose_releases_the_map() {
        let r = resena();
        let mut card = Card::new(&r);
        assert!(!card.wanted_tiles().is_empty());

        card.dispose();
        assert!(card.map().unwrap().is_disposed());
        assert!(card.wanted_tiles().is_empty());
    }

    #[test]
    fn invalid_coordinates_stop_submission() {
        let r = resena();
        let mut card = Card::new(&r);
        card.update(Message::Edit, &r);
        card.update(Message::TextChanged(TextField::Latitude, "bad input".into()), &r);

        assert!(matches!(card.update(Message::Submit, &r), Action::None));
        let form = card.form().unwrap();
        assert_eq!(form.error, Some(INVALID_COORDINATES));
        assert!(!form.saving);
    }

    #[test]
    fn valid_submission_sends_whole_record() {
        let r = resena();
        let mut card = Card::new(&r);
        card.update(Message::Edit, &r);
        card.update(Message::TextChanged(TextField::Title, "Nuevo".into()), &r);

        match card.update(Message::Submit, &r) {
            Action::Save(saved) => {
                assert_eq!(saved.id, 7);
                assert_eq!(saved.title, "Nuevo");
                assert_eq!(saved.latitude, r.latitude);
            }
            _ => panic!("expected a save"),
        }
        assert!(card.form().unwrap().saving);

        // A second press while saving does nothing
        assert!(matches!(card.update(Message::Submit, &r), Action::None));
    }

    #[test]
    fn failed_save_keeps_form_open() {
        let r = resena();
        let mut card = Card::new(&r);
        card.update(Message::Edit, &r);
        card.update(Message::Submit, &r);

        card.save_finished(false);
        let form = card.form().unwrap();
        assert!(!form.saving);

        card.save_finished(true);
        assert!(card.form().is_none());
    }

    #[test]
    fn encoded_image_lands_in_draft() {
        let r = resena();
        let mut card = Card::new(&r);
        card.update(Message::Edit, &r);
        card.update(
            Message::ImageEncoded(ImageField::Detail, Ok("data:image/png;base64,AAAA".into())),
            &r,
        );
        card.update(Message::ImageEncoded(ImageField::Logo, Err("broken".into())), &r);

        let draft = card.form().unwrap().draft();
        assert_eq!(draft.detail_photo, "data:image/png;base64,AAAA");
        assert_eq!(draft.logo, "");
    }

    #[test]
    fn delete_needs_confirmation() {
        let r = resena();
        let mut card = Card::new(&r);

        card.update(Message::AskDelete, &r);
        assert!(card.confirming_delete());
        card.update(Message::CancelDelete, &r);
        assert!(!card.confirming_delete());

        card.update(Message::AskDelete, &r);
        match card.update(Message::ConfirmDelete, &r) {
            Action::Delete(num) => assert_eq!(num, "1203"),
            _ => panic!("expected a delete"),
        }
        assert!(!card.confirming_delete());
    }

    #[test]
    fn map_events_reach_the_map() {
        let r = resena();
        let mut card = Card::new(&r);
        card.update(Message::Map(MapEvent::Clicked(LatLng::new(1.0, 2.0))), &r);
        assert!(card.map().unwrap().popup().is_some());
    }
}
