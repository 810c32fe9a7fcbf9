/// Local edit state of one reseña card
///
/// The form works on a copy of the record. Text inputs write straight
/// into the copy on every keystroke, image inputs store the encoded
/// payload, and nothing reaches the store until `submit` accepts it.

use super::data::Resena;
use crate::geo::sexagesimal;

/// Message shown when the coordinates do not follow the sexagesimal pattern
pub const INVALID_COORDINATES: &str = "Por favor, ingrese coordenadas válidas para la latitud y longitud.\n\
Deben seguir el patrón:\n\
Latitud: 1° 1' 1.11111\" N/S\n\
Longitud: 1° 1' 1.11111\" W/E";

/// Editable text fields, in form order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Title,
    Place,
    Brand,
    Num,
    Latitude,
    Longitude,
    EllipsoidalElevation,
    OrthometricElevation,
    UtmX,
    UtmY,
    Date,
}

impl TextField {
    pub const ALL: [TextField; 11] = [
        TextField::Title,
        TextField::Place,
        TextField::Brand,
        TextField::Num,
        TextField::Latitude,
        TextField::Longitude,
        TextField::EllipsoidalElevation,
        TextField::OrthometricElevation,
        TextField::UtmX,
        TextField::UtmY,
        TextField::Date,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TextField::Title => "Título:",
            TextField::Place => "Lugar:",
            TextField::Brand => "Marca:",
            TextField::Num => "Número de expediente:",
            TextField::Latitude => "Latitud:",
            TextField::Longitude => "Longitud:",
            TextField::EllipsoidalElevation => "Elev. Elipsoidal:",
            TextField::OrthometricElevation => "Elev. Ortometrica EGM-08:",
            TextField::UtmX => "X:",
            TextField::UtmY => "Y:",
            TextField::Date => "Fecha:",
        }
    }

    fn slot(self, r: &mut Resena) -> &mut String {
        match self {
            TextField::Title => &mut r.title,
            TextField::Place => &mut r.place,
            TextField::Brand => &mut r.brand,
            TextField::Num => &mut r.num,
            TextField::Latitude => &mut r.latitude,
            TextField::Longitude => &mut r.longitude,
            TextField::EllipsoidalElevation => &mut r.ellipsoidal_elevation,
            TextField::OrthometricElevation => &mut r.orthometric_elevation,
            TextField::UtmX => &mut r.utm_x,
            TextField::UtmY => &mut r.utm_y,
            TextField::Date => &mut r.date,
        }
    }

    pub fn get(self, r: &Resena) -> &str {
        match self {
            TextField::Title => &r.title,
            TextField::Place => &r.place,
            TextField::Brand => &r.brand,
            TextField::Num => &r.num,
            TextField::Latitude => &r.latitude,
            TextField::Longitude => &r.longitude,
            TextField::EllipsoidalElevation => &r.ellipsoidal_elevation,
            TextField::OrthometricElevation => &r.orthometric_elevation,
            TextField::UtmX => &r.utm_x,
            TextField::UtmY => &r.utm_y,
            TextField::Date => &r.date,
        }
    }
}

/// The four image slots of a reseña
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageField {
    Logo,
    Location,
    Detail,
    General,
}

impl ImageField {
    pub const ALL: [ImageField; 4] = [
        ImageField::Logo,
        ImageField::Location,
        ImageField::Detail,
        ImageField::General,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ImageField::Logo => "Imagen Logo:",
            ImageField::Location => "Imagen Situación:",
            ImageField::Detail => "Imagen Detalle:",
            ImageField::General => "Imagen General:",
        }
    }

    pub fn get(self, r: &Resena) -> &str {
        match self {
            ImageField::Logo => &r.logo,
            ImageField::Location => &r.location_photo,
            ImageField::Detail => &r.detail_photo,
            ImageField::General => &r.general_photo,
        }
    }

    fn slot(self, r: &mut Resena) -> &mut String {
        match self {
            ImageField::Logo => &mut r.logo,
            ImageField::Location => &mut r.location_photo,
            ImageField::Detail => &mut r.detail_photo,
            ImageField::General => &mut r.general_photo,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditForm {
    draft: Resena,
    /// Validation message shown above the save button
    pub error: Option<&'static str>,
    /// A submission is waiting for the store
    pub saving: bool,
}

impl EditForm {
    /// Form pre-populated with the current values of `resena`
    pub fn new(resena: &Resena) -> Self {
        Self {
            draft: resena.clone(),
            error: None,
            saving: false,
        }
    }

    pub fn draft(&self) -> &Resena {
        &self.draft
    }

    pub fn set_text(&mut self, field: TextField, value: String) {
        *field.slot(&mut self.draft) = value;
    }

    pub fn set_image(&mut self, field: ImageField, payload: String) {
        *field.slot(&mut self.draft) = payload;
    }

    /// Check the coordinates and hand out the record to send to the store.
    ///
    /// On failure the form keeps its state and records the message.
    pub fn submit(&mut self) -> Result<Resena, &'static str> {
        if !sexagesimal::validate(&self.draft.latitude, &self.draft.longitude) {
            self.error = Some(INVALID_COORDINATES);
            return Err(INVALID_COORDINATES);
        }

        self.error = None;
        self.saving = true;
        Ok(self.draft.clone())
    }

    /// The store rejected the submission; the form stays open
    pub fn save_failed(&mut self) {
        self.saving = false;
    }
}
