/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the record store and the UI layer.

use serde::{Deserialize, Serialize};

/// A surveyed geodetic monument record.
///
/// Field names on the wire follow the JSON shape the record
/// collection has always used (`titulo`, `latitud`, `elevElip`, ...).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Resena {
    /// Identity assigned by the store
    pub id: i64,
    /// Record number ("Num. expediente"), searched and unique per list
    pub num: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "lugar")]
    pub place: String,
    #[serde(rename = "marca")]
    pub brand: String,
    /// Sexagesimal latitude, e.g. `40° 30' 15.12345" N`
    #[serde(rename = "latitud")]
    pub latitude: String,
    /// Sexagesimal longitude, e.g. `3° 20' 10.00000" W`
    #[serde(rename = "longitud")]
    pub longitude: String,
    #[serde(rename = "x")]
    pub utm_x: String,
    #[serde(rename = "y")]
    pub utm_y: String,
    #[serde(rename = "elevElip")]
    pub ellipsoidal_elevation: String,
    #[serde(rename = "elevOrto")]
    pub orthometric_elevation: String,
    /// Free-text observation date
    #[serde(rename = "fecha")]
    pub date: String,
    /// Image payloads (`data:<mime>;base64,...`), empty when unset
    pub logo: String,
    #[serde(rename = "imagenGeneral")]
    pub general_photo: String,
    #[serde(rename = "imagenSituacion")]
    pub location_photo: String,
    #[serde(rename = "imagenDetalle")]
    pub detail_photo: String,
}

impl Resena {
    /// Parse a JSON array of records (import files)
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_collection_field_names() {
        let json = r#"[{
            "id": 7,
            "num": "A-12",
            "titulo": "Vértice Cerro",
            "lugar": "Toledo",
            "marca": "Clavo",
            "latitud": "39° 51' 24.12345\" N",
            "longitud": "4° 1' 30.00000\" W",
            "elevElip": "560.2",
            "elevOrto": "508.9",
            "x": "412345.1",
            "y": "4412345.2",
            "fecha": "2023-05-01",
            "imagenGeneral": "data:image/png;base64,AAAA"
        }]"#;

        let list = Resena::list_from_json(json).unwrap();
        assert_eq!(list.len(), 1);
        let r = &list[0];
        assert_eq!(r.id, 7);
        assert_eq!(r.title, "Vértice Cerro");
        assert_eq!(r.ellipsoidal_elevation, "560.2");
        assert_eq!(r.utm_y, "4412345.2");
        assert_eq!(r.general_photo, "data:image/png;base64,AAAA");
        // Missing fields default to empty
        assert_eq!(r.logo, "");
        assert_eq!(r.detail_photo, "");
    }

    #[test]
    fn writes_collection_field_names() {
        let r = Resena {
            num: "5".into(),
            orthometric_elevation: "10".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"elevOrto\":\"10\""));
        assert!(json.contains("\"num\":\"5\""));
        assert!(!json.contains("orthometric_elevation"));
    }
}
