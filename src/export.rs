/// Printable sheet of a reseña and its PDF rendering
///
/// `sheet` describes the print layout once; the card view and the PDF
/// writer both walk it.
use printpdf::image_crate::{self, DynamicImage, GenericImageView};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use crate::media;
use crate::state::data::Resena;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("pdf error: {0}")]
    Pdf(#[from] printpdf::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A titled block of label/value rows
#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    pub title: &'static str,
    pub rows: Vec<(&'static str, &'a str)>,
}

/// A titled photo slot
#[derive(Debug, Clone, PartialEq)]
pub struct Photo<'a> {
    pub title: &'static str,
    pub payload: &'a str,
}

/// Print layout of one record
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet<'a> {
    pub title: &'a str,
    pub place: &'a str,
    pub logo: &'a str,
    pub brand: &'a str,
    pub num: &'a str,
    /// Left column: coordinate blocks and the observation
    pub sections: Vec<Section<'a>>,
    /// Left column, below the sections
    pub general: Photo<'a>,
    /// Right column
    pub side: [Photo<'a>; 2],
}

pub fn sheet(r: &Resena) -> Sheet<'_> {
    Sheet {
        title: &r.title,
        place: &r.place,
        logo: &r.logo,
        brand: &r.brand,
        num: &r.num,
        sections: vec![
            Section {
                title: "GEOGRÁFICAS ETRS-89",
                rows: vec![
                    ("Latitud:", r.latitude.as_str()),
                    ("Longitud:", r.longitude.as_str()),
                    ("Elev. Elipsoidal:", r.ellipsoidal_elevation.as_str()),
                    ("Elev. Ortometrica EGM-08:", r.orthometric_elevation.as_str()),
                ],
            },
            Section {
                title: "UTM ETRS-89 Huso 30 Norte",
                rows: vec![
                    ("X:", r.utm_x.as_str()),
                    ("Y:", r.utm_y.as_str()),
                    ("Elev. Elipsoidal:", r.ellipsoidal_elevation.as_str()),
                    ("Elev. Ortometrica EGM-08:", r.orthometric_elevation.as_str()),
                ],
            },
            Section {
                title: "OBSERVADO POR",
                rows: vec![("Observación:", r.date.as_str())],
            },
        ],
        general: Photo {
            title: "FOTOGRAFÍA GENERAL",
            payload: &r.general_photo,
        },
        side: [
            Photo {
                title: "SITUACIÓN",
                payload: &r.location_photo,
            },
            Photo {
                title: "FOTOGRAFÍA DETALLE",
                payload: &r.detail_photo,
            },
        ],
    }
}

/// Suggested file name, `"<title> <brand>.pdf"`
pub fn export_file_name(r: &Resena) -> String {
    format!("{} {}.pdf", r.title, r.brand)
}

// US Letter, portrait
const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN: f32 = 18.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const PT_TO_MM: f32 = 0.3528;

/// Top-to-bottom writer that starts a new page when content overflows
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Distance of the next baseline from the page bottom, in mm
    y: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, ExportError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Capa 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    /// Make room for `height` mm, breaking the page if needed
    fn reserve(&mut self, height: f32) {
        if self.y - height >= MARGIN {
            return;
        }
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            format!("Capa {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn text(&mut self, content: &str, size: f32, bold: bool) {
        let line_height = size * PT_TO_MM * 1.4;
        let font = if bold { &self.bold } else { &self.regular };
        let font = font.clone();

        for line in wrap(content, chars_per_line(size)) {
            self.reserve(line_height);
            self.y -= line_height;
            self.layer.use_text(line, size, Mm(MARGIN), Mm(self.y), &font);
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn heading(&mut self, title: &str) {
        self.gap(3.0);
        self.text(title, 12.0, true);
        self.gap(1.0);
    }

    /// Draw an encoded payload scaled into the content width and `max_height`
    fn image(&mut self, payload: &str, max_height: f32) {
        if payload.is_empty() {
            return;
        }
        let decoded = match load_payload(payload) {
            Ok(image) => image,
            Err(e) => {
                warn!("🖨️  Skipping image in PDF: {e}");
                return;
            }
        };

        let (px_w, px_h) = decoded.dimensions();
        if px_w == 0 || px_h == 0 {
            return;
        }
        // dpi that makes the image fit both bounds at scale 1
        let dpi = (px_w as f32 * 25.4 / CONTENT_WIDTH).max(px_h as f32 * 25.4 / max_height);
        let height = px_h as f32 * 25.4 / dpi;

        self.reserve(height + 2.0);
        self.y -= height + 2.0;

        let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
        Image::from_dynamic_image(&rgb).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN)),
                translate_y: Some(Mm(self.y)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
    }

    fn finish(self) -> Result<Vec<u8>, ExportError> {
        Ok(self.doc.save_to_bytes()?)
    }
}

fn load_payload(payload: &str) -> Result<DynamicImage, String> {
    let bytes = media::decode_payload(payload).map_err(|e| e.to_string())?;
    image_crate::load_from_memory(&bytes).map_err(|e| e.to_string())
}

/// Rough Helvetica capacity of the content width
fn chars_per_line(size: f32) -> usize {
    let avg_char = size * PT_TO_MM * 0.5;
    ((CONTENT_WIDTH / avg_char) as usize).max(10)
}

/// Greedy word wrap; words longer than `width` get a line of their own
fn wrap(content: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in content.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let needed = line.chars().count() + usize::from(!line.is_empty()) + word.chars().count();
            if !line.is_empty() && needed > width {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Render the print layout of `r` into a Letter portrait PDF
pub fn render_pdf(r: &Resena) -> Result<Vec<u8>, ExportError> {
    let sheet = sheet(r);
    let mut out = PageWriter::new(&export_file_name(r))?;

    out.text(sheet.title, 20.0, true);
    out.text(sheet.place, 12.0, false);
    out.image(sheet.logo, 25.0);
    out.text(&format!("Marca: {}", sheet.brand), 11.0, false);
    out.text(&format!("Num. expediente: {}", sheet.num), 11.0, false);

    for section in &sheet.sections {
        out.heading(section.title);
        for (label, value) in &section.rows {
            out.text(&format!("{label} {value}"), 10.0, false);
        }
    }

    for photo in std::iter::once(&sheet.general).chain(sheet.side.iter()) {
        out.heading(photo.title);
        out.image(photo.payload, 90.0);
    }

    let pages = out.pages;
    let bytes = out.finish()?;
    info!("🖨️  Rendered reseña {} ({pages} pages, {} KB)", r.num, bytes.len() / 1024);
    Ok(bytes)
}

/// Render `resena` and write it to `path`
pub async fn export_to(path: PathBuf, resena: Resena) -> Result<PathBuf, String> {
    let write = async {
        let bytes = tokio::task::spawn_blocking(move || render_pdf(&resena)).await??;
        tokio::fs::write(&path, bytes).await?;
        Ok::<_, ExportError>(())
    };

    match write.await {
        Ok(()) => {
            info!("✅ PDF saved to {}", path.display());
            Ok(path)
        }
        Err(e) => {
            warn!("⚠️  Could not export {}: {e}", path.display());
            Err(e.to_string())
        }
    }
}
