//! Permit certificate rendering
//!
//! Renders an issued permit into a printable PDF: header with the authority
//! and ministry logos (text fallback when a logo is missing or unreadable), a
//! permit detail table, optional applicant and inspection sections, the
//! numbered conditions, and a signature block. Every page carries a footer
//! with the permit number and page count.

use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerIndex, PdfLayerReference, PdfPageIndex, Point, Rgb,
};
use std::io::Cursor;
use std::path::PathBuf;
use tracing::warn;

use crate::db::schemas::{ApplicationDoc, InspectionDoc, PermitDoc};
use crate::types::{Result, SluiceError};

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN: f32 = 20.0;
const FOOTER_Y: f32 = 12.0;
/// Space the signature block needs; a shorter remainder forces a page break
const SIGNATURE_BLOCK_MM: f32 = 40.0;

/// Fixed legal disclaimer stamped in the footer of every page
const FOOTER_DISCLAIMER: &str =
    "Issued under the Water Resources Law. This permit is non-transferable and void if altered.";

/// Everything that goes onto a certificate
pub struct CertificateData<'a> {
    pub permit: &'a PermitDoc,
    pub holder_name: &'a str,
    pub holder_identifier: &'a str,
    pub application: Option<&'a ApplicationDoc>,
    pub inspection: Option<&'a InspectionDoc>,
}

/// Certificate renderer, configured once at startup
pub struct CertificateRenderer {
    authority_logo: Option<PathBuf>,
    ministry_logo: Option<PathBuf>,
}

/// True when fewer than `needed` millimetres remain above the footer
fn needs_break(cursor_y: f32, needed: f32) -> bool {
    cursor_y - needed < MARGIN
}

struct PageCursor<'a> {
    doc: &'a PdfDocumentReference,
    pages: Vec<(PdfPageIndex, PdfLayerIndex)>,
    layer: PdfLayerReference,
    y: f32,
}

impl<'a> PageCursor<'a> {
    fn new(doc: &'a PdfDocumentReference, page: PdfPageIndex, layer: PdfLayerIndex) -> Self {
        Self {
            doc,
            pages: vec![(page, layer)],
            layer: doc.get_page(page).get_layer(layer),
            y: PAGE_HEIGHT.0 - MARGIN,
        }
    }

    /// Start a fresh page unless the current one has `needed` mm left
    fn ensure_space(&mut self, needed: f32) {
        if !needs_break(self.y, needed) {
            return;
        }
        let (page, layer) = self.doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "content");
        self.pages.push((page, layer));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT.0 - MARGIN;
    }

    fn text(&mut self, text: &str, size: f32, x: f32, font: &IndirectFontRef) {
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn advance(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn rule(&mut self, x_from: f32, x_to: f32) {
        let line = Line {
            points: vec![
                (Point::new(Mm(x_from), Mm(self.y)), false),
                (Point::new(Mm(x_to), Mm(self.y)), false),
            ],
            is_closed: false,
        };
        self.layer.set_outline_thickness(0.4);
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(0.35, 0.35, 0.35, None)));
        self.layer.add_line(line);
    }
}

impl CertificateRenderer {
    pub fn new(authority_logo: Option<PathBuf>, ministry_logo: Option<PathBuf>) -> Self {
        Self {
            authority_logo,
            ministry_logo,
        }
    }

    /// Render the certificate to PDF bytes
    pub fn render(&self, data: &CertificateData<'_>) -> Result<Vec<u8>> {
        let (doc, page, layer) =
            PdfDocument::new("Water Use Permit Certificate", PAGE_WIDTH, PAGE_HEIGHT, "content");

        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| SluiceError::Certificate(format!("font load failed: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| SluiceError::Certificate(format!("font load failed: {e}")))?;

        let mut cursor = PageCursor::new(&doc, page, layer);

        self.draw_header(&mut cursor, &bold);
        draw_title(&mut cursor, data.permit, &regular, &bold);
        draw_permit_table(&mut cursor, data, &regular, &bold);

        if let Some(application) = data.application {
            draw_application_section(&mut cursor, application, &regular, &bold);
        }
        if !data.permit.conditions.is_empty() {
            draw_conditions(&mut cursor, &data.permit.conditions, &regular, &bold);
        }
        if let Some(inspection) = data.inspection {
            draw_inspection_section(&mut cursor, inspection, &regular, &bold);
        }

        draw_signature_block(&mut cursor, &regular, &bold);
        draw_footers(&doc, &cursor.pages, &data.permit.permit_number, &regular);

        doc.save_to_bytes()
            .map_err(|e| SluiceError::Certificate(format!("pdf serialization failed: {e}")))
    }

    /// Logos at the top corners, or their text stand-ins
    fn draw_header(&self, cursor: &mut PageCursor<'_>, bold: &IndirectFontRef) {
        let top = cursor.y;
        if !place_logo(cursor, self.authority_logo.as_ref(), MARGIN, top) {
            cursor.layer.use_text(
                "WATER RESOURCES AUTHORITY",
                9.0,
                Mm(MARGIN),
                Mm(top - 6.0),
                bold,
            );
        }
        if !place_logo(cursor, self.ministry_logo.as_ref(), 150.0, top) {
            cursor.layer.use_text(
                "MINISTRY OF ENVIRONMENT",
                9.0,
                Mm(145.0),
                Mm(top - 6.0),
                bold,
            );
        }
        cursor.advance(26.0);
    }
}

/// Decode and place a PNG logo. Returns false when the logo is absent or
/// unreadable so the caller can fall back to text.
fn place_logo(cursor: &mut PageCursor<'_>, path: Option<&PathBuf>, x: f32, top: f32) -> bool {
    let path = match path {
        Some(path) => path,
        None => return false,
    };
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Certificate logo {} unreadable: {}", path.display(), e);
            return false;
        }
    };
    let decoder = match printpdf::image_crate::codecs::png::PngDecoder::new(Cursor::new(bytes)) {
        Ok(decoder) => decoder,
        Err(e) => {
            warn!("Certificate logo {} is not a valid PNG: {}", path.display(), e);
            return false;
        }
    };
    let image = match printpdf::Image::try_from(decoder) {
        Ok(image) => image,
        Err(e) => {
            warn!("Certificate logo {} failed to decode: {}", path.display(), e);
            return false;
        }
    };

    // Scale to a 20mm-tall header logo at 300dpi placement
    let native_height: Mm = image.image.height.into_pt(300.0).into();
    let scale = if native_height.0 > 0.0 {
        20.0 / native_height.0
    } else {
        1.0
    };

    image.add_to_layer(
        cursor.layer.clone(),
        printpdf::ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(top - 20.0)),
            scale_x: Some(scale),
            scale_y: Some(scale),
            ..Default::default()
        },
    );
    true
}

fn draw_title(
    cursor: &mut PageCursor<'_>,
    permit: &PermitDoc,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    cursor.text("WATER USE PERMIT CERTIFICATE", 18.0, 48.0, bold);
    cursor.advance(8.0);
    cursor.text(
        &format!("Permit No. {}", permit.permit_number),
        12.0,
        78.0,
        regular,
    );
    cursor.advance(4.0);
    cursor.rule(MARGIN, PAGE_WIDTH.0 - MARGIN);
    cursor.advance(10.0);
}

fn key_value_row(
    cursor: &mut PageCursor<'_>,
    label: &str,
    value: &str,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    cursor.ensure_space(7.0);
    cursor.text(label, 10.0, 25.0, bold);
    cursor.text(value, 10.0, 85.0, regular);
    cursor.advance(7.0);
}

fn section_heading(cursor: &mut PageCursor<'_>, title: &str, bold: &IndirectFontRef) {
    cursor.ensure_space(16.0);
    cursor.advance(4.0);
    cursor.text(title, 12.0, MARGIN, bold);
    cursor.advance(2.0);
    cursor.rule(MARGIN, PAGE_WIDTH.0 - MARGIN);
    cursor.advance(8.0);
}

fn format_date(date: bson::DateTime) -> String {
    date.to_chrono().format("%d %B %Y").to_string()
}

fn draw_permit_table(
    cursor: &mut PageCursor<'_>,
    data: &CertificateData<'_>,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    section_heading(cursor, "Permit Details", bold);
    key_value_row(cursor, "Permit Holder", data.holder_name, regular, bold);
    key_value_row(cursor, "Holder Contact", data.holder_identifier, regular, bold);
    key_value_row(cursor, "Permitted Use", &data.permit.purpose, regular, bold);
    key_value_row(
        cursor,
        "Date of Issue",
        &format_date(data.permit.issued_date),
        regular,
        bold,
    );
    key_value_row(
        cursor,
        "Date of Expiry",
        &format_date(data.permit.expiry_date),
        regular,
        bold,
    );
}

fn draw_application_section(
    cursor: &mut PageCursor<'_>,
    application: &ApplicationDoc,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    section_heading(cursor, "Project", bold);
    key_value_row(cursor, "Application No.", &application.application_number, regular, bold);
    key_value_row(cursor, "Project Title", &application.project_title, regular, bold);
    key_value_row(
        cursor,
        "Water Source",
        &format!("{} ({})", application.water_source, application.application_type),
        regular,
        bold,
    );
    key_value_row(
        cursor,
        "Location",
        &format!(
            "{}, {}, {}",
            application.location.sector, application.location.district, application.location.province
        ),
        regular,
        bold,
    );
    key_value_row(
        cursor,
        "Permitted Volume",
        &format!("{} {}", application.usage_volume, application.usage_unit),
        regular,
        bold,
    );
}

fn draw_conditions(
    cursor: &mut PageCursor<'_>,
    conditions: &[String],
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    section_heading(cursor, "Conditions", bold);
    for (i, condition) in conditions.iter().enumerate() {
        cursor.ensure_space(6.0);
        cursor.text(&format!("{}. {}", i + 1, condition), 10.0, 25.0, regular);
        cursor.advance(6.0);
    }
}

fn draw_inspection_section(
    cursor: &mut PageCursor<'_>,
    inspection: &InspectionDoc,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    section_heading(cursor, "Site Inspection", bold);
    key_value_row(
        cursor,
        "Inspection Date",
        &format_date(inspection.inspection_date),
        regular,
        bold,
    );
    key_value_row(
        cursor,
        "Compliance",
        inspection.findings.compliance.as_str(),
        regular,
        bold,
    );
    key_value_row(
        cursor,
        "Environmental Impact",
        &inspection.findings.environmental_impact,
        regular,
        bold,
    );
    if let Some(recommendations) = &inspection.findings.recommendations {
        key_value_row(cursor, "Recommendations", recommendations, regular, bold);
    }
}

fn draw_signature_block(
    cursor: &mut PageCursor<'_>,
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    cursor.ensure_space(SIGNATURE_BLOCK_MM);
    cursor.advance(16.0);

    cursor.rule(25.0, 85.0);
    cursor.rule(125.0, 185.0);
    cursor.advance(5.0);
    cursor.text("Authorized Officer", 9.0, 25.0, bold);
    cursor.text("Date", 9.0, 125.0, bold);
    cursor.advance(5.0);
    cursor.text(
        "This certificate is invalid without the authority seal.",
        8.0,
        25.0,
        regular,
    );
}

fn page_stamp(permit_number: &str, page: usize, total: usize) -> String {
    format!("Permit {} - Page {} of {}", permit_number, page, total)
}

fn draw_footers(
    doc: &PdfDocumentReference,
    pages: &[(PdfPageIndex, PdfLayerIndex)],
    permit_number: &str,
    regular: &IndirectFontRef,
) {
    let total = pages.len();
    for (i, (page, layer)) in pages.iter().enumerate() {
        let layer = doc.get_page(*page).get_layer(*layer);
        layer.use_text(FOOTER_DISCLAIMER, 7.0, Mm(MARGIN), Mm(FOOTER_Y + 4.0), regular);
        layer.use_text(
            page_stamp(permit_number, i + 1, total),
            8.0,
            Mm(MARGIN),
            Mm(FOOTER_Y),
            regular,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::DateTime as BsonDateTime;

    fn permit(conditions: Vec<String>) -> PermitDoc {
        PermitDoc {
            permit_number: "WP-2026-00042".into(),
            application_id: "64f000000000000000000001".into(),
            holder_id: "u-1".into(),
            purpose: "Irrigation abstraction from the Nyabarongo".into(),
            issued_date: BsonDateTime::now(),
            expiry_date: BsonDateTime::now(),
            conditions,
            ..Default::default()
        }
    }

    #[test]
    fn test_renders_pdf_bytes() {
        let renderer = CertificateRenderer::new(None, None);
        let permit = permit(vec!["Meter all abstraction points".into()]);
        let bytes = renderer
            .render(&CertificateData {
                permit: &permit,
                holder_name: "Uwase Claudine",
                holder_identifier: "claudine@example.rw",
                application: None,
                inspection: None,
            })
            .unwrap();

        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn test_long_condition_list_still_renders() {
        let renderer = CertificateRenderer::new(None, None);
        let conditions: Vec<String> = (0..80)
            .map(|i| format!("Condition {} applies to all abstraction points", i + 1))
            .collect();
        let permit = permit(conditions);
        let bytes = renderer
            .render(&CertificateData {
                permit: &permit,
                holder_name: "Uwase Claudine",
                holder_identifier: "claudine@example.rw",
                application: None,
                inspection: None,
            })
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_missing_logo_falls_back_to_text() {
        let renderer = CertificateRenderer::new(
            Some(PathBuf::from("/nonexistent/authority.png")),
            Some(PathBuf::from("/nonexistent/ministry.png")),
        );
        let permit = permit(vec![]);
        assert!(renderer
            .render(&CertificateData {
                permit: &permit,
                holder_name: "Uwase Claudine",
                holder_identifier: "claudine@example.rw",
                application: None,
                inspection: None,
            })
            .is_ok());
    }

    #[test]
    fn test_footer_carries_disclaimer_and_stamp() {
        // The disclaimer is fixed wording, stamped alongside the page count
        assert!(FOOTER_DISCLAIMER.contains("non-transferable"));
        assert_eq!(
            page_stamp("WP-2026-00042", 2, 3),
            "Permit WP-2026-00042 - Page 2 of 3"
        );
    }

    #[test]
    fn test_break_threshold() {
        // Plenty of room: no break
        assert!(!needs_break(200.0, 40.0));
        // 40mm needed with 39mm above the margin: break
        assert!(needs_break(MARGIN + 39.0, 40.0));
        assert!(!needs_break(MARGIN + 40.0, 40.0));
    }
}
