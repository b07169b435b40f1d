//! Synchronous PDF composition.
//!
//! Everything here runs without awaiting: the document handle is not
//! `Send`, so all remote data is gathered before [`compose`] is called.

use image::{DynamicImage, GenericImageView};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Rgb,
};

use crate::export::error::{ExportError, ExportResult};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const FOOTER_Y: f32 = 12.0;
const LAYER_NAME: &str = "Layer 1";

const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 11.0;
const FOOTER_SIZE: f32 = 9.0;
const LINE_HEIGHT: f32 = 5.5;
const PARAGRAPH_GAP: f32 = 4.0;
/// Characters per body line at `BODY_SIZE` across the text column.
pub const WRAP_COLUMNS: usize = 85;

const IMAGE_DPI: f32 = 150.0;
const IMAGE_MAX_WIDTH: f32 = 120.0;
const IMAGE_MAX_HEIGHT: f32 = 80.0;

/// One labelled paragraph with its media.
#[derive(Debug, Default)]
pub struct Entry {
    /// Role label.
    pub label: &'static str,
    /// Paragraph text.
    pub text: String,
    /// Decoded images with captions.
    pub images: Vec<(DynamicImage, String)>,
    /// Video URLs written as link-coloured text.
    pub videos: Vec<String>,
}

/// Static text around the transcript.
#[derive(Debug)]
pub struct Frame<'a> {
    /// Heading on the first page.
    pub title: &'a str,
    /// Line under the heading.
    pub subtitle: String,
    /// Footer on every page.
    pub footer: String,
}

/// Greedy word wrap at `columns` characters; overlong words are split.
#[must_use]
pub fn wrap(text: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        let mut width = 0;

        for word in paragraph.split_whitespace() {
            let mut chars: Vec<char> = word.chars().collect();
            while chars.len() > columns {
                if width > 0 {
                    lines.push(std::mem::take(&mut line));
                    width = 0;
                }
                lines.push(chars.drain(..columns).collect());
            }
            let len = chars.len();
            if len == 0 {
                continue;
            }
            if width > 0 && width + 1 + len > columns {
                lines.push(std::mem::take(&mut line));
                width = 0;
            }
            if width > 0 {
                line.push(' ');
                width += 1;
            }
            line.extend(chars);
            width += len;
        }
        lines.push(line);
    }
    lines
}

/// Replace characters the built-in font cannot encode.
fn latin1(text: &str) -> String {
    text.chars()
        .map(|c| if u32::from(c) <= 0xFF { c } else { '?' })
        .collect()
}

fn pdf_error(err: &printpdf::Error) -> ExportError {
    ExportError::Pdf(format!("{err:?}"))
}

struct Writer<'a> {
    doc: &'a PdfDocumentReference,
    font: IndirectFontRef,
    latin1_only: bool,
    footer: String,
    layer: PdfLayerReference,
    y: f32,
}

impl Writer<'_> {
    fn encode(&self, text: &str) -> String {
        if self.latin1_only {
            latin1(text)
        } else {
            text.to_string()
        }
    }

    fn text(&self, text: &str, size: f32, x: f32, y: f32) {
        let encoded = self.encode(text);
        self.layer.use_text(encoded, size, Mm(x), Mm(y), &self.font);
    }

    fn draw_footer(&self) {
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(0.5, 0.5, 0.5, None)));
        self.text(&self.footer, FOOTER_SIZE, MARGIN, FOOTER_Y);
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.draw_footer();
    }

    fn reserve(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.new_page();
        }
    }

    fn line(&mut self, text: &str, size: f32) {
        self.reserve(LINE_HEIGHT);
        self.y -= LINE_HEIGHT;
        self.text(text, size, MARGIN, self.y);
    }

    fn paragraph(&mut self, text: &str) {
        for line in wrap(text, WRAP_COLUMNS) {
            self.line(&line, BODY_SIZE);
        }
    }

    fn link(&mut self, url: &str) {
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(0.05, 0.3, 0.75, None)));
        self.line(url, BODY_SIZE);
        self.layer
            .set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    }

    fn image(&mut self, img: &DynamicImage, caption: &str) {
        let (px_width, px_height) = img.dimensions();
        let (px_w, px_h) = (px_width as f32, px_height as f32);
        if px_w < 1.0 || px_h < 1.0 {
            return;
        }
        let natural_w = px_w * 25.4 / IMAGE_DPI;
        let natural_h = px_h * 25.4 / IMAGE_DPI;
        let scale = (IMAGE_MAX_WIDTH / natural_w).min(IMAGE_MAX_HEIGHT / natural_h);
        let height = natural_h * scale;

        self.reserve(height + PARAGRAPH_GAP);
        self.y -= height;
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        Image::from_dynamic_image(&rgb).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN)),
                translate_y: Some(Mm(self.y)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(IMAGE_DPI),
                ..Default::default()
            },
        );
        if !caption.is_empty() {
            self.line(caption, FOOTER_SIZE);
        }
        self.y -= PARAGRAPH_GAP / 2.0;
    }
}

/// Lay out `entries` into PDF bytes.
///
/// With `font_bytes` absent or unusable the built-in Helvetica is used and
/// text is reduced to Latin-1.
///
/// # Errors
/// Returns an error only if the document itself cannot be serialized.
pub fn compose(
    frame: &Frame<'_>,
    entries: &[Entry],
    font_bytes: Option<&[u8]>,
) -> ExportResult<Vec<u8>> {
    let (doc, page, layer) =
        PdfDocument::new(frame.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME);

    let embedded = font_bytes.and_then(|bytes| match doc.add_external_font(bytes) {
        Ok(font) => Some(font),
        Err(err) => {
            tracing::warn!("Embedding export font failed, using Helvetica: {err:?}");
            None
        }
    });
    let (font, latin1_only) = match embedded {
        Some(font) => (font, false),
        None => (
            doc.add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|e| pdf_error(&e))?,
            true,
        ),
    };

    let mut writer = Writer {
        doc: &doc,
        font,
        latin1_only,
        footer: frame.footer.clone(),
        layer: doc.get_page(page).get_layer(layer),
        y: PAGE_HEIGHT - MARGIN,
    };
    writer.draw_footer();

    writer.line(frame.title, TITLE_SIZE);
    writer.y -= 2.0;
    writer.line(&frame.subtitle, FOOTER_SIZE);
    writer.y -= PARAGRAPH_GAP * 2.0;

    for entry in entries {
        writer.paragraph(&format!("{}: {}", entry.label, entry.text));
        for (img, caption) in &entry.images {
            writer.image(img, caption);
        }
        for url in &entry.videos {
            writer.link(url);
        }
        writer.y -= PARAGRAPH_GAP;
    }

    drop(writer);
    doc.save_to_bytes().map_err(|e| pdf_error(&e))
}
