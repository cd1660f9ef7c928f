//! A small single-page drawing surface over `lopdf`.
//!
//! Coordinates are given from the top-left corner in points, the way the
//! layouts are designed; the canvas flips them into PDF user space. Text uses
//! the standard Helvetica faces with WinAnsi encoding, so nothing is embedded.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use crate::utils::AppError;

pub const A4_SHORT: f32 = 595.28;
pub const A4_LONG: f32 = 841.89;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Italic,
}

impl Font {
    fn resource_name(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Italic => "F3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub f32, pub f32, pub f32);

impl Color {
    pub fn hex(rgb: u32) -> Self {
        Color(
            ((rgb >> 16) & 0xff) as f32 / 255.0,
            ((rgb >> 8) & 0xff) as f32 / 255.0,
            (rgb & 0xff) as f32 / 255.0,
        )
    }

    fn operands(&self) -> Vec<Object> {
        vec![self.0.into(), self.1.into(), self.2.into()]
    }
}

/// Helvetica advance widths (1/1000 em) for printable ASCII, 0x20..=0x7e
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

fn glyph_width(byte: u8, font: Font) -> u16 {
    let table = match font {
        Font::Bold => &HELVETICA_BOLD,
        Font::Regular | Font::Italic => &HELVETICA,
    };
    match byte {
        0x20..=0x7e => table[(byte - 0x20) as usize],
        _ => 556,
    }
}

/// Maps text into WinAnsiEncoding; characters outside it become `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            _ => b'?',
        })
        .collect()
}

pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let units: u32 = encode_win_ansi(text)
        .into_iter()
        .map(|b| glyph_width(b, font) as u32)
        .sum();
    units as f32 * size / 1000.0
}

/// Shortens `text` with a trailing ellipsis until it fits `max_width`
pub fn truncate_to_width(text: &str, font: Font, size: f32, max_width: f32) -> String {
    if text_width(text, font, size) <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate = format!("{}...", chars.iter().collect::<String>().trim_end());
        if text_width(&candidate, font, size) <= max_width {
            return candidate;
        }
    }
    String::from("...")
}

pub struct Canvas {
    width: f32,
    height: f32,
    operations: Vec<Operation>,
}

impl Canvas {
    pub fn a4_portrait() -> Self {
        Self::new(A4_SHORT, A4_LONG)
    }

    pub fn a4_landscape() -> Self {
        Self::new(A4_LONG, A4_SHORT)
    }

    fn new(width: f32, height: f32) -> Self {
        Canvas {
            width,
            height,
            operations: Vec::new(),
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.operations.push(Operation::new(operator, operands));
    }

    pub fn fill_rect(&mut self, x: f32, top: f32, w: f32, h: f32, color: Color) {
        self.op("rg", color.operands());
        self.op(
            "re",
            vec![x.into(), (self.height - top - h).into(), w.into(), h.into()],
        );
        self.op("f", vec![]);
    }

    pub fn stroke_rect(&mut self, x: f32, top: f32, w: f32, h: f32, color: Color, line_width: f32) {
        self.op("w", vec![line_width.into()]);
        self.op("RG", color.operands());
        self.op(
            "re",
            vec![x.into(), (self.height - top - h).into(), w.into(), h.into()],
        );
        self.op("S", vec![]);
    }

    /// Filled box with an outline
    pub fn panel(&mut self, x: f32, top: f32, w: f32, h: f32, fill: Color, stroke: Color) {
        self.fill_rect(x, top, w, h, fill);
        self.stroke_rect(x, top, w, h, stroke, 1.0);
    }

    pub fn polyline(&mut self, points: &[(f32, f32)], color: Color, line_width: f32) {
        let Some(((x0, y0), rest)) = points.split_first() else {
            return;
        };
        self.op("w", vec![line_width.into()]);
        self.op("RG", color.operands());
        self.op("m", vec![(*x0).into(), (self.height - y0).into()]);
        for (x, y) in rest {
            self.op("l", vec![(*x).into(), (self.height - y).into()]);
        }
        self.op("S", vec![]);
    }

    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Color, line_width: f32) {
        self.polyline(&[from, to], color, line_width);
    }

    /// Draws text whose top edge sits at `top`
    pub fn text(&mut self, x: f32, top: f32, size: f32, font: Font, color: Color, text: &str) {
        let baseline = self.height - top - size * 0.8;
        self.op("BT", vec![]);
        self.op("rg", color.operands());
        self.op("Tf", vec![font.resource_name().into(), size.into()]);
        self.op("Td", vec![x.into(), baseline.into()]);
        self.op(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        );
        self.op("ET", vec![]);
    }

    /// Centers text horizontally inside the band `[x, x + width]`
    pub fn text_centered(&mut self, x: f32, width: f32, top: f32, size: f32, font: Font, color: Color, text: &str) {
        let text = truncate_to_width(text, font, size, width);
        let left = x + (width - text_width(&text, font, size)) / 2.0;
        self.text(left.max(x), top, size, font, color, &text);
    }

    /// Left-aligned text cut to `max_width`
    pub fn text_fit(&mut self, x: f32, top: f32, size: f32, font: Font, color: Color, text: &str, max_width: f32) {
        let text = truncate_to_width(text, font, size, max_width);
        self.text(x, top, size, font, color, &text);
    }

    /// Serializes the page into a standalone PDF document
    pub fn finish(self) -> Result<Vec<u8>, AppError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font = |base: &str| {
            dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base.to_string(),
                "Encoding" => "WinAnsiEncoding",
            }
        };
        let regular_id = doc.add_object(font("Helvetica"));
        let bold_id = doc.add_object(font("Helvetica-Bold"));
        let italic_id = doc.add_object(font("Helvetica-Oblique"));

        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => regular_id,
                "F2" => bold_id,
                "F3" => italic_id,
            },
        });

        let content = Content {
            operations: self.operations,
        };
        let encoded = content
            .encode()
            .map_err(|e| AppError::Document(format!("content stream: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), self.width.into(), self.height.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| AppError::Document(format!("write: {}", e)))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_ansi_replaces_unsupported_chars() {
        assert_eq!(encode_win_ansi("Abc"), b"Abc".to_vec());
        assert_eq!(encode_win_ansi("café"), vec![b'c', b'a', b'f', 0xe9]);
        assert_eq!(encode_win_ansi("₹5"), b"?5".to_vec());
        assert_eq!(encode_win_ansi("“x”"), vec![0x93, b'x', 0x94]);
    }

    #[test]
    fn test_text_width_uses_font_metrics() {
        // "Hi" = H(722) + i(222) in regular, H(722) + i(278) in bold
        assert!((text_width("Hi", Font::Regular, 10.0) - 9.44).abs() < 0.001);
        assert!((text_width("Hi", Font::Bold, 10.0) - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        let long = "A very long campaign title that will not fit in the box";
        let cut = truncate_to_width(long, Font::Bold, 14.0, 120.0);
        assert!(cut.ends_with("..."));
        assert!(text_width(&cut, Font::Bold, 14.0) <= 120.0);
        assert_eq!(truncate_to_width("Short", Font::Regular, 10.0, 200.0), "Short");
    }

    #[test]
    fn test_color_from_hex() {
        assert_eq!(Color::hex(0xffffff), Color(1.0, 1.0, 1.0));
        assert_eq!(Color::hex(0x000000), Color(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_blank_canvas_is_a_pdf() {
        let mut canvas = Canvas::a4_portrait();
        canvas.fill_rect(0.0, 0.0, 100.0, 50.0, Color::hex(0x3b82f6));
        canvas.text(10.0, 10.0, 12.0, Font::Bold, Color::hex(0xffffff), "Hello (world)");
        let bytes = canvas.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
