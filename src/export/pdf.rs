// src/export/pdf.rs

use super::ExportError;
use image::{DynamicImage, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use tracing::debug;

/// A4 in PDF points.
pub const A4_WIDTH_PT: f32 = 595.28;
pub const A4_HEIGHT_PT: f32 = 841.89;

const MARGIN_PT: f32 = 40.0;
const FONT_SIZE: f32 = 9.0;
const LEADING: f32 = 11.0;

/// One A4 page with `image` drawn at full page width, anchored to the top.
///
/// Taller images run off the bottom of the page, as a single-page export.
pub fn image_pdf(image: &RgbaImage, title: &str) -> Result<Vec<u8>, ExportError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ExportError::Raster("empty image".to_string()));
    }
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8().into_raw();

    let draw_w = A4_WIDTH_PT;
    let draw_h = height as f32 * draw_w / width as f32;
    debug!(width, height, draw_h, "Placing raster on A4 page");

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb,
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    draw_w.into(),
                    0.into(),
                    0.into(),
                    draw_h.into(),
                    0.into(),
                    (A4_HEIGHT_PT - draw_h).into(),
                ],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let resources = dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    };
    let page_id = add_page(&mut doc, pages_id, content, resources)?;

    finish(doc, pages_id, vec![page_id], title)
}

/// A4 pages of monospaced text, one entry of `lines` per printed line.
pub fn text_pdf(lines: &[String], title: &str) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });

    let per_page = ((A4_HEIGHT_PT - 2.0 * MARGIN_PT) / LEADING).floor() as usize;
    let mut kids = Vec::new();
    let chunks: Vec<&[String]> = if lines.is_empty() {
        vec![lines]
    } else {
        lines.chunks(per_page).collect()
    };

    for chunk in chunks {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
            Operation::new("TL", vec![LEADING.into()]),
            Operation::new(
                "Td",
                vec![MARGIN_PT.into(), (A4_HEIGHT_PT - MARGIN_PT).into()],
            ),
        ];
        for line in chunk {
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(pdf_safe(line))],
            ));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let resources = dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        };
        kids.push(add_page(&mut doc, pages_id, Content { operations }, resources)?);
    }

    finish(doc, pages_id, kids, title)
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    content: Content,
    resources: lopdf::Dictionary,
) -> Result<ObjectId, ExportError> {
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources,
    }))
}

fn finish(
    mut doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    title: &str,
) -> Result<Vec<u8>, ExportError> {
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.into_iter().map(Object::from).collect::<Vec<_>>(),
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), A4_WIDTH_PT.into(), A4_HEIGHT_PT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(pdf_safe(title)),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)?;
    Ok(buf)
}

/// Base-14 fonts only cover Latin text; spell out common currency signs
/// and replace anything else outside ASCII.
fn pdf_safe(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '₹' => out.push_str("Rs."),
            '€' => out.push_str("EUR"),
            '£' => out.push_str("GBP"),
            c if c.is_ascii() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}
