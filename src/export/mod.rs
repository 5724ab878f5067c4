// src/export/mod.rs

mod pdf;

pub use pdf::{A4_HEIGHT_PT, A4_WIDTH_PT, image_pdf, text_pdf};

use crate::render::{DocumentView, Theme};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("rasterization failed: {0}")]
    Raster(String),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF generation failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("share failed: {0}")]
    Share(String),
}

/// Paints a document view into pixels.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, view: &DocumentView, theme: Theme) -> Result<RgbaImage, ExportError>;
}

/// What gets handed to a platform share sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SharePayload {
    pub file_name: String,
    pub png: Vec<u8>,
    pub title: String,
    pub text: String,
}

#[async_trait]
pub trait ShareSheet: Send + Sync {
    /// Whether this sheet can take the payload at all.
    fn can_share(&self, payload: &SharePayload) -> bool;

    async fn share(&self, payload: SharePayload) -> Result<(), ExportError>;
}

pub fn png_file_name(invoice_number: &str) -> String {
    format!("{}.png", file_stem(invoice_number))
}

pub fn pdf_file_name(invoice_number: &str) -> String {
    format!("{}.pdf", file_stem(invoice_number))
}

/// The invoice number as a single path component inside the output directory.
fn file_stem(invoice_number: &str) -> String {
    let cleaned: String = invoice_number
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        "invoice".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image.clone()).write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Rasterize and write `<invoice_number>.png` into `out_dir`.
pub async fn export_png(
    rasterizer: &dyn Rasterizer,
    view: &DocumentView,
    theme: Theme,
    out_dir: &Path,
) -> Result<PathBuf, ExportError> {
    let image = rasterizer.rasterize(view, theme).await?;
    let bytes = encode_png(&image)?;
    let path = out_dir.join(png_file_name(&view.invoice_number));
    write_whole(&path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "PNG exported");
    Ok(path)
}

/// Write `<invoice_number>.pdf` into `out_dir`.
///
/// With a rasterizer the page carries the rendered image scaled to the page
/// width; without one the document lines are set as text.
pub async fn export_pdf(
    rasterizer: Option<&dyn Rasterizer>,
    view: &DocumentView,
    theme: Theme,
    out_dir: &Path,
) -> Result<PathBuf, ExportError> {
    let bytes = match rasterizer {
        Some(r) => {
            let image = r.rasterize(view, theme).await?;
            image_pdf(&image, &view.invoice_number)?
        }
        None => text_pdf(&view.lines(), &view.invoice_number)?,
    };
    let path = out_dir.join(pdf_file_name(&view.invoice_number));
    write_whole(&path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "PDF exported");
    Ok(path)
}

/// Rasterize and build the share sheet payload.
pub async fn share_payload(
    rasterizer: &dyn Rasterizer,
    view: &DocumentView,
    theme: Theme,
    business_name: &str,
) -> Result<SharePayload, ExportError> {
    let image = rasterizer.rasterize(view, theme).await?;
    Ok(SharePayload {
        file_name: png_file_name(&view.invoice_number),
        png: encode_png(&image)?,
        title: format!("Invoice {}", view.invoice_number),
        text: format!("Invoice from {business_name}"),
    })
}

/// Write a fully encoded file; a failed write leaves nothing behind.
fn write_whole(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    if let Err(e) = std::fs::write(path, bytes) {
        warn!(path = %path.display(), error = %e, "Write failed, removing partial file");
        let _ = std::fs::remove_file(path);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{BusinessSection, InvoiceSection};
    use crate::format::Grouping;
    use crate::invoice::Invoice;
    use image::Rgba;
    use time::macros::date;

    /// Fills the page with the theme background; one row of pixels per line.
    pub(crate) struct SolidRasterizer;

    #[async_trait]
    impl Rasterizer for SolidRasterizer {
        async fn rasterize(
            &self,
            view: &DocumentView,
            theme: Theme,
        ) -> Result<RgbaImage, ExportError> {
            let [r, g, b] = theme.background();
            let height = view.lines().len() as u32;
            Ok(RgbaImage::from_pixel(20, height, Rgba([r, g, b, 255])))
        }
    }

    pub(crate) struct FailingRasterizer;

    #[async_trait]
    impl Rasterizer for FailingRasterizer {
        async fn rasterize(&self, _: &DocumentView, _: Theme) -> Result<RgbaImage, ExportError> {
            Err(ExportError::Raster("canvas lost".to_string()))
        }
    }

    fn view() -> DocumentView {
        let inv = Invoice::from_template(
            &BusinessSection::default(),
            &InvoiceSection::default(),
            date!(2026 - 3 - 1),
        );
        DocumentView::build(&inv, Grouping::Indian)
    }

    #[test]
    fn test_file_names() {
        assert_eq!(png_file_name("INV-2026-001"), "INV-2026-001.png");
        assert_eq!(pdf_file_name("INV-2026-001"), "INV-2026-001.pdf");
    }

    #[test]
    fn test_file_names_stay_inside_out_dir() {
        assert_eq!(pdf_file_name("INV/2026/001"), "INV_2026_001.pdf");
        assert_eq!(png_file_name("/tmp/escaped"), "_tmp_escaped.png");
        assert_eq!(pdf_file_name("..\\..\\boot"), ".._.._boot.pdf");
        assert_eq!(pdf_file_name("C:INV 7"), "C_INV 7.pdf");
        assert_eq!(pdf_file_name(""), "invoice.pdf");
        assert_eq!(pdf_file_name(".."), "invoice.pdf");
        assert_eq!(png_file_name("  .  "), "invoice.png");
    }

    #[tokio::test]
    async fn test_absolute_invoice_number_writes_into_out_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let elsewhere = tempfile::tempdir().expect("tempdir");
        let mut v = view();
        v.invoice_number = elsewhere.path().join("escaped").to_string_lossy().into_owned();

        let path = export_png(&SolidRasterizer, &v, Theme::Light, dir.path())
            .await
            .expect("export");
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.exists());
        assert!(std::fs::read_dir(elsewhere.path()).expect("dir").next().is_none());
    }

    #[tokio::test]
    async fn test_export_png_writes_decodable_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = export_png(&SolidRasterizer, &view(), Theme::Dark, dir.path())
            .await
            .expect("export");
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("INV-2026-001.png"));

        let decoded = image::open(&path).expect("decode").to_rgba8();
        assert_eq!(decoded.width(), 20);
        assert_eq!(decoded.get_pixel(0, 0), &Rgba([0x0f, 0x17, 0x2a, 255]));
    }

    #[tokio::test]
    async fn test_failed_raster_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = export_png(&FailingRasterizer, &view(), Theme::Light, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Raster(_)));
        assert!(!dir.path().join("INV-2026-001.png").exists());

        let err = export_pdf(Some(&FailingRasterizer), &view(), Theme::Light, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Raster(_)));
        assert!(!dir.path().join("INV-2026-001.pdf").exists());
    }

    #[tokio::test]
    async fn test_export_pdf_both_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = export_pdf(None, &view(), Theme::Light, dir.path())
            .await
            .expect("text pdf");
        let doc = lopdf::Document::load(&path).expect("load");
        assert_eq!(doc.get_pages().len(), 1);

        let path = export_pdf(Some(&SolidRasterizer), &view(), Theme::Light, dir.path())
            .await
            .expect("image pdf");
        let doc = lopdf::Document::load(&path).expect("load");
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[tokio::test]
    async fn test_share_payload_captions() {
        let payload = share_payload(&SolidRasterizer, &view(), Theme::Light, "Acme Traders")
            .await
            .expect("payload");
        assert_eq!(payload.file_name, "INV-2026-001.png");
        assert_eq!(payload.title, "Invoice INV-2026-001");
        assert_eq!(payload.text, "Invoice from Acme Traders");
        assert!(payload.png.starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
