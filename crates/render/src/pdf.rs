//! Paginate a rasterized document and wrap the pages in a PDF.

use image::codecs::jpeg::JpegEncoder;
use image::{RgbImage, RgbaImage};
use std::fmt::Write as _;

const JPEG_QUALITY: u8 = 90;

/// Page size and margin in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl PageGeometry {
    pub const LETTER: PageGeometry = PageGeometry {
        width: 612.0,
        height: 792.0,
        margin: 36.0,
    };

    pub fn usable_width(&self) -> f64 {
        self.width - 2.0 * self.margin
    }

    pub fn usable_height(&self) -> f64 {
        self.height - 2.0 * self.margin
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::LETTER
    }
}

/// One horizontal slice of the source image, and the height it occupies on
/// its page once scaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub src_y: u32,
    pub src_height: u32,
    pub draw_height: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("nothing to export: the rendered image is empty")]
    EmptyImage,
    #[error("page geometry leaves no room for content")]
    NoUsableArea,
    #[error("the rendered image is too narrow to split into pages ({width} px wide)")]
    TooNarrow { width: u32 },
    #[error("failed to encode page image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Split an image of `width` × `height` pixels into page bands.
///
/// The image is scaled to the usable width. Band `i` starts at
/// `floor(i * usable_height / scale)`; the last band ends at the image
/// bottom and may be shorter.
pub fn paginate(width: u32, height: u32, geometry: &PageGeometry) -> Result<Vec<Band>, PdfError> {
    if width == 0 || height == 0 {
        return Err(PdfError::EmptyImage);
    }
    let usable_w = geometry.usable_width();
    let usable_h = geometry.usable_height();
    if usable_w <= 0.0 || usable_h <= 0.0 {
        return Err(PdfError::NoUsableArea);
    }

    let scale = usable_w / f64::from(width);
    let scaled_height = f64::from(height) * scale;
    // Tolerance keeps an exact fit from spilling onto an empty extra page.
    let pages = ((scaled_height / usable_h) - 1e-9).ceil().max(1.0) as u32;
    let band_src = usable_h / scale;
    // Each page must start on a new source row.
    if band_src < 1.0 {
        return Err(PdfError::TooNarrow { width });
    }

    let mut bands = Vec::with_capacity(pages as usize);
    for i in 0..pages {
        let start = ((f64::from(i) * band_src).floor() as u32).min(height);
        let end = if i + 1 == pages {
            height
        } else {
            ((f64::from(i + 1) * band_src).floor() as u32).min(height)
        };
        let src_height = end.saturating_sub(start);
        bands.push(Band {
            src_y: start,
            src_height,
            draw_height: f64::from(src_height) * scale,
        });
    }
    Ok(bands)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfDocument {
    pub bytes: Vec<u8>,
    pub page_count: u32,
}

/// Composite onto white; JPEG has no alpha.
fn flatten(band: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(band.width(), band.height(), |x, y| {
        let [r, g, b, a] = band.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let over_white = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        image::Rgb([over_white(r), over_white(g), over_white(b)])
    })
}

fn encode_jpeg(rgb: &RgbImage) -> Result<Vec<u8>, PdfError> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode_image(rgb)?;
    Ok(jpeg)
}

struct PdfWriter {
    out: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            out,
            offsets: Vec::new(),
        }
    }

    /// Objects must be written in id order starting at 1.
    fn object(&mut self, id: usize, dict: &str, stream: Option<&[u8]>) {
        debug_assert_eq!(id, self.offsets.len() + 1);
        self.offsets.push(self.out.len());
        self.out
            .extend_from_slice(format!("{id} 0 obj\n{dict}\n").as_bytes());
        if let Some(data) = stream {
            self.out.extend_from_slice(b"stream\n");
            self.out.extend_from_slice(data);
            self.out.extend_from_slice(b"\nendstream\n");
        }
        self.out.extend_from_slice(b"endobj\n");
    }

    fn finish(mut self, root: usize) -> Vec<u8> {
        let xref_at = self.out.len();
        let mut table = format!("xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1);
        for offset in &self.offsets {
            let _ = write!(table, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            table,
            "trailer\n<< /Size {} /Root {root} 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            self.offsets.len() + 1
        );
        self.out.extend_from_slice(table.as_bytes());
        self.out
    }
}

/// Lay `image` out over as many pages as it needs, top-aligned inside the
/// margins.
pub fn export_pdf(image: &RgbaImage, geometry: &PageGeometry) -> Result<PdfDocument, PdfError> {
    let bands = paginate(image.width(), image.height(), geometry)?;
    let draw_width = geometry.usable_width();

    // Ids: 1 catalog, 2 page tree, then (page, content, image) per band.
    let page_id = |i: usize| 3 + i * 3;
    let kids = (0..bands.len())
        .map(|i| format!("{} 0 R", page_id(i)))
        .collect::<Vec<_>>()
        .join(" ");

    let mut writer = PdfWriter::new();
    writer.object(1, "<< /Type /Catalog /Pages 2 0 R >>", None);
    writer.object(
        2,
        &format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", bands.len()),
        None,
    );

    for (i, band) in bands.iter().enumerate() {
        let slice =
            image::imageops::crop_imm(image, 0, band.src_y, image.width(), band.src_height)
                .to_image();
        let jpeg = encode_jpeg(&flatten(&slice))?;

        let page = page_id(i);
        let content = page + 1;
        let xobject = page + 2;
        let x = geometry.margin;
        let y = geometry.height - geometry.margin - band.draw_height;
        let ops = format!(
            "q\n{draw_width:.2} 0 0 {:.2} {x:.2} {y:.2} cm\n/Im0 Do\nQ",
            band.draw_height
        );

        writer.object(
            page,
            &format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Resources << /XObject << /Im0 {xobject} 0 R >> >> /Contents {content} 0 R >>",
                geometry.width, geometry.height
            ),
            None,
        );
        writer.object(
            content,
            &format!("<< /Length {} >>", ops.len()),
            Some(ops.as_bytes()),
        );
        writer.object(
            xobject,
            &format!(
                "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                 /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>",
                slice.width(),
                slice.height(),
                jpeg.len()
            ),
            Some(&jpeg),
        );
    }

    Ok(PdfDocument {
        bytes: writer.finish(1),
        page_count: bands.len() as u32,
    })
}
