//! Page rasterization for paginated documents.
//!
//! Scanned PDFs carry each page as an image XObject. The default rasterizer
//! walks the page tree in order, decodes the dominant image of every page and
//! writes it as a transient PNG. Pages without an image are rendered blank at
//! their MediaBox size so page indices stay aligned with the document.

use super::{Page, SourceDocument};
use crate::artifact::ImageArtifact;
use crate::error::DocumentError;
use image::{DynamicImage, GrayImage, Luma};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::path::PathBuf;

/// US Letter in points, used when a page has no usable MediaBox
const DEFAULT_PAGE_SIZE: (u32, u32) = (612, 792);
const MAX_BLANK_DIMENSION: u32 = 4000;
/// Guards against cyclic `Parent` links in broken page trees
const MAX_TREE_DEPTH: usize = 64;

/// Converts a paginated document into ordered page renders
pub trait Rasterizer: Send + Sync {
    /// Returns one page per document page, indexed from 0 in document order.
    ///
    /// Fails with [`DocumentError::UnreadableDocument`] when the document has
    /// no pages at all.
    fn rasterize(&self, document: &SourceDocument) -> Result<Vec<Page>, DocumentError>;
}

/// Rasterizer that decodes page images with `lopdf`
#[derive(Debug, Clone)]
pub struct PdfRasterizer {
    artifact_dir: PathBuf,
}

impl PdfRasterizer {
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
        }
    }
}

impl Rasterizer for PdfRasterizer {
    fn rasterize(&self, document: &SourceDocument) -> Result<Vec<Page>, DocumentError> {
        let doc = Document::load(document.path())
            .map_err(|e| DocumentError::ProcessingError(format!("Failed to load PDF: {}", e)))?;

        // BTreeMap keyed by 1-based page number, so iteration is in page order
        let page_ids = doc.get_pages();
        if page_ids.is_empty() {
            return Err(DocumentError::UnreadableDocument(
                "No pages found in PDF file.".to_string(),
            ));
        }

        tracing::info!(
            document_id = %document.id(),
            pages = page_ids.len(),
            "Rasterizing PDF"
        );

        let prefix = document.artifact_prefix();
        let mut pages = Vec::with_capacity(page_ids.len());
        for (index, page_id) in page_ids.values().enumerate() {
            let render = render_page(&doc, *page_id);
            let artifact = ImageArtifact::write_transient(
                &render,
                &self.artifact_dir,
                &format!("{}page_{}_", prefix, index),
            )?;
            pages.push(Page::new(index, artifact));
        }

        Ok(pages)
    }
}

fn render_page(doc: &Document, page_id: ObjectId) -> DynamicImage {
    let largest = inherited_attribute(doc, page_id, b"Resources")
        .and_then(|resources| resources.as_dict().ok())
        .map(|resources| page_images(doc, resources))
        .unwrap_or_default()
        .into_iter()
        .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()));

    match largest {
        Some(img) => img,
        None => {
            let (width, height) = media_box_size(doc, page_id);
            tracing::debug!(?page_id, width, height, "Page has no image, rendering blank");
            DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([255u8])))
        }
    }
}

/// Decode every image XObject referenced from a page's resources
fn page_images(doc: &Document, resources: &Dictionary) -> Vec<DynamicImage> {
    let xobjects = match resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
    {
        Some(xobjects) => xobjects,
        None => return Vec::new(),
    };

    xobjects
        .iter()
        .filter_map(|(name, obj)| {
            let stream = resolve(doc, obj)?.as_stream().ok()?;
            let is_image = stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .is_ok_and(|subtype| subtype == b"Image");
            if !is_image {
                return None;
            }
            match decode_image(doc, stream) {
                Ok(img) => Some(img),
                Err(e) => {
                    tracing::warn!(
                        "Failed to decode image XObject {}: {}",
                        String::from_utf8_lossy(name),
                        e
                    );
                    None
                }
            }
        })
        .collect()
}

/// Decode an image XObject stream into a raster image
fn decode_image(doc: &Document, stream: &Stream) -> Result<DynamicImage, DocumentError> {
    let width = dimension(stream, b"Width")?;
    let height = dimension(stream, b"Height")?;
    let filters = filter_names(stream);

    if filters.iter().any(|f| f == "DCTDecode") {
        return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
            .map_err(|e| DocumentError::ProcessingError(format!("Failed to decode JPEG: {}", e)));
    }

    let data = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream.decompressed_content().map_err(|e| {
            DocumentError::ProcessingError(format!(
                "Failed to decompress image ({}): {}",
                filters.join(", "),
                e
            ))
        })?
    };

    let bits_per_component = stream
        .dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|b| b.as_i64().ok())
        .unwrap_or(8);
    let color_space = color_space_name(doc, stream);
    let pixels = (width as usize) * (height as usize);

    match (color_space.as_str(), bits_per_component) {
        ("DeviceGray", 8) if data.len() >= pixels => {
            GrayImage::from_raw(width, height, data[..pixels].to_vec())
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| DocumentError::ProcessingError("Invalid grayscale data".into()))
        }
        ("DeviceGray", 1) => unpack_bilevel(&data, width, height)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(|| DocumentError::ProcessingError("Invalid 1-bit image data".into())),
        ("DeviceRGB" | "ICCBased", 8) if data.len() >= pixels * 3 => {
            image::RgbImage::from_raw(width, height, data[..pixels * 3].to_vec())
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| DocumentError::ProcessingError("Invalid RGB data".into()))
        }
        ("DeviceCMYK", 8) if data.len() >= pixels * 4 => {
            let rgb_data = data[..pixels * 4]
                .chunks_exact(4)
                .flat_map(|cmyk| {
                    let k = 1.0 - f32::from(cmyk[3]) / 255.0;
                    [cmyk[0], cmyk[1], cmyk[2]]
                        .map(|c| ((1.0 - f32::from(c) / 255.0) * k * 255.0) as u8)
                })
                .collect();
            image::RgbImage::from_raw(width, height, rgb_data)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| DocumentError::ProcessingError("Invalid CMYK data".into()))
        }
        (space, bits) => Err(DocumentError::ProcessingError(format!(
            "Unsupported image format: {} at {} bits, data_len={}",
            space,
            bits,
            data.len()
        ))),
    }
}

/// Expand 1 bit per pixel rows (padded to whole bytes) into 8-bit grayscale
fn unpack_bilevel(data: &[u8], width: u32, height: u32) -> Option<GrayImage> {
    let row_bytes = (width as usize).div_ceil(8);
    if data.len() < row_bytes * height as usize {
        return None;
    }
    Some(GrayImage::from_fn(width, height, |x, y| {
        let byte = data[y as usize * row_bytes + x as usize / 8];
        let bit = (byte >> (7 - (x % 8))) & 1;
        Luma([if bit == 1 { 255 } else { 0 }])
    }))
}

fn dimension(stream: &Stream, key: &[u8]) -> Result<u32, DocumentError> {
    stream
        .dict
        .get(key)
        .ok()
        .and_then(|v| v.as_i64().ok())
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            DocumentError::ProcessingError(format!(
                "Missing image {}",
                String::from_utf8_lossy(key).to_lowercase()
            ))
        })
}

fn filter_names(stream: &Stream) -> Vec<String> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![String::from_utf8_lossy(name).to_string()],
        Ok(Object::Array(filters)) => filters
            .iter()
            .filter_map(|f| f.as_name().ok())
            .map(|name| String::from_utf8_lossy(name).to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// Get the color space name from a PDF stream, resolving indirect references
fn color_space_name(doc: &Document, stream: &Stream) -> String {
    let resolved = match stream.dict.get(b"ColorSpace").ok().and_then(|cs| resolve(doc, cs)) {
        Some(obj) => obj,
        None => return "DeviceRGB".to_string(),
    };

    let name = match resolved {
        // e.g. [/ICCBased 12 0 R]
        Object::Array(array) => array.first().and_then(|first| first.as_name().ok()),
        other => other.as_name().ok(),
    };

    name.map(|n| String::from_utf8_lossy(n).to_string())
        .unwrap_or_else(|| "DeviceRGB".to_string())
}

fn media_box_size(doc: &Document, page_id: ObjectId) -> (u32, u32) {
    let size = inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .and_then(|bounds| {
            let values: Vec<f32> = bounds.iter().filter_map(|v| v.as_float().ok()).collect();
            match values.as_slice() {
                [x0, y0, x1, y1] => Some(((x1 - x0).abs(), (y1 - y0).abs())),
                _ => None,
            }
        });

    match size {
        Some((w, h)) if w >= 1.0 && h >= 1.0 => (
            (w as u32).min(MAX_BLANK_DIMENSION),
            (h as u32).min(MAX_BLANK_DIMENSION),
        ),
        _ => DEFAULT_PAGE_SIZE,
    }
}

/// Look up a page attribute, following `Parent` links for inherited values
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return resolve(doc, value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj.as_reference() {
        Ok(id) => doc.get_object(id).ok(),
        Err(_) => Some(obj),
    }
}
