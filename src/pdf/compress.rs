//! PDF compression
//!
//! Two independent mechanisms: structural compression edits the document's
//! object graph (metadata, annotations, embedded images, stream encoding)
//! through `lopdf`, and byte-level optimization rewrites the serialized form
//! without parsing it. A failed compression is a no-op, never an error — the
//! public entry points hand back the original buffer when anything goes
//! wrong, so a caller can never lose the document.

use crate::error::{Error, Result};
use crate::pdf::validate::is_valid_pdf;
use image::codecs::jpeg::JpegEncoder;
use image::GenericImageView;
use lopdf::{Document, Object, ObjectId, Stream};

/// Options for a structural compression pass
#[derive(Debug, Clone)]
pub struct CompressOptions {
    /// Drop each page's annotation list
    pub remove_annotations: bool,
    /// Clear the Info dictionary's descriptive fields
    pub remove_metadata: bool,
    /// Prune unreferenced objects and recompress streams on save
    pub optimize_structure: bool,
    /// Re-encode embedded JPEG images
    pub compress_images: bool,
    /// JPEG quality (1-100) for re-encoded images
    pub image_quality: u8,
    /// Maximum width for re-encoded images
    pub max_image_width: u32,
    /// Maximum height for re-encoded images
    pub max_image_height: u32,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            remove_annotations: true,
            remove_metadata: true,
            optimize_structure: true,
            compress_images: true,
            image_quality: 60,
            max_image_width: 1200,
            max_image_height: 1600,
        }
    }
}

/// Structurally compress a PDF. On any internal failure the original buffer
/// is returned unchanged.
pub fn compress_structural(buffer: &[u8], options: &CompressOptions) -> Vec<u8> {
    match try_compress_structural(buffer, options) {
        Ok(compressed) => compressed,
        Err(error) => {
            tracing::warn!(%error, "structural compression failed, keeping original buffer");
            buffer.to_vec()
        }
    }
}

/// Fallible structural compression, used by the pipeline so stage failures
/// can be recorded explicitly instead of silently falling through.
pub(crate) fn try_compress_structural(
    buffer: &[u8],
    options: &CompressOptions,
) -> Result<Vec<u8>> {
    let mut doc = Document::load_mem(buffer).map_err(|e| Error::Compression {
        reason: format!("failed to load document: {}", e),
    })?;

    if options.remove_metadata {
        clear_document_metadata(&mut doc);
    }

    if options.remove_annotations {
        strip_page_annotations(&mut doc);
    }

    if options.compress_images {
        let recompressed = recompress_embedded_images(&mut doc, options);
        if recompressed > 0 {
            tracing::debug!(recompressed, "re-encoded embedded images");
        }
    }

    if options.optimize_structure {
        doc.prune_objects();
        doc.delete_zero_length_streams();
        doc.renumber_objects();
    }

    doc.compress();

    let mut out = Vec::with_capacity(buffer.len());
    doc.save_to(&mut out).map_err(|e| Error::Compression {
        reason: format!("failed to serialize document: {}", e),
    })?;
    Ok(out)
}

/// Clear the Info dictionary's descriptive fields (Title/Author/Subject/Keywords)
fn clear_document_metadata(doc: &mut Document) {
    let info_id = match doc.trailer.get(b"Info").and_then(Object::as_reference) {
        Ok(id) => id,
        Err(_) => return,
    };
    if let Some(Object::Dictionary(info)) = doc.objects.get_mut(&info_id) {
        for key in ["Title", "Author", "Subject", "Keywords"] {
            info.set(key, Object::string_literal(""));
        }
    }
}

/// Remove each page's `Annots` entry
fn strip_page_annotations(doc: &mut Document) {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in page_ids {
        if let Ok(page) = doc.get_object_mut(page_id) {
            if let Ok(dict) = page.as_dict_mut() {
                dict.remove(b"Annots");
            }
        }
    }
}

/// Best-effort re-encode of embedded JPEG (DCTDecode) image streams. Images
/// in other encodings are left alone; a re-encode that does not shrink the
/// stream is discarded. Returns the number of streams actually replaced.
fn recompress_embedded_images(doc: &mut Document, options: &CompressOptions) -> usize {
    let candidates: Vec<ObjectId> = doc
        .objects
        .iter()
        .filter_map(|(id, object)| match object {
            Object::Stream(stream) if is_jpeg_image_stream(stream) => Some(*id),
            _ => None,
        })
        .collect();

    let mut replaced = 0;
    for id in candidates {
        let Some(Object::Stream(stream)) = doc.objects.get_mut(&id) else {
            continue;
        };
        match recompress_jpeg_stream(stream, options) {
            Ok(true) => replaced += 1,
            Ok(false) => {}
            Err(error) => {
                tracing::debug!(object = ?id, %error, "skipping embedded image");
            }
        }
    }
    replaced
}

fn is_jpeg_image_stream(stream: &Stream) -> bool {
    let is_image = stream
        .dict
        .get(b"Subtype")
        .ok()
        .and_then(|s| s.as_name().ok())
        .map(|name| name == b"Image")
        .unwrap_or(false);
    is_image && primary_filter(stream).as_deref() == Some(b"DCTDecode".as_slice())
}

/// First entry of the stream's Filter chain, if it is a name
fn primary_filter(stream: &Stream) -> Option<Vec<u8>> {
    match stream.dict.get(b"Filter").ok()? {
        Object::Name(name) => Some(name.clone()),
        Object::Array(filters) => filters.first().and_then(|f| match f {
            Object::Name(name) => Some(name.clone()),
            _ => None,
        }),
        _ => None,
    }
}

fn recompress_jpeg_stream(stream: &mut Stream, options: &CompressOptions) -> Result<bool> {
    let img = image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
        .map_err(|e| Error::Compression {
            reason: format!("embedded JPEG decode failed: {}", e),
        })?;

    let (width, height) = img.dimensions();
    let resized = if width > options.max_image_width || height > options.max_image_height {
        img.thumbnail(options.max_image_width, options.max_image_height)
    } else {
        img
    };

    let rgb = resized.to_rgb8();
    let mut encoded = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut encoded, options.image_quality);
    encoder.encode_image(&rgb).map_err(|e| Error::Compression {
        reason: format!("embedded JPEG encode failed: {}", e),
    })?;

    if encoded.len() >= stream.content.len() {
        return Ok(false);
    }

    let (new_width, new_height) = rgb.dimensions();
    stream.dict.set("Width", Object::Integer(new_width as i64));
    stream.dict.set("Height", Object::Integer(new_height as i64));
    stream.dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    stream.dict.set("BitsPerComponent", Object::Integer(8));
    stream.dict.remove(b"DecodeParms");
    stream.set_content(encoded);
    Ok(true)
}

/// Byte-level fallback optimization. Three transformations run
/// independently — whitespace-run collapse, comment-line strip, line-ending
/// normalization — and the strictly smallest result that still passes
/// `is_valid_pdf` wins; ties keep the first-computed variant. If nothing is
/// both smaller and valid, the original buffer is returned.
pub fn optimize_bytes(buffer: &[u8]) -> Vec<u8> {
    let variants = [
        collapse_whitespace(buffer),
        strip_comment_lines(buffer),
        normalize_line_endings(buffer),
    ];

    let mut best: Option<Vec<u8>> = None;
    for candidate in variants {
        let current_len = best.as_ref().map_or(buffer.len(), Vec::len);
        if candidate.len() < current_len && is_valid_pdf(&candidate) {
            best = Some(candidate);
        }
    }
    best.unwrap_or_else(|| buffer.to_vec())
}

fn is_pdf_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | b'\x0c')
}

/// Runs of two or more whitespace bytes become a single space
fn collapse_whitespace(buffer: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(buffer.len());
    let mut i = 0;
    while i < buffer.len() {
        if is_pdf_whitespace(buffer[i]) {
            let mut j = i + 1;
            while j < buffer.len() && is_pdf_whitespace(buffer[j]) {
                j += 1;
            }
            if j - i >= 2 {
                out.push(b' ');
            } else {
                out.push(buffer[i]);
            }
            i = j;
        } else {
            out.push(buffer[i]);
            i += 1;
        }
    }
    out
}

/// Drop comment lines, keeping the `%PDF-` header and `%%EOF` markers
fn strip_comment_lines(buffer: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(buffer.len());
    let mut start = 0;
    while start < buffer.len() {
        let end = buffer[start..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|at| start + at + 1)
            .unwrap_or(buffer.len());
        let line = &buffer[start..end];
        let keep = !line.starts_with(b"%")
            || line.starts_with(b"%PDF-")
            || line.starts_with(b"%%EOF");
        if keep {
            out.extend_from_slice(line);
        }
        start = end;
    }
    out
}

/// `\r\n` and bare `\r` become `\n`; runs of blank lines collapse to one
fn normalize_line_endings(buffer: &[u8]) -> Vec<u8> {
    let mut unified = Vec::with_capacity(buffer.len());
    let mut i = 0;
    while i < buffer.len() {
        if buffer[i] == b'\r' {
            unified.push(b'\n');
            if i + 1 < buffer.len() && buffer[i + 1] == b'\n' {
                i += 1;
            }
        } else {
            unified.push(buffer[i]);
        }
        i += 1;
    }

    let mut out = Vec::with_capacity(unified.len());
    for &byte in &unified {
        if byte == b'\n' && out.last() == Some(&b'\n') {
            continue;
        }
        out.push(byte);
    }
    out
}
