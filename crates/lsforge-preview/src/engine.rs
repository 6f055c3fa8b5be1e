use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use lsforge_codec::{loca, lsj, lsx};
use lsforge_runner::{CancelFlag, Converter, ProgressSink};
use lsforge_tree::Document;
use tracing::debug;

use crate::handlers::{Handler, HandlerRegistry};
use crate::record::{PreviewRecord, ThumbnailDecoder, extension_of, filename_of};
use crate::util::{
    content_header, count_occurrences, format_file_size, looks_binary, printable_header,
};

/// How much of a text file the preview body shows.
const TEXT_PREVIEW_BYTES: usize = 2048;

/// How much of a model file the structure scan reads.
const MODEL_SCAN_BYTES: usize = 4096;

/// How many localization entries the preview lists.
const LOCA_PREVIEW_ENTRIES: usize = 5;

/// Requested thumbnail bounds for texture previews.
const THUMBNAIL_SIZE: (u32, u32) = (180, 180);

/// Generates [`PreviewRecord`]s for files.
///
/// The engine is the dispatch point over [`Handler`]: it stats the file,
/// picks a handler by extension, and runs the matching preview routine.
/// Handlers that need the external converter (binary trees, localization
/// tables) degrade to a raw binary analysis when no converter is
/// installed, so the engine is always usable.
///
/// Errors never propagate out of the engine — every code path produces a
/// record, with `error` set when the preview could not be generated.
#[derive(Clone, Default)]
pub struct PreviewEngine {
    converter: Option<Arc<Converter>>,
    thumbnails: Option<Arc<dyn ThumbnailDecoder>>,
}

impl PreviewEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the external converter used for binary-tree and
    /// localization previews.
    #[must_use]
    pub fn with_converter(mut self, converter: Arc<Converter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Install a texture decoder for thumbnails.
    #[must_use]
    pub fn with_thumbnail_decoder(mut self, decoder: Arc<dyn ThumbnailDecoder>) -> Self {
        self.thumbnails = Some(decoder);
        self
    }

    /// Generate a preview without progress reporting.
    pub async fn preview(&self, path: &Path) -> PreviewRecord {
        self.preview_with_progress(path, &ProgressSink::disabled(), &CancelFlag::new())
            .await
    }

    /// Generate a preview, reporting progress for the slow
    /// (converter-backed) paths.
    pub async fn preview_with_progress(
        &self,
        path: &Path,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> PreviewRecord {
        if !path.is_file() {
            progress.done(false, "File not found");
            return PreviewRecord::error(path, "File not found or invalid path");
        }

        let Some(handler) = HandlerRegistry::get_handler_for_file(path) else {
            progress.done(false, "Unsupported file type");
            return unsupported_record(path);
        };

        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        debug!(path = %path.display(), ?handler, "generating preview");
        progress.emit(10, "Analyzing file...");

        let record = match handler {
            Handler::Textual => self.preview_tree_text(path, size, TreeKind::Lsx),
            Handler::Json => self.preview_tree_text(path, size, TreeKind::Lsj),
            Handler::PlainText => preview_plain_text(path, size),
            Handler::BinaryTree => self.preview_binary_tree(path, size, progress, cancel).await,
            Handler::Loca => self.preview_loca(path, size, progress, cancel).await,
            Handler::Texture => self.preview_texture(path, size),
            Handler::Model => preview_model(path, size),
            Handler::Shader => preview_shader(path, size),
        };

        progress.emit(100, "Preview complete");
        progress.done(!record.is_error(), record.filename.clone());
        record
    }

    /// Textual and JSON dialect preview: content head plus the structure
    /// analysis block.
    fn preview_tree_text(&self, path: &Path, size: u64, kind: TreeKind) -> PreviewRecord {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => return PreviewRecord::error(path, format!("Error reading text file: {e}")),
        };

        let mut content = content_header(path, size);
        content.push_str(&head_of(&text, TEXT_PREVIEW_BYTES));

        let mut metadata = BTreeMap::new();
        metadata.insert("format".to_string(), kind.label().to_lowercase());

        let parsed = match kind {
            TreeKind::Lsx => lsx::parse(&text).map_err(|e| e.to_string()),
            TreeKind::Lsj => lsj::parse(&text).map_err(|e| e.to_string()),
        };
        match parsed {
            Ok(doc) => {
                content.push_str(&analysis_block(&doc, kind.label()));
                record_stats(&doc, &mut metadata);
            }
            Err(e) => {
                content.push_str(&format!("\n\nNote: Could not parse structure: {e}\n"));
            }
        }

        finished_record(path, size, content, metadata)
    }

    /// Binary-tree preview: convert to the textual dialect, then reuse
    /// the structure analysis on the intermediate.
    async fn preview_binary_tree(
        &self,
        path: &Path,
        size: u64,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> PreviewRecord {
        let label = extension_of(path)
            .trim_start_matches('.')
            .to_uppercase();

        let Some(converter) = &self.converter else {
            return fallback_binary_record(path, size, &label, None);
        };

        progress.emit(20, "Converting for preview...");
        match lsforge_codec::binary::read_document(path, converter, progress, cancel).await {
            Ok(doc) => {
                let mut content = content_header(path, size);
                content.push_str(&format!("{label} Binary File (converted)\n"));
                content.push_str(&analysis_block(&doc, &label));

                let mut metadata = BTreeMap::new();
                metadata.insert("format".to_string(), label.to_lowercase());
                metadata.insert("converted".to_string(), "true".to_string());
                record_stats(&doc, &mut metadata);
                finished_record(path, size, content, metadata)
            }
            Err(lsforge_codec::CodecError::Cancelled) => PreviewRecord::error(path, "cancelled"),
            Err(e) => fallback_binary_record(path, size, &label, Some(e.to_string())),
        }
    }

    /// Localization preview: convert to XML, list the first few entries.
    async fn preview_loca(
        &self,
        path: &Path,
        size: u64,
        progress: &ProgressSink,
        cancel: &CancelFlag,
    ) -> PreviewRecord {
        let mut content = content_header(path, size);
        content.push_str("Localization File (.loca)\n\n");

        let Some(converter) = &self.converter else {
            content.push_str(&loca_binary_fallback(path));
            return finished_record(path, size, content, BTreeMap::new());
        };

        progress.emit(20, "Converting localization table...");
        match loca::read_entries(path, converter, progress, cancel).await {
            Ok(entries) => {
                content.push_str(&format!("Total entries: {}\n\n", entries.len()));
                if !entries.is_empty() {
                    content.push_str("Sample entries:\n");
                    content.push_str(&"-".repeat(50));
                    content.push('\n');
                    for (i, entry) in entries.iter().take(LOCA_PREVIEW_ENTRIES).enumerate() {
                        content.push_str(&format!("#{}\n", i + 1));
                        content.push_str(&format!("Handle: {}\n", entry.handle));
                        if !entry.text.is_empty() {
                            content.push_str(&format!("Text: {}\n", head_of(&entry.text, 150)));
                        }
                        content.push('\n');
                    }
                    if entries.len() > LOCA_PREVIEW_ENTRIES {
                        content.push_str(&format!(
                            "... and {} more entries\n",
                            entries.len() - LOCA_PREVIEW_ENTRIES
                        ));
                    }
                }
                let mut metadata = BTreeMap::new();
                metadata.insert("entries".to_string(), entries.len().to_string());
                finished_record(path, size, content, metadata)
            }
            Err(lsforge_codec::CodecError::Cancelled) => PreviewRecord::error(path, "cancelled"),
            Err(e) => {
                content.push_str(&format!("Could not parse table: {e}\n"));
                content.push_str(&loca_binary_fallback(path));
                finished_record(path, size, content, BTreeMap::new())
            }
        }
    }

    /// Texture preview: fixed-layout header parse plus a thumbnail
    /// attempt through the decoder seam.
    fn preview_texture(&self, path: &Path, size: u64) -> PreviewRecord {
        let header = match read_head(path, 128) {
            Ok(header) => header,
            Err(e) => return PreviewRecord::error(path, format!("Error analyzing texture: {e}")),
        };

        let mut content = content_header(path, size);
        content.push_str("DirectDraw Surface (DDS) Texture\n\n");
        let mut metadata = BTreeMap::new();

        if header.len() >= 4 && &header[..4] == b"DDS " {
            content.push_str("Valid DDS file\n");
            if let Some(info) = parse_dds_header(&header) {
                content.push_str(&format!(
                    "Dimensions: {}x{} pixels\n",
                    info.width, info.height
                ));
                if info.mipmaps > 1 {
                    content.push_str(&format!("Mipmaps: {} levels\n", info.mipmaps));
                } else {
                    content.push_str("Mipmaps: None\n");
                }
                content.push_str(&format!("Format: {}\n", info.format));
                metadata.insert("width".to_string(), info.width.to_string());
                metadata.insert("height".to_string(), info.height.to_string());
                metadata.insert("mipmaps".to_string(), info.mipmaps.to_string());
                metadata.insert("pixel_format".to_string(), info.format.clone());
            }
        } else {
            content.push_str("Warning: Invalid DDS header\n");
        }

        let thumbnail = self
            .thumbnails
            .as_ref()
            .and_then(|d| d.decode(path, THUMBNAIL_SIZE));
        if thumbnail.is_none() {
            // Placeholder stands in for the image when no decoder is
            // installed or decoding failed.
            content.push_str("\nThumbnail unavailable - texture described above.\n");
        }
        content.push_str("\nNote: DDS files are compressed textures. Use image tools for viewing.\n");

        let mut record = finished_record(path, size, content, metadata);
        record.thumbnail = thumbnail;
        record
    }
}

/// Which textual tree dialect a preview is for.
#[derive(Clone, Copy)]
enum TreeKind {
    Lsx,
    Lsj,
}

impl TreeKind {
    fn label(self) -> &'static str {
        match self {
            Self::Lsx => "LSX",
            Self::Lsj => "LSJ",
        }
    }
}

/// The analysis block appended to tree previews.
fn analysis_block(doc: &Document, format_label: &str) -> String {
    let stats = doc.stats();
    let ruler = "=".repeat(30);
    let mut block = format!("\n\n{ruler}\nBG3 FILE INFO:\n{ruler}\n");
    block.push_str(&format!("Format: {format_label}\n"));
    if let Some(version) = &doc.version {
        block.push_str(&format!("Version: {version}\n"));
    }

    block.push_str(&format!("Regions: {}\n", stats.region_count));
    for region in doc.regions.iter().take(3) {
        let node_count: usize = region.nodes.iter().map(lsforge_tree::Node::subtree_len).sum();
        block.push_str(&format!("  \u{2022} {}: {} nodes\n", region.id, node_count));
    }
    if doc.regions.len() > 3 {
        block.push_str(&format!("  ... and {} more regions\n", doc.regions.len() - 3));
    }

    let dominant = stats.dominant_attribute_types(5);
    if !dominant.is_empty() {
        let summary: Vec<String> = dominant
            .iter()
            .map(|(name, count)| format!("{name}({count})"))
            .collect();
        block.push_str(&format!("Data types: {}\n", summary.join(", ")));
    }

    if stats.node_count > 0 {
        block.push_str(&format!(
            "Complexity: {} ({} total nodes)\n",
            stats.complexity(),
            stats.node_count
        ));
    }
    block
}

fn record_stats(doc: &Document, metadata: &mut BTreeMap<String, String>) {
    let stats = doc.stats();
    metadata.insert("regions".to_string(), stats.region_count.to_string());
    metadata.insert("nodes".to_string(), stats.node_count.to_string());
    metadata.insert("complexity".to_string(), stats.complexity().to_string());
}

fn preview_plain_text(path: &Path, size: u64) -> PreviewRecord {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let mut content = content_header(path, size);
            content.push_str(&head_of(&text, TEXT_PREVIEW_BYTES));
            finished_record(path, size, content, BTreeMap::new())
        }
        Err(e) => PreviewRecord::error(path, format!("Error reading text file: {e}")),
    }
}

fn preview_model(path: &Path, size: u64) -> PreviewRecord {
    let data = match read_head(path, MODEL_SCAN_BYTES) {
        Ok(data) => data,
        Err(e) => return PreviewRecord::error(path, format!("Error analyzing model: {e}")),
    };
    let lowered: Vec<u8> = data.iter().map(u8::to_ascii_lowercase).collect();

    let mut content = content_header(path, size);
    content.push_str("Granny 3D Model File\n\n");
    content.push_str("Structure Analysis:\n");
    content.push_str(&format!("Size: {}\n", format_file_size(size)));

    let mut metadata = BTreeMap::new();
    for needle in ["mesh", "bone", "skeleton", "animation", "material", "vertex"] {
        let count = count_occurrences(&lowered, needle.as_bytes());
        metadata.insert(needle.to_string(), count.to_string());
        if count > 0 {
            content.push_str(&format!("{needle} references: {count}\n"));
        }
    }
    content.push_str("\nNote: GR2 files contain 3D models. Use Blender with GR2 import plugins for editing.\n");

    finished_record(path, size, content, metadata)
}

fn preview_shader(path: &Path, size: u64) -> PreviewRecord {
    let header = match read_head(path, 64) {
        Ok(header) => header,
        Err(e) => return PreviewRecord::error(path, format!("Error analyzing shader: {e}")),
    };

    let mut content = content_header(path, size);
    let mut metadata = BTreeMap::new();
    let filename = filename_of(path);

    // 4-byte magic first, then filename tokens for stage/API/features.
    if header.len() >= 4 && &header[..4] == b"BSHD" {
        content.push_str("Binary Shader File (BSHD)\n\nValid BSHD file\n");
        metadata.insert("magic".to_string(), "BSHD".to_string());
    } else if header.len() >= 4 && (&header[..4] == b"DXBC" || header.starts_with(b"DX")) {
        content.push_str("Binary Shader File\n\nDirectX bytecode detected\n");
        metadata.insert("magic".to_string(), "DXBC".to_string());
    } else if header.len() >= 4 && &header[..4] == b"SPIR" {
        content.push_str("Binary Shader File\n\nSPIR-V bytecode detected\n");
        metadata.insert("magic".to_string(), "SPIR".to_string());
    } else if looks_binary(&header) {
        content.push_str("Binary Shader File\n\nUnknown shader format\n");
        content.push_str(&format!("Header: {}\n", printable_header(&header[..header.len().min(32)])));
    } else {
        content.push_str("Shader File (SHD)\n\nText shader source\n");
    }

    let stage = if filename.contains("_VT_") || filename.ends_with("_VT.bshd") {
        Some("Vertex shader")
    } else if filename.contains("_PS_") || filename.ends_with("_PS.bshd") {
        Some("Pixel shader")
    } else if filename.contains("_GS_") {
        Some("Geometry shader")
    } else if filename.contains("_CS_") {
        Some("Compute shader")
    } else {
        None
    };
    if let Some(stage) = stage {
        content.push_str(&format!("Stage: {stage}\n"));
        metadata.insert("stage".to_string(), stage.to_string());
    }

    let api = if filename.contains("DX12") {
        Some("DirectX 12")
    } else if filename.contains("Vulkan") {
        Some("Vulkan")
    } else if filename.contains("DX11") {
        Some("DirectX 11")
    } else {
        None
    };
    if let Some(api) = api {
        content.push_str(&format!("Target API: {api}\n"));
        metadata.insert("api".to_string(), api.to_string());
    }

    for (token, feature) in [
        ("AlphaTested", "Alpha testing"),
        ("SSS", "Subsurface scattering"),
        ("Fresnel", "Fresnel effects"),
    ] {
        if filename.contains(token) {
            content.push_str(&format!("Features: {feature}\n"));
        }
    }

    content.push_str("\nNote: compiled shaders need shader tools for editing.\n");
    finished_record(path, size, content, metadata)
}

/// DDS header fields at their fixed offsets.
struct DdsInfo {
    width: u32,
    height: u32,
    mipmaps: u32,
    format: String,
}

/// Fixed-layout DDS header: height at offset 12, width at 16, mipmap
/// count at 28, pixel-format flags at 80, fourCC at 84.
fn parse_dds_header(header: &[u8]) -> Option<DdsInfo> {
    let height = read_u32_le(header, 12)?;
    let width = read_u32_le(header, 16)?;
    let mipmaps = read_u32_le(header, 28)?;
    let pf_flags = read_u32_le(header, 80)?;
    let fourcc = header.get(84..88)?;

    let mut format = match fourcc {
        b"DXT1" => "BC1 (DXT1) - 4bpp".to_string(),
        b"DXT3" => "BC2 (DXT3) - 8bpp".to_string(),
        b"DXT5" => "BC3 (DXT5) - 8bpp".to_string(),
        b"BC7\0" => "BC7 - 8bpp (high quality)".to_string(),
        b"ATI2" => "BC5 (3Dc) - Normal maps".to_string(),
        b"ATI1" => "BC4 (ATI1) - Single channel".to_string(),
        b"DX10" => "DX10 format (see extended header)".to_string(),
        other => format!("Unknown fourCC: {}", printable_header(other)),
    };

    // Uncompressed layouts override the fourCC reading.
    if pf_flags & 0x40 != 0 {
        let bit_count = read_u32_le(header, 88).unwrap_or(0);
        format = format!("Uncompressed RGB - {bit_count}bpp");
    } else if pf_flags & 0x0002_0000 != 0 {
        format = "Luminance format".to_string();
    }

    Some(DdsInfo {
        width,
        height,
        mipmaps,
        format,
    })
}

fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Raw-bytes description used when a binary tree cannot be converted.
fn fallback_binary_record(
    path: &Path,
    size: u64,
    label: &str,
    failure: Option<String>,
) -> PreviewRecord {
    let head = read_head(path, 64).unwrap_or_default();
    let mut content = content_header(path, size);
    content.push_str(&format!("Larian Binary File ({label})\n\n"));
    content.push_str(&format!(
        "Header: {}\n",
        printable_header(&head[..head.len().min(32)])
    ));
    content.push_str(&format!("File size: {}\n", format_file_size(size)));
    if let Some(failure) = failure {
        content.push_str(&format!("\nNote: conversion unavailable: {failure}\n"));
    } else {
        content.push_str("\nNote: converter not configured; raw analysis only.\n");
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("converted".to_string(), "false".to_string());
    finished_record(path, size, content, metadata)
}

fn loca_binary_fallback(path: &Path) -> String {
    let data = read_head(path, 512).unwrap_or_default();
    let mut content = String::from("\nBinary Analysis:\n");
    let lowered: Vec<u8> = data.iter().map(u8::to_ascii_lowercase).collect();
    if count_occurrences(&lowered, b"content") > 0 {
        content.push_str("Contains 'content' - likely localization data\n");
    }
    if data.starts_with(b"LOCA") {
        content.push_str("Format: Larian localization table (LOCA)\n");
    }
    content.push_str(&format!(
        "Header preview: {}\n",
        printable_header(&data[..data.len().min(100)])
    ));
    content
}

fn unsupported_record(path: &Path) -> PreviewRecord {
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let mut content = content_header(path, size);
    content.push_str(&format!("Unsupported file type: {}\n", extension_of(path)));
    content.push_str(&format!(
        "Supported types: {}",
        HandlerRegistry::supported_extensions().join(", ")
    ));

    let mut metadata = BTreeMap::new();
    metadata.insert("supported".to_string(), "false".to_string());
    finished_record(path, size, content, metadata)
}

fn finished_record(
    path: &Path,
    size: u64,
    content: String,
    metadata: BTreeMap<String, String>,
) -> PreviewRecord {
    PreviewRecord {
        filename: filename_of(path),
        size,
        extension: extension_of(path),
        content,
        thumbnail: None,
        metadata,
        error: None,
        cache_mtime: None,
        cache_size: None,
    }
}

fn head_of(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n\n... ({} more bytes)", &text[..end], text.len() - end)
}

fn read_head(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    use std::io::Read;
    let mut buf = vec![0u8; limit];
    let mut file = std::fs::File::open(path)?;
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf)
}
