//! Export preset catalog.
//!
//! A single source of truth for the export presets users can pick, their
//! output contracts, and the duration hints used to pace progress display.
//! The catalog is static data compiled into the binary; the queue only ever
//! reads it.

use std::time::Duration;

use crate::assets::AssetKind;

/// What the transcode is expected to produce. Opaque to the queue and
/// scheduler; the provider and UI are the only consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputContract {
    /// Source bytes delivered untouched
    Passthrough,
    Video {
        container: &'static str,
        codec: &'static str,
        max_height: u32,
    },
    Image {
        format: &'static str,
        max_edge_px: u32,
    },
    Audio {
        container: &'static str,
        bitrate_kbps: u32,
    },
    Document {
        format: &'static str,
    },
}

impl OutputContract {
    /// File extension for fabricated result names
    pub fn extension(&self) -> &'static str {
        match self {
            OutputContract::Passthrough => "bin",
            OutputContract::Video { container, .. } => container,
            OutputContract::Image { format, .. } => format,
            OutputContract::Audio { container, .. } => container,
            OutputContract::Document { format } => format,
        }
    }

    /// One-line description for list output
    pub fn summary(&self) -> String {
        match self {
            OutputContract::Passthrough => "original file, no transform".to_string(),
            OutputContract::Video {
                container,
                codec,
                max_height,
            } => format!("{container}/{codec} up to {max_height}p"),
            OutputContract::Image { format, max_edge_px } => {
                format!("{format} up to {max_edge_px}px")
            }
            OutputContract::Audio {
                container,
                bitrate_kbps,
            } => format!("{container} {bitrate_kbps}kbps"),
            OutputContract::Document { format } => format!("flattened {format}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportPreset {
    pub id: &'static str,
    pub label: &'static str,
    /// Asset kinds this preset can be applied to
    pub kinds: &'static [AssetKind],
    pub contract: OutputContract,
    /// Rough wall-clock estimate for progress pacing. Advisory only.
    pub expected_duration_hint: Option<Duration>,
}

impl ExportPreset {
    pub fn is_passthrough(&self) -> bool {
        matches!(self.contract, OutputContract::Passthrough)
    }

    pub fn applies_to(&self, kind: AssetKind) -> bool {
        self.kinds.contains(&kind)
    }
}

pub static PRESETS: &[ExportPreset] = &[
    ExportPreset {
        id: "ORIGINAL",
        label: "Original file",
        kinds: &[
            AssetKind::Video,
            AssetKind::Image,
            AssetKind::Audio,
            AssetKind::Document,
        ],
        contract: OutputContract::Passthrough,
        expected_duration_hint: None,
    },
    ExportPreset {
        id: "WEB_HD",
        label: "Web HD 1080p",
        kinds: &[AssetKind::Video],
        contract: OutputContract::Video {
            container: "mp4",
            codec: "h264",
            max_height: 1080,
        },
        expected_duration_hint: Some(Duration::from_secs(12)),
    },
    ExportPreset {
        id: "PROXY_540",
        label: "Editorial proxy 540p",
        kinds: &[AssetKind::Video],
        contract: OutputContract::Video {
            container: "mov",
            codec: "h264",
            max_height: 540,
        },
        expected_duration_hint: Some(Duration::from_secs(8)),
    },
    ExportPreset {
        id: "PRORES_4444",
        label: "ProRes 4444",
        kinds: &[AssetKind::Video],
        contract: OutputContract::Video {
            container: "mov",
            codec: "prores_4444",
            max_height: 2160,
        },
        expected_duration_hint: Some(Duration::from_secs(20)),
    },
    ExportPreset {
        id: "THUMBNAIL",
        label: "Thumbnail",
        kinds: &[AssetKind::Video, AssetKind::Image],
        contract: OutputContract::Image {
            format: "jpg",
            max_edge_px: 320,
        },
        expected_duration_hint: Some(Duration::from_secs(2)),
    },
    ExportPreset {
        id: "AUDIO_MP3",
        label: "MP3 preview",
        kinds: &[AssetKind::Audio],
        contract: OutputContract::Audio {
            container: "mp3",
            bitrate_kbps: 192,
        },
        expected_duration_hint: Some(Duration::from_secs(6)),
    },
    ExportPreset {
        id: "PDF_FLAT",
        label: "Flattened PDF",
        kinds: &[AssetKind::Document],
        contract: OutputContract::Document { format: "pdf" },
        expected_duration_hint: Some(Duration::from_secs(4)),
    },
];

/// Get preset definition by id
///
/// # Example
/// ```ignore
/// use exportq::engine::get_preset;
///
/// let preset = get_preset("WEB_HD").expect("preset should exist");
/// assert_eq!(preset.label, "Web HD 1080p");
/// ```
pub fn get_preset(id: &str) -> Option<&'static ExportPreset> {
    PRESETS.iter().find(|p| p.id == id)
}

/// Get all presets applicable to an asset kind
pub fn presets_for_kind(kind: AssetKind) -> impl Iterator<Item = &'static ExportPreset> {
    PRESETS.iter().filter(move |p| p.applies_to(kind))
}
