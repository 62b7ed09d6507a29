//! Stream classification: raw player metadata to a canonical signature

use crate::error::{AvOffsetError, Result};
use crate::stream::signature::{AudioFormat, FpsAxis, FpsBucket, HdrType, Signature};
use serde::Deserialize;
use std::collections::BTreeSet;

/// Maximum distance (in fps) between a frame rate and a bucket's nominal rate
pub const FPS_TOLERANCE: f64 = 0.05;

/// Codec names reported for Dolby TrueHD streams
const TRUEHD_CODECS: &[&str] = &["truehd", "mlp", "truehd_atmos"];

/// Codec names reported for Dolby Digital Plus streams
const EAC3_CODECS: &[&str] = &["eac3", "ec-3", "ec3", "ddp", "eac3_atmos"];

/// Codec names reported for Dolby Digital streams
const AC3_CODECS: &[&str] = &["ac3", "ac-3", "a52"];

/// Codec names reported for DTS-HD Master Audio streams
const DTSHD_MA_CODECS: &[&str] = &["dtshd_ma", "dts-hd ma", "dtshd-ma", "dts-hdma"];

/// Any DTS family codec, used for the core DTS fallback
const DTS_CODECS: &[&str] = &[
    "dca",
    "dts",
    "dtshd",
    "dtshd_hra",
    "dts-hd hra",
    "dtshd_ma",
    "dts-hd ma",
    "dtshd-ma",
    "dts-hdma",
    "dts-es",
];

/// Raw metadata of the video stream as reported by the host
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VideoStreamInfo {
    /// Declared dynamic-range label (e.g. "dolbyvision", "HDR10+", "hlg")
    pub hdr_type: String,
    /// Frame rate in frames per second
    pub fps: Option<f64>,
    /// Platform gamut/EOTF hint, used to spot HLG on platforms that report it as SDR
    pub gamut: Option<String>,
}

/// Raw metadata of the active audio stream as reported by the host
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AudioStreamInfo {
    /// Codec identifier (e.g. "truehd", "eac3", "pt-dtshd_ma")
    pub codec: String,
    /// Channel count
    pub channels: Option<u32>,
    /// Whether the stream carries Dolby Atmos
    pub atmos: bool,
}

/// Stream metadata delivered with playback and stream-change events
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamInfo {
    pub video: Option<VideoStreamInfo>,
    pub audio: Option<AudioStreamInfo>,
}

/// Classification options derived from configuration
#[derive(Debug, Clone, Default)]
pub struct ClassifierOptions {
    /// HDR types whose FPS axis collapses to `any`
    pub fps_disabled: BTreeSet<HdrType>,
}

impl ClassifierOptions {
    pub fn fps_enabled(&self, hdr: HdrType) -> bool {
        !self.fps_disabled.contains(&hdr)
    }
}

/// Normalised view of an audio stream used by the precedence matchers
struct CodecView<'a> {
    codec: &'a str,
    channels: Option<u32>,
    atmos: bool,
}

impl CodecView<'_> {
    fn is_any(&self, names: &[&str]) -> bool {
        names.contains(&self.codec)
    }
}

type AudioMatcher = fn(&CodecView<'_>) -> bool;

fn is_atmos_truehd(v: &CodecView<'_>) -> bool {
    v.is_any(TRUEHD_CODECS) || (v.atmos && v.is_any(EAC3_CODECS))
}

fn is_dd_plus(v: &CodecView<'_>) -> bool {
    v.is_any(EAC3_CODECS)
}

fn is_dd(v: &CodecView<'_>) -> bool {
    v.is_any(AC3_CODECS)
}

fn is_dtsx(v: &CodecView<'_>) -> bool {
    v.codec == "dtsx" || (v.is_any(DTSHD_MA_CODECS) && v.channels.is_some_and(|c| c >= 8))
}

fn is_dtshd_ma_6ch(v: &CodecView<'_>) -> bool {
    v.is_any(DTSHD_MA_CODECS) && v.channels == Some(6)
}

fn is_dts(v: &CodecView<'_>) -> bool {
    v.is_any(DTS_CODECS)
}

/// Audio categories, most specific first; the first match wins
const AUDIO_PRECEDENCE: &[(AudioFormat, AudioMatcher)] = &[
    (AudioFormat::AtmosTrueHd, is_atmos_truehd),
    (AudioFormat::DdPlus, is_dd_plus),
    (AudioFormat::Dd, is_dd),
    (AudioFormat::DtsX, is_dtsx),
    (AudioFormat::DtsHdMa6, is_dtshd_ma_6ch),
    (AudioFormat::Dts, is_dts),
];

/// Classify a stream into its signature
///
/// Fails only when the video or audio stream is missing; unrecognised values
/// fall back to SDR, Other/PCM and an `any` FPS axis respectively.
pub fn classify(info: &StreamInfo, options: &ClassifierOptions) -> Result<Signature> {
    let video = info
        .video
        .as_ref()
        .ok_or_else(|| AvOffsetError::Classification("no video stream".into()))?;
    let audio = info
        .audio
        .as_ref()
        .ok_or_else(|| AvOffsetError::Classification("no audio stream".into()))?;

    let hdr = classify_hdr(&video.hdr_type, video.gamut.as_deref());
    let audio = classify_audio(&audio.codec, audio.channels, audio.atmos)?;
    let fps = if options.fps_enabled(hdr) {
        video
            .fps
            .and_then(match_fps)
            .map(FpsAxis::Bucket)
            .unwrap_or(FpsAxis::Any)
    } else {
        FpsAxis::Any
    };

    Ok(Signature::new(hdr, audio, fps))
}

/// Map a declared dynamic-range label to an HDR type
pub fn classify_hdr(label: &str, gamut: Option<&str>) -> HdrType {
    let normalized: String = label
        .trim()
        .to_lowercase()
        .replace('+', "plus")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .collect();

    let hdr = match normalized.as_str() {
        "dolbyvision" | "dovi" | "dv" => HdrType::DolbyVision,
        "hdr10plus" => HdrType::Hdr10Plus,
        "hdr10" | "hdr" => HdrType::Hdr10,
        "hlg" | "hlghdr" => HdrType::Hlg,
        _ => HdrType::Sdr,
    };

    if hdr == HdrType::Sdr && gamut.is_some_and(|g| g.to_lowercase().contains("hlg")) {
        return HdrType::Hlg;
    }
    hdr
}

/// Map an audio codec and channel layout to its most specific format
pub fn classify_audio(codec: &str, channels: Option<u32>, atmos: bool) -> Result<AudioFormat> {
    let codec = codec.trim().to_lowercase();
    let codec = codec.strip_prefix("pt-").unwrap_or(&codec);
    if codec.is_empty() || codec == "none" {
        return Err(AvOffsetError::Classification("no audio codec".into()));
    }

    let view = CodecView {
        codec,
        channels,
        atmos,
    };
    Ok(AUDIO_PRECEDENCE
        .iter()
        .find(|(_, matches)| matches(&view))
        .map(|(format, _)| *format)
        .unwrap_or(AudioFormat::Other))
}

/// Nearest FPS bucket within `FPS_TOLERANCE`, `None` when nothing is close enough
pub fn match_fps(fps: f64) -> Option<FpsBucket> {
    if !fps.is_finite() || fps <= 0.0 {
        return None;
    }

    FpsBucket::ALL
        .into_iter()
        .map(|bucket| (bucket, (fps - bucket.nominal()).abs()))
        .filter(|(_, distance)| *distance <= FPS_TOLERANCE)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(bucket, _)| bucket)
}
