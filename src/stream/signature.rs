//! Stream signature: the (HDR type, audio format, FPS bucket) triple

use crate::error::AvOffsetError;
use std::fmt;
use std::str::FromStr;

/// Video dynamic-range type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HdrType {
    DolbyVision,
    Hdr10,
    Hdr10Plus,
    Hlg,
    Sdr,
}

impl HdrType {
    pub const ALL: [HdrType; 5] = [
        HdrType::DolbyVision,
        HdrType::Hdr10,
        HdrType::Hdr10Plus,
        HdrType::Hlg,
        HdrType::Sdr,
    ];

    /// Key used in configuration tables and learned signatures
    pub fn key(self) -> &'static str {
        match self {
            HdrType::DolbyVision => "dolbyvision",
            HdrType::Hdr10 => "hdr10",
            HdrType::Hdr10Plus => "hdr10plus",
            HdrType::Hlg => "hlg",
            HdrType::Sdr => "sdr",
        }
    }

    /// Short name shown in notifications
    pub fn display_name(self) -> &'static str {
        match self {
            HdrType::DolbyVision => "DV",
            HdrType::Hdr10 => "HDR10",
            HdrType::Hdr10Plus => "HDR10+",
            HdrType::Hlg => "HLG",
            HdrType::Sdr => "SDR",
        }
    }
}

impl FromStr for HdrType {
    type Err = AvOffsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        HdrType::ALL
            .into_iter()
            .find(|hdr| hdr.key() == key)
            .ok_or_else(|| AvOffsetError::Configuration(format!("unknown HDR type '{}'", s)))
    }
}

impl fmt::Display for HdrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Audio format category, declared in classification precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AudioFormat {
    /// Dolby TrueHD, or any Dolby stream flagged as Atmos
    AtmosTrueHd,
    /// Dolby Digital Plus (E-AC-3)
    DdPlus,
    /// Dolby Digital (AC-3)
    Dd,
    /// DTS:X, or DTS-HD MA with 8 or more channels
    DtsX,
    /// DTS-HD MA with exactly 6 channels
    DtsHdMa6,
    /// Core DTS and any other DTS variant
    Dts,
    /// PCM and everything unrecognised
    Other,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 7] = [
        AudioFormat::AtmosTrueHd,
        AudioFormat::DdPlus,
        AudioFormat::Dd,
        AudioFormat::DtsX,
        AudioFormat::DtsHdMa6,
        AudioFormat::Dts,
        AudioFormat::Other,
    ];

    /// Key used in configuration tables and learned signatures
    pub fn key(self) -> &'static str {
        match self {
            AudioFormat::AtmosTrueHd => "truehd",
            AudioFormat::DdPlus => "eac3",
            AudioFormat::Dd => "ac3",
            AudioFormat::DtsX => "dtsx",
            AudioFormat::DtsHdMa6 => "dtshd_ma",
            AudioFormat::Dts => "dts",
            AudioFormat::Other => "pcm",
        }
    }

    /// Short name shown in notifications
    pub fn display_name(self) -> &'static str {
        match self {
            AudioFormat::AtmosTrueHd => "TrueHD",
            AudioFormat::DdPlus => "DD+",
            AudioFormat::Dd => "DD",
            AudioFormat::DtsX => "DTS:X",
            AudioFormat::DtsHdMa6 => "DTS-HD MA",
            AudioFormat::Dts => "DTS",
            AudioFormat::Other => "PCM",
        }
    }
}

impl FromStr for AudioFormat {
    type Err = AvOffsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        let alias = match key.as_str() {
            "atmos" => "truehd",
            "ddp" | "dd+" => "eac3",
            "dd" => "ac3",
            "dca" => "dts",
            "other" => "pcm",
            other => other,
        };
        AudioFormat::ALL
            .into_iter()
            .find(|format| format.key() == alias)
            .ok_or_else(|| AvOffsetError::Configuration(format!("unknown audio format '{}'", s)))
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Supported frame-rate buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FpsBucket {
    Fps23_98,
    Fps24,
    Fps25,
    Fps29_97,
    Fps30,
    Fps50,
    Fps59_94,
    Fps60,
}

impl FpsBucket {
    pub const ALL: [FpsBucket; 8] = [
        FpsBucket::Fps23_98,
        FpsBucket::Fps24,
        FpsBucket::Fps25,
        FpsBucket::Fps29_97,
        FpsBucket::Fps30,
        FpsBucket::Fps50,
        FpsBucket::Fps59_94,
        FpsBucket::Fps60,
    ];

    /// Exact frame rate of the bucket (NTSC rates are n * 1000 / 1001)
    pub fn nominal(self) -> f64 {
        match self {
            FpsBucket::Fps23_98 => 24000.0 / 1001.0,
            FpsBucket::Fps24 => 24.0,
            FpsBucket::Fps25 => 25.0,
            FpsBucket::Fps29_97 => 30000.0 / 1001.0,
            FpsBucket::Fps30 => 30.0,
            FpsBucket::Fps50 => 50.0,
            FpsBucket::Fps59_94 => 60000.0 / 1001.0,
            FpsBucket::Fps60 => 60.0,
        }
    }

    /// Key used in configuration tables, learned signatures and notifications
    pub fn key(self) -> &'static str {
        match self {
            FpsBucket::Fps23_98 => "23.98",
            FpsBucket::Fps24 => "24",
            FpsBucket::Fps25 => "25",
            FpsBucket::Fps29_97 => "29.97",
            FpsBucket::Fps30 => "30",
            FpsBucket::Fps50 => "50",
            FpsBucket::Fps59_94 => "59.94",
            FpsBucket::Fps60 => "60",
        }
    }
}

impl FromStr for FpsBucket {
    type Err = AvOffsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        let alias = match key {
            "23.976" | "23" => "23.98",
            "29" => "29.97",
            "59" => "59.94",
            other => other,
        };
        FpsBucket::ALL
            .into_iter()
            .find(|bucket| bucket.key() == alias)
            .ok_or_else(|| AvOffsetError::Configuration(format!("unknown FPS bucket '{}'", s)))
    }
}

impl fmt::Display for FpsBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// FPS component of a signature
///
/// `Any` covers both an unmatched frame rate and an HDR type whose FPS
/// matching is switched off; it contributes nothing to a composed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FpsAxis {
    Bucket(FpsBucket),
    Any,
}

impl FpsAxis {
    pub fn bucket(self) -> Option<FpsBucket> {
        match self {
            FpsAxis::Bucket(bucket) => Some(bucket),
            FpsAxis::Any => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            FpsAxis::Bucket(bucket) => bucket.key(),
            FpsAxis::Any => "any",
        }
    }
}

impl FromStr for FpsAxis {
    type Err = AvOffsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "any" | "all" => Ok(FpsAxis::Any),
            other => other.parse().map(FpsAxis::Bucket),
        }
    }
}

/// Canonical classification of a playback stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature {
    pub hdr: HdrType,
    pub audio: AudioFormat,
    pub fps: FpsAxis,
}

impl Signature {
    pub fn new(hdr: HdrType, audio: AudioFormat, fps: FpsAxis) -> Self {
        Self { hdr, audio, fps }
    }

    /// Serialized form: `<hdr>_<fps>_<audio>`, e.g. `dolbyvision_23.98_truehd`
    pub fn key(&self) -> String {
        format!("{}_{}_{}", self.hdr.key(), self.fps.key(), self.audio.key())
    }

    /// Human-readable label, e.g. `DV | 23.98 FPS | TrueHD`
    pub fn label(&self) -> String {
        match self.fps {
            FpsAxis::Bucket(bucket) => format!(
                "{} | {} FPS | {}",
                self.hdr.display_name(),
                bucket.key(),
                self.audio.display_name()
            ),
            FpsAxis::Any => format!(
                "{} | {}",
                self.hdr.display_name(),
                self.audio.display_name()
            ),
        }
    }
}

impl FromStr for Signature {
    type Err = AvOffsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Audio keys may contain '_' (dtshd_ma), so it takes the remainder
        let mut parts = s.trim().splitn(3, '_');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(hdr), Some(fps), Some(audio)) => Ok(Signature {
                hdr: hdr.parse()?,
                fps: fps.parse()?,
                audio: audio.parse()?,
            }),
            _ => Err(AvOffsetError::Configuration(format!(
                "malformed signature key '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
