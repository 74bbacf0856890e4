//! A2DP codec definitions for the sink endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A2DP Sink service UUID (we receive audio from the remote device).
pub const A2DP_SINK_UUID: &str = "0000110b-0000-1000-8000-00805f9b34fb";

/// SBC capabilities: all frequencies, channel modes, block lengths,
/// subbands and allocation methods; bitpool 2..64.
pub const SBC_CAPABILITIES: [u8; 4] = [0xFF, 0xFF, 0x02, 0x40];

/// SBC configuration: 44.1kHz joint stereo, 16 blocks, 8 subbands,
/// loudness allocation, bitpool 2..32.
pub const SBC_CONFIGURATION: [u8; 4] = [0x21, 0x15, 0x02, 0x20];

/// AAC capabilities: MPEG-2/MPEG-4 LC, every sample rate, mono and stereo,
/// VBR, any bitrate.
pub const AAC_CAPABILITIES: [u8; 6] = [0xC0, 0xFF, 0xFC, 0xFF, 0xFF, 0xFF];

/// AAC configuration: MPEG-2 AAC LC, 44.1kHz, stereo, VBR, 320 kbit/s.
pub const AAC_CONFIGURATION: [u8; 6] = [0x80, 0x01, 0x04, 0x84, 0xE2, 0x00];

/// Supported transport codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Low Complexity Subband Codec (mandatory for A2DP).
    Sbc,
    /// MPEG-2/4 Advanced Audio Coding.
    Aac,
}

impl Codec {
    /// Every codec the sink can register.
    pub const ALL: [Codec; 2] = [Codec::Sbc, Codec::Aac];

    /// A2DP codec id as advertised in the `Codec` property.
    pub fn id(&self) -> u8 {
        match self {
            Self::Sbc => 0x00,
            Self::Aac => 0x02,
        }
    }

    /// Parse from the advertised codec id.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0x00 => Some(Self::Sbc),
            0x02 => Some(Self::Aac),
            _ => None,
        }
    }

    /// Capability record offered when registering the endpoint.
    pub fn capabilities(&self) -> &'static [u8] {
        match self {
            Self::Sbc => &SBC_CAPABILITIES,
            Self::Aac => &AAC_CAPABILITIES,
        }
    }

    /// Configuration returned from `SelectConfiguration`.
    pub fn configuration(&self) -> &'static [u8] {
        match self {
            Self::Sbc => &SBC_CONFIGURATION,
            Self::Aac => &AAC_CONFIGURATION,
        }
    }

    /// Lowercase short name, used in object paths and pipeline names.
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Sbc => "sbc",
            Self::Aac => "aac",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sbc => f.write_str("SBC"),
            Self::Aac => f.write_str("AAC"),
        }
    }
}

/// Whether `uuid` names the A2DP sink service, ignoring case.
pub fn is_a2dp_sink(uuid: &str) -> bool {
    uuid.eq_ignore_ascii_case(A2DP_SINK_UUID)
}

#[cfg(test)]
mod tests {
    use super::*;

    mod codec_id {
        use super::*;

        #[test]
        fn sbc_is_zero() {
            assert_eq!(Codec::Sbc.id(), 0x00);
            assert_eq!(Codec::from_id(0x00), Some(Codec::Sbc));
        }

        #[test]
        fn aac_is_two() {
            assert_eq!(Codec::Aac.id(), 0x02);
            assert_eq!(Codec::from_id(0x02), Some(Codec::Aac));
        }

        #[test]
        fn unknown_ids_are_rejected() {
            // MPEG-1,2 audio, ATRAC and vendor codecs
            assert!(Codec::from_id(0x01).is_none());
            assert!(Codec::from_id(0x04).is_none());
            assert!(Codec::from_id(0xFF).is_none());
        }
    }

    mod records {
        use super::*;

        #[test]
        fn sbc_records() {
            assert_eq!(Codec::Sbc.capabilities(), &[0xFF, 0xFF, 0x02, 0x40]);
            assert_eq!(Codec::Sbc.configuration(), &[0x21, 0x15, 0x02, 0x20]);
        }

        #[test]
        fn aac_records() {
            assert_eq!(Codec::Aac.capabilities(), &[0xC0, 0xFF, 0xFC, 0xFF, 0xFF, 0xFF]);
            assert_eq!(Codec::Aac.configuration().len(), 6);
        }
    }

    #[test]
    fn sink_uuid_matches_any_case() {
        assert!(is_a2dp_sink("0000110b-0000-1000-8000-00805f9b34fb"));
        assert!(is_a2dp_sink("0000110B-0000-1000-8000-00805F9B34FB"));
        assert!(!is_a2dp_sink("0000110a-0000-1000-8000-00805f9b34fb"));
    }
}
