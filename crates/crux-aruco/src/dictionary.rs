//! Dictionary metadata and packed marker codes.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A fixed ArUco-style dictionary.
///
/// Serializes as its name (`"DICT_4X4_50"`); deserialization looks the name
/// up in [`crate::builtins`].
#[derive(Clone, Copy, Debug)]
pub struct Dictionary {
    /// Human-readable name, also the lookup key for builtins.
    pub name: &'static str,
    /// Marker side length (number of inner bits per side).
    pub marker_size: usize,
    /// Maximum error-correcting Hamming distance supported by the dictionary.
    pub max_correction_bits: u8,
    /// One `u64` per marker id, encoding the inner `marker_size × marker_size` bits.
    ///
    /// Bits are stored in row-major order (`idx = y * marker_size + x`) with **black = 1**.
    pub codes: &'static [u64],
}

impl Dictionary {
    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Packed code for `id`, if the dictionary has one.
    #[inline]
    pub fn code(&self, id: u32) -> Option<u64> {
        self.codes.get(id as usize).copied()
    }
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Dictionary {}

impl Serialize for Dictionary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

impl<'de> Deserialize<'de> for Dictionary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        crate::builtins::builtin_dictionary(&name)
            .ok_or_else(|| de::Error::custom(format!("unknown dictionary `{name}`")))
    }
}
