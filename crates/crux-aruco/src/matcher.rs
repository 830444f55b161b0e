//! Code matching against a dictionary, with rotation handling.

use crate::Dictionary;

/// A dictionary hit for an observed inner-bit code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    /// Marker id in the dictionary.
    pub id: u32,
    /// Quarter turns (clockwise, image coordinates) such that
    /// `observed == rotate_code_u64(dict_code, n, rotation)`.
    pub rotation: u8,
    /// Bit errors between observed code and the rotated dictionary code.
    pub hamming: u8,
}

impl Match {
    /// Reorder image-ordered corners `[TL, TR, BR, BL]` so that index 0 is the
    /// marker's own top-left corner.
    pub fn canonical_corners<T: Copy>(&self, image_corners: [T; 4]) -> [T; 4] {
        let mut out = image_corners;
        out.rotate_left(self.rotation as usize & 3);
        out
    }
}

/// Brute-force matcher over all ids and four rotations.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    /// Matcher accepting up to `max_hamming` bit errors.
    pub fn new(dict: Dictionary, max_hamming: u8) -> Self {
        let n = dict.marker_size;
        let rotated = dict
            .codes
            .iter()
            .map(|&base| {
                [
                    base,
                    rotate_code_u64(base, n, 1),
                    rotate_code_u64(base, n, 2),
                    rotate_code_u64(base, n, 3),
                ]
            })
            .collect();

        Self {
            dict,
            max_hamming,
            rotated,
        }
    }

    /// Matcher using the dictionary's own correction capability.
    pub fn for_dictionary(dict: Dictionary) -> Self {
        Self::new(dict, dict.max_correction_bits)
    }

    #[inline]
    pub fn dictionary(&self) -> Dictionary {
        self.dict
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Best match within `max_hamming`; ties keep the lowest id and rotation.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<Match> = None;

        for (id, rots) in self.rotated.iter().enumerate() {
            for (rot, &cand) in rots.iter().enumerate() {
                let h = (observed ^ cand).count_ones();
                if h > u32::from(self.max_hamming) {
                    continue;
                }
                let m = Match {
                    id: id as u32,
                    rotation: rot as u8,
                    hamming: h as u8,
                };
                if h == 0 {
                    return Some(m);
                }
                if best.is_none_or(|prev| m.hamming < prev.hamming) {
                    best = Some(m);
                }
            }
        }

        best
    }
}

/// Rotate an `n × n` row-major code (`idx = y * n + x`) by `rot` clockwise
/// quarter turns.
pub fn rotate_code_u64(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }

    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = match rot {
                1 => (y, n - 1 - x),
                2 => (n - 1 - x, n - 1 - y),
                _ => (n - 1 - y, x),
            };
            out |= ((code >> (sy * n + sx)) & 1) << (y * n + x);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;

    #[test]
    fn four_quarter_turns_are_identity() {
        let code = 0x4cad_u64;
        let mut r = code;
        for _ in 0..4 {
            r = rotate_code_u64(r, 4, 1);
        }
        assert_eq!(code, r);
        assert_eq!(rotate_code_u64(rotate_code_u64(code, 4, 1), 4, 3), code);
    }

    #[test]
    fn quarter_turn_moves_top_left_to_top_right() {
        // single bit at (0, 0)
        let r = rotate_code_u64(1, 4, 1);
        assert_eq!(r, 1 << 3);
    }

    #[test]
    fn matcher_finds_rotated_code() {
        let dict = builtins::DICT_4X4_50;
        let matcher = Matcher::new(dict, 0);

        let observed = rotate_code_u64(dict.codes[7], dict.marker_size, 1);
        let m = matcher.match_code(observed).expect("match");
        assert_eq!(m.id, 7);
        assert_eq!(m.rotation, 1);
        assert_eq!(m.hamming, 0);
    }

    #[test]
    fn matcher_corrects_single_bit_error() {
        let dict = builtins::DICT_4X4_50;
        let matcher = Matcher::for_dictionary(dict);
        let observed = dict.codes[3] ^ (1 << 5);
        let m = matcher.match_code(observed).expect("match");
        assert_eq!(m.id, 3);
        assert_eq!(m.hamming, 1);

        let strict = Matcher::new(dict, 0);
        assert!(strict.match_code(observed).is_none_or(|m| m.id != 3));
    }

    #[test]
    fn canonical_corners_follow_rotation() {
        let m = Match {
            id: 0,
            rotation: 1,
            hamming: 0,
        };
        assert_eq!(m.canonical_corners(['a', 'b', 'c', 'd']), ['b', 'c', 'd', 'a']);
    }
}
