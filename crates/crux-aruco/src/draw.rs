//! Marker bitmap synthesis.

use crate::Dictionary;
use crux_core::GrayImage;

/// Render marker `id` as a `side_px × side_px` black-on-white bitmap with a
/// `border_bits`-cell black frame.
///
/// Returns `None` for an unknown id or when `side_px` cannot hold one pixel
/// per cell.
pub fn draw_marker(
    dict: &Dictionary,
    id: u32,
    side_px: usize,
    border_bits: usize,
) -> Option<GrayImage> {
    let code = dict.code(id)?;
    let bits = dict.marker_size;
    let cells = bits + 2 * border_bits;
    if side_px < cells {
        return None;
    }

    let mut img = GrayImage::filled(side_px, side_px, 255);
    for y in 0..side_px {
        let cy = y * cells / side_px;
        for x in 0..side_px {
            let cx = x * cells / side_px;
            let on_border = cx < border_bits
                || cy < border_bits
                || cx >= bits + border_bits
                || cy >= bits + border_bits;
            let black = on_border || {
                let idx = (cy - border_bits) * bits + (cx - border_bits);
                (code >> idx) & 1 == 1
            };
            if black {
                img.data[y * side_px + x] = 0;
            }
        }
    }
    Some(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;

    #[test]
    fn frame_is_black_and_bits_follow_code() {
        let dict = builtins::DICT_4X4_50;
        let img = draw_marker(&dict, 0, 60, 1).expect("draw");
        let v = img.view();
        assert_eq!(v.get(0, 0), 0);
        assert_eq!(v.get(59, 30), 0);

        let code = dict.codes[0];
        for by in 0..4 {
            for bx in 0..4 {
                let expected = if (code >> (by * 4 + bx)) & 1 == 1 { 0 } else { 255 };
                let (px, py) = ((bx + 1) * 10 + 5, (by + 1) * 10 + 5);
                assert_eq!(v.get(px, py), expected, "bit ({bx}, {by})");
            }
        }
    }

    #[test]
    fn unknown_id_or_tiny_side_yields_none() {
        let dict = builtins::DICT_4X4_50;
        assert!(draw_marker(&dict, 50, 60, 1).is_none());
        assert!(draw_marker(&dict, 0, 5, 1).is_none());
    }
}
