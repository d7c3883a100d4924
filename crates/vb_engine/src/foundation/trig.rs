//! Lookup-table trigonometry
//!
//! Angles are expressed in units of a 512-step circle, so a full turn is 512
//! and a quarter turn 128. The table is indexed with `& 0x1FF`, which wraps
//! negative angles because the table length is a power of two.

use super::fixed::Fix7_9;

/// Entries in the sine table (one full turn)
pub const SIN_LUT_ENTRIES: i32 = 512;

/// Angle units in a quarter turn
pub const QUARTER_TURN: i16 = 128;

const ANGLE_MASK: i32 = SIN_LUT_ENTRIES - 1;

/// `round(sin(2πi / 512) * 512)` in 7.9
static SIN_LUT: [i16; 512] = [
    0, 6, 13, 19, 25, 31, 38, 44, 50, 56, 63, 69, 75, 81, 88, 94,
    100, 106, 112, 118, 124, 130, 137, 143, 149, 155, 161, 167, 172, 178, 184, 190,
    196, 202, 207, 213, 219, 225, 230, 236, 241, 247, 252, 258, 263, 269, 274, 279,
    284, 290, 295, 300, 305, 310, 315, 320, 325, 330, 334, 339, 344, 348, 353, 358,
    362, 366, 371, 375, 379, 384, 388, 392, 396, 400, 404, 407, 411, 415, 419, 422,
    426, 429, 433, 436, 439, 442, 445, 449, 452, 454, 457, 460, 463, 465, 468, 471,
    473, 475, 478, 480, 482, 484, 486, 488, 490, 492, 493, 495, 497, 498, 500, 501,
    502, 503, 504, 505, 506, 507, 508, 509, 510, 510, 511, 511, 511, 512, 512, 512,
    512, 512, 512, 512, 511, 511, 511, 510, 510, 509, 508, 507, 506, 505, 504, 503,
    502, 501, 500, 498, 497, 495, 493, 492, 490, 488, 486, 484, 482, 480, 478, 475,
    473, 471, 468, 465, 463, 460, 457, 454, 452, 449, 445, 442, 439, 436, 433, 429,
    426, 422, 419, 415, 411, 407, 404, 400, 396, 392, 388, 384, 379, 375, 371, 366,
    362, 358, 353, 348, 344, 339, 334, 330, 325, 320, 315, 310, 305, 300, 295, 290,
    284, 279, 274, 269, 263, 258, 252, 247, 241, 236, 230, 225, 219, 213, 207, 202,
    196, 190, 184, 178, 172, 167, 161, 155, 149, 143, 137, 130, 124, 118, 112, 106,
    100, 94, 88, 81, 75, 69, 63, 56, 50, 44, 38, 31, 25, 19, 13, 6,
    0, -6, -13, -19, -25, -31, -38, -44, -50, -56, -63, -69, -75, -81, -88, -94,
    -100, -106, -112, -118, -124, -130, -137, -143, -149, -155, -161, -167, -172, -178, -184, -190,
    -196, -202, -207, -213, -219, -225, -230, -236, -241, -247, -252, -258, -263, -269, -274, -279,
    -284, -290, -295, -300, -305, -310, -315, -320, -325, -330, -334, -339, -344, -348, -353, -358,
    -362, -366, -371, -375, -379, -384, -388, -392, -396, -400, -404, -407, -411, -415, -419, -422,
    -426, -429, -433, -436, -439, -442, -445, -449, -452, -454, -457, -460, -463, -465, -468, -471,
    -473, -475, -478, -480, -482, -484, -486, -488, -490, -492, -493, -495, -497, -498, -500, -501,
    -502, -503, -504, -505, -506, -507, -508, -509, -510, -510, -511, -511, -511, -512, -512, -512,
    -512, -512, -512, -512, -511, -511, -511, -510, -510, -509, -508, -507, -506, -505, -504, -503,
    -502, -501, -500, -498, -497, -495, -493, -492, -490, -488, -486, -484, -482, -480, -478, -475,
    -473, -471, -468, -465, -463, -460, -457, -454, -452, -449, -445, -442, -439, -436, -433, -429,
    -426, -422, -419, -415, -411, -407, -404, -400, -396, -392, -388, -384, -379, -375, -371, -366,
    -362, -358, -353, -348, -344, -339, -334, -330, -325, -320, -315, -310, -305, -300, -295, -290,
    -284, -279, -274, -269, -263, -258, -252, -247, -241, -236, -230, -225, -219, -213, -207, -202,
    -196, -190, -184, -178, -172, -167, -161, -155, -149, -143, -137, -130, -124, -118, -112, -106,
    -100, -94, -88, -81, -75, -69, -63, -56, -50, -44, -38, -31, -25, -19, -13, -6,
];

/// Sine of an angle in 512ths of a turn
#[must_use]
pub fn sin(angle: i16) -> Fix7_9 {
    Fix7_9(SIN_LUT[(i32::from(angle) & ANGLE_MASK) as usize])
}

/// Cosine of an angle in 512ths of a turn
#[must_use]
pub fn cos(angle: i16) -> Fix7_9 {
    Fix7_9(SIN_LUT[((i32::from(QUARTER_TURN) - i32::from(angle)) & ANGLE_MASK) as usize])
}

/// Convert degrees to table angle units
#[must_use]
pub fn degrees_to_angle(degrees: f32) -> i16 {
    (degrees * SIN_LUT_ENTRIES as f32 / 360.0).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinal_angles() {
        assert_eq!(sin(0), Fix7_9::ZERO);
        assert_eq!(sin(128), Fix7_9::ONE);
        assert_eq!(sin(384), -Fix7_9::ONE);
        assert_eq!(cos(0), Fix7_9::ONE);
        assert_eq!(cos(256), -Fix7_9::ONE);
    }

    #[test]
    fn test_negative_angles_wrap() {
        assert_eq!(sin(-128), sin(384));
        assert_eq!(cos(-64), cos(64));
        assert_eq!(sin(512 + 37), sin(37));
    }

    #[test]
    fn test_cosine_is_quarter_shifted_sine() {
        for angle in -600..600 {
            assert_eq!(cos(angle), sin(angle + QUARTER_TURN));
        }
    }

    #[test]
    fn test_degrees_to_angle() {
        assert_eq!(degrees_to_angle(90.0), 128);
        assert_eq!(degrees_to_angle(-180.0), -256);
    }
}
