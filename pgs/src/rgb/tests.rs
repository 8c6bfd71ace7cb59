/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: CC0-1.0
 */

use super::*;

#[test]
fn test_reference_colors() {

    let white = rgb_pixel(YcbcrPixel { y: 235, cb: 128, cr: 128 });
    let black = rgb_pixel(YcbcrPixel { y: 16, cb: 128, cr: 128 });
    let red = rgb_pixel(YcbcrPixel { y: 63, cb: 102, cr: 240 });

    assert_eq!(white, RgbPixel { red: 255, green: 255, blue: 255 });
    assert_eq!(black, RgbPixel { red: 0, green: 0, blue: 0 });
    assert!(red.red >= 253 && red.green <= 2 && red.blue <= 2, "{:?}", red);
}

#[test]
fn test_below_black_clamps() {
    assert_eq!(
        rgb_pixel(YcbcrPixel { y: 0, cb: 128, cr: 128 }),
        RgbPixel { red: 0, green: 0, blue: 0 },
    );
}

#[test]
fn test_rgb_survives_conversion() {

    for red in (0..=255).step_by(15) {
        for green in (0..=255).step_by(15) {
            for blue in (0..=255).step_by(15) {

                let rgb = RgbPixel { red, green, blue };
                let cycled = rgb_pixel(ycbcr_pixel(rgb));

                assert!((cycled.red as i16 - red as i16).abs() <= 3, "{:?} {:?}", rgb, cycled);
                assert!((cycled.green as i16 - green as i16).abs() <= 3, "{:?} {:?}", rgb, cycled);
                assert!((cycled.blue as i16 - blue as i16).abs() <= 3, "{:?} {:?}", rgb, cycled);
            }
        }
    }
}
