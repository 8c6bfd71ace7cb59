/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Converts palette colors between limited-range BT.709 YCbCr and full-range RGB.

#[cfg(test)]
mod tests;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YcbcrPixel {
    pub y: u8,
    pub cb: u8,
    pub cr: u8,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RgbPixel {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

pub fn rgb_pixel(input: YcbcrPixel) -> RgbPixel {

    let y = expand(input.y as f64 / 255.0);
    let cb = (input.cb as f64 - 128.0) / 224.0;
    let cr = (input.cr as f64 - 128.0) / 224.0;

    RgbPixel {
        red:   to_u8(y + 1.5748 * cr),
        green: to_u8(y - 0.18732 * cb - 0.46812 * cr),
        blue:  to_u8(y + 1.8556 * cb),
    }
}

pub fn ycbcr_pixel(input: RgbPixel) -> YcbcrPixel {

    let red = input.red as f64 / 255.0;
    let green = input.green as f64 / 255.0;
    let blue = input.blue as f64 / 255.0;
    let y = 0.2126 * red + 0.7152 * green + 0.0722 * blue;

    YcbcrPixel {
        y: to_u8(compress(y)),
        cb: ((blue - y) / 1.8556 * 224.0 + 128.0).max(0.0).min(255.0).round() as u8,
        cr: ((red - y) / 1.5748 * 224.0 + 128.0).max(0.0).min(255.0).round() as u8,
    }
}

fn to_u8(value: f64) -> u8 {
    (value * 255.0).max(0.0).min(255.0).round() as u8
}

fn compress(value: f64) -> f64 {
    (value * 219.0 + 16.0) / 255.0
}

fn expand(value: f64) -> f64 {
    match value {
        v if v < 16.0 / 255.0 => 0.0,
        v if v > 235.0 / 255.0 => 1.0,
        _ => (value * 255.0 - 16.0) / 219.0,
    }
}
