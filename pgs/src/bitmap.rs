/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Decodes and encodes the run-length compressed pixel data of objects.
//!
//! # Grammar
//!
//! Each line is a series of codes terminated by `00 00`. A nonzero byte is a single pixel of
//! that palette index. A zero byte introduces a run:
//!
//! | Bytes            | Meaning                                  |
//! |------------------|------------------------------------------|
//! | `00 00`          | end of line                              |
//! | `00 0L`          | `L` (1-63) pixels of index 0             |
//! | `00 4L LL`       | `L` (64-16383) pixels of index 0         |
//! | `00 8L CC`       | `L` (3-63) pixels of index `C`           |
//! | `00 CL LL CC`    | `L` (64-16383) pixels of index `C`       |


use thiserror::Error as ThisError;

const MAX_RUN: usize = 16_383;

/// The error type for [`decode`].
///
/// The decoder never pads or clips: any disagreement between the data and the declared
/// dimensions is an error.
#[derive(ThisError, Clone, Debug, PartialEq)]
pub enum DecodeError {
    #[error("data ends within line {line}")]
    Truncated {
        line: usize,
    },
    #[error("line {line} holds more than {width} pixels")]
    LineOverflow {
        line: usize,
        width: usize,
    },
    #[error("line {line} ends after {length} of {width} pixels")]
    LineUnderflow {
        line: usize,
        width: usize,
        length: usize,
    },
    #[error("data continues past the last of {height} lines")]
    TooManyLines {
        height: usize,
    },
}

/// A palette-indexed raster.
#[derive(Clone, Debug, Default, Hash, PartialEq)]
pub struct Bitmap {
    width: u16,
    height: u16,
    pixels: Vec<u8>,
}

impl Bitmap {

    /// Creates a bitmap from row-major palette indices.
    ///
    /// Returns `None` if `pixels` does not hold exactly `width * height` entries.
    pub fn new(width: u16, height: u16, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() == width as usize * height as usize {
            Some(Self { width, height, pixels })
        } else {
            None
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn row(&self, y: u16) -> &[u8] {
        let start = y as usize * self.width as usize;
        &self.pixels[start..start + self.width as usize]
    }

    /// Copies out a region, clamped to the bounds of this bitmap.
    pub fn crop(&self, x: u16, y: u16, width: u16, height: u16) -> Bitmap {

        let x = x.min(self.width);
        let y = y.min(self.height);
        let width = width.min(self.width - x);
        let height = height.min(self.height - y);
        let mut pixels = Vec::with_capacity(width as usize * height as usize);

        for row in y..y + height {
            pixels.extend_from_slice(&self.row(row)[x as usize..(x + width) as usize]);
        }

        Bitmap { width, height, pixels }
    }
}

/// Decompresses run-length encoded object data into exactly `width * height` indices.
pub fn decode(data: &[u8], width: u16, height: u16) -> Result<Bitmap, DecodeError> {

    let width = width as usize;
    let height = height as usize;
    let mut pixels = Vec::with_capacity(width * height);
    let mut input = data.iter().copied();
    let mut line = 0;
    let mut length = 0;

    loop {

        let byte = match input.next() {
            Some(byte) => byte,
            None if line == height => break,
            // The end-of-line code after the final line may be left out.
            None if line + 1 == height && length == width => break,
            None => return Err(DecodeError::Truncated { line }),
        };

        if line == height {
            return Err(DecodeError::TooManyLines { height })
        }

        let (count, index) = if byte != 0x00 {
            (1, byte)
        } else {
            let flags = input.next().ok_or(DecodeError::Truncated { line })?;
            let mut count = (flags & 0x3F) as usize;

            if flags & 0x40 != 0 {
                let low = input.next().ok_or(DecodeError::Truncated { line })?;
                count = count << 8 | low as usize;
            }

            let index = if flags & 0x80 != 0 {
                input.next().ok_or(DecodeError::Truncated { line })?
            } else {
                0x00
            };

            if flags == 0x00 {
                if length != width {
                    return Err(DecodeError::LineUnderflow { line, width, length })
                }
                line += 1;
                length = 0;
                continue
            }

            (count, index)
        };

        if length + count > width {
            return Err(DecodeError::LineOverflow { line, width })
        }

        pixels.extend(std::iter::repeat(index).take(count));
        length += count;
    }

    Ok(
        Bitmap {
            width: width as u16,
            height: height as u16,
            pixels,
        }
    )
}

/// Compresses a bitmap using the shortest code for every run.
pub fn encode(bitmap: &Bitmap) -> Vec<u8> {

    let mut output = Vec::<u8>::new();

    for y in 0..bitmap.height {

        let line = bitmap.row(y);
        let mut start = 0;

        while start < line.len() {

            let byte = line[start];
            let count = line[start..].iter().take_while(|&&next| next == byte).count();

            output_rle_sequence(&mut output, byte, count);
            start += count;
        }

        output.push(0x00);
        output.push(0x00);
    }

    output
}

fn output_rle_sequence(output: &mut Vec<u8>, byte: u8, mut count: usize) {

    while count > MAX_RUN {
        output_rle_sequence(output, byte, MAX_RUN);
        count -= MAX_RUN;
    }

    if byte == 0x00 {
        match count {
            0 => {}
            1 ..= 63 => {
                output.push(0x00);
                output.push(count as u8);
            }
            _ => {
                output.push(0x00);
                output.push(0x40 | (count >> 8) as u8);
                output.push((count & 0xFF) as u8);
            }
        }
    } else {
        match count {
            0 => {}
            1 => {
                output.push(byte);
            }
            2 => {
                output.push(byte);
                output.push(byte);
            }
            3 ..= 63 => {
                output.push(0x00);
                output.push(0x80 | count as u8);
                output.push(byte);
            }
            _ => {
                output.push(0x00);
                output.push(0xC0 | (count >> 8) as u8);
                output.push((count & 0xFF) as u8);
                output.push(byte);
            }
        }
    }
}
