/*
 * Copyright 2021 William Swartzendruber
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! Turns rendered captions into text.

#[cfg(test)]
mod tests;

pub mod tsv;

use super::{
    language::Language,
    options::TesseractConfig,
    tool::{run, ToolError},
};
use std::{
    io::Error as IoError,
    path::Path,
    process::Command,
    string::FromUtf8Error,
};
use image::{imageops, GrayImage, ImageError, ImageFormat, Luma, Pixel, RgbaImage};
use log::debug;
use pgs::timeline::Raster;
use tempfile::Builder as TempFileBuilder;
use thiserror::Error as ThisError;
use tsv::TsvError;

/// White space added around captions before recognition.
const BORDER: u32 = 100;

#[derive(ThisError, Debug)]
pub enum RecognitionError {
    #[error("there is nothing to recognize")]
    EmptyImage,
    #[error("image could not be stored")]
    IoError {
        #[from]
        source: IoError,
    },
    #[error("image could not be encoded")]
    ImageError {
        #[from]
        source: ImageError,
    },
    #[error("recognizer could not be run")]
    ToolError {
        #[from]
        source: ToolError,
    },
    #[error("recognizer output is not UTF-8")]
    NotUtf8 {
        #[from]
        source: FromUtf8Error,
    },
    #[error("recognizer output could not be read")]
    TsvError {
        #[from]
        source: TsvError,
    },
}

pub type RecognitionResult<T> = Result<T, RecognitionError>;

/// Anything that reads text out of a caption image.
///
/// One recognizer is shared by every worker, so calls may happen concurrently.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, raster: &Raster, language: Language) -> RecognitionResult<String>;
}

/// Converts a caption to black text on a white background with a white border.
///
/// Transparent pixels and dark pixels (outlines, shadows) become background; opaque bright
/// pixels become text.
pub fn binarize(raster: &Raster) -> RecognitionResult<GrayImage> {

    let width = raster.rect.width;
    let height = raster.rect.height;

    if width == 0 || height == 0 {
        return Err(RecognitionError::EmptyImage)
    }

    let rgba = RgbaImage::from_raw(width, height, raster.data.clone())
        .ok_or(RecognitionError::EmptyImage)?;
    let caption = GrayImage::from_fn(width, height, |x, y| {
        let pixel = rgba.get_pixel(x, y);
        if pixel.0[3] > 127 && pixel.to_luma().0[0] > 127 {
            Luma([0])
        } else {
            Luma([255])
        }
    });
    let mut image = GrayImage::from_pixel(width + 2 * BORDER, height + 2 * BORDER, Luma([255]));

    imageops::replace(&mut image, &caption, BORDER as i64, BORDER as i64);

    Ok(image)
}

/// Recognizes text by running the `tesseract` command on a PNG of each caption.
#[derive(Clone, Debug)]
pub struct Tesseract {
    config: TesseractConfig,
    keep_temp_files: bool,
}

impl Tesseract {

    pub fn new(config: TesseractConfig, keep_temp_files: bool) -> Self {
        Self { config, keep_temp_files }
    }

    pub fn config(&self) -> &TesseractConfig {
        &self.config
    }

    fn command(&self, image_path: &Path, language: Language) -> Command {

        let mut command = Command::new(&self.config.binary);

        command
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(language.tesseract_code())
            .arg("--oem")
            .arg(self.config.engine_mode.to_string())
            .arg("--psm")
            .arg(self.config.page_segmentation_mode.to_string());

        if let Some(tessdata_dir) = &self.config.tessdata_dir {
            command.arg("--tessdata-dir").arg(tessdata_dir);
        }
        if let Some(omp_thread_limit) = self.config.omp_thread_limit {
            command.env("OMP_THREAD_LIMIT", omp_thread_limit.to_string());
        }

        command.arg("tsv");
        command
    }
}

impl Recognizer for Tesseract {

    fn recognize(&self, raster: &Raster, language: Language) -> RecognitionResult<String> {

        let image = binarize(raster)?;
        let file = TempFileBuilder::new().prefix("pgsrip-").suffix(".png").tempfile()?;

        image.save_with_format(file.path(), ImageFormat::Png)?;

        let output = run(&mut self.command(file.path(), language), &[]);

        if self.keep_temp_files {
            let (_, path) = file.keep().map_err(|error| error.error)?;
            debug!("kept {}", path.display());
        }

        let words = tsv::parse(&String::from_utf8(output?)?)?;

        Ok(tsv::assemble(words, self.config.confidence))
    }
}
