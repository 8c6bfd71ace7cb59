/*
 * Copyright 2021 William Swartzendruber
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

use std::collections::HashSet;
use thiserror::Error as ThisError;

/// The level `tesseract` reports words at.
const WORD_LEVEL: u32 = 5;

#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum TsvError {
    #[error("TSV output is empty")]
    MissingHeader,
    #[error("TSV output has no {column:?} column")]
    MissingColumn {
        column: &'static str,
    },
    #[error("TSV row {row} is malformed")]
    InvalidRow {
        row: usize,
    },
}

/// One recognized word and its position in the page layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Word {
    pub page: u32,
    pub block: u32,
    pub paragraph: u32,
    pub line: u32,
    pub word: u32,
    pub confidence: f32,
    pub text: String,
}

impl Word {

    fn layout(&self) -> (u32, u32, u32, u32, u32) {
        (self.page, self.block, self.paragraph, self.line, self.word)
    }

    fn line_key(&self) -> (u32, u32, u32, u32) {
        (self.page, self.block, self.paragraph, self.line)
    }
}

/// Reads the non-empty words out of `tesseract` TSV output.
pub fn parse(tsv: &str) -> Result<Vec<Word>, TsvError> {

    let mut lines = tsv.lines();
    let header = lines
        .next()
        .filter(|header| !header.trim().is_empty())
        .ok_or(TsvError::MissingHeader)?
        .split('\t')
        .collect::<Vec<&str>>();
    let column = |column: &'static str| {
        header
            .iter()
            .position(|name| name.trim() == column)
            .ok_or(TsvError::MissingColumn { column })
    };
    let level = column("level")?;
    let page = column("page_num")?;
    let block = column("block_num")?;
    let paragraph = column("par_num")?;
    let line = column("line_num")?;
    let word = column("word_num")?;
    let confidence = column("conf")?;
    let text = column("text")?;
    let mut words = Vec::new();

    for (index, row) in lines.enumerate() {

        if row.is_empty() {
            continue
        }

        let row_number = index + 1;
        let fields = row.split('\t').collect::<Vec<&str>>();
        let number = |column: usize| {
            fields
                .get(column)
                .and_then(|field| field.trim().parse::<u32>().ok())
                .ok_or(TsvError::InvalidRow { row: row_number })
        };

        if number(level)? != WORD_LEVEL {
            continue
        }

        let word_text = fields.get(text).map_or("", |text| text.trim());

        if word_text.is_empty() {
            continue
        }

        words.push(
            Word {
                page: number(page)?,
                block: number(block)?,
                paragraph: number(paragraph)?,
                line: number(line)?,
                word: number(word)?,
                confidence: fields
                    .get(confidence)
                    .and_then(|field| field.trim().parse::<f32>().ok())
                    .ok_or(TsvError::InvalidRow { row: row_number })?,
                text: word_text.to_string(),
            }
        );
    }

    Ok(words)
}

/// Joins words into lines of text.
///
/// Words below `threshold` are kept only when the same word was also recognized at or above it
/// somewhere else. Words are separated by spaces and lines by newlines.
pub fn assemble(mut words: Vec<Word>, threshold: u8) -> String {

    let threshold = threshold as f32;
    let confident = words
        .iter()
        .filter(|word| word.confidence >= threshold)
        .map(|word| word.text.clone())
        .collect::<HashSet<String>>();

    words.sort_by_key(Word::layout);

    let mut lines = Vec::<String>::new();
    let mut current_line = None;

    for word in words.iter() {

        if word.confidence < threshold && !confident.contains(&word.text) {
            continue
        }

        match lines.last_mut() {
            Some(line) if current_line == Some(word.line_key()) => {
                line.push(' ');
                line.push_str(&word.text);
            }
            _ => lines.push(word.text.clone()),
        }

        current_line = Some(word.line_key());
    }

    lines.join("\n")
}
