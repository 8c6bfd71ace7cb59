/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: CC0-1.0
 */

use super::*;
use super::tsv::{assemble, parse, Word};
use pgs::timeline::Rect;

const HEADER: &str =
    "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

fn row(layout: [u32; 6], confidence: &str, text: &str) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t0\t0\t10\t10\t{}\t{}",
        layout[0], layout[1], layout[2], layout[3], layout[4], layout[5], confidence, text,
    )
}

fn word(line: u32, number: u32, confidence: f32, text: &str) -> Word {
    Word {
        page: 1,
        block: 1,
        paragraph: 1,
        line,
        word: number,
        confidence,
        text: text.to_string(),
    }
}

#[test]
fn test_parse_words_only() {

    let tsv = [
        HEADER.to_string(),
        row([1, 1, 0, 0, 0, 0], "-1", ""),
        row([4, 1, 1, 1, 1, 0], "-1", ""),
        row([5, 1, 1, 1, 1, 1], "96.081436", "Hello"),
        row([5, 1, 1, 1, 1, 2], "91", "there"),
        row([5, 1, 1, 1, 1, 3], "95", " "),
    ].join("\n");
    let words = parse(&tsv).unwrap();

    assert_eq!(words.len(), 2);
    assert_eq!(words[0].text, "Hello");
    assert!((words[0].confidence - 96.081436).abs() < 0.001);
    assert_eq!(words[1].word, 2);
}

#[test]
fn test_parse_errors() {
    assert_eq!(parse(""), Err(tsv::TsvError::MissingHeader));
    assert_eq!(
        parse("level\tpage_num\ttext"),
        Err(tsv::TsvError::MissingColumn { column: "block_num" }),
    );
    assert_eq!(
        parse(&format!("{}\n{}", HEADER, row([5, 1, 1, 1, 1, 1], "high", "Hi"))),
        Err(tsv::TsvError::InvalidRow { row: 1 }),
    );
}

#[test]
fn test_assemble_orders_lines() {

    let words = vec![
        word(2, 1, 90.0, "world."),
        word(1, 2, 90.0, "there,"),
        word(1, 1, 90.0, "Hello"),
        word(2, 0, 90.0, "-"),
    ];

    assert_eq!(assemble(words, 65), "Hello there,\n- world.");
}

#[test]
fn test_assemble_confidence() {

    let words = vec![
        word(1, 1, 90.0, "I"),
        word(1, 2, 20.0, "know"),
        word(1, 3, 30.0, "I"),
        word(2, 1, 10.0, "~~"),
    ];

    assert_eq!(assemble(words, 65), "I I");
    assert_eq!(assemble(vec![word(1, 1, 10.0, "~~")], 65), "");
    assert_eq!(assemble(vec![word(1, 1, 10.0, "ok")], 0), "ok");
}

#[test]
fn test_binarize() {

    let raster = Raster {
        rect: Rect { x: 10, y: 20, width: 3, height: 1 },
        data: vec![
            255, 255, 255, 255,
            0, 0, 0, 255,
            255, 255, 255, 0,
        ],
    };
    let image = binarize(&raster).unwrap();

    assert_eq!(image.dimensions(), (3 + 2 * BORDER, 1 + 2 * BORDER));
    assert_eq!(image.get_pixel(BORDER, BORDER).0, [0]);
    assert_eq!(image.get_pixel(BORDER + 1, BORDER).0, [255]);
    assert_eq!(image.get_pixel(BORDER + 2, BORDER).0, [255]);
    assert_eq!(image.get_pixel(0, 0).0, [255]);
}

#[test]
fn test_binarize_empty() {
    assert!(matches!(binarize(&Raster::default()), Err(RecognitionError::EmptyImage)));
}

#[test]
fn test_missing_binary() {

    let config = TesseractConfig {
        binary: "/nonexistent/tesseract".into(),
        ..Default::default()
    };
    let raster = Raster {
        rect: Rect { x: 0, y: 0, width: 1, height: 1 },
        data: vec![255, 255, 255, 255],
    };
    let result = Tesseract::new(config, false)
        .recognize(&raster, Language::parse("en").unwrap());

    assert!(matches!(
        result,
        Err(RecognitionError::ToolError { source: ToolError::Missing { .. } }),
    ));
}
