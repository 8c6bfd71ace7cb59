/*
 * Copyright 2021 William Swartzendruber
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

use pgsrip::{
    options::parse_age,
    recognize::Tesseract,
    rip::error_chain,
    Language,
    Options,
    Ripper,
    RipEvent,
    SubtitleTypeFilter,
    TesseractConfig,
};
use std::{
    path::PathBuf,
    str::FromStr,
    sync::mpsc::channel,
    thread,
};
use anyhow::{anyhow, Context, Result};
use clap::{
    app_from_crate,
    crate_authors,
    crate_description,
    crate_name,
    crate_version,
    Arg,
    ArgGroup,
};
use env_logger::Env;

fn positive(value: String) -> Result<(), String> {
    match value.parse::<usize>() {
        Ok(count) if count > 0 => Ok(()),
        _ => Err("must be a positive integer".to_string()),
    }
}

fn main() -> Result<()> {

    let type_filters = SubtitleTypeFilter::ALL.map(SubtitleTypeFilter::name);
    let mut app = app_from_crate!()
        .arg(Arg::with_name("language")
            .long("language")
            .short("l")
            .value_name("CODE")
            .help("Language to rip; may be given more than once (default: all)")
            .takes_value(true)
            .multiple(true)
            .number_of_values(1)
            .validator(|value| {
                Language::from_str(&value).map(|_| ()).map_err(|error| error.to_string())
            })
        )
        .arg(Arg::with_name("force")
            .long("force")
            .short("f")
            .help("Overwrite existing subtitle files that differ")
        )
        .arg(Arg::with_name("all")
            .long("all")
            .help("Rip every track instead of one per language and type")
        )
        .arg(Arg::with_name("max-workers")
            .long("max-workers")
            .short("w")
            .value_name("COUNT")
            .help("Number of tracks ripped at once (default: number of CPUs)")
            .takes_value(true)
            .validator(positive)
        )
        .arg(Arg::with_name("ocr-workers")
            .long("ocr-workers")
            .value_name("COUNT")
            .help("Number of captions recognized at once per track")
            .takes_value(true)
            .default_value("1")
            .validator(positive)
        )
        .arg(Arg::with_name("keep-temp-files")
            .long("keep-temp-files")
            .help("Keep extracted streams and caption images")
        )
        .arg(Arg::with_name("tessdata")
            .long("tessdata")
            .value_name("DIR")
            .help("Directory holding tesseract language data")
            .takes_value(true)
        )
        .arg(Arg::with_name("confidence")
            .long("confidence")
            .value_name("PERCENT")
            .help("Minimum word confidence")
            .takes_value(true)
            .default_value("65")
            .validator(|value| {
                match value.parse::<u8>() {
                    Ok(percent) if percent <= 100 => Ok(()),
                    _ => Err("must be between 0 and 100".to_string()),
                }
            })
        )
        .arg(Arg::with_name("age")
            .long("age")
            .short("a")
            .value_name("AGE")
            .help("Skip media files modified longer ago than this (e.g. 12h, 2d, 1w)")
            .takes_value(true)
            .validator(|value| {
                parse_age(&value).map(|_| ()).ok_or_else(|| "must look like 1w2d3h".to_string())
            })
        )
        .arg(Arg::with_name("srt-age")
            .long("srt-age")
            .short("A")
            .value_name("AGE")
            .help("When overwriting, keep subtitle files younger than this")
            .takes_value(true)
            .validator(|value| {
                parse_age(&value).map(|_| ()).ok_or_else(|| "must look like 1w2d3h".to_string())
            })
        )
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .help("Logs more; may be given up to three times")
        )
        .arg(Arg::with_name("paths")
            .index(1)
            .value_name("PATH")
            .help("Media files to rip: .sup, .mkv or .mks")
            .required(true)
            .multiple(true)
        );

    for name in type_filters.iter() {
        app = app.arg(Arg::with_name(name)
            .long(name)
            .help(match *name {
                "full-only" => "Rip full subtitles only",
                "forced-only" => "Rip forced subtitles only",
                "sdh-only" => "Rip SDH subtitles only",
                "forced-included" => "Rip full and forced subtitles",
                "sdh-included" => "Rip full and SDH subtitles",
                _ => "Rip full, forced and SDH subtitles (default)",
            })
        );
    }

    let matches = app
        .group(ArgGroup::with_name("type-filter").args(&type_filters))
        .after_help(format!("This utility reads PGS subtitles from Blu-ray rips and \
            writes them out as SubRip text files using tesseract for text recognition.\n\n\
            Copyright © 2021 William Swartzendruber\n\
            Licensed under the Mozilla Public License 2.0\n\
            <{}>", env!("CARGO_PKG_REPOSITORY")).as_str())
        .get_matches();
    let level = match matches.occurrences_of("verbose") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let mut options = Options::default();

    if let Some(codes) = matches.values_of("language") {
        for code in codes {
            options.languages.insert(Language::from_str(code)?);
        }
    }
    if let Some(filter) = type_filters.iter().find(|name| matches.is_present(name)) {
        options.type_filter = SubtitleTypeFilter::from_str(filter)?;
    }
    if let Some(count) = matches.value_of("max-workers") {
        options.max_workers = count.parse().context("invalid worker count")?;
    }
    if let Some(count) = matches.value_of("ocr-workers") {
        options.recognition_workers = count.parse().context("invalid worker count")?;
    }
    if let Some(age) = matches.value_of("age") {
        options.age = Some(parse_age(age).ok_or_else(|| anyhow!("invalid age {:?}", age))?);
    }
    if let Some(age) = matches.value_of("srt-age") {
        options.srt_age = Some(parse_age(age).ok_or_else(|| anyhow!("invalid age {:?}", age))?);
    }

    options.overwrite = matches.is_present("force");
    options.one_per_lang = !matches.is_present("all");
    options.keep_temp_files = matches.is_present("keep-temp-files");
    options.tesseract = TesseractConfig {
        tessdata_dir: matches.value_of("tessdata").map(PathBuf::from),
        confidence: matches
            .value_of("confidence")
            .map(str::parse)
            .transpose()
            .context("invalid confidence")?
            .unwrap_or(TesseractConfig::default().confidence),
        omp_thread_limit: Some(1),
        ..Default::default()
    };

    let paths = matches
        .values_of_os("paths")
        .map(|paths| paths.map(PathBuf::from).collect::<Vec<PathBuf>>())
        .unwrap_or_default();
    let recognizer = Tesseract::new(options.tesseract.clone(), options.keep_temp_files);
    let (sender, receiver) = channel();
    let ripper = Ripper::new(options, Box::new(recognizer)).with_events(sender);
    let reporter = thread::spawn(move || {
        for event in receiver {
            match event {
                RipEvent::MediaDiscarded { path, error } => {
                    eprintln!("Discarded {}: {}", path.display(), error_chain(&error));
                }
                RipEvent::TrackFinished { target, result: Err(error), .. } => {
                    eprintln!("Failed {}: {}", target.display(), error_chain(&error));
                }
                RipEvent::TrackFinished { target, result: Ok(decision), .. } => {
                    eprintln!("{:?} {}", decision, target.display());
                }
                _ => {}
            }
        }
    });
    let summary = ripper.rip(&paths);

    drop(ripper);
    reporter.join().map_err(|_| anyhow!("progress reporter panicked"))?;

    println!("{}", summary);

    Ok(())
}
