/*
 * Copyright 2021 William Swartzendruber
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Clone, PartialEq)]
#[error("{code:?} is not a known language")]
pub struct UnknownLanguage {
    pub code: String,
}

/// A known, determined language.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Language(isolang::Language);

impl Language {

    /// Parses an ISO 639-1, ISO 639-2 (B or T) or ISO 639-3 code, optionally followed by IETF
    /// subtags (`pt-BR`). Undetermined and similar special codes yield `None`.
    pub fn parse(code: &str) -> Option<Language> {

        let code = code.trim().to_lowercase();
        let primary = code.split(|c: char| c == '-' || c == '_').next().unwrap_or_default();

        match primary.len() {
            2 => isolang::Language::from_639_1(primary).map(Language),
            3 => match primary {
                "und" | "mul" | "mis" | "zxx" => None,
                _ => isolang::Language::from_639_3(terminological(primary)).map(Language),
            },
            _ => None,
        }
    }

    /// The shortest code for this language: ISO 639-1 if there is one, ISO 639-3 otherwise.
    pub fn code(&self) -> &'static str {
        self.0.to_639_1().unwrap_or_else(|| self.0.to_639_3())
    }

    /// The name of the traineddata file `tesseract` uses for this language.
    pub fn tesseract_code(&self) -> &'static str {
        match self.0.to_639_3() {
            "zho" => "chi_sim",
            code => code,
        }
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.code())
    }
}

impl FromStr for Language {

    type Err = UnknownLanguage;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Language::parse(code).ok_or_else(|| UnknownLanguage { code: code.to_string() })
    }
}

fn terminological(code: &str) -> &str {
    match code {
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "chi" => "zho",
        "cze" => "ces",
        "dut" => "nld",
        "fre" => "fra",
        "geo" => "kat",
        "ger" => "deu",
        "gre" => "ell",
        "ice" => "isl",
        "mac" => "mkd",
        "may" => "msa",
        "per" => "fas",
        "rum" => "ron",
        "slo" => "slk",
        "tib" => "bod",
        "wel" => "cym",
        _ => code,
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_parse_variants() {

        let german = Language::parse("de").unwrap();

        assert_eq!(Language::parse("ger"), Some(german));
        assert_eq!(Language::parse("deu"), Some(german));
        assert_eq!(Language::parse("DE-at"), Some(german));
        assert_eq!(german.code(), "de");
        assert_eq!(german.tesseract_code(), "deu");
        assert_eq!(german.to_string(), "de");
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(Language::parse("und"), None);
        assert_eq!(Language::parse(""), None);
        assert_eq!(Language::parse("english"), None);
        assert_eq!(Language::parse("qq"), None);
        assert!("xx".parse::<Language>().is_err());
    }

    #[test]
    fn test_chinese_traineddata() {
        assert_eq!(Language::parse("chi").unwrap().tesseract_code(), "chi_sim");
    }
}
