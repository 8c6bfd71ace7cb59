/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: CC0-1.0
 */

use super::*;

fn cue(start: u64, end: u64, text: &str) -> Cue {
    Cue { start, end, text: text.to_string() }
}

#[test]
fn test_timestamp() {
    assert_eq!(timestamp(0), "00:00:00,000");
    assert_eq!(timestamp(3_723_004), "01:02:03,004");
    assert_eq!(timestamp(360_000_000), "100:00:00,000");
}

#[test]
fn test_serialize() {

    let entries = entries(vec![
        cue(1_000, 2_500, "Hello there."),
        cue(3_000, 4_000, "- Who?\n- You."),
    ]);

    assert_eq!(
        serialize(&entries),
        "1\n00:00:01,000 --> 00:00:02,500\nHello there.\n\n\
         2\n00:00:03,000 --> 00:00:04,000\n- Who?\n- You.\n\n",
    );
}

#[test]
fn test_merge_flicker() {

    let entries = entries(vec![
        cue(0, 1_000, "Same"),
        cue(1_005, 2_000, "Same"),
        cue(2_000, 3_000, "Same"),
        cue(3_500, 4_000, "Same"),
        cue(4_000, 5_000, "Other"),
    ]);

    assert_eq!(
        entries,
        vec![
            SrtEntry { index: 1, start: 0, end: 3_000, text: "Same".into() },
            SrtEntry { index: 2, start: 3_500, end: 4_000, text: "Same".into() },
            SrtEntry { index: 3, start: 4_000, end: 5_000, text: "Other".into() },
        ],
    );
}

#[test]
fn test_blank_cues_are_dropped() {

    let entries = entries(vec![
        cue(0, 1_000, "  "),
        cue(1_000, 2_000, " One \n\n  two "),
        cue(2_000, 3_000, ""),
    ]);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].index, 1);
    assert_eq!(entries[0].text, "One\ntwo");
    assert_eq!(serialize(&[]), "");
}
