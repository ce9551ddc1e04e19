//! Converts a Spine 3.3-3.6 `.skel` export into the equivalent JSON export.
//!
//! Usage: `skel_to_json <input.skel> [--scale <factor>] [--zero-fill] [--out <output.json>]`

use spine_skel3::{DecodeOptions, Document, EofPolicy};
use std::path::PathBuf;

fn main() {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut positional = Vec::<String>::new();
    let mut options = DecodeOptions::default();
    let mut out: Option<PathBuf> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--scale" => {
                let scale = args
                    .get(i + 1)
                    .and_then(|s| s.parse::<f32>().ok())
                    .unwrap_or(1.0);
                options = options.with_scale(scale);
                i += 2;
            }
            "--zero-fill" => {
                options = options.with_eof_policy(EofPolicy::ZeroFill);
                i += 1;
            }
            "--out" => {
                out = args.get(i + 1).map(PathBuf::from);
                i += 2;
            }
            other => {
                positional.push(other.to_string());
                i += 1;
            }
        }
    }

    let Some(input) = positional.first().map(PathBuf::from) else {
        eprintln!("usage: skel_to_json <input.skel> [--scale <factor>] [--zero-fill] [--out <output.json>]");
        std::process::exit(2);
    };

    let bytes = std::fs::read(&input).expect("read skel");
    let doc = match Document::from_skel_bytes_with_options(&bytes, &options) {
        Ok(doc) => doc,
        Err(err) => {
            eprintln!("{}: {err}", input.display());
            std::process::exit(1);
        }
    };
    let json = doc.to_json_string_pretty().expect("serialize document");

    match out {
        Some(path) => std::fs::write(&path, json).expect("write json"),
        None => println!("{json}"),
    }
}
