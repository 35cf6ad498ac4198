//! Writes synthetic update files for the sketches to consume.
//!
//! Usage:
//!   stream_generator stream  <n> <updates> <output>
//!   stream_generator zipfian <n> <draws>   <output> [exponent]

use lp_sampling::stream::{uniform_stream, write_stream, zipfian_frequencies};
use rand::Rng;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 4 {
        eprintln!("usage: stream_generator <stream|zipfian> <n> <updates> <output> [exponent]");
        std::process::exit(2);
    }

    let mode = args[0].as_str();
    let n: u64 = args[1].parse().expect("n must be a positive integer");
    let count: usize = args[2].parse().expect("updates must be an integer");
    let output = &args[3];
    let exponent: f64 = args
        .get(4)
        .map(|raw| raw.parse().expect("exponent must be a number"))
        .unwrap_or(1.0);

    let seed: u64 = rand::thread_rng().gen();
    let updates: Vec<(u64, i64)> = match mode {
        "stream" => uniform_stream(n, count, seed)
            .expect("stream parameters rejected")
            .collect(),
        "zipfian" => zipfian_frequencies(n, exponent, count, seed)
            .expect("zipfian parameters rejected")
            .into_iter()
            .enumerate()
            .map(|(index, f)| (index as u64, f))
            .collect(),
        other => {
            eprintln!("unknown mode '{other}'; choose 'stream' or 'zipfian'");
            std::process::exit(2);
        }
    };

    write_stream(output, n, &updates).expect("could not write output file");
    println!("Wrote {} lines to {output} (mode {mode}, n = {n})", updates.len());
}
