use lp_sampling::stream::append_outcome;
use lp_sampling::BoostedSampler;
use rand::Rng;

fn main() {
    let freqs: [f64; 10] = [119.0, 60.0, 7.0, 76.0, 63.0, 68.0, -37.0, 31.0, 29.0, -1.0];
    let updates: Vec<(u64, f64)> = freqs
        .iter()
        .enumerate()
        .map(|(i, &f)| (i as u64, f))
        .collect();

    let log_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "lpsampler.log".to_string());
    let seed: u64 = rand::thread_rng().gen();

    let race = BoostedSampler::new(1, 0.0625, 0.1, freqs.len() as u64, seed).unwrap();
    println!(
        "Racing {} samplers over {} workers (seed {seed})",
        race.attempts(),
        race.workers()
    );

    let outcome = race.run(&updates).unwrap();
    match outcome {
        Some(index) => println!("Sampled coordinate: {index}"),
        None => println!("All attempts failed"),
    }

    if let Err(err) = append_outcome(&log_path, outcome) {
        eprintln!("could not write outcome log {log_path}: {err}");
        std::process::exit(1);
    }
}
