use lp_sampling::CountSketch;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() {
    let n = 30u64;
    let mut rng = StdRng::seed_from_u64(88);
    let freqs: Vec<i64> = (0..n).map(|_| rng.gen_range(-25i64..=25)).collect();

    let width = 25;
    let depth = 4 * (n as f64).ln().ceil() as usize + 1;
    let mut cs = CountSketch::new(width, depth, rng.gen()).unwrap();

    for (key, &f) in freqs.iter().enumerate() {
        cs.update(key as u64, f);
    }

    let mut total_error = 0.0;
    let mut max_error = 0.0f64;
    for (key, &f) in freqs.iter().enumerate() {
        let err = (cs.estimate(key as u64) - f).abs() as f64;
        total_error += err;
        max_error = max_error.max(err);
    }

    println!("Count-Sketch {width}x{depth} over {n} keys");
    println!("Average error: {:.3}", total_error / n as f64);
    println!("Max error: {max_error}");
}
