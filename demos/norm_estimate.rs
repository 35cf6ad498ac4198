use lp_sampling::{F1Estimator, F2Estimator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() {
    let seed: u64 = rand::thread_rng().gen();
    println!("Random seed: {seed}");

    let mut f2 = F2Estimator::new(0.1, 0.01, seed).unwrap();
    let mut f1 = F1Estimator::new(0.125, 0.01, seed).unwrap();
    println!("F1 sketch width: {}\n", f1.width());

    let mut rng = StdRng::seed_from_u64(seed);
    let n = 30u64;
    let freqs: Vec<i64> = (0..n).map(|_| rng.gen_range(-25i64..=25)).collect();

    let l1: f64 = freqs.iter().map(|&f| f.abs() as f64).sum();
    let l2: f64 = freqs.iter().map(|&f| (f * f) as f64).sum::<f64>().sqrt();

    for (key, &f) in freqs.iter().enumerate() {
        f2.update(key as u64, f as f64);
        f1.update(key as u64, f as f64);
    }

    println!("Estimate for l2 norm: {:.3}", f2.estimate_norm());
    println!("Actual l2 norm: {l2:.3}");
    println!("Estimate for l1 norm: {:.3}", f1.estimate_norm());
    println!("Actual l1 norm: {l1:.3}");
}
