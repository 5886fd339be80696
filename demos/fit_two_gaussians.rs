use emix::data::Sample;
use emix::dist::ComponentParameters;
use emix::em::{Em, EmConfig, UnderflowPolicy};
use emix::traits::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

fn main() {
    let mut rng = Xoshiro256Plus::seed_from_u64(0x2718);

    // 30% of the mass around -1, the rest around 2.5
    let truth =
        ComponentParameters::from_triples([(-1.0, 0.8, 0.3), (2.5, 1.2, 0.7)])
            .unwrap();
    let xs: Vec<f64> = truth.sample(5_000, &mut rng);
    let sample = Sample::new(&xs).unwrap();

    let config = EmConfig::default()
        .with_tol(1E-8)
        .with_max_iters(500)
        .with_underflow(UnderflowPolicy::Clamp);
    let em = Em::new(config).unwrap();

    // Try a handful of k-means seeds and keep the best fit
    let seeds: Vec<u64> = (0..4).collect();
    match em.fit_restarts(&sample, &seeds) {
        Ok(report) => {
            let fitted = report.params().sorted_by_mean();
            println!("truth:  {}", truth);
            println!("fitted: {}", fitted);
            println!(
                "{} after {} iterations, ln p(x) = {:.4}",
                report.status(),
                report.n_iters(),
                report.ln_likelihood()
            );
            if report.n_clamped() > 0 {
                println!("{} densities were clamped", report.n_clamped());
            }

            // Classify a few points by their most responsible component
            let assignments = report.state().responsibilities().assignments();
            for (x, k) in xs.iter().zip(assignments.iter()).take(5) {
                let mu = report.params().mu(*k);
                println!("x = {:>7.3} -> component {} (μ = {:.3})", x, k, mu);
            }
        }
        Err(failure) => {
            eprintln!("fit failed: {}", failure);
            if let Some(state) = failure.last_state() {
                eprintln!("last parameters: {}", state.params());
            }
        }
    }
}
