//! Plants a faulty interaction in a random feature model and recovers it.
//!
//! Run with:
//! ```bash
//! cargo run --example planted -- --features 40 -t 2
//! ```

use clap::{Parser, ValueEnum};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use interaction_rs::coordinator::ArityPolicy;
use interaction_rs::literal::LiteralSet;
use interaction_rs::model::{FeatureModel, ModelOracle};
use interaction_rs::oracle::ConfigurationOracle;
use interaction_rs::search::InteractionFinder;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Policy {
    Forward,
    Backward,
    ForwardBackward,
}

impl From<Policy> for ArityPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Forward => ArityPolicy::Forward,
            Policy::Backward => ArityPolicy::Backward,
            Policy::ForwardBackward => ArityPolicy::ForwardBackward,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Recover a planted interaction")]
struct Cli {
    /// Number of features.
    #[arg(long, value_name = "INT", default_value = "30")]
    features: u32,

    /// Size of the planted interaction.
    #[arg(short, value_name = "INT", default_value = "2")]
    t: usize,

    /// Search all arities up to this one instead of only `t`.
    #[arg(long, value_name = "INT")]
    t_max: Option<usize>,

    /// Arity order for `--t-max`.
    #[arg(long, value_enum, default_value = "forward")]
    policy: Policy,

    /// Random seed for the model, the interaction and the oracle.
    #[arg(long, value_name = "INT", default_value = "42")]
    seed: u64,

    /// Maximum number of verifications.
    #[arg(long, value_name = "INT")]
    verification_limit: Option<usize>,
}

/// Tree-shaped model: every feature but the root requires a random earlier one,
/// plus a few cross-tree exclusions.
fn random_model(n: u32, rng: &mut impl Rng) -> FeatureModel {
    let mut model = FeatureModel::new(n);
    model.add_clause([1]);
    for feature in 2..=n {
        let parent = rng.random_range(1..feature);
        model.add_clause([-(feature as i32), parent as i32]);
    }
    for _ in 0..n / 10 {
        let a = rng.random_range(2..=n) as i32;
        let b = rng.random_range(2..=n) as i32;
        if a != b {
            model.add_clause([-a, -b]);
        }
    }
    model
}

fn main() -> Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let model = random_model(args.features, &mut rng);
    let mut oracle = ModelOracle::new(&model, args.seed);
    println!("Model has {} valid configurations", oracle.count());

    let core = oracle.core();
    println!("Core: {}", core);

    // Plant an interaction among features that are not core and can be selected together.
    let free: Vec<i32> = (1..=args.features as i32)
        .filter(|&f| !core.contains(f) && !core.contains(-f))
        .collect();
    let planted = (0..100)
        .map(|_| free.choose_multiple(&mut rng, args.t).copied().collect::<LiteralSet>())
        .find(|picked| oracle.complete(picked, &[]).is_some())
        .ok_or_else(|| eyre!("no selectable interaction of size {}", args.t))?;
    println!("Planted interaction: {}", planted);

    let seed_configuration = oracle
        .complete(&planted, &[])
        .ok_or_else(|| eyre!("planted interaction {} cannot be completed", planted))?;

    let target = planted.clone();
    let verifier = move |c: &LiteralSet| c.contains_all(&target) as i32;
    let mut finder = InteractionFinder::new(verifier, oracle).with_core(core);
    if let Some(limit) = args.verification_limit {
        finder.set_configuration_verification_limit(limit);
    }
    finder.add_configurations([seed_configuration])?;

    let (found, t) = match args.t_max {
        Some(t_max) => finder.find_across_arities(t_max, args.policy.into())?,
        None => (finder.find(args.t)?, args.t),
    };

    println!("Statistics:");
    for statistic in finder.statistics() {
        println!("  {}", statistic);
    }
    match found.len() {
        0 => println!("No interaction found"),
        1 => println!("Found interaction (t={}): {}", t, found[0]),
        n => println!("Search budget exhausted with {} candidates left", n),
    }
    println!(
        "Verified {} configurations, planted {} {}",
        finder.configuration_count(),
        planted,
        if found == [planted.clone()] { "recovered" } else { "missed" }
    );

    println!("\nAll done in {:.2} s", time_total.elapsed().as_secs_f64());
    Ok(())
}
