use stress_test::{stress_test_batch_sizes, stress_test_followers, StressConfig, StressResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
pub mod stress_test;

fn main() -> StressResult<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keyset=info,keyset_core=warn,keyset_sync=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            FOLLOWER STRESS TESTS                           ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    // Test 1: few followers, small key space
    let stats = stress_test_followers(&StressConfig {
        num_followers: 2,
        mutations: 5_000,
        key_space: 16,
        ..StressConfig::default()
    })?;
    stats.print();

    // Test 2: defaults
    let stats = stress_test_followers(&StressConfig::default())?;
    stats.print();

    // Test 3: lagging followers shipping JSON batches
    let stats = stress_test_followers(&StressConfig {
        num_followers: 8,
        mutations: 20_000,
        key_space: 256,
        pull_probability: 0.05,
        clear_probability: 0.0005,
        encoded: true,
        ..StressConfig::default()
    })?;
    stats.print();

    // Test 4: batch size analysis
    stress_test_batch_sizes(&StressConfig::default(), &[1, 4, 16, 64])?;

    println!("\n✓ All stress tests completed successfully!");
    Ok(())
}
