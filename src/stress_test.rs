use keyset_core::KeyedSet;
use keyset_sync::{Follower, SyncConfigBuilder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error;
use std::time::{Duration, Instant};
use tracing::info;

pub type StressResult<T> = Result<T, Box<dyn Error>>;

/// Parameters for one stress run
#[derive(Clone, Debug)]
pub struct StressConfig {
    pub seed: u64,
    pub num_followers: usize,
    pub mutations: usize,
    /// Items are drawn from `0..key_space`
    pub key_space: u64,
    pub max_batch_size: usize,
    /// Chance that a follower pulls after each mutation
    pub pull_probability: f64,
    pub clear_probability: f64,
    /// Ship batches as JSON instead of applying them in place
    pub encoded: bool,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            seed: 0x6b65_7973,
            num_followers: 4,
            mutations: 10_000,
            key_space: 64,
            max_batch_size: 16,
            pull_probability: 0.3,
            clear_probability: 0.001,
            encoded: false,
        }
    }
}

/// Statistics collected during stress testing
#[derive(Clone, Debug)]
pub struct StressTestStats {
    pub num_followers: usize,
    pub mutations: usize,
    pub total_pulls: usize,
    pub events_applied: usize,
    pub peak_backlog: usize,
    pub encoded_bytes: usize,
    pub total_time: Duration,
    pub avg_pull_time: Duration,
    pub ops_per_second: f64,
}

impl StressTestStats {
    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Stress Test Statistics                         ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Number of Followers:       {:>38} ║", self.num_followers);
        println!("║  Leader Mutations:          {:>38} ║", self.mutations);
        println!("║  Total Pulls:               {:>38} ║", self.total_pulls);
        println!("║  Events Applied:            {:>38} ║", self.events_applied);
        println!("║  Peak Backlog:              {:>38} ║", self.peak_backlog);
        println!("║  Encoded Bytes:             {:>38} ║", self.encoded_bytes);
        println!("║  Total Time:                {:>39}s ║", format!("{:.3}", self.total_time.as_secs_f64()));
        println!("║  Average Pull Time:         {:>36}µs ║", format!("{:.2}", self.avg_pull_time.as_micros()));
        println!("║  Operations/Second:         {:>38.0} ║", self.ops_per_second);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

/// Randomly mutate a leader while followers pull in bounded batches, then
/// catch every follower up and check it holds exactly the leader's members.
pub fn stress_test_followers(config: &StressConfig) -> StressResult<StressTestStats> {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        Follower Stress Test                                ║");
    println!("║  Followers: {} | Mutations: {} | Batch: {} | Encoded: {} ║",
             config.num_followers, config.mutations, config.max_batch_size, config.encoded);
    println!("╚════════════════════════════════════════════════════════════╝");

    let start = Instant::now();
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut leader: KeyedSet<u64> = KeyedSet::new();
    for _ in 0..config.key_space / 2 {
        leader.add(rng.gen_range(0..config.key_space))?;
    }

    let sync_config = SyncConfigBuilder::new()
        .max_batch_size(config.max_batch_size)
        .build();
    let mut followers: Vec<Follower<u64>> = (0..config.num_followers)
        .map(|_| Follower::new(&leader, sync_config.clone()))
        .collect();

    println!("\n[Phase 1/2] Mutating leader while followers pull...");

    let mut pull_times = vec![];
    let mut peak_backlog = 0;
    for i in 0..config.mutations {
        let value = rng.gen_range(0..config.key_space);
        if rng.gen_bool(config.clear_probability) {
            leader.clear()?;
        } else if rng.gen_bool(0.5) {
            leader.add(value)?;
        } else {
            leader.delete(&value)?;
        }

        for follower in followers.iter_mut() {
            peak_backlog = peak_backlog.max(follower.backlog());
            if !rng.gen_bool(config.pull_probability) {
                continue;
            }
            let pull_start = Instant::now();
            pull(follower, config.encoded)?;
            pull_times.push(pull_start.elapsed());
        }

        if (i + 1) % 2_500 == 0 {
            println!("  Mutations completed: {}/{}", i + 1, config.mutations);
        }
    }

    println!("[Phase 1/2] ✓ Completed");
    println!("[Phase 2/2] Catching up and verifying...");

    for (idx, follower) in followers.iter_mut().enumerate() {
        while follower.backlog() > 0 {
            pull(follower, config.encoded)?;
        }
        if !follower.is_converged(&leader) || !leader.deep_equal(follower.replica()) {
            return Err(format!("follower {} diverged from leader", idx).into());
        }
        follower.close();
    }

    let total_time = start.elapsed();
    let avg_pull_time = if !pull_times.is_empty() {
        pull_times.iter().sum::<Duration>() / pull_times.len() as u32
    } else {
        Duration::ZERO
    };

    let stats: Vec<_> = followers.iter().map(|f| f.stats()).collect();
    let total_pulls = stats.iter().map(|s| s.batches).sum::<usize>();
    let events_applied = stats.iter().map(|s| s.applied).sum::<usize>();
    let encoded_bytes = stats.iter().map(|s| s.encoded_bytes).sum::<usize>();
    let ops_per_second = (config.mutations + events_applied) as f64 / total_time.as_secs_f64();

    info!(members = leader.len(), total_pulls, events_applied, "stress run converged");
    println!("[Phase 2/2] ✓ Completed");

    Ok(StressTestStats {
        num_followers: config.num_followers,
        mutations: config.mutations,
        total_pulls,
        events_applied,
        peak_backlog,
        encoded_bytes,
        total_time,
        avg_pull_time,
        ops_per_second,
    })
}

fn pull(follower: &mut Follower<u64>, encoded: bool) -> StressResult<()> {
    if encoded {
        if let Some(text) = follower.encode_batch()? {
            follower.apply_encoded(&text)?;
        }
    } else {
        follower.pull()?;
    }
    Ok(())
}

/// Compare how batch size affects the work followers do
pub fn stress_test_batch_sizes(base: &StressConfig, sizes: &[usize]) -> StressResult<()> {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║      Batch Size Analysis - Follower Work vs Batch Size     ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    for &size in sizes {
        let config = StressConfig {
            max_batch_size: size,
            ..base.clone()
        };
        stress_test_followers(&config)?.print();
    }
    Ok(())
}
