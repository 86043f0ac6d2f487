//! Seeded randomized replication runs.
//!
//! A leader set is mutated at random while a replica trails it by shifting
//! a random prefix of the leader's marked patch now and then. Once the
//! leader stops, the replica applies whatever is still pending and must end
//! up with exactly the leader's members.

use keyset_core::{KeyedSet, MarkedPatch};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const RUNS: usize = 500;

fn randomly_alter(rng: &mut StdRng, set: &mut KeyedSet<i64>) {
    while rng.gen::<f64>() < 0.99 {
        set.add(rng.gen_range(0..=9)).unwrap();
        set.delete(&rng.gen_range(0..=10)).unwrap();
        if rng.gen::<f64>() < 0.001 {
            set.clear().unwrap();
        }
    }
}

fn partially_patch(rng: &mut StdRng, replica: &mut KeyedSet<i64>, mark: &MarkedPatch<String, i64>) {
    while !mark.is_empty() {
        if rng.gen::<f64>() < 0.30 {
            return;
        }
        let event = mark.shift().expect("non-empty mark yields an event");
        replica.change(event).unwrap();
    }
}

fn run(rng: &mut StdRng) {
    let mut leader = KeyedSet::new();
    randomly_alter(rng, &mut leader);

    let mark = leader.mark();
    let mut replica = leader.clone();

    loop {
        randomly_alter(rng, &mut leader);
        partially_patch(rng, &mut replica, &mark);
        if rng.gen::<f64>() < 0.1 {
            break;
        }
    }

    replica.patch(mark.into_patch()).unwrap();
    assert!(leader.deep_equal(&replica));
    assert!(replica.deep_equal(&leader));
    assert_eq!(leader.listener_count(), 0);
}

#[test]
fn test_replica_converges_through_partial_shifts() {
    let mut rng = StdRng::seed_from_u64(0x6b65_7973);
    for _ in 0..RUNS {
        run(&mut rng);
    }
}

#[test]
fn test_clear_heavy_runs_converge() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..RUNS / 5 {
        let mut leader: KeyedSet<i64> = KeyedSet::new();
        let mark = leader.mark();
        let mut replica = leader.clone();

        for _ in 0..50 {
            match rng.gen_range(0..10) {
                0 => leader.clear().unwrap(),
                1..=5 => {
                    leader.add(rng.gen_range(0..20)).unwrap();
                }
                _ => {
                    leader.delete(&rng.gen_range(0..20)).unwrap();
                }
            }
            if rng.gen_bool(0.2) {
                partially_patch(&mut rng, &mut replica, &mark);
            }
        }

        replica.patch(mark.into_patch()).unwrap();
        assert!(replica.deep_equal(&leader));
    }
}
