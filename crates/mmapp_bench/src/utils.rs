//! Benchmark utilities.

use mmapp_core::{BiMap, EntityId, Register, RegisterConfig};
use mmapp_testkit::Movie;
use rand::seq::SliceRandom;
use rand::Rng;

/// Generate a random movie title.
pub fn random_title(rng: &mut impl Rng) -> String {
    let len = rng.gen_range(4..16);
    (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

/// Generate a register holding `count` movies at ids `0..count`.
pub fn populated_register(count: u32) -> Register<Movie> {
    let mut rng = rand::thread_rng();
    let movies: Vec<Movie> = (0..count)
        .map(|id| Movie::titled(id, &random_title(&mut rng)))
        .collect();
    Register::from_elements(
        Movie::new,
        movies,
        RegisterConfig::new().initial_capacity(count as usize),
    )
    .expect("generated ids are distinct")
}

/// Generate `count` random `(movie, performer)` pairs over the given key
/// ranges, duplicates included.
pub fn random_pairs(count: usize, movies: u32, performers: u32) -> Vec<(EntityId, EntityId)> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            (
                EntityId::new(rng.gen_range(0..movies)),
                EntityId::new(rng.gen_range(0..performers)),
            )
        })
        .collect()
}

/// Generate a cast matrix from random pairs.
pub fn random_cast(count: usize, movies: u32, performers: u32) -> BiMap<EntityId, EntityId> {
    random_pairs(count, movies, performers).into_iter().collect()
}

/// Pick `count` distinct ids out of `0..total` in random order.
pub fn shuffled_ids(total: u32, count: usize) -> Vec<EntityId> {
    let mut ids: Vec<EntityId> = (0..total).map(EntityId::new).collect();
    ids.shuffle(&mut rand::thread_rng());
    ids.truncate(count);
    ids
}
