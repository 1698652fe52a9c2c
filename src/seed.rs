//! Demo population for an empty record store.

use crate::error::LeaderboardResult;
use crate::store::RecordStore;
use rand::{seq::SliceRandom, Rng};
use std::collections::HashSet;
use tracing::info;

const PREFIXES: [&'static str; 24] = [
    "Shadow", "Dragon", "Phoenix", "Storm", "Thunder", "Blaze", "Frost", "Night", "Mystic",
    "Cyber", "Ninja", "Samurai", "Viking", "Knight", "Wizard", "Ghost", "Alpha", "Omega",
    "Legend", "Turbo", "Cosmic", "Crimson", "Azure", "Void",
];
const SUFFIXES: [&'static str; 10] = [
    "X", "Z", "Pro", "HD", "Max", "Prime", "99", "007", "1337", "3000",
];
// Placed at the very top, one point apart, so a demo has known names to search for.
const SPECIAL_NAMES: [&'static str; 12] = [
    "Rahul", "Arjun", "Priya", "Neha", "Rohan", "Ananya", "Alex", "Jordan", "Taylor", "Morgan",
    "Luna", "Nova",
];

/// `count` (username, score) pairs with unique names and scores spread over
/// `[min_score, max_score]`, best first.
pub fn generate(
    count: usize,
    min_score: i64,
    max_score: i64,
    rng: &mut impl Rng,
) -> Vec<(String, i64)> {
    let mut used = HashSet::with_capacity(count);
    let mut users = Vec::with_capacity(count);

    for (i, name) in SPECIAL_NAMES.iter().take(count).enumerate() {
        let score = (max_score - i as i64).max(min_score);
        used.insert(name.to_string());
        users.push((name.to_string(), score));
    }

    let remaining = count - users.len();
    let span = max_score - min_score + 1;
    for i in 0..remaining {
        // evenly spread from max_score down to min_score
        let score = max_score - (i as i64 * span / remaining as i64);
        let name = unique_name(tiered_name(score, min_score, span, i, rng), &mut used);
        users.push((name, score));
    }
    users
}

/// Seeds the store when it holds no records. Returns how many were inserted.
pub async fn seed_if_empty(
    store: &dyn RecordStore,
    count: usize,
    min_score: i64,
    max_score: i64,
) -> LeaderboardResult<usize> {
    if count == 0 {
        info!("Seeding disabled, starting from the existing records");
        return Ok(0);
    }
    let existing = store.count().await?;
    if existing > 0 {
        info!("Record store already has {existing} users, skipping seed");
        return Ok(0);
    }

    info!("Seeding {count} users...");
    let users = generate(count, min_score, max_score, &mut rand::thread_rng());
    let inserted = store.insert_many(users).await?;
    info!("Seeded {inserted} users");
    Ok(inserted)
}

fn tiered_name(score: i64, min_score: i64, span: i64, index: usize, rng: &mut impl Rng) -> String {
    let prefix = PREFIXES.choose(rng).copied().unwrap_or("Player");
    // position of the score within the range, 0 (lowest) to 99 (highest)
    let percentile = (score - min_score) * 100 / span;
    match percentile {
        90.. => format!("{prefix}_{score}"),
        70..=89 => {
            let suffix = SUFFIXES.choose(rng).copied().unwrap_or_default();
            format!("{prefix}{suffix}_{score}")
        }
        50..=69 => format!("xX_{prefix}_{score}_Xx"),
        30..=49 => format!("{prefix}{}_{score}", rng.gen_range(0..999)),
        _ => format!("Player_{score}_{index}"),
    }
}

fn unique_name(name: String, used: &mut HashSet<String>) -> String {
    let mut candidate = name.clone();
    let mut counter = 1;
    while used.contains(&candidate) {
        candidate = format!("{name}_{counter}");
        counter += 1;
    }
    used.insert(candidate.clone());
    candidate
}
