use crate::models::LeaderboardEntry;
use itertools::Itertools;

// Display standings as aligned text rows: rank, name, rating
pub fn board(entries: &[LeaderboardEntry]) -> String {
    // the width of the largest rank to be displayed
    let width_rank = entries
        .iter()
        .map(|e| e.rank.to_string().len())
        .max()
        .unwrap_or_default();

    // the length of the longest name, plus one for ':'
    let width_name = 1 + entries
        .iter()
        .map(|e| e.username.chars().count())
        .max()
        .unwrap_or_default();

    let width_rating = entries
        .iter()
        .map(|e| e.rating.to_string().len())
        .max()
        .unwrap_or_default();

    entries
        .iter()
        .map(|e| {
            format!(
                "{:>width_rank$}) {:<width_name$} {:>width_rating$}",
                e.rank,
                format!("{}:", e.username),
                e.rating
            )
        })
        .join("\n")
}
