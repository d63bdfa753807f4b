//! `affinity levels`: print the band table.

use affinity_core::level::Level;

pub fn run() {
    println!("{:<16} {:>11}  {:>8}  {:<12} {:<9}", "Level", "Score", "Intimacy", "Formality", "Emoji");
    println!("{}", "-".repeat(62));
    for level in Level::ALL {
        let band = level.band();
        let profile = level.profile();
        println!(
            "{:<16} {:>4} - {:<4}  {:>8}  {:<12} {:<9}",
            level.display_name(),
            band.min,
            band.max_exclusive - 1,
            profile.intimacy,
            profile.formality.as_str(),
            profile.emoji_usage.as_str(),
        );
    }
}
