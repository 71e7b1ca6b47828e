use num_traits::ToPrimitive;

/// Points for reaching the end in `player_moves` moves when the optimal route takes
/// `optimal_length`, after `elapsed_seconds`.
///
/// Efficiency is `optimal_length / player_moves`, capped at 1. The time bonus
/// starts at 100 and loses one point per second down to a floor of 10. The score is
/// `floor(100 * efficiency * time_bonus / 100)`. Without an optimal route, or
/// without a single move, there is nothing to score and the result is 0.
pub fn score(player_moves: u32, optimal_length: u32, elapsed_seconds: f64) -> u32 {
    if optimal_length == 0 || player_moves == 0 {
        return 0;
    }
    let efficiency = (f64::from(optimal_length) / f64::from(player_moves)).min(1.0);
    let time_bonus = (100.0 - elapsed_seconds).max(10.0);
    (100.0 * efficiency * (time_bonus / 100.0))
        .floor()
        .to_u32()
        .unwrap_or(0)
}
