//! Rock-paper-scissors game core.
//!
//! Every round pits the player's move against a uniformly random opponent.
//! A win is worth one point on the player's running score; the opponent
//! keeps its own tally and draws change neither. The running total is the
//! number to hand to the hub, classically fired at the end of every round
//! once it is positive; resubmitting an unchanged total appends history
//! but never moves the best record.

use crate::rng::Pcg32;
use crate::Score;

/// A move either side can throw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    /// Rock crushes scissors.
    Rock,
    /// Paper covers rock.
    Paper,
    /// Scissors cut paper.
    Scissors,
}

impl Move {
    /// Every move, in display order.
    pub const ALL: [Self; 3] = [Self::Rock, Self::Paper, Self::Scissors];

    /// The move this one defeats.
    #[must_use]
    pub const fn beats(self) -> Self {
        match self {
            Self::Rock => Self::Scissors,
            Self::Paper => Self::Rock,
            Self::Scissors => Self::Paper,
        }
    }
}

/// How a round went for the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundResult {
    /// The player's move beat the opponent's. One point scored.
    Win,
    /// The opponent's move beat the player's.
    Loss,
    /// Both sides threw the same move.
    Draw,
}

/// A finished round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpsRound {
    /// What the player threw.
    pub player: Move,
    /// What the opponent threw.
    pub cpu: Move,
    /// How it went for the player.
    pub result: RoundResult,
}

/// State for one sitting against the random opponent.
#[derive(Debug, Clone)]
pub struct RpsGame {
    rng: Pcg32,
    player_score: u32,
    cpu_score: u32,
}

impl RpsGame {
    /// Creates a game with an entropy-seeded opponent.
    #[must_use]
    pub fn new() -> Self {
        Self::from_rng(Pcg32::from_entropy())
    }

    /// Creates a game whose opponent replays deterministically for a seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(Pcg32::seed_from_u64(seed))
    }

    const fn from_rng(rng: Pcg32) -> Self {
        Self {
            rng,
            player_score: 0,
            cpu_score: 0,
        }
    }

    /// Plays one round against the opponent.
    pub fn play(&mut self, player: Move) -> RpsRound {
        let cpu = next_move(&mut self.rng);
        let result = if player == cpu {
            RoundResult::Draw
        } else if player.beats() == cpu {
            self.player_score += 1;
            RoundResult::Win
        } else {
            self.cpu_score += 1;
            RoundResult::Loss
        };
        RpsRound {
            player,
            cpu,
            result,
        }
    }

    /// The player's running score, one point per win.
    #[must_use]
    pub const fn player_score(&self) -> Score {
        Score::new(self.player_score)
    }

    /// The opponent's running score. Never submitted anywhere.
    #[must_use]
    pub const fn cpu_score(&self) -> Score {
        Score::new(self.cpu_score)
    }
}

impl Default for RpsGame {
    fn default() -> Self {
        Self::new()
    }
}

fn next_move(rng: &mut Pcg32) -> Move {
    match rng.gen_range(0..3) {
        0 => Move::Rock,
        1 => Move::Paper,
        _ => Move::Scissors,
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn beats_forms_the_usual_cycle() {
        assert_eq!(Move::Rock.beats(), Move::Scissors);
        assert_eq!(Move::Paper.beats(), Move::Rock);
        assert_eq!(Move::Scissors.beats(), Move::Paper);
        // Every move defeats exactly one other and the cycle closes.
        for throw in Move::ALL {
            assert_eq!(throw.beats().beats().beats(), throw);
        }
    }

    #[test]
    fn results_follow_from_the_pairing() {
        let mut game = RpsGame::with_seed(1);
        for _ in 0..200 {
            let round = game.play(Move::Rock);
            let expected = match round.cpu {
                Move::Rock => RoundResult::Draw,
                Move::Paper => RoundResult::Loss,
                Move::Scissors => RoundResult::Win,
            };
            assert_eq!(round.result, expected);
            assert_eq!(round.player, Move::Rock);
        }
    }

    #[test]
    fn only_wins_move_the_player_score() {
        let mut game = RpsGame::with_seed(2);
        let mut wins = 0u32;
        let mut losses = 0u32;
        for index in 0..300 {
            let throw = Move::ALL[index % 3];
            match game.play(throw).result {
                RoundResult::Win => wins += 1,
                RoundResult::Loss => losses += 1,
                RoundResult::Draw => {},
            }
            assert_eq!(game.player_score(), Score::new(wins));
            assert_eq!(game.cpu_score(), Score::new(losses));
        }
        // A uniform opponent hands out all three results over 300 rounds.
        assert!(wins > 0, "no wins in 300 uniform rounds");
        assert!(losses > 0, "no losses in 300 uniform rounds");
        assert!(wins + losses < 300, "no draws in 300 uniform rounds");
    }

    #[test]
    fn seeded_opponents_replay_the_same_moves() {
        let mut first = RpsGame::with_seed(42);
        let mut second = RpsGame::with_seed(42);
        for index in 0..50 {
            let throw = Move::ALL[index % 3];
            assert_eq!(first.play(throw), second.play(throw));
        }
    }

    #[test]
    fn the_opponent_mixes_its_moves() {
        let mut game = RpsGame::with_seed(7);
        let mut seen = [0u32; 3];
        for _ in 0..300 {
            match game.play(Move::Rock).cpu {
                Move::Rock => seen[0] += 1,
                Move::Paper => seen[1] += 1,
                Move::Scissors => seen[2] += 1,
            }
        }
        for (index, count) in seen.iter().enumerate() {
            // Each move should land near 100 of 300; a wide band keeps the
            // check insensitive to the seed.
            assert!(
                (40..=180).contains(count),
                "move {index} appeared {count} times in 300 rounds"
            );
        }
    }
}
