//! Color-sequence recall game core.
//!
//! The game shows a growing sequence of colored pads and the player replays
//! it from the start. Completing a round scores one point and appends one
//! random color for the next round; a single wrong press ends the game. The
//! caller plays the sequence back to the player (via [`MemoryGame::sequence`])
//! and submits the final score to the hub.

use crate::rng::Pcg32;
use crate::Score;

/// One of the four pads the player can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    /// The green pad.
    Green,
    /// The red pad.
    Red,
    /// The yellow pad.
    Yellow,
    /// The blue pad.
    Blue,
}

impl Color {
    /// Every pad, in display order.
    pub const ALL: [Self; 4] = [Self::Green, Self::Red, Self::Yellow, Self::Blue];
}

/// What a single press did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// Right color; the sequence is not finished yet.
    Advanced,
    /// The whole sequence was replayed. One point was scored and a new color
    /// was appended; read [`MemoryGame::sequence`] to play the longer
    /// sequence back.
    RoundComplete {
        /// The running score after the completed round.
        score: u32,
    },
    /// Wrong color. The game is over.
    Mistake {
        /// The color that was actually next.
        expected: Color,
    },
    /// The game was already over. Nothing changed.
    GameOver,
}

/// State for one sitting of the recall game.
///
/// A fresh game is live immediately with a single-color sequence; there is
/// no separate start step.
#[derive(Debug, Clone)]
pub struct MemoryGame {
    rng: Pcg32,
    sequence: Vec<Color>,
    // Index of the next color the player must press. Always within the
    // sequence while the game is live.
    cursor: usize,
    score: u32,
    over: bool,
}

impl MemoryGame {
    /// Creates a game with an entropy-seeded sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::from_rng(Pcg32::from_entropy())
    }

    /// Creates a game whose sequence replays deterministically for a seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(Pcg32::seed_from_u64(seed))
    }

    fn from_rng(mut rng: Pcg32) -> Self {
        let first = next_color(&mut rng);
        Self {
            rng,
            sequence: vec![first],
            cursor: 0,
            score: 0,
            over: false,
        }
    }

    /// The sequence the player must currently replay, oldest color first.
    #[must_use]
    pub fn sequence(&self) -> &[Color] {
        &self.sequence
    }

    /// How many presses of the current sequence have been matched so far.
    #[must_use]
    pub const fn progress(&self) -> usize {
        self.cursor
    }

    /// The running score, one point per completed round.
    #[must_use]
    pub const fn score(&self) -> Score {
        Score::new(self.score)
    }

    /// Whether a wrong press has ended the game.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.over
    }

    /// Presses a pad.
    pub fn press(&mut self, color: Color) -> PressOutcome {
        if self.over {
            return PressOutcome::GameOver;
        }
        let expected = self.sequence[self.cursor];
        if color != expected {
            self.over = true;
            return PressOutcome::Mistake { expected };
        }
        self.cursor += 1;
        if self.cursor == self.sequence.len() {
            self.score += 1;
            let next = next_color(&mut self.rng);
            self.sequence.push(next);
            self.cursor = 0;
            return PressOutcome::RoundComplete { score: self.score };
        }
        PressOutcome::Advanced
    }

    /// Starts over with a fresh single-color sequence and a zero score.
    /// Callers that want the finished game on the leaderboard submit its
    /// score before restarting.
    pub fn restart(&mut self) {
        let first = next_color(&mut self.rng);
        self.sequence.clear();
        self.sequence.push(first);
        self.cursor = 0;
        self.score = 0;
        self.over = false;
    }
}

impl Default for MemoryGame {
    fn default() -> Self {
        Self::new()
    }
}

fn next_color(rng: &mut Pcg32) -> Color {
    match rng.gen_range(0..4) {
        0 => Color::Green,
        1 => Color::Red,
        2 => Color::Yellow,
        _ => Color::Blue,
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

    /// Replays the current sequence perfectly and returns the final press
    /// outcome, which must be `RoundComplete`.
    fn replay_round(game: &mut MemoryGame) -> PressOutcome {
        let sequence = game.sequence().to_vec();
        let mut last = PressOutcome::GameOver;
        for (index, color) in sequence.iter().enumerate() {
            last = game.press(*color);
            if index + 1 < sequence.len() {
                assert_eq!(last, PressOutcome::Advanced);
            }
        }
        last
    }

    /// Any pad other than the given one.
    fn other_pad(color: Color) -> Color {
        Color::ALL
            .into_iter()
            .find(|candidate| *candidate != color)
            .unwrap()
    }

    #[test]
    fn a_fresh_game_starts_with_one_color() {
        let game = MemoryGame::with_seed(1);
        assert_eq!(game.sequence().len(), 1);
        assert_eq!(game.progress(), 0);
        assert_eq!(game.score(), Score::ZERO);
        assert!(!game.is_over());
    }

    #[test]
    fn completing_a_round_scores_and_extends_the_sequence() {
        let mut game = MemoryGame::with_seed(2);
        assert_eq!(replay_round(&mut game), PressOutcome::RoundComplete { score: 1 });
        assert_eq!(game.sequence().len(), 2);
        assert_eq!(game.progress(), 0);
        assert_eq!(game.score(), Score::new(1));
    }

    #[test]
    fn each_completed_round_is_worth_one_point() {
        let mut game = MemoryGame::with_seed(3);
        for round in 1..=8 {
            assert_eq!(
                replay_round(&mut game),
                PressOutcome::RoundComplete { score: round }
            );
        }
        assert_eq!(game.score(), Score::new(8));
        assert_eq!(game.sequence().len(), 9);
    }

    #[test]
    fn progress_tracks_partial_replays() {
        let mut game = MemoryGame::with_seed(4);
        replay_round(&mut game);
        replay_round(&mut game);

        // Three colors now; press the first correctly and stop.
        let first = game.sequence()[0];
        assert_eq!(game.press(first), PressOutcome::Advanced);
        assert_eq!(game.progress(), 1);
    }

    #[test]
    fn a_wrong_press_ends_the_game_and_names_the_expected_pad() {
        let mut game = MemoryGame::with_seed(5);
        let expected = game.sequence()[0];
        let wrong = other_pad(expected);

        assert_eq!(game.press(wrong), PressOutcome::Mistake { expected });
        assert!(game.is_over());
        assert_eq!(game.score(), Score::ZERO);
    }

    #[test]
    fn a_finished_game_ignores_further_presses() {
        let mut game = MemoryGame::with_seed(6);
        let expected = game.sequence()[0];
        game.press(other_pad(expected));
        assert!(game.is_over());

        // Even the right pad changes nothing now.
        assert_eq!(game.press(expected), PressOutcome::GameOver);
        assert_eq!(game.score(), Score::ZERO);
        assert_eq!(game.sequence().len(), 1);
    }

    #[test]
    fn mistakes_keep_the_earned_score() {
        let mut game = MemoryGame::with_seed(7);
        for _ in 0..3 {
            replay_round(&mut game);
        }
        let expected = game.sequence()[0];
        game.press(other_pad(expected));

        assert!(game.is_over());
        assert_eq!(game.score(), Score::new(3));
    }

    #[test]
    fn restart_clears_the_score_and_reseeds_the_sequence() {
        let mut game = MemoryGame::with_seed(8);
        replay_round(&mut game);
        replay_round(&mut game);
        assert_eq!(game.score(), Score::new(2));

        game.restart();

        assert_eq!(game.score(), Score::ZERO);
        assert_eq!(game.sequence().len(), 1);
        assert_eq!(game.progress(), 0);
        assert!(!game.is_over());
    }

    #[test]
    fn seeded_games_replay_the_same_sequences() {
        let mut first = MemoryGame::with_seed(42);
        let mut second = MemoryGame::with_seed(42);
        for _ in 0..10 {
            replay_round(&mut first);
            replay_round(&mut second);
        }
        assert_eq!(first.sequence(), second.sequence());
    }

    #[test]
    fn long_sequences_use_all_four_pads() {
        let mut game = MemoryGame::with_seed(9);
        for _ in 0..100 {
            replay_round(&mut game);
        }
        for pad in Color::ALL {
            assert!(
                game.sequence().contains(&pad),
                "pad {pad:?} never appeared in 101 draws"
            );
        }
    }
}
