//! Number-guessing game core.
//!
//! The player hunts a secret number between 1 and 100 with ten attempts per
//! round. A correct guess is worth the attempts still unspent at that moment
//! and immediately rolls into a fresh round with a new secret, so a sharp
//! player keeps a streak going; spending the last attempt ends the game.
//! The accumulated score is what the caller submits to the hub.
//!
//! The core is pure state plus a seeded PCG32 generator. Rendering, input
//! plumbing, and score submission all live with the caller.

use crate::rng::Pcg32;
use crate::{HubError, Score};

/// Attempts granted at the start of every round.
pub const MAX_ATTEMPTS: u32 = 10;

/// Inclusive lower bound of the secret number.
pub const LOWEST_SECRET: u32 = 1;

/// Inclusive upper bound of the secret number.
pub const HIGHEST_SECRET: u32 = 100;

/// What a single accepted guess did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    /// The guess was below the secret. One attempt was spent.
    TooLow,
    /// The guess was above the secret. One attempt was spent.
    TooHigh,
    /// The guess was right. The points were added to the running score and a
    /// new round started with a fresh secret and a full set of attempts.
    Hit {
        /// Points earned, equal to the attempts that were still unspent.
        points: u32,
    },
    /// The last attempt was spent without finding the secret, or the game
    /// was already over. The secret of the fatal round is revealed.
    GameOver {
        /// The number the player was hunting.
        secret: u32,
    },
}

/// State for one sitting of the guessing game.
///
/// ```rust
/// use arcade_hub::games::guess::{GuessGame, GuessOutcome};
///
/// let mut game = GuessGame::with_seed(7);
/// match game.guess(50)? {
///     GuessOutcome::Hit { points } => assert!(points <= 10),
///     GuessOutcome::TooLow | GuessOutcome::TooHigh => {
///         assert_eq!(game.attempts_left(), 9);
///     },
///     GuessOutcome::GameOver { .. } => unreachable!("ten attempts remain"),
/// }
/// # Ok::<(), arcade_hub::HubError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GuessGame {
    rng: Pcg32,
    secret: u32,
    attempts_left: u32,
    score: u32,
    over: bool,
}

impl GuessGame {
    /// Creates a game with an entropy-seeded secret.
    #[must_use]
    pub fn new() -> Self {
        Self::from_rng(Pcg32::from_entropy())
    }

    /// Creates a game whose secrets replay deterministically for a seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(Pcg32::seed_from_u64(seed))
    }

    fn from_rng(mut rng: Pcg32) -> Self {
        let secret = next_secret(&mut rng);
        Self {
            rng,
            secret,
            attempts_left: MAX_ATTEMPTS,
            score: 0,
            over: false,
        }
    }

    /// Submits a guess.
    ///
    /// Values outside [`LOWEST_SECRET`]`..=`[`HIGHEST_SECRET`] are rejected
    /// without spending an attempt. Once the game is over every further call
    /// answers [`GuessOutcome::GameOver`] and changes nothing.
    pub fn guess(&mut self, number: u32) -> Result<GuessOutcome, HubError> {
        if !(LOWEST_SECRET..=HIGHEST_SECRET).contains(&number) {
            return Err(HubError::InvalidRequest {
                info: format!(
                    "guess must be between {LOWEST_SECRET} and {HIGHEST_SECRET}, got {number}"
                ),
            });
        }
        if self.over {
            return Ok(GuessOutcome::GameOver {
                secret: self.secret,
            });
        }
        if number == self.secret {
            // Scored before the attempt is spent: a first-guess hit is worth
            // the full ten.
            let points = self.attempts_left;
            self.score += points;
            self.start_round();
            return Ok(GuessOutcome::Hit { points });
        }
        let hint = if number < self.secret {
            GuessOutcome::TooLow
        } else {
            GuessOutcome::TooHigh
        };
        self.attempts_left -= 1;
        if self.attempts_left == 0 {
            self.over = true;
            return Ok(GuessOutcome::GameOver {
                secret: self.secret,
            });
        }
        Ok(hint)
    }

    /// Starts over with a fresh secret, a full set of attempts, and a zero
    /// score. Callers that want the finished game on the leaderboard submit
    /// its score before restarting.
    pub fn restart(&mut self) {
        self.score = 0;
        self.over = false;
        self.start_round();
    }

    /// The running score.
    #[must_use]
    pub const fn score(&self) -> Score {
        Score::new(self.score)
    }

    /// Attempts left in the current round.
    #[must_use]
    pub const fn attempts_left(&self) -> u32 {
        self.attempts_left
    }

    /// Whether the game has ended.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.over
    }

    fn start_round(&mut self) {
        self.secret = next_secret(&mut self.rng);
        self.attempts_left = MAX_ATTEMPTS;
    }
}

impl Default for GuessGame {
    fn default() -> Self {
        Self::new()
    }
}

fn next_secret(rng: &mut Pcg32) -> u32 {
    rng.gen_range(LOWEST_SECRET..HIGHEST_SECRET + 1)
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

    /// Binary-searches the secret on a clone without touching `game`.
    ///
    /// Ten attempts always cover a 100-value range, so the probe never runs
    /// out before hitting.
    fn find_secret(game: &GuessGame) -> u32 {
        let mut probe = game.clone();
        let (mut low, mut high) = (LOWEST_SECRET, HIGHEST_SECRET);
        loop {
            let middle = low + (high - low) / 2;
            match probe.guess(middle).unwrap() {
                GuessOutcome::TooLow => low = middle + 1,
                GuessOutcome::TooHigh => high = middle - 1,
                GuessOutcome::Hit { .. } => return middle,
                GuessOutcome::GameOver { secret } => {
                    panic!("binary search exhausted the attempts hunting {secret}")
                },
            }
        }
    }

    /// Any value in range that is not the secret.
    fn wrong_guess(secret: u32) -> u32 {
        if secret == LOWEST_SECRET {
            secret + 1
        } else {
            secret - 1
        }
    }

    #[test]
    fn out_of_range_guesses_spend_nothing() {
        let mut game = GuessGame::with_seed(1);
        assert!(game.guess(0).is_err());
        assert!(game.guess(101).is_err());
        assert!(game.guess(u32::MAX).is_err());
        assert_eq!(game.attempts_left(), MAX_ATTEMPTS);
        assert_eq!(game.score(), Score::ZERO);
        assert!(!game.is_over());
    }

    #[test]
    fn misses_spend_attempts_and_hint_the_direction() {
        let mut game = GuessGame::with_seed(2);
        let secret = find_secret(&game);

        if secret > LOWEST_SECRET {
            assert_eq!(game.guess(secret - 1).unwrap(), GuessOutcome::TooLow);
        }
        if secret < HIGHEST_SECRET {
            assert_eq!(game.guess(secret + 1).unwrap(), GuessOutcome::TooHigh);
        }
        assert!(game.attempts_left() < MAX_ATTEMPTS);
        assert_eq!(game.score(), Score::ZERO);
    }

    #[test]
    fn a_first_guess_hit_is_worth_ten_points() {
        let mut game = GuessGame::with_seed(3);
        let secret = find_secret(&game);

        assert_eq!(
            game.guess(secret).unwrap(),
            GuessOutcome::Hit {
                points: MAX_ATTEMPTS
            }
        );
        assert_eq!(game.score(), Score::new(MAX_ATTEMPTS));
        // The hit rolled straight into a fresh round.
        assert_eq!(game.attempts_left(), MAX_ATTEMPTS);
        assert!(!game.is_over());
    }

    #[test]
    fn a_hit_scores_the_attempts_still_unspent() {
        let mut game = GuessGame::with_seed(4);
        let secret = find_secret(&game);

        for _ in 0..3 {
            game.guess(wrong_guess(secret)).unwrap();
        }
        assert_eq!(game.guess(secret).unwrap(), GuessOutcome::Hit { points: 7 });
        assert_eq!(game.score(), Score::new(7));
    }

    #[test]
    fn streaks_accumulate_across_rounds() {
        let mut game = GuessGame::with_seed(5);

        let first = find_secret(&game);
        game.guess(first).unwrap();
        let second = find_secret(&game);
        game.guess(second).unwrap();

        assert_eq!(game.score(), Score::new(2 * MAX_ATTEMPTS));
    }

    #[test]
    fn spending_the_last_attempt_reveals_the_secret() {
        let mut game = GuessGame::with_seed(6);
        let secret = find_secret(&game);
        let miss = wrong_guess(secret);

        for _ in 0..MAX_ATTEMPTS - 1 {
            let outcome = game.guess(miss).unwrap();
            assert!(matches!(
                outcome,
                GuessOutcome::TooLow | GuessOutcome::TooHigh
            ));
        }
        assert_eq!(game.guess(miss).unwrap(), GuessOutcome::GameOver { secret });
        assert!(game.is_over());
        assert_eq!(game.attempts_left(), 0);
    }

    #[test]
    fn a_finished_game_ignores_further_guesses() {
        let mut game = GuessGame::with_seed(7);
        let secret = find_secret(&game);
        let miss = wrong_guess(secret);

        for _ in 0..MAX_ATTEMPTS {
            game.guess(miss).unwrap();
        }
        assert!(game.is_over());

        // Even a would-be hit changes nothing now.
        assert_eq!(
            game.guess(secret).unwrap(),
            GuessOutcome::GameOver { secret }
        );
        assert_eq!(game.score(), Score::ZERO);
        assert_eq!(game.attempts_left(), 0);
    }

    #[test]
    fn restart_zeroes_the_score_and_revives_the_game() {
        let mut game = GuessGame::with_seed(8);
        let secret = find_secret(&game);
        game.guess(secret).unwrap();
        assert!(game.score() > Score::ZERO);

        game.restart();

        assert_eq!(game.score(), Score::ZERO);
        assert_eq!(game.attempts_left(), MAX_ATTEMPTS);
        assert!(!game.is_over());
    }

    #[test]
    fn seeded_games_replay_the_same_secrets() {
        let secrets: Vec<u32> = (0..2)
            .map(|_| {
                let mut game = GuessGame::with_seed(99);
                let first = find_secret(&game);
                game.guess(first).unwrap();
                let second = find_secret(&game);
                first * 1000 + second
            })
            .collect();
        assert_eq!(secrets[0], secrets[1]);
    }

    #[test]
    fn secrets_stay_in_range_across_many_rounds() {
        let mut game = GuessGame::with_seed(10);
        for _ in 0..50 {
            let secret = find_secret(&game);
            assert!((LOWEST_SECRET..=HIGHEST_SECRET).contains(&secret));
            game.guess(secret).unwrap();
        }
    }
}
