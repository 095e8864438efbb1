use crate::game::Winner;

/// Running tally of finished games for this process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scoreboard {
    pub player_wins: u32,
    pub computer_wins: u32,
    pub draws: u32,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one finished game. Call once per `GameOver` event.
    pub fn record(&mut self, winner: Winner) {
        match winner {
            Winner::Player => self.player_wins += 1,
            Winner::Computer => self.computer_wins += 1,
            Winner::Draw => self.draws += 1,
        }
    }

    pub fn games(&self) -> u32 {
        self.player_wins + self.computer_wins + self.draws
    }
}
