mod music_played;
mod skip;

pub use music_played::{MusicPlayed, MusicPlayedOptions, PlayingState};
pub use skip::{SkipNextMusic, SkipPreviousMusic};
