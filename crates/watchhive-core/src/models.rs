mod media;
mod progress;

pub use media::{Episode, EpisodesBySeason, Movie, Releasable, Season, Series, SeriesId};
pub use progress::{SeasonRecord, SeriesProgressRecord, SeriesState};
