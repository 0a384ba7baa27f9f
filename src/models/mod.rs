mod coin;
mod history_point;
mod preference;

pub use coin::{CoinDirectoryEntry, CoinMarket};
pub use history_point::HistoryPoint;
pub use preference::UserPreference;
