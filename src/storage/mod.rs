mod preferences;
mod schema;
mod state;

pub use schema::Database;
pub use state::{BOOKMARKS_KEY, READ_LATER_KEY, SETTINGS_KEY, SETUP_COMPLETED_KEY};
