pub mod contribution;
pub mod interner;
pub mod logging;
pub mod model;
pub mod pattern;
pub mod query;
pub mod scope;
pub mod search_map;
pub mod selection;
