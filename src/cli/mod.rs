pub mod inspect;
pub mod search;
pub mod setup;
pub mod ui;
