pub mod browsing;
pub mod menu;
pub mod registration;
pub mod render;

pub use browsing::{BrowseAction, Browsing};
pub use menu::MenuChoice;
pub use registration::{Draft, Registration, Step, Transition, ValidationError};
