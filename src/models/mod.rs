pub mod link;

pub use link::{ClickEvent, LinkEntryRequest, LinkId, LinkRef, LinkState, ShortLink, ValidityInput};
