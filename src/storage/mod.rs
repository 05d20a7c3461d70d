pub mod error;
pub mod shared;
pub mod store;


pub use error::{BatchErrors, BatchRejection, EntryField, ErrorKind, SubmitError};
pub use shared::SharedStore;
pub use store::{ShortLinkStore, StoreSettings};
