pub mod draft;
pub mod form;

pub use draft::TagField;
pub use form::{DraftForm, FormAction, FormField};
