pub mod collection;
pub mod form;
pub mod mutation;

pub use collection::{
    CollectionController, FetchKind, FetchOutcome, FetchState, PageSummary, SkipReason,
};
pub use form::{EditForm, FormMode};
pub use mutation::{Confirmation, DeleteOutcome, DeletePrompt};
