//! Collections: data file codec, the collection store and typed views.

mod codec;
mod store;
mod typed;

pub use codec::decode_documents;
pub use store::CollectionStore;
pub use typed::Collection;
