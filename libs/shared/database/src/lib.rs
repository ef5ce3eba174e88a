pub mod memory;
pub mod postgrest;
pub mod state;
pub mod store;
pub mod supabase;

pub use memory::InMemoryStore;
pub use postgrest::SupabaseStore;
pub use state::AppState;
pub use store::{format_timestamp, DocumentStore, DynDocumentStore, Filter, SortKey, SortOrder, StoreQuery};
