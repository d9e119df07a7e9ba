//! One repository per entity. Each owns a handle to the shared pool and
//! returns domain records from `core::types`.

pub mod forum;
pub mod post;
pub mod service;
pub mod thread;
pub mod user;
pub mod vote;

pub use forum::ForumRepository;
pub use post::PostRepository;
pub use service::ServiceRepository;
pub use thread::ThreadRepository;
pub use user::UserRepository;
pub use vote::VoteRepository;

/// Outcome of an insert guarded by a uniqueness constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Insert<T, E = T> {
    Created(T),
    /// The key was taken; carries what already occupies it.
    Existing(E),
}
