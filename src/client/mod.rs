//! Client-side pieces of the synchronization protocol. Server-independent:
//! a frontend embeds the reconciler and wires it to its own transport.

pub mod reconciler;

pub use reconciler::{Draft, NoteReconciler, RemoteUpdate, DEFAULT_DEBOUNCE};
