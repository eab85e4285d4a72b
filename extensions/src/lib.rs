//! Repository backends for the Folio document manager.

pub mod directory;

pub use directory::FileRepository;
