pub mod collection;

pub use collection::CollectionScheduler;
