mod client;

pub use client::{CompatProvider, CompatProviderBuilder};
