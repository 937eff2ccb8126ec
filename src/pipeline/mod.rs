pub mod normalize;
pub mod extraction;
pub mod resolve; // Inheritance of section-level shared fields
pub mod builder;
pub mod processor; // End-to-end text → deals
