// Serving policy value objects
pub mod config;

// Housing records and feature derivation
pub mod housing;

// Feature layout and confidence band
pub mod ml;

// Port interfaces
pub mod ports;

// Artifact and experiment storage seams
pub mod repositories;

// Request validation
pub mod validation;

// Domain-specific error types
pub mod errors;
