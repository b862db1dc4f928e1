//! Business logic services (use cases).
//!
//! Services orchestrate the engine components behind the external
//! boundary. They depend on traits (ports) -- never on concrete
//! infrastructure implementations.

pub mod gateway;
pub mod hash;
