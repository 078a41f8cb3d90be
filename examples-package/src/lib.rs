//! Runnable walkthroughs of the rowview API.
//!
//! Each example under `examples/` seeds a small in-memory database and
//! exercises one slice of the surface: positional access, derived views,
//! or the warmed result cache.
