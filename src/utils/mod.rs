// Utility functions
pub mod io;
pub mod logging;
pub mod progress;
