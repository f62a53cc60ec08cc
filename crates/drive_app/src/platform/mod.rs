pub(crate) mod commands;
mod effects;
pub(crate) mod logging;
mod persistence;
mod session;
