pub mod args;
pub mod backend;
pub mod cli;
pub mod config;
pub mod context;
pub mod notify;
pub mod script;
pub mod session;
pub mod terminal;
pub mod widget;
