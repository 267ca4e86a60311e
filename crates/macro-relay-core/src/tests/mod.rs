mod command;
mod store;
mod support;
