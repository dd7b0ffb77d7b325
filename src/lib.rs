pub mod app;
pub mod config;
pub mod flow;
pub mod handler;
pub mod i18n;
pub mod mail;
pub mod twilio;
pub mod twiml;
