pub mod account_token;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod forms;
pub mod likes;
pub mod mailer;
pub mod notes;
pub mod response;
pub mod routes;
pub mod tags;
pub mod users;
