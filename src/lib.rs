pub mod app;
pub mod catalog;
pub mod config;
pub mod models;
pub mod repository;
pub mod store;
pub mod tmdb;
