/*
 * Responsibility
 * - auth: access guard (bearer -> identity -> role / ownership)
 * - cors / http / security_headers: transport layers applied in app.rs
 */
pub mod auth;
pub mod cors;
pub mod http;
pub mod security_headers;
