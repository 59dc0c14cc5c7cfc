//! Integration tests for the crawler
//!
//! Scripted fetcher/parser scenarios exercise resume, dedup and failure
//! handling through the coordinator; the HTTP tests use wiremock to run the
//! real fetcher and HTML parser end-to-end.

mod common;
mod http_tests;
mod resume_tests;
