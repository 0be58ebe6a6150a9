//! Integration tests for Bienici-Scraper
//!
//! A wiremock server stands in for the ScrapingAnt endpoint; every test
//! drives the real client, extractor and pipeline against it.

mod pipeline_tests;
