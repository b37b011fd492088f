//! Chocolatier Core - Shared domain library.
//!
//! This crate provides the types and traits used across all Chocolatier components:
//! - `backend` - Hosted backend client and in-memory placeholder backend
//! - `storefront` - Public-facing seasonal shop
//! - `admin` - Administration console
//! - `cli` - Command-line tools for seeding and management
//!
//! # Architecture
//!
//! The core crate contains only types, pure logic, and traits - no I/O, no
//! HTTP clients. Data access is expressed through the [`store::DataStore`] and
//! [`auth::AuthProvider`] traits, which the backend crate implements.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, and statuses
//! - [`models`] - Entity records (seasons, products, purchase cycles, orders, profiles)
//! - [`cart`] - Shopping cart with quantity adjustment
//! - [`pricing`] - Shipping policy and order totals
//! - [`catalog`] - Merging purchase cycle overrides into the product listing
//! - [`address`] - Shipping address validation
//! - [`store`] / [`auth`] - Data-access and authentication traits

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod models;
pub mod pricing;
pub mod store;
pub mod types;
pub mod validation;

pub use types::*;
