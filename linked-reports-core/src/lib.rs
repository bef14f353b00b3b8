#![doc = "linked-reports-core: core logic library for linked-reports."]

//! This crate contains the business logic for mirroring cost and usage reports
//! from a source bucket into a target bucket, keeping only the line items of a
//! whitelisted set of usage accounts.
//! Cloud SDK wiring is not included here; storage is reached through the
//! [`contract::ReportStore`] trait.
//!
//! # Usage
//! Build a [`config::SyncConfig`], provide two [`contract::ReportStore`]
//! implementations and a [`contract::SyncObserver`], then call
//! [`synchronise::synchronise`].

pub mod catalog;
pub mod config;
pub mod contract;
pub mod error;
pub mod observer;
pub mod row_filter;
pub mod synchronise;
pub mod transcode;
