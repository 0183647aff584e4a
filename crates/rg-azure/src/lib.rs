//! # rg-azure – Azure Resource Manager REST layer
//!
//! The slice of the ARM REST API needed to walk a resource group through its
//! lifecycle.
//!
//! ## Features
//!
//! - **Cloud discovery** – login authority and token audience from `{arm}/metadata/endpoints`
//! - **OAuth2 Authentication** – client-credentials flow, token refresh on expiry
//! - **Resource Groups** – list, get, create or update, delete, export template
//! - **Generic Resources** – create or update, get, list by resource group
//! - **Key Vault** – standard vault parameters for the generic resource PUT
//! - **Long-running operations** – `Azure-AsyncOperation` / `Location` polling

pub mod types;
pub mod client;
pub mod poller;
pub mod cloud;
pub mod auth;
pub mod resource_groups;
pub mod resources;
pub mod key_vault;
pub mod service;
