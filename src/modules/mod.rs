//! # Controller Modules
//!
//! Each module implements the [`crate::module::ModuleContract`] trait for
//! uniform lifecycle management.
//!
//! ## Available Modules
//!
//! - [`proxy_balancer`] - Virtual-proxy load balancing over an OpenFlow switch

pub mod proxy_balancer;
