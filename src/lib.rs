//! # SDN Proxy Balancer
//!
//! An OpenFlow controller that hides a pool of servers behind one virtual
//! proxy address.
//!
//! ## Features
//!
//! - Spoofed ARP replies so every host talks to the proxy
//! - Per-flow server selection (random or round-robin)
//! - Address-rewriting flow rules installed in both directions
//! - Periodic switch port statistics
//!
//! ## Architecture
//!
//! The switch transport turns wire traffic into [`openflow::SwitchEvent`]s
//! and hands the controller a [`openflow::SwitchConnection`] per switch.
//! The [`modules::proxy_balancer::Controller`] implements the
//! [`module::ModuleContract`] trait for uniform lifecycle management and
//! answers every event through that connection.

pub mod config;
pub mod module;
pub mod modules;
pub mod openflow;
pub mod packet;
pub mod telemetry;
